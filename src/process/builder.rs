// src/process/builder.rs

//! Synchronous construction of process trees.
//!
//! A build callback receives a [`NodeBuilder`] for its node, sets the
//! description and steps, and adds children through nested callbacks. A
//! callback that returns `Err` marks its own node as failed; the build as a
//! whole then yields an [`ErrorNode`] containing only the failed branches.

use std::future::Future;

use futures::FutureExt;

use crate::process::failure::{ErrorNode, StepFailure};
use crate::process::node::{NodeContext, ProcessNode, StepFn};

/// Mutable handle used while a node is being built.
#[derive(Default)]
pub struct NodeBuilder {
    description: String,
    setup: Option<StepFn>,
    main: Option<StepFn>,
    teardown: Option<StepFn>,
    children: Vec<ProcessNode>,
    failed_children: Vec<ErrorNode>,
}

fn boxed_step<F, Fut>(step: F) -> StepFn
where
    F: FnOnce(NodeContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), StepFailure>> + Send + 'static,
{
    Box::new(move |ctx| step(ctx).boxed())
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = description.into();
        self
    }

    /// Runs first. A failure skips `main`, the children and `teardown`.
    pub fn setup<F, Fut>(&mut self, step: F) -> &mut Self
    where
        F: FnOnce(NodeContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), StepFailure>> + Send + 'static,
    {
        self.setup = Some(boxed_step(step));
        self
    }

    /// Runs after `setup`. A failure skips the children and `teardown`.
    pub fn main<F, Fut>(&mut self, step: F) -> &mut Self
    where
        F: FnOnce(NodeContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), StepFailure>> + Send + 'static,
    {
        self.main = Some(boxed_step(step));
        self
    }

    /// Runs after every child has settled, whether or not they succeeded.
    pub fn teardown<F, Fut>(&mut self, step: F) -> &mut Self
    where
        F: FnOnce(NodeContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), StepFailure>> + Send + 'static,
    {
        self.teardown = Some(boxed_step(step));
        self
    }

    /// Build a child immediately with `build`. Children are addressed in the
    /// order they are added.
    pub fn add<F>(&mut self, build: F) -> &mut Self
    where
        F: FnOnce(&mut NodeBuilder) -> Result<(), StepFailure>,
    {
        let mut child = NodeBuilder::new();
        let outcome = build(&mut child);

        match child.finish(outcome) {
            Ok(node) => self.children.push(node),
            Err(error) => self.failed_children.push(error),
        }
        self
    }

    pub(crate) fn finish(self, outcome: Result<(), StepFailure>) -> Result<ProcessNode, ErrorNode> {
        let messages: Vec<StepFailure> = outcome.err().into_iter().collect();

        if messages.is_empty() && self.failed_children.is_empty() {
            return Ok(ProcessNode {
                description: self.description,
                setup: self.setup,
                main: self.main,
                teardown: self.teardown,
                children: self.children,
            });
        }

        Err(ErrorNode::new(
            self.description,
            messages,
            self.failed_children,
        ))
    }
}
