// src/process/tree.rs

//! Running a built process tree.
//!
//! Per node: log `begin`, run `setup` then `main`, run every child
//! concurrently and wait for all of them, run `teardown`, log `done`.
//!
//! - A failing `setup` or `main` ends the node right there: no children, no
//!   teardown and no `done` event.
//! - A failing child never stops its siblings; the parent still runs its
//!   teardown and logs `done`.
//! - Each step failure is also logged as a `failed` event at the node's
//!   address.

use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::process::address::Address;
use crate::process::builder::NodeBuilder;
use crate::process::failure::{ErrorNode, StepFailure};
use crate::process::logger::{LogEvent, ProcessLogger};
use crate::process::node::{NodeContext, ProcessNode};

/// Read-only shape of a built tree: descriptions and children only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeOutline {
    pub description: String,
    pub children: Vec<TreeOutline>,
}

impl TreeOutline {
    fn of(node: &ProcessNode) -> Self {
        Self {
            description: node.description.clone(),
            children: node.children.iter().map(TreeOutline::of).collect(),
        }
    }

    /// Number of nodes, including this one.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(TreeOutline::node_count)
            .sum::<usize>()
    }
}

/// A fully built tree, ready to run exactly once.
#[derive(Debug)]
pub struct ProcessTree {
    root: ProcessNode,
}

impl ProcessTree {
    /// Build a tree from a root callback.
    ///
    /// If any builder in the tree fails, nothing is returned for running;
    /// the error holds only the branches whose builders failed.
    pub fn build<F>(build: F) -> Result<Self, ErrorNode>
    where
        F: FnOnce(&mut NodeBuilder) -> Result<(), StepFailure>,
    {
        let mut root = NodeBuilder::new();
        let outcome = build(&mut root);
        let root = root.finish(outcome)?;
        Ok(Self { root })
    }

    pub fn outline(&self) -> TreeOutline {
        TreeOutline::of(&self.root)
    }

    pub fn root(&self) -> &ProcessNode {
        &self.root
    }

    /// Run the whole tree; `Err` holds the pruned failure tree.
    pub async fn run(self, logger: Arc<dyn ProcessLogger>) -> Result<(), ErrorNode> {
        match run_node(self.root, Address::root(), logger).await {
            None => Ok(()),
            Some(error) => {
                warn!(failures = error.failure_count(), "process tree finished with failures");
                Err(error)
            }
        }
    }

    /// Run the tree on the tokio runtime and hand back its join handle, so
    /// the caller can inspect the outline or do other work meanwhile.
    pub fn spawn(self, logger: Arc<dyn ProcessLogger>) -> JoinHandle<Result<(), ErrorNode>> {
        tokio::spawn(self.run(logger))
    }
}

/// Build a tree with `build` and run it.
///
/// A build failure is returned before anything runs or is logged.
pub async fn execute<F>(logger: Arc<dyn ProcessLogger>, build: F) -> Result<(), ErrorNode>
where
    F: FnOnce(&mut NodeBuilder) -> Result<(), StepFailure>,
{
    let tree = ProcessTree::build(build)?;
    tree.run(logger).await
}

fn run_node(
    node: ProcessNode,
    address: Address,
    logger: Arc<dyn ProcessLogger>,
) -> BoxFuture<'static, Option<ErrorNode>> {
    Box::pin(async move {
        let ProcessNode {
            description,
            setup,
            main,
            teardown,
            children,
        } = node;
        let ctx = NodeContext::new(address.clone(), Arc::clone(&logger));

        logger.log(LogEvent::begin(address.clone()));

        for step in [setup, main].into_iter().flatten() {
            if let Err(failure) = step(ctx.clone()).await {
                debug!(%address, error = %failure, "step failed; skipping rest of node");
                logger.log(LogEvent::failed(address.clone(), &failure));
                return Some(ErrorNode::new(description, vec![failure], Vec::new()));
            }
        }

        let runs = children
            .into_iter()
            .enumerate()
            .map(|(index, child)| run_node(child, address.child(index), Arc::clone(&logger)));
        let failed_children: Vec<ErrorNode> = join_all(runs).await.into_iter().flatten().collect();

        let mut messages = Vec::new();
        if let Some(step) = teardown {
            if let Err(failure) = step(ctx).await {
                logger.log(LogEvent::failed(address.clone(), &failure));
                messages.push(failure);
            }
        }

        logger.log(LogEvent::done(address));

        if messages.is_empty() && failed_children.is_empty() {
            None
        } else {
            Some(ErrorNode::new(description, messages, failed_children))
        }
    })
}
