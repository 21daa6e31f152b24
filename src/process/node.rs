use std::sync::Arc;

use futures::future::BoxFuture;

use crate::process::address::Address;
use crate::process::failure::StepFailure;
use crate::process::logger::{LogEvent, MessageLevel, ProcessLogger};

/// A boxed setup / main / teardown step.
pub type StepFn =
    Box<dyn FnOnce(NodeContext) -> BoxFuture<'static, Result<(), StepFailure>> + Send>;

/// Handle given to a running step: who it is and where to log.
#[derive(Clone)]
pub struct NodeContext {
    address: Address,
    logger: Arc<dyn ProcessLogger>,
}

impl std::fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeContext")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl NodeContext {
    pub(crate) fn new(address: Address, logger: Arc<dyn ProcessLogger>) -> Self {
        Self { address, logger }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn log(&self, level: MessageLevel, text: impl Into<String>) {
        self.logger
            .log(LogEvent::message(self.address.clone(), level, text));
    }

    pub fn info(&self, text: impl Into<String>) {
        self.log(MessageLevel::Info, text);
    }

    pub fn warn(&self, text: impl Into<String>) {
        self.log(MessageLevel::Warn, text);
    }
}

/// An immutable, fully built node of a process tree.
pub struct ProcessNode {
    pub(crate) description: String,
    pub(crate) setup: Option<StepFn>,
    pub(crate) main: Option<StepFn>,
    pub(crate) teardown: Option<StepFn>,
    pub(crate) children: Vec<ProcessNode>,
}

impl std::fmt::Debug for ProcessNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessNode")
            .field("description", &self.description)
            .field("setup", &self.setup.is_some())
            .field("main", &self.main.is_some())
            .field("teardown", &self.teardown.is_some())
            .field("children", &self.children)
            .finish()
    }
}

impl ProcessNode {
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn children(&self) -> &[ProcessNode] {
        &self.children
    }
}
