// src/process/failure.rs

//! Failure values for process trees.
//!
//! A step reports failure with a [`StepFailure`]. Failures are aggregated into
//! an [`ErrorNode`] tree that mirrors the process tree but keeps only the
//! branches that failed.

use std::fmt;

use thiserror::Error;

/// A failure raised by a single step (or builder) of a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StepFailure {
    message: String,
}

impl StepFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for StepFailure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for StepFailure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<std::io::Error> for StepFailure {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<anyhow::Error> for StepFailure {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{err:#}"))
    }
}

/// Pruned, tree-shaped aggregation of failures.
///
/// A node appears only if one of its own steps failed (`messages` non-empty)
/// or one of its descendants did (`children` non-empty). Children keep the
/// order of the nodes they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorNode {
    pub description: String,
    pub messages: Vec<StepFailure>,
    pub children: Vec<ErrorNode>,
}

impl ErrorNode {
    pub fn new(
        description: impl Into<String>,
        messages: Vec<StepFailure>,
        children: Vec<ErrorNode>,
    ) -> Self {
        Self {
            description: description.into(),
            messages,
            children,
        }
    }

    /// Total number of failures anywhere in the tree.
    pub fn failure_count(&self) -> usize {
        self.messages.len()
            + self
                .children
                .iter()
                .map(ErrorNode::failure_count)
                .sum::<usize>()
    }

    /// Every failure message paired with the descriptions leading to it.
    pub fn failures(&self) -> Vec<(Vec<&str>, &StepFailure)> {
        let mut out = Vec::new();
        self.collect_failures(&mut Vec::new(), &mut out);
        out
    }

    fn collect_failures<'a>(
        &'a self,
        trail: &mut Vec<&'a str>,
        out: &mut Vec<(Vec<&'a str>, &'a StepFailure)>,
    ) {
        trail.push(&self.description);
        for message in &self.messages {
            out.push((trail.clone(), message));
        }
        for child in &self.children {
            child.collect_failures(trail, out);
        }
        trail.pop();
    }

    /// Render as indented lines: a node's description, its own messages one
    /// level deeper, then its failing children.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.push_lines(0, &mut lines);
        lines
    }

    fn push_lines(&self, depth: usize, lines: &mut Vec<String>) {
        let indent = "  ".repeat(depth);
        let description = if self.description.is_empty() {
            "(unnamed)"
        } else {
            self.description.as_str()
        };
        lines.push(format!("{indent}{description}"));
        for message in &self.messages {
            lines.push(format!("{indent}  ! {message}"));
        }
        for child in &self.children {
            child.push_lines(depth + 1, lines);
        }
    }
}

impl fmt::Display for ErrorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines().join("\n"))
    }
}

impl std::error::Error for ErrorNode {}
