//! Cadence Workflow
//!
//! This crate provides the built representation of a workflow: the tree of
//! processes and tasks a builder produces from a definition.
//!
//! Key properties:
//! - Process children are ordered; for sequential processes the order is the
//!   execution order
//! - Every node carries a stable id assigned when it is built
//! - Nodes are immutable once built; arguments and options are captured then
//! - A [`Plan`] flattens a tree into linked records that an external store or
//!   dispatcher can persist and reload

mod error;
mod node;
mod plan;

pub use error::WorkflowError;
pub use node::{JobRef, Node, Process, ProcessKind, Task, TaskKind, Tasks};
pub use plan::{Ordering, Plan, PlanNode, PlanNodeKind, TaskVariant};
