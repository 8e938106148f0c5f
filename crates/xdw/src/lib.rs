//! # HIE XDW
//!
//! Cross-enterprise document workflow: declarative [`WorkflowDefinition`]s,
//! the per-patient [`WorkflowDocument`] instance with its task list and
//! status history, and the completion-condition expressions that drive both
//! state machines. Persistence and event correlation live in `hie-store`
//! and `hie-engine`; everything here is pure state manipulation.

pub mod conditions;
pub mod definition;
pub mod document;

pub use definition::{SlotDefinition, TaskDefinition, WorkflowDefinition};
pub use document::{Task, WorkflowDocument};
