//! Domain model for event-sourced workflow state management.
//!
//! This module provides a strongly typed CQRS/ES domain model: every
//! workflow transition is a command validated by the aggregate and an event
//! appended to the log. Nothing mutates state directly.
//!
//! # Architecture
//!
//! - **Commands** (`cqrs/commands.rs`): Intent to change state
//! - **Events** (`cqrs/events.rs`): Facts that have happened
//! - **Aggregate** (`cqrs/mod.rs`): Command validation and event application
//! - **View** (`view.rs`): Read-only projection for observers
//! - **Actor** (`actor.rs`): Per-workflow serialization of commands

pub mod actor;
pub mod cqrs;
pub mod errors;
pub mod services;
pub mod step;
pub mod supervisor;
pub mod types;
pub mod view;

// Re-export CQRS types
pub use cqrs::*;

// Re-export commonly used types for convenience
pub use actor::{create_actor_args, WorkflowActor, WorkflowActorArgs, WorkflowMessage};
pub use errors::WorkflowError;
pub use services::{WorkflowClock, WorkflowServices};
pub use step::{StepInput, StepOutput, TextFormat, WorkflowStep};
pub use supervisor::{SupervisorMsg, WorkflowSupervisor};
pub use types::{
    AgentRole, AuthorId, ContentType, ResearchId, SelectedAngle, StepNumber, StepStatus,
    TimestampUtc, WorkflowId, WorkflowStatus,
};
pub use view::{WorkflowEventEnvelope, WorkflowView};
