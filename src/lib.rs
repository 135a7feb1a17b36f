//! Event-sourced orchestration for a multi-agent content production
//! pipeline.
//!
//! A workflow is an ordered sequence of steps stamped out from a template
//! for a content type. Agent steps run through a pluggable [`StepExecutor`];
//! review steps pause the pipeline until a human approves or rejects.
//! Every transition is an event in a per-workflow JSONL log, so a workflow
//! survives restarts and its full history stays auditable.
//!
//! Entry point is [`PipelineRuntime`]: it resolves templates, spawns one
//! supervised actor per workflow, and wires dispatched steps to the
//! executor. [`WorkflowHandle`] is the client surface (commands, live view
//! snapshots, the event stream, the review gate, and activity stats).

pub mod config;
pub mod domain;
pub mod event_store;
pub mod executor;
pub mod gate;
pub mod runtime;
pub mod screen;
pub mod telemetry;
pub mod template;

pub use config::PipelineConfig;
pub use domain::{
    AgentRole, AuthorId, ContentType, ResearchId, SelectedAngle, StepInput, StepNumber,
    StepOutput, StepStatus, TextFormat, TimestampUtc, WorkflowCommand, WorkflowError,
    WorkflowEvent, WorkflowEventEnvelope, WorkflowId, WorkflowStatus, WorkflowStep,
    WorkflowView,
};
pub use executor::{DispatchRequest, ExecutorReply, ProgressSink, ProgressUpdate, StepExecutor};
pub use gate::ReviewGate;
pub use runtime::{CreateWorkflowRequest, PipelineRuntime, WorkflowHandle};
pub use screen::{screen_for, Screen};
pub use telemetry::{ActivityEntry, HumanTimeTable, WorkflowStats};
pub use template::{StepTemplate, TemplateRegistry, WorkflowTemplate};
