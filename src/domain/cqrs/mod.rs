//! CQRS core types for event sourcing.
//!
//! This module contains the core CQRS types:
//! - **Commands**: Intent to change state
//! - **Events**: Facts that have happened
//! - **Aggregate**: Command validation and event application
//! - **Query**: Read-side projection
//!
//! Every transition happens here. Executor callbacks that arrive for a step
//! no longer in flight are discarded without events, so late results can
//! never clobber newer state.

pub mod commands;
pub mod events;
pub mod query;

pub use commands::WorkflowCommand;
pub use events::WorkflowEvent;
pub use query::WorkflowQuery;

use crate::domain::commands::command_name;
use crate::domain::errors::WorkflowError;
use crate::domain::services::WorkflowServices;
use crate::domain::step::{StepInput, StepOutput, WorkflowStep};
use crate::domain::types::{
    AuthorId, ContentType, ResearchId, SelectedAngle, StepNumber, StepStatus, TimestampUtc,
    WorkflowStatus,
};
use crate::template::{StepTemplate, WorkflowTemplate};
use async_trait::async_trait;
use cqrs_es::Aggregate;
use serde::{Deserialize, Serialize};

/// Active workflow data when the aggregate is initialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowData {
    content_type: ContentType,
    template: Vec<StepTemplate>,
    status: WorkflowStatus,
    current_step_number: StepNumber,
    selected_angle: SelectedAngle,
    source_research_id: ResearchId,
    briefing: Option<String>,
    author_id: Option<AuthorId>,
    created_at: TimestampUtc,
    completed_at: Option<TimestampUtc>,
    cancel_reason: Option<String>,
    steps: Vec<WorkflowStep>,
}

impl WorkflowData {
    // ========== Public Getters ==========

    /// Returns the content type.
    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Returns the template snapshot taken at creation.
    pub fn template(&self) -> &[StepTemplate] {
        &self.template
    }

    /// Returns the workflow status.
    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    /// Returns the current step position (N+1 exactly when completed).
    pub fn current_step_number(&self) -> StepNumber {
        self.current_step_number
    }

    /// Returns the selected editorial angle.
    pub fn selected_angle(&self) -> &SelectedAngle {
        &self.selected_angle
    }

    /// Returns the source research identifier.
    pub fn source_research_id(&self) -> &ResearchId {
        &self.source_research_id
    }

    /// Returns the briefing, when one was provided.
    pub fn briefing(&self) -> Option<&String> {
        self.briefing.as_ref()
    }

    /// Returns the attributed author, when one is assigned.
    pub fn author_id(&self) -> Option<&AuthorId> {
        self.author_id.as_ref()
    }

    /// Returns the creation timestamp.
    pub fn created_at(&self) -> &TimestampUtc {
        &self.created_at
    }

    /// Returns the completion timestamp.
    pub fn completed_at(&self) -> Option<&TimestampUtc> {
        self.completed_at.as_ref()
    }

    /// Returns the cancellation reason, when cancelled.
    pub fn cancel_reason(&self) -> Option<&String> {
        self.cancel_reason.as_ref()
    }

    /// Returns all steps, ordered by step number.
    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    /// Looks up a step by its 1-based number.
    pub fn step(&self, number: StepNumber) -> Option<&WorkflowStep> {
        self.steps.get(number.index())
    }

    // ========== Crate-level Mutators ==========

    pub(crate) fn step_mut(&mut self, number: StepNumber) -> Option<&mut WorkflowStep> {
        self.steps.get_mut(number.index())
    }

    pub(crate) fn set_status(&mut self, status: WorkflowStatus) {
        self.status = status;
    }

    pub(crate) fn set_current_step_number(&mut self, number: StepNumber) {
        self.current_step_number = number;
    }

    pub(crate) fn set_completed_at(&mut self, at: Option<TimestampUtc>) {
        self.completed_at = at;
    }

    pub(crate) fn set_cancel_reason(&mut self, reason: Option<String>) {
        self.cancel_reason = reason;
    }

    /// Returns steps downstream of `number` to untouched pending. A
    /// re-dispatch invalidates everything built on the replaced output.
    pub(crate) fn reset_steps_after(&mut self, number: StepNumber) {
        for step in &mut self.steps {
            if step.step_number > number && step.status != StepStatus::Pending {
                step.apply_reset();
            }
        }
    }

    /// Skips every step that has not reached a terminal state.
    pub(crate) fn skip_open_steps(&mut self) {
        for step in &mut self.steps {
            if matches!(
                step.status,
                StepStatus::Pending | StepStatus::AgentWorking | StepStatus::AwaitingReview
            ) {
                step.apply_skipped();
            }
        }
    }
}

/// Workflow aggregate state.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub enum WorkflowState {
    /// Aggregate has not been initialized.
    #[default]
    Uninitialized,
    /// Aggregate is active with workflow data (boxed for memory efficiency).
    Active(Box<WorkflowData>),
}

/// The workflow aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkflowAggregate {
    pub state: WorkflowState,
}

#[async_trait]
impl Aggregate for WorkflowAggregate {
    type Command = WorkflowCommand;
    type Event = WorkflowEvent;
    type Error = WorkflowError;
    type Services = WorkflowServices;

    fn aggregate_type() -> String {
        "workflow".to_string()
    }

    async fn handle(
        &self,
        command: Self::Command,
        services: &Self::Services,
    ) -> Result<Vec<Self::Event>, Self::Error> {
        let now = services.clock.now();
        let cmd_name = command_name(&command);

        match (&self.state, command) {
            // CreateWorkflow - only valid on uninitialized aggregate
            (
                WorkflowState::Uninitialized,
                WorkflowCommand::CreateWorkflow {
                    content_type,
                    template,
                    selected_angle,
                    source_research_id,
                    briefing,
                    author_id,
                },
            ) => {
                // Same structural checks the registry applies; commands may
                // carry templates that never went through it.
                WorkflowTemplate::new(content_type.label(), content_type, template.clone())
                    .validate()
                    .map_err(|e| WorkflowError::validation(e.to_string()))?;

                let first_input =
                    StepInput::new(selected_angle.clone(), briefing.clone(), None);
                Ok(vec![
                    WorkflowEvent::WorkflowCreated {
                        content_type,
                        template,
                        selected_angle,
                        source_research_id,
                        briefing,
                        author_id,
                        created_at: now,
                    },
                    WorkflowEvent::StepDispatched {
                        step_number: StepNumber::first(),
                        input: first_input,
                        dispatched_at: now,
                    },
                ])
            }

            (WorkflowState::Active(_), WorkflowCommand::CreateWorkflow { .. }) => {
                Err(WorkflowError::validation("workflow already exists"))
            }

            // Executor success: pause for review or complete and advance.
            (
                WorkflowState::Active(data),
                WorkflowCommand::ExecutorSucceeded {
                    step_number,
                    output,
                    options,
                },
            ) => {
                if !step_accepts_executor_callback(data, step_number) {
                    tracing::debug!(
                        step = step_number.0,
                        command = cmd_name,
                        "discarding stale executor callback"
                    );
                    return Ok(Vec::new());
                }
                let requires_review = data
                    .step(step_number)
                    .map(|s| s.requires_review)
                    .unwrap_or(false);

                if requires_review {
                    Ok(vec![WorkflowEvent::StepAwaitingReview {
                        step_number,
                        output: Some(output),
                        output_options: options,
                        paused_at: now,
                    }])
                } else {
                    let mut events = vec![WorkflowEvent::StepCompleted {
                        step_number,
                        output: output.clone(),
                        completed_at: now,
                    }];
                    events.extend(advancement_events(data, step_number, Some(output), now));
                    Ok(events)
                }
            }

            // Executor failure: step and workflow fail, no automatic retry.
            (
                WorkflowState::Active(data),
                WorkflowCommand::ExecutorFailed { step_number, error },
            ) => {
                if !step_accepts_executor_callback(data, step_number) {
                    tracing::debug!(
                        step = step_number.0,
                        command = cmd_name,
                        "discarding stale executor callback"
                    );
                    return Ok(Vec::new());
                }
                Ok(vec![WorkflowEvent::StepFailed {
                    step_number,
                    error,
                    failed_at: now,
                }])
            }

            // Executor progress: thinking lines only, never a status change.
            (
                WorkflowState::Active(data),
                WorkflowCommand::ExecutorProgress {
                    step_number,
                    line1,
                    line2,
                },
            ) => {
                if !step_accepts_executor_callback(data, step_number) {
                    tracing::debug!(
                        step = step_number.0,
                        command = cmd_name,
                        "discarding stale executor callback"
                    );
                    return Ok(Vec::new());
                }
                Ok(vec![WorkflowEvent::StepProgressUpdated {
                    step_number,
                    line1,
                    line2,
                    updated_at: now,
                }])
            }

            // Reviewer approval.
            (
                WorkflowState::Active(data),
                WorkflowCommand::ApproveStep {
                    step_number,
                    review_notes,
                    selected_option,
                },
            ) => {
                let step = awaiting_review_step(data, step_number)?;
                let selected = resolve_selection(step, selected_option)?;
                let effective = selected
                    .and_then(|idx| step.output_options.get(idx).cloned())
                    .or_else(|| step.output.clone());

                let mut events = vec![WorkflowEvent::StepApproved {
                    step_number,
                    selected_option_index: selected,
                    review_notes,
                    reviewed_at: now,
                }];
                events.extend(advancement_events(data, step_number, effective, now));
                Ok(events)
            }

            // Reviewer rejection: the producing step is re-dispatched with
            // the notes as its rewrite brief.
            (
                WorkflowState::Active(data),
                WorkflowCommand::RejectStep {
                    step_number,
                    review_notes,
                },
            ) => {
                let step = awaiting_review_step(data, step_number)?;
                if review_notes.trim().is_empty() {
                    return Err(WorkflowError::validation(
                        "rejection notes are required; they brief the redo",
                    ));
                }

                // An agent step under review redoes itself; a pure gate
                // sends back the nearest producing predecessor.
                let target = if step.is_gate() {
                    producing_predecessor(data, step_number).ok_or_else(|| {
                        WorkflowError::validation("no producing step before this gate")
                    })?
                } else {
                    step_number
                };

                let base_input = data
                    .step(target)
                    .and_then(|s| s.input.clone())
                    .unwrap_or_else(|| {
                        StepInput::new(
                            data.selected_angle().clone(),
                            data.briefing().cloned(),
                            None,
                        )
                    });
                let redo_input = base_input.for_revision(review_notes.clone());

                Ok(vec![
                    WorkflowEvent::StepRejected {
                        step_number,
                        review_notes,
                        reviewed_at: now,
                    },
                    WorkflowEvent::StepDispatched {
                        step_number: target,
                        input: redo_input,
                        dispatched_at: now,
                    },
                ])
            }

            // Explicit recovery for a failed step.
            (WorkflowState::Active(data), WorkflowCommand::RetryStep { step_number }) => {
                let step = data.step(step_number).ok_or_else(|| {
                    WorkflowError::validation(format!("no step {} in this workflow", step_number))
                })?;
                if step.status != StepStatus::Failed {
                    return Err(WorkflowError::validation(format!(
                        "step {} is '{}', only failed steps can be retried",
                        step_number,
                        step.status.label()
                    )));
                }
                let input = step
                    .input
                    .clone()
                    .unwrap_or_else(|| {
                        StepInput::new(
                            data.selected_angle().clone(),
                            data.briefing().cloned(),
                            None,
                        )
                    })
                    .for_retry();
                Ok(vec![WorkflowEvent::StepDispatched {
                    step_number,
                    input,
                    dispatched_at: now,
                }])
            }

            // Cancellation.
            (WorkflowState::Active(data), WorkflowCommand::CancelWorkflow { reason }) => {
                if data.status().is_terminal() {
                    return Err(WorkflowError::validation(format!(
                        "workflow is already '{}'",
                        data.status().label()
                    )));
                }
                Ok(vec![WorkflowEvent::WorkflowCancelled {
                    reason,
                    cancelled_at: now,
                }])
            }

            // Commands on uninitialized aggregate (except CreateWorkflow above)
            (WorkflowState::Uninitialized, _cmd) => Err(WorkflowError::NotInitialized),
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match (&mut self.state, event) {
            // WorkflowCreated initializes the aggregate
            (
                WorkflowState::Uninitialized,
                WorkflowEvent::WorkflowCreated {
                    content_type,
                    template,
                    selected_angle,
                    source_research_id,
                    briefing,
                    author_id,
                    created_at,
                },
            ) => {
                let steps = template
                    .iter()
                    .enumerate()
                    .map(|(idx, t)| WorkflowStep::pending(StepNumber(idx as u32 + 1), t))
                    .collect();
                self.state = WorkflowState::Active(Box::new(WorkflowData {
                    content_type,
                    template,
                    status: WorkflowStatus::Pending,
                    current_step_number: StepNumber::first(),
                    selected_angle,
                    source_research_id,
                    briefing,
                    author_id,
                    created_at,
                    completed_at: None,
                    cancel_reason: None,
                    steps,
                }));
            }

            (
                WorkflowState::Active(data),
                WorkflowEvent::StepDispatched {
                    step_number,
                    input,
                    dispatched_at,
                },
            ) => {
                if let Some(step) = data.step_mut(step_number) {
                    step.apply_dispatch(input, dispatched_at);
                }
                data.reset_steps_after(step_number);
                data.set_status(WorkflowStatus::Active);
                data.set_current_step_number(step_number);
                data.set_completed_at(None);
            }

            (
                WorkflowState::Active(data),
                WorkflowEvent::StepProgressUpdated {
                    step_number,
                    line1,
                    line2,
                    ..
                },
            ) => {
                if let Some(step) = data.step_mut(step_number) {
                    step.apply_progress(line1, line2);
                }
            }

            (
                WorkflowState::Active(data),
                WorkflowEvent::StepCompleted {
                    step_number,
                    output,
                    completed_at,
                },
            ) => {
                if let Some(step) = data.step_mut(step_number) {
                    step.apply_completed(output, completed_at);
                }
            }

            (
                WorkflowState::Active(data),
                WorkflowEvent::StepAwaitingReview {
                    step_number,
                    output,
                    output_options,
                    paused_at,
                },
            ) => {
                if let Some(step) = data.step_mut(step_number) {
                    step.apply_awaiting_review(output, output_options, paused_at);
                }
                data.set_status(WorkflowStatus::PausedForReview);
                data.set_current_step_number(step_number);
            }

            (
                WorkflowState::Active(data),
                WorkflowEvent::StepFailed {
                    step_number,
                    error,
                    failed_at,
                },
            ) => {
                if let Some(step) = data.step_mut(step_number) {
                    step.apply_failed(error, failed_at);
                }
                data.set_status(WorkflowStatus::Failed);
            }

            (
                WorkflowState::Active(data),
                WorkflowEvent::StepApproved {
                    step_number,
                    selected_option_index,
                    review_notes,
                    reviewed_at,
                },
            ) => {
                if let Some(step) = data.step_mut(step_number) {
                    step.apply_approved(selected_option_index, review_notes, reviewed_at);
                }
                data.set_status(WorkflowStatus::Active);
            }

            (
                WorkflowState::Active(data),
                WorkflowEvent::StepRejected {
                    step_number,
                    review_notes,
                    reviewed_at,
                },
            ) => {
                if let Some(step) = data.step_mut(step_number) {
                    step.apply_rejected(review_notes, reviewed_at);
                }
                data.set_status(WorkflowStatus::Active);
            }

            (WorkflowState::Active(data), WorkflowEvent::WorkflowCompleted { completed_at }) => {
                let past_end = StepNumber(data.steps().len() as u32 + 1);
                data.set_status(WorkflowStatus::Completed);
                data.set_completed_at(Some(completed_at));
                data.set_current_step_number(past_end);
            }

            (WorkflowState::Active(data), WorkflowEvent::WorkflowCancelled { reason, .. }) => {
                data.set_status(WorkflowStatus::Cancelled);
                data.set_cancel_reason(Some(reason));
                data.skip_open_steps();
            }

            // Ignore events on wrong state (shouldn't happen with correct event sourcing)
            _ => {}
        }
    }
}

/// Executor callbacks only apply while the step is agent_working and the
/// workflow is live; anything else is a stale result from a replaced run.
fn step_accepts_executor_callback(data: &WorkflowData, step_number: StepNumber) -> bool {
    if data.status().is_terminal() {
        return false;
    }
    data.step(step_number)
        .map(|s| s.status == StepStatus::AgentWorking)
        .unwrap_or(false)
}

/// Resolves the step a human decision targets, checking it is in review.
fn awaiting_review_step(
    data: &WorkflowData,
    step_number: StepNumber,
) -> Result<&WorkflowStep, WorkflowError> {
    let step = data.step(step_number).ok_or_else(|| {
        WorkflowError::validation(format!("no step {} in this workflow", step_number))
    })?;
    if step.status != StepStatus::AwaitingReview {
        return Err(WorkflowError::validation(format!(
            "step {} is '{}', expected 'awaiting_review'",
            step_number,
            step.status.label()
        )));
    }
    Ok(step)
}

/// Validates an approval's option selection against the step's options.
fn resolve_selection(
    step: &WorkflowStep,
    selected_option: Option<usize>,
) -> Result<Option<usize>, WorkflowError> {
    match (step.output_options.len(), selected_option) {
        (0, None) => Ok(None),
        (0, Some(_)) => Err(WorkflowError::validation(format!(
            "step {} offers no options to select from",
            step.step_number
        ))),
        // A single option needs no explicit pick.
        (1, None) => Ok(Some(0)),
        (_, None) => Err(WorkflowError::validation(format!(
            "step {} offers {} options, a selection is required",
            step.step_number,
            step.output_options.len()
        ))),
        (count, Some(idx)) if idx < count => Ok(Some(idx)),
        (count, Some(idx)) => Err(WorkflowError::validation(format!(
            "selected option {} out of range (step {} has {} options)",
            idx, step.step_number, count
        ))),
    }
}

/// Finds the nearest executor-backed step before a gate.
fn producing_predecessor(data: &WorkflowData, gate: StepNumber) -> Option<StepNumber> {
    data.steps()
        .iter()
        .filter(|s| s.step_number < gate && s.agent_role.is_agent())
        .map(|s| s.step_number)
        .max()
}

/// Events that move the pipeline past a finished step: dispatch the next
/// agent step, pause on the next gate, or complete the workflow when no
/// steps remain. `effective` is the finished step's output as it flows
/// downstream (the selected option when one was picked).
fn advancement_events(
    data: &WorkflowData,
    from: StepNumber,
    effective: Option<StepOutput>,
    now: TimestampUtc,
) -> Vec<WorkflowEvent> {
    let next = from.next();
    match data.step(next) {
        None => vec![WorkflowEvent::WorkflowCompleted { completed_at: now }],
        Some(step) if step.agent_role.is_agent() => {
            let input = StepInput::new(
                data.selected_angle().clone(),
                data.briefing().cloned(),
                effective,
            );
            vec![WorkflowEvent::StepDispatched {
                step_number: next,
                input,
                dispatched_at: now,
            }]
        }
        Some(gate) => {
            // A gate offering a choice surfaces the predecessor's
            // alternatives; otherwise the reviewer sees the effective output.
            let options = if gate.offers_options {
                data.step(from)
                    .map(|s| s.output_options.clone())
                    .unwrap_or_default()
            } else {
                Vec::new()
            };
            vec![WorkflowEvent::StepAwaitingReview {
                step_number: next,
                output: effective,
                output_options: options,
                paused_at: now,
            }]
        }
    }
}

#[cfg(test)]
#[path = "../tests/aggregate_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "../tests/review_tests.rs"]
mod review_tests;
