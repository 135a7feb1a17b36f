//! Workflow step records and their typed payloads.
//!
//! Step inputs and outputs are decoded exactly once, at the executor
//! boundary. Downstream code pattern-matches `StepOutput` instead of
//! re-parsing serialized blobs.

use crate::domain::types::{AgentRole, SelectedAngle, StepNumber, StepStatus, TimestampUtc};
use crate::template::StepTemplate;
use serde::{Deserialize, Serialize};

/// Text body format for written content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
    #[default]
    Markdown,
    Html,
    Plain,
}

/// Output produced by a step, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepOutput {
    /// Written content (blog body, thread, caption, HTML page).
    Text {
        body: String,
        format: TextFormat,
    },
    /// A single headline candidate with its hook.
    Headline {
        headline: String,
        hook: Option<String>,
        style: Option<String>,
    },
    /// A generated image reference.
    Image {
        url: String,
        alt_text: Option<String>,
        style: Option<String>,
    },
    /// Structured payloads (research briefs, publish receipts) that
    /// downstream agents consume opaquely.
    Document {
        payload: serde_json::Value,
    },
}

impl StepOutput {
    /// Tag name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StepOutput::Text { .. } => "text",
            StepOutput::Headline { .. } => "headline",
            StepOutput::Image { .. } => "image",
            StepOutput::Document { .. } => "document",
        }
    }
}

/// Input handed to an executor when a step is dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInput {
    /// Editorial angle the workflow was started with.
    pub angle: SelectedAngle,
    /// Optional briefing text from workflow creation.
    pub briefing: Option<String>,
    /// Effective output of the preceding step, when one exists. When the
    /// predecessor offered options, this is the selected option.
    pub carried: Option<StepOutput>,
    /// Reviewer feedback injected when a rejection sends the step back.
    pub revision_notes: Option<String>,
    /// How many times this step has been re-run.
    pub retry_count: u32,
}

impl StepInput {
    /// Fresh input for a first dispatch.
    pub fn new(angle: SelectedAngle, briefing: Option<String>, carried: Option<StepOutput>) -> Self {
        Self {
            angle,
            briefing,
            carried,
            revision_notes: None,
            retry_count: 0,
        }
    }

    /// Input for a redo after rejection: same material, reviewer notes
    /// attached, retry counter bumped.
    pub fn for_revision(mut self, notes: String) -> Self {
        self.revision_notes = Some(notes);
        self.retry_count += 1;
        self
    }

    /// Input for a retry after failure.
    pub fn for_retry(mut self) -> Self {
        self.retry_count += 1;
        self
    }
}

/// A single step within a workflow.
///
/// Steps are materialized in `pending` when the workflow is created, one per
/// template entry, and only ever mutated by event application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub step_number: StepNumber,
    pub name: String,
    pub agent_role: AgentRole,
    pub requires_review: bool,
    pub offers_options: bool,
    pub status: StepStatus,
    pub input: Option<StepInput>,
    pub output: Option<StepOutput>,
    pub output_options: Vec<StepOutput>,
    pub selected_option_index: Option<usize>,
    pub error_message: Option<String>,
    pub thinking_line1: Option<String>,
    pub thinking_line2: Option<String>,
    pub started_at: Option<TimestampUtc>,
    pub completed_at: Option<TimestampUtc>,
    pub review_notes: Option<String>,
    pub reviewed_at: Option<TimestampUtc>,
    pub retry_count: u32,
}

impl WorkflowStep {
    /// Materializes a pending step from its template entry.
    pub fn pending(step_number: StepNumber, template: &StepTemplate) -> Self {
        Self {
            step_number,
            name: template.name.clone(),
            agent_role: template.agent_role,
            requires_review: template.requires_review,
            offers_options: template.offers_options,
            status: StepStatus::Pending,
            input: None,
            output: None,
            output_options: Vec::new(),
            selected_option_index: None,
            error_message: None,
            thinking_line1: None,
            thinking_line2: None,
            started_at: None,
            completed_at: None,
            review_notes: None,
            reviewed_at: None,
            retry_count: 0,
        }
    }

    /// True for pure human gates with no executor behind them.
    pub fn is_gate(&self) -> bool {
        !self.agent_role.is_agent()
    }

    /// The output that flows downstream: the selected option when the step
    /// offered a choice, otherwise the plain output.
    pub fn effective_output(&self) -> Option<&StepOutput> {
        match self.selected_option_index {
            Some(idx) => self.output_options.get(idx),
            None => self.output.as_ref(),
        }
    }

    // ---- Event application helpers, shared by the aggregate and the view ----

    /// Puts the step to work, replacing any earlier run's results.
    pub(crate) fn apply_dispatch(&mut self, input: StepInput, at: TimestampUtc) {
        self.retry_count = input.retry_count;
        self.input = Some(input);
        self.status = StepStatus::AgentWorking;
        self.started_at = Some(at);
        self.completed_at = None;
        self.output = None;
        self.output_options.clear();
        self.selected_option_index = None;
        self.error_message = None;
        self.thinking_line1 = None;
        self.thinking_line2 = None;
        self.review_notes = None;
        self.reviewed_at = None;
    }

    /// Resets a downstream step back to untouched pending.
    pub(crate) fn apply_reset(&mut self) {
        self.status = StepStatus::Pending;
        self.input = None;
        self.output = None;
        self.output_options.clear();
        self.selected_option_index = None;
        self.error_message = None;
        self.thinking_line1 = None;
        self.thinking_line2 = None;
        self.started_at = None;
        self.completed_at = None;
        self.review_notes = None;
        self.reviewed_at = None;
    }

    pub(crate) fn apply_progress(&mut self, line1: Option<String>, line2: Option<String>) {
        self.thinking_line1 = line1;
        self.thinking_line2 = line2;
    }

    pub(crate) fn apply_completed(&mut self, output: StepOutput, at: TimestampUtc) {
        self.status = StepStatus::Completed;
        self.output = Some(output);
        self.completed_at = Some(at);
        self.thinking_line1 = None;
        self.thinking_line2 = None;
    }

    /// Parks the step for human review. For pure gates this is the entry
    /// transition, so `started_at` is set here when missing.
    pub(crate) fn apply_awaiting_review(
        &mut self,
        output: Option<StepOutput>,
        options: Vec<StepOutput>,
        at: TimestampUtc,
    ) {
        self.status = StepStatus::AwaitingReview;
        self.output = output;
        self.output_options = options;
        self.selected_option_index = None;
        self.thinking_line1 = None;
        self.thinking_line2 = None;
        if self.started_at.is_none() {
            self.started_at = Some(at);
        }
    }

    pub(crate) fn apply_failed(&mut self, error: String, at: TimestampUtc) {
        self.status = StepStatus::Failed;
        self.error_message = Some(error);
        self.completed_at = Some(at);
        self.thinking_line1 = None;
        self.thinking_line2 = None;
    }

    pub(crate) fn apply_approved(
        &mut self,
        selected_option_index: Option<usize>,
        review_notes: Option<String>,
        at: TimestampUtc,
    ) {
        self.status = StepStatus::Approved;
        self.selected_option_index = selected_option_index;
        self.review_notes = review_notes;
        self.reviewed_at = Some(at);
        self.completed_at = Some(at);
    }

    pub(crate) fn apply_rejected(&mut self, review_notes: String, at: TimestampUtc) {
        self.status = StepStatus::Rejected;
        self.review_notes = Some(review_notes);
        self.reviewed_at = Some(at);
    }

    pub(crate) fn apply_skipped(&mut self) {
        self.status = StepStatus::Skipped;
    }
}
