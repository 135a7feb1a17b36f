//! Strongly typed domain primitives for the workflow aggregate.
//!
//! These newtypes provide type safety and semantic clarity for workflow
//! identifiers, step numbers, and provenance fields. They are used throughout
//! the domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a workflow.
/// Used as the aggregate_id in the event store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowId(pub Uuid);

impl WorkflowId {
    /// Creates a new random workflow ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a workflow ID from a string.
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for WorkflowId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 1-based step position within a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StepNumber(pub u32);

impl StepNumber {
    /// Creates the first step number.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the following step number.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Zero-based index into a step list.
    pub fn index(&self) -> usize {
        self.0.saturating_sub(1) as usize
    }
}

impl std::fmt::Display for StepNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Editorial angle selected for the piece.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedAngle(pub String);

impl SelectedAngle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SelectedAngle {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SelectedAngle {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of the research record the workflow was started from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResearchId(pub String);

impl ResearchId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResearchId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ResearchId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of the attributed author, when one is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthorId(pub String);

impl AuthorId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AuthorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AuthorId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// UTC timestamp for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampUtc(pub DateTime<Utc>);

impl TimestampUtc {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the timestamp as an RFC3339 string.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Whole seconds elapsed from this timestamp to `later` (0 when `later` precedes it).
    pub fn seconds_until(&self, later: TimestampUtc) -> u64 {
        (later.0 - self.0).num_seconds().max(0) as u64
    }
}

impl Default for TimestampUtc {
    fn default() -> Self {
        Self::now()
    }
}

/// Kind of content a workflow produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    BlogPost,
    SocialImage,
    XThread,
    LinkedinPost,
}

impl ContentType {
    /// Returns a human-readable label for this content type.
    pub fn label(&self) -> &'static str {
        match self {
            ContentType::BlogPost => "Blog Post",
            ContentType::SocialImage => "Social Media Image",
            ContentType::XThread => "X Thread",
            ContentType::LinkedinPost => "LinkedIn Post",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Overall workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    Pending,
    Active,
    PausedForReview,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Cancelled
        )
    }

    /// Returns a human-readable label for this status.
    pub fn label(&self) -> &'static str {
        match self {
            WorkflowStatus::Pending => "Pending",
            WorkflowStatus::Active => "Active",
            WorkflowStatus::PausedForReview => "Paused for Review",
            WorkflowStatus::Completed => "Completed",
            WorkflowStatus::Failed => "Failed",
            WorkflowStatus::Cancelled => "Cancelled",
        }
    }
}

/// Per-step status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    AgentWorking,
    AwaitingReview,
    Approved,
    Rejected,
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    /// True while the step occupies the workflow's single in-flight slot.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, StepStatus::AgentWorking | StepStatus::AwaitingReview)
    }

    /// Returns a human-readable label for this status.
    pub fn label(&self) -> &'static str {
        match self {
            StepStatus::Pending => "Pending",
            StepStatus::AgentWorking => "Agent Working",
            StepStatus::AwaitingReview => "Awaiting Review",
            StepStatus::Approved => "Approved",
            StepStatus::Rejected => "Rejected",
            StepStatus::Completed => "Completed",
            StepStatus::Failed => "Failed",
            StepStatus::Skipped => "Skipped",
        }
    }
}

/// Agent specialization a step dispatches to. `None` marks a pure human
/// review gate that no executor ever runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    None,
    SentimentScraper,
    NewsScraper,
    HeadlineGenerator,
    BlogWriter,
    ImageMaker,
    Copywriter,
    Humanizer,
    HtmlBuilder,
    SocialPublisher,
    GoogleDocsCreator,
}

impl AgentRole {
    /// True for roles backed by an executor.
    pub fn is_agent(&self) -> bool {
        !matches!(self, AgentRole::None)
    }

    /// Returns a human-readable label for this role.
    pub fn label(&self) -> &'static str {
        match self {
            AgentRole::None => "Review Gate",
            AgentRole::SentimentScraper => "Sentiment Scraper",
            AgentRole::NewsScraper => "News Scraper",
            AgentRole::HeadlineGenerator => "Headline Generator",
            AgentRole::BlogWriter => "Blog Writer",
            AgentRole::ImageMaker => "Image Maker",
            AgentRole::Copywriter => "Copywriter",
            AgentRole::Humanizer => "Humanizer",
            AgentRole::HtmlBuilder => "HTML Builder",
            AgentRole::SocialPublisher => "Social Publisher",
            AgentRole::GoogleDocsCreator => "Google Docs Creator",
        }
    }
}
