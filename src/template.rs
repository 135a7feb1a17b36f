//! Workflow templates and the template registry.
//!
//! A template is an ordered list of step definitions. Workflows snapshot the
//! resolved template at creation, so registry edits never affect in-flight
//! workflows.

use crate::domain::types::{AgentRole, ContentType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// One step definition within a workflow template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTemplate {
    pub name: String,
    pub agent_role: AgentRole,
    /// Pause for human approval once output is produced (or, for gates,
    /// as soon as the pipeline reaches the step).
    pub requires_review: bool,
    /// Step presents alternatives the reviewer picks from.
    pub offers_options: bool,
}

impl StepTemplate {
    /// An executor-backed step.
    pub fn agent(name: &str, agent_role: AgentRole) -> Self {
        Self {
            name: name.to_string(),
            agent_role,
            requires_review: false,
            offers_options: false,
        }
    }

    /// A pure human review gate. No executor runs; the pipeline pauses here.
    pub fn gate(name: &str) -> Self {
        Self {
            name: name.to_string(),
            agent_role: AgentRole::None,
            requires_review: true,
            offers_options: false,
        }
    }

    pub fn with_review(mut self) -> Self {
        self.requires_review = true;
        self
    }

    pub fn with_options(mut self) -> Self {
        self.offers_options = true;
        self
    }
}

/// Ordered step definitions for one content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub name: String,
    pub content_type: ContentType,
    pub steps: Vec<StepTemplate>,
}

impl WorkflowTemplate {
    pub fn new(name: &str, content_type: ContentType, steps: Vec<StepTemplate>) -> Self {
        Self {
            name: name.to_string(),
            content_type,
            steps,
        }
    }

    /// Checks structural requirements: at least one step, an agent step
    /// first (a gate needs content to review), and every gate preceded by
    /// at least one producing step.
    pub fn validate(&self) -> Result<(), TemplateError> {
        let Some(first) = self.steps.first() else {
            return Err(TemplateError::EmptyTemplate {
                name: self.name.clone(),
            });
        };
        if !first.agent_role.is_agent() {
            return Err(TemplateError::GateWithoutProducer {
                name: self.name.clone(),
                step_number: 1,
            });
        }
        for (idx, step) in self.steps.iter().enumerate() {
            let has_producer = self.steps[..idx].iter().any(|s| s.agent_role.is_agent());
            if !step.agent_role.is_agent() && !has_producer {
                return Err(TemplateError::GateWithoutProducer {
                    name: self.name.clone(),
                    step_number: idx as u32 + 1,
                });
            }
        }
        Ok(())
    }
}

/// Template configuration errors. These are fatal configuration problems,
/// never user-facing review errors.
#[derive(Debug, Clone)]
pub enum TemplateError {
    UnknownContentType { content_type: ContentType },
    EmptyTemplate { name: String },
    GateWithoutProducer { name: String, step_number: u32 },
}

impl Display for TemplateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownContentType { content_type } => {
                write!(f, "no template registered for content type '{}'", content_type)
            }
            Self::EmptyTemplate { name } => write!(f, "template '{}' has no steps", name),
            Self::GateWithoutProducer { name, step_number } => write!(
                f,
                "template '{}' step {} is a review gate with no producing step before it",
                name, step_number
            ),
        }
    }
}

impl std::error::Error for TemplateError {}

/// Registry of workflow templates keyed by content type.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: HashMap<ContentType, WorkflowTemplate>,
}

impl TemplateRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Registry pre-loaded with the four production pipelines.
    pub fn builtin() -> Self {
        let mut templates = HashMap::new();
        for template in builtin_templates() {
            debug_assert!(template.validate().is_ok(), "builtin template invalid");
            templates.insert(template.content_type, template);
        }
        Self { templates }
    }

    /// Registers (or replaces) a template after validating it.
    pub fn register(&mut self, template: WorkflowTemplate) -> Result<(), TemplateError> {
        template.validate()?;
        self.templates.insert(template.content_type, template);
        Ok(())
    }

    /// Looks up the template for a content type.
    pub fn resolve(&self, content_type: ContentType) -> Result<&WorkflowTemplate, TemplateError> {
        self.templates
            .get(&content_type)
            .ok_or(TemplateError::UnknownContentType { content_type })
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_templates() -> Vec<WorkflowTemplate> {
    vec![
        WorkflowTemplate::new(
            "Blog Post",
            ContentType::BlogPost,
            vec![
                StepTemplate::agent("Sentiment Scraping", AgentRole::SentimentScraper),
                StepTemplate::agent("News & Knowledge Scraping", AgentRole::NewsScraper),
                StepTemplate::agent("Headline Generation", AgentRole::HeadlineGenerator)
                    .with_review()
                    .with_options(),
                StepTemplate::agent("Blog Writing", AgentRole::BlogWriter),
                StepTemplate::agent("Image Generation", AgentRole::ImageMaker),
                StepTemplate::gate("Content Review"),
                StepTemplate::agent("Create Legal Review Doc", AgentRole::GoogleDocsCreator),
                StepTemplate::gate("Legal Review"),
                StepTemplate::agent("HTML Page Build", AgentRole::HtmlBuilder),
                StepTemplate::gate("Design Review"),
                StepTemplate::agent("Publish", AgentRole::SocialPublisher),
            ],
        ),
        WorkflowTemplate::new(
            "Social Media Image",
            ContentType::SocialImage,
            vec![
                StepTemplate::agent("Headline Generation", AgentRole::HeadlineGenerator),
                StepTemplate::agent("Image Creation", AgentRole::ImageMaker),
                StepTemplate::agent("Copywriting", AgentRole::Copywriter),
                StepTemplate::gate("Final Review"),
                StepTemplate::agent("Publish", AgentRole::SocialPublisher),
            ],
        ),
        WorkflowTemplate::new(
            "X Thread",
            ContentType::XThread,
            vec![
                StepTemplate::agent("Thread Outline", AgentRole::BlogWriter),
                StepTemplate::agent("Thread Writing", AgentRole::BlogWriter),
                StepTemplate::gate("Thread Review"),
                StepTemplate::agent("Publish", AgentRole::SocialPublisher),
            ],
        ),
        WorkflowTemplate::new(
            "LinkedIn Post",
            ContentType::LinkedinPost,
            vec![
                StepTemplate::agent("Post Angles", AgentRole::HeadlineGenerator),
                StepTemplate::agent("Post Writing", AgentRole::BlogWriter),
                StepTemplate::agent("Humanization", AgentRole::Humanizer),
                StepTemplate::gate("Post Review"),
                StepTemplate::agent("Publish", AgentRole::SocialPublisher),
            ],
        ),
    ]
}
