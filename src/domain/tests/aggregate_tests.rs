//! Unit tests for WorkflowAggregate command handling and event application.

use crate::domain::services::WorkflowServices;
use crate::domain::step::{StepInput, StepOutput, TextFormat};
use crate::domain::types::{
    AgentRole, ContentType, StepNumber, StepStatus, TimestampUtc, WorkflowStatus,
};
use crate::domain::WorkflowCommand;
use crate::domain::WorkflowEvent;
use crate::domain::{WorkflowAggregate, WorkflowData, WorkflowState};
use crate::template::StepTemplate;
use cqrs_es::Aggregate;

/// Create default services for testing.
fn test_services() -> WorkflowServices {
    WorkflowServices::default()
}

/// Five-step template: three agent steps (one reviewed with options), a pure
/// review gate, and a final publish step.
fn test_template() -> Vec<StepTemplate> {
    vec![
        StepTemplate::agent("Research", AgentRole::SentimentScraper),
        StepTemplate::agent("Write Draft", AgentRole::BlogWriter),
        StepTemplate::agent("Generate Headlines", AgentRole::HeadlineGenerator)
            .with_review()
            .with_options(),
        StepTemplate::gate("Content Review"),
        StepTemplate::agent("Publish", AgentRole::SocialPublisher),
    ]
}

/// Create a CreateWorkflow command with test defaults.
fn create_workflow_cmd() -> WorkflowCommand {
    WorkflowCommand::CreateWorkflow {
        content_type: ContentType::BlogPost,
        template: test_template(),
        selected_angle: "AI infrastructure costs".into(),
        source_research_id: "research-42".into(),
        briefing: Some("Focus on the economics".into()),
        author_id: None,
    }
}

fn text_output(body: &str) -> StepOutput {
    StepOutput::Text {
        body: body.into(),
        format: TextFormat::Markdown,
    }
}

fn headline_output(headline: &str) -> StepOutput {
    StepOutput::Headline {
        headline: headline.into(),
        hook: None,
        style: None,
    }
}

/// Aggregate with the test template created and step 1 dispatched.
fn created_aggregate() -> WorkflowAggregate {
    let mut agg = WorkflowAggregate::default();
    agg.apply(WorkflowEvent::WorkflowCreated {
        content_type: ContentType::BlogPost,
        template: test_template(),
        selected_angle: "AI infrastructure costs".into(),
        source_research_id: "research-42".into(),
        briefing: Some("Focus on the economics".into()),
        author_id: None,
        created_at: TimestampUtc::now(),
    });
    agg.apply(WorkflowEvent::StepDispatched {
        step_number: StepNumber::first(),
        input: StepInput::new(
            "AI infrastructure costs".into(),
            Some("Focus on the economics".into()),
            None,
        ),
        dispatched_at: TimestampUtc::now(),
    });
    agg
}

/// Apply all events produced by a command, in order.
fn apply_all(agg: &mut WorkflowAggregate, events: Vec<WorkflowEvent>) {
    for event in events {
        agg.apply(event);
    }
}

/// Drive the aggregate to the point where `upto` steps are completed and the
/// following step is dispatched (all steps assumed non-reviewed).
async fn complete_steps(agg: &mut WorkflowAggregate, upto: u32) {
    let services = test_services();
    for n in 1..=upto {
        let events = agg
            .handle(
                WorkflowCommand::ExecutorSucceeded {
                    step_number: StepNumber(n),
                    output: text_output(&format!("output {n}")),
                    options: Vec::new(),
                },
                &services,
            )
            .await
            .unwrap();
        apply_all(agg, events);
    }
}

/// Get data from an active aggregate (panics if not active).
fn get_data(agg: &WorkflowAggregate) -> &WorkflowData {
    match &agg.state {
        WorkflowState::Active(data) => data,
        _ => panic!("Expected Active state"),
    }
}

// ============================================================================
// CreateWorkflow Tests
// ============================================================================

#[tokio::test]
async fn create_workflow_emits_creation_and_first_dispatch() {
    let agg = WorkflowAggregate::default();
    let services = test_services();

    let events = agg.handle(create_workflow_cmd(), &services).await.unwrap();

    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], WorkflowEvent::WorkflowCreated { .. }));
    match &events[1] {
        WorkflowEvent::StepDispatched {
            step_number, input, ..
        } => {
            assert_eq!(*step_number, StepNumber::first());
            assert_eq!(input.angle.as_str(), "AI infrastructure costs");
            assert!(input.carried.is_none());
            assert_eq!(input.retry_count, 0);
        }
        other => panic!("Expected StepDispatched, got {other:?}"),
    }
}

#[tokio::test]
async fn create_workflow_rejects_template_starting_with_gate() {
    let agg = WorkflowAggregate::default();
    let services = test_services();

    let result = agg
        .handle(
            WorkflowCommand::CreateWorkflow {
                content_type: ContentType::XThread,
                template: vec![
                    StepTemplate::gate("Premature Review"),
                    StepTemplate::agent("Write", AgentRole::Copywriter),
                ],
                selected_angle: "angle".into(),
                source_research_id: "research-1".into(),
                briefing: None,
                author_id: None,
            },
            &services,
        )
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn create_workflow_on_active_fails() {
    let agg = created_aggregate();
    let services = test_services();

    let result = agg.handle(create_workflow_cmd(), &services).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn apply_workflow_created_materializes_pending_steps() {
    let mut agg = WorkflowAggregate::default();
    assert!(matches!(agg.state, WorkflowState::Uninitialized));

    agg.apply(WorkflowEvent::WorkflowCreated {
        content_type: ContentType::BlogPost,
        template: test_template(),
        selected_angle: "angle".into(),
        source_research_id: "research-7".into(),
        briefing: None,
        author_id: Some("author-3".into()),
        created_at: TimestampUtc::now(),
    });

    let data = get_data(&agg);
    assert_eq!(data.status(), WorkflowStatus::Pending);
    assert_eq!(data.steps().len(), 5);
    assert!(data
        .steps()
        .iter()
        .all(|s| s.status == StepStatus::Pending));
    assert_eq!(data.steps()[2].name, "Generate Headlines");
    assert!(data.steps()[2].requires_review);
    assert!(data.steps()[2].offers_options);
    assert!(data.steps()[3].is_gate());
    assert_eq!(data.author_id().map(|a| a.as_str()), Some("author-3"));
}

#[tokio::test]
async fn apply_first_dispatch_activates_workflow() {
    let agg = created_aggregate();

    let data = get_data(&agg);
    assert_eq!(data.status(), WorkflowStatus::Active);
    assert_eq!(data.current_step_number(), StepNumber(1));
    assert_eq!(
        data.step(StepNumber(1)).unwrap().status,
        StepStatus::AgentWorking
    );
}

// ============================================================================
// Executor Callback Tests
// ============================================================================

#[tokio::test]
async fn success_on_plain_step_completes_and_dispatches_next() {
    let agg = created_aggregate();
    let services = test_services();

    let events = agg
        .handle(
            WorkflowCommand::ExecutorSucceeded {
                step_number: StepNumber(1),
                output: text_output("research notes"),
                options: Vec::new(),
            },
            &services,
        )
        .await
        .unwrap();

    assert_eq!(events.len(), 2);
    assert!(matches!(
        events[0],
        WorkflowEvent::StepCompleted {
            step_number: StepNumber(1),
            ..
        }
    ));
    match &events[1] {
        WorkflowEvent::StepDispatched {
            step_number, input, ..
        } => {
            assert_eq!(*step_number, StepNumber(2));
            assert_eq!(input.carried, Some(text_output("research notes")));
        }
        other => panic!("Expected StepDispatched, got {other:?}"),
    }
}

#[tokio::test]
async fn success_on_reviewed_step_pauses_for_review() {
    let mut agg = created_aggregate();
    let services = test_services();
    complete_steps(&mut agg, 2).await;

    let events = agg
        .handle(
            WorkflowCommand::ExecutorSucceeded {
                step_number: StepNumber(3),
                output: headline_output("Headline A"),
                options: vec![headline_output("Headline A"), headline_output("Headline B")],
            },
            &services,
        )
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    match &events[0] {
        WorkflowEvent::StepAwaitingReview {
            step_number,
            output,
            output_options,
            ..
        } => {
            assert_eq!(*step_number, StepNumber(3));
            assert_eq!(*output, Some(headline_output("Headline A")));
            assert_eq!(output_options.len(), 2);
        }
        other => panic!("Expected StepAwaitingReview, got {other:?}"),
    }

    apply_all(&mut agg, events);
    let data = get_data(&agg);
    assert_eq!(data.status(), WorkflowStatus::PausedForReview);
    assert_eq!(
        data.step(StepNumber(3)).unwrap().status,
        StepStatus::AwaitingReview
    );
}

#[tokio::test]
async fn stale_success_for_step_not_in_flight_is_discarded() {
    let agg = created_aggregate();
    let services = test_services();

    // Step 2 is still pending; only step 1 is agent_working.
    let events = agg
        .handle(
            WorkflowCommand::ExecutorSucceeded {
                step_number: StepNumber(2),
                output: text_output("early bird"),
                options: Vec::new(),
            },
            &services,
        )
        .await
        .unwrap();

    assert!(events.is_empty());
}

#[tokio::test]
async fn stale_callback_after_cancellation_is_discarded() {
    let mut agg = created_aggregate();
    let services = test_services();

    agg.apply(WorkflowEvent::WorkflowCancelled {
        reason: "editor pulled the piece".into(),
        cancelled_at: TimestampUtc::now(),
    });

    let events = agg
        .handle(
            WorkflowCommand::ExecutorSucceeded {
                step_number: StepNumber(1),
                output: text_output("too late"),
                options: Vec::new(),
            },
            &services,
        )
        .await
        .unwrap();

    assert!(events.is_empty());
}

#[tokio::test]
async fn executor_failure_fails_step_and_workflow() {
    let mut agg = created_aggregate();
    let services = test_services();

    let events = agg
        .handle(
            WorkflowCommand::ExecutorFailed {
                step_number: StepNumber(1),
                error: "upstream API returned 500".into(),
            },
            &services,
        )
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], WorkflowEvent::StepFailed { .. }));

    apply_all(&mut agg, events);
    let data = get_data(&agg);
    assert_eq!(data.status(), WorkflowStatus::Failed);
    let step = data.step(StepNumber(1)).unwrap();
    assert_eq!(step.status, StepStatus::Failed);
    assert_eq!(
        step.error_message.as_deref(),
        Some("upstream API returned 500")
    );
}

#[tokio::test]
async fn progress_updates_thinking_lines_without_status_change() {
    let mut agg = created_aggregate();
    let services = test_services();

    let events = agg
        .handle(
            WorkflowCommand::ExecutorProgress {
                step_number: StepNumber(1),
                line1: Some("Scanning mentions".into()),
                line2: Some("214 posts so far".into()),
            },
            &services,
        )
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    apply_all(&mut agg, events);

    let data = get_data(&agg);
    let step = data.step(StepNumber(1)).unwrap();
    assert_eq!(step.status, StepStatus::AgentWorking);
    assert_eq!(step.thinking_line1.as_deref(), Some("Scanning mentions"));
    assert_eq!(step.thinking_line2.as_deref(), Some("214 posts so far"));
}

// ============================================================================
// Completion Tests
// ============================================================================

#[tokio::test]
async fn final_step_success_completes_workflow() {
    let mut agg = created_aggregate();
    let services = test_services();
    complete_steps(&mut agg, 2).await;

    // Step 3 pauses for review; approve it through the gate at 4.
    let events = agg
        .handle(
            WorkflowCommand::ExecutorSucceeded {
                step_number: StepNumber(3),
                output: headline_output("The One"),
                options: Vec::new(),
            },
            &services,
        )
        .await
        .unwrap();
    apply_all(&mut agg, events);

    let events = agg
        .handle(
            WorkflowCommand::ApproveStep {
                step_number: StepNumber(3),
                review_notes: None,
                selected_option: None,
            },
            &services,
        )
        .await
        .unwrap();
    apply_all(&mut agg, events);

    // The gate at 4 is now awaiting review; approving it dispatches 5.
    let events = agg
        .handle(
            WorkflowCommand::ApproveStep {
                step_number: StepNumber(4),
                review_notes: Some("ship it".into()),
                selected_option: None,
            },
            &services,
        )
        .await
        .unwrap();
    apply_all(&mut agg, events);
    assert_eq!(
        get_data(&agg).step(StepNumber(5)).unwrap().status,
        StepStatus::AgentWorking
    );

    // Final step succeeds; no step 6 exists so the workflow completes.
    let events = agg
        .handle(
            WorkflowCommand::ExecutorSucceeded {
                step_number: StepNumber(5),
                output: text_output("published"),
                options: Vec::new(),
            },
            &services,
        )
        .await
        .unwrap();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[1], WorkflowEvent::WorkflowCompleted { .. }));

    apply_all(&mut agg, events);
    let data = get_data(&agg);
    assert_eq!(data.status(), WorkflowStatus::Completed);
    assert!(data.completed_at().is_some());
    // Position parks one past the last step.
    assert_eq!(data.current_step_number(), StepNumber(6));
}

#[tokio::test]
async fn events_carry_the_injected_clock() {
    let agg = created_aggregate();
    let frozen = TimestampUtc(chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap());
    let services = WorkflowServices::pinned(frozen);

    let events = agg
        .handle(
            WorkflowCommand::ExecutorSucceeded {
                step_number: StepNumber(1),
                output: text_output("research notes"),
                options: Vec::new(),
            },
            &services,
        )
        .await
        .unwrap();

    match &events[0] {
        WorkflowEvent::StepCompleted { completed_at, .. } => assert_eq!(*completed_at, frozen),
        other => panic!("Expected StepCompleted, got {other:?}"),
    }
    match &events[1] {
        WorkflowEvent::StepDispatched { dispatched_at, .. } => assert_eq!(*dispatched_at, frozen),
        other => panic!("Expected StepDispatched, got {other:?}"),
    }
}

#[tokio::test]
async fn completed_workflow_accepts_no_further_transitions() {
    let mut agg = created_aggregate();
    let services = test_services();
    complete_steps(&mut agg, 2).await;
    let events = agg
        .handle(
            WorkflowCommand::ExecutorSucceeded {
                step_number: StepNumber(3),
                output: headline_output("The One"),
                options: Vec::new(),
            },
            &services,
        )
        .await
        .unwrap();
    apply_all(&mut agg, events);
    for gate in [StepNumber(3), StepNumber(4)] {
        let events = agg
            .handle(
                WorkflowCommand::ApproveStep {
                    step_number: gate,
                    review_notes: None,
                    selected_option: None,
                },
                &services,
            )
            .await
            .unwrap();
        apply_all(&mut agg, events);
    }
    let events = agg
        .handle(
            WorkflowCommand::ExecutorSucceeded {
                step_number: StepNumber(5),
                output: text_output("published"),
                options: Vec::new(),
            },
            &services,
        )
        .await
        .unwrap();
    apply_all(&mut agg, events);
    assert_eq!(get_data(&agg).status(), WorkflowStatus::Completed);
    let frozen = get_data(&agg).steps().to_vec();

    // Late executor callbacks are discarded without events.
    let events = agg
        .handle(
            WorkflowCommand::ExecutorSucceeded {
                step_number: StepNumber(5),
                output: text_output("second delivery"),
                options: Vec::new(),
            },
            &services,
        )
        .await
        .unwrap();
    assert!(events.is_empty());

    // Review decisions are refused outright.
    for step in [StepNumber(3), StepNumber(4)] {
        assert!(agg
            .handle(
                WorkflowCommand::ApproveStep {
                    step_number: step,
                    review_notes: None,
                    selected_option: None,
                },
                &services,
            )
            .await
            .is_err());
        assert!(agg
            .handle(
                WorkflowCommand::RejectStep {
                    step_number: step,
                    review_notes: "too late".into(),
                },
                &services,
            )
            .await
            .is_err());
    }

    // Nothing moved.
    assert_eq!(get_data(&agg).steps(), frozen.as_slice());
    assert_eq!(get_data(&agg).status(), WorkflowStatus::Completed);
}

// ============================================================================
// RetryStep Tests
// ============================================================================

#[tokio::test]
async fn retry_failed_step_redispatches_with_bumped_counter() {
    let mut agg = created_aggregate();
    let services = test_services();

    agg.apply(WorkflowEvent::StepFailed {
        step_number: StepNumber(1),
        error: "timeout".into(),
        failed_at: TimestampUtc::now(),
    });

    let events = agg
        .handle(
            WorkflowCommand::RetryStep {
                step_number: StepNumber(1),
            },
            &services,
        )
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    match &events[0] {
        WorkflowEvent::StepDispatched {
            step_number, input, ..
        } => {
            assert_eq!(*step_number, StepNumber(1));
            assert_eq!(input.retry_count, 1);
        }
        other => panic!("Expected StepDispatched, got {other:?}"),
    }

    apply_all(&mut agg, events);
    let data = get_data(&agg);
    assert_eq!(data.status(), WorkflowStatus::Active);
    let step = data.step(StepNumber(1)).unwrap();
    assert_eq!(step.status, StepStatus::AgentWorking);
    assert!(step.error_message.is_none());
    assert_eq!(step.retry_count, 1);
}

#[tokio::test]
async fn retry_non_failed_step_is_rejected() {
    let agg = created_aggregate();
    let services = test_services();

    let result = agg
        .handle(
            WorkflowCommand::RetryStep {
                step_number: StepNumber(1),
            },
            &services,
        )
        .await;

    assert!(result.is_err());
}

// ============================================================================
// CancelWorkflow Tests
// ============================================================================

#[tokio::test]
async fn cancel_skips_open_steps_and_records_reason() {
    let mut agg = created_aggregate();
    let services = test_services();
    complete_steps(&mut agg, 1).await;

    let events = agg
        .handle(
            WorkflowCommand::CancelWorkflow {
                reason: "story overtaken by events".into(),
            },
            &services,
        )
        .await
        .unwrap();
    apply_all(&mut agg, events);

    let data = get_data(&agg);
    assert_eq!(data.status(), WorkflowStatus::Cancelled);
    assert_eq!(
        data.cancel_reason().map(String::as_str),
        Some("story overtaken by events")
    );
    // Step 1 finished before the cancel and keeps its status.
    assert_eq!(
        data.step(StepNumber(1)).unwrap().status,
        StepStatus::Completed
    );
    for n in 2..=5 {
        assert_eq!(
            data.step(StepNumber(n)).unwrap().status,
            StepStatus::Skipped
        );
    }
}

#[tokio::test]
async fn cancel_terminal_workflow_fails() {
    let mut agg = created_aggregate();
    let services = test_services();

    agg.apply(WorkflowEvent::WorkflowCancelled {
        reason: "first cancel".into(),
        cancelled_at: TimestampUtc::now(),
    });

    let result = agg
        .handle(
            WorkflowCommand::CancelWorkflow {
                reason: "second cancel".into(),
            },
            &services,
        )
        .await;

    assert!(result.is_err());
}

// ============================================================================
// Uninitialized / Re-dispatch Tests
// ============================================================================

#[tokio::test]
async fn commands_on_uninitialized_aggregate_fail() {
    let agg = WorkflowAggregate::default();
    let services = test_services();

    let result = agg
        .handle(
            WorkflowCommand::ExecutorSucceeded {
                step_number: StepNumber(1),
                output: text_output("orphan"),
                options: Vec::new(),
            },
            &services,
        )
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn redispatch_resets_downstream_steps() {
    let mut agg = created_aggregate();
    complete_steps(&mut agg, 2).await;
    assert_eq!(
        get_data(&agg).step(StepNumber(2)).unwrap().status,
        StepStatus::Completed
    );

    // Re-dispatching step 1 invalidates everything built on its output.
    agg.apply(WorkflowEvent::StepDispatched {
        step_number: StepNumber(1),
        input: StepInput::new("angle".into(), None, None),
        dispatched_at: TimestampUtc::now(),
    });

    let data = get_data(&agg);
    assert_eq!(data.current_step_number(), StepNumber(1));
    assert_eq!(
        data.step(StepNumber(1)).unwrap().status,
        StepStatus::AgentWorking
    );
    let second = data.step(StepNumber(2)).unwrap();
    assert_eq!(second.status, StepStatus::Pending);
    assert!(second.output.is_none());
    assert!(second.input.is_none());
}
