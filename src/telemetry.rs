//! Step activity telemetry.
//!
//! Stats are collected from the view, never stored: they are deterministic
//! in the event log and the clock, and monotonically non-decreasing as
//! steps complete. Review gates contribute nothing to agent time.

use crate::domain::types::{AgentRole, StepNumber, StepStatus, TimestampUtc};
use crate::domain::view::WorkflowView;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maps seconds of agent work to seconds of human work saved.
///
/// The default rate values one agent-second at five minutes of equivalent
/// human effort; individual roles can be tuned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanTimeTable {
    /// Seconds saved per agent-second when a role has no specific entry.
    pub default_seconds_saved: u64,
    /// Per-role overrides.
    pub per_role: HashMap<AgentRole, u64>,
}

impl Default for HumanTimeTable {
    fn default() -> Self {
        Self {
            default_seconds_saved: 300,
            per_role: HashMap::new(),
        }
    }
}

impl HumanTimeTable {
    /// Seconds saved per agent-second for a role. Gates save nothing.
    pub fn rate_for(&self, role: AgentRole) -> u64 {
        if !role.is_agent() {
            return 0;
        }
        self.per_role
            .get(&role)
            .copied()
            .unwrap_or(self.default_seconds_saved)
    }
}

/// One row of the activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub step_number: StepNumber,
    pub name: String,
    pub status: StepStatus,
    pub duration_seconds: u64,
}

/// Point-in-time stats for one workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStats {
    /// Wall-clock seconds since creation (frozen at completion).
    pub elapsed_seconds: u64,
    /// Agent steps in order, with their run durations. In-flight steps show
    /// elapsed-so-far.
    pub activity_log: Vec<ActivityEntry>,
    /// Total seconds agents spent on runs that finished.
    pub total_agent_seconds: u64,
    /// Estimated human time saved by finished runs, per the time table.
    pub time_saved_seconds: u64,
}

impl WorkflowStats {
    /// Collects stats from a view at `now`.
    pub fn collect(view: &WorkflowView, table: &HumanTimeTable, now: TimestampUtc) -> Self {
        let elapsed_seconds = view
            .created_at()
            .map(|created| {
                let end = view.completed_at().unwrap_or(now);
                created.seconds_until(end)
            })
            .unwrap_or(0);

        let mut activity_log = Vec::new();
        let mut total_agent_seconds = 0u64;
        let mut time_saved_seconds = 0u64;

        for step in view.steps() {
            if !step.agent_role.is_agent() {
                continue;
            }

            let duration_seconds = match (step.started_at, step.completed_at) {
                (Some(start), Some(end)) => start.seconds_until(end),
                // Still running: show elapsed so far.
                (Some(start), None) => start.seconds_until(now),
                _ => 0,
            };

            // Only finished runs accumulate; an in-flight duration would be
            // re-counted (or lost to a rejection redo) on the next collect.
            if step.started_at.is_some() && step.completed_at.is_some() {
                total_agent_seconds += duration_seconds;
                time_saved_seconds += duration_seconds * table.rate_for(step.agent_role);
            }

            activity_log.push(ActivityEntry {
                step_number: step.step_number,
                name: step.name.clone(),
                status: step.status,
                duration_seconds,
            });
        }

        Self {
            elapsed_seconds,
            activity_log,
            total_agent_seconds,
            time_saved_seconds,
        }
    }
}

#[cfg(test)]
#[path = "tests/telemetry_tests.rs"]
mod tests;
