//! Per-camera escalation state machine.
//!
//! Each camera stream owns one [`CameraStreamState`]. Every processed frame
//! feeds a single boolean ("was an accident detected?") into
//! [`CameraStreamState::observe`], which debounces the signal and reports
//! when an incident should be raised. Only the pure decision lives here;
//! capturing evidence and persisting the incident is the caller's job.
//!
//! Lifecycle:
//!
//! ```text
//! Quiet ──positive──▶ Accumulating ──10th positive──▶ Escalated
//!   ▲                                                    │
//!   └──────────────── 30 consecutive negatives ──────────┘
//! ```
//!
//! Negatives do not clear the positive run on their own. A run of positives
//! interrupted by fewer than `reset_after` negatives keeps counting where it
//! left off, which suppresses alert flapping near the edge of an ongoing
//! accident.

use serde::Serialize;

use crate::types::Timestamp;

/// Consecutive positive frames required before an incident is raised.
pub const DEFAULT_ESCALATE_AFTER: u32 = 10;

/// Consecutive negative frames that re-arm a camera for a new episode.
pub const DEFAULT_RESET_AFTER: u32 = 30;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Debounce thresholds for the escalation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EscalationPolicy {
    pub escalate_after: u32,
    pub reset_after: u32,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            escalate_after: DEFAULT_ESCALATE_AFTER,
            reset_after: DEFAULT_RESET_AFTER,
        }
    }
}

// ---------------------------------------------------------------------------
// Phase / Decision
// ---------------------------------------------------------------------------

/// Coarse lifecycle phase derived from the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Quiet,
    Accumulating,
    Escalated,
}

/// Outcome of feeding one frame into the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Nothing to do beyond updating counters.
    Continue,
    /// This frame completed the positive run: raise exactly one incident.
    Escalate,
    /// The quiet period elapsed and the camera is armed for a new episode.
    Rearm,
}

// ---------------------------------------------------------------------------
// CameraStreamState
// ---------------------------------------------------------------------------

/// Mutable per-camera detection state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraStreamState {
    pub consecutive_accidents: u32,
    pub alert_triggered: bool,
    pub accident_free_frames: u32,
    pub last_detected_at: Option<Timestamp>,
    /// Human-readable camera address, fixed when the state is created.
    pub location: String,
    /// Public URL of the evidence screenshot for the current episode.
    pub evidence_url: Option<String>,
}

impl CameraStreamState {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            consecutive_accidents: 0,
            alert_triggered: false,
            accident_free_frames: 0,
            last_detected_at: None,
            location: location.into(),
            evidence_url: None,
        }
    }

    /// Apply one frame's detection outcome.
    ///
    /// Must be called in frame arrival order; the result depends on run
    /// length, not on the multiset of outcomes.
    pub fn observe(&mut self, detected: bool, now: Timestamp, policy: EscalationPolicy) -> Decision {
        if detected {
            self.consecutive_accidents = self.consecutive_accidents.saturating_add(1);
            self.accident_free_frames = 0;
            self.last_detected_at = Some(now);

            if self.consecutive_accidents >= policy.escalate_after && !self.alert_triggered {
                self.alert_triggered = true;
                return Decision::Escalate;
            }
            return Decision::Continue;
        }

        self.accident_free_frames = self.accident_free_frames.saturating_add(1);
        if self.accident_free_frames >= policy.reset_after {
            self.consecutive_accidents = 0;
            self.alert_triggered = false;
            self.accident_free_frames = 0;
            self.evidence_url = None;
            return Decision::Rearm;
        }
        Decision::Continue
    }

    /// Store the evidence URL captured for the current episode.
    pub fn attach_evidence(&mut self, url: Option<String>) {
        self.evidence_url = url;
    }

    pub fn phase(&self) -> Phase {
        if self.alert_triggered {
            Phase::Escalated
        } else if self.consecutive_accidents == 0 {
            Phase::Quiet
        } else {
            Phase::Accumulating
        }
    }

    /// Copy of the state suitable for returning from the API.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            phase: self.phase(),
            state: self.clone(),
        }
    }
}

/// Read-only view of a camera's state plus its derived phase.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub phase: Phase,
    #[serde(flatten)]
    pub state: CameraStreamState,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn feed(state: &mut CameraStreamState, outcomes: &[bool]) -> Vec<Decision> {
        let policy = EscalationPolicy::default();
        outcomes
            .iter()
            .map(|&detected| state.observe(detected, Utc::now(), policy))
            .collect()
    }

    fn escalations(decisions: &[Decision]) -> usize {
        decisions
            .iter()
            .filter(|d| **d == Decision::Escalate)
            .count()
    }

    #[test]
    fn nine_positives_do_not_escalate() {
        let mut state = CameraStreamState::new("Main St");
        let decisions = feed(&mut state, &[true; 9]);

        assert_eq!(escalations(&decisions), 0);
        assert_eq!(state.consecutive_accidents, 9);
        assert!(!state.alert_triggered);
        assert_eq!(state.phase(), Phase::Accumulating);
    }

    #[test]
    fn tenth_positive_escalates_exactly_once() {
        let mut state = CameraStreamState::new("Main St");
        let decisions = feed(&mut state, &[true; 10]);

        assert_eq!(escalations(&decisions), 1);
        assert_eq!(decisions[9], Decision::Escalate);
        assert!(state.alert_triggered);
        assert_eq!(state.phase(), Phase::Escalated);
    }

    #[test]
    fn twenty_positives_still_escalate_once() {
        let mut state = CameraStreamState::new("Main St");
        let decisions = feed(&mut state, &[true; 20]);

        assert_eq!(escalations(&decisions), 1);
        assert_eq!(state.consecutive_accidents, 20);
    }

    #[test]
    fn short_negative_gap_keeps_the_run() {
        let mut state = CameraStreamState::new("Main St");
        feed(&mut state, &[true; 6]);
        feed(&mut state, &[false; 29]);
        assert_eq!(state.consecutive_accidents, 6);
        assert_eq!(state.accident_free_frames, 29);

        let decisions = feed(&mut state, &[true; 4]);
        assert_eq!(decisions[3], Decision::Escalate);
        assert_eq!(state.accident_free_frames, 0);
    }

    #[test]
    fn thirty_negatives_rearm_after_escalation() {
        let mut state = CameraStreamState::new("Main St");
        feed(&mut state, &[true; 10]);
        state.attach_evidence(Some("https://bucket/cam_1.jpg".into()));

        let decisions = feed(&mut state, &[false; 30]);
        assert_eq!(decisions[29], Decision::Rearm);
        assert_eq!(state.consecutive_accidents, 0);
        assert_eq!(state.accident_free_frames, 0);
        assert!(!state.alert_triggered);
        assert!(state.evidence_url.is_none());
        assert_eq!(state.phase(), Phase::Quiet);
    }

    #[test]
    fn second_episode_raises_second_incident() {
        let mut state = CameraStreamState::new("Main St");
        let mut outcomes = vec![true; 10];
        outcomes.extend([false; 30]);
        outcomes.extend([true; 10]);

        let decisions = feed(&mut state, &outcomes);
        assert_eq!(escalations(&decisions), 2);
        assert_eq!(decisions[49], Decision::Escalate);
    }

    #[test]
    fn positives_reset_the_quiet_counter() {
        let mut state = CameraStreamState::new("Main St");
        feed(&mut state, &[false; 12]);
        feed(&mut state, &[true]);
        assert_eq!(state.accident_free_frames, 0);
        assert!(state.last_detected_at.is_some());
    }

    #[test]
    fn custom_policy_thresholds_apply() {
        let policy = EscalationPolicy {
            escalate_after: 2,
            reset_after: 3,
        };
        let mut state = CameraStreamState::new("Depot");
        let now = Utc::now();

        assert_eq!(state.observe(true, now, policy), Decision::Continue);
        assert_eq!(state.observe(true, now, policy), Decision::Escalate);
        assert_eq!(state.observe(false, now, policy), Decision::Continue);
        assert_eq!(state.observe(false, now, policy), Decision::Continue);
        assert_eq!(state.observe(false, now, policy), Decision::Rearm);
    }

    #[test]
    fn snapshot_serializes_phase_alongside_counters() {
        let mut state = CameraStreamState::new("Main St");
        feed(&mut state, &[true; 3]);

        let json = serde_json::to_value(state.snapshot()).unwrap();
        assert_eq!(json["phase"], "accumulating");
        assert_eq!(json["consecutive_accidents"], 3);
        assert_eq!(json["location"], "Main St");
    }
}
