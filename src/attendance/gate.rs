//! The punch state machine.
//!
//! Business states are the five [`AttendanceStage`]s. On top of them sit two
//! transient states: `submitting` while a punch is on the wire and `error`
//! after one failed. `unresolved` and `blocked` mean no stage can be trusted
//! yet, so nothing is admissible until the next refresh.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::attendance::resolver::Resolution;
use crate::error::AttendanceError;
use crate::model::attendance::{Punch, PunchAction};
use crate::model::stage::AttendanceStage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPunch {
    pub id: Uuid,
    pub punch: Punch,
    /// Stage the gate left when this punch went out.
    pub from: AttendanceStage,
    pub attempted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Unresolved,
    Blocked(String),
    Settled(AttendanceStage),
    Submitting(PendingPunch),
    Failed { stage: AttendanceStage, reason: String },
}

impl GateState {
    pub fn name(&self) -> &'static str {
        match self {
            GateState::Unresolved => "unresolved",
            GateState::Blocked(_) => "blocked",
            GateState::Settled(_) => "settled",
            GateState::Submitting(_) => "submitting",
            GateState::Failed { .. } => "error",
        }
    }
}

#[derive(Debug)]
pub struct PunchGate {
    state: GateState,
}

impl Default for PunchGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PunchGate {
    pub fn new() -> Self {
        Self {
            state: GateState::Unresolved,
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.state, GateState::Submitting(_))
    }

    /// Business stage, if one is known. While submitting this is the stage left behind.
    pub fn stage(&self) -> Option<AttendanceStage> {
        match &self.state {
            GateState::Settled(stage) | GateState::Failed { stage, .. } => Some(*stage),
            GateState::Submitting(pending) => Some(pending.from),
            GateState::Unresolved | GateState::Blocked(_) => None,
        }
    }

    /// The punch that would be admitted right now.
    pub fn next_action(&self) -> Option<Punch> {
        match &self.state {
            GateState::Settled(stage) | GateState::Failed { stage, .. } => stage.next_action(),
            _ => None,
        }
    }

    /// Load a freshly resolved stage. Refused while a punch is on the wire.
    pub fn configure(&mut self, resolution: Resolution) -> bool {
        self.replace(GateState::Settled(resolution.stage))
    }

    /// Record that the server's data cannot be trusted.
    pub fn block(&mut self, reason: impl Into<String>) -> bool {
        self.replace(GateState::Blocked(reason.into()))
    }

    /// Forget the stage, e.g. when the record could not be fetched.
    pub fn unresolve(&mut self) -> bool {
        self.replace(GateState::Unresolved)
    }

    fn replace(&mut self, next: GateState) -> bool {
        if let GateState::Submitting(pending) = &self.state {
            debug!(attempt = %pending.id, "Gate busy, keeping submitting state");
            return false;
        }
        self.state = next;
        true
    }

    /// Admit `requested` or reject it without touching the network.
    pub fn begin(
        &mut self,
        requested: Punch,
        attempted_at: DateTime<Utc>,
    ) -> Result<PendingPunch, AttendanceError> {
        let stage = match &self.state {
            GateState::Settled(stage) | GateState::Failed { stage, .. } => *stage,
            GateState::Submitting(_) => {
                return Err(AttendanceError::InvalidTransition(
                    "a punch is already being submitted".into(),
                ));
            }
            GateState::Unresolved => {
                return Err(AttendanceError::InvalidTransition(
                    "attendance status has not been loaded; refresh and try again".into(),
                ));
            }
            GateState::Blocked(reason) => {
                return Err(AttendanceError::InvalidTransition(format!(
                    "punching is disabled until the record is corrected: {reason}"
                )));
            }
        };

        let Some(expected) = stage.next_action() else {
            return Err(AttendanceError::InvalidTransition(
                "today's attendance is already complete".into(),
            ));
        };
        if requested != expected {
            return Err(AttendanceError::InvalidTransition(rejection(requested, expected)));
        }

        let pending = PendingPunch {
            id: Uuid::new_v4(),
            punch: requested,
            from: stage,
            attempted_at,
        };
        self.state = GateState::Submitting(pending.clone());
        Ok(pending)
    }

    /// The server accepted `pending`; move to the following stage.
    pub fn succeed(&mut self, pending: &PendingPunch) -> AttendanceStage {
        self.expect_pending(pending);
        let next = pending.from.successor().unwrap_or(AttendanceStage::Complete);
        self.state = GateState::Settled(next);
        next
    }

    /// The punch failed; fall back onto the stage it left. The same punch stays legal.
    pub fn fail(&mut self, pending: &PendingPunch, reason: impl Into<String>) {
        self.expect_pending(pending);
        self.state = GateState::Failed {
            stage: pending.from,
            reason: reason.into(),
        };
    }

    /// The server says the day has moved on; jump straight to its stage.
    pub fn reconcile(&mut self, pending: &PendingPunch, server: Resolution) {
        self.expect_pending(pending);
        self.state = GateState::Settled(server.stage);
    }

    fn expect_pending(&self, pending: &PendingPunch) {
        match &self.state {
            GateState::Submitting(current) if current.id == pending.id => {}
            other => warn!(attempt = %pending.id, state = other.name(), "Settling a punch the gate was not waiting for"),
        }
    }
}

fn rejection(requested: Punch, expected: Punch) -> String {
    match (requested.action, expected.action) {
        (PunchAction::Out, PunchAction::In) => "you must punch IN before OUT".to_string(),
        (PunchAction::In, PunchAction::Out) => {
            format!("you must punch OUT of the {} session first", expected.session)
        }
        _ => format!("the next allowed action is {expected}"),
    }
}
