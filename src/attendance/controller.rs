use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::attendance::gate::{GateState, PunchGate};
use crate::attendance::resolver::{Resolution, resolve};
use crate::attendance::session::{Activity, AttendanceSession, Identity};
use crate::attendance::submitter::PunchSubmitter;
use crate::clock::ClockSync;
use crate::error::AttendanceError;
use crate::model::attendance::{AttendanceRecord, Punch, PunchAction, Session};
use crate::model::stage::AttendanceStage;
use crate::upstream::AttendanceApi;

/// Everything the punch surface renders.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceStatus {
    pub open: bool,
    #[schema(example = "EMP001")]
    pub employee_id: Option<String>,
    #[schema(example = "Asha Rao")]
    pub employee_name: Option<String>,
    #[schema(example = "2026-10-18", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    pub stage: Option<AttendanceStage>,
    /// `unresolved`, `blocked`, `settled`, `submitting` or `error`.
    #[schema(example = "settled")]
    pub state: String,
    pub next_action: Option<Punch>,
    #[schema(example = "Morning Logged In")]
    pub label: String,
    pub prompt: Option<String>,
    /// Why punching is blocked or why the last punch failed.
    pub error: Option<String>,
    #[schema(example = "09:00:00")]
    pub login_time: Option<String>,
    pub record: Option<AttendanceRecord>,
    pub activity: Vec<Activity>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PunchOutcome {
    #[schema(example = "Punch IN successful!")]
    pub message: String,
    #[schema(example = "2026-10-18 09:00:04")]
    pub recorded_at: String,
    pub status: AttendanceStatus,
}

struct Inner {
    gate: PunchGate,
    session: Option<AttendanceSession>,
}

/// Drives one interactive punch surface for the user on this device.
pub struct AttendanceController {
    clock: Arc<ClockSync>,
    api: Arc<dyn AttendanceApi>,
    submitter: PunchSubmitter,
    inner: Mutex<Inner>,
}

impl AttendanceController {
    pub fn new(api: Arc<dyn AttendanceApi>, clock: Arc<ClockSync>) -> Self {
        Self {
            submitter: PunchSubmitter::new(api.clone(), clock.clone()),
            clock,
            api,
            inner: Mutex::new(Inner {
                gate: PunchGate::new(),
                session: None,
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn clock(&self) -> &ClockSync {
        &self.clock
    }

    pub fn authoritative_now(&self) -> DateTime<FixedOffset> {
        self.clock.now_ist()
    }

    /// Open the surface for `identity` and load today's record.
    #[instrument(name = "attendance_open", skip(self, identity), fields(employee_id = tracing::field::Empty))]
    pub async fn open_surface(
        &self,
        identity: Option<Identity>,
    ) -> Result<AttendanceStatus, AttendanceError> {
        let identity = identity.ok_or(AttendanceError::MissingIdentity)?;
        tracing::Span::current().record("employee_id", identity.employee_id.as_str());

        if let Err(e) = self.clock.sync().await {
            warn!(error = %e, "Opening attendance with device time");
        }
        let today = self.clock.today();

        {
            let mut inner = self.inner();
            let in_flight = inner.gate.is_submitting();
            let same_user = inner
                .session
                .as_ref()
                .is_some_and(|s| s.identity.employee_id == identity.employee_id);

            if in_flight && !same_user {
                return Err(AttendanceError::IdentityMismatch);
            }
            if !same_user {
                info!("Starting attendance session");
                inner.session = Some(AttendanceSession::open(identity, today));
                inner.gate.unresolve();
            }
        }

        self.refresh().await
    }

    pub fn close_surface(&self) {
        let mut inner = self.inner();
        if inner.session.take().is_some() {
            info!("Attendance surface closed");
        }
        inner.gate.unresolve();
    }

    /// Re-fetch today's record and re-derive the stage. The only way local
    /// state catches up with the server.
    #[instrument(name = "attendance_refresh", skip(self))]
    pub async fn refresh(&self) -> Result<AttendanceStatus, AttendanceError> {
        let today = self.clock.today();
        let identity = {
            let mut inner = self.inner();
            let session = inner.session.as_mut().ok_or(AttendanceError::SurfaceClosed)?;
            if session.date != today {
                info!(from = %session.date, to = %today, "Attendance day rolled over");
                session.date = today;
                session.activity.clear();
            }
            session.identity.clone()
        };

        let fetched = self.api.fetch_status(&identity.employee_id, today).await;

        let mut inner = self.inner();
        let Inner { gate, session } = &mut *inner;
        let session = match session.as_mut() {
            Some(s) if s.identity == identity => s,
            _ => {
                debug!("Surface changed during refresh, dropping result");
                return Err(AttendanceError::SurfaceClosed);
            }
        };

        let record = match fetched {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Failed to fetch attendance status");
                session.record = None;
                gate.unresolve();
                return Err(AttendanceError::RecordFetchFailed(e));
            }
        };

        let resolved = resolve(&record);
        match &resolved {
            Ok(resolution) => {
                log_reported_stage(&record, resolution);
                gate.configure(*resolution);
            }
            Err(e) => {
                warn!(error = %e, "Attendance record rejected");
                gate.block(e.to_string());
            }
        }
        session.record = Some(record);
        let status = snapshot(gate, Some(&*session));

        resolved.map(|_| status)
    }

    /// Reads and closes are only for whoever opened the surface.
    pub fn check_owner(&self, identity: Option<&Identity>) -> Result<(), AttendanceError> {
        let identity = identity.ok_or(AttendanceError::MissingIdentity)?;
        match &self.inner().session {
            Some(s) if s.identity.employee_id != identity.employee_id => {
                Err(AttendanceError::IdentityMismatch)
            }
            _ => Ok(()),
        }
    }

    pub fn status(&self) -> AttendanceStatus {
        let inner = self.inner();
        snapshot(&inner.gate, inner.session.as_ref())
    }

    pub fn current_stage(&self) -> Option<AttendanceStage> {
        self.inner().gate.stage()
    }

    pub fn next_legal_action(&self) -> Option<Punch> {
        self.inner().gate.next_action()
    }

    /// Complete a bare action with the session of the next legal punch.
    pub fn punch_for(&self, action: PunchAction, session: Option<Session>) -> Punch {
        let session = session
            .or_else(|| self.next_legal_action().map(|p| p.session))
            .unwrap_or(Session::Morning);
        Punch::new(action, session)
    }

    /// Guard, send, settle, then re-fetch. At most one punch is on the wire.
    #[instrument(name = "attendance_punch", skip(self, identity, punch), fields(punch = %punch))]
    pub async fn submit_punch(
        &self,
        identity: Option<Identity>,
        punch: Punch,
    ) -> Result<PunchOutcome, AttendanceError> {
        let identity = identity.ok_or(AttendanceError::MissingIdentity)?;

        let (pending, session_identity) = {
            let mut inner = self.inner();
            let session = inner.session.as_ref().ok_or(AttendanceError::SurfaceClosed)?;
            if session.identity.employee_id != identity.employee_id {
                return Err(AttendanceError::IdentityMismatch);
            }
            let session_identity = session.identity.clone();
            let pending = inner.gate.begin(punch, self.clock.now()).map_err(|e| {
                info!(reason = %e, "Punch rejected by gate");
                e
            })?;
            (pending, session_identity)
        };

        let result = self.submitter.submit(&session_identity, &pending).await;

        {
            let mut inner = self.inner();
            let Inner { gate, session } = &mut *inner;
            match &result {
                Ok(receipt) => {
                    gate.succeed(&pending);
                    if let Some(session) = session.as_mut() {
                        session.push_activity(Activity {
                            punch: receipt.punch,
                            recorded_at: receipt.recorded_at.clone(),
                        });
                    }
                }
                Err(AttendanceError::SubmissionConflict {
                    record: Some(record),
                    ..
                }) => match resolve(record) {
                    Ok(server) => {
                        info!(stage = %server.stage, "Reconciled with server stage");
                        gate.reconcile(&pending, server);
                    }
                    Err(e) => gate.fail(&pending, e.to_string()),
                },
                Err(e) => gate.fail(&pending, e.to_string()),
            }
        }

        // Never trust the assumed next stage: always go back to the server.
        let refreshed = match self.refresh().await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!(error = %e, "Refresh after punch failed");
                None
            }
        };

        let receipt = result?;
        Ok(PunchOutcome {
            message: receipt.message,
            recorded_at: receipt.recorded_at,
            status: refreshed.unwrap_or_else(|| self.status()),
        })
    }
}

fn log_reported_stage(record: &AttendanceRecord, resolution: &Resolution) {
    let Some(reported) = record.reported_stage.as_deref() else {
        return;
    };
    match reported.parse::<AttendanceStage>() {
        Ok(stage) if stage == resolution.stage => {}
        _ => warn!(
            reported,
            derived = %resolution.stage,
            "Server-reported stage disagrees with the record"
        ),
    }
}

fn snapshot(gate: &PunchGate, session: Option<&AttendanceSession>) -> AttendanceStatus {
    let stage = gate.stage();
    let error = match gate.state() {
        GateState::Blocked(reason) | GateState::Failed { reason, .. } => Some(reason.clone()),
        _ => None,
    };

    AttendanceStatus {
        open: session.is_some(),
        employee_id: session.map(|s| s.identity.employee_id.clone()),
        employee_name: session.map(|s| s.identity.employee_name.clone()),
        date: session.map(|s| s.date),
        stage,
        state: gate.state().name().to_string(),
        next_action: gate.next_action(),
        label: stage.map_or("Unknown", |s| s.label()).to_string(),
        prompt: stage.map(|s| s.prompt().to_string()),
        error,
        login_time: session
            .and_then(|s| s.login_time())
            .map(|t| t.format("%H:%M:%S").to_string()),
        record: session.and_then(|s| s.record.clone()),
        activity: session.map(|s| s.activity.clone()).unwrap_or_default(),
    }
}
