use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tracing::{info, warn};

use crate::attendance::gate::PendingPunch;
use crate::attendance::session::Identity;
use crate::clock::{ClockSync, format_punch_timestamp};
use crate::error::{AttendanceError, FailureKind};
use crate::model::attendance::{Punch, PunchAction};
use crate::upstream::{AttendanceApi, PunchPayload, ReplyOutcome};

#[derive(Debug, Clone)]
pub struct PunchReceipt {
    pub punch: Punch,
    /// `YYYY-MM-DD HH:MM:SS` stamp that was sent.
    pub recorded_at: String,
    pub message: String,
}

/// Sends exactly one punch per admitted transition. Never retries.
pub struct PunchSubmitter {
    api: Arc<dyn AttendanceApi>,
    clock: Arc<ClockSync>,
}

pub fn build_payload(identity: &Identity, punch: Punch, at: &DateTime<FixedOffset>) -> PunchPayload {
    let stamp = format_punch_timestamp(at);
    let (log_in_time, log_out_time) = match punch.action {
        PunchAction::In => (Some(stamp), None),
        PunchAction::Out => (None, Some(stamp)),
    };
    PunchPayload {
        employee_id: identity.employee_id.clone(),
        employee_name: identity.employee_name.clone(),
        date: at.format("%Y-%m-%d").to_string(),
        attendance_type: punch.session,
        log_in_time,
        log_out_time,
    }
}

impl PunchSubmitter {
    pub fn new(api: Arc<dyn AttendanceApi>, clock: Arc<ClockSync>) -> Self {
        Self { api, clock }
    }

    pub async fn submit(
        &self,
        identity: &Identity,
        pending: &PendingPunch,
    ) -> Result<PunchReceipt, AttendanceError> {
        // A punch is never stamped with bare device time.
        if !self.clock.is_synced() {
            self.clock.sync().await?;
        }
        let now = self.clock.now_ist();
        let payload = build_payload(identity, pending.punch, &now);
        let recorded_at = payload.timestamp().unwrap_or_default().to_string();

        info!(
            attempt = %pending.id,
            punch = %pending.punch,
            timestamp = %recorded_at,
            "Submitting punch"
        );

        let reply = self.api.submit_punch(&payload).await.map_err(|e| {
            warn!(attempt = %pending.id, error = %e, "Punch request failed");
            AttendanceError::submission_failed(e)
        })?;

        match reply.outcome() {
            ReplyOutcome::Accepted => {
                let message = reply.message.unwrap_or_else(|| {
                    format!("Punch {} successful!", pending.punch.action.to_string().to_uppercase())
                });
                info!(attempt = %pending.id, %message, "Punch accepted");
                Ok(PunchReceipt {
                    punch: pending.punch,
                    recorded_at,
                    message,
                })
            }
            ReplyOutcome::Conflict => {
                let message = reply
                    .message
                    .unwrap_or_else(|| "attendance already recorded".to_string());
                warn!(attempt = %pending.id, %message, "Punch conflicts with server state");

                let record = match self
                    .api
                    .fetch_status(&identity.employee_id, now.date_naive())
                    .await
                {
                    Ok(record) => Some(Box::new(record)),
                    Err(e) => {
                        warn!(error = %e, "Could not fetch the authoritative record after conflict");
                        None
                    }
                };
                Err(AttendanceError::SubmissionConflict { message, record })
            }
            ReplyOutcome::Rejected => {
                let message = reply
                    .message
                    .unwrap_or_else(|| "Unknown error occurred".to_string());
                warn!(attempt = %pending.id, status = %reply.status, %message, "Punch rejected");
                Err(AttendanceError::SubmissionFailed {
                    kind: FailureKind::Rejected,
                    message,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::clock::IST;
    use crate::model::attendance::Session;

    fn identity() -> Identity {
        Identity {
            employee_id: "EMP001".into(),
            employee_name: "Asha Rao".into(),
        }
    }

    #[test]
    fn in_punch_fills_log_in_time_only() {
        let at = IST.with_ymd_and_hms(2026, 10, 18, 9, 0, 4).unwrap();
        let payload = build_payload(&identity(), Punch::MORNING_IN, &at);

        assert_eq!(payload.date, "2026-10-18");
        assert_eq!(payload.attendance_type, Session::Morning);
        assert_eq!(payload.log_in_time.as_deref(), Some("2026-10-18 09:00:04"));
        assert_eq!(payload.log_out_time, None);
    }

    #[test]
    fn out_punch_fills_log_out_time_only() {
        let at = IST.with_ymd_and_hms(2026, 10, 18, 18, 30, 0).unwrap();
        let payload = build_payload(&identity(), Punch::AFTERNOON_OUT, &at);

        assert_eq!(payload.log_in_time, None);
        assert_eq!(payload.timestamp(), Some("2026-10-18 18:30:00"));
        assert_eq!(payload.attendance_type, Session::Afternoon);
    }
}
