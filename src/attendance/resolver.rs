use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AttendanceError;
use crate::model::attendance::{AttendanceRecord, Punch};
use crate::model::stage::AttendanceStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Resolution {
    pub stage: AttendanceStage,
    pub next_action: Option<Punch>,
}

impl From<AttendanceStage> for Resolution {
    fn from(stage: AttendanceStage) -> Self {
        Self {
            stage,
            next_action: stage.next_action(),
        }
    }
}

/// Derive today's stage from the server's record and nothing else.
///
/// Rules, first match wins:
/// 1. no login in either session: not started
/// 2. morning login without logout: waiting for morning logout
/// 3. morning closed, no afternoon login: waiting for afternoon login
/// 4. afternoon login without logout: waiting for afternoon logout
/// 5. afternoon closed: complete
///
/// A logout without its login, or an afternoon login with no morning login,
/// is reported as [`AttendanceError::InconsistentRecord`].
pub fn resolve(record: &AttendanceRecord) -> Result<Resolution, AttendanceError> {
    let login_m = record.login_time_morning.is_some();
    let logout_m = record.logout_time_morning.is_some();
    let login_a = record.login_time_afternoon.is_some();
    let logout_a = record.logout_time_afternoon.is_some();

    if logout_m && !login_m {
        return Err(AttendanceError::InconsistentRecord(
            "morning logout recorded without a morning login".into(),
        ));
    }
    if logout_a && !login_a {
        return Err(AttendanceError::InconsistentRecord(
            "afternoon logout recorded without an afternoon login".into(),
        ));
    }

    let stage = if !login_m && !login_a {
        AttendanceStage::NotStarted
    } else if login_m && !logout_m {
        // also covers an afternoon login that arrived before the morning closed
        AttendanceStage::WaitingLogoutMorning
    } else if !login_m {
        return Err(AttendanceError::InconsistentRecord(
            "afternoon login recorded without a morning session".into(),
        ));
    } else if !login_a {
        AttendanceStage::WaitingLoginAfternoon
    } else if !logout_a {
        AttendanceStage::WaitingLogoutAfternoon
    } else {
        AttendanceStage::Complete
    };

    Ok(stage.into())
}
