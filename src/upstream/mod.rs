//! The external attendance API, seen from this crate.

pub mod client;
pub mod parse;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;
use crate::model::attendance::{AttendanceRecord, Session};

/// Form body for one punch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PunchPayload {
    pub employee_id: String,
    pub employee_name: String,
    /// `YYYY-MM-DD`, IST.
    pub date: String,
    pub attendance_type: Session,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_in_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_out_time: Option<String>,
}

impl PunchPayload {
    /// The recorded `YYYY-MM-DD HH:MM:SS` stamp, whichever slot carries it.
    pub fn timestamp(&self) -> Option<&str> {
        self.log_in_time.as_deref().or(self.log_out_time.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunchReply {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    Accepted,
    /// The server already holds this punch or a later one.
    Conflict,
    Rejected,
}

const CONFLICT_STATUSES: &[&str] = &["conflict", "duplicate", "already_punched", "exists"];

impl PunchReply {
    pub fn outcome(&self) -> ReplyOutcome {
        let status = self.status.trim().to_ascii_lowercase();
        if status == "success" {
            return ReplyOutcome::Accepted;
        }
        let says_already = self
            .message
            .as_deref()
            .is_some_and(|m| m.to_ascii_lowercase().contains("already"));
        if CONFLICT_STATUSES.contains(&status.as_str()) || says_already {
            ReplyOutcome::Conflict
        } else {
            ReplyOutcome::Rejected
        }
    }
}

#[async_trait]
pub trait AttendanceApi: Send + Sync {
    /// Today's record for one employee. Days with no punches yield an empty record.
    async fn fetch_status(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> Result<AttendanceRecord, UpstreamError>;

    /// Send one punch. Not idempotent: callers must never retry blindly.
    async fn submit_punch(&self, payload: &PunchPayload) -> Result<PunchReply, UpstreamError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(status: &str, message: Option<&str>) -> PunchReply {
        PunchReply {
            status: status.into(),
            message: message.map(Into::into),
        }
    }

    #[test]
    fn reply_classification() {
        assert_eq!(reply("success", None).outcome(), ReplyOutcome::Accepted);
        assert_eq!(reply("SUCCESS", Some("ok")).outcome(), ReplyOutcome::Accepted);
        assert_eq!(reply("conflict", None).outcome(), ReplyOutcome::Conflict);
        assert_eq!(
            reply("error", Some("Already punched in for morning")).outcome(),
            ReplyOutcome::Conflict
        );
        assert_eq!(
            reply("error", Some("Employee not found")).outcome(),
            ReplyOutcome::Rejected
        );
    }
}
