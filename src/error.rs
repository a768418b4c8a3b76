use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use serde_json::json;
use strum_macros::Display;

use crate::model::attendance::AttendanceRecord;

/// Failure to turn an upstream body into something usable.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("response body is empty")]
    Empty,

    #[error("no attendance object found in response")]
    NoAttendanceObject,

    #[error("invalid timestamp `{value}` in field `{field}`")]
    InvalidTime { field: &'static str, value: String },

    #[error("invalid server time `{0}`")]
    InvalidServerTime(String),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the HTTP layer talking to the attendance API.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("attendance API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout
        } else {
            UpstreamError::Request(e)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    Network,
    Timeout,
    Rejected,
}

/// Everything the attendance core can report to the UI layer.
#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error("authoritative time unavailable: {0}")]
    ClockUnavailable(#[source] UpstreamError),

    #[error("could not load today's attendance: {0}")]
    RecordFetchFailed(#[source] UpstreamError),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("attendance was already updated on the server: {message}")]
    SubmissionConflict {
        message: String,
        record: Option<Box<AttendanceRecord>>,
    },

    #[error("punch submission failed ({kind}): {message}")]
    SubmissionFailed { kind: FailureKind, message: String },

    #[error("inconsistent attendance record: {0}")]
    InconsistentRecord(String),

    #[error("attendance surface is not open")]
    SurfaceClosed,

    #[error("Session expired or not logged in. Please log in again.")]
    MissingIdentity,

    #[error("attendance surface is open for another employee")]
    IdentityMismatch,
}

impl AttendanceError {
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceError::ClockUnavailable(_) => "CLOCK_UNAVAILABLE",
            AttendanceError::RecordFetchFailed(_) => "RECORD_FETCH_FAILED",
            AttendanceError::InvalidTransition(_) => "INVALID_TRANSITION",
            AttendanceError::SubmissionConflict { .. } => "SUBMISSION_CONFLICT",
            AttendanceError::SubmissionFailed { .. } => "SUBMISSION_FAILED",
            AttendanceError::InconsistentRecord(_) => "INCONSISTENT_RECORD",
            AttendanceError::SurfaceClosed => "SURFACE_CLOSED",
            AttendanceError::MissingIdentity => "MISSING_IDENTITY",
            AttendanceError::IdentityMismatch => "IDENTITY_MISMATCH",
        }
    }

    pub(crate) fn submission_failed(e: UpstreamError) -> Self {
        let kind = match &e {
            UpstreamError::Timeout => FailureKind::Timeout,
            UpstreamError::Request(_) | UpstreamError::Parse(_) => FailureKind::Network,
            UpstreamError::Status { .. } => FailureKind::Rejected,
        };
        AttendanceError::SubmissionFailed {
            kind,
            message: e.to_string(),
        }
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::ClockUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AttendanceError::RecordFetchFailed(_) => StatusCode::BAD_GATEWAY,
            AttendanceError::InvalidTransition(_) => StatusCode::BAD_REQUEST,
            AttendanceError::SubmissionConflict { .. } => StatusCode::CONFLICT,
            AttendanceError::SubmissionFailed { kind, .. } => match kind {
                FailureKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                FailureKind::Network => StatusCode::BAD_GATEWAY,
                FailureKind::Rejected => StatusCode::UNPROCESSABLE_ENTITY,
            },
            AttendanceError::InconsistentRecord(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AttendanceError::SurfaceClosed => StatusCode::PRECONDITION_REQUIRED,
            AttendanceError::MissingIdentity => StatusCode::UNAUTHORIZED,
            AttendanceError::IdentityMismatch => StatusCode::FORBIDDEN,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        if let AttendanceError::SubmissionConflict {
            record: Some(record),
            ..
        } = self
        {
            body["record"] = json!(record);
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}
