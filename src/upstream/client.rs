//! HTTP client for the attendance API endpoints.
//!
//! Wraps the three PHP endpoints (server time, attendance status, punch)
//! using [`reqwest`]. Bodies are read as text and handed to
//! [`super::parse`], since the status endpoint does not always send valid JSON.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::clock::TimeSource;
use crate::error::UpstreamError;
use crate::model::attendance::AttendanceRecord;
use crate::upstream::parse::{parse_punch_reply, parse_server_time, parse_status};
use crate::upstream::{AttendanceApi, PunchPayload, PunchReply};

pub struct HttpAttendanceApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAttendanceApi {
    /// * `base_url` - e.g. `https://www.fist-o.com/web_crm`, no trailing slash needed.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    /// Body text of a 2xx response, or [`UpstreamError::Status`].
    async fn success_text(response: reqwest::Response) -> Result<String, UpstreamError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl TimeSource for HttpAttendanceApi {
    async fn server_time(&self) -> Result<DateTime<FixedOffset>, UpstreamError> {
        let response = self.client.get(self.url("timedisplay.php")).send().await?;
        let text = Self::success_text(response).await?;
        Ok(parse_server_time(&text)?)
    }
}

#[async_trait]
impl AttendanceApi for HttpAttendanceApi {
    async fn fetch_status(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> Result<AttendanceRecord, UpstreamError> {
        // the status endpoint expects DD-MM-YYYY
        let day = date.format("%d-%m-%Y").to_string();
        let response = self
            .client
            .get(self.url("check_attendance.php"))
            .query(&[("employee_id", employee_id), ("date", day.as_str())])
            .send()
            .await?;

        let text = Self::success_text(response).await?;
        debug!(employee_id, %date, body = %text, "Attendance status received");
        Ok(parse_status(&text, employee_id, date)?)
    }

    async fn submit_punch(&self, payload: &PunchPayload) -> Result<PunchReply, UpstreamError> {
        let response = self
            .client
            .post(self.url("punch.php"))
            .form(payload)
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            let body = response.text().await.unwrap_or_default();
            warn!(body = %body, "Punch rejected as conflicting");
            let message = parse_punch_reply(&body).ok().and_then(|r| r.message);
            return Ok(PunchReply {
                status: "conflict".to_string(),
                message,
            });
        }

        let text = Self::success_text(response).await?;
        Ok(parse_punch_reply(&text)?)
    }
}
