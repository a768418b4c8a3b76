//! Authoritative time for the attendance core.
//!
//! The device clock is not trusted: the server's time is fetched once per
//! session and the difference is kept as an offset that every "now" read
//! applies. Until an offset exists, reads fall back to the device clock.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AttendanceError, UpstreamError};
use crate::utils::offset_cache::OffsetStore;

/// India Standard Time, UTC+05:30. Attendance dates are IST calendar days.
pub static IST: Lazy<FixedOffset> =
    Lazy::new(|| FixedOffset::east_opt(5 * 3600 + 30 * 60).expect("IST offset is in range"));

/// The device's own clock.
pub trait LocalClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl LocalClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Where authoritative time comes from.
#[async_trait]
pub trait TimeSource: Send + Sync {
    async fn server_time(&self) -> Result<DateTime<FixedOffset>, UpstreamError>;
}

/// The two instants captured at sync time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockOffset {
    /// Server time reported by the time source, epoch millis.
    #[serde(rename = "serverTimeFetched")]
    pub server_ms: i64,
    /// Device time when the report arrived, epoch millis.
    #[serde(rename = "clientTimeFetched")]
    pub client_ms: i64,
}

impl ClockOffset {
    pub fn offset_ms(&self) -> i64 {
        self.server_ms - self.client_ms
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.server_ms)
    }
}

pub struct ClockSync {
    source: Arc<dyn TimeSource>,
    local: Arc<dyn LocalClock>,
    store: OffsetStore,
}

impl ClockSync {
    pub fn new(source: Arc<dyn TimeSource>, local: Arc<dyn LocalClock>, store: OffsetStore) -> Self {
        Self {
            source,
            local,
            store,
        }
    }

    /// Establish the offset, reusing a stored one when this session already has it.
    pub async fn sync(&self) -> Result<ClockOffset, AttendanceError> {
        if let Some(offset) = self.store.load() {
            debug!(offset_ms = offset.offset_ms(), "Reusing stored clock offset");
            return Ok(offset);
        }
        self.resync().await
    }

    /// Always ask the time source. On failure the previous offset stays in place.
    pub async fn resync(&self) -> Result<ClockOffset, AttendanceError> {
        let server = match self.source.server_time().await {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "Failed to sync server time, using device clock");
                return Err(AttendanceError::ClockUnavailable(e));
            }
        };
        let local = self.local.now();

        let offset = ClockOffset {
            server_ms: server.timestamp_millis(),
            client_ms: local.timestamp_millis(),
        };
        self.store.save(&offset);

        info!(server_time = %server, offset_ms = offset.offset_ms(), "Server time synced");
        Ok(offset)
    }

    pub fn offset(&self) -> Option<ClockOffset> {
        self.store.load()
    }

    pub fn is_synced(&self) -> bool {
        self.offset().is_some()
    }

    /// Authoritative now, or plain device time when no offset is established.
    pub fn now(&self) -> DateTime<Utc> {
        let local = self.local.now();
        match self.store.load() {
            Some(offset) => local + TimeDelta::milliseconds(offset.offset_ms()),
            None => local,
        }
    }

    pub fn now_ist(&self) -> DateTime<FixedOffset> {
        self.now().with_timezone(&*IST)
    }

    /// Today's attendance date.
    pub fn today(&self) -> NaiveDate {
        self.now_ist().date_naive()
    }

    /// Explicit session reset: forget the offset.
    pub fn reset(&self) {
        info!("Clock offset cleared");
        self.store.clear();
    }
}

/// e.g. `Sunday, October 18, 2026, 02:42:10 PM`
pub fn format_long(at: &DateTime<FixedOffset>) -> String {
    at.format("%A, %B %-d, %Y, %I:%M:%S %p").to_string()
}

/// e.g. `2:42:10 PM`
pub fn format_clock(at: &DateTime<FixedOffset>) -> String {
    at.format("%-I:%M:%S %p").to_string()
}

/// Timestamp as the punch endpoint records it: `2026-10-18 14:42:10`.
pub fn format_punch_timestamp(at: &DateTime<FixedOffset>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;

    use super::testing::{ManualClock, ScriptedTime};
    use super::*;

    fn local_t() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 3, 0, 0).unwrap()
    }

    fn clock(source: Arc<ScriptedTime>, local: Arc<ManualClock>) -> ClockSync {
        ClockSync::new(source, local, OffsetStore::new(Duration::from_secs(3600), None))
    }

    #[tokio::test]
    async fn offset_is_stable_and_additive() {
        let delta = TimeDelta::seconds(90);
        let server = (local_t() + delta).with_timezone(&*IST);
        let source = Arc::new(ScriptedTime::answering(Some(server)));
        let local = Arc::new(ManualClock::at(local_t()));
        let clock = clock(source, local.clone());

        let offset = clock.sync().await.unwrap();
        assert_eq!(offset.offset_ms(), 90_000);
        assert_eq!(clock.now(), local_t() + delta);

        local.advance(TimeDelta::minutes(17));
        assert_eq!(clock.now(), local_t() + TimeDelta::minutes(17) + delta);
    }

    #[tokio::test]
    async fn sync_reuses_the_stored_offset() {
        let server = local_t().with_timezone(&*IST);
        let source = Arc::new(ScriptedTime::answering(Some(server)));
        let clock = clock(source.clone(), Arc::new(ManualClock::at(local_t())));

        clock.sync().await.unwrap();
        clock.sync().await.unwrap();
        assert_eq!(source.calls(), 1);

        clock.resync().await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn unreachable_source_degrades_to_device_time() {
        let source = Arc::new(ScriptedTime::answering(None));
        let clock = clock(source, Arc::new(ManualClock::at(local_t())));

        let err = clock.sync().await.unwrap_err();
        assert_eq!(err.code(), "CLOCK_UNAVAILABLE");
        assert!(!clock.is_synced());
        assert_eq!(clock.now(), local_t());
    }

    #[tokio::test]
    async fn failed_resync_keeps_the_previous_offset() {
        let server = (local_t() + TimeDelta::seconds(5)).with_timezone(&*IST);
        let source = Arc::new(ScriptedTime::answering(Some(server)));
        let clock = clock(source.clone(), Arc::new(ManualClock::at(local_t())));
        clock.sync().await.unwrap();

        *source.answer.lock().unwrap() = None;
        assert!(clock.resync().await.is_err());
        assert_eq!(clock.offset().unwrap().offset_ms(), 5_000);
    }

    #[tokio::test]
    async fn reset_falls_back_to_device_time_and_drops_the_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clock_offset.json");
        let server = (local_t() + TimeDelta::seconds(30)).with_timezone(&*IST);
        let source = Arc::new(ScriptedTime::answering(Some(server)));
        let clock = ClockSync::new(
            source.clone(),
            Arc::new(ManualClock::at(local_t())),
            OffsetStore::new(Duration::from_secs(3600), Some(path.clone())),
        );
        clock.sync().await.unwrap();
        assert!(path.exists());

        clock.reset();
        assert!(!clock.is_synced());
        assert_eq!(clock.now(), local_t());
        assert!(!path.exists());

        // The next sync has to ask the source again.
        clock.sync().await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn today_is_the_ist_calendar_day() {
        // 20:00 UTC is already 01:30 the next day in IST.
        let late = Utc.with_ymd_and_hms(2026, 10, 18, 20, 0, 0).unwrap();
        let source = Arc::new(ScriptedTime::answering(Some(late.with_timezone(&*IST))));
        let clock = clock(source, Arc::new(ManualClock::at(late)));
        clock.sync().await.unwrap();

        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
    }

    #[test]
    fn display_formats() {
        let at = IST.with_ymd_and_hms(2026, 10, 18, 14, 42, 10).unwrap();
        assert_eq!(format_long(&at), "Sunday, October 18, 2026, 02:42:10 PM");
        assert_eq!(format_clock(&at), "2:42:10 PM");
        assert_eq!(format_punch_timestamp(&at), "2026-10-18 14:42:10");
    }
}
