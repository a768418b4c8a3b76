#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use tokio::sync::Notify;

use attendance::attendance::controller::AttendanceController;
use attendance::attendance::session::Identity;
use attendance::clock::{ClockSync, IST, LocalClock, TimeSource};
use attendance::error::UpstreamError;
use attendance::model::attendance::{AttendanceRecord, Punch, PunchAction};
use attendance::upstream::{AttendanceApi, PunchPayload, PunchReply};
use attendance::utils::offset_cache::OffsetStore;

/// 08:59:00 IST on the test day, as the device sees it.
pub fn device_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 3, 29, 0).unwrap()
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

pub fn asha() -> Identity {
    Identity {
        employee_id: "EMP001".into(),
        employee_name: "Asha Rao".into(),
    }
}

pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn at(t: DateTime<Utc>) -> Self {
        Self(Mutex::new(t))
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.0.lock().unwrap() += by;
    }
}

impl LocalClock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Server clock running `skew` ahead of the device.
pub struct SkewedServer {
    pub device: Arc<ManualClock>,
    pub skew: TimeDelta,
    pub down: Mutex<bool>,
}

#[async_trait]
impl TimeSource for SkewedServer {
    async fn server_time(&self) -> Result<DateTime<FixedOffset>, UpstreamError> {
        if *self.down.lock().unwrap() {
            return Err(UpstreamError::Timeout);
        }
        Ok((self.device.now() + self.skew).with_timezone(&*IST))
    }
}

/// In-memory attendance server that applies punches the way the real one does.
pub struct FakeServer {
    pub record: Mutex<AttendanceRecord>,
    pub submitted: Mutex<Vec<PunchPayload>>,
    pub fetches: Mutex<u32>,
    pub fail_fetch: Mutex<bool>,
    pub fail_submit: Mutex<Option<UpstreamError>>,
    /// On the next punch, replace the record with this one and answer "already punched".
    pub conflict_with: Mutex<Option<AttendanceRecord>>,
    pub hold: Mutex<bool>,
    pub entered: Notify,
    pub release: Notify,
}

impl FakeServer {
    pub fn with_record(record: AttendanceRecord) -> Self {
        Self {
            record: Mutex::new(record),
            submitted: Mutex::new(Vec::new()),
            fetches: Mutex::new(0),
            fail_fetch: Mutex::new(false),
            fail_submit: Mutex::new(None),
            conflict_with: Mutex::new(None),
            hold: Mutex::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    pub fn empty() -> Self {
        Self::with_record(AttendanceRecord::empty("EMP001", today()))
    }

    pub fn submissions(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    pub fn last_payload(&self) -> PunchPayload {
        self.submitted.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl AttendanceApi for FakeServer {
    async fn fetch_status(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> Result<AttendanceRecord, UpstreamError> {
        *self.fetches.lock().unwrap() += 1;
        if *self.fail_fetch.lock().unwrap() {
            return Err(UpstreamError::Timeout);
        }
        let record = self.record.lock().unwrap().clone();
        assert_eq!(record.employee_id, employee_id);
        assert_eq!(record.date, date);
        Ok(record)
    }

    async fn submit_punch(&self, payload: &PunchPayload) -> Result<PunchReply, UpstreamError> {
        self.submitted.lock().unwrap().push(payload.clone());

        let hold = *self.hold.lock().unwrap();
        if hold {
            self.entered.notify_one();
            self.release.notified().await;
        }

        if let Some(e) = self.fail_submit.lock().unwrap().take() {
            return Err(e);
        }
        if let Some(record) = self.conflict_with.lock().unwrap().take() {
            *self.record.lock().unwrap() = record;
            return Ok(PunchReply {
                status: "error".into(),
                message: Some("Already punched for this session".into()),
            });
        }

        let stamp = payload.timestamp().unwrap();
        let at = NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S").unwrap();
        let action = if payload.log_in_time.is_some() {
            PunchAction::In
        } else {
            PunchAction::Out
        };
        let punch = Punch::new(action, payload.attendance_type);

        let mut record = self.record.lock().unwrap();
        *record = record.clone().with_punch(punch, at.time());
        Ok(PunchReply {
            status: "success".into(),
            message: None,
        })
    }
}

pub struct Harness {
    pub server: Arc<FakeServer>,
    pub time: Arc<SkewedServer>,
    pub device: Arc<ManualClock>,
    pub controller: Arc<AttendanceController>,
}

/// Server clock one minute ahead of the device unless told otherwise.
pub fn harness(server: FakeServer) -> Harness {
    harness_with_skew(server, TimeDelta::seconds(60))
}

pub fn harness_with_skew(server: FakeServer, skew: TimeDelta) -> Harness {
    let server = Arc::new(server);
    let device = Arc::new(ManualClock::at(device_start()));
    let time = Arc::new(SkewedServer {
        device: device.clone(),
        skew,
        down: Mutex::new(false),
    });
    let clock = Arc::new(ClockSync::new(
        time.clone(),
        device.clone(),
        OffsetStore::new(Duration::from_secs(3600), None),
    ));
    let controller = Arc::new(AttendanceController::new(server.clone(), clock));
    Harness {
        server,
        time,
        device,
        controller,
    }
}
