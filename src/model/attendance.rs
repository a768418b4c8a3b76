use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PunchAction {
    In,
    Out,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Session {
    Morning,
    Afternoon,
}

/// One `(action, session)` pair, e.g. punch IN for the morning session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Punch {
    pub action: PunchAction,
    pub session: Session,
}

impl Punch {
    pub const MORNING_IN: Punch = Punch::new(PunchAction::In, Session::Morning);
    pub const MORNING_OUT: Punch = Punch::new(PunchAction::Out, Session::Morning);
    pub const AFTERNOON_IN: Punch = Punch::new(PunchAction::In, Session::Afternoon);
    pub const AFTERNOON_OUT: Punch = Punch::new(PunchAction::Out, Session::Afternoon);

    /// Every punch in the order a day is expected to see them.
    pub const DAY_SEQUENCE: [Punch; 4] = [
        Punch::MORNING_IN,
        Punch::MORNING_OUT,
        Punch::AFTERNOON_IN,
        Punch::AFTERNOON_OUT,
    ];

    pub const fn new(action: PunchAction, session: Session) -> Self {
        Self { action, session }
    }
}

impl fmt::Display for Punch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self.action {
            PunchAction::In => "IN",
            PunchAction::Out => "OUT",
        };
        write!(f, "punch {} ({})", action, self.session)
    }
}

/// Today's punch row for one employee, as reported by the attendance API.
///
/// The server is the only writer; this crate never mutates a fetched record
/// except to simulate server behaviour in tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = "EMP001")]
    pub employee_id: String,
    #[schema(example = "2026-10-18", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "42")]
    pub record_id: Option<String>,
    #[schema(example = "09:00:00", value_type = Option<String>)]
    pub login_time_morning: Option<NaiveTime>,
    #[schema(example = "13:00:00", value_type = Option<String>)]
    pub logout_time_morning: Option<NaiveTime>,
    #[schema(example = "14:00:00", value_type = Option<String>)]
    pub login_time_afternoon: Option<NaiveTime>,
    #[schema(example = "18:00:00", value_type = Option<String>)]
    pub logout_time_afternoon: Option<NaiveTime>,
    /// Stage string the server computed itself, if it sent one. Informational only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_stage: Option<String>,
}

impl AttendanceRecord {
    pub fn empty(employee_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            employee_id: employee_id.into(),
            date,
            record_id: None,
            login_time_morning: None,
            logout_time_morning: None,
            login_time_afternoon: None,
            logout_time_afternoon: None,
            reported_stage: None,
        }
    }

    pub fn punch_time(&self, punch: Punch) -> Option<NaiveTime> {
        match (punch.action, punch.session) {
            (PunchAction::In, Session::Morning) => self.login_time_morning,
            (PunchAction::Out, Session::Morning) => self.logout_time_morning,
            (PunchAction::In, Session::Afternoon) => self.login_time_afternoon,
            (PunchAction::Out, Session::Afternoon) => self.logout_time_afternoon,
        }
    }

    /// Returns a copy with the slot for `punch` filled in.
    pub fn with_punch(mut self, punch: Punch, at: NaiveTime) -> Self {
        let slot = match (punch.action, punch.session) {
            (PunchAction::In, Session::Morning) => &mut self.login_time_morning,
            (PunchAction::Out, Session::Morning) => &mut self.logout_time_morning,
            (PunchAction::In, Session::Afternoon) => &mut self.login_time_afternoon,
            (PunchAction::Out, Session::Afternoon) => &mut self.logout_time_afternoon,
        };
        *slot = Some(at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punch_parts_parse_case_insensitively() {
        assert_eq!("IN".parse::<PunchAction>().unwrap(), PunchAction::In);
        assert_eq!("out".parse::<PunchAction>().unwrap(), PunchAction::Out);
        assert_eq!("Afternoon".parse::<Session>().unwrap(), Session::Afternoon);
        assert!("evening".parse::<Session>().is_err());
    }

    #[test]
    fn with_punch_fills_only_its_slot() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let record = AttendanceRecord::empty("EMP001", date).with_punch(Punch::MORNING_IN, nine);

        assert_eq!(record.punch_time(Punch::MORNING_IN), Some(nine));
        assert_eq!(record.punch_time(Punch::MORNING_OUT), None);
        assert_eq!(record.logout_time_afternoon, None);
    }

    #[test]
    fn punch_display_reads_like_a_button() {
        assert_eq!(Punch::AFTERNOON_OUT.to_string(), "punch OUT (afternoon)");
    }
}
