use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::model::attendance::Punch;

/// Where the employee is in today's punch sequence.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStage {
    #[serde(rename = "none")]
    #[strum(serialize = "none")]
    NotStarted,
    WaitingLogoutMorning,
    WaitingLoginAfternoon,
    WaitingLogoutAfternoon,
    Complete,
}

impl AttendanceStage {
    /// The single punch this stage admits; `None` once the day is complete.
    pub fn next_action(self) -> Option<Punch> {
        match self {
            AttendanceStage::NotStarted => Some(Punch::MORNING_IN),
            AttendanceStage::WaitingLogoutMorning => Some(Punch::MORNING_OUT),
            AttendanceStage::WaitingLoginAfternoon => Some(Punch::AFTERNOON_IN),
            AttendanceStage::WaitingLogoutAfternoon => Some(Punch::AFTERNOON_OUT),
            AttendanceStage::Complete => None,
        }
    }

    /// Stage reached once `next_action` has been recorded.
    pub fn successor(self) -> Option<AttendanceStage> {
        match self {
            AttendanceStage::NotStarted => Some(AttendanceStage::WaitingLogoutMorning),
            AttendanceStage::WaitingLogoutMorning => Some(AttendanceStage::WaitingLoginAfternoon),
            AttendanceStage::WaitingLoginAfternoon => Some(AttendanceStage::WaitingLogoutAfternoon),
            AttendanceStage::WaitingLogoutAfternoon => Some(AttendanceStage::Complete),
            AttendanceStage::Complete => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == AttendanceStage::Complete
    }

    /// Status badge text.
    pub fn label(self) -> &'static str {
        match self {
            AttendanceStage::NotStarted => "Not Started",
            AttendanceStage::WaitingLogoutMorning => "Morning Logged In",
            AttendanceStage::WaitingLoginAfternoon => "Ready for Afternoon Login",
            AttendanceStage::WaitingLogoutAfternoon => "Afternoon Logged In",
            AttendanceStage::Complete => "Day Complete",
        }
    }

    /// Hint shown next to the punch control.
    pub fn prompt(self) -> &'static str {
        match self {
            AttendanceStage::NotStarted => "Please punch in for morning session",
            AttendanceStage::WaitingLogoutMorning => {
                "You are logged in. Punch out for lunch break"
            }
            AttendanceStage::WaitingLoginAfternoon => "Please punch in for afternoon session",
            AttendanceStage::WaitingLogoutAfternoon => {
                "You are logged in. Punch out to end your day"
            }
            AttendanceStage::Complete => "All attendance punches completed for today",
        }
    }
}
