use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance::{AttendanceRecord, Punch};

/// Who is punching. Comes from the bearer token, never from the request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Identity {
    #[schema(example = "EMP001")]
    pub employee_id: String,
    #[schema(example = "Asha Rao")]
    pub employee_name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Activity {
    pub punch: Punch,
    /// `YYYY-MM-DD HH:MM:SS`, IST, as recorded by the server.
    #[schema(example = "2026-10-18 09:00:04")]
    pub recorded_at: String,
}

/// How many recent punches the surface lists.
pub const ACTIVITY_LIMIT: usize = 5;

/// One open punch surface.
#[derive(Debug, Clone)]
pub struct AttendanceSession {
    pub identity: Identity,
    pub date: NaiveDate,
    pub record: Option<AttendanceRecord>,
    pub activity: Vec<Activity>,
}

impl AttendanceSession {
    pub fn open(identity: Identity, date: NaiveDate) -> Self {
        Self {
            identity,
            date,
            record: None,
            activity: Vec::new(),
        }
    }

    /// Newest first, capped at [`ACTIVITY_LIMIT`].
    pub fn push_activity(&mut self, activity: Activity) {
        self.activity.insert(0, activity);
        self.activity.truncate(ACTIVITY_LIMIT);
    }

    /// Time of the open login, if the employee is currently punched in.
    pub fn login_time(&self) -> Option<NaiveTime> {
        let record = self.record.as_ref()?;
        match (record.logout_time_morning, record.login_time_afternoon) {
            (None, _) if record.login_time_morning.is_some() => record.login_time_morning,
            (Some(_), Some(t)) if record.logout_time_afternoon.is_none() => Some(t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> AttendanceSession {
        AttendanceSession::open(
            Identity {
                employee_id: "EMP001".into(),
                employee_name: "Asha Rao".into(),
            },
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
        )
    }

    #[test]
    fn activity_keeps_the_newest_five() {
        let mut s = session();
        for i in 0..7 {
            s.push_activity(Activity {
                punch: Punch::MORNING_IN,
                recorded_at: format!("2026-10-18 09:00:0{i}"),
            });
        }
        assert_eq!(s.activity.len(), ACTIVITY_LIMIT);
        assert_eq!(s.activity[0].recorded_at, "2026-10-18 09:00:06");
    }

    #[test]
    fn login_time_tracks_the_open_session() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let two = NaiveTime::from_hms_opt(14, 0, 0).unwrap();
        let mut s = session();
        assert_eq!(s.login_time(), None);

        let record = AttendanceRecord::empty("EMP001", s.date).with_punch(Punch::MORNING_IN, nine);
        s.record = Some(record.clone());
        assert_eq!(s.login_time(), Some(nine));

        let record = record
            .with_punch(Punch::MORNING_OUT, NaiveTime::from_hms_opt(13, 0, 0).unwrap())
            .with_punch(Punch::AFTERNOON_IN, two);
        s.record = Some(record);
        assert_eq!(s.login_time(), Some(two));
    }
}
