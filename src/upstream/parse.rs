//! Normalisers for the attendance API's response bodies.
//!
//! The status endpoint is loose: bodies may be wrapped in `data`, may carry
//! camelCase names, and sometimes several JSON objects arrive back to back
//! with no delimiter (occasionally with PHP notices in between). Everything
//! tolerant lives here; callers get a validated value or a [`ParseError`].

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde_json::{Deserializer, Map, Value};

use crate::clock::IST;
use crate::error::ParseError;
use crate::model::attendance::AttendanceRecord;
use crate::upstream::PunchReply;

type Object = Map<String, Value>;

const LOGIN_MORNING: &[&str] = &["login_time_morning", "loginTimeMorning", "log_in_time_morning"];
const LOGOUT_MORNING: &[&str] = &["logout_time_morning", "logoutTimeMorning", "log_out_time_morning"];
const LOGIN_AFTERNOON: &[&str] = &[
    "login_time_afternoon",
    "loginTimeAfternoon",
    "log_in_time_afternoon",
];
const LOGOUT_AFTERNOON: &[&str] = &[
    "logout_time_afternoon",
    "logoutTimeAfternoon",
    "log_out_time_afternoon",
];

/// Single-session names from older responses; read as the morning pair.
const LEGACY_LOGIN: &[&str] = &["login_time", "log_in_time"];
const LEGACY_LOGOUT: &[&str] = &["logout_time", "log_out_time"];

const MARKER_FIELDS: &[&str] = &["punched_in", "status", "attendance_stage", "attendanceStage"];

/// Every top-level JSON object in `text`, in order, skipping anything unparsable.
pub fn json_objects(text: &str) -> Vec<Object> {
    let mut objects = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find('{') {
        rest = &rest[start..];
        let mut stream = Deserializer::from_str(rest).into_iter::<Value>();
        let mut consumed = 0;
        let mut broken = false;

        while let Some(item) = stream.next() {
            match item {
                Ok(value) => {
                    consumed = stream.byte_offset();
                    if let Value::Object(map) = value {
                        objects.push(map);
                    }
                }
                Err(_) => {
                    broken = true;
                    break;
                }
            }
        }

        if !broken {
            break;
        }
        // If the broken value was an object, step past its brace; otherwise
        // the next brace may open a valid object and must be kept.
        let tail = rest[consumed..].trim_start();
        let resume = if tail.starts_with('{') {
            tail[1..].find('{').map(|pos| pos + 1)
        } else {
            tail.find('{')
        };
        match resume {
            Some(pos) => rest = &tail[pos..],
            None => break,
        }
    }

    objects
}

fn lookup<'a>(obj: &'a Object, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|n| obj.get(*n))
}

fn has_punch_fields(obj: &Object) -> bool {
    [
        LOGIN_MORNING,
        LOGOUT_MORNING,
        LOGIN_AFTERNOON,
        LOGOUT_AFTERNOON,
        LEGACY_LOGIN,
        LEGACY_LOGOUT,
        MARKER_FIELDS,
    ]
    .iter()
    .any(|names| lookup(obj, names).is_some())
}

/// Prefer a nested `data` object when the envelope has one.
fn unwrap_envelope(obj: Object) -> Object {
    let inner = match obj.get("data") {
        Some(Value::Object(inner)) => Some(inner.clone()),
        Some(Value::Array(items)) => items.iter().find_map(|v| v.as_object().cloned()),
        _ => None,
    };
    match inner {
        Some(inner) if has_punch_fields(&inner) => inner,
        _ => obj,
    }
}

fn is_blank(s: &str) -> bool {
    matches!(
        s,
        "" | "null" | "NULL" | "00:00:00" | "0000-00-00 00:00:00" | "0000-00-00T00:00:00"
    )
}

/// Reads one punch slot. Absent, null, `false`, and zero placeholders all mean "not punched".
pub fn parse_punch_time(field: &'static str, value: Option<&Value>) -> Result<Option<NaiveTime>, ParseError> {
    let raw = match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => return Ok(None),
        Some(Value::String(s)) => s.trim(),
        Some(other) => {
            return Err(ParseError::InvalidTime {
                field,
                value: other.to_string(),
            });
        }
    };
    if is_blank(raw) {
        return Ok(None);
    }

    for fmt in ["%H:%M:%S", "%H:%M", "%I:%M:%S %p", "%I:%M %p"] {
        if let Ok(t) = NaiveTime::parse_from_str(raw, fmt) {
            return Ok(Some(t));
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d-%m-%Y %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(Some(dt.time()));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&*IST).time()));
    }

    Err(ParseError::InvalidTime {
        field,
        value: raw.to_string(),
    })
}

fn string_field(obj: &Object, names: &[&str]) -> Option<String> {
    match lookup(obj, names)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn slot(obj: &Object, field: &'static str, names: &[&str], legacy: &[&str]) -> Result<Option<NaiveTime>, ParseError> {
    match lookup(obj, names) {
        Some(v) => parse_punch_time(field, Some(v)),
        None => parse_punch_time(field, lookup(obj, legacy)),
    }
}

/// Turn a status body into today's record for `employee_id` on `date`.
pub fn parse_status(text: &str, employee_id: &str, date: NaiveDate) -> Result<AttendanceRecord, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let obj = json_objects(trimmed)
        .into_iter()
        .map(unwrap_envelope)
        .find(has_punch_fields)
        .ok_or(ParseError::NoAttendanceObject)?;

    Ok(AttendanceRecord {
        employee_id: string_field(&obj, &["employee_id", "employeeId", "emp_id"])
            .unwrap_or_else(|| employee_id.to_string()),
        date,
        record_id: string_field(&obj, &["record_id", "recordId", "id"]),
        login_time_morning: slot(&obj, "login_time_morning", LOGIN_MORNING, LEGACY_LOGIN)?,
        logout_time_morning: slot(&obj, "logout_time_morning", LOGOUT_MORNING, LEGACY_LOGOUT)?,
        login_time_afternoon: slot(&obj, "login_time_afternoon", LOGIN_AFTERNOON, &[])?,
        logout_time_afternoon: slot(&obj, "logout_time_afternoon", LOGOUT_AFTERNOON, &[])?,
        reported_stage: string_field(&obj, &["attendance_stage", "attendanceStage"]),
    })
}

/// `{"time": "<ISO-8601>"}` from the time endpoint. Zone-less stamps are read as IST.
pub fn parse_server_time(text: &str) -> Result<DateTime<FixedOffset>, ParseError> {
    let obj = json_objects(text)
        .into_iter()
        .find(|o| o.contains_key("time"))
        .ok_or_else(|| ParseError::InvalidServerTime(text.trim().to_string()))?;
    let raw = obj
        .get("time")
        .and_then(Value::as_str)
        .map(str::trim)
        .ok_or_else(|| ParseError::InvalidServerTime(text.trim().to_string()))?;

    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            if let Some(t) = IST.from_local_datetime(&naive).single() {
                return Ok(t);
            }
        }
    }
    Err(ParseError::InvalidServerTime(raw.to_string()))
}

/// First object with a `status` field from the punch endpoint.
pub fn parse_punch_reply(text: &str) -> Result<PunchReply, ParseError> {
    let obj = json_objects(text)
        .into_iter()
        .find(|o| o.contains_key("status"))
        .ok_or(ParseError::NoAttendanceObject)?;
    Ok(serde_json::from_value(Value::Object(obj))?)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn hms(h: u32, m: u32, s: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, s)
    }

    #[test]
    fn single_object() {
        let record = parse_status(
            r#"{"status":"success","login_time_morning":"09:00:00","logout_time_morning":null}"#,
            "EMP001",
            date(),
        )
        .unwrap();
        assert_eq!(record.login_time_morning, hms(9, 0, 0));
        assert_eq!(record.logout_time_morning, None);
        assert_eq!(record.employee_id, "EMP001");
    }

    #[test]
    fn concatenated_objects_pick_the_first_with_punch_fields() {
        let body = r#"{"connected":true}{"status":"ok","record_id":7,"login_time_morning":"2026-10-18 09:05:10"}{"status":"late"}"#;
        let record = parse_status(body, "EMP001", date()).unwrap();
        assert_eq!(record.record_id.as_deref(), Some("7"));
        assert_eq!(record.login_time_morning, hms(9, 5, 10));
    }

    #[test]
    fn garbage_between_objects_is_skipped() {
        let body = "<br />Notice: x{\"broken\": }{\"punched_in\":true,\"login_time_morning\":\"9:00:00 AM\"}";
        let record = parse_status(body, "EMP001", date()).unwrap();
        assert_eq!(record.login_time_morning, hms(9, 0, 0));
    }

    #[test]
    fn notice_after_a_valid_object_keeps_the_next_one() {
        let body = "{\"connected\":true}<br />\n{\"status\":\"ok\",\"login_time_morning\":\"09:00:00\"}";
        let record = parse_status(body, "EMP001", date()).unwrap();
        assert_eq!(record.login_time_morning, hms(9, 0, 0));
        assert_eq!(json_objects(body).len(), 2);
    }

    #[test]
    fn broken_object_after_a_valid_one_is_skipped() {
        let body = r#"{"connected":true}{"status": }{"status":"ok","logout_time_morning":"13:00:00","login_time_morning":"09:00:00"}"#;
        let record = parse_status(body, "EMP001", date()).unwrap();
        assert_eq!(record.logout_time_morning, hms(13, 0, 0));
    }

    #[test]
    fn data_envelope_and_camel_case() {
        let body = r#"{"status":"success","data":{"employeeId":"EMP9","loginTimeMorning":"09:00:00","logoutTimeMorning":"13:00:00","loginTimeAfternoon":"14:00:00","attendance_stage":"waiting_logout_afternoon"}}"#;
        let record = parse_status(body, "EMP001", date()).unwrap();
        assert_eq!(record.employee_id, "EMP9");
        assert_eq!(record.login_time_afternoon, hms(14, 0, 0));
        assert_eq!(record.reported_stage.as_deref(), Some("waiting_logout_afternoon"));
    }

    #[test]
    fn placeholders_mean_absent() {
        let body = r#"{"punched_in":false,"login_time_morning":"","logout_time_morning":"00:00:00","login_time_afternoon":false}"#;
        let record = parse_status(body, "EMP001", date()).unwrap();
        assert_eq!(record, AttendanceRecord::empty("EMP001", date()));
    }

    #[test]
    fn legacy_single_session_names_fill_the_morning_pair() {
        let body = r#"{"login_time":"08:59:00","logout_time":"12:30:00"}"#;
        let record = parse_status(body, "EMP001", date()).unwrap();
        assert_eq!(record.login_time_morning, hms(8, 59, 0));
        assert_eq!(record.logout_time_morning, hms(12, 30, 0));
    }

    #[test]
    fn no_recognisable_object_is_an_explicit_error() {
        assert_matches!(
            parse_status(r#"{"hello":"world"}"#, "EMP001", date()),
            Err(ParseError::NoAttendanceObject)
        );
        assert_matches!(parse_status("   ", "EMP001", date()), Err(ParseError::Empty));
        assert_matches!(
            parse_status("<html>502</html>", "EMP001", date()),
            Err(ParseError::NoAttendanceObject)
        );
    }

    #[test]
    fn unreadable_time_is_rejected_not_guessed() {
        assert_matches!(
            parse_status(r#"{"status":"ok","login_time_morning":"soon"}"#, "EMP001", date()),
            Err(ParseError::InvalidTime { field: "login_time_morning", .. })
        );
    }

    #[test]
    fn server_time_with_and_without_zone() {
        let t = parse_server_time(r#"{"time":"2026-10-18T14:42:10+05:30"}"#).unwrap();
        assert_eq!(t.timestamp(), 1_792_314_730);

        let naive = parse_server_time(r#"{"time":"2026-10-18 14:42:10"}"#).unwrap();
        assert_eq!(naive, t);

        assert_matches!(parse_server_time("{}"), Err(ParseError::InvalidServerTime(_)));
    }

    #[test]
    fn punch_reply_survives_trailing_objects() {
        let reply = parse_punch_reply(r#"{"status":"success","message":"Punched in"}{"debug":1}"#).unwrap();
        assert_eq!(reply.status, "success");
        assert_eq!(reply.message.as_deref(), Some("Punched in"));
    }
}
