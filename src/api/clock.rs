use crate::attendance::controller::AttendanceController;
use crate::clock::{ClockSync, format_clock, format_long};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct ClockResponse {
    #[schema(example = "2026-10-18T09:12:10Z", format = "date-time", value_type = String)]
    pub utc: DateTime<Utc>,
    #[schema(example = "2026-10-18T14:42:10+05:30")]
    pub ist: String,
    #[schema(example = "2026-10-18")]
    pub date: String,
    /// Long form for the dashboard header
    #[schema(example = "Sunday, October 18, 2026, 02:42:10 PM")]
    pub display: String,
    /// Short form for the punch surface clock
    #[schema(example = "2:42:10 PM")]
    pub clock: String,
    /// False while running on device time
    pub synced: bool,
    #[schema(example = 1500)]
    pub offset_ms: Option<i64>,
}

impl ClockResponse {
    pub fn from_clock(clock: &ClockSync) -> Self {
        let offset = clock.offset();
        let now = clock.now();
        let ist = now.with_timezone(&*crate::clock::IST);
        Self {
            utc: now,
            ist: ist.to_rfc3339(),
            date: ist.format("%Y-%m-%d").to_string(),
            display: format_long(&ist),
            clock: format_clock(&ist),
            synced: offset.is_some(),
            offset_ms: offset.map(|o| o.offset_ms()),
        }
    }
}

/// Authoritative current time
#[utoipa::path(
    get,
    path = "/api/clock/now",
    responses(
        (status = 200, description = "Server-corrected time", body = ClockResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Clock"
)]
pub async fn now(controller: web::Data<AttendanceController>) -> impl Responder {
    HttpResponse::Ok().json(ClockResponse::from_clock(controller.clock()))
}

/// Fetch server time again and replace the offset
#[utoipa::path(
    post,
    path = "/api/clock/resync",
    responses(
        (status = 200, description = "Offset refreshed", body = ClockResponse),
        (status = 503, description = "Time source unreachable, previous offset kept")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Clock"
)]
pub async fn resync(
    controller: web::Data<AttendanceController>,
) -> actix_web::Result<impl Responder> {
    controller.clock().resync().await?;
    Ok(HttpResponse::Ok().json(ClockResponse::from_clock(controller.clock())))
}

/// Forget the offset; reads fall back to device time until the next sync
#[utoipa::path(
    post,
    path = "/api/clock/reset",
    responses(
        (status = 200, description = "Offset cleared", body = ClockResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Clock"
)]
pub async fn reset(controller: web::Data<AttendanceController>) -> impl Responder {
    controller.clock().reset();
    HttpResponse::Ok().json(ClockResponse::from_clock(controller.clock()))
}
