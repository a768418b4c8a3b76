use crate::attendance::controller::{AttendanceController, AttendanceStatus, PunchOutcome};
use crate::auth::auth::AuthUser;
use crate::error::AttendanceError;
use crate::model::attendance::{Punch, PunchAction, Session};
use crate::model::stage::AttendanceStage;
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct PunchRequest {
    #[schema(example = "in")]
    pub action: PunchAction,
    /// Defaults to the session of the next legal punch
    #[schema(example = "morning")]
    pub session: Option<Session>,
}

#[derive(Serialize, ToSchema)]
pub struct StageResponse {
    pub stage: Option<AttendanceStage>,
    #[schema(example = "Morning Logged In")]
    pub label: String,
}

#[derive(Serialize, ToSchema)]
pub struct NextActionResponse {
    pub next_action: Option<Punch>,
}

/// Open the punch surface and load today's attendance
#[utoipa::path(
    post,
    path = "/api/attendance/open",
    responses(
        (status = 200, description = "Surface opened with today's status", body = AttendanceStatus),
        (status = 401, description = "Session expired or not logged in"),
        (status = 403, description = "Surface is open for another employee"),
        (status = 422, description = "Server record is inconsistent"),
        (status = 502, description = "Attendance status could not be loaded")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn open_surface(
    auth: AuthUser,
    controller: web::Data<AttendanceController>,
) -> Result<impl Responder, AttendanceError> {
    let status = controller.open_surface(auth.identity()).await?;
    Ok(HttpResponse::Ok().json(status))
}

/// Close the punch surface
#[utoipa::path(
    post,
    path = "/api/attendance/close",
    responses(
        (status = 204, description = "Surface closed"),
        (status = 403, description = "Surface is open for another employee")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn close_surface(
    auth: AuthUser,
    controller: web::Data<AttendanceController>,
) -> Result<impl Responder, AttendanceError> {
    controller.check_owner(auth.identity().as_ref())?;
    controller.close_surface();
    Ok(HttpResponse::NoContent().finish())
}

/// Re-fetch today's record and re-derive the stage
#[utoipa::path(
    post,
    path = "/api/attendance/refresh",
    responses(
        (status = 200, description = "Fresh status", body = AttendanceStatus),
        (status = 428, description = "Surface is not open"),
        (status = 502, description = "Attendance status could not be loaded")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn refresh(
    auth: AuthUser,
    controller: web::Data<AttendanceController>,
) -> Result<impl Responder, AttendanceError> {
    controller.check_owner(auth.identity().as_ref())?;
    let status = controller.refresh().await?;
    Ok(HttpResponse::Ok().json(status))
}

/// Full status for the surface
#[utoipa::path(
    get,
    path = "/api/attendance/status",
    responses(
        (status = 200, description = "Current status", body = AttendanceStatus)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn status(
    auth: AuthUser,
    controller: web::Data<AttendanceController>,
) -> Result<impl Responder, AttendanceError> {
    controller.check_owner(auth.identity().as_ref())?;
    Ok(HttpResponse::Ok().json(controller.status()))
}

/// Current attendance stage
#[utoipa::path(
    get,
    path = "/api/attendance/stage",
    responses(
        (status = 200, description = "Stage, or null when none is loaded", body = StageResponse, example = json!({
            "stage": "waiting_logout_morning",
            "label": "Morning Logged In"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn current_stage(
    auth: AuthUser,
    controller: web::Data<AttendanceController>,
) -> Result<impl Responder, AttendanceError> {
    controller.check_owner(auth.identity().as_ref())?;
    let stage = controller.current_stage();
    Ok(HttpResponse::Ok().json(StageResponse {
        stage,
        label: stage.map_or("Unknown", |s| s.label()).to_string(),
    }))
}

/// The only punch allowed right now
#[utoipa::path(
    get,
    path = "/api/attendance/next-action",
    responses(
        (status = 200, description = "Next legal punch, null when none", body = NextActionResponse, example = json!({
            "next_action": { "action": "out", "session": "morning" }
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn next_action(
    auth: AuthUser,
    controller: web::Data<AttendanceController>,
) -> Result<impl Responder, AttendanceError> {
    controller.check_owner(auth.identity().as_ref())?;
    Ok(HttpResponse::Ok().json(NextActionResponse {
        next_action: controller.next_legal_action(),
    }))
}

/// Submit a punch
#[utoipa::path(
    post,
    path = "/api/attendance/punch",
    request_body(
        content = PunchRequest,
        description = "Punch to record",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Punch recorded", body = PunchOutcome),
        (status = 400, description = "Punch not allowed in the current stage", body = Object, example = json!({
            "error": "you must punch IN before OUT",
            "code": "INVALID_TRANSITION"
        })),
        (status = 409, description = "Server already moved past this stage"),
        (status = 422, description = "Server rejected the punch"),
        (status = 428, description = "Surface is not open"),
        (status = 502, description = "Network failure, nothing recorded"),
        (status = 504, description = "Timed out, refresh before retrying")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn submit_punch(
    auth: AuthUser,
    controller: web::Data<AttendanceController>,
    body: web::Json<PunchRequest>,
) -> Result<impl Responder, AttendanceError> {
    let punch = controller.punch_for(body.action, body.session);
    let outcome = controller.submit_punch(auth.identity(), punch).await?;
    Ok(HttpResponse::Ok().json(outcome))
}
