use crate::api::attendance::{NextActionResponse, PunchRequest, StageResponse};
use crate::api::clock::ClockResponse;
use crate::attendance::controller::{AttendanceStatus, PunchOutcome};
use crate::attendance::session::Activity;
use crate::model::attendance::{AttendanceRecord, Punch, PunchAction, Session};
use crate::model::stage::AttendanceStage;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Punch API",
        version = "1.0.0",
        description = r#"
## Attendance Punch Service

Local service behind the employee's punch surface. It keeps one user's
attendance for the day honest against the HR server.

### 🔹 Key Features
- **Authoritative clock**
  - Server time is fetched once per session; every punch is stamped with it
- **Stage tracking**
  - Morning IN → morning OUT → afternoon IN → afternoon OUT, derived from the server record
- **Guarded punches**
  - Out-of-order and double submissions are rejected before anything is sent

### 🔐 Security
All endpoints need a **JWT Bearer** token carrying the employee id.

### 📦 Response Format
- JSON bodies; errors as `{"error": ..., "code": ...}`

---
Built with **Rust**, **Actix Web**, **reqwest**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::open_surface,
        crate::api::attendance::close_surface,
        crate::api::attendance::refresh,
        crate::api::attendance::status,
        crate::api::attendance::current_stage,
        crate::api::attendance::next_action,
        crate::api::attendance::submit_punch,

        crate::api::clock::now,
        crate::api::clock::resync,
        crate::api::clock::reset
    ),
    components(
        schemas(
            AttendanceRecord,
            AttendanceStage,
            AttendanceStatus,
            Activity,
            Punch,
            PunchAction,
            Session,
            PunchRequest,
            PunchOutcome,
            StageResponse,
            NextActionResponse,
            ClockResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Punch surface APIs"),
        (name = "Clock", description = "Authoritative time APIs"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
