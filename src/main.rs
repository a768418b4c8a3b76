use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use chrono::Utc;
use dotenvy::dotenv;

use attendance::attendance::controller::AttendanceController;
use attendance::clock::{ClockSync, IST, SystemClock};
use attendance::config::Config;
use attendance::docs::ApiDoc;
use attendance::routes;
use attendance::upstream::client::HttpAttendanceApi;
use attendance::utils::offset_cache::OffsetStore;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/health")]
async fn health() -> impl Responder {
    "ok"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Attendance service starting...");

    let api = Arc::new(HttpAttendanceApi::new(
        &config.attendance_api_url,
        config.upstream_timeout,
    )?);

    let store = OffsetStore::new(config.clock_offset_ttl, config.clock_offset_file.clone());
    // Only a same-day mirror is reused; the device date is good enough to pick it.
    store.restore(Utc::now().with_timezone(&*IST).date_naive());

    let clock = Arc::new(ClockSync::new(api.clone(), Arc::new(SystemClock), store));
    let controller = Data::new(AttendanceController::new(api, clock.clone()));

    actix_web::rt::spawn(async move {
        if let Err(e) = clock.sync().await {
            warn!(error = %e, "Initial clock sync failed, will retry when the surface opens");
        }
    });

    // Clone values for the closure (avoid move issues)
    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(controller.clone())
            .service(health)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
