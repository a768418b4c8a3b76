use crate::{
    api::{attendance, clock},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("rate limit values are non-zero");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let punch_limiter = build_limiter(config.rate_punch_per_min);
    let protected_limiter = build_limiter(config.rate_protected_per_min);

    // Everything needs a bearer token
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/attendance")
                    .service(web::resource("/open").route(web::post().to(attendance::open_surface)))
                    .service(web::resource("/close").route(web::post().to(attendance::close_surface)))
                    .service(web::resource("/refresh").route(web::post().to(attendance::refresh)))
                    .service(web::resource("/status").route(web::get().to(attendance::status)))
                    .service(web::resource("/stage").route(web::get().to(attendance::current_stage)))
                    .service(
                        web::resource("/next-action").route(web::get().to(attendance::next_action)),
                    )
                    .service(
                        web::resource("/punch")
                            .wrap(punch_limiter)
                            .route(web::post().to(attendance::submit_punch)),
                    ),
            )
            .service(
                web::scope("/clock")
                    .service(web::resource("/now").route(web::get().to(clock::now)))
                    .service(web::resource("/resync").route(web::post().to(clock::resync)))
                    .service(web::resource("/reset").route(web::post().to(clock::reset))),
            ),
    );
}

// OPEN SURFACE
//  └─ POST /attendance/open         (fetch record → resolve → configure gate)

// PUNCH
//  └─ POST /attendance/punch        (gate → submitter → API → re-fetch)

// CLOCK
//  ├─ GET  /clock/now               (device time + server offset)
//  └─ POST /clock/reset             (drop the offset and its file mirror)
