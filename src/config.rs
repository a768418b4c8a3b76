use std::env;
use std::path::PathBuf;
use std::time::Duration;

use dotenvy::dotenv;

#[derive(Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub server_addr: String,

    // Upstream attendance API
    pub attendance_api_url: String,
    pub upstream_timeout: Duration,

    // Clock offset lifetime and optional on-disk mirror
    pub clock_offset_ttl: Duration,
    pub clock_offset_file: Option<PathBuf>,

    // Rate limiting
    pub rate_punch_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,
    pub log_level: tracing::Level,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),

            attendance_api_url: var_or("ATTENDANCE_API_URL", "https://www.fist-o.com/web_crm"),
            upstream_timeout: Duration::from_secs(
                var_or("UPSTREAM_TIMEOUT_SECS", "10") // default 10 s
                    .parse()
                    .expect("UPSTREAM_TIMEOUT_SECS must be a number"),
            ),

            clock_offset_ttl: Duration::from_secs(
                var_or("CLOCK_OFFSET_TTL_SECS", "86400") // default 1 day
                    .parse()
                    .expect("CLOCK_OFFSET_TTL_SECS must be a number"),
            ),
            clock_offset_file: env::var("CLOCK_OFFSET_FILE").ok().map(PathBuf::from),

            rate_punch_per_min: var_or("RATE_PUNCH_PER_MIN", "30")
                .parse()
                .expect("RATE_PUNCH_PER_MIN must be a number"),
            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", "1000")
                .parse()
                .expect("RATE_PROTECTED_PER_MIN must be a number"),

            api_prefix: var_or("API_PREFIX", "/api"),
            log_dir: var_or("LOG_DIR", "logs"),
            log_level: var_or("LOG_LEVEL", "debug")
                .parse()
                .expect("LOG_LEVEL must be one of trace, debug, info, warn, error"),
        }
    }
}
