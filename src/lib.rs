//! Attendance punch core: authoritative clock, stage resolution, guarded
//! punch submission, and the actix-web surface the UI talks to.

pub mod api;
pub mod attendance;
pub mod auth;
pub mod clock;
pub mod config;
pub mod docs;
pub mod error;
pub mod model;
pub mod models;
pub mod routes;
pub mod upstream;
pub mod utils;
