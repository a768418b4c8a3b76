pub mod controller;
pub mod gate;
pub mod resolver;
pub mod session;
pub mod submitter;
