pub mod attendance;
pub mod stage;
