pub mod attendance;
pub mod clock;
