pub mod backend;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod formatter;
pub mod history;
pub mod session;
pub mod signin;

pub use checkin_common::protocol;
pub use checkin_common::session as session_state;
