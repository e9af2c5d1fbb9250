//! Pure projection logic.

pub mod errors;
pub mod projection;
pub mod status_message;
