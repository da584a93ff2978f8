//! HTTP API handlers for feedback-intake

pub mod feedback;
pub mod health;

pub use feedback::{close_feedback, list_feedback, submit_feedback};
pub use health::health_routes;
