//! Database access for feedback-intake
//!
//! Operations take a single connection so a request keeps one session from
//! its first write to its response.

pub mod feedback;

pub use feedback::FeedbackFilter;
