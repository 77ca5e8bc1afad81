//! Request payloads, derived views, and their validation helpers.

/// Room requests and views.
pub mod room;
/// Custom validation functions.
pub mod validation;
