//! Portfolio assistant server - Library exports for testing
//!
//! A rule-based chat assistant that answers visitor questions about the site owner.

pub mod api;
pub mod core;
pub mod infrastructure;
