pub mod config;
pub mod error;
pub mod knowledge;
pub mod render;
pub mod services;
pub mod session;
pub mod traits;
