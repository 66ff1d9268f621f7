pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod rules;
pub mod state;
pub mod types;
pub mod validation;

pub use router::app;
pub use state::AppState;
