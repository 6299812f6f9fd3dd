//! HTTP/JSON surface for the résumé/JD matching & roadmap engine (spec §6).

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

pub use config::Config;
pub use state::AppState;
