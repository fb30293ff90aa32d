//! Upload an image, restyle it through an external image-generation API and
//! hand back the result URL, optionally relayed through this server.

pub mod config;
pub mod error;
pub mod relay;
pub mod routes;
pub mod sniff;
pub mod styles;
pub mod upload;
pub mod upstream;

pub use config::Config;
pub use error::AppError;
pub use routes::{router, AppState};
