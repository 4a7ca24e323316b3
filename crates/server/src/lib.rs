//! HTTP and WebSocket surface for the driver-assist service

pub mod http;
pub mod state;
pub mod websocket;

pub use http::create_router;
pub use state::AppState;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("adapter wiring error: {0}")]
    Adapters(String),
}
