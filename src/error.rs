// src/error.rs
// =============================================================================
// Typed errors for the two places where callers care WHAT went wrong:
// - RenderError: the page renderer (browser launch, navigation, scripts)
// - SinkError: writing result rows to disk
//
// Everything else uses anyhow at the application boundary (main.rs).
// =============================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to start renderer: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("no page has been loaded")]
    NoPage,

    #[error("failed to shut down renderer: {0}")]
    Shutdown(String),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
