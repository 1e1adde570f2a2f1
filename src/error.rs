//! Unified error type.

use crate::config::ConfigError;
use crate::router::RouteError;
use crate::templates::RenderError;

/// The error type returned by startup and serving.
///
/// Application-level outcomes (404, validation failures, a store error
/// inside one request) are expressed as HTTP [`Response`](crate::Response)
/// values, not as `Error`s. This type surfaces what stops the process:
/// bad configuration, an invalid route table, templates that do not
/// compile, or failing to bind the listener.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Render(#[from] RenderError),
}
