//! # snippetbox
//!
//! A small snippet-sharing web application and the request pipeline it runs
//! on: a segment-matching route table, composable middleware chains,
//! form validation and cookie sessions, served over hyper.
//!
//! ## Request flow
//!
//! ```text
//! hyper ─► Server ─► Dispatcher
//!                      └─ standard chain (recover, log, security headers)
//!                           └─ Router::resolve ─► 404 / 405 + Allow
//!                                └─ route chain (session, CSRF, auth)
//!                                     └─ handler ─► Response
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use snippetbox::{routes, App, Config, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), snippetbox::Error> {
//!     let config = Config::load(None)?;
//!     let addr = config.socket_addr()?;
//!     let app = Arc::new(App::in_memory(config)?);
//!
//!     Server::bind(addr).serve(routes(app)?).await
//! }
//! ```

mod app;
mod config;
mod dispatcher;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod routes;
mod server;
mod static_files;
mod status;

pub mod forms;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod session;
pub mod templates;

pub use app::App;
pub use config::{Config, ConfigError};
pub use dispatcher::Dispatcher;
pub use error::Error;
pub use handler::{boxed, BoxFuture, BoxedHandler, ErasedHandler, Handler};
pub use method::Method;
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::{PathParams, Resolution, RouteError, Router, REST_PARAM};
pub use routes::{dynamic_chain, routes, standard_chain};
pub use server::{Server, DEFAULT_MAX_BODY};
pub use static_files::StaticFiles;
pub use status::Status;
