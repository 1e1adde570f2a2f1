//! HTTP server and graceful shutdown.
//!
//! hyper owns the wire; this module only converts between hyper's types and
//! the crate's [`Request`]/[`Response`], and hands every request to the
//! [`Dispatcher`].
//!
//! # Graceful shutdown
//!
//! On SIGTERM or Ctrl-C the server stops accepting connections, lets every
//! in-flight connection task finish, then returns from [`Server::serve`].

use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::Error;
use crate::middleware::SECURE_HEADERS;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// Body limit used unless [`Server::max_body`] says otherwise.
pub const DEFAULT_MAX_BODY: usize = 1024 * 1024;

pub struct Server {
    addr: SocketAddr,
    max_body: usize,
}

impl Server {
    /// The listener is bound when [`serve`](Server::serve) is called.
    pub fn bind(addr: SocketAddr) -> Self {
        Self { addr, max_body: DEFAULT_MAX_BODY }
    }

    /// Requests whose body exceeds `bytes` are answered with `413` without
    /// reading the rest.
    pub fn max_body(mut self, bytes: usize) -> Self {
        self.max_body = bytes;
        self
    }

    /// Accepts connections until a shutdown signal arrives, then drains.
    pub async fn serve(self, dispatcher: Dispatcher) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let dispatcher = Arc::new(dispatcher);
        let max_body = self.max_body;

        info!(addr = %self.addr, max_body, "snippetbox listening");

        let mut tasks = tokio::task::JoinSet::new();
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Shutdown first: a queued backlog must not delay it.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let dispatcher = Arc::clone(&dispatcher);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let dispatcher = Arc::clone(&dispatcher);
                            async move { dispatch(&dispatcher, req, remote_addr, max_body).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            debug!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("snippetbox stopped");
        Ok(())
    }
}

/// A request body that never reached the dispatcher.
#[derive(Debug, thiserror::Error)]
enum BodyError {
    #[error("request body exceeds {0} bytes")]
    TooLarge(usize),

    #[error("cannot read request body: {0}")]
    Read(Box<dyn StdError + Send + Sync>),
}

/// Reads the body (up to `max_body` bytes), runs the request through the
/// dispatcher and converts the answer back. Never fails: every error is
/// already a response.
async fn dispatch<B>(
    dispatcher: &Dispatcher,
    req: hyper::Request<B>,
    remote_addr: SocketAddr,
    max_body: usize,
) -> Result<http::Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let req = match into_request(req, remote_addr, max_body).await {
        Ok(req) => req,
        Err(e) => {
            warn!(peer = %remote_addr, error = %e, "rejected request body");
            return Ok(rejection(&e).into_hyper());
        }
    };
    Ok(dispatcher.serve(req).await.into_hyper())
}

/// The answer for a body the dispatcher never saw. The connection is closed
/// since the rest of the body is left unread.
fn rejection(err: &BodyError) -> Response {
    let status = match err {
        BodyError::TooLarge(_) => Status::PayloadTooLarge,
        BodyError::Read(_) => Status::BadRequest,
    };
    let mut res = Response::error(status);
    for (name, value) in SECURE_HEADERS {
        res.set_header(name, value);
    }
    res.close_connection();
    res
}

async fn into_request<B>(
    req: hyper::Request<B>,
    remote_addr: SocketAddr,
    max_body: usize,
) -> Result<Request, BodyError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let (parts, body) = req.into_parts();
    let body = match Limited::new(body, max_body).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => return Err(BodyError::TooLarge(max_body)),
        Err(e) => return Err(BodyError::Read(e)),
    };

    let target = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path().to_owned(), |pq| pq.as_str().to_owned());

    let mut request = Request::new(parts.method.as_str(), &target)
        .with_body(body.to_vec())
        .with_remote_addr(remote_addr);
    for (name, value) in &parts.headers {
        // Non-UTF-8 header values are not something any handler reads.
        if let Ok(value) = value.to_str() {
            request = request.with_header(name.as_str(), value);
        }
    }
    Ok(request)
}

/// Resolves on SIGTERM (Unix) or Ctrl-C, whichever comes first.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
