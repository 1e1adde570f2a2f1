//! Middleware chains.
//!
//! A middleware is a [`Wrapper`]: it receives the *next* handler and returns
//! a replacement that decides whether and how to call it. It may
//!
//! - call `next` and pass the response back up (possibly adding headers),
//! - answer on its own without calling `next` (auth redirect, CSRF reject),
//! - put a panic boundary around `next` ([`recover_panic`]).
//!
//! A [`Chain`] is an ordered, immutable list of wrappers. The first listed
//! wrapper is the outermost: it sees the request first and the response last.
//!
//! ```rust
//! use snippetbox::middleware::{self, Chain};
//! use snippetbox::{Request, Response};
//!
//! async fn home(_req: Request) -> Response { Response::html("<h1>home</h1>") }
//!
//! let standard = Chain::new([
//!     middleware::wrapper(middleware::recover_panic),
//!     middleware::wrapper(middleware::log_request),
//!     middleware::wrapper(middleware::secure_headers),
//! ]);
//! let handler = standard.then(home);
//! ```

mod auth;
mod csrf;
mod headers;
mod logging;
mod recover;
mod session;

use std::sync::Arc;

use crate::handler::{boxed, BoxedHandler, Handler};

pub use auth::{require_authentication, LOGIN_PATH};
pub use csrf::{csrf, csrf_token, CSRF_FIELD, CSRF_HEADER};
pub use headers::{secure_headers, SECURE_HEADERS};
pub use logging::log_request;
pub use recover::recover_panic;
pub use session::load_session;

/// `next` in, replacement handler out.
pub type Wrapper = Arc<dyn Fn(BoxedHandler) -> BoxedHandler + Send + Sync>;

/// Turns a plain function or closure into a [`Wrapper`].
pub fn wrapper<F>(f: F) -> Wrapper
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    Arc::new(f)
}

/// An ordered, immutable sequence of wrappers.
///
/// Nothing runs when a chain is built; wrappers are applied by
/// [`then`](Chain::then). [`append`](Chain::append) returns a new chain and
/// leaves `self` untouched, so one base chain can serve many routes.
#[derive(Clone, Default)]
pub struct Chain {
    wrappers: Vec<Wrapper>,
}

impl Chain {
    pub fn new(wrappers: impl IntoIterator<Item = Wrapper>) -> Self {
        Self { wrappers: wrappers.into_iter().collect() }
    }

    /// `self` followed by `more`. The wrappers themselves are shared, not
    /// copied.
    pub fn append(&self, more: impl IntoIterator<Item = Wrapper>) -> Self {
        let mut wrappers = self.wrappers.clone();
        wrappers.extend(more);
        Self { wrappers }
    }

    pub fn len(&self) -> usize { self.wrappers.len() }
    pub fn is_empty(&self) -> bool { self.wrappers.is_empty() }

    /// Composes the chain around `handler`.
    pub fn then(&self, handler: impl Handler) -> BoxedHandler {
        self.then_boxed(boxed(handler))
    }

    /// Folds right to left so `wrappers[0]` ends up outermost.
    pub fn then_boxed(&self, handler: BoxedHandler) -> BoxedHandler {
        self.wrappers.iter().rev().fold(handler, |next, wrap| wrap(next))
    }
}
