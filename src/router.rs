//! Segment-matching route table.
//!
//! One ordered route list per HTTP method. A pattern is split on `/`; a
//! segment written `:name` captures any non-empty path segment, every other
//! segment must match literally. Patterns ending in `/` (other than `/`
//! itself) are prefix routes, used for asset trees such as `/static/`.
//!
//! # Ambiguity
//!
//! Routes are tried in registration order and the **first** match wins. Given
//!
//! ```text
//! GET /snippet/create
//! GET /snippet/:id
//! ```
//!
//! `/snippet/create` reaches the first route. Register them the other way
//! round and `:id` swallows `create`. Concrete segments must be registered
//! before captures that could match the same position.
//!
//! Prefix routes are only consulted after every exact/capture pattern of the
//! method failed, so `/static/` never shadows a more specific route.

use std::collections::HashMap;
use std::sync::Arc;

use crate::handler::BoxedHandler;
use crate::method::Method;

/// Name under which a prefix route exposes the unmatched rest of the path.
pub const REST_PARAM: &str = "*";

/// A route that cannot be registered. Raised at startup, never per request.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("unknown HTTP method `{0}`")]
    UnknownMethod(String),

    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: &'static str },
}

// ── PathParams ───────────────────────────────────────────────────────────────

/// Capture name → matched path segment, owned by one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn insert(&mut self, name: &str, value: &str) {
        self.0.insert(name.to_owned(), value.to_owned());
    }
}

// ── Patterns ─────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
enum Segment {
    Literal(String),
    Capture(String),
}

enum Pattern {
    Segments(Vec<Segment>),
    Prefix(String),
}

impl Pattern {
    fn parse(pattern: &str) -> Result<Self, RouteError> {
        let invalid = |reason| RouteError::InvalidPattern { pattern: pattern.to_owned(), reason };

        if pattern.is_empty() {
            return Err(invalid("pattern is empty"));
        }
        let Some(rest) = pattern.strip_prefix('/') else {
            return Err(invalid("pattern must start with `/`"));
        };
        if pattern.len() > 1 && pattern.ends_with('/') {
            if pattern.contains(':') {
                return Err(invalid("prefix patterns cannot capture"));
            }
            return Ok(Self::Prefix(pattern.to_owned()));
        }

        let mut segments = Vec::new();
        for raw in rest.split('/') {
            match raw.strip_prefix(':') {
                Some("") => return Err(invalid("capture segment has an empty name")),
                Some(name) => {
                    if segments.iter().any(|s| matches!(s, Segment::Capture(n) if n == name)) {
                        return Err(invalid("capture name used twice"));
                    }
                    segments.push(Segment::Capture(name.to_owned()));
                }
                None => segments.push(Segment::Literal(raw.to_owned())),
            }
        }
        Ok(Self::Segments(segments))
    }

    fn matches(&self, path: &str) -> Option<PathParams> {
        match self {
            Self::Prefix(prefix) => {
                let rest = path.strip_prefix(prefix.as_str())?;
                let mut params = PathParams::default();
                params.insert(REST_PARAM, &urlencoding::decode(rest).ok()?);
                Some(params)
            }
            Self::Segments(segments) => {
                let parts: Vec<&str> = path.strip_prefix('/')?.split('/').collect();
                if parts.len() != segments.len() {
                    return None;
                }
                let mut params = PathParams::default();
                for (segment, raw) in segments.iter().zip(parts) {
                    // Segments split on the raw path, so `%2F` stays inside one.
                    let part = urlencoding::decode(raw).ok()?;
                    match segment {
                        Segment::Literal(lit) if *lit == part => {}
                        Segment::Capture(name) if !part.is_empty() => params.insert(name, &part),
                        _ => return None,
                    }
                }
                Some(params)
            }
        }
    }

    fn is_prefix(&self) -> bool {
        matches!(self, Self::Prefix(_))
    }
}

struct Route {
    pattern: Pattern,
    handler: BoxedHandler,
}

// ── Router ───────────────────────────────────────────────────────────────────

/// Outcome of [`Router::resolve`].
pub enum Resolution {
    Matched { handler: BoxedHandler, params: PathParams },
    NotFound,
    /// The path exists under these other methods (for the `Allow` header).
    MethodNotAllowed(Vec<Method>),
}

/// The route table.
///
/// Build it once at startup; it is read-only afterwards and shared across
/// connection tasks behind an `Arc`. Each registration returns
/// `Result<Self, RouteError>` so a table reads as one `?`-chained expression.
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, Vec<Route>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for a method given as its wire string.
    pub fn register(self, method: &str, pattern: &str, handler: BoxedHandler) -> Result<Self, RouteError> {
        let method: Method = method.parse()?;
        self.on(method, pattern, handler)
    }

    /// Register `handler` for `method` + `pattern`, after every route already
    /// registered for that method.
    pub fn on(mut self, method: Method, pattern: &str, handler: BoxedHandler) -> Result<Self, RouteError> {
        let pattern = Pattern::parse(pattern)?;
        self.routes.entry(method).or_default().push(Route { pattern, handler });
        Ok(self)
    }

    pub fn get(self, pattern: &str, handler: BoxedHandler) -> Result<Self, RouteError> {
        self.on(Method::Get, pattern, handler)
    }

    pub fn post(self, pattern: &str, handler: BoxedHandler) -> Result<Self, RouteError> {
        self.on(Method::Post, pattern, handler)
    }

    /// Resolves `method` + `path` to a handler and its captures.
    ///
    /// `method` is the raw request method; one that is not routable is
    /// treated like a method no route was registered for.
    pub fn resolve(&self, method: &str, path: &str) -> Resolution {
        let method = method.parse::<Method>().ok();

        if let Some((handler, params)) = method.and_then(|m| self.find(m, path)) {
            return Resolution::Matched { handler, params };
        }

        let allowed: Vec<Method> = Method::ALL
            .into_iter()
            .filter(|m| Some(*m) != method)
            .filter(|m| self.find(*m, path).is_some())
            .collect();

        if allowed.is_empty() {
            Resolution::NotFound
        } else {
            Resolution::MethodNotAllowed(allowed)
        }
    }

    fn find(&self, method: Method, path: &str) -> Option<(BoxedHandler, PathParams)> {
        let routes = self.routes.get(&method)?;
        let exact = routes.iter().filter(|r| !r.pattern.is_prefix());
        let prefix = routes.iter().filter(|r| r.pattern.is_prefix());
        exact.chain(prefix).find_map(|route| {
            route.pattern.matches(path).map(|params| (Arc::clone(&route.handler), params))
        })
    }
}
