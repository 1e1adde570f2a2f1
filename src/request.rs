//! Incoming HTTP request type.

use std::net::SocketAddr;

use crate::forms::{FormParseError, Values};
use crate::router::PathParams;
use crate::session::Session;

/// An incoming HTTP request with its body fully read.
///
/// Everything here is owned by the request: path parameters and the attached
/// session handle are created per request and dropped with it.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: String,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Vec<u8>,
    pub(crate) params: PathParams,
    pub(crate) remote_addr: Option<SocketAddr>,
    pub(crate) session: Option<Session>,
}

impl Request {
    /// Builds a request for `method` and `target` (path plus optional query).
    ///
    /// ```rust
    /// use snippetbox::Request;
    ///
    /// let req = Request::new("POST", "/snippet/create?draft=1")
    ///     .with_header("content-type", "application/x-www-form-urlencoded")
    ///     .with_body("title=hi");
    /// assert_eq!(req.path(), "/snippet/create");
    /// assert_eq!(req.query(), Some("draft=1"));
    /// ```
    pub fn new(method: &str, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p.to_owned(), Some(q.to_owned())),
            None => (target.to_owned(), None),
        };
        Self {
            method: method.to_owned(),
            path,
            query,
            headers: Vec::new(),
            body: Vec::new(),
            params: PathParams::default(),
            remote_addr: None,
            session: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn method(&self) -> &str { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }
    pub fn params(&self) -> &PathParams { &self.params }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/snippet/:id`, `req.param("id")` on `/snippet/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    /// Value of cookie `name` from the `Cookie` header(s).
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("cookie"))
            .flat_map(|(_, v)| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    /// Session attached by the session middleware, if it ran.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub(crate) fn set_params(&mut self, params: PathParams) {
        self.params = params;
    }

    pub(crate) fn set_session(&mut self, session: Session) {
        self.session = Some(session);
    }

    /// Parses an `application/x-www-form-urlencoded` body.
    ///
    /// A missing content type is accepted; any other content type, or a body
    /// that is not valid UTF-8, is a [`FormParseError`].
    pub fn form(&self) -> Result<Values, FormParseError> {
        if let Some(ct) = self.header("content-type") {
            let mime = ct.split(';').next().unwrap_or("").trim();
            if !mime.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
                return Err(FormParseError::ContentType(mime.to_owned()));
            }
        }
        Values::parse(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_lookup_handles_multiple_pairs() {
        let req = Request::new("GET", "/")
            .with_header("Cookie", "theme=dark; session=abc123");
        assert_eq!(req.cookie("session"), Some("abc123"));
        assert_eq!(req.cookie("theme"), Some("dark"));
        assert_eq!(req.cookie("missing"), None);
    }

    #[test]
    fn form_rejects_json_bodies() {
        let req = Request::new("POST", "/")
            .with_header("content-type", "application/json")
            .with_body(r#"{"title":"x"}"#);
        assert!(matches!(req.form(), Err(FormParseError::ContentType(_))));
    }

    #[test]
    fn form_accepts_charset_parameter() {
        let req = Request::new("POST", "/")
            .with_header("content-type", "application/x-www-form-urlencoded; charset=UTF-8")
            .with_body("title=a+b&content=c%26d");
        let values = req.form().unwrap();
        assert_eq!(values.get("title"), "a b");
        assert_eq!(values.get("content"), "c&d");
    }
}
