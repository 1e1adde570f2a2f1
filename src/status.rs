//! HTTP status codes as a typed enum.
//!
//! Use [`Status`] anywhere a status code is accepted — `Response::status()`,
//! `Response::builder().status()`, or as a bare handler return value.
//!
//! ```rust
//! use snippetbox::{Response, Status};
//!
//! // status-only, no body
//! Response::status(Status::NotFound);
//!
//! // post/redirect/get
//! Response::redirect("/snippet/1");
//! ```

/// The status codes this application emits.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,                  // 200

    // ── 3xx Redirection ───────────────────────────────────────────────────────
    SeeOther,            // 303

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest,          // 400
    NotFound,            // 404
    MethodNotAllowed,    // 405
    PayloadTooLarge,     // 413

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError, // 500
}

impl Status {
    /// Canonical reason phrase, used for plain-text error bodies.
    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok                  => "OK",
            Status::SeeOther            => "See Other",
            Status::BadRequest          => "Bad Request",
            Status::NotFound            => "Not Found",
            Status::MethodNotAllowed    => "Method Not Allowed",
            Status::PayloadTooLarge     => "Payload Too Large",
            Status::InternalServerError => "Internal Server Error",
        }
    }
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        match s {
            Status::Ok                  => 200,
            Status::SeeOther            => 303,
            Status::BadRequest          => 400,
            Status::NotFound            => 404,
            Status::MethodNotAllowed    => 405,
            Status::PayloadTooLarge     => 413,
            Status::InternalServerError => 500,
        }
    }
}
