use std::sync::Arc;

use tracing::{error, warn};
use uuid::Uuid;

use crate::handler::{boxed, BoxedHandler};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::session::{Session, CSRF_TOKEN};
use crate::status::Status;

/// Form field carrying the anti-forgery token.
pub const CSRF_FIELD: &str = "csrf_token";
/// Header alternative to [`CSRF_FIELD`] for non-form clients.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Rejects state-changing requests that do not present the session's
/// anti-forgery token with `400 Bad Request`.
///
/// Must run after the session middleware. The token is created on first
/// use and lives as long as the session; templates read it from there.
pub fn csrf(next: BoxedHandler) -> BoxedHandler {
    boxed(move |req: Request| {
        let next = Arc::clone(&next);
        async move {
            let Some(session) = req.session() else {
                error!("csrf check without a session; is the session middleware missing?");
                return Response::error(Status::InternalServerError);
            };
            let expected = csrf_token(session);

            let state_changing = req.method().parse::<Method>().is_ok_and(Method::is_unsafe);
            if state_changing {
                let presented = presented_token(&req);
                if !presented.is_some_and(|t| tokens_match(&t, &expected)) {
                    warn!(method = %req.method(), path = %req.path(), "rejected request without a valid csrf token");
                    return Response::error(Status::BadRequest);
                }
            }
            next.call(req).await
        }
    })
}

/// The session's token, minted if it has none yet.
pub fn csrf_token(session: &Session) -> String {
    if let Some(token) = session.get(CSRF_TOKEN) {
        return token;
    }
    let token = Uuid::new_v4().simple().to_string();
    session.put(CSRF_TOKEN, &token);
    token
}

fn presented_token(req: &Request) -> Option<String> {
    if let Some(token) = req.header(CSRF_HEADER) {
        return Some(token.to_owned());
    }
    let values = req.form().ok()?;
    values.first(CSRF_FIELD).map(str::to_owned)
}

/// Comparison whose running time does not depend on where the inputs differ.
/// The early length check only reveals the length, which is public: every
/// token is 32 hex characters.
fn tokens_match(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
