use std::sync::Arc;

use crate::handler::{boxed, BoxedHandler};
use crate::request::Request;
use crate::response::Response;
use crate::session::Session;

/// Where unauthenticated visitors are sent.
pub const LOGIN_PATH: &str = "/user/login";

/// Lets the request through only when the session is authenticated;
/// otherwise redirects to [`LOGIN_PATH`] without calling `next`.
///
/// Pages behind this gate are marked `Cache-Control: no-store`.
pub fn require_authentication(next: BoxedHandler) -> BoxedHandler {
    boxed(move |req: Request| {
        let next = Arc::clone(&next);
        async move {
            if !req.session().is_some_and(Session::is_authenticated) {
                return Response::redirect(LOGIN_PATH);
            }
            let mut res = next.call(req).await;
            res.set_header("cache-control", "no-store");
            res
        }
    })
}
