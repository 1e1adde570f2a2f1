use std::sync::Arc;

use crate::handler::{boxed, BoxedHandler};
use crate::request::Request;

/// Response headers set on every response.
pub const SECURE_HEADERS: [(&str, &str); 3] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "deny"),
    ("x-xss-protection", "1; mode=block"),
];

/// Sets [`SECURE_HEADERS`] on the way out, overriding anything the handler
/// set for the same names.
pub fn secure_headers(next: BoxedHandler) -> BoxedHandler {
    boxed(move |req: Request| {
        let next = Arc::clone(&next);
        async move {
            let mut res = next.call(req).await;
            for (name, value) in SECURE_HEADERS {
                res.set_header(name, value);
            }
            res
        }
    })
}
