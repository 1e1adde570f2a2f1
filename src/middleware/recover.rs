use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::error;

use crate::handler::{boxed, BoxedHandler};
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// Turns a panic anywhere below into a `500` for this request only.
///
/// The response carries `Connection: close` so the server drops the
/// connection instead of reusing whatever state the panic left behind. The
/// panic does not escape: the connection task and the process keep running.
pub fn recover_panic(next: BoxedHandler) -> BoxedHandler {
    boxed(move |req: Request| {
        let next = Arc::clone(&next);
        async move {
            let method = req.method().to_owned();
            let path = req.path().to_owned();

            // `call` runs inside the future so a panic while building the
            // inner future is caught too.
            let outcome = AssertUnwindSafe(async move { next.call(req).await })
                .catch_unwind()
                .await;

            match outcome {
                Ok(res) => res,
                Err(payload) => {
                    error!(%method, %path, panic = panic_message(payload.as_ref()), "handler panicked");
                    let mut res = Response::error(Status::InternalServerError);
                    res.close_connection();
                    res
                }
            }
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        return s;
    }
    match payload.downcast_ref::<String>() {
        Some(s) => s.as_str(),
        None => "<non-string panic payload>",
    }
}
