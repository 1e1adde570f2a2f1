//! Request dispatch: route table + standard chain.
//!
//! The standard chain wraps the *whole* dispatch, so panic recovery,
//! request logging and the security headers apply to every response,
//! 404 and 405 included. Per-route chains (dynamic, auth) are already baked
//! into the handlers stored in the [`Router`].

use std::sync::Arc;

use crate::handler::{boxed, BoxedHandler};
use crate::middleware::Chain;
use crate::request::Request;
use crate::response::Response;
use crate::router::{Resolution, Router};
use crate::status::Status;

/// Resolves and runs one request. Cheap to share: clone the `Arc` it lives
/// in, or call [`serve`](Dispatcher::serve) through a shared reference.
pub struct Dispatcher {
    entry: BoxedHandler,
}

impl Dispatcher {
    pub fn new(router: Router, standard: Chain) -> Self {
        let router = Arc::new(router);
        let mux = boxed(move |req: Request| {
            let router = Arc::clone(&router);
            async move { route(&router, req).await }
        });
        Self { entry: standard.then_boxed(mux) }
    }

    pub async fn serve(&self, req: Request) -> Response {
        self.entry.call(req).await
    }
}

async fn route(router: &Router, mut req: Request) -> Response {
    match router.resolve(req.method(), req.path()) {
        Resolution::Matched { handler, params } => {
            req.set_params(params);
            handler.call(req).await
        }
        Resolution::NotFound => Response::error(Status::NotFound),
        Resolution::MethodNotAllowed(allowed) => {
            let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
            Response::builder()
                .status(Status::MethodNotAllowed)
                .header("allow", &allow)
                .text(Status::MethodNotAllowed.reason())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::middleware::{self, wrapper};

    fn standard() -> Chain {
        Chain::new([
            wrapper(middleware::recover_panic),
            wrapper(middleware::log_request),
            wrapper(middleware::secure_headers),
        ])
    }

    fn counting(calls: &Arc<AtomicUsize>) -> BoxedHandler {
        let calls = Arc::clone(calls);
        boxed(move |req: Request| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if req.param("id") == Some("boom") {
                    panic!("handler failure");
                }
                Response::text(format!("item {}", req.param("id").unwrap_or("?")))
            }
        })
    }

    fn dispatcher(calls: &Arc<AtomicUsize>) -> Dispatcher {
        let router = Router::new()
            .get("/items/:id", counting(calls)).unwrap()
            .post("/items/:id", counting(calls)).unwrap();
        Dispatcher::new(router, standard())
    }

    #[tokio::test]
    async fn matched_route_sees_its_params() {
        let calls = Arc::new(AtomicUsize::new(0));
        let res = dispatcher(&calls).serve(Request::new("GET", "/items/12")).await;
        assert_eq!(res.status_code(), 200);
        assert_eq!(res.body_text(), "item 12");
        assert_eq!(res.header("x-frame-options"), Some("deny"));
    }

    #[tokio::test]
    async fn unmatched_requests_never_reach_a_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let d = dispatcher(&calls);

        let res = d.serve(Request::new("GET", "/nowhere")).await;
        assert_eq!(res.status_code(), 404);
        assert_eq!(res.header("x-content-type-options"), Some("nosniff"));

        let res = d.serve(Request::new("DELETE", "/items/3")).await;
        assert_eq!(res.status_code(), 405);
        assert_eq!(res.header("allow"), Some("GET, POST"));

        let res = d.serve(Request::new("OPTIONS", "/items/3")).await;
        assert_eq!(res.status_code(), 405);

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn panics_stop_at_the_standard_chain() {
        let calls = Arc::new(AtomicUsize::new(0));
        let d = dispatcher(&calls);

        let res = d.serve(Request::new("GET", "/items/boom")).await;
        assert_eq!(res.status_code(), 500);
        assert!(res.closes_connection());
        assert_eq!(res.body_text(), "Internal Server Error");
        assert_eq!(res.header("x-xss-protection"), Some("1; mode=block"));

        let res = d.serve(Request::new("GET", "/items/1")).await;
        assert_eq!(res.status_code(), 200);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
