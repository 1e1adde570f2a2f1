use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::handler::{boxed, BoxedHandler};
use crate::request::Request;

/// Logs every request on arrival (remote address, method, path) and once
/// more with its status and latency when the response comes back.
pub fn log_request(next: BoxedHandler) -> BoxedHandler {
    boxed(move |req: Request| {
        let next = Arc::clone(&next);
        async move {
            let method = req.method().to_owned();
            let path = req.path().to_owned();
            let remote = req
                .remote_addr()
                .map_or_else(|| "-".to_owned(), |addr| addr.to_string());

            info!(%remote, %method, %path, "request");
            let started = Instant::now();
            let res = next.call(req).await;
            info!(
                %method,
                %path,
                status = res.status_code(),
                latency_us = started.elapsed().as_micros() as u64,
                "response"
            );
            res
        }
    })
}
