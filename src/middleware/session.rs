use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::{wrapper, Wrapper};
use crate::handler::{boxed, BoxedHandler};
use crate::request::Request;
use crate::session::{cookie_header, Session, SessionStore, COOKIE_NAME};

/// Attaches the client's [`Session`] to the request.
///
/// A cookie naming a live session resumes it; anything else (no cookie, an
/// unknown or expired token) starts a new session whose cookie is set on the
/// response.
pub fn load_session(store: Arc<dyn SessionStore>, lifetime: Duration, secure: bool) -> Wrapper {
    wrapper(move |next: BoxedHandler| {
        let store = Arc::clone(&store);
        boxed(move |mut req: Request| {
            let next = Arc::clone(&next);
            let store = Arc::clone(&store);
            async move {
                let resumed = req
                    .cookie(COOKIE_NAME)
                    .filter(|token| store.load(token).is_some())
                    .map(str::to_owned);

                let session = match resumed {
                    Some(token) => Session::new(token, store, false),
                    None => {
                        let token = store.create();
                        debug!("started new session");
                        Session::new(token, store, true)
                    }
                };
                let set_cookie = session
                    .is_fresh()
                    .then(|| cookie_header(session.token(), lifetime, secure));

                req.set_session(session);
                let mut res = next.call(req).await;
                if let Some(cookie) = set_cookie {
                    res.append_header("set-cookie", &cookie);
                }
                res
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemorySessionStore, FLASH};
    use crate::Response;

    fn store() -> Arc<dyn SessionStore> {
        Arc::new(MemorySessionStore::new(Duration::from_secs(60)))
    }

    fn echo_flash() -> BoxedHandler {
        boxed(|req: Request| async move {
            let session = req.session().expect("session attached");
            Response::text(session.pop(FLASH).unwrap_or_default())
        })
    }

    #[tokio::test]
    async fn new_visitors_get_a_cookie() {
        let handler = load_session(store(), Duration::from_secs(60), false)(echo_flash());

        let res = handler.call(Request::new("GET", "/")).await;

        let cookie = res.header("set-cookie").expect("cookie set");
        assert!(cookie.starts_with("session="));
    }

    #[tokio::test]
    async fn known_cookie_resumes_the_session() {
        let store = store();
        let token = store.create();
        store.put(&token, FLASH, "welcome back");
        let handler = load_session(Arc::clone(&store), Duration::from_secs(60), false)(echo_flash());

        let res = handler
            .call(Request::new("GET", "/").with_header("cookie", &format!("session={token}")))
            .await;

        assert_eq!(res.body_text(), "welcome back");
        assert!(res.header("set-cookie").is_none());
        assert_eq!(store.get(&token, FLASH), None);
    }

    #[tokio::test]
    async fn unknown_cookie_starts_over() {
        let handler = load_session(store(), Duration::from_secs(60), false)(echo_flash());

        let res = handler
            .call(Request::new("GET", "/").with_header("cookie", "session=forged"))
            .await;

        let cookie = res.header("set-cookie").expect("cookie set");
        assert!(!cookie.starts_with("session=forged"));
    }
}
