//! End-to-end tests: every request goes through the full dispatcher
//! (standard chain, route table, per-route chains, handlers, templates)
//! against in-memory stores. No socket is opened.

use std::path::PathBuf;
use std::sync::Arc;

use snippetbox::models::{MemorySnippetStore, MemoryUserStore, Snippet, SnippetStore, StoreError};
use snippetbox::session::{MemorySessionStore, SessionStore, AUTH_USER_ID, CSRF_TOKEN, PURGE_EVERY};
use snippetbox::templates::PageRenderer;
use snippetbox::{routes, App, Config, Dispatcher, Request, Response};

const CSRF: &str = "test-csrf-token";
const FORM: &str = "application/x-www-form-urlencoded";

struct Harness {
    dispatcher: Dispatcher,
    sessions: Arc<MemorySessionStore>,
    snippets: Arc<dyn SnippetStore>,
}

impl Harness {
    fn new() -> Self {
        Self::with_snippets(Arc::new(MemorySnippetStore::new()))
    }

    fn with_snippets(snippets: Arc<dyn SnippetStore>) -> Self {
        Self::build(config(), snippets)
    }

    fn build(config: Config, snippets: Arc<dyn SnippetStore>) -> Self {
        let sessions = Arc::new(MemorySessionStore::new(config.session_lifetime()));
        let app = App::new(
            config,
            Arc::clone(&snippets),
            Arc::new(MemoryUserStore::new()),
            sessions.clone(),
            Arc::new(PageRenderer::new().unwrap()),
        );
        let dispatcher = routes(Arc::new(app)).unwrap();
        Self { dispatcher, sessions, snippets }
    }

    /// A session with a known CSRF token.
    fn visitor(&self) -> String {
        let token = self.sessions.create();
        self.sessions.put(&token, CSRF_TOKEN, CSRF);
        token
    }

    fn member(&self) -> String {
        let token = self.visitor();
        self.sessions.put(&token, AUTH_USER_ID, "1");
        token
    }

    async fn get(&self, path: &str, session: &str) -> Response {
        let req = Request::new("GET", path).with_header("cookie", &format!("session={session}"));
        self.dispatcher.serve(req).await
    }

    /// Posts `body` with the session's CSRF token appended.
    async fn post(&self, path: &str, session: &str, body: &str) -> Response {
        let body = if body.is_empty() {
            format!("csrf_token={CSRF}")
        } else {
            format!("{body}&csrf_token={CSRF}")
        };
        let req = Request::new("POST", path)
            .with_header("cookie", &format!("session={session}"))
            .with_header("content-type", FORM)
            .with_body(body);
        self.dispatcher.serve(req).await
    }
}

fn config() -> Config {
    Config {
        static_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/ui/static")),
        ..Config::default()
    }
}

fn assert_redirect(res: &Response, to: &str) {
    assert_eq!(res.status_code(), 303, "body: {}", res.body_text());
    assert_eq!(res.header("location"), Some(to));
}

// ── Snippets ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn blank_title_redisplays_the_form_with_its_error() {
    let h = Harness::new();
    let session = h.member();

    let res = h.post("/snippet/create", &session, "title=&content=hello&expires=7").await;

    assert_eq!(res.status_code(), 200);
    let html = res.body_text();
    assert!(html.contains(r#"data-field="title">This field cannot be blank"#));
    assert!(html.contains(">hello</textarea>"));
    assert!(h.snippets.latest().unwrap().is_empty());
}

#[tokio::test]
async fn unlisted_expiry_is_rejected() {
    let h = Harness::new();
    let session = h.member();

    let res = h.post("/snippet/create", &session, "title=t&content=c&expires=30").await;

    assert_eq!(res.status_code(), 200);
    assert!(res.body_text().contains(r#"data-field="expires">This field is invalid"#));
}

#[tokio::test]
async fn created_snippet_redirects_and_flashes_once() {
    let h = Harness::new();
    let session = h.member();

    let res = h.post("/snippet/create", &session, "title=First&content=Hello&expires=7").await;
    assert_redirect(&res, "/snippet/1");

    let page = h.get("/snippet/1", &session).await;
    assert_eq!(page.status_code(), 200);
    let html = page.body_text();
    assert!(html.contains("Snippet successfully created!"));
    assert!(html.contains("First"));

    let again = h.get("/snippet/1", &session).await.body_text();
    assert!(!again.contains("Snippet successfully created!"));
}

#[tokio::test]
async fn home_lists_snippets() {
    let h = Harness::new();
    let session = h.visitor();
    h.snippets.insert("Older", "a", 7).unwrap();
    h.snippets.insert("Newer", "b", 7).unwrap();

    let html = h.get("/", &session).await.body_text();

    let newer = html.find("Newer").expect("newer listed");
    let older = html.find("Older").expect("older listed");
    assert!(newer < older);
}

#[tokio::test]
async fn bad_snippet_ids_are_not_found() {
    let h = Harness::new();
    let session = h.visitor();

    for path in ["/snippet/9999", "/snippet/abc", "/snippet/0", "/snippet/-1"] {
        let res = h.get(path, &session).await;
        assert_eq!(res.status_code(), 404, "{path}");
        assert_eq!(res.body_text(), "Not Found");
    }
}

#[tokio::test]
async fn escaped_ids_are_decoded() {
    let h = Harness::new();
    let session = h.visitor();
    h.snippets.insert("Escaped", "body", 7).unwrap();

    let res = h.get("/snippet/%31", &session).await;

    assert_eq!(res.status_code(), 200);
    assert!(res.body_text().contains("Escaped"));
}

#[tokio::test]
async fn create_is_not_captured_as_an_id() {
    let h = Harness::new();
    let res = h.get("/snippet/create", &h.member()).await;
    assert_eq!(res.status_code(), 200);
    assert!(res.body_text().contains("<form"));
}

// ── Access control ───────────────────────────────────────────────────────────

#[tokio::test]
async fn anonymous_users_are_sent_to_login() {
    let h = Harness::new();
    let session = h.visitor();

    assert_redirect(&h.get("/snippet/create", &session).await, "/user/login");
    assert_redirect(
        &h.post("/snippet/create", &session, "title=t&content=c&expires=1").await,
        "/user/login",
    );
    assert!(h.snippets.latest().unwrap().is_empty());
}

#[tokio::test]
async fn protected_pages_are_not_cached() {
    let h = Harness::new();
    let res = h.get("/snippet/create", &h.member()).await;
    assert_eq!(res.header("cache-control"), Some("no-store"));
}

#[tokio::test]
async fn post_without_csrf_token_is_rejected() {
    let h = Harness::new();
    let session = h.member();
    let req = Request::new("POST", "/snippet/create")
        .with_header("cookie", &format!("session={session}"))
        .with_header("content-type", FORM)
        .with_body("title=t&content=c&expires=1");

    let res = h.dispatcher.serve(req).await;

    assert_eq!(res.status_code(), 400);
    assert!(h.snippets.latest().unwrap().is_empty());
}

#[tokio::test]
async fn first_visit_sets_a_session_cookie() {
    let h = Harness::new();
    let res = h.dispatcher.serve(Request::new("GET", "/")).await;
    assert_eq!(res.status_code(), 200);
    assert!(res.header("set-cookie").is_some_and(|c| c.starts_with("session=")));
}

#[tokio::test]
async fn abandoned_sessions_do_not_pile_up() {
    let h = Harness::build(
        Config { session_lifetime_secs: 0, ..config() },
        Arc::new(MemorySnippetStore::new()),
    );

    for _ in 0..(2 * PURGE_EVERY + 1) {
        let res = h.dispatcher.serve(Request::new("GET", "/")).await;
        assert_eq!(res.status_code(), 200);
    }

    assert!(h.sessions.len() <= PURGE_EVERY, "held {} sessions", h.sessions.len());
}

// ── Routing edges ────────────────────────────────────────────────────────────

#[tokio::test]
async fn wrong_method_lists_the_allowed_ones() {
    let h = Harness::new();

    let res = h.dispatcher.serve(Request::new("DELETE", "/snippet/create")).await;
    assert_eq!(res.status_code(), 405);
    assert_eq!(res.header("allow"), Some("GET, POST"));

    let res = h.dispatcher.serve(Request::new("PUT", "/")).await;
    assert_eq!(res.status_code(), 405);
    assert_eq!(res.header("allow"), Some("GET"));
}

#[tokio::test]
async fn every_response_carries_security_headers() {
    let h = Harness::new();
    for req in [
        Request::new("GET", "/nowhere"),
        Request::new("DELETE", "/"),
        Request::new("GET", "/"),
        Request::new("GET", "/static/css/main.css"),
    ] {
        let res = h.dispatcher.serve(req).await;
        assert_eq!(res.header("x-content-type-options"), Some("nosniff"));
        assert_eq!(res.header("x-frame-options"), Some("deny"));
        assert_eq!(res.header("x-xss-protection"), Some("1; mode=block"));
    }
}

#[tokio::test]
async fn static_assets_skip_the_session() {
    let h = Harness::new();

    let res = h.dispatcher.serve(Request::new("GET", "/static/css/main.css")).await;
    assert_eq!(res.status_code(), 200);
    assert_eq!(res.header("content-type"), Some("text/css; charset=utf-8"));
    assert!(res.header("set-cookie").is_none());

    let res = h.dispatcher.serve(Request::new("GET", "/static/../Cargo.toml")).await;
    assert_eq!(res.status_code(), 404);
}

// ── Users ────────────────────────────────────────────────────────────────────

const ALICE: &str = "name=Alice&email=alice%40example.com&password=correct-horse";

#[tokio::test]
async fn signup_login_logout() {
    let h = Harness::new();
    let session = h.visitor();

    assert_redirect(&h.post("/user/signup", &session, ALICE).await, "/user/login");
    assert!(h.get("/user/login", &session).await.body_text().contains("Your signup was successful"));

    let res = h
        .post("/user/login", &session, "email=alice%40example.com&password=correct-horse")
        .await;
    assert_redirect(&res, "/snippet/create");
    let page = h.get("/snippet/create", &session).await;
    assert_eq!(page.status_code(), 200);
    assert!(page.body_text().contains(r#"<span class="user">Alice</span>"#));

    assert_redirect(&h.post("/user/logout", &session, "").await, "/");
    let home = h.get("/", &session).await.body_text();
    assert!(home.contains("logged out successfully"));
    assert_redirect(&h.get("/snippet/create", &session).await, "/user/login");
}

#[tokio::test]
async fn signup_validates_its_fields() {
    let h = Harness::new();
    let session = h.visitor();

    let res = h.post("/user/signup", &session, "name=&email=nope&password=short").await;

    assert_eq!(res.status_code(), 200);
    let html = res.body_text();
    assert!(html.contains(r#"data-field="name">This field cannot be blank"#));
    assert!(html.contains(r#"data-field="email">This field is invalid"#));
    assert!(html.contains(r#"data-field="password">This field is too short (minimum is 10 characters)"#));
}

#[tokio::test]
async fn escapes_that_are_not_utf8_are_a_bad_request() {
    let h = Harness::new();
    let session = h.visitor();

    let res = h.post("/user/signup", &session, "name=%FF%FE&email=a%40b.co&password=0123456789").await;

    assert_eq!(res.status_code(), 400);
    let res = h.post("/user/login", &session, "email=a%40b.co&password=0123456789").await;
    assert!(res.body_text().contains("Email or Password is incorrect"));
}

#[tokio::test]
async fn duplicate_email_is_reported_on_the_form() {
    let h = Harness::new();
    let session = h.visitor();
    assert_redirect(&h.post("/user/signup", &session, ALICE).await, "/user/login");

    let res = h.post("/user/signup", &session, ALICE).await;

    assert_eq!(res.status_code(), 200);
    assert!(res.body_text().contains("Address is already in use"));
}

#[tokio::test]
async fn wrong_password_shows_a_generic_error() {
    let h = Harness::new();
    let session = h.visitor();
    h.post("/user/signup", &session, ALICE).await;

    let res = h
        .post("/user/login", &session, "email=alice%40example.com&password=battery-staple")
        .await;

    assert_eq!(res.status_code(), 200);
    assert!(res.body_text().contains("Email or Password is incorrect"));
    assert_redirect(&h.get("/snippet/create", &session).await, "/user/login");
}

// ── Failures ─────────────────────────────────────────────────────────────────

struct BrokenStore;

impl SnippetStore for BrokenStore {
    fn insert(&self, _: &str, _: &str, _: u32) -> Result<u64, StoreError> {
        Err(StoreError::internal("disk on fire"))
    }
    fn get(&self, _: u64) -> Result<Snippet, StoreError> {
        Err(StoreError::internal("disk on fire"))
    }
    fn latest(&self) -> Result<Vec<Snippet>, StoreError> {
        Err(StoreError::internal("disk on fire"))
    }
}

#[tokio::test]
async fn store_failures_are_a_generic_500() {
    let h = Harness::with_snippets(Arc::new(BrokenStore));
    let session = h.visitor();

    for res in [h.get("/", &session).await, h.get("/snippet/1", &session).await] {
        assert_eq!(res.status_code(), 500);
        assert_eq!(res.body_text(), "Internal Server Error");
    }
}
