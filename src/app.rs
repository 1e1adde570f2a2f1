//! Application context.
//!
//! [`App`] bundles every collaborator a handler may need. It is built once
//! in `main` (or a test), wrapped in an `Arc`, and handed to each handler
//! when the route table is assembled. There is no global state.

use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;

use tracing::{error, warn};

use crate::config::Config;
use crate::handler::Handler;
use crate::middleware;
use crate::models::{MemorySnippetStore, MemoryUserStore, SnippetStore, StoreError, User, UserStore};
use crate::request::Request;
use crate::response::Response;
use crate::session::{MemorySessionStore, Session, SessionStore, AUTH_USER_ID, FLASH};
use crate::status::Status;
use crate::templates::{PageRenderer, RenderError, TemplateData, TemplateRenderer};

pub struct App {
    pub config: Config,
    pub snippets: Arc<dyn SnippetStore>,
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub templates: Arc<dyn TemplateRenderer>,
}

impl App {
    pub fn new(
        config: Config,
        snippets: Arc<dyn SnippetStore>,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        templates: Arc<dyn TemplateRenderer>,
    ) -> Self {
        Self { config, snippets, users, sessions, templates }
    }

    /// In-process stores and the built-in pages.
    pub fn in_memory(config: Config) -> Result<Self, RenderError> {
        let sessions = Arc::new(MemorySessionStore::new(config.session_lifetime()));
        Ok(Self::new(
            config,
            Arc::new(MemorySnippetStore::new()),
            Arc::new(MemoryUserStore::new()),
            sessions,
            Arc::new(PageRenderer::new()?),
        ))
    }

    /// Binds `f` to this context, producing a route handler.
    pub fn handler<F, Fut>(self: &Arc<Self>, f: F) -> impl Handler
    where
        F: Fn(Arc<App>, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let app = Arc::clone(self);
        move |req: Request| f(Arc::clone(&app), req)
    }

    /// Renders page `name` with `data` plus the per-request defaults: the
    /// pending flash message (consumed), the login state and the CSRF token.
    pub fn render(&self, req: &Request, name: &str, mut data: TemplateData) -> Response {
        if let Some(session) = req.session() {
            data.flash = session.pop(FLASH);
            data.is_authenticated = session.is_authenticated();
            data.user_name = self.authenticated_user(session).map(|user| user.name);
            data.csrf_token = middleware::csrf_token(session);
        }
        match self.templates.render(name, &data.dated()) {
            Ok(html) => Response::html(html),
            Err(e) => self.server_error(&e),
        }
    }

    /// The user the session is logged in as. A lookup failure only costs the
    /// page its user name, so it is logged rather than answered with a 500.
    pub fn authenticated_user(&self, session: &Session) -> Option<User> {
        let id = session.get(AUTH_USER_ID)?.parse::<u64>().ok()?;
        match self.users.get(id) {
            Ok(user) => Some(user),
            Err(StoreError::NoRecord) => None,
            Err(e) => {
                warn!(error = %e, user_id = id, "cannot load the logged-in user");
                None
            }
        }
    }

    /// Logs `err` in full and answers with a bare 500.
    pub fn server_error(&self, err: &dyn StdError) -> Response {
        error!(error = %err, source = ?err.source(), "internal error");
        Response::error(Status::InternalServerError)
    }

    pub fn client_error(&self, status: Status) -> Response {
        Response::error(status)
    }

    pub fn not_found(&self) -> Response {
        self.client_error(Status::NotFound)
    }
}
