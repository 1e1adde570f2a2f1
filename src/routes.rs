//! The application's route table and middleware chains.
//!
//! ```text
//! standard  = recover_panic → log_request → secure_headers   (every request)
//! dynamic   = load_session → csrf                            (every page)
//! protected = dynamic + require_authentication               (members only)
//! ```

use std::sync::Arc;

use crate::app::App;
use crate::dispatcher::Dispatcher;
use crate::handlers;
use crate::middleware::{self, wrapper, Chain};
use crate::router::{RouteError, Router};
use crate::static_files::StaticFiles;

/// Global wrappers, outermost first.
pub fn standard_chain() -> Chain {
    Chain::new([
        wrapper(middleware::recover_panic),
        wrapper(middleware::log_request),
        wrapper(middleware::secure_headers),
    ])
}

/// Wrappers for every page route.
pub fn dynamic_chain(app: &App) -> Chain {
    Chain::new([
        middleware::load_session(
            Arc::clone(&app.sessions),
            app.config.session_lifetime(),
            app.config.secure_cookies,
        ),
        wrapper(middleware::csrf),
    ])
}

/// Builds the dispatcher for `app`.
///
/// `/snippet/create` is registered before `/snippet/:id`: the first matching
/// route wins, and `:id` would otherwise claim `create`.
pub fn routes(app: Arc<App>) -> Result<Dispatcher, RouteError> {
    let dynamic = dynamic_chain(&app);
    let protected = dynamic.append([wrapper(middleware::require_authentication)]);

    let router = Router::new()
        .get("/", dynamic.then(app.handler(handlers::home)))?
        .get("/snippet/create", protected.then(app.handler(handlers::create_snippet_form)))?
        .post("/snippet/create", protected.then(app.handler(handlers::create_snippet)))?
        .get("/snippet/:id", dynamic.then(app.handler(handlers::show_snippet)))?
        .get("/user/signup", dynamic.then(app.handler(handlers::signup_user_form)))?
        .post("/user/signup", dynamic.then(app.handler(handlers::signup_user)))?
        .get("/user/login", dynamic.then(app.handler(handlers::login_user_form)))?
        .post("/user/login", dynamic.then(app.handler(handlers::login_user)))?
        .post("/user/logout", protected.then(app.handler(handlers::logout_user)))?
        .get("/static/", StaticFiles::new(&app.config.static_dir).into_handler())?;

    Ok(Dispatcher::new(router, standard_chain()))
}
