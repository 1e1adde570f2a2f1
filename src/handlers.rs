//! Snippet and user endpoints.
//!
//! Every handler here runs behind the dynamic chain, so a session is always
//! attached. Form submissions follow post/redirect/get: a failed validation
//! re-renders the form (200) with its errors, success redirects (303).

use std::sync::Arc;

use tracing::info;

use crate::app::App;
use crate::forms::{Form, EMAIL_RX};
use crate::models::StoreError;
use crate::request::Request;
use crate::response::Response;
use crate::session::{Session, AUTH_USER_ID, FLASH};
use crate::status::Status;
use crate::templates::TemplateData;

/// Accepted values of the `expires` field, in days.
pub const EXPIRY_DAYS: [&str; 3] = ["1", "7", "365"];

pub async fn home(app: Arc<App>, req: Request) -> Response {
    match app.snippets.latest() {
        Ok(snippets) => app.render(&req, "home.page.html", TemplateData::with_snippets(snippets)),
        Err(e) => app.server_error(&e),
    }
}

pub async fn show_snippet(app: Arc<App>, req: Request) -> Response {
    let Some(id) = req.param("id").and_then(|id| id.parse::<u64>().ok()).filter(|id| *id >= 1) else {
        return app.not_found();
    };
    match app.snippets.get(id) {
        Ok(snippet) => app.render(&req, "show.page.html", TemplateData::with_snippet(snippet)),
        Err(StoreError::NoRecord) => app.not_found(),
        Err(e) => app.server_error(&e),
    }
}

pub async fn create_snippet_form(app: Arc<App>, req: Request) -> Response {
    app.render(&req, "create.page.html", TemplateData::default())
}

pub async fn create_snippet(app: Arc<App>, req: Request) -> Response {
    let mut form = match parsed_form(&req) {
        Ok(form) => form,
        Err(res) => return res,
    };
    form.required(&["title", "content", "expires"])
        .max_length("title", 100)
        .permitted_values("expires", &EXPIRY_DAYS);

    if !form.valid() {
        return app.render(&req, "create.page.html", TemplateData::with_form(form));
    }

    let Ok(days) = form.get("expires").parse::<u32>() else {
        return app.client_error(Status::BadRequest);
    };
    let id = match app.snippets.insert(form.get("title"), form.get("content"), days) {
        Ok(id) => id,
        Err(e) => return app.server_error(&e),
    };

    if let Some(session) = req.session() {
        session.put(FLASH, "Snippet successfully created!");
    }
    Response::redirect(&format!("/snippet/{id}"))
}

pub async fn signup_user_form(app: Arc<App>, req: Request) -> Response {
    app.render(&req, "signup.page.html", TemplateData::default())
}

pub async fn signup_user(app: Arc<App>, req: Request) -> Response {
    let mut form = match parsed_form(&req) {
        Ok(form) => form,
        Err(res) => return res,
    };
    form.max_length("name", 255)
        .max_length("email", 255)
        .min_length("password", 10)
        .matches_pattern("email", &EMAIL_RX)
        .required(&["name", "email", "password"]);

    if !form.valid() {
        return app.render(&req, "signup.page.html", TemplateData::with_form(form));
    }

    match app.users.insert(form.get("name"), form.get("email"), form.get("password")) {
        Ok(()) => {}
        Err(StoreError::DuplicateEmail) => {
            form.errors.add("email", "Address is already in use");
            return app.render(&req, "signup.page.html", TemplateData::with_form(form));
        }
        Err(e) => return app.server_error(&e),
    }

    if let Some(session) = req.session() {
        session.put(FLASH, "Your signup was successful. Please log in.");
    }
    Response::redirect("/user/login")
}

pub async fn login_user_form(app: Arc<App>, req: Request) -> Response {
    app.render(&req, "login.page.html", TemplateData::default())
}

pub async fn login_user(app: Arc<App>, req: Request) -> Response {
    let mut form = match parsed_form(&req) {
        Ok(form) => form,
        Err(res) => return res,
    };
    form.required(&["email", "password"]);
    if !form.valid() {
        return app.render(&req, "login.page.html", TemplateData::with_form(form));
    }

    let id = match app.users.authenticate(form.get("email"), form.get("password")) {
        Ok(id) => id,
        Err(StoreError::InvalidCredentials) => {
            form.errors.add("generic", "Email or Password is incorrect");
            return app.render(&req, "login.page.html", TemplateData::with_form(form));
        }
        Err(e) => return app.server_error(&e),
    };

    if let Some(session) = req.session() {
        session.put(AUTH_USER_ID, &id.to_string());
    }
    info!(user_id = id, "user logged in");
    Response::redirect("/snippet/create")
}

pub async fn logout_user(_app: Arc<App>, req: Request) -> Response {
    if let Some(session) = req.session() {
        log_out(session);
    }
    Response::redirect("/")
}

fn log_out(session: &Session) {
    session.remove(AUTH_USER_ID);
    session.put(FLASH, "You've been logged out successfully!");
}

/// The request body as a [`Form`], or the `400` to answer with.
fn parsed_form(req: &Request) -> Result<Form, Response> {
    req.form()
        .map(Form::new)
        .map_err(|e| {
            tracing::debug!(error = %e, "unreadable form body");
            Response::error(Status::BadRequest)
        })
}
