//! Page rendering.
//!
//! Handlers depend on the [`TemplateRenderer`] trait only. [`PageRenderer`]
//! is the minijinja implementation with every page compiled into the binary
//! at startup, so a broken template fails the process before it serves.

use chrono::{DateTime, Datelike, Utc};
use minijinja::Environment;
use serde::Serialize;

use crate::forms::Form;
use crate::models::Snippet;

/// A page that could not be rendered.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template `{0}` does not exist")]
    Missing(String),

    #[error(transparent)]
    Template(#[from] minijinja::Error),
}

/// Everything a page can show. Handlers fill in the page-specific parts;
/// [`App::render`](crate::App::render) adds the per-request defaults.
#[derive(Debug, Default, Serialize)]
pub struct TemplateData {
    pub current_year: i32,
    pub flash: Option<String>,
    pub is_authenticated: bool,
    /// Display name of the logged-in user, when it could be looked up.
    pub user_name: Option<String>,
    pub csrf_token: String,
    pub form: Form,
    pub snippet: Option<Snippet>,
    pub snippets: Vec<Snippet>,
}

impl TemplateData {
    pub fn with_form(form: Form) -> Self {
        Self { form, ..Self::default() }
    }

    pub fn with_snippet(snippet: Snippet) -> Self {
        Self { snippet: Some(snippet), ..Self::default() }
    }

    pub fn with_snippets(snippets: Vec<Snippet>) -> Self {
        Self { snippets, ..Self::default() }
    }

    /// Stamps the current year.
    pub(crate) fn dated(mut self) -> Self {
        self.current_year = Utc::now().year();
        self
    }
}

pub trait TemplateRenderer: Send + Sync {
    fn render(&self, name: &str, data: &TemplateData) -> Result<String, RenderError>;
}

const PAGES: [(&str, &str); 6] = [
    ("base.layout.html", include_str!("../ui/html/base.layout.html")),
    ("home.page.html",   include_str!("../ui/html/home.page.html")),
    ("show.page.html",   include_str!("../ui/html/show.page.html")),
    ("create.page.html", include_str!("../ui/html/create.page.html")),
    ("signup.page.html", include_str!("../ui/html/signup.page.html")),
    ("login.page.html",  include_str!("../ui/html/login.page.html")),
];

/// Renders the built-in pages. Output is HTML-escaped (template names end in
/// `.html`).
pub struct PageRenderer {
    env: Environment<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut env = Environment::new();
        env.add_filter("human_date", human_date);
        for (name, source) in PAGES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }
}

impl TemplateRenderer for PageRenderer {
    fn render(&self, name: &str, data: &TemplateData) -> Result<String, RenderError> {
        let template = self.env.get_template(name).map_err(|e| match e.kind() {
            minijinja::ErrorKind::TemplateNotFound => RenderError::Missing(name.to_owned()),
            _ => RenderError::Template(e),
        })?;
        Ok(template.render(data)?)
    }
}

/// `2026-10-15T09:30:00Z` → `15 Oct 2026 at 09:30`. Unparseable input is
/// shown unchanged.
fn human_date(value: String) -> String {
    match DateTime::parse_from_rfc3339(&value) {
        Ok(t) => t.with_timezone(&Utc).format("%d %b %Y at %H:%M").to_string(),
        Err(_) => value,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::forms::Values;

    #[test]
    fn human_date_formats_rfc3339() {
        assert_eq!(human_date("2026-10-15T09:30:00Z".into()), "15 Oct 2026 at 09:30");
        assert_eq!(human_date("yesterday".into()), "yesterday");
    }

    #[test]
    fn show_page_escapes_content() {
        let renderer = PageRenderer::new().unwrap();
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let data = TemplateData::with_snippet(Snippet {
            id: 7,
            title: "<b>bold</b>".into(),
            content: "body".into(),
            created: at,
            expires: at,
        });

        let html = renderer.render("show.page.html", &data).unwrap();

        assert!(html.contains("&lt;b&gt;bold"));
        assert!(!html.contains("<b>bold"));
        assert!(html.contains("02 Jan 2026 at 03:04"));
    }

    #[test]
    fn create_page_lists_field_errors() {
        let renderer = PageRenderer::new().unwrap();
        let mut form = Form::new(Values::parse(b"content=x").unwrap());
        form.required(&["title"]);

        let html = renderer.render("create.page.html", &TemplateData::with_form(form)).unwrap();

        assert!(html.contains(r#"data-field="title">This field cannot be blank"#));
        assert!(html.contains(">x</textarea>"));
    }

    #[test]
    fn unknown_page_is_reported() {
        let renderer = PageRenderer::new().unwrap();
        assert!(matches!(
            renderer.render("nope.page.html", &TemplateData::default()),
            Err(RenderError::Missing(_))
        ));
    }
}
