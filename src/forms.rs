//! Rule-driven form validation.
//!
//! A [`Form`] wraps the submitted [`Values`] and accumulates human-readable
//! messages per field as rules are applied to it:
//!
//! ```rust
//! use snippetbox::forms::{Form, Values};
//!
//! let mut form = Form::new(Values::parse(b"title=&expires=30").unwrap());
//! form.required(&["title", "content", "expires"]);
//! form.max_length("title", 100);
//! form.permitted_values("expires", &["1", "7", "365"]);
//!
//! assert!(!form.valid());
//! assert_eq!(form.errors.get("title"), Some("This field cannot be blank"));
//! assert_eq!(form.errors.all("expires").len(), 1);
//! ```
//!
//! Every rule runs; none short-circuits another, so one field can collect
//! several messages. Applying the same rule twice records its message twice.
//! Only [`Rule::Required`] flags a missing or blank field: the other rules
//! skip fields with no value.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Shape check for email addresses (WHATWG "valid email address").
pub static EMAIL_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern compiles")
});

/// A request body that could not be read as form data.
#[derive(Debug, thiserror::Error)]
pub enum FormParseError {
    #[error("unsupported content type `{0}`")]
    ContentType(String),

    #[error("form body is not valid UTF-8")]
    NotUtf8,
}

// ── Values ───────────────────────────────────────────────────────────────────

/// Submitted fields. A field may carry several values (repeated inputs);
/// rules only ever look at the first.
#[derive(Clone, Debug, Default)]
pub struct Values(HashMap<String, Vec<String>>);

impl Values {
    /// Decodes an `application/x-www-form-urlencoded` body.
    ///
    /// Both the raw body and every percent-decoded name and value must be
    /// UTF-8; nothing is replaced with U+FFFD.
    pub fn parse(body: &[u8]) -> Result<Self, FormParseError> {
        let body = std::str::from_utf8(body).map_err(|_| FormParseError::NotUtf8)?;
        let mut values = Self::default();
        for pair in body.split('&').filter(|pair| !pair.is_empty()) {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            values.add(&decode_component(name)?, &decode_component(value)?);
        }
        Ok(values)
    }

    pub fn add(&mut self, field: &str, value: &str) {
        self.0.entry(field.to_owned()).or_default().push(value.to_owned());
    }

    /// First value for `field`, or `""`.
    pub fn get(&self, field: &str) -> &str {
        self.first(field).unwrap_or("")
    }

    /// First value for `field`, `None` when the field was not submitted.
    pub fn first(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn all(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn decode_component(raw: &str) -> Result<String, FormParseError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| FormParseError::NotUtf8)
}

/// Templates see one value per field.
impl Serialize for Values {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, values) in &self.0 {
            map.serialize_entry(field, values.first().map(String::as_str).unwrap_or(""))?;
        }
        map.end()
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// Field name → messages, in the order the rules produced them.
#[derive(Clone, Debug, Default, serde::Serialize)]
#[serde(transparent)]
pub struct FormErrors(HashMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_owned()).or_default().push(message.into());
    }

    /// First message for `field`.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn all(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of messages across all fields.
    pub fn count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}

// ── Rules ────────────────────────────────────────────────────────────────────

/// One validation rule. A rule looks only at the field's first value.
#[derive(Clone, Copy, Debug)]
pub enum Rule<'a> {
    Required,
    MaxLength(usize),
    MinLength(usize),
    PermittedValues(&'a [&'a str]),
    MatchesPattern(&'a Regex),
}

impl Rule<'_> {
    /// The message this rule records for `value`, if it is violated.
    pub fn check(&self, value: Option<&str>) -> Option<String> {
        if let Rule::Required = self {
            let blank = value.is_none_or(|v| v.trim().is_empty());
            return blank.then(|| "This field cannot be blank".to_owned());
        }

        let value = value.filter(|v| !v.is_empty())?;
        match *self {
            Rule::Required => None,
            Rule::MaxLength(n) => (value.chars().count() > n)
                .then(|| format!("This field is too long (maximum is {n} characters)")),
            Rule::MinLength(n) => (value.chars().count() < n)
                .then(|| format!("This field is too short (minimum is {n} characters)")),
            Rule::PermittedValues(allowed) => (!allowed.contains(&value))
                .then(|| "This field is invalid".to_owned()),
            Rule::MatchesPattern(rx) => (!rx.is_match(value))
                .then(|| "This field is invalid".to_owned()),
        }
    }
}

// ── Form ─────────────────────────────────────────────────────────────────────

/// Submitted values plus the errors found in them so far.
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct Form {
    pub values: Values,
    pub errors: FormErrors,
}

impl Form {
    pub fn new(values: Values) -> Self {
        Self { values, errors: FormErrors::default() }
    }

    /// Applies `rule` to `field`, recording its message on violation.
    pub fn check(&mut self, field: &str, rule: Rule<'_>) -> &mut Self {
        if let Some(message) = rule.check(self.values.first(field)) {
            self.errors.add(field, message);
        }
        self
    }

    pub fn required(&mut self, fields: &[&str]) -> &mut Self {
        for field in fields {
            self.check(field, Rule::Required);
        }
        self
    }

    pub fn max_length(&mut self, field: &str, n: usize) -> &mut Self {
        self.check(field, Rule::MaxLength(n))
    }

    pub fn min_length(&mut self, field: &str, n: usize) -> &mut Self {
        self.check(field, Rule::MinLength(n))
    }

    pub fn permitted_values(&mut self, field: &str, allowed: &[&str]) -> &mut Self {
        self.check(field, Rule::PermittedValues(allowed))
    }

    pub fn matches_pattern(&mut self, field: &str, pattern: &Regex) -> &mut Self {
        self.check(field, Rule::MatchesPattern(pattern))
    }

    /// `true` when no rule has recorded an error. Recomputed on every call.
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// First submitted value for `field`, or `""`.
    pub fn get(&self, field: &str) -> &str {
        self.values.get(field)
    }
}
