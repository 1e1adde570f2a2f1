//! HTTP method as a typed enum.
//!
//! Only the verbs a route can be registered under are modelled. Anything else
//! that arrives on the wire never reaches a handler: the dispatcher answers it
//! with `405 Method Not Allowed` (known path) or `404 Not Found`.

use std::fmt;
use std::str::FromStr;

use crate::router::RouteError;

/// A routable HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Every routable method, in the order they are listed in `Allow` headers.
    pub const ALL: [Method; 5] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
    ];

    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get    => "GET",
            Self::Post   => "POST",
            Self::Put    => "PUT",
            Self::Patch  => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Methods that change server state and therefore require an
    /// anti-forgery token.
    pub fn is_unsafe(self) -> bool {
        !matches!(self, Self::Get)
    }
}

/// Parses an uppercase method string (e.g. `"GET"`). Case-sensitive per RFC 9110 §9.1.
impl FromStr for Method {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET"    => Ok(Self::Get),
            "POST"   => Ok(Self::Post),
            "PUT"    => Ok(Self::Put),
            "PATCH"  => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other    => Err(RouteError::UnknownMethod(other.to_owned())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_verbs() {
        for m in Method::ALL {
            assert_eq!(m.as_str().parse::<Method>().unwrap(), m);
        }
    }

    #[test]
    fn rejects_lowercase_and_unknown() {
        assert!("get".parse::<Method>().is_err());
        assert!(matches!(
            "OPTIONS".parse::<Method>(),
            Err(RouteError::UnknownMethod(m)) if m == "OPTIONS"
        ));
    }
}
