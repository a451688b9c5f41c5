pub use http::{
    header::{HeaderName, HeaderValue},
    uri::Scheme,
    Method, StatusCode,
};
use regex::Regex;
use std::num::NonZeroU16;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRouteMatch {
    pub path: Option<PathMatch>,
    pub headers: Vec<HeaderMatch>,
    pub query_params: Vec<QueryParamMatch>,
    pub method: Option<Method>,
}

#[derive(Clone, Debug)]
pub enum PathMatch {
    Exact(String),
    Prefix(String),
    Regex(Regex),
}

#[derive(Clone, Debug)]
pub enum HeaderMatch {
    Exact(HeaderName, HeaderValue),
    Regex(HeaderName, Regex),
}

#[derive(Clone, Debug)]
pub enum QueryParamMatch {
    Exact(String, String),
    Regex(String, Regex),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Filter {
    RequestHeaderModifier(HeaderModifierFilter),
    RequestRedirect(RequestRedirectFilter),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderModifierFilter {
    pub add: Vec<(HeaderName, HeaderValue)>,
    pub set: Vec<(HeaderName, HeaderValue)>,
    pub remove: Vec<HeaderName>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestRedirectFilter {
    pub scheme: Option<Scheme>,
    pub host: Option<String>,
    pub port: Option<NonZeroU16>,
    pub status: Option<StatusCode>,
}

// === impl HttpRouteMatch ===

impl HttpRouteMatch {
    /// Matches every request.
    pub fn catch_all() -> Self {
        Self {
            path: Some(PathMatch::Prefix("/".to_string())),
            headers: vec![],
            query_params: vec![],
            method: None,
        }
    }
}

/// Regexes carry no structural equality; two are equal when compiled from the
/// same pattern.
fn same_pattern(a: &Regex, b: &Regex) -> bool {
    a.as_str() == b.as_str()
}

// === impl PathMatch ===

impl PathMatch {
    pub fn regex(s: &str) -> Result<Self, regex::Error> {
        Regex::new(s).map(Self::Regex)
    }
}

impl PartialEq for PathMatch {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Regex(a), Self::Regex(b)) => same_pattern(a, b),
            (Self::Exact(a), Self::Exact(b)) | (Self::Prefix(a), Self::Prefix(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for PathMatch {}

// === impl HeaderMatch ===

impl HeaderMatch {
    pub fn name(&self) -> &HeaderName {
        match self {
            Self::Exact(name, _) | Self::Regex(name, _) => name,
        }
    }
}

impl PartialEq for HeaderMatch {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
            && match (self, other) {
                (Self::Exact(_, a), Self::Exact(_, b)) => a == b,
                (Self::Regex(_, a), Self::Regex(_, b)) => same_pattern(a, b),
                _ => false,
            }
    }
}

impl Eq for HeaderMatch {}

// === impl QueryParamMatch ===

impl QueryParamMatch {
    pub fn name(&self) -> &str {
        match self {
            Self::Exact(name, _) | Self::Regex(name, _) => name,
        }
    }
}

impl PartialEq for QueryParamMatch {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
            && match (self, other) {
                (Self::Exact(_, a), Self::Exact(_, b)) => a == b,
                (Self::Regex(_, a), Self::Regex(_, b)) => same_pattern(a, b),
                _ => false,
            }
    }
}

impl Eq for QueryParamMatch {}

// === impl HeaderModifierFilter ===

impl HeaderModifierFilter {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.set.is_empty() && self.remove.is_empty()
    }

    /// Appends another modifier's operations after this one's.
    pub fn extend(&mut self, other: &HeaderModifierFilter) {
        self.add.extend(other.add.iter().cloned());
        self.set.extend(other.set.iter().cloned());
        self.remove.extend(other.remove.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_matches_compare_by_pattern() {
        let a = PathMatch::regex("/foo/.*").unwrap();
        let b = PathMatch::regex("/foo/.*").unwrap();
        let c = PathMatch::regex("/bar/.*").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, PathMatch::Prefix("/foo/.*".to_string()));

        let name = HeaderName::from_static("x-version");
        let header = |pattern: &str| HeaderMatch::Regex(name.clone(), Regex::new(pattern).unwrap());
        assert_eq!(header("v[12]"), header("v[12]"));
        assert_ne!(header("v[12]"), header("v3"));
        assert_ne!(
            QueryParamMatch::Exact("a".to_string(), "1".to_string()),
            QueryParamMatch::Exact("b".to_string(), "1".to_string())
        );
    }

    #[test]
    fn header_modifiers_extend_in_order() {
        let mut first = HeaderModifierFilter {
            set: vec![(
                HeaderName::from_static("x-a"),
                HeaderValue::from_static("1"),
            )],
            ..Default::default()
        };
        let second = HeaderModifierFilter {
            set: vec![(
                HeaderName::from_static("x-a"),
                HeaderValue::from_static("2"),
            )],
            remove: vec![HeaderName::from_static("x-b")],
            ..Default::default()
        };
        first.extend(&second);
        assert_eq!(first.set.len(), 2);
        assert_eq!(first.set[1].1, HeaderValue::from_static("2"));
        assert_eq!(first.remove, vec![HeaderName::from_static("x-b")]);
        assert!(!first.is_empty());
        assert!(HeaderModifierFilter::default().is_empty());
    }
}
