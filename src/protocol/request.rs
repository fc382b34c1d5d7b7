//! Request definitions
//!
//! Represents parsed HTTP requests from clients.

use bytes::Bytes;

use super::codec::parse_urlencoded;
use super::multipart;

/// Request methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Other(String),
}

impl Method {
    /// Parse a method token (case-sensitive, as HTTP requires)
    pub fn parse(token: &str) -> Self {
        match token {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "PATCH" => Method::Patch,
            "DELETE" => Method::Delete,
            "OPTIONS" => Method::Options,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Other(token) => token,
        }
    }

    /// Methods whose urlencoded body contributes form values
    fn has_form_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }
}

/// Protocol version from the request line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }
}

/// A parsed request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,

    /// Path component of the request target
    pub path: String,

    /// Raw query string (without the `?`)
    pub query: Option<String>,

    pub version: Version,

    /// Header fields in arrival order, names as sent
    pub headers: Vec<(String, String)>,

    pub body: Bytes,
}

impl HttpRequest {
    /// Build a request with no headers and an empty body
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (target.to_string(), None),
        };

        Self {
            method,
            path,
            query,
            version: Version::Http11,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Add a header (builder style)
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body (builder style)
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// First header value with a case-insensitive name match
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Request target as it appears on the request line
    pub fn target(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    /// Whether the connection may be reused after this request
    pub fn keep_alive(&self) -> bool {
        let connection = self.header("Connection").map(|v| v.to_ascii_lowercase());
        match self.version {
            Version::Http11 => !connection.is_some_and(|v| v.contains("close")),
            Version::Http10 => connection.is_some_and(|v| v.contains("keep-alive")),
        }
    }

    /// Look up a form field.
    ///
    /// A urlencoded body (POST, PUT and PATCH only) is searched before the
    /// query string. Fields of a `multipart/form-data` body come after the
    /// query string. Any other body, including one with no `Content-Type`,
    /// is not consulted.
    pub fn form_value(&self, name: &str) -> Option<String> {
        let content_type = self.header("Content-Type").unwrap_or("");

        if self.method.has_form_body() && is_urlencoded(content_type) {
            let body = String::from_utf8_lossy(&self.body);
            if let Some(value) = lookup(&body, name) {
                return Some(value);
            }
        }

        if let Some(value) = self.query.as_deref().and_then(|query| lookup(query, name)) {
            return Some(value);
        }

        let boundary = multipart::boundary(content_type)?;
        multipart::parse_fields(&self.body, &boundary)?
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

fn is_urlencoded(content_type: &str) -> bool {
    let media_type = content_type.split(';').next().unwrap_or("").trim();
    media_type.eq_ignore_ascii_case("application/x-www-form-urlencoded")
}

fn lookup(encoded: &str, name: &str) -> Option<String> {
    parse_urlencoded(encoded)
        .into_iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
}
