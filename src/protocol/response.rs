//! Response definitions
//!
//! Represents responses to clients.

use bytes::Bytes;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Status {
    Ok = 200,
    BadRequest = 400,
    NotFound = 404,
    MethodNotAllowed = 405,
    InternalServerError = 500,
    ServiceUnavailable = 503,
}

impl Status {
    pub fn code(&self) -> u16 {
        *self as u16
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
            Status::MethodNotAllowed => "Method Not Allowed",
            Status::InternalServerError => "Internal Server Error",
            Status::ServiceUnavailable => "Service Unavailable",
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            200 => Some(Status::Ok),
            400 => Some(Status::BadRequest),
            404 => Some(Status::NotFound),
            405 => Some(Status::MethodNotAllowed),
            500 => Some(Status::InternalServerError),
            503 => Some(Status::ServiceUnavailable),
            _ => None,
        }
    }
}

/// A response to send to client
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code
    pub status: Status,

    /// Header fields except `Content-Length` and `Connection`,
    /// which the codec derives
    pub headers: Vec<(String, String)>,

    pub body: Bytes,
}

impl HttpResponse {
    /// Create a 200 response with a typed body
    pub fn ok(content_type: &str, body: impl Into<Bytes>) -> Self {
        Self {
            status: Status::Ok,
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body: body.into(),
        }
    }

    /// Create a response with no headers and no body
    pub fn empty(status: Status) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Create a plain-text error response; the body is `message` plus a newline
    pub fn error(status: Status, message: &str) -> Self {
        Self {
            status,
            headers: vec![
                ("Content-Type".to_string(), "text/plain; charset=utf-8".to_string()),
                ("X-Content-Type-Options".to_string(), "nosniff".to_string()),
            ],
            body: Bytes::from(format!("{}\n", message)),
        }
    }

    /// Create a NOT_FOUND response
    pub fn not_found() -> Self {
        Self::error(Status::NotFound, "404 page not found")
    }

    /// First header value with a case-insensitive name match
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body as text (lossy)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
