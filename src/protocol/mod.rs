//! Protocol Module
//!
//! The HTTP/1.x subset spoken by the server. Clients talk to it with `ureq`
//! (see `client`).
//!
//! ## Request Format
//! ```text
//! POST /set HTTP/1.1\r\n
//! Content-Type: application/x-www-form-urlencoded\r\n
//! Content-Length: 14\r\n
//! \r\n
//! data={"k":"v"}
//! ```
//!
//! ## Supported Features
//! - HTTP/1.0 and HTTP/1.1 request lines
//! - `Content-Length` and `chunked` bodies
//! - Keep-alive (HTTP/1.1 default, `Connection: close` honored)
//! - `application/x-www-form-urlencoded` bodies and query strings
//! - `multipart/form-data` fields
//!
//! ## Status Codes
//! - 200: OK
//! - 400: malformed request (connection is closed)
//! - 404: unknown path
//! - 405: wrong method for a known path
//! - 500: bad input or render failure
//! - 503: connection limit reached

mod request;
mod response;
mod codec;
mod multipart;
mod render;

pub use request::{HttpRequest, Method, Version};
pub use response::{HttpResponse, Status};
pub use codec::{
    encode_response, parse_urlencoded, percent_decode, read_request, write_response,
    MAX_BODY_SIZE, MAX_HEADER_BYTES,
};
pub use render::{render_csv, render_html, render_json, write_csv};
