//! HTTP handlers
//!
//! Maps requests onto engine reads and writes. Knows nothing about sockets.

use crate::engine::Engine;
use crate::persist;
use crate::protocol::{render_csv, render_html, render_json, HttpRequest, HttpResponse, Method, Status};

/// Dispatch a request to its handler
///
/// `/get/` is a subtree: any path below it without its own handler is
/// served as JSON.
pub fn route(engine: &Engine, request: &HttpRequest) -> HttpResponse {
    match request.path.as_str() {
        "/set" => set(engine, request),
        "/get/html" => get_html(engine, request),
        "/get/csv" => get_csv(engine, request),
        "/get" => get_json(engine, request),
        path if path.starts_with("/get/") => get_json(engine, request),
        _ => HttpResponse::not_found(),
    }
}

/// POST /set: merge the JSON object in form field `data`
pub fn set(engine: &Engine, request: &HttpRequest) -> HttpResponse {
    if request.method != Method::Post {
        return HttpResponse::empty(Status::MethodNotAllowed);
    }

    let data = match request.form_value("data") {
        Some(data) if !data.is_empty() => data,
        _ => return HttpResponse::error(Status::InternalServerError, "no data input field."),
    };

    let batch = match persist::decode(data.as_bytes()) {
        Ok(batch) => batch,
        Err(e) => {
            tracing::warn!("Rejected /set payload: {}", e);
            return HttpResponse::error(Status::InternalServerError, "could not parse json data.");
        }
    };

    match engine.submit_write(batch) {
        Ok(()) => HttpResponse::empty(Status::Ok),
        Err(e) => engine_failure(e),
    }
}

/// GET /get: full snapshot as JSON
pub fn get_json(engine: &Engine, request: &HttpRequest) -> HttpResponse {
    if request.method != Method::Get {
        return HttpResponse::empty(Status::MethodNotAllowed);
    }

    let records = match engine.snapshot() {
        Ok(records) => records,
        Err(e) => return engine_failure(e),
    };

    match render_json(&records) {
        Ok(body) => HttpResponse::ok("application/json", body),
        Err(e) => render_failure("json", e),
    }
}

/// GET /get/html: full snapshot as an HTML list
pub fn get_html(engine: &Engine, request: &HttpRequest) -> HttpResponse {
    if request.method != Method::Get {
        return HttpResponse::empty(Status::MethodNotAllowed);
    }

    let records = match engine.snapshot() {
        Ok(records) => records,
        Err(e) => return engine_failure(e),
    };

    match render_html(&records) {
        Ok(page) => HttpResponse::ok("text/html", page),
        Err(e) => render_failure("html", e),
    }
}

/// GET /get/csv: full snapshot as CSV rows
pub fn get_csv(engine: &Engine, request: &HttpRequest) -> HttpResponse {
    if request.method != Method::Get {
        return HttpResponse::empty(Status::MethodNotAllowed);
    }

    let records = match engine.snapshot() {
        Ok(records) => records,
        Err(e) => return engine_failure(e),
    };

    match render_csv(&records) {
        Ok(rows) => HttpResponse::ok("text/csv", rows),
        Err(e) => render_failure("csv", e),
    }
}

fn engine_failure(e: crate::SnapError) -> HttpResponse {
    tracing::error!("Engine request failed: {}", e);
    HttpResponse::error(Status::InternalServerError, &e.to_string())
}

fn render_failure(format: &str, e: crate::SnapError) -> HttpResponse {
    tracing::warn!("Failed to render {}: {}", format, e);
    HttpResponse::empty(Status::InternalServerError)
}
