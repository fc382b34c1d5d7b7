//! HTTP client for a running SnapKV server
//!
//! Built on a `ureq` agent; idle connections are pooled between calls.

use std::io::Read;
use std::time::Duration;

use bytes::Bytes;

use crate::error::{Result, SnapError};
use crate::persist;
use crate::protocol::{HttpResponse, Status, MAX_BODY_SIZE};
use crate::store::{Records, WriteBatch};

/// Client for the SnapKV HTTP endpoints
#[derive(Debug, Clone)]
pub struct Client {
    /// Base URL, e.g. `http://127.0.0.1:8080`
    base_url: String,

    agent: ureq::Agent,
}

impl Client {
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Client for the server at `addr` (host:port)
    pub fn new(addr: impl AsRef<str>) -> Self {
        Self::with_timeout(addr, Self::DEFAULT_TIMEOUT)
    }

    /// Client whose every request gives up after `timeout`
    pub fn with_timeout(addr: impl AsRef<str>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            base_url: format!("http://{}", addr.as_ref()),
            agent,
        }
    }

    /// POST a batch to `/set`
    pub fn set(&self, batch: &WriteBatch) -> Result<()> {
        let json = serde_json::to_string(batch)?;
        self.set_raw(&json)
    }

    /// POST a single pair to `/set`
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        self.set(&WriteBatch::from([(key.to_string(), value.to_string())]))
    }

    /// POST an already-encoded JSON object to `/set`
    pub fn set_raw(&self, json: &str) -> Result<()> {
        let response = self.post_form("/set", &[("data", json)])?;
        expect_ok(response).map(|_| ())
    }

    /// GET `/get` and decode the snapshot
    pub fn get_json(&self) -> Result<Records> {
        let response = expect_ok(self.get("/get")?)?;
        persist::decode(&response.body)
    }

    /// GET `/get/html` as text
    pub fn get_html(&self) -> Result<String> {
        Ok(expect_ok(self.get("/get/html")?)?.text())
    }

    /// GET `/get/csv` as text
    pub fn get_csv(&self) -> Result<String> {
        Ok(expect_ok(self.get("/get/csv")?)?.text())
    }

    // =========================================================================
    // Raw Requests
    //
    // These return whatever the server answered, error statuses included.
    // =========================================================================

    /// GET `path` (which may carry a query string)
    pub fn get(&self, path: &str) -> Result<HttpResponse> {
        finish(self.agent.get(&self.url(path)).call())
    }

    /// POST `fields` as an urlencoded form
    pub fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> Result<HttpResponse> {
        finish(self.agent.post(&self.url(path)).send_form(fields))
    }

    /// Send `body` with the given method and content type
    pub fn send(
        &self,
        method: &str,
        path: &str,
        content_type: &str,
        body: &[u8],
    ) -> Result<HttpResponse> {
        let request = self
            .agent
            .request(method, &self.url(path))
            .set("Content-Type", content_type);
        finish(request.send_bytes(body))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Error statuses are still responses; only transport failures are errors
fn finish(result: std::result::Result<ureq::Response, ureq::Error>) -> Result<HttpResponse> {
    let response = match result {
        Ok(response) => response,
        Err(ureq::Error::Status(_, response)) => response,
        Err(e) => return Err(SnapError::Network(e.to_string())),
    };

    let code = response.status();
    let status = Status::from_code(code)
        .ok_or_else(|| SnapError::Protocol(format!("unsupported status code: {}", code)))?;

    let headers = response
        .headers_names()
        .into_iter()
        .filter(|name| {
            !name.eq_ignore_ascii_case("Content-Length") && !name.eq_ignore_ascii_case("Connection")
        })
        .filter_map(|name| {
            let value = response.header(&name)?.to_string();
            Some((name, value))
        })
        .collect();

    let mut body = Vec::new();
    response
        .into_reader()
        .take(MAX_BODY_SIZE as u64)
        .read_to_end(&mut body)?;

    Ok(HttpResponse {
        status,
        headers,
        body: Bytes::from(body),
    })
}

/// Any status other than 200 is an error
fn expect_ok(response: HttpResponse) -> Result<HttpResponse> {
    if response.status != Status::Ok {
        return Err(SnapError::Network(format!(
            "server answered {} {}: {}",
            response.status.code(),
            response.status.reason(),
            response.text().trim_end()
        )));
    }
    Ok(response)
}
