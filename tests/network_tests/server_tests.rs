//! Server Tests
//!
//! End-to-end tests of the HTTP endpoints over loopback TCP.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use snapkv::client::Client;
use snapkv::network::Server;
use snapkv::protocol::{HttpResponse, Status};
use snapkv::{Config, Engine, SnapError};
use tempfile::TempDir;

// =============================================================================
// Test Harness
// =============================================================================

struct TestServer {
    temp_dir: TempDir,
    server: Arc<Server>,
    handle: Option<JoinHandle<()>>,
    addr: SocketAddr,
}

impl TestServer {
    fn start() -> Self {
        Self::start_with(|builder| builder)
    }

    fn start_with(
        customize: impl FnOnce(snapkv::config::ConfigBuilder) -> snapkv::config::ConfigBuilder,
    ) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = customize(
            Config::builder()
                .database_path(temp_dir.path().join("database.json"))
                .listen_addr("127.0.0.1:0")
                .read_timeout_ms(2_000)
                .write_timeout_ms(2_000),
        )
        .build();

        let engine = Arc::new(Engine::open(config.clone()).unwrap());
        let server = Arc::new(Server::bind(config, engine).unwrap());
        let addr = server.local_addr().unwrap();

        let runner = Arc::clone(&server);
        let handle = thread::spawn(move || {
            runner.run().unwrap();
        });

        Self {
            temp_dir,
            server,
            handle: Some(handle),
            addr,
        }
    }

    fn client(&self) -> Client {
        Client::new(self.addr.to_string())
    }

    fn snapshot_path(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("database.json")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn form_post(client: &Client, path: &str, body: &str) -> HttpResponse {
    client
        .send("POST", path, "application/x-www-form-urlencoded", body.as_bytes())
        .unwrap()
}

/// Read one Content-Length framed response off a raw connection
fn read_raw_response(reader: &mut impl BufRead) -> (Status, String) {
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    let code = line.split(' ').nth(1).unwrap().parse().unwrap();

    let mut content_length = 0;
    loop {
        line.clear();
        reader.read_line(&mut line).unwrap();
        let header = line.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("Content-Length") {
                content_length = value.trim().parse().unwrap();
            }
        }
    }

    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).unwrap();
    (Status::from_code(code).unwrap(), String::from_utf8(body).unwrap())
}

// =============================================================================
// /set Tests
// =============================================================================

#[test]
fn test_set_then_get_json() {
    let server = TestServer::start();
    let client = server.client();

    client.set_raw(r#"{"k":"v"}"#).unwrap();

    let response = client.get("/get").unwrap();
    assert_eq!(response.status, Status::Ok);
    assert_eq!(response.header("Content-Type"), Some("application/json"));
    assert_eq!(response.text(), r#"{"k":"v"}"#);
}

#[test]
fn test_set_unencoded_form_body() {
    let server = TestServer::start();
    let client = server.client();

    let response = form_post(&client, "/set", r#"data={"k":"v"}"#);
    assert_eq!(response.status, Status::Ok);

    let csv = client.get("/get/csv").unwrap();
    assert!(csv.text().lines().any(|line| line == "k,v"));
}

#[test]
fn test_set_merges_batches() {
    let server = TestServer::start();
    let client = server.client();

    client.set_raw(r#"{"a":"1","b":"2"}"#).unwrap();
    client.set_raw(r#"{"b":"3","c":"4"}"#).unwrap();

    let records = client.get_json().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records["a"], "1");
    assert_eq!(records["b"], "3");
    assert_eq!(records["c"], "4");
}

#[test]
fn test_set_success_is_empty_200() {
    let server = TestServer::start();

    let response = form_post(&server.client(), "/set", "data=%7B%22x%22%3A%22y%22%7D");

    assert_eq!(response.status, Status::Ok);
    assert!(response.body.is_empty());
}

#[test]
fn test_set_persists_before_ack() {
    let server = TestServer::start();

    server.client().put("x", "y").unwrap();

    let content = std::fs::read_to_string(server.snapshot_path()).unwrap();
    assert_eq!(content, r#"{"x":"y"}"#);
}

#[test]
fn test_set_data_in_query_string() {
    let server = TestServer::start();
    let client = server.client();

    let response = form_post(&client, "/set?data=%7B%22q%22%3A%221%22%7D", "");

    assert_eq!(response.status, Status::Ok);
    assert_eq!(client.get_json().unwrap()["q"], "1");
}

#[test]
fn test_set_multipart_form() {
    let server = TestServer::start();
    let client = server.client();
    let body = "--XX\r\n\
        Content-Disposition: form-data; name=\"data\"\r\n\
        \r\n\
        {\"k\":\"v\"}\r\n\
        --XX--\r\n";

    let response = client
        .send("POST", "/set", "multipart/form-data; boundary=XX", body.as_bytes())
        .unwrap();

    assert_eq!(response.status, Status::Ok);
    assert_eq!(client.get_json().unwrap()["k"], "v");
}

#[test]
fn test_set_body_without_content_type_is_ignored() {
    let server = TestServer::start();
    let mut stream = TcpStream::connect(server.addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let mut reader = BufReader::new(stream.try_clone().unwrap());

    let body = "data=%7B%22k%22%3A%22v%22%7D";
    let request = format!("POST /set HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}", body.len(), body);
    stream.write_all(request.as_bytes()).unwrap();

    let (status, text) = read_raw_response(&mut reader);
    assert_eq!(status, Status::InternalServerError);
    assert_eq!(text, "no data input field.\n");
}

#[test]
fn test_set_missing_data_field() {
    let server = TestServer::start();

    let response = form_post(&server.client(), "/set", "other=1");

    assert_eq!(response.status, Status::InternalServerError);
    assert_eq!(response.text(), "no data input field.\n");
}

#[test]
fn test_set_empty_data_field() {
    let server = TestServer::start();

    let response = form_post(&server.client(), "/set", "data=");

    assert_eq!(response.status, Status::InternalServerError);
    assert_eq!(response.text(), "no data input field.\n");
}

#[test]
fn test_set_invalid_json() {
    let server = TestServer::start();
    let client = server.client();

    let response = form_post(&client, "/set", "data=not-json");

    assert_eq!(response.status, Status::InternalServerError);
    assert_eq!(response.text(), "could not parse json data.\n");
    assert!(client.get_json().unwrap().is_empty());
}

#[test]
fn test_set_non_string_values_rejected() {
    let server = TestServer::start();

    let result = server.client().set_raw(r#"{"n":1}"#);

    assert!(matches!(result, Err(SnapError::Network(_))));
}

#[test]
fn test_set_wrong_method() {
    let server = TestServer::start();

    let response = server.client().get("/set").unwrap();

    assert_eq!(response.status, Status::MethodNotAllowed);
    assert!(response.body.is_empty());
}

// =============================================================================
// /get Tests
// =============================================================================

#[test]
fn test_get_empty_store() {
    let server = TestServer::start();

    let response = server.client().get("/get").unwrap();

    assert_eq!(response.status, Status::Ok);
    assert_eq!(response.text(), "{}");
}

#[test]
fn test_get_wrong_method() {
    let server = TestServer::start();

    let response = form_post(&server.client(), "/get", "data=x");

    assert_eq!(response.status, Status::MethodNotAllowed);
}

#[test]
fn test_get_html() {
    let server = TestServer::start();
    let client = server.client();
    client.set_raw(r#"{"b":"2","a":"1"}"#).unwrap();

    let response = client.get("/get/html").unwrap();

    assert_eq!(response.status, Status::Ok);
    assert_eq!(response.header("Content-Type"), Some("text/html"));
    assert_eq!(
        response.text(),
        "<html><body><ul>\n      <li>a : 1</li><li>b : 2</li>\n      </body></ul></html>"
    );
}

#[test]
fn test_get_csv() {
    let server = TestServer::start();
    let client = server.client();
    client.set_raw(r#"{"k":"v","x":"a,b"}"#).unwrap();

    let response = client.get("/get/csv").unwrap();

    assert_eq!(response.status, Status::Ok);
    assert_eq!(response.header("Content-Type"), Some("text/csv"));
    assert_eq!(response.text(), "k,v\nx,\"a,b\"\n");
}

#[test]
fn test_get_csv_wrong_method() {
    let server = TestServer::start();

    let response = form_post(&server.client(), "/get/csv", "");

    assert_eq!(response.status, Status::MethodNotAllowed);
}

#[test]
fn test_get_subtree_serves_json() {
    let server = TestServer::start();
    let client = server.client();
    client.put("k", "v").unwrap();

    let response = client.get("/get/anything/else").unwrap();

    assert_eq!(response.status, Status::Ok);
    assert_eq!(response.header("Content-Type"), Some("application/json"));
    assert_eq!(response.text(), r#"{"k":"v"}"#);
}

#[test]
fn test_client_get_helpers() {
    let server = TestServer::start();
    let client = server.client();
    client.put("k", "v").unwrap();

    assert_eq!(client.get_csv().unwrap(), "k,v\n");
    assert!(client.get_html().unwrap().contains("<li>k : v</li>"));
}

// =============================================================================
// Routing and Connection Tests
// =============================================================================

#[test]
fn test_unknown_path_is_404() {
    let server = TestServer::start();

    let response = server.client().get("/nope").unwrap();

    assert_eq!(response.status, Status::NotFound);
    assert_eq!(response.text(), "404 page not found\n");
}

#[test]
fn test_keep_alive_serves_multiple_requests() {
    let server = TestServer::start();
    let mut stream = TcpStream::connect(server.addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let mut reader = BufReader::new(stream.try_clone().unwrap());

    let body = "data=%7B%22a%22%3A%22b%22%7D";
    let set = format!(
        "POST /set HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(set.as_bytes()).unwrap();
    let (first_status, _) = read_raw_response(&mut reader);

    stream.write_all(b"GET /get HTTP/1.1\r\n\r\n").unwrap();
    let (second_status, second_body) = read_raw_response(&mut reader);

    assert_eq!(first_status, Status::Ok);
    assert_eq!(second_status, Status::Ok);
    assert_eq!(second_body, r#"{"a":"b"}"#);
}

#[test]
fn test_malformed_request_gets_400() {
    let server = TestServer::start();
    let mut stream = TcpStream::connect(server.addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

    stream.write_all(b"garbage\r\n\r\n").unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).unwrap();
    assert!(raw.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(raw.contains("Connection: close\r\n"));
}

#[test]
fn test_connection_limit_rejects_with_503() {
    let server = TestServer::start_with(|builder| builder.max_connections(1));

    // Hold the only slot open with an idle keep-alive connection
    let mut holder = TcpStream::connect(server.addr).unwrap();
    holder.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    holder.write_all(b"GET /get HTTP/1.1\r\n\r\n").unwrap();
    let mut holder_reader = BufReader::new(holder.try_clone().unwrap());
    assert_eq!(read_raw_response(&mut holder_reader).0, Status::Ok);
    assert_eq!(server.server.active_connections(), 1);

    let response = server.client().get("/get").unwrap();

    assert_eq!(response.status, Status::ServiceUnavailable);
    assert_eq!(response.text(), "too many connections\n");
}

#[test]
fn test_concurrent_clients() {
    let server = TestServer::start();
    let addr = server.addr.to_string();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let client = Client::new(addr.clone());
            thread::spawn(move || {
                for i in 0..10 {
                    client.put(&format!("t{}_k{}", t, i), &i.to_string()).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(server.client().get_json().unwrap().len(), 80);
}

#[test]
fn test_shutdown_stops_accepting() {
    let mut server = TestServer::start();
    let addr = server.addr;

    server.server.shutdown();
    server.handle.take().unwrap().join().unwrap();

    let result = Client::with_timeout(addr.to_string(), Duration::from_millis(500)).get_json();
    assert!(result.is_err());
}

#[test]
fn test_shutdown_closes_idle_keep_alive_connections() {
    let mut server = TestServer::start_with(|builder| builder.read_timeout_ms(0));

    // An idle keep-alive connection with no read timeout blocks in read
    let mut idle = TcpStream::connect(server.addr).unwrap();
    idle.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    idle.write_all(b"GET /get HTTP/1.1\r\n\r\n").unwrap();
    let mut reader = BufReader::new(idle.try_clone().unwrap());
    assert_eq!(read_raw_response(&mut reader).0, Status::Ok);

    let started = Instant::now();
    server.server.shutdown();
    server.handle.take().unwrap().join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(server.server.active_connections(), 0);
}
