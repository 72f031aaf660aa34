//! Minimal HTTP/1.1 server that serves documents for transport tests.
//!
//! Answers `GET /api/documents/{id}/download`. Unknown ids get 404; a document
//! can be set to fail with a status for its first N requests.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct Document {
    pub body: Vec<u8>,
    pub disposition: Option<String>,
    /// Requests answered with `failure_status` before the body is served.
    pub failures_before_success: usize,
    pub failure_status: u16,
    /// Advertise this length and send the body one chunk per interval,
    /// repeating it until the client hangs up.
    pub trickle: Option<(u64, Duration)>,
}

impl Document {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    pub fn with_disposition(mut self, value: &str) -> Self {
        self.disposition = Some(value.to_string());
        self
    }

    pub fn trickling(mut self, declared_len: u64, every: Duration) -> Self {
        self.trickle = Some((declared_len, every));
        self
    }

    pub fn failing_first(mut self, times: usize, status: u16) -> Self {
        self.failures_before_success = times;
        self.failure_status = status;
        self
    }
}

pub struct DocServer {
    pub base_url: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    auth: Arc<Mutex<Vec<Option<String>>>>,
}

impl DocServer {
    /// Requests seen for `id`, failed ones included.
    pub fn hits(&self, id: &str) -> usize {
        self.hits.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    /// Authorization header of every request, in arrival order.
    pub fn auth_headers(&self) -> Vec<Option<String>> {
        self.auth.lock().unwrap().clone()
    }
}

/// Starts a server in a background thread. It runs until the process exits.
pub fn start(docs: HashMap<String, Document>) -> DocServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let docs = Arc::new(docs);
    let hits = Arc::new(Mutex::new(HashMap::new()));
    let auth = Arc::new(Mutex::new(Vec::new()));
    let (h, a) = (Arc::clone(&hits), Arc::clone(&auth));
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let docs = Arc::clone(&docs);
            let hits = Arc::clone(&h);
            let auth = Arc::clone(&a);
            thread::spawn(move || handle(stream, &docs, &hits, &auth));
        }
    });
    DocServer {
        base_url: format!("http://127.0.0.1:{}/", port),
        hits,
        auth,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    docs: &HashMap<String, Document>,
    hits: &Mutex<HashMap<String, usize>>,
    auth: &Mutex<Vec<Option<String>>>,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, path, authorization) = parse_request(request);
    auth.lock().unwrap().push(authorization);

    let id = path
        .strip_prefix("/api/documents/")
        .and_then(|rest| rest.strip_suffix("/download"));
    let doc = match (method.eq_ignore_ascii_case("GET"), id) {
        (true, Some(id)) => {
            let seen = {
                let mut hits = hits.lock().unwrap();
                let n = hits.entry(id.to_string()).or_insert(0);
                *n += 1;
                *n
            };
            docs.get(id).map(|doc| (doc, seen))
        }
        _ => None,
    };

    let Some((doc, seen)) = doc else {
        let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    };
    if seen <= doc.failures_before_success {
        let response = format!(
            "HTTP/1.1 {} Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            doc.failure_status
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    let disposition = doc
        .disposition
        .as_ref()
        .map(|d| format!("Content-Disposition: {}\r\n", d))
        .unwrap_or_default();
    let length = doc.trickle.map_or(doc.body.len() as u64, |(len, _)| len);
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\n{}Connection: close\r\n\r\n",
        length, disposition
    );
    if stream.write_all(head.as_bytes()).is_err() {
        return;
    }
    match doc.trickle {
        None => {
            let _ = stream.write_all(&doc.body);
        }
        Some((len, every)) => {
            let mut sent = 0u64;
            while sent < len && !doc.body.is_empty() {
                if stream.write_all(&doc.body).is_err() {
                    return;
                }
                sent += doc.body.len() as u64;
                thread::sleep(every);
            }
        }
    }
}

/// Returns (method, path, Authorization header value).
fn parse_request(request: &str) -> (String, String, Option<String>) {
    let mut lines = request.lines();
    let first = lines.next().unwrap_or("");
    let mut parts = first.split_whitespace();
    let method = parts.next().unwrap_or("GET").to_string();
    let path = parts.next().unwrap_or("/").to_string();
    let authorization = lines
        .take_while(|l| !l.is_empty())
        .find_map(|l| {
            let (name, value) = l.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case("authorization")
                .then(|| value.trim().to_string())
        });
    (method, path, authorization)
}
