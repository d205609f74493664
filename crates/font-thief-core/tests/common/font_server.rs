//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed set of paths. Each route can be delayed or cut short
//! (announces a Content-Length, sends fewer bytes, closes the connection).
//! Counts requests per path and the peak number of requests in flight.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
    /// Content-Length to announce instead of the body length.
    pub announced_len: Option<usize>,
    pub delay: Duration,
}

impl Response {
    pub fn ok(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: content_type.to_string(),
            body: body.into(),
            announced_len: None,
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain".to_string(),
            body: format!("status {status}").into_bytes(),
            announced_len: None,
            delay: Duration::ZERO,
        }
    }

    /// Announce `len` bytes but only send the body, then hang up.
    pub fn truncated(mut self, len: usize) -> Self {
        self.announced_len = Some(len);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Default)]
struct Stats {
    hits: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

pub struct FontServer {
    base: String,
    stats: Arc<Stats>,
}

impl FontServer {
    /// Base URL with trailing slash, e.g. `http://127.0.0.1:12345/`.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Absolute URL of `path` (without leading slash).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }

    pub fn hits(&self, path: &str) -> usize {
        let key = format!("/{}", path.trim_start_matches('/'));
        self.stats.hits.lock().unwrap().get(&key).copied().unwrap_or(0)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.stats.peak.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread. Routes are keyed by path
/// (`/fonts/a.woff2`); unknown paths get 404. Runs until the process exits.
pub fn start(routes: Vec<(&str, Response)>) -> FontServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes: Arc<HashMap<String, Response>> = Arc::new(
        routes
            .into_iter()
            .map(|(p, r)| (format!("/{}", p.trim_start_matches('/')), r))
            .collect(),
    );
    let stats = Arc::new(Stats::default());
    let server_stats = Arc::clone(&stats);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let stats = Arc::clone(&server_stats);
            thread::spawn(move || handle(stream, &routes, &stats));
        }
    });
    FontServer {
        base: format!("http://127.0.0.1:{}/", port),
        stats,
    }
}

fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return None,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if buf.len() > 64 * 1024 {
            return None;
        }
    }
    String::from_utf8(buf).ok()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

fn handle(mut stream: TcpStream, routes: &HashMap<String, Response>, stats: &Stats) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    let target = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");
    let path = target.split(['?', '#']).next().unwrap_or("/").to_string();
    *stats.hits.lock().unwrap().entry(path.clone()).or_insert(0) += 1;

    let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    stats.peak.fetch_max(now, Ordering::SeqCst);

    let response = routes
        .get(&path)
        .cloned()
        .unwrap_or_else(|| Response::status(404));
    if !response.delay.is_zero() {
        thread::sleep(response.delay);
    }
    let announced = response.announced_len.unwrap_or(response.body.len());
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        reason(response.status),
        response.content_type,
        announced
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&response.body);
    let _ = stream.flush();
    let _ = stream.shutdown(std::net::Shutdown::Both);

    stats.in_flight.fetch_sub(1, Ordering::SeqCst);
}
