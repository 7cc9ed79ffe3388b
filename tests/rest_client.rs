//! RestClient against a loopback HTTP server
//!
//! Each server thread answers a fixed list of canned responses, one per
//! connection, and reports the raw request head it saw.

use pagesearch::{IncrementalSearchList, ListConfig, Page, PageSource, RestClient, SearchError, Session};
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::mpsc::{channel, Receiver};
use std::thread;
use std::time::Duration;

fn serve(responses: Vec<(u16, String)>) -> (String, Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = channel();

    thread::spawn(move || {
        for (status, body) in responses {
            let (mut stream, _) = match listener.accept() {
                Ok(conn) => conn,
                Err(_) => return,
            };

            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut head = String::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                    break;
                }
                head.push_str(&line);
            }
            let _ = tx.send(head);

            let response = format!(
                "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        }
    });

    (format!("http://{}/api/drivers", addr), rx)
}

fn client(session: Session) -> RestClient {
    RestClient::new(session, Duration::from_secs(5)).unwrap()
}

fn records(range: std::ops::Range<usize>) -> String {
    let results: Vec<Value> = range.map(|i| json!({ "id": i, "name": format!("driver-{}", i) })).collect();
    json!({ "results": results }).to_string()
}

#[test]
fn fetch_sends_query_and_token() {
    let (url, heads) = serve(vec![(200, records(0..2))]);
    let client = client(Session::with_token("t0k3n"));

    let page: Page<Value> = client.fetch(&url, "pageIndex=1&pageSize=20&keyword=ana").unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page.results[1]["name"], "driver-1");

    let head = heads.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(head.starts_with("GET /api/drivers?pageIndex=1&pageSize=20&keyword=ana HTTP/1.1"));
    assert!(head.to_lowercase().contains("authorization: bearer t0k3n"));
}

#[test]
fn non_success_status_is_an_error() {
    let (url, _heads) = serve(vec![(503, "{}".to_string())]);
    let client = client(Session::new());

    let result: pagesearch::Result<Page<Value>> = client.fetch(&url, "pageIndex=1&pageSize=20");
    match result {
        Err(err @ SearchError::Status { status: 503, .. }) => assert!(err.is_transient()),
        other => panic!("expected a 503 status error, got {:?}", other.map(|p| p.len())),
    }
}

#[test]
fn body_without_results_is_an_empty_page() {
    let (url, _heads) = serve(vec![(200, json!({ "data": [] }).to_string())]);
    let client = client(Session::new());

    let page: Page<Value> = client.fetch(&url, "pageIndex=1&pageSize=20").unwrap();
    assert!(page.malformed);
    assert!(page.is_empty());
}

#[test]
fn list_pages_through_a_real_endpoint() {
    let (url, heads) = serve(vec![(200, records(0..20)), (200, records(20..25))]);
    let config = ListConfig {
        url,
        ..Default::default()
    };
    let mut list = IncrementalSearchList::<Value, _>::new(config, client(Session::new())).unwrap();

    list.mount();
    assert!(list.wait_idle(Duration::from_secs(5)));
    assert_eq!(list.items().len(), 20);
    assert!(list.has_more());

    assert!(list.on_scrolled_near_end(0));
    assert!(list.wait_idle(Duration::from_secs(5)));
    assert_eq!(list.items().len(), 25);
    assert!(!list.has_more());
    assert_eq!(list.render(24).as_deref(), Some("driver-24"));

    let first = heads.recv_timeout(Duration::from_secs(5)).unwrap();
    let second = heads.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(first.contains("pageIndex=1&pageSize=20"));
    assert!(second.contains("pageIndex=2&pageSize=20"));
}
