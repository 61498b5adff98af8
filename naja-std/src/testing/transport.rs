use futures::channel::oneshot;
use naja_core::{BoxError, FormData, HttpResponse, Request, Transport, location};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

// ============================================================================
// Mock Transport
// ============================================================================

/// A request as the transport saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Upper-case method.
    pub method: String,
    /// Absolute URL.
    pub url: String,
    /// Form fields.
    pub data: Option<FormData>,
    /// Request headers.
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    /// Header lookup, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

enum Reply {
    Response(HttpResponse),
    Delayed(Duration, HttpResponse),
    Error(String),
    Held(oneshot::Receiver<HttpResponse>),
}

impl Reply {
    fn try_clone(&self) -> Option<Reply> {
        match self {
            Reply::Response(response) => Some(Reply::Response(response.clone())),
            Reply::Delayed(delay, response) => Some(Reply::Delayed(*delay, response.clone())),
            Reply::Error(message) => Some(Reply::Error(message.clone())),
            Reply::Held(_) => None,
        }
    }
}

/// Releases a response registered with [`MockTransport::hold`].
///
/// Dropping the gate fails the held request with a transport error.
#[derive(Debug)]
pub struct Gate(oneshot::Sender<HttpResponse>);

impl Gate {
    /// Deliver `response` to the waiting request.
    pub fn release(self, response: HttpResponse) {
        let _ = self.0.send(response);
    }
}

/// A scripted [`Transport`].
///
/// Replies are registered per URL, either absolute or as a path with query
/// (`/list?page=2`). Each URL keeps a queue: replies are consumed in order
/// and the last one is repeated. Unknown URLs answer `404`.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    routes: HashMap<String, VecDeque<Reply>>,
    requests: Vec<RecordedRequest>,
}

impl MockTransport {
    /// Create a transport with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, url: &str, reply: Reply) {
        self.lock()
            .routes
            .entry(url.to_owned())
            .or_default()
            .push_back(reply);
    }

    /// Answer `url` with `response`.
    pub fn respond(&self, url: &str, response: HttpResponse) {
        self.push(url, Reply::Response(response));
    }

    /// Answer `url` with a `200` JSON body.
    pub fn respond_json(&self, url: &str, body: serde_json::Value) {
        self.respond(url, HttpResponse::json(url, &body));
    }

    /// Answer `url` with `response` after `delay`.
    pub fn respond_after(&self, url: &str, delay: Duration, response: HttpResponse) {
        self.push(url, Reply::Delayed(delay, response));
    }

    /// Fail requests to `url` at the transport level.
    pub fn fail(&self, url: &str, message: &str) {
        self.push(url, Reply::Error(message.to_owned()));
    }

    /// Keep the next request to `url` pending until the returned gate is
    /// released.
    pub fn hold(&self, url: &str) -> Gate {
        let (sender, receiver) = oneshot::channel();
        self.push(url, Reply::Held(receiver));
        Gate(sender)
    }

    /// Every request sent so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn next_reply(&self, request: &Request) -> Option<Reply> {
        let mut state = self.lock();
        state.requests.push(RecordedRequest {
            method: request.method.clone(),
            url: request.url.clone(),
            data: request.data.clone(),
            headers: request.headers.clone(),
        });

        let relative = location::path_and_query(&request.url);
        let key = [request.url.as_str(), relative.as_str()]
            .into_iter()
            .find(|key| state.routes.get(*key).is_some_and(|queue| !queue.is_empty()))?
            .to_owned();
        let queue = state.routes.get_mut(&key)?;
        match queue.front().and_then(Reply::try_clone) {
            Some(reply) if queue.len() == 1 => Some(reply),
            _ => queue.pop_front(),
        }
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: &Request) -> Result<HttpResponse, BoxError> {
        match self.next_reply(request) {
            None => Ok(HttpResponse::new(404, request.url.clone(), "")),
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Delayed(delay, response)) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            Some(Reply::Error(message)) => Err(message.into()),
            Some(Reply::Held(receiver)) => receiver
                .await
                .map_err(|_| BoxError::from("held response was dropped")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use naja_core::{Options, RequestId};
    use std::sync::Arc;

    fn request(url: &str) -> Request {
        Request {
            id: RequestId::default(),
            method: "GET".into(),
            url: url.into(),
            data: None,
            headers: Vec::new(),
            options: Arc::new(Options::new()),
        }
    }

    #[tokio::test]
    async fn test_last_reply_repeats() {
        let transport = MockTransport::new();
        transport.respond("/a", HttpResponse::new(200, "/a", "1"));
        transport.respond("https://example.com/a", HttpResponse::new(200, "/a", "2"));
        transport.respond("https://example.com/a", HttpResponse::new(200, "/a", "3"));

        let req = request("https://example.com/a");
        assert_eq!(transport.send(&req).await.unwrap().body, "2");
        assert_eq!(transport.send(&req).await.unwrap().body, "3");
        assert_eq!(transport.send(&req).await.unwrap().body, "3");
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_unknown_url_is_not_found() {
        let transport = MockTransport::new();
        let response = transport.send(&request("https://example.com/x")).await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_held_reply_waits_for_gate() {
        let transport = Arc::new(MockTransport::new());
        let gate = transport.hold("/slow");
        let pending = {
            let transport = transport.clone();
            tokio::spawn(async move { transport.send(&request("https://example.com/slow")).await })
        };
        tokio::task::yield_now().await;
        gate.release(HttpResponse::new(200, "/slow", "done"));
        assert_eq!(pending.await.unwrap().unwrap().body, "done");

        let gate = transport.hold("/slow");
        drop(gate);
        assert!(transport.send(&request("https://example.com/slow")).await.is_err());
    }
}
