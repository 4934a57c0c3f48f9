//! Scripted collaborators for unit tests.
//!
//! Both doubles answer by `(method, url)` route. A route replays its scripted
//! answers in order and keeps repeating the last one. Requests without a
//! route fail with a 404 `HttpError` naming the request.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::client::{ApiClient, HttpRequest, HttpResponse, HttpTransport, Method, Params};
use crate::error::ApiError;

#[derive(Debug, Clone)]
enum Scripted {
    Response(HttpResponse),
    Failure { status: u16, message: String },
}

impl Scripted {
    fn answer(&self) -> Result<HttpResponse, ApiError> {
        match self {
            Self::Response(r) => Ok(r.clone()),
            Self::Failure { status, message } => Err(ApiError::HttpError {
                status: *status,
                message: message.clone(),
            }),
        }
    }
}

#[derive(Debug, Default)]
struct Routes {
    routes: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
}

impl Routes {
    fn push(&self, method: Method, url: &str, scripted: Scripted) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, url.to_string()))
            .or_default()
            .push_back(scripted);
    }

    fn answer(&self, method: Method, url: &str) -> Result<HttpResponse, ApiError> {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&(method, url.to_string())) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap().answer(),
            Some(queue) if !queue.is_empty() => queue[0].answer(),
            _ => Err(ApiError::HttpError {
                status: 404,
                message: format!("no scripted route for {} {}", method, url),
            }),
        }
    }
}

/// A JSON response with status 200.
pub(crate) fn json_response(value: Value) -> HttpResponse {
    HttpResponse::new(200, value.to_string())
}

/// Turn a `json!({...})` literal into request parameters.
pub(crate) fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        other => panic!("params must be an object, got {}", other),
    }
}

/// A request as seen by [`MockApi`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub data: Params,
}

/// [`ApiClient`] double answering with scripted raw responses.
#[derive(Debug, Default)]
pub(crate) struct MockApi {
    routes: Routes,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: Method, url: &str, response: HttpResponse) -> &Self {
        self.routes.push(method, url, Scripted::Response(response));
        self
    }

    pub fn respond_json(&self, method: Method, url: &str, value: Value) -> &Self {
        self.respond(method, url, json_response(value))
    }

    pub fn fail(&self, method: Method, url: &str, status: u16, message: &str) -> &Self {
        self.routes.push(
            method,
            url,
            Scripted::Failure {
                status,
                message: message.to_string(),
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, method: Method, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method && c.url == url)
            .count()
    }
}

#[async_trait]
impl ApiClient for MockApi {
    async fn request(
        &self,
        method: Method,
        url: &str,
        data: Params,
    ) -> Result<HttpResponse, ApiError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            url: url.to_string(),
            data,
        });
        self.routes.answer(method, url)
    }
}

/// [`HttpTransport`] double answering with scripted responses.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    routes: Routes,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: Method, url: &str, response: HttpResponse) -> &Self {
        self.routes.push(method, url, Scripted::Response(response));
        self
    }

    pub fn respond_json(&self, method: Method, url: &str, value: Value) -> &Self {
        self.respond(method, url, json_response(value))
    }

    pub fn fail(&self, method: Method, url: &str, status: u16, message: &str) -> &Self {
        self.routes.push(
            method,
            url,
            Scripted::Failure {
                status,
                message: message.to_string(),
            },
        );
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, method: Method, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let (method, url) = (request.method, request.url.clone());
        self.requests.lock().unwrap().push(request);
        self.routes.answer(method, &url)
    }
}
