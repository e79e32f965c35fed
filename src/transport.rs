//! HTTP transport used by the client.
//!
//! - Blocking, one request at a time.
//! - Status codes are data, not errors: every response body reaches the
//!   caller, which decides what a non-2xx answer means.
//! - `UreqTransport` is the production implementation; tests substitute a
//!   recording fake.

use http::{Method, StatusCode};
use serde_json::Value;
use std::time::Duration;

use crate::error::NestClientError;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    /// `application/x-www-form-urlencoded` fields, in order.
    Form(Vec<(String, String)>),
    Json(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        HttpRequest {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn post(url: impl Into<String>, body: RequestBody) -> Self {
        HttpRequest {
            method: Method::POST,
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    pub fn with_headers(mut self, headers: &[(String, String)]) -> Self {
        self.headers.extend(headers.iter().cloned());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

pub trait Transport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, NestClientError>;
}

pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// `timeout` bounds each whole request; `None` waits indefinitely.
    pub fn new(timeout: Option<Duration>) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build();
        UreqTransport { agent: config.into() }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        UreqTransport::new(None)
    }
}

fn apply_headers<B>(mut req: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
    for (k, v) in headers {
        req = req.header(k.as_str(), v.as_str());
    }
    req
}

impl Transport for UreqTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, NestClientError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let result = if method == Method::GET {
            apply_headers(self.agent.get(&url), &headers).call()
        } else if method == Method::POST {
            let req = apply_headers(self.agent.post(&url), &headers);
            match body {
                RequestBody::Empty => req.send_empty(),
                RequestBody::Form(fields) => req.send_form(fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
                RequestBody::Json(value) => req.send_json(&value),
            }
        } else {
            return Err(NestClientError::Transport(format!("unsupported method {}", method)));
        };

        let mut response = result?;
        let status = response.status();
        let body = response.body_mut().read_to_string()?;
        log::debug!("{} {} -> {}", method, url, status);
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted transport that records what the client sends.

    use super::*;
    use std::cell::RefCell;
    use std::collections::{BTreeMap, VecDeque};

    #[derive(Default)]
    pub struct FakeTransport {
        routes: RefCell<BTreeMap<String, VecDeque<Result<HttpResponse, String>>>>,
        requests: RefCell<Vec<HttpRequest>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            FakeTransport::default()
        }

        /// Queue a 200 response with `body` for the next request to `url`.
        pub fn respond(&self, url: &str, body: &str) -> &Self {
            self.respond_with(url, StatusCode::OK, body)
        }

        pub fn respond_with(&self, url: &str, status: StatusCode, body: &str) -> &Self {
            self.routes
                .borrow_mut()
                .entry(url.to_string())
                .or_default()
                .push_back(Ok(HttpResponse {
                    status,
                    body: body.to_string(),
                }));
            self
        }

        pub fn fail(&self, url: &str, message: &str) -> &Self {
            self.routes
                .borrow_mut()
                .entry(url.to_string())
                .or_default()
                .push_back(Err(message.to_string()));
            self
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.borrow().clone()
        }

        pub fn urls(&self) -> Vec<String> {
            self.requests.borrow().iter().map(|r| r.url.clone()).collect()
        }
    }

    impl Transport for FakeTransport {
        fn send(&self, request: HttpRequest) -> Result<HttpResponse, NestClientError> {
            let url = request.url.clone();
            self.requests.borrow_mut().push(request);
            let next = self.routes.borrow_mut().get_mut(&url).and_then(VecDeque::pop_front);
            match next {
                Some(Ok(resp)) => Ok(resp),
                Some(Err(msg)) => Err(NestClientError::Transport(msg)),
                None => Err(NestClientError::Transport(format!("no scripted response for {}", url))),
            }
        }
    }
}
