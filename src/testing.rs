//! Test doubles for hosts and tests.
//!
//! - [`MockTransport`]: scripted responses keyed by method and path, with a
//!   record of every request sent.
//! - [`ManualClock`]: a clock that only moves when told to.
//! - [`Harness`]: both of the above plus an in-memory session slot, wired
//!   into a [`Page`].

use chrono::{DateTime, Duration, Utc};
use futures::future::LocalBoxFuture;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::component::Services;
use crate::error::FetchError;
use crate::fetch::{HttpRequest, HttpResponse, Method, Transport};
use crate::markdown::ComrakMarkdown;
use crate::page::Page;
use crate::session::{Clock, MemoryStorage, SessionStore};

/// API base used by [`Harness`] pages.
pub const TEST_API_BASE: &str = "http://daymare.test";

#[derive(Debug, Clone)]
enum Scripted {
    Respond(HttpResponse),
    Fail(String),
}

/// In-memory [`Transport`]. Unscripted routes fail with a transport error.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: RefCell<HashMap<(Method, String), Scripted>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Responds to `method path` with `body` serialised as JSON, status 200.
    pub fn respond_json(&self, method: Method, path: &str, body: serde_json::Value) {
        self.respond_raw(method, path, 200, &body.to_string());
    }

    pub fn respond_raw(&self, method: Method, path: &str, status: u16, body: &str) {
        self.routes.borrow_mut().insert(
            (method, path.to_string()),
            Scripted::Respond(HttpResponse {
                status,
                body: body.to_string(),
            }),
        );
    }

    pub fn fail(&self, method: Method, path: &str, reason: &str) {
        self.routes
            .borrow_mut()
            .insert((method, path.to_string()), Scripted::Fail(reason.to_string()));
    }

    /// Every request sent so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        self.requests
            .borrow()
            .iter()
            .filter(|r| path_of(&r.url) == path)
            .cloned()
            .collect()
    }
}

fn path_of(url: &str) -> &str {
    let without_scheme = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .unwrap_or(url);
    match without_scheme.find('/') {
        Some(i) => &without_scheme[i..],
        None => "/",
    }
}

impl Transport for MockTransport {
    fn send(&self, request: HttpRequest) -> LocalBoxFuture<'static, Result<HttpResponse, FetchError>> {
        let key = (request.method, path_of(&request.url).to_string());
        let scripted = self.routes.borrow().get(&key).cloned();
        let url = request.url.clone();
        self.requests.borrow_mut().push(request);

        Box::pin(async move {
            match scripted {
                Some(Scripted::Respond(response)) => Ok(response),
                Some(Scripted::Fail(reason)) => Err(FetchError::Transport { url, reason }),
                None => Err(FetchError::Transport {
                    url,
                    reason: "no scripted response".to_string(),
                }),
            }
        })
    }
}

/// A clock that starts at a fixed instant and advances on demand.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// An offline page environment. Starts at 2024-01-01T00:00:00Z.
pub struct Harness {
    pub transport: Rc<MockTransport>,
    pub clock: Rc<ManualClock>,
    pub session: Rc<SessionStore>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        let start = DateTime::<Utc>::from_timestamp(1_704_067_200, 0).unwrap_or_default();
        let clock = Rc::new(ManualClock::new(start));
        let session = SessionStore::new(Rc::new(MemoryStorage::new()), clock.clone());
        Self {
            transport: Rc::new(MockTransport::new()),
            clock,
            session: Rc::new(session),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            transport: self.transport.clone(),
            session: self.session.clone(),
            markdown: Rc::new(ComrakMarkdown),
            api_base: TEST_API_BASE.to_string(),
        }
    }

    /// A page with the standard catalog over this harness.
    pub fn page(&self) -> Page {
        Page::new(self.services())
    }
}
