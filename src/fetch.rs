//! Remote calls.
//!
//! Components never touch a network client directly. They describe a request
//! with [`RequestOptions`] and hand it to the page's [`Transport`]; the
//! response body is parsed as JSON. Failures surface as a rejected future
//! ([`FetchError`]) for the caller to observe. There is no retry, timeout or
//! cancellation, and a request that never completes leaves its future pending.

use futures::future::LocalBoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use tracing::debug;

use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        })
    }
}

/// What a component asks for: method, optional body and extra headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self {
            method: Method::Get,
            body: None,
            headers: Vec::new(),
        }
    }

    /// A POST whose body is `payload` encoded as JSON.
    pub fn post_json<T: Serialize>(payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            method: Method::Post,
            body: Some(serde_json::to_string(payload)?),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        })
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// A request as handed to the transport, URL already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

pub trait Transport {
    /// Sends `request`. The future resolves on the UI executor.
    fn send(&self, request: HttpRequest) -> LocalBoxFuture<'static, Result<HttpResponse, FetchError>>;
}

/// Joins `url` onto `base` unless `url` is already absolute.
pub fn resolve_url(base: &str, url: &str) -> Result<String, FetchError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        return Ok(url.to_string());
    }
    if !url.starts_with('/') {
        return Err(FetchError::InvalidUrl(url.to_string()));
    }
    Ok(format!("{}{}", base.trim_end_matches('/'), url))
}

/// Issues the request and parses the body as JSON, whatever the status code.
pub fn request_json(
    transport: Rc<dyn Transport>,
    base: &str,
    url: &str,
    options: RequestOptions,
) -> impl Future<Output = Result<Value, FetchError>> + 'static {
    let resolved = resolve_url(base, url);
    async move {
        let url = resolved?;
        debug!(method = %options.method, %url, "request");
        let response = transport
            .send(HttpRequest {
                method: options.method,
                url: url.clone(),
                body: options.body,
                headers: options.headers,
            })
            .await?;
        debug!(%url, status = response.status, bytes = response.body.len(), "response");
        serde_json::from_str(&response.body).map_err(|source| FetchError::Parse { url, source })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HTTP TRANSPORT
// ═══════════════════════════════════════════════════════════════════════════════

/// Real HTTP through `reqwest`. Requests execute on a private tokio runtime;
/// the UI executor only awaits their join handles.
#[cfg(feature = "http")]
pub struct HttpTransport {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

#[cfg(feature = "http")]
impl HttpTransport {
    pub fn new() -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("daymare-http")
            .enable_all()
            .build()?;
        Ok(Self {
            client: reqwest::Client::new(),
            runtime,
        })
    }
}

#[cfg(feature = "http")]
impl Transport for HttpTransport {
    fn send(&self, request: HttpRequest) -> LocalBoxFuture<'static, Result<HttpResponse, FetchError>> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let url = request.url;
        let handle = self.runtime.spawn(async move {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(HttpResponse { status, body })
        });

        Box::pin(async move {
            match handle.await {
                Ok(Ok(response)) => Ok(response),
                Ok(Err(e)) => Err(FetchError::Transport {
                    url,
                    reason: e.to_string(),
                }),
                Err(e) => Err(FetchError::Transport {
                    url,
                    reason: e.to_string(),
                }),
            }
        })
    }
}
