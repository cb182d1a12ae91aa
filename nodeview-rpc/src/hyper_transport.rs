//! Real HTTP transport built on hyper 1.x.
//!
//! hyper's http1 client connection accepts any IO implementing its
//! `Read + Write` traits with no `Send` bound, so it fits the crate's
//! single-threaded model directly; `hyper_util::rt::TokioIo` bridges a plain
//! `tokio::net::TcpStream`. One connection per request: the dashboard's call
//! rate does not justify pooling.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use nodeview_core::{TaskProvider, TokioTaskProvider};
use std::collections::HashMap;
use tokio::net::TcpStream;

use crate::http::{HttpError, HttpResponse, HttpTransport};

/// [`HttpTransport`] implementation over hyper's http1 client.
#[derive(Debug, Clone)]
pub struct HyperHttpTransport<P: TaskProvider = TokioTaskProvider> {
    tasks: P,
}

impl HyperHttpTransport<TokioTaskProvider> {
    /// Create a transport driving its connections on the local task set.
    pub fn new() -> Self {
        Self {
            tasks: TokioTaskProvider,
        }
    }
}

impl Default for HyperHttpTransport<TokioTaskProvider> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: TaskProvider> HyperHttpTransport<P> {
    /// Create a transport with a custom task provider.
    pub fn with_task_provider(tasks: P) -> Self {
        Self { tasks }
    }
}

fn io_error(e: impl std::fmt::Display) -> HttpError {
    HttpError::Io(e.to_string())
}

#[async_trait(?Send)]
impl<P: TaskProvider> HttpTransport for HyperHttpTransport<P> {
    async fn post(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: Vec<u8>,
    ) -> Result<HttpResponse, HttpError> {
        let uri: http::Uri = url
            .parse()
            .map_err(|e| HttpError::Io(format!("invalid url {url}: {e}")))?;
        let host = uri
            .host()
            .ok_or_else(|| HttpError::Io(format!("url {url} has no host")))?
            .to_string();
        let port = uri.port_u16().unwrap_or(80);

        let stream = TcpStream::connect((host.as_str(), port))
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::ConnectionRefused => HttpError::Refused,
                _ => io_error(e),
            })?;
        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(io_error)?;
        self.tasks.spawn_task("http_connection", async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "http connection ended with error");
            }
        });

        let path = uri
            .path_and_query()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(hyper::header::HOST, host.as_str());
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let request = builder
            .body(Full::new(Bytes::from(body)))
            .map_err(io_error)?;

        let response = sender.send_request(request).await.map_err(io_error)?;
        let status = response.status().as_u16();
        let collected = response.into_body().collect().await.map_err(io_error)?;
        Ok(HttpResponse {
            status,
            body: collected.to_bytes().to_vec(),
        })
    }
}
