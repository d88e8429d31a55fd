//! Executing `HttpRequest`s.
//!
//! # Design
//! `PdfClient` never performs I/O; a `Transport` does. `UreqTransport` is
//! the blocking implementation. It disables ureq's status-as-error behavior
//! so 4xx/5xx responses come back as data and status interpretation stays
//! in the client.

use std::io::Cursor;

use ureq::{Agent, SendBody};

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::progress::{ProgressReader, UploadProgress};

/// Sends a request and returns whatever response the server gave.
///
/// `on_progress` observes request-body bytes as they are written.
pub trait Transport {
    fn execute(
        &self,
        request: HttpRequest,
        on_progress: &mut dyn FnMut(UploadProgress),
    ) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(
        &self,
        request: HttpRequest,
        on_progress: &mut dyn FnMut(UploadProgress),
    ) -> Result<HttpResponse, TransportError> {
        (**self).execute(request, on_progress)
    }
}

#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    /// Agent with the configuration's timeout applied to whole requests.
    pub fn new(config: &ClientConfig) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(
        &self,
        request: HttpRequest,
        on_progress: &mut dyn FnMut(UploadProgress),
    ) -> Result<HttpResponse, TransportError> {
        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&request.path);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Delete => {
                let mut builder = self.agent.delete(&request.path);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post | HttpMethod::Put => {
                let mut builder = if request.method == HttpMethod::Post {
                    self.agent.post(&request.path)
                } else {
                    self.agent.put(&request.path)
                };
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match &request.body {
                    Some(body) => {
                        let bytes = body.to_bytes();
                        let total = bytes.len() as u64;
                        let mut reader = ProgressReader::new(Cursor::new(bytes), total, on_progress);
                        builder.send(SendBody::from_reader(&mut reader))
                    }
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        // ureq caps bodies at 10 MiB by default; spreadsheet exports can exceed it.
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(|e| TransportError::NoResponse(e.to_string()))?;

        Ok(HttpResponse { status, headers, body })
    }
}

/// Malformed requests never reached the network; everything else did and
/// got no usable answer.
fn classify(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::BadUri(_) | ureq::Error::Http(_) => TransportError::Setup(err.to_string()),
        other => TransportError::NoResponse(other.to_string()),
    }
}
