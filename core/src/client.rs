//! Stateless HTTP request builder and response parser for the PDF case API.
//!
//! # Design
//! `PdfClient` holds only its configuration and carries no per-call state.
//! Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! The caller (or `PdfApi`) executes the HTTP round-trip in between.
//!
//! Every `parse_*` goes through [`normalize`]: a non-2xx status becomes
//! `ApiError::Status`, a `Json` request yields the body alone and a `Blob`
//! request yields the whole envelope.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestBody, ResponseType};
use crate::multipart::{MultipartForm, UploadFile};
use crate::types::{
    CasePages, CreateTemplate, DefaultConfig, MessageResponse, PageDetail, PdfCase, ProcessConfig,
    Template, UpdateCase, UpdateTemplate,
};

/// A response after status checking.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// Decoded-body requests: status and headers are dropped.
    Body(Vec<u8>),
    /// Binary requests: the full response, headers included.
    Envelope(HttpResponse),
}

/// Check the status and strip the envelope unless the request asked for a
/// binary payload.
pub fn normalize(response: HttpResponse, response_type: ResponseType) -> Result<Normalized, ApiError> {
    check_status(&response)?;
    Ok(match response_type {
        ResponseType::Json => Normalized::Body(response.body),
        ResponseType::Blob => Normalized::Envelope(response),
    })
}

/// Map non-2xx status codes to `ApiError::Status`.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::Status {
        status: response.status,
        status_text: response.status_text().to_string(),
        body: response.body_text(),
    })
}

/// Strictly increasing millisecond tokens for cache-busting query strings.
#[derive(Debug, Default)]
struct CacheBuster {
    last: AtomicU64,
}

impl CacheBuster {
    fn next(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(current + 1);
            match self
                .last
                .compare_exchange_weak(current, candidate, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => current = actual,
            }
        }
    }
}

/// Synchronous, stateless client for the PDF case API.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network.
#[derive(Debug, Clone)]
pub struct PdfClient {
    config: ClientConfig,
    cache_buster: Arc<CacheBuster>,
}

impl PdfClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_config(ClientConfig::new(base_url))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config: ClientConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            cache_buster: Arc::default(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    fn request(&self, method: HttpMethod, path: &str, body: Option<RequestBody>) -> HttpRequest {
        let mut headers = Vec::new();
        if let Some(body) = &body {
            headers.push(("content-type".to_string(), body.content_type()));
        }
        headers.extend(self.config.default_headers.iter().cloned());
        HttpRequest {
            method,
            path: self.url(path),
            headers,
            body,
            response_type: ResponseType::Json,
        }
    }

    fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        input: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::RequestSetup(e.to_string()))?;
        Ok(self.request(method, path, Some(RequestBody::Json(body))))
    }

    // -----------------------------------------------------------------------
    // Uploads
    // -----------------------------------------------------------------------

    pub fn build_upload_pdf(&self, file: &UploadFile) -> HttpRequest {
        let form = MultipartForm::new().file("file", file);
        self.request(HttpMethod::Post, "/upload", Some(RequestBody::Multipart(form)))
    }

    /// The `config` field is omitted when no configuration is given.
    pub fn build_upload_pdf_with_config(
        &self,
        file: &UploadFile,
        config: Option<&ProcessConfig>,
    ) -> Result<HttpRequest, ApiError> {
        let mut form = MultipartForm::new().file("file", file);
        if let Some(config) = config {
            let json = serde_json::to_string(config).map_err(|e| ApiError::RequestSetup(e.to_string()))?;
            form = form.text("config", json);
        }
        Ok(self.request(
            HttpMethod::Post,
            "/upload-with-config",
            Some(RequestBody::Multipart(form)),
        ))
    }

    pub fn parse_upload(&self, response: HttpResponse) -> Result<PdfCase, ApiError> {
        decode(response)
    }

    // -----------------------------------------------------------------------
    // Cases
    // -----------------------------------------------------------------------

    pub fn build_get_cases(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/cases", None)
    }

    pub fn parse_get_cases(&self, response: HttpResponse) -> Result<Vec<PdfCase>, ApiError> {
        decode(response)
    }

    pub fn build_get_case(&self, id: Uuid) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/cases/{id}"), None)
    }

    pub fn parse_get_case(&self, response: HttpResponse) -> Result<PdfCase, ApiError> {
        decode(response)
    }

    pub fn build_update_case(&self, id: Uuid, input: &UpdateCase) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, &format!("/cases/{id}"), input)
    }

    pub fn parse_update_case(&self, response: HttpResponse) -> Result<PdfCase, ApiError> {
        decode(response)
    }

    /// Without a configuration the backend reprocesses with the case's
    /// stored settings.
    pub fn build_reprocess_case(
        &self,
        id: Uuid,
        config: Option<&ProcessConfig>,
    ) -> Result<HttpRequest, ApiError> {
        let path = format!("/cases/{id}/reprocess");
        match config {
            Some(config) => self.json_request(HttpMethod::Post, &path, config),
            None => Ok(self.request(HttpMethod::Post, &path, None)),
        }
    }

    pub fn parse_reprocess_case(&self, response: HttpResponse) -> Result<MessageResponse, ApiError> {
        decode(response)
    }

    pub fn build_delete_case(&self, id: Uuid) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("/cases/{id}"), None)
    }

    pub fn parse_delete_case(&self, response: HttpResponse) -> Result<MessageResponse, ApiError> {
        decode(response)
    }

    pub fn build_export_case(&self, id: Uuid) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/cases/{id}/export"), None)
    }

    /// The extracted information as the server stores it.
    pub fn parse_export_case(&self, response: HttpResponse) -> Result<Value, ApiError> {
        decode(response)
    }

    pub fn build_get_case_pages(&self, id: Uuid) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/cases/{id}/pages"), None)
    }

    pub fn parse_get_case_pages(&self, response: HttpResponse) -> Result<CasePages, ApiError> {
        decode(response)
    }

    pub fn build_get_case_page(&self, id: Uuid, page_num: u32) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/cases/{id}/pages/{page_num}"), None)
    }

    pub fn parse_get_case_page(&self, response: HttpResponse) -> Result<PageDetail, ApiError> {
        decode(response)
    }

    /// The spreadsheet comes back as a binary envelope so the caller can
    /// read the filename from `Content-Disposition`.
    pub fn build_export_all_cases_excel(&self) -> HttpRequest {
        let mut req = self.request(HttpMethod::Post, "/export-all-cases-excel", None);
        req.response_type = ResponseType::Blob;
        req
    }

    pub fn parse_export_all_cases_excel(&self, response: HttpResponse) -> Result<HttpResponse, ApiError> {
        match normalize(response, ResponseType::Blob)? {
            Normalized::Envelope(response) => Ok(response),
            Normalized::Body(body) => Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body,
            }),
        }
    }

    pub fn build_clear_all_cases(&self) -> HttpRequest {
        self.request(HttpMethod::Delete, "/clear-all-cases", None)
    }

    pub fn parse_clear_all_cases(&self, response: HttpResponse) -> Result<MessageResponse, ApiError> {
        decode(response)
    }

    // -----------------------------------------------------------------------
    // Templates
    // -----------------------------------------------------------------------

    pub fn build_get_templates(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/templates", None)
    }

    pub fn parse_get_templates(&self, response: HttpResponse) -> Result<Vec<Template>, ApiError> {
        decode(response)
    }

    pub fn build_create_template(&self, input: &CreateTemplate) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/templates", input)
    }

    pub fn build_get_template(&self, id: Uuid) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/templates/{id}"), None)
    }

    pub fn build_update_template(&self, id: Uuid, input: &UpdateTemplate) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, &format!("/templates/{id}"), input)
    }

    /// Shared by create, get and update.
    pub fn parse_template(&self, response: HttpResponse) -> Result<Template, ApiError> {
        decode(response)
    }

    pub fn build_delete_template(&self, id: Uuid) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("/templates/{id}"), None)
    }

    pub fn parse_delete_template(&self, response: HttpResponse) -> Result<MessageResponse, ApiError> {
        decode(response)
    }

    // -----------------------------------------------------------------------
    // Defaults
    // -----------------------------------------------------------------------

    /// Appends `_={token}` so intermediate caches never serve a stale copy.
    pub fn build_get_default_config(&self) -> HttpRequest {
        let token = self.cache_buster.next();
        self.request(HttpMethod::Get, &format!("/default-config?_={token}"), None)
    }

    pub fn parse_get_default_config(&self, response: HttpResponse) -> Result<DefaultConfig, ApiError> {
        decode(response)
    }
}

fn decode<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    let body = match normalize(response, ResponseType::Json)? {
        Normalized::Body(body) => body,
        Normalized::Envelope(response) => response.body,
    };
    serde_json::from_slice(&body).map_err(|e| ApiError::Deserialization(e.to_string()))
}
