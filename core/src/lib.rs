//! Client core for the PDF case processing service.
//!
//! # Overview
//! `PdfClient` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network (host-does-IO pattern). `PdfApi` wires a
//! client to an injected `Transport` and `Notifier` and applies the shared
//! error handling: classify, log, notify, return.
//!
//! # Design
//! - The backend base URL comes from the page's hostname (`environment`)
//!   or from `PDFCASE_*` variables (`config`).
//! - `PdfClient` holds only configuration. The cache-busting counter for
//!   `/default-config` is its single piece of interior state.
//! - Binary responses keep their envelope; JSON responses are decoded and
//!   the envelope dropped.
//! - `router` covers client-side navigation and its refresh hook.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod environment;
pub mod error;
pub mod http;
pub mod multipart;
pub mod notify;
pub mod progress;
pub mod router;
pub mod transport;
pub mod types;

pub use api::PdfApi;
pub use client::{normalize, Normalized, PdfClient};
pub use config::{ClientConfig, ConfigError};
pub use environment::{resolve_api_base_url, BackendLocation, BuildMode, EnvironmentProfile};
pub use error::{ApiError, ErrorCategory, TransportError, NO_RESPONSE_MESSAGE};
pub use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestBody, ResponseType};
pub use multipart::{MultipartForm, UploadFile};
pub use notify::{LogNotifier, Notifier, QueueNotifier};
pub use progress::UploadProgress;
pub use router::{Navigation, Route, RouteError, Router};
pub use transport::{Transport, UreqTransport};
pub use types::{
    CasePages, CaseStatus, CreateTemplate, DefaultConfig, ExtractionField, MessageResponse,
    PageDetail, PdfCase, ProcessConfig, Template, UpdateCase, UpdateTemplate,
};
