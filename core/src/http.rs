//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. `PdfClient`
//! builds `HttpRequest` values and parses `HttpResponse` values without ever
//! touching the network; a `Transport` (or any other host) executes them.
//!
//! Response bodies are raw bytes because the spreadsheet export is binary.
//! JSON bodies are decoded by the client's `parse_*` methods.

use crate::multipart::MultipartForm;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// How the caller wants the response handed back.
///
/// `Blob` keeps the whole envelope so headers such as `Content-Disposition`
/// remain readable; `Json` yields only the decoded body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    #[default]
    Json,
    Blob,
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized JSON text.
    Json(String),
    /// `multipart/form-data`, encoded by the transport.
    Multipart(MultipartForm),
}

impl RequestBody {
    pub fn content_type(&self) -> String {
        match self {
            RequestBody::Json(_) => "application/json".to_string(),
            RequestBody::Multipart(form) => form.content_type(),
        }
    }

    /// Wire bytes of the payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            RequestBody::Json(text) => text.as_bytes().to_vec(),
            RequestBody::Multipart(form) => form.encode(),
        }
    }

    pub fn as_json(&self) -> Option<&str> {
        match self {
            RequestBody::Json(text) => Some(text),
            RequestBody::Multipart(_) => None,
        }
    }
}

/// An HTTP request described as plain data.
///
/// `path` is the absolute URL, query string included.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub response_type: ResponseType,
}

impl HttpRequest {
    /// First header value matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Convenience constructor for a response with a text body.
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Canonical reason phrase for the status code, or an empty string.
    pub fn status_text(&self) -> &'static str {
        ::http::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Filename announced by a `Content-Disposition` header.
    ///
    /// `filename*=` (RFC 5987, percent-encoded) takes precedence over
    /// `filename=`.
    pub fn attachment_filename(&self) -> Option<String> {
        let disposition = self.header("content-disposition")?;
        let mut plain = None;
        for param in disposition.split(';').map(str::trim) {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            match key.trim().to_ascii_lowercase().as_str() {
                "filename*" => {
                    let value = value.trim();
                    let encoded = match value.split_once("''") {
                        Some((_charset, rest)) => rest,
                        None => value,
                    };
                    let decoded = percent_decode(encoded);
                    return (!decoded.is_empty()).then_some(decoded);
                }
                "filename" => {
                    plain = Some(value.trim().trim_matches('"').to_string());
                }
                _ => {}
            }
        }
        plain.filter(|name| !name.is_empty())
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let (hi, lo) = (bytes[i + 1], bytes[i + 2]);
            if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() {
                out.push((hex_value(hi) << 4) | hex_value(lo));
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}
