//! Domain DTOs for the PDF case API.
//!
//! # Design
//! These types mirror the backend's schema but are defined independently of
//! the mock-server crate; integration tests catch schema drift. Timestamps
//! stay as the strings the server sends. Free-form extraction output is kept
//! as JSON maps because its keys are user-configured.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Processing state of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Uploaded,
    Processing,
    OcrProcessing,
    VlmProcessing,
    LlmProcessing,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl CaseStatus {
    /// Whether the backend is done with the case, successfully or not.
    pub fn is_terminal(self) -> bool {
        matches!(self, CaseStatus::Completed | CaseStatus::Failed)
    }
}

/// A processed-document record created by uploading a PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfCase {
    pub id: Uuid,
    pub original_filename: String,
    pub file_path: String,
    pub status: CaseStatus,
    #[serde(default)]
    pub ocr_text: Option<String>,
    #[serde(default)]
    pub vlm_text: Option<String>,
    #[serde(default)]
    pub extracted_info: Option<Map<String, Value>>,
    #[serde(default)]
    pub processing_details: Option<Map<String, Value>>,
    #[serde(default)]
    pub extraction_fields: Option<Vec<ExtractionField>>,
    #[serde(default)]
    pub custom_prompt: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub processed_at: Option<String>,
}

/// One field the extractor should fill in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionField {
    pub key: String,
    pub label: String,
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

fn default_field_type() -> String {
    "text".to_string()
}

impl ExtractionField {
    pub fn text(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            field_type: default_field_type(),
            required: false,
            placeholder: None,
            options: None,
        }
    }
}

/// Partial update of a case. Omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateCase {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_info: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_fields: Option<Vec<ExtractionField>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
}

/// Extraction configuration sent with an upload or a reprocess request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_fields: Option<Vec<ExtractionField>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
}

/// A saved extraction configuration reusable across cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub extraction_fields: Vec<ExtractionField>,
    #[serde(default)]
    pub custom_prompt: Option<String>,
    #[serde(default = "default_is_default")]
    pub is_default: String,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn default_is_default() -> String {
    "false".to_string()
}

impl Template {
    /// The backend stores the flag as the string `"true"` / `"false"`.
    pub fn is_default(&self) -> bool {
        self.is_default.eq_ignore_ascii_case("true")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTemplate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub extraction_fields: Vec<ExtractionField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
    #[serde(default = "default_is_default")]
    pub is_default: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTemplate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_fields: Option<Vec<ExtractionField>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<String>,
}

/// Extraction defaults offered when no template is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultConfig {
    pub extraction_fields: Vec<ExtractionField>,
    pub prompt_template: String,
}

/// Acknowledgement body of delete, reprocess and clear operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Per-page OCR and VLM output of a processed case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CasePages {
    pub case_id: Uuid,
    #[serde(default)]
    pub pdf_info: Value,
    #[serde(default)]
    pub ocr_pages: Vec<Value>,
    #[serde(default)]
    pub vlm_pages: Vec<Value>,
    #[serde(default)]
    pub ocr_stats: Value,
    #[serde(default)]
    pub vlm_stats: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDetail {
    pub case_id: Uuid,
    pub page_num: u32,
    #[serde(default)]
    pub ocr_result: Option<Value>,
    #[serde(default)]
    pub vlm_result: Option<Value>,
}
