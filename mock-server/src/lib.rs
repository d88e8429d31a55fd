//! In-memory stand-in for the PDF case backend.
//!
//! Serves the `/api` surface with the same shapes and error bodies
//! (`{"detail": ...}`) as the real service. Uploaded files are kept in
//! memory and never processed; a case reaches `completed` only when a test
//! says so through `update`.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const EXPORT_FILENAME: &str = "cases_export.xlsx";
const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    pub label: String,
    #[serde(rename = "type", default = "text_type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

fn text_type() -> String {
    "text".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Case {
    pub id: Uuid,
    pub original_filename: String,
    pub file_path: String,
    pub status: String,
    pub ocr_text: Option<String>,
    pub vlm_text: Option<String>,
    pub extracted_info: Option<Map<String, Value>>,
    pub processing_details: Option<Map<String, Value>>,
    pub extraction_fields: Option<Vec<Field>>,
    pub custom_prompt: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub processed_at: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub extraction_fields: Vec<Field>,
    pub custom_prompt: Option<String>,
    pub is_default: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Deserialize)]
pub struct CaseUpdate {
    pub extracted_info: Option<Map<String, Value>>,
    pub extraction_fields: Option<Vec<Field>>,
    pub custom_prompt: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct ProcessConfig {
    pub extraction_fields: Option<Vec<Field>>,
    pub custom_prompt: Option<String>,
}

#[derive(Deserialize)]
pub struct TemplateCreate {
    pub name: String,
    pub description: Option<String>,
    pub extraction_fields: Vec<Field>,
    pub custom_prompt: Option<String>,
    #[serde(default = "false_flag")]
    pub is_default: String,
}

fn false_flag() -> String {
    "false".to_string()
}

#[derive(Deserialize)]
pub struct TemplateUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub extraction_fields: Option<Vec<Field>>,
    pub custom_prompt: Option<String>,
    pub is_default: Option<String>,
}

/// Cases and templates, newest last.
#[derive(Default)]
pub struct Store {
    pub cases: Vec<Case>,
    pub templates: Vec<Template>,
    pub uploads: Vec<(Uuid, Vec<u8>)>,
}

pub type Db = Arc<RwLock<Store>>;

/// FastAPI-style error: status plus `{"detail": ...}`.
pub struct Failure(StatusCode, String);

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "detail": self.1 }))).into_response()
    }
}

fn case_not_found() -> Failure {
    Failure(StatusCode::NOT_FOUND, "案例未找到".to_string())
}

fn template_not_found() -> Failure {
    Failure(StatusCode::NOT_FOUND, "模板未找到".to_string())
}

fn now() -> String {
    chrono::Utc::now()
        .naive_utc()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

pub fn app() -> Router {
    app_with_store(Arc::new(RwLock::new(Store::default())))
}

/// Router over a caller-provided store, so tests can seed or inspect it.
pub fn app_with_store(db: Db) -> Router {
    let api = Router::new()
        .route("/upload", post(upload))
        .route("/upload-with-config", post(upload_with_config))
        .route("/cases", get(list_cases))
        .route("/cases/{id}", get(get_case).put(update_case).delete(delete_case))
        .route("/cases/{id}/reprocess", post(reprocess_case))
        .route("/cases/{id}/export", get(export_case))
        .route("/cases/{id}/pages", get(case_pages))
        .route("/cases/{id}/pages/{page_num}", get(case_page))
        .route("/templates", get(list_templates).post(create_template))
        .route(
            "/templates/{id}",
            get(get_template).put(update_template).delete(delete_template),
        )
        .route("/default-config", get(default_config))
        .route("/export-all-cases-excel", post(export_all_cases_excel))
        .route("/clear-all-cases", delete(clear_all_cases))
        .with_state(db);
    Router::new().nest("/api", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// --- uploads ---

struct UploadForm {
    filename: String,
    bytes: Vec<u8>,
    config: Option<ProcessConfig>,
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadForm, Failure> {
    let mut file = None;
    let mut config = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Failure(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| Failure(StatusCode::BAD_REQUEST, e.to_string()))?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("config") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| Failure(StatusCode::BAD_REQUEST, e.to_string()))?;
                let parsed: ProcessConfig = serde_json::from_str(&text).map_err(|e| {
                    Failure(StatusCode::BAD_REQUEST, format!("配置格式错误: {e}"))
                })?;
                config = Some(parsed);
            }
            _ => {}
        }
    }
    let (filename, bytes) =
        file.ok_or_else(|| Failure(StatusCode::UNPROCESSABLE_ENTITY, "field required: file".to_string()))?;
    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(Failure(StatusCode::BAD_REQUEST, "只支持PDF文件".to_string()));
    }
    Ok(UploadForm {
        filename,
        bytes,
        config,
    })
}

async fn store_upload(db: &Db, form: UploadForm) -> Case {
    let id = Uuid::new_v4();
    let config = form.config.unwrap_or_default();
    let case = Case {
        id,
        original_filename: form.filename,
        file_path: format!("uploads/{id}.pdf"),
        status: "uploaded".to_string(),
        ocr_text: None,
        vlm_text: None,
        extracted_info: None,
        processing_details: None,
        extraction_fields: config.extraction_fields,
        custom_prompt: config.custom_prompt,
        error_message: None,
        created_at: now(),
        updated_at: None,
        processed_at: None,
    };
    let mut store = db.write().await;
    store.uploads.push((id, form.bytes));
    store.cases.push(case.clone());
    tracing::info!(case_id = %id, filename = %case.original_filename, "stored upload");
    case
}

async fn upload(State(db): State<Db>, multipart: Multipart) -> Result<Json<Case>, Failure> {
    let mut form = read_upload(multipart).await?;
    form.config = None;
    Ok(Json(store_upload(&db, form).await))
}

async fn upload_with_config(
    State(db): State<Db>,
    multipart: Multipart,
) -> Result<Json<Case>, Failure> {
    let form = read_upload(multipart).await?;
    Ok(Json(store_upload(&db, form).await))
}

// --- cases ---

async fn list_cases(State(db): State<Db>) -> Json<Vec<Case>> {
    let store = db.read().await;
    Json(store.cases.iter().rev().cloned().collect())
}

async fn get_case(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<Case>, Failure> {
    let store = db.read().await;
    store
        .cases
        .iter()
        .find(|c| c.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(case_not_found)
}

async fn update_case(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<CaseUpdate>,
) -> Result<Json<Case>, Failure> {
    let mut store = db.write().await;
    let case = store
        .cases
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(case_not_found)?;
    if let Some(info) = input.extracted_info {
        case.extracted_info = Some(info);
        case.status = "completed".to_string();
        case.processed_at = Some(now());
    }
    if let Some(fields) = input.extraction_fields {
        case.extraction_fields = Some(fields);
    }
    if let Some(prompt) = input.custom_prompt {
        case.custom_prompt = Some(prompt);
    }
    case.updated_at = Some(now());
    Ok(Json(case.clone()))
}

async fn reprocess_case(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    config: Option<Json<ProcessConfig>>,
) -> Result<Json<Value>, Failure> {
    let mut store = db.write().await;
    let case = store
        .cases
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(case_not_found)?;
    if let Some(Json(config)) = config {
        if let Some(fields) = config.extraction_fields {
            case.extraction_fields = Some(fields);
        }
        if let Some(prompt) = config.custom_prompt {
            case.custom_prompt = Some(prompt);
        }
    }
    case.status = "processing".to_string();
    Ok(Json(json!({ "message": "开始重新处理" })))
}

async fn delete_case(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<Value>, Failure> {
    let mut store = db.write().await;
    let before = store.cases.len();
    store.cases.retain(|c| c.id != id);
    if store.cases.len() == before {
        return Err(case_not_found());
    }
    store.uploads.retain(|(upload_id, _)| *upload_id != id);
    Ok(Json(json!({ "message": "案例已删除" })))
}

async fn export_case(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<Value>, Failure> {
    let store = db.read().await;
    let case = store.cases.iter().find(|c| c.id == id).ok_or_else(case_not_found)?;
    match &case.extracted_info {
        Some(info) => Ok(Json(Value::Object(info.clone()))),
        None => Err(Failure(StatusCode::BAD_REQUEST, "案例信息尚未提取完成".to_string())),
    }
}

fn details_of(case: &Case) -> Result<&Map<String, Value>, Failure> {
    case.processing_details.as_ref().ok_or_else(|| {
        Failure(
            StatusCode::BAD_REQUEST,
            "案例尚未处理完成或无详细处理结果".to_string(),
        )
    })
}

async fn case_pages(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<Value>, Failure> {
    let store = db.read().await;
    let case = store.cases.iter().find(|c| c.id == id).ok_or_else(case_not_found)?;
    let details = details_of(case)?;
    let pick = |key: &str, empty: Value| details.get(key).cloned().unwrap_or(empty);
    Ok(Json(json!({
        "case_id": id,
        "pdf_info": pick("pdf_info", json!({})),
        "ocr_pages": pick("ocr_pages", json!([])),
        "vlm_pages": pick("vlm_pages", json!([])),
        "ocr_stats": pick("ocr_stats", json!({})),
        "vlm_stats": pick("vlm_stats", json!({})),
    })))
}

async fn case_page(
    State(db): State<Db>,
    Path((id, page_num)): Path<(Uuid, u32)>,
) -> Result<Json<Value>, Failure> {
    let store = db.read().await;
    let case = store.cases.iter().find(|c| c.id == id).ok_or_else(case_not_found)?;
    let details = details_of(case)?;
    let find_page = |key: &str| {
        details
            .get(key)
            .and_then(Value::as_array)
            .and_then(|pages| {
                pages
                    .iter()
                    .find(|p| p.get("page_num").and_then(Value::as_u64) == Some(page_num as u64))
            })
            .cloned()
    };
    let ocr = find_page("ocr_pages");
    let vlm = find_page("vlm_pages");
    if ocr.is_none() && vlm.is_none() {
        return Err(Failure(StatusCode::NOT_FOUND, format!("第{page_num}页未找到")));
    }
    Ok(Json(json!({
        "case_id": id,
        "page_num": page_num,
        "ocr_result": ocr,
        "vlm_result": vlm,
    })))
}

async fn export_all_cases_excel(State(db): State<Db>) -> Response {
    let store = db.read().await;
    let mut sheet = String::from("id\toriginal_filename\tstatus\tcreated_at\n");
    for case in &store.cases {
        sheet.push_str(&format!(
            "{}\t{}\t{}\t{}\n",
            case.id, case.original_filename, case.status, case.created_at
        ));
    }
    (
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILENAME}\""),
            ),
        ],
        sheet.into_bytes(),
    )
        .into_response()
}

async fn clear_all_cases(State(db): State<Db>) -> Json<Value> {
    let mut store = db.write().await;
    let deleted = store.cases.len();
    store.cases.clear();
    store.uploads.clear();
    tracing::info!(deleted, "cleared all cases");
    Json(json!({ "message": format!("已清空 {deleted} 个案例"), "deleted_count": deleted }))
}

// --- templates ---

async fn list_templates(State(db): State<Db>) -> Json<Vec<Template>> {
    let store = db.read().await;
    Json(store.templates.iter().rev().cloned().collect())
}

async fn create_template(
    State(db): State<Db>,
    Json(input): Json<TemplateCreate>,
) -> Json<Template> {
    let template = Template {
        id: Uuid::new_v4(),
        name: input.name,
        description: input.description,
        extraction_fields: input.extraction_fields,
        custom_prompt: input.custom_prompt,
        is_default: input.is_default,
        created_at: now(),
        updated_at: None,
    };
    db.write().await.templates.push(template.clone());
    Json(template)
}

async fn get_template(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<Template>, Failure> {
    let store = db.read().await;
    store
        .templates
        .iter()
        .find(|t| t.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(template_not_found)
}

async fn update_template(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<TemplateUpdate>,
) -> Result<Json<Template>, Failure> {
    let mut store = db.write().await;
    let template = store
        .templates
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(template_not_found)?;
    if let Some(name) = input.name {
        template.name = name;
    }
    if let Some(description) = input.description {
        template.description = Some(description);
    }
    if let Some(fields) = input.extraction_fields {
        template.extraction_fields = fields;
    }
    if let Some(prompt) = input.custom_prompt {
        template.custom_prompt = Some(prompt);
    }
    if let Some(flag) = input.is_default {
        template.is_default = flag;
    }
    template.updated_at = Some(now());
    Ok(Json(template.clone()))
}

async fn delete_template(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, Failure> {
    let mut store = db.write().await;
    let before = store.templates.len();
    store.templates.retain(|t| t.id != id);
    if store.templates.len() == before {
        return Err(template_not_found());
    }
    Ok(Json(json!({ "message": "模板已删除" })))
}

// --- defaults ---

pub fn default_fields() -> Vec<Field> {
    [
        ("case_number", "案号"),
        ("plaintiff", "原告"),
        ("defendant", "被告"),
        ("court", "法院"),
        ("case_amount", "案件金额"),
        ("case_date", "案件日期"),
    ]
    .into_iter()
    .map(|(key, label)| Field {
        key: key.to_string(),
        label: label.to_string(),
        field_type: text_type(),
        required: false,
        placeholder: None,
        options: None,
    })
    .collect()
}

async fn default_config() -> Response {
    let body = json!({
        "extraction_fields": default_fields(),
        "prompt_template": "请从以下法律文书中提取信息:\n{text}",
    });
    ([(header::CACHE_CONTROL, "no-store")], Json(body)).into_response()
}
