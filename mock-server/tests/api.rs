use std::sync::Arc;

use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_store, Case, Store, Template, EXPORT_FILENAME};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tower::ServiceExt;
use uuid::Uuid;

const BOUNDARY: &str = "test-boundary";

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

fn upload_request(uri: &str, filename: &str, config: Option<&str>) -> Request<String> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: application/pdf\r\n\r\n\
         %PDF-1.4 test\r\n"
    );
    if let Some(config) = config {
        body.push_str(&format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"config\"\r\n\r\n\
             {config}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(body)
        .unwrap()
}

fn seeded_case(id: Uuid, details: Option<Value>) -> Case {
    Case {
        id,
        original_filename: "seed.pdf".to_string(),
        file_path: format!("uploads/{id}.pdf"),
        status: "completed".to_string(),
        ocr_text: None,
        vlm_text: None,
        extracted_info: None,
        processing_details: details.and_then(|d| d.as_object().cloned()),
        extraction_fields: None,
        custom_prompt: None,
        error_message: None,
        created_at: "2024-05-01T08:00:00.000000".to_string(),
        updated_at: None,
        processed_at: None,
    }
}

// --- uploads ---

#[tokio::test]
async fn upload_creates_case() {
    let resp = app()
        .oneshot(upload_request("/api/upload", "judgment.pdf", None))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let case: Case = body_json(resp).await;
    assert_eq!(case.original_filename, "judgment.pdf");
    assert_eq!(case.status, "uploaded");
    assert_eq!(case.file_path, format!("uploads/{}.pdf", case.id));
}

#[tokio::test]
async fn upload_rejects_non_pdf() {
    let resp = app()
        .oneshot(upload_request("/api/upload", "notes.txt", None))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["detail"], "只支持PDF文件");
}

#[tokio::test]
async fn upload_with_config_stores_prompt() {
    let config = r#"{"custom_prompt":"只提取案号","extraction_fields":[{"key":"case_number","label":"案号"}]}"#;
    let resp = app()
        .oneshot(upload_request("/api/upload-with-config", "a.PDF", Some(config)))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let case: Case = body_json(resp).await;
    assert_eq!(case.custom_prompt.as_deref(), Some("只提取案号"));
    assert_eq!(case.extraction_fields.unwrap()[0].field_type, "text");
}

#[tokio::test]
async fn upload_with_bad_config_is_400() {
    let resp = app()
        .oneshot(upload_request("/api/upload-with-config", "a.pdf", Some("{not json")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- cases ---

#[tokio::test]
async fn get_case_not_found_has_detail() {
    let resp = app()
        .oneshot(empty_request(
            "GET",
            "/api/cases/00000000-0000-0000-0000-000000000000",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"detail": "案例未找到"}));
}

#[tokio::test]
async fn get_case_bad_uuid_returns_400() {
    let resp = app()
        .oneshot(empty_request("GET", "/api/cases/not-a-uuid"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn export_case_before_extraction_is_400() {
    let id = Uuid::new_v4();
    let db = Arc::new(RwLock::new(Store::default()));
    db.write().await.cases.push(seeded_case(id, None));

    let resp = app_with_store(db)
        .oneshot(empty_request("GET", &format!("/api/cases/{id}/export")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reprocess_without_body_is_accepted() {
    let id = Uuid::new_v4();
    let db = Arc::new(RwLock::new(Store::default()));
    db.write().await.cases.push(seeded_case(id, None));

    let resp = app_with_store(db.clone())
        .oneshot(empty_request("POST", &format!("/api/cases/{id}/reprocess")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["message"], "开始重新处理");
    assert_eq!(db.read().await.cases[0].status, "processing");
}

#[tokio::test]
async fn case_pages_and_single_page() {
    let id = Uuid::new_v4();
    let details = json!({
        "pdf_info": {"page_count": 2},
        "ocr_pages": [{"page_num": 1, "text": "第一页"}, {"page_num": 2, "text": "第二页"}],
        "vlm_pages": [{"page_num": 2, "text": "vlm"}]
    });
    let db = Arc::new(RwLock::new(Store::default()));
    db.write().await.cases.push(seeded_case(id, Some(details)));
    let app = app_with_store(db);

    let resp = app
        .clone()
        .oneshot(empty_request("GET", &format!("/api/cases/{id}/pages")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let pages: Value = body_json(resp).await;
    assert_eq!(pages["ocr_pages"].as_array().unwrap().len(), 2);
    assert_eq!(pages["ocr_stats"], json!({}));

    let resp = app
        .clone()
        .oneshot(empty_request("GET", &format!("/api/cases/{id}/pages/1")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let page: Value = body_json(resp).await;
    assert_eq!(page["ocr_result"]["text"], "第一页");
    assert!(page["vlm_result"].is_null());

    let resp = app
        .oneshot(empty_request("GET", &format!("/api/cases/{id}/pages/9")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["detail"], "第9页未找到");
}

#[tokio::test]
async fn excel_export_sets_disposition() {
    let db = Arc::new(RwLock::new(Store::default()));
    db.write().await.cases.push(seeded_case(Uuid::new_v4(), None));

    let resp = app_with_store(db)
        .oneshot(empty_request("POST", "/api/export-all-cases-excel"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp
        .headers()
        .get(http::header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(disposition, format!("attachment; filename=\"{EXPORT_FILENAME}\""));
    let body = body_bytes(resp).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("seed.pdf"));
}

#[tokio::test]
async fn clear_all_cases_empties_store() {
    let db = Arc::new(RwLock::new(Store::default()));
    db.write().await.cases.push(seeded_case(Uuid::new_v4(), None));
    db.write().await.cases.push(seeded_case(Uuid::new_v4(), None));

    let resp = app_with_store(db.clone())
        .oneshot(empty_request("DELETE", "/api/clear-all-cases"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["deleted_count"], 2);
    assert!(db.read().await.cases.is_empty());
}

#[tokio::test]
async fn default_config_is_not_cached() {
    let resp = app()
        .oneshot(empty_request("GET", "/api/default-config?_=1714550400000"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(http::header::CACHE_CONTROL).unwrap(),
        "no-store"
    );
    let body: Value = body_json(resp).await;
    assert!(!body["extraction_fields"].as_array().unwrap().is_empty());
    assert!(body["prompt_template"].is_string());
}

// --- templates ---

#[tokio::test]
async fn update_template_not_found() {
    let resp = app()
        .oneshot(json_request(
            "PUT",
            "/api/templates/00000000-0000-0000-0000-000000000000",
            r#"{"name":"Nope"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["detail"], "模板未找到");
}

#[tokio::test]
async fn create_template_missing_name_returns_422() {
    let resp = app()
        .oneshot(json_request("POST", "/api/templates", r#"{"extraction_fields":[]}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- full template lifecycle ---

#[tokio::test]
async fn template_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/api/templates",
            r#"{"name":"民事判决","extraction_fields":[{"key":"court","label":"法院"}]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let created: Template = body_json(resp).await;
    assert_eq!(created.name, "民事判决");
    assert_eq!(created.is_default, "false");
    let id = created.id;

    // update: only the flag
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/api/templates/{id}"),
            r#"{"is_default":"true"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Template = body_json(resp).await;
    assert_eq!(updated.name, "民事判决"); // unchanged
    assert_eq!(updated.is_default, "true");
    assert!(updated.updated_at.is_some());

    // list
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/api/templates"))
        .await
        .unwrap();
    let templates: Vec<Template> = body_json(resp).await;
    assert_eq!(templates.len(), 1);

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", &format!("/api/templates/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["message"], "模板已删除");

    // get after delete: 404
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &format!("/api/templates/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
