//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every `PdfApi`
//! operation over real HTTP through `UreqTransport`. Validates that request
//! building, transport and response parsing agree with the server's schema,
//! and that failures reach the notifier with the expected messages.

use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;

use pdfcase_core::{
    ApiError, CaseStatus, ClientConfig, CreateTemplate, ErrorCategory, ExtractionField, PdfApi,
    PdfClient, ProcessConfig, QueueNotifier, UpdateCase, UpdateTemplate, UploadFile, UploadProgress,
    UreqTransport, NO_RESPONSE_MESSAGE,
};
use serde_json::json;
use uuid::Uuid;

type TestApi = PdfApi<UreqTransport, Arc<QueueNotifier>>;

/// Start the mock server on a random port and return its `/api` base URL.
fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}/api")
}

fn api_for(base_url: &str) -> (TestApi, Arc<QueueNotifier>) {
    let config = ClientConfig::new(base_url).with_timeout(Duration::from_secs(5));
    let notifier = Arc::new(QueueNotifier::new());
    let api = PdfApi::new(
        PdfClient::with_config(config.clone()),
        UreqTransport::new(&config),
        notifier.clone(),
    );
    (api, notifier)
}

fn pdf(name: &str, len: usize) -> UploadFile {
    let mut bytes = b"%PDF-1.4\n".to_vec();
    bytes.resize(len, b'x');
    UploadFile::new(name, bytes)
}

#[test]
fn case_lifecycle() {
    let (api, notifier) = api_for(&start_server());

    // Step 1: list, should be empty.
    assert!(api.get_cases().unwrap().is_empty());

    // Step 2: upload with progress.
    let mut events: Vec<UploadProgress> = Vec::new();
    let created = api
        .upload_pdf(&pdf("judgment.pdf", 256 * 1024), |p| events.push(p))
        .unwrap();
    assert_eq!(created.original_filename, "judgment.pdf");
    assert_eq!(created.status, CaseStatus::Uploaded);
    assert!(!events.is_empty(), "expected progress events");
    assert!(events.windows(2).all(|w| w[0].loaded <= w[1].loaded));
    assert!(events.last().unwrap().is_complete());
    let id = created.id;

    // Step 3: get.
    let fetched = api.get_case(id).unwrap();
    assert_eq!(fetched, created);

    // Step 4: export before extraction is rejected with the server's detail.
    let err = api.export_case(id).unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(notifier.drain(), vec!["请求错误 400: 案例信息尚未提取完成"]);

    // Step 5: update extracted info, then export.
    let mut info = serde_json::Map::new();
    info.insert("case_number".to_string(), json!("(2024)京01民初1号"));
    let update = UpdateCase {
        extracted_info: Some(info),
        ..Default::default()
    };
    let updated = api.update_case(id, &update).unwrap();
    assert_eq!(updated.status, CaseStatus::Completed);
    assert_eq!(api.export_case(id).unwrap(), json!({"case_number": "(2024)京01民初1号"}));

    // Step 6: reprocess with and without configuration.
    let config = ProcessConfig {
        custom_prompt: Some("只提取案号".to_string()),
        extraction_fields: None,
    };
    assert_eq!(api.reprocess_case(id, Some(&config)).unwrap().message, "开始重新处理");
    assert!(api.reprocess_case(id, None).is_ok());
    let reprocessed = api.get_case(id).unwrap();
    assert_eq!(reprocessed.status, CaseStatus::Processing);
    assert_eq!(reprocessed.custom_prompt.as_deref(), Some("只提取案号"));

    // Step 7: per-page results are not available for unprocessed uploads.
    let err = api.get_case_pages(id).unwrap_err();
    assert_eq!(err.status(), Some(400));
    notifier.drain();

    // Step 8: spreadsheet export keeps the envelope.
    let response = api.export_all_cases_excel().unwrap();
    assert_eq!(
        response.attachment_filename().as_deref(),
        Some(mock_server::EXPORT_FILENAME)
    );
    assert!(response.body_text().contains("judgment.pdf"));

    // Step 9: delete, then get is a 404.
    api.delete_case(id).unwrap();
    let err = api.get_case(id).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(notifier.drain(), vec!["请求错误 404: 案例未找到"]);
}

#[test]
fn upload_with_config_and_clear() {
    let (api, notifier) = api_for(&start_server());

    let config = ProcessConfig {
        extraction_fields: Some(vec![ExtractionField::text("court", "法院")]),
        custom_prompt: None,
    };
    let case = api
        .upload_pdf_with_config(&pdf("a.pdf", 1024), Some(&config), |_| {})
        .unwrap();
    assert_eq!(case.extraction_fields.unwrap()[0].key, "court");
    api.upload_pdf_with_config(&pdf("b.pdf", 1024), None, |_| {}).unwrap();

    let cases = api.get_cases().unwrap();
    assert_eq!(cases.len(), 2);
    assert_eq!(cases[0].original_filename, "b.pdf", "newest first");

    assert!(!api.clear_all_cases().unwrap().message.is_empty());
    assert!(api.get_cases().unwrap().is_empty());
    assert!(notifier.drain().is_empty());
}

#[test]
fn rejected_upload_is_notified() {
    let (api, notifier) = api_for(&start_server());

    let err = api
        .upload_pdf(&UploadFile::new("notes.txt", b"hello".to_vec()), |_| {})
        .unwrap_err();
    assert_eq!(err.category(), Some(ErrorCategory::Status));
    assert_eq!(notifier.drain(), vec!["请求错误 400: 只支持PDF文件"]);
}

#[test]
fn template_lifecycle() {
    let (api, _) = api_for(&start_server());

    let input = CreateTemplate {
        name: "民事判决".to_string(),
        description: Some("一审".to_string()),
        extraction_fields: vec![ExtractionField::text("plaintiff", "原告")],
        custom_prompt: None,
        is_default: "false".to_string(),
    };
    let created = api.create_template(&input).unwrap();
    assert_eq!(created.name, "民事判决");
    assert!(!created.is_default());

    let update = UpdateTemplate {
        is_default: Some("true".to_string()),
        ..Default::default()
    };
    let updated = api.update_template(created.id, &update).unwrap();
    assert!(updated.is_default());
    assert_eq!(updated.description.as_deref(), Some("一审"));

    assert_eq!(api.get_template(created.id).unwrap(), updated);
    assert_eq!(api.get_templates().unwrap().len(), 1);

    api.delete_template(created.id).unwrap();
    assert!(api.get_template(created.id).unwrap_err().is_not_found());
}

#[test]
fn default_config_twice() {
    let (api, _) = api_for(&start_server());

    let first = api.get_default_config().unwrap();
    let second = api.get_default_config().unwrap();
    assert_eq!(first, second);
    assert!(!first.extraction_fields.is_empty());
}

#[test]
fn unreachable_backend_reports_no_response() {
    // Bind then drop to get a port nothing listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let (api, notifier) = api_for(&format!("http://127.0.0.1:{port}/api"));

    let err = api.get_cases().unwrap_err();
    assert!(matches!(err, ApiError::NoResponse(_)), "{err:?}");
    api.get_case(Uuid::nil()).unwrap_err();
    assert_eq!(notifier.drain(), vec![NO_RESPONSE_MESSAGE, NO_RESPONSE_MESSAGE]);
}

/// Serve one canned response of `body_len` bytes on a raw socket and return
/// the `/api` base URL.
fn serve_once(body_len: usize) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let head = format!(
            "HTTP/1.1 200 OK\r\n\
             Content-Type: application/vnd.openxmlformats-officedocument.spreadsheetml.sheet\r\n\
             Content-Disposition: attachment; filename=\"big.xlsx\"\r\n\
             Content-Length: {body_len}\r\n\
             Connection: close\r\n\r\n"
        );
        stream.write_all(head.as_bytes()).unwrap();
        stream.write_all(&vec![b'x'; body_len]).unwrap();
        stream.flush().unwrap();
    });

    format!("http://{addr}/api")
}

#[test]
fn large_spreadsheet_export_is_returned_whole() {
    let body_len = 11 * 1024 * 1024;
    let (api, notifier) = api_for(&serve_once(body_len));

    let response = api.export_all_cases_excel().unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body.len(), body_len);
    assert_eq!(response.attachment_filename().as_deref(), Some("big.xlsx"));
    assert!(notifier.drain().is_empty());
}

#[test]
fn concurrent_calls_share_one_api() {
    let (api, notifier) = api_for(&start_server());
    let api = Arc::new(api);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let api = api.clone();
            std::thread::spawn(move || api.get_default_config().map(|c| c.prompt_template))
        })
        .collect();
    for handle in handles {
        assert!(!handle.join().unwrap().unwrap().is_empty());
    }
    assert!(notifier.drain().is_empty());
}
