//! Upload loop and Papra client tests against a mock Papra server.

mod common;

use common::{chat_reply, config_for, invoice_pdf, write_pdf};
use papra_ingest::{upload_pdfs, IngestError, PapraClient, UploadOptions, UploadProgressCallback};
use serde_json::json;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TAGS: &str = "/api/organizations/org_1/tags";
const DOCUMENTS: &str = "/api/organizations/org_1/documents";

/// Minimal bytes with a PDF header; Papra is mocked, so nothing parses them.
const FAKE_PDF: &[u8] = b"%PDF-1.4\n% placeholder\n%%EOF\n";

// ── Test helpers ────────────────────────────────────────────────────────

fn fast_options(tags: &[&str]) -> UploadOptions {
    UploadOptions {
        tags: tags.iter().map(|t| t.to_string()).collect(),
        retry_backoff_ms: 1,
        ..Default::default()
    }
}

fn document_reply(id: &str, name: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "document": { "id": id, "name": name }
    }))
}

async fn mount_tag_list(server: &MockServer, tags: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(TAGS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tags": tags })))
        .mount(server)
        .await;
}

#[derive(Default)]
struct RecordingCallback {
    events: Mutex<Vec<String>>,
}

impl UploadProgressCallback for RecordingCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.events.lock().unwrap().push(format!("batch {total_files}"));
    }

    fn on_file_start(&self, index: usize, _total: usize, path: &Path) {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        self.events.lock().unwrap().push(format!("start {index} {name}"));
    }

    fn on_file_complete(&self, index: usize, _total: usize, document_id: Option<&str>) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {index} {}", document_id.unwrap_or("-")));
    }

    fn on_file_error(&self, index: usize, _total: usize, _error: &str) {
        self.events.lock().unwrap().push(format!("error {index}"));
    }

    fn on_batch_complete(&self, total_files: usize, succeeded: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("finished {succeeded}/{total_files}"));
    }
}

// ── Papra client ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ensure_tags_creates_only_missing_tags() {
    let server = MockServer::start().await;
    mount_tag_list(
        &server,
        json!([ { "id": "tag_fin", "name": "Finance", "color": "#ff0000" } ]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path(TAGS))
        .and(body_string_contains("\"name\":\"Travel\""))
        .and(body_string_contains("#000000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag": { "id": "tag_trv", "name": "Travel", "color": "#000000" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server.uri(), None);
    let papra = PapraClient::new(&config).unwrap();
    let names: Vec<String> = ["finance", "Travel", "TRAVEL"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let tags = papra.ensure_tags_exist(&names).await.expect("tags");
    let ids: Vec<&str> = tags.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["tag_fin", "tag_trv"]);
}

#[tokio::test]
async fn test_attach_tags_posts_camel_case_tag_id() {
    let server = MockServer::start().await;
    mount_tag_list(&server, json!([ { "id": "tag_1", "name": "Inbox" } ])).await;
    Mock::given(method("POST"))
        .and(path(format!("{DOCUMENTS}/doc_9/tags")))
        .and(body_string_contains("\"tagId\":\"tag_1\""))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server.uri(), None);
    let papra = PapraClient::new(&config).unwrap();
    let attached = papra
        .attach_tags_to_document("doc_9", &["inbox".to_string()])
        .await
        .expect("attach");
    assert_eq!(attached.len(), 1);
    assert_eq!(attached[0].name, "Inbox");
}

#[tokio::test]
async fn test_list_tags_error_keeps_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TAGS))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden org"))
        .mount(&server)
        .await;

    let papra = PapraClient::new(&config_for(&server.uri(), None)).unwrap();
    match papra.list_tags().await {
        Err(IngestError::PapraApi { status, body }) => {
            assert_eq!(status, 403);
            assert_eq!(body, "forbidden org");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

// ── Upload loop ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_batch_continues_after_failed_file() {
    let server = MockServer::start().await;
    mount_tag_list(&server, json!([])).await;
    Mock::given(method("POST"))
        .and(path(TAGS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag": { "id": "tag_inbox", "name": "Inbox" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(DOCUMENTS))
        .and(body_string_contains("filename=\"b.pdf\""))
        .respond_with(ResponseTemplate::new(500).set_body_string("storage offline"))
        .with_priority(1)
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(DOCUMENTS))
        .respond_with(document_reply("doc_a", "a.pdf"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{DOCUMENTS}/doc_a/tags")))
        .and(body_string_contains("tag_inbox"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    write_pdf(dir.path(), "a.pdf", FAKE_PDF);
    write_pdf(dir.path(), "sub/b.pdf", FAKE_PDF);
    write_pdf(dir.path(), "notes.txt", b"ignored");

    let recorder = Arc::new(RecordingCallback::default());
    let mut options = fast_options(&["Inbox"]);
    options.progress = Some(recorder.clone() as Arc<dyn UploadProgressCallback>);

    let config = config_for(&server.uri(), None);
    let summary = upload_pdfs(dir.path(), &config, &options).await.expect("batch");

    assert_eq!((summary.total, summary.succeeded, summary.failed), (2, 1, 1));
    assert!(summary.has_failures());

    let first = &summary.files[0];
    assert!(first.path.ends_with("a.pdf"));
    assert_eq!(first.document_id.as_deref(), Some("doc_a"));
    assert_eq!(first.tags, vec!["Inbox"]);
    assert_eq!(first.retries, 0);
    assert!(first.warnings.is_empty());

    let second = &summary.files[1];
    assert!(second.path.ends_with("sub/b.pdf"));
    assert_eq!(second.retries, 2);
    assert!(second.error.as_deref().unwrap().contains("500"));

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "batch 2",
            "start 1 a.pdf",
            "done 1 doc_a",
            "start 2 b.pdf",
            "error 2",
            "finished 1/2",
        ]
    );
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DOCUMENTS))
        .respond_with(ResponseTemplate::new(413).set_body_string("too large"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "big.pdf", FAKE_PDF);

    let summary = upload_pdfs(&pdf, &config_for(&server.uri(), None), &fast_options(&[]))
        .await
        .expect("batch");
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.files[0].retries, 0);
}

#[tokio::test]
async fn test_tag_attachment_failure_is_a_warning() {
    let server = MockServer::start().await;
    mount_tag_list(&server, json!([ { "id": "tag_1", "name": "Receipts" } ])).await;
    Mock::given(method("POST"))
        .and(path(DOCUMENTS))
        .respond_with(document_reply("doc_1", "r.pdf"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{DOCUMENTS}/doc_1/tags")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "r.pdf", FAKE_PDF);

    let summary = upload_pdfs(&pdf, &config_for(&server.uri(), None), &fast_options(&["receipts"]))
        .await
        .expect("batch");
    let outcome = &summary.files[0];
    assert!(outcome.is_success());
    assert_eq!(outcome.document_id.as_deref(), Some("doc_1"));
    assert!(outcome.tags.is_empty());
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("Tag attachment"));
}

#[tokio::test]
async fn test_reply_without_document_is_success_with_warning() {
    let server = MockServer::start().await;
    mount_tag_list(&server, json!([ { "id": "tag_1", "name": "Inbox" } ])).await;
    Mock::given(method("POST"))
        .and(path(DOCUMENTS))
        .respond_with(ResponseTemplate::new(200).set_body_string("accepted"))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "x.pdf", FAKE_PDF);

    let summary = upload_pdfs(&pdf, &config_for(&server.uri(), None), &fast_options(&["Inbox"]))
        .await
        .expect("batch");
    let outcome = &summary.files[0];
    assert!(outcome.is_success());
    assert!(outcome.document_id.is_none());
    assert_eq!(outcome.warnings.len(), 1);
}

#[tokio::test]
async fn test_invalid_ocr_language_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "x.pdf", FAKE_PDF);
    let mut options = fast_options(&[]);
    options.ocr_languages = vec!["eng".into(), "klingon".into()];

    let err = upload_pdfs(&pdf, &config_for(&server.uri(), None), &options)
        .await
        .unwrap_err();
    match err {
        IngestError::InvalidOcrLanguages { invalid } => assert_eq!(invalid, vec!["klingon"]),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn test_ocr_languages_sent_as_json_array() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DOCUMENTS))
        .and(body_string_contains("name=\"ocrLanguages\""))
        .and(body_string_contains("[\"eng\",\"deu\"]"))
        .respond_with(document_reply("doc_ocr", "x.pdf"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "x.pdf", FAKE_PDF);
    let mut options = fast_options(&[]);
    options.ocr_languages = vec!["eng".into(), "deu".into()];

    let summary = upload_pdfs(&pdf, &config_for(&server.uri(), None), &options)
        .await
        .expect("batch");
    assert_eq!(summary.files[0].document_id.as_deref(), Some("doc_ocr"));
}

#[tokio::test]
async fn test_autotag_failure_falls_back_to_manual_tags() {
    let server = MockServer::start().await;
    mount_tag_list(&server, json!([ { "id": "tag_1", "name": "Inbox" } ])).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(DOCUMENTS))
        .respond_with(document_reply("doc_2", "march.pdf"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{DOCUMENTS}/doc_2/tags")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "march.pdf", &invoice_pdf());
    let mut options = fast_options(&["Inbox"]);
    options.autotag = true;

    let summary = upload_pdfs(&pdf, &config_for(&server.uri(), Some("sk-or-test")), &options)
        .await
        .expect("batch");
    let outcome = &summary.files[0];
    assert!(outcome.is_success());
    assert!(!outcome.autotagged);
    assert_eq!(outcome.tags, vec!["Inbox"]);
    assert!(outcome.warnings[0].starts_with("Autotag failed"));
}

#[tokio::test]
async fn test_autotag_tags_are_added_to_manual_tags() {
    let server = MockServer::start().await;
    mount_tag_list(
        &server,
        json!([
            { "id": "tag_inbox", "name": "Inbox" },
            { "id": "tag_inv", "name": "invoice" }
        ]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path(TAGS))
        .and(body_string_contains("consulting"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag": { "id": "tag_cons", "name": "consulting" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_reply("[\"Invoice\", \"Consulting\", \"inbox\"]")),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(DOCUMENTS))
        .respond_with(document_reply("doc_3", "march.pdf"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{DOCUMENTS}/doc_3/tags")))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "march.pdf", &invoice_pdf());
    let mut options = fast_options(&["Inbox"]);
    options.autotag = true;

    let summary = upload_pdfs(&pdf, &config_for(&server.uri(), Some("sk-or-test")), &options)
        .await
        .expect("batch");
    let outcome = &summary.files[0];
    assert!(outcome.autotagged);
    assert_eq!(outcome.tags, vec!["Inbox", "invoice", "consulting"]);
    assert!(outcome.warnings.is_empty());
}
