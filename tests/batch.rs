//! Offline integration tests: full processing runs against the
//! `StaticOcrClient` test double, with real files in temp directories.

use edgequake_ocr::{
    BatchProgressCallback, ErrorKind, OcrConfig, OcrProcessor, OutputFormat, StaticOcrClient,
};
use serde_json::json;
use std::path::Path;
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("edgequake_ocr=debug")
        .with_test_writer()
        .try_init();
}

fn touch(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), b"%PDF-1.4 fake").unwrap();
}

/// Records every callback as a readable line.
#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

impl EventLog {
    fn push(&self, s: String) {
        self.0.lock().unwrap().push(s);
    }
    fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl BatchProgressCallback for EventLog {
    fn on_batch_start(&self, total: usize) {
        self.push(format!("start {total}"));
    }
    fn on_file_start(&self, index: usize, total: usize, name: &str) {
        self.push(format!("file {index}/{total} {name}"));
    }
    fn on_file_complete(&self, index: usize, _total: usize, _name: &str, len: usize) {
        self.push(format!("ok {index} {len}"));
    }
    fn on_file_error(&self, index: usize, _total: usize, _name: &str, _error: &str) {
        self.push(format!("err {index}"));
    }
    fn on_batch_complete(&self, total: usize, success: usize) {
        self.push(format!("done {success}/{total}"));
    }
}

// ── Directory batches ────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_records_failure_and_continues() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "b_good.pdf");
    touch(dir.path(), "a_bad.pdf");
    touch(dir.path(), "ignored.docx");

    let client = StaticOcrClient::with_pages(&[("hello", "# hello")]).fail_on("a_bad.pdf", "quota");
    let log = Arc::new(EventLog::default());
    let config = OcrConfig::builder()
        .client(Arc::new(client))
        .output_format(OutputFormat::Text)
        .progress_callback(log.clone())
        .build()
        .unwrap();

    let entries = OcrProcessor::new(config)
        .unwrap()
        .process_directory(dir.path())
        .await
        .expect("batch must not fail because one file failed");

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].file, "a_bad.pdf");
    assert_eq!(entries[0].result.error_kind, Some(ErrorKind::Service));
    assert!(entries[0].result.error.as_deref().unwrap().contains("quota"));
    assert_eq!(entries[1].file, "b_good.pdf");
    assert_eq!(entries[1].result.content.as_deref(), Some("hello"));

    assert_eq!(
        log.events(),
        vec![
            "start 2",
            "file 1/2 a_bad.pdf",
            "err 1",
            "file 2/2 b_good.pdf",
            "ok 2 5",
            "done 1/2",
        ]
    );
}

#[tokio::test]
async fn batch_writes_output_files_for_successes_only() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let out_dir = out.path().join("results");
    touch(src.path(), "one.pdf");
    touch(src.path(), "two.png");

    let client = StaticOcrClient::with_pages(&[("p1", "m1"), ("p2", "m2")]).fail_on("two.png", "boom");
    let config = OcrConfig::builder()
        .client(Arc::new(client))
        .output_format(OutputFormat::Text)
        .output_dir(&out_dir)
        .build()
        .unwrap();

    let entries = OcrProcessor::new(config)
        .unwrap()
        .process_directory(src.path())
        .await
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(
        std::fs::read_to_string(out_dir.join("one.txt")).unwrap(),
        "p1\n\np2"
    );
    assert!(!out_dir.join("two.txt").exists());
    // Text mode never writes the markdown sibling.
    assert!(!src.path().join("one_OCR.md").exists());
}

#[tokio::test]
async fn batch_markdown_writes_siblings_and_output_dir() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    touch(src.path(), "scan.jpg");

    let client = StaticOcrClient::new(json!({
        "pages": [{
            "index": 0,
            "markdown": "![fig.png](fig.png) caption ![missing](missing)",
            "images": [
                { "id": "fig.png", "image_base64": "data:image/png;base64,QUJD" },
                { "id": "missing" }
            ]
        }]
    }));
    let config = OcrConfig::builder()
        .client(Arc::new(client))
        .output_dir(out.path())
        .build()
        .unwrap();

    let entries = OcrProcessor::new(config)
        .unwrap()
        .process_directory(src.path())
        .await
        .unwrap();

    let expected = "![fig.png](data:image/png;base64,QUJD) caption ![missing](missing)";
    let result = &entries[0].result;
    assert_eq!(result.content.as_deref(), Some(expected));
    assert_eq!(
        std::fs::read_to_string(src.path().join("scan_OCR.md")).unwrap(),
        expected
    );
    assert_eq!(
        std::fs::read_to_string(out.path().join("scan.md")).unwrap(),
        expected
    );
}

// ── Single documents ─────────────────────────────────────────────────────────

#[tokio::test]
async fn json_output_file_round_trips_response() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    touch(src.path(), "doc.pdf");

    let raw = json!({
        "pages": [{ "index": 0, "markdown": "中文 text", "images": [], "dimensions": { "dpi": 200 } }],
        "model": "mistral-ocr-2503",
        "usage_info": { "pages_processed": 1, "doc_size_bytes": 13 }
    });
    let config = OcrConfig::builder()
        .client(Arc::new(StaticOcrClient::new(raw.clone())))
        .output_format(OutputFormat::Json)
        .output_dir(out.path())
        .build()
        .unwrap();

    let result = OcrProcessor::new(config)
        .unwrap()
        .process_document(src.path().join("doc.pdf"))
        .await;

    let written = std::fs::read_to_string(out.path().join("doc.json")).unwrap();
    assert!(written.contains("中文"), "non-ASCII must not be escaped");
    let reparsed: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(reparsed, raw);
    assert_eq!(result.response, Some(raw));
    assert!(result.markdown_path.is_none());
}

#[tokio::test]
async fn pdf_summary_is_written_next_to_source() {
    let src = tempfile::tempdir().unwrap();
    touch(src.path(), "report.pdf");

    let client = StaticOcrClient::with_pages(&[("Title line\nsecond", "x"), ("Page two", "y")]);
    let config = OcrConfig::builder()
        .client(Arc::new(client))
        .output_format(OutputFormat::Text)
        .generate_pdf(true)
        .font_path("/nonexistent/font.ttf")
        .build()
        .unwrap();

    let result = OcrProcessor::new(config)
        .unwrap()
        .process_document(src.path().join("report.pdf"))
        .await;

    let pdf_path = src.path().join("report_OCR文本版本.pdf");
    assert_eq!(result.pdf_path.as_deref(), Some(pdf_path.as_path()));
    let doc = lopdf::Document::load(&pdf_path).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
}

#[tokio::test]
async fn rerun_does_not_pick_up_generated_summaries() {
    init_logging();
    let src = tempfile::tempdir().unwrap();
    touch(src.path(), "scan.pdf");

    let client = Arc::new(StaticOcrClient::with_pages(&[("body", "# body")]));
    let config = OcrConfig::builder()
        .client(client.clone())
        .output_format(OutputFormat::Markdown)
        .generate_pdf(true)
        .font_path("/nonexistent/font.ttf")
        .build()
        .unwrap();
    let processor = OcrProcessor::new(config).unwrap();

    for run in 1..=2 {
        let entries = processor.process_directory(src.path()).await.unwrap();
        let files: Vec<&str> = entries.iter().map(|e| e.file.as_str()).collect();
        assert_eq!(files, vec!["scan.pdf"], "run {run}");
        assert!(entries[0].result.is_success());
    }
    assert!(src.path().join("scan_OCR文本版本.pdf").exists());
    assert_eq!(client.calls(), 2);
}

#[test]
fn missing_file_writes_nothing() {
    let src = tempfile::tempdir().unwrap();
    let out = src.path().join("out");
    let client = Arc::new(StaticOcrClient::with_pages(&[("x", "x")]));

    let config = OcrConfig::builder()
        .client(client.clone())
        .output_dir(&out)
        .generate_pdf(true)
        .build()
        .unwrap();
    let processor = OcrProcessor::new(config).unwrap();
    let result = tokio_test::block_on(processor.process_document(src.path().join("gone.pdf")));

    assert_eq!(result.error_kind, Some(ErrorKind::Input));
    assert_eq!(client.calls(), 0);
    assert!(!out.exists());
    assert_eq!(std::fs::read_dir(src.path()).unwrap().count(), 0);
}

#[test]
fn result_serialises_for_cli_output() {
    let src = tempfile::tempdir().unwrap();
    touch(src.path(), "a.pdf");
    let config = OcrConfig::builder()
        .client(Arc::new(StaticOcrClient::with_pages(&[("t", "m")])))
        .output_format(OutputFormat::Text)
        .build()
        .unwrap();

    let result = edgequake_ocr::process_file_sync(src.path().join("a.pdf"), config).unwrap();
    let v = serde_json::to_value(&result).unwrap();
    assert_eq!(v["format"], "text");
    assert_eq!(v["content"], "t");
    assert!(v.get("error").is_none());
}
