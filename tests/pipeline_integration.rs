//! End-to-end pipeline tests against a loopback relay and a recording
//! raster engine.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use urlpress::{
    ConvertConfig, PaginatedDocument, Passkey, Pipeline, RasterEngine, RasterOptions,
};

/// Engine double: returns a real (minimal) PDF so the encryption path has
/// a well-formed document, and counts how often it ran.
struct FakeEngine {
    rendered: Arc<AtomicUsize>,
}

impl FakeEngine {
    fn new() -> (Self, Arc<AtomicUsize>) {
        let rendered = Arc::new(AtomicUsize::new(0));
        (
            Self {
                rendered: rendered.clone(),
            },
            rendered,
        )
    }
}

impl RasterEngine for FakeEngine {
    fn render(
        &self,
        _document_html: &str,
        _options: &RasterOptions,
    ) -> urlpress::error::Result<PaginatedDocument> {
        self.rendered.fetch_add(1, Ordering::SeqCst);
        Ok(PaginatedDocument {
            bytes: minimal_pdf(),
            pages: 1,
        })
    }
}

/// A minimal one-page PDF built with lopdf.
fn minimal_pdf() -> Vec<u8> {
    use lopdf::content::Content;
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content = Content { operations: vec![] };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![Object::Reference(page_id)],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Spawn a loopback relay that answers every request with `html` and
/// counts the requests it served.
fn spawn_relay(html: &'static str) -> (String, Arc<AtomicUsize>) {
    let server = tiny_http::Server::http("0.0.0.0:0").unwrap();
    let addr = server.server_addr();
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = hits.clone();

    std::thread::spawn(move || loop {
        match server.recv() {
            Ok(request) => {
                hits_clone.fetch_add(1, Ordering::SeqCst);
                let _ = request.respond(tiny_http::Response::from_string(html));
            }
            Err(_) => break,
        }
    });

    (format!("http://{}", addr), hits)
}

fn test_config(relay: String, tag: &str) -> (ConvertConfig, PathBuf) {
    let out_dir = std::env::temp_dir().join(format!("urlpress-it-{}-{}", tag, std::process::id()));
    let config = ConvertConfig {
        relay_base: relay,
        timeout_ms: 5000,
        out_dir: out_dir.clone(),
        ..Default::default()
    };
    (config, out_dir)
}

const PAGE: &str = "<html><head><style>main{margin:0}</style></head>\
                    <body><main><h1>Story</h1><p>Text</p></main></body></html>";

#[test]
fn test_plain_conversion_delivers_hostname_pdf() {
    let (relay, _hits) = spawn_relay(PAGE);
    let (config, out_dir) = test_config(relay, "plain");
    let (engine, rendered) = FakeEngine::new();
    let mut pipeline = Pipeline::with_engine(config, engine).unwrap();

    let report = pipeline
        .convert("https://example.com/story", &Passkey::default())
        .unwrap();

    assert!(!report.encrypted);
    assert_eq!(report.matched_region, "main");
    assert_eq!(report.pages, 1);
    assert_eq!(report.output, out_dir.join("example.com.pdf"));
    assert_eq!(rendered.load(Ordering::SeqCst), 1);

    let bytes = std::fs::read(&report.output).unwrap();
    assert_eq!(bytes, minimal_pdf());
    let _ = std::fs::remove_dir_all(&out_dir);
}

#[test]
fn test_passkey_selects_encrypted_delivery() {
    let (relay, _hits) = spawn_relay(PAGE);
    let (config, out_dir) = test_config(relay, "locked");
    let (engine, _rendered) = FakeEngine::new();
    let mut pipeline = Pipeline::with_engine(config, engine).unwrap();

    let report = pipeline
        .convert("https://example.com/story", &Passkey::new("hunter2"))
        .unwrap();

    assert!(report.encrypted);
    assert_eq!(report.output, out_dir.join("example.com-encrypted.pdf"));

    // Encrypted output must diverge from the plain path's bytes for the
    // same input content.
    let bytes = std::fs::read(&report.output).unwrap();
    assert_ne!(bytes, minimal_pdf());
    assert!(String::from_utf8_lossy(&bytes).contains("/Encrypt"));
    let _ = std::fs::remove_dir_all(&out_dir);
}

#[test]
fn test_invalid_url_fails_before_any_relay_call() {
    let (relay, hits) = spawn_relay(PAGE);
    let (config, out_dir) = test_config(relay, "invalid");
    let (engine, rendered) = FakeEngine::new();
    let mut pipeline = Pipeline::with_engine(config, engine).unwrap();

    let err = pipeline
        .convert("not a url", &Passkey::default())
        .unwrap_err();
    assert_eq!(err.stage(), "validation");

    // Give a stray request time to land if one was ever issued.
    std::thread::sleep(std::time::Duration::from_millis(50));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(rendered.load(Ordering::SeqCst), 0);
    let _ = std::fs::remove_dir_all(&out_dir);
}

#[test]
fn test_convert_reuses_extraction_cached_by_preview() {
    let (relay, hits) = spawn_relay(PAGE);
    let (config, out_dir) = test_config(relay, "cache");
    let (engine, _rendered) = FakeEngine::new();
    let mut pipeline = Pipeline::with_engine(config, engine).unwrap();

    let fragment = pipeline.preview("https://example.com/story").unwrap();
    assert!(fragment.as_str().contains("<h1>Story</h1>"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // Converting the same URL must not fetch again.
    let report = pipeline
        .convert("https://example.com/story", &Passkey::default())
        .unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(report.matched_region, "main");
    let _ = std::fs::remove_dir_all(&out_dir);
}

#[test]
fn test_convert_refetches_for_a_different_url() {
    let (relay, hits) = spawn_relay(PAGE);
    let (config, out_dir) = test_config(relay, "refetch");
    let (engine, _rendered) = FakeEngine::new();
    let mut pipeline = Pipeline::with_engine(config, engine).unwrap();

    pipeline.preview("https://example.com/one").unwrap();
    pipeline
        .convert("https://example.com/two", &Passkey::default())
        .unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    let _ = std::fs::remove_dir_all(&out_dir);
}

#[test]
fn test_fetch_failure_invalidates_cached_extraction() {
    // First relay serves the page, then we point the pipeline at a dead
    // port so the next fetch fails.
    let server = tiny_http::Server::http("0.0.0.0:0").unwrap();
    let addr = server.server_addr();
    std::thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let _ = request.respond(tiny_http::Response::from_string(PAGE));
        }
        // Server drops here; later requests are refused.
    });

    let (config, out_dir) = test_config(format!("http://{}", addr), "invalidate");
    let (engine, _rendered) = FakeEngine::new();
    let mut pipeline = Pipeline::with_engine(config, engine).unwrap();

    pipeline.preview("https://example.com/story").unwrap();
    assert!(pipeline.cached_extraction().is_some());

    let err = pipeline.preview("https://example.com/other").unwrap_err();
    assert_eq!(err.stage(), "fetch");
    // The stale preview did not survive the failed fetch.
    assert!(pipeline.cached_extraction().is_none());
    let _ = std::fs::remove_dir_all(&out_dir);
}
