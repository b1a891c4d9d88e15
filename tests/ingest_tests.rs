// tests/ingest_tests.rs

//! End-to-end runs against a mock archive and a directory-backed store.

use std::collections::BTreeMap;
use std::io::Cursor;

use image::GenericImageView;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gleaner::config::Config;
use gleaner::error::AppError;
use gleaner::models::{Checkpoint, Fingerprint};
use gleaner::pipeline::{Termination, run_ingest};
use gleaner::storage::{LocalStore, RemoteStore};

fn png_bytes(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
    let mut bytes = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

fn page_html(urls: &[String]) -> String {
    let anchors: String = urls
        .iter()
        .map(|url| format!("<a data-fancybox=\"gallery\" href=\"{url}\">x</a>"))
        .collect();
    format!("<html><body><article>{anchors}</article></body></html>")
}

async fn mount_page(server: &MockServer, id: u64, html: String) {
    Mock::given(method("GET"))
        .and(path(format!("/archives/{id}.html")))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

async fn mount_image(server: &MockServer, image_path: &str, bytes: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(image_path.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes))
        .mount(server)
        .await;
}

/// Config pointing the crawl at the mock server, with transient directories
/// inside the given workspace. Pages the server does not know answer 404,
/// which the pipeline reads as a missing page.
fn test_config(server: &MockServer, work: &TempDir, start_id: u64) -> Config {
    let mut config = Config::default();
    config.crawler.page_template = format!("{}/archives/{{id}}.html", server.uri());
    config.crawler.start_id = start_id;
    config.crawler.request_delay_ms = 0;
    config.staging.temp_dir = work.path().join("temp_download");
    config.staging.staging_dir = work.path().join("local_images");
    config
}

#[tokio::test]
async fn run_mirrors_new_images_and_checkpoints() {
    let server = MockServer::start().await;
    let work = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let store = LocalStore::new(remote.path());

    let dark_tall = png_bytes(40, 60, [0, 0, 0]);
    let light_wide = png_bytes(60, 40, [255, 255, 255]);

    mount_page(
        &server,
        1,
        page_html(&[
            format!("{}/img/a.png", server.uri()),
            format!("{}/img/b.png", server.uri()),
        ]),
    )
    .await;
    mount_image(&server, "/img/a.png", dark_tall.clone()).await;
    mount_image(&server, "/img/b.png", light_wide.clone()).await;
    // Page 2 exists but has no image links; pages 3..7 answer 404.
    mount_page(&server, 2, "<html><body><video src=\"clip.mp4\"></video></body></html>".into())
        .await;

    let config = test_config(&server, &work, 1);
    let report = run_ingest(&config, &store).await.unwrap();

    assert_eq!(report.termination, Termination::Exhausted);
    assert_eq!(report.crawl.pages_ok, 1);
    assert_eq!(report.crawl.pages_empty, 1);
    assert_eq!(report.crawl.pages_missing, 5);
    assert_eq!(report.crawl.assets_seen, 2);
    assert_eq!(report.crawl.accepted, 2);
    assert_eq!(report.sync.uploaded, 2);
    assert_eq!(report.sync.failed, 0);
    assert!(report.sync.persisted);
    assert_eq!(report.checkpoint.last_id, 2);

    // Checkpoint, counters and registry all landed in the store.
    let checkpoint: Checkpoint =
        serde_json::from_slice(&store.read("progress.json").await.unwrap().unwrap().0).unwrap();
    assert_eq!(checkpoint.last_id, 2);

    let counts: BTreeMap<String, u64> =
        serde_json::from_slice(&store.read("ri/count.json").await.unwrap().unwrap().0).unwrap();
    assert_eq!(counts.get("vd"), Some(&1));
    assert_eq!(counts.get("hl"), Some(&1));
    assert_eq!(counts.get("hd"), Some(&0));
    assert_eq!(counts.get("vl"), Some(&0));

    // Registry values carry the root-relative form.
    let registry: BTreeMap<Fingerprint, String> =
        serde_json::from_slice(&store.read("ri/hash_registry.json").await.unwrap().unwrap().0)
            .unwrap();
    assert_eq!(
        registry.get(&Fingerprint::of_bytes(&dark_tall)).map(String::as_str),
        Some("vd/1.webp")
    );
    assert_eq!(
        registry.get(&Fingerprint::of_bytes(&light_wide)).map(String::as_str),
        Some("hl/1.webp")
    );

    // The stored object is a WebP re-encode of the original.
    let (webp_bytes, _) = store.read("ri/vd/1.webp").await.unwrap().unwrap();
    let decoded = image::load_from_memory(&webp_bytes).unwrap();
    assert_eq!(decoded.dimensions(), (40, 60));

    // Transient directories are gone after the run.
    assert!(!config.staging.temp_dir.exists());
    assert!(!config.staging.staging_dir.exists());
}

#[tokio::test]
async fn same_bytes_are_accepted_once_within_a_run() {
    let server = MockServer::start().await;
    let work = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let store = LocalStore::new(remote.path());

    let repeated = png_bytes(40, 60, [0, 0, 0]);
    mount_page(
        &server,
        5,
        page_html(&[
            format!("{}/img/first.png", server.uri()),
            format!("{}/img/second.png", server.uri()),
        ]),
    )
    .await;
    mount_image(&server, "/img/first.png", repeated.clone()).await;
    mount_image(&server, "/img/second.png", repeated.clone()).await;

    let config = test_config(&server, &work, 5);
    let report = run_ingest(&config, &store).await.unwrap();

    assert_eq!(report.crawl.accepted, 1);
    assert_eq!(report.crawl.duplicates, 1);
    assert_eq!(report.sync.uploaded, 1);

    assert!(store.read("ri/vd/1.webp").await.unwrap().is_some());
    assert!(store.read("ri/vd/2.webp").await.unwrap().is_none());
}

#[tokio::test]
async fn registry_seeded_from_the_store_blocks_reaccepts() {
    let server = MockServer::start().await;
    let work = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let store = LocalStore::new(remote.path());

    let known = png_bytes(40, 60, [0, 0, 0]);

    // A previous run already committed this content.
    let mut registry = BTreeMap::new();
    registry.insert(Fingerprint::of_bytes(&known), "vd/1.webp".to_string());
    store
        .write(
            "ri/hash_registry.json",
            &serde_json::to_vec_pretty(&registry).unwrap(),
            "Seed registry",
            None,
        )
        .await
        .unwrap();
    let counts = BTreeMap::from([
        ("hd".to_string(), 0u64),
        ("hl".to_string(), 0),
        ("vd".to_string(), 1),
        ("vl".to_string(), 0),
    ]);
    store
        .write(
            "ri/count.json",
            &serde_json::to_vec_pretty(&counts).unwrap(),
            "Seed counters",
            None,
        )
        .await
        .unwrap();

    mount_page(&server, 30, page_html(&[format!("{}/img/known.png", server.uri())])).await;
    mount_image(&server, "/img/known.png", known).await;

    let config = test_config(&server, &work, 30);
    let report = run_ingest(&config, &store).await.unwrap();

    assert_eq!(report.crawl.accepted, 0);
    assert_eq!(report.crawl.duplicates, 1);
    assert_eq!(report.sync.uploaded, 0);

    // Nothing new to sync, so only the checkpoint moved.
    let checkpoint: Checkpoint =
        serde_json::from_slice(&store.read("progress.json").await.unwrap().unwrap().0).unwrap();
    assert_eq!(checkpoint.last_id, 30);

    let counts_after: BTreeMap<String, u64> =
        serde_json::from_slice(&store.read("ri/count.json").await.unwrap().unwrap().0).unwrap();
    assert_eq!(counts_after.get("vd"), Some(&1));
    assert!(store.read("ri/vd/2.webp").await.unwrap().is_none());
}

#[tokio::test]
async fn corrupt_registry_snapshot_aborts_the_run() {
    let server = MockServer::start().await;
    let work = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let store = LocalStore::new(remote.path());

    store
        .write("ri/hash_registry.json", b"{ not json", "Seed registry", None)
        .await
        .unwrap();

    let config = test_config(&server, &work, 1);
    let err = run_ingest(&config, &store).await.unwrap_err();

    assert!(matches!(err, AppError::Json(_)));
    // The run stopped before crawling or moving the checkpoint.
    assert!(store.read("progress.json").await.unwrap().is_none());
}

#[tokio::test]
async fn termination_counts_only_consecutive_misses() {
    let server = MockServer::start().await;
    let work = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let store = LocalStore::new(remote.path());

    // 10 ok, 11-12 missing, 13 empty (resets the miss run), 14-18 missing.
    let image_bytes = png_bytes(40, 60, [0, 0, 0]);
    mount_page(&server, 10, page_html(&[format!("{}/img/only.png", server.uri())])).await;
    mount_image(&server, "/img/only.png", image_bytes).await;
    mount_page(&server, 13, "<html><body>no images here</body></html>".into()).await;

    let config = test_config(&server, &work, 10);
    let report = run_ingest(&config, &store).await.unwrap();

    assert_eq!(report.termination, Termination::Exhausted);
    assert_eq!(report.crawl.pages_ok, 1);
    assert_eq!(report.crawl.pages_empty, 1);
    assert_eq!(report.crawl.pages_missing, 7);

    // The checkpoint holds the last resolved page, not the probed misses.
    assert_eq!(report.checkpoint.last_id, 13);
    let checkpoint: Checkpoint =
        serde_json::from_slice(&store.read("progress.json").await.unwrap().unwrap().0).unwrap();
    assert_eq!(checkpoint.last_id, 13);
}

#[tokio::test]
async fn hard_error_halts_without_advancing_the_checkpoint() {
    let server = MockServer::start().await;
    let work = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let store = LocalStore::new(remote.path());

    let image_bytes = png_bytes(60, 40, [255, 255, 255]);
    mount_page(&server, 20, page_html(&[format!("{}/img/ok.png", server.uri())])).await;
    mount_image(&server, "/img/ok.png", image_bytes).await;
    Mock::given(method("GET"))
        .and(path("/archives/21.html"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = test_config(&server, &work, 20);
    let report = run_ingest(&config, &store).await.unwrap();

    assert_eq!(report.termination, Termination::Faulted);
    assert_eq!(report.checkpoint.last_id, 20);

    // Work done before the fault is still synced.
    assert_eq!(report.sync.uploaded, 1);
    assert!(store.read("ri/hl/1.webp").await.unwrap().is_some());
    let checkpoint: Checkpoint =
        serde_json::from_slice(&store.read("progress.json").await.unwrap().unwrap().0).unwrap();
    assert_eq!(checkpoint.last_id, 20);
}

#[tokio::test]
async fn undersized_and_unreadable_assets_are_rejected_not_fatal() {
    let server = MockServer::start().await;
    let work = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let store = LocalStore::new(remote.path());

    mount_page(
        &server,
        40,
        page_html(&[
            format!("{}/img/tiny.png", server.uri()),
            format!("{}/img/garbage.bin", server.uri()),
            format!("{}/img/good.png", server.uri()),
        ]),
    )
    .await;
    mount_image(&server, "/img/tiny.png", png_bytes(5, 5, [0, 0, 0])).await;
    mount_image(&server, "/img/garbage.bin", b"not an image at all".to_vec()).await;
    mount_image(&server, "/img/good.png", png_bytes(40, 60, [0, 0, 0])).await;

    let config = test_config(&server, &work, 40);
    let report = run_ingest(&config, &store).await.unwrap();

    assert_eq!(report.crawl.rejected_too_small, 1);
    assert_eq!(report.crawl.rejected_undecodable, 1);
    assert_eq!(report.crawl.accepted, 1);
    assert_eq!(report.sync.uploaded, 1);
    assert!(store.read("ri/vd/1.webp").await.unwrap().is_some());
}

#[tokio::test]
async fn failed_download_skips_the_asset_and_continues() {
    let server = MockServer::start().await;
    let work = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let store = LocalStore::new(remote.path());

    mount_page(
        &server,
        50,
        page_html(&[
            format!("{}/img/gone.png", server.uri()),
            format!("{}/img/present.png", server.uri()),
        ]),
    )
    .await;
    // gone.png is never mounted, so its download 404s.
    mount_image(&server, "/img/present.png", png_bytes(40, 60, [0, 0, 0])).await;

    let config = test_config(&server, &work, 50);
    let report = run_ingest(&config, &store).await.unwrap();

    assert_eq!(report.termination, Termination::Exhausted);
    assert_eq!(report.crawl.download_failures, 1);
    assert_eq!(report.crawl.accepted, 1);
    assert_eq!(report.checkpoint.last_id, 50);
}
