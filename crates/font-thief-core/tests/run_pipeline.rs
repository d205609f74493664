//! End-to-end runs against a local HTTP server with a scripted page loader.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::font_server::{self, Response};
use common::scripted::ScriptedLoader;
use common::{fast_options, file_names, fonts};
use font_thief_core::decode::FnDecoder;
use font_thief_core::{
    run, AssetError, AssetOutcome, DecoderRegistry, RunContext, RunControl, RunError, SkipReason,
};
use tempfile::tempdir;

const WOFF2: &str = "font/woff2";
const TTF: &str = "font/ttf";

fn builtin() -> Arc<DecoderRegistry> {
    Arc::new(DecoderRegistry::with_builtin())
}

#[tokio::test]
async fn converts_woff2_and_skips_ttf_without_decoder() {
    let server = font_server::start(vec![
        ("a.woff2", Response::ok(WOFF2, fonts::sample_woff2())),
        ("b.ttf", Response::ok(TTF, b"plain truetype bytes".to_vec())),
    ]);
    let loader = ScriptedLoader::new()
        .other("document", server.base())
        .font(server.url("a.woff2"))
        .font(server.url("b.ttf"));
    let root = tempdir().unwrap();
    let ctx = RunContext::new(server.base(), Some("otf"), root.path()).unwrap();

    let report = run(&ctx, &loader, builtin(), &fast_options(), &RunControl::new())
        .await
        .unwrap();

    assert_eq!(report.discovered, 2);
    assert_eq!(report.assets.len(), 2);
    assert!(matches!(report.assets[0].outcome, AssetOutcome::Converted));
    assert!(matches!(
        report.assets[1].outcome,
        AssetOutcome::Skipped(SkipReason::NoDecoder)
    ));
    assert!(!report.any_failed());

    let dir = ctx.destination_dir();
    assert_eq!(report.destination.as_deref(), Some(dir));
    assert_eq!(file_names(dir), vec!["a.otf", "b.ttf"]);
    let otf = std::fs::read(dir.join("a.otf")).unwrap();
    assert_eq!(&otf[0..4], b"OTTO");
    assert_eq!(fonts::sfnt_tags(&otf), vec!["CFF ", "head", "name"]);
    assert_eq!(std::fs::read(dir.join("b.ttf")).unwrap(), b"plain truetype bytes");
    assert!(report.assets.iter().all(|a| a.sha256.is_some()));
    assert_eq!(loader.closes(), 1);
}

#[tokio::test]
async fn woff_converts_to_ttf() {
    let server = font_server::start(vec![("f/body.woff", Response::ok("font/woff", fonts::sample_woff()))]);
    let loader = ScriptedLoader::new().font(server.url("f/body.woff"));
    let root = tempdir().unwrap();
    let ctx = RunContext::new(server.base(), Some("TTF"), root.path()).unwrap();

    let report = run(&ctx, &loader, builtin(), &fast_options(), &RunControl::new())
        .await
        .unwrap();

    assert!(matches!(report.assets[0].outcome, AssetOutcome::Converted));
    let ttf = std::fs::read(ctx.path_for("body.ttf")).unwrap();
    assert_eq!(&ttf[0..4], &[0, 1, 0, 0]);
    assert_eq!(fonts::sfnt_tags(&ttf), vec!["head", "name"]);
    assert!(!ctx.path_for("body.woff").exists());
}

#[tokio::test]
async fn invalid_target_fails_before_any_side_effect() {
    let root = tempdir().unwrap();
    let err = RunContext::new("not-a-url", Some("otf"), root.path()).unwrap_err();
    assert!(matches!(err, RunError::Validation { .. }));
    assert!(file_names(root.path()).is_empty());
}

#[tokio::test]
async fn page_without_fonts_creates_no_directory() {
    let server = font_server::start(vec![]);
    let loader = ScriptedLoader::new()
        .other("document", server.base())
        .other("stylesheet", server.url("site.css"))
        .other("image", server.url("logo.png"));
    let root = tempdir().unwrap();
    let ctx = RunContext::new(server.base(), Some("otf"), root.path()).unwrap();

    let report = run(&ctx, &loader, builtin(), &fast_options(), &RunControl::new())
        .await
        .unwrap();

    assert!(report.no_fonts_found());
    assert!(report.destination.is_none());
    assert!(report.assets.is_empty());
    assert!(!ctx.destination_dir().exists());
    assert!(file_names(root.path()).is_empty());
    assert_eq!(loader.closes(), 1);
}

#[tokio::test]
async fn repeated_font_responses_download_once() {
    let server = font_server::start(vec![("a.woff2", Response::ok(WOFF2, fonts::sample_woff2()))]);
    let loader = ScriptedLoader::new()
        .font(server.url("a.woff2"))
        .font(server.url("a.woff2"))
        .late_font(Duration::from_millis(20), server.url("a.woff2#again"));
    let root = tempdir().unwrap();
    let ctx = RunContext::new(server.base(), None, root.path()).unwrap();

    let report = run(&ctx, &loader, builtin(), &fast_options(), &RunControl::new())
        .await
        .unwrap();

    assert_eq!(report.discovered, 1);
    assert!(matches!(report.assets[0].outcome, AssetOutcome::Downloaded));
    assert_eq!(file_names(ctx.destination_dir()), vec!["a.woff2"]);
    assert_eq!(server.hits("a.woff2"), 1);
}

#[tokio::test]
async fn unsupported_format_leaves_downloads_untouched() {
    let body = fonts::sample_woff2();
    let server = font_server::start(vec![("a.woff2", Response::ok(WOFF2, body.clone()))]);
    let loader = ScriptedLoader::new().font(server.url("a.woff2"));
    let root = tempdir().unwrap();
    let ctx = RunContext::new(server.base(), Some("svg"), root.path()).unwrap();

    let report = run(&ctx, &loader, builtin(), &fast_options(), &RunControl::new())
        .await
        .unwrap();

    assert!(matches!(
        report.assets[0].outcome,
        AssetOutcome::Skipped(SkipReason::UnsupportedFormat)
    ));
    assert!(!report.any_failed());
    assert_eq!(file_names(ctx.destination_dir()), vec!["a.woff2"]);
    assert_eq!(std::fs::read(ctx.path_for("a.woff2")).unwrap(), body);
}

#[tokio::test]
async fn late_fonts_within_quiescence_window_are_collected() {
    let server = font_server::start(vec![
        ("early.woff2", Response::ok(WOFF2, fonts::sample_woff2())),
        ("late.woff2", Response::ok(WOFF2, fonts::sample_woff2())),
    ]);
    let loader = ScriptedLoader::new()
        .font(server.url("early.woff2"))
        .late_font(Duration::from_millis(60), server.url("late.woff2"));
    let root = tempdir().unwrap();
    let ctx = RunContext::new(server.base(), None, root.path()).unwrap();

    let report = run(&ctx, &loader, builtin(), &fast_options(), &RunControl::new())
        .await
        .unwrap();

    assert_eq!(report.discovered, 2);
    assert_eq!(file_names(ctx.destination_dir()), vec!["early.woff2", "late.woff2"]);
}

#[tokio::test]
async fn truncated_download_leaves_no_file() {
    let server = font_server::start(vec![
        ("good.woff2", Response::ok(WOFF2, fonts::sample_woff2())),
        ("cut.woff2", Response::ok(WOFF2, vec![7u8; 1000]).truncated(4096)),
        ("missing.woff2", Response::status(404)),
    ]);
    let loader = ScriptedLoader::new()
        .font(server.url("good.woff2"))
        .font(server.url("cut.woff2"))
        .font(server.url("missing.woff2"));
    let root = tempdir().unwrap();
    let ctx = RunContext::new(server.base(), None, root.path()).unwrap();

    let report = run(&ctx, &loader, builtin(), &fast_options(), &RunControl::new())
        .await
        .unwrap();

    assert_eq!(report.discovered, 3);
    assert!(report.any_failed());
    let counts = report.counts();
    assert_eq!((counts.downloaded, counts.failed), (1, 2));
    for failed in &report.assets[1..] {
        assert!(matches!(
            failed.outcome,
            AssetOutcome::Failed(AssetError::Download { .. })
        ));
        assert!(failed.path.is_none());
    }
    assert_eq!(file_names(ctx.destination_dir()), vec!["good.woff2"]);
}

#[tokio::test]
async fn corrupt_container_fails_conversion_and_keeps_original() {
    let server = font_server::start(vec![
        ("bad.woff2", Response::ok(WOFF2, b"wOF2 but not really".to_vec())),
        ("good.woff2", Response::ok(WOFF2, fonts::sample_woff2())),
    ]);
    let loader = ScriptedLoader::new()
        .font(server.url("bad.woff2"))
        .font(server.url("good.woff2"));
    let root = tempdir().unwrap();
    let ctx = RunContext::new(server.base(), Some("otf"), root.path()).unwrap();

    let report = run(&ctx, &loader, builtin(), &fast_options(), &RunControl::new())
        .await
        .unwrap();

    assert!(matches!(
        report.assets[0].outcome,
        AssetOutcome::Failed(AssetError::Conversion { .. })
    ));
    assert!(matches!(report.assets[1].outcome, AssetOutcome::Converted));
    assert_eq!(file_names(ctx.destination_dir()), vec!["bad.woff2", "good.otf"]);
}

#[tokio::test]
async fn navigation_failure_closes_loader_and_creates_nothing() {
    let loader = ScriptedLoader::new()
        .font("http://127.0.0.1:9/never.woff2")
        .failing_navigation("net::ERR_NAME_NOT_RESOLVED");
    let root = tempdir().unwrap();
    let ctx = RunContext::new("https://unreachable.invalid/", Some("otf"), root.path()).unwrap();

    let err = run(&ctx, &loader, builtin(), &fast_options(), &RunControl::new())
        .await
        .unwrap_err();

    match err {
        RunError::Navigation { message, .. } => assert!(message.contains("ERR_NAME_NOT_RESOLVED")),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(loader.launches(), 1);
    assert_eq!(loader.closes(), 1);
    assert!(file_names(root.path()).is_empty());
}

#[tokio::test]
async fn destination_occupied_by_a_file_is_a_filesystem_error() {
    let server = font_server::start(vec![("a.woff2", Response::ok(WOFF2, fonts::sample_woff2()))]);
    let loader = ScriptedLoader::new().font(server.url("a.woff2"));
    let root = tempdir().unwrap();
    let ctx = RunContext::new(server.base(), None, root.path()).unwrap();
    std::fs::write(ctx.destination_dir(), b"occupied").unwrap();

    let err = run(&ctx, &loader, builtin(), &fast_options(), &RunControl::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Filesystem { .. }));
    assert_eq!(server.hits("a.woff2"), 0);
}

#[tokio::test]
async fn rerun_reuses_existing_directory() {
    let server = font_server::start(vec![("a.woff2", Response::ok(WOFF2, fonts::sample_woff2()))]);
    let root = tempdir().unwrap();
    let ctx = RunContext::new(server.base(), Some("otf"), root.path()).unwrap();

    for _ in 0..2 {
        let loader = ScriptedLoader::new().font(server.url("a.woff2"));
        let report = run(&ctx, &loader, builtin(), &fast_options(), &RunControl::new())
            .await
            .unwrap();
        assert!(matches!(report.assets[0].outcome, AssetOutcome::Converted));
    }
    assert_eq!(file_names(ctx.destination_dir()), vec!["a.otf"]);
}

#[tokio::test]
async fn downloads_respect_concurrency_limit() {
    let delay = Duration::from_millis(150);
    let names: Vec<String> = (0..6).map(|i| format!("f{i}.woff2")).collect();
    let server = font_server::start(
        names
            .iter()
            .map(|n| (n.as_str(), Response::ok(WOFF2, fonts::sample_woff2()).delayed(delay)))
            .collect(),
    );
    let mut loader = ScriptedLoader::new();
    for n in &names {
        loader = loader.font(server.url(n));
    }
    let root = tempdir().unwrap();
    let ctx = RunContext::new(server.base(), None, root.path()).unwrap();
    let mut opts = fast_options();
    opts.max_concurrent_downloads = 2;

    let report = run(&ctx, &loader, builtin(), &opts, &RunControl::new())
        .await
        .unwrap();

    assert_eq!(report.counts().downloaded, 6);
    assert!(server.peak_in_flight() <= 2, "peak {}", server.peak_in_flight());
    assert_eq!(file_names(ctx.destination_dir()).len(), 6);
}

#[tokio::test]
async fn cancellation_stops_downloads_and_cleans_up() {
    let server = font_server::start(vec![(
        "slow.woff2",
        Response::ok(WOFF2, fonts::sample_woff2()).delayed(Duration::from_secs(3)),
    )]);
    let loader = ScriptedLoader::new().font(server.url("slow.woff2"));
    let root = tempdir().unwrap();
    let ctx = RunContext::new(server.base(), Some("otf"), root.path()).unwrap();
    let control = RunControl::new();

    let canceller = {
        let control = control.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            control.cancel();
        })
    };
    let started = std::time::Instant::now();
    let err = run(&ctx, &loader, builtin(), &fast_options(), &control)
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, RunError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(loader.closes(), 1);
    assert!(file_names(ctx.destination_dir()).is_empty());
}

#[tokio::test]
async fn cancellation_during_navigation() {
    let loader = ScriptedLoader::new()
        .font("http://127.0.0.1:9/a.woff2")
        .slow_navigation(Duration::from_secs(5));
    let root = tempdir().unwrap();
    let ctx = RunContext::new("https://example.com/", None, root.path()).unwrap();
    let control = RunControl::new();

    let canceller = {
        let control = control.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            control.cancel();
        })
    };
    let err = run(&ctx, &loader, builtin(), &fast_options(), &control)
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, RunError::Cancelled));
    assert_eq!(loader.closes(), 1);
    assert!(!ctx.destination_dir().exists());
}

#[tokio::test]
async fn cancellation_interrupts_conversion_and_keeps_container() {
    let server = font_server::start(vec![("a.woff2", Response::ok(WOFF2, fonts::sample_woff2()))]);
    let loader = ScriptedLoader::new().font(server.url("a.woff2"));
    let root = tempdir().unwrap();
    let ctx = RunContext::new(server.base(), Some("otf"), root.path()).unwrap();
    let mut decoders = DecoderRegistry::new();
    decoders.register(
        "woff2",
        Arc::new(FnDecoder::new("stalled", |input: &[u8]| {
            std::thread::sleep(Duration::from_secs(2));
            Ok(input.to_vec())
        })),
    );
    let control = RunControl::new();

    let canceller = {
        let control = control.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(600)).await;
            control.cancel();
        })
    };
    let started = std::time::Instant::now();
    let err = run(&ctx, &loader, Arc::new(decoders), &fast_options(), &control)
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, RunError::Cancelled));
    assert!(started.elapsed() < Duration::from_millis(1800), "took {:?}", started.elapsed());
    assert_eq!(file_names(ctx.destination_dir()), vec!["a.woff2"]);
}
