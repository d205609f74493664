//! CLI parse tests.

use super::{Cli, ExitStatus};
use clap::Parser;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).unwrap()
}

#[test]
fn site_is_required() {
    assert!(Cli::try_parse_from(["font-thief"]).is_err());
    assert!(Cli::try_parse_from(["font-thief", "--convert", "ttf"]).is_err());
}

#[test]
fn defaults_to_otf_conversion() {
    let cli = parse(&["font-thief", "--site", "https://example.com"]);
    assert_eq!(cli.site, "https://example.com");
    assert_eq!(cli.requested_format(), Some("otf"));
    assert!(cli.har.is_none());
    assert!(cli.output_dir.is_none());
    assert!(cli.jobs.is_none());
}

#[test]
fn short_flags() {
    let cli = parse(&["font-thief", "-s", "https://example.com", "-c", "ttf"]);
    assert_eq!(cli.requested_format(), Some("ttf"));
}

#[test]
fn unsupported_format_is_passed_through() {
    // The dispatcher reports it as skipped; parsing must not reject it.
    let cli = parse(&["font-thief", "-s", "https://example.com", "-c", "svg"]);
    assert_eq!(cli.requested_format(), Some("svg"));
}

#[test]
fn no_convert_disables_conversion() {
    let cli = parse(&["font-thief", "-s", "https://example.com", "--no-convert"]);
    assert_eq!(cli.requested_format(), None);
    assert!(Cli::try_parse_from([
        "font-thief",
        "-s",
        "https://example.com",
        "--no-convert",
        "-c",
        "ttf"
    ])
    .is_err());
}

#[test]
fn har_output_dir_and_jobs() {
    let cli = parse(&[
        "font-thief",
        "-s",
        "https://example.com",
        "--har",
        "capture.har",
        "--output-dir",
        "/tmp/fonts",
        "--jobs",
        "3",
    ]);
    assert_eq!(cli.har.as_deref(), Some(std::path::Path::new("capture.har")));
    assert_eq!(cli.output_dir.as_deref(), Some(std::path::Path::new("/tmp/fonts")));
    assert_eq!(cli.jobs, Some(3));
    assert!(Cli::try_parse_from(["font-thief", "-s", "x", "--jobs", "0"]).is_err());
}

#[test]
fn invalid_site_still_parses() {
    // URL validation belongs to the run, which reports it before any I/O.
    let cli = parse(&["font-thief", "--site", "not-a-url"]);
    assert_eq!(cli.site, "not-a-url");
}

#[tokio::test]
async fn invalid_site_is_rejected_before_config_is_written() {
    let config_home = tempfile::tempdir().unwrap();
    std::env::set_var("XDG_CONFIG_HOME", config_home.path());
    let output = tempfile::tempdir().unwrap();
    let cli = parse(&[
        "font-thief",
        "--site",
        "not-a-url",
        "--output-dir",
        output.path().to_str().unwrap(),
    ]);

    let err = cli.run().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<font_thief_core::RunError>(),
        Some(font_thief_core::RunError::Validation { .. })
    ));
    assert_eq!(ExitStatus::from_error(&err), ExitStatus::Error);
    assert_eq!(std::fs::read_dir(config_home.path()).unwrap().count(), 0);
    assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
}

#[test]
fn exit_codes() {
    assert_eq!(ExitStatus::Success.code(), 0);
    assert_eq!(ExitStatus::Error.code(), 1);
    assert_eq!(ExitStatus::SomeFailed.code(), 2);
    assert_eq!(ExitStatus::Cancelled.code(), 130);

    let cancelled = anyhow::Error::new(font_thief_core::RunError::Cancelled).context("harvesting");
    assert_eq!(ExitStatus::from_error(&cancelled), ExitStatus::Cancelled);
    assert_eq!(
        ExitStatus::from_error(&anyhow::anyhow!("boom")),
        ExitStatus::Error
    );
}
