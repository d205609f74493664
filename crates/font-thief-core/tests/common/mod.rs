#![allow(dead_code)]

pub mod font_server;
pub mod fonts;
pub mod scripted;

use std::time::Duration;

use font_thief_core::coordinator::RunOptions;
use font_thief_core::downloader::DownloadSettings;
use font_thief_core::fetch::FetchOptions;
use font_thief_core::observer::QuiescencePolicy;
use font_thief_core::retry::RetryPolicy;

/// Run options with short windows so tests finish quickly.
pub fn fast_options() -> RunOptions {
    RunOptions {
        max_concurrent_downloads: 4,
        download: DownloadSettings {
            fetch: FetchOptions {
                connect_timeout: Duration::from_secs(5),
                timeout: Some(Duration::from_secs(10)),
                user_agent: "font-thief-tests".to_string(),
            },
            retry: RetryPolicy::none(),
        },
        quiescence: QuiescencePolicy {
            window: Duration::from_millis(150),
            max_settle: Some(Duration::from_secs(5)),
            navigation_timeout: Some(Duration::from_secs(10)),
        },
        decode_timeout: Some(Duration::from_secs(10)),
    }
}

/// Names of the files in `dir`, sorted.
pub fn file_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
