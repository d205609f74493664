//! Replays a HAR capture as a page load.
//!
//! Every entry becomes one response event, in capture order. The resource
//! type comes from Chrome's `_resourceType` field when present, otherwise
//! it is inferred from the MIME type and then the URL extension. Useful for
//! pages whose fonts only appear after scripts run: record the page in a
//! browser, export the HAR, and harvest from the capture.

mod parse;

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use url::Url;

use super::{BrowserHandle, NavigationResult, Page, PageLoader, ResponseEvent, ResponseSink};
use crate::url_model::{extension_of, filename_from_url_path};
use parse::{HarEntry, HarLog};

const FONT_EXTENSIONS: &[&str] = &["woff", "woff2", "ttf", "otf", "eot", "ttc"];

/// Page loader backed by a HAR file.
#[derive(Debug, Clone)]
pub struct HarPageLoader {
    path: PathBuf,
}

impl HarPageLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PageLoader for HarPageLoader {
    async fn launch(&self) -> anyhow::Result<Box<dyn BrowserHandle>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("read HAR file: {}", self.path.display()))?;
        let har: HarLog = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse HAR JSON: {}", self.path.display()))?;
        tracing::debug!(
            entries = har.log.entries.len(),
            pages = har.log.pages.len(),
            "loaded HAR capture"
        );
        Ok(Box::new(HarBrowser { log: Some(har) }))
    }
}

struct HarBrowser {
    log: Option<HarLog>,
}

#[async_trait]
impl BrowserHandle for HarBrowser {
    async fn new_page(&mut self) -> anyhow::Result<Box<dyn Page>> {
        let log = self.log.take().context("HAR capture holds a single page")?;
        Ok(Box::new(HarPage { log, sink: None }))
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.log = None;
        Ok(())
    }
}

struct HarPage {
    log: HarLog,
    sink: Option<ResponseSink>,
}

#[async_trait]
impl Page for HarPage {
    fn on_response(&mut self, sink: ResponseSink) {
        self.sink = Some(sink);
    }

    async fn goto(&mut self, url: &Url) -> anyhow::Result<NavigationResult> {
        let entries = &self.log.log.entries;
        if entries.is_empty() {
            anyhow::bail!("HAR capture has no entries");
        }
        if let Some(page) = self.log.log.pages.first() {
            if !page.title.is_empty() && page.title != url.as_str() {
                tracing::warn!(capture = %page.title, target = %url, "HAR capture was recorded for another page");
            }
        }

        if let Some(sink) = &self.sink {
            for entry in entries {
                let event = ResponseEvent::new(resource_type_of(entry), entry.request.url.clone());
                if sink.send(event).is_err() {
                    break;
                }
            }
        }

        let main = entries
            .iter()
            .find(|e| resource_type_of(e) == "document")
            .unwrap_or(&entries[0]);
        Ok(NavigationResult {
            url: main.request.url.clone(),
            status: Some(u32::from(main.response.status)),
        })
    }
}

/// Resource type of an entry: explicit `_resourceType`, else MIME, else URL extension.
fn resource_type_of(entry: &HarEntry) -> String {
    if let Some(t) = entry.resource_type.as_deref().filter(|t| !t.is_empty()) {
        return t.to_ascii_lowercase();
    }
    let mime = entry
        .response
        .content
        .as_ref()
        .and_then(|c| c.mime_type.as_deref())
        .unwrap_or("");
    if let Some(kind) = resource_type_from_mime(mime) {
        return kind.to_string();
    }
    let by_extension = filename_from_url_path(&entry.request.url)
        .and_then(|name| extension_of(&name))
        .map_or(false, |ext| FONT_EXTENSIONS.contains(&ext.as_str()));
    if by_extension {
        "font".to_string()
    } else {
        "other".to_string()
    }
}

fn resource_type_from_mime(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match essence.as_str() {
        "" => None,
        "text/html" | "application/xhtml+xml" => Some("document"),
        "text/css" => Some("stylesheet"),
        "application/font-woff"
        | "application/font-woff2"
        | "application/font-sfnt"
        | "application/x-font-ttf"
        | "application/x-font-otf"
        | "application/x-font-woff"
        | "application/vnd.ms-fontobject" => Some("font"),
        m if m.starts_with("font/") => Some("font"),
        m if m.starts_with("image/") => Some("image"),
        _ => None,
    }
}
