//! HTTP-only page loader.
//!
//! Fetches the target document, follows its stylesheets (`<link
//! rel=stylesheet>`, inline `<style>`, `@import` up to a fixed depth) and
//! reports a `font` response for every `@font-face` source and every
//! `<link rel=preload as=font>`. No scripts run, so fonts injected by
//! JavaScript are only found through [`HarPageLoader`](super::HarPageLoader).

mod css;
mod html;

use std::collections::HashSet;

use anyhow::Context;
use async_trait::async_trait;
use url::Url;

use super::{BrowserHandle, NavigationResult, Page, PageLoader, ResponseEvent, ResponseSink};
use crate::control::RunControl;
use crate::fetch::{fetch_text, FetchOptions, FetchedText};

/// How deep `@import` chains are followed.
const MAX_IMPORT_DEPTH: usize = 4;
/// Upper bound on stylesheets fetched for one page.
const MAX_STYLESHEETS: usize = 64;

/// Page loader that reads HTML and CSS over HTTP.
#[derive(Debug, Clone)]
pub struct StaticPageLoader {
    opts: FetchOptions,
    control: RunControl,
}

impl StaticPageLoader {
    pub fn new(opts: FetchOptions, control: RunControl) -> Self {
        Self { opts, control }
    }
}

#[async_trait]
impl PageLoader for StaticPageLoader {
    async fn launch(&self) -> anyhow::Result<Box<dyn BrowserHandle>> {
        Ok(Box::new(StaticBrowser {
            opts: self.opts.clone(),
            control: self.control.clone(),
            closed: false,
        }))
    }
}

struct StaticBrowser {
    opts: FetchOptions,
    control: RunControl,
    closed: bool,
}

#[async_trait]
impl BrowserHandle for StaticBrowser {
    async fn new_page(&mut self) -> anyhow::Result<Box<dyn Page>> {
        if self.closed {
            anyhow::bail!("loader already closed");
        }
        Ok(Box::new(StaticPage {
            opts: self.opts.clone(),
            control: self.control.clone(),
            sink: None,
        }))
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.closed = true;
        Ok(())
    }
}

struct StaticPage {
    opts: FetchOptions,
    control: RunControl,
    sink: Option<ResponseSink>,
}

impl StaticPage {
    fn emit(&self, event: ResponseEvent) {
        if let Some(sink) = &self.sink {
            let _ = sink.send(event);
        }
    }

    async fn get(&self, url: &Url) -> anyhow::Result<FetchedText> {
        let url_s = url.to_string();
        let opts = self.opts.clone();
        let control = self.control.clone();
        let fetched = tokio::task::spawn_blocking(move || fetch_text(&url_s, &opts, &control))
            .await
            .context("fetch task panicked")?
            .with_context(|| format!("GET {}", url))?;
        Ok(fetched)
    }

    /// Reports every font referenced by `css` (relative to `base`) and queues its imports.
    fn scan_css(&self, css: &str, base: &Url, depth: usize, queue: &mut Vec<(Url, usize)>) {
        for raw in css::font_face_urls(css) {
            match base.join(&raw) {
                Ok(font) => self.emit(ResponseEvent::font(font.to_string())),
                Err(e) => tracing::debug!(%base, raw, "unresolvable font url: {}", e),
            }
        }
        if depth < MAX_IMPORT_DEPTH {
            for raw in css::import_urls(css) {
                if let Ok(import) = base.join(&raw) {
                    queue.push((import, depth + 1));
                }
            }
        }
    }
}

#[async_trait]
impl Page for StaticPage {
    fn on_response(&mut self, sink: ResponseSink) {
        self.sink = Some(sink);
    }

    async fn goto(&mut self, url: &Url) -> anyhow::Result<NavigationResult> {
        let doc = self.get(url).await?;
        let doc_url = Url::parse(&doc.final_url).unwrap_or_else(|_| url.clone());
        self.emit(ResponseEvent::new("document", doc_url.to_string()));

        let refs = html::scan_document(&doc.body);
        let base = refs
            .base
            .as_deref()
            .and_then(|b| doc_url.join(b).ok())
            .unwrap_or_else(|| doc_url.clone());

        for raw in &refs.preloaded_fonts {
            if let Ok(font) = base.join(raw) {
                self.emit(ResponseEvent::font(font.to_string()));
            }
        }

        let mut queue: Vec<(Url, usize)> = Vec::new();
        for style in &refs.inline_styles {
            self.scan_css(style, &base, 0, &mut queue);
        }
        for raw in &refs.stylesheets {
            if let Ok(sheet) = base.join(raw) {
                queue.push((sheet, 0));
            }
        }
        // Stylesheets are processed in document order.
        queue.reverse();

        let mut seen: HashSet<String> = HashSet::new();
        while let Some((sheet, depth)) = queue.pop() {
            if seen.len() >= MAX_STYLESHEETS {
                tracing::warn!(limit = MAX_STYLESHEETS, "stylesheet limit reached");
                break;
            }
            if !seen.insert(sheet.to_string()) {
                continue;
            }
            // A broken stylesheet does not fail the page, like in a browser.
            let fetched = match self.get(&sheet).await {
                Ok(f) => f,
                Err(e) => {
                    if self.control.is_cancelled() {
                        return Err(e);
                    }
                    tracing::warn!(url = %sheet, "stylesheet unavailable: {:#}", e);
                    continue;
                }
            };
            let sheet_url = Url::parse(&fetched.final_url).unwrap_or(sheet);
            self.emit(ResponseEvent::new("stylesheet", sheet_url.to_string()));
            let mut imports = Vec::new();
            self.scan_css(&fetched.body, &sheet_url, depth, &mut imports);
            imports.reverse();
            queue.extend(imports);
        }

        Ok(NavigationResult {
            url: doc_url.to_string(),
            status: Some(doc.status),
        })
    }
}
