//! Page loader collaborator.
//!
//! A loader renders (or replays) one page and reports every network
//! response it sees. The core only depends on the traits here:
//! `PageLoader::launch` → `BrowserHandle::new_page` → `Page::on_response`
//! + `Page::goto`, and finally `BrowserHandle::close`.
//!
//! Two loaders ship with the crate: [`StaticPageLoader`] fetches the
//! document and its stylesheets over HTTP and reports the fonts they
//! reference; [`HarPageLoader`] replays a HAR capture recorded in a browser.

mod har;
mod static_page;

pub use har::HarPageLoader;
pub use static_page::StaticPageLoader;

use async_trait::async_trait;
use url::Url;

/// Resource classification of font responses.
pub const FONT_RESOURCE_TYPE: &str = "font";

/// One network response observed while loading the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEvent {
    /// Classification such as `document`, `stylesheet`, `font`, `image`.
    pub resource_type: String,
    pub url: String,
}

impl ResponseEvent {
    pub fn new(resource_type: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            url: url.into(),
        }
    }

    pub fn font(url: impl Into<String>) -> Self {
        Self::new(FONT_RESOURCE_TYPE, url)
    }

    pub fn is_font(&self) -> bool {
        self.resource_type.eq_ignore_ascii_case(FONT_RESOURCE_TYPE)
    }
}

/// Where a page delivers its response events. Events may keep arriving
/// after `goto` returns (lazy loads); the observer decides when to stop
/// listening.
pub type ResponseSink = tokio::sync::mpsc::UnboundedSender<ResponseEvent>;

/// Settled main navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationResult {
    /// URL of the main document after redirects.
    pub url: String,
    pub status: Option<u32>,
}

#[async_trait]
pub trait PageLoader: Send + Sync {
    /// Starts the loader. The returned handle must be closed by the caller.
    async fn launch(&self) -> anyhow::Result<Box<dyn BrowserHandle>>;
}

#[async_trait]
pub trait BrowserHandle: Send {
    async fn new_page(&mut self) -> anyhow::Result<Box<dyn Page>>;

    /// Releases the loader. Called exactly once, on every exit path.
    async fn close(&mut self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait Page: Send {
    /// Registers the sink for this page's response events. Must be called
    /// before `goto`.
    fn on_response(&mut self, sink: ResponseSink);

    /// Loads `url`; resolves when the main document has loaded.
    async fn goto(&mut self, url: &Url) -> anyhow::Result<NavigationResult>;
}
