//! Page loader that plays back a fixed list of response events.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use font_thief_core::loader::{
    BrowserHandle, NavigationResult, Page, PageLoader, ResponseEvent, ResponseSink,
};
use url::Url;

#[derive(Debug, Clone)]
pub struct ScriptedEvent {
    /// Delay after `goto` returns; `None` = emitted during navigation.
    pub after: Option<Duration>,
    pub event: ResponseEvent,
}

#[derive(Clone, Default)]
pub struct ScriptedLoader {
    events: Vec<ScriptedEvent>,
    navigation_error: Option<String>,
    navigation_delay: Duration,
    launches: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl ScriptedLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Font response delivered while the page loads.
    pub fn font(mut self, url: impl Into<String>) -> Self {
        self.events.push(ScriptedEvent {
            after: None,
            event: ResponseEvent::font(url),
        });
        self
    }

    /// Non-font response delivered while the page loads.
    pub fn other(mut self, resource_type: &str, url: impl Into<String>) -> Self {
        self.events.push(ScriptedEvent {
            after: None,
            event: ResponseEvent::new(resource_type, url),
        });
        self
    }

    /// Font response delivered `after` the navigation settled.
    pub fn late_font(mut self, after: Duration, url: impl Into<String>) -> Self {
        self.events.push(ScriptedEvent {
            after: Some(after),
            event: ResponseEvent::font(url),
        });
        self
    }

    pub fn failing_navigation(mut self, message: &str) -> Self {
        self.navigation_error = Some(message.to_string());
        self
    }

    pub fn slow_navigation(mut self, delay: Duration) -> Self {
        self.navigation_delay = delay;
        self
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageLoader for ScriptedLoader {
    async fn launch(&self) -> anyhow::Result<Box<dyn BrowserHandle>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedBrowser {
            loader: self.clone(),
        }))
    }
}

struct ScriptedBrowser {
    loader: ScriptedLoader,
}

#[async_trait]
impl BrowserHandle for ScriptedBrowser {
    async fn new_page(&mut self) -> anyhow::Result<Box<dyn Page>> {
        Ok(Box::new(ScriptedPage {
            loader: self.loader.clone(),
            sink: None,
        }))
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.loader.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct ScriptedPage {
    loader: ScriptedLoader,
    sink: Option<ResponseSink>,
}

#[async_trait]
impl Page for ScriptedPage {
    fn on_response(&mut self, sink: ResponseSink) {
        self.sink = Some(sink);
    }

    async fn goto(&mut self, url: &Url) -> anyhow::Result<NavigationResult> {
        if !self.loader.navigation_delay.is_zero() {
            tokio::time::sleep(self.loader.navigation_delay).await;
        }
        if let Some(message) = &self.loader.navigation_error {
            anyhow::bail!("{}", message);
        }
        let sink = self.sink.clone().expect("on_response before goto");
        for scripted in &self.loader.events {
            match scripted.after {
                None => {
                    let _ = sink.send(scripted.event.clone());
                }
                Some(delay) => {
                    let sink = sink.clone();
                    let event = scripted.event.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = sink.send(event);
                    });
                }
            }
        }
        Ok(NavigationResult {
            url: url.to_string(),
            status: Some(200),
        })
    }
}
