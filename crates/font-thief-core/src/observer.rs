//! Resource observer: turns a page's response stream into registry entries.
//!
//! Discovery runs in two phases. While the navigation is in flight every
//! event is recorded. Once it settles, the observer keeps listening until a
//! quiescence window passes without any response (network idle), so fonts
//! requested late or lazily still count. A settle cap bounds the second
//! phase for pages that never go quiet.

use std::time::Duration;

use url::Url;

use crate::config::FontThiefConfig;
use crate::control::RunControl;
use crate::error::RunError;
use crate::loader::{NavigationResult, Page, ResponseEvent};
use crate::registry::AssetRegistry;
use crate::url_model::derive_font_name;

/// When discovery is considered complete.
#[derive(Debug, Clone, Copy)]
pub struct QuiescencePolicy {
    /// Quiet period required after navigation settles.
    pub window: Duration,
    /// Cap on the listening phase after navigation. `None` = no cap.
    pub max_settle: Option<Duration>,
    /// Cap on the navigation itself. `None` = no cap.
    pub navigation_timeout: Option<Duration>,
}

impl QuiescencePolicy {
    pub fn from_config(cfg: &FontThiefConfig) -> Self {
        Self {
            window: cfg.quiescence_window(),
            max_settle: cfg.max_settle(),
            navigation_timeout: cfg.navigation_timeout(),
        }
    }
}

/// Records `event` if it is a font. Returns true when a new asset was added.
pub fn record_response(registry: &AssetRegistry, event: &ResponseEvent) -> bool {
    if !event.is_font() {
        return false;
    }
    let name = derive_font_name(&event.url);
    let added = registry.insert_if_absent(&event.url, &name);
    if added {
        tracing::debug!(url = %event.url, name, "font discovered");
    }
    added
}

async fn sleep_or_forever(limit: Option<Duration>) {
    match limit {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending::<()>().await,
    }
}

/// Navigates `page` to `target` and feeds font responses into `registry`
/// until quiescence. Does not freeze the registry.
pub async fn observe(
    page: &mut dyn Page,
    target: &Url,
    registry: &AssetRegistry,
    policy: &QuiescencePolicy,
    control: &RunControl,
) -> Result<NavigationResult, RunError> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ResponseEvent>();
    page.on_response(tx);

    let navigation_failed = |message: String| RunError::Navigation {
        url: target.to_string(),
        message,
    };

    let navigation = async {
        match policy.navigation_timeout {
            Some(limit) => tokio::time::timeout(limit, page.goto(target))
                .await
                .unwrap_or_else(|_| Err(anyhow::anyhow!("timed out after {:?}", limit))),
            None => page.goto(target).await,
        }
    };
    tokio::pin!(navigation);

    let mut responses = 0usize;
    let nav = loop {
        tokio::select! {
            biased;
            _ = control.cancelled() => return Err(RunError::Cancelled),
            Some(event) = rx.recv() => {
                responses += 1;
                record_response(registry, &event);
            }
            res = &mut navigation => break res,
        }
    };
    let nav = nav.map_err(|e| navigation_failed(format!("{:#}", e)))?;
    tracing::info!(url = %nav.url, status = ?nav.status, responses, "navigation settled");

    let settle = sleep_or_forever(policy.max_settle);
    tokio::pin!(settle);
    loop {
        tokio::select! {
            biased;
            _ = control.cancelled() => return Err(RunError::Cancelled),
            event = rx.recv() => match event {
                Some(event) => {
                    responses += 1;
                    record_response(registry, &event);
                }
                // The page dropped its sink: nothing more can arrive.
                None => break,
            },
            _ = &mut settle => {
                tracing::warn!(max_settle = ?policy.max_settle, "page never went quiet, stopping discovery");
                break;
            }
            _ = tokio::time::sleep(policy.window) => break,
        }
    }

    tracing::info!(fonts = registry.size(), responses, "discovery complete");
    Ok(nav)
}
