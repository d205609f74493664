//! Asset registry: one entry per distinct font URL.
//!
//! Written by the observer while the page loads, then frozen into a
//! snapshot that the coordinator hands out to download tasks. Keys are the
//! canonical URL strings, never event identity, so repeated responses for
//! the same font collapse into one asset.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::asset::FontAsset;
use crate::url_model::numbered_name;

/// Canonical identity of a font URL: parsed and re-serialized (scheme and
/// host lower-cased, default port dropped) with the fragment removed, since
/// fragments never reach the server. Unparseable input is used trimmed.
pub fn canonical_url(raw: &str) -> String {
    match url::Url::parse(raw.trim()) {
        Ok(mut u) => {
            u.set_fragment(None);
            u.to_string()
        }
        Err(_) => raw.trim().to_string(),
    }
}

/// Case-insensitive name without its extension.
fn stem_key(name: &str) -> String {
    let stem = match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    };
    stem.to_lowercase()
}

#[derive(Default)]
struct Inner {
    by_url: HashMap<String, usize>,
    /// Lower-cased stems already handed out. Stems rather than names, so
    /// `a.woff` and `a.woff2` cannot both convert onto `a.otf`.
    stems: HashSet<String>,
    assets: Vec<FontAsset>,
    frozen: bool,
}

/// Set of discovered fonts for one run. Safe to share between the event
/// source and readers.
#[derive(Default)]
pub struct AssetRegistry {
    inner: Mutex<Inner>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds a font unless its URL is already known. Returns true when a new
    /// asset was created. A name already taken by another URL gets a numeric
    /// suffix. Inserts after [`freeze`](Self::freeze) are ignored.
    pub fn insert_if_absent(&self, url: &str, name: &str) -> bool {
        let key = canonical_url(url);
        let mut inner = self.lock();
        if inner.frozen {
            tracing::debug!(url = %key, "registry frozen, ignoring late font");
            return false;
        }
        if inner.by_url.contains_key(&key) {
            return false;
        }

        let mut unique = name.to_string();
        let mut n = 2;
        while inner.stems.contains(&stem_key(&unique)) {
            unique = numbered_name(name, n);
            n += 1;
        }
        if unique != name {
            tracing::debug!(url = %key, name, renamed = %unique, "font name collision");
        }

        let index = inner.assets.len();
        inner.stems.insert(stem_key(&unique));
        inner.by_url.insert(key.clone(), index);
        inner.assets.push(FontAsset::new(key, unique));
        true
    }

    /// Stops accepting inserts and returns the assets in discovery order.
    pub fn freeze(&self) -> Vec<FontAsset> {
        let mut inner = self.lock();
        inner.frozen = true;
        inner.assets.clone()
    }

    pub fn is_frozen(&self) -> bool {
        self.lock().frozen
    }

    pub fn size(&self) -> usize {
        self.lock().assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}
