//! Content reference resolution: turns a node's `externalUri` into inline
//! bytes/JSON plus a content-addressed `cacheKey`, behind a scheme-keyed
//! registry of adapters so unknown schemes are a silent no-op rather than a
//! hard error.
//!
//! A narrow, object-safe `ContentAdapter` trait per scheme is collected
//! into one registry, with an LRU cache giving "resolve a given URI once
//! per process lifetime" referential transparency.

mod file;
mod http;

use crate::model::{ContentRef, Node};
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::warn;

/// What an adapter produced for one URI.
pub struct FetchedContent {
    pub media_type: String,
    pub bytes: Option<bytes::Bytes>,
    pub json: Option<serde_json::Value>,
}

#[async_trait::async_trait]
pub trait ContentAdapter: Send + Sync {
    fn scheme(&self) -> &'static str;
    async fn fetch(
        &self,
        uri: &str,
        headers: Option<&std::collections::BTreeMap<String, String>>,
    ) -> crate::error::Result<FetchedContent>;
}

pub struct AdapterRegistry {
    schemes: HashMap<&'static str, Arc<dyn ContentAdapter>>,
    cache: Mutex<LruCache<String, FetchedContent>>,
    metrics: Arc<crate::metrics::PerformanceMetrics>,
}

impl AdapterRegistry {
    /// Registers the `file`, `http`, and `https` adapters. `cache_capacity`
    /// bounds the per-URI resolution cache.
    pub fn with_builtin_schemes(cache_capacity: usize, metrics: Arc<crate::metrics::PerformanceMetrics>) -> Self {
        let mut schemes: HashMap<&'static str, Arc<dyn ContentAdapter>> = HashMap::new();
        let file_adapter: Arc<dyn ContentAdapter> = Arc::new(file::FileAdapter);
        schemes.insert(file_adapter.scheme(), file_adapter);
        let http_agent = ureq::AgentBuilder::new().build();
        let http_adapter: Arc<dyn ContentAdapter> = Arc::new(http::HttpAdapter::new(http_agent.clone(), "http"));
        schemes.insert(http_adapter.scheme(), http_adapter);
        let https_adapter: Arc<dyn ContentAdapter> = Arc::new(http::HttpAdapter::new(http_agent, "https"));
        schemes.insert(https_adapter.scheme(), https_adapter);

        let capacity = NonZeroUsize::new(cache_capacity.max(1)).unwrap();
        Self {
            schemes,
            cache: Mutex::new(LruCache::new(capacity)),
            metrics,
        }
    }

    /// Resolves `node.content.externalUri` in place (if set and unresolved),
    /// returning the node either way - adapter/scheme failures are
    /// non-fatal: the node is admitted with `cacheKey` left unset.
    pub async fn resolve_node_content(&self, mut node: Node) -> Node {
        let Some(content) = node.content.as_mut() else {
            return node;
        };
        resolve_content_ref(self, content).await;
        node
    }

    fn scheme_of(uri: &str) -> Option<&str> {
        uri.split_once("://").map(|(scheme, _)| scheme)
    }
}

async fn resolve_content_ref(registry: &AdapterRegistry, content: &mut ContentRef) {
    if let Some(uri) = content.external_uri.clone() {
        if content.inline_bytes.is_none() && content.inline_json.is_none() {
            if let Some(scheme) = AdapterRegistry::scheme_of(&uri) {
                if let Some(adapter) = registry.schemes.get(scheme).cloned() {
                    if let Some(cached) = registry.cache.lock().get(&uri).map(fetched_clone) {
                        apply_fetched(content, cached);
                        registry.metrics.record_adapter_cache_hit();
                        return;
                    }
                    match adapter.fetch(&uri, content.headers.as_ref()).await {
                        Ok(fetched) => {
                            registry.cache.lock().put(uri.clone(), fetched_clone(&fetched));
                            registry.metrics.record_adapter_cache_miss();
                            apply_fetched(content, fetched);
                        }
                        Err(e) => {
                            warn!(uri, error = %e, "content adapter failed; admitting node with cacheKey unset");
                        }
                    }
                    return;
                }
            }
            // Unknown or unparseable scheme: no-op.
        }
    }

    compute_cache_key(content);
}

fn fetched_clone(f: &FetchedContent) -> FetchedContent {
    FetchedContent {
        media_type: f.media_type.clone(),
        bytes: f.bytes.clone(),
        json: f.json.clone(),
    }
}

fn apply_fetched(content: &mut ContentRef, fetched: FetchedContent) {
    content.media_type = fetched.media_type;
    content.inline_bytes = fetched.bytes;
    content.inline_json = fetched.json;
    compute_cache_key(content);
}

/// `cacheKey = sha256(...)`, priority bytes > JSON-utf8 > URI-utf8.
fn compute_cache_key(content: &mut ContentRef) {
    let mut hasher = Sha256::new();
    if let Some(bytes) = &content.inline_bytes {
        hasher.update(bytes);
    } else if let Some(json) = &content.inline_json {
        hasher.update(json.to_string().as_bytes());
    } else if let Some(uri) = &content.external_uri {
        hasher.update(uri.as_bytes());
    } else {
        return;
    }
    content.cache_key = Some(hex::encode(hasher.finalize()));
}
