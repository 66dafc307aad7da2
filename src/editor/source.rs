use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{ChartError, ChartResult};

/// Asynchronous source of JSON documents addressed by URL.
///
/// Futures are not `Send`: fetch results are applied to the graph on the
/// task that awaited them.
#[async_trait(?Send)]
pub trait DocumentSource {
    async fn fetch_document(&self, url: &str) -> ChartResult<Value>;
}

/// Fetches `url` and decodes it into `T`.
pub async fn fetch_typed<T: DeserializeOwned>(
    source: &dyn DocumentSource,
    url: &str,
    what: &'static str,
) -> ChartResult<T> {
    let document = source.fetch_document(url).await?;
    let decoded = serde_json::from_value(document).map_err(|err| ChartError::decode(what, err))?;
    debug!(url, what, "document decoded");
    Ok(decoded)
}

/// In-memory document source.
///
/// Documents can be replaced between fetches; unknown URLs fail with
/// [`ChartError::Fetch`].
#[derive(Debug, Default)]
pub struct StaticDocumentSource {
    documents: RefCell<HashMap<String, Value>>,
    fetches: Cell<usize>,
}

impl StaticDocumentSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_document(self, url: impl Into<String>, document: Value) -> Self {
        self.insert(url, document);
        self
    }

    pub fn insert(&self, url: impl Into<String>, document: Value) {
        self.documents.borrow_mut().insert(url.into(), document);
    }

    pub fn remove(&self, url: &str) -> Option<Value> {
        self.documents.borrow_mut().remove(url)
    }

    /// Number of fetches served or failed so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }
}

#[async_trait(?Send)]
impl DocumentSource for StaticDocumentSource {
    async fn fetch_document(&self, url: &str) -> ChartResult<Value> {
        self.fetches.set(self.fetches.get() + 1);
        trace!(url, "static document fetch");
        self.documents
            .borrow()
            .get(url)
            .cloned()
            .ok_or_else(|| ChartError::Fetch {
                url: url.to_owned(),
                reason: "no document at this url".to_owned(),
            })
    }
}
