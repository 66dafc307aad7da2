//! Editor orchestration boundary.
//!
//! The editor page owns three asynchronously fetched resources (the chart
//! document, the namespace database and the revision log) as root cells and
//! exposes a derived [`ChartEditor`] only once all three are present.
//! Fetching happens at `await` points in [`ChartEditorPage::refresh`]; every
//! other step is a synchronous graph update.

mod documents;
mod page;
mod preferences;
mod source;

pub use documents::{
    ChartDocument, EditorDatabase, LogEntry, LogsDocument, NAMESPACES_URL, NamespaceEntry,
    chart_config_url, chart_logs_url,
};
pub use page::{ChartEditor, ChartEditorPage, EditorResources, PageProps};
pub use preferences::{
    JsonFilePreferenceStore, MemoryPreferenceStore, PREVIEW_MODE_KEY, PreferenceStore,
    PreviewMode,
};
pub use source::{DocumentSource, StaticDocumentSource, fetch_typed};
