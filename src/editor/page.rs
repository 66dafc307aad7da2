use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::api::DiscreteBarChart;
use crate::core::{Bounds, TextMeasurer};
use crate::error::ChartResult;
use crate::reactive::{DerivedCell, Disposer, Graph, RootCell};

use super::documents::{
    ChartDocument, EditorDatabase, LogEntry, LogsDocument, NAMESPACES_URL, chart_config_url,
    chart_logs_url,
};
use super::preferences::{PREVIEW_MODE_KEY, PreferenceStore, PreviewMode};
use super::source::{DocumentSource, fetch_typed};

/// Identifies what the page edits.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageProps {
    /// Saved chart to load; `None` edits a new chart.
    pub chart_id: Option<u64>,
    /// Starting document of a new chart.
    pub new_chart: ChartDocument,
}

impl PageProps {
    #[must_use]
    pub fn existing(chart_id: u64) -> Self {
        Self {
            chart_id: Some(chart_id),
            new_chart: ChartDocument::default(),
        }
    }

    #[must_use]
    pub fn new_chart(document: ChartDocument) -> Self {
        Self {
            chart_id: None,
            new_chart: document,
        }
    }
}

/// Live view of the page resources handed to the editor.
pub trait EditorResources {
    fn chart(&self) -> Option<ChartDocument>;
    fn database(&self) -> Option<EditorDatabase>;
    fn logs(&self) -> Option<Vec<LogEntry>>;
    fn preview_mode(&self) -> PreviewMode;
    fn set_preview_mode(&self, mode: PreviewMode);
}

struct PageResources {
    chart: RootCell<Option<ChartDocument>>,
    database: RootCell<Option<EditorDatabase>>,
    logs: RootCell<Option<Vec<LogEntry>>>,
    preview_mode: RootCell<PreviewMode>,
}

impl PageResources {
    fn is_complete(&self) -> bool {
        self.chart.with(Option::is_some)
            && self.database.with(Option::is_some)
            && self.logs.with(Option::is_some)
    }
}

impl EditorResources for PageResources {
    fn chart(&self) -> Option<ChartDocument> {
        self.chart.get()
    }

    fn database(&self) -> Option<EditorDatabase> {
        self.database.get()
    }

    fn logs(&self) -> Option<Vec<LogEntry>> {
        self.logs.get()
    }

    fn preview_mode(&self) -> PreviewMode {
        self.preview_mode.get()
    }

    fn set_preview_mode(&self, mode: PreviewMode) {
        self.preview_mode.set(mode);
    }
}

/// Editing session over a fully loaded chart.
///
/// Accessors read through to the page, so they track the current resources
/// and record dependencies when called inside a derivation or reaction.
#[derive(Clone)]
pub struct ChartEditor {
    resources: Rc<dyn EditorResources>,
}

impl PartialEq for ChartEditor {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.resources, &other.resources)
    }
}

impl fmt::Debug for ChartEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartEditor")
            .field("preview_mode", &self.resources.preview_mode())
            .finish_non_exhaustive()
    }
}

impl ChartEditor {
    #[must_use]
    pub fn new(resources: Rc<dyn EditorResources>) -> Self {
        Self { resources }
    }

    /// `None` only while a refresh is reloading the page.
    #[must_use]
    pub fn chart(&self) -> Option<ChartDocument> {
        self.resources.chart()
    }

    #[must_use]
    pub fn database(&self) -> Option<EditorDatabase> {
        self.resources.database()
    }

    #[must_use]
    pub fn logs(&self) -> Option<Vec<LogEntry>> {
        self.resources.logs()
    }

    #[must_use]
    pub fn is_new_chart(&self) -> bool {
        self.chart().is_some_and(|chart| chart.id.is_none())
    }

    #[must_use]
    pub fn preview_mode(&self) -> PreviewMode {
        self.resources.preview_mode()
    }

    #[must_use]
    pub fn preview_bounds(&self) -> Bounds {
        self.preview_mode().bounds()
    }

    pub fn set_preview_mode(&self, mode: PreviewMode) {
        debug!(%mode, "preview mode selected");
        self.resources.set_preview_mode(mode);
    }
}

/// Owner of the editor resources and of the chart preview.
pub struct ChartEditorPage {
    graph: Graph,
    props: RootCell<PageProps>,
    resources: Rc<PageResources>,
    editor: DerivedCell<Option<ChartEditor>>,
    preview: Rc<DiscreteBarChart>,
    requested: Cell<u64>,
    _persist_preview_mode: Disposer,
    _sync_preview: Disposer,
}

impl fmt::Debug for ChartEditorPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartEditorPage")
            .field("props", &self.props)
            .field("requested", &self.requested.get())
            .finish_non_exhaustive()
    }
}

impl ChartEditorPage {
    /// Mounts the page: restores the preview mode, registers its
    /// persistence and wires the preview chart. Resources start unloaded.
    pub fn new(
        graph: &Graph,
        props: PageProps,
        preferences: Rc<dyn PreferenceStore>,
        measurer: Rc<dyn TextMeasurer>,
    ) -> ChartResult<Self> {
        let preview_mode = PreviewMode::load(preferences.as_ref());
        let resources = Rc::new(PageResources {
            chart: graph.root("editor.chart", None),
            database: graph.root("editor.database", None),
            logs: graph.root("editor.logs", None),
            preview_mode: graph.root("editor.preview_mode", preview_mode),
        });

        let editor = {
            let resources = Rc::clone(&resources);
            graph.derived("editor.editor", move || {
                if !resources.is_complete() {
                    return Ok(None);
                }
                let shared: Rc<dyn EditorResources> = resources.clone();
                Ok(Some(ChartEditor::new(shared)))
            })
        };

        let persisted_mode = {
            let editor = editor.clone();
            graph.derived("editor.persisted_preview_mode", move || {
                Ok(editor.get()?.map(|editor| editor.preview_mode()))
            })
        };
        let persist_preview_mode = graph.observe(&persisted_mode, move |mode| {
            if let Ok(Some(mode)) = mode {
                if let Err(err) = preferences.set(PREVIEW_MODE_KEY, mode.as_str()) {
                    warn!(error = %err, %mode, "failed to persist preview mode");
                }
            }
        });

        let preview = Rc::new(DiscreteBarChart::new(
            graph,
            Default::default(),
            Vec::new(),
            preview_mode.bounds(),
            measurer,
        )?);
        let sync_preview = {
            let resources = Rc::clone(&resources);
            let preview = Rc::clone(&preview);
            graph.autorun("editor.sync_preview", move || {
                let bounds = resources.preview_mode.get().bounds();
                let chart = resources.chart.get();
                preview.graph().run_action(|| {
                    if let Err(err) = preview.set_bounds(bounds) {
                        warn!(error = %err, "preview bounds rejected");
                    }
                    if let Some(chart) = chart {
                        if let Err(err) = preview.replace_inputs(chart.config, chart.data) {
                            warn!(error = %err, "chart document rejected by the preview");
                        }
                    }
                });
            })
        };

        Ok(Self {
            graph: graph.clone(),
            props: graph.root("editor.props", props),
            resources,
            editor,
            preview,
            requested: Cell::new(0),
            _persist_preview_mode: persist_preview_mode,
            _sync_preview: sync_preview,
        })
    }

    #[must_use]
    pub fn props(&self) -> PageProps {
        self.props.get()
    }

    /// Editor over the loaded resources; `None` while any is missing.
    pub fn editor(&self) -> ChartResult<Option<ChartEditor>> {
        self.editor.get()
    }

    #[must_use]
    pub fn editor_cell(&self) -> &DerivedCell<Option<ChartEditor>> {
        &self.editor
    }

    /// Whether the page should show its loading state.
    pub fn is_loading(&self) -> ChartResult<bool> {
        Ok(self.editor()?.is_none())
    }

    #[must_use]
    pub fn preview(&self) -> &DiscreteBarChart {
        &self.preview
    }

    #[must_use]
    pub fn preview_mode(&self) -> PreviewMode {
        self.resources.preview_mode.get()
    }

    /// Number of refreshes requested so far.
    #[must_use]
    pub fn requested_generation(&self) -> u64 {
        self.requested.get()
    }

    /// Switches to other props and reloads everything.
    pub async fn navigate(&self, props: PageProps, source: &dyn DocumentSource) -> ChartResult<()> {
        self.props.set(props);
        self.refresh(source).await
    }

    /// Reloads all three resources.
    ///
    /// Resources are cleared together, fetched concurrently and applied
    /// together only if every fetch succeeded; the first failure is returned
    /// and leaves the editor undefined. A refresh that resolves after a newer
    /// one was requested still applies its results.
    pub async fn refresh(&self, source: &dyn DocumentSource) -> ChartResult<()> {
        let generation = self.requested.get() + 1;
        self.requested.set(generation);
        let props = self.props.get();
        debug!(generation, chart_id = ?props.chart_id, "refreshing editor resources");

        self.graph.run_action(|| {
            self.resources.chart.set(None);
            self.resources.database.set(None);
            self.resources.logs.set(None);
        });

        let (chart, database, logs) = tokio::join!(
            fetch_chart(source, &props),
            fetch_typed::<EditorDatabase>(source, NAMESPACES_URL, "editor database"),
            fetch_logs(source, &props),
        );
        let (chart, database, logs) = match (chart, database, logs) {
            (Ok(chart), Ok(database), Ok(logs)) => (chart, database, logs),
            (Err(err), _, _) | (_, Err(err), _) | (_, _, Err(err)) => {
                warn!(generation, error = %err, "editor refresh failed");
                return Err(err);
            }
        };

        let latest = self.requested.get();
        if generation < latest {
            warn!(generation, latest, "applying resources of a superseded refresh");
        }

        self.graph.run_action(|| {
            self.resources.chart.set(Some(chart));
            self.resources.database.set(Some(database));
            self.resources.logs.set(Some(logs));
        });
        debug!(generation, "editor resources loaded");
        Ok(())
    }
}

async fn fetch_chart(source: &dyn DocumentSource, props: &PageProps) -> ChartResult<ChartDocument> {
    match props.chart_id {
        Some(chart_id) => {
            let url = chart_config_url(chart_id);
            fetch_typed(source, &url, "chart document").await
        }
        None => Ok(props.new_chart.clone()),
    }
}

async fn fetch_logs(source: &dyn DocumentSource, props: &PageProps) -> ChartResult<Vec<LogEntry>> {
    match props.chart_id {
        Some(chart_id) => {
            let url = chart_logs_url(chart_id);
            let document: LogsDocument = fetch_typed(source, &url, "revision log").await?;
            Ok(document.logs)
        }
        None => Ok(Vec::new()),
    }
}
