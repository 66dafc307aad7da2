use std::rc::Rc;

use async_trait::async_trait;
use chart_studio::api::ChartConfig;
use chart_studio::ChartError;
use chart_studio::core::{Bounds, DiscreteBarDatum, HeuristicTextMeasurer};
use chart_studio::editor::{
    ChartDocument, ChartEditorPage, DocumentSource, MemoryPreferenceStore, NAMESPACES_URL,
    PREVIEW_MODE_KEY, PageProps, PreferenceStore, PreviewMode, StaticDocumentSource,
    chart_config_url, chart_logs_url,
};
use chart_studio::reactive::Graph;
use serde_json::{Value, json};

fn source_for(chart_id: u64) -> StaticDocumentSource {
    StaticDocumentSource::new()
        .with_document(
            chart_config_url(chart_id),
            json!({
                "id": chart_id,
                "config": {"title": "Life expectancy", "base_font_size": 14},
                "data": [
                    {"key": "fr", "label": "France", "value": 82.5},
                    {"key": "ng", "label": "Nigeria", "value": 54.7}
                ]
            }),
        )
        .with_document(
            NAMESPACES_URL,
            json!({"namespaces": [{"name": "owid", "description": "Main", "is_archived": false}]}),
        )
        .with_document(
            chart_logs_url(chart_id),
            json!({"logs": [{
                "user_id": 1,
                "user_name": "Editor",
                "config": {},
                "created_at": "2024-05-01T09:30:00Z"
            }]}),
        )
}

fn page(props: PageProps, store: Rc<MemoryPreferenceStore>) -> ChartEditorPage {
    ChartEditorPage::new(&Graph::new(), props, store, Rc::new(HeuristicTextMeasurer))
        .expect("page init")
}

#[tokio::test]
async fn editor_appears_once_all_resources_loaded() {
    let store = Rc::new(MemoryPreferenceStore::new());
    let page = page(PageProps::existing(42), store);
    assert!(page.is_loading().expect("loading"));

    let source = source_for(42);
    page.refresh(&source).await.expect("refresh");

    assert!(!page.is_loading().expect("loading"));
    let editor = page.editor().expect("editor").expect("editor ready");
    let chart = editor.chart().expect("chart");
    assert_eq!(chart.id, Some(42));
    assert_eq!(chart.config.title, "Life expectancy");
    assert!(!editor.is_new_chart());
    assert_eq!(editor.database().expect("database").namespaces.len(), 1);
    assert_eq!(editor.logs().expect("logs").len(), 1);
    assert_eq!(source.fetch_count(), 3);
}

#[tokio::test]
async fn preview_follows_the_loaded_chart() {
    let store = Rc::new(MemoryPreferenceStore::new());
    let page = page(PageProps::existing(7), store);
    assert!(page.preview().layout().expect("layout").is_no_data());

    page.refresh(&source_for(7)).await.expect("refresh");

    let preview = page.preview();
    assert_eq!(preview.config().base_font_size, 14.0);
    assert_eq!(preview.outer_bounds(), Bounds::new(0.0, 0.0, 800.0, 600.0));
    let layout = preview.layout().expect("layout");
    assert_eq!(layout.bars().map(|bars| bars.rows.len()), Some(2));
}

#[tokio::test]
async fn new_chart_skips_chart_and_log_fetches() {
    let store = Rc::new(MemoryPreferenceStore::new());
    let document = ChartDocument::new(
        ChartConfig::default(),
        vec![DiscreteBarDatum::new("x", "X", 1.0)],
    );
    let page = page(PageProps::new_chart(document), store);

    let source = StaticDocumentSource::new().with_document(NAMESPACES_URL, json!({"namespaces": []}));
    page.refresh(&source).await.expect("refresh");

    let editor = page.editor().expect("editor").expect("editor ready");
    assert!(editor.is_new_chart());
    assert_eq!(editor.logs(), Some(Vec::new()));
    assert_eq!(source.fetch_count(), 1);
    assert_eq!(page.preview().dataset().len(), 1);
}

#[tokio::test]
async fn failed_fetch_leaves_the_editor_undefined() {
    let store = Rc::new(MemoryPreferenceStore::new());
    let page = page(PageProps::existing(3), store);

    let source = source_for(3);
    page.refresh(&source).await.expect("first refresh");
    assert!(page.editor().expect("editor").is_some());

    source.remove(&chart_logs_url(3));
    let err = page.refresh(&source).await.expect_err("missing logs");
    assert!(matches!(err, ChartError::Fetch { .. }));
    assert!(page.is_loading().expect("loading"));
}

#[tokio::test]
async fn malformed_document_is_a_decode_error() {
    let store = Rc::new(MemoryPreferenceStore::new());
    let page = page(PageProps::existing(5), store);

    let source = source_for(5);
    source.insert(NAMESPACES_URL, json!({"namespaces": "nope"}));
    let err = page.refresh(&source).await.expect_err("bad namespaces");
    assert!(matches!(err, ChartError::Decode { what: "editor database", .. }));
    assert!(page.editor().expect("editor").is_none());
}

#[tokio::test]
async fn preview_mode_is_restored_and_persisted() {
    let store = Rc::new(MemoryPreferenceStore::new());
    store.set(PREVIEW_MODE_KEY, "mobile").expect("seed");

    let page = page(PageProps::existing(9), Rc::clone(&store));
    assert_eq!(page.preview_mode(), PreviewMode::Mobile);
    assert_eq!(page.preview().outer_bounds(), Bounds::new(0.0, 0.0, 360.0, 500.0));

    page.refresh(&source_for(9)).await.expect("refresh");
    let editor = page.editor().expect("editor").expect("editor ready");

    editor.set_preview_mode(PreviewMode::Desktop);
    assert_eq!(
        store.get(PREVIEW_MODE_KEY).expect("get").as_deref(),
        Some("desktop")
    );
    assert_eq!(editor.preview_bounds(), Bounds::new(0.0, 0.0, 800.0, 600.0));
    assert_eq!(page.preview().outer_bounds(), Bounds::new(0.0, 0.0, 800.0, 600.0));
}

#[tokio::test]
async fn navigating_refetches_everything() {
    let store = Rc::new(MemoryPreferenceStore::new());
    let page = page(PageProps::existing(1), store);

    let source = source_for(1);
    page.refresh(&source).await.expect("refresh");

    let other = source_for(2);
    page.navigate(PageProps::existing(2), &other).await.expect("navigate");
    let chart = page.editor().expect("editor").and_then(|editor| editor.chart());
    assert_eq!(chart.and_then(|chart| chart.id), Some(2));
    assert_eq!(page.requested_generation(), 2);
}

/// Serves documents only after yielding to the runtime a few times.
struct SlowSource {
    inner: StaticDocumentSource,
    yields: usize,
}

#[async_trait(?Send)]
impl DocumentSource for SlowSource {
    async fn fetch_document(&self, url: &str) -> Result<Value, ChartError> {
        for _ in 0..self.yields {
            tokio::task::yield_now().await;
        }
        self.inner.fetch_document(url).await
    }
}

#[tokio::test]
async fn superseded_refresh_still_applies_when_it_resolves_last() {
    let store = Rc::new(MemoryPreferenceStore::new());
    let page = page(PageProps::existing(1), store);

    let slow = SlowSource {
        inner: source_for(1),
        yields: 8,
    };
    let fast = source_for(1);
    fast.insert(
        chart_config_url(1),
        json!({"id": 1, "config": {"title": "newer"}, "data": []}),
    );

    let (slow_result, fast_result) = tokio::join!(page.refresh(&slow), page.refresh(&fast));
    slow_result.expect("slow refresh");
    fast_result.expect("fast refresh");

    let editor = page.editor().expect("editor").expect("editor ready");
    assert_eq!(editor.chart().map(|chart| chart.config.title), Some("Life expectancy".to_owned()));
}
