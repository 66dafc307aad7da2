use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::ChartConfig;
use crate::core::DiscreteBarDatum;

pub const NAMESPACES_URL: &str = "/api/editorData/namespaces.json";

#[must_use]
pub fn chart_config_url(chart_id: u64) -> String {
    format!("/api/charts/{chart_id}.config.json")
}

#[must_use]
pub fn chart_logs_url(chart_id: u64) -> String {
    format!("/api/charts/{chart_id}.logs.json")
}

/// Chart configuration document together with the rows it plots.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartDocument {
    /// `None` until the chart is first saved.
    pub id: Option<u64>,
    pub config: ChartConfig,
    pub data: Vec<DiscreteBarDatum>,
}

impl ChartDocument {
    #[must_use]
    pub fn new(config: ChartConfig, data: Vec<DiscreteBarDatum>) -> Self {
        Self {
            id: None,
            config,
            data,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_archived: bool,
}

/// Dataset namespaces available to the editor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EditorDatabase {
    #[serde(default)]
    pub namespaces: Vec<NamespaceEntry>,
}

impl EditorDatabase {
    pub fn active_namespaces(&self) -> impl Iterator<Item = &NamespaceEntry> {
        self.namespaces.iter().filter(|entry| !entry.is_archived)
    }

    #[must_use]
    pub fn namespace(&self, name: &str) -> Option<&NamespaceEntry> {
        self.namespaces.iter().find(|entry| entry.name == name)
    }
}

/// One saved revision of a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub user_id: u64,
    pub user_name: String,
    /// Configuration as saved; kept raw because older revisions may not
    /// match the current schema.
    #[serde(default)]
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LogsDocument {
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}
