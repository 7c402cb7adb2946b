use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Lifecycle state of a pipeline node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    InProgress,
    Completed,
    Error,
}

impl NodeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, NodeStatus::Completed | NodeStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeStatus::Pending => "pending",
            NodeStatus::InProgress => "in_progress",
            NodeStatus::Completed => "completed",
            NodeStatus::Error => "error",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of step a node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    DataFetch,
    Analysis,
    Decision,
    Inference,
    Validation,
    Spawn,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::DataFetch => "data_fetch",
            NodeType::Analysis => "analysis",
            NodeType::Decision => "decision",
            NodeType::Inference => "inference",
            NodeType::Validation => "validation",
            NodeType::Spawn => "spawn",
        }
    }

    /// Short badge shown in the node header
    pub fn icon(self) -> &'static str {
        match self {
            NodeType::DataFetch => "DATA",
            NodeType::Analysis => "ANALYZE",
            NodeType::Decision => "DECIDE",
            NodeType::Inference => "INFER",
            NodeType::Validation => "VALIDATE",
            NodeType::Spawn => "SPAWN",
        }
    }

    /// Human label, e.g. "DATA FETCH"
    pub fn label(self) -> String {
        self.as_str().replace('_', " ").to_uppercase()
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One simulated pipeline step, as shown in the visualization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentNode {
    pub id: String,
    pub label: String,
    pub description: String,
    pub status: NodeStatus,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub children_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl AgentNode {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
        node_type: NodeType,
        status: NodeStatus,
        data: Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            label: label.into(),
            description: description.into(),
            status,
            node_type,
            data,
            children_ids: Vec::new(),
            created_at: now,
            completed_at: (status == NodeStatus::Completed).then_some(now),
        }
    }

    /// A step that already finished successfully
    pub fn completed(
        id: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
        node_type: NodeType,
        data: Value,
    ) -> Self {
        Self::new(id, label, description, node_type, NodeStatus::Completed, data)
    }

    /// A step that has started but not resolved yet
    pub fn started(
        id: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
        node_type: NodeType,
    ) -> Self {
        Self::new(
            id,
            label,
            description,
            node_type,
            NodeStatus::InProgress,
            Value::Object(Default::default()),
        )
    }

    /// A step that failed; the error text is kept in `data.error`
    pub fn failed(
        id: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
        node_type: NodeType,
        error: &str,
    ) -> Self {
        Self::new(
            id,
            label,
            description,
            node_type,
            NodeStatus::Error,
            serde_json::json!({ "error": error }),
        )
    }

    pub fn with_children(mut self, children: Vec<String>) -> Self {
        self.children_ids = children;
        self
    }

    /// Wall time between creation and completion, if completed
    pub fn duration(&self) -> Option<Duration> {
        self.completed_at
            .and_then(|done| (done - self.created_at).to_std().ok())
    }
}

/// Append-only list of pipeline nodes.
///
/// Nodes are never removed or reordered; the only in-place change is a
/// status patch by id through [`NodeList::mark`]. [`NodeList::clear`] drops
/// everything on reset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeList {
    nodes: Vec<AgentNode>,
}

impl NodeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: AgentNode) {
        self.nodes.push(node);
    }

    /// Patch a node's status by id. Terminal states stamp `completed_at`.
    /// Returns false when no node has that id.
    pub fn mark(&mut self, id: &str, status: NodeStatus) -> bool {
        match self.nodes.iter_mut().find(|n| n.id == id) {
            Some(node) => {
                node.status = status;
                if status.is_terminal() {
                    node.completed_at = Some(Utc::now());
                }
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn get(&self, id: &str) -> Option<&AgentNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AgentNode> {
        self.nodes.iter()
    }

    pub fn as_slice(&self) -> &[AgentNode] {
        &self.nodes
    }

    pub fn completed_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.status == NodeStatus::Completed)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.status == NodeStatus::Error)
            .count()
    }

    /// Fraction of nodes that completed, 0.0 for an empty list
    pub fn progress_ratio(&self) -> f64 {
        if self.nodes.is_empty() {
            0.0
        } else {
            self.completed_count() as f64 / self.nodes.len() as f64
        }
    }

    /// (type, completed, total) per node type, in first-appearance order
    pub fn type_summary(&self) -> Vec<(NodeType, usize, usize)> {
        let mut summary: Vec<(NodeType, usize, usize)> = Vec::new();
        for node in &self.nodes {
            let completed = usize::from(node.status == NodeStatus::Completed);
            match summary.iter_mut().find(|(t, _, _)| *t == node.node_type) {
                Some(entry) => {
                    entry.1 += completed;
                    entry.2 += 1;
                }
                None => summary.push((node.node_type, completed, 1)),
            }
        }
        summary
    }
}

impl<'a> IntoIterator for &'a NodeList {
    type Item = &'a AgentNode;
    type IntoIter = std::slice::Iter<'a, AgentNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

impl Default for DateRange {
    fn default() -> Self {
        Self {
            start_date: "2024-01-01".to_string(),
            end_date: "2024-12-31".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestigationFeatures {
    pub langchain_analysis: bool,
    pub claude_ai: bool,
    pub real_time_search: bool,
    pub multi_dimensional: bool,
}

impl Default for InvestigationFeatures {
    fn default() -> Self {
        Self {
            langchain_analysis: true,
            claude_ai: true,
            real_time_search: true,
            multi_dimensional: true,
        }
    }
}

/// Record of one investigation, created once and never modified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationData {
    pub investigation_id: String,
    pub symbol: String,
    pub status: String,
    #[serde(default)]
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub date_range: DateRange,
    #[serde(default)]
    pub features: InvestigationFeatures,
    #[serde(default)]
    pub note: String,
}

/// The three analyst streams run by every investigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    NewsSentiment,
    EarningsImpact,
    MarketContext,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 3] = [
        AnalysisType::NewsSentiment,
        AnalysisType::EarningsImpact,
        AnalysisType::MarketContext,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisType::NewsSentiment => "news_sentiment",
            AnalysisType::EarningsImpact => "earnings_impact",
            AnalysisType::MarketContext => "market_context",
        }
    }

    /// e.g. "NEWS SENTIMENT"
    pub fn label(self) -> String {
        self.as_str().replace('_', " ").to_uppercase()
    }

    /// Route serving this analysis
    pub fn route(self) -> &'static str {
        match self {
            AnalysisType::NewsSentiment => "/api/claude-news-analysis",
            AnalysisType::EarningsImpact => "/api/claude-earnings-analysis",
            AnalysisType::MarketContext => "/api/claude-market-analysis",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarningsScenario {
    Beat,
    Miss,
    Meet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketScenario {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn from_change(change: f64) -> Self {
        if change > 0.0 { Direction::Up } else { Direction::Down }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
