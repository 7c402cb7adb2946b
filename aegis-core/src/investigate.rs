use crate::model::{
    AgentNode, AnalysisType, DateRange, InvestigationData, NodeList, NodeStatus, NodeType,
};
use aegis_client::ApiClient;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_STAGGER_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);
/// Deadline for runs against slow or proxied backends
pub const LONG_DEADLINE: Duration = Duration::from_secs(120);

/// Options for one investigation run
#[derive(Debug, Clone)]
pub struct InvestigationOptions {
    pub symbol: String,
    pub date_range: DateRange,
    pub initial_delay: Duration,
    pub stagger_delay: Duration,
    pub deadline: Duration,
}

impl InvestigationOptions {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            date_range: DateRange::default(),
            initial_delay: DEFAULT_INITIAL_DELAY,
            stagger_delay: DEFAULT_STAGGER_DELAY,
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = date_range;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Skip the artificial pauses between steps
    pub fn fast(mut self) -> Self {
        self.initial_delay = Duration::ZERO;
        self.stagger_delay = Duration::ZERO;
        self
    }
}

/// Progress notifications for live rendering
#[derive(Debug, Clone)]
pub enum InvestigationEvent {
    NodeAdded(AgentNode),
    NodeUpdated { id: String, status: NodeStatus },
    Log(String),
    Complete {
        completed: usize,
        errors: usize,
        timed_out: bool,
    },
}

/// Callback for plain-text progress lines
pub type InvestigationProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Snapshot of a finished (or reset) run
#[derive(Debug, Clone, Default)]
pub struct InvestigationOutcome {
    pub nodes: NodeList,
    pub investigation: Option<InvestigationData>,
    pub timed_out: bool,
}

impl InvestigationOutcome {
    /// Verdict payload from the master inference node, if it completed
    pub fn inference(&self) -> Option<&Value> {
        self.nodes
            .get("master-inference")
            .filter(|n| n.status == NodeStatus::Completed)
            .map(|n| &n.data)
    }
}

/// Shared state touched by the pipeline task
#[derive(Clone)]
struct Pipeline {
    client: ApiClient,
    nodes: Arc<Mutex<NodeList>>,
    investigation: Arc<Mutex<Option<InvestigationData>>>,
    loading: Arc<AtomicBool>,
    events: Option<UnboundedSender<InvestigationEvent>>,
    progress: Option<InvestigationProgressCallback>,
}

impl Pipeline {
    fn emit(&self, event: InvestigationEvent) {
        if let Some(ref tx) = self.events {
            // Receiver gone means nobody is watching
            let _ = tx.send(event);
        }
    }

    fn log(&self, message: String) {
        debug!("{}", message);
        if let Some(ref callback) = self.progress {
            callback(message.clone());
        }
        self.emit(InvestigationEvent::Log(message));
    }

    async fn push(&self, node: AgentNode) {
        self.nodes.lock().await.push(node.clone());
        self.emit(InvestigationEvent::NodeAdded(node));
    }

    async fn mark(&self, id: &str, status: NodeStatus) {
        if self.nodes.lock().await.mark(id, status) {
            self.emit(InvestigationEvent::NodeUpdated {
                id: id.to_string(),
                status,
            });
        }
    }

    async fn execute(self, options: InvestigationOptions) -> bool {
        self.loading.store(true, Ordering::SeqCst);
        self.nodes.lock().await.clear();
        *self.investigation.lock().await = None;

        info!("Starting investigation of {}", options.symbol);

        let timed_out = match tokio::time::timeout(options.deadline, self.run_steps(&options)).await
        {
            Ok(()) => false,
            Err(_) => {
                warn!(
                    "Investigation of {} exceeded {}s deadline",
                    options.symbol,
                    options.deadline.as_secs()
                );
                let in_flight: Vec<String> = self
                    .nodes
                    .lock()
                    .await
                    .iter()
                    .filter(|n| n.status == NodeStatus::InProgress)
                    .map(|n| n.id.clone())
                    .collect();
                for id in &in_flight {
                    self.mark(id, NodeStatus::Error).await;
                }
                self.push(AgentNode::failed(
                    "timeout",
                    "Investigation Timeout",
                    format!(
                        "Investigation of {} did not finish within {}s",
                        options.symbol,
                        options.deadline.as_secs()
                    ),
                    NodeType::Analysis,
                    "deadline exceeded",
                ))
                .await;
                true
            }
        };

        self.loading.store(false, Ordering::SeqCst);

        let (completed, errors) = {
            let nodes = self.nodes.lock().await;
            (nodes.completed_count(), nodes.error_count())
        };
        self.log(format!(
            "Investigation finished: {} completed, {} errors",
            completed, errors
        ));
        self.emit(InvestigationEvent::Complete {
            completed,
            errors,
            timed_out,
        });
        timed_out
    }

    async fn fail_run(&self, symbol: &str, error: &str) {
        self.log(format!("[!] Investigation of {} failed: {}", symbol, error));
        self.push(AgentNode::failed(
            "error",
            "Investigation Error: Process Failed",
            format!("Failed to investigate {}: {}", symbol, error),
            NodeType::Analysis,
            error,
        ))
        .await;
    }

    async fn run_steps(&self, options: &InvestigationOptions) {
        let symbol = options.symbol.as_str();

        // Validation
        self.log(format!("Validating {}...", symbol));
        let validation = match self.client.validate_stock(symbol).await {
            Ok(resp) => resp.body,
            Err(e) => return self.fail_run(symbol, &e.to_string()).await,
        };
        let price = validation["current_price"].as_f64();
        let change_percent = validation["change_percent"].as_f64();
        self.push(AgentNode::completed(
            "validation",
            "Stock Validation Complete",
            format!(
                "{} validated - Current Price: ${:.2}, Change: {:.2}%",
                symbol,
                price.unwrap_or_default(),
                change_percent.unwrap_or_default()
            ),
            NodeType::Validation,
            validation.clone(),
        ))
        .await;

        // Investigation record
        let investigation = match self
            .client
            .investigate(
                symbol,
                &options.date_range.start_date,
                &options.date_range.end_date,
            )
            .await
            .and_then(|resp| resp.json::<InvestigationData>())
        {
            Ok(data) => data,
            Err(e) => return self.fail_run(symbol, &e.to_string()).await,
        };
        self.log(format!(
            "Investigation {} started",
            investigation.investigation_id
        ));
        let children: Vec<String> = AnalysisType::ALL
            .iter()
            .map(|t| format!("spawn-{}", t))
            .collect();
        self.push(
            AgentNode::completed(
                "investigation-start",
                "Agent Decision: Begin Comprehensive Analysis",
                format!(
                    "AI agents initiated multi-dimensional investigation of {} across news sentiment, earnings data, and market context",
                    symbol
                ),
                NodeType::Spawn,
                serde_json::to_value(&investigation).unwrap_or_default(),
            )
            .with_children(children),
        )
        .await;
        *self.investigation.lock().await = Some(investigation.clone());

        tokio::time::sleep(options.initial_delay).await;

        // Analysts, one after another
        let mut findings: Vec<String> = Vec::new();
        let mut context = Map::new();

        for (idx, analysis) in AnalysisType::ALL.iter().copied().enumerate() {
            if idx > 0 {
                tokio::time::sleep(options.stagger_delay).await;
            }

            let spawn_id = format!("spawn-{}", analysis);
            let label = analysis.label();
            self.push(AgentNode::started(
                spawn_id.clone(),
                format!("Agent Spawn: {}", label),
                format!("Dispatching {} analyst for {}", label.to_lowercase(), symbol),
                NodeType::Spawn,
            ))
            .await;
            self.log(format!("Running {} analysis...", label.to_lowercase()));

            match self
                .client
                .analyze(analysis.route(), &json!({ "symbol": symbol }))
                .await
            {
                Ok(resp) => {
                    self.mark(&spawn_id, NodeStatus::Completed).await;
                    let body = resp.body;
                    let confidence = body["confidence_score"].as_f64().unwrap_or_default();
                    if let Some(text) = body["raw_analysis"].as_str() {
                        findings.push(text.to_string());
                    }
                    self.push(AgentNode::completed(
                        format!("analysis-{}", analysis),
                        format!("{} Analysis Complete", label),
                        format!(
                            "Analyzed {} {} - Confidence Score: {:.1}/10",
                            symbol,
                            label.to_lowercase(),
                            confidence
                        ),
                        NodeType::Analysis,
                        body.clone(),
                    ))
                    .await;
                    context.insert(analysis.as_str().to_string(), body);
                }
                Err(e) => {
                    warn!("{} analysis failed for {}: {}", analysis, symbol, e);
                    self.mark(&spawn_id, NodeStatus::Error).await;
                    self.push(AgentNode::failed(
                        format!("error-{}", analysis),
                        format!("{} Analysis Failed", label),
                        format!("{} analysis encountered an issue: {}", label, e),
                        NodeType::Analysis,
                        &e.to_string(),
                    ))
                    .await;
                }
            }
        }

        // Master inference
        self.log("Running master inference...".to_string());
        let mut price_data = json!({ "current_price": price });
        if let Some(change) = change_percent {
            price_data["price_change_percent"] = json!(change);
        }
        let body = json!({
            "symbol": symbol,
            "allFindings": findings,
            "priceData": price_data,
            "investigationData": Value::Object(context),
        });

        match self.client.master_inference(&body).await {
            Ok(resp) => {
                let verdict = resp.body;
                let recommendation = verdict["recommendation"].as_str().unwrap_or("n/a");
                let confidence = verdict["confidence_score"].as_f64().unwrap_or_default();
                self.push(AgentNode::completed(
                    "master-inference",
                    "Master Inference: Root Cause Identified",
                    format!("{} ({:.1}/10 confidence)", recommendation, confidence),
                    NodeType::Inference,
                    verdict.clone(),
                ))
                .await;
            }
            Err(e) => {
                warn!("Master inference failed for {}: {}", symbol, e);
                self.push(AgentNode::failed(
                    "error-master-inference",
                    "Master Inference Failed",
                    format!("Master inference encountered an issue: {}", e),
                    NodeType::Inference,
                    &e.to_string(),
                ))
                .await;
            }
        }
    }
}

/// One investigation at a time against a single API.
///
/// Runs either inline ([`InvestigationSession::run`]) or as a background
/// task ([`InvestigationSession::start`]) that [`InvestigationSession::reset`]
/// can abort.
pub struct InvestigationSession {
    pipeline: Pipeline,
    task: Option<JoinHandle<bool>>,
}

impl InvestigationSession {
    pub fn new(client: ApiClient) -> Self {
        Self {
            pipeline: Pipeline {
                client,
                nodes: Arc::new(Mutex::new(NodeList::new())),
                investigation: Arc::new(Mutex::new(None)),
                loading: Arc::new(AtomicBool::new(false)),
                events: None,
                progress: None,
            },
            task: None,
        }
    }

    pub fn with_event_sender(mut self, tx: UnboundedSender<InvestigationEvent>) -> Self {
        self.pipeline.events = Some(tx);
        self
    }

    pub fn with_progress_callback(mut self, callback: InvestigationProgressCallback) -> Self {
        self.pipeline.progress = Some(callback);
        self
    }

    pub fn is_loading(&self) -> bool {
        self.pipeline.loading.load(Ordering::SeqCst)
    }

    pub async fn nodes(&self) -> NodeList {
        self.pipeline.nodes.lock().await.clone()
    }

    pub async fn investigation(&self) -> Option<InvestigationData> {
        self.pipeline.investigation.lock().await.clone()
    }

    async fn snapshot(&self, timed_out: bool) -> InvestigationOutcome {
        InvestigationOutcome {
            nodes: self.nodes().await,
            investigation: self.investigation().await,
            timed_out,
        }
    }

    /// Run to completion on the current task
    pub async fn run(&mut self, options: InvestigationOptions) -> InvestigationOutcome {
        self.abort();
        let timed_out = self.pipeline.clone().execute(options).await;
        self.snapshot(timed_out).await
    }

    /// Spawn the run in the background. A run already in flight is aborted.
    pub fn start(&mut self, options: InvestigationOptions) {
        self.abort();
        // Flag is raised here so callers polling right after start see it
        self.pipeline.loading.store(true, Ordering::SeqCst);
        self.task = Some(tokio::spawn(self.pipeline.clone().execute(options)));
    }

    /// Wait for a background run. Returns the current state if none is running.
    pub async fn wait(&mut self) -> InvestigationOutcome {
        let timed_out = match self.task.take() {
            Some(handle) => handle.await.unwrap_or(false),
            None => false,
        };
        self.snapshot(timed_out).await
    }

    fn abort(&mut self) {
        if let Some(handle) = self.task.take() {
            handle.abort();
        }
    }

    /// Abort any running pipeline and forget its results
    pub async fn reset(&mut self) {
        self.abort();
        self.pipeline.nodes.lock().await.clear();
        *self.pipeline.investigation.lock().await = None;
        self.pipeline.loading.store(false, Ordering::SeqCst);
        debug!("Investigation session reset");
    }
}
