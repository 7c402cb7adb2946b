use aegis_core::investigate::InvestigationEvent;
use aegis_core::model::{AgentNode, NodeList, NodeStatus};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Wrap},
};
use std::io;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::mpsc;

const ARROW: &str = " ─▶ ";
const MAX_LOGS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

fn status_style(status: NodeStatus) -> (&'static str, Color) {
    match status {
        NodeStatus::Pending => ("○", Color::DarkGray),
        NodeStatus::InProgress => ("◐", Color::Yellow),
        NodeStatus::Completed => ("✓", Color::Green),
        NodeStatus::Error => ("✗", Color::Red),
    }
}

fn node_text(node: &AgentNode) -> String {
    let (icon, _) = status_style(node.status);
    format!(" {} {} ", icon, node.label)
}

/// Split the graph into rows that fit `width` columns. Each row holds node
/// indices in pipeline order; a node wider than the row gets a row to itself.
pub fn graph_rows(nodes: &[AgentNode], width: usize) -> Vec<Vec<usize>> {
    let arrow = ARROW.chars().count();
    let mut rows: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut used = 0;

    for (idx, node) in nodes.iter().enumerate() {
        let w = node_text(node).chars().count();
        let needed = if current.is_empty() { w } else { arrow + w };
        if !current.is_empty() && used + needed > width {
            rows.push(std::mem::take(&mut current));
            used = 0;
        }
        used += if current.is_empty() { w } else { arrow + w };
        current.push(idx);
    }
    if !current.is_empty() {
        rows.push(current);
    }
    rows
}

/// TUI state for a running investigation
pub struct InvestigationMonitor {
    symbol: String,
    nodes: NodeList,
    selected_node: Option<usize>,
    logs: Vec<(LogLevel, String)>,
    scroll_logs: usize,
    status_message: String,
    is_complete: bool,
    rx: mpsc::UnboundedReceiver<InvestigationEvent>,
}

impl InvestigationMonitor {
    pub fn new(rx: mpsc::UnboundedReceiver<InvestigationEvent>, symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            nodes: NodeList::new(),
            selected_node: None,
            logs: Vec::new(),
            scroll_logs: 0,
            status_message: format!("Investigating {}...", symbol),
            is_complete: false,
            rx,
        }
    }

    pub fn nodes(&self) -> &NodeList {
        &self.nodes
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.logs.push((level, message.into()));
        if self.logs.len() > MAX_LOGS {
            self.logs.drain(0..self.logs.len() - MAX_LOGS);
        }
    }

    /// Drain pending events without blocking
    pub fn process_messages(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.apply(event);
        }
    }

    fn apply(&mut self, event: InvestigationEvent) {
        match event {
            InvestigationEvent::NodeAdded(node) => {
                // A fresh validation node means the session was rerun
                if node.id == "validation" && !self.nodes.is_empty() {
                    self.nodes.clear();
                    self.selected_node = None;
                    self.is_complete = false;
                }
                if node.status == NodeStatus::Error {
                    self.log(LogLevel::Error, format!("{}: {}", node.label, node.description));
                }
                self.nodes.push(node);
            }
            InvestigationEvent::NodeUpdated { id, status } => {
                self.nodes.mark(&id, status);
                if status == NodeStatus::Error {
                    self.log(LogLevel::Error, format!("{} failed", id));
                }
            }
            InvestigationEvent::Log(message) => {
                self.log(LogLevel::Info, message);
            }
            InvestigationEvent::Complete {
                completed,
                errors,
                timed_out,
            } => {
                self.is_complete = true;
                self.status_message = if timed_out {
                    format!(
                        "Timed out: {} steps completed, {} errors",
                        completed, errors
                    )
                } else {
                    format!(
                        "Investigation complete! {} steps completed, {} errors",
                        completed, errors
                    )
                };
                let level = if timed_out || errors > 0 {
                    LogLevel::Warn
                } else {
                    LogLevel::Info
                };
                let message = self.status_message.clone();
                self.log(level, message);
            }
        }
    }

    fn select_prev(&mut self) {
        if self.nodes.is_empty() {
            return;
        }
        self.selected_node = Some(match self.selected_node {
            Some(selected) => selected.saturating_sub(1),
            None => self.nodes.len() - 1,
        });
    }

    fn select_next(&mut self) {
        if self.nodes.is_empty() {
            return;
        }
        self.selected_node = Some(match self.selected_node {
            Some(selected) => (selected + 1).min(self.nodes.len() - 1),
            None => 0,
        });
    }

    /// Dump the selected node into the log panel
    fn show_details(&mut self) {
        let Some(node) = self
            .selected_node
            .and_then(|idx| self.nodes.as_slice().get(idx))
            .cloned()
        else {
            return;
        };

        let level = match node.status {
            NodeStatus::Error => LogLevel::Error,
            NodeStatus::InProgress | NodeStatus::Pending => LogLevel::Warn,
            NodeStatus::Completed => LogLevel::Info,
        };
        self.log(LogLevel::Info, "");
        self.log(level, format!("── {} ({}) ──", node.label, node.id));
        self.log(LogLevel::Info, format!("Type: {}", node.node_type.label()));
        self.log(LogLevel::Info, format!("Status: {}", node.status));
        self.log(LogLevel::Info, format!("Description: {}", node.description));
        if let Some(d) = node.duration() {
            self.log(LogLevel::Info, format!("Duration: {:.1}s", d.as_secs_f64()));
        }
        if !node.children_ids.is_empty() {
            self.log(
                LogLevel::Info,
                format!("Children: {}", node.children_ids.join(", ")),
            );
        }
        if let Some(err) = node.data.get("error").and_then(|v| v.as_str()) {
            self.log(LogLevel::Error, format!("Error: {}", err));
        }
        self.scroll_logs = 0;
    }

    pub fn draw(&self, f: &mut Frame) {
        let vertical_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(8),    // Graph
                Constraint::Length(9), // Progress + summary
                Constraint::Min(6),    // Logs
                Constraint::Length(1), // Hints bar
            ])
            .split(f.area());

        let middle_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(vertical_chunks[1]);

        self.render_graph(f, vertical_chunks[0]);
        self.render_progress(f, middle_chunks[0]);
        self.render_summary(f, middle_chunks[1]);
        self.render_logs(f, vertical_chunks[2]);
        self.render_hints(f, vertical_chunks[3]);
    }

    fn render_graph(&self, f: &mut Frame, area: Rect) {
        let title = format!(" {} pipeline ({} nodes) ", self.symbol, self.nodes.len());
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(Color::Cyan));

        let inner = block.inner(area);
        f.render_widget(block, area);

        let nodes = self.nodes.as_slice();
        if nodes.is_empty() {
            let empty_msg = Paragraph::new("No agents yet... waiting for validation")
                .style(Style::default().fg(Color::DarkGray));
            f.render_widget(empty_msg, inner);
            return;
        }

        let rows = graph_rows(nodes, inner.width as usize);
        let mut lines: Vec<Line> = Vec::new();
        for (row_idx, row) in rows.iter().enumerate() {
            let mut spans: Vec<Span> = Vec::new();
            if row_idx > 0 {
                spans.push(Span::styled("↳ ", Style::default().fg(Color::DarkGray)));
            }
            for (pos, &idx) in row.iter().enumerate() {
                if pos > 0 {
                    spans.push(Span::styled(ARROW, Style::default().fg(Color::DarkGray)));
                }
                let node = &nodes[idx];
                let (_, color) = status_style(node.status);
                let mut style = Style::default().fg(color).add_modifier(Modifier::BOLD);
                if Some(idx) == self.selected_node {
                    style = style.bg(Color::DarkGray);
                }
                spans.push(Span::styled(node_text(node), style));
            }
            lines.push(Line::from(spans));

            // Second line carries the type badges under each node
            let badges: Vec<Span> = row
                .iter()
                .map(|&idx| {
                    let node = &nodes[idx];
                    let width = node_text(node).chars().count() + ARROW.chars().count();
                    Span::styled(
                        format!("{:<width$}", format!("  [{}]", node.node_type.icon())),
                        Style::default().fg(Color::DarkGray),
                    )
                })
                .collect();
            lines.push(Line::from(badges));
        }

        f.render_widget(Paragraph::new(lines), inner);
    }

    fn render_progress(&self, f: &mut Frame, area: Rect) {
        let (title, border_color) = if self.is_complete {
            (" Complete ", Color::Green)
        } else {
            (" Progress ", Color::Yellow)
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(border_color));

        let inner = block.inner(area);
        f.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(inner);

        let ratio = self.nodes.progress_ratio().clamp(0.0, 1.0);
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(Color::Cyan).bg(Color::Black))
            .ratio(ratio)
            .label(format!(
                "{}/{}",
                self.nodes.completed_count(),
                self.nodes.len()
            ));
        f.render_widget(gauge, chunks[0]);

        let status_icon = if self.is_complete { "✓" } else { "⠋" };
        let text = vec![
            Line::from(""),
            Line::from(vec![
                Span::styled(status_icon, Style::default().fg(Color::Cyan)),
                Span::raw(" "),
                Span::styled(
                    format!("{} completed", self.nodes.completed_count()),
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(
                    format!("{} errors", self.nodes.error_count()),
                    Style::default().fg(Color::Red),
                ),
            ]),
            Line::from(""),
            Line::from(self.status_message.clone()),
        ];
        let paragraph = Paragraph::new(text).wrap(Wrap { trim: true });
        f.render_widget(paragraph, chunks[1]);
    }

    fn render_summary(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" By type ")
            .border_style(Style::default().fg(Color::Blue));

        let items: Vec<ListItem> = self
            .nodes
            .type_summary()
            .into_iter()
            .map(|(node_type, completed, total)| {
                let color = if completed == total {
                    Color::Green
                } else {
                    Color::Yellow
                };
                ListItem::new(format!("{:<12} {}/{}", node_type.label(), completed, total))
                    .style(Style::default().fg(color))
            })
            .collect();

        f.render_widget(List::new(items).block(block), area);
    }

    fn render_logs(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Logs ")
            .border_style(Style::default().fg(Color::Magenta));

        let inner = block.inner(area);
        f.render_widget(block, area);

        let height = inner.height as usize;
        let total_items = self.logs.len();

        // scroll_logs counts lines back from the newest entry
        let bottom = total_items.saturating_sub(height);
        let scroll_offset = bottom.saturating_sub(self.scroll_logs);

        let items: Vec<ListItem> = self
            .logs
            .iter()
            .skip(scroll_offset)
            .take(height)
            .map(|(level, message)| {
                let (prefix, style) = match level {
                    LogLevel::Info => ("INFO ", Style::default().fg(Color::Blue)),
                    LogLevel::Warn => ("WARN ", Style::default().fg(Color::Yellow)),
                    LogLevel::Error => ("ERROR", Style::default().fg(Color::Red)),
                };
                ListItem::new(format!("[{}] {}", prefix, message)).style(style)
            })
            .collect();

        f.render_widget(List::new(items), inner);
    }

    fn render_hints(&self, f: &mut Frame, area: Rect) {
        let key = Style::default().fg(Color::Black).bg(Color::Gray);
        let mut spans = if self.is_complete {
            vec![Span::styled(" q/ESC ", key), Span::raw(" Exit  ")]
        } else {
            vec![Span::styled(" Ctrl+C ", key), Span::raw(" Stop  ")]
        };
        spans.extend([
            Span::styled(" ←/→ ", key),
            Span::raw(" Select  "),
            Span::styled(" Enter ", key),
            Span::raw(" Details  "),
            Span::styled(" PgUp/PgDn ", key),
            Span::raw(" Scroll logs"),
        ]);

        let paragraph =
            Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black).fg(Color::Gray));
        f.render_widget(paragraph, area);
    }

    /// Apply a key press. Returns true when the monitor should close.
    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        match code {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Left | KeyCode::Up => self.select_prev(),
            KeyCode::Right | KeyCode::Down => self.select_next(),
            KeyCode::Home => {
                if !self.nodes.is_empty() {
                    self.selected_node = Some(0);
                }
            }
            KeyCode::End => {
                if !self.nodes.is_empty() {
                    self.selected_node = Some(self.nodes.len() - 1);
                }
            }
            KeyCode::Enter => self.show_details(),
            KeyCode::PageUp => {
                self.scroll_logs = (self.scroll_logs + 10).min(self.logs.len());
            }
            KeyCode::PageDown => {
                self.scroll_logs = self.scroll_logs.saturating_sub(10);
            }
            _ => {}
        }
        false
    }
}

/// Run the investigation monitor TUI (blocking, run it on its own thread)
pub fn run_monitor(
    rx: mpsc::UnboundedReceiver<InvestigationEvent>,
    symbol: &str,
    should_exit: Arc<AtomicBool>,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut monitor = InvestigationMonitor::new(rx, symbol);

    let result = (|| -> Result<()> {
        loop {
            monitor.process_messages();
            terminal.draw(|f| monitor.draw(f))?;

            // Don't auto-exit on completion, the user reads the result first
            if should_exit.load(Ordering::Relaxed) {
                break;
            }

            if event::poll(std::time::Duration::from_millis(100))?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
                && monitor.handle_key(key.code, key.modifiers)
            {
                break;
            }
        }
        Ok(())
    })();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Create a channel pair for investigation monitoring
pub fn create_monitor_channel() -> (
    mpsc::UnboundedSender<InvestigationEvent>,
    mpsc::UnboundedReceiver<InvestigationEvent>,
) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_core::model::NodeType;
    use ratatui::backend::TestBackend;
    use serde_json::json;

    fn node(id: &str, label: &str, status: NodeStatus) -> AgentNode {
        AgentNode::new(id, label, "desc", NodeType::Analysis, status, json!({}))
    }

    fn monitor_with(events: Vec<InvestigationEvent>) -> InvestigationMonitor {
        let (tx, rx) = create_monitor_channel();
        for e in events {
            tx.send(e).unwrap();
        }
        let mut monitor = InvestigationMonitor::new(rx, "AAPL");
        monitor.process_messages();
        monitor
    }

    fn render(monitor: &InvestigationMonitor) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal.draw(|f| monitor.draw(f)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_graph_rows_wrap() {
        let nodes: Vec<AgentNode> = (0..4)
            .map(|i| node(&format!("n{i}"), "Stock Validation", NodeStatus::Completed))
            .collect();
        let w = node_text(&nodes[0]).chars().count();

        let rows = graph_rows(&nodes, 1_000);
        assert_eq!(rows, vec![vec![0, 1, 2, 3]]);

        // Room for two nodes and one arrow per row
        let rows = graph_rows(&nodes, 2 * w + ARROW.chars().count());
        assert_eq!(rows, vec![vec![0, 1], vec![2, 3]]);

        // Narrower than a node still makes progress
        let rows = graph_rows(&nodes, 3);
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn test_events_build_node_list() {
        let monitor = monitor_with(vec![
            InvestigationEvent::NodeAdded(node("validation", "Stock Validation", NodeStatus::Completed)),
            InvestigationEvent::NodeAdded(node("spawn-news", "Spawn News", NodeStatus::InProgress)),
            InvestigationEvent::NodeUpdated {
                id: "spawn-news".into(),
                status: NodeStatus::Completed,
            },
            InvestigationEvent::Log("hello".into()),
        ]);

        assert_eq!(monitor.nodes().len(), 2);
        assert_eq!(monitor.nodes().completed_count(), 2);
        assert!(!monitor.is_complete());
        assert_eq!(monitor.logs, vec![(LogLevel::Info, "hello".to_string())]);
    }

    #[test]
    fn test_error_nodes_logged() {
        let monitor = monitor_with(vec![InvestigationEvent::NodeAdded(node(
            "error",
            "Investigation Error",
            NodeStatus::Error,
        ))]);
        assert_eq!(monitor.logs.len(), 1);
        assert_eq!(monitor.logs[0].0, LogLevel::Error);
    }

    #[test]
    fn test_complete_with_timeout_warns() {
        let monitor = monitor_with(vec![InvestigationEvent::Complete {
            completed: 3,
            errors: 1,
            timed_out: true,
        }]);
        assert!(monitor.is_complete());
        assert!(monitor.status_message.starts_with("Timed out"));
        assert_eq!(monitor.logs[0].0, LogLevel::Warn);
    }

    #[test]
    fn test_rerun_clears_graph() {
        let monitor = monitor_with(vec![
            InvestigationEvent::NodeAdded(node("validation", "Stock Validation", NodeStatus::Completed)),
            InvestigationEvent::NodeAdded(node("investigation-start", "Start", NodeStatus::Completed)),
            InvestigationEvent::Complete {
                completed: 2,
                errors: 0,
                timed_out: false,
            },
            InvestigationEvent::NodeAdded(node("validation", "Stock Validation", NodeStatus::Completed)),
        ]);
        assert_eq!(monitor.nodes().len(), 1);
        assert!(!monitor.is_complete());
    }

    #[test]
    fn test_selection_and_details() {
        let mut monitor = monitor_with(vec![
            InvestigationEvent::NodeAdded(node("a", "First", NodeStatus::Completed)),
            InvestigationEvent::NodeAdded(node("b", "Second", NodeStatus::InProgress)),
        ]);

        assert!(!monitor.handle_key(KeyCode::Right, KeyModifiers::NONE));
        assert_eq!(monitor.selected_node, Some(0));
        monitor.handle_key(KeyCode::Right, KeyModifiers::NONE);
        monitor.handle_key(KeyCode::Right, KeyModifiers::NONE);
        assert_eq!(monitor.selected_node, Some(1));
        monitor.handle_key(KeyCode::Home, KeyModifiers::NONE);
        assert_eq!(monitor.selected_node, Some(0));

        monitor.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert!(monitor.logs.iter().any(|(_, m)| m.contains("First (a)")));
        assert!(monitor.logs.iter().any(|(_, m)| m == "Type: ANALYSIS"));
    }

    #[test]
    fn test_exit_keys() {
        let mut monitor = monitor_with(vec![]);
        assert!(monitor.handle_key(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(monitor.handle_key(KeyCode::Esc, KeyModifiers::NONE));
        assert!(monitor.handle_key(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(!monitor.handle_key(KeyCode::Char('c'), KeyModifiers::NONE));
    }

    #[test]
    fn test_render_shows_nodes_and_summary() {
        let monitor = monitor_with(vec![
            InvestigationEvent::NodeAdded(node("validation", "Stock Validation", NodeStatus::Completed)),
            InvestigationEvent::NodeAdded(node("error-news", "News Failed", NodeStatus::Error)),
        ]);
        let screen = render(&monitor);

        assert!(screen.contains("AAPL pipeline (2 nodes)"));
        assert!(screen.contains("✓ Stock Validation"));
        assert!(screen.contains("✗ News Failed"));
        assert!(screen.contains("ANALYSIS"));
        assert!(screen.contains("1 errors"));
    }

    #[test]
    fn test_render_empty() {
        let monitor = monitor_with(vec![]);
        let screen = render(&monitor);
        assert!(screen.contains("waiting for validation"));
        assert!(screen.contains("Investigating AAPL"));
    }
}
