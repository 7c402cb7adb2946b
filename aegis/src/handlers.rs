use aegis_client::ApiClient;
use aegis_core::investigate::{
    InvestigationOptions, InvestigationOutcome, InvestigationProgressCallback, InvestigationSession,
};
use aegis_core::model::{DateRange, NodeStatus};
use aegis_core::report::{ReportFormat, generate_report, save_report, wrap_text};
use aegis_server::{LatencyProfile, ServerConfig};
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";

/// Install the fmt subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A second init (tests, demo after serve) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// clap value parser for `YYYY-MM-DD`
pub fn parse_date(s: &str) -> Result<String, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|e| format!("expected YYYY-MM-DD, got '{}': {}", s, e))
}

/// Build run options from the investigate arguments
pub fn build_options(
    symbol: &str,
    start_date: &str,
    end_date: &str,
    deadline_secs: u64,
    fast: bool,
) -> Result<InvestigationOptions> {
    if symbol.trim().is_empty() {
        bail!("Symbol must not be empty");
    }
    // ISO dates compare correctly as strings
    if start_date > end_date {
        bail!(
            "Start date {} is after end date {}",
            start_date,
            end_date
        );
    }

    let options = InvestigationOptions::new(symbol)
        .with_date_range(DateRange {
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
        })
        .with_deadline(Duration::from_secs(deadline_secs));
    Ok(if fast { options.fast() } else { options })
}

/// Server config from the serve arguments. `BACKEND_URL` is accepted as a
/// fallback for `--backend-url`.
pub fn server_config_from_args(args: &ArgMatches) -> ServerConfig {
    let defaults = ServerConfig::default();
    let backend_url = args
        .get_one::<String>("backend-url")
        .cloned()
        .or_else(|| std::env::var("BACKEND_URL").ok())
        .filter(|url| !url.trim().is_empty());

    ServerConfig {
        host: args
            .get_one::<String>("host")
            .cloned()
            .unwrap_or(defaults.host),
        port: args.get_one::<u16>("port").copied().unwrap_or(defaults.port),
        backend_url,
        latency: if args.get_flag("no-latency") {
            LatencyProfile::none()
        } else {
            LatencyProfile::default()
        },
    }
}

fn report_format(args: &ArgMatches) -> ReportFormat {
    args.get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text)
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(message);
    spinner
}

/// Short colored verdict printed after a run
pub fn print_summary(outcome: &InvestigationOutcome) {
    let nodes = &outcome.nodes;
    println!();
    print_divider();
    println!("{}", "  INVESTIGATION SUMMARY".bright_white().bold());
    print_divider();

    for node in nodes {
        let icon = match node.status {
            NodeStatus::Completed => "✓".green().bold(),
            NodeStatus::Error => "✗".red().bold(),
            NodeStatus::InProgress => "~".yellow().bold(),
            NodeStatus::Pending => "·".bright_black(),
        };
        println!(
            "{} {:<10} {}",
            icon,
            node.node_type.icon().bright_black(),
            node.label.bright_white()
        );
    }
    println!();
    println!(
        "{} {} completed, {} errors",
        "→".blue(),
        nodes.completed_count().to_string().green(),
        nodes.error_count().to_string().red()
    );
    if outcome.timed_out {
        println!("{} Run hit its deadline", "⚠".yellow().bold());
    }

    if let Some(inference) = outcome.inference() {
        println!();
        if let Some(rec) = inference["recommendation"].as_str() {
            println!("{} {}", "Recommendation:".bright_cyan().bold(), rec.bright_white());
        }
        if let Some(conf) = inference["confidence_score"].as_f64() {
            println!("{} {:.1}/10", "Confidence:".bright_cyan().bold(), conf);
        }
        if let Some(cause) = inference["primary_cause"].as_str() {
            println!("{}", "Primary cause:".bright_cyan().bold());
            println!("{}", wrap_text(cause, 78, "  "));
        }
    }
    println!();
}

/// Print or save the report
pub fn emit_report(
    outcome: &InvestigationOutcome,
    format: ReportFormat,
    output: Option<&String>,
) -> Result<()> {
    let report = generate_report(format, outcome).context("Failed to render report")?;

    match output {
        Some(path) => {
            let expanded = shellexpand::tilde(path);
            let path = PathBuf::from(expanded.as_ref());
            save_report(&report, &path)
                .with_context(|| format!("Failed to save report to {}", path.display()))?;
            println!(
                "{} Report saved to: {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
        None => print!("{}", report),
    }
    Ok(())
}

/// Run with a spinner that follows the pipeline's progress lines
async fn run_with_spinner(
    client: ApiClient,
    options: InvestigationOptions,
    quiet: bool,
) -> InvestigationOutcome {
    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        spinner(format!("Investigating {}...", options.symbol))
    };

    let bar_clone = bar.clone();
    let progress: InvestigationProgressCallback = Arc::new(move |msg: String| {
        bar_clone.set_message(msg);
    });

    let mut session = InvestigationSession::new(client).with_progress_callback(progress);
    let outcome = session.run(options).await;
    bar.finish_and_clear();
    outcome
}

/// Run with the monitor TUI. Returns None when the user closed the monitor
/// before the run finished.
async fn run_with_tui(
    client: ApiClient,
    options: InvestigationOptions,
) -> Result<Option<InvestigationOutcome>> {
    let (tx, rx) = aegis_tui::create_monitor_channel();
    let mut session = InvestigationSession::new(client).with_event_sender(tx);
    let symbol = options.symbol.clone();
    session.start(options);

    // An external SIGINT closes the monitor too (Ctrl+C itself arrives as a key in raw mode)
    let should_exit = Arc::new(AtomicBool::new(false));
    let signal_flag = should_exit.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_flag.store(true, Ordering::Relaxed);
        }
    });

    let monitor = tokio::task::spawn_blocking(move || {
        aegis_tui::run_monitor(rx, &symbol, should_exit)
    })
    .await
    .context("Monitor thread panicked")?;
    signal_task.abort();
    monitor?;

    if session.is_loading() {
        session.reset().await;
        return Ok(None);
    }
    Ok(Some(session.wait().await))
}

pub async fn handle_investigate(sub_matches: &ArgMatches, quiet: bool) -> Result<()> {
    let tui = sub_matches.get_flag("tui");
    // Log lines would tear the TUI
    if !tui {
        init_tracing("warn");
    }

    let symbol = sub_matches
        .get_one::<String>("SYMBOL")
        .context("SYMBOL is required")?;
    let url = sub_matches
        .get_one::<String>("url")
        .map(String::as_str)
        .unwrap_or(DEFAULT_API_URL);
    let start_date = sub_matches
        .get_one::<String>("start-date")
        .context("missing start date")?;
    let end_date = sub_matches
        .get_one::<String>("end-date")
        .context("missing end date")?;
    let deadline = sub_matches.get_one::<u64>("deadline").copied().unwrap_or(30);
    let fast = sub_matches.get_flag("fast");

    let options = build_options(symbol, start_date, end_date, deadline, fast)?;
    let client = ApiClient::new(url).with_context(|| format!("Invalid API URL {}", url))?;

    if !quiet && !tui {
        println!(
            "\n{} Investigating {} via {}",
            "→".blue().bold(),
            options.symbol.bright_white().bold(),
            url.bright_white()
        );
        println!(
            "{} Window: {} to {}\n",
            "→".blue(),
            start_date,
            end_date
        );
    }

    let outcome = if tui {
        match run_with_tui(client, options).await? {
            Some(outcome) => outcome,
            None => {
                println!("{} Investigation cancelled", "✗".red().bold());
                return Ok(());
            }
        }
    } else {
        run_with_spinner(client, options, quiet).await
    };

    finish(&outcome, sub_matches, quiet)
}

fn finish(outcome: &InvestigationOutcome, args: &ArgMatches, quiet: bool) -> Result<()> {
    let format = report_format(args);
    let output = args.try_get_one::<String>("output").ok().flatten();

    // Text reports already carry the summary
    if !quiet && (format != ReportFormat::Text || output.is_some()) {
        print_summary(outcome);
    }
    emit_report(outcome, format, output)
}

pub async fn handle_serve(sub_matches: &ArgMatches) -> Result<()> {
    init_tracing("info");
    let config = server_config_from_args(sub_matches);

    print_divider();
    println!("{}", "  AEGIS MOCK ANALYSIS API".bright_white().bold());
    print_divider();
    println!(
        "{} Listening on: {}",
        "→".blue(),
        format!("http://{}", config.bind_addr()).bright_white()
    );
    match config.backend_url {
        Some(ref url) => println!("{} Narrative backend: {}", "→".blue(), url.bright_white()),
        None => println!("{} Narratives: local templates", "→".blue()),
    }
    if config.latency == LatencyProfile::none() {
        println!("{} Simulated latency: off", "→".blue());
    }
    println!();

    aegis_server::run(config)
        .await
        .context("Server stopped with an error")
}

pub async fn handle_demo(sub_matches: &ArgMatches, quiet: bool) -> Result<()> {
    init_tracing("warn");

    let symbol = sub_matches
        .get_one::<String>("SYMBOL")
        .context("SYMBOL is required")?;
    let fast = sub_matches.get_flag("fast");

    let handle = aegis_server::start(ServerConfig::ephemeral())
        .await
        .context("Failed to start in-process API")?;
    if !quiet {
        println!(
            "\n{} In-process API on {}",
            "✓".green().bold(),
            handle.url().bright_white()
        );
    }

    let defaults = DateRange::default();
    let options = build_options(
        symbol,
        &defaults.start_date,
        &defaults.end_date,
        aegis_core::investigate::DEFAULT_DEADLINE.as_secs(),
        fast,
    )?;
    let client = ApiClient::new(&handle.url())?;
    let outcome = run_with_spinner(client, options, quiet).await;
    handle.shutdown();

    finish(&outcome, sub_matches, quiet)
}
