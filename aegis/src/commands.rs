use crate::CLAP_STYLING;
use aegis::handlers::{DEFAULT_API_URL, parse_date};
use clap::{arg, command};

fn format_arg() -> clap::Arg {
    arg!(-f --"format" <FORMAT>)
        .required(false)
        .help("Report format: text, json, markdown")
        .value_parser(["text", "json", "markdown"])
        .default_value("text")
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("aegis")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("aegis")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("serve")
                .about("Run the mock analysis API")
                .arg(
                    arg!(--"host" <HOST>)
                        .required(false)
                        .help("Address to bind")
                        .env("AEGIS_HOST")
                        .default_value("127.0.0.1"),
                )
                .arg(
                    arg!(-p --"port" <PORT>)
                        .required(false)
                        .help("Port to bind (0 picks a free port)")
                        .env("AEGIS_PORT")
                        .value_parser(clap::value_parser!(u16))
                        .default_value("3000"),
                )
                .arg(
                    arg!(--"backend-url" <URL>)
                        .required(false)
                        .help(
                            "Analysis backend to request narratives from. Falls back to local \
                        templates when unset or unreachable (also read from BACKEND_URL)",
                        )
                        .env("AEGIS_BACKEND_URL"),
                )
                .arg(
                    arg!(--"no-latency")
                        .required(false)
                        .help("Answer immediately instead of simulating analysis time")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("investigate")
                .about("Run a full investigation of a ticker against a running API")
                .arg(arg!(<SYMBOL>).help("Ticker symbol, e.g. AAPL"))
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("Base URL of the analysis API")
                        .env("AEGIS_API_URL")
                        .default_value(DEFAULT_API_URL),
                )
                .arg(
                    arg!(--"start-date" <DATE>)
                        .required(false)
                        .help("Start of the investigation window (YYYY-MM-DD)")
                        .value_parser(parse_date)
                        .default_value("2024-01-01"),
                )
                .arg(
                    arg!(--"end-date" <DATE>)
                        .required(false)
                        .help("End of the investigation window (YYYY-MM-DD)")
                        .value_parser(parse_date)
                        .default_value("2024-12-31"),
                )
                .arg(
                    arg!(--"deadline" <SECONDS>)
                        .required(false)
                        .help("Give up on the run after this many seconds")
                        .value_parser(clap::value_parser!(u64).range(1..))
                        .default_value("30"),
                )
                .arg(
                    arg!(--"fast")
                        .required(false)
                        .help("Skip the pauses between pipeline steps")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"tui")
                        .required(false)
                        .help("Watch the agent graph in a terminal UI")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(format_arg())
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)"),
                ),
        )
        .subcommand(
            command!("demo")
                .about("Start an in-process API and investigate a ticker against it")
                .arg(arg!(<SYMBOL>).help("Ticker symbol, e.g. AAPL"))
                .arg(
                    arg!(--"fast")
                        .required(false)
                        .help("Skip the pauses between pipeline steps")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(format_arg()),
        )
}
