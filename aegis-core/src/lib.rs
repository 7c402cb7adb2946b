pub mod analysis;
pub mod inference;
pub mod investigate;
pub mod langchain;
pub mod model;
pub mod report;

use colored::Colorize;

pub use investigate::{
    InvestigationEvent, InvestigationOptions, InvestigationOutcome, InvestigationProgressCallback,
    InvestigationSession,
};
pub use model::{AgentNode, NodeList, NodeStatus, NodeType};

const BANNER: &str = r#"
     _    _____ ____ ___ ____
    / \  | ____/ ___|_ _/ ___|
   / _ \ |  _|| |  _ | |\___ \
  / ___ \| |__| |_| || | ___) |
 /_/   \_\_____\____|___|____/
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "simulated multi-agent stock investigation".bright_black(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
