pub mod handlers;

pub use handlers::{
    DEFAULT_API_URL, build_options, emit_report, init_tracing, parse_date, server_config_from_args,
};
