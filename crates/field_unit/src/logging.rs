use env_logger::{Builder, Env};

const DEFAULT_FILTER: &str = "info";

fn builder(env: Env<'_>) -> Builder {
    let mut builder = Builder::from_env(env.default_filter_or(DEFAULT_FILTER));
    builder.format_timestamp_secs().format_module_path(false);
    builder
}

/// Initialises `env_logger`, honouring `RUST_LOG` and defaulting to `info`.
pub fn init_logging() {
    builder(Env::default()).init();
}
