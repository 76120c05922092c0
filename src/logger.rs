use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset. Verbose mode also lets other
/// crates (reqwest, hyper) through at info.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "eda_upload=debug,info"
    } else {
        "eda_upload=error"
    }
}

/// Logs go to stderr so stdout only carries the upload report.
pub fn init_cli_logger(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}
