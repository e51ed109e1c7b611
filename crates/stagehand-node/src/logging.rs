use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Initialize the logging system. `RUST_LOG` wins over everything,
/// then `-v`/`-vv`, then the config file level.
pub fn init_logging(config: &LoggingConfig, cli_verbose: u8) -> anyhow::Result<()> {
    let log_level = match cli_verbose {
        0 => config.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("stagehand={}", log_level)),
    );
    let subscriber = tracing_subscriber::registry().with(filter);

    match config.format.as_str() {
        "compact" => {
            let layer = fmt::layer()
                .compact()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false);
            subscriber.with(layer).init();
        }
        _ => {
            // Default "pretty": show source location only when digging.
            let show_location = matches!(log_level, "debug" | "trace");
            let layer = fmt::layer()
                .with_target(show_location)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_line_number(show_location)
                .with_file(show_location);
            subscriber.with(layer).init();
        }
    }

    Ok(())
}
