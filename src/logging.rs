use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Global crash log directory, set during init.
static CRASH_LOG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize tracing with a compact stdout layer.
///
/// - Default level: INFO (DEBUG for this crate), override via RUST_LOG env
/// - `json = true` swaps the human-readable layer for newline-delimited JSON
pub fn init(json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,league_logos=debug"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // `try_init` so tests or embedding hosts that already set a subscriber don't panic.
    let result = if json {
        registry
            .with(fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(true)
                    .with_line_number(true)
                    .compact(),
            )
            .try_init()
    };

    if result.is_ok() {
        tracing::debug!("Tracing initialized");
    }
}

/// Install a panic hook that writes crash details into `<output_dir>/crash_logs`.
pub fn install_crash_hook(output_dir: &Path) {
    let crash_dir = output_dir.join("crash_logs");
    if CRASH_LOG_DIR.set(crash_dir).is_err() {
        return;
    }

    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Some(dir) = CRASH_LOG_DIR.get() {
            let _ = std::fs::create_dir_all(dir);
            let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
            let path = dir.join(format!("crash_{}.log", timestamp));

            let mut report = format!(
                "=== LEAGUE LOGOS CRASH REPORT ===\nTime: {}\nVersion: {}\n\n",
                chrono::Local::now().to_rfc3339(),
                env!("CARGO_PKG_VERSION"),
            );

            if let Some(msg) = info.payload().downcast_ref::<&str>() {
                report.push_str(&format!("Panic: {}\n", msg));
            } else if let Some(msg) = info.payload().downcast_ref::<String>() {
                report.push_str(&format!("Panic: {}\n", msg));
            } else {
                report.push_str("Panic: <unknown payload>\n");
            }

            if let Some(loc) = info.location() {
                report.push_str(&format!("Location: {}:{}:{}\n", loc.file(), loc.line(), loc.column()));
            }

            report.push_str(&format!("\nBacktrace:\n{}\n", std::backtrace::Backtrace::force_capture()));

            let _ = std::fs::write(&path, &report);
            eprintln!("[CRASH] Report written to: {}", path.display());
        }

        prev_hook(info);
    }));

    tracing::debug!("Crash hook installed");
}
