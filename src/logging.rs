use cfg_if::cfg_if;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};
use tracing_subscriber::util::SubscriberInitExt;

fn env_filter() -> EnvFilter {
    // RUST_LOG wins, otherwise info for everything
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        /// Route `tracing` output to the browser console.
        pub fn init() {
            let wasm_layer = tracing_wasm::WASMLayer::new(tracing_wasm::WASMLayerConfig::default());

            let _ = tracing_subscriber::registry()
                .with(env_filter())
                .with(wasm_layer)
                .try_init();

            #[cfg(feature = "console_error_panic_hook")]
            console_error_panic_hook::set_once();
        }
    } else {
        use std::path::Path;
        use tracing_appender::non_blocking::WorkerGuard;
        use tracing_subscriber::fmt;
        use once_cell::sync::OnceCell;

        const DEFAULT_LOG_FILE: &str = "logs/astrawalk.log";

        static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

        /// Log to stderr and to a daily rolling file.
        ///
        /// The file defaults to `logs/astrawalk.log` and can be moved with
        /// `ASTRAWALK_LOG_FILE`.
        pub fn init() {
            let console_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .compact();

            let log_path = std::env::var("ASTRAWALK_LOG_FILE")
                .unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
            let log_path = Path::new(&log_path);
            let directory = log_path.parent().unwrap_or(Path::new("."));
            let file_name = log_path
                .file_name()
                .unwrap_or(std::ffi::OsStr::new("astrawalk.log"));
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(directory, file_name));
            let _ = FILE_GUARD.set(guard);

            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .compact();

            let _ = tracing_subscriber::registry()
                .with(env_filter())
                .with(console_layer)
                .with(file_layer)
                .try_init();

            std::panic::set_hook(Box::new(|info| {
                let location = info
                    .location()
                    .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
                    .unwrap_or_else(|| "<unknown>".to_string());
                let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = info.payload().downcast_ref::<String>() {
                    s.clone()
                } else {
                    "<non-string panic>".to_string()
                };
                let backtrace = std::backtrace::Backtrace::force_capture();
                tracing::error!("panic at {location}: {payload}\nBacktrace:\n{backtrace:?}");
            }));
        }
    }
}
