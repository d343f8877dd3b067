use std::env;
use std::io;
use tracing::Level;
use tracing_subscriber::{
    fmt::time::SystemTime, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Logging configuration for an application embedding the fusion core.
///
/// The crate itself never calls `.init()` — only an embedding binary or test
/// harness does. This mirrors how the sync layer (out of scope here) owns
/// process startup while the core stays a pure library.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub json_format: bool,
    pub pretty_print: bool,
    pub app_name: String,
    pub app_version: String,
    pub environment: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: true,
            pretty_print: false,
            app_name: "wearable-fusion-core".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Build logging configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level_str) = env::var("RUST_LOG").or_else(|_| env::var("LOG_LEVEL")) {
            config.level = parse_log_level(&level_str);
        }

        config.json_format = env::var("LOG_JSON")
            .map(|v| v.parse().unwrap_or(true))
            .unwrap_or(true);

        config.pretty_print = env::var("LOG_PRETTY")
            .map(|v| v.parse().unwrap_or(false))
            .unwrap_or(false);

        if let Ok(name) = env::var("APP_NAME") {
            config.app_name = name;
        }

        config.environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("RUST_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        config
    }

    /// Initialize the global `tracing` subscriber with this configuration.
    pub fn init(self) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let filter_str = format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                self.level.as_str()
            );
            EnvFilter::new(filter_str)
        });

        if self.json_format {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_timer(SystemTime)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .flatten_event(false)
                .with_current_span(true)
                .with_span_list(false);

            Registry::default()
                .with(env_filter)
                .with(fmt_layer.with_writer(io::stdout))
                .init();
        } else if self.pretty_print {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_timer(SystemTime)
                .with_target(true)
                .with_level(true)
                .with_file(true)
                .with_line_number(true);

            Registry::default()
                .with(env_filter)
                .with(fmt_layer.with_writer(io::stdout))
                .init();
        } else {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_timer(SystemTime)
                .with_target(false)
                .with_level(true);

            Registry::default()
                .with(env_filter)
                .with(fmt_layer.with_writer(io::stdout))
                .init();
        }

        tracing::info!(
            event = "logging_initialized",
            config = ?self,
            "structured logging initialized"
        );

        Ok(())
    }
}

fn parse_log_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!("Warning: invalid log level '{level_str}', defaulting to 'info'");
            Level::INFO
        }
    }
}

/// Structured logging context threaded through a fusion run, independent of
/// any transport concern (request IDs are a sync-layer detail).
#[derive(Debug, Clone)]
pub struct LogContext {
    pub service_name: String,
    pub version: String,
    pub environment: String,
    pub owner: Option<String>,
    pub run_id: Option<String>,
}

impl LogContext {
    pub fn new(service_name: &str, version: &str, environment: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            version: version.to_string(),
            environment: environment.to_string(),
            owner: None,
            run_id: None,
        }
    }

    pub fn with_owner(mut self, owner: String) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_run_id(mut self, run_id: String) -> Self {
        self.run_id = Some(run_id);
        self
    }
}

#[macro_export]
macro_rules! log_with_context {
    ($level:ident, $context:expr, $event:expr, $($field:ident = $value:expr),*) => {
        tracing::$level!(
            service_name = $context.service_name,
            version = $context.version,
            environment = $context.environment,
            owner = $context.owner.as_deref(),
            run_id = $context.run_id.as_deref(),
            event = $event,
            timestamp = %chrono::Utc::now(),
            $($field = $value,)*
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_log_level_handles_known_and_unknown_strings() {
        assert!(matches!(parse_log_level("trace"), Level::TRACE));
        assert!(matches!(parse_log_level("DEBUG"), Level::DEBUG));
        assert!(matches!(parse_log_level("Info"), Level::INFO));
        assert!(matches!(parse_log_level("WARN"), Level::WARN));
        assert!(matches!(parse_log_level("error"), Level::ERROR));
        assert!(matches!(parse_log_level("invalid"), Level::INFO));
    }

    #[test]
    fn default_config_is_json_info() {
        let config = LoggingConfig::default();
        assert!(matches!(config.level, Level::INFO));
        assert!(config.json_format);
        assert!(!config.pretty_print);
        assert_eq!(config.app_name, "wearable-fusion-core");
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn log_context_builder_sets_optional_fields() {
        let context = LogContext::new("test-service", "1.0.0", "test")
            .with_owner("owner-123".to_string())
            .with_run_id("run-456".to_string());

        assert_eq!(context.service_name, "test-service");
        assert_eq!(context.owner, Some("owner-123".to_string()));
        assert_eq!(context.run_id, Some("run-456".to_string()));
    }
}
