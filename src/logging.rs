//! Diagnostic logging on stderr.
//!
//! Stdout carries only the JSON result line, so every subscriber installed
//! here writes to stderr.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILTER: &str = "warn";
pub const DEFAULT_NOISE_FILTER: &str = "hyper=warn,hyper_util=warn,h2=warn,rustls=warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    pub verbose: u8,
    pub cli_log_filter: Option<String>,
    pub rust_log_env: Option<String>,
}

impl LoggingOptions {
    /// Options for the given verbosity and `--log-filter`, reading `RUST_LOG`
    /// from the environment.
    pub fn from_env(verbose: u8, cli_log_filter: Option<String>) -> Self {
        Self {
            verbose,
            cli_log_filter,
            rust_log_env: std::env::var("RUST_LOG").ok().filter(|v| !v.trim().is_empty()),
        }
    }
}

fn select_user_filter(options: &LoggingOptions) -> String {
    if let Some(filter) = options.cli_log_filter.as_deref() {
        filter.to_string()
    } else if options.verbose >= 2 {
        "trace".to_string()
    } else if options.verbose == 1 {
        "debug".to_string()
    } else if let Some(filter) = options.rust_log_env.as_deref() {
        filter.to_string()
    } else {
        DEFAULT_LOG_FILTER.to_string()
    }
}

/// Resolve the filter string: `--log-filter`, then `-v`, then `RUST_LOG`,
/// then the default. HTTP stack noise is capped unless the user asked for a
/// specific filter or verbosity.
pub fn select_log_filter(options: &LoggingOptions) -> String {
    let user_filter = select_user_filter(options);
    if options.cli_log_filter.is_none() && options.verbose == 0 {
        format!("{DEFAULT_NOISE_FILTER},{user_filter}")
    } else {
        user_filter
    }
}

/// Install the global fmt subscriber. Falls back to the default filter if
/// the selected one does not parse.
pub fn init(options: &LoggingOptions) {
    let filter = select_log_filter(options);
    let env_filter = EnvFilter::try_new(&filter).unwrap_or_else(|err| {
        eprintln!("Invalid log filter '{filter}': {err}");
        EnvFilter::new(DEFAULT_LOG_FILTER)
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(verbose: u8, cli: Option<&str>, env: Option<&str>) -> LoggingOptions {
        LoggingOptions {
            verbose,
            cli_log_filter: cli.map(ToString::to_string),
            rust_log_env: env.map(ToString::to_string),
        }
    }

    #[test]
    fn test_default_filter_includes_noise() {
        assert_eq!(
            select_log_filter(&options(0, None, None)),
            format!("{DEFAULT_NOISE_FILTER},warn")
        );
    }

    #[test]
    fn test_rust_log_used_when_implicit() {
        assert_eq!(
            select_log_filter(&options(0, None, Some("comfy_cloud_video=debug"))),
            format!("{DEFAULT_NOISE_FILTER},comfy_cloud_video=debug")
        );
    }

    #[test]
    fn test_verbosity_overrides_rust_log() {
        assert_eq!(select_log_filter(&options(1, None, Some("info"))), "debug");
        assert_eq!(select_log_filter(&options(3, None, None)), "trace");
    }

    #[test]
    fn test_cli_filter_wins() {
        assert_eq!(
            select_log_filter(&options(2, Some("reqwest=trace"), Some("info"))),
            "reqwest=trace"
        );
    }
}
