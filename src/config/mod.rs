// Configuration module entry point
// Loads the process-wide configuration once at startup

mod types;

use std::net::SocketAddr;

pub use types::{AssetsConfig, Config, LoggingConfig, PerformanceConfig, ServerConfig};

/// Commit baked in at compile time, used when none is configured
pub const DEFAULT_BUILD_COMMIT: &str = match option_env!("BUILD_COMMIT") {
    Some(commit) => commit,
    None => "unknown",
};

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// Sources, lowest priority first: defaults, the optional file, then
    /// `SPA_`-prefixed environment variables (`SPA_ASSETS__PATH=...`).
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("assets.build_commit", DEFAULT_BUILD_COMMIT)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.connection_timeout", 60)?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("SPA")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// External asset directory, `None` when the compiled bundle is served
    pub fn assets_path(&self) -> Option<&str> {
        self.assets.path.as_deref().filter(|p| !p.is_empty())
    }
}
