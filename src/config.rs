use clap::Parser;
use reqwest::Url;

use crate::decode::DEFAULT_BODY_LIMIT;
use crate::dispatch::DispatchConfig;
use crate::query::QuerySettings;

/// Server configuration, resolved once at startup from flags, the
/// environment and an optional `.env` file.
#[derive(Clone, Debug, Parser)]
#[command(name = "trident_server", about = "Campaign orchestrator for the dispatch fleet")]
pub struct Config {
    /// Address the http server binds to.
    #[arg(long, env = "TRIDENT_BIND", default_value = "127.0.0.1:8080")]
    pub bind: String,

    #[arg(long, env = "TRIDENT_DATABASE_URI", default_value = "mongodb://localhost:27017")]
    pub database_uri: String,

    #[arg(long, env = "TRIDENT_DATABASE_NAME", default_value = "trident")]
    pub database_name: String,

    /// Endpoint persisted campaigns are posted to for dispatch.
    #[arg(long, env = "TRIDENT_DISPATCH_URL")]
    pub dispatch_url: Url,

    /// Bearer token attached to dispatch calls, if any.
    #[arg(long, env = "TRIDENT_DISPATCH_TOKEN", hide_env_values = true)]
    pub dispatch_token: Option<String>,

    #[arg(long, env = "TRIDENT_DISPATCH_WORKERS", default_value_t = 4)]
    pub dispatch_workers: usize,

    #[arg(long, env = "TRIDENT_DISPATCH_QUEUE_CAPACITY", default_value_t = 256)]
    pub dispatch_queue_capacity: usize,

    #[arg(long, env = "TRIDENT_MAX_BODY_BYTES", default_value_t = DEFAULT_BODY_LIMIT)]
    pub max_body_bytes: usize,

    #[arg(long, env = "TRIDENT_MAX_QUERY_RESULTS", default_value_t = 1000)]
    pub max_query_results: u32,

    /// `tracing_subscriber::EnvFilter` directives.
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_filter: String,
}

impl Config {
    pub fn dispatch(&self) -> DispatchConfig {
        DispatchConfig {
            workers: self.dispatch_workers,
            queue_capacity: self.dispatch_queue_capacity,
        }
    }

    pub fn query(&self) -> QuerySettings {
        QuerySettings {
            max_results: self.max_query_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_only_dispatch_url_is_given() {
        let config = Config::try_parse_from([
            "trident_server",
            "--dispatch-url",
            "http://dispatch.internal:9000/schedule",
        ])
        .unwrap();

        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.dispatch_url.path(), "/schedule");
        assert_eq!(config.max_body_bytes, 1_048_576);
        assert_eq!(config.dispatch().workers, 4);
        assert_eq!(config.query().max_results, 1000);
    }

    #[test]
    fn rejects_invalid_dispatch_url() {
        let result = Config::try_parse_from(["trident_server", "--dispatch-url", "not a url"]);
        assert!(result.is_err());
    }
}
