//! Delivery of integration payloads to the external VR engine.

pub mod http;
pub mod log;
pub mod traits;

pub use http::HttpEngineNotifier;
pub use log::LogEngineNotifier;
pub use traits::EngineNotifier;

use crate::config::EngineConfig;
use std::sync::Arc;
use std::time::Duration;

/// Factory: create the notifier selected by `engine.mode`.
pub fn create_notifier(config: &EngineConfig) -> anyhow::Result<Arc<dyn EngineNotifier>> {
    match config.mode.trim() {
        "log" => Ok(Arc::new(LogEngineNotifier::new(&config.endpoint))),
        "http" => Ok(Arc::new(HttpEngineNotifier::new(
            &config.endpoint,
            Duration::from_secs(config.timeout_secs),
        )?)),
        "" => anyhow::bail!("engine.mode cannot be empty. Supported values: log, http"),
        other => anyhow::bail!("Unknown engine mode '{other}'. Supported values: log, http"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_log() {
        let notifier = create_notifier(&EngineConfig::default()).unwrap();
        assert_eq!(notifier.name(), "log");
        assert_eq!(notifier.destination(), "http://localhost:8081/api/vr-session");
    }

    #[test]
    fn factory_http() {
        let cfg = EngineConfig {
            mode: "http".into(),
            endpoint: "http://engine:9000/sessions".into(),
            ..EngineConfig::default()
        };
        let notifier = create_notifier(&cfg).unwrap();
        assert_eq!(notifier.name(), "http");
        assert_eq!(notifier.destination(), "http://engine:9000/sessions");
    }

    #[test]
    fn factory_http_propagates_constructor_errors() {
        let cfg = EngineConfig {
            mode: "http".into(),
            endpoint: "not a url".into(),
            ..EngineConfig::default()
        };
        match create_notifier(&cfg) {
            Err(err) => assert!(err.to_string().contains("Invalid engine endpoint")),
            Ok(_) => panic!("invalid endpoint should error"),
        }
    }

    #[test]
    fn factory_unknown_errors() {
        let cfg = EngineConfig {
            mode: "grpc".into(),
            ..EngineConfig::default()
        };
        match create_notifier(&cfg) {
            Err(err) => assert!(err.to_string().contains("Unknown engine mode")),
            Ok(_) => panic!("unknown engine mode should error"),
        }
    }

    #[test]
    fn factory_empty_errors() {
        let cfg = EngineConfig {
            mode: String::new(),
            ..EngineConfig::default()
        };
        match create_notifier(&cfg) {
            Err(err) => assert!(err.to_string().contains("cannot be empty")),
            Ok(_) => panic!("empty engine mode should error"),
        }
    }
}
