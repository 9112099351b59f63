pub mod schema;

pub use schema::{
    Config, DispatchConfig, EngineConfig, GatewayConfig, SessionsConfig, StorageConfig,
};
