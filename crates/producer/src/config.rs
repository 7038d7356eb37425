use common::config::{var_or, var_parse_or};

pub use common::Environment;

#[derive(Debug, Clone)]
pub struct ProducerConfig {
    pub environment: Environment,
    pub broker_socket: String,
    pub service: String,
    pub slot_count: u32,
    pub slot_size: u32,
    pub message_count: u32,
    pub publish_interval_ms: u64,
}

impl ProducerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            environment: Environment::from_env(),
            broker_socket: var_or(
                "BROKER_SOCKET_PATH",
                discovery::paths::DEFAULT_BROKER_SOCKET,
            ),
            service: var_or("SERVICE_KEY", "demo"),
            slot_count: var_parse_or("RING_SLOT_COUNT", 8),
            slot_size: var_parse_or("RING_SLOT_SIZE", 256),
            message_count: var_parse_or("MESSAGE_COUNT", 120),
            publish_interval_ms: var_parse_or("PUBLISH_INTERVAL_MS", 1000),
        })
    }
}
