use common::config::var_or;

pub use common::Environment;

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub environment: Environment,
    pub broker_socket: String,
    pub service: String,
}

impl ConsumerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            environment: Environment::from_env(),
            broker_socket: var_or(
                "BROKER_SOCKET_PATH",
                discovery::paths::DEFAULT_BROKER_SOCKET,
            ),
            service: var_or("SERVICE_KEY", "demo"),
        })
    }
}
