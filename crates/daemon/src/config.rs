use common::config::var_or;

pub use common::Environment;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub environment: Environment,
    pub socket_path: String,
}

impl DaemonConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            environment: Environment::from_env(),
            socket_path: var_or(
                "BROKER_SOCKET_PATH",
                discovery::paths::DEFAULT_BROKER_SOCKET,
            ),
        })
    }
}
