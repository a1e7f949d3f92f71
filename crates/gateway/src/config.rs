use std::net::SocketAddr;

/// Runtime configuration, assembled by the CLI from flags and environment.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub provider_base_url: String,
    pub provider_api_key: String,
}
