use std::net::SocketAddr;

use crate::config::Config;

const AAS_BIND_ADDR: &str = "AAS_BIND_ADDR";

const AAS_API_TOKEN: &str = "AAS_API_TOKEN";

const AAS_LOG: &str = "AAS_LOG";

pub fn get_bind_addr() -> Option<SocketAddr> {
    let addr_from_env = std::env::var(AAS_BIND_ADDR);
    addr_from_env.ok().and_then(|res| res.parse().ok())
}

pub fn get_api_token() -> Option<String> {
    let token_from_env = std::env::var(AAS_API_TOKEN);
    token_from_env.ok().filter(|token| !token.is_empty())
}

pub fn get_log_level() -> Option<String> {
    std::env::var(AAS_LOG).ok()
}

/// Let the environment override the config file
pub fn apply_env_overrides(config: &mut Config) {
    if let Some(bind) = get_bind_addr() {
        config.api.bind = bind;
    }
    if let Some(token) = get_api_token() {
        config.api.token = Some(token);
    }
    if let Some(level) = get_log_level() {
        config.log_level = level;
    }
}
