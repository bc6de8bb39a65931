use std::net::SocketAddr;
use std::path::PathBuf;

const VIGIL_LISTEN: &str = "VIGIL_LISTEN";

pub fn get_default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3838))
}

pub fn get_listen_addr() -> SocketAddr {
    let listen_from_env = std::env::var(VIGIL_LISTEN);
    listen_from_env.map_or(get_default_listen_addr(), |res| {
        res.parse().unwrap_or(get_default_listen_addr())
    })
}

const VIGIL_TOKEN: &str = "VIGIL_TOKEN";

pub fn get_token() -> Option<String> {
    let token_from_env = std::env::var(VIGIL_TOKEN);
    token_from_env.ok().filter(|token| !token.is_empty())
}

const VIGIL_CONFIG_DIR: &str = "VIGIL_CONFIG_DIR";

const DEFAULT_CONFIG_DIR: &str = "/usr/local/etc/vigil";

pub fn get_config_dir() -> PathBuf {
    let dir_from_env = std::env::var(VIGIL_CONFIG_DIR);
    PathBuf::from(dir_from_env.unwrap_or_else(|_| DEFAULT_CONFIG_DIR.to_string()))
}
