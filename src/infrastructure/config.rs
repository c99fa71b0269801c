use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

const CONFIG_FILE: &str = "config/traquarium";
const ENV_PREFIX: &str = "TRAQUARIUM";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub storage: StorageSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    /// Holds one `<username>/readings.json` per user.
    pub data_dir: PathBuf,
    pub credentials_file: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: SocketAddr,
    /// Lifetime of a login token.
    pub session_ttl_secs: u64,
}

/// Defaults, then `config/traquarium.*` if present, then `TRAQUARIUM__*`
/// environment variables (e.g. `TRAQUARIUM__SERVER__BIND`).
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    load_from(
        config::File::with_name(CONFIG_FILE).required(false),
        Some(ENV_PREFIX),
    )
}

fn load_from<S>(file: S, env_prefix: Option<&str>) -> anyhow::Result<AppConfig>
where
    S: config::Source + Send + Sync + 'static,
{
    let mut builder = config::Config::builder()
        .set_default("storage.data_dir", "users")?
        .set_default("storage.credentials_file", "users.json")?
        .set_default("server.bind", "127.0.0.1:8080")?
        .set_default("server.session_ttl_secs", 43_200_i64)?
        .add_source(file);
    if let Some(prefix) = env_prefix {
        builder = builder.add_source(config::Environment::with_prefix(prefix).separator("__"));
    }

    Ok(builder.build()?.try_deserialize()?)
}
