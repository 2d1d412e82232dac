use serde::{Deserialize, Serialize};

use crate::BeaconError;

const CONFIG_FILE_NAME: &str = "geobeacon.json";
const CONFIG_DIR_NAME: &str = "geobeacon";

/// Broker endpoint the transport connects to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub keep_alive_s: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        BrokerConfig {
            host: "broker.sundaebytestt.com".to_string(),
            port: 1883,
            keep_alive_s: 30,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub broker: BrokerConfig,
    /// Prefill for the operator identifier; a bare `start` falls back to it.
    pub operator_id: Option<String>,
    /// Standing location consent the permission gate answers with.
    pub allow_location: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            broker: BrokerConfig::default(),
            operator_id: None,
            allow_location: true,
        }
    }
}

impl AppConfig {
    pub fn from_local_file() -> Option<AppConfig> {
        let config_path = dirs::config_dir()?
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME);

        if config_path.exists() {
            let config_file =
                std::fs::File::open(config_path).expect("Could not open config file");
            let config: AppConfig =
                serde_json::from_reader(config_file).expect("Could not parse config file");
            Some(config)
        } else {
            None
        }
    }

    pub fn save(&self) -> Result<(), BeaconError> {
        let config_path = dirs::config_dir()
            .ok_or(BeaconError::NoConfigDir)?
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            std::fs::create_dir_all(config_path.parent().expect("Config path has no parent"))
                .map_err(|e| BeaconError::ConfigIOError { source: e })?;
        }

        let config_file = std::fs::File::create(config_path)
            .map_err(|e| BeaconError::ConfigIOError { source: e })?;
        serde_json::to_writer(config_file, self)
            .map_err(|e| BeaconError::ConfigSerializeError { source: e })
    }
}
