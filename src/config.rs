use anyhow::Result;
use blob_store::BlobStoreConfig;
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub blob_store: BlobStoreConfig,
}

impl ServiceConfig {
    pub fn from_path(path: &str) -> Result<ServiceConfig> {
        let config_str = std::fs::read_to_string(path)?;
        let config: ServiceConfig = Figment::new().merge(Yaml::string(&config_str)).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.blob_store.validate()
    }
}
