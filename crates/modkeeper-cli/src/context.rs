//! Paths and wiring shared by the commands

use crate::CliError;
use crate::cli::Cli;
use modkeeper_core::config::{
    ConfigSource, CoreConfig, FileConfigSource, write_default_config,
};
use modkeeper_core::modules::ModuleLayout;
use modkeeper_core::Coordinator;
use std::path::PathBuf;
use std::sync::Arc;

pub const CONFIG_FILE: &str = "config.toml";
pub const MANAGED_DIR: &str = "modules";
pub const INBOUND_DIR: &str = "plugins";

/// Resolved locations for one invocation
#[derive(Debug, Clone)]
pub struct CliContext {
    pub data_dir: PathBuf,
    pub inbound_dir: PathBuf,
    pub managed_dir: PathBuf,
    pub config_path: PathBuf,
    pub host_package: Option<String>,
}

impl CliContext {
    pub fn from_cli(cli: &Cli) -> Self {
        let data_dir = cli.data_dir.clone();
        Self {
            inbound_dir: cli
                .inbound_dir
                .clone()
                .unwrap_or_else(|| data_dir.join(INBOUND_DIR)),
            managed_dir: data_dir.join(MANAGED_DIR),
            config_path: cli
                .config
                .clone()
                .unwrap_or_else(|| data_dir.join(CONFIG_FILE)),
            host_package: cli.host_package.clone(),
            data_dir,
        }
    }

    pub fn config_source(&self) -> FileConfigSource {
        FileConfigSource::new(&self.config_path)
    }

    /// Write the default configuration on first start. Only TOML paths get a
    /// generated file; other formats must be provided by the operator.
    pub fn ensure_config(&self) -> Result<bool, CliError> {
        let is_toml = self
            .config_path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if !is_toml {
            return Ok(false);
        }
        Ok(write_default_config(&self.config_path)?)
    }

    /// Read the configuration once ahead of startup; `None` when unreadable
    pub async fn peek_config(&self) -> Option<CoreConfig> {
        self.config_source().load().await.ok()
    }

    /// The package extension is taken from the configuration present at
    /// startup and stays fixed for the life of the process.
    pub fn layout(&self, initial: Option<&CoreConfig>) -> ModuleLayout {
        let mut layout = ModuleLayout::new(&self.inbound_dir, &self.managed_dir);
        if let Some(config) = initial {
            layout = layout.with_extension(config.modules.package_extension.clone());
        }
        if let Some(host) = &self.host_package {
            layout = layout.with_host_package(host.clone());
        }
        layout
    }

    pub fn coordinator(&self, initial: Option<&CoreConfig>) -> Coordinator {
        Coordinator::new(self.layout(initial), Arc::new(self.config_source()))
    }
}
