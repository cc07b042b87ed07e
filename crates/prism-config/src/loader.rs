//! Configuration Loader
//!
//! Loads the project configuration once and resolves package policies on
//! demand, caching the package-level files it had to read.

use crate::policy::PackagePolicy;
use crate::project::{PackageConfig, ProcessingConfig};
use crate::{ConfigResult, CONFIG_FILE_NAME};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Configuration loader
///
/// Project rules take precedence over the rules a package ships itself.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Directory the project config was looked up in
    project_path: PathBuf,

    /// Project configuration (empty when no file exists)
    project: ProcessingConfig,

    /// Package root → package-level config, if the package ships one
    package_configs: HashMap<PathBuf, Option<PackageConfig>>,
}

impl ConfigLoader {
    /// Load `prism.config.toml` from the project directory, if present
    pub fn load(project_path: &Path) -> ConfigResult<Self> {
        let config_path = project_path.join(CONFIG_FILE_NAME);
        let project = if config_path.exists() {
            ProcessingConfig::load_from_file(&config_path)?
        } else {
            ProcessingConfig::default()
        };

        Ok(Self::with_config(project_path, project))
    }

    /// Load the project configuration from an explicit file
    pub fn load_from_file(config_path: &Path) -> ConfigResult<Self> {
        let project = ProcessingConfig::load_from_file(config_path)?;
        let project_path = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(Self::with_config(project_path, project))
    }

    /// Use an already-built project configuration
    pub fn with_config(project_path: impl Into<PathBuf>, project: ProcessingConfig) -> Self {
        Self {
            project_path: project_path.into(),
            project,
            package_configs: HashMap::new(),
        }
    }

    /// Directory the project configuration belongs to
    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    /// The project configuration
    pub fn project(&self) -> &ProcessingConfig {
        &self.project
    }

    /// Resolve the policy table for the package installed at `package_path`
    pub fn package_policy(
        &mut self,
        package_path: &Path,
        package_name: &str,
        package_version: Option<&str>,
    ) -> ConfigResult<PackagePolicy> {
        if let Some(config) = self.project.package_config(package_name, package_version) {
            return config.to_policy(package_name);
        }

        match self.load_package_config(package_path, package_name)? {
            Some(config) => config.to_policy(package_name),
            None => Ok(PackagePolicy::default()),
        }
    }

    /// Read (once) the config file a package ships in its root
    fn load_package_config(
        &mut self,
        package_path: &Path,
        package_name: &str,
    ) -> ConfigResult<Option<&PackageConfig>> {
        if !self.package_configs.contains_key(package_path) {
            let config_path = package_path.join(CONFIG_FILE_NAME);
            let config = if config_path.exists() {
                Some(PackageConfig::load_from_file(&config_path, package_name)?)
            } else {
                None
            };
            self.package_configs.insert(package_path.to_path_buf(), config);
        }

        Ok(self
            .package_configs
            .get(package_path)
            .and_then(|config| config.as_ref()))
    }
}
