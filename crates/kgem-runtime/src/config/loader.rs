//! Layered configuration loading on figment.
//!
//! Sources, later ones winning:
//!
//! 1. [`KgemConfig::default`]
//! 2. values passed to [`ConfigLoader::merge`]
//! 3. one config file: the path given to [`ConfigLoader::file`], or else the
//!    first `kgem.*` or `config.*` in the search directories
//! 4. the profile overlay next to it, `kgem.production.toml` for `kgem.toml`
//! 5. `KGEM_*` environment variables, `__` separating nested keys, e.g.
//!    `KGEM_COMMANDS__DEFAULT_PREFIXES=./`
//!
//! TOML files need the `toml-config` feature, YAML files `yaml-config`.
//!
//! ```rust,ignore
//! let config = ConfigLoader::new().profile("prod").search_path("/etc/kgem").load()?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "toml-config", feature = "yaml-config"))]
use figment::providers::Format;
use figment::providers::{Env, Serialized};
use tracing::{debug, info};

use super::error::{ConfigError, ConfigResult};
use super::schema::KgemConfig;
use super::validation::validate_config;

const ENV_PREFIX: &str = "KGEM_";
const PROFILE_VAR: &str = "KGEM_PROFILE";
const FILE_STEMS: [&str; 2] = ["kgem", "config"];

/// Name of the active profile, selecting the `{stem}.{profile}.{ext}` overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile(String);

impl Profile {
    pub const DEVELOPMENT: &'static str = "development";
    pub const PRODUCTION: &'static str = "production";

    /// Lowercases `name` and expands the `dev` and `prod` short forms.
    pub fn new(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        Self(match name.as_str() {
            "" | "dev" => Self::DEVELOPMENT.to_string(),
            "prod" => Self::PRODUCTION.to_string(),
            _ => name,
        })
    }

    /// Reads `KGEM_PROFILE`.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_VAR).map(|name| Self::new(&name)).unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self(Self::DEVELOPMENT.to_string())
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Enabled file formats, in search order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    #[cfg(feature = "toml-config")]
    Toml,
    #[cfg(feature = "yaml-config")]
    Yaml,
}

impl FileFormat {
    const ENABLED: &'static [Self] = &[
        #[cfg(feature = "toml-config")]
        Self::Toml,
        #[cfg(feature = "yaml-config")]
        Self::Yaml,
    ];

    fn extensions(self) -> &'static [&'static str] {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => &["toml"],
            #[cfg(feature = "yaml-config")]
            Self::Yaml => &["yaml", "yml"],
        }
    }

    fn of(path: &Path) -> ConfigResult<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        Self::ENABLED
            .iter()
            .copied()
            .find(|format| format.extensions().contains(&ext))
            .ok_or_else(|| ConfigError::UnsupportedFormat(ext.to_string()))
    }

    fn merge(self, figment: Figment, path: &Path) -> Figment {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => figment.merge(figment::providers::Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            Self::Yaml => figment.merge(figment::providers::Yaml::file(path)),
        }
    }
}

/// The config file in use.
#[derive(Debug)]
struct ConfigFile {
    path: PathBuf,
    format: FileFormat,
}

impl ConfigFile {
    /// First `{stem}.{ext}` present, by directory, then stem, then format.
    fn find(dirs: &[PathBuf]) -> Option<Self> {
        dirs.iter().find_map(|dir| {
            FILE_STEMS.iter().find_map(|stem| {
                FileFormat::ENABLED.iter().find_map(|&format| {
                    format
                        .extensions()
                        .iter()
                        .map(|ext| dir.join(format!("{stem}.{ext}")))
                        .find(|path| path.exists())
                        .map(|path| Self { path, format })
                })
            })
        })
    }

    fn overlay(&self, profile: &Profile) -> Option<PathBuf> {
        let stem = self.path.file_stem()?.to_str()?;
        let ext = self.path.extension()?.to_str()?;
        let overlay = self.path.with_file_name(format!("{stem}.{profile}.{ext}"));
        overlay.exists().then_some(overlay)
    }
}

/// Builder for a [`KgemConfig`] assembled from layered sources.
pub struct ConfigLoader {
    overrides: Figment,
    profile: Profile,
    search_dirs: Vec<PathBuf>,
    file: Option<PathBuf>,
    env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// A loader with the profile from `KGEM_PROFILE` and environment
    /// overrides on.
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: Profile::from_env(),
            search_dirs: Vec::new(),
            file: None,
            env: true,
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::new(profile.as_ref());
        self
    }

    /// Adds a directory to search for a config file.
    ///
    /// With none added, the current directory and the user config directory
    /// (`~/.config/kgem` on Linux) are searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_dirs.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(dir) => self.search_path(dir),
            Err(_) => self,
        }
    }

    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join("kgem")),
            None => self,
        }
    }

    /// Uses exactly this file. A missing file is an error.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.env = false;
        self
    }

    /// Layers `config` over the built-in defaults, below files and env.
    pub fn merge(mut self, config: KgemConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Loads and validates the configuration.
    pub fn load(self) -> ConfigResult<KgemConfig> {
        let config: KgemConfig = self.figment()?.extract()?;
        validate_config(&config)?;

        debug!(
            profile = %self.profile,
            logging_level = %config.logging.level,
            commands_enabled = config.commands.enabled,
            events_enabled = config.events.enabled,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn figment(&self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(KgemConfig::default())).merge(self.overrides.clone());

        if let Some(file) = self.config_file()? {
            info!(path = %file.path.display(), "Loading configuration file");
            figment = file.format.merge(figment, &file.path);

            if let Some(overlay) = file.overlay(&self.profile) {
                info!(path = %overlay.display(), profile = %self.profile, "Applying profile overlay");
                figment = file.format.merge(figment, &overlay);
            }
        }

        if self.env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }
        Ok(figment)
    }

    fn config_file(&self) -> ConfigResult<Option<ConfigFile>> {
        if let Some(path) = &self.file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            let format = FileFormat::of(path)?;
            return Ok(Some(ConfigFile {
                path: path.clone(),
                format,
            }));
        }

        let dirs = self.search_dirs();
        let found = ConfigFile::find(&dirs);
        if found.is_none() {
            debug!(dirs = ?dirs, "No configuration file found, using defaults");
        }
        Ok(found)
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        if !self.search_dirs.is_empty() {
            return self.search_dirs.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join("kgem")))
            .collect()
    }
}

/// Loads the configuration from the default locations.
pub fn load_config() -> ConfigResult<KgemConfig> {
    ConfigLoader::new().load()
}

/// Loads the configuration from `path`, with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<KgemConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        Jail::expect_with(|jail| {
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config, KgemConfig::default());
            assert_eq!(config.logging.level.as_str(), "info");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides() {
        Jail::expect_with(|jail| {
            jail.set_env("KGEM_LOGGING__LEVEL", "debug");
            jail.set_env("KGEM_COMMANDS__DEFAULT_PREFIXES", "!/");
            jail.set_env("KGEM_EVENTS__ENABLED", "false");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.logging.level, LogLevel::Debug);
            assert_eq!(config.commands.default_prefixes, "!/");
            assert!(!config.events.enabled);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_env_value_fails_validation() {
        Jail::expect_with(|jail| {
            jail.set_env("KGEM_COMMANDS__TIMEOUT_MS", "0");
            let result = ConfigLoader::new().search_path(jail.directory()).load();
            assert!(matches!(result, Err(ConfigError::Validation { .. })));
            Ok(())
        });
    }

    #[test]
    fn test_programmatic_merge() {
        Jail::expect_with(|jail| {
            let mut custom = KgemConfig::default();
            custom.commands.label = Some("host".into());
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .merge(custom)
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.commands.label.as_deref(), Some("host"));
            Ok(())
        });
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigLoader::new().file("/nonexistent/kgem.toml").load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_profile_names() {
        assert_eq!(Profile::new("prod").name(), Profile::PRODUCTION);
        assert_eq!(Profile::new(" Dev ").name(), Profile::DEVELOPMENT);
        assert_eq!(Profile::new("").name(), Profile::DEVELOPMENT);
        assert_eq!(Profile::new("Staging").to_string(), "staging");
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_toml_files_and_profiles() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "kgem.toml",
                r#"
                    [commands]
                    default_prefixes = "/"
                "#,
            )?;
            jail.create_file(
                "kgem.production.toml",
                r#"
                    [commands]
                    owner_only = false
                    default_prefixes = "!"
                "#,
            )?;

            let config = ConfigLoader::new()
                .profile("production")
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.commands.default_prefixes, "!");
            assert!(!config.commands.owner_only);

            let config = ConfigLoader::new()
                .profile("staging")
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.commands.default_prefixes, "/");
            assert!(config.commands.owner_only);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_explicit_file_and_env_precedence() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "[logging]\nlevel = \"warn\"\n[events]\nenabled = false\n")?;
            jail.set_env("KGEM_LOGGING__LEVEL", "trace");

            let config = load_config_from_file(jail.directory().join("custom.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.logging.level, LogLevel::Trace);
            assert!(!config.events.enabled);
            Ok(())
        });
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("kgem.ini", "level = debug")?;
            let result = ConfigLoader::new().file(jail.directory().join("kgem.ini")).load();
            assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "ini"));
            Ok(())
        });
    }
}
