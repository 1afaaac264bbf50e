//! Configuration system for sgtt.
//!
//! Loads config from:
//! 1. Global: ~/.config/sgtt/config.toml (or $XDG_CONFIG_HOME/sgtt/config.toml)
//! 2. Per-project: .sgtt/config.toml (overrides global, field by field)
//!
//! Example config.toml:
//! ```toml
//! [template]
//! extension = "sgtt"
//! include_extension = "ttinc"
//!
//! [output]
//! extension = "cs"
//! dir = "generated"
//!
//! [render]
//! locale = "de_DE.UTF-8"
//! libraries = ["table", "io", "os", "string", "math"]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use sgtt_runtime::{Libraries, RuntimeError};

pub const DEFAULT_TEMPLATE_EXTENSION: &str = "sgtt";
pub const DEFAULT_INCLUDE_EXTENSION: &str = sgtt_template::directive::DEFAULT_INCLUDE_EXTENSION;
pub const DEFAULT_OUTPUT_EXTENSION: &str = "cs";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Template discovery settings.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TemplateConfig {
    /// Template file extension, without the dot.
    pub extension: Option<String>,
    /// Include file extension, without the dot.
    pub include_extension: Option<String>,
}

/// Generated file settings.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    pub extension: Option<String>,
    /// Output directory, relative to the project root.
    pub dir: Option<PathBuf>,
}

/// Generator program settings.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RenderConfig {
    pub locale: Option<String>,
    pub libraries: Option<Vec<String>>,
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SgttConfig {
    pub template: TemplateConfig,
    pub output: OutputConfig,
    pub render: RenderConfig,
}

impl SgttConfig {
    /// Load configuration for a project.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        Self::load_with_global(Self::global_config_path().as_deref(), root)
    }

    /// Load `global` (when given) and the project config under `root`.
    pub fn load_with_global(global: Option<&Path>, root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(global) = global.map(Self::load_file).transpose()?.flatten() {
            config = config.merge(global);
        }

        let project_path = root.join(".sgtt").join("config.toml");
        if let Some(project) = Self::load_file(&project_path)? {
            config = config.merge(project);
        }

        Ok(config)
    }

    /// Get the global config path.
    fn global_config_path() -> Option<PathBuf> {
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;
        Some(config_home.join("sgtt").join("config.toml"))
    }

    /// Load config from a file path. A missing file is `None`.
    pub fn load_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&content)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Merge another config into this one. Fields set in `other` win.
    pub fn merge(self, other: Self) -> Self {
        Self {
            template: TemplateConfig {
                extension: other.template.extension.or(self.template.extension),
                include_extension: other
                    .template
                    .include_extension
                    .or(self.template.include_extension),
            },
            output: OutputConfig {
                extension: other.output.extension.or(self.output.extension),
                dir: other.output.dir.or(self.output.dir),
            },
            render: RenderConfig {
                locale: other.render.locale.or(self.render.locale),
                libraries: other.render.libraries.or(self.render.libraries),
            },
        }
    }

    pub fn template_extension(&self) -> &str {
        self.template
            .extension
            .as_deref()
            .unwrap_or(DEFAULT_TEMPLATE_EXTENSION)
    }

    pub fn include_extension(&self) -> &str {
        self.template
            .include_extension
            .as_deref()
            .unwrap_or(DEFAULT_INCLUDE_EXTENSION)
    }

    pub fn output_extension(&self) -> &str {
        self.output
            .extension
            .as_deref()
            .unwrap_or(DEFAULT_OUTPUT_EXTENSION)
    }

    /// Output directory for a project at `root`.
    pub fn output_dir(&self, root: &Path) -> PathBuf {
        match &self.output.dir {
            Some(dir) => root.join(dir),
            None => root.to_path_buf(),
        }
    }

    /// Configured locale. Blank values count as unset.
    pub fn locale(&self) -> Option<&str> {
        self.render
            .locale
            .as_deref()
            .map(str::trim)
            .filter(|locale| !locale.is_empty())
    }

    /// Linked libraries, validated.
    pub fn libraries(&self) -> Result<Libraries, RuntimeError> {
        match &self.render.libraries {
            Some(names) => Libraries::from_names(names),
            None => Ok(Libraries::default()),
        }
    }
}
