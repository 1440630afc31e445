use crate::prelude::{eprintln, *};
use codeaura_core::action::{ActionKind, ToolIds};
use codeaura_core::registry::{Registry, RegistryTable};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// API base used when neither the command line nor the config file sets one
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Optional `config.toml`
///
/// ```toml
/// api_url = "https://api.codeaura.com/api"
///
/// [tools]
/// generate = 1
/// convert = 4
///
/// [registry]
/// native_language = "javascript"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub api_url: Option<String>,
    pub tools: Option<ToolIds>,
    pub registry: Option<RegistryTable>,
}

impl ConfigFile {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| eyre!("Failed to parse config file: {}", e))
    }
}

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub token: Option<String>,
    pub tool_ids: ToolIds,
    pub registry: Registry,
    pub js_runtime: Option<String>,
}

/// Environment variable that overrides the tool id of `kind`
pub fn tool_env_var(kind: ActionKind) -> String {
    f!("CODE_AURA_TOOL_{}", kind.as_str().to_uppercase())
}

/// Default location of the config file
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|dir| dir.join("codeaura").join("config.toml"))
}

impl Settings {
    /// Load settings from the command line, environment and config file
    pub fn load(global: &crate::Global) -> Result<Self> {
        let file = match &global.config {
            Some(path) => read_config(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => read_config(&path)?,
                _ => ConfigFile::default(),
            },
        };

        let settings = Self::resolve(global, file, |name| std::env::var(name).ok())?;

        if global.verbose {
            eprintln!("API base: {}", settings.api_url);
            eprintln!("Tool ids: {:?}", settings.tool_ids);
            eprintln!(
                "Registry: {} languages, {} themes, native {}",
                settings.registry.languages().len(),
                settings.registry.themes().len(),
                settings.registry.native_language()
            );
            eprintln!();
        }

        Ok(settings)
    }

    /// Merge the layers; command line and environment win over the file,
    /// the file wins over built-in defaults
    pub fn resolve(
        global: &crate::Global,
        file: ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let api_url = global
            .api_url
            .clone()
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let mut tool_ids = file.tools.unwrap_or_default();
        for kind in ActionKind::ALL {
            let name = tool_env_var(kind);
            if let Some(value) = env(&name) {
                let id = value.trim().parse::<u32>().map_err(|_| {
                    Error::Config(f!("{name} must be a positive integer, got `{value}`"))
                })?;
                tool_ids.set(kind, id);
            }
        }

        let registry = match file.registry {
            Some(table) => Registry::from_table(table).map_err(|e| Error::Config(e.to_string()))?,
            None => Registry::builtin(),
        };

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token: global.token.clone().filter(|t| !t.is_empty()),
            tool_ids,
            registry,
            js_runtime: global.js_runtime.clone(),
        })
    }
}

fn read_config(path: &Path) -> Result<ConfigFile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| f!("Failed to read config file {}", path.display()))?;
    log::debug!("loaded config from {}", path.display());
    ConfigFile::parse(&text)
}
