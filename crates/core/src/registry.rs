//! Language and theme registry
//!
//! A read-only lookup table built once at startup and handed to whoever needs
//! it. The built-in table can be replaced per deployment with
//! [`Registry::from_toml`]; nothing here is global state.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Language selected for a fresh editor session
pub const DEFAULT_LANGUAGE: &str = "javascript";

/// Theme selected for a fresh editor session
pub const DEFAULT_THEME: &str = "vs-dark";

/// Preferred conversion target when the source allows it
pub const PREFERRED_TARGET: &str = "python";

/// Source text a fresh editor session starts with
pub const DEFAULT_SOURCE_TEXT: &str = "// write your code here";

/// Programming language known to the editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub id: String,
    pub name: String,
    /// File extension used when saving, without the dot
    pub extension: String,
}

/// Editor color theme
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub id: String,
    pub name: String,
}

/// Deployment-supplied registry overrides
///
/// Missing sections fall back to the built-in table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryTable {
    pub native_language: Option<String>,
    #[serde(default)]
    pub languages: Vec<Language>,
    #[serde(default)]
    pub themes: Vec<Theme>,
}

/// Error type for registry construction
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Language list is empty")]
    NoLanguages,

    #[error("Theme list is empty")]
    NoThemes,

    #[error("Duplicate language id: {0}")]
    DuplicateLanguage(String),

    #[error("Duplicate theme id: {0}")]
    DuplicateTheme(String),

    #[error("Native language `{0}` is not in the language list")]
    UnknownNative(String),

    #[error("Invalid registry table: {0}")]
    Parse(String),
}

/// Supported languages and themes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    languages: Vec<Language>,
    themes: Vec<Theme>,
    native_language: String,
}

fn language(id: &str, name: &str, extension: &str) -> Language {
    Language {
        id: id.to_string(),
        name: name.to_string(),
        extension: extension.to_string(),
    }
}

fn theme(id: &str, name: &str) -> Theme {
    Theme {
        id: id.to_string(),
        name: name.to_string(),
    }
}

fn builtin_languages() -> Vec<Language> {
    vec![
        language("javascript", "JavaScript", "js"),
        language("typescript", "TypeScript", "ts"),
        language("python", "Python", "py"),
        language("java", "Java", "java"),
        language("csharp", "C#", "cs"),
        language("cpp", "C++", "cpp"),
        language("php", "PHP", "php"),
        language("ruby", "Ruby", "rb"),
        language("go", "Go", "go"),
        language("rust", "Rust", "rs"),
        language("sql", "SQL", "sql"),
        language("html", "HTML", "html"),
        language("css", "CSS", "css"),
        language("json", "JSON", "json"),
        language("markdown", "Markdown", "md"),
        language("yaml", "YAML", "yaml"),
    ]
}

fn builtin_themes() -> Vec<Theme> {
    vec![
        theme("vs", "Light"),
        theme("vs-dark", "Dark"),
        theme("hc-black", "High contrast (dark)"),
        theme("hc-light", "High contrast (light)"),
    ]
}

impl Registry {
    /// Build a registry, checking that every id is unique
    pub fn new(
        languages: Vec<Language>,
        themes: Vec<Theme>,
        native_language: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let native_language = native_language.into();

        if languages.is_empty() {
            return Err(RegistryError::NoLanguages);
        }
        if themes.is_empty() {
            return Err(RegistryError::NoThemes);
        }

        let mut seen = HashSet::new();
        for lang in &languages {
            if !seen.insert(lang.id.as_str()) {
                return Err(RegistryError::DuplicateLanguage(lang.id.clone()));
            }
        }

        let mut seen = HashSet::new();
        for t in &themes {
            if !seen.insert(t.id.as_str()) {
                return Err(RegistryError::DuplicateTheme(t.id.clone()));
            }
        }

        if !languages.iter().any(|l| l.id == native_language) {
            return Err(RegistryError::UnknownNative(native_language));
        }

        Ok(Self {
            languages,
            themes,
            native_language,
        })
    }

    /// The table the editor ships with
    pub fn builtin() -> Self {
        Self {
            languages: builtin_languages(),
            themes: builtin_themes(),
            native_language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    /// Build a registry from overrides, filling gaps from the built-in table
    pub fn from_table(table: RegistryTable) -> Result<Self, RegistryError> {
        let languages = if table.languages.is_empty() {
            builtin_languages()
        } else {
            table.languages
        };
        let themes = if table.themes.is_empty() {
            builtin_themes()
        } else {
            table.themes
        };
        let native = table
            .native_language
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        Self::new(languages, themes, native)
    }

    /// Parse a TOML registry table
    pub fn from_toml(text: &str) -> Result<Self, RegistryError> {
        let table: RegistryTable =
            toml::from_str(text).map_err(|e| RegistryError::Parse(e.to_string()))?;
        Self::from_table(table)
    }

    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    pub fn themes(&self) -> &[Theme] {
        &self.themes
    }

    pub fn language(&self, id: &str) -> Option<&Language> {
        self.languages.iter().find(|l| l.id == id)
    }

    /// Language whose file extension matches `extension` (no leading dot)
    pub fn language_for_extension(&self, extension: &str) -> Option<&Language> {
        self.languages
            .iter()
            .find(|l| l.extension.eq_ignore_ascii_case(extension))
    }

    pub fn theme(&self, id: &str) -> Option<&Theme> {
        self.themes.iter().find(|t| t.id == id)
    }

    /// The one language the sandbox can execute
    pub fn native_language(&self) -> &str {
        &self.native_language
    }

    pub fn is_native(&self, id: &str) -> bool {
        self.native_language == id
    }

    /// Conversion targets for `source`: the master list without `source`
    pub fn target_languages<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a Language> {
        self.languages.iter().filter(move |l| l.id != source)
    }

    /// Target picked when none is selected or the current one collides
    pub fn default_target(&self, source: &str) -> Option<&Language> {
        if source != PREFERRED_TARGET {
            if let Some(preferred) = self.language(PREFERRED_TARGET) {
                return Some(preferred);
            }
        }
        self.languages.iter().find(|l| l.id != source)
    }

    /// Display name for a language id, falling back to the id itself
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.language(id).map(|l| l.name.as_str()).unwrap_or(id)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}
