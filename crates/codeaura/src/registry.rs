use crate::config::Settings;
use crate::prelude::{println, *};
use codeaura_core::registry::{Language, Registry};

#[derive(Debug, Clone, clap::Args)]
pub struct LanguagesOptions {
    /// Only list languages this one can be converted to
    #[arg(long, value_name = "LANGUAGE")]
    pub for_target: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, clap::Args)]
pub struct ThemesOptions {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Languages to list, optionally restricted to conversion targets of `source`
pub fn select_languages<'a>(
    registry: &'a Registry,
    source: Option<&'a str>,
) -> Result<Vec<&'a Language>> {
    match source {
        Some(source) => {
            if registry.language(source).is_none() {
                return Err(eyre!("Unknown language: {source}"));
            }
            Ok(registry.target_languages(source).collect())
        }
        None => Ok(registry.languages().iter().collect()),
    }
}

pub async fn languages(options: LanguagesOptions, global: crate::Global) -> Result<()> {
    let settings = Settings::load(&global)?;
    let registry = &settings.registry;
    let languages = select_languages(registry, options.for_target.as_deref())?;

    if options.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&languages)
                .map_err(|e| eyre!("JSON serialization failed: {}", e))?
        );
        return Ok(());
    }

    let mut table = new_table();
    table.add_row(prettytable::row!["Id", "Name", "Extension", "Runs locally"]);
    for language in languages {
        let native = if registry.is_native(&language.id) { "yes" } else { "" };
        table.add_row(prettytable::row![
            language.id,
            language.name,
            f!(".{}", language.extension),
            native
        ]);
    }
    table.printstd();

    Ok(())
}

pub async fn themes(options: ThemesOptions, global: crate::Global) -> Result<()> {
    let settings = Settings::load(&global)?;
    let themes = settings.registry.themes();

    if options.json {
        println!(
            "{}",
            serde_json::to_string_pretty(themes)
                .map_err(|e| eyre!("JSON serialization failed: {}", e))?
        );
        return Ok(());
    }

    let mut table = new_table();
    table.add_row(prettytable::row!["Id", "Name"]);
    for theme in themes {
        table.add_row(prettytable::row![theme.id, theme.name]);
    }
    table.printstd();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_all_languages() {
        let registry = Registry::builtin();
        let languages = select_languages(&registry, None).unwrap();
        assert_eq!(languages.len(), registry.languages().len());
    }

    #[test]
    fn test_select_targets_excludes_source() {
        let registry = Registry::builtin();
        let languages = select_languages(&registry, Some("python")).unwrap();
        assert_eq!(languages.len(), registry.languages().len() - 1);
        assert!(languages.iter().all(|l| l.id != "python"));
    }

    #[test]
    fn test_select_targets_of_unknown_language() {
        let registry = Registry::builtin();
        assert!(select_languages(&registry, Some("cobol")).is_err());
    }
}
