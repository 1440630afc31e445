use crate::client::ApiClient;
use crate::config::Settings;
use crate::prelude::{println, *};
use codeaura_core::action::{AiResult, ToolIds};
use codeaura_core::registry::Registry;
use codeaura_core::session::EditorSession;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

pub mod action;
pub mod run;

#[derive(Debug, clap::Parser)]
#[command(name = "editor")]
#[command(about = "One-shot AI actions and code execution")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Generate code from a description
    #[clap(name = "generate")]
    Generate(action::GenerateOptions),

    /// Ask the AI assistant to find bugs in a source file
    #[clap(name = "debug")]
    Debug(action::DebugOptions),

    /// Ask the AI assistant to explain a source file
    #[clap(name = "explain")]
    Explain(action::ExplainOptions),

    /// Convert a source file to another language
    #[clap(name = "convert")]
    Convert(action::ConvertOptions),

    /// Run a source file in the local sandbox (JavaScript only)
    #[clap(name = "run")]
    Run(run::RunOptions),
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let settings = Settings::load(&global)?;

    match app.command {
        Commands::Generate(options) => action::generate(options, settings).await,
        Commands::Debug(options) => action::debug(options, settings).await,
        Commands::Explain(options) => action::explain(options, settings).await,
        Commands::Convert(options) => action::convert(options, settings).await,
        Commands::Run(options) => run::run(options, settings).await,
    }
}

/// Where the source comes from, shared by every file-based command
#[derive(Debug, Clone, clap::Args)]
pub struct SourceArgs {
    /// Source file; reads stdin when omitted or `-`
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Language of the source (defaults to the file extension, then JavaScript)
    #[arg(short, long)]
    pub language: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SourceArgs {
    /// The input file, unless the source comes from stdin
    pub fn path(&self) -> Option<&Path> {
        self.file.as_deref().filter(|p| p.as_os_str() != "-")
    }
}

/// Pick the language for a source: explicit flag, then file extension
pub fn detect_language(
    registry: &Registry,
    explicit: Option<&str>,
    path: Option<&Path>,
) -> Option<String> {
    explicit.map(str::to_string).or_else(|| {
        path.and_then(|p| p.extension())
            .and_then(|ext| ext.to_str())
            .and_then(|ext| registry.language_for_extension(ext))
            .map(|l| l.id.clone())
    })
}

/// Build a session holding the requested source
pub async fn load_session(args: &SourceArgs, registry: &Registry) -> Result<EditorSession> {
    let text = match args.path() {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| f!("Failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("Failed to read source from stdin")?;
            text
        }
    };

    let mut session = EditorSession::new(registry);
    if let Some(language) = detect_language(registry, args.language.as_deref(), args.path()) {
        session.set_source_language(registry, &language)?;
    }
    session.set_source_text(text);

    Ok(session)
}

/// Tool ids from settings, optionally refreshed from the backend catalogue
pub async fn tool_ids(settings: &Settings, client: &ApiClient, discover: bool) -> ToolIds {
    if !discover {
        return settings.tool_ids;
    }

    match client.list_tools().await {
        Ok(catalogue) => {
            let ids = ToolIds::resolve(&catalogue, settings.tool_ids);
            log::info!("resolved tool ids from catalogue: {ids:?}");
            ids
        }
        Err(e) => {
            log::warn!("tool discovery failed, using configured ids: {e}");
            settings.tool_ids
        }
    }
}

/// Write the session's source to `path`
pub async fn save_source(session: &EditorSession, path: &Path) -> Result<()> {
    tokio::fs::write(path, session.source_text())
        .await
        .with_context(|| f!("Failed to write {}", path.display()))?;
    log::info!("saved {} bytes to {}", session.source_text().len(), path.display());
    Ok(())
}

fn banner(title: &str) -> String {
    f!(
        "\n{}\n{}\n{}\n",
        "=".repeat(80).bright_cyan(),
        title.to_uppercase().bright_cyan().bold(),
        "=".repeat(80).bright_cyan()
    )
}

/// Render an AI result for the terminal
pub fn format_result_text(result: &AiResult, registry: &Registry) -> String {
    let mut out = banner(result.action.title());

    match result.error() {
        Some(error) => {
            out.push_str(&f!("\n{}: {}\n", "Error".red().bold(), error));
        }
        None => {
            out.push('\n');
            out.push_str(&result.body());
            if !out.ends_with('\n') {
                out.push('\n');
            }
            if let Some((_, Some(language))) = result.rewritten_code() {
                out.push_str(&f!(
                    "\n{}: {}\n",
                    "Language".green(),
                    registry.display_name(language).bright_white()
                ));
            }
        }
    }

    out
}

/// Render sandbox output for the terminal
pub fn format_run_text(output: &[String]) -> String {
    let mut out = banner("Execution output");
    out.push('\n');

    if output.is_empty() {
        out.push_str(&f!("{}\n", "(no output)".bright_black()));
    }
    for line in output {
        out.push_str(line);
        out.push('\n');
    }

    out
}

pub fn format_result_json(result: &AiResult) -> Result<String> {
    serde_json::to_string_pretty(result).map_err(|e| eyre!("JSON serialization failed: {}", e))
}

/// Print the session's last result; a failed result becomes an error exit
pub fn report(session: &EditorSession, registry: &Registry, json: bool) -> Result<()> {
    let result = session
        .last_result()
        .ok_or_eyre("The AI request produced no result")?;

    if json {
        println!("{}", format_result_json(result)?);
    } else {
        print!("{}", format_result_text(result, registry));
    }

    match result.error() {
        Some(error) => Err(eyre!("{} failed: {}", result.action, error)),
        None => Ok(()),
    }
}
