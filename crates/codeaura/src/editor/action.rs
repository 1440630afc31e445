use crate::client::ApiClient;
use crate::config::Settings;
use crate::dispatcher::dispatch;
use crate::prelude::{eprintln, *};
use codeaura_core::action::ActionKind;
use codeaura_core::session::EditorSession;
use std::path::PathBuf;

use super::{load_session, report, save_source, tool_ids, SourceArgs};

/// Options shared by every AI action
#[derive(Debug, Clone, clap::Args)]
pub struct AiArgs {
    /// Resolve tool ids from the backend catalogue before dispatching
    #[arg(long)]
    pub discover: bool,
}

#[derive(Debug, Clone, clap::Args)]
pub struct GenerateOptions {
    /// Description of the code to generate
    #[arg(value_name = "PROMPT")]
    pub prompt: String,

    /// Language to generate
    #[arg(short, long, default_value = "javascript")]
    pub language: String,

    /// Write the generated code to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Save the generated code as `code.<ext>` in the current directory
    #[arg(long, conflicts_with = "output")]
    pub save: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    #[clap(flatten)]
    pub ai: AiArgs,
}

#[derive(Debug, Clone, clap::Args)]
pub struct DebugOptions {
    #[clap(flatten)]
    pub source: SourceArgs,

    /// What to look for (defaults to a general bug hunt)
    #[arg(short, long)]
    pub prompt: Option<String>,

    #[clap(flatten)]
    pub ai: AiArgs,
}

#[derive(Debug, Clone, clap::Args)]
pub struct ExplainOptions {
    #[clap(flatten)]
    pub source: SourceArgs,

    #[clap(flatten)]
    pub ai: AiArgs,
}

#[derive(Debug, Clone, clap::Args)]
pub struct ConvertOptions {
    #[clap(flatten)]
    pub source: SourceArgs,

    /// Target language
    #[arg(short, long, value_name = "LANGUAGE")]
    pub to: String,

    /// Write the converted code to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Save next to the input with the target language's extension
    /// (`code.<ext>` when reading stdin)
    #[arg(long, conflicts_with = "output")]
    pub save: bool,

    #[clap(flatten)]
    pub ai: AiArgs,
}

async fn send(
    settings: &Settings,
    session: &mut EditorSession,
    action: ActionKind,
    discover: bool,
) -> Result<()> {
    let client = ApiClient::new(settings)?;
    let ids = tool_ids(settings, &client, discover).await;
    dispatch(&client, session, action, &ids).await?;
    Ok(())
}

pub async fn generate(options: GenerateOptions, settings: Settings) -> Result<()> {
    let registry = &settings.registry;
    let mut session = EditorSession::new(registry);
    session.set_source_language(registry, &options.language)?;
    session.set_source_text("");
    session.set_prompt(options.prompt);

    send(&settings, &mut session, ActionKind::Generate, options.ai.discover).await?;
    report(&session, registry, options.json)?;

    let target = match (options.output, options.save) {
        (Some(path), _) => Some(path),
        (None, true) => Some(PathBuf::from(session.download_file_name(registry))),
        (None, false) => None,
    };
    if let Some(path) = target {
        save_source(&session, &path).await?;
        eprintln!("Saved to {}", path.display());
    }

    Ok(())
}

pub async fn debug(options: DebugOptions, settings: Settings) -> Result<()> {
    let registry = &settings.registry;
    let mut session = load_session(&options.source, registry).await?;
    if let Some(prompt) = options.prompt {
        session.set_prompt(prompt);
    }

    send(&settings, &mut session, ActionKind::Debug, options.ai.discover).await?;
    report(&session, registry, options.source.json)
}

pub async fn explain(options: ExplainOptions, settings: Settings) -> Result<()> {
    let registry = &settings.registry;
    let mut session = load_session(&options.source, registry).await?;

    send(&settings, &mut session, ActionKind::Explain, options.ai.discover).await?;
    report(&session, registry, options.source.json)
}

pub async fn convert(options: ConvertOptions, settings: Settings) -> Result<()> {
    let registry = &settings.registry;
    let mut session = load_session(&options.source, registry).await?;
    session.set_target_language(registry, &options.to)?;

    send(&settings, &mut session, ActionKind::Convert, options.ai.discover).await?;
    report(&session, registry, options.source.json)?;

    let target = match (options.output, options.save) {
        (Some(path), _) => Some(path),
        (None, true) => Some(converted_path(&options.source, &session, &settings)),
        (None, false) => None,
    };
    if let Some(path) = target {
        save_source(&session, &path).await?;
        eprintln!("Saved to {}", path.display());
    }

    Ok(())
}

/// Input path with the extension of the session's (new) language
fn converted_path(source: &SourceArgs, session: &EditorSession, settings: &Settings) -> PathBuf {
    let registry = &settings.registry;
    match (source.path(), registry.language(session.source_language())) {
        (Some(path), Some(language)) => path.with_extension(&language.extension),
        _ => PathBuf::from(session.download_file_name(registry)),
    }
}
