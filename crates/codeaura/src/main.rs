#![allow(unused)]

use crate::prelude::*;
use clap::Parser;
use std::path::PathBuf;

mod catalogue;
mod client;
mod config;
mod dispatcher;
mod editor;
mod error;
mod prelude;
mod registry;
mod sandbox;
mod session;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "AI-assisted code editing: generate, debug, explain, convert and run code"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Base URL of the Code Aura API
    #[clap(long, env = "CODE_AURA_API_URL", global = true)]
    api_url: Option<String>,

    /// Bearer token for the API
    #[clap(long, env = "CODE_AURA_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Configuration file (defaults to the user config directory)
    #[clap(long, env = "CODE_AURA_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// JavaScript runtime used by the sandbox, as a name on PATH or a path
    #[clap(long, env = "CODE_AURA_JS_RUNTIME", global = true)]
    js_runtime: Option<String>,

    /// Whether to display additional information.
    #[clap(long, env = "CODE_AURA_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// One-shot AI actions and sandboxed runs on a source file
    Editor(crate::editor::App),

    /// Interactive editor session
    Session(crate::session::App),

    /// List supported languages
    Languages(crate::registry::LanguagesOptions),

    /// List editor themes
    Themes(crate::registry::ThemesOptions),

    /// Inspect the backend's AI tools
    Tools(crate::catalogue::App),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Editor(sub_app) => crate::editor::run(sub_app, app.global).await,
        SubCommands::Session(sub_app) => crate::session::run(sub_app, app.global).await,
        SubCommands::Languages(options) => crate::registry::languages(options, app.global).await,
        SubCommands::Themes(options) => crate::registry::themes(options, app.global).await,
        SubCommands::Tools(sub_app) => crate::catalogue::run(sub_app, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
