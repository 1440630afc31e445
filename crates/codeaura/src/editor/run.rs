use crate::config::Settings;
use crate::prelude::{println, *};
use crate::sandbox::{Sandbox, DEFAULT_TIMEOUT_SECS};
use std::time::Duration;

use super::{format_run_text, load_session, SourceArgs};

#[derive(Debug, Clone, clap::Args)]
pub struct RunOptions {
    #[clap(flatten)]
    pub source: SourceArgs,

    /// Seconds before the run is killed
    #[arg(long, env = "CODE_AURA_RUN_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,
}

pub async fn run(options: RunOptions, settings: Settings) -> Result<()> {
    let registry = &settings.registry;
    let mut session = load_session(&options.source, registry).await?;

    let sandbox = Sandbox::new(
        settings.js_runtime.as_deref(),
        Duration::from_secs(options.timeout),
    );
    let output = sandbox
        .run(registry, session.source_language(), session.source_text())
        .await;
    session.record_run(output);
    let output = session.last_run().unwrap_or_default();

    if options.source.json {
        let value = serde_json::json!({
            "language": session.source_language(),
            "output": output,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value)
                .map_err(|e| eyre!("JSON serialization failed: {}", e))?
        );
    } else {
        print!("{}", format_run_text(output));
    }

    Ok(())
}
