//! Interactive editor session
//!
//! Reads commands line by line from stdin. AI requests run on their own task
//! and report back over a channel, so the loop keeps accepting input while a
//! request is in flight. Only one request may be outstanding; further
//! submissions are refused until it resolves.

use crate::client::{AiToolService, ApiClient};
use crate::config::Settings;
use crate::dispatcher::execute;
use crate::editor::{detect_language, format_result_text, format_run_text, save_source, tool_ids};
use crate::prelude::{eprintln, println, *};
use crate::sandbox::{Sandbox, DEFAULT_TIMEOUT_SECS};
use codeaura_core::action::{ActionKind, AiResult, ToolIds};
use codeaura_core::session::{Completion, EditorSession, SessionStatus};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const HELP: &str = "\
Commands:
  :generate <prompt>   generate code from a description (replaces the buffer)
  :debug [prompt]      look for bugs in the buffer
  :explain             explain the buffer
  :convert [language]  convert the buffer (replaces it and switches language)
  :run                 run the buffer in the sandbox
  :lang <id>           set the source language
  :target <id>         set the conversion target
  :targets             list conversion targets for the current language
  :theme <id>          set the editor theme
  :load <file>         replace the buffer with a file
  :save [file]         write the buffer (default code.<ext>)
  :show                print the buffer and settings
  :status              show whether a request is in flight
  :clear               empty the buffer
  :reset               start over; a pending answer will be ignored
  :help                this text
  :quit                leave
Any other line is appended to the buffer.";

#[derive(Debug, clap::Parser)]
#[command(name = "session")]
#[command(about = "Interactive editor session with AI assistance")]
pub struct App {
    /// File to open at startup
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Source language (defaults to the file extension, then JavaScript)
    #[arg(short, long)]
    pub language: Option<String>,

    /// Resolve tool ids from the backend catalogue at startup
    #[arg(long)]
    pub discover: bool,

    /// Seconds before a sandbox run is killed
    #[arg(long, env = "CODE_AURA_RUN_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,
}

/// A parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Generate(String),
    Debug(Option<String>),
    Explain,
    Convert(Option<String>),
    Run,
    Lang(String),
    Target(String),
    Targets,
    Theme(String),
    Load(PathBuf),
    Save(Option<PathBuf>),
    Show,
    Status,
    Clear,
    Reset,
    Help,
    Quit,
    /// Text for the buffer
    Line(String),
    /// A `:command` that is unknown or missing its argument
    Invalid(String),
}

pub fn parse_command(line: &str) -> Command {
    let Some(rest) = line.strip_prefix(':') else {
        return Command::Line(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest.trim(), ""),
    };
    let arg = (!arg.is_empty()).then(|| arg.to_string());

    match (name, arg) {
        ("generate" | "g", Some(prompt)) => Command::Generate(prompt),
        ("generate" | "g", None) => Command::Generate(String::new()),
        ("debug" | "d", arg) => Command::Debug(arg),
        ("explain" | "e", None) => Command::Explain,
        ("convert" | "c", arg) => Command::Convert(arg),
        ("run" | "r", None) => Command::Run,
        ("lang", Some(id)) => Command::Lang(id),
        ("target", Some(id)) => Command::Target(id),
        ("targets", None) => Command::Targets,
        ("theme", Some(id)) => Command::Theme(id),
        ("load", Some(path)) => Command::Load(PathBuf::from(path)),
        ("save", arg) => Command::Save(arg.map(PathBuf::from)),
        ("show", None) => Command::Show,
        ("status", None) => Command::Status,
        ("clear", None) => Command::Clear,
        ("reset", None) => Command::Reset,
        ("help" | "h" | "?", None) => Command::Help,
        ("quit" | "q" | "exit", None) => Command::Quit,
        _ => Command::Invalid(line.to_string()),
    }
}

/// What one read from stdin produced
#[derive(Debug)]
enum Input {
    Line(String),
    /// The line was consumed but could not be decoded
    Skipped(std::io::Error),
    /// End of input, or stdin can no longer be read
    End,
}

fn read_outcome(line: std::io::Result<Option<String>>) -> Input {
    match line {
        Ok(Some(line)) => Input::Line(line),
        Ok(None) => Input::End,
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => Input::Skipped(e),
        Err(e) => {
            log::warn!("stdin closed: {e}");
            Input::End
        }
    }
}

/// Loop state for one session
pub struct Repl<S> {
    settings: Settings,
    session: EditorSession,
    service: Arc<S>,
    tool_ids: ToolIds,
    sandbox: Sandbox,
    results: mpsc::UnboundedSender<(u64, AiResult)>,
}

enum Flow {
    Continue,
    Quit,
}

impl<S> Repl<S>
where
    S: AiToolService + Send + Sync + 'static,
{
    pub fn new(
        settings: Settings,
        session: EditorSession,
        service: Arc<S>,
        tool_ids: ToolIds,
        sandbox: Sandbox,
        results: mpsc::UnboundedSender<(u64, AiResult)>,
    ) -> Self {
        Self {
            settings,
            session,
            service,
            tool_ids,
            sandbox,
            results,
        }
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    /// Start an AI request in the background
    ///
    /// Refused while another request is pending; nothing is sent then.
    pub fn submit(&mut self, action: ActionKind) -> Result<u64> {
        self.ensure_idle(action)?;

        let request = self.session.start_request(action, &self.tool_ids)?;
        let seq = request.seq;
        let service = Arc::clone(&self.service);
        let results = self.results.clone();

        tokio::spawn(async move {
            let result = execute(service.as_ref(), &request).await;
            if results.send((request.seq, result)).is_err() {
                log::debug!("session closed before #{} resolved", request.seq);
            }
        });

        Ok(seq)
    }

    fn ensure_idle(&self, action: ActionKind) -> Result<()> {
        match self.session.status() {
            SessionStatus::Pending { seq, action: busy } => Err(eyre!(
                "{busy} (#{seq}) is still running; wait for it before starting {action}"
            )),
            SessionStatus::Idle => Ok(()),
        }
    }

    /// Apply a finished request, unless the session has moved on
    pub fn resolve(&mut self, seq: u64, result: AiResult) -> Completion {
        let completion = self.session.complete(seq, result);

        match completion {
            Completion::Applied => {
                if let Some(result) = self.session.last_result() {
                    print!("{}", format_result_text(result, &self.settings.registry));
                }
            }
            Completion::Stale => {
                log::debug!("discarded stale result #{seq}");
                eprintln!("{}", f!("(discarded an outdated answer #{seq})").bright_black());
            }
        }

        completion
    }

    async fn handle(&mut self, command: Command) -> Result<Flow> {
        let registry = &self.settings.registry;

        match command {
            Command::Generate(prompt) => {
                self.session.set_prompt(prompt);
                self.announce(ActionKind::Generate)?;
            }
            Command::Debug(prompt) => {
                self.session.set_prompt(prompt.unwrap_or_default());
                self.announce(ActionKind::Debug)?;
            }
            Command::Explain => self.announce(ActionKind::Explain)?,
            Command::Convert(target) => {
                self.ensure_idle(ActionKind::Convert)?;
                if let Some(target) = target {
                    self.session.set_target_language(registry, &target)?;
                }
                self.announce(ActionKind::Convert)?;
            }
            Command::Run => {
                let output = self
                    .sandbox
                    .run(
                        registry,
                        self.session.source_language(),
                        self.session.source_text(),
                    )
                    .await;
                print!("{}", format_run_text(&output));
                self.session.record_run(output);
            }
            Command::Lang(id) => {
                self.session.set_source_language(registry, &id)?;
                println!(
                    "Language: {}",
                    registry.display_name(self.session.source_language())
                );
            }
            Command::Target(id) => {
                self.session.set_target_language(registry, &id)?;
                println!("Target: {}", registry.display_name(&id));
            }
            Command::Targets => {
                let source = self.session.source_language();
                for language in registry.target_languages(source) {
                    println!("  {:<12} {}", language.id, language.name);
                }
            }
            Command::Theme(id) => {
                self.session.set_theme(registry, &id)?;
                println!("Theme: {}", id);
            }
            Command::Load(path) => {
                let text = tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| f!("Failed to read {}", path.display()))?;
                if let Some(language) = detect_language(registry, None, Some(path.as_path())) {
                    self.session.set_source_language(registry, &language)?;
                }
                self.session.set_source_text(text);
                println!(
                    "Loaded {} ({})",
                    path.display(),
                    registry.display_name(self.session.source_language())
                );
            }
            Command::Save(path) => {
                let path = path
                    .unwrap_or_else(|| PathBuf::from(self.session.download_file_name(registry)));
                save_source(&self.session, &path).await?;
                println!("Saved to {}", path.display());
            }
            Command::Show => self.show(),
            Command::Status => match self.session.status() {
                SessionStatus::Idle => println!("idle"),
                SessionStatus::Pending { seq, action } => println!("pending: {action} (#{seq})"),
            },
            Command::Clear => self.session.set_source_text(""),
            Command::Reset => {
                self.session.reset(registry);
                println!("Session reset");
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => return Ok(Flow::Quit),
            Command::Line(line) => self.session.push_line(&line),
            Command::Invalid(line) => {
                return Err(eyre!("Unknown command or missing argument: {line} (try :help)"))
            }
        }

        Ok(Flow::Continue)
    }

    fn announce(&mut self, action: ActionKind) -> Result<()> {
        let seq = self.submit(action)?;
        eprintln!("{}", f!("{action} sent (#{seq})...").bright_black());
        Ok(())
    }

    fn show(&self) {
        let registry = &self.settings.registry;
        let session = &self.session;

        println!(
            "{}: {} | {}: {} | {}: {}",
            "Language".green(),
            registry.display_name(session.source_language()),
            "Target".green(),
            session
                .target_language()
                .map(|t| registry.display_name(t))
                .unwrap_or("-"),
            "Theme".green(),
            session.theme()
        );
        for (idx, line) in session.source_text().lines().enumerate() {
            println!("{} {}", f!("{:>4}", idx + 1).bright_black(), line);
        }
    }
}

/// Module entry point
pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let settings = Settings::load(&global)?;
    let client = Arc::new(ApiClient::new(&settings)?);
    let ids = tool_ids(&settings, &client, app.discover).await;
    let sandbox = Sandbox::new(
        settings.js_runtime.as_deref(),
        Duration::from_secs(app.timeout),
    );

    let registry = &settings.registry;
    let mut session = EditorSession::new(registry);
    if let Some(path) = &app.file {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| f!("Failed to read {}", path.display()))?;
        session.set_source_text(text);
    }
    if let Some(language) = detect_language(registry, app.language.as_deref(), app.file.as_deref())
    {
        session.set_source_language(registry, &language)?;
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut repl = Repl::new(settings, session, client, ids, sandbox, tx);

    eprintln!("Code Aura editor session. Type :help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match read_outcome(line) {
                    Input::Line(line) => line,
                    Input::Skipped(e) => {
                        log::warn!("skipped unreadable input line: {e}");
                        eprintln!("{} {}", "error:".red().bold(), e);
                        continue;
                    }
                    Input::End => break,
                };
                match repl.handle(parse_command(line.trim_end())).await {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => {}
                    Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
                }
            }
            Some((seq, result)) = rx.recv() => {
                repl.resolve(seq, result);
            }
        }
    }

    // Input ended with a request still in flight: wait for its answer
    if repl.session().is_pending() {
        if let Some((seq, result)) = rx.recv().await {
            repl.resolve(seq, result);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::tests::FakeService;
    use codeaura_core::registry::Registry;
    use serde_json::json;

    fn settings() -> Settings {
        Settings {
            api_url: "http://localhost:5000/api".to_string(),
            token: None,
            tool_ids: ToolIds::default(),
            registry: Registry::builtin(),
            js_runtime: None,
        }
    }

    fn repl(
        service: FakeService,
    ) -> (
        Repl<FakeService>,
        Arc<FakeService>,
        mpsc::UnboundedReceiver<(u64, AiResult)>,
    ) {
        let settings = settings();
        let session = EditorSession::new(&settings.registry);
        let service = Arc::new(service);
        let (tx, rx) = mpsc::unbounded_channel();
        let repl = Repl::new(
            settings,
            session,
            Arc::clone(&service),
            ToolIds::default(),
            Sandbox::new(Some("codeaura-no-such-runtime"), Duration::from_secs(1)),
            tx,
        );
        (repl, service, rx)
    }

    // ============================================================================
    // Command parsing
    // ============================================================================

    #[test]
    fn test_parse_commands_with_arguments() {
        assert_eq!(
            parse_command(":generate a function that adds two numbers"),
            Command::Generate("a function that adds two numbers".to_string())
        );
        assert_eq!(
            parse_command(":convert python"),
            Command::Convert(Some("python".to_string()))
        );
        assert_eq!(parse_command(":convert"), Command::Convert(None));
        assert_eq!(
            parse_command(":save out.js"),
            Command::Save(Some(PathBuf::from("out.js")))
        );
        assert_eq!(parse_command(":q"), Command::Quit);
    }

    #[test]
    fn test_parse_plain_lines_go_to_buffer() {
        assert_eq!(
            parse_command("console.log('hi');"),
            Command::Line("console.log('hi');".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_unknown_and_missing_arguments() {
        assert!(matches!(parse_command(":frobnicate"), Command::Invalid(_)));
        assert!(matches!(parse_command(":lang"), Command::Invalid(_)));
        assert!(matches!(parse_command(":explain now"), Command::Invalid(_)));
    }

    #[test]
    fn test_undecodable_line_is_skipped_not_fatal() {
        let invalid = std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "stream did not contain valid UTF-8",
        );
        assert!(matches!(read_outcome(Err(invalid)), Input::Skipped(_)));
        assert!(matches!(
            read_outcome(Ok(Some(":run".to_string()))),
            Input::Line(line) if line == ":run"
        ));
        assert!(matches!(read_outcome(Ok(None)), Input::End));
    }

    // ============================================================================
    // Request handling
    // ============================================================================

    #[tokio::test]
    async fn test_second_submission_rejected_while_pending() {
        let (mut repl, service, mut rx) =
            repl(FakeService::answering(json!({ "explanation": "adds" })));

        let seq = repl.submit(ActionKind::Explain).unwrap();
        assert!(repl.submit(ActionKind::Debug).is_err());

        let (resolved_seq, result) = rx.recv().await.unwrap();
        assert_eq!(resolved_seq, seq);
        assert_eq!(service.calls(), 1);

        assert_eq!(repl.resolve(resolved_seq, result), Completion::Applied);
        assert!(!repl.session().is_pending());
    }

    #[tokio::test]
    async fn test_empty_generate_prompt_sends_nothing() {
        let (mut repl, service, _rx) =
            repl(FakeService::answering(json!({ "generated_code": "x" })));

        let outcome = repl.handle(Command::Generate(String::new())).await;

        assert!(outcome.is_err());
        assert_eq!(service.calls(), 0);
        assert!(!repl.session().is_pending());
    }

    #[tokio::test]
    async fn test_answer_after_reset_is_discarded() {
        let (mut repl, _service, mut rx) =
            repl(FakeService::answering(json!({ "generated_code": "old" })));

        repl.handle(Command::Generate("anything".to_string()))
            .await
            .unwrap();
        repl.handle(Command::Reset).await.unwrap();
        repl.handle(Command::Line("new".to_string())).await.unwrap();

        let (seq, result) = rx.recv().await.unwrap();
        assert_eq!(repl.resolve(seq, result), Completion::Stale);
        assert!(repl.session().source_text().ends_with("new"));
        assert!(repl.session().last_result().is_none());
    }

    #[tokio::test]
    async fn test_convert_to_source_language_is_refused() {
        let (mut repl, service, _rx) =
            repl(FakeService::answering(json!({ "converted_code": "x" })));

        let outcome = repl
            .handle(Command::Convert(Some("javascript".to_string())))
            .await;

        assert!(outcome.is_err());
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_convert_applies_code_and_language() {
        let (mut repl, _service, mut rx) = repl(FakeService::answering(json!({
            "converted_code": "print('hi')",
            "target_language": "python"
        })));

        repl.handle(Command::Convert(Some("python".to_string())))
            .await
            .unwrap();
        let (seq, result) = rx.recv().await.unwrap();
        repl.resolve(seq, result);

        assert_eq!(repl.session().source_text(), "print('hi')");
        assert_eq!(repl.session().source_language(), "python");
    }

    #[tokio::test]
    async fn test_run_of_non_native_language_records_single_line() {
        let (mut repl, _service, _rx) = repl(FakeService::answering(json!({})));

        repl.handle(Command::Lang("ruby".to_string())).await.unwrap();
        repl.handle(Command::Run).await.unwrap();

        let output = repl.session().last_run().unwrap();
        assert_eq!(output.len(), 1);
        assert!(output[0].contains("Ruby"));
    }

    #[tokio::test]
    async fn test_quit_stops_the_loop() {
        let (mut repl, _service, _rx) = repl(FakeService::answering(json!({})));
        assert!(matches!(
            repl.handle(Command::Quit).await.unwrap(),
            Flow::Quit
        ));
    }

    #[tokio::test]
    async fn test_refused_convert_keeps_target() {
        let (mut repl, service, _rx) =
            repl(FakeService::answering(json!({ "explanation": "adds" })));
        let before = repl.session().target_language().map(str::to_string);

        repl.submit(ActionKind::Explain).unwrap();
        let outcome = repl.handle(Command::Convert(Some("go".to_string()))).await;

        assert!(outcome.is_err());
        assert_eq!(
            repl.session().target_language().map(str::to_string),
            before
        );
        assert_ne!(before.as_deref(), Some("go"));
        assert!(service.calls() <= 1);
    }
}
