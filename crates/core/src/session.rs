//! Editor session state
//!
//! Holds what the user is editing plus the status of the one AI request that
//! may be in flight. Every request gets a sequence number when it starts;
//! a result is applied only while its number is still the latest one handed
//! out, so a late answer after [`EditorSession::reset`] is dropped.

use crate::action::{build_request, ActionKind, AiRequest, AiResult, RequestInput, ToolIds};
use crate::error::{SessionError, ValidationError};
use crate::registry::{Registry, DEFAULT_LANGUAGE, DEFAULT_SOURCE_TEXT, DEFAULT_THEME};
use serde::Serialize;

/// Whether an AI request is outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Pending { seq: u64, action: ActionKind },
}

/// What [`EditorSession::complete`] did with a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The session moved on; the result was discarded
    Stale,
}

/// State of one editor
#[derive(Debug, Clone, Serialize)]
pub struct EditorSession {
    source_text: String,
    source_language: String,
    target_language: Option<String>,
    theme: String,
    prompt: String,
    status: SessionStatus,
    last_result: Option<AiResult>,
    last_run: Option<Vec<String>>,
    latest_seq: u64,
}

impl EditorSession {
    /// Fresh session with the registry's defaults
    pub fn new(registry: &Registry) -> Self {
        let source_language = registry
            .language(DEFAULT_LANGUAGE)
            .or_else(|| registry.languages().first())
            .map(|l| l.id.clone())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        let theme = registry
            .theme(DEFAULT_THEME)
            .or_else(|| registry.themes().first())
            .map(|t| t.id.clone())
            .unwrap_or_else(|| DEFAULT_THEME.to_string());
        let target_language = registry
            .default_target(&source_language)
            .map(|l| l.id.clone());

        Self {
            source_text: DEFAULT_SOURCE_TEXT.to_string(),
            source_language,
            target_language,
            theme,
            prompt: String::new(),
            status: SessionStatus::Idle,
            last_result: None,
            last_run: None,
            latest_seq: 0,
        }
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn source_language(&self) -> &str {
        &self.source_language
    }

    pub fn target_language(&self) -> Option<&str> {
        self.target_language.as_deref()
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, SessionStatus::Pending { .. })
    }

    pub fn last_result(&self) -> Option<&AiResult> {
        self.last_result.as_ref()
    }

    pub fn last_run(&self) -> Option<&[String]> {
        self.last_run.as_deref()
    }

    /// Sequence number of the most recently started request
    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    pub fn set_source_text(&mut self, text: impl Into<String>) {
        self.source_text = text.into();
    }

    /// Append one line to the source buffer
    pub fn push_line(&mut self, line: &str) {
        if !self.source_text.is_empty() && !self.source_text.ends_with('\n') {
            self.source_text.push('\n');
        }
        self.source_text.push_str(line);
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// Switch the source language, re-picking the target if it would collide
    pub fn set_source_language(
        &mut self,
        registry: &Registry,
        id: &str,
    ) -> Result<(), ValidationError> {
        if registry.language(id).is_none() {
            return Err(ValidationError::UnknownLanguage(id.to_string()));
        }

        self.source_language = id.to_string();
        if self.target_language.as_deref().map_or(true, |t| t == id) {
            self.target_language = registry.default_target(id).map(|l| l.id.clone());
        }

        Ok(())
    }

    pub fn set_target_language(
        &mut self,
        registry: &Registry,
        id: &str,
    ) -> Result<(), ValidationError> {
        if registry.language(id).is_none() {
            return Err(ValidationError::UnknownLanguage(id.to_string()));
        }
        if id == self.source_language {
            return Err(ValidationError::SameLanguage(id.to_string()));
        }

        self.target_language = Some(id.to_string());
        Ok(())
    }

    pub fn set_theme(&mut self, registry: &Registry, id: &str) -> Result<(), ValidationError> {
        if registry.theme(id).is_none() {
            return Err(ValidationError::UnknownTheme(id.to_string()));
        }

        self.theme = id.to_string();
        Ok(())
    }

    fn request_input(&self) -> RequestInput<'_> {
        RequestInput {
            code: &self.source_text,
            prompt: &self.prompt,
            source_language: &self.source_language,
            target_language: self.target_language.as_deref(),
        }
    }

    /// Validate and start a request, moving the session to pending
    ///
    /// Rejected while another request is pending. A validation failure leaves
    /// the session untouched.
    pub fn start_request(
        &mut self,
        action: ActionKind,
        tool_ids: &ToolIds,
    ) -> Result<AiRequest, SessionError> {
        if let SessionStatus::Pending { seq, .. } = self.status {
            return Err(SessionError::Busy(seq));
        }

        let request = build_request(self.latest_seq + 1, action, tool_ids, &self.request_input())?;

        self.latest_seq = request.seq;
        self.status = SessionStatus::Pending {
            seq: request.seq,
            action,
        };

        Ok(request)
    }

    /// Apply the result of request `seq` if it is still the latest one
    ///
    /// Successful generate and convert results replace the source text. A
    /// conversion also switches the source language and makes the old source
    /// language the new target.
    pub fn complete(&mut self, seq: u64, result: AiResult) -> Completion {
        if seq != self.latest_seq {
            return Completion::Stale;
        }

        self.status = SessionStatus::Idle;

        if let Some((code, language)) = result.rewritten_code() {
            self.source_text = code.to_string();
            if let Some(language) = language {
                if language != self.source_language {
                    let previous = std::mem::replace(&mut self.source_language, language.to_string());
                    self.target_language = Some(previous);
                }
            }
        }

        self.last_result = Some(result);
        Completion::Applied
    }

    /// Record the output of a sandbox run
    pub fn record_run(&mut self, output: Vec<String>) {
        self.last_run = Some(output);
    }

    /// Back to defaults; any in-flight result becomes stale
    pub fn reset(&mut self, registry: &Registry) {
        let next_seq = self.latest_seq + 1;
        *self = Self::new(registry);
        self.latest_seq = next_seq;
    }

    /// File name offered when saving the buffer
    pub fn download_file_name(&self, registry: &Registry) -> String {
        let extension = registry
            .language(&self.source_language)
            .map(|l| l.extension.as_str())
            .unwrap_or(self.source_language.as_str());
        format!("code.{extension}")
    }
}
