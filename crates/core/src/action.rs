//! AI action table
//!
//! Each [`ActionKind`] owns a payload builder and a result unpacker, collected
//! in a static dispatch table. Building a request validates the input first;
//! anything rejected here never reaches the network.

use crate::error::{ErrorKind, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Prompt sent with `debug` when the user did not type one
pub const DEFAULT_DEBUG_PROMPT: &str = "Find and fix the bugs in this code";

/// Prompt sent with every `explain` request
pub const EXPLAIN_PROMPT: &str = "Explain this code";

/// AI action requested from the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Generate,
    Debug,
    Explain,
    Convert,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Generate,
        ActionKind::Debug,
        ActionKind::Explain,
        ActionKind::Convert,
    ];

    /// Short name used on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Generate => "generate",
            ActionKind::Debug => "debug",
            ActionKind::Explain => "explain",
            ActionKind::Convert => "convert",
        }
    }

    /// Tool type the backend catalogue uses for this action
    pub fn tool_type(self) -> &'static str {
        match self {
            ActionKind::Generate => "generate_code",
            ActionKind::Debug => "debug_code",
            ActionKind::Explain => "explain_code",
            ActionKind::Convert => "convert_code",
        }
    }

    pub fn from_tool_type(tool_type: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tool_type() == tool_type)
    }

    /// Heading for the result section
    pub fn title(self) -> &'static str {
        match self {
            ActionKind::Generate => "Generated code",
            ActionKind::Debug => "Debug report",
            ActionKind::Explain => "Code explanation",
            ActionKind::Convert => "Converted code",
        }
    }

    /// Whether a successful result replaces the editor contents
    pub fn rewrites_source(self) -> bool {
        matches!(self, ActionKind::Generate | ActionKind::Convert)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s || k.tool_type() == s)
            .ok_or_else(|| {
                format!("Unknown action: {s}. Valid actions: generate, debug, explain, convert")
            })
    }
}

/// Backend tool id for each action
///
/// The ids are deployment configuration. The defaults match the seeded
/// backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolIds {
    pub generate: u32,
    pub debug: u32,
    pub explain: u32,
    pub convert: u32,
}

impl Default for ToolIds {
    fn default() -> Self {
        Self {
            generate: 1,
            debug: 2,
            explain: 3,
            convert: 4,
        }
    }
}

impl ToolIds {
    pub fn get(&self, kind: ActionKind) -> u32 {
        match kind {
            ActionKind::Generate => self.generate,
            ActionKind::Debug => self.debug,
            ActionKind::Explain => self.explain,
            ActionKind::Convert => self.convert,
        }
    }

    pub fn set(&mut self, kind: ActionKind, id: u32) {
        match kind {
            ActionKind::Generate => self.generate = id,
            ActionKind::Debug => self.debug = id,
            ActionKind::Explain => self.explain = id,
            ActionKind::Convert => self.convert = id,
        }
    }
}

/// Editor state an action is built from
#[derive(Debug, Clone, Copy)]
pub struct RequestInput<'a> {
    pub code: &'a str,
    pub prompt: &'a str,
    pub source_language: &'a str,
    pub target_language: Option<&'a str>,
}

/// JSON body of `POST /ai-tools/{id}/use`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
}

/// A validated request, immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiRequest {
    /// Session sequence number assigned at dispatch
    pub seq: u64,
    pub action: ActionKind,
    pub tool_id: u32,
    pub payload: ToolPayload,
}

/// What an AI call produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    Generated { code: String },
    Debugged { report: String },
    Explained { explanation: String },
    Converted { code: String, target_language: String },
    Failed { error: ErrorKind },
}

/// Result of one AI action, tagged with the action that started it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiResult {
    pub action: ActionKind,
    pub outcome: Outcome,
}

impl AiResult {
    pub fn failed(action: ActionKind, error: ErrorKind) -> Self {
        Self {
            action,
            outcome: Outcome::Failed { error },
        }
    }

    pub fn error(&self) -> Option<&ErrorKind> {
        match &self.outcome {
            Outcome::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Code that should replace the editor contents, with the new language
    /// for conversions
    pub fn rewritten_code(&self) -> Option<(&str, Option<&str>)> {
        match &self.outcome {
            Outcome::Generated { code } => Some((code.as_str(), None)),
            Outcome::Converted {
                code,
                target_language,
            } => Some((code.as_str(), Some(target_language.as_str()))),
            _ => None,
        }
    }

    /// Text shown in the result section
    pub fn body(&self) -> String {
        match &self.outcome {
            Outcome::Generated { code } | Outcome::Converted { code, .. } => code.clone(),
            Outcome::Debugged { report } => report.clone(),
            Outcome::Explained { explanation } => explanation.clone(),
            Outcome::Failed { error } => error.to_string(),
        }
    }
}

type BuildFn = fn(&RequestInput<'_>) -> Result<ToolPayload, ValidationError>;
type UnpackFn = fn(&Value, &ToolPayload) -> Result<Outcome, ErrorKind>;

/// Payload builder and result unpacker for one action
pub struct ActionEntry {
    pub kind: ActionKind,
    pub build: BuildFn,
    pub unpack: UnpackFn,
}

static ACTIONS: [ActionEntry; 4] = [
    ActionEntry {
        kind: ActionKind::Generate,
        build: build_generate,
        unpack: unpack_generate,
    },
    ActionEntry {
        kind: ActionKind::Debug,
        build: build_debug,
        unpack: unpack_debug,
    },
    ActionEntry {
        kind: ActionKind::Explain,
        build: build_explain,
        unpack: unpack_explain,
    },
    ActionEntry {
        kind: ActionKind::Convert,
        build: build_convert,
        unpack: unpack_convert,
    },
];

/// Look up the table entry for an action
///
/// The table is laid out in declaration order of [`ActionKind`].
pub fn entry_for(kind: ActionKind) -> &'static ActionEntry {
    &ACTIONS[kind as usize]
}

fn build_generate(input: &RequestInput<'_>) -> Result<ToolPayload, ValidationError> {
    let prompt = input.prompt.trim();
    if prompt.is_empty() {
        return Err(ValidationError::MissingPrompt);
    }

    Ok(ToolPayload {
        prompt: Some(prompt.to_string()),
        code: None,
        language: input.source_language.to_string(),
        target_language: None,
    })
}

fn build_debug(input: &RequestInput<'_>) -> Result<ToolPayload, ValidationError> {
    let prompt = match input.prompt.trim() {
        "" => DEFAULT_DEBUG_PROMPT,
        p => p,
    };

    Ok(ToolPayload {
        prompt: Some(prompt.to_string()),
        code: Some(input.code.to_string()),
        language: input.source_language.to_string(),
        target_language: None,
    })
}

fn build_explain(input: &RequestInput<'_>) -> Result<ToolPayload, ValidationError> {
    Ok(ToolPayload {
        prompt: Some(EXPLAIN_PROMPT.to_string()),
        code: Some(input.code.to_string()),
        language: input.source_language.to_string(),
        target_language: None,
    })
}

fn build_convert(input: &RequestInput<'_>) -> Result<ToolPayload, ValidationError> {
    let target = input
        .target_language
        .filter(|t| !t.is_empty())
        .ok_or(ValidationError::MissingTargetLanguage)?;

    if target == input.source_language {
        return Err(ValidationError::SameLanguage(target.to_string()));
    }

    Ok(ToolPayload {
        prompt: Some(format!(
            "Convert the code from {} to {}",
            input.source_language, target
        )),
        code: Some(input.code.to_string()),
        language: input.source_language.to_string(),
        target_language: Some(target.to_string()),
    })
}

fn string_field(response: &Value, field: &str) -> Result<String, ErrorKind> {
    response
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ErrorKind::MalformedResponse {
            field: field.to_string(),
        })
}

fn unpack_generate(response: &Value, _: &ToolPayload) -> Result<Outcome, ErrorKind> {
    Ok(Outcome::Generated {
        code: string_field(response, "generated_code")?,
    })
}

fn unpack_debug(response: &Value, _: &ToolPayload) -> Result<Outcome, ErrorKind> {
    Ok(Outcome::Debugged {
        report: string_field(response, "debug_result")?,
    })
}

fn unpack_explain(response: &Value, _: &ToolPayload) -> Result<Outcome, ErrorKind> {
    Ok(Outcome::Explained {
        explanation: string_field(response, "explanation")?,
    })
}

fn unpack_convert(response: &Value, payload: &ToolPayload) -> Result<Outcome, ErrorKind> {
    let code = string_field(response, "converted_code")?;
    let target_language = match string_field(response, "target_language") {
        Ok(target) => target,
        Err(err) => payload.target_language.clone().ok_or(err)?,
    };

    Ok(Outcome::Converted {
        code,
        target_language,
    })
}

/// Validate editor state and build the request for `kind`
pub fn build_request(
    seq: u64,
    kind: ActionKind,
    tool_ids: &ToolIds,
    input: &RequestInput<'_>,
) -> Result<AiRequest, ValidationError> {
    let payload = (entry_for(kind).build)(input)?;

    Ok(AiRequest {
        seq,
        action: kind,
        tool_id: tool_ids.get(kind),
        payload,
    })
}

/// Turn a backend response body into a result tagged with the request's action
pub fn unpack_response(request: &AiRequest, response: &Value) -> AiResult {
    let outcome = (entry_for(request.action).unpack)(response, &request.payload)
        .unwrap_or_else(|error| Outcome::Failed { error });

    AiResult {
        action: request.action,
        outcome,
    }
}

/// Pull the human-readable message out of a backend error body
///
/// The backend answers failures with `{ "message": ... }`, its token layer
/// with `{ "msg": ... }`; anything else is passed through as text.
pub fn backend_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "msg"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input<'a>(prompt: &'a str, target: Option<&'a str>) -> RequestInput<'a> {
        RequestInput {
            code: "console.log(1);",
            prompt,
            source_language: "javascript",
            target_language: target,
        }
    }

    fn response_for(kind: ActionKind) -> Value {
        match kind {
            ActionKind::Generate => json!({ "generated_code": "let x = 1;", "language": "javascript" }),
            ActionKind::Debug => json!({ "debug_result": "No issues" }),
            ActionKind::Explain => json!({ "explanation": "Prints 1" }),
            ActionKind::Convert => json!({
                "converted_code": "print(1)",
                "original_language": "javascript",
                "target_language": "python"
            }),
        }
    }

    // ============================================================================
    // ActionKind
    // ============================================================================

    #[test]
    fn test_action_kind_round_trips_through_tool_type() {
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::from_tool_type(kind.tool_type()), Some(kind));
        }
        assert_eq!(ActionKind::from_tool_type("code_completion"), None);
    }

    #[test]
    fn test_action_kind_from_str_accepts_short_and_tool_names() {
        assert_eq!("convert".parse::<ActionKind>(), Ok(ActionKind::Convert));
        assert_eq!("debug_code".parse::<ActionKind>(), Ok(ActionKind::Debug));
        assert!("run".parse::<ActionKind>().is_err());
    }

    #[test]
    fn test_only_generate_and_convert_rewrite_source() {
        assert!(ActionKind::Generate.rewrites_source());
        assert!(ActionKind::Convert.rewrites_source());
        assert!(!ActionKind::Debug.rewrites_source());
        assert!(!ActionKind::Explain.rewrites_source());
    }

    #[test]
    fn test_dispatch_table_covers_every_action() {
        for kind in ActionKind::ALL {
            assert_eq!(entry_for(kind).kind, kind);
        }
    }

    // ============================================================================
    // Payload builders
    // ============================================================================

    #[test]
    fn test_generate_requires_prompt() {
        let err = build_request(1, ActionKind::Generate, &ToolIds::default(), &input("  ", None))
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingPrompt);
    }

    #[test]
    fn test_generate_sends_prompt_without_code() {
        let request = build_request(
            1,
            ActionKind::Generate,
            &ToolIds::default(),
            &input("sum an array", None),
        )
        .unwrap();
        assert_eq!(request.tool_id, 1);
        assert_eq!(
            serde_json::to_value(&request.payload).unwrap(),
            json!({ "prompt": "sum an array", "language": "javascript" })
        );
    }

    #[test]
    fn test_debug_uses_default_prompt_when_blank() {
        let request =
            build_request(2, ActionKind::Debug, &ToolIds::default(), &input("", None)).unwrap();
        assert_eq!(request.payload.prompt.as_deref(), Some(DEFAULT_DEBUG_PROMPT));
        assert_eq!(request.payload.code.as_deref(), Some("console.log(1);"));
        assert_eq!(request.tool_id, 2);
    }

    #[test]
    fn test_debug_keeps_user_prompt() {
        let request = build_request(
            2,
            ActionKind::Debug,
            &ToolIds::default(),
            &input("why does this loop forever", None),
        )
        .unwrap();
        assert_eq!(
            request.payload.prompt.as_deref(),
            Some("why does this loop forever")
        );
    }

    #[test]
    fn test_explain_ignores_user_prompt() {
        let request = build_request(
            3,
            ActionKind::Explain,
            &ToolIds::default(),
            &input("something else", None),
        )
        .unwrap();
        assert_eq!(request.payload.prompt.as_deref(), Some(EXPLAIN_PROMPT));
        assert!(request.payload.target_language.is_none());
    }

    #[test]
    fn test_convert_requires_target() {
        let err = build_request(4, ActionKind::Convert, &ToolIds::default(), &input("", None))
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingTargetLanguage);
    }

    #[test]
    fn test_convert_rejects_same_language() {
        let err = build_request(
            4,
            ActionKind::Convert,
            &ToolIds::default(),
            &input("", Some("javascript")),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::SameLanguage("javascript".to_string()));
    }

    #[test]
    fn test_convert_payload_shape() {
        let request = build_request(
            4,
            ActionKind::Convert,
            &ToolIds::default(),
            &input("", Some("python")),
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&request.payload).unwrap(),
            json!({
                "prompt": "Convert the code from javascript to python",
                "code": "console.log(1);",
                "language": "javascript",
                "target_language": "python"
            })
        );
    }

    #[test]
    fn test_tool_ids_follow_configuration() {
        let mut ids = ToolIds::default();
        ids.set(ActionKind::Explain, 42);
        let request = build_request(1, ActionKind::Explain, &ids, &input("", None)).unwrap();
        assert_eq!(request.tool_id, 42);
    }

    // ============================================================================
    // Result unpackers
    // ============================================================================

    #[test]
    fn test_every_action_unpacks_to_its_own_tag() {
        for kind in ActionKind::ALL {
            let request = build_request(
                7,
                kind,
                &ToolIds::default(),
                &input("make something", Some("python")),
            )
            .unwrap();
            let result = unpack_response(&request, &response_for(kind));
            assert_eq!(result.action, kind);
            assert!(result.error().is_none(), "{kind} failed: {:?}", result);
        }
    }

    #[test]
    fn test_missing_field_becomes_malformed_error() {
        let request =
            build_request(1, ActionKind::Explain, &ToolIds::default(), &input("", None)).unwrap();
        let result = unpack_response(&request, &json!({ "generated_code": "x" }));
        assert_eq!(result.action, ActionKind::Explain);
        assert_eq!(
            result.error(),
            Some(&ErrorKind::MalformedResponse {
                field: "explanation".to_string()
            })
        );
    }

    #[test]
    fn test_convert_falls_back_to_requested_target() {
        let request = build_request(
            1,
            ActionKind::Convert,
            &ToolIds::default(),
            &input("", Some("go")),
        )
        .unwrap();
        let result = unpack_response(&request, &json!({ "converted_code": "package main" }));
        assert_eq!(result.rewritten_code(), Some(("package main", Some("go"))));
    }

    #[test]
    fn test_rewritten_code_only_for_code_producing_outcomes() {
        let debug = AiResult {
            action: ActionKind::Debug,
            outcome: Outcome::Debugged {
                report: "fine".to_string(),
            },
        };
        assert!(debug.rewritten_code().is_none());
        assert_eq!(debug.body(), "fine");
    }

    #[test]
    fn test_backend_error_message_extracts_message_field() {
        assert_eq!(
            backend_error_message(r#"{"message": "Prompt is required"}"#),
            "Prompt is required"
        );
        assert_eq!(
            backend_error_message(r#"{"msg": "Missing Authorization Header"}"#),
            "Missing Authorization Header"
        );
        assert_eq!(backend_error_message("Bad Gateway\n"), "Bad Gateway");
    }
}
