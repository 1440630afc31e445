//! Core library for the Code Aura editor
//!
//! This crate implements the **Functional Core** of the `codeaura` editor
//! workflow, following the Functional Core - Imperative Shell pattern.
//!
//! - **`codeaura_core`** (this crate): editor state and pure transformations,
//!   zero I/O
//! - **`codeaura`**: HTTP calls, process execution and the terminal front-end
//!
//! # Module Organization
//!
//! - [`registry`]: supported languages and themes, injected at startup
//! - [`action`]: the AI action table (payload builders and result unpackers)
//! - [`session`]: editor session state, request sequencing, stale-result checks
//! - [`catalogue`]: backend tool listing and tool id resolution
//! - [`sandbox`]: turning captured execution output into display lines
//! - [`error`]: validation, session and result error types
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use codeaura_core::action::{unpack_response, ActionKind, ToolIds};
//! use codeaura_core::registry::Registry;
//! use codeaura_core::session::EditorSession;
//!
//! let registry = Registry::builtin();
//! let mut session = EditorSession::new(&registry);
//! session.set_prompt("sum the numbers in an array");
//!
//! // Validates, assigns a sequence number and marks the session pending
//! let request = session.start_request(ActionKind::Generate, &ToolIds::default())?;
//!
//! // ... send request.payload to POST /ai-tools/{request.tool_id}/use ...
//! let result = unpack_response(&request, &response_body);
//! session.complete(request.seq, result);
//! ```

pub mod action;
pub mod catalogue;
pub mod error;
pub mod registry;
pub mod sandbox;
pub mod session;
