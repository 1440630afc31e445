//! AI action dispatch
//!
//! [`execute`] performs exactly one call to the AI service per request and
//! never retries. [`dispatch`] wraps it with the session bookkeeping for
//! callers that can simply await the answer.

use crate::client::AiToolService;
use codeaura_core::action::{unpack_response, ActionKind, AiRequest, AiResult, ToolIds};
use codeaura_core::error::SessionError;
use codeaura_core::session::{Completion, EditorSession};

/// Send a prepared request and turn the answer into a tagged result
///
/// Transport and backend failures come back as a failed result, not an error.
pub async fn execute<S: AiToolService>(service: &S, request: &AiRequest) -> AiResult {
    log::info!(
        "dispatching {} (#{}) to tool {}",
        request.action,
        request.seq,
        request.tool_id
    );

    match service.use_tool(request.tool_id, &request.payload).await {
        Ok(body) => {
            let result = unpack_response(request, &body);
            if let Some(error) = result.error() {
                log::warn!("{} (#{}) returned an unusable body: {error}", request.action, request.seq);
            }
            result
        }
        Err(err) => {
            log::warn!("{} (#{}) failed: {err}", request.action, request.seq);
            AiResult::failed(request.action, err.into_kind())
        }
    }
}

/// Start `action` on the session, await the service and apply the result
///
/// Fails without touching the network when the session is pending or the
/// input does not validate.
pub async fn dispatch<S: AiToolService>(
    service: &S,
    session: &mut EditorSession,
    action: ActionKind,
    tool_ids: &ToolIds,
) -> Result<Completion, SessionError> {
    let request = session.start_request(action, tool_ids)?;
    let result = execute(service, &request).await;
    let completion = session.complete(request.seq, result);

    if completion == Completion::Stale {
        log::debug!("discarded stale result for #{}", request.seq);
    }

    Ok(completion)
}
