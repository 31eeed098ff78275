// Shared mapping from pipeline failures to tool responses

use crate::protocol::CallToolResult;
use tmcp_fetch_core::FetchError;

/// The only message callers see for failures other than an HTTP status
pub const GENERIC_FAILURE: &str = "failed to fetch";

/// Log `error` in full and return the caller-facing error response.
///
/// Non-2xx statuses are the one distinguishable case; everything else
/// collapses to [`GENERIC_FAILURE`].
pub fn failure_result(tool: &str, error: &FetchError) -> CallToolResult {
    tracing::error!(tool, error = %error, "tool call failed");

    match error.status() {
        Some(code) => CallToolResult::error(format!("failed to fetch with code {}", code)),
        None => CallToolResult::error(GENERIC_FAILURE),
    }
}
