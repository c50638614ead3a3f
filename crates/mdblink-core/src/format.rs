//! Rendering transport responses for the operator.

use crate::hex;
use crate::types::Response;

/// Display string for a serial exchange that returned no bytes.
pub const NO_RESPONSE: &str = "(no response)";

/// Render a response as operator-displayable text.
///
/// Daemon text passes through unchanged. Serial bytes are shown as
/// uppercase hex pairs, or [`NO_RESPONSE`] when nothing came back.
///
/// ```
/// use mdblink_core::{Response, format_response};
///
/// assert_eq!(format_response(&Response::Bytes(vec![0x01, 0x02])), "01 02");
/// assert_eq!(format_response(&Response::Bytes(vec![])), "(no response)");
/// ```
pub fn format_response(response: &Response) -> String {
    match response {
        Response::Text(text) => text.clone(),
        Response::Bytes(bytes) if bytes.is_empty() => NO_RESPONSE.to_string(),
        Response::Bytes(bytes) => hex::encode(bytes),
    }
}
