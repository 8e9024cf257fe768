//! JSON framing for the workflow channel.
//!
//! Both directions use internally tagged objects, `{"type": "<name>", ...payload}`.
//! Event types this client does not interpret decode to [ServerEvent::Unknown].

use tracing::instrument;

use crate::error::CodecError;
use crate::types::{ClientRequest, ServerEvent};

/// Encodes an outbound request as one JSON text frame.
#[instrument(level = "trace", skip(request), fields(kind = request.kind()))]
pub fn encode_request(request: &ClientRequest) -> Result<String, CodecError> {
  serde_json::to_string(request).map_err(|source| CodecError::Encode {
    kind: request.kind(),
    source,
  })
}

/// Decodes one inbound JSON text frame.
#[instrument(level = "trace", skip(frame))]
pub fn decode_event(frame: &str) -> Result<ServerEvent, CodecError> {
  serde_json::from_str(frame).map_err(CodecError::Decode)
}
