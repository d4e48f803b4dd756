/// Errors produced while framing or encoding/decoding a packet.
///
/// Every variant here is folded into `AltruistError::Decode` by callers that
/// hold a `ClientId` to attach; this crate has no connection context of its
/// own.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("packet exceeds maximum frame size")]
    TooLarge,

    #[error("unknown wire format tag {0}")]
    UnknownFormat(u8),

    #[error("bincode encode/decode failed: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("json encode/decode failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected packet type {expected:?}, got {actual:?}")]
    TypeMismatch { expected: &'static str, actual: String },
}
