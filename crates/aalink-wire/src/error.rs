/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// The channel byte does not name a known channel.
    #[error("invalid channel id {0:#04x}")]
    InvalidChannelId(u8),

    /// A fixed-size frame field was shorter than required.
    #[error("truncated frame field (need {need} bytes, got {got})")]
    Truncated { need: usize, got: usize },

    /// A frame payload exceeds what the length field can describe.
    #[error("frame payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

pub type Result<T, E = WireError> = std::result::Result<T, E>;
