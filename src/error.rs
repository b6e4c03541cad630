use thiserror::Error;

use crate::header::Mapper;

/// Every way a cartridge-reader operation can fail.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("transport I/O failed: {0}")]
    Transport(String),

    #[error("timed out waiting for a response")]
    Timeout,

    #[error("echo mismatch: sent {sent:?}, received {received:?}")]
    ProtocolMismatch { sent: [u8; 8], received: [u8; 8] },

    #[error("unsupported device: {0}")]
    UnsupportedDevice(String),

    #[error("invalid cartridge header: {0}")]
    InvalidHeader(&'static str),

    #[error("unknown mapper byte: 0x{0:02X}")]
    UnknownMapper(u8),

    #[error("mapper {0:?} has no bank-switch driver")]
    UnsupportedMapper(Mapper),

    #[error("save size mismatch: expected {expected} bytes, got {got} bytes")]
    SaveSizeMismatch { expected: usize, got: usize },

    #[error("unexpected flash chip id: 0x{0:04X}")]
    WrongFlashChip(u16),

    #[error("flash sector erase timed out")]
    FlashEraseTimeout,

    #[error("post-flash verification failed")]
    FlashVerifyFailed,

    #[error("operation cancelled")]
    Cancelled,
}
