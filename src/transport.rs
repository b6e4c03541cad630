use crate::error::ReaderError;

/// A full-duplex byte channel already opened by the caller.
///
/// Discovering or configuring the underlying serial port is out of
/// scope for this crate — an embedding application constructs one of
/// these from whatever serial library it already uses and hands it to
/// `Session::new`.
pub trait Transport: Send {
    fn write(&mut self, bytes: &[u8]) -> Result<(), ReaderError>;

    /// Number of bytes currently buffered and ready to read, without blocking.
    fn bytes_available(&mut self) -> Result<usize, ReaderError>;

    /// Read exactly `buf.len()` bytes, blocking for at most one poll window.
    /// Returns `Ok(0)` if no bytes were available within the window, and a
    /// short count if fewer than `buf.len()` bytes were ready.
    fn read_partial(&mut self, buf: &mut [u8]) -> Result<usize, ReaderError>;

    /// Discard any buffered input.
    fn drain(&mut self) -> Result<(), ReaderError>;

    fn close(&mut self) -> Result<(), ReaderError>;
}
