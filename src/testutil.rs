//! Fakes shared by unit tests across modules. Not part of the public API.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::ReaderError;
use crate::transport::Transport;

/// Records every `WR addr val` pair sent over a codec, and otherwise
/// answers every command with an instant correct echo and zeroed payload.
pub struct RecordingTransport {
    pending: VecDeque<u8>,
    writes: Arc<Mutex<Vec<(u16, u8)>>>,
}

pub struct RecordingTransportHandle(Arc<Mutex<Vec<(u16, u8)>>>);

impl RecordingTransportHandle {
    pub fn take_writes(&self) -> Vec<(u16, u8)> {
        self.0.lock().unwrap().clone()
    }
}

impl RecordingTransport {
    pub fn new() -> (RecordingTransport, RecordingTransportHandle) {
        let writes = Arc::new(Mutex::new(Vec::new()));
        (
            RecordingTransport {
                pending: VecDeque::new(),
                writes: writes.clone(),
            },
            RecordingTransportHandle(writes),
        )
    }
}

impl Transport for RecordingTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), ReaderError> {
        if bytes.len() == 8 && bytes[0] == b'W' && bytes[1] == b'R' {
            let text = std::str::from_utf8(bytes).unwrap();
            let addr = u16::from_str_radix(&text[2..6], 16).unwrap();
            let value = u8::from_str_radix(&text[6..8], 16).unwrap();
            self.writes.lock().unwrap().push((addr, value));
        }
        // Only 8-byte command frames are echoed back; streamed payloads
        // (RMWR*/WRST) are consumed by the device and never echoed.
        if bytes.len() == 8 {
            self.pending.extend(bytes.iter().copied());
        }
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, ReaderError> {
        Ok(self.pending.len())
    }

    fn read_partial(&mut self, buf: &mut [u8]) -> Result<usize, ReaderError> {
        let mut n = 0;
        while n < buf.len() {
            match self.pending.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        if n < buf.len() {
            // pad out any response payload the command table expects with zeroes
            for slot in &mut buf[n..] {
                *slot = 0;
            }
            n = buf.len();
        }
        Ok(n)
    }

    fn drain(&mut self) -> Result<(), ReaderError> {
        self.pending.clear();
        Ok(())
    }

    fn close(&mut self) -> Result<(), ReaderError> {
        Ok(())
    }
}
