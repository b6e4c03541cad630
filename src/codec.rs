use std::thread;
use std::time::Instant;

use crate::config::ReaderConfig;
use crate::error::ReaderError;
use crate::transport::Transport;

/// One of the reader's fixed 8-character ASCII commands.
///
/// NOTE: the reader firmware's own alphanumeric filter on incoming
/// command bytes is believed to accept any byte `>= 65` rather than
/// the intended `[0-9A-Z]` range (missing upper bound check) — a
/// firmware bug, not something this host-side encoder needs to work
/// around, since it only ever emits well-formed ASCII.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    ReadInfo,
    CompTime,
    ReadHdr0,
    /// byte offset within the 32 KiB cartridge-bus window currently mapped in.
    Rdbk(u16),
    Wr(u16, u8),
    RamOn,
    RamOff,
    RmWr2k,
    RmWr4kA,
    RmWr4kB,
    DevIdSst,
    Esst(u16),
    Wrst(u16),
}

impl Command {
    fn encode(self) -> [u8; 8] {
        let text = match self {
            Command::ReadInfo => "READINFO".to_string(),
            Command::CompTime => "COMPTIME".to_string(),
            Command::ReadHdr0 => "READHDR0".to_string(),
            Command::Rdbk(addr) => format!("RDBK{:04X}", addr),
            Command::Wr(addr, value) => format!("WR{:04X}{:02X}", addr, value),
            Command::RamOn => "RAMON000".to_string(),
            Command::RamOff => "RAMOFF00".to_string(),
            Command::RmWr2k => "RMWR2k00".to_string(),
            Command::RmWr4kA => "RMWR4kA0".to_string(),
            Command::RmWr4kB => "RMWR4kB0".to_string(),
            Command::DevIdSst => "DEVIDSST".to_string(),
            Command::Esst(addr) => format!("ESST{:04X}", addr),
            Command::Wrst(addr) => format!("WRST{:04X}", addr),
        };
        let mut frame = [0u8; 8];
        frame.copy_from_slice(text.as_bytes());
        frame
    }

    /// Length of the payload the device sends back after the echo, if any.
    fn response_len(self) -> usize {
        match self {
            Command::ReadInfo => 16,
            Command::CompTime => 32,
            Command::ReadHdr0 => 0x150,
            Command::Rdbk(_) => 0x1000,
            Command::DevIdSst => 2,
            Command::Esst(_) => 2,
            Command::Wr(_, _)
            | Command::RamOn
            | Command::RamOff
            | Command::RmWr2k
            | Command::RmWr4kA
            | Command::RmWr4kB
            | Command::Wrst(_) => 0,
        }
    }
}

/// Encodes/decodes the wire protocol over a [`Transport`]: fixed 8-byte
/// ASCII commands, echo confirmation, length-delimited payloads.
pub struct Codec {
    transport: Box<dyn Transport>,
    config: ReaderConfig,
}

impl Codec {
    pub fn new(transport: Box<dyn Transport>, config: ReaderConfig) -> Codec {
        Codec { transport, config }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Poll the transport in bounded windows until `buf` is full, or fail
    /// with `Timeout` once the bytes-available count stops moving for
    /// `liveness_poll_cap` consecutive polls — the guard against a wedged
    /// serial link.
    fn wait_for(&mut self, len: usize) -> Result<Vec<u8>, ReaderError> {
        let mut buf = vec![0u8; len];
        let mut filled = 0usize;
        let mut last_available = usize::MAX;
        let mut stale_polls = 0u32;

        while filled < len {
            let available = self.transport.bytes_available()?;
            if available == last_available {
                stale_polls += 1;
                if stale_polls >= self.config.liveness_poll_cap {
                    return Err(ReaderError::Timeout);
                }
            } else {
                stale_polls = 0;
            }
            last_available = available;

            let read = self.transport.read_partial(&mut buf[filled..])?;
            filled += read;
            if read == 0 {
                thread::sleep(self.config.poll_interval);
            }
        }
        Ok(buf)
    }

    /// Send `cmd` and wait for its echo, retrying the whole exchange from
    /// scratch on a mismatch (never resynchronizing mid-frame). Mismatches
    /// share the liveness-poll-cap counter: once a wedged link has produced
    /// that many consecutive non-matching echoes, give up with
    /// `ProtocolMismatch` rather than retrying forever.
    fn exchange_echo(&mut self, cmd: Command) -> Result<(), ReaderError> {
        let frame = cmd.encode();
        let mut mismatches = 0u32;
        loop {
            self.transport.write(&frame)?;
            let echo = self.wait_for(8)?;
            if echo.as_slice() == frame {
                return Ok(());
            }
            let mut received = [0u8; 8];
            received.copy_from_slice(&echo);
            mismatches += 1;
            if mismatches >= self.config.liveness_poll_cap {
                return Err(ReaderError::ProtocolMismatch {
                    sent: frame,
                    received,
                });
            }
            warn!(
                "echo mismatch for {:?}: sent {:?}, received {:?}; retrying",
                cmd, frame, received
            );
        }
    }

    /// Run a command that has no host-streamed payload, returning whatever
    /// response bytes the command table says it sends back.
    pub fn exchange(&mut self, cmd: Command) -> Result<Vec<u8>, ReaderError> {
        self.exchange_echo(cmd)?;
        let len = cmd.response_len();
        if len == 0 {
            Ok(Vec::new())
        } else {
            self.wait_for(len)
        }
    }

    /// Run a command that, after the echo, expects the host to stream
    /// `payload` to the device (RMWR*/WRST). `WRST` additionally drains any
    /// stray trailing bytes once the stream completes, and is bounded by
    /// `block_program_timeout` since it is the 256-byte flash block write.
    pub fn exchange_with_stream(
        &mut self,
        cmd: Command,
        payload: &[u8],
    ) -> Result<(), ReaderError> {
        self.exchange_echo(cmd)?;
        if let Command::Wrst(_) = cmd {
            let started = Instant::now();
            self.transport.write(payload)?;
            if started.elapsed() > self.config.block_program_timeout {
                return Err(ReaderError::Timeout);
            }
            self.transport.drain()?;
        } else {
            self.transport.write(payload)?;
        }
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), ReaderError> {
        self.transport.close()
    }
}
