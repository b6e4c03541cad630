use regex::Regex;

use crate::codec::{Codec, Command};
use crate::config::{Chipset, ReaderConfig};
use crate::error::ReaderError;
use crate::header::{decode_header, CartridgeHeader, HEADER_LEN};
use crate::transport::Transport;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl FirmwareVersion {
    pub fn ge(self, major: u8, minor: u8, patch: u8) -> bool {
        (self.major, self.minor, self.patch) >= (major, minor, patch)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardInfo {
    pub chipset: Chipset,
    pub version: FirmwareVersion,
}

/// A board id string of the form `GBCR-<CHIP>-V<major>.<minor>.<patch>\0`.
fn parse_board_info(raw: &[u8; 16]) -> Result<BoardInfo, ReaderError> {
    let text = raw
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect::<String>();

    let mut parts = text.split('-');
    let prefix = parts.next().unwrap_or("");
    let chip = parts.next().unwrap_or("");
    let version_part = parts.next().unwrap_or("");

    if prefix != "GBCR" {
        return Err(ReaderError::UnsupportedDevice(text));
    }
    let chipset = Chipset::parse(chip).ok_or_else(|| ReaderError::UnsupportedDevice(text.clone()))?;

    let version_digits = version_part.strip_prefix('V').unwrap_or(version_part);
    let mut components = version_digits.split('.');
    let parse_u8 = |s: Option<&str>| -> Option<u8> { s.and_then(|s| s.parse().ok()) };
    let major = parse_u8(components.next());
    let minor = parse_u8(components.next());
    let patch = parse_u8(components.next());
    match (major, minor, patch) {
        (Some(major), Some(minor), Some(patch)) => Ok(BoardInfo {
            chipset,
            version: FirmwareVersion { major, minor, patch },
        }),
        _ => Err(ReaderError::UnsupportedDevice(text)),
    }
}

/// A display-only date/compile-time pair parsed out of `COMPTIME`'s
/// 32-byte response (two 16-byte NUL-padded ASCII strings).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileTime {
    pub date: String,
    pub time: String,
}

/// A Session owns its Codec, which owns its Transport — value-owned
/// composition with no back-references. Bound to exactly one opened
/// Transport for its whole lifetime.
pub struct Session {
    codec: Codec,
    board_info: Option<BoardInfo>,
}

impl Session {
    pub fn new(transport: Box<dyn Transport>, config: ReaderConfig) -> Session {
        Session {
            codec: Codec::new(transport, config),
            board_info: None,
        }
    }

    pub fn codec_mut(&mut self) -> &mut Codec {
        &mut self.codec
    }

    /// Calls READINFO (once; cached afterwards) and parses the board id.
    pub fn identify(&mut self) -> Result<BoardInfo, ReaderError> {
        if let Some(info) = &self.board_info {
            return Ok(info.clone());
        }
        let response = self.codec.exchange(Command::ReadInfo)?;
        let mut raw = [0u8; 16];
        raw.copy_from_slice(&response);
        let info = parse_board_info(&raw)?;
        self.board_info = Some(info.clone());
        Ok(info)
    }

    pub fn compile_time(&mut self) -> Result<CompileTime, ReaderError> {
        let response = self.codec.exchange(Command::CompTime)?;
        let text: String = response.iter().map(|&b| b as char).collect();

        let re = Regex::new(r"([A-Za-z]{3}\s+[0-9]+\s+[0-9]{4}).*(\d{2}:\d{2}:\d{2})")
            .expect("static regex is valid");
        let captures = re
            .captures(&text)
            .ok_or_else(|| ReaderError::UnsupportedDevice(text.clone()))?;
        Ok(CompileTime {
            date: captures[1].trim().to_string(),
            time: captures[2].trim().to_string(),
        })
    }

    pub fn read_header(&mut self) -> Result<CartridgeHeader, ReaderError> {
        let response = self.codec.exchange(Command::ReadHdr0)?;
        let mut raw = [0u8; HEADER_LEN];
        raw.copy_from_slice(&response);
        decode_header(&raw)
    }

    pub fn read_raw_header(&mut self) -> Result<[u8; HEADER_LEN], ReaderError> {
        let response = self.codec.exchange(Command::ReadHdr0)?;
        let mut raw = [0u8; HEADER_LEN];
        raw.copy_from_slice(&response);
        Ok(raw)
    }

    pub fn close(mut self) -> Result<(), ReaderError> {
        self.codec.close()
    }
}
