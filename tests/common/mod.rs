//! A scripted fake `Transport` standing in for the reader's firmware in
//! integration tests — it echoes every command frame, then answers with
//! whatever payload the real reader would for that command, driven off
//! a flat 32 KiB memory image plus minimal MBC1 bank-register state and
//! an SST39SF0x0 erase/program model.

use std::collections::VecDeque;
use std::str;
use std::sync::{Arc, Mutex};

use gbcr::error::ReaderError;
use gbcr::transport::Transport;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum PendingStream {
    None,
    Wrst(u16),
    Rmwr2k,
    Rmwr4k(bool),
}

#[derive(Default)]
struct Log {
    erase: Vec<u16>,
    write: Vec<(u16, u8)>,
    wrst_count: usize,
}

/// A shared view into a `FakeDevice`'s activity, usable after the device
/// itself has been moved into a `Session`.
#[derive(Clone)]
pub struct FakeDeviceHandle {
    memory: Arc<Mutex<Vec<u8>>>,
    log: Arc<Mutex<Log>>,
}

impl FakeDeviceHandle {
    pub fn memory(&self) -> Vec<u8> {
        self.memory.lock().unwrap().clone()
    }

    pub fn erase_log(&self) -> Vec<u16> {
        self.log.lock().unwrap().erase.clone()
    }

    pub fn write_log(&self) -> Vec<(u16, u8)> {
        self.log.lock().unwrap().write.clone()
    }

    pub fn wrst_count(&self) -> usize {
        self.log.lock().unwrap().wrst_count
    }
}

pub struct FakeDevice {
    memory: Arc<Mutex<Vec<u8>>>,
    pub ram: Vec<u8>,
    pub board_id: [u8; 16],
    pub chip_id: (u8, u8),
    log: Arc<Mutex<Log>>,
    outgoing: VecDeque<u8>,
    pending: PendingStream,
    ram_bank: usize,
    ram_enabled: bool,
}

impl FakeDevice {
    pub fn new(rom: Vec<u8>) -> FakeDevice {
        let mut board_id = [0u8; 16];
        board_id[..15].copy_from_slice(b"GBCR-AVR-V2.0.0");
        FakeDevice {
            memory: Arc::new(Mutex::new(rom)),
            ram: Vec::new(),
            board_id,
            chip_id: (0xBE, 0xB5), // chip_id = ((0xBE + 1) << 8) | 0xB5 = 0xBFB5
            log: Arc::new(Mutex::new(Log::default())),
            outgoing: VecDeque::new(),
            pending: PendingStream::None,
            ram_bank: 0,
            ram_enabled: false,
        }
    }

    pub fn with_ram(mut self, ram: Vec<u8>) -> FakeDevice {
        self.ram = ram;
        self
    }

    pub fn handle(&self) -> FakeDeviceHandle {
        FakeDeviceHandle {
            memory: self.memory.clone(),
            log: self.log.clone(),
        }
    }

    fn push_response(&mut self, bytes: &[u8]) {
        self.outgoing.extend(bytes.iter().copied());
    }

    fn dispatch(&mut self, text: &str) {
        if text == "READINFO" {
            let id = self.board_id;
            self.push_response(&id);
        } else if text == "READHDR0" {
            let header = self.memory.lock().unwrap()[0..0x150].to_vec();
            self.push_response(&header);
        } else if text == "DEVIDSST" {
            self.push_response(&[self.chip_id.0, self.chip_id.1]);
        } else if text == "RAMON000" {
            self.ram_enabled = true;
        } else if text == "RAMOFF00" {
            self.ram_enabled = false;
        } else if text == "RMWR2k00" {
            self.pending = PendingStream::Rmwr2k;
        } else if text == "RMWR4kA0" {
            self.pending = PendingStream::Rmwr4k(false);
        } else if text == "RMWR4kB0" {
            self.pending = PendingStream::Rmwr4k(true);
        } else if let Some(hex) = text.strip_prefix("RDBK") {
            let addr = u16::from_str_radix(hex, 16).unwrap();
            if (0xA000..0xC000).contains(&addr) && self.ram_enabled {
                let offset = self.ram_bank * 0x2000 + (addr as usize - 0xA000);
                self.push_response(&self.ram[offset..offset + 0x1000].to_vec());
            } else {
                let offset = addr as usize;
                let slice = self.memory.lock().unwrap()[offset..offset + 0x1000].to_vec();
                self.push_response(&slice);
            }
        } else if let Some(hex) = text.strip_prefix("ESST") {
            let addr = u16::from_str_radix(hex, 16).unwrap();
            self.log.lock().unwrap().erase.push(addr);
            let offset = addr as usize;
            for b in &mut self.memory.lock().unwrap()[offset..offset + 0x1000] {
                *b = 0xFF;
            }
            self.push_response(&[0x00, 0x10]); // well within the 0x1000 poll cap
        } else if let Some(hex) = text.strip_prefix("WRST") {
            let addr = u16::from_str_radix(hex, 16).unwrap();
            self.pending = PendingStream::Wrst(addr);
        } else if let Some(rest) = text.strip_prefix("WR") {
            let addr = u16::from_str_radix(&rest[0..4], 16).unwrap();
            let value = u8::from_str_radix(&rest[4..6], 16).unwrap();
            self.log.lock().unwrap().write.push((addr, value));
            if addr == 0x4000 {
                self.ram_bank = value as usize;
            }
        }
    }

    fn consume_stream(&mut self, bytes: &[u8]) {
        match self.pending {
            PendingStream::Wrst(addr) => {
                let offset = addr as usize;
                self.memory.lock().unwrap()[offset..offset + bytes.len()].copy_from_slice(bytes);
                self.log.lock().unwrap().wrst_count += 1;
            }
            PendingStream::Rmwr2k => {
                self.ram[..bytes.len()].copy_from_slice(bytes);
            }
            PendingStream::Rmwr4k(upper) => {
                let base = self.ram_bank * 0x2000 + if upper { 0x1000 } else { 0 };
                self.ram[base..base + bytes.len()].copy_from_slice(bytes);
            }
            PendingStream::None => panic!("unexpected streamed payload with no pending command"),
        }
        self.pending = PendingStream::None;
    }
}

impl Transport for FakeDevice {
    fn write(&mut self, bytes: &[u8]) -> Result<(), ReaderError> {
        if self.pending != PendingStream::None {
            self.consume_stream(bytes);
            return Ok(());
        }
        assert_eq!(bytes.len(), 8, "commands are always exactly 8 bytes");
        self.push_response(bytes); // echo
        let text = str::from_utf8(bytes).expect("ASCII command");
        self.dispatch(text);
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, ReaderError> {
        Ok(self.outgoing.len())
    }

    fn read_partial(&mut self, buf: &mut [u8]) -> Result<usize, ReaderError> {
        let mut n = 0;
        while n < buf.len() {
            match self.outgoing.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn drain(&mut self) -> Result<(), ReaderError> {
        self.outgoing.clear();
        Ok(())
    }

    fn close(&mut self) -> Result<(), ReaderError> {
        Ok(())
    }
}
