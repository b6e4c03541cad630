use crate::codec::{Codec, Command};
use crate::error::ReaderError;
use crate::header::Mapper;

/// Per-family ROM/RAM bank-switch write sequences, dispatched over the
/// wire as `WR addr val` commands. The address windows are MBC
/// conventions; the reader just forwards the writes to the cartridge bus.
pub trait BankSwitch {
    fn change_rom_bank(&self, codec: &mut Codec, bank: u16) -> Result<(), ReaderError>;
    fn change_ram_bank(&self, codec: &mut Codec, bank: u8) -> Result<(), ReaderError>;
}

impl BankSwitch for Mapper {
    fn change_rom_bank(&self, codec: &mut Codec, bank: u16) -> Result<(), ReaderError> {
        if !self.is_supported() {
            return Err(ReaderError::UnsupportedMapper(*self));
        }
        match self {
            Mapper::None => Ok(()),
            Mapper::Mbc1 => {
                if bank < 0x20 {
                    codec.exchange(Command::Wr(0x2100, bank as u8))?;
                } else {
                    codec.exchange(Command::Wr(0x6000, 0x00))?;
                    codec.exchange(Command::Wr(0x4000, (bank >> 5) as u8))?;
                    codec.exchange(Command::Wr(0x2100, (bank & 0x1F) as u8))?;
                }
                Ok(())
            }
            Mapper::Mbc2 => {
                codec.exchange(Command::Wr(0x2100, (bank & 0x0F) as u8))?;
                Ok(())
            }
            Mapper::Mbc3 => {
                codec.exchange(Command::Wr(0x2100, (bank & 0x7F) as u8))?;
                Ok(())
            }
            Mapper::Mbc5 => {
                codec.exchange(Command::Wr(0x2100, (bank & 0xFF) as u8))?;
                codec.exchange(Command::Wr(0x3000, ((bank >> 8) & 0x01) as u8))?;
                Ok(())
            }
            Mapper::Mmm01 | Mapper::Mbc6 | Mapper::Mbc7 => {
                Err(ReaderError::UnsupportedMapper(*self))
            }
        }
    }

    fn change_ram_bank(&self, codec: &mut Codec, bank: u8) -> Result<(), ReaderError> {
        if !self.is_supported() {
            return Err(ReaderError::UnsupportedMapper(*self));
        }
        codec.exchange(Command::Wr(0x4000, bank))?;
        Ok(())
    }
}

/// Enable (`0x0A`) or disable (`0x00`) cartridge RAM. Every `set_ram(true)`
/// on a job's success/error/cancel path must be matched by a later
/// `set_ram(false)`.
pub fn set_ram(codec: &mut Codec, enable: bool) -> Result<(), ReaderError> {
    if enable {
        codec.exchange(Command::RamOn)?;
    } else {
        codec.exchange(Command::RamOff)?;
    }
    Ok(())
}
