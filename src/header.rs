use strum_macros::Display;

use crate::error::ReaderError;

pub const HEADER_LEN: usize = 0x150;
pub const SECTOR_SIZE: usize = 0x1000;
pub const ROM_BANK_SIZE: usize = 0x4000;
pub const RAM_BANK_SIZE: usize = 0x2000;

const LOGO: [u8; 48] = [
    0xCE, 0xED, 0x66, 0x66, 0xCC, 0x0D, 0x00, 0x0B, 0x03, 0x73, 0x00, 0x83, 0x00, 0x0C, 0x00, 0x0D,
    0x00, 0x08, 0x11, 0x1F, 0x88, 0x89, 0x00, 0x0E, 0xDC, 0xCC, 0x6E, 0xE6, 0xDD, 0xDD, 0xD9, 0x99,
    0xBB, 0xBB, 0x67, 0x63, 0x6E, 0x0E, 0xEC, 0xCC, 0xDD, 0xDC, 0x99, 0x9F, 0xBB, 0xB9, 0x33, 0x3E,
];

/// Memory Bank Controller family, classified from the cartridge-type byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
pub enum Mapper {
    None,
    Mbc1,
    Mbc2,
    Mbc3,
    Mmm01,
    Mbc5,
    Mbc6,
    Mbc7,
}

impl Mapper {
    pub fn from_cartridge_type(byte: u8) -> Result<Mapper, ReaderError> {
        match byte {
            0x00 => Ok(Mapper::None),
            0x01 | 0x02 | 0x03 => Ok(Mapper::Mbc1),
            0x05 | 0x06 => Ok(Mapper::Mbc2),
            0x0B | 0x0C => Ok(Mapper::Mmm01),
            0x0F | 0x10 | 0x11 | 0x12 | 0x13 => Ok(Mapper::Mbc3),
            0x19 | 0x1A | 0x1B | 0x1C | 0x1D | 0x1E => Ok(Mapper::Mbc5),
            0x20 => Ok(Mapper::Mbc6),
            0x22 => Ok(Mapper::Mbc7),
            other => Err(ReaderError::UnknownMapper(other)),
        }
    }

    /// Dump/restore is only implemented for these families.
    pub fn is_supported(self) -> bool {
        !matches!(self, Mapper::Mmm01 | Mapper::Mbc6 | Mapper::Mbc7)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RomSize {
    pub bytes: usize,
    pub banks: u16,
}

fn rom_size(code: u8) -> Result<RomSize, ReaderError> {
    let (kib, banks) = match code {
        0 => (32, 2),
        1 => (64, 4),
        2 => (128, 8),
        3 => (256, 16),
        4 => (512, 32),
        5 => (1024, 64),
        6 => (2048, 128),
        7 => (4096, 256),
        8 => (8192, 512),
        _ => return Err(ReaderError::InvalidHeader("ROM size code out of range")),
    };
    Ok(RomSize {
        bytes: kib * 1024,
        banks,
    })
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RamSize {
    pub bytes: usize,
    pub banks: u8,
}

fn ram_size(code: u8) -> Result<RamSize, ReaderError> {
    let (kib, banks) = match code {
        0 => (0, 0),
        1 => (2, 1),
        2 => (8, 1),
        3 => (32, 4),
        4 => (128, 16),
        5 => (64, 8),
        _ => return Err(ReaderError::InvalidHeader("RAM size code out of range")),
    };
    Ok(RamSize {
        bytes: kib * 1024,
        banks,
    })
}

/// Whether a recorded checksum matched. A mismatch is a warning carried
/// alongside the data, never a hard failure.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChecksumStatus {
    Valid,
    Invalid,
}

#[derive(Clone, Debug)]
pub struct CartridgeHeader {
    pub title: String,
    pub cgb_capable: bool,
    pub sgb_capable: bool,
    pub mapper: Mapper,
    pub rom: RomSize,
    pub ram: RamSize,
    pub header_checksum: u8,
    pub global_checksum: u16,
    pub header_checksum_status: ChecksumStatus,
    pub logo_status: ChecksumStatus,
}

/// Decode the first 0x150 bytes of a cartridge into a classified header.
pub fn decode_header(raw: &[u8; HEADER_LEN]) -> Result<CartridgeHeader, ReaderError> {
    let title_bytes = &raw[0x0134..0x0143];
    let title = title_bytes
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect();

    let cgb_flag = raw[0x0143];
    let cgb_capable = cgb_flag == 0x80 || cgb_flag == 0xC0;
    let sgb_capable = raw[0x0146] == 0x03;

    let mapper = Mapper::from_cartridge_type(raw[0x0147])?;
    let rom = rom_size(raw[0x0148])?;
    let ram = ram_size(raw[0x0149])?;

    let recorded_checksum = raw[0x014D];
    let global_checksum = (u16::from(raw[0x014E]) << 8) | u16::from(raw[0x014F]);

    let header_checksum_status = if header_checksum(raw) == recorded_checksum {
        ChecksumStatus::Valid
    } else {
        ChecksumStatus::Invalid
    };
    let logo_status = if verify_logo(raw) {
        ChecksumStatus::Valid
    } else {
        ChecksumStatus::Invalid
    };

    Ok(CartridgeHeader {
        title,
        cgb_capable,
        sgb_capable,
        mapper,
        rom,
        ram,
        header_checksum: recorded_checksum,
        global_checksum,
        header_checksum_status,
        logo_status,
    })
}

/// `acc = acc - b - 1 (mod 256)` over the 25 bytes `[0x0134..=0x014C]`.
pub fn header_checksum(raw: &[u8; HEADER_LEN]) -> u8 {
    let mut acc: u8 = 0;
    for &b in &raw[0x0134..=0x014C] {
        acc = acc.wrapping_sub(b).wrapping_sub(1);
    }
    acc
}

pub fn verify_logo(raw: &[u8; HEADER_LEN]) -> bool {
    raw[0x0104..0x0134] == LOGO
}

/// 16-bit unsigned sum of every byte of the full ROM image except the two
/// global-checksum bytes themselves.
pub fn global_checksum(rom: &[u8]) -> u16 {
    let mut sum: u16 = 0;
    for (offset, &b) in rom.iter().enumerate() {
        if offset == 0x014E || offset == 0x014F {
            continue;
        }
        sum = sum.wrapping_add(u16::from(b));
    }
    sum
}

pub fn verify_global_checksum(rom: &[u8], expected: u16) -> ChecksumStatus {
    if global_checksum(rom) == expected {
        ChecksumStatus::Valid
    } else {
        ChecksumStatus::Invalid
    }
}
