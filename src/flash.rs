use flume::Sender;

use crate::codec::Command;
use crate::dump::dump_rom;
use crate::error::ReaderError;
use crate::header::{CartridgeHeader, ChecksumStatus, Mapper, RamSize, RomSize};
use crate::progress::{emit_event, CancelToken, ProgressEvent};
use crate::session::Session;

const PAGE_SIZE: usize = 256;
const PAGES_PER_SECTOR: usize = 16;
const PAGE_COUNT: usize = 128;
const FLASH_ROM_SIZE: usize = PAGE_COUNT * PAGE_SIZE; // 32 KiB
const ERASE_POLL_CAP: u16 = 0x1000;

const ACCEPTED_CHIP_IDS: [u16; 3] = [0xBFB5, 0xBFB6, 0xBFB7];

/// Logged at `debug!` on every transition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlashState {
    Idle,
    IdentifyChip,
    EraseSector(usize),
    ProgramPage(usize),
    Verify,
    Done,
    Failed,
}

fn transition(state: &mut FlashState, next: FlashState) {
    debug!("flash job: {:?} -> {:?}", state, next);
    *state = next;
}

/// Read the SST39SF0x0 JEDEC id and accept only the SST39SF0x0 family.
/// The `+1` on the high byte before shifting is kept as-is; acceptance is
/// defined against the post-shift value, not against the raw JEDEC id pair.
pub fn get_chip_id(session: &mut Session) -> Result<u16, ReaderError> {
    let response = session.codec_mut().exchange(Command::DevIdSst)?;
    let id1 = response[0];
    let id2 = response[1];
    Ok((u16::from(id1) + 1) << 8 | u16::from(id2))
}

fn erase_sector(session: &mut Session, addr: u16) -> Result<u16, ReaderError> {
    let response = session.codec_mut().exchange(Command::Esst(addr))?;
    let poll_cycles = (u16::from(response[0]) << 8) | u16::from(response[1]);
    if poll_cycles >= ERASE_POLL_CAP {
        return Err(ReaderError::FlashEraseTimeout);
    }
    Ok(poll_cycles)
}

fn burn_page(session: &mut Session, addr: u16, page: &[u8]) -> Result<(), ReaderError> {
    session
        .codec_mut()
        .exchange_with_stream(Command::Wrst(addr), page)
}

/// Identify, erase, program, then verify a 32 KiB SST39SF0x0 image.
/// Verification reuses the ROM dumper configured for a mapper-less
/// 2-bank image, matching the flash target exactly.
pub fn flash_rom(
    session: &mut Session,
    image: &[u8],
    progress: &Sender<ProgressEvent>,
    cancel: &CancelToken,
) -> Result<(), ReaderError> {
    if image.len() != FLASH_ROM_SIZE {
        return Err(ReaderError::InvalidHeader(
            "flash_rom only supports 32 KiB SST39SF0x0 images",
        ));
    }

    let mut state = FlashState::Idle;
    transition(&mut state, FlashState::IdentifyChip);

    let chip_id = get_chip_id(session)?;
    if !ACCEPTED_CHIP_IDS.contains(&chip_id) {
        transition(&mut state, FlashState::Failed);
        return Err(ReaderError::WrongFlashChip(chip_id));
    }

    for page in 0..PAGE_COUNT {
        if cancel.is_cancelled() {
            transition(&mut state, FlashState::Failed);
            return Err(ReaderError::Cancelled);
        }

        let addr = (page * PAGE_SIZE) as u16;
        if page % PAGES_PER_SECTOR == 0 {
            transition(&mut state, FlashState::EraseSector(page / PAGES_PER_SECTOR));
            let poll_cycles = match erase_sector(session, addr) {
                Ok(cycles) => cycles,
                Err(err) => {
                    transition(&mut state, FlashState::Failed);
                    return Err(err);
                }
            };
            emit_event(
                progress,
                ProgressEvent::SectorErased {
                    address: addr,
                    poll_cycles,
                },
            );
        }

        transition(&mut state, FlashState::ProgramPage(page));
        let chunk = &image[page * PAGE_SIZE..(page + 1) * PAGE_SIZE];
        if let Err(err) = burn_page(session, addr, chunk) {
            transition(&mut state, FlashState::Failed);
            return Err(err);
        }
        emit_event(progress, ProgressEvent::PageProgrammed(page));
    }

    transition(&mut state, FlashState::Verify);
    emit_event(progress, ProgressEvent::Verifying);

    let verify_header = CartridgeHeader {
        title: String::new(),
        cgb_capable: false,
        sgb_capable: false,
        mapper: Mapper::None,
        rom: RomSize {
            bytes: FLASH_ROM_SIZE,
            banks: 2,
        },
        ram: RamSize { bytes: 0, banks: 0 },
        header_checksum: 0,
        global_checksum: 0,
        header_checksum_status: ChecksumStatus::Valid,
        logo_status: ChecksumStatus::Valid,
    };
    let dumped = dump_rom(session, &verify_header, progress, cancel)?;
    if dumped.rom != image {
        transition(&mut state, FlashState::Failed);
        return Err(ReaderError::FlashVerifyFailed);
    }

    transition(&mut state, FlashState::Done);
    emit_event(progress, ProgressEvent::Ready);
    Ok(())
}
