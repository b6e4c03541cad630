use flume::Sender;

use crate::codec::Command;
use crate::error::ReaderError;
use crate::header::CartridgeHeader;
use crate::mbc::{self, BankSwitch};
use crate::progress::{emit_event, CancelToken, ProgressEvent};
use crate::session::Session;

const SMALL_RAM_THRESHOLD: usize = 8 * 1024;

/// Read the whole save out of cartridge RAM, sized by the header.
pub fn backup_ram(
    session: &mut Session,
    header: &CartridgeHeader,
    progress: &Sender<ProgressEvent>,
    cancel: &CancelToken,
) -> Result<Vec<u8>, ReaderError> {
    let result = backup_ram_inner(session, header, progress, cancel);
    // leave RAM disabled on every exit path, success or failure
    mbc::set_ram(session.codec_mut(), false)?;
    result
}

fn backup_ram_inner(
    session: &mut Session,
    header: &CartridgeHeader,
    progress: &Sender<ProgressEvent>,
    cancel: &CancelToken,
) -> Result<Vec<u8>, ReaderError> {
    if header.ram.bytes == 0 {
        return Ok(Vec::new());
    }

    if header.ram.bytes < SMALL_RAM_THRESHOLD {
        mbc::set_ram(session.codec_mut(), true)?;
        let sector = session.codec_mut().exchange(Command::Rdbk(0xA000))?;
        return Ok(sector[..header.ram.bytes].to_vec());
    }

    let mut ram = Vec::with_capacity(header.ram.bytes);
    for bank in 0..header.ram.banks {
        if cancel.is_cancelled() {
            return Err(ReaderError::Cancelled);
        }
        if header.ram.banks > 1 {
            header.mapper.change_ram_bank(session.codec_mut(), bank)?;
        }
        emit_event(progress, ProgressEvent::RamBankStart(bank));
        mbc::set_ram(session.codec_mut(), true)?;
        let low = session.codec_mut().exchange(Command::Rdbk(0xA000))?;
        let high = session.codec_mut().exchange(Command::Rdbk(0xB000))?;
        ram.extend_from_slice(&low);
        ram.extend_from_slice(&high);
        mbc::set_ram(session.codec_mut(), false)?;
        emit_event(progress, ProgressEvent::RamBankDone(bank));
    }
    emit_event(progress, ProgressEvent::Ready);
    Ok(ram)
}

/// Write a save image back into cartridge RAM. The image's length must
/// equal the declared RAM size exactly.
pub fn restore_ram(
    session: &mut Session,
    header: &CartridgeHeader,
    image: &[u8],
    progress: &Sender<ProgressEvent>,
    cancel: &CancelToken,
) -> Result<(), ReaderError> {
    if image.len() != header.ram.bytes {
        return Err(ReaderError::SaveSizeMismatch {
            expected: header.ram.bytes,
            got: image.len(),
        });
    }

    let result = restore_ram_inner(session, header, image, progress, cancel);
    mbc::set_ram(session.codec_mut(), false)?;
    result
}

fn restore_ram_inner(
    session: &mut Session,
    header: &CartridgeHeader,
    image: &[u8],
    progress: &Sender<ProgressEvent>,
    cancel: &CancelToken,
) -> Result<(), ReaderError> {
    if header.ram.bytes == 0 {
        return Ok(());
    }

    header.mapper.change_ram_bank(session.codec_mut(), 0)?;

    if header.ram.bytes < SMALL_RAM_THRESHOLD {
        mbc::set_ram(session.codec_mut(), true)?;
        session
            .codec_mut()
            .exchange_with_stream(Command::RmWr2k, image)?;
        return Ok(());
    }

    for bank in 0..header.ram.banks {
        if cancel.is_cancelled() {
            return Err(ReaderError::Cancelled);
        }
        if header.ram.banks > 1 {
            header.mapper.change_ram_bank(session.codec_mut(), bank)?;
        }
        emit_event(progress, ProgressEvent::RamBankStart(bank));
        mbc::set_ram(session.codec_mut(), true)?;
        let offset = bank as usize * 0x2000;
        let low = &image[offset..offset + 0x1000];
        let high = &image[offset + 0x1000..offset + 0x2000];
        session
            .codec_mut()
            .exchange_with_stream(Command::RmWr4kA, low)?;
        session
            .codec_mut()
            .exchange_with_stream(Command::RmWr4kB, high)?;
        mbc::set_ram(session.codec_mut(), false)?;
        emit_event(progress, ProgressEvent::RamBankDone(bank));
    }
    emit_event(progress, ProgressEvent::Ready);
    Ok(())
}
