use flume::Sender;

use crate::codec::Command;
use crate::error::ReaderError;
use crate::header::{verify_global_checksum, CartridgeHeader, ChecksumStatus, SECTOR_SIZE};
use crate::mbc::BankSwitch;
use crate::progress::{emit_event, CancelToken, ProgressEvent};
use crate::session::Session;

#[derive(Clone, Debug)]
pub struct DumpResult {
    pub rom: Vec<u8>,
    pub checksum_status: ChecksumStatus,
}

/// Dump the full ROM: fixed low window (sectors 0..=3), then the upper
/// window (sectors 4..=7) once per bank, recomputing the global checksum
/// against the header's recorded value at the end. A checksum mismatch
/// is reported, not treated as an error.
pub fn dump_rom(
    session: &mut Session,
    header: &CartridgeHeader,
    progress: &Sender<ProgressEvent>,
    cancel: &CancelToken,
) -> Result<DumpResult, ReaderError> {
    if !header.mapper.is_supported() {
        return Err(ReaderError::UnsupportedMapper(header.mapper));
    }

    let mut rom = Vec::with_capacity(header.rom.bytes);
    let mut index = 0usize;

    for sector in 0u16..4 {
        if cancel.is_cancelled() {
            return Err(ReaderError::Cancelled);
        }
        emit_event(progress, ProgressEvent::SectorStart(index));
        let addr = sector * SECTOR_SIZE as u16;
        let data = session.codec_mut().exchange(Command::Rdbk(addr))?;
        rom.extend_from_slice(&data);
        emit_event(progress, ProgressEvent::SectorDone(index));
        index += 1;
    }

    for bank in 1..header.rom.banks {
        if cancel.is_cancelled() {
            return Err(ReaderError::Cancelled);
        }
        header.mapper.change_rom_bank(session.codec_mut(), bank)?;
        for sector in 4u16..8 {
            if cancel.is_cancelled() {
                return Err(ReaderError::Cancelled);
            }
            emit_event(progress, ProgressEvent::SectorStart(index));
            let addr = sector * SECTOR_SIZE as u16;
            let data = session.codec_mut().exchange(Command::Rdbk(addr))?;
            rom.extend_from_slice(&data);
            emit_event(progress, ProgressEvent::SectorDone(index));
            index += 1;
        }
    }

    let checksum_status = verify_global_checksum(&rom, header.global_checksum);
    emit_event(progress, ProgressEvent::Ready);
    Ok(DumpResult {
        rom,
        checksum_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReaderConfig;
    use crate::header::{Mapper, RamSize, RomSize};
    use crate::testutil::RecordingTransport;

    fn header_for(mapper: Mapper, banks: u16) -> CartridgeHeader {
        CartridgeHeader {
            title: "TEST".to_string(),
            cgb_capable: false,
            sgb_capable: false,
            mapper,
            rom: RomSize {
                bytes: banks as usize * 0x4000,
                banks,
            },
            ram: RamSize { bytes: 0, banks: 0 },
            header_checksum: 0,
            global_checksum: 0,
            header_checksum_status: ChecksumStatus::Valid,
            logo_status: ChecksumStatus::Valid,
        }
    }

    #[test]
    fn dump_rejects_unsupported_mapper_before_any_io() {
        let (transport, writes) = RecordingTransport::new();
        let mut session = Session::new(Box::new(transport), ReaderConfig::default());
        let header = header_for(Mapper::Mmm01, 4);
        let (tx, _rx) = flume::unbounded();
        let cancel = CancelToken::new();
        let result = dump_rom(&mut session, &header, &tx, &cancel);
        assert!(matches!(result, Err(ReaderError::UnsupportedMapper(_))));
        assert!(writes.take_writes().is_empty());
    }

    #[test]
    fn dump_produces_rom_of_expected_length() {
        let (transport, _writes) = RecordingTransport::new();
        let mut session = Session::new(Box::new(transport), ReaderConfig::default());
        let header = header_for(Mapper::Mbc1, 4);
        let (tx, _rx) = flume::unbounded();
        let cancel = CancelToken::new();
        let result = dump_rom(&mut session, &header, &tx, &cancel).unwrap();
        assert_eq!(result.rom.len(), header.rom.bytes);
    }
}
