extern crate clap;

use std::fs::File;
use std::io::{Read, Write};

use clap::{App, Arg, SubCommand};
use gbcr::config::ReaderConfig;
use gbcr::dump::dump_rom;
use gbcr::flash::flash_rom;
use gbcr::header::CartridgeHeader;
use gbcr::progress::CancelToken;
use gbcr::ram::{backup_ram, restore_ram};
use gbcr::session::Session;
use gbcr::transport::Transport;
use simplelog::{Config, LevelFilter, TermLogger};

fn main() {
    TermLogger::init(LevelFilter::Info, Config::default()).expect("failed to install logger");

    let matches = App::new("gbcr")
        .author("Ivo Filot <ivo@ivofilot.nl>")
        .about("Reads, writes, and reflashes Game Boy cartridges")
        .subcommand(SubCommand::with_name("info").about("print board and cartridge info"))
        .subcommand(
            SubCommand::with_name("dump-rom")
                .about("dump the inserted cartridge's ROM to a file")
                .arg(Arg::with_name("output").short("o").required(true).value_name("FILE")),
        )
        .subcommand(
            SubCommand::with_name("backup-ram")
                .about("back up the inserted cartridge's save RAM to a file")
                .arg(Arg::with_name("output").short("o").required(true).value_name("FILE")),
        )
        .subcommand(
            SubCommand::with_name("restore-ram")
                .about("restore a save file into the inserted cartridge's RAM")
                .arg(Arg::with_name("input").short("i").required(true).value_name("FILE")),
        )
        .subcommand(
            SubCommand::with_name("flash-rom")
                .about("reflash a 32 KiB SST39SF0x0 cartridge")
                .arg(Arg::with_name("input").short("i").required(true).value_name("FILE")),
        )
        .get_matches();

    let result = match matches.subcommand() {
        ("info", Some(_)) => run_info(),
        ("dump-rom", Some(sub)) => run_dump_rom(sub.value_of("output").unwrap()),
        ("backup-ram", Some(sub)) => run_backup_ram(sub.value_of("output").unwrap()),
        ("restore-ram", Some(sub)) => run_restore_ram(sub.value_of("input").unwrap()),
        ("flash-rom", Some(sub)) => run_flash_rom(sub.value_of("input").unwrap()),
        _ => {
            eprintln!("no subcommand given, see --help");
            std::process::exit(1);
        }
    };

    if let Err(err) = result {
        error!("{}", err);
        std::process::exit(1);
    }
}

/// The core never discovers or opens a serial port itself; a real
/// embedding application supplies its own `Transport`. This binary
/// exists to exercise the core end-to-end, so it opens a `Transport`
/// wrapping whatever file descriptor the `GBCR_PORT` environment variable
/// names, left for the operator to arrange (e.g. a symlink to the actual
/// tty) rather than something this crate resolves on its own.
fn open_transport() -> Result<Box<dyn Transport>, gbcr::error::ReaderError> {
    let path = std::env::var("GBCR_PORT").unwrap_or_else(|_| "/dev/gbcr0".to_string());
    Ok(Box::new(FileTransport::open(&path)?))
}

struct FileTransport {
    file: File,
}

impl FileTransport {
    fn open(path: &str) -> Result<FileTransport, gbcr::error::ReaderError> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| gbcr::error::ReaderError::Transport(e.to_string()))?;
        Ok(FileTransport { file })
    }
}

impl Transport for FileTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), gbcr::error::ReaderError> {
        self.file
            .write_all(bytes)
            .map_err(|e| gbcr::error::ReaderError::Transport(e.to_string()))
    }

    fn bytes_available(&mut self) -> Result<usize, gbcr::error::ReaderError> {
        // a plain file descriptor has no portable "bytes ready" query;
        // the caller-supplied real serial Transport is expected to
        // implement this precisely. Treat the stream as always ready.
        Ok(1)
    }

    fn read_partial(&mut self, buf: &mut [u8]) -> Result<usize, gbcr::error::ReaderError> {
        self.file
            .read(buf)
            .map_err(|e| gbcr::error::ReaderError::Transport(e.to_string()))
    }

    fn drain(&mut self) -> Result<(), gbcr::error::ReaderError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), gbcr::error::ReaderError> {
        Ok(())
    }
}

fn open_session() -> Result<Session, gbcr::error::ReaderError> {
    let transport = open_transport()?;
    Ok(Session::new(transport, ReaderConfig::default()))
}

fn run_info() -> Result<(), gbcr::error::ReaderError> {
    let mut session = open_session()?;
    let board = session.identify()?;
    println!("chipset: {:?}", board.chipset);
    println!(
        "firmware: {}.{}.{}",
        board.version.major, board.version.minor, board.version.patch
    );
    let header = session.read_header()?;
    print_header(&header);
    session.close()
}

fn print_header(header: &CartridgeHeader) {
    println!("title: {}", header.title);
    println!("mapper: {}", header.mapper);
    println!("rom: {} bytes ({} banks)", header.rom.bytes, header.rom.banks);
    println!("ram: {} bytes ({} banks)", header.ram.bytes, header.ram.banks);
    println!("header checksum: {:?}", header.header_checksum_status);
    println!("logo: {:?}", header.logo_status);
}

fn run_dump_rom(output: &str) -> Result<(), gbcr::error::ReaderError> {
    let mut session = open_session()?;
    let header = session.read_header()?;
    let (tx, rx) = flume::unbounded();
    let cancel = CancelToken::new();
    std::thread::spawn(move || while rx.recv().is_ok() {});
    let result = dump_rom(&mut session, &header, &tx, &cancel)?;
    info!("checksum: {:?}", result.checksum_status);
    let mut file = File::create(output).map_err(|e| gbcr::error::ReaderError::Transport(e.to_string()))?;
    file.write_all(&result.rom)
        .map_err(|e| gbcr::error::ReaderError::Transport(e.to_string()))?;
    session.close()
}

fn run_backup_ram(output: &str) -> Result<(), gbcr::error::ReaderError> {
    let mut session = open_session()?;
    let header = session.read_header()?;
    let (tx, rx) = flume::unbounded();
    let cancel = CancelToken::new();
    std::thread::spawn(move || while rx.recv().is_ok() {});
    let ram = backup_ram(&mut session, &header, &tx, &cancel)?;
    let mut file = File::create(output).map_err(|e| gbcr::error::ReaderError::Transport(e.to_string()))?;
    file.write_all(&ram)
        .map_err(|e| gbcr::error::ReaderError::Transport(e.to_string()))?;
    session.close()
}

fn run_restore_ram(input: &str) -> Result<(), gbcr::error::ReaderError> {
    let mut session = open_session()?;
    let header = session.read_header()?;
    let mut image = Vec::new();
    File::open(input)
        .and_then(|mut f| f.read_to_end(&mut image))
        .map_err(|e| gbcr::error::ReaderError::Transport(e.to_string()))?;
    let (tx, rx) = flume::unbounded();
    let cancel = CancelToken::new();
    std::thread::spawn(move || while rx.recv().is_ok() {});
    restore_ram(&mut session, &header, &image, &tx, &cancel)?;
    session.close()
}

fn run_flash_rom(input: &str) -> Result<(), gbcr::error::ReaderError> {
    let mut session = open_session()?;
    let mut image = Vec::new();
    File::open(input)
        .and_then(|mut f| f.read_to_end(&mut image))
        .map_err(|e| gbcr::error::ReaderError::Transport(e.to_string()))?;
    let (tx, rx) = flume::unbounded();
    let cancel = CancelToken::new();
    std::thread::spawn(move || while rx.recv().is_ok() {});
    flash_rom(&mut session, &image, &tx, &cancel)?;
    session.close()
}
