use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{Builder, JoinHandle};

use flume::{Receiver, Sender, TrySendError};

/// Progress emitted by a dump/backup/restore/flash job. Receivers live on
/// the caller's thread; the job's worker thread never blocks on a slow
/// consumer (`try_send` treats a full channel as back-pressure, not an
/// error).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    SectorStart(usize),
    SectorDone(usize),
    RamBankStart(u8),
    RamBankDone(u8),
    SectorErased { address: u16, poll_cycles: u16 },
    PageProgrammed(usize),
    Verifying,
    Ready,
}

/// Shared on/off switch a caller can flip to request cooperative
/// cancellation at the next sector/page boundary.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn emit(sender: &Sender<ProgressEvent>, event: ProgressEvent) {
    match sender.try_send(event) {
        Ok(()) | Err(TrySendError::Full(_)) => {}
        Err(TrySendError::Disconnected(_)) => {}
    }
}

pub(crate) fn emit_event(sender: &Sender<ProgressEvent>, event: ProgressEvent) {
    emit(sender, event);
}

/// Run a long job (dump/backup/restore/flash) on a dedicated worker thread
/// that owns the session exclusively, posting progress on a bounded
/// channel. Mirrors `start_emulator_thread`'s `Builder::new().name(...)`.
pub fn spawn_job<F>(name: &'static str, job: F) -> (JoinHandle<()>, Receiver<ProgressEvent>)
where
    F: FnOnce(Sender<ProgressEvent>) + Send + 'static,
{
    let (tx, rx) = flume::bounded(32);
    let handle = Builder::new()
        .name(name.to_string())
        .spawn(move || {
            debug!("{} thread spawned", name);
            job(tx);
            debug!("{} thread exiting", name);
        })
        .expect("failed to spawn worker thread");
    (handle, rx)
}
