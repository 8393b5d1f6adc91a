// Ctrl+C handling. Outside the recursive loop an interrupt ends the process
// as usual; while the loop holds an `Armed` guard the first interrupt only
// trips a flag, so the loop can stop and still save what it has.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error};

const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    armed: Arc<AtomicBool>,
    tripped: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the signal listener thread. It runs a current-thread tokio
    /// runtime that only waits on Ctrl+C.
    pub fn install(&self) -> std::io::Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let interrupt = self.clone();

        thread::Builder::new()
            .name("ctrl-c".into())
            .spawn(move || {
                runtime.block_on(async move {
                    loop {
                        if let Err(e) = tokio::signal::ctrl_c().await {
                            error!("Failed to listen for Ctrl+C: {}", e);
                            return;
                        }
                        if !interrupt.on_signal() {
                            std::process::exit(INTERRUPTED_EXIT_CODE);
                        }
                    }
                })
            })?;
        Ok(())
    }

    /// Record a signal. Returns false when the process should exit instead:
    /// nothing is armed, or this is a second interrupt.
    pub fn on_signal(&self) -> bool {
        if !self.armed.load(Ordering::SeqCst) {
            return false;
        }
        let already = self.tripped.swap(true, Ordering::SeqCst);
        debug!(already, "Interrupt received while armed");
        !already
    }

    pub fn arm(&self) -> Armed<'_> {
        self.tripped.store(false, Ordering::SeqCst);
        self.armed.store(true, Ordering::SeqCst);
        Armed { interrupt: self }
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    /// Tripped while a loop holds the guard. A stale trip from an earlier
    /// file never counts.
    pub fn is_interrupted(&self) -> bool {
        self.armed.load(Ordering::SeqCst) && self.is_tripped()
    }

    pub fn trip(&self) {
        self.tripped.store(true, Ordering::SeqCst);
    }
}

/// Disarms and clears any trip on drop.
pub struct Armed<'a> {
    interrupt: &'a Interrupt,
}

impl Drop for Armed<'_> {
    fn drop(&mut self) {
        self.interrupt.armed.store(false, Ordering::SeqCst);
        self.interrupt.tripped.store(false, Ordering::SeqCst);
    }
}
