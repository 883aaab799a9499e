//! Process-wide exclusive ownership of the engine

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

static GLOBAL_SLOT: OnceLock<Arc<EngineSlot>> = OnceLock::new();

/// The single place an engine instance may be held from.
///
/// At most one [`EngineLease`] exists per slot at any time.
#[derive(Debug, Default)]
pub struct EngineSlot {
    held: AtomicBool,
}

impl EngineSlot {
    /// A private slot, independent of the process-wide one
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The process-wide slot used by [`super::EngineSession::new`]
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL_SLOT.get_or_init(EngineSlot::new))
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    pub(crate) fn try_acquire(self: &Arc<Self>) -> Option<EngineLease> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| EngineLease {
                slot: Arc::clone(self),
            })
    }
}

/// Proof of exclusive engine ownership; dropping it frees the slot
pub struct EngineLease {
    slot: Arc<EngineSlot>,
}

impl Drop for EngineLease {
    fn drop(&mut self) {
        self.slot.held.store(false, Ordering::Release);
    }
}

impl fmt::Debug for EngineLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EngineLease")
    }
}
