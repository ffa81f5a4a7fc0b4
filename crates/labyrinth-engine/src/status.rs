use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Progress of a running search, readable from other threads.
#[derive(Debug, Default)]
pub struct SearchStatus {
    depth: AtomicU8,
    terminated: AtomicBool,
}

impl SearchStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.depth.store(0, Ordering::Relaxed);
        self.terminated.store(false, Ordering::Release);
    }

    /// Deepest completed iteration.
    pub fn depth(&self) -> u8 {
        self.depth.load(Ordering::Relaxed)
    }

    pub fn set_depth(&self, depth: u8) {
        self.depth.store(depth, Ordering::Relaxed);
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    pub fn terminate(&self) {
        self.terminated.store(true, Ordering::Release);
    }
}
