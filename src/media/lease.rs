use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// The single camera/video element a host renders into. At most one
/// controller may hold it at a time.
#[derive(Debug, Clone, Default)]
pub struct MediaSlot {
    bound: Arc<AtomicBool>,
}

impl MediaSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the slot, or `None` when another controller already holds it.
    pub fn try_acquire(&self) -> Option<MediaLease> {
        self.bound
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| MediaLease {
                bound: Arc::clone(&self.bound),
            })
    }

    pub fn is_bound(&self) -> bool {
        self.bound.load(Ordering::Acquire)
    }
}

/// Exclusive hold on a [`MediaSlot`]; released on drop.
#[derive(Debug)]
pub struct MediaLease {
    bound: Arc<AtomicBool>,
}

impl Drop for MediaLease {
    fn drop(&mut self) {
        self.bound.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_bind_is_refused_until_release() {
        let slot = MediaSlot::new();
        let lease = slot.try_acquire().expect("first bind");
        assert!(slot.try_acquire().is_none());
        assert!(slot.is_bound());

        drop(lease);
        assert!(!slot.is_bound());
        assert!(slot.try_acquire().is_some());
    }
}
