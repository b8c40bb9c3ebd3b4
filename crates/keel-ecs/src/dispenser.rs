//! Identifier dispenser with recycling.
//!
//! Hands out small unsigned integers, preferring previously released ones.
//! Used both for registry ids (`u16`) and for entity ids inside a registry
//! (`u32`).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Integer types a [`Dispenser`] can hand out.
pub trait DispenserId: Copy + Eq + fmt::Debug + Send + Sync + Into<u64> + TryFrom<u64> + 'static {}

impl DispenserId for u16 {}
impl DispenserId for u32 {}

/// Thread-safe allocator for recycled identifiers.
///
/// Released ids go onto a free list and are reused last-released-first.
/// When the free list is empty the dispenser counts upwards from its floor.
/// Zero is never handed out, so it stays available as an "unset" sentinel.
pub struct Dispenser<I> {
    /// Released ids awaiting reuse.
    free: Mutex<Vec<I>>,
    /// Next never-issued id.
    next: AtomicU64,
    /// First id the counter hands out.
    floor: u64,
}

impl<I: DispenserId> Dispenser<I> {
    /// Create a dispenser counting up from `floor`.
    ///
    /// A floor of zero is raised to one.
    #[must_use]
    pub fn new(floor: I) -> Self {
        let floor: u64 = floor.into();
        let floor = floor.max(1);
        Self {
            free: Mutex::new(Vec::new()),
            next: AtomicU64::new(floor),
            floor,
        }
    }

    /// Get an unused id.
    ///
    /// # Panics
    ///
    /// Panics if the id type is exhausted.
    pub fn get_free(&self) -> I {
        if let Some(id) = self.free.lock().pop() {
            return id;
        }

        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        match I::try_from(raw) {
            Ok(id) => id,
            Err(_) => panic!(
                "identifier space of {} exhausted",
                std::any::type_name::<I>()
            ),
        }
    }

    /// Return an id to the free list.
    ///
    /// Releasing an id that is not currently issued corrupts later
    /// allocations; debug builds assert against it.
    pub fn release(&self, id: I) {
        let mut free = self.free.lock();
        let raw: u64 = id.into();
        debug_assert!(
            (self.floor..self.next.load(Ordering::Relaxed)).contains(&raw),
            "released id {id:?} was never issued"
        );
        debug_assert!(!free.contains(&id), "id {id:?} released twice");
        free.push(id);
    }

    /// Number of released ids waiting for reuse.
    #[must_use]
    pub fn free_len(&self) -> usize {
        self.free.lock().len()
    }

    /// Number of ids currently handed out.
    #[must_use]
    pub fn issued(&self) -> u64 {
        let free = self.free.lock();
        // read under the lock so a concurrent release cannot be half-counted
        let minted = self.next.load(Ordering::Relaxed) - self.floor;
        minted.saturating_sub(free.len() as u64)
    }
}

impl<I: DispenserId> Default for Dispenser<I> {
    fn default() -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            next: AtomicU64::new(1),
            floor: 1,
        }
    }
}

impl<I: DispenserId> fmt::Debug for Dispenser<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispenser")
            .field("floor", &self.floor)
            .field("next", &self.next.load(Ordering::Relaxed))
            .field("free", &self.free_len())
            .finish()
    }
}
