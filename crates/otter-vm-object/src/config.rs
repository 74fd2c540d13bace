//! Slot storage configuration

/// Embedded table size allocated on first insert (must be a power of two)
pub const INITIAL_SLOT_CAPACITY: usize = 4;

/// Slot count at which a container switches to the balanced map
pub const LARGE_OBJECT_THRESHOLD: usize = 2000;

/// Slot storage configuration
#[derive(Debug, Clone)]
pub struct SlotMapConfig {
    /// Initial embedded table capacity (default: 4, rounded up to a power of two)
    pub initial_capacity: usize,
    /// Migrate to the balanced map at this many slots (default: 2000)
    pub large_object_threshold: usize,
    /// Give new objects a thread-safe container (default: false)
    pub thread_safe: bool,
}

impl Default for SlotMapConfig {
    fn default() -> Self {
        Self {
            initial_capacity: INITIAL_SLOT_CAPACITY,
            large_object_threshold: LARGE_OBJECT_THRESHOLD,
            thread_safe: false,
        }
    }
}

impl SlotMapConfig {
    /// Default configuration with thread-safe containers
    pub fn thread_safe() -> Self {
        Self {
            thread_safe: true,
            ..Self::default()
        }
    }

    /// Capacity actually used for the first embedded table
    pub(crate) fn table_capacity(&self) -> usize {
        self.initial_capacity.max(1).next_power_of_two()
    }
}
