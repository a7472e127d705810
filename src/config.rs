use thiserror::Error;

/// Upper bound on ring capacity.
///
/// Cursor arithmetic is wrapping 32-bit; keeping the capacity well below
/// `u32::MAX` keeps `head - tail` unambiguous. The largest accepted power of
/// two is `0x0800_0000` (128M slots).
pub const SIZE_MASK: u32 = 0x0fff_ffff;

/// Error returned when a ring cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RingError {
    /// Capacity must be a positive power of two.
    #[error("capacity {0} is not a positive power of two")]
    NotPowerOfTwo(u32),
    /// Capacity exceeds the size mask.
    #[error("capacity {0} exceeds the size mask {mask:#x}", mask = SIZE_MASK)]
    TooLarge(u32),
}

/// Initialization flags restricting which side runs its single-threaded path.
///
/// The default (empty) set selects the multi-producer/multi-consumer
/// protocols. Setting [`Flags::SP`] (or [`Flags::SC`]) switches the producer
/// (or consumer) side to the uncontended single-caller path; with that flag
/// set, at most one thread may push (or pop) at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags {
    bits: u32,
}

impl Flags {
    /// Only one producer pushes; skip the reservation CAS.
    pub const SP: Flags = Flags { bits: 0x01 };
    /// Only one consumer pops; skip the reservation CAS.
    pub const SC: Flags = Flags { bits: 0x02 };

    /// No flags: multi-producer, multi-consumer.
    #[inline]
    pub const fn empty() -> Self {
        Flags { bits: 0 }
    }

    /// Returns true if all flags in `other` are set in `self`.
    #[inline]
    pub const fn contains(self, other: Flags) -> bool {
        self.bits & other.bits == other.bits
    }

    /// Combines two flag sets.
    #[inline]
    pub const fn union(self, other: Flags) -> Self {
        Flags {
            bits: self.bits | other.bits,
        }
    }
}

impl std::ops::BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        *self = self.union(rhs);
    }
}

/// Batch behavior for push and pop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// All-or-nothing: transfer the whole batch or report 0.
    Fixed,
    /// Best-effort: transfer as many as possible, accepting a short count.
    Variable,
}

/// Configuration for a [`Ring`](crate::Ring).
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Number of slots; must be a positive power of two, at most [`SIZE_MASK`].
    /// One slot is sacrificed to distinguish full from empty, so the ring
    /// holds at most `capacity - 1` handles.
    pub capacity: u32,
    /// Single-producer / single-consumer flags.
    pub flags: Flags,
    /// During the handoff stall, yield the scheduling quantum after this many
    /// pause hints. 0 means never yield.
    pub pause_rep: u32,
    /// Enable metrics collection (slight overhead on every operation).
    pub enable_metrics: bool,
}

impl Config {
    /// Creates a configuration with the given capacity and flags; handoff
    /// yielding off, metrics off.
    pub const fn new(capacity: u32, flags: Flags) -> Self {
        Self {
            capacity,
            flags,
            pause_rep: 0,
            enable_metrics: false,
        }
    }

    /// Sets the handoff-stall yield threshold.
    #[must_use]
    pub const fn with_pause_rep(mut self, pause_rep: u32) -> Self {
        self.pause_rep = pause_rep;
        self
    }

    /// Enables metrics collection.
    #[must_use]
    pub const fn with_metrics(mut self) -> Self {
        self.enable_metrics = true;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(1024, Flags::empty())
    }
}
