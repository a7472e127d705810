use crate::invariants::{
    debug_assert_claim_bounded, debug_assert_handoff_position, debug_assert_occupancy_bounded,
};
use crate::{Backoff, Behavior, Config, Flags, Metrics, MetricsSnapshot, RingError, SIZE_MASK};
use std::cell::UnsafeCell;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};

// =============================================================================
// CURSOR PROTOCOL & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// Each side of the ring owns a pair of monotonically increasing 32-bit
// cursors:
//
// - `head` is the reservation boundary: slots below it are claimed by some
//   batch in flight.
// - `tail` is the visibility boundary: slots below it are published and safe
//   for the other side to touch.
//
// All occupancy arithmetic is wrapping 32-bit. Capacity is bounded by
// `SIZE_MASK`, so `head - tail` never wraps into ambiguity. Cursors are only
// reduced modulo capacity (`& mask`) when indexing the slot array.
//
// ## Producer (push path)
//
// 1. Load `prod.head` (Relaxed: producers own it) and `cons.tail` (Acquire:
//    synchronizes with the consumer's release, so freed slots are really free).
// 2. Free slots = `mask + cons.tail - prod.head`; apply the FIXED/VARIABLE
//    short-count policy.
// 3. Reserve: advance `prod.head` by `n`. Single-producer mode stores it
//    directly; multi-producer mode CASes from the snapshot (AcqRel) and
//    restarts from step 1 on failure.
// 4. Write the claimed slots. No ordering on the writes themselves; the
//    protocol guarantees exclusive access to the claimed range.
// 5. Multi-producer only: stall until `prod.tail == snapshot` (Acquire). The
//    Acquire load orders earlier batches' slot writes before our publication,
//    so the release below covers every slot up to `snapshot + n`.
// 6. Publish: store `prod.tail = snapshot + n` (Release).
//
// ## Consumer (pop path)
//
// Mirror image: load `cons.head` / `prod.tail` (Acquire), claim committed
// slots, advance `cons.head` (store or CAS), copy out, stall on
// `cons.tail == snapshot`, release-store `cons.tail`.
//
// ## Slot exclusivity
//
// A slot is written by exactly the producer whose reservation covers it, and
// read by exactly the consumer whose reservation covers it. Cross-side reuse
// is fenced by the two tail cursors: producers never write a slot until
// `cons.tail` has passed it, consumers never read one until `prod.tail` has
// passed it. The slot cells therefore need no per-slot synchronization.
//
// =============================================================================

/// One machine-word opaque handle.
///
/// The ring neither inspects the bit pattern nor retains a copy after pop;
/// interpretation and lifetime of the value are the caller's concern.
pub type Handle = usize;

/// One side of the ring: the producer half or the consumer half.
///
/// `size` and `mask` are duplicated on both sides so each protocol path reads
/// them from its own cache line.
struct Side {
    /// True when this side runs its single-caller path.
    single: bool,
    size: u32,
    mask: u32,
    /// Reservation cursor.
    head: AtomicU32,
    /// Visibility cursor.
    tail: AtomicU32,
}

impl Side {
    fn new(single: bool, size: u32) -> Self {
        Self {
            single,
            size,
            mask: size - 1,
            head: AtomicU32::new(0),
            tail: AtomicU32::new(0),
        }
    }
}

/// Bounded lock-free MPMC FIFO of opaque machine-word handles.
///
/// Producer and consumer metadata live on separate cache lines so the two
/// sides' hot writes do not thrash each other; the slot storage is its own
/// allocation and shares a line with neither.
///
/// # Single-producer / single-consumer flags
///
/// With [`Flags::SP`] set, [`push`](Ring::push) must not be called from two
/// threads concurrently; with [`Flags::SC`] set, the same holds for
/// [`pop`](Ring::pop). The library does not check this. Without the flags
/// (the default), any number of threads may push and pop.
pub struct Ring {
    prod: CacheAligned<Side>,
    cons: CacheAligned<Side>,
    metrics: Metrics,
    config: Config,
    slots: Box<[UnsafeCell<Handle>]>,
}

impl std::fmt::Debug for Ring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ring")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

// SAFETY: cursor atomics coordinate all cross-thread slot access; a slot is
// never written and read concurrently (see the protocol notes above).
unsafe impl Send for Ring {}
unsafe impl Sync for Ring {}

impl Ring {
    /// Returns the byte footprint of a ring with the given capacity (header
    /// plus `capacity` handle slots), or 0 if `capacity` is not a positive
    /// power of two or exceeds [`SIZE_MASK`].
    pub fn memsize(capacity: u32) -> usize {
        if !capacity.is_power_of_two() || capacity > SIZE_MASK {
            return 0;
        }
        mem::size_of::<Ring>() + capacity as usize * mem::size_of::<Handle>()
    }

    /// Creates a ring with the given capacity and flags.
    ///
    /// `capacity` must be a positive power of two, at most [`SIZE_MASK`]. The
    /// ring holds at most `capacity - 1` handles.
    pub fn new(capacity: u32, flags: Flags) -> Result<Self, RingError> {
        Self::with_config(Config::new(capacity, flags))
    }

    /// Creates a ring from a full [`Config`].
    pub fn with_config(config: Config) -> Result<Self, RingError> {
        let capacity = config.capacity;
        if !capacity.is_power_of_two() {
            return Err(RingError::NotPowerOfTwo(capacity));
        }
        if capacity > SIZE_MASK {
            return Err(RingError::TooLarge(capacity));
        }

        let mut slots = Vec::with_capacity(capacity as usize);
        slots.resize_with(capacity as usize, || UnsafeCell::new(0));

        Ok(Self {
            prod: CacheAligned::new(Side::new(config.flags.contains(Flags::SP), capacity)),
            cons: CacheAligned::new(Side::new(config.flags.contains(Flags::SC), capacity)),
            metrics: Metrics::new(),
            config,
            slots: slots.into_boxed_slice(),
        })
    }

    // ---------------------------------------------------------------------
    // CAPACITY & PREDICATES
    // ---------------------------------------------------------------------

    /// Returns the slot count. Usable occupancy is one less.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.prod.size
    }

    /// Approximate number of handles currently in the ring.
    ///
    /// Reads only the two visibility cursors; under concurrency the value may
    /// be stale the moment it returns.
    #[inline]
    pub fn count(&self) -> usize {
        let prod_tail = self.prod.tail.load(Ordering::Relaxed);
        let cons_tail = self.cons.tail.load(Ordering::Relaxed);
        (prod_tail.wrapping_sub(cons_tail) & self.prod.mask) as usize
    }

    /// Approximate number of free slots. Same staleness caveat as
    /// [`count`](Ring::count).
    #[inline]
    pub fn avail(&self) -> usize {
        let prod_tail = self.prod.tail.load(Ordering::Relaxed);
        let cons_tail = self.cons.tail.load(Ordering::Relaxed);
        (cons_tail.wrapping_sub(prod_tail).wrapping_sub(1) & self.prod.mask) as usize
    }

    /// True if no committed handles remain.
    #[inline]
    pub fn is_empty(&self) -> bool {
        let prod_tail = self.prod.tail.load(Ordering::Relaxed);
        let cons_tail = self.cons.tail.load(Ordering::Relaxed);
        prod_tail == cons_tail
    }

    /// True if no free slot remains.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.avail() == 0
    }

    /// A snapshot of the activity counters; all zeros unless
    /// [`Config::enable_metrics`] was set.
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.config.enable_metrics {
            self.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }

    // ---------------------------------------------------------------------
    // PUSH
    // ---------------------------------------------------------------------

    /// Pushes a batch of handles.
    ///
    /// Returns the number actually enqueued: all of them on success, 0 on a
    /// [`Behavior::Fixed`] shortfall, and a possibly short count under
    /// [`Behavior::Variable`] (0 only against a full ring).
    ///
    /// A handle is logically transferred to the consumer that pops it; after a
    /// successful push the producer must not reuse whatever the handle refers
    /// to until that consumer releases it.
    pub fn push(&self, handles: &[Handle], behavior: Behavior) -> usize {
        if handles.is_empty() {
            return 0;
        }
        if self.prod.single {
            self.push_single(handles, behavior)
        } else {
            self.push_multi(handles, behavior)
        }
    }

    /// Pushes one handle; true on success. Equivalent to a fixed push of 1.
    #[inline]
    pub fn push_one(&self, handle: Handle) -> bool {
        self.push(&[handle], Behavior::Fixed) == 1
    }

    fn push_single(&self, handles: &[Handle], behavior: Behavior) -> usize {
        let mask = self.prod.mask;

        let head = self.prod.head.load(Ordering::Relaxed);
        let cons_tail = self.cons.tail.load(Ordering::Acquire);
        let free = mask.wrapping_add(cons_tail).wrapping_sub(head) as usize;

        let n = claim(handles.len(), free, behavior);
        if n == 0 {
            return 0;
        }
        debug_assert_claim_bounded!(n, free);

        let next = head.wrapping_add(n as u32);
        debug_assert_occupancy_bounded!(next.wrapping_sub(cons_tail), mask);
        self.prod.head.store(next, Ordering::Relaxed);

        // SAFETY: [head, next) is free (free >= n) and this is the only
        // producer; no consumer reads the range until prod.tail covers it.
        unsafe { self.copy_in(head, &handles[..n]) };

        self.prod.tail.store(next, Ordering::Release);

        if self.config.enable_metrics {
            self.metrics.add_pushed(n as u64);
        }
        n
    }

    fn push_multi(&self, handles: &[Handle], behavior: Behavior) -> usize {
        let mask = self.prod.mask;
        let mut retries = 0u64;

        let (head, next, n) = loop {
            let head = self.prod.head.load(Ordering::Relaxed);
            let cons_tail = self.cons.tail.load(Ordering::Acquire);
            let free = mask.wrapping_add(cons_tail).wrapping_sub(head) as usize;

            let n = claim(handles.len(), free, behavior);
            if n == 0 {
                if retries != 0 && self.config.enable_metrics {
                    self.metrics.add_reserve_retries(retries);
                }
                return 0;
            }
            debug_assert_claim_bounded!(n, free);

            let next = head.wrapping_add(n as u32);
            debug_assert_occupancy_bounded!(next.wrapping_sub(cons_tail), mask);
            match self.prod.head.compare_exchange_weak(
                head,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break (head, next, n),
                Err(_) => retries += 1,
            }
        };

        // SAFETY: the reservation CAS claimed [head, next) exclusively; no
        // consumer reads the range until prod.tail covers it.
        unsafe { self.copy_in(head, &handles[..n]) };

        let spins = self.handoff(&self.prod.tail, head);
        debug_assert_handoff_position!(self.prod.tail.load(Ordering::Relaxed), head);
        self.prod.tail.store(next, Ordering::Release);

        if self.config.enable_metrics {
            self.metrics.add_pushed(n as u64);
            if retries != 0 {
                self.metrics.add_reserve_retries(retries);
            }
            if spins != 0 {
                self.metrics.add_handoff_spins(spins);
            }
        }
        n
    }

    // ---------------------------------------------------------------------
    // POP
    // ---------------------------------------------------------------------

    /// Pops up to `out.len()` handles into `out`.
    ///
    /// Returns the number actually dequeued, applying the same
    /// [`Behavior`] policy as [`push`](Ring::push). `out[..count]` holds the
    /// dequeued handles in FIFO order; the remainder of `out` is untouched.
    pub fn pop(&self, out: &mut [Handle], behavior: Behavior) -> usize {
        if out.is_empty() {
            return 0;
        }
        if self.cons.single {
            self.pop_single(out, behavior)
        } else {
            self.pop_multi(out, behavior)
        }
    }

    /// Pops one handle if any is committed.
    #[inline]
    pub fn pop_one(&self) -> Option<Handle> {
        let mut out = [0];
        if self.pop(&mut out, Behavior::Fixed) == 1 {
            Some(out[0])
        } else {
            None
        }
    }

    fn pop_single(&self, out: &mut [Handle], behavior: Behavior) -> usize {
        let head = self.cons.head.load(Ordering::Relaxed);
        let prod_tail = self.prod.tail.load(Ordering::Acquire);
        let avail = prod_tail.wrapping_sub(head) as usize;

        let n = claim(out.len(), avail, behavior);
        if n == 0 {
            return 0;
        }
        debug_assert_claim_bounded!(n, avail);

        let next = head.wrapping_add(n as u32);
        self.cons.head.store(next, Ordering::Relaxed);

        // SAFETY: [head, next) is committed (avail >= n) and this is the only
        // consumer; no producer rewrites the range until cons.tail covers it.
        unsafe { self.copy_out(head, &mut out[..n]) };

        self.cons.tail.store(next, Ordering::Release);

        if self.config.enable_metrics {
            self.metrics.add_popped(n as u64);
        }
        n
    }

    fn pop_multi(&self, out: &mut [Handle], behavior: Behavior) -> usize {
        let mut retries = 0u64;

        let (head, next, n) = loop {
            let head = self.cons.head.load(Ordering::Relaxed);
            let prod_tail = self.prod.tail.load(Ordering::Acquire);
            let avail = prod_tail.wrapping_sub(head) as usize;

            let n = claim(out.len(), avail, behavior);
            if n == 0 {
                if retries != 0 && self.config.enable_metrics {
                    self.metrics.add_reserve_retries(retries);
                }
                return 0;
            }
            debug_assert_claim_bounded!(n, avail);

            let next = head.wrapping_add(n as u32);
            match self.cons.head.compare_exchange_weak(
                head,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break (head, next, n),
                Err(_) => retries += 1,
            }
        };

        // SAFETY: the reservation CAS claimed [head, next) exclusively; no
        // producer rewrites the range until cons.tail covers it.
        unsafe { self.copy_out(head, &mut out[..n]) };

        let spins = self.handoff(&self.cons.tail, head);
        debug_assert_handoff_position!(self.cons.tail.load(Ordering::Relaxed), head);
        self.cons.tail.store(next, Ordering::Release);

        if self.config.enable_metrics {
            self.metrics.add_popped(n as u64);
            if retries != 0 {
                self.metrics.add_reserve_retries(retries);
            }
            if spins != 0 {
                self.metrics.add_handoff_spins(spins);
            }
        }
        n
    }

    // ---------------------------------------------------------------------
    // HANDOFF & BATCHED COPY
    // ---------------------------------------------------------------------

    /// Stalls until `tail` reaches this batch's reservation snapshot.
    ///
    /// Batches that reserved earlier publish first, so `tail` advances
    /// contiguously through claimed ranges in reservation order. The Acquire
    /// load orders their slot writes before this batch's release store.
    /// Returns the number of spin iterations, for metrics.
    fn handoff(&self, tail: &AtomicU32, snapshot: u32) -> u64 {
        let mut backoff = Backoff::new(self.config.pause_rep);
        let mut spins = 0u64;
        while tail.load(Ordering::Acquire) != snapshot {
            backoff.pause();
            spins += 1;
        }
        spins
    }

    /// Copies `src` into the slots claimed at cursor `from`, splitting at the
    /// array boundary when the range wraps.
    ///
    /// # Safety
    ///
    /// The caller must hold an unpublished reservation covering
    /// `[from, from + src.len())`.
    unsafe fn copy_in(&self, from: u32, src: &[Handle]) {
        let size = self.prod.size as usize;
        let idx = (from & self.prod.mask) as usize;
        let n = src.len();
        // UnsafeCell<Handle> has the same layout as Handle.
        let base = self.slots.as_ptr() as *mut Handle;

        if idx + n <= size {
            ptr::copy_nonoverlapping(src.as_ptr(), base.add(idx), n);
        } else {
            let first = size - idx;
            ptr::copy_nonoverlapping(src.as_ptr(), base.add(idx), first);
            ptr::copy_nonoverlapping(src.as_ptr().add(first), base, n - first);
        }
    }

    /// Copies the slots claimed at cursor `from` into `out`; wrap handling as
    /// in [`copy_in`](Ring::copy_in).
    ///
    /// # Safety
    ///
    /// The caller must hold an unpublished reservation covering
    /// `[from, from + out.len())`.
    unsafe fn copy_out(&self, from: u32, out: &mut [Handle]) {
        let size = self.cons.size as usize;
        let idx = (from & self.cons.mask) as usize;
        let n = out.len();
        let base = self.slots.as_ptr() as *const Handle;

        if idx + n <= size {
            ptr::copy_nonoverlapping(base.add(idx), out.as_mut_ptr(), n);
        } else {
            let first = size - idx;
            ptr::copy_nonoverlapping(base.add(idx), out.as_mut_ptr(), first);
            ptr::copy_nonoverlapping(base, out.as_mut_ptr().add(first), n - first);
        }
    }

    /// Forces all four cursors to `value`, for wrap-around tests.
    #[cfg(test)]
    fn force_cursors(&self, value: u32) {
        self.prod.head.store(value, Ordering::Relaxed);
        self.prod.tail.store(value, Ordering::Relaxed);
        self.cons.head.store(value, Ordering::Relaxed);
        self.cons.tail.store(value, Ordering::Relaxed);
    }
}

/// Short-count policy shared by all four protocol paths: the whole batch when
/// it fits, otherwise 0 under FIXED and whatever is available under VARIABLE.
#[inline]
fn claim(requested: usize, avail: usize, behavior: Behavior) -> usize {
    if requested <= avail {
        requested
    } else {
        match behavior {
            Behavior::Fixed => 0,
            Behavior::Variable => avail,
        }
    }
}

// ---------------------------------------------------------------------
// HELPER: 128-byte cache-aligned wrapper
// ---------------------------------------------------------------------

/// Wrapper type that ensures 128-byte alignment to prevent prefetcher-induced
/// false sharing on Intel/AMD CPUs (which may prefetch adjacent cache lines).
#[repr(align(128))]
struct CacheAligned<T> {
    value: T,
}

impl<T> CacheAligned<T> {
    const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T> std::ops::Deref for CacheAligned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}
