//! The raw open-addressing table underneath
//! [`OpenAddressingMap`](crate::OpenAddressingMap).
//!
//! `HashTable<K, V>` never hashes anything itself: every operation takes the
//! precomputed 64-bit hash of the key together with an equality predicate, so
//! the caller decides how keys are hashed and compared.
//!
//! Entries live directly in one slot array whose length is a power of two.
//! Collisions are resolved with linear probing; removal leaves a tombstone so
//! entries further along the same probe chain stay reachable. Tombstones are
//! only purged when the table grows.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt::Debug;
use core::mem;

use log::debug;
use log::trace;

use crate::error::Fallibility;
use crate::error::TryReserveError;

/// Smallest number of slots an allocated table has.
pub const MIN_CAPACITY: usize = 4;

/// Number of slots requested by the default constructors.
pub const DEFAULT_CAPACITY: usize = MIN_CAPACITY;

/// Load factor used when none is given.
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.75;

/// Lower bound for the maximum load factor. Smaller values are clamped.
pub const MIN_MAX_LOAD_FACTOR: f64 = 0.20;

/// Upper bound for the maximum load factor. Larger values are clamped.
pub const MAX_MAX_LOAD_FACTOR: f64 = 0.75;

/// Number of slots in the table. Always zero or a power of two no smaller
/// than [`MIN_CAPACITY`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Capacity {
    slots: usize,
}

impl Capacity {
    /// Rounds a requested size up to a valid slot count. Returns `None` when
    /// the next power of two does not fit in `usize`.
    #[inline]
    fn normalize(requested: usize) -> Option<Self> {
        let slots = requested.max(MIN_CAPACITY).checked_next_power_of_two()?;
        Some(Capacity { slots })
    }

    #[inline]
    fn doubled(self) -> Option<Self> {
        if self.slots == 0 {
            return Some(Capacity {
                slots: MIN_CAPACITY,
            });
        }
        let slots = self.slots.checked_mul(2)?;
        Some(Capacity { slots })
    }
}

/// A maximum load factor, clamped to
/// `[MIN_MAX_LOAD_FACTOR, MAX_MAX_LOAD_FACTOR]`.
#[derive(Clone, Copy, Debug, PartialEq)]
struct LoadFactor(f64);

impl From<f64> for LoadFactor {
    #[inline]
    fn from(value: f64) -> Self {
        if value.is_nan() {
            return LoadFactor(DEFAULT_MAX_LOAD_FACTOR);
        }
        LoadFactor(value.clamp(MIN_MAX_LOAD_FACTOR, MAX_MAX_LOAD_FACTOR))
    }
}

impl LoadFactor {
    /// Number of live entries at which the table must grow before accepting
    /// another one.
    #[inline]
    fn threshold(self, slots: usize) -> usize {
        (self.0 * slots as f64) as usize
    }
}

/// State of a single storage index.
#[derive(Clone)]
enum Slot<K, V> {
    /// Never used since the last rehash. Terminates every probe.
    Empty,
    /// Holds a live entry.
    Occupied { hash: u64, key: K, value: V },
    /// Held an entry that was removed. The key is kept (when it was not
    /// handed back to the caller) so a later insert of the same key revives
    /// this slot instead of claiming a new one.
    Tombstone { hash: u64, key: Option<K> },
}

impl<K, V> Slot<K, V> {
    #[inline]
    fn is_occupied(&self) -> bool {
        matches!(self, Slot::Occupied { .. })
    }

    #[inline]
    fn live(&self) -> Option<(&K, &V)> {
        match self {
            Slot::Occupied { key, value, .. } => Some((key, value)),
            _ => None,
        }
    }

    #[inline]
    fn live_mut(&mut self) -> Option<(&K, &mut V)> {
        match self {
            Slot::Occupied { key, value, .. } => Some((key, value)),
            _ => None,
        }
    }
}

/// Outcome of walking a probe chain for a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Probe {
    /// A slot whose key matches, either live or tombstoned.
    Found(usize),
    /// The first empty slot of the chain; the key is absent.
    Vacant(usize),
    /// Every slot was visited without a match or an empty slot. Only possible
    /// when tombstones fill the remainder of the table, or when nothing is
    /// allocated.
    Exhausted,
}

fn allocate_slots<K, V>(
    capacity: Capacity,
    fallibility: Fallibility,
) -> Result<Box<[Slot<K, V>]>, TryReserveError> {
    let layout = match Layout::array::<Slot<K, V>>(capacity.slots) {
        Ok(layout) => layout,
        Err(_) => return Err(fallibility.capacity_overflow()),
    };

    let mut slots = Vec::new();
    if slots.try_reserve_exact(capacity.slots).is_err() {
        return Err(fallibility.alloc_err(layout));
    }
    slots.resize_with(capacity.slots, || Slot::Empty);

    Ok(slots.into_boxed_slice())
}

/// Index of the first empty slot on the probe chain of `hash`.
///
/// The caller must ensure at least one slot is empty, which holds for any
/// freshly grown table since `populated < capacity` and it has no tombstones.
#[inline]
fn find_empty<K, V>(slots: &[Slot<K, V>], hash: u64) -> usize {
    debug_assert!(slots.iter().any(|slot| matches!(slot, Slot::Empty)));

    let mask = slots.len() - 1;
    let mut index = hash as usize & mask;
    while !matches!(slots[index], Slot::Empty) {
        index = (index + 1) & mask;
    }
    index
}

/// Debug statistics for hash table analysis.
///
/// Available in tests and with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of live entries
    pub populated: usize,
    /// Total number of slots allocated
    pub capacity: usize,
    /// Live entry count that triggers growth
    pub threshold: usize,
    /// Number of tombstoned slots
    pub tombstones: usize,
    /// Number of never-used slots
    pub empty_slots: usize,
    /// Load factor (populated / capacity)
    pub load_factor: f64,
    /// Configured maximum load factor
    pub max_load_factor: f64,
    /// Distance of the farthest live entry from its home slot
    pub longest_probe: usize,
    /// Total memory in bytes used by the slot array
    pub total_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor, max {:.2}%)",
            self.populated,
            self.capacity,
            self.load_factor * 100.0,
            self.max_load_factor * 100.0
        );
        println!("Growth threshold: {}", self.threshold);
        println!(
            "Slots: {} empty, {} tombstones",
            self.empty_slots, self.tombstones
        );
        println!("Longest probe: {}", self.longest_probe);
        println!("Total Allocated: {} bytes", self.total_bytes);
    }
}

/// Counts of live entries by their distance from their home slot.
///
/// `bins[d]` is the number of entries stored `d` slots past the slot their
/// hash maps to.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHistogram {
    /// Entry counts indexed by probe distance
    pub bins: Vec<usize>,
}

#[cfg(any(test, feature = "stats"))]
impl ProbeHistogram {
    /// Pretty-prints the histogram horizontally using stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = self.bins.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        println!(
            "probe histogram ({} entries):",
            self.bins.iter().sum::<usize>()
        );
        for (distance, &count) in self.bins.iter().enumerate() {
            let width = (count * max_bar).div_ceil(max);
            println!("{:>3} | {} ({})", distance, "█".repeat(width), count);
        }
    }
}

/// An open-addressing hash table with linear probing.
///
/// `HashTable<K, V>` stores key-value pairs. Like other raw tables, it
/// requires you to provide both the hash value and an equality predicate on
/// the key for each operation. The same key must always be given the same
/// hash while it is stored.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use probe_map::hash_table::Entry;
/// # use probe_map::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # fn hash_str(s: &str) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     s.hash(&mut hasher);
/// #     hasher.finish()
/// # }
/// #
/// let mut table = HashTable::with_capacity(16, 0.75);
/// let hash = hash_str("alice");
///
/// match table.entry(hash, |k: &String| k == "alice") {
///     Entry::Vacant(entry) => {
///         entry.insert("alice".to_string(), 30);
///     }
///     Entry::Occupied(_) => unreachable!(),
/// }
///
/// assert_eq!(table.find(hash, |k| k == "alice"), Some((&"alice".to_string(), &30)));
/// assert_eq!(table.remove(hash, |k| k == "alice"), Some(30));
/// assert!(!table.contains(hash, |k| k == "alice"));
/// ```
#[derive(Clone)]
pub struct HashTable<K, V> {
    slots: Box<[Slot<K, V>]>,

    populated: usize,
    tombstones: usize,
    max_pop: usize,
    load_factor: LoadFactor,
}

impl<K, V> Debug for HashTable<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::string::String;

        let popmap: String = self
            .slots
            .iter()
            .map(|slot| match slot {
                Slot::Empty => '.',
                Slot::Occupied { .. } => '#',
                Slot::Tombstone { .. } => 'x',
            })
            .collect();

        f.debug_struct("HashTable")
            .field("popmap", &popmap)
            .field("populated", &self.populated)
            .field("tombstones", &self.tombstones)
            .field("capacity", &self.slots.len())
            .field("threshold", &self.max_pop)
            .finish()
    }
}

impl<K, V> HashTable<K, V> {
    /// Creates a new table with room for at least `capacity` slots and the
    /// given maximum load factor.
    ///
    /// The slot count is rounded up to a power of two, and to no less than
    /// [`MIN_CAPACITY`]. The load factor is clamped into
    /// `[MIN_MAX_LOAD_FACTOR, MAX_MAX_LOAD_FACTOR]`; a NaN load factor is
    /// replaced by [`DEFAULT_MAX_LOAD_FACTOR`].
    ///
    /// # Panics
    ///
    /// Panics if the rounded capacity overflows `usize`. Allocation failure
    /// aborts through [`handle_alloc_error`](alloc::alloc::handle_alloc_error).
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_map::hash_table::HashTable;
    /// #
    /// let table: HashTable<u64, String> = HashTable::with_capacity(5, 0.9);
    /// assert_eq!(table.capacity(), 8);
    /// assert_eq!(table.max_load_factor(), 0.75);
    /// assert_eq!(table.growth_threshold(), 6);
    /// ```
    pub fn with_capacity(capacity: usize, max_load_factor: f64) -> Self {
        match Self::fallible_with_capacity(capacity, max_load_factor, Fallibility::Infallible) {
            Ok(table) => table,
            Err(_) => unreachable!("infallible allocation returned an error"),
        }
    }

    /// Fallible version of [`with_capacity`](Self::with_capacity).
    pub fn try_with_capacity(
        capacity: usize,
        max_load_factor: f64,
    ) -> Result<Self, TryReserveError> {
        Self::fallible_with_capacity(capacity, max_load_factor, Fallibility::Fallible)
    }

    fn fallible_with_capacity(
        capacity: usize,
        max_load_factor: f64,
        fallibility: Fallibility,
    ) -> Result<Self, TryReserveError> {
        let capacity = match Capacity::normalize(capacity) {
            Some(capacity) => capacity,
            None => return Err(fallibility.capacity_overflow()),
        };
        let load_factor = LoadFactor::from(max_load_factor);

        Ok(Self {
            slots: allocate_slots(capacity, fallibility)?,
            populated: 0,
            tombstones: 0,
            max_pop: load_factor.threshold(capacity.slots),
            load_factor,
        })
    }

    /// Returns `true` if the table contains no live entries.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of live entries in the table.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns the number of slots in the table.
    ///
    /// This is a power of two no smaller than [`MIN_CAPACITY`], or zero after
    /// [`clear`](Self::clear).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the live entry count at which the table grows before accepting
    /// another entry: `floor(max_load_factor * capacity)`.
    pub fn growth_threshold(&self) -> usize {
        self.max_pop
    }

    /// Returns `len / capacity`, or `0.0` when nothing is allocated.
    pub fn current_load_factor(&self) -> f64 {
        if self.slots.is_empty() {
            0.0
        } else {
            self.populated as f64 / self.slots.len() as f64
        }
    }

    /// Returns the (clamped) maximum load factor.
    pub fn max_load_factor(&self) -> f64 {
        self.load_factor.0
    }

    /// Sets the maximum load factor, clamping it into
    /// `[MIN_MAX_LOAD_FACTOR, MAX_MAX_LOAD_FACTOR]`.
    ///
    /// If the table holds as many entries as the new threshold allows, it
    /// grows by exactly one doubling. A single step may leave the entry count
    /// at or above the new threshold; the next insertion grows further before
    /// it lands.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_map::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64, ()> = HashTable::with_capacity(4, 0.75);
    /// table.set_max_load_factor(0.05);
    /// assert_eq!(table.max_load_factor(), 0.20);
    /// table.set_max_load_factor(0.9);
    /// assert_eq!(table.max_load_factor(), 0.75);
    /// ```
    pub fn set_max_load_factor(&mut self, max_load_factor: f64) {
        if self
            .fallible_set_max_load_factor(max_load_factor, Fallibility::Infallible)
            .is_err()
        {
            unreachable!("infallible allocation returned an error");
        }
    }

    /// Fallible version of [`set_max_load_factor`](Self::set_max_load_factor).
    ///
    /// If the growth it requires fails, the previous load factor and
    /// threshold are restored and the table is unchanged.
    pub fn try_set_max_load_factor(&mut self, max_load_factor: f64) -> Result<(), TryReserveError> {
        self.fallible_set_max_load_factor(max_load_factor, Fallibility::Fallible)
    }

    fn fallible_set_max_load_factor(
        &mut self,
        max_load_factor: f64,
        fallibility: Fallibility,
    ) -> Result<(), TryReserveError> {
        let previous = (self.load_factor, self.max_pop);
        self.load_factor = LoadFactor::from(max_load_factor);
        self.max_pop = self.load_factor.threshold(self.slots.len());

        if self.slots.is_empty() || self.populated < self.max_pop {
            return Ok(());
        }

        debug!(
            "max load factor {} puts {} entries over threshold {}, growing",
            self.load_factor.0, self.populated, self.max_pop
        );
        if let Err(err) = self.grow(fallibility) {
            (self.load_factor, self.max_pop) = previous;
            return Err(err);
        }

        Ok(())
    }

    /// Removes all entries and releases the slot array.
    ///
    /// The table is left with zero capacity. The maximum load factor is kept,
    /// and the next insertion allocates [`MIN_CAPACITY`] slots.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_map::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(64, 0.5);
    /// table.entry(7, |&k: &u64| k == 7).or_insert(7, "seven");
    /// table.clear();
    ///
    /// assert!(table.is_empty());
    /// assert_eq!(table.capacity(), 0);
    /// assert_eq!(table.max_load_factor(), 0.5);
    /// ```
    pub fn clear(&mut self) {
        self.slots = Box::default();
        self.populated = 0;
        self.tombstones = 0;
        self.max_pop = 0;
    }

    /// Walks the probe chain of `hash` until a slot whose key satisfies `eq`
    /// (live or tombstoned) or an empty slot.
    ///
    /// Tombstones with other keys do not stop the walk, which is what keeps
    /// entries placed behind a removed one reachable.
    #[inline]
    fn seek(&self, hash: u64, eq: impl Fn(&K) -> bool) -> Probe {
        if self.slots.is_empty() {
            return Probe::Exhausted;
        }

        let mask = self.slots.len() - 1;
        let mut index = hash as usize & mask;
        for _ in 0..self.slots.len() {
            match &self.slots[index] {
                Slot::Empty => return Probe::Vacant(index),
                Slot::Occupied { hash: h, key, .. }
                | Slot::Tombstone {
                    hash: h,
                    key: Some(key),
                } if *h == hash && eq(key) => return Probe::Found(index),
                _ => {}
            }
            index = (index + 1) & mask;
        }

        Probe::Exhausted
    }

    /// Returns the entry whose key satisfies `eq`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_map::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(4, 0.75);
    /// table.entry(1, |&k: &u32| k == 1).or_insert(1, 'a');
    ///
    /// assert_eq!(table.find(1, |&k| k == 1), Some((&1, &'a')));
    /// assert_eq!(table.find(2, |&k| k == 2), None);
    /// ```
    pub fn find(&self, hash: u64, eq: impl Fn(&K) -> bool) -> Option<(&K, &V)> {
        match self.seek(hash, eq) {
            Probe::Found(index) => self.slots[index].live(),
            Probe::Vacant(_) | Probe::Exhausted => None,
        }
    }

    /// Returns the entry whose key satisfies `eq`, with the value borrowed
    /// mutably.
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&K) -> bool) -> Option<(&K, &mut V)> {
        match self.seek(hash, eq) {
            Probe::Found(index) => self.slots[index].live_mut(),
            Probe::Vacant(_) | Probe::Exhausted => None,
        }
    }

    /// Returns `true` if a live entry's key satisfies `eq`. A tombstoned key
    /// is not contained.
    pub fn contains(&self, hash: u64, eq: impl Fn(&K) -> bool) -> bool {
        self.find(hash, eq).is_some()
    }

    /// Removes the entry whose key satisfies `eq` and returns its value.
    ///
    /// The slot becomes a tombstone that still remembers the key. Removing an
    /// absent or already removed key does nothing.
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&K) -> bool) -> Option<V> {
        match self.seek(hash, eq) {
            Probe::Found(index) => self.remove_at(index, true).map(|(_, value)| value),
            Probe::Vacant(_) | Probe::Exhausted => None,
        }
    }

    /// Removes the entry whose key satisfies `eq` and returns both key and
    /// value.
    ///
    /// The tombstone left behind forgets the key, so it only keeps the probe
    /// chain intact.
    pub fn remove_entry(&mut self, hash: u64, eq: impl Fn(&K) -> bool) -> Option<(K, V)> {
        match self.seek(hash, eq) {
            Probe::Found(index) => self
                .remove_at(index, false)
                .and_then(|(key, value)| key.map(|key| (key, value))),
            Probe::Vacant(_) | Probe::Exhausted => None,
        }
    }

    /// Turns the live slot at `index` into a tombstone. The key is returned
    /// unless `keep_key` is set, in which case the tombstone keeps it.
    fn remove_at(&mut self, index: usize, keep_key: bool) -> Option<(Option<K>, V)> {
        let slot = &mut self.slots[index];
        match mem::replace(slot, Slot::Empty) {
            Slot::Occupied { hash, key, value } => {
                let (kept, returned) = if keep_key {
                    (Some(key), None)
                } else {
                    (None, Some(key))
                };
                *slot = Slot::Tombstone { hash, key: kept };
                self.populated -= 1;
                self.tombstones += 1;
                Some((returned, value))
            }
            other => {
                *slot = other;
                None
            }
        }
    }

    /// Gets the entry for the given hash and equality predicate.
    ///
    /// If the key is not live, the returned [`VacantEntry`] already points at
    /// the slot the key will occupy: when one more entry would reach the
    /// growth threshold, the table grows (and rehashes) before this method
    /// returns. A tombstone left by removing the same key is revived in place
    /// when no growth is needed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_map::hash_table::Entry;
    /// # use probe_map::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(4, 0.75);
    ///
    /// match table.entry(10, |&k: &u64| k == 10) {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert(10, 1);
    ///     }
    ///     Entry::Occupied(_) => unreachable!(),
    /// }
    ///
    /// match table.entry(10, |&k: &u64| k == 10) {
    ///     Entry::Occupied(mut entry) => *entry.get_mut() += 1,
    ///     Entry::Vacant(_) => unreachable!(),
    /// }
    ///
    /// assert_eq!(table.find(10, |&k| k == 10), Some((&10, &2)));
    /// ```
    pub fn entry(&mut self, hash: u64, eq: impl Fn(&K) -> bool) -> Entry<'_, K, V> {
        match self.entry_impl(hash, eq, Fallibility::Infallible) {
            Ok(entry) => entry,
            Err(_) => unreachable!("infallible allocation returned an error"),
        }
    }

    /// Fallible version of [`entry`](Self::entry). Fails if the table must
    /// grow and the new slot array cannot be allocated; the table is then
    /// left unchanged.
    pub fn try_entry(
        &mut self,
        hash: u64,
        eq: impl Fn(&K) -> bool,
    ) -> Result<Entry<'_, K, V>, TryReserveError> {
        self.entry_impl(hash, eq, Fallibility::Fallible)
    }

    fn entry_impl(
        &mut self,
        hash: u64,
        eq: impl Fn(&K) -> bool,
        fallibility: Fallibility,
    ) -> Result<Entry<'_, K, V>, TryReserveError> {
        let probe = self.seek(hash, eq);
        let index = match probe {
            Probe::Found(index) if self.slots[index].is_occupied() => {
                return Ok(Entry::Occupied(OccupiedEntry { table: self, index }));
            }
            Probe::Found(index) | Probe::Vacant(index) if self.populated + 1 < self.max_pop => {
                index
            }
            _ => {
                self.reserve_one(probe == Probe::Exhausted, fallibility)?;
                find_empty(&self.slots, hash)
            }
        };

        Ok(Entry::Vacant(VacantEntry {
            table: self,
            index,
            hash,
        }))
    }

    /// Grows until one more entry stays below the threshold. `exhausted`
    /// forces at least one growth step to purge tombstones.
    fn reserve_one(&mut self, exhausted: bool, fallibility: Fallibility) -> Result<(), TryReserveError> {
        if exhausted && !self.slots.is_empty() {
            debug!(
                "probe exhausted with {} live entries and {} tombstones in {} slots",
                self.populated,
                self.tombstones,
                self.slots.len()
            );
        }

        let mut force = exhausted;
        while force || self.populated + 1 >= self.max_pop {
            self.grow(fallibility)?;
            force = false;
        }

        Ok(())
    }

    /// Doubles the slot array and re-places every live entry. Tombstones are
    /// dropped. The new array is allocated before anything moves, so a failed
    /// allocation leaves the table as it was.
    #[cold]
    fn grow(&mut self, fallibility: Fallibility) -> Result<(), TryReserveError> {
        let old_capacity = Capacity {
            slots: self.slots.len(),
        };
        let capacity = match old_capacity.doubled() {
            Some(capacity) => capacity,
            None => return Err(fallibility.capacity_overflow()),
        };
        let mut slots = allocate_slots(capacity, fallibility)?;

        let old_slots = mem::replace(&mut self.slots, Box::default());
        for slot in old_slots.into_vec() {
            if let Slot::Occupied { hash, key, value } = slot {
                let index = find_empty(&slots, hash);
                slots[index] = Slot::Occupied { hash, key, value };
            }
        }

        trace!(
            "grew table from {} to {} slots: moved {} entries, purged {} tombstones",
            old_capacity.slots, capacity.slots, self.populated, self.tombstones
        );

        self.slots = slots;
        self.tombstones = 0;
        self.max_pop = self.load_factor.threshold(capacity.slots);

        Ok(())
    }

    /// Returns `true` if `f` holds for every live entry. Slots are visited in
    /// storage order and the walk stops at the first failure.
    pub(crate) fn all_live(&self, mut f: impl FnMut(&K, &V) -> bool) -> bool {
        self.slots
            .iter()
            .filter_map(Slot::live)
            .all(|(key, value)| f(key, value))
    }

    /// Computes a histogram of probe distances for the current table state.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> ProbeHistogram {
        let mut bins = Vec::new();
        let mask = self.slots.len().wrapping_sub(1);

        for (index, slot) in self.slots.iter().enumerate() {
            if let Slot::Occupied { hash, .. } = slot {
                let distance = index.wrapping_sub(*hash as usize) & mask;
                if bins.len() <= distance {
                    bins.resize(distance + 1, 0);
                }
                bins[distance] += 1;
            }
        }

        ProbeHistogram { bins }
    }

    /// Returns detailed utilization statistics for debugging.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let empty_slots = self
            .slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Empty))
            .count();

        DebugStats {
            populated: self.populated,
            capacity: self.slots.len(),
            threshold: self.max_pop,
            tombstones: self.tombstones,
            empty_slots,
            load_factor: self.current_load_factor(),
            max_load_factor: self.load_factor.0,
            longest_probe: self.probe_histogram().bins.len().saturating_sub(1),
            total_bytes: mem::size_of_val(&*self.slots),
        }
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, K, V> {
    /// A vacant entry.
    Vacant(VacantEntry<'a, K, V>),
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, K, V>),
}

impl<'a, K, V> Entry<'a, K, V> {
    /// Inserts `key` and `default` if the entry is vacant, and returns a
    /// mutable reference to the value.
    ///
    /// The key is dropped if the entry is occupied.
    pub fn or_insert(self, key: K, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(key, default),
        }
    }
}

/// A view into a vacant entry in a [`HashTable`].
pub struct VacantEntry<'a, K, V> {
    table: &'a mut HashTable<K, V>,
    index: usize,
    hash: u64,
}

impl<'a, K, V> VacantEntry<'a, K, V> {
    /// Inserts the key and value into the table and returns a mutable
    /// reference to the value.
    ///
    /// The key must satisfy the predicate the entry was looked up with and
    /// hash to the same value.
    pub fn insert(self, key: K, value: V) -> &'a mut V {
        let table = self.table;
        let slot = &mut table.slots[self.index];
        if matches!(slot, Slot::Tombstone { .. }) {
            table.tombstones -= 1;
        }
        *slot = Slot::Occupied {
            hash: self.hash,
            key,
            value,
        };
        table.populated += 1;

        match slot {
            Slot::Occupied { value, .. } => value,
            _ => unreachable!("slot was just filled"),
        }
    }
}

/// A view into an occupied entry in a [`HashTable`].
pub struct OccupiedEntry<'a, K, V> {
    table: &'a mut HashTable<K, V>,
    index: usize,
}

impl<'a, K, V> OccupiedEntry<'a, K, V> {
    fn slot(&self) -> (&K, &V) {
        match self.table.slots[self.index].live() {
            Some(entry) => entry,
            None => unreachable!("occupied entry points at a live slot"),
        }
    }

    /// Gets a reference to the key in the entry.
    pub fn key(&self) -> &K {
        self.slot().0
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        self.slot().1
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        match self.table.slots[self.index].live_mut() {
            Some((_, value)) => value,
            None => unreachable!("occupied entry points at a live slot"),
        }
    }

    /// Converts the entry into a mutable reference to the value.
    pub fn into_mut(self) -> &'a mut V {
        let table = self.table;
        match table.slots[self.index].live_mut() {
            Some((_, value)) => value,
            None => unreachable!("occupied entry points at a live slot"),
        }
    }

    /// Removes the entry, leaving a tombstone that remembers the key, and
    /// returns the value.
    pub fn remove(self) -> V {
        match self.table.remove_at(self.index, true) {
            Some((_, value)) => value,
            None => unreachable!("occupied entry points at a live slot"),
        }
    }

    /// Removes the entry and returns the key and value.
    pub fn remove_entry(self) -> (K, V) {
        match self.table.remove_at(self.index, false) {
            Some((Some(key), value)) => (key, value),
            _ => unreachable!("occupied entry points at a live slot"),
        }
    }
}
