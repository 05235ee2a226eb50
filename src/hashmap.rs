//! Open-addressed hash map from `i32` keys to `i32` values.
//!
//! A flat bucket array with linear probing and a 0.75 growth threshold.
//! Removal uses backward-shift rehashing of the run that follows the
//! vacated slot, so probes never terminate early on a hole left by a
//! deleted entry.

use crate::array::{alloc_zeroed_array, dealloc_array};

/// Knuth's multiplicative constant; the key is reinterpreted as u32.
const HASH_MULTIPLIER: usize = 2654435761;

/// Non-zero capacities start here and double.
const INITIAL_CAPACITY: usize = 8;

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct MapEntry {
    pub key: i32,
    pub value: i32,
    pub occupied: i32,
}

/// Map handle. Layout matches the IR the compiler emits for `HashMap`.
#[repr(C)]
#[derive(Debug)]
pub struct RtHashMap {
    buckets: *mut MapEntry,
    capacity: usize,
    size: usize,
}

enum Probe {
    Found(usize),
    Vacant(usize),
    Full,
}

impl RtHashMap {
    const fn empty() -> Self {
        Self {
            buckets: std::ptr::null_mut(),
            capacity: 0,
            size: 0,
        }
    }

    fn with_capacity(capacity: usize) -> Option<Self> {
        if capacity == 0 {
            return Some(Self::empty());
        }
        let buckets = alloc_zeroed_array::<MapEntry>(capacity)?;
        Some(Self {
            buckets,
            capacity,
            size: 0,
        })
    }

    fn slot_of(key: i32, capacity: usize) -> usize {
        (key as u32 as usize).wrapping_mul(HASH_MULTIPLIER) % capacity
    }

    fn entry(&self, index: usize) -> *mut MapEntry {
        unsafe { self.buckets.add(index) }
    }

    /// Linear probe from the key's home slot. Stops at a matching key, at
    /// the first unoccupied slot, or after a full cycle.
    fn probe(&self, key: i32) -> Probe {
        if self.capacity == 0 {
            return Probe::Full;
        }
        let home = Self::slot_of(key, self.capacity);
        let mut index = home;
        loop {
            let entry = unsafe { &*self.entry(index) };
            if entry.occupied == 0 {
                return Probe::Vacant(index);
            }
            if entry.key == key {
                return Probe::Found(index);
            }
            index = (index + 1) % self.capacity;
            if index == home {
                return Probe::Full;
            }
        }
    }

    /// Double the bucket array (8 when empty) and reinsert every entry.
    fn grow(&mut self) -> bool {
        let new_capacity = if self.capacity == 0 {
            INITIAL_CAPACITY
        } else {
            self.capacity * 2
        };
        let Some(new_buckets) = alloc_zeroed_array::<MapEntry>(new_capacity) else {
            return false;
        };

        let old_buckets = self.buckets;
        let old_capacity = self.capacity;
        self.buckets = new_buckets;
        self.capacity = new_capacity;
        self.size = 0;

        for i in 0..old_capacity {
            let entry = unsafe { *old_buckets.add(i) };
            if entry.occupied != 0 {
                self.place(entry.key, entry.value);
            }
        }
        if !old_buckets.is_null() {
            unsafe { dealloc_array(old_buckets, old_capacity) };
        }
        true
    }

    /// Store an entry without checking the load factor. The caller
    /// guarantees at least one vacant slot.
    fn place(&mut self, key: i32, value: i32) {
        match self.probe(key) {
            Probe::Found(index) => unsafe {
                (*self.entry(index)).value = value;
            },
            Probe::Vacant(index) => {
                unsafe {
                    self.entry(index).write(MapEntry {
                        key,
                        value,
                        occupied: 1,
                    });
                }
                self.size += 1;
            }
            Probe::Full => {}
        }
    }

    fn insert(&mut self, key: i32, value: i32) -> bool {
        // Keep the load factor strictly below 0.75 before probing.
        if self.size * 4 >= self.capacity * 3 || self.capacity == 0 {
            if !self.grow() {
                return false;
            }
        }
        match self.probe(key) {
            Probe::Found(index) => {
                unsafe {
                    (*self.entry(index)).value = value;
                }
                true
            }
            Probe::Vacant(index) => {
                unsafe {
                    self.entry(index).write(MapEntry {
                        key,
                        value,
                        occupied: 1,
                    });
                }
                self.size += 1;
                true
            }
            Probe::Full => false,
        }
    }

    fn get(&self, key: i32) -> i32 {
        match self.probe(key) {
            Probe::Found(index) => unsafe { (*self.entry(index)).value },
            _ => 0,
        }
    }

    fn contains_key(&self, key: i32) -> bool {
        matches!(self.probe(key), Probe::Found(_))
    }

    /// Remove the key, then reinsert the contiguous occupied run that
    /// follows so later entries stay reachable by probing.
    fn remove(&mut self, key: i32) -> bool {
        let Probe::Found(index) = self.probe(key) else {
            return false;
        };
        unsafe {
            (*self.entry(index)).occupied = 0;
        }
        self.size -= 1;

        let mut next = (index + 1) % self.capacity;
        loop {
            let entry = unsafe { *self.entry(next) };
            if entry.occupied == 0 {
                break;
            }
            unsafe {
                (*self.entry(next)).occupied = 0;
            }
            self.size -= 1;
            self.place(entry.key, entry.value);
            next = (next + 1) % self.capacity;
        }
        true
    }

    fn clear(&mut self) {
        for i in 0..self.capacity {
            unsafe {
                (*self.entry(i)).occupied = 0;
            }
        }
        self.size = 0;
    }

    fn release(&mut self) {
        if !self.buckets.is_null() {
            unsafe { dealloc_array(self.buckets, self.capacity) };
            self.buckets = std::ptr::null_mut();
        }
        self.capacity = 0;
        self.size = 0;
    }
}

/// Create a new empty map.
#[unsafe(no_mangle)]
pub extern "C" fn hashmap_new() -> *mut RtHashMap {
    Box::into_raw(Box::new(RtHashMap::empty()))
}

/// Create a map with a pre-allocated bucket array.
#[unsafe(no_mangle)]
pub extern "C" fn hashmap_with_capacity(capacity: usize) -> *mut RtHashMap {
    match RtHashMap::with_capacity(capacity) {
        Some(map) => Box::into_raw(Box::new(map)),
        None => std::ptr::null_mut(),
    }
}

/// Insert or overwrite a key. Returns 1 on success, 0 on failure.
///
/// # Safety
///
/// `map` must be null or a live pointer from `hashmap_new`/
/// `hashmap_with_capacity`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hashmap_insert(map: *mut RtHashMap, key: i32, value: i32) -> i32 {
    if map.is_null() {
        return 0;
    }
    let map = unsafe { &mut *map };
    map.insert(key, value) as i32
}

/// Look up a key; missing keys read as 0 (use `hashmap_contains_key` to
/// tell missing from present-and-zero).
///
/// # Safety
///
/// `map` must be null or a live map pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hashmap_get(map: *mut RtHashMap, key: i32) -> i32 {
    if map.is_null() {
        return 0;
    }
    unsafe { &*map }.get(key)
}

/// # Safety
///
/// `map` must be null or a live map pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hashmap_contains_key(map: *mut RtHashMap, key: i32) -> i32 {
    if map.is_null() {
        return 0;
    }
    unsafe { &*map }.contains_key(key) as i32
}

/// Remove a key. Returns 1 when the key was present.
///
/// # Safety
///
/// `map` must be null or a live map pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hashmap_remove(map: *mut RtHashMap, key: i32) -> i32 {
    if map.is_null() {
        return 0;
    }
    let map = unsafe { &mut *map };
    map.remove(key) as i32
}

/// # Safety
///
/// `map` must be null or a live map pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hashmap_len(map: *mut RtHashMap) -> usize {
    if map.is_null() {
        return 0;
    }
    unsafe { &*map }.size
}

/// # Safety
///
/// `map` must be null or a live map pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hashmap_is_empty(map: *mut RtHashMap) -> i32 {
    if map.is_null() {
        return 1;
    }
    (unsafe { &*map }.size == 0) as i32
}

/// Clear all entries but keep the bucket array.
///
/// # Safety
///
/// `map` must be null or a live map pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hashmap_clear(map: *mut RtHashMap) {
    if !map.is_null() {
        unsafe { &mut *map }.clear();
    }
}

/// Release the map and its bucket array.
///
/// # Safety
///
/// `map` must be null or a live map pointer; it must not be used
/// afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hashmap_free(map: *mut RtHashMap) {
    if map.is_null() {
        return;
    }
    let mut map = unsafe { Box::from_raw(map) };
    map.release();
}

/// Self-check called by generated test programs. Returns 1 when the
/// insert/get/remove contract holds, including growth past 100 keys.
#[unsafe(no_mangle)]
pub extern "C" fn hashmap_runtime_test() -> i32 {
    unsafe {
        let map = hashmap_new();
        if map.is_null() {
            return 0;
        }

        if hashmap_insert(map, 42, 100) == 0 || hashmap_insert(map, 84, 200) == 0 {
            hashmap_free(map);
            return 0;
        }
        if hashmap_get(map, 42) != 100 || hashmap_get(map, 84) != 200 {
            hashmap_free(map);
            return 0;
        }
        if hashmap_len(map) != 2 {
            hashmap_free(map);
            return 0;
        }
        if hashmap_contains_key(map, 42) == 0 || hashmap_contains_key(map, 999) != 0 {
            hashmap_free(map);
            return 0;
        }
        if hashmap_remove(map, 42) == 0 || hashmap_len(map) != 1 {
            hashmap_free(map);
            return 0;
        }
        if hashmap_contains_key(map, 42) != 0 {
            hashmap_free(map);
            return 0;
        }

        for i in 0..100 {
            if hashmap_insert(map, i, i * 10) == 0 {
                hashmap_free(map);
                return 0;
            }
        }
        if hashmap_len(map) != 100 {
            hashmap_free(map);
            return 0;
        }
        for i in 0..100 {
            if hashmap_get(map, i) != i * 10 {
                hashmap_free(map);
                return 0;
            }
        }

        hashmap_free(map);
        1
    }
}
