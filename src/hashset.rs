//! Separately chained hash set of `i32` keys.
//!
//! Buckets are singly linked chains owned by the table; a resize relinks
//! the existing nodes instead of reallocating them. Both the `hashset_*`
//! and `HashSet_*` symbol spellings are exported because the code
//! generator emits the capitalized form for method-call syntax.

#![allow(non_snake_case)]

/// Buckets allocated for a fresh set.
const INITIAL_CAPACITY: usize = 16;

#[derive(Debug)]
struct Node {
    key: i32,
    next: Option<Box<Node>>,
}

/// Set handle, opaque to compiled code.
#[derive(Debug)]
pub struct RtHashSet {
    buckets: Vec<Option<Box<Node>>>,
    count: usize,
}

impl RtHashSet {
    fn new() -> Self {
        let mut buckets = Vec::with_capacity(INITIAL_CAPACITY);
        buckets.resize_with(INITIAL_CAPACITY, || None);
        Self { buckets, count: 0 }
    }

    fn bucket_index(key: i32, capacity: usize) -> usize {
        key.unsigned_abs() as usize % capacity
    }

    fn insert(&mut self, key: i32) -> bool {
        let index = Self::bucket_index(key, self.buckets.len());
        let mut node = self.buckets[index].as_deref();
        while let Some(n) = node {
            if n.key == key {
                return false;
            }
            node = n.next.as_deref();
        }

        let new_node = Box::new(Node {
            key,
            next: self.buckets[index].take(),
        });
        self.buckets[index] = Some(new_node);
        self.count += 1;

        // Double once the chain density reaches 0.75 nodes per bucket.
        if self.count * 4 >= self.buckets.len() * 3 {
            self.resize();
        }
        true
    }

    fn contains(&self, key: i32) -> bool {
        let index = Self::bucket_index(key, self.buckets.len());
        let mut node = self.buckets[index].as_deref();
        while let Some(n) = node {
            if n.key == key {
                return true;
            }
            node = n.next.as_deref();
        }
        false
    }

    fn remove(&mut self, key: i32) -> bool {
        let index = Self::bucket_index(key, self.buckets.len());
        let mut cur = &mut self.buckets[index];
        while cur.as_ref().is_some_and(|node| node.key != key) {
            cur = &mut cur.as_mut().unwrap().next;
        }
        match cur.take() {
            Some(node) => {
                *cur = node.next;
                self.count -= 1;
                true
            }
            None => false,
        }
    }

    /// Double the bucket array and relink every node.
    fn resize(&mut self) {
        let new_capacity = self.buckets.len() * 2;
        let mut new_buckets: Vec<Option<Box<Node>>> = Vec::with_capacity(new_capacity);
        new_buckets.resize_with(new_capacity, || None);

        for slot in self.buckets.iter_mut() {
            let mut chain = slot.take();
            while let Some(mut node) = chain {
                chain = node.next.take();
                let index = Self::bucket_index(node.key, new_capacity);
                node.next = new_buckets[index].take();
                new_buckets[index] = Some(node);
            }
        }
        self.buckets = new_buckets;
    }

    /// Drop every node but keep the bucket array and capacity.
    fn clear(&mut self) {
        for slot in self.buckets.iter_mut() {
            // Pop nodes iteratively so long chains cannot overflow the
            // stack through recursive drops.
            let mut chain = slot.take();
            while let Some(mut node) = chain {
                chain = node.next.take();
            }
        }
        self.count = 0;
    }

    fn capacity(&self) -> usize {
        self.buckets.len()
    }
}

impl Drop for RtHashSet {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Create a new empty set with 16 buckets.
#[unsafe(no_mangle)]
pub extern "C" fn hashset_new() -> *mut RtHashSet {
    Box::into_raw(Box::new(RtHashSet::new()))
}

/// Insert a key. Returns true when the key was not already present.
///
/// # Safety
///
/// `set` must be null or a live pointer from `hashset_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hashset_insert(set: *mut RtHashSet, key: i32) -> bool {
    if set.is_null() {
        return false;
    }
    let set = unsafe { &mut *set };
    set.insert(key)
}

/// # Safety
///
/// `set` must be null or a live set pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hashset_contains(set: *mut RtHashSet, key: i32) -> bool {
    if set.is_null() {
        return false;
    }
    unsafe { &*set }.contains(key)
}

/// Remove a key. Returns true when the key was present.
///
/// # Safety
///
/// `set` must be null or a live set pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hashset_remove(set: *mut RtHashSet, key: i32) -> bool {
    if set.is_null() {
        return false;
    }
    let set = unsafe { &mut *set };
    set.remove(key)
}

/// # Safety
///
/// `set` must be null or a live set pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hashset_len(set: *mut RtHashSet) -> i32 {
    if set.is_null() {
        return 0;
    }
    unsafe { &*set }.count as i32
}

/// # Safety
///
/// `set` must be null or a live set pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hashset_is_empty(set: *mut RtHashSet) -> bool {
    if set.is_null() {
        return true;
    }
    unsafe { &*set }.count == 0
}

/// Drop every key but keep the bucket array.
///
/// # Safety
///
/// `set` must be null or a live set pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hashset_clear(set: *mut RtHashSet) {
    if !set.is_null() {
        unsafe { &mut *set }.clear();
    }
}

/// Release the set and every node it owns.
///
/// # Safety
///
/// `set` must be null or a live set pointer; it must not be used
/// afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hashset_free(set: *mut RtHashSet) {
    if set.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(set) });
}

/// Print a summary of the set to stdout. With the `debug_runtime`
/// feature the per-bucket chains are printed as well.
///
/// # Safety
///
/// `set` must be null or a live set pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hashset_debug_print(set: *mut RtHashSet) {
    if set.is_null() {
        println!("HashSet: NULL");
        return;
    }
    let set = unsafe { &*set };
    println!("HashSet: capacity={}, count={}", set.capacity(), set.count);
    #[cfg(feature = "debug_runtime")]
    for (i, slot) in set.buckets.iter().enumerate() {
        if slot.is_some() {
            print!("  bucket[{i}]:");
            let mut node = slot.as_deref();
            while let Some(n) = node {
                print!(" {}", n.key);
                node = n.next.as_deref();
            }
            println!();
        }
    }
}

// Capitalized aliases for the method-call form emitted by the compiler.

/// See `hashset_new`.
#[unsafe(no_mangle)]
pub extern "C" fn HashSet_new() -> *mut RtHashSet {
    hashset_new()
}

/// # Safety
///
/// See `hashset_insert`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn HashSet_insert(set: *mut RtHashSet, key: i32) -> bool {
    unsafe { hashset_insert(set, key) }
}

/// # Safety
///
/// See `hashset_contains`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn HashSet_contains(set: *mut RtHashSet, key: i32) -> bool {
    unsafe { hashset_contains(set, key) }
}

/// # Safety
///
/// See `hashset_remove`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn HashSet_remove(set: *mut RtHashSet, key: i32) -> bool {
    unsafe { hashset_remove(set, key) }
}

/// # Safety
///
/// See `hashset_len`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn HashSet_len(set: *mut RtHashSet) -> i32 {
    unsafe { hashset_len(set) }
}

/// # Safety
///
/// See `hashset_is_empty`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn HashSet_is_empty(set: *mut RtHashSet) -> bool {
    unsafe { hashset_is_empty(set) }
}

/// # Safety
///
/// See `hashset_clear`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn HashSet_clear(set: *mut RtHashSet) {
    unsafe { hashset_clear(set) }
}

/// # Safety
///
/// See `hashset_free`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn HashSet_free(set: *mut RtHashSet) {
    unsafe { hashset_free(set) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_dedup() {
        unsafe {
            let set = hashset_new();
            assert!(hashset_insert(set, 5));
            assert!(!hashset_insert(set, 5));
            assert_eq!(hashset_len(set), 1);
            assert!(hashset_remove(set, 5));
            assert!(!hashset_contains(set, 5));
            assert!(!hashset_remove(set, 5));
            assert_eq!(hashset_len(set), 0);
            hashset_free(set);
        }
    }

    #[test]
    fn test_rehash_keeps_all_keys() {
        unsafe {
            let set = hashset_new();
            // Push well past the 0.75 * 16 threshold to force doubling.
            for i in 0..200 {
                assert!(hashset_insert(set, i));
            }
            assert_eq!(hashset_len(set), 200);
            assert!((*set).capacity() > INITIAL_CAPACITY);
            for i in 0..200 {
                assert!(hashset_contains(set, i));
            }
            assert!(!hashset_contains(set, 200));
            hashset_free(set);
        }
    }

    #[test]
    fn test_negative_keys_share_abs_bucket() {
        unsafe {
            let set = hashset_new();
            assert!(hashset_insert(set, 3));
            assert!(hashset_insert(set, -3));
            assert!(hashset_insert(set, i32::MIN));
            assert!(hashset_contains(set, 3));
            assert!(hashset_contains(set, -3));
            assert!(hashset_contains(set, i32::MIN));
            assert!(hashset_remove(set, -3));
            assert!(hashset_contains(set, 3));
            assert_eq!(hashset_len(set), 2);
            hashset_free(set);
        }
    }

    #[test]
    fn test_remove_middle_of_chain() {
        unsafe {
            let set = hashset_new();
            // 1, 17 and 33 all land in bucket 1 of a 16-bucket table.
            hashset_insert(set, 1);
            hashset_insert(set, 17);
            hashset_insert(set, 33);
            assert!(hashset_remove(set, 17));
            assert!(hashset_contains(set, 1));
            assert!(hashset_contains(set, 33));
            assert_eq!(hashset_len(set), 2);
            hashset_free(set);
        }
    }

    #[test]
    fn test_remove_head_tail_and_absent() {
        unsafe {
            let set = hashset_new();
            // Prepend order puts 33 at the head and 1 at the tail of
            // bucket 1's chain.
            hashset_insert(set, 1);
            hashset_insert(set, 17);
            hashset_insert(set, 33);
            assert!(!hashset_remove(set, 49));
            assert!(hashset_remove(set, 33));
            assert!(hashset_remove(set, 1));
            assert!(hashset_contains(set, 17));
            assert!(!hashset_remove(set, 49));
            assert_eq!(hashset_len(set), 1);
            hashset_free(set);
        }
    }

    #[test]
    fn test_clear_keeps_capacity() {
        unsafe {
            let set = hashset_new();
            for i in 0..50 {
                hashset_insert(set, i);
            }
            let cap = (*set).capacity();
            hashset_clear(set);
            assert_eq!(hashset_len(set), 0);
            assert!(hashset_is_empty(set));
            assert_eq!((*set).capacity(), cap);
            for i in 0..50 {
                assert!(!hashset_contains(set, i));
            }
            // Reusable after clear
            assert!(hashset_insert(set, 7));
            assert!(hashset_contains(set, 7));
            hashset_free(set);
        }
    }

    #[test]
    fn test_null_handle_tolerated() {
        unsafe {
            assert!(!hashset_insert(std::ptr::null_mut(), 1));
            assert!(!hashset_contains(std::ptr::null_mut(), 1));
            assert!(!hashset_remove(std::ptr::null_mut(), 1));
            assert_eq!(hashset_len(std::ptr::null_mut()), 0);
            assert!(hashset_is_empty(std::ptr::null_mut()));
            hashset_clear(std::ptr::null_mut());
            hashset_free(std::ptr::null_mut());
            hashset_debug_print(std::ptr::null_mut());
        }
    }

    #[test]
    fn test_capitalized_aliases() {
        unsafe {
            let set = HashSet_new();
            assert!(HashSet_insert(set, 9));
            assert!(HashSet_contains(set, 9));
            assert_eq!(HashSet_len(set), 1);
            assert!(!HashSet_is_empty(set));
            assert!(HashSet_remove(set, 9));
            HashSet_clear(set);
            HashSet_free(set);
        }
    }

    #[test]
    fn test_long_chain_clear_is_iterative() {
        unsafe {
            let set = hashset_new();
            for i in 0..10_000 {
                hashset_insert(set, i);
            }
            hashset_clear(set);
            assert_eq!(hashset_len(set), 0);
            hashset_free(set);
        }
    }
}
