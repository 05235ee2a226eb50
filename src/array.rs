//! Raw growable buffer shared by the vector, string-array and hash-map types.
//!
//! The `(data, len, capacity)` triple is `#[repr(C)]` because the Rill
//! compiler reads these fields by offset in emitted IR. Allocation goes
//! through `std::alloc` with explicit layouts; every fallible path returns
//! a value instead of panicking so failures can be reported through the
//! C ABI as sentinels.

use std::alloc::{Layout, alloc, alloc_zeroed, dealloc};
use std::{mem, ptr};

/// A growable array of `T` with an owned heap region.
///
/// The empty state is `(null, 0, 0)`; no allocation happens until the
/// first push or an explicit `with_capacity`.
#[repr(C)]
#[derive(Debug)]
pub struct RawBuf<T> {
    pub data: *mut T,
    pub len: usize,
    pub capacity: usize,
}

impl<T> RawBuf<T> {
    /// Create an empty buffer without allocating.
    pub const fn empty() -> Self {
        Self {
            data: ptr::null_mut(),
            len: 0,
            capacity: 0,
        }
    }

    /// Create a buffer with room for `capacity` elements.
    ///
    /// Returns `None` when the allocation fails or the size overflows.
    pub fn with_capacity(capacity: usize) -> Option<Self> {
        if capacity == 0 {
            return Some(Self::empty());
        }
        let data = alloc_array::<T>(capacity)?;
        Some(Self {
            data,
            len: 0,
            capacity,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Grow to exactly `new_capacity` elements, copying the live prefix.
    ///
    /// A `new_capacity` at or below the current capacity is rejected.
    /// On allocation failure the buffer is left untouched.
    pub fn grow_to(&mut self, new_capacity: usize) -> bool {
        if new_capacity <= self.capacity {
            return false;
        }
        let Some(new_data) = alloc_array::<T>(new_capacity) else {
            return false;
        };
        if !self.data.is_null() {
            unsafe {
                ptr::copy_nonoverlapping(self.data, new_data, self.len);
                dealloc_array(self.data, self.capacity);
            }
        }
        self.data = new_data;
        self.capacity = new_capacity;
        true
    }

    /// Append an element, doubling the capacity on overflow (first
    /// allocation is 4 elements). Returns false when growth fails.
    pub fn push(&mut self, value: T) -> bool {
        if self.len >= self.capacity {
            let new_capacity = if self.capacity == 0 {
                4
            } else {
                self.capacity * 2
            };
            if !self.grow_to(new_capacity) {
                return false;
            }
        }
        unsafe {
            self.data.add(self.len).write(value);
        }
        self.len += 1;
        true
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(unsafe { self.data.add(self.len).read() })
    }

    /// Borrow a pointer to element `index`, or null when out of range.
    ///
    /// The pointer is invalidated by any subsequent mutation.
    pub fn get_ptr(&self, index: usize) -> *mut T {
        if index >= self.len {
            return ptr::null_mut();
        }
        unsafe { self.data.add(index) }
    }

    /// Drop the length to zero without releasing memory.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Release the owned heap region. Elements are not dropped; callers
    /// that own heap elements must release them first.
    pub fn release(&mut self) {
        if !self.data.is_null() {
            unsafe {
                dealloc_array(self.data, self.capacity);
            }
            self.data = ptr::null_mut();
        }
        self.len = 0;
        self.capacity = 0;
    }
}

/// Allocate an uninitialized array of `count` elements of `T`.
pub fn alloc_array<T>(count: usize) -> Option<*mut T> {
    let layout = array_layout::<T>(count)?;
    let data = unsafe { alloc(layout) as *mut T };
    if data.is_null() { None } else { Some(data) }
}

/// Allocate a zero-filled array of `count` elements of `T`.
pub fn alloc_zeroed_array<T>(count: usize) -> Option<*mut T> {
    let layout = array_layout::<T>(count)?;
    let data = unsafe { alloc_zeroed(layout) as *mut T };
    if data.is_null() { None } else { Some(data) }
}

/// Release an array previously allocated for `count` elements of `T`.
///
/// # Safety
///
/// `data` must come from `alloc_array`/`alloc_zeroed_array` with the same
/// `count`, and must not be used afterwards.
pub unsafe fn dealloc_array<T>(data: *mut T, count: usize) {
    if data.is_null() || count == 0 {
        return;
    }
    if let Some(layout) = array_layout::<T>(count) {
        unsafe {
            dealloc(data as *mut u8, layout);
        }
    }
}

fn array_layout<T>(count: usize) -> Option<Layout> {
    let size = mem::size_of::<T>().checked_mul(count)?;
    Layout::from_size_align(size, mem::align_of::<T>()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_has_no_allocation() {
        let buf: RawBuf<i32> = RawBuf::empty();
        assert!(buf.data.is_null());
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.capacity, 0);
    }

    #[test]
    fn push_grows_from_four() {
        let mut buf: RawBuf<i32> = RawBuf::empty();
        for i in 0..5 {
            assert!(buf.push(i));
        }
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.capacity, 8); // 4 doubled once
        for i in 0..5 {
            let p = buf.get_ptr(i as usize);
            assert!(!p.is_null());
            assert_eq!(unsafe { *p }, i);
        }
        buf.release();
    }

    #[test]
    fn pop_returns_last_and_shrinks_len() {
        let mut buf: RawBuf<i32> = RawBuf::empty();
        buf.push(1);
        buf.push(2);
        assert_eq!(buf.pop(), Some(2));
        assert_eq!(buf.pop(), Some(1));
        assert_eq!(buf.pop(), None);
        buf.release();
    }

    #[test]
    fn grow_to_rejects_smaller_capacity() {
        let mut buf: RawBuf<i32> = RawBuf::with_capacity(8).unwrap();
        assert!(!buf.grow_to(8));
        assert!(!buf.grow_to(4));
        assert!(buf.grow_to(16));
        assert_eq!(buf.capacity, 16);
        buf.release();
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut buf: RawBuf<i32> = RawBuf::empty();
        for i in 0..10 {
            buf.push(i);
        }
        let cap = buf.capacity;
        buf.clear();
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.capacity, cap);
        buf.release();
    }

    #[test]
    fn zeroed_array_is_zeroed() {
        let data = alloc_zeroed_array::<u64>(16).unwrap();
        for i in 0..16 {
            assert_eq!(unsafe { *data.add(i) }, 0);
        }
        unsafe { dealloc_array(data, 16) };
    }
}
