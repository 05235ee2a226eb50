//! Growable `i32` vector exposed to compiled Rill code.
//!
//! The handle is a heap-allocated `(data, len, capacity)` triple; every
//! entry point tolerates a null handle (reads act on an empty vector,
//! writes report failure).

use crate::array::RawBuf;

/// Vector of 32-bit signed integers. Layout matches the IR the compiler
/// emits for the `Vec` type.
pub type RtVec = RawBuf<i32>;

/// Create a new empty vector.
#[unsafe(no_mangle)]
pub extern "C" fn vec_new() -> *mut RtVec {
    Box::into_raw(Box::new(RtVec::empty()))
}

/// Create a vector with a pre-allocated capacity.
#[unsafe(no_mangle)]
pub extern "C" fn vec_with_capacity(capacity: usize) -> *mut RtVec {
    match RtVec::with_capacity(capacity) {
        Some(vec) => Box::into_raw(Box::new(vec)),
        None => std::ptr::null_mut(),
    }
}

/// Grow the vector to `new_capacity` elements. Returns 1 on success,
/// 0 when the capacity does not increase or the allocation fails.
///
/// # Safety
///
/// `vec` must be null or a live pointer from `vec_new`/`vec_with_capacity`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vec_grow(vec: *mut RtVec, new_capacity: usize) -> i32 {
    if vec.is_null() {
        return 0;
    }
    let vec = unsafe { &mut *vec };
    vec.grow_to(new_capacity) as i32
}

/// Append an element. Returns 1 on success, 0 on failure.
///
/// # Safety
///
/// `vec` must be null or a live vector pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vec_push(vec: *mut RtVec, item: i32) -> i32 {
    if vec.is_null() {
        return 0;
    }
    let vec = unsafe { &mut *vec };
    vec.push(item) as i32
}

/// Remove the last element, writing it through `out_item` when non-null.
/// Returns 1 on success, 0 when the vector is empty or null.
///
/// # Safety
///
/// `vec` must be null or a live vector pointer; `out_item` must be null
/// or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vec_pop(vec: *mut RtVec, out_item: *mut i32) -> i32 {
    if vec.is_null() {
        return 0;
    }
    let vec = unsafe { &mut *vec };
    match vec.pop() {
        Some(item) => {
            if !out_item.is_null() {
                unsafe { out_item.write(item) };
            }
            1
        }
        None => 0,
    }
}

/// Borrow a pointer to element `index`, or null when out of range.
/// The pointer is invalidated by the next push/pop/clear/free.
///
/// # Safety
///
/// `vec` must be null or a live vector pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vec_get(vec: *mut RtVec, index: usize) -> *mut i32 {
    if vec.is_null() {
        return std::ptr::null_mut();
    }
    let vec = unsafe { &*vec };
    vec.get_ptr(index)
}

/// Number of live elements; a null handle reads as empty.
///
/// # Safety
///
/// `vec` must be null or a live vector pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vec_len(vec: *mut RtVec) -> usize {
    if vec.is_null() {
        return 0;
    }
    unsafe { &*vec }.len()
}

/// # Safety
///
/// `vec` must be null or a live vector pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vec_is_empty(vec: *mut RtVec) -> i32 {
    if vec.is_null() {
        return 1;
    }
    unsafe { &*vec }.is_empty() as i32
}

/// # Safety
///
/// `vec` must be null or a live vector pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vec_capacity(vec: *mut RtVec) -> usize {
    if vec.is_null() {
        return 0;
    }
    unsafe { &*vec }.capacity
}

/// Set the length to zero without releasing memory.
///
/// # Safety
///
/// `vec` must be null or a live vector pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vec_clear(vec: *mut RtVec) {
    if !vec.is_null() {
        unsafe { &mut *vec }.clear();
    }
}

/// Release the vector and its heap region.
///
/// # Safety
///
/// `vec` must be null or a live vector pointer; it must not be used
/// afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vec_free(vec: *mut RtVec) {
    if vec.is_null() {
        return;
    }
    let mut vec = unsafe { Box::from_raw(vec) };
    vec.release();
}

/// Self-check called by generated test programs. Returns 1 when the
/// basic push/get/pop contract holds.
#[unsafe(no_mangle)]
pub extern "C" fn vec_runtime_test() -> i32 {
    unsafe {
        let vec = vec_new();
        if vec.is_null() {
            return 0;
        }

        for i in 0..10 {
            if vec_push(vec, i) == 0 {
                vec_free(vec);
                return 0;
            }
        }

        if vec_len(vec) != 10 {
            vec_free(vec);
            return 0;
        }

        for i in 0..10 {
            let val = vec_get(vec, i as usize);
            if val.is_null() || *val != i {
                vec_free(vec);
                return 0;
            }
        }

        let mut popped = 0;
        if vec_pop(vec, &mut popped) == 0 || popped != 9 {
            vec_free(vec);
            return 0;
        }

        if vec_len(vec) != 9 {
            vec_free(vec);
            return 0;
        }

        vec_free(vec);
        1
    }
}
