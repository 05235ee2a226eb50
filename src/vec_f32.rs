//! Growable `f32` vector with the reductions used by Rill's SIMD surface.
//!
//! The `simd_*` names are part of the ABI; the contract is the mathematical
//! result with left-to-right evaluation order. Whether the loops vectorize
//! is left to the optimizer.

use crate::array::RawBuf;

/// Vector of 32-bit floats, same layout as [`crate::vec::RtVec`].
pub type RtVecF32 = RawBuf<f32>;

/// Create a new empty float vector.
#[unsafe(no_mangle)]
pub extern "C" fn vec_f32_new() -> *mut RtVecF32 {
    Box::into_raw(Box::new(RtVecF32::empty()))
}

/// Append an element. Returns 1 on success, 0 on failure.
///
/// # Safety
///
/// `vec` must be null or a live pointer from `vec_f32_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vec_f32_push(vec: *mut RtVecF32, item: f32) -> i32 {
    if vec.is_null() {
        return 0;
    }
    let vec = unsafe { &mut *vec };
    vec.push(item) as i32
}

/// Borrow a pointer to element `index`, or null when out of range.
///
/// # Safety
///
/// `vec` must be null or a live float vector pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vec_f32_get(vec: *mut RtVecF32, index: usize) -> *mut f32 {
    if vec.is_null() {
        return std::ptr::null_mut();
    }
    unsafe { &*vec }.get_ptr(index)
}

/// # Safety
///
/// `vec` must be null or a live float vector pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vec_f32_len(vec: *mut RtVecF32) -> usize {
    if vec.is_null() {
        return 0;
    }
    unsafe { &*vec }.len()
}

/// Elementwise sum of two vectors of equal length, returned as a new
/// vector owned by the caller. Null operands or a length mismatch yield
/// null; two empty vectors yield a new empty vector.
///
/// # Safety
///
/// `a` and `b` must each be null or live float vector pointers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vec_f32_simd_add(a: *mut RtVecF32, b: *mut RtVecF32) -> *mut RtVecF32 {
    if a.is_null() || b.is_null() {
        return std::ptr::null_mut();
    }
    let (a, b) = unsafe { (&*a, &*b) };
    if a.len != b.len {
        return std::ptr::null_mut();
    }
    let Some(mut result) = RtVecF32::with_capacity(a.len) else {
        return std::ptr::null_mut();
    };
    for i in 0..a.len {
        unsafe {
            result.data.add(i).write(*a.data.add(i) + *b.data.add(i));
        }
    }
    result.len = a.len;
    Box::into_raw(Box::new(result))
}

/// Left-to-right sum of all elements; empty or null yields +0.0.
///
/// # Safety
///
/// `vec` must be null or a live float vector pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vec_f32_simd_sum(vec: *mut RtVecF32) -> f32 {
    if vec.is_null() {
        return 0.0;
    }
    let vec = unsafe { &*vec };
    let mut sum = 0.0f32;
    for i in 0..vec.len {
        sum += unsafe { *vec.data.add(i) };
    }
    sum
}

/// Left-to-right dot product; null operands or a length mismatch yield 0.0.
///
/// # Safety
///
/// `a` and `b` must each be null or live float vector pointers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vec_f32_simd_dot(a: *mut RtVecF32, b: *mut RtVecF32) -> f32 {
    if a.is_null() || b.is_null() {
        return 0.0;
    }
    let (a, b) = unsafe { (&*a, &*b) };
    if a.len != b.len {
        return 0.0;
    }
    let mut dot = 0.0f32;
    for i in 0..a.len {
        dot += unsafe { *a.data.add(i) * *b.data.add(i) };
    }
    dot
}

/// Release the vector and its heap region.
///
/// # Safety
///
/// `vec` must be null or a live float vector pointer; it must not be used
/// afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vec_f32_free(vec: *mut RtVecF32) {
    if vec.is_null() {
        return;
    }
    let mut vec = unsafe { Box::from_raw(vec) };
    vec.release();
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn from_slice(values: &[f32]) -> *mut RtVecF32 {
        unsafe {
            let vec = vec_f32_new();
            for &v in values {
                assert_eq!(vec_f32_push(vec, v), 1);
            }
            vec
        }
    }

    #[test]
    fn test_push_and_get() {
        unsafe {
            let vec = from_slice(&[1.5, 2.5, 3.5]);
            assert_eq!(vec_f32_len(vec), 3);
            assert_eq!(*vec_f32_get(vec, 0), 1.5);
            assert_eq!(*vec_f32_get(vec, 2), 3.5);
            assert!(vec_f32_get(vec, 3).is_null());
            vec_f32_free(vec);
        }
    }

    #[test]
    fn test_simd_add_pairwise() {
        unsafe {
            let a = from_slice(&[1.0, 2.0, 3.0, 4.0]);
            let b = from_slice(&[10.0, 20.0, 30.0, 40.0]);
            let sum = vec_f32_simd_add(a, b);
            assert!(!sum.is_null());
            assert_eq!(vec_f32_len(sum), 4);
            for i in 0..4 {
                assert_eq!(*vec_f32_get(sum, i), (i as f32 + 1.0) * 11.0);
            }
            vec_f32_free(a);
            vec_f32_free(b);
            vec_f32_free(sum);
        }
    }

    #[test]
    fn test_simd_add_length_mismatch() {
        unsafe {
            let a = from_slice(&[1.0]);
            let b = from_slice(&[1.0, 2.0]);
            assert!(vec_f32_simd_add(a, b).is_null());
            vec_f32_free(a);
            vec_f32_free(b);
        }
    }

    #[test]
    fn test_simd_add_empty_yields_empty() {
        unsafe {
            let a = vec_f32_new();
            let b = vec_f32_new();
            let sum = vec_f32_simd_add(a, b);
            assert!(!sum.is_null());
            assert_eq!(vec_f32_len(sum), 0);
            vec_f32_free(a);
            vec_f32_free(b);
            vec_f32_free(sum);
        }
    }

    #[test]
    fn test_simd_sum_order_and_empty() {
        unsafe {
            let v = from_slice(&[0.5, 1.5, 2.0]);
            assert_eq!(vec_f32_simd_sum(v), 4.0);
            vec_f32_free(v);

            let empty = vec_f32_new();
            assert_eq!(vec_f32_simd_sum(empty), 0.0);
            vec_f32_free(empty);

            assert_eq!(vec_f32_simd_sum(std::ptr::null_mut()), 0.0);
        }
    }

    #[test]
    fn test_simd_dot() {
        unsafe {
            let a = from_slice(&[1.0, 2.0, 3.0]);
            let b = from_slice(&[4.0, 5.0, 6.0]);
            assert_eq!(vec_f32_simd_dot(a, b), 32.0);

            let short = from_slice(&[1.0]);
            assert_eq!(vec_f32_simd_dot(a, short), 0.0);
            assert_eq!(vec_f32_simd_dot(std::ptr::null_mut(), b), 0.0);

            vec_f32_free(a);
            vec_f32_free(b);
            vec_f32_free(short);
        }
    }
}
