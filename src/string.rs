//! Heap-owned, NUL-terminated mutable string and its text operations.
//!
//! All operations treat bytes, not code points; case conversion and trim
//! use the ASCII classifications and pass other bytes through unchanged.
//! Operations that return a new string transfer ownership to the caller
//! (released via `string_free`); `string_as_str` borrows the internal
//! buffer until the next mutation or free.

use std::ffi::{CStr, CString, c_char};

use crate::array::{RawBuf, alloc_array, dealloc_array};

/// String handle: `length` payload bytes followed by a NUL terminator at
/// `data[length]`, with `capacity >= length + 1`. Layout matches the IR
/// the compiler emits for the `String` type.
#[repr(C)]
#[derive(Debug)]
pub struct RtString {
    data: *mut c_char,
    length: usize,
    capacity: usize,
}

/// Owning array of strings produced by `string_split`; released with
/// `string_array_free`.
pub type RtStringArray = RawBuf<*mut RtString>;

impl RtString {
    /// Allocate a string holding a copy of `bytes` plus the terminator.
    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let capacity = bytes.len() + 1;
        let data = alloc_array::<c_char>(capacity)?;
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr() as *const c_char, data, bytes.len());
            data.add(bytes.len()).write(0);
        }
        Some(Self {
            data,
            length: bytes.len(),
            capacity,
        })
    }

    fn empty() -> Option<Self> {
        Self::from_bytes(b"")
    }

    fn as_bytes(&self) -> &[u8] {
        if self.data.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.data as *const u8, self.length) }
    }

    /// Append `other`, growing to `2 * (new_length + 1)` when the new
    /// length would reach the capacity. Failure leaves the string
    /// unchanged.
    fn push_bytes(&mut self, other: &[u8]) -> bool {
        let new_length = self.length + other.len();
        if new_length + 1 > self.capacity {
            let new_capacity = (new_length + 1) * 2;
            let Some(new_data) = alloc_array::<c_char>(new_capacity) else {
                return false;
            };
            unsafe {
                std::ptr::copy_nonoverlapping(self.data, new_data, self.length);
                dealloc_array(self.data, self.capacity);
            }
            self.data = new_data;
            self.capacity = new_capacity;
        }
        unsafe {
            std::ptr::copy_nonoverlapping(
                other.as_ptr() as *const c_char,
                self.data.add(self.length),
                other.len(),
            );
            self.data.add(new_length).write(0);
        }
        self.length = new_length;
        true
    }

    fn release(&mut self) {
        if !self.data.is_null() {
            unsafe { dealloc_array(self.data, self.capacity) };
            self.data = std::ptr::null_mut();
        }
        self.length = 0;
        self.capacity = 0;
    }
}

fn boxed(string: Option<RtString>) -> *mut RtString {
    match string {
        Some(s) => Box::into_raw(Box::new(s)),
        None => std::ptr::null_mut(),
    }
}

/// View a C string as bytes; null reads as absent.
unsafe fn cstr_bytes<'a>(ptr: *const c_char) -> Option<&'a [u8]> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_bytes())
}

/// First occurrence of `needle` in `haystack`; empty needles never match.
fn find_sub(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Create a new empty string.
#[unsafe(no_mangle)]
pub extern "C" fn string_new() -> *mut RtString {
    boxed(RtString::empty())
}

/// Copy a C string into a new handle; a null source yields empty.
///
/// # Safety
///
/// `literal` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_from(literal: *const c_char) -> *mut RtString {
    match unsafe { cstr_bytes(literal) } {
        Some(bytes) => boxed(RtString::from_bytes(bytes)),
        None => string_new(),
    }
}

/// Byte length of the payload.
///
/// # Safety
///
/// `s` must be null or a live string handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_len(s: *mut RtString) -> i32 {
    if s.is_null() {
        return 0;
    }
    unsafe { &*s }.length as i32
}

/// Append the bytes of `other` in place.
///
/// # Safety
///
/// `s` must be null or a live string handle; `other` must be null or a
/// valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_push_str(s: *mut RtString, other: *const c_char) {
    if s.is_null() {
        return;
    }
    let Some(other) = (unsafe { cstr_bytes(other) }) else {
        return;
    };
    let s = unsafe { &mut *s };
    s.push_bytes(other);
}

/// Borrow the internal NUL-terminated buffer. Valid until the next
/// mutation or free of `s`; a null handle reads as `""`.
///
/// # Safety
///
/// `s` must be null or a live string handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_as_str(s: *mut RtString) -> *const c_char {
    if s.is_null() {
        return c"".as_ptr();
    }
    let s = unsafe { &*s };
    if s.data.is_null() {
        return c"".as_ptr();
    }
    s.data
}

/// Deep copy with independent storage.
///
/// # Safety
///
/// `s` must be null or a live string handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_clone(s: *mut RtString) -> *mut RtString {
    if s.is_null() {
        return string_new();
    }
    boxed(RtString::from_bytes(unsafe { &*s }.as_bytes()))
}

/// Bytes `[start, min(end, len))` as a new string; invalid ranges yield
/// empty.
///
/// # Safety
///
/// `s` must be null or a live string handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_substring(s: *mut RtString, start: i32, end: i32) -> *mut RtString {
    if s.is_null() {
        return string_new();
    }
    let bytes = unsafe { &*s }.as_bytes();
    let len = bytes.len() as i32;
    if start < 0 || end < start || start >= len {
        return string_new();
    }
    let end = end.min(len);
    boxed(RtString::from_bytes(&bytes[start as usize..end as usize]))
}

/// Byte offset of the first occurrence of `needle`, or -1 when absent or
/// when either operand is empty or null.
///
/// # Safety
///
/// `s` must be null or a live string handle; `needle` must be null or a
/// valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_find(s: *mut RtString, needle: *const c_char) -> i32 {
    if s.is_null() {
        return -1;
    }
    let Some(needle) = (unsafe { cstr_bytes(needle) }) else {
        return -1;
    };
    match find_sub(unsafe { &*s }.as_bytes(), needle) {
        Some(offset) => offset as i32,
        None => -1,
    }
}

/// New string with only the first occurrence of `from` replaced by `to`;
/// when `from` does not occur the result is a clone.
///
/// # Safety
///
/// `s` must be null or a live string handle; `from` and `to` must be
/// null or valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_replace(
    s: *mut RtString,
    from: *const c_char,
    to: *const c_char,
) -> *mut RtString {
    if s.is_null() {
        return string_new();
    }
    let bytes = unsafe { &*s }.as_bytes();
    let (Some(from), Some(to)) = (unsafe { cstr_bytes(from) }, unsafe { cstr_bytes(to) }) else {
        return unsafe { string_clone(s) };
    };
    let Some(offset) = find_sub(bytes, from) else {
        return unsafe { string_clone(s) };
    };
    let mut result = Vec::with_capacity(bytes.len() - from.len() + to.len());
    result.extend_from_slice(&bytes[..offset]);
    result.extend_from_slice(to);
    result.extend_from_slice(&bytes[offset + from.len()..]);
    boxed(RtString::from_bytes(&result))
}

/// New string with each byte mapped through ASCII uppercasing.
///
/// # Safety
///
/// `s` must be null or a live string handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_to_uppercase(s: *mut RtString) -> *mut RtString {
    if s.is_null() {
        return string_new();
    }
    let mapped: Vec<u8> = unsafe { &*s }
        .as_bytes()
        .iter()
        .map(|b| b.to_ascii_uppercase())
        .collect();
    boxed(RtString::from_bytes(&mapped))
}

/// New string with each byte mapped through ASCII lowercasing.
///
/// # Safety
///
/// `s` must be null or a live string handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_to_lowercase(s: *mut RtString) -> *mut RtString {
    if s.is_null() {
        return string_new();
    }
    let mapped: Vec<u8> = unsafe { &*s }
        .as_bytes()
        .iter()
        .map(|b| b.to_ascii_lowercase())
        .collect();
    boxed(RtString::from_bytes(&mapped))
}

/// New string with leading and trailing ASCII whitespace removed.
///
/// # Safety
///
/// `s` must be null or a live string handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_trim(s: *mut RtString) -> *mut RtString {
    if s.is_null() {
        return string_new();
    }
    boxed(RtString::from_bytes(unsafe { &*s }.as_bytes().trim_ascii()))
}

/// Concatenate two C strings into a freshly allocated NUL-terminated
/// buffer; null operands read as empty. Release with
/// `string_concat_free`.
///
/// # Safety
///
/// `left` and `right` must each be null or valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_concat(left: *const c_char, right: *const c_char) -> *mut c_char {
    let left = unsafe { cstr_bytes(left) }.unwrap_or(&[]);
    let right = unsafe { cstr_bytes(right) }.unwrap_or(&[]);
    let mut joined = Vec::with_capacity(left.len() + right.len());
    joined.extend_from_slice(left);
    joined.extend_from_slice(right);
    match CString::new(joined) {
        Ok(joined) => joined.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Release a buffer returned by `string_concat` (or any other runtime
/// entry point that hands out a raw C string).
///
/// # Safety
///
/// `s` must be null or a pointer previously returned by the runtime and
/// not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_concat_free(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

/// Byte equality; two nulls are equal, a single null is not equal to
/// anything.
///
/// # Safety
///
/// `a` and `b` must each be null or live string handles.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_equals(a: *mut RtString, b: *mut RtString) -> i32 {
    match (a.is_null(), b.is_null()) {
        (true, true) => 1,
        (true, false) | (false, true) => 0,
        (false, false) => {
            let (a, b) = unsafe { (&*a, &*b) };
            (a.as_bytes() == b.as_bytes()) as i32
        }
    }
}

fn format_template(template: &[u8], value: &[u8]) -> *mut RtString {
    match find_sub(template, b"{}") {
        Some(offset) => {
            let mut result = Vec::with_capacity(template.len() - 2 + value.len());
            result.extend_from_slice(&template[..offset]);
            result.extend_from_slice(value);
            result.extend_from_slice(&template[offset + 2..]);
            boxed(RtString::from_bytes(&result))
        }
        None => boxed(RtString::from_bytes(template)),
    }
}

/// Substitute `value` for the first `{}` marker in `template`; without a
/// marker the result is a copy of the template.
///
/// # Safety
///
/// `template` and `value` must each be null or valid NUL-terminated
/// strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_format(
    template: *const c_char,
    value: *const c_char,
) -> *mut RtString {
    let Some(template) = (unsafe { cstr_bytes(template) }) else {
        return string_new();
    };
    let value = unsafe { cstr_bytes(value) }.unwrap_or(&[]);
    format_template(template, value)
}

/// `string_format` with the decimal rendering of an integer.
///
/// # Safety
///
/// `template` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_format_i32(template: *const c_char, value: i32) -> *mut RtString {
    let Some(template) = (unsafe { cstr_bytes(template) }) else {
        return string_new();
    };
    format_template(template, value.to_string().as_bytes())
}

/// `string_format` with a five-significant-digit rendering of a float
/// (`%.5g` semantics: trailing zeros trimmed, exponent form outside
/// `1e-4 ..= 1e5`).
///
/// # Safety
///
/// `template` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_format_f32(template: *const c_char, value: f32) -> *mut RtString {
    let Some(template) = (unsafe { cstr_bytes(template) }) else {
        return string_new();
    };
    format_template(template, format_g(value).as_bytes())
}

/// Render a float the way `%.5g` does.
fn format_g(value: f32) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    // Round to five significant digits first; the fixed/scientific choice
    // depends on the exponent after rounding.
    let sci = format!("{value:.4e}");
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    if exp < -4 || exp >= 5 {
        let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    } else {
        let precision = (4 - exp) as usize;
        let fixed = format!("{value:.precision$}");
        fixed
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

fn push_piece(pieces: &mut RtStringArray, bytes: &[u8]) -> bool {
    let piece = boxed(RtString::from_bytes(bytes));
    if piece.is_null() {
        return false;
    }
    if !pieces.push(piece) {
        unsafe { string_free(piece) };
        return false;
    }
    true
}

unsafe fn free_pieces(mut pieces: RtStringArray) {
    for i in 0..pieces.len {
        unsafe { string_free(*pieces.data.add(i)) };
    }
    pieces.release();
}

/// Split on disjoint occurrences of `delimiter`, returning an owning
/// array of the pieces between them (consecutive delimiters produce
/// empty pieces). An empty delimiter yields one single-byte string per
/// input byte. Release with `string_array_free`.
///
/// # Safety
///
/// `s` must be null or a live string handle; `delimiter` must be null or
/// a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_split(
    s: *mut RtString,
    delimiter: *const c_char,
) -> *mut RtStringArray {
    let mut pieces = RtStringArray::empty();
    if s.is_null() {
        return Box::into_raw(Box::new(pieces));
    }
    let bytes = unsafe { &*s }.as_bytes();
    let delimiter = unsafe { cstr_bytes(delimiter) }.unwrap_or(&[]);

    if delimiter.is_empty() {
        for b in bytes {
            if !push_piece(&mut pieces, std::slice::from_ref(b)) {
                unsafe { free_pieces(pieces) };
                return std::ptr::null_mut();
            }
        }
        return Box::into_raw(Box::new(pieces));
    }

    let mut rest = bytes;
    while let Some(offset) = find_sub(rest, delimiter) {
        if !push_piece(&mut pieces, &rest[..offset]) {
            unsafe { free_pieces(pieces) };
            return std::ptr::null_mut();
        }
        rest = &rest[offset + delimiter.len()..];
    }
    if !push_piece(&mut pieces, rest) {
        unsafe { free_pieces(pieces) };
        return std::ptr::null_mut();
    }
    Box::into_raw(Box::new(pieces))
}

/// # Safety
///
/// `s` must be null or a live string handle; `prefix` must be null or a
/// valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_starts_with(s: *mut RtString, prefix: *const c_char) -> i32 {
    if s.is_null() {
        return 0;
    }
    let Some(prefix) = (unsafe { cstr_bytes(prefix) }) else {
        return 0;
    };
    unsafe { &*s }.as_bytes().starts_with(prefix) as i32
}

/// # Safety
///
/// `s` must be null or a live string handle; `suffix` must be null or a
/// valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_ends_with(s: *mut RtString, suffix: *const c_char) -> i32 {
    if s.is_null() {
        return 0;
    }
    let Some(suffix) = (unsafe { cstr_bytes(suffix) }) else {
        return 0;
    };
    unsafe { &*s }.as_bytes().ends_with(suffix) as i32
}

/// Parse an optional sign plus base-10 digits; the parse must consume
/// the whole string. Failure or 32-bit overflow yields 0.
///
/// # Safety
///
/// `s` must be null or a live string handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_to_i32(s: *mut RtString) -> i32 {
    if s.is_null() {
        return 0;
    }
    std::str::from_utf8(unsafe { &*s }.as_bytes())
        .ok()
        .and_then(|text| text.parse::<i32>().ok())
        .unwrap_or(0)
}

/// Whole-string float parse; failure yields 0.0.
///
/// # Safety
///
/// `s` must be null or a live string handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_to_f32(s: *mut RtString) -> f32 {
    if s.is_null() {
        return 0.0;
    }
    std::str::from_utf8(unsafe { &*s }.as_bytes())
        .ok()
        .and_then(|text| text.parse::<f32>().ok())
        .unwrap_or(0.0)
}

/// Release every contained string and the array itself.
///
/// # Safety
///
/// `array` must be null or a live pointer from `string_split`; it must
/// not be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_array_free(array: *mut RtStringArray) {
    if array.is_null() {
        return;
    }
    let pieces = unsafe { Box::from_raw(array) };
    unsafe { free_pieces(*pieces) };
}

/// Release the string and its buffer.
///
/// # Safety
///
/// `s` must be null or a live string handle; it must not be used
/// afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn string_free(s: *mut RtString) {
    if s.is_null() {
        return;
    }
    let mut s = unsafe { Box::from_raw(s) };
    s.release();
}
