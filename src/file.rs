//! Buffered file handle backing Rill's `File` type.
//!
//! Path-level helpers (`file_exists`, `file_size`, `file_delete`) take raw
//! C paths and need no handle. Handle operations never report I/O errors
//! out of band; a failed read returns null and a failed write is silent,
//! matching the in-band error model of the rest of the runtime.

use std::ffi::{CStr, CString, OsStr, c_char};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// Open file handle. `filename` and `mode` are kept for diagnostics and
/// released on close; a closed handle answers every operation as a no-op
/// until `file_free`.
pub struct RtFile {
    stream: Option<BufReader<File>>,
    filename: Option<CString>,
    mode: Option<CString>,
}

/// Interpret a C path pointer; null reads as absent.
unsafe fn path_of<'a>(ptr: *const c_char) -> Option<&'a Path> {
    if ptr.is_null() {
        return None;
    }
    let bytes = unsafe { CStr::from_ptr(ptr) }.to_bytes();
    Some(Path::new(OsStr::from_bytes(bytes)))
}

/// Map an fopen-style access mode to open options. A 'b' anywhere in the
/// mode is accepted and ignored; anything else unrecognized fails.
fn open_options(mode: &[u8]) -> Option<OpenOptions> {
    let mode: Vec<u8> = mode.iter().copied().filter(|&b| b != b'b').collect();
    let mut options = OpenOptions::new();
    match mode.as_slice() {
        b"r" => options.read(true),
        b"r+" => options.read(true).write(true),
        b"w" => options.write(true).create(true).truncate(true),
        b"w+" => options.read(true).write(true).create(true).truncate(true),
        b"a" => options.append(true).create(true),
        b"a+" => options.read(true).append(true).create(true),
        _ => return None,
    };
    Some(options)
}

/// Open `path` with an fopen-style mode string. Returns null when either
/// argument is null, the mode is unrecognized, or the open fails.
///
/// # Safety
///
/// `path` and `mode` must each be null or valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn file_open(path: *const c_char, mode: *const c_char) -> *mut RtFile {
    let Some(file_path) = (unsafe { path_of(path) }) else {
        return std::ptr::null_mut();
    };
    if mode.is_null() {
        return std::ptr::null_mut();
    }
    let mode_bytes = unsafe { CStr::from_ptr(mode) }.to_bytes();
    let Some(options) = open_options(mode_bytes) else {
        return std::ptr::null_mut();
    };
    let Ok(stream) = options.open(file_path) else {
        return std::ptr::null_mut();
    };
    Box::into_raw(Box::new(RtFile {
        stream: Some(BufReader::new(stream)),
        filename: Some(unsafe { CStr::from_ptr(path) }.to_owned()),
        mode: Some(unsafe { CStr::from_ptr(mode) }.to_owned()),
    }))
}

/// `file_open(path, "w")`: create or truncate for writing.
///
/// # Safety
///
/// `path` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn file_create(path: *const c_char) -> *mut RtFile {
    unsafe { file_open(path, c"w".as_ptr()) }
}

/// 1 iff the path resolves to an existing filesystem entry.
///
/// # Safety
///
/// `path` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn file_exists(path: *const c_char) -> i32 {
    match unsafe { path_of(path) } {
        Some(file_path) => std::fs::metadata(file_path).is_ok() as i32,
        None => 0,
    }
}

/// Byte size of the file at `path`, or -1 on any error.
///
/// # Safety
///
/// `path` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn file_size(path: *const c_char) -> i64 {
    let Some(file_path) = (unsafe { path_of(path) }) else {
        return -1;
    };
    match std::fs::metadata(file_path) {
        Ok(metadata) => metadata.len() as i64,
        Err(_) => -1,
    }
}

/// Remove the path, ignoring errors.
///
/// # Safety
///
/// `path` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn file_delete(path: *const c_char) {
    if let Some(file_path) = unsafe { path_of(path) } {
        let _ = std::fs::remove_file(file_path);
    }
}

/// Write the bytes of `data` at the current position (the end, in append
/// modes) and flush. Silent no-op on a null or closed handle, null data,
/// or I/O failure.
///
/// # Safety
///
/// `file` must be null or a live handle; `data` must be null or a valid
/// NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn file_write(file: *mut RtFile, data: *const c_char) {
    if file.is_null() || data.is_null() {
        return;
    }
    let Some(stream) = (unsafe { &mut *file }).stream.as_mut() else {
        return;
    };
    // Drop the read-ahead buffer so the write lands at the logical position
    if stream.seek(SeekFrom::Current(0)).is_err() {
        return;
    }
    let bytes = unsafe { CStr::from_ptr(data) }.to_bytes();
    let inner = stream.get_mut();
    let _ = inner.write_all(bytes);
    let _ = inner.flush();
}

/// Next line with a single trailing newline stripped, as a caller-owned
/// C string (release with `string_concat_free`). Null at EOF, on error,
/// or when the line contains a NUL byte.
///
/// # Safety
///
/// `file` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn file_read_line(file: *mut RtFile) -> *mut c_char {
    if file.is_null() {
        return std::ptr::null_mut();
    }
    let Some(stream) = (unsafe { &mut *file }).stream.as_mut() else {
        return std::ptr::null_mut();
    };
    let mut line = Vec::new();
    match stream.read_until(b'\n', &mut line) {
        Ok(0) | Err(_) => std::ptr::null_mut(),
        Ok(_) => {
            if line.last() == Some(&b'\n') {
                line.pop();
            }
            match CString::new(line) {
                Ok(line) => line.into_raw(),
                Err(_) => std::ptr::null_mut(),
            }
        }
    }
}

/// Bytes from the current position to end-of-stream as a caller-owned C
/// string (release with `string_concat_free`), with the position restored
/// afterwards. Null when nothing remains, on error, or when the content
/// contains a NUL byte.
///
/// # Safety
///
/// `file` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn file_read_all(file: *mut RtFile) -> *mut c_char {
    if file.is_null() {
        return std::ptr::null_mut();
    }
    let Some(stream) = (unsafe { &mut *file }).stream.as_mut() else {
        return std::ptr::null_mut();
    };
    let Ok(start) = stream.stream_position() else {
        return std::ptr::null_mut();
    };
    let mut content = Vec::new();
    if stream.read_to_end(&mut content).is_err() {
        return std::ptr::null_mut();
    }
    let _ = stream.seek(SeekFrom::Start(start));
    if content.is_empty() {
        return std::ptr::null_mut();
    }
    match CString::new(content) {
        Ok(content) => content.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Release the stream and the diagnostic strings. The handle itself
/// stays allocated and answers every further operation as a no-op;
/// `file_free` releases it.
///
/// # Safety
///
/// `file` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn file_close(file: *mut RtFile) {
    if file.is_null() {
        return;
    }
    let file = unsafe { &mut *file };
    file.stream = None;
    file.filename = None;
    file.mode = None;
}

/// Close (if still open) and release the handle.
///
/// # Safety
///
/// `file` must be null or a live handle; it must not be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn file_free(file: *mut RtFile) {
    if file.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(file) });
}
