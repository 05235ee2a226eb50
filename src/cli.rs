//! Process-wide services: the captured argument vector, flag parsing for
//! compiled image-filter programs, wall-clock timing, peak memory, and
//! the exit helpers.
//!
//! `cli_init` runs once per process; the arguments are copied into
//! runtime-owned storage at capture time, so the caller's `argv` may be
//! reused or freed afterwards. Later calls are ignored.

use std::ffi::{CStr, CString, c_char};
use std::sync::OnceLock;

use crate::array::{alloc_array, dealloc_array};

static PROCESS_ARGS: OnceLock<Vec<CString>> = OnceLock::new();

fn args() -> &'static [CString] {
    PROCESS_ARGS.get().map(Vec::as_slice).unwrap_or(&[])
}

/// Flags parsed from the argument vector; every string field is owned by
/// the structure and released by `free_cli_args`.
#[repr(C)]
pub struct CliArgs {
    pub input_file: *mut c_char,
    pub output_file: *mut c_char,
    pub filter_type: *mut c_char,
    pub brightness: i32,
    pub valid: i32,
}

/// Capture the program arguments. The first call wins; subsequent calls
/// are ignored.
///
/// # Safety
///
/// `argv` must be null or point to at least `argc` valid NUL-terminated
/// strings (a null entry ends the scan early).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cli_init(argc: i32, argv: *const *const c_char) {
    let mut captured = Vec::new();
    if !argv.is_null() {
        for i in 0..argc.max(0) as usize {
            let arg = unsafe { *argv.add(i) };
            if arg.is_null() {
                break;
            }
            captured.push(unsafe { CStr::from_ptr(arg) }.to_owned());
        }
    }
    let _ = PROCESS_ARGS.set(captured);
}

/// Number of captured arguments; 0 before `cli_init`.
#[unsafe(no_mangle)]
pub extern "C" fn get_command_line_arg_count() -> i32 {
    args().len() as i32
}

/// Freshly allocated copy of argument `index`, or null when out of
/// range. Release with `free_command_line_arg`.
#[unsafe(no_mangle)]
pub extern "C" fn get_command_line_arg(index: i32) -> *mut c_char {
    if index < 0 {
        return std::ptr::null_mut();
    }
    match args().get(index as usize) {
        Some(arg) => arg.clone().into_raw(),
        None => std::ptr::null_mut(),
    }
}

/// Null-terminated array of copies of every argument, or null when no
/// arguments were captured. Release with `free_command_line_args`.
#[unsafe(no_mangle)]
pub extern "C" fn get_command_line_args() -> *mut *mut c_char {
    let args = args();
    if args.is_empty() {
        return std::ptr::null_mut();
    }
    let Some(table) = alloc_array::<*mut c_char>(args.len() + 1) else {
        return std::ptr::null_mut();
    };
    for (i, arg) in args.iter().enumerate() {
        unsafe { table.add(i).write(arg.clone().into_raw()) };
    }
    unsafe { table.add(args.len()).write(std::ptr::null_mut()) };
    table
}

/// # Safety
///
/// `arg` must be null or a pointer from `get_command_line_arg`, not yet
/// freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_command_line_arg(arg: *mut c_char) {
    if !arg.is_null() {
        drop(unsafe { CString::from_raw(arg) });
    }
}

/// # Safety
///
/// `table` must be null or a pointer from `get_command_line_args`, not
/// yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_command_line_args(table: *mut *mut c_char) {
    if table.is_null() {
        return;
    }
    let mut count = 0;
    unsafe {
        while !(*table.add(count)).is_null() {
            drop(CString::from_raw(*table.add(count)));
            count += 1;
        }
        dealloc_array(table, count + 1);
    }
}

/// atoi semantics: skip leading whitespace, optional sign, then consume
/// leading digits; anything after the digits is ignored.
fn parse_leading_i32(bytes: &[u8]) -> i32 {
    let text = bytes.trim_ascii_start();
    let (negative, digits) = match text.first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let mut value = 0i64;
    for &b in digits {
        if !b.is_ascii_digit() {
            break;
        }
        value = value * 10 + (b - b'0') as i64;
        if value > i32::MAX as i64 + 1 {
            break;
        }
    }
    if negative {
        value = -value;
    }
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Walk the captured arguments for `--input`, `--output`, `--filter` and
/// `--brightness`, each consuming the following token. Unknown flags are
/// ignored; missing flags receive the defaults.
#[unsafe(no_mangle)]
pub extern "C" fn parse_cli_args() -> *mut CliArgs {
    let args = args();
    let mut input = None;
    let mut output = None;
    let mut filter = None;
    let mut brightness = 50;

    let mut i = 1;
    while i < args.len() {
        if i + 1 < args.len() {
            match args[i].to_bytes() {
                b"--input" => {
                    input = Some(args[i + 1].clone());
                    i += 1;
                }
                b"--output" => {
                    output = Some(args[i + 1].clone());
                    i += 1;
                }
                b"--filter" => {
                    filter = Some(args[i + 1].clone());
                    i += 1;
                }
                b"--brightness" => {
                    brightness = parse_leading_i32(args[i + 1].to_bytes());
                    i += 1;
                }
                _ => {}
            }
        }
        i += 1;
    }

    Box::into_raw(Box::new(CliArgs {
        input_file: input.unwrap_or_else(|| c"input.pgm".to_owned()).into_raw(),
        output_file: output.unwrap_or_else(|| c"output.pgm".to_owned()).into_raw(),
        filter_type: filter.unwrap_or_else(|| c"brightness".to_owned()).into_raw(),
        brightness,
        valid: 1,
    }))
}

/// Release the structure and its owned strings.
///
/// # Safety
///
/// `cli` must be null or a pointer from `parse_cli_args`, not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_cli_args(cli: *mut CliArgs) {
    if cli.is_null() {
        return;
    }
    let cli = unsafe { Box::from_raw(cli) };
    for field in [cli.input_file, cli.output_file, cli.filter_type] {
        if !field.is_null() {
            drop(unsafe { CString::from_raw(field) });
        }
    }
}

/// Wall-clock time in microseconds since the Unix epoch; 0 when the host
/// clock cannot be read.
#[unsafe(no_mangle)]
pub extern "C" fn get_time_microseconds() -> i64 {
    let mut tv = libc::timeval {
        tv_sec: 0,
        tv_usec: 0,
    };
    if unsafe { libc::gettimeofday(&mut tv, std::ptr::null_mut()) } != 0 {
        return 0;
    }
    tv.tv_sec as i64 * 1_000_000 + tv.tv_usec as i64
}

/// Wall-clock time in milliseconds since the Unix epoch.
#[unsafe(no_mangle)]
pub extern "C" fn get_time_milliseconds() -> i64 {
    get_time_microseconds() / 1000
}

/// Peak resident-set size in bytes, or -1 when unavailable.
#[unsafe(no_mangle)]
pub extern "C" fn get_memory_usage() -> i64 {
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    if unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) } != 0 {
        return -1;
    }
    // ru_maxrss is kilobytes on Linux, bytes on the BSD family
    let maxrss = usage.ru_maxrss as i64;
    if cfg!(target_os = "linux") {
        maxrss * 1024
    } else {
        maxrss
    }
}

/// Print the usage text for compiled image-filter programs.
#[unsafe(no_mangle)]
pub extern "C" fn print_help() {
    println!("Rill Image Filter - SIMD-accelerated image processing");
    println!();
    println!("Usage: rill-imagefilter [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --input FILE     Input PGM file (default: input.pgm)");
    println!("  --output FILE    Output PGM file (default: output.pgm)");
    println!("  --filter TYPE    Filter type: brightness, blur, edge, sharpen");
    println!("  --brightness N   Brightness adjustment value (default: 50)");
    println!("  --help           Show this help message");
    println!();
    println!("Examples:");
    println!("  rill-imagefilter --input photo.pgm --output bright.pgm --filter brightness");
    println!("  rill-imagefilter --input photo.pgm --output edge.pgm --filter edge");
}

/// 1 when any argument after the program name is `--help` or `-h`.
#[unsafe(no_mangle)]
pub extern "C" fn is_help_requested() -> i32 {
    args()
        .iter()
        .skip(1)
        .any(|arg| matches!(arg.to_bytes(), b"--help" | b"-h")) as i32
}

/// Unlink `test_input.pgm` and `test_output.pgm` in the working
/// directory. Returns 0 when both removals succeed, -1 otherwise.
#[unsafe(no_mangle)]
pub extern "C" fn cleanup_test_files() -> i32 {
    let mut result = 0;
    for path in ["test_input.pgm", "test_output.pgm"] {
        if std::fs::remove_file(path).is_err() {
            result = -1;
        }
    }
    result
}

/// Write `Error: <message>` to standard error and exit with status 1.
///
/// # Safety
///
/// `message` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn exit_with_error(message: *const c_char) -> ! {
    let message = if message.is_null() {
        "".into()
    } else {
        unsafe { CStr::from_ptr(message) }.to_string_lossy()
    };
    eprintln!("Error: {message}");
    std::process::exit(1);
}

/// Write `Success: <message>` to standard output and exit with status 0.
///
/// # Safety
///
/// `message` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn exit_with_success(message: *const c_char) -> ! {
    let message = if message.is_null() {
        "".into()
    } else {
        unsafe { CStr::from_ptr(message) }.to_string_lossy()
    };
    println!("Success: {message}");
    std::process::exit(0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // The argument vector is captured once per process, so every test
    // that reads it shares this fixture.
    fn init_fixture_args() {
        let argv: Vec<CString> = [
            "rill-imagefilter",
            "--input",
            "in.pgm",
            "--brightness",
            "75",
            "--verbose",
            "-h",
        ]
        .iter()
        .map(|a| CString::new(*a).unwrap())
        .collect();
        let pointers: Vec<*const c_char> = argv.iter().map(|a| a.as_ptr()).collect();
        unsafe { cli_init(pointers.len() as i32, pointers.as_ptr()) };
    }

    #[test]
    #[serial]
    fn test_arg_access() {
        init_fixture_args();
        assert_eq!(get_command_line_arg_count(), 7);

        unsafe {
            let arg = get_command_line_arg(1);
            assert_eq!(CStr::from_ptr(arg).to_bytes(), b"--input");
            free_command_line_arg(arg);

            assert!(get_command_line_arg(-1).is_null());
            assert!(get_command_line_arg(7).is_null());
        }
    }

    #[test]
    #[serial]
    fn test_all_args_table_is_null_terminated() {
        init_fixture_args();
        unsafe {
            let table = get_command_line_args();
            assert!(!table.is_null());
            for i in 0..7 {
                assert!(!(*table.add(i)).is_null());
            }
            assert_eq!(CStr::from_ptr(*table.add(2)).to_bytes(), b"in.pgm");
            assert!((*table.add(7)).is_null());
            free_command_line_args(table);
        }
    }

    #[test]
    #[serial]
    fn test_second_init_is_ignored() {
        init_fixture_args();
        let other = CString::new("other").unwrap();
        let pointers = [other.as_ptr()];
        unsafe { cli_init(1, pointers.as_ptr()) };
        assert_eq!(get_command_line_arg_count(), 7);
    }

    #[test]
    #[serial]
    fn test_parse_cli_args_mixes_flags_and_defaults() {
        init_fixture_args();
        unsafe {
            let cli = parse_cli_args();
            assert!(!cli.is_null());
            assert_eq!(CStr::from_ptr((*cli).input_file).to_bytes(), b"in.pgm");
            assert_eq!(CStr::from_ptr((*cli).output_file).to_bytes(), b"output.pgm");
            assert_eq!(
                CStr::from_ptr((*cli).filter_type).to_bytes(),
                b"brightness"
            );
            assert_eq!((*cli).brightness, 75);
            assert_eq!((*cli).valid, 1);
            free_cli_args(cli);
            free_cli_args(std::ptr::null_mut());
        }
    }

    #[test]
    #[serial]
    fn test_help_detection() {
        init_fixture_args();
        assert_eq!(is_help_requested(), 1);
    }

    #[test]
    fn test_parse_leading_i32() {
        assert_eq!(parse_leading_i32(b"75"), 75);
        assert_eq!(parse_leading_i32(b"  -12"), -12);
        assert_eq!(parse_leading_i32(b"+3x"), 3);
        assert_eq!(parse_leading_i32(b"abc"), 0);
        assert_eq!(parse_leading_i32(b""), 0);
        assert_eq!(parse_leading_i32(b"2147483647"), i32::MAX);
        assert_eq!(parse_leading_i32(b"99999999999"), i32::MAX);
        assert_eq!(parse_leading_i32(b"-99999999999"), i32::MIN);
    }

    #[test]
    fn test_clock_reads_forward() {
        let t1 = get_time_microseconds();
        let t2 = get_time_microseconds();
        assert!(t1 > 0);
        assert!(t2 >= t1);
        let ms = get_time_milliseconds();
        assert!((ms - t1 / 1000).abs() < 60_000);
    }

    #[test]
    fn test_memory_usage_reports() {
        assert!(get_memory_usage() > 0);
    }

    #[test]
    #[serial]
    fn test_cleanup_test_files() {
        std::fs::write("test_input.pgm", "P2\n").unwrap();
        std::fs::write("test_output.pgm", "P2\n").unwrap();
        assert_eq!(cleanup_test_files(), 0);
        // Nothing left to remove
        assert_eq!(cleanup_test_files(), -1);
    }
}
