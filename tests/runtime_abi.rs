//! End-to-end tests driving the runtime through its C ABI, the way
//! compiled Rill programs do.

use std::ffi::{CStr, CString, c_char};

use rill_runtime::*;

fn c(text: &str) -> CString {
    CString::new(text).unwrap()
}

unsafe fn string_text(s: *mut RtString) -> String {
    unsafe { CStr::from_ptr(string_as_str(s)) }
        .to_string_lossy()
        .into_owned()
}

#[test]
fn test_runtime_self_checks() {
    assert_eq!(vec_runtime_test(), 1);
    assert_eq!(hashmap_runtime_test(), 1);
}

#[test]
fn test_word_count_pipeline() {
    // Split a line into words, count occurrences in a map, record seen
    // words in a set: the shape of a compiled text-processing program.
    unsafe {
        let line = string_from(c("the quick the lazy the dog").as_ptr());
        let words = string_split(line, c(" ").as_ptr());
        assert_eq!((*words).len, 6);

        let counts = hashmap_new();
        let seen = hashset_new();
        for i in 0..(*words).len {
            let word = *(*words).data.add(i);
            // Key words by their length for the integer-keyed map
            let key = string_len(word);
            let current = hashmap_get(counts, key);
            hashmap_insert(counts, key, current + 1);
            hashset_insert(seen, key);
        }

        // "the" (3), "quick"/"lazy" -- lengths 3,5,3,4,3,3
        assert_eq!(hashmap_get(counts, 3), 4);
        assert_eq!(hashmap_get(counts, 5), 1);
        assert_eq!(hashmap_get(counts, 4), 1);
        assert_eq!(hashmap_get(counts, 9), 0);
        assert!(hashset_contains(seen, 3));
        assert!(!hashset_contains(seen, 9));

        string_array_free(words);
        string_free(line);
        hashmap_free(counts);
        hashset_free(seen);
    }
}

#[test]
fn test_report_formatting_pipeline() {
    unsafe {
        let vec = vec_f32_new();
        for v in [1.5f32, 2.0, 0.5] {
            vec_f32_push(vec, v);
        }
        let total = vec_f32_simd_sum(vec);
        let report = string_format_f32(c("total={}").as_ptr(), total);
        assert_eq!(string_text(report), "total=4");

        let labeled = string_format(c("sum: {}").as_ptr(), string_as_str(report));
        assert_eq!(string_text(labeled), "sum: total=4");

        vec_f32_free(vec);
        string_free(report);
        string_free(labeled);
    }
}

#[test]
fn test_file_round_trip_through_string_ops() {
    unsafe {
        let dir = tempfile::TempDir::new().unwrap();
        let path = c(dir.path().join("report.txt").to_str().unwrap());

        let out = file_create(path.as_ptr());
        assert!(!out.is_null());
        let header = string_format_i32(c("count={}").as_ptr(), 3);
        file_write(out, string_as_str(header));
        file_write(out, c"\nalpha,beta,gamma\n".as_ptr());
        string_free(header);
        file_free(out);

        assert_eq!(file_exists(path.as_ptr()), 1);
        assert_eq!(file_size(path.as_ptr()), 25);

        let input = file_open(path.as_ptr(), c("r").as_ptr());
        let first = file_read_line(input);
        assert_eq!(CStr::from_ptr(first).to_bytes(), b"count=3");

        let second = file_read_line(input);
        let row = string_from(second);
        let fields = string_split(row, c(",").as_ptr());
        assert_eq!((*fields).len, 3);
        assert_eq!(string_text(*(*fields).data.add(1)), "beta");

        string_concat_free(first);
        string_concat_free(second);
        string_free(row);
        string_array_free(fields);
        file_free(input);
    }
}

#[test]
fn test_parse_count_from_header() {
    unsafe {
        let header = string_from(c("count=42").as_ptr());
        let eq = string_find(header, c("=").as_ptr());
        assert_eq!(eq, 5);
        let value = string_substring(header, eq + 1, string_len(header));
        assert_eq!(string_to_i32(value), 42);
        string_free(header);
        string_free(value);
    }
}

#[test]
fn test_cli_defaults_without_init() {
    // This process never calls cli_init, so parsing sees an empty vector
    // and falls back to the defaults.
    unsafe {
        assert_eq!(get_command_line_arg_count(), 0);
        assert!(get_command_line_arg(0).is_null());
        assert!(get_command_line_args().is_null());
        assert_eq!(is_help_requested(), 0);

        let cli = parse_cli_args();
        assert!(!cli.is_null());
        assert_eq!(CStr::from_ptr((*cli).input_file).to_bytes(), b"input.pgm");
        assert_eq!(CStr::from_ptr((*cli).output_file).to_bytes(), b"output.pgm");
        assert_eq!(CStr::from_ptr((*cli).filter_type).to_bytes(), b"brightness");
        assert_eq!((*cli).brightness, 50);
        assert_eq!((*cli).valid, 1);
        free_cli_args(cli);
    }
}

#[test]
fn test_timing_wraps_work() {
    let start = get_time_microseconds();
    let mut acc = 0i64;
    for i in 0..1000 {
        acc += i;
    }
    let elapsed = get_time_microseconds() - start;
    assert!(acc > 0);
    assert!(elapsed >= 0);
    assert!(get_memory_usage() > 0);
}

#[test]
fn test_null_tolerance_across_components() {
    unsafe {
        vec_free(std::ptr::null_mut());
        vec_f32_free(std::ptr::null_mut());
        hashmap_free(std::ptr::null_mut());
        hashset_free(std::ptr::null_mut());
        string_free(std::ptr::null_mut());
        string_array_free(std::ptr::null_mut());
        file_free(std::ptr::null_mut());
        free_command_line_arg(std::ptr::null_mut());
        free_command_line_args(std::ptr::null_mut());
        free_cli_args(std::ptr::null_mut());

        assert!(vec_f32_simd_add(std::ptr::null_mut(), std::ptr::null_mut()).is_null());
        assert_eq!(string_equals(std::ptr::null_mut(), std::ptr::null_mut()), 1);
    }
}

#[test]
fn test_string_handles_cross_the_raw_boundary() {
    unsafe {
        let left: *const c_char = c"path/".as_ptr();
        let joined = string_concat(left, c"to/file".as_ptr());
        let s = string_from(joined);
        string_concat_free(joined);
        assert_eq!(string_text(s), "path/to/file");
        assert_eq!(string_starts_with(s, c("path").as_ptr()), 1);
        assert_eq!(string_ends_with(s, c("file").as_ptr()), 1);
        string_free(s);
    }
}
