//! Rill runtime library.
//!
//! Provides the native runtime functions required by Rill's compiled
//! output:
//! - Growable vectors over `i32` and `f32`, with the `simd_*` reductions
//!   (`vec_*`, `vec_f32_*`)
//! - Open-addressed `i32 -> i32` hash map (`hashmap_*`)
//! - Chained `i32` hash set (`hashset_*`)
//! - Mutable NUL-terminated strings and text operations (`string_*`)
//! - Buffered file handles (`file_*`)
//! - Process services: argument capture, flag parsing, timing, exit
//!   helpers (`cli_*`, `get_*`, `parse_cli_args`, ...)
//!
//! Every entry point is `extern "C"`; handles cross the boundary as raw
//! pointers and every operation tolerates a null handle. Errors travel
//! in-band (null, 0, or -1), never as panics.

pub mod array;
pub mod cli;
pub mod file;
pub mod hashmap;
pub mod hashset;
pub mod string;
pub mod vec;
pub mod vec_f32;

pub use array::RawBuf;
pub use cli::*;
pub use file::*;
pub use hashmap::*;
pub use hashset::*;
pub use string::*;
pub use vec::*;
pub use vec_f32::*;
