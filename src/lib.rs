//! Vision: a block-structured scripting notation with pluggable vocabulary.
//!
//! Source text is compiled against a [`Vocabulary`] into an immutable
//! [`Program`], which a [`Script`] then runs hat by hat:
//!
//! ```
//! use std::sync::Arc;
//! use vision::{compile, Script, SourceFile, Vocabulary};
//!
//! let file = SourceFile::new("main", "when started\n\tprint [Hello World]\nend");
//! let program = compile(Arc::new(Vocabulary::standard()), &[file]).unwrap();
//! let mut script = Script::new(program);
//! assert!(script.start().is_empty());
//! assert_eq!(script.output_log(), "Hello World");
//! ```
//!
//! For WASM hosts the crate also exposes three C-ABI functions:
//!
//! | Function | Description |
//! |---|---|
//! | `vision_alloc(size) -> *mut u8` | Allocate `size` bytes; JS writes source here |
//! | `vision_free(ptr, size)` | Free a buffer previously returned by this module |
//! | `vision_run(src_ptr, src_len) -> *mut u8` | Run a program; returns `[u32-le len][utf-8 bytes]` |
//!
//! On WASM the `random from [] to []` reporter needs a `js_math_random`
//! import from the host.
pub mod compiler;
pub mod error;
pub mod expression;
pub mod functions;
pub mod interpreter;
pub mod lexer;
pub mod object;
pub mod params;
pub mod pattern;
pub mod program;
pub mod source;
pub mod vocabulary;

use std::alloc::{alloc, dealloc, Layout};
use std::sync::Arc;

pub use compiler::compile;
pub use error::{CompileError, CompileLog, Diagnostic, Result, RuntimeError, SourceRange};
pub use interpreter::{Script, ScriptOptions, DEFAULT_HAT, DEFAULT_MAX_CALL_DEPTH};
pub use object::Object;
pub use params::{BlockParams, Params};
pub use program::Program;
pub use source::SourceFile;
pub use vocabulary::{CBlockFn, CommandFn, ReporterFn, Vocabulary};

// ---------------------------------------------------------------------------
// Exported C-ABI surface
// ---------------------------------------------------------------------------

/// Allocate a byte buffer of `size` bytes and return its pointer.
/// The caller is responsible for freeing it with `vision_free`.
#[no_mangle]
pub extern "C" fn vision_alloc(size: usize) -> *mut u8 {
    let layout = Layout::from_size_align(size, 1).expect("invalid layout");
    unsafe { alloc(layout) }
}

/// Free a buffer previously returned by `vision_alloc` or `vision_run`.
#[no_mangle]
pub extern "C" fn vision_free(ptr: *mut u8, size: usize) {
    if ptr.is_null() || size == 0 {
        return;
    }
    let layout = Layout::from_size_align(size, 1).expect("invalid layout");
    unsafe { dealloc(ptr, layout) };
}

/// Compile and start a single-file program.
///
/// * `src_ptr`: pointer to UTF-8 encoded source (allocated by `vision_alloc`).
/// * `src_len`: byte length of the source.
///
/// Returns a pointer to a buffer with layout:
/// ```text
/// [4 bytes little-endian u32 = output_len][output_len bytes of UTF-8]
/// ```
/// The caller must free the returned pointer with `vision_free(ptr, 4 + output_len)`.
#[no_mangle]
pub extern "C" fn vision_run(src_ptr: *const u8, src_len: usize) -> *mut u8 {
    let source = unsafe {
        let slice = std::slice::from_raw_parts(src_ptr, src_len);
        std::str::from_utf8(slice).unwrap_or("")
    };

    let output = run_source(source);
    let out_bytes = output.as_bytes();
    let total = 4 + out_bytes.len();

    let layout = Layout::from_size_align(total, 1).expect("invalid layout");
    let ptr = unsafe { alloc(layout) };

    let len_bytes = (out_bytes.len() as u32).to_le_bytes();
    unsafe {
        std::ptr::copy_nonoverlapping(len_bytes.as_ptr(), ptr, 4);
        std::ptr::copy_nonoverlapping(out_bytes.as_ptr(), ptr.add(4), out_bytes.len());
    }

    ptr
}

// ---------------------------------------------------------------------------
// Internal engine
// ---------------------------------------------------------------------------

/// Compile `source` as a file named `main` with the standard vocabulary,
/// run its `when started` hats and return everything they printed.
///
/// Failures are appended to the output as `[compile error] ...` or
/// `[error] ...` lines.
pub fn run_source(source: &str) -> String {
    let files = [SourceFile::new("main", source)];
    let program = match compile(Arc::new(Vocabulary::standard()), &files) {
        Ok(program) => program,
        Err(log) => return format!("[compile error] {}", log),
    };

    let mut script = Script::new(program);
    let errors = script.start();
    let mut lines: Vec<String> = script.output().to_vec();
    lines.extend(errors.iter().map(|e| format!("[error] {}", e)));
    lines.join("\n")
}
