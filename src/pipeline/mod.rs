//! Pipeline stages for PDF-to-JSON parsing.
//!
//! Each submodule implements exactly one step. The collaborators with I/O
//! (rendering, detection) sit behind traits so the assembler can be driven
//! with in-memory fakes.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ partition ──▶ assemble ──┬──▶ ParsedDocument
//! (path)    (elements)    (state     │
//!                          machine)  └──▶ per table: render ──▶ encode ──▶ detect ──▶ table::reconstruct
//!                                                   (pdfium)   (base64)   (HTTP)
//! ```
//!
//! 1. [`input`]     — validate the PDF path, derive the output path
//! 2. [`partition`] — element stream from a JSON export or a remote partitioner
//! 3. [`assemble`]  — page tracking, repetition filter, table dispatch
//! 4. [`render`]    — crop one page region to PNG; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 5. [`encode`]    — base64-wrap the PNG for the request body
//! 6. [`detect`]    — table-detection call with retry/backoff

pub mod assemble;
pub mod detect;
pub mod encode;
pub mod input;
pub mod partition;
pub mod render;
