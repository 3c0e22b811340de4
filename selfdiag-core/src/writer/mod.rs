//! Memory-mapped circular log file.
//!
//! One fixed-size file per process, at `<directory>/<exe>.<pid>.log`, mapped
//! into memory and written as a ring: when the cursor reaches the end it
//! wraps to offset zero and overwrites the oldest records.
//!
//! # Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Successfully opened file.\n (written on every (re)create)    │
//! ├──────────────────────────────────────────────────────────────┤
//! │ record\n record\n record\n ...                   ← cursor    │
//! ├──────────────────────────────────────────────────────────────┤
//! │ (zeros until the first wrap, older records afterwards)       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Concurrency
//!
//! - The write cursor is advanced with a compare-and-swap loop; every claim
//!   gets a range no other claim overlaps until the cursor comes around.
//! - The file itself sits behind an atomically swapped `Arc`. Each thread
//!   caches a weak view tagged with the file's generation and re-validates
//!   the tag before every write.
//! - Closing swaps the file out first; the mapping is released when the
//!   last in-flight writer drops its strong reference.

mod circular;
mod file;

pub use circular::{CircularFileWriter, MAX_CAPACITY, SENTINEL};
pub use file::Claim;
