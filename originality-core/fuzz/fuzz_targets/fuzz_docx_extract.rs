#![no_main]

//! Fuzz target for DOCX text extraction from untrusted uploads.
//!
//! Run with: cargo +nightly fuzz run fuzz_docx_extract

use libfuzzer_sys::fuzz_target;
use originality_core::text::{extract_text, SourceFormat};

fuzz_target!(|data: &[u8]| {
    let _ = extract_text(data, SourceFormat::Docx);
});
