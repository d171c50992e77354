#![no_main]

//! Fuzz target for the stored signature decoders.
//!
//! Any byte string may sit in the signature or embedding column of a
//! fingerprint row. Decoding and comparing must fail cleanly, never panic.
//!
//! Run with: cargo +nightly fuzz run fuzz_signature_blobs

use libfuzzer_sys::fuzz_target;
use originality_core::image::PerceptualHash;
use originality_core::text::{Embedding, MinHashSignature};

fuzz_target!(|data: &[u8]| {
    if let Ok(hash) = PerceptualHash::from_blob(data) {
        let _ = hash.hamming_distance(&hash);
    }
    if let Ok(signature) = MinHashSignature::from_blob(data) {
        let _ = signature.jaccard(&signature);
    }
    if let Ok(embedding) = Embedding::from_blob(data) {
        let _ = embedding.cosine(&embedding);
    }
});
