//! Touch-tone sequence text decoding

mod text;

pub use text::{classify, multipress_to_text, two_key_to_text, DecodedText, SequenceKind};
