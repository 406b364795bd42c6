pub mod checksums;
pub mod flatten;
pub mod sample;
pub mod summarize;
pub mod sync_dictionary;
pub mod validate;
