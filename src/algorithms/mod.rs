pub mod pattern;
pub mod vsitr;


// Re-export the main erasure implementation
pub use pattern::{ErasurePattern, PatternError};
pub use vsitr::{EraseJob, EraseReport, SecureErase};
