/// Common test utilities for integration tests
///
/// This module provides shared functionality for integration tests including:
/// - Scratch files filled with recognizable content
/// - Byte-pattern verification helpers
/// - Observer event collection

pub mod fixtures;
pub mod test_helpers;
