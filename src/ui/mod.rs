pub mod progress;

#[cfg(test)]
mod progress_tests;

pub use progress::ConsoleObserver;
