//! Recognizer engine implementations

pub mod mock;
pub mod noop;

pub use mock::{MockRecognizer, MockRecognizerConfig, MockRecognizerFactory, MockUtterance};
pub use noop::{NoopRecognizer, NoopRecognizerFactory};
