pub mod selectors;
pub mod settings;

pub use selectors::SelectorConfig;
pub use settings::{CacheBackendKind, Settings};
