pub mod core;
pub mod extract;
pub mod fetch;
pub mod rank;
pub mod sources;

// --- Primary core exports ---
pub use core::config;
pub use core::types;
pub use core::types::*;
pub use core::AppState;

// --- Shorthand module paths ---
pub use extract::decode;
pub use fetch::{FetchError, FetchedPage};
