//! Top-level facade crate for promguard.
//!
//! Re-exports core types and the registry so users can depend on a single crate.

pub mod core {
    pub use promguard_core::*;
}

pub mod registry {
    pub use promguard_registry::*;
}
