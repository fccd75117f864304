// Tekton common library - main library exports

pub mod address;
pub mod crypto;
pub mod error;
pub mod operations;
pub mod protocol;
pub mod types;

// Flattened re-exports
pub use self::error::ConstructionError;
pub use self::types::*;
