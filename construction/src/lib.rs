// Tekton construction engine - main library exports

mod build;
mod fees;
mod parse;
mod service;
mod signers;
mod size;
mod translate;
mod witness;

pub use build::*;
pub use fees::*;
pub use parse::*;
pub use service::*;
pub use signers::*;
pub use size::*;
pub use translate::*;
pub use witness::*;
