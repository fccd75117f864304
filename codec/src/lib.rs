mod body;
mod certs;
mod envelope;
mod metadata;
mod utils;
mod value;
mod witness;

pub use body::*;
pub use certs::*;
pub use envelope::*;
pub use metadata::*;
pub use utils::*;
pub use value::*;
pub use witness::*;
