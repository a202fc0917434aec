mod attribute;
mod constants;
mod serialize;
mod version;

pub use attribute::*;
pub use constants::*;
pub use serialize::*;
pub use version::*;
