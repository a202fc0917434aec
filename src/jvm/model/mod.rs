//! Classes under construction, along with their fields and methods
//!
//! A [`Class`] owns the constants pool. Fields and methods are added through the class, which
//! hands back a [`FieldBuilder`] or [`MethodBuilder`] borrowing both the member and the pool.

mod class;
mod field;
mod method;

pub use class::*;
pub use field::*;
pub use method::*;
