//! Assemble JVM bytecode and emit binary class files
//!
//! The entry point is [`jvm::model::Class`]: declare fields and methods on it, fill in method
//! bodies through a [`jvm::model::MethodBuilder`], then serialize the whole thing into the exact
//! byte layout of a `.class` file.

pub mod jvm;
pub mod util;
