//! Assemble JVM classes
//!
//! ### Simple example
//!
//! Consider the following simple Java class:
//!
//! ```java,ignore,no_run
//! public final class Counter {
//!     public static int count;
//!
//!     public static void main(String[] args) {
//!         count = 0;
//!         do {
//!             System.out.println(count);
//!         } while (++count < 10);
//!     }
//! }
//! ```
//!
//! Generating an analogous class file can be done as follows:
//!
//! ```
//! use classgen::jvm::code::opcodes::*;
//! use classgen::jvm::code::Operand;
//! use classgen::jvm::model::Class;
//! use classgen::jvm::*;
//!
//! # fn generate_class() -> Result<Vec<u8>, Error> {
//! let counter = BinaryName::from_string(String::from("Counter")).map_err(Error::InvalidName)?;
//! let count = UnqualifiedName::from_string(String::from("count")).map_err(Error::InvalidName)?;
//! let mut class = Class::new(
//!     counter.clone(),
//!     BinaryName::OBJECT,
//!     ClassAccessFlags::PUBLIC | ClassAccessFlags::FINAL | ClassAccessFlags::SUPER,
//! )?;
//!
//! class.add_field(
//!     count.clone(),
//!     FieldType::int(),
//!     FieldAccessFlags::PUBLIC | FieldAccessFlags::STATIC,
//! )?;
//!
//! let mut main = class.add_method(
//!     UnqualifiedName::MAIN,
//!     MethodDescriptor {
//!         parameters: vec![FieldType::array(FieldType::object(BinaryName::STRING))],
//!         return_type: None,
//!     },
//!     MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
//! )?;
//! let count_ref = main.field_ref(counter, &count, &FieldType::int())?;
//! let out_ref = main.field_ref(
//!     BinaryName::SYSTEM,
//!     &UnqualifiedName::OUT,
//!     &FieldType::object(BinaryName::PRINTSTREAM),
//! )?;
//! let println_ref = main.method_ref(
//!     BinaryName::PRINTSTREAM,
//!     &UnqualifiedName::PRINTLN,
//!     &MethodDescriptor {
//!         parameters: vec![FieldType::int()],
//!         return_type: None,
//!     },
//! )?;
//!
//! main.push_int(0)?;
//! main.append(PUTSTATIC, Operand::Constant(count_ref))?;
//! let top = main.append(GETSTATIC, Operand::Constant(out_ref))?;
//! main.append(GETSTATIC, Operand::Constant(count_ref))?;
//! main.append(INVOKEVIRTUAL, Operand::Constant(println_ref))?;
//! main.append(GETSTATIC, Operand::Constant(count_ref))?;
//! main.push_int(1)?;
//! main.append(IADD, Operand::None)?;
//! main.append(DUP, Operand::None)?;
//! main.append(PUTSTATIC, Operand::Constant(count_ref))?;
//! main.push_int(10)?;
//! main.append(IF_ICMPLT, Operand::Branch(top.into()))?;
//! main.append(RETURN, Operand::None)?;
//!
//! // Finally, encode the class into bytes
//! class.to_bytes()
//! # }
//! # generate_class().unwrap();
//! ```

mod access_flags;
pub mod class_file;
pub mod code;
mod descriptors;
mod errors;
pub mod model;
mod names;
pub mod registry;

pub use access_flags::*;
pub use descriptors::*;
pub use errors::*;
pub use names::*;
