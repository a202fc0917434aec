use crate::jvm::class_file::{ConstantEntry, ConstantsPool, Serialize};
use crate::jvm::Error;
use byteorder::WriteBytesExt;

/// Name of the attribute holding a field's constant initializer
pub const CONSTANT_VALUE: &str = "ConstantValue";

/// Name of the attribute holding the source file a class was compiled from
pub const SOURCE_FILE: &str = "SourceFile";

/// Attribute with its name already resolved to a pool index
///
/// This is the form attributes take once the pool is stable, right before being written out.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7
#[derive(Debug)]
pub struct Attribute {
    pub name_index: u16,
    pub info: Vec<u8>,
}

impl Serialize for Attribute {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.name_index.serialize(writer)?;

        // Attribute info length is 4 bytes
        (self.info.len() as u32).serialize(writer)?;
        writer.write_all(&self.info)?;

        Ok(())
    }
}

/// Attributes are all stored in the same way (see `Attribute`), but internally
/// they represent very different things. This trait is implemented by things
/// which can be turned into attributes.
pub trait AttributeLike: Serialize {
    /// Name of the attribute
    const NAME: &'static str;
}

/// Payload of an attribute before the pool is stable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// Raw bytes
    Bytes(Vec<u8>),

    /// Shorthand for a payload of exactly one pool index
    Constant(ConstantEntry),
}

/// Ordered collection of named attributes, as found on classes, fields, methods, and code
///
/// Names are interned into the pool when added. Adding an attribute under a name that is already
/// present replaces the previous payload in place.
#[derive(Debug, Default)]
pub struct Attributes {
    entries: Vec<(String, ConstantEntry, AttributeValue)>,
}

impl Attributes {
    pub fn new() -> Attributes {
        Attributes { entries: vec![] }
    }

    /// Add (or replace) an attribute
    pub fn add(
        &mut self,
        constants: &mut ConstantsPool,
        name: impl Into<String>,
        value: AttributeValue,
    ) -> Result<(), Error> {
        let name = name.into();
        let name_entry = constants.add_utf8(name.as_str())?;
        if let Some(existing) = self.entries.iter_mut().find(|(n, _, _)| *n == name) {
            existing.2 = value;
        } else {
            if self.entries.len() >= u16::MAX as usize {
                return Err(Error::TooManyMembers("attributes"));
            }
            self.entries.push((name, name_entry, value));
        }
        Ok(())
    }

    /// Add (or replace) a structured attribute, serializing it to bytes
    pub fn add_attribute<A: AttributeLike>(
        &mut self,
        constants: &mut ConstantsPool,
        attribute: &A,
    ) -> Result<(), Error> {
        let mut info = vec![];
        attribute.serialize(&mut info).map_err(Error::IoError)?;
        self.add(constants, A::NAME, AttributeValue::Bytes(info))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _, _)| n == name)
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.entries
            .iter()
            .find(|(n, _, _)| n == name)
            .map(|(_, _, value)| value)
    }

    /// Number of attributes
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve names and pool-reference payloads into indices
    pub fn resolve(&self, constants: &ConstantsPool) -> Result<Vec<Attribute>, Error> {
        self.entries
            .iter()
            .map(|(_, name_entry, value)| {
                let name_index = constants.index(*name_entry)?;
                let info = match value {
                    AttributeValue::Bytes(bytes) => bytes.clone(),
                    AttributeValue::Constant(entry) => {
                        constants.index(*entry)?.to_be_bytes().to_vec()
                    }
                };
                Ok(Attribute { name_index, info })
            })
            .collect()
    }

    /// Write the attribute count followed by every attribute
    pub fn serialize<W: WriteBytesExt>(
        &self,
        constants: &ConstantsPool,
        writer: &mut W,
    ) -> Result<(), Error> {
        self.resolve(constants)?
            .serialize(writer)
            .map_err(Error::IoError)
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.3
#[derive(Debug)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code_array: BytecodeArray,
    pub exception_table: Vec<ExceptionHandler>,
    pub attributes: Vec<Attribute>,
}

impl Serialize for Code {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.max_stack.serialize(writer)?;
        self.max_locals.serialize(writer)?;
        self.code_array.serialize(writer)?;
        self.exception_table.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

impl AttributeLike for Code {
    const NAME: &'static str = "Code";
}

#[derive(Debug, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Start of exception handler range (inclusive)
    pub start_pc: u16,

    /// End of exception handler range (exclusive)
    pub end_pc: u16,

    /// Start of the exception handler
    pub handler_pc: u16,

    /// Class of exceptions caught, or 0 to catch everything
    pub catch_type: u16,
}

impl Serialize for ExceptionHandler {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.start_pc.serialize(writer)?;
        self.end_pc.serialize(writer)?;
        self.handler_pc.serialize(writer)?;
        self.catch_type.serialize(writer)?;
        Ok(())
    }
}

/// Encoded bytecode instructions
#[derive(Debug)]
pub struct BytecodeArray(pub Vec<u8>);

impl Serialize for BytecodeArray {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        let len = self.0.len() as u32;
        len.serialize(writer)?;
        writer.write_all(&self.0)?;
        Ok(())
    }
}

/// Checked exceptions a method declares, as class constant indices
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.5
#[derive(Debug)]
pub struct Exceptions(pub Vec<u16>);

impl Serialize for Exceptions {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl AttributeLike for Exceptions {
    const NAME: &'static str = "Exceptions";
}
