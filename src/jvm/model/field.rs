use crate::jvm::class_file::{
    AttributeValue, Attributes, Constant, ConstantEntry, ConstantsPool, Serialize, CONSTANT_VALUE,
};
use crate::jvm::{
    Error, FieldAccessFlags, FieldType, LegalFlags, Name, RenderDescriptor, UnqualifiedName,
};
use byteorder::WriteBytesExt;

/// Field of a class
#[derive(Debug)]
pub struct Field {
    name: UnqualifiedName,
    field_type: FieldType,
    access_flags: FieldAccessFlags,
    name_entry: ConstantEntry,
    descriptor_entry: ConstantEntry,

    /// Initial value, turned into a `ConstantValue` attribute when finalized
    constant_value: Option<ConstantEntry>,

    attributes: Attributes,
    finalized: bool,
}

impl Field {
    pub(crate) fn new(
        constants: &mut ConstantsPool,
        name: UnqualifiedName,
        field_type: FieldType,
        access_flags: FieldAccessFlags,
    ) -> Result<Field, Error> {
        let access_flags = access_flags.check_legal()?;
        let name_entry = constants.add_utf8(name.as_str())?;
        let descriptor_entry = constants.add_utf8(field_type.render())?;
        Ok(Field {
            name,
            field_type,
            access_flags,
            name_entry,
            descriptor_entry,
            constant_value: None,
            attributes: Attributes::new(),
            finalized: false,
        })
    }

    pub fn name(&self) -> &UnqualifiedName {
        &self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn access_flags(&self) -> FieldAccessFlags {
        self.access_flags
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub(crate) fn finalize(&mut self, constants: &mut ConstantsPool) -> Result<(), Error> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;
        if let Some(entry) = self.constant_value {
            self.attributes
                .add(constants, CONSTANT_VALUE, AttributeValue::Constant(entry))?;
        }
        Ok(())
    }

    pub(crate) fn serialize<W: WriteBytesExt>(
        &self,
        constants: &ConstantsPool,
        writer: &mut W,
    ) -> Result<(), Error> {
        self.access_flags.serialize(writer).map_err(Error::IoError)?;
        constants
            .index(self.name_entry)?
            .serialize(writer)
            .map_err(Error::IoError)?;
        constants
            .index(self.descriptor_entry)?
            .serialize(writer)
            .map_err(Error::IoError)?;
        self.attributes.serialize(constants, writer)
    }
}

/// Mutable handle on a field, paired with the pool of the class that owns it
pub struct FieldBuilder<'a> {
    field: &'a mut Field,
    constants: &'a mut ConstantsPool,
}

impl<'a> FieldBuilder<'a> {
    pub(crate) fn new(field: &'a mut Field, constants: &'a mut ConstantsPool) -> Self {
        FieldBuilder { field, constants }
    }

    pub fn field(&self) -> &Field {
        &*self.field
    }

    /// Set the constant the field is initialized to
    ///
    /// The constant should be an integer, float, long, double, or string matching the field type.
    pub fn set_constant_value(&mut self, constant: Constant) -> Result<(), Error> {
        if self.field.finalized {
            return Err(Error::MemberFinalized);
        }
        let entry = self.constants.add(constant)?;
        self.field.constant_value = Some(entry);
        Ok(())
    }

    /// Add (or replace) an attribute on the field
    pub fn add_attribute(
        &mut self,
        name: impl Into<String>,
        value: AttributeValue,
    ) -> Result<(), Error> {
        if self.field.finalized {
            return Err(Error::MemberFinalized);
        }
        self.field.attributes.add(self.constants, name, value)
    }
}
