use super::{Field, FieldBuilder, Method, MethodBuilder};
use crate::jvm::class_file::{
    AttributeValue, Attributes, Constant, ConstantsPool, Serialize, Version, SOURCE_FILE,
};
use crate::jvm::{
    BinaryName, ClassAccessFlags, Error, FieldAccessFlags, FieldType, LegalFlags,
    MethodAccessFlags, MethodDescriptor, RefType, UnqualifiedName,
};
use byteorder::WriteBytesExt;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Class (or interface) being generated
///
/// The class owns the constants pool shared by all of its members. Serializing runs the pool
/// through its states: names and the source file get interned, the pool is stabilized (unless
/// it already was), every method is assembled, and the pool is sealed before anything is
/// written. After that the class can be serialized again, but no longer modified.
#[derive(Debug)]
pub struct Class {
    name: BinaryName,
    super_name: BinaryName,
    access_flags: ClassAccessFlags,
    version: Version,
    interfaces: Vec<BinaryName>,
    fields: Vec<Field>,
    methods: Vec<Method>,
    attributes: Attributes,
    source_file: Option<String>,
    constants: ConstantsPool,
    prepared: bool,
}

impl Class {
    /// Magic header bytes that go at the front of the serialized class file
    const MAGIC: [u8; 4] = [0xCA, 0xFE, 0xBA, 0xBE];

    pub fn new(
        name: BinaryName,
        super_name: BinaryName,
        access_flags: ClassAccessFlags,
    ) -> Result<Class, Error> {
        let access_flags = access_flags.check_legal()?;
        Ok(Class {
            name,
            super_name,
            access_flags,
            version: Version::default(),
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            attributes: Attributes::new(),
            source_file: None,
            constants: ConstantsPool::new(),
            prepared: false,
        })
    }

    pub fn name(&self) -> &BinaryName {
        &self.name
    }

    pub fn super_name(&self) -> &BinaryName {
        &self.super_name
    }

    pub fn access_flags(&self) -> ClassAccessFlags {
        self.access_flags
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }

    pub fn interfaces(&self) -> &[BinaryName] {
        &self.interfaces
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn constants(&self) -> &ConstantsPool {
        &self.constants
    }

    /// Direct access to the pool, for example to optimize it before serializing
    pub fn constants_mut(&mut self) -> &mut ConstantsPool {
        &mut self.constants
    }

    /// Record the source file name, emitted as a `SourceFile` attribute
    pub fn set_source_file(&mut self, source_file: impl Into<String>) {
        self.source_file = Some(source_file.into());
    }

    pub fn add_interface(&mut self, interface: BinaryName) -> Result<(), Error> {
        if self.interfaces.len() >= u16::MAX as usize {
            return Err(Error::TooManyMembers("interfaces"));
        }
        if !self.interfaces.contains(&interface) {
            self.interfaces.push(interface);
        }
        Ok(())
    }

    pub fn add_field(
        &mut self,
        name: UnqualifiedName,
        field_type: FieldType,
        access_flags: FieldAccessFlags,
    ) -> Result<FieldBuilder<'_>, Error> {
        if self.fields.len() >= u16::MAX as usize {
            return Err(Error::TooManyMembers("fields"));
        }
        let field = Field::new(&mut self.constants, name, field_type, access_flags)?;
        let index = self.fields.len();
        self.fields.push(field);
        Ok(FieldBuilder::new(
            &mut self.fields[index],
            &mut self.constants,
        ))
    }

    /// Add a method, returning a handle for writing its code
    pub fn add_method(
        &mut self,
        name: UnqualifiedName,
        descriptor: MethodDescriptor,
        access_flags: MethodAccessFlags,
    ) -> Result<MethodBuilder<'_>, Error> {
        if self.methods.len() >= u16::MAX as usize {
            return Err(Error::TooManyMembers("methods"));
        }
        let in_interface = self.is_interface();
        let method = Method::new(
            &mut self.constants,
            name,
            descriptor,
            access_flags,
            in_interface,
        )?;
        let index = self.methods.len();
        self.methods.push(method);
        Ok(MethodBuilder::new(
            &mut self.methods[index],
            &mut self.constants,
        ))
    }

    /// Handle on a previously added method
    pub fn method_builder(&mut self, index: usize) -> Option<MethodBuilder<'_>> {
        let constants = &mut self.constants;
        self.methods
            .get_mut(index)
            .map(|method| MethodBuilder::new(method, constants))
    }

    /// Handle on a previously added field
    pub fn field_builder(&mut self, index: usize) -> Option<FieldBuilder<'_>> {
        let constants = &mut self.constants;
        self.fields
            .get_mut(index)
            .map(|field| FieldBuilder::new(field, constants))
    }

    /// Add (or replace) a class attribute
    pub fn add_attribute(
        &mut self,
        name: impl Into<String>,
        value: AttributeValue,
    ) -> Result<(), Error> {
        self.attributes.add(&mut self.constants, name, value)
    }

    /// Intern everything the header needs, assemble all code, and seal the pool
    fn prepare(&mut self) -> Result<(), Error> {
        self.constants.add_class(self.name.clone())?;
        self.constants.add_class(self.super_name.clone())?;
        for interface in &self.interfaces {
            self.constants.add_class(interface.clone())?;
        }

        if let Some(source_file) = &self.source_file {
            if !self.attributes.contains(SOURCE_FILE) {
                let entry = self.constants.add_utf8(source_file.as_str())?;
                self.attributes.add(
                    &mut self.constants,
                    SOURCE_FILE,
                    AttributeValue::Constant(entry),
                )?;
            }
        }

        self.constants.stabilize();

        for method in &mut self.methods {
            method.finalize(&mut self.constants)?;
        }
        for field in &mut self.fields {
            field.finalize(&mut self.constants)?;
        }

        self.constants.seal()?;
        debug!(
            "Prepared class {} with {} constants, {} fields, and {} methods",
            self.name,
            self.constants.len(),
            self.fields.len(),
            self.methods.len()
        );
        Ok(())
    }

    /// Write the class file
    ///
    /// The first call finalizes the class. Later calls write the same bytes again.
    pub fn serialize<W: WriteBytesExt>(&mut self, writer: &mut W) -> Result<(), Error> {
        if !self.prepared {
            self.prepared = true;
            self.prepare()?;
        }
        self.write(writer)
    }

    fn write<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_all(&Class::MAGIC).map_err(Error::IoError)?;
        self.version.serialize(writer).map_err(Error::IoError)?;
        self.constants.serialize(writer)?;
        self.access_flags.serialize(writer).map_err(Error::IoError)?;

        let class_index = |name: &BinaryName| {
            self.constants
                .get_index(&Constant::Class(RefType::Object(name.clone())))
        };
        class_index(&self.name)?
            .serialize(writer)
            .map_err(Error::IoError)?;
        class_index(&self.super_name)?
            .serialize(writer)
            .map_err(Error::IoError)?;
        let interfaces = self
            .interfaces
            .iter()
            .map(class_index)
            .collect::<Result<Vec<u16>, Error>>()?;
        interfaces.serialize(writer).map_err(Error::IoError)?;

        (self.fields.len() as u16)
            .serialize(writer)
            .map_err(Error::IoError)?;
        for field in &self.fields {
            field.serialize(&self.constants, writer)?;
        }

        (self.methods.len() as u16)
            .serialize(writer)
            .map_err(Error::IoError)?;
        for method in &self.methods {
            method.serialize(&self.constants, writer)?;
        }

        self.attributes.serialize(&self.constants, writer)
    }

    /// Serialize the class into a fresh buffer
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, Error> {
        let mut bytes = vec![];
        self.serialize(&mut bytes)?;
        Ok(bytes)
    }

    /// Save the class file to disk
    ///
    /// The class is fully encoded before the file is created, so a failure never leaves a
    /// truncated file behind.
    pub fn save_to_path<P: AsRef<Path>>(
        &mut self,
        path: P,
        create_missing_directories: bool,
    ) -> Result<(), Error> {
        let bytes = self.to_bytes()?;
        let path = path.as_ref();
        if create_missing_directories {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(Error::IoError)?;
            }
        }
        fs::write(path, bytes).map_err(Error::IoError)
    }

    /// Save the class file under a root directory, in subdirectories following its package
    pub fn save_to_directory<P: AsRef<Path>>(&mut self, directory: P) -> Result<PathBuf, Error> {
        let path = directory.as_ref().join(self.name.class_file_path());
        self.save_to_path(&path, true)?;
        Ok(path)
    }
}
