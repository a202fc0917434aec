use super::class_file::Serialize;
use super::Error;
use bitflags::bitflags;
use byteorder::WriteBytesExt;
use std::io::Result;

bitflags! {
    /// Access flags on classes
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.1-200-E.1
    pub struct ClassAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

bitflags! {
    /// Access flags on methods
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.6-200-A.1
    pub struct MethodAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

bitflags! {
    /// Access flags on fields
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.5-200-A.1
    pub struct FieldAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const SYNTHETIC = 0x1000;
        const ENUM = 0x4000;
    }
}

/// Access flags that are allowed on the members this crate generates
///
/// Anything outside the legal set (synthetic, enum, bridge, ...) belongs to class file versions
/// newer than the 45.3 format this crate targets by default.
pub trait LegalFlags: Sized + Copy {
    /// Kind of declaration (used in error messages)
    const KIND: &'static str;

    /// Bits which may be set
    const LEGAL: u16;

    fn raw_bits(&self) -> u16;

    /// Reject flags with bits outside the legal set
    fn check_legal(self) -> std::result::Result<Self, Error> {
        let illegal = self.raw_bits() & !Self::LEGAL;
        if illegal != 0 {
            Err(Error::IllegalAccessFlags {
                kind: Self::KIND,
                flags: self.raw_bits(),
                illegal,
            })
        } else {
            Ok(self)
        }
    }
}

impl LegalFlags for ClassAccessFlags {
    const KIND: &'static str = "class";
    const LEGAL: u16 = ClassAccessFlags::PUBLIC.bits()
        | ClassAccessFlags::FINAL.bits()
        | ClassAccessFlags::SUPER.bits()
        | ClassAccessFlags::INTERFACE.bits()
        | ClassAccessFlags::ABSTRACT.bits();

    fn raw_bits(&self) -> u16 {
        self.bits()
    }
}

impl LegalFlags for MethodAccessFlags {
    const KIND: &'static str = "method";
    const LEGAL: u16 = MethodAccessFlags::PUBLIC.bits()
        | MethodAccessFlags::PRIVATE.bits()
        | MethodAccessFlags::PROTECTED.bits()
        | MethodAccessFlags::STATIC.bits()
        | MethodAccessFlags::FINAL.bits()
        | MethodAccessFlags::SYNCHRONIZED.bits()
        | MethodAccessFlags::NATIVE.bits()
        | MethodAccessFlags::ABSTRACT.bits()
        | MethodAccessFlags::STRICT.bits();

    fn raw_bits(&self) -> u16 {
        self.bits()
    }
}

impl LegalFlags for FieldAccessFlags {
    const KIND: &'static str = "field";
    const LEGAL: u16 = FieldAccessFlags::PUBLIC.bits()
        | FieldAccessFlags::PRIVATE.bits()
        | FieldAccessFlags::PROTECTED.bits()
        | FieldAccessFlags::STATIC.bits()
        | FieldAccessFlags::FINAL.bits()
        | FieldAccessFlags::VOLATILE.bits()
        | FieldAccessFlags::TRANSIENT.bits();

    fn raw_bits(&self) -> u16 {
        self.bits()
    }
}

impl Serialize for ClassAccessFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.bits().serialize(writer)
    }
}

impl Serialize for MethodAccessFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.bits().serialize(writer)
    }
}

impl Serialize for FieldAccessFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.bits().serialize(writer)
    }
}
