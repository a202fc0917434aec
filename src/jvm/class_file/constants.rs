use crate::jvm::class_file::Serialize;
use crate::jvm::descriptors::RenderDescriptor;
use crate::jvm::names::Name;
use crate::jvm::{Error, FieldType, MethodDescriptor, RefType, UnqualifiedName};
use crate::util::{Offset, OffsetVec, Width};
use byteorder::WriteBytesExt;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::result::Result;

/// Constants as they are requested by callers
///
/// Equality is structural, so separately constructed but equal constants are collapsed into one
/// pool entry. Floating point values are stored as their bit patterns so that `NaN`s and signed
/// zeros are kept distinct and the type can be hashed.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.4
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum Constant {
    /// Raw string value
    ///
    /// Despite the name, the encoding is not quite UTF-8 (the encoding of the null character
    /// `\u{0000}` and the encoding of supplementary characters is different).
    Utf8(String),

    /// Constant primitive of type `int`
    Integer(i32),

    /// Constant primitive of type `float`, as its IEEE-754 bits
    Float(u32),

    /// Constant primitive of type `long`
    Long(i64),

    /// Constant primitive of type `double`, as its IEEE-754 bits
    Double(u64),

    /// Class, interface, or array type
    Class(RefType),

    /// Constant object of type `java.lang.String`
    String(String),

    FieldRef(MemberRef),
    MethodRef(MemberRef),
    InterfaceMethodRef(MemberRef),

    /// Name and a type (eg. for a field or a method)
    NameAndType(NameAndType),
}

impl Constant {
    pub fn float(value: f32) -> Constant {
        Constant::Float(value.to_bits())
    }

    pub fn double(value: f64) -> Constant {
        Constant::Double(value.to_bits())
    }

    /// Tag byte used in the class file
    pub fn tag(&self) -> u8 {
        match self {
            Constant::Utf8(_) => 1,
            Constant::Integer(_) => 3,
            Constant::Float(_) => 4,
            Constant::Long(_) => 5,
            Constant::Double(_) => 6,
            Constant::Class(_) => 7,
            Constant::String(_) => 8,
            Constant::FieldRef(_) => 9,
            Constant::MethodRef(_) => 10,
            Constant::InterfaceMethodRef(_) => 11,
            Constant::NameAndType(_) => 12,
        }
    }

    /// Can this be pushed with `ldc`/`ldc_w`?
    pub fn is_narrow_loadable(&self) -> bool {
        matches!(
            self,
            Constant::Integer(_) | Constant::Float(_) | Constant::String(_) | Constant::Class(_)
        )
    }

    /// Can this be pushed with `ldc2_w`?
    pub fn is_wide_loadable(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }
}

/// Long and double constants take up two slots in the pool
impl Width for Constant {
    fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct NameAndType {
    pub name: String,
    pub descriptor: String,
}

impl NameAndType {
    pub fn field(name: &UnqualifiedName, field_type: &FieldType) -> NameAndType {
        NameAndType {
            name: String::from(name.as_str()),
            descriptor: field_type.render(),
        }
    }

    pub fn method(name: &UnqualifiedName, descriptor: &MethodDescriptor) -> NameAndType {
        NameAndType {
            name: String::from(name.as_str()),
            descriptor: descriptor.render(),
        }
    }
}

/// Field, method, or interface method reference
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct MemberRef {
    pub class: RefType,
    pub name_and_type: NameAndType,
}

/// Handle to an entry of a [`ConstantsPool`]
///
/// Handles are valid for the lifetime of the pool which produced them. The final pool index of
/// the entry is only known once the pool is stable (see [`ConstantsPool::index`]).
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ConstantEntry(usize);

/// Lifecycle of a [`ConstantsPool`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PoolState {
    /// Entries can be added, indices are not yet assigned
    Open,

    /// Indices are assigned, new entries get the next free index immediately
    Stable,

    /// No more entries can be added
    Sealed,
}

/// Pool entries referenced by a composite constant
#[derive(Debug)]
enum Children {
    None,
    One(ConstantEntry),
    Two(ConstantEntry, ConstantEntry),
}

#[derive(Debug)]
struct PoolSlot {
    constant: Constant,
    children: Children,

    /// Number of times this was added (including as a child) while the pool was open
    references: u32,

    /// Final index, set once the pool is stable
    index: Option<u16>,
}

/// Entry in the final index layout
#[derive(Debug)]
struct LaidOut {
    entry: ConstantEntry,
    width: usize,
}

impl Width for LaidOut {
    fn width(&self) -> usize {
        self.width
    }
}

/// Class file constants pool builder
///
/// Constants are deduplicated as they are added, but their indices are only decided when the
/// pool is stabilized (either in insertion order with [`ConstantsPool::stabilize`] or by
/// descending number of references with [`ConstantsPool::optimize`]). After that point, new
/// constants are still accepted and get the next free index straight away, up until the pool is
/// sealed. Only a sealed pool can be serialized.
#[derive(Debug)]
pub struct ConstantsPool {
    slots: Vec<PoolSlot>,
    lookup: HashMap<Constant, ConstantEntry>,
    layout: OffsetVec<LaidOut>,
    state: PoolState,

    /// Next free slot (the value of `constant_pool_count`)
    next_slot: usize,
}

impl Default for ConstantsPool {
    fn default() -> ConstantsPool {
        ConstantsPool::new()
    }
}

impl ConstantsPool {
    /// Make a fresh empty constants pool
    pub fn new() -> ConstantsPool {
        ConstantsPool {
            slots: vec![],
            lookup: HashMap::new(),
            layout: OffsetVec::new_starting_at(Offset(1)),
            state: PoolState::Open,
            next_slot: 1,
        }
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    /// Number of distinct entries
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Next free slot, which is also the value written as `constant_pool_count`
    ///
    /// Index 0 is reserved and long/double entries take two slots, so this is `1 + N + 2 * M` for
    /// `N` single width entries and `M` double width ones.
    pub fn size(&self) -> u16 {
        self.next_slot as u16
    }

    /// Get or insert a constant into the constant pool
    ///
    /// Composite constants first add their children. While the pool is open, finding an existing
    /// constant bumps its reference count.
    pub fn add(&mut self, constant: Constant) -> Result<ConstantEntry, Error> {
        if self.state == PoolState::Sealed {
            return Err(Error::ConstantPoolSealed);
        }

        if let Some(&entry) = self.lookup.get(&constant) {
            if self.state == PoolState::Open {
                self.slots[entry.0].references += 1;
            }
            return Ok(entry);
        }

        let children = match &constant {
            Constant::Utf8(string) => {
                let encoded_len = encode_modified_utf8(string).len();
                if encoded_len > u16::MAX as usize {
                    return Err(Error::Utf8ConstantTooLong(encoded_len));
                }
                Children::None
            }
            Constant::Integer(_) | Constant::Float(_) | Constant::Long(_) | Constant::Double(_) => {
                Children::None
            }
            Constant::Class(ref_type) => Children::One(self.add_utf8(ref_type.internal_form())?),
            Constant::String(string) => Children::One(self.add_utf8(string.as_str())?),
            Constant::FieldRef(member)
            | Constant::MethodRef(member)
            | Constant::InterfaceMethodRef(member) => {
                let class = self.add(Constant::Class(member.class.clone()))?;
                let name_and_type = self.add(Constant::NameAndType(member.name_and_type.clone()))?;
                Children::Two(class, name_and_type)
            }
            Constant::NameAndType(name_and_type) => {
                let name = self.add_utf8(name_and_type.name.as_str())?;
                let descriptor = self.add_utf8(name_and_type.descriptor.as_str())?;
                Children::Two(name, descriptor)
            }
        };

        self.push_slot(constant, children)
    }

    /// Push a new slot, provided there is space for it
    ///
    /// Note: the largest valid index is 65535, indexing starts at 1, and some constants take two
    /// spaces.
    fn push_slot(&mut self, constant: Constant, children: Children) -> Result<ConstantEntry, Error> {
        let offset = self.next_slot;
        let width = constant.width();
        if offset + width > u16::MAX as usize {
            return Err(Error::ConstantPoolOverflow { constant, offset });
        }

        let entry = ConstantEntry(self.slots.len());
        let index = if self.state == PoolState::Stable {
            Some(self.layout.push(LaidOut { entry, width }).0 as u16)
        } else {
            None
        };

        self.lookup.insert(constant.clone(), entry);
        self.slots.push(PoolSlot {
            constant,
            children,
            references: 1,
            index,
        });
        self.next_slot += width;

        Ok(entry)
    }

    /// Get or insert a UTF-8 constant
    pub fn add_utf8(&mut self, utf8: impl Into<String>) -> Result<ConstantEntry, Error> {
        self.add(Constant::Utf8(utf8.into()))
    }

    /// Get or insert a name & type constant
    pub fn add_name_and_type(
        &mut self,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Result<ConstantEntry, Error> {
        self.add(Constant::NameAndType(NameAndType {
            name: name.into(),
            descriptor: descriptor.into(),
        }))
    }

    /// Get or insert a class constant
    pub fn add_class(&mut self, class: impl Into<RefType>) -> Result<ConstantEntry, Error> {
        self.add(Constant::Class(class.into()))
    }

    /// Get or insert a string constant
    pub fn add_string(&mut self, string: impl Into<String>) -> Result<ConstantEntry, Error> {
        self.add(Constant::String(string.into()))
    }

    /// Get or insert a field reference constant
    pub fn add_field_ref(
        &mut self,
        class: impl Into<RefType>,
        name: &UnqualifiedName,
        field_type: &FieldType,
    ) -> Result<ConstantEntry, Error> {
        self.add(Constant::FieldRef(MemberRef {
            class: class.into(),
            name_and_type: NameAndType::field(name, field_type),
        }))
    }

    /// Get or insert a (class) method reference constant
    pub fn add_method_ref(
        &mut self,
        class: impl Into<RefType>,
        name: &UnqualifiedName,
        descriptor: &MethodDescriptor,
    ) -> Result<ConstantEntry, Error> {
        self.add(Constant::MethodRef(MemberRef {
            class: class.into(),
            name_and_type: NameAndType::method(name, descriptor),
        }))
    }

    /// Get or insert an interface method reference constant
    pub fn add_interface_method_ref(
        &mut self,
        class: impl Into<RefType>,
        name: &UnqualifiedName,
        descriptor: &MethodDescriptor,
    ) -> Result<ConstantEntry, Error> {
        self.add(Constant::InterfaceMethodRef(MemberRef {
            class: class.into(),
            name_and_type: NameAndType::method(name, descriptor),
        }))
    }

    /// Look up a constant without inserting it
    pub fn get(&self, constant: &Constant) -> Option<ConstantEntry> {
        self.lookup.get(constant).copied()
    }

    /// Constant behind an entry
    pub fn constant(&self, entry: ConstantEntry) -> Option<&Constant> {
        self.slots.get(entry.0).map(|slot| &slot.constant)
    }

    /// Number of references recorded for an entry while the pool was open
    pub fn references(&self, entry: ConstantEntry) -> Option<u32> {
        self.slots.get(entry.0).map(|slot| slot.references)
    }

    /// Assign indices in insertion order
    ///
    /// This does nothing if the indices are already fixed.
    pub fn stabilize(&mut self) {
        if self.state != PoolState::Open {
            return;
        }
        let order: Vec<ConstantEntry> = (0..self.slots.len()).map(ConstantEntry).collect();
        self.lay_out(order);
        log::debug!(
            "Stabilized constant pool with {} entries ({} slots)",
            self.slots.len(),
            self.next_slot
        );
    }

    /// Assign indices so that the most referenced entries come first
    ///
    /// Low indices can be loaded with the shorter `ldc` instruction. Ties are broken by insertion
    /// order. This is only valid while the pool is still open.
    pub fn optimize(&mut self) -> Result<(), Error> {
        if self.state != PoolState::Open {
            return Err(Error::ConstantPoolAlreadyStable);
        }
        let mut order: Vec<ConstantEntry> = (0..self.slots.len()).map(ConstantEntry).collect();
        order.sort_by_key(|entry| (Reverse(self.slots[entry.0].references), *entry));
        self.lay_out(order);
        log::debug!(
            "Optimized constant pool with {} entries ({} slots)",
            self.slots.len(),
            self.next_slot
        );
        Ok(())
    }

    fn lay_out(&mut self, order: Vec<ConstantEntry>) {
        for entry in order {
            let slot = &mut self.slots[entry.0];
            let width = slot.constant.width();
            let Offset(index) = self.layout.push(LaidOut { entry, width });
            slot.index = Some(index as u16);
        }
        self.state = PoolState::Stable;
    }

    /// Forbid any further additions
    pub fn seal(&mut self) -> Result<(), Error> {
        match self.state {
            PoolState::Open => Err(Error::ConstantPoolNotStable),
            PoolState::Sealed => Err(Error::ConstantPoolSealed),
            PoolState::Stable => {
                self.state = PoolState::Sealed;
                log::debug!("Sealed constant pool at size {}", self.next_slot);
                Ok(())
            }
        }
    }

    /// Final index of an entry
    pub fn index(&self, entry: ConstantEntry) -> Result<u16, Error> {
        if self.state == PoolState::Open {
            return Err(Error::ConstantPoolNotStable);
        }
        let slot = self
            .slots
            .get(entry.0)
            .ok_or_else(|| Error::MissingConstant(format!("{:?}", entry)))?;
        slot.index.ok_or(Error::ConstantPoolNotStable)
    }

    /// Constant laid out at a pool index
    ///
    /// The second slot of a long or double (and every index before stabilization) has nothing.
    pub fn constant_at_index(&self, index: u16) -> Option<&Constant> {
        let laid_out = self.layout.get_offset(Offset(index as usize))?;
        self.constant(laid_out.entry)
    }

    /// Final index of a constant
    pub fn get_index(&self, constant: &Constant) -> Result<u16, Error> {
        if self.state == PoolState::Open {
            return Err(Error::ConstantPoolNotStable);
        }
        let entry = self
            .get(constant)
            .ok_or_else(|| Error::MissingConstant(format!("{:?}", constant)))?;
        self.index(entry)
    }

    /// Write out `constant_pool_count` followed by every entry in index order
    pub fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        if self.state != PoolState::Sealed {
            return Err(Error::ConstantPoolNotSealed);
        }
        self.size().serialize(writer).map_err(Error::IoError)?;
        for (_, laid_out) in &self.layout {
            self.serialize_slot(&self.slots[laid_out.entry.0], writer)?;
        }
        Ok(())
    }

    fn serialize_slot<W: WriteBytesExt>(&self, slot: &PoolSlot, writer: &mut W) -> Result<(), Error> {
        slot.constant.tag().serialize(writer).map_err(Error::IoError)?;
        match &slot.constant {
            Constant::Utf8(string) => {
                let buffer: Vec<u8> = encode_modified_utf8(string);
                (buffer.len() as u16)
                    .serialize(writer)
                    .map_err(Error::IoError)?;
                writer.write_all(&buffer).map_err(Error::IoError)?;
            }
            Constant::Integer(integer) => integer.serialize(writer).map_err(Error::IoError)?,
            Constant::Float(bits) => bits.serialize(writer).map_err(Error::IoError)?,
            Constant::Long(long) => long.serialize(writer).map_err(Error::IoError)?,
            Constant::Double(bits) => bits.serialize(writer).map_err(Error::IoError)?,
            _ => match slot.children {
                Children::None => (),
                Children::One(child) => {
                    self.index(child)?
                        .serialize(writer)
                        .map_err(Error::IoError)?;
                }
                Children::Two(first, second) => {
                    self.index(first)?
                        .serialize(writer)
                        .map_err(Error::IoError)?;
                    self.index(second)?
                        .serialize(writer)
                        .map_err(Error::IoError)?;
                }
            },
        }
        Ok(())
    }
}

/// Modified UTF-8 format used in class files.
///
/// See [this `DataInput` section for details][0]. Quoting from that section:
///
/// > The differences between this format and the standard UTF-8 format are the following:
/// >
/// >  * The null byte `\u0000` is encoded in 2-byte format rather than 1-byte, so that the encoded
/// >    strings never have embedded nulls.
/// >  * Only the 1-byte, 2-byte, and 3-byte formats are used.
/// >  * Supplementary characters are represented in the form of surrogate pairs.
///
/// [0]: https://docs.oracle.com/en/java/javase/17/docs/api/java.base/java/io/DataInput.html#modified-utf-8
pub fn encode_modified_utf8(string: &str) -> Vec<u8> {
    let mut buffer: Vec<u8> = Vec::with_capacity(string.len());
    let mut units = [0u16; 2];
    for c in string.chars() {
        if c != '\u{0000}' && c.len_utf8() <= 3 {
            let mut bytes = [0u8; 4];
            buffer.extend_from_slice(c.encode_utf8(&mut bytes).as_bytes());
            continue;
        }

        // Null and supplementary characters are written as 2 or 3 byte forms of UTF-16 units
        for unit in c.encode_utf16(&mut units).iter().copied() {
            if unit == 0 {
                buffer.extend_from_slice(&[0b1100_0000, 0b1000_0000]);
            } else {
                buffer.push((unit >> 12 & 0x0F) as u8 | 0b1110_0000);
                buffer.push((unit >> 6 & 0x3F) as u8 | 0b1000_0000);
                buffer.push((unit & 0x3F) as u8 | 0b1000_0000);
            }
        }
    }
    buffer
}
