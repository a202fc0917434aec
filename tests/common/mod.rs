//! Minimal class file reader, used to check what the generator emits

#![allow(dead_code)]

use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEntry {
    Utf8(Vec<u8>),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
    NameAndType(u16, u16),

    /// Second slot of a long or double
    Unusable,
}

#[derive(Debug)]
pub struct Member {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<(u16, Vec<u8>)>,
}

#[derive(Debug)]
pub struct ParsedCode {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<[u16; 4]>,
    pub attributes: Vec<(u16, Vec<u8>)>,
}

#[derive(Debug)]
pub struct ParsedClass {
    pub minor_version: u16,
    pub major_version: u16,

    /// Entry `i` is pool index `i + 1`
    pub constants: Vec<PoolEntry>,

    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<Member>,
    pub methods: Vec<Member>,
    pub attributes: Vec<(u16, Vec<u8>)>,
}

impl ParsedClass {
    pub fn parse(bytes: &[u8]) -> Result<ParsedClass> {
        let mut reader = Cursor::new(bytes);
        let magic = reader.read_u32::<BigEndian>()?;
        assert_eq!(magic, 0xCAFEBABE, "bad magic");
        let minor_version = reader.read_u16::<BigEndian>()?;
        let major_version = reader.read_u16::<BigEndian>()?;

        let count = reader.read_u16::<BigEndian>()?;
        let mut constants = vec![];
        while constants.len() + 1 < count as usize {
            let entry = read_constant(&mut reader)?;
            let wide = matches!(entry, PoolEntry::Long(_) | PoolEntry::Double(_));
            constants.push(entry);
            if wide {
                constants.push(PoolEntry::Unusable);
            }
        }

        let access_flags = reader.read_u16::<BigEndian>()?;
        let this_class = reader.read_u16::<BigEndian>()?;
        let super_class = reader.read_u16::<BigEndian>()?;
        let interface_count = reader.read_u16::<BigEndian>()?;
        let interfaces = (0..interface_count)
            .map(|_| reader.read_u16::<BigEndian>())
            .collect::<Result<Vec<u16>>>()?;
        let fields = read_members(&mut reader)?;
        let methods = read_members(&mut reader)?;
        let attributes = read_attributes(&mut reader)?;

        assert_eq!(reader.position() as usize, bytes.len(), "trailing bytes");
        Ok(ParsedClass {
            minor_version,
            major_version,
            constants,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    pub fn constant(&self, index: u16) -> &PoolEntry {
        &self.constants[index as usize - 1]
    }

    pub fn utf8(&self, index: u16) -> String {
        match self.constant(index) {
            PoolEntry::Utf8(bytes) => String::from_utf8(bytes.clone()).expect("not plain UTF-8"),
            other => panic!("expected UTF-8 at #{}, found {:?}", index, other),
        }
    }

    pub fn class_name(&self, index: u16) -> String {
        match self.constant(index) {
            PoolEntry::Class(name) => self.utf8(*name),
            other => panic!("expected class at #{}, found {:?}", index, other),
        }
    }

    pub fn attribute<'a>(&self, attributes: &'a [(u16, Vec<u8>)], name: &str) -> Option<&'a [u8]> {
        attributes
            .iter()
            .find(|(name_index, _)| self.utf8(*name_index) == name)
            .map(|(_, info)| info.as_slice())
    }

    pub fn method(&self, name: &str) -> &Member {
        self.methods
            .iter()
            .find(|method| self.utf8(method.name_index) == name)
            .unwrap_or_else(|| panic!("no method {}", name))
    }

    pub fn code(&self, name: &str) -> ParsedCode {
        let method = self.method(name);
        let info = self
            .attribute(&method.attributes, "Code")
            .unwrap_or_else(|| panic!("method {} has no code", name));
        ParsedCode::parse(info).expect("malformed code attribute")
    }
}

impl ParsedCode {
    pub fn parse(info: &[u8]) -> Result<ParsedCode> {
        let mut reader = Cursor::new(info);
        let max_stack = reader.read_u16::<BigEndian>()?;
        let max_locals = reader.read_u16::<BigEndian>()?;
        let code_length = reader.read_u32::<BigEndian>()?;
        let mut code = vec![0; code_length as usize];
        reader.read_exact(&mut code)?;
        let handler_count = reader.read_u16::<BigEndian>()?;
        let mut exception_table = vec![];
        for _ in 0..handler_count {
            let mut handler = [0; 4];
            for value in &mut handler {
                *value = reader.read_u16::<BigEndian>()?;
            }
            exception_table.push(handler);
        }
        let attributes = read_attributes(&mut reader)?;
        assert_eq!(reader.position() as usize, info.len(), "trailing code bytes");
        Ok(ParsedCode {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes,
        })
    }
}

fn read_constant(reader: &mut Cursor<&[u8]>) -> Result<PoolEntry> {
    let tag = reader.read_u8()?;
    let entry = match tag {
        1 => {
            let len = reader.read_u16::<BigEndian>()?;
            let mut bytes = vec![0; len as usize];
            reader.read_exact(&mut bytes)?;
            PoolEntry::Utf8(bytes)
        }
        3 => PoolEntry::Integer(reader.read_i32::<BigEndian>()?),
        4 => PoolEntry::Float(reader.read_u32::<BigEndian>()?),
        5 => PoolEntry::Long(reader.read_i64::<BigEndian>()?),
        6 => PoolEntry::Double(reader.read_u64::<BigEndian>()?),
        7 => PoolEntry::Class(reader.read_u16::<BigEndian>()?),
        8 => PoolEntry::String(reader.read_u16::<BigEndian>()?),
        9 | 10 | 11 | 12 => {
            let first = reader.read_u16::<BigEndian>()?;
            let second = reader.read_u16::<BigEndian>()?;
            match tag {
                9 => PoolEntry::FieldRef(first, second),
                10 => PoolEntry::MethodRef(first, second),
                11 => PoolEntry::InterfaceMethodRef(first, second),
                _ => PoolEntry::NameAndType(first, second),
            }
        }
        other => panic!("unknown constant tag {}", other),
    };
    Ok(entry)
}

fn read_members(reader: &mut Cursor<&[u8]>) -> Result<Vec<Member>> {
    let count = reader.read_u16::<BigEndian>()?;
    (0..count)
        .map(|_| {
            Ok(Member {
                access_flags: reader.read_u16::<BigEndian>()?,
                name_index: reader.read_u16::<BigEndian>()?,
                descriptor_index: reader.read_u16::<BigEndian>()?,
                attributes: read_attributes(reader)?,
            })
        })
        .collect()
}

fn read_attributes(reader: &mut Cursor<&[u8]>) -> Result<Vec<(u16, Vec<u8>)>> {
    let count = reader.read_u16::<BigEndian>()?;
    (0..count)
        .map(|_| {
            let name_index = reader.read_u16::<BigEndian>()?;
            let len = reader.read_u32::<BigEndian>()?;
            let mut info = vec![0; len as usize];
            reader.read_exact(&mut info)?;
            Ok((name_index, info))
        })
        .collect()
}
