use super::{BinaryName, Error, Name};
use crate::util::Width;

/// Utility trait for converting descriptors to and from string representations
pub trait RenderDescriptor {
    /// Turn the descriptor into a string
    fn render(&self) -> String {
        let mut string = String::new();
        self.render_to(&mut string);
        string
    }

    /// Write the descriptor to a string
    fn render_to(&self, write_to: &mut String);
}

pub trait ParseDescriptor: Sized {
    /// Parse a descriptor, rejecting anything left over after it
    fn parse(source: &str) -> Result<Self, Error> {
        let mut reader = DescriptorReader::new(source);
        let parsed = Self::read(&mut reader)?;
        match reader.peek() {
            None => Ok(parsed),
            Some(c) => Err(reader.error(&format!("leftover '{}'", c))),
        }
    }

    /// Read one descriptor off the front of the reader
    fn read(reader: &mut DescriptorReader) -> Result<Self, Error>;
}

/// Cursor over a descriptor string
pub struct DescriptorReader<'a> {
    source: &'a str,
    position: usize,
}

impl<'a> DescriptorReader<'a> {
    pub fn new(source: &'a str) -> DescriptorReader<'a> {
        DescriptorReader {
            source,
            position: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.position..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += c.len_utf8();
        Some(c)
    }

    /// Consume `expected` if it is the next character
    fn eat(&mut self, expected: char) -> bool {
        let found = self.peek() == Some(expected);
        if found {
            self.position += expected.len_utf8();
        }
        found
    }

    /// Consume everything up to and including `terminator`, returning what came before it
    fn take_until(&mut self, terminator: char) -> Result<&'a str, Error> {
        let rest = &self.source[self.position..];
        let end = rest
            .find(terminator)
            .ok_or_else(|| self.error(&format!("missing '{}'", terminator)))?;
        self.position += end + terminator.len_utf8();
        Ok(&rest[..end])
    }

    fn error(&self, problem: &str) -> Error {
        Error::InvalidDescriptor(format!(
            "{} at offset {} of '{}'",
            problem, self.position, self.source
        ))
    }
}

/// Primitive value types
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

/// Number of local variable (or operand stack) slots a value of this type occupies
impl Width for BaseType {
    fn width(&self) -> usize {
        match self {
            BaseType::Double | BaseType::Long => 2,
            _ => 1,
        }
    }
}

impl RenderDescriptor for BaseType {
    fn render_to(&self, write_to: &mut String) {
        let c = match self {
            BaseType::Byte => 'B',
            BaseType::Char => 'C',
            BaseType::Double => 'D',
            BaseType::Float => 'F',
            BaseType::Int => 'I',
            BaseType::Long => 'J',
            BaseType::Short => 'S',
            BaseType::Boolean => 'Z',
        };
        write_to.push(c);
    }
}

impl BaseType {
    /// Base type for a descriptor character
    pub fn from_descriptor_char(c: char) -> Option<BaseType> {
        Some(match c {
            'B' => BaseType::Byte,
            'C' => BaseType::Char,
            'D' => BaseType::Double,
            'F' => BaseType::Float,
            'I' => BaseType::Int,
            'J' => BaseType::Long,
            'S' => BaseType::Short,
            'Z' => BaseType::Boolean,
            _ => return None,
        })
    }
}

/// Reference type
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum RefType {
    Object(BinaryName),
    ObjectArray(ArrayType<BinaryName>),
    PrimitiveArray(ArrayType<BaseType>),
}

/// Generic array type
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ArrayType<T> {
    /// Additional dimensions (`A[]` has 0 additional dimensions, `A[][][][]` has 3)
    pub additional_dimensions: usize,

    /// Underlying element type (`A` is the underlying element type of `A[][]`)
    pub element_type: T,
}

impl<T> ArrayType<T> {
    /// Total number of dimensions in the array type
    ///
    /// This is always just `additional_dimensions + 1`
    pub const fn dimensions(&self) -> usize {
        self.additional_dimensions + 1
    }
}

impl<T: RenderDescriptor> RenderDescriptor for ArrayType<T> {
    fn render_to(&self, write_to: &mut String) {
        for _ in 0..self.dimensions() {
            write_to.push('[');
        }
        self.element_type.render_to(write_to);
    }
}

impl RenderDescriptor for BinaryName {
    fn render_to(&self, write_to: &mut String) {
        write_to.push('L');
        write_to.push_str(self.as_str());
        write_to.push(';');
    }
}

impl RenderDescriptor for RefType {
    fn render_to(&self, write_to: &mut String) {
        match self {
            RefType::Object(cls) => cls.render_to(write_to),
            RefType::PrimitiveArray(arr) => arr.render_to(write_to),
            RefType::ObjectArray(arr) => arr.render_to(write_to),
        }
    }
}

impl ParseDescriptor for RefType {
    fn read(reader: &mut DescriptorReader) -> Result<Self, Error> {
        match FieldType::read(reader)? {
            FieldType::Ref(ref_type) => Ok(ref_type),
            FieldType::Base(_) => Err(reader.error("expected a reference type")),
        }
    }
}

impl From<BinaryName> for RefType {
    fn from(name: BinaryName) -> RefType {
        RefType::Object(name)
    }
}

impl RefType {
    /// Array whose elements have the given type
    pub fn array(field_type: FieldType) -> RefType {
        match field_type {
            FieldType::Base(element_type) => RefType::PrimitiveArray(ArrayType {
                additional_dimensions: 0,
                element_type,
            }),
            FieldType::Ref(RefType::Object(element_type)) => RefType::ObjectArray(ArrayType {
                additional_dimensions: 0,
                element_type,
            }),
            FieldType::Ref(RefType::PrimitiveArray(arr)) => RefType::PrimitiveArray(ArrayType {
                additional_dimensions: arr.additional_dimensions + 1,
                element_type: arr.element_type,
            }),
            FieldType::Ref(RefType::ObjectArray(arr)) => RefType::ObjectArray(ArrayType {
                additional_dimensions: arr.additional_dimensions + 1,
                element_type: arr.element_type,
            }),
        }
    }

    /// Name used by a `CONSTANT_Class_info` for this type
    ///
    /// Object types use their bare binary name while array types use their full descriptor. See
    /// [the class file format][0] for more.
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.4.1
    pub fn internal_form(&self) -> String {
        match self {
            RefType::Object(name) => String::from(name.as_str()),
            other => other.render(),
        }
    }
}

/// Type of a class, instance, or local variable
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum FieldType {
    Base(BaseType),
    Ref(RefType),
}

impl Width for FieldType {
    fn width(&self) -> usize {
        match self {
            FieldType::Base(base_type) => base_type.width(),
            FieldType::Ref(_) => 1,
        }
    }
}

impl FieldType {
    pub fn array(field_type: FieldType) -> FieldType {
        FieldType::Ref(RefType::array(field_type))
    }

    pub const fn object(class_name: BinaryName) -> FieldType {
        FieldType::Ref(RefType::Object(class_name))
    }

    pub const fn int() -> FieldType {
        FieldType::Base(BaseType::Int)
    }

    pub const fn long() -> FieldType {
        FieldType::Base(BaseType::Long)
    }

    pub const fn float() -> FieldType {
        FieldType::Base(BaseType::Float)
    }

    pub const fn double() -> FieldType {
        FieldType::Base(BaseType::Double)
    }

    pub const fn boolean() -> FieldType {
        FieldType::Base(BaseType::Boolean)
    }
}

impl RenderDescriptor for FieldType {
    fn render_to(&self, write_to: &mut String) {
        match self {
            FieldType::Base(base_type) => base_type.render_to(write_to),
            FieldType::Ref(reference_type) => reference_type.render_to(write_to),
        }
    }
}

/// Arrays may have at most this many dimensions
pub const MAX_ARRAY_DIMENSIONS: usize = 255;

/// Parameters of a method, including `this`, may take up at most this many slots
pub const MAX_PARAMETER_SLOTS: usize = 255;

impl ParseDescriptor for FieldType {
    fn read(reader: &mut DescriptorReader) -> Result<Self, Error> {
        let mut dimensions = 0;
        while reader.eat('[') {
            dimensions += 1;
        }
        if dimensions > MAX_ARRAY_DIMENSIONS {
            return Err(reader.error("too many array dimensions"));
        }

        let element_type = match reader.bump() {
            Some('L') => {
                let class_name = reader.take_until(';')?;
                let class_name = BinaryName::from_string(String::from(class_name))
                    .map_err(|msg| reader.error(&msg))?;
                FieldType::object(class_name)
            }
            Some(c) => match BaseType::from_descriptor_char(c) {
                Some(base_type) => FieldType::Base(base_type),
                None => return Err(reader.error(&format!("unexpected '{}'", c))),
            },
            None => return Err(reader.error("missing field type")),
        };

        Ok((0..dimensions).fold(element_type, |typ, _| FieldType::array(typ)))
    }
}

/// Signature of a method
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldType>,
    pub return_type: Option<FieldType>, // `None` is for `void` (ie. no return)
}

impl MethodDescriptor {
    /// Total length of parameters (not the same as the length of the vector),
    /// which must be 255 or less for it to be valid
    pub fn parameter_length(&self, has_this_param: bool) -> usize {
        let this_len = if has_this_param { 1 } else { 0 };
        this_len + self.parameters.iter().map(Width::width).sum::<usize>()
    }
}

impl RenderDescriptor for MethodDescriptor {
    fn render_to(&self, write_to: &mut String) {
        write_to.push('(');
        for parameter in &self.parameters {
            parameter.render_to(write_to);
        }
        write_to.push(')');
        match &self.return_type {
            None => write_to.push('V'),
            Some(typ) => typ.render_to(write_to),
        };
    }
}

impl ParseDescriptor for MethodDescriptor {
    fn read(reader: &mut DescriptorReader) -> Result<Self, Error> {
        if !reader.eat('(') {
            return Err(reader.error("expected '('"));
        }

        let mut parameters = vec![];
        while !reader.eat(')') {
            parameters.push(FieldType::read(reader)?);
        }

        let return_type = if reader.eat('V') {
            None
        } else {
            Some(FieldType::read(reader)?)
        };

        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fmt::Debug;

    fn round_trip<T: RenderDescriptor + ParseDescriptor + Debug + Eq>(rendered: &str, parsed: T) {
        assert_eq!(rendered, parsed.render());
        assert_eq!(T::parse(rendered).unwrap(), parsed);
    }

    const INT: FieldType = FieldType::Base(BaseType::Int);
    const DOUBLE: FieldType = FieldType::Base(BaseType::Double);
    const OBJECT: FieldType = FieldType::object(BinaryName::OBJECT);
    const STRING: FieldType = FieldType::object(BinaryName::STRING);
    const INTEGER: FieldType = FieldType::object(BinaryName::INTEGER);

    #[test]
    fn base_types() {
        for (rendered, base_type) in [
            ("B", BaseType::Byte),
            ("C", BaseType::Char),
            ("D", BaseType::Double),
            ("F", BaseType::Float),
            ("I", BaseType::Int),
            ("J", BaseType::Long),
            ("S", BaseType::Short),
            ("Z", BaseType::Boolean),
        ] {
            round_trip(rendered, FieldType::Base(base_type));
        }
        assert_eq!(BaseType::from_descriptor_char('V'), None);
    }

    #[test]
    fn field_types() {
        round_trip("I", INT);
        round_trip("Ljava/lang/Object;", OBJECT);
        round_trip(
            "[[[D",
            FieldType::array(FieldType::array(FieldType::array(DOUBLE))),
        );
        round_trip("[Ljava/lang/String;", FieldType::array(STRING));
        round_trip("[[I", RefType::array(FieldType::array(INT)));
    }

    #[test]
    fn malformed_field_types() {
        for source in ["", "[", "V", "Q", "Ljava/lang/Object", "L;", "II", "La.b;"] {
            match FieldType::parse(source) {
                Err(Error::InvalidDescriptor(_)) => (),
                other => panic!("'{}' parsed as {:?}", source, other),
            }
        }
        let deep = format!("{}I", "[".repeat(MAX_ARRAY_DIMENSIONS));
        assert!(FieldType::parse(&deep).is_ok());
        let too_deep = format!("[{}", deep);
        assert!(FieldType::parse(&too_deep).is_err());
        assert!(RefType::parse("I").is_err());
    }

    #[test]
    fn method_descriptors() {
        round_trip(
            "(IDLjava/lang/Integer;)Ljava/lang/Object;",
            MethodDescriptor {
                parameters: vec![INT, DOUBLE, INTEGER],
                return_type: Some(OBJECT),
            },
        );
        round_trip(
            "()V",
            MethodDescriptor {
                parameters: vec![],
                return_type: None,
            },
        );
        assert!(MethodDescriptor::parse("(I").is_err());
        assert!(MethodDescriptor::parse("I)V").is_err());
        assert!(MethodDescriptor::parse("()VV").is_err());
    }

    #[test]
    fn class_constant_names() {
        assert_eq!(RefType::Object(BinaryName::OBJECT).internal_form(), "java/lang/Object");
        assert_eq!(RefType::array(STRING).internal_form(), "[Ljava/lang/String;");
        assert_eq!(RefType::array(INT).internal_form(), "[I");
    }

    #[test]
    fn parameter_slots() {
        let descriptor = MethodDescriptor {
            parameters: vec![INT, DOUBLE, STRING, FieldType::long()],
            return_type: None,
        };
        assert_eq!(descriptor.parameter_length(false), 6);
        assert_eq!(descriptor.parameter_length(true), 7);
    }
}
