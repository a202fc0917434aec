use crate::jvm::class_file::{
    AttributeValue, Attributes, Constant, ConstantEntry, ConstantsPool, Exceptions, Serialize,
};
use crate::jvm::code::{Code, Handler, Instruction, Label, LabelGenerator, Operand, Target};
use crate::jvm::{
    BinaryName, Error, FieldType, LegalFlags, MethodAccessFlags, MethodDescriptor, Name,
    RefType, RenderDescriptor, UnqualifiedName, MAX_PARAMETER_SLOTS,
};
use byteorder::WriteBytesExt;

/// Method of a class
///
/// Abstract and native methods (and all methods of interfaces) have no code. Everything else
/// starts out with an empty instruction buffer, a max stack of 16, and enough locals for its
/// parameters.
#[derive(Debug)]
pub struct Method {
    name: UnqualifiedName,
    descriptor: MethodDescriptor,
    access_flags: MethodAccessFlags,
    name_entry: ConstantEntry,
    descriptor_entry: ConstantEntry,
    code: Option<Code>,
    throws: Vec<ConstantEntry>,
    attributes: Attributes,
    finalized: bool,
}

impl Method {
    pub(crate) fn new(
        constants: &mut ConstantsPool,
        name: UnqualifiedName,
        descriptor: MethodDescriptor,
        access_flags: MethodAccessFlags,
        in_interface: bool,
    ) -> Result<Method, Error> {
        let access_flags = access_flags.check_legal()?;
        let has_this = !access_flags.contains(MethodAccessFlags::STATIC);
        let parameter_slots = descriptor.parameter_length(has_this);
        if parameter_slots > MAX_PARAMETER_SLOTS {
            return Err(Error::InvalidDescriptor(format!(
                "{} has {} parameter slots, at most {} are allowed",
                descriptor.render(),
                parameter_slots,
                MAX_PARAMETER_SLOTS
            )));
        }
        let name_entry = constants.add_utf8(name.as_str())?;
        let descriptor_entry = constants.add_utf8(descriptor.render())?;

        let has_code = !in_interface
            && !access_flags.intersects(MethodAccessFlags::ABSTRACT | MethodAccessFlags::NATIVE);
        let code = if has_code {
            Some(Code::new(parameter_slots as u16))
        } else {
            None
        };

        Ok(Method {
            name,
            descriptor,
            access_flags,
            name_entry,
            descriptor_entry,
            code,
            throws: vec![],
            attributes: Attributes::new(),
            finalized: false,
        })
    }

    pub fn name(&self) -> &UnqualifiedName {
        &self.name
    }

    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    pub fn access_flags(&self) -> MethodAccessFlags {
        self.access_flags
    }

    pub fn code(&self) -> Option<&Code> {
        self.code.as_ref()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Assemble the code into its attribute, along with the declared exceptions
    ///
    /// Only the first call does anything, even if it fails part way through.
    pub(crate) fn finalize(&mut self, constants: &mut ConstantsPool) -> Result<(), Error> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;

        if let Some(code) = &self.code {
            let assembled = code.assemble(constants)?;
            self.attributes.add_attribute(constants, &assembled)?;
        }

        if !self.throws.is_empty() {
            let indices = self
                .throws
                .iter()
                .map(|entry| constants.index(*entry))
                .collect::<Result<Vec<u16>, Error>>()?;
            self.attributes
                .add_attribute(constants, &Exceptions(indices))?;
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

/// Mutable handle on a method, paired with the pool of the class that owns it
///
/// Every operation that needs a pool entry (pushing a large constant, referencing a field, naming
/// a caught exception) interns it through this handle.
pub struct MethodBuilder<'a> {
    method: &'a mut Method,
    constants: &'a mut ConstantsPool,
}

impl<'a> MethodBuilder<'a> {
    pub(crate) fn new(method: &'a mut Method, constants: &'a mut ConstantsPool) -> Self {
        MethodBuilder { method, constants }
    }

    pub fn method(&self) -> &Method {
        &*self.method
    }

    pub fn constants(&mut self) -> &mut ConstantsPool {
        &mut *self.constants
    }

    fn code_mut(&mut self) -> Result<&mut Code, Error> {
        let code = self.method.code.as_mut().ok_or(Error::MethodHasNoCode)?;
        if self.method.finalized {
            return Err(Error::MemberFinalized);
        }
        Ok(code)
    }

    /// Number of instructions so far
    pub fn len(&self) -> usize {
        self.method.code.as_ref().map_or(0, Code::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append an instruction, returning its position
    pub fn append(&mut self, opcode: u8, operand: Operand) -> Result<usize, Error> {
        let code = self.code_mut()?;
        Ok(code.append(Instruction::new(opcode, operand)))
    }

    /// Overwrite the instruction at a position
    pub fn set(&mut self, position: usize, opcode: u8, operand: Operand) -> Result<(), Error> {
        self.code_mut()?
            .set(position, Instruction::new(opcode, operand))
    }

    /// Build an instruction with access to the pool, then append it or write it at `position`
    fn place_with(
        &mut self,
        position: Option<usize>,
        build: impl FnOnce(&mut ConstantsPool) -> Result<Instruction, Error>,
    ) -> Result<usize, Error> {
        self.code_mut()?;
        let instruction = build(&mut *self.constants)?;
        let code = self.code_mut()?;
        match position {
            None => Ok(code.append(instruction)),
            Some(position) => code.set(position, instruction).map(|()| position),
        }
    }

    pub fn push_int(&mut self, value: i32) -> Result<usize, Error> {
        self.place_with(None, |pool| Instruction::push_int(pool, value))
    }

    pub fn push_long(&mut self, value: i64) -> Result<usize, Error> {
        self.place_with(None, |pool| Instruction::push_long(pool, value))
    }

    pub fn push_float(&mut self, value: f32) -> Result<usize, Error> {
        self.place_with(None, |pool| Instruction::push_float(pool, value))
    }

    pub fn push_double(&mut self, value: f64) -> Result<usize, Error> {
        self.place_with(None, |pool| Instruction::push_double(pool, value))
    }

    pub fn push_string(&mut self, value: impl Into<String>) -> Result<usize, Error> {
        self.place_with(None, |pool| Instruction::push_string(pool, value))
    }

    pub fn push_constant(&mut self, constant: Constant) -> Result<usize, Error> {
        self.place_with(None, |pool| Instruction::push_constant(pool, constant))
    }

    pub fn set_push_int(&mut self, position: usize, value: i32) -> Result<(), Error> {
        self.place_with(Some(position), |pool| Instruction::push_int(pool, value))
            .map(|_| ())
    }

    pub fn set_push_long(&mut self, position: usize, value: i64) -> Result<(), Error> {
        self.place_with(Some(position), |pool| Instruction::push_long(pool, value))
            .map(|_| ())
    }

    pub fn set_push_float(&mut self, position: usize, value: f32) -> Result<(), Error> {
        self.place_with(Some(position), |pool| Instruction::push_float(pool, value))
            .map(|_| ())
    }

    pub fn set_push_double(&mut self, position: usize, value: f64) -> Result<(), Error> {
        self.place_with(Some(position), |pool| Instruction::push_double(pool, value))
            .map(|_| ())
    }

    pub fn set_push_string(&mut self, position: usize, value: impl Into<String>) -> Result<(), Error> {
        self.place_with(Some(position), |pool| Instruction::push_string(pool, value))
            .map(|_| ())
    }

    pub fn set_push_constant(&mut self, position: usize, constant: Constant) -> Result<(), Error> {
        self.place_with(Some(position), |pool| {
            Instruction::push_constant(pool, constant)
        })
        .map(|_| ())
    }

    pub fn new_label(&mut self) -> Result<Label, Error> {
        Ok(self.code_mut()?.fresh_label())
    }

    /// Bind a label to the position of the next instruction appended
    pub fn place_label(&mut self, label: Label) -> Result<(), Error> {
        self.code_mut()?.place_label(label)
    }

    /// Register an exception handler
    ///
    /// The range covers positions `start` (inclusive) to `end` (exclusive), and `end` may be the
    /// number of instructions. Ranges are checked when the method is finalized.
    pub fn add_exception_handler(
        &mut self,
        start: impl Into<Target>,
        end: impl Into<Target>,
        handler: impl Into<Target>,
        catch_type: Option<BinaryName>,
    ) -> Result<(), Error> {
        self.code_mut()?;
        let catch_type = catch_type
            .map(|class| self.constants.add_class(class))
            .transpose()?;
        self.code_mut()?.add_exception_handler(Handler {
            start: start.into(),
            end: end.into(),
            handler: handler.into(),
            catch_type,
        });
        Ok(())
    }

    /// Declare a checked exception the method may throw
    pub fn add_throws(&mut self, exception: BinaryName) -> Result<(), Error> {
        if self.method.finalized {
            return Err(Error::MemberFinalized);
        }
        let entry = self.constants.add_class(exception)?;
        if !self.method.throws.contains(&entry) {
            self.method.throws.push(entry);
        }
        Ok(())
    }

    pub fn set_max_stack(&mut self, max_stack: u16) -> Result<(), Error> {
        self.code_mut()?.max_stack = max_stack;
        Ok(())
    }

    pub fn set_max_locals(&mut self, max_locals: u16) -> Result<(), Error> {
        self.code_mut()?.max_locals = max_locals;
        Ok(())
    }

    /// Add (or replace) an attribute on the method
    pub fn add_attribute(
        &mut self,
        name: impl Into<String>,
        value: AttributeValue,
    ) -> Result<(), Error> {
        if self.method.finalized {
            return Err(Error::MemberFinalized);
        }
        self.method.attributes.add(self.constants, name, value)
    }

    /// Add (or replace) an attribute nested inside the method's `Code` attribute
    pub fn add_code_attribute(
        &mut self,
        name: impl Into<String>,
        value: AttributeValue,
    ) -> Result<(), Error> {
        let code = self.method.code.as_mut().ok_or(Error::MethodHasNoCode)?;
        if self.method.finalized {
            return Err(Error::MemberFinalized);
        }
        code.attributes.add(self.constants, name, value)
    }

    pub fn class_ref(&mut self, class: impl Into<RefType>) -> Result<ConstantEntry, Error> {
        self.constants.add_class(class)
    }

    pub fn field_ref(
        &mut self,
        class: impl Into<RefType>,
        name: &UnqualifiedName,
        field_type: &FieldType,
    ) -> Result<ConstantEntry, Error> {
        self.constants.add_field_ref(class, name, field_type)
    }

    pub fn method_ref(
        &mut self,
        class: impl Into<RefType>,
        name: &UnqualifiedName,
        descriptor: &MethodDescriptor,
    ) -> Result<ConstantEntry, Error> {
        self.constants.add_method_ref(class, name, descriptor)
    }

    pub fn interface_method_ref(
        &mut self,
        class: impl Into<RefType>,
        name: &UnqualifiedName,
        descriptor: &MethodDescriptor,
    ) -> Result<ConstantEntry, Error> {
        self.constants
            .add_interface_method_ref(class, name, descriptor)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::opcodes::*;

    fn main_descriptor() -> MethodDescriptor {
        MethodDescriptor {
            parameters: vec![FieldType::array(FieldType::object(BinaryName::STRING))],
            return_type: None,
        }
    }

    #[test]
    fn default_limits() {
        let mut pool = ConstantsPool::new();
        let method = Method::new(
            &mut pool,
            UnqualifiedName::MAIN,
            main_descriptor(),
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            false,
        )
        .unwrap();
        let code = method.code().unwrap();
        assert_eq!(code.max_stack, 16);
        assert_eq!(code.max_locals, 1);

        let method = Method::new(
            &mut pool,
            UnqualifiedName::INIT,
            MethodDescriptor {
                parameters: vec![FieldType::long(), FieldType::int()],
                return_type: None,
            },
            MethodAccessFlags::PUBLIC,
            false,
        )
        .unwrap();
        assert_eq!(method.code().unwrap().max_locals, 4);
    }

    #[test]
    fn abstract_methods_have_no_code() {
        let mut pool = ConstantsPool::new();
        let mut method = Method::new(
            &mut pool,
            UnqualifiedName::MAIN,
            main_descriptor(),
            MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT,
            false,
        )
        .unwrap();
        let mut builder = MethodBuilder::new(&mut method, &mut pool);
        assert!(matches!(
            builder.append(RETURN, Operand::None),
            Err(Error::MethodHasNoCode)
        ));
        builder.add_throws(BinaryName::EXCEPTION).unwrap();

        pool.stabilize();
        method.finalize(&mut pool).unwrap();
        assert!(!method.attributes().contains("Code"));
        assert!(method.attributes().contains("Exceptions"));
    }

    #[test]
    fn finalize_once() {
        let mut pool = ConstantsPool::new();
        let mut method = Method::new(
            &mut pool,
            UnqualifiedName::MAIN,
            main_descriptor(),
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            false,
        )
        .unwrap();
        let mut builder = MethodBuilder::new(&mut method, &mut pool);
        builder.push_int(7).unwrap();
        builder.append(POP, Operand::None).unwrap();
        builder.append(RETURN, Operand::None).unwrap();
        builder.set_push_int(0, 1000).unwrap();
        assert_eq!(
            builder.method().code().unwrap().instructions()[0],
            Instruction::new(SIPUSH, Operand::Int(1000))
        );

        pool.stabilize();
        method.finalize(&mut pool).unwrap();
        method.finalize(&mut pool).unwrap();
        assert_eq!(method.attributes().count(), 1);

        let mut builder = MethodBuilder::new(&mut method, &mut pool);
        assert!(matches!(
            builder.append(NOP, Operand::None),
            Err(Error::MemberFinalized)
        ));
    }

    #[test]
    fn set_pushes_pick_the_shortest_form() {
        let mut pool = ConstantsPool::new();
        let mut method = Method::new(
            &mut pool,
            UnqualifiedName::MAIN,
            main_descriptor(),
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            false,
        )
        .unwrap();
        let mut builder = MethodBuilder::new(&mut method, &mut pool);
        for _ in 0..10 {
            builder.append(NOP, Operand::None).unwrap();
        }

        builder.set_push_long(0, 1).unwrap();
        builder.set_push_long(1, 40).unwrap();
        builder.set_push_float(2, 2.0).unwrap();
        builder.set_push_float(3, -0.0).unwrap();
        builder.set_push_double(4, 0.0).unwrap();
        builder.set_push_double(5, 0.25).unwrap();
        builder.set_push_string(6, "hi").unwrap();
        builder.set_push_constant(7, Constant::Integer(-1)).unwrap();
        builder
            .set_push_constant(8, Constant::Class(RefType::Object(BinaryName::STRING)))
            .unwrap();
        assert!(matches!(
            builder.set_push_int(10, 0),
            Err(Error::InvalidPosition(10))
        ));

        let long = builder.constants().get(&Constant::Long(40)).unwrap();
        let float = builder.constants().get(&Constant::float(-0.0)).unwrap();
        let double = builder.constants().get(&Constant::double(0.25)).unwrap();
        let string = builder.constants().get(&Constant::String(String::from("hi"))).unwrap();
        let class = builder.constants().get(&Constant::Class(RefType::Object(BinaryName::STRING)));
        assert_eq!(
            builder.method().code().unwrap().instructions()[..9],
            [
                Instruction::new(LCONST_1, Operand::None),
                Instruction::new(LDC2_W, Operand::Constant(long)),
                Instruction::new(FCONST_2, Operand::None),
                Instruction::new(LDC, Operand::Constant(float)),
                Instruction::new(DCONST_0, Operand::None),
                Instruction::new(LDC2_W, Operand::Constant(double)),
                Instruction::new(LDC, Operand::Constant(string)),
                Instruction::new(ICONST_M1, Operand::None),
                Instruction::new(LDC, Operand::Constant(class.unwrap())),
            ]
        );
    }

    #[test]
    fn code_attributes() {
        let mut pool = ConstantsPool::new();
        let mut method = Method::new(
            &mut pool,
            UnqualifiedName::MAIN,
            main_descriptor(),
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            false,
        )
        .unwrap();
        let mut abstract_method = Method::new(
            &mut pool,
            UnqualifiedName::MAIN,
            main_descriptor(),
            MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT,
            false,
        )
        .unwrap();
        let mut builder = MethodBuilder::new(&mut method, &mut pool);
        builder.append(RETURN, Operand::None).unwrap();
        builder
            .add_code_attribute("Custom", AttributeValue::Bytes(vec![9, 9]))
            .unwrap();
        builder
            .add_code_attribute("Custom", AttributeValue::Bytes(vec![1, 2, 3, 4]))
            .unwrap();
        assert_eq!(builder.method().code().unwrap().attributes.count(), 1);

        pool.stabilize();
        method.finalize(&mut pool).unwrap();
        match method.attributes().get("Code") {
            Some(AttributeValue::Bytes(info)) => {
                // one nested attribute: count, name index, length, payload
                assert!(info.ends_with(&[0, 0, 0, 4, 1, 2, 3, 4]));
                assert_eq!(info[info.len() - 12..info.len() - 10], [0, 1]);
            }
            other => panic!("unexpected code attribute {:?}", other),
        }

        let mut builder = MethodBuilder::new(&mut method, &mut pool);
        assert!(matches!(
            builder.add_code_attribute("Custom", AttributeValue::Bytes(vec![])),
            Err(Error::MemberFinalized)
        ));

        let mut builder = MethodBuilder::new(&mut abstract_method, &mut pool);
        assert!(matches!(
            builder.add_code_attribute("Custom", AttributeValue::Bytes(vec![])),
            Err(Error::MethodHasNoCode)
        ));
    }

    #[test]
    fn parameter_slot_limit() {
        let longs = |count: usize, extra: Option<FieldType>| MethodDescriptor {
            parameters: std::iter::repeat(FieldType::long())
                .take(count)
                .chain(extra)
                .collect(),
            return_type: None,
        };
        let mut pool = ConstantsPool::new();

        let method = Method::new(
            &mut pool,
            UnqualifiedName::MAIN,
            longs(127, Some(FieldType::int())),
            MethodAccessFlags::STATIC,
            false,
        )
        .unwrap();
        assert_eq!(method.code().unwrap().max_locals, 255);

        for (descriptor, flags) in [
            (longs(127, Some(FieldType::int())), MethodAccessFlags::PUBLIC),
            (longs(128, None), MethodAccessFlags::STATIC),
            (longs(40000, None), MethodAccessFlags::STATIC),
        ] {
            assert!(matches!(
                Method::new(&mut pool, UnqualifiedName::MAIN, descriptor, flags, false),
                Err(Error::InvalidDescriptor(_))
            ));
        }
    }

    #[test]
    fn illegal_flags() {
        let mut pool = ConstantsPool::new();
        let result = Method::new(
            &mut pool,
            UnqualifiedName::MAIN,
            main_descriptor(),
            MethodAccessFlags::PUBLIC | MethodAccessFlags::BRIDGE,
            false,
        );
        assert!(matches!(
            result,
            Err(Error::IllegalAccessFlags {
                kind: "method",
                illegal: 0x0040,
                ..
            })
        ));
    }
}
