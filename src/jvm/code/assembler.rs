use super::opcodes::{self, info, OperandKind};
use super::{Instruction, Label, LabelGenerator, Operand, SwitchTable, Target};
use crate::jvm::class_file::{
    Attributes, BytecodeArray, Code as CodeAttribute, Constant, ConstantEntry, ConstantsPool,
    ExceptionHandler,
};
use crate::jvm::descriptors::ParseDescriptor;
use crate::jvm::{Error, MethodDescriptor};
use log::{debug, trace};

/// Operand stack depth assumed for methods that don't say otherwise
pub const DEFAULT_MAX_STACK: u16 = 16;

/// Exception handler, with its range still given by instruction positions
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Handler {
    /// First covered instruction (inclusive)
    pub start: Target,

    /// End of the covered instructions (exclusive), which may be the number of instructions
    pub end: Target,

    /// First instruction of the handler
    pub handler: Target,

    /// Class of exceptions caught (`None` catches everything)
    pub catch_type: Option<ConstantEntry>,
}

/// Instruction buffer of one method
///
/// Instructions are addressed by their 0-based position. Byte offsets are only computed in
/// [`Code::assemble`], which lays the code out in four passes:
///
///   1. resolve targets and validate operands while computing the largest offset each
///      instruction could possibly end up at (every `goto`/`jsr` counted as wide and every switch
///      with maximal padding)
///   2. widen every `goto`/`jsr` whose displacement under those maximal offsets doesn't fit in 16
///      bits (conditional branches have no wide form and are left alone)
///   3. compute the real offsets with the committed opcodes and real switch padding
///   4. emit every instruction
///
/// Since real offsets never spread further apart than maximal ones, a jump that fits under the
/// maximal layout also fits under the real one.
#[derive(Debug)]
pub struct Code {
    instructions: Vec<Instruction>,

    /// Position of every label, if it has been placed
    labels: Vec<Option<usize>>,

    handlers: Vec<Handler>,

    pub max_stack: u16,
    pub max_locals: u16,

    /// Attributes nested inside the `Code` attribute
    pub attributes: Attributes,
}

impl Code {
    pub fn new(max_locals: u16) -> Code {
        Code {
            instructions: vec![],
            labels: vec![],
            handlers: vec![],
            max_stack: DEFAULT_MAX_STACK,
            max_locals,
            attributes: Attributes::new(),
        }
    }

    /// Number of instructions
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    /// Add an instruction to the end, returning its position
    pub fn append(&mut self, instruction: Instruction) -> usize {
        self.instructions.push(instruction);
        self.instructions.len() - 1
    }

    /// Overwrite the instruction at a position
    pub fn set(&mut self, position: usize, instruction: Instruction) -> Result<(), Error> {
        let slot = self
            .instructions
            .get_mut(position)
            .ok_or(Error::InvalidPosition(position))?;
        *slot = instruction;
        Ok(())
    }

    /// Bind a label to the position of the next instruction to be appended
    pub fn place_label(&mut self, label: Label) -> Result<(), Error> {
        if label.0 >= self.labels.len() {
            self.labels.resize(label.0 + 1, None);
        }
        let placed = &mut self.labels[label.0];
        if placed.is_some() {
            return Err(Error::DuplicateLabel(label));
        }
        *placed = Some(self.instructions.len());
        Ok(())
    }

    pub fn add_exception_handler(&mut self, handler: Handler) {
        self.handlers.push(handler);
    }

    /// Position a target refers to
    pub fn resolve(&self, target: Target) -> Result<usize, Error> {
        match target {
            Target::Position(position) => Ok(position),
            Target::Label(label) => self
                .labels
                .get(label.0)
                .copied()
                .flatten()
                .ok_or(Error::UnplacedLabel(label)),
        }
    }

    /// Position of a branch target, which must be an existing instruction
    fn resolve_branch(&self, instruction: usize, target: Target) -> Result<usize, Error> {
        let position = self.resolve(target)?;
        if position >= self.instructions.len() {
            return Err(Error::InvalidBranchTarget {
                instruction,
                target: position,
            });
        }
        Ok(position)
    }

    /// Lay out and encode the code, producing the payload of the `Code` attribute
    ///
    /// The constants pool must be stable, since pool indices get written into the code.
    pub fn assemble(&self, constants: &ConstantsPool) -> Result<CodeAttribute, Error> {
        let count = self.instructions.len();

        // Pass 1: validate, resolve, and compute maximal offsets
        let mut opcodes: Vec<u8> = Vec::with_capacity(count);
        let mut max_offsets: Vec<usize> = Vec::with_capacity(count + 1);
        let mut offset = 0;
        for (position, instruction) in self.instructions.iter().enumerate() {
            let opcode = self.check_instruction(position, instruction, constants)?;
            max_offsets.push(offset);
            offset += 1 + match opcode {
                opcodes::GOTO | opcodes::JSR => 4,
                _ => operand_length(opcode, &instruction.operand, None),
            };
            opcodes.push(opcode);
        }
        max_offsets.push(offset);

        // Pass 2: widen unconditional jumps that might not reach
        let mut widened = 0;
        for (position, instruction) in self.instructions.iter().enumerate() {
            if let Operand::Branch(target) = instruction.operand {
                let wide_opcode = match opcodes[position] {
                    opcodes::GOTO => opcodes::GOTO_W,
                    opcodes::JSR => opcodes::JSR_W,
                    _ => continue,
                };
                let target = self.resolve(target)?;
                let displacement = max_offsets[target] as isize - max_offsets[position] as isize;
                if i16::try_from(displacement).is_err() {
                    opcodes[position] = wide_opcode;
                    widened += 1;
                }
            }
        }

        // Pass 3: real offsets
        let mut offsets: Vec<usize> = Vec::with_capacity(count + 1);
        let mut offset = 0;
        for (instruction, opcode) in self.instructions.iter().zip(&opcodes) {
            offsets.push(offset);
            offset += 1 + operand_length(*opcode, &instruction.operand, Some(offset));
        }
        offsets.push(offset);
        if offset > u16::MAX as usize {
            return Err(Error::MethodCodeOverflow(offset));
        }

        // Pass 4: emission
        let mut code: Vec<u8> = Vec::with_capacity(offset);
        for (position, instruction) in self.instructions.iter().enumerate() {
            self.emit(
                position,
                opcodes[position],
                &instruction.operand,
                &offsets,
                constants,
                &mut code,
            )?;
        }

        let exception_table = self.exception_table(&offsets, constants)?;
        let attributes = self.attributes.resolve(constants)?;

        debug!(
            "Assembled {} instructions into {} bytes ({} jumps widened, {} handlers)",
            count,
            code.len(),
            widened,
            exception_table.len()
        );

        Ok(CodeAttribute {
            max_stack: self.max_stack,
            max_locals: self.max_locals,
            code_array: BytecodeArray(code),
            exception_table,
            attributes,
        })
    }

    /// Validate an instruction and pick the opcode it will start out with
    fn check_instruction(
        &self,
        position: usize,
        instruction: &Instruction,
        constants: &ConstantsPool,
    ) -> Result<u8, Error> {
        let opcode_info = info(instruction.opcode);
        if opcode_info.operand == OperandKind::Unsupported {
            return Err(Error::UnsupportedOpcode {
                instruction: position,
                opcode: instruction.opcode,
            });
        }
        let invalid_operand = || Error::InvalidOperand {
            instruction: position,
            opcode: opcode_info.mnemonic,
        };
        if !instruction.operand_matches() {
            return Err(invalid_operand());
        }

        match &instruction.operand {
            Operand::Branch(target) => {
                self.resolve_branch(position, *target)?;
            }
            Operand::Switch(table) => {
                for target in table.targets() {
                    self.resolve_branch(position, target)?;
                }
                match table {
                    SwitchTable::Table { low, targets, .. } => {
                        if targets.is_empty() {
                            return Err(Error::EmptyTableSwitch {
                                instruction: position,
                            });
                        }
                        let high = *low as i64 + targets.len() as i64 - 1;
                        if i32::try_from(high).is_err() {
                            return Err(Error::OperandOverflow {
                                instruction: position,
                                value: high,
                            });
                        }
                    }
                    SwitchTable::Lookup { pairs, .. } => {
                        if pairs.windows(2).any(|pair| pair[0].0 >= pair[1].0) {
                            return Err(Error::UnsortedLookupSwitch {
                                instruction: position,
                            });
                        }
                    }
                }
            }
            Operand::Constant(entry) => {
                let constant = constants
                    .constant(*entry)
                    .ok_or_else(|| Error::MissingConstant(format!("{:?}", entry)))?;
                let index = constants.index(*entry)?;
                let fits = match opcode_info.operand {
                    OperandKind::NarrowConstant => constant.is_narrow_loadable(),
                    OperandKind::Constant if instruction.opcode == opcodes::LDC2_W => {
                        constant.is_wide_loadable()
                    }
                    OperandKind::Constant => constant.is_narrow_loadable(),
                    OperandKind::FieldRef => matches!(constant, Constant::FieldRef(_)),
                    OperandKind::ClassRef => matches!(constant, Constant::Class(_)),
                    OperandKind::InterfaceMethod => {
                        matches!(constant, Constant::InterfaceMethodRef(_))
                    }
                    OperandKind::MethodRef => match constant {
                        Constant::MethodRef(_) => true,
                        Constant::InterfaceMethodRef(_) => {
                            instruction.opcode != opcodes::INVOKEVIRTUAL
                        }
                        _ => false,
                    },
                    _ => false,
                };
                if !fits {
                    return Err(invalid_operand());
                }
                if instruction.opcode == opcodes::LDC && index > u8::MAX as u16 {
                    return Ok(opcodes::LDC_W);
                }
            }
            Operand::None | Operand::Int(_) | Operand::IInc { .. } => (),
        }

        Ok(instruction.opcode)
    }

    /// Encode one instruction at its final offset
    fn emit(
        &self,
        position: usize,
        opcode: u8,
        operand: &Operand,
        offsets: &[usize],
        constants: &ConstantsPool,
        code: &mut Vec<u8>,
    ) -> Result<(), Error> {
        let here = offsets[position];
        let opcode_info = info(opcode);
        trace!("{:>5}: {} {:?}", here, opcode_info.mnemonic, operand);

        let overflow = |value: i64| Error::OperandOverflow {
            instruction: position,
            value,
        };
        let displacement = |target: Target| -> Result<i32, Error> {
            let target = self.resolve(target)?;
            Ok(offsets[target] as i32 - here as i32)
        };

        code.push(opcode);
        match (opcode_info.operand, operand) {
            (OperandKind::None, Operand::None) => (),
            (OperandKind::LocalIndex | OperandKind::ArrayType, Operand::Int(value)) => {
                let byte = u8::try_from(*value).map_err(|_| overflow(*value as i64))?;
                code.push(byte);
            }
            (OperandKind::SignedByte, Operand::Int(value)) => {
                let byte = i8::try_from(*value).map_err(|_| overflow(*value as i64))?;
                code.extend_from_slice(&byte.to_be_bytes());
            }
            (OperandKind::SignedShort, Operand::Int(value)) => {
                let short = i16::try_from(*value).map_err(|_| overflow(*value as i64))?;
                code.extend_from_slice(&short.to_be_bytes());
            }
            (OperandKind::NarrowConstant, Operand::Constant(entry)) => {
                let index = constants.index(*entry)?;
                let byte = u8::try_from(index).map_err(|_| overflow(index as i64))?;
                code.push(byte);
            }
            (
                OperandKind::Constant
                | OperandKind::FieldRef
                | OperandKind::MethodRef
                | OperandKind::ClassRef,
                Operand::Constant(entry),
            ) => {
                code.extend_from_slice(&constants.index(*entry)?.to_be_bytes());
            }
            (OperandKind::InterfaceMethod, Operand::Constant(entry)) => {
                let count = interface_argument_count(*entry, constants)?;
                let count = u8::try_from(count).map_err(|_| overflow(count as i64))?;
                code.extend_from_slice(&constants.index(*entry)?.to_be_bytes());
                code.push(count);
                code.push(0);
            }
            (OperandKind::Branch, Operand::Branch(target)) => {
                let displacement = displacement(*target)?;
                let short = i16::try_from(displacement).map_err(|_| Error::BranchOverflow {
                    instruction: position,
                    displacement: displacement as isize,
                })?;
                code.extend_from_slice(&short.to_be_bytes());
            }
            (OperandKind::WideBranch, Operand::Branch(target)) => {
                code.extend_from_slice(&displacement(*target)?.to_be_bytes());
            }
            (OperandKind::IInc, Operand::IInc { index, delta }) => {
                let overflow = || Error::IIncOverflow {
                    instruction: position,
                };
                let index = u8::try_from(*index).map_err(|_| overflow())?;
                let delta = i8::try_from(*delta).map_err(|_| overflow())?;
                code.push(index);
                code.extend_from_slice(&delta.to_be_bytes());
            }
            (
                OperandKind::TableSwitch,
                Operand::Switch(SwitchTable::Table {
                    low,
                    targets,
                    default,
                }),
            ) => {
                code.resize(code.len() + switch_padding(here), 0);
                let high = *low + (targets.len() as i32 - 1);
                code.extend_from_slice(&displacement(*default)?.to_be_bytes());
                code.extend_from_slice(&low.to_be_bytes());
                code.extend_from_slice(&high.to_be_bytes());
                for target in targets {
                    code.extend_from_slice(&displacement(*target)?.to_be_bytes());
                }
            }
            (OperandKind::LookupSwitch, Operand::Switch(SwitchTable::Lookup { pairs, default })) => {
                code.resize(code.len() + switch_padding(here), 0);
                code.extend_from_slice(&displacement(*default)?.to_be_bytes());
                code.extend_from_slice(&(pairs.len() as i32).to_be_bytes());
                for (key, target) in pairs {
                    code.extend_from_slice(&key.to_be_bytes());
                    code.extend_from_slice(&displacement(*target)?.to_be_bytes());
                }
            }
            _ => {
                return Err(Error::InvalidOperand {
                    instruction: position,
                    opcode: opcode_info.mnemonic,
                })
            }
        }

        Ok(())
    }

    fn exception_table(
        &self,
        offsets: &[usize],
        constants: &ConstantsPool,
    ) -> Result<Vec<ExceptionHandler>, Error> {
        let count = self.instructions.len();
        let mut exception_table = Vec::with_capacity(self.handlers.len());
        for handler in &self.handlers {
            let start = self.resolve(handler.start)?;
            let end = self.resolve(handler.end)?;
            if start >= end || end > count {
                return Err(Error::InvalidExceptionRange { start, end });
            }
            let handler_position = self.resolve_branch(start, handler.handler)?;
            let catch_type = match handler.catch_type {
                Some(entry) => constants.index(entry)?,
                None => 0,
            };
            exception_table.push(ExceptionHandler {
                start_pc: offsets[start] as u16,
                end_pc: offsets[end] as u16,
                handler_pc: offsets[handler_position] as u16,
                catch_type,
            });
        }
        if exception_table.len() > u16::MAX as usize {
            return Err(Error::TooManyMembers("exception handlers"));
        }
        Ok(exception_table)
    }
}

impl LabelGenerator for Code {
    fn fresh_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }
}

/// Zero bytes needed after a switch opcode at `offset` to align its operands to 4 bytes
fn switch_padding(offset: usize) -> usize {
    (4 - (offset + 1) % 4) % 4
}

/// Bytes after the opcode
///
/// Without a known offset, switches get the maximum padding.
fn operand_length(opcode: u8, operand: &Operand, offset: Option<usize>) -> usize {
    match operand {
        Operand::Switch(table) => table.operand_length(offset.map_or(3, switch_padding)),
        _ => info(opcode).operand.fixed_length().unwrap_or(0),
    }
}

/// Argument slot count written after `invokeinterface`'s pool index (including the receiver)
fn interface_argument_count(entry: ConstantEntry, constants: &ConstantsPool) -> Result<usize, Error> {
    match constants.constant(entry) {
        Some(Constant::InterfaceMethodRef(member)) => {
            let descriptor = MethodDescriptor::parse(&member.name_and_type.descriptor)?;
            Ok(descriptor.parameter_length(true))
        }
        _ => Err(Error::MissingConstant(format!("{:?}", entry))),
    }
}

#[cfg(test)]
mod test {
    use super::super::opcodes::*;
    use super::*;
    use crate::jvm::{BinaryName, FieldType, Name, UnqualifiedName};

    fn stable_pool() -> ConstantsPool {
        let mut pool = ConstantsPool::new();
        pool.stabilize();
        pool
    }

    fn op(opcode: u8) -> Instruction {
        Instruction::new(opcode, Operand::None)
    }

    fn branch(opcode: u8, target: impl Into<Target>) -> Instruction {
        Instruction::new(opcode, Operand::Branch(target.into()))
    }

    #[test]
    fn backward_and_forward_branches() {
        let mut code = Code::new(1);
        code.append(op(ICONST_0)); // 0
        code.append(op(ISTORE_0)); // 1
        code.append(Instruction::new(IINC, Operand::IInc { index: 0, delta: 1 })); // 2
        code.append(op(ILOAD_0)); // 5
        code.append(Instruction::new(BIPUSH, Operand::Int(10))); // 6
        code.append(branch(IF_ICMPLT, Target::Position(2))); // 8
        code.append(branch(GOTO, Target::Position(7))); // 11
        code.append(op(RETURN)); // 14

        let assembled = code.assemble(&stable_pool()).unwrap();
        assert_eq!(
            assembled.code_array.0,
            vec![
                0x03, 0x3b, 0x84, 0, 1, 0x1a, 0x10, 10, 0xa1, 0xff, 0xfa, 0xa7, 0, 3, 0xb1
            ]
        );
        assert_eq!(assembled.max_stack, DEFAULT_MAX_STACK);
        assert_eq!(assembled.max_locals, 1);
    }

    #[test]
    fn labels_resolve_to_positions() {
        let mut code = Code::new(0);
        let end = code.fresh_label();
        code.append(branch(GOTO, end));
        code.append(op(NOP));
        code.place_label(end).unwrap();
        code.append(op(RETURN));
        assert!(matches!(code.place_label(end), Err(Error::DuplicateLabel(_))));

        let assembled = code.assemble(&stable_pool()).unwrap();
        assert_eq!(assembled.code_array.0, vec![0xa7, 0, 4, 0x00, 0xb1]);
    }

    #[test]
    fn unplaced_and_out_of_range_targets() {
        let mut code = Code::new(0);
        let nowhere = code.fresh_label();
        code.append(branch(GOTO, nowhere));
        assert!(matches!(
            code.assemble(&stable_pool()),
            Err(Error::UnplacedLabel(_))
        ));

        let mut code = Code::new(0);
        code.append(branch(IFEQ, Target::Position(5)));
        assert!(matches!(
            code.assemble(&stable_pool()),
            Err(Error::InvalidBranchTarget {
                instruction: 0,
                target: 5
            })
        ));
    }

    #[test]
    fn goto_widening() {
        let mut code = Code::new(0);
        for _ in 0..40000 {
            code.append(op(NOP));
        }
        code.append(branch(GOTO, Target::Position(0)));
        let assembled = code.assemble(&stable_pool()).unwrap();
        let bytes = &assembled.code_array.0;
        assert_eq!(bytes.len(), 40005);
        assert_eq!(bytes[40000], GOTO_W);
        let displacement = i32::from_be_bytes([bytes[40001], bytes[40002], bytes[40003], bytes[40004]]);
        assert_eq!(40000 + displacement, 0);
    }

    #[test]
    fn conditional_branches_are_not_widened() {
        let mut code = Code::new(0);
        code.append(branch(IFEQ, Target::Position(40001)));
        for _ in 0..40000 {
            code.append(op(NOP));
        }
        code.append(op(RETURN));
        assert!(matches!(
            code.assemble(&stable_pool()),
            Err(Error::BranchOverflow { instruction: 0, .. })
        ));
    }

    #[test]
    fn switch_padding_and_layout() {
        let mut code = Code::new(1);
        code.append(op(ILOAD_0)); // 0
        code.append(Instruction::new(
            TABLESWITCH,
            Operand::Switch(SwitchTable::Table {
                low: 1,
                targets: vec![Target::Position(2), Target::Position(3)],
                default: Target::Position(3),
            }),
        )); // 1, padded by 2
        code.append(op(NOP)); // 24
        code.append(op(RETURN)); // 25

        let assembled = code.assemble(&stable_pool()).unwrap();
        assert_eq!(
            assembled.code_array.0,
            vec![
                0x1a, 0xaa, 0, 0, // opcode and padding
                0, 0, 0, 24, // default
                0, 0, 0, 1, // low
                0, 0, 0, 2, // high
                0, 0, 0, 23, 0, 0, 0, 24, // targets
                0x00, 0xb1,
            ]
        );
    }

    #[test]
    fn lookup_switch_keys_must_ascend() {
        let mut code = Code::new(1);
        code.append(op(ILOAD_0));
        code.append(Instruction::new(
            LOOKUPSWITCH,
            Operand::Switch(SwitchTable::Lookup {
                pairs: vec![(5, Target::Position(2)), (5, Target::Position(2))],
                default: Target::Position(2),
            }),
        ));
        code.append(op(RETURN));
        assert!(matches!(
            code.assemble(&stable_pool()),
            Err(Error::UnsortedLookupSwitch { instruction: 1 })
        ));
    }

    #[test]
    fn ldc_widens_past_index_255() {
        let mut pool = ConstantsPool::new();
        for i in 0..300 {
            pool.add(Constant::Integer(100_000 + i)).unwrap();
        }
        pool.stabilize();
        let low = pool.get(&Constant::Integer(100_000)).unwrap();
        let high = pool.get(&Constant::Integer(100_299)).unwrap();

        let mut code = Code::new(0);
        code.append(Instruction::new(LDC, Operand::Constant(low)));
        code.append(Instruction::new(LDC, Operand::Constant(high)));
        let assembled = code.assemble(&pool).unwrap();
        assert_eq!(assembled.code_array.0, vec![LDC, 1, LDC_W, 1, 44]);
    }

    #[test]
    fn invokeinterface_argument_count() {
        let mut pool = ConstantsPool::new();
        let method = pool
            .add_interface_method_ref(
                BinaryName::RUNNABLE,
                &UnqualifiedName::from_string(String::from("take")).unwrap(),
                &MethodDescriptor::parse("(JI)V").unwrap(),
            )
            .unwrap();
        pool.stabilize();
        let index = pool.index(method).unwrap().to_be_bytes();

        let mut code = Code::new(0);
        code.append(Instruction::new(INVOKEINTERFACE, Operand::Constant(method)));
        let assembled = code.assemble(&pool).unwrap();
        assert_eq!(assembled.code_array.0, vec![INVOKEINTERFACE, index[0], index[1], 4, 0]);
    }

    #[test]
    fn immediates_are_range_checked() {
        let mut code = Code::new(0);
        code.append(Instruction::new(BIPUSH, Operand::Int(200)));
        assert!(matches!(
            code.assemble(&stable_pool()),
            Err(Error::OperandOverflow { value: 200, .. })
        ));

        let mut code = Code::new(0);
        code.append(Instruction::new(IINC, Operand::IInc { index: 1, delta: 300 }));
        assert!(matches!(
            code.assemble(&stable_pool()),
            Err(Error::IIncOverflow { instruction: 0 })
        ));

        let mut code = Code::new(0);
        code.append(Instruction::new(WIDE, Operand::None));
        assert!(matches!(
            code.assemble(&stable_pool()),
            Err(Error::UnsupportedOpcode { opcode: WIDE, .. })
        ));
    }

    #[test]
    fn pool_entries_must_suit_the_opcode() {
        let mut pool = ConstantsPool::new();
        let integer = pool.add(Constant::Integer(100000)).unwrap();
        let hello = pool.add_utf8("hello").unwrap();
        let printstream = pool.add_class(BinaryName::PRINTSTREAM).unwrap();
        let out = pool
            .add_field_ref(
                BinaryName::SYSTEM,
                &UnqualifiedName::OUT,
                &FieldType::object(BinaryName::PRINTSTREAM),
            )
            .unwrap();
        let println = pool
            .add_method_ref(
                BinaryName::PRINTSTREAM,
                &UnqualifiedName::PRINTLN,
                &MethodDescriptor::parse("(I)V").unwrap(),
            )
            .unwrap();
        let run = pool
            .add_interface_method_ref(
                BinaryName::RUNNABLE,
                &UnqualifiedName::from_string(String::from("run")).unwrap(),
                &MethodDescriptor::parse("()V").unwrap(),
            )
            .unwrap();
        pool.stabilize();

        let rejected = [
            (GETSTATIC, integer),
            (PUTFIELD, println),
            (INVOKEVIRTUAL, hello),
            (INVOKEVIRTUAL, run),
            (INVOKESTATIC, out),
            (NEW, integer),
            (CHECKCAST, out),
            (LDC_W, hello),
            (LDC2_W, integer),
        ];
        for (opcode, entry) in rejected {
            let mut code = Code::new(0);
            code.append(Instruction::new(opcode, Operand::Constant(entry)));
            match code.assemble(&pool) {
                Err(Error::InvalidOperand { instruction: 0, .. }) => (),
                other => panic!("{} accepted: {:?}", info(opcode).mnemonic, other),
            }
        }

        let mut code = Code::new(0);
        code.append(Instruction::new(GETSTATIC, Operand::Constant(out)));
        code.append(Instruction::new(INVOKEVIRTUAL, Operand::Constant(println)));
        code.append(Instruction::new(INVOKESTATIC, Operand::Constant(run)));
        code.append(Instruction::new(NEW, Operand::Constant(printstream)));
        code.append(Instruction::new(INSTANCEOF, Operand::Constant(printstream)));
        let assembled = code.assemble(&pool).unwrap();
        assert_eq!(assembled.code_array.0.len(), 15);
    }

    #[test]
    fn exception_ranges() {
        let mut pool = ConstantsPool::new();
        let exception = pool.add_class(BinaryName::EXCEPTION).unwrap();
        pool.stabilize();

        let mut code = Code::new(1);
        code.append(op(NOP)); // 0
        code.append(op(RETURN)); // 1
        code.append(op(ASTORE_0)); // 2
        code.append(op(RETURN)); // 3
        code.add_exception_handler(Handler {
            start: Target::Position(0),
            end: Target::Position(2),
            handler: Target::Position(2),
            catch_type: Some(exception),
        });
        code.add_exception_handler(Handler {
            start: Target::Position(0),
            end: Target::Position(4),
            handler: Target::Position(2),
            catch_type: None,
        });
        let assembled = code.assemble(&pool).unwrap();
        assert_eq!(
            assembled.exception_table,
            vec![
                ExceptionHandler {
                    start_pc: 0,
                    end_pc: 2,
                    handler_pc: 2,
                    catch_type: pool.index(exception).unwrap(),
                },
                ExceptionHandler {
                    start_pc: 0,
                    end_pc: 4,
                    handler_pc: 2,
                    catch_type: 0,
                },
            ]
        );

        code.add_exception_handler(Handler {
            start: Target::Position(1),
            end: Target::Position(1),
            handler: Target::Position(2),
            catch_type: None,
        });
        assert!(matches!(
            code.assemble(&pool),
            Err(Error::InvalidExceptionRange { start: 1, end: 1 })
        ));
    }
}
