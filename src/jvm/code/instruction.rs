use super::opcodes::{self, info, OperandKind};
use super::Label;
use crate::jvm::class_file::{Constant, ConstantEntry, ConstantsPool};
use crate::jvm::Error;

/// Where a branch, switch case, or exception handler range points
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// 0-based instruction position
    Position(usize),

    /// Position of a label, once it is placed
    Label(Label),
}

impl From<usize> for Target {
    fn from(position: usize) -> Target {
        Target::Position(position)
    }
}

impl From<Label> for Target {
    fn from(label: Label) -> Target {
        Target::Label(label)
    }
}

/// Targets of a `tableswitch` or `lookupswitch`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SwitchTable {
    /// Dense switch over `low ..= low + targets.len() - 1`
    Table {
        low: i32,
        targets: Vec<Target>,
        default: Target,
    },

    /// Sparse switch, keys must be strictly ascending
    Lookup {
        pairs: Vec<(i32, Target)>,
        default: Target,
    },
}

impl SwitchTable {
    pub fn default_target(&self) -> Target {
        match self {
            SwitchTable::Table { default, .. } | SwitchTable::Lookup { default, .. } => *default,
        }
    }

    /// Every target, default first
    pub fn targets(&self) -> Vec<Target> {
        let mut all = vec![self.default_target()];
        match self {
            SwitchTable::Table { targets, .. } => all.extend(targets.iter().copied()),
            SwitchTable::Lookup { pairs, .. } => all.extend(pairs.iter().map(|(_, target)| *target)),
        }
        all
    }

    /// Number of bytes after the opcode, given the padding needed to align the operand
    pub fn operand_length(&self, padding: usize) -> usize {
        match self {
            SwitchTable::Table { targets, .. } => padding + 12 + 4 * targets.len(),
            SwitchTable::Lookup { pairs, .. } => padding + 8 + 8 * pairs.len(),
        }
    }
}

/// Operand of an instruction
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    None,

    /// Immediate value or local variable index
    Int(i32),

    /// Constant pool reference
    Constant(ConstantEntry),

    Branch(Target),

    /// Local variable index and signed increment for `iinc`
    IInc { index: u32, delta: i32 },

    Switch(SwitchTable),
}

/// One instruction in a method's code
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u8,
    pub operand: Operand,
}

impl Instruction {
    pub fn new(opcode: u8, operand: Operand) -> Instruction {
        Instruction { opcode, operand }
    }

    /// Does the operand have the shape the opcode expects?
    pub fn operand_matches(&self) -> bool {
        matches!(
            (info(self.opcode).operand, &self.operand),
            (OperandKind::None, Operand::None)
                | (
                    OperandKind::LocalIndex
                        | OperandKind::SignedByte
                        | OperandKind::SignedShort
                        | OperandKind::ArrayType,
                    Operand::Int(_)
                )
                | (
                    OperandKind::NarrowConstant
                        | OperandKind::Constant
                        | OperandKind::FieldRef
                        | OperandKind::MethodRef
                        | OperandKind::ClassRef
                        | OperandKind::InterfaceMethod,
                    Operand::Constant(_)
                )
                | (OperandKind::Branch | OperandKind::WideBranch, Operand::Branch(_))
                | (OperandKind::IInc, Operand::IInc { .. })
                | (OperandKind::TableSwitch, Operand::Switch(SwitchTable::Table { .. }))
                | (OperandKind::LookupSwitch, Operand::Switch(SwitchTable::Lookup { .. }))
        )
    }
}

/// Shortest instruction pushing a constant
///
/// Only values that can't be encoded inline get added to the pool. Float and double zeros are
/// compared by bits, so `-0.0` is always loaded from the pool.
impl Instruction {
    pub fn push_int(constants: &mut ConstantsPool, value: i32) -> Result<Instruction, Error> {
        Ok(match value {
            -1..=5 => Instruction::new((opcodes::ICONST_0 as i32 + value) as u8, Operand::None),
            -128..=127 => Instruction::new(opcodes::BIPUSH, Operand::Int(value)),
            -32768..=32767 => Instruction::new(opcodes::SIPUSH, Operand::Int(value)),
            _ => {
                let entry = constants.add(Constant::Integer(value))?;
                Instruction::new(opcodes::LDC, Operand::Constant(entry))
            }
        })
    }

    pub fn push_long(constants: &mut ConstantsPool, value: i64) -> Result<Instruction, Error> {
        Ok(match value {
            0 => Instruction::new(opcodes::LCONST_0, Operand::None),
            1 => Instruction::new(opcodes::LCONST_1, Operand::None),
            _ => {
                let entry = constants.add(Constant::Long(value))?;
                Instruction::new(opcodes::LDC2_W, Operand::Constant(entry))
            }
        })
    }

    pub fn push_float(constants: &mut ConstantsPool, value: f32) -> Result<Instruction, Error> {
        let opcode = if value.to_bits() == 0.0f32.to_bits() {
            opcodes::FCONST_0
        } else if value == 1.0 {
            opcodes::FCONST_1
        } else if value == 2.0 {
            opcodes::FCONST_2
        } else {
            let entry = constants.add(Constant::float(value))?;
            return Ok(Instruction::new(opcodes::LDC, Operand::Constant(entry)));
        };
        Ok(Instruction::new(opcode, Operand::None))
    }

    pub fn push_double(constants: &mut ConstantsPool, value: f64) -> Result<Instruction, Error> {
        let opcode = if value.to_bits() == 0.0f64.to_bits() {
            opcodes::DCONST_0
        } else if value == 1.0 {
            opcodes::DCONST_1
        } else {
            let entry = constants.add(Constant::double(value))?;
            return Ok(Instruction::new(opcodes::LDC2_W, Operand::Constant(entry)));
        };
        Ok(Instruction::new(opcode, Operand::None))
    }

    pub fn push_string(
        constants: &mut ConstantsPool,
        value: impl Into<String>,
    ) -> Result<Instruction, Error> {
        let entry = constants.add_string(value)?;
        Ok(Instruction::new(opcodes::LDC, Operand::Constant(entry)))
    }

    /// Push any loadable constant, dispatching numbers to their dedicated forms
    pub fn push_constant(
        constants: &mut ConstantsPool,
        constant: Constant,
    ) -> Result<Instruction, Error> {
        match constant {
            Constant::Integer(value) => Instruction::push_int(constants, value),
            Constant::Long(value) => Instruction::push_long(constants, value),
            Constant::Float(bits) => Instruction::push_float(constants, f32::from_bits(bits)),
            Constant::Double(bits) => Instruction::push_double(constants, f64::from_bits(bits)),
            other => {
                let opcode = if other.is_wide_loadable() {
                    opcodes::LDC2_W
                } else {
                    opcodes::LDC
                };
                let entry = constants.add(other)?;
                Ok(Instruction::new(opcode, Operand::Constant(entry)))
            }
        }
    }
}
