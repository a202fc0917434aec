use super::class_file::Constant;
use super::code::Label;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// Adding the constant would push the next free pool slot past `u16::MAX`
    ConstantPoolOverflow {
        constant: Constant,
        offset: usize,
    },

    /// UTF-8 constant whose modified UTF-8 encoding does not fit a `u16` length
    Utf8ConstantTooLong(usize),

    ConstantPoolSealed,
    ConstantPoolNotStable,
    ConstantPoolNotSealed,

    /// `optimize` was requested after indices were already fixed
    ConstantPoolAlreadyStable,

    /// Constant is not in the pool
    MissingConstant(String),

    IoError(std::io::Error),

    /// Code was added to an abstract or native method, or to a method of an interface
    MethodHasNoCode,

    /// Method or field was mutated after being finalized for serialization
    MemberFinalized,

    /// Instruction position does not exist
    InvalidPosition(usize),

    /// Label was used as a target but never placed
    UnplacedLabel(Label),

    /// Label was placed more than once
    DuplicateLabel(Label),

    /// Branch or switch target is outside of the method's instructions
    InvalidBranchTarget {
        instruction: usize,
        target: usize,
    },

    /// Conditional branch displacement does not fit in 16 bits
    BranchOverflow {
        instruction: usize,
        displacement: isize,
    },

    /// Immediate operand does not fit in its encoded width
    OperandOverflow {
        instruction: usize,
        value: i64,
    },

    /// `iinc` index or delta does not fit in a byte
    IIncOverflow {
        instruction: usize,
    },

    /// Lookup switch keys are not strictly ascending
    UnsortedLookupSwitch {
        instruction: usize,
    },

    EmptyTableSwitch {
        instruction: usize,
    },

    /// Exception handler with a start that is not before its end
    InvalidExceptionRange {
        start: usize,
        end: usize,
    },

    /// Opcode that cannot be assembled from the available operand shapes
    UnsupportedOpcode {
        instruction: usize,
        opcode: u8,
    },

    /// Operand shape does not match what the opcode expects
    InvalidOperand {
        instruction: usize,
        opcode: &'static str,
    },

    /// Method code is 65536 bytes or longer
    MethodCodeOverflow(usize),

    /// Too many fields, methods, interfaces, or attributes for a `u16` count
    TooManyMembers(&'static str),

    IllegalAccessFlags {
        kind: &'static str,
        flags: u16,
        illegal: u16,
    },

    InvalidName(String),
    InvalidDescriptor(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConstantPoolOverflow { constant, offset } => write!(
                f,
                "constant pool is full at slot {} (while adding {:?})",
                offset, constant
            ),
            Error::Utf8ConstantTooLong(len) => {
                write!(f, "UTF-8 constant is {} bytes long when encoded", len)
            }
            Error::ConstantPoolSealed => f.write_str("constant pool is sealed"),
            Error::ConstantPoolNotStable => f.write_str("constant pool indices are not yet fixed"),
            Error::ConstantPoolNotSealed => f.write_str("constant pool must be sealed first"),
            Error::ConstantPoolAlreadyStable => {
                f.write_str("constant pool indices are already fixed")
            }
            Error::MissingConstant(constant) => {
                write!(f, "constant {} is not in the pool", constant)
            }
            Error::IoError(err) => write!(f, "I/O error: {}", err),
            Error::MethodHasNoCode => f.write_str("method cannot have code"),
            Error::MemberFinalized => f.write_str("member is already finalized"),
            Error::InvalidPosition(position) => {
                write!(f, "no instruction at position {}", position)
            }
            Error::UnplacedLabel(label) => write!(f, "label {:?} was never placed", label),
            Error::DuplicateLabel(label) => write!(f, "label {:?} was placed twice", label),
            Error::InvalidBranchTarget {
                instruction,
                target,
            } => write!(
                f,
                "instruction {} targets nonexistent position {}",
                instruction, target
            ),
            Error::BranchOverflow {
                instruction,
                displacement,
            } => write!(
                f,
                "instruction {} branches {} bytes away, which needs a wide form",
                instruction, displacement
            ),
            Error::OperandOverflow { instruction, value } => write!(
                f,
                "instruction {} has operand {} which is out of range",
                instruction, value
            ),
            Error::IIncOverflow { instruction } => {
                write!(f, "instruction {} has an iinc operand out of range", instruction)
            }
            Error::UnsortedLookupSwitch { instruction } => write!(
                f,
                "instruction {} has lookupswitch keys that are not strictly ascending",
                instruction
            ),
            Error::EmptyTableSwitch { instruction } => {
                write!(f, "instruction {} is a tableswitch with no targets", instruction)
            }
            Error::InvalidExceptionRange { start, end } => write!(
                f,
                "exception handler range {}..{} is empty or backwards",
                start, end
            ),
            Error::UnsupportedOpcode {
                instruction,
                opcode,
            } => write!(
                f,
                "instruction {} uses unsupported opcode 0x{:02x}",
                instruction, opcode
            ),
            Error::InvalidOperand {
                instruction,
                opcode,
            } => write!(f, "instruction {} has an invalid operand for {}", instruction, opcode),
            Error::MethodCodeOverflow(len) => write!(f, "method code is {} bytes long", len),
            Error::TooManyMembers(what) => write!(f, "too many {}", what),
            Error::IllegalAccessFlags {
                kind,
                flags,
                illegal,
            } => write!(
                f,
                "{} access flags 0x{:04x} include illegal bits 0x{:04x}",
                kind, flags, illegal
            ),
            Error::InvalidName(msg) => write!(f, "invalid name: {}", msg),
            Error::InvalidDescriptor(msg) => write!(f, "invalid descriptor: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}
