//! Opcode bytes and the static metadata table describing their operands
//!
//! See [the instruction set chapter][0] for the meaning of every opcode.
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-6.html

/// Shape and encoded width of the operand following an opcode
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperandKind {
    /// No operand bytes
    None,

    /// Unsigned byte local variable index
    LocalIndex,

    /// Signed byte immediate (`bipush`)
    SignedByte,

    /// Signed short immediate (`sipush`)
    SignedShort,

    /// Unsigned byte primitive array type code (`newarray`)
    ArrayType,

    /// One byte constant pool index (`ldc`)
    NarrowConstant,

    /// Two byte index of a loadable constant (`ldc_w`, `ldc2_w`)
    Constant,

    /// Two byte index of a field reference
    FieldRef,

    /// Two byte index of a method reference
    MethodRef,

    /// Two byte index of a class
    ClassRef,

    /// Two byte constant pool index, then an argument slot count byte, then a zero byte
    InterfaceMethod,

    /// Two byte signed branch displacement
    Branch,

    /// Four byte signed branch displacement
    WideBranch,

    /// Unsigned byte local index and signed byte increment
    IInc,

    /// Padding, then default, low, high, and one displacement per value
    TableSwitch,

    /// Padding, then default, pair count, and sorted `(key, displacement)` pairs
    LookupSwitch,

    /// Opcodes that cannot be expressed with the available operand shapes (`wide`,
    /// `invokedynamic`, `multianewarray`, reserved opcodes)
    Unsupported,
}

impl OperandKind {
    /// Number of bytes the operand occupies, if it does not depend on the instruction's position
    /// or contents
    pub const fn fixed_length(&self) -> Option<usize> {
        match self {
            OperandKind::None => Some(0),
            OperandKind::LocalIndex
            | OperandKind::SignedByte
            | OperandKind::ArrayType
            | OperandKind::NarrowConstant => Some(1),
            OperandKind::SignedShort
            | OperandKind::Constant
            | OperandKind::FieldRef
            | OperandKind::MethodRef
            | OperandKind::ClassRef
            | OperandKind::Branch
            | OperandKind::IInc => Some(2),
            OperandKind::InterfaceMethod | OperandKind::WideBranch => Some(4),
            OperandKind::TableSwitch | OperandKind::LookupSwitch | OperandKind::Unsupported => None,
        }
    }
}

/// Metadata about one opcode
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub mnemonic: &'static str,
    pub operand: OperandKind,
}

impl OpcodeInfo {
    const RESERVED: OpcodeInfo = OpcodeInfo {
        mnemonic: "<reserved>",
        operand: OperandKind::Unsupported,
    };
}

/// Look up the metadata for an opcode
pub fn info(opcode: u8) -> &'static OpcodeInfo {
    &OPCODE_TABLE[opcode as usize]
}

macro_rules! opcodes {
    ($($name:ident = $code:literal, $mnemonic:literal, $kind:ident;)*) => {
        $(pub const $name: u8 = $code;)*

        const fn build_table() -> [OpcodeInfo; 256] {
            let mut table = [OpcodeInfo::RESERVED; 256];
            $(
                table[$code] = OpcodeInfo {
                    mnemonic: $mnemonic,
                    operand: OperandKind::$kind,
                };
            )*
            table
        }
    };
}

/// Metadata for every opcode byte, indexed by opcode
pub static OPCODE_TABLE: [OpcodeInfo; 256] = build_table();

opcodes! {
    NOP = 0x00, "nop", None;
    ACONST_NULL = 0x01, "aconst_null", None;
    ICONST_M1 = 0x02, "iconst_m1", None;
    ICONST_0 = 0x03, "iconst_0", None;
    ICONST_1 = 0x04, "iconst_1", None;
    ICONST_2 = 0x05, "iconst_2", None;
    ICONST_3 = 0x06, "iconst_3", None;
    ICONST_4 = 0x07, "iconst_4", None;
    ICONST_5 = 0x08, "iconst_5", None;
    LCONST_0 = 0x09, "lconst_0", None;
    LCONST_1 = 0x0a, "lconst_1", None;
    FCONST_0 = 0x0b, "fconst_0", None;
    FCONST_1 = 0x0c, "fconst_1", None;
    FCONST_2 = 0x0d, "fconst_2", None;
    DCONST_0 = 0x0e, "dconst_0", None;
    DCONST_1 = 0x0f, "dconst_1", None;
    BIPUSH = 0x10, "bipush", SignedByte;
    SIPUSH = 0x11, "sipush", SignedShort;
    LDC = 0x12, "ldc", NarrowConstant;
    LDC_W = 0x13, "ldc_w", Constant;
    LDC2_W = 0x14, "ldc2_w", Constant;
    ILOAD = 0x15, "iload", LocalIndex;
    LLOAD = 0x16, "lload", LocalIndex;
    FLOAD = 0x17, "fload", LocalIndex;
    DLOAD = 0x18, "dload", LocalIndex;
    ALOAD = 0x19, "aload", LocalIndex;
    ILOAD_0 = 0x1a, "iload_0", None;
    ILOAD_1 = 0x1b, "iload_1", None;
    ILOAD_2 = 0x1c, "iload_2", None;
    ILOAD_3 = 0x1d, "iload_3", None;
    LLOAD_0 = 0x1e, "lload_0", None;
    LLOAD_1 = 0x1f, "lload_1", None;
    LLOAD_2 = 0x20, "lload_2", None;
    LLOAD_3 = 0x21, "lload_3", None;
    FLOAD_0 = 0x22, "fload_0", None;
    FLOAD_1 = 0x23, "fload_1", None;
    FLOAD_2 = 0x24, "fload_2", None;
    FLOAD_3 = 0x25, "fload_3", None;
    DLOAD_0 = 0x26, "dload_0", None;
    DLOAD_1 = 0x27, "dload_1", None;
    DLOAD_2 = 0x28, "dload_2", None;
    DLOAD_3 = 0x29, "dload_3", None;
    ALOAD_0 = 0x2a, "aload_0", None;
    ALOAD_1 = 0x2b, "aload_1", None;
    ALOAD_2 = 0x2c, "aload_2", None;
    ALOAD_3 = 0x2d, "aload_3", None;
    IALOAD = 0x2e, "iaload", None;
    LALOAD = 0x2f, "laload", None;
    FALOAD = 0x30, "faload", None;
    DALOAD = 0x31, "daload", None;
    AALOAD = 0x32, "aaload", None;
    BALOAD = 0x33, "baload", None;
    CALOAD = 0x34, "caload", None;
    SALOAD = 0x35, "saload", None;
    ISTORE = 0x36, "istore", LocalIndex;
    LSTORE = 0x37, "lstore", LocalIndex;
    FSTORE = 0x38, "fstore", LocalIndex;
    DSTORE = 0x39, "dstore", LocalIndex;
    ASTORE = 0x3a, "astore", LocalIndex;
    ISTORE_0 = 0x3b, "istore_0", None;
    ISTORE_1 = 0x3c, "istore_1", None;
    ISTORE_2 = 0x3d, "istore_2", None;
    ISTORE_3 = 0x3e, "istore_3", None;
    LSTORE_0 = 0x3f, "lstore_0", None;
    LSTORE_1 = 0x40, "lstore_1", None;
    LSTORE_2 = 0x41, "lstore_2", None;
    LSTORE_3 = 0x42, "lstore_3", None;
    FSTORE_0 = 0x43, "fstore_0", None;
    FSTORE_1 = 0x44, "fstore_1", None;
    FSTORE_2 = 0x45, "fstore_2", None;
    FSTORE_3 = 0x46, "fstore_3", None;
    DSTORE_0 = 0x47, "dstore_0", None;
    DSTORE_1 = 0x48, "dstore_1", None;
    DSTORE_2 = 0x49, "dstore_2", None;
    DSTORE_3 = 0x4a, "dstore_3", None;
    ASTORE_0 = 0x4b, "astore_0", None;
    ASTORE_1 = 0x4c, "astore_1", None;
    ASTORE_2 = 0x4d, "astore_2", None;
    ASTORE_3 = 0x4e, "astore_3", None;
    IASTORE = 0x4f, "iastore", None;
    LASTORE = 0x50, "lastore", None;
    FASTORE = 0x51, "fastore", None;
    DASTORE = 0x52, "dastore", None;
    AASTORE = 0x53, "aastore", None;
    BASTORE = 0x54, "bastore", None;
    CASTORE = 0x55, "castore", None;
    SASTORE = 0x56, "sastore", None;
    POP = 0x57, "pop", None;
    POP2 = 0x58, "pop2", None;
    DUP = 0x59, "dup", None;
    DUP_X1 = 0x5a, "dup_x1", None;
    DUP_X2 = 0x5b, "dup_x2", None;
    DUP2 = 0x5c, "dup2", None;
    DUP2_X1 = 0x5d, "dup2_x1", None;
    DUP2_X2 = 0x5e, "dup2_x2", None;
    SWAP = 0x5f, "swap", None;
    IADD = 0x60, "iadd", None;
    LADD = 0x61, "ladd", None;
    FADD = 0x62, "fadd", None;
    DADD = 0x63, "dadd", None;
    ISUB = 0x64, "isub", None;
    LSUB = 0x65, "lsub", None;
    FSUB = 0x66, "fsub", None;
    DSUB = 0x67, "dsub", None;
    IMUL = 0x68, "imul", None;
    LMUL = 0x69, "lmul", None;
    FMUL = 0x6a, "fmul", None;
    DMUL = 0x6b, "dmul", None;
    IDIV = 0x6c, "idiv", None;
    LDIV = 0x6d, "ldiv", None;
    FDIV = 0x6e, "fdiv", None;
    DDIV = 0x6f, "ddiv", None;
    IREM = 0x70, "irem", None;
    LREM = 0x71, "lrem", None;
    FREM = 0x72, "frem", None;
    DREM = 0x73, "drem", None;
    INEG = 0x74, "ineg", None;
    LNEG = 0x75, "lneg", None;
    FNEG = 0x76, "fneg", None;
    DNEG = 0x77, "dneg", None;
    ISHL = 0x78, "ishl", None;
    LSHL = 0x79, "lshl", None;
    ISHR = 0x7a, "ishr", None;
    LSHR = 0x7b, "lshr", None;
    IUSHR = 0x7c, "iushr", None;
    LUSHR = 0x7d, "lushr", None;
    IAND = 0x7e, "iand", None;
    LAND = 0x7f, "land", None;
    IOR = 0x80, "ior", None;
    LOR = 0x81, "lor", None;
    IXOR = 0x82, "ixor", None;
    LXOR = 0x83, "lxor", None;
    IINC = 0x84, "iinc", IInc;
    I2L = 0x85, "i2l", None;
    I2F = 0x86, "i2f", None;
    I2D = 0x87, "i2d", None;
    L2I = 0x88, "l2i", None;
    L2F = 0x89, "l2f", None;
    L2D = 0x8a, "l2d", None;
    F2I = 0x8b, "f2i", None;
    F2L = 0x8c, "f2l", None;
    F2D = 0x8d, "f2d", None;
    D2I = 0x8e, "d2i", None;
    D2L = 0x8f, "d2l", None;
    D2F = 0x90, "d2f", None;
    I2B = 0x91, "i2b", None;
    I2C = 0x92, "i2c", None;
    I2S = 0x93, "i2s", None;
    LCMP = 0x94, "lcmp", None;
    FCMPL = 0x95, "fcmpl", None;
    FCMPG = 0x96, "fcmpg", None;
    DCMPL = 0x97, "dcmpl", None;
    DCMPG = 0x98, "dcmpg", None;
    IFEQ = 0x99, "ifeq", Branch;
    IFNE = 0x9a, "ifne", Branch;
    IFLT = 0x9b, "iflt", Branch;
    IFGE = 0x9c, "ifge", Branch;
    IFGT = 0x9d, "ifgt", Branch;
    IFLE = 0x9e, "ifle", Branch;
    IF_ICMPEQ = 0x9f, "if_icmpeq", Branch;
    IF_ICMPNE = 0xa0, "if_icmpne", Branch;
    IF_ICMPLT = 0xa1, "if_icmplt", Branch;
    IF_ICMPGE = 0xa2, "if_icmpge", Branch;
    IF_ICMPGT = 0xa3, "if_icmpgt", Branch;
    IF_ICMPLE = 0xa4, "if_icmple", Branch;
    IF_ACMPEQ = 0xa5, "if_acmpeq", Branch;
    IF_ACMPNE = 0xa6, "if_acmpne", Branch;
    GOTO = 0xa7, "goto", Branch;
    JSR = 0xa8, "jsr", Branch;
    RET = 0xa9, "ret", LocalIndex;
    TABLESWITCH = 0xaa, "tableswitch", TableSwitch;
    LOOKUPSWITCH = 0xab, "lookupswitch", LookupSwitch;
    IRETURN = 0xac, "ireturn", None;
    LRETURN = 0xad, "lreturn", None;
    FRETURN = 0xae, "freturn", None;
    DRETURN = 0xaf, "dreturn", None;
    ARETURN = 0xb0, "areturn", None;
    RETURN = 0xb1, "return", None;
    GETSTATIC = 0xb2, "getstatic", FieldRef;
    PUTSTATIC = 0xb3, "putstatic", FieldRef;
    GETFIELD = 0xb4, "getfield", FieldRef;
    PUTFIELD = 0xb5, "putfield", FieldRef;
    INVOKEVIRTUAL = 0xb6, "invokevirtual", MethodRef;
    INVOKESPECIAL = 0xb7, "invokespecial", MethodRef;
    INVOKESTATIC = 0xb8, "invokestatic", MethodRef;
    INVOKEINTERFACE = 0xb9, "invokeinterface", InterfaceMethod;
    INVOKEDYNAMIC = 0xba, "invokedynamic", Unsupported;
    NEW = 0xbb, "new", ClassRef;
    NEWARRAY = 0xbc, "newarray", ArrayType;
    ANEWARRAY = 0xbd, "anewarray", ClassRef;
    ARRAYLENGTH = 0xbe, "arraylength", None;
    ATHROW = 0xbf, "athrow", None;
    CHECKCAST = 0xc0, "checkcast", ClassRef;
    INSTANCEOF = 0xc1, "instanceof", ClassRef;
    MONITORENTER = 0xc2, "monitorenter", None;
    MONITOREXIT = 0xc3, "monitorexit", None;
    WIDE = 0xc4, "wide", Unsupported;
    MULTIANEWARRAY = 0xc5, "multianewarray", Unsupported;
    IFNULL = 0xc6, "ifnull", Branch;
    IFNONNULL = 0xc7, "ifnonnull", Branch;
    GOTO_W = 0xc8, "goto_w", WideBranch;
    JSR_W = 0xc9, "jsr_w", WideBranch;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn table_is_keyed_by_opcode() {
        assert_eq!(info(NOP).mnemonic, "nop");
        assert_eq!(info(IF_ICMPLT).mnemonic, "if_icmplt");
        assert_eq!(info(IF_ICMPLT).operand, OperandKind::Branch);
        assert_eq!(info(GOTO_W).operand, OperandKind::WideBranch);
        assert_eq!(info(GETFIELD).operand, OperandKind::FieldRef);
        assert_eq!(info(INVOKESPECIAL).operand, OperandKind::MethodRef);
        assert_eq!(info(ANEWARRAY).operand.fixed_length(), Some(2));
        assert_eq!(info(INVOKEINTERFACE).operand.fixed_length(), Some(4));
        assert_eq!(info(TABLESWITCH).operand.fixed_length(), None);
    }

    #[test]
    fn reserved_opcodes_are_unsupported() {
        for opcode in 0xcau8..=0xff {
            assert_eq!(info(opcode).operand, OperandKind::Unsupported);
        }
        assert_eq!(info(WIDE).operand, OperandKind::Unsupported);
    }
}
