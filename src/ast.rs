//! Components used to represent LEGv8 assembly instructions.
//!
//! These components together are used to construct...
//! - [`Instruction`] (a data structure holding one parsed instruction),
//! - and [`Program`] (an ordered sequence of instructions, executable by
//!   the [`sim`] module).
//!
//! [`sim`]: crate::sim

use std::fmt::Write as _;

/// A register operand.
///
/// Internally, this is the 8-bit bank encoding used by the register file:
///
/// | range    | registers    |
/// |----------|--------------|
/// | `0..=30` | `X0`-`X30`   |
/// | `31`     | `XZR`        |
/// | `32..=63`| `S0`-`S31`   |
/// | `64..=95`| `D0`-`D31`   |
///
/// A `Reg` can be constructed by selecting a register from [`reg_consts`],
/// or by using [`Reg::new`].
///
/// ## Examples
///
/// ```text
/// SUBS X10, X9, X8
///      ~~~  ~~  ~~
/// LDUR X9, [SP, #16]
///      ~~   ~~
/// FMULS S4, S5, S6
///       ~~  ~~  ~~
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Reg(pub(crate) u8);

/// Constants for naming registers directly.
pub mod reg_consts {
    use super::Reg;

    macro_rules! x_consts {
        ($($name:ident: $no:literal),+ $(,)?) => {
            $(
                #[doc = concat!("General-purpose register `", stringify!($name), "`.")]
                pub const $name: Reg = Reg($no);
            )+
        }
    }
    x_consts! {
        X0: 0, X1: 1, X2: 2, X3: 3, X4: 4, X5: 5, X6: 6, X7: 7,
        X8: 8, X9: 9, X10: 10, X11: 11, X12: 12, X13: 13, X14: 14, X15: 15,
        X16: 16, X17: 17, X18: 18, X19: 19, X20: 20, X21: 21, X22: 22, X23: 23,
        X24: 24, X25: 25, X26: 26, X27: 27, X28: 28, X29: 29, X30: 30,
    }

    /// The zero register. It reads as 0, and writes to it are discarded.
    pub const XZR: Reg = Reg(31);

    /// First intra-procedure-call scratch register (alias for `X16`).
    pub const IP0: Reg = X16;
    /// Second intra-procedure-call scratch register (alias for `X17`).
    pub const IP1: Reg = X17;
    /// The stack pointer (alias for `X28`).
    pub const SP: Reg = X28;
    /// The frame pointer (alias for `X29`).
    pub const FP: Reg = X29;
    /// The link register (alias for `X30`).
    pub const LR: Reg = X30;
}

/// The bank a register belongs to.
///
/// The parser decides which bank an operand is expected from based on the
/// opcode (e.g., `FMULS` takes `S` registers, `FMULD` takes `D` registers,
/// and everything else takes `X` registers).
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum RegBank {
    /// The general-purpose 64-bit registers, `X0`-`X30` and `XZR`.
    X,
    /// The single-precision floating-point registers, `S0`-`S31`.
    S,
    /// The double-precision floating-point registers, `D0`-`D31`.
    D,
}
impl std::fmt::Display for RegBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegBank::X => f.write_char('X'),
            RegBank::S => f.write_char('S'),
            RegBank::D => f.write_char('D'),
        }
    }
}

impl Reg {
    /// Creates a numbered register in the given bank.
    ///
    /// Register numbers run from 0 to 30 for the `X` bank (`XZR` is only
    /// nameable through [`reg_consts::XZR`] or its mnemonic) and from
    /// 0 to 31 for the `S` and `D` banks. Anything else returns `None`.
    pub fn new(bank: RegBank, no: u8) -> Option<Self> {
        match bank {
            RegBank::X if no <= 30 => Some(Reg(no)),
            RegBank::S if no <= 31 => Some(Reg(32 + no)),
            RegBank::D if no <= 31 => Some(Reg(64 + no)),
            _ => None,
        }
    }

    /// Gets the bank this register belongs to.
    pub fn bank(self) -> RegBank {
        match self.0 {
            0..=31 => RegBank::X,
            32..=63 => RegBank::S,
            _ => RegBank::D,
        }
    }

    /// Gets the register number within its bank (e.g., 7 for `X7` or `S7`).
    pub fn reg_no(self) -> u8 {
        match self.bank() {
            RegBank::X => self.0,
            RegBank::S => self.0 - 32,
            RegBank::D => self.0 - 64,
        }
    }

    /// Whether this register is the always-zero register `XZR`.
    pub fn is_zero(self) -> bool {
        self.0 == 31
    }
}
impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            31 => f.write_str("XZR"),
            n @ 0..=30 => write!(f, "X{n}"),
            n @ 32..=63 => write!(f, "S{}", n - 32),
            n @ 64..=95 => write!(f, "D{}", n - 64),
            _ => f.write_str("invalid"),
        }
    }
}

/// A condition evaluated by the `B.cond` family of branches.
///
/// The predicates, in terms of the N/Z/V/C flags:
///
/// | cond | predicate       | cond | predicate       |
/// |------|-----------------|------|-----------------|
/// | `EQ` | Z               | `LO` | !C              |
/// | `NE` | !Z              | `LS` | !(!Z && C)      |
/// | `LT` | N != V          | `HI` | !Z && C         |
/// | `LE` | !(!Z && N == V) | `HS` | C               |
/// | `GT` | !Z && N == V    | `MI` | N               |
/// | `GE` | N == V          | `PL` | !N              |
/// |      |                 | `VS` | V               |
/// |      |                 | `VC` | !V              |
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[allow(missing_docs)]
pub enum Cond {
    Eq, Ne, Lt, Le, Gt, Ge, Lo, Ls, Hi, Hs, Mi, Pl, Vs, Vc,
}
impl std::fmt::Display for Cond {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Cond::Eq => "EQ", Cond::Ne => "NE",
            Cond::Lt => "LT", Cond::Le => "LE",
            Cond::Gt => "GT", Cond::Ge => "GE",
            Cond::Lo => "LO", Cond::Ls => "LS",
            Cond::Hi => "HI", Cond::Hs => "HS",
            Cond::Mi => "MI", Cond::Pl => "PL",
            Cond::Vs => "VS", Cond::Vc => "VC",
        };
        f.write_str(s)
    }
}

/// The operand syntax class of an opcode.
///
/// Every opcode in the table maps to exactly one format, which dictates
/// which [`Operands`] variant the parser produces for it.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[allow(clippy::upper_case_acronyms)]
pub enum Format {
    /// Register format: `Rd, Rn, Rm`.
    R,
    /// Immediate format: `Rd, Rn, #imm` (imm fits 16 bits).
    I,
    /// Data-transfer format: `Rt, [Rn, #off]` (off fits 32 bits).
    D,
    /// Branch format: a label, a numeric PC offset, or (for `BR`) a register.
    B,
    /// Compare-and-branch format: `Rt, label`.
    CB,
    /// Wide-immediate format: `Rd, #imm` (imm fits 32 bits).
    IW,
    /// Move-immediate format, reserved for `MOVZ`/`MOVK`. It has no parser.
    IM,
}

macro_rules! opcode_table {
    ($($op:ident: $text:literal => $fmt:ident),+ $(,)?) => {
        /// An opcode mnemonic recognised by the parser.
        ///
        /// The set of opcodes, the mnemonic text of each, and the
        /// [`Format`] each is parsed with are all defined by one table;
        /// [`Opcode::from_mnemonic`], [`Opcode::format`], and the
        /// [`Display`] implementation are generated from it.
        ///
        /// [`Display`]: std::fmt::Display
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
        #[allow(clippy::upper_case_acronyms)]
        pub enum Opcode {
            $(
                #[doc = concat!("The `", $text, "` instruction.")]
                $op
            ),+
        }

        impl Opcode {
            /// Every opcode in the table.
            pub(crate) const ALL: &'static [Opcode] = &[$(Self::$op),+];

            /// Looks up a mnemonic in the opcode table.
            ///
            /// Mnemonics are matched exactly as written in source
            /// (uppercase, with the `B.cond` dot included).
            pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
                match mnemonic {
                    $($text => Some(Self::$op),)+
                    _ => None
                }
            }

            /// The operand format this opcode is parsed and printed with.
            pub fn format(self) -> Format {
                match self {
                    $(Self::$op => Format::$fmt),+
                }
            }
        }

        impl std::fmt::Display for Opcode {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$op => f.write_str($text)),+
                }
            }
        }
    }
}
opcode_table! {
    ADD:   "ADD"   => R,
    ADDI:  "ADDI"  => I,
    ADDIS: "ADDIS" => I,
    ADDS:  "ADDS"  => R,
    AND:   "AND"   => R,
    ANDI:  "ANDI"  => I,
    ANDIS: "ANDIS" => I,
    ANDS:  "ANDS"  => R,
    B:     "B"     => B,
    BEQ:   "B.EQ"  => B,
    BNE:   "B.NE"  => B,
    BLT:   "B.LT"  => B,
    BLE:   "B.LE"  => B,
    BGT:   "B.GT"  => B,
    BGE:   "B.GE"  => B,
    BLO:   "B.LO"  => B,
    BLS:   "B.LS"  => B,
    BHI:   "B.HI"  => B,
    BHS:   "B.HS"  => B,
    BMI:   "B.MI"  => B,
    BPL:   "B.PL"  => B,
    BVS:   "B.VS"  => B,
    BVC:   "B.VC"  => B,
    BL:    "BL"    => B,
    BR:    "BR"    => B,
    CBNZ:  "CBNZ"  => CB,
    CBZ:   "CBZ"   => CB,
    EOR:   "EOR"   => R,
    EORI:  "EORI"  => I,
    LDUR:  "LDUR"  => D,
    LDURB: "LDURB" => D,
    LDURH: "LDURH" => D,
    LDURS: "LDURS" => D,
    LDURD: "LDURD" => D,
    LDXR:  "LDXR"  => D,
    LSL:   "LSL"   => I,
    LSR:   "LSR"   => I,
    MOVK:  "MOVK"  => IM,
    MOVZ:  "MOVZ"  => IM,
    MUL:   "MUL"   => R,
    ORR:   "ORR"   => R,
    ORRI:  "ORRI"  => I,
    SDIV:  "SDIV"  => R,
    SMULH: "SMULH" => R,
    STUR:  "STUR"  => D,
    STURB: "STURB" => D,
    STURH: "STURH" => D,
    STURW: "STURW" => D,
    STURS: "STURS" => D,
    STURD: "STURD" => D,
    STXR:  "STXR"  => D,
    SUB:   "SUB"   => R,
    SUBI:  "SUBI"  => I,
    SUBIS: "SUBIS" => I,
    SUBS:  "SUBS"  => R,
    UDIV:  "UDIV"  => R,
    UMULH: "UMULH" => R,

    FADDS: "FADDS" => R,
    FADDD: "FADDD" => R,
    FCMPS: "FCMPS" => R,
    FCMPD: "FCMPD" => R,
    FDIVS: "FDIVS" => R,
    FDIVD: "FDIVD" => R,
    FMULS: "FMULS" => R,
    FMULD: "FMULD" => R,
    FSUBD: "FSUBD" => R,
}

/// An ALU operation, decoded from an opcode's mnemonic family.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum AluOp {
    Add, Sub, And, Orr, Eor, Lsl, Lsr, Mul, Sdiv, Udiv, Smulh, Umulh,
}

/// The direction of a data-transfer instruction.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum Dir {
    Load, Store,
}

impl Opcode {
    /// Decodes this opcode into an ALU operation and whether it sets the
    /// condition flags (the `S` suffix).
    pub(crate) fn alu_op(self) -> Option<(AluOp, bool)> {
        use Opcode::*;
        let decoded = match self {
            ADD | ADDI => (AluOp::Add, false),
            ADDS | ADDIS => (AluOp::Add, true),
            SUB | SUBI => (AluOp::Sub, false),
            SUBS | SUBIS => (AluOp::Sub, true),
            AND | ANDI => (AluOp::And, false),
            ANDS | ANDIS => (AluOp::And, true),
            ORR | ORRI => (AluOp::Orr, false),
            EOR | EORI => (AluOp::Eor, false),
            LSL => (AluOp::Lsl, false),
            LSR => (AluOp::Lsr, false),
            MUL => (AluOp::Mul, false),
            SDIV => (AluOp::Sdiv, false),
            UDIV => (AluOp::Udiv, false),
            SMULH => (AluOp::Smulh, false),
            UMULH => (AluOp::Umulh, false),
            _ => return None,
        };
        Some(decoded)
    }

    /// Decodes this opcode into a transfer direction and access width in
    /// bytes, for the load/store family the simulator implements.
    pub(crate) fn transfer(self) -> Option<(Dir, usize)> {
        use Opcode::*;
        match self {
            LDUR => Some((Dir::Load, 8)),
            LDURH => Some((Dir::Load, 2)),
            LDURB => Some((Dir::Load, 1)),
            STUR => Some((Dir::Store, 8)),
            STURW => Some((Dir::Store, 4)),
            STURH => Some((Dir::Store, 2)),
            STURB => Some((Dir::Store, 1)),
            _ => None,
        }
    }

    /// The condition this opcode evaluates, for the `B.cond` family.
    pub fn condition(self) -> Option<Cond> {
        use Opcode::*;
        match self {
            BEQ => Some(Cond::Eq),
            BNE => Some(Cond::Ne),
            BLT => Some(Cond::Lt),
            BLE => Some(Cond::Le),
            BGT => Some(Cond::Gt),
            BGE => Some(Cond::Ge),
            BLO => Some(Cond::Lo),
            BLS => Some(Cond::Ls),
            BHI => Some(Cond::Hi),
            BHS => Some(Cond::Hs),
            BMI => Some(Cond::Mi),
            BPL => Some(Cond::Pl),
            BVS => Some(Cond::Vs),
            BVC => Some(Cond::Vc),
            _ => None,
        }
    }

    /// Whether this opcode is recognised by the parser but reserved for a
    /// future extension of the simulator.
    ///
    /// This covers the exclusive-access pair (`LDXR`/`STXR`), the
    /// move-immediate pair (`MOVZ`/`MOVK`), and the floating-point
    /// instructions. Executing a reserved opcode raises
    /// [`SimErr::Reserved`].
    ///
    /// [`SimErr::Reserved`]: crate::sim::SimErr::Reserved
    pub fn is_reserved(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            MOVK | MOVZ | LDXR | STXR | LDURS | LDURD | STURS | STURD
                | FADDS | FADDD | FCMPS | FCMPD | FDIVS | FDIVD | FMULS | FMULD | FSUBD
        )
    }

    /// The register bank this opcode's register operands are expected from.
    pub(crate) fn reg_bank(self) -> RegBank {
        use Opcode::*;
        match self {
            LDURS | STURS | FADDS | FCMPS | FDIVS | FMULS => RegBank::S,
            LDURD | STURD | FADDD | FCMPD | FDIVD | FMULD | FSUBD => RegBank::D,
            _ => RegBank::X,
        }
    }
}

/// A symbolic name for a position in the program.
///
/// Holds the label's identifier (the `name` field) along with where in the
/// source text it was written.
///
/// # Examples
/// ```text
///          ADDI X0, XZR, #0
/// repeat:  SUBIS X1, X1, #1
/// ~~~~~~
///          ADDI X0, X0, #1
///          CBNZ X1, repeat
///                   ~~~~~~
/// finish:  STUR X0, [XZR, #0]
/// ~~~~~~
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Label {
    /// The identifier naming this label.
    pub name: String,

    /// Where the label starts in the source text.
    ///
    /// The name's length recovers the full span, so only the start is
    /// kept.
    start: usize,
}
impl Label {
    /// Creates a label from its name and source span.
    pub fn new(name: String, span: std::ops::Range<usize>) -> Self {
        debug_assert_eq!(span.start + name.len(), span.end, "span length should match the label name");
        Label { name, start: span.start }
    }
    /// The range of source text this label occupies.
    pub fn span(&self) -> std::ops::Range<usize> {
        self.start..(self.start + self.name.len())
    }
}
impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.name.fmt(f)
    }
}

/// The target of a branch instruction.
///
/// During execution, a [`Label`] target resolves through the program's
/// label map, a numeric offset is taken relative to the current PC (in
/// instruction units), and a register target (`BR`) jumps to the
/// register's value.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum BranchTarget {
    /// A symbolic label.
    Label(Label),
    /// A PC-relative offset, in instruction units.
    Offset(u64),
    /// A register holding the target PC.
    Reg(Reg),
}
impl std::fmt::Display for BranchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BranchTarget::Label(label) => label.fmt(f),
            BranchTarget::Offset(off) => off.fmt(f),
            BranchTarget::Reg(reg) => reg.fmt(f),
        }
    }
}

/// The operands of an instruction.
///
/// Each variant carries exactly the fields its [`Format`] applies, so an
/// instruction can never hold (say) both an immediate and a second source
/// register.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Operands {
    /// R-format operands: `Rd, Rn, Rm`.
    Register {
        /// The destination register.
        dst: Reg,
        /// The first source register.
        src1: Reg,
        /// The second source register.
        src2: Reg,
    },
    /// I-format operands: `Rd, Rn, #imm`.
    Immediate {
        /// The destination register.
        dst: Reg,
        /// The source register.
        src: Reg,
        /// The immediate second operand.
        imm: u64,
    },
    /// D-format operands: `Rt, [Rn, #off]`.
    Transfer {
        /// The register loaded into or stored from.
        reg: Reg,
        /// The base address register.
        base: Reg,
        /// The unsigned byte offset added to the base.
        offset: u64,
    },
    /// B-format operand: the branch target.
    Branch(BranchTarget),
    /// CB-format operands: `Rt, label`.
    CompareBranch {
        /// The register compared against zero.
        reg: Reg,
        /// The label branched to.
        target: Label,
    },
    /// IW-format operands: `Rd, #imm`.
    WideImmediate {
        /// The destination register.
        dst: Reg,
        /// The immediate operand.
        imm: u64,
    },
}
impl std::fmt::Display for Operands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operands::Register { dst, src1, src2 } => write!(f, "{dst}, {src1}, {src2}"),
            Operands::Immediate { dst, src, imm } => write!(f, "{dst}, {src}, #{imm}"),
            Operands::Transfer { reg, base, offset } => write!(f, "{reg}, [{base}, #{offset}]"),
            Operands::Branch(target) => target.fmt(f),
            Operands::CompareBranch { reg, target } => write!(f, "{reg}, {target}"),
            Operands::WideImmediate { dst, imm } => write!(f, "{dst}, #{imm}"),
        }
    }
}

/// A single parsed instruction.
///
/// The `Display` implementation prints the instruction back in a form the
/// parser accepts.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Instruction {
    /// The opcode.
    pub opcode: Opcode,
    /// The operands, in the shape dictated by the opcode's format.
    pub operands: Operands,
    /// The label defined on this line, if any.
    pub label: Option<Label>,
}
impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(label) = &self.label {
            write!(f, "{label}: ")?;
        }
        write!(f, "{} {}", self.opcode, self.operands)
    }
}

/// A parsed program: an ordered sequence of instructions.
///
/// The instruction at index `i` is addressed by PC value `i`, and a label
/// resolves to the index of the instruction it annotates.
///
/// The `Display` implementation renders a listing with all opcodes aligned
/// past the longest label.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Program(
    /// The instructions, in program order.
    pub Vec<Instruction>,
);

impl std::ops::Deref for Program {
    type Target = [Instruction];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl FromIterator<Instruction> for Program {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Program(iter.into_iter().collect())
    }
}
impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let indent = self.0.iter()
            .filter_map(|instr| instr.label.as_ref())
            .map(|label| label.name.len() + 2)
            .max()
            .unwrap_or(0);

        for instr in &self.0 {
            let used = match &instr.label {
                Some(label) => {
                    write!(f, "{label}: ")?;
                    label.name.len() + 2
                }
                None => 0,
            };
            for _ in used..indent {
                f.write_char(' ')?;
            }
            writeln!(f, "{} {}", instr.opcode, instr.operands)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::reg_consts::*;
    use super::*;

    #[test]
    fn test_reg_display() {
        assert_eq!(X0.to_string(), "X0");
        assert_eq!(X30.to_string(), "X30");
        assert_eq!(XZR.to_string(), "XZR");
        assert_eq!(SP.to_string(), "X28");
        assert_eq!(LR.to_string(), "X30");
        assert_eq!(Reg::new(RegBank::S, 31).unwrap().to_string(), "S31");
        assert_eq!(Reg::new(RegBank::D, 12).unwrap().to_string(), "D12");
    }

    #[test]
    fn test_reg_new_bounds() {
        assert_eq!(Reg::new(RegBank::X, 30), Some(X30));
        // X31 is only nameable as XZR
        assert_eq!(Reg::new(RegBank::X, 31), None);
        assert!(Reg::new(RegBank::S, 31).is_some());
        assert_eq!(Reg::new(RegBank::S, 32), None);
        assert_eq!(Reg::new(RegBank::D, 200), None);
    }

    #[test]
    fn test_reg_banks() {
        assert_eq!(X7.bank(), RegBank::X);
        assert_eq!(XZR.bank(), RegBank::X);
        assert_eq!(Reg::new(RegBank::S, 0).unwrap().bank(), RegBank::S);
        assert_eq!(Reg::new(RegBank::D, 0).unwrap().bank(), RegBank::D);
        assert_eq!(Reg::new(RegBank::D, 9).unwrap().reg_no(), 9);
        assert!(XZR.is_zero());
        assert!(!X0.is_zero());
    }

    #[test]
    fn test_opcode_mnemonics() {
        for &op in Opcode::ALL {
            assert_eq!(Opcode::from_mnemonic(&op.to_string()), Some(op), "mnemonic round-trip for {op}");
        }
        assert_eq!(Opcode::from_mnemonic("B.EQ"), Some(Opcode::BEQ));
        assert_eq!(Opcode::from_mnemonic("NOP"), None);
        // matching is case-sensitive, as in the opcode table
        assert_eq!(Opcode::from_mnemonic("add"), None);
    }

    #[test]
    fn test_opcode_classification() {
        assert_eq!(Opcode::ADD.format(), Format::R);
        assert_eq!(Opcode::ADDI.format(), Format::I);
        assert_eq!(Opcode::LDUR.format(), Format::D);
        assert_eq!(Opcode::BEQ.format(), Format::B);
        assert_eq!(Opcode::CBZ.format(), Format::CB);
        assert_eq!(Opcode::MOVZ.format(), Format::IM);

        assert_eq!(Opcode::ADDIS.alu_op(), Some((AluOp::Add, true)));
        assert_eq!(Opcode::MUL.alu_op(), Some((AluOp::Mul, false)));
        assert_eq!(Opcode::LDUR.alu_op(), None);
        assert_eq!(Opcode::STURW.transfer(), Some((Dir::Store, 4)));
        assert_eq!(Opcode::LDURB.transfer(), Some((Dir::Load, 1)));
        assert_eq!(Opcode::BHI.condition(), Some(Cond::Hi));
        assert_eq!(Opcode::B.condition(), None);

        assert!(Opcode::LDXR.is_reserved());
        assert!(Opcode::FSUBD.is_reserved());
        assert!(!Opcode::SUBS.is_reserved());

        assert_eq!(Opcode::FMULS.reg_bank(), RegBank::S);
        assert_eq!(Opcode::FSUBD.reg_bank(), RegBank::D);
        assert_eq!(Opcode::LDURS.reg_bank(), RegBank::S);
        assert_eq!(Opcode::STURD.reg_bank(), RegBank::D);
        assert_eq!(Opcode::ADD.reg_bank(), RegBank::X);
    }

    #[test]
    fn test_instruction_display() {
        let instr = Instruction {
            opcode: Opcode::ADDI,
            operands: Operands::Immediate { dst: X1, src: XZR, imm: 5 },
            label: None,
        };
        assert_eq!(instr.to_string(), "ADDI X1, XZR, #5");

        let instr = Instruction {
            opcode: Opcode::STUR,
            operands: Operands::Transfer { reg: X3, base: XZR, offset: 0 },
            label: Some(Label::new("out".to_string(), 0..3)),
        };
        assert_eq!(instr.to_string(), "out: STUR X3, [XZR, #0]");
    }

    #[test]
    fn test_program_listing_alignment() {
        let prog = Program(vec![
            Instruction {
                opcode: Opcode::CBZ,
                operands: Operands::CompareBranch {
                    reg: X1,
                    target: Label::new("done".to_string(), 9..13),
                },
                label: None,
            },
            Instruction {
                opcode: Opcode::ADDI,
                operands: Operands::Immediate { dst: X2, src: XZR, imm: 9 },
                label: Some(Label::new("done".to_string(), 14..18)),
            },
        ]);
        assert_eq!(prog.to_string(), "      CBZ X1, done\ndone: ADDI X2, XZR, #9\n");
    }
}
