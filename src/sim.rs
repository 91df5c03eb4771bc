//! Simulating and execution for LEGv8 assembly.
//!
//! This module is focused on executing parsed code (i.e., [`Program`]).
//!
//! This module consists of:
//! - [`Simulator`]: The struct that simulates parsed code.
//! - [`mem`]: The module handling memory and the register file.
//!
//! # Usage
//!
//! A program is loaded with [`Simulator::load`] and then executed with
//! [`Simulator::run`], [`Simulator::run_with_limit`], or one instruction
//! at a time with [`Simulator::step`]:
//!
//! ```
//! use legv8_ensemble::parse::parse_program;
//! use legv8_ensemble::sim::Simulator;
//!
//! let program = parse_program("
//!     loop: SUBIS X1, X1, #1
//!           CBNZ X1, loop
//! ").unwrap();
//!
//! let mut sim = Simulator::new(Default::default());
//! sim.load(program).unwrap();
//! sim.run_with_limit(1000).unwrap(); // <-- bounds runaway programs
//! ```

pub mod mem;

use std::collections::HashMap;

use crate::ast::reg_consts::LR;
use crate::ast::{AluOp, BranchTarget, Cond, Dir, Label, Opcode, Operands, Program};

use self::mem::{FillStrategy, Memory, RegFile};

/// Errors raised while executing a program.
///
/// A simulation error stops the simulator; the program cannot meaningfully
/// continue past it.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SimErr {
    /// An opcode whose runtime semantics are reserved reached execution.
    ///
    /// See [`Opcode::is_reserved`].
    Reserved(Opcode),
    /// An instruction's operands do not match the shape of its opcode's
    /// format.
    ///
    /// The parser never produces such instructions; this can only occur
    /// in hand-constructed programs.
    InvalidOperands(Opcode),
    /// A branch targeted a label that no instruction defines.
    UndefinedLabel(String),
}
impl std::fmt::Display for SimErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimErr::Reserved(op) => write!(f, "opcode {op} is reserved and cannot be executed"),
            SimErr::InvalidOperands(op) => write!(f, "operands do not match the format of {op}"),
            SimErr::UndefinedLabel(label) => write!(f, "undefined label: {label}"),
        }
    }
}
impl std::error::Error for SimErr {}
impl crate::err::Error for SimErr {
    fn help(&self) -> Option<std::borrow::Cow<'_, str>> {
        match self {
            SimErr::Reserved(_) => Some("the floating-point, exclusive-access, and move-immediate instructions are reserved for a future extension".into()),
            SimErr::InvalidOperands(_) => None,
            SimErr::UndefinedLabel(_) => Some("labels are defined by prefixing an instruction with `name:`".into()),
        }
    }
}

/// Errors that can occur from loading a program into the simulator.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum LoadErr {
    /// The same label was defined on more than one instruction.
    DuplicateLabel(String),
}
impl std::fmt::Display for LoadErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadErr::DuplicateLabel(label) => write!(f, "label was defined multiple times: {label}"),
        }
    }
}
impl std::error::Error for LoadErr {}
impl crate::err::Error for LoadErr {
    fn help(&self) -> Option<std::borrow::Cow<'_, str>> {
        match self {
            LoadErr::DuplicateLabel(_) => Some("labels must be unique within a program, try renaming one of the labels".into()),
        }
    }
}

/// Configuration for a [`Simulator`].
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct SimFlags {
    /// The fill strategy for uninitialized registers and memory.
    ///
    /// This is used to seed the register file and fill newly allocated
    /// memory blocks, both at construction and on every [`Simulator::load`].
    pub fill_strat: FillStrategy,
}

/// Executes parsed programs.
///
/// The simulator owns 32 general-purpose 64-bit registers, the N/Z/V/C
/// condition flags, a program counter that indexes into the loaded
/// program, and a sparse byte-addressable [`Memory`]. Registers and
/// memory start out filled by the configured [`FillStrategy`], modeling
/// undefined initial state.
#[derive(Debug)]
pub struct Simulator {
    /// Simulated memory.
    pub mem: Memory,

    /// The general-purpose register file.
    pub reg_file: RegFile,

    /// The program counter: the index of the next instruction to execute.
    pub pc: u64,

    /// The condition flags. See [`PState`].
    pstate: PState,

    /// Maps each label to the index of the instruction it annotates.
    labels: HashMap<String, u64>,

    /// The loaded program.
    prog: Program,

    /// The number of instructions successfully run since the last load.
    ///
    /// Write 0 to reset the counter.
    pub instructions_run: u64,

    /// The simulator's configuration.
    ///
    /// These settings are preserved across loads.
    pub flags: SimFlags,
}

impl Simulator {
    /// Creates a new simulator with no program loaded.
    ///
    /// Registers (and any memory the caller touches) are filled according
    /// to the flags' [`FillStrategy`].
    pub fn new(flags: SimFlags) -> Self {
        let mut filler = flags.fill_strat.filler();

        Self {
            reg_file: RegFile::new(&mut filler),
            mem: Memory::with_filler(filler),
            pc: 0,
            pstate: PState::new(),
            labels: HashMap::new(),
            prog: Program::default(),
            instructions_run: 0,
            flags,
        }
    }

    /// Loads a program into this simulator.
    ///
    /// Loading builds the label → index map, discards any previous machine
    /// state (memory, registers, flags, and the instruction counter are
    /// reinitialized from the configured fill strategy), and resets the PC
    /// to 0. Configuration flags are preserved.
    ///
    /// This fails, leaving the simulator untouched, if the same label is
    /// defined on more than one instruction.
    pub fn load(&mut self, prog: Program) -> Result<(), LoadErr> {
        let mut labels = HashMap::new();
        for (i, instr) in prog.iter().enumerate() {
            if let Some(label) = &instr.label {
                if labels.insert(label.name.clone(), i as u64).is_some() {
                    return Err(LoadErr::DuplicateLabel(label.name.clone()));
                }
            }
        }

        let mut filler = self.flags.fill_strat.filler();
        self.reg_file = RegFile::new(&mut filler);
        self.mem = Memory::with_filler(filler);
        self.pc = 0;
        self.pstate = PState::new();
        self.labels = labels;
        self.prog = prog;
        self.instructions_run = 0;
        Ok(())
    }

    /// Gets the current condition flags.
    pub fn pstate(&self) -> PState {
        self.pstate
    }

    /// Resolves a branch target to a PC value.
    fn resolve(&self, target: &BranchTarget) -> Result<u64, SimErr> {
        match target {
            BranchTarget::Label(label) => self.lookup(label),
            BranchTarget::Offset(off) => Ok(self.pc.wrapping_add(*off)),
            BranchTarget::Reg(reg) => Ok(self.reg_file.get(*reg)),
        }
    }

    /// Resolves a label to the index of the instruction it annotates.
    fn lookup(&self, label: &Label) -> Result<u64, SimErr> {
        self.labels
            .get(&label.name)
            .copied()
            .ok_or_else(|| SimErr::UndefinedLabel(label.name.clone()))
    }

    /// Executes the instruction that PC points to.
    ///
    /// Returns `Ok(true)` when the PC remains within program bounds after
    /// execution and `Ok(false)` otherwise (the program has ended). No
    /// instruction halts explicitly; programs end by running off the end,
    /// or loop until the caller stops stepping (see
    /// [`Simulator::run_with_limit`]).
    pub fn step(&mut self) -> Result<bool, SimErr> {
        let Some(instr) = usize::try_from(self.pc).ok().and_then(|pc| self.prog.get(pc)) else {
            return Ok(false);
        };
        let opcode = instr.opcode;

        if opcode.is_reserved() {
            return Err(SimErr::Reserved(opcode));
        }

        if let Some((op, set_flags)) = opcode.alu_op() {
            let (dst, x, y) = match &instr.operands {
                Operands::Register { dst, src1, src2 } => {
                    (*dst, self.reg_file.get(*src1), self.reg_file.get(*src2))
                }
                Operands::Immediate { dst, src, imm } => (*dst, self.reg_file.get(*src), *imm),
                _ => return Err(SimErr::InvalidOperands(opcode)),
            };

            let (result, carry, overflow) = alu_eval(op, x, y);
            self.reg_file.set(dst, result);
            if set_flags {
                self.pstate = PState::of_result(result, carry, overflow);
            }
            self.pc += 1;
        } else if let Some((dir, size)) = opcode.transfer() {
            let (reg, base, offset) = match &instr.operands {
                Operands::Transfer { reg, base, offset } => (*reg, *base, *offset),
                _ => return Err(SimErr::InvalidOperands(opcode)),
            };

            let addr = self.reg_file.get(base).wrapping_add(offset);
            match dir {
                Dir::Store => {
                    let bytes = self.reg_file.get(reg).to_le_bytes();
                    self.mem.write(&bytes[..size], addr);
                }
                Dir::Load => {
                    // partial-width loads zero-extend
                    let mut bytes = [0u8; 8];
                    self.mem.read(&mut bytes[..size], addr);
                    self.reg_file.set(reg, u64::from_le_bytes(bytes));
                }
            }
            self.pc += 1;
        } else if let Some(cond) = opcode.condition() {
            let Operands::Branch(target) = &instr.operands else {
                return Err(SimErr::InvalidOperands(opcode));
            };
            match self.pstate.satisfies(cond) {
                true => self.pc = self.resolve(target)?,
                false => self.pc += 1,
            }
        } else {
            match (opcode, &instr.operands) {
                (Opcode::B | Opcode::BR, Operands::Branch(target)) => {
                    self.pc = self.resolve(target)?;
                }
                (Opcode::BL, Operands::Branch(target)) => {
                    let target = self.resolve(target)?;
                    self.reg_file.set(LR, self.pc);
                    self.pc = target;
                }
                (Opcode::CBZ, Operands::CompareBranch { reg, target }) => {
                    match self.reg_file.get(*reg) == 0 {
                        true => self.pc = self.lookup(target)?,
                        false => self.pc += 1,
                    }
                }
                (Opcode::CBNZ, Operands::CompareBranch { reg, target }) => {
                    match self.reg_file.get(*reg) != 0 {
                        true => self.pc = self.lookup(target)?,
                        false => self.pc += 1,
                    }
                }
                _ => return Err(SimErr::InvalidOperands(opcode)),
            }
        }

        self.instructions_run = self.instructions_run.wrapping_add(1);
        Ok(self.pc < self.prog.len() as u64)
    }

    /// Executes the program until it ends or an error occurs.
    ///
    /// Note that a program looping forever never ends; use
    /// [`Simulator::run_with_limit`] to bound it.
    pub fn run(&mut self) -> Result<(), SimErr> {
        while self.step()? {}
        Ok(())
    }

    /// Executes at most `max_steps` instructions, then returns.
    pub fn run_with_limit(&mut self, max_steps: u64) -> Result<(), SimErr> {
        let start = self.instructions_run;
        while self.instructions_run.wrapping_sub(start) < max_steps {
            if !self.step()? {
                break;
            }
        }
        Ok(())
    }
}
impl Default for Simulator {
    fn default() -> Self {
        Self::new(Default::default())
    }
}

/// Evaluates one ALU operation, returning the result along with the
/// carry/borrow-out and signed-overflow bits.
///
/// Carry and overflow are only meaningful for add/sub; the logical
/// operations report both as false.
fn alu_eval(op: AluOp, x: u64, y: u64) -> (u64, bool, bool) {
    match op {
        AluOp::Add => {
            let (result, carry) = x.overflowing_add(y);
            (result, carry, (!(x ^ y) & (x ^ result)) >> 63 != 0)
        }
        AluOp::Sub => {
            let (result, borrow) = x.overflowing_sub(y);
            (result, borrow, ((x ^ y) & (x ^ result)) >> 63 != 0)
        }
        AluOp::And => (x & y, false, false),
        AluOp::Orr => (x | y, false, false),
        AluOp::Eor => (x ^ y, false, false),
        // shift counts of 64 or more drain the value
        AluOp::Lsl => (if y < 64 { x << y } else { 0 }, false, false),
        AluOp::Lsr => (if y < 64 { x >> y } else { 0 }, false, false),
        AluOp::Mul => (x.wrapping_mul(y), false, false),
        AluOp::Sdiv => {
            // division by zero yields 0, as on real hardware
            let quotient = match y as i64 {
                0 => 0,
                d => (x as i64).wrapping_div(d),
            };
            (quotient as u64, false, false)
        }
        AluOp::Udiv => (if y == 0 { 0 } else { x / y }, false, false),
        AluOp::Smulh => ((((x as i64 as i128) * (y as i64 as i128)) >> 64) as u64, false, false),
        AluOp::Umulh => ((((x as u128) * (y as u128)) >> 64) as u64, false, false),
    }
}

/// A wrapper over `u8` holding the processor's condition flags.
///
/// The flags are encoded as the following bits:
/// - `PState[0]`: N (negative)
/// - `PState[1]`: Z (zero)
/// - `PState[2]`: V (signed overflow)
/// - `PState[3]`: C (carry)
///
/// Flags are replaced wholesale by every S-suffixed arithmetic/logical
/// instruction and read by the `B.cond` branches through
/// [`PState::satisfies`].
#[derive(PartialEq, Eq, Clone, Copy, Default)]
pub struct PState(u8);

const FLAG_N: u8 = 1 << 0;
const FLAG_Z: u8 = 1 << 1;
const FLAG_V: u8 = 1 << 2;
const FLAG_C: u8 = 1 << 3;

impl PState {
    /// Creates a flag state with every flag clear.
    pub fn new() -> Self {
        PState(0)
    }

    /// Builds the flag state an S-suffixed operation produces.
    pub(crate) fn of_result(result: u64, carry: bool, overflow: bool) -> Self {
        let mut bits = 0;
        if result >> 63 != 0 {
            bits |= FLAG_N;
        }
        if result == 0 {
            bits |= FLAG_Z;
        }
        if overflow {
            bits |= FLAG_V;
        }
        if carry {
            bits |= FLAG_C;
        }
        PState(bits)
    }

    /// Whether the negative flag is set.
    pub fn n(self) -> bool {
        self.0 & FLAG_N != 0
    }
    /// Whether the zero flag is set.
    pub fn z(self) -> bool {
        self.0 & FLAG_Z != 0
    }
    /// Whether the overflow flag is set.
    pub fn v(self) -> bool {
        self.0 & FLAG_V != 0
    }
    /// Whether the carry flag is set.
    pub fn c(self) -> bool {
        self.0 & FLAG_C != 0
    }

    /// Evaluates a branch condition against the flags.
    pub fn satisfies(self, cond: Cond) -> bool {
        match cond {
            Cond::Eq => self.z(),
            Cond::Ne => !self.z(),
            Cond::Lt => self.n() != self.v(),
            Cond::Le => !(!self.z() && self.n() == self.v()),
            Cond::Gt => !self.z() && self.n() == self.v(),
            Cond::Ge => self.n() == self.v(),
            Cond::Lo => !self.c(),
            Cond::Ls => !(!self.z() && self.c()),
            Cond::Hi => !self.z() && self.c(),
            Cond::Hs => self.c(),
            Cond::Mi => self.n(),
            Cond::Pl => !self.n(),
            Cond::Vs => self.v(),
            Cond::Vc => !self.v(),
        }
    }
}
impl std::fmt::Debug for PState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use std::fmt::Write;

        f.write_str("PState(")?;
        if self.n() {
            f.write_char('N')?;
        }
        if self.z() {
            f.write_char('Z')?;
        }
        if self.v() {
            f.write_char('V')?;
        }
        if self.c() {
            f.write_char('C')?;
        }
        f.write_char(')')
    }
}
