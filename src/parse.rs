//! Parsing LEGv8 assembly source code into instructions.
//!
//! This module converts LEGv8 source code into a [`Program`] the
//! simulator can execute.
//!
//! The module notably consists of:
//! - [`parse_program`]: The main function which parses source code into a [`Program`].
//! - [`Parser`]: An incremental parser, producing one instruction at a time.
//! - [`ParseErr`]: The errors raised while parsing.

pub mod lex;

use std::borrow::Cow;
use std::ops::Range;

use logos::Logos;

use self::lex::{LexErr, Token};
use crate::ast::{BranchTarget, Format, Instruction, Label, Opcode, Operands, Program, Reg, RegBank};

/// Parses LEGv8 source code into a program.
///
/// # Example
/// ```
/// use legv8_ensemble::parse::parse_program;
///
/// let program = parse_program("
///     loop: SUBIS X1, X1, #1
///           CBNZ X1, loop
/// ").unwrap();
/// assert_eq!(program.len(), 2);
/// ```
pub fn parse_program(src: &str) -> Result<Program, ParseErr> {
    let mut parser = Parser::new(src);
    let mut instrs = Vec::new();
    while let Some(instr) = parser.next_instruction()? {
        instrs.push(instr);
    }
    Ok(Program(instrs))
}

/// The operand slot the parser was working on when an error occurred.
///
/// These names appear as the prefix of operand error messages
/// (e.g., `immediate: missing operand`).
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Slot {
    /// The destination or target operand.
    To,
    /// The memory operand of a D-format instruction.
    From,
    /// The first source operand.
    FirstOperand,
    /// The second source operand.
    SecondOperand,
    /// An immediate operand.
    Immediate,
    /// The byte offset of a memory operand.
    Offset,
}
impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::To => f.write_str("to"),
            Slot::From => f.write_str("from"),
            Slot::FirstOperand => f.write_str("first operand"),
            Slot::SecondOperand => f.write_str("second operand"),
            Slot::Immediate => f.write_str("immediate"),
            Slot::Offset => f.write_str("offset"),
        }
    }
}

/// Kinds of errors that can occur in an operand slot.
///
/// See [`ParseErrKind::Operand`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum OperandErrKind {
    /// The input ended where this operand was expected.
    Missing,
    /// A token that is not a register of the expected bank was found
    /// where a register was expected.
    NotARegister(RegBank, String),
    /// A token that is not a label was found where a label was expected.
    NotALabel,
    /// A token that is not an integer was found where an immediate was
    /// expected.
    NotAnInteger,
    /// An immediate value does not fit the bit width its slot allows.
    DoesNotFit(u32),
}
impl std::fmt::Display for OperandErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperandErrKind::Missing => f.write_str("missing operand"),
            OperandErrKind::NotARegister(_, text) => write!(f, "not a register '{text}'"),
            OperandErrKind::NotALabel => f.write_str("not a label"),
            OperandErrKind::NotAnInteger => f.write_str("not an integer"),
            OperandErrKind::DoesNotFit(bits) => write!(f, "value is too big for unsigned {bits}-bit integer"),
        }
    }
}

/// Kinds of errors that can occur from parsing LEGv8 assembly.
///
/// See [`ParseErr`] for this error type with span information included.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ParseErrKind {
    /// The tokenizer rejected part of the input.
    Lex(LexErr),
    /// The input ended in the middle of an instruction.
    UnexpectedEof,
    /// Something other than an instruction appeared where one was expected.
    ExpectedInstruction,
    /// The opcode mnemonic is not in the opcode table.
    UnsupportedOpcode(String),
    /// The opcode is in the table, but its format has no operand parser
    /// (the move-immediate format of `MOVZ`/`MOVK`).
    ReservedOpcode(Opcode),
    /// A punctuation token was expected.
    ExpectedToken(&'static str),
    /// An operand could not be parsed.
    Operand {
        /// The operand slot being parsed.
        slot: Slot,
        /// What went wrong with it.
        kind: OperandErrKind,
    },
}
impl std::fmt::Display for ParseErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseErrKind::Lex(e) => e.fmt(f),
            ParseErrKind::UnexpectedEof => f.write_str("unexpected end of input"),
            ParseErrKind::ExpectedInstruction => f.write_str("expected an instruction"),
            ParseErrKind::UnsupportedOpcode(op) => write!(f, "opcode not supported: {op}"),
            ParseErrKind::ReservedOpcode(op) => write!(f, "opcode {op} has no parser"),
            ParseErrKind::ExpectedToken(text) => write!(f, "expected {text}"),
            ParseErrKind::Operand { slot, kind } => write!(f, "{slot}: {kind}"),
        }
    }
}

/// Error from parsing LEGv8 assembly.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParseErr {
    /// The kind of error raised.
    pub kind: ParseErrKind,
    /// The span in the source associated with this error.
    pub span: Range<usize>,
}
impl ParseErr {
    fn new(kind: ParseErrKind, span: Range<usize>) -> Self {
        ParseErr { kind, span }
    }
}
impl std::fmt::Display for ParseErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}
impl std::error::Error for ParseErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ParseErrKind::Lex(e) => Some(e),
            _ => None,
        }
    }
}
impl crate::err::Error for ParseErr {
    fn span(&self) -> Option<Range<usize>> {
        Some(self.span.clone())
    }

    fn help(&self) -> Option<Cow<'_, str>> {
        match &self.kind {
            ParseErrKind::Lex(e) => crate::err::Error::help(e),
            ParseErrKind::UnexpectedEof => None,
            ParseErrKind::ExpectedInstruction => Some("an instruction starts with an optional `label:` and then an opcode".into()),
            ParseErrKind::UnsupportedOpcode(_) => None,
            ParseErrKind::ReservedOpcode(_) => Some("MOVZ and MOVK are recognised but reserved for a future extension".into()),
            ParseErrKind::ExpectedToken(_) => None,
            ParseErrKind::Operand { kind, .. } => match kind {
                OperandErrKind::NotARegister(RegBank::X, _) => Some("this must be X0-X30, XZR, SP, FP, LR, IP0, or IP1".into()),
                OperandErrKind::NotARegister(RegBank::S, _) => Some("this must be S0-S31".into()),
                OperandErrKind::NotARegister(RegBank::D, _) => Some("this must be D0-D31".into()),
                OperandErrKind::DoesNotFit(bits) => {
                    let max = match bits {
                        64 => u64::MAX,
                        b => (1u64 << b) - 1,
                    };
                    Some(format!("the range for an unsigned {bits}-bit integer is [0, {max}]").into())
                }
                _ => None,
            },
        }
    }
}

type SpannedToken = (Result<Token, LexErr>, Range<usize>);

/// A parser for LEGv8 source code, producing one instruction at a time.
///
/// For parsing a whole source file at once, see [`parse_program`].
pub struct Parser<'s> {
    lexer: logos::Lexer<'s, Token>,
    peeked: Option<Option<SpannedToken>>,
}

impl<'s> Parser<'s> {
    /// Creates a parser over the given source code.
    pub fn new(src: &'s str) -> Self {
        Parser { lexer: Token::lexer(src), peeked: None }
    }

    fn bump(&mut self) -> Option<SpannedToken> {
        match self.peeked.take() {
            Some(peeked) => peeked,
            None => {
                let tok = self.lexer.next()?;
                Some((tok, self.lexer.span()))
            }
        }
    }

    fn peek(&mut self) -> Option<&SpannedToken> {
        if self.peeked.is_none() {
            let tok = self.lexer.next();
            let span = self.lexer.span();
            self.peeked = Some(tok.map(|t| (t, span)));
        }
        self.peeked.as_ref().and_then(|peeked| peeked.as_ref())
    }

    fn eof_span(&self) -> Range<usize> {
        let end = self.lexer.source().len();
        end..end
    }

    /// Takes the next token, which must exist; end of input raises `on_eof`.
    fn next_token(&mut self, on_eof: ParseErrKind) -> Result<(Token, Range<usize>), ParseErr> {
        match self.bump() {
            None => Err(ParseErr::new(on_eof, self.eof_span())),
            Some((Err(e), span)) => Err(ParseErr::new(ParseErrKind::Lex(e), span)),
            Some((Ok(tok), span)) => Ok((tok, span)),
        }
    }

    /// Consumes one punctuation token on the way to the given operand slot.
    fn expect_punct(&mut self, tok: Token, text: &'static str, slot: Slot) -> Result<(), ParseErr> {
        let missing = ParseErrKind::Operand { slot, kind: OperandErrKind::Missing };
        let (found, span) = self.next_token(missing)?;
        match found == tok {
            true => Ok(()),
            false => Err(ParseErr::new(ParseErrKind::ExpectedToken(text), span)),
        }
    }

    fn expect_register(&mut self, bank: RegBank, slot: Slot) -> Result<Reg, ParseErr> {
        let missing = ParseErrKind::Operand { slot, kind: OperandErrKind::Missing };
        let (tok, span) = self.next_token(missing)?;

        let text = match tok {
            Token::Name(name) => name,
            _ => self.lexer.source()[span.clone()].to_string(),
        };
        parse_register(bank, &text).ok_or_else(|| {
            let kind = OperandErrKind::NotARegister(bank, text);
            ParseErr::new(ParseErrKind::Operand { slot, kind }, span)
        })
    }

    fn expect_immediate(&mut self, bits: u32, slot: Slot) -> Result<u64, ParseErr> {
        let missing = ParseErrKind::Operand { slot, kind: OperandErrKind::Missing };
        let (tok, span) = self.next_token(missing)?;

        let Token::Int(value) = tok else {
            let kind = OperandErrKind::NotAnInteger;
            return Err(ParseErr::new(ParseErrKind::Operand { slot, kind }, span));
        };
        if bits < 64 && value >> bits != 0 {
            let kind = OperandErrKind::DoesNotFit(bits);
            return Err(ParseErr::new(ParseErrKind::Operand { slot, kind }, span));
        }
        Ok(value)
    }

    fn expect_label(&mut self, slot: Slot) -> Result<Label, ParseErr> {
        let missing = ParseErrKind::Operand { slot, kind: OperandErrKind::Missing };
        let (tok, span) = self.next_token(missing)?;

        match tok {
            Token::Name(name) => Ok(Label::new(name, span)),
            _ => {
                let kind = OperandErrKind::NotALabel;
                Err(ParseErr::new(ParseErrKind::Operand { slot, kind }, span))
            }
        }
    }

    /// Parses the next instruction from the stream.
    ///
    /// Returns `Ok(None)` once the input is exhausted. End of input
    /// anywhere past the start of an instruction is an error.
    pub fn next_instruction(&mut self) -> Result<Option<Instruction>, ParseErr> {
        let Some((tok, span)) = self.bump() else {
            return Ok(None);
        };
        let tok = match tok {
            Ok(tok) => tok,
            Err(e) => return Err(ParseErr::new(ParseErrKind::Lex(e), span)),
        };
        let Token::Name(name) = tok else {
            return Err(ParseErr::new(ParseErrKind::ExpectedInstruction, span));
        };

        // `name:` makes the name a label; the opcode follows it.
        let (label, mnemonic, op_span) = match self.peek() {
            Some((Ok(Token::Colon), _)) => {
                self.bump();
                let (tok, op_span) = self.next_token(ParseErrKind::UnexpectedEof)?;
                let Token::Name(op) = tok else {
                    return Err(ParseErr::new(ParseErrKind::ExpectedInstruction, op_span));
                };
                (Some(Label::new(name, span)), op, op_span)
            }
            _ => (None, name, span),
        };

        let Some(opcode) = Opcode::from_mnemonic(&mnemonic) else {
            return Err(ParseErr::new(ParseErrKind::UnsupportedOpcode(mnemonic), op_span));
        };
        let operands = self.parse_operands(opcode, op_span)?;
        Ok(Some(Instruction { opcode, operands, label }))
    }

    fn parse_operands(&mut self, opcode: Opcode, op_span: Range<usize>) -> Result<Operands, ParseErr> {
        let bank = opcode.reg_bank();
        match opcode.format() {
            Format::R => {
                let dst = self.expect_register(bank, Slot::To)?;
                self.expect_punct(Token::Comma, "','", Slot::FirstOperand)?;
                let src1 = self.expect_register(bank, Slot::FirstOperand)?;
                self.expect_punct(Token::Comma, "','", Slot::SecondOperand)?;
                let src2 = self.expect_register(bank, Slot::SecondOperand)?;
                Ok(Operands::Register { dst, src1, src2 })
            }
            Format::I => {
                let dst = self.expect_register(bank, Slot::To)?;
                self.expect_punct(Token::Comma, "','", Slot::FirstOperand)?;
                let src = self.expect_register(bank, Slot::FirstOperand)?;
                self.expect_punct(Token::Comma, "','", Slot::Immediate)?;
                let imm = self.expect_immediate(16, Slot::Immediate)?;
                Ok(Operands::Immediate { dst, src, imm })
            }
            Format::D => {
                let reg = self.expect_register(bank, Slot::To)?;
                self.expect_punct(Token::Comma, "','", Slot::From)?;
                self.expect_punct(Token::LBrack, "'['", Slot::From)?;
                // the base address always comes from the general file
                let base = self.expect_register(RegBank::X, Slot::From)?;
                self.expect_punct(Token::Comma, "','", Slot::Offset)?;
                let offset = self.expect_immediate(32, Slot::Offset)?;
                self.expect_punct(Token::RBrack, "']'", Slot::Offset)?;
                Ok(Operands::Transfer { reg, base, offset })
            }
            Format::B if opcode == Opcode::BR => {
                let reg = self.expect_register(bank, Slot::To)?;
                Ok(Operands::Branch(BranchTarget::Reg(reg)))
            }
            Format::B => match self.peek() {
                // a numeric PC-relative offset
                Some((Ok(Token::Int(_)), _)) => {
                    let off = self.expect_immediate(64, Slot::To)?;
                    Ok(Operands::Branch(BranchTarget::Offset(off)))
                }
                _ => {
                    let label = self.expect_label(Slot::To)?;
                    Ok(Operands::Branch(BranchTarget::Label(label)))
                }
            },
            Format::CB => {
                let reg = self.expect_register(bank, Slot::From)?;
                self.expect_punct(Token::Comma, "','", Slot::To)?;
                let target = self.expect_label(Slot::To)?;
                Ok(Operands::CompareBranch { reg, target })
            }
            Format::IW => {
                let dst = self.expect_register(bank, Slot::To)?;
                self.expect_punct(Token::Comma, "','", Slot::Immediate)?;
                let imm = self.expect_immediate(32, Slot::Immediate)?;
                Ok(Operands::WideImmediate { dst, imm })
            }
            Format::IM => Err(ParseErr::new(ParseErrKind::ReservedOpcode(opcode), op_span)),
        }
    }
}

/// Parses a register name against the expected bank.
fn parse_register(bank: RegBank, name: &str) -> Option<Reg> {
    use crate::ast::reg_consts;

    if bank == RegBank::X {
        // might be a special purpose register
        match name {
            "XZR" => return Some(reg_consts::XZR),
            "SP" => return Some(reg_consts::SP),
            "FP" => return Some(reg_consts::FP),
            "LR" => return Some(reg_consts::LR),
            "IP0" => return Some(reg_consts::IP0),
            "IP1" => return Some(reg_consts::IP1),
            _ => {}
        }
    }

    let prefix = match bank {
        RegBank::X => 'X',
        RegBank::S => 'S',
        RegBank::D => 'D',
    };
    let no = name.strip_prefix(prefix)?.parse::<u8>().ok()?;
    Reg::new(bank, no)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::reg_consts::*;

    fn parse_one(src: &str) -> Instruction {
        let prog = parse_program(src).unwrap_or_else(|e| panic!("{src:?}: {e}"));
        assert_eq!(prog.len(), 1, "{src:?} should hold one instruction");
        prog[0].clone()
    }

    #[test]
    fn test_r_format() {
        let instr = parse_one("ADD X3, X1, X2");
        assert_eq!(instr.opcode, Opcode::ADD);
        assert_eq!(instr.operands, Operands::Register { dst: X3, src1: X1, src2: X2 });
        assert_eq!(instr.label, None);
    }

    #[test]
    fn test_i_format() {
        let instr = parse_one("ADDI X1, XZR, #5");
        assert_eq!(instr.operands, Operands::Immediate { dst: X1, src: XZR, imm: 5 });

        // the `#` on an immediate is optional
        let instr = parse_one("ADDI X1, XZR, 5");
        assert_eq!(instr.operands, Operands::Immediate { dst: X1, src: XZR, imm: 5 });
    }

    #[test]
    fn test_d_format() {
        let instr = parse_one("LDUR X9, [SP, #16]");
        assert_eq!(instr.operands, Operands::Transfer { reg: X9, base: SP, offset: 16 });
    }

    #[test]
    fn test_b_format() {
        let instr = parse_one("B done");
        let Operands::Branch(BranchTarget::Label(label)) = &instr.operands else {
            panic!("expected label target, got {:?}", instr.operands);
        };
        assert_eq!(label.name, "done");

        let instr = parse_one("B 3");
        assert_eq!(instr.operands, Operands::Branch(BranchTarget::Offset(3)));

        let instr = parse_one("BR LR");
        assert_eq!(instr.operands, Operands::Branch(BranchTarget::Reg(LR)));
    }

    #[test]
    fn test_cb_format() {
        let instr = parse_one("CBZ X1, skip");
        let Operands::CompareBranch { reg, target } = &instr.operands else {
            panic!("expected compare-branch operands, got {:?}", instr.operands);
        };
        assert_eq!(*reg, X1);
        assert_eq!(target.name, "skip");
    }

    #[test]
    fn test_labels() {
        let instr = parse_one("loop: SUBIS X1, X1, #1");
        let label = instr.label.expect("instruction should be labeled");
        assert_eq!(label.name, "loop");
        assert_eq!(label.span(), 0..4);

        let prog = parse_program("start: ADD X1, X2, X3\nB start").unwrap();
        assert_eq!(prog.len(), 2);
    }

    #[test]
    fn test_float_register_banks() {
        let instr = parse_one("FMULS S4, S5, S6");
        assert_eq!(instr.opcode, Opcode::FMULS);

        let instr = parse_one("FSUBD D1, D2, D3");
        assert_eq!(instr.opcode, Opcode::FSUBD);

        // the transfer register follows the opcode's bank; the base is X
        let instr = parse_one("LDURD D1, [X2, #8]");
        let Operands::Transfer { reg, base, .. } = instr.operands else {
            panic!("expected transfer operands");
        };
        assert_eq!(reg.to_string(), "D1");
        assert_eq!(base, X2);

        let err = parse_program("FADDS X1, X2, X3").unwrap_err();
        assert_eq!(err.to_string(), "to: not a register 'X1'");
    }

    #[test]
    fn test_parse_print_round_trip() {
        for &op in Opcode::ALL {
            if op.format() == Format::IM {
                continue;
            }
            let src = sample_line(op);
            let prog = parse_program(&src).unwrap_or_else(|e| panic!("{src:?}: {e}"));
            let printed = prog.to_string();
            let reparsed = parse_program(&printed).unwrap_or_else(|e| panic!("printed {printed:?}: {e}"));
            assert_eq!(printed, reparsed.to_string(), "round trip for {op}");
        }
    }

    fn sample_line(op: Opcode) -> String {
        let b = op.reg_bank();
        match op.format() {
            Format::R => format!("{op} {b}1, {b}2, {b}3"),
            Format::I => format!("{op} {b}1, {b}2, #7"),
            Format::D => format!("{op} {b}1, [X2, #16]"),
            Format::B if op == Opcode::BR => format!("{op} X5"),
            Format::B => format!("{op} somewhere"),
            Format::CB => format!("{op} {b}1, somewhere"),
            Format::IW => format!("{op} {b}1, #7"),
            Format::IM => unreachable!(),
        }
    }

    #[test]
    fn test_missing_immediate() {
        // a truncated instruction must identify the slot it stopped in
        let err = parse_program("ADDI X1, X2").unwrap_err();
        assert_eq!(err.to_string(), "immediate: missing operand");
    }

    #[test]
    fn test_unsupported_opcode() {
        let err = parse_program("NOP").unwrap_err();
        assert_eq!(err.to_string(), "opcode not supported: NOP");
        assert_eq!(err.span, 0..3);
    }

    #[test]
    fn test_reserved_opcodes() {
        let err = parse_program("MOVZ X1, #2").unwrap_err();
        assert_eq!(err.kind, ParseErrKind::ReservedOpcode(Opcode::MOVZ));

        // the exclusive pair parses; it only fails at execution
        assert!(parse_program("LDXR X1, [X2, #0]").is_ok());
    }

    #[test]
    fn test_immediate_width_limits() {
        assert!(parse_program("ADDI X1, X2, #65535").is_ok());
        let err = parse_program("ADDI X1, X2, #65536").unwrap_err();
        assert_eq!(err.to_string(), "immediate: value is too big for unsigned 16-bit integer");

        assert!(parse_program("LDUR X1, [X2, #4294967295]").is_ok());
        let err = parse_program("LDUR X1, [X2, #4294967296]").unwrap_err();
        assert_eq!(err.to_string(), "offset: value is too big for unsigned 32-bit integer");
    }

    #[test]
    fn test_register_errors() {
        let err = parse_program("ADD X1, X2, Y3").unwrap_err();
        assert_eq!(err.to_string(), "second operand: not a register 'Y3'");

        let err = parse_program("ADD X31, X1, X2").unwrap_err();
        assert_eq!(err.to_string(), "to: not a register 'X31'");

        let err = parse_program("ADD X1, #5, X2").unwrap_err();
        assert_eq!(err.to_string(), "first operand: not a register '#5'");

        let err = parse_program("BR loop").unwrap_err();
        assert_eq!(err.to_string(), "to: not a register 'loop'");
    }

    #[test]
    fn test_punctuation_errors() {
        let err = parse_program("ADD X1 X2, X3").unwrap_err();
        assert_eq!(err.to_string(), "expected ','");

        let err = parse_program("LDUR X1, X2, #0").unwrap_err();
        assert_eq!(err.to_string(), "expected '['");
    }

    #[test]
    fn test_eof_handling() {
        // clean EOF before an instruction is the end of the stream
        assert_eq!(parse_program("").unwrap(), Program::default());
        assert_eq!(parse_program(" \n ; comments only\n").unwrap(), Program::default());

        // a label with no instruction is not
        let err = parse_program("dangling:").unwrap_err();
        assert_eq!(err.kind, ParseErrKind::UnexpectedEof);
    }

    #[test]
    fn test_lex_error_surfaces() {
        let err = parse_program("ADD X1, X2, @").unwrap_err();
        assert_eq!(err.kind, ParseErrKind::Lex(LexErr::InvalidSymbol));
    }

    #[test]
    fn test_stray_token() {
        let err = parse_program(", ADD X1, X2, X3").unwrap_err();
        assert_eq!(err.kind, ParseErrKind::ExpectedInstruction);
    }
}
