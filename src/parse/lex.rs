//! Tokenizing LEGv8 assembly.
//!
//! This module holds the tokens that characterize LEGv8 assembly
//! ([`Token`]). This module is used by the parser to facilitate the
//! conversion of assembly source code into instructions.
//!
//! The key data structure here is [`Token`], the enum of all tokens
//! LEGv8 assembly is made of.

use std::num::IntErrorKind;

use logos::{Lexer, Logos};

/// A unit of information in LEGv8 source code.
#[derive(Debug, Logos, PartialEq, Eq, Clone)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r";[^\n]*")]
#[logos(skip r"//[^\n]*")]
#[logos(error = LexErr)]
pub enum Token {
    // Note, some of these regexes deliberately overmatch (e.g., 23trst
    // lexes as one integer token even though it isn't a valid one) so
    // that a malformed unit is caught whole and rejected by its
    // validator callback, instead of being split into two tokens.

    /// An unsigned decimal value, with or without a leading `#`
    /// (e.g., `9`, `#14`).
    #[regex(r"\d\w*", lex_int)]
    #[regex(r"#\d?\w*", lex_int)]
    Int(u64),

    /// A name: an opcode mnemonic, a register, or a label.
    ///
    /// Which of the three it is only becomes clear in context, so the
    /// lexer leaves names uninterpreted:
    /// - opcode mnemonics (e.g., `ADD`, `B.EQ`)
    /// - registers (e.g., `X0`, `XZR`, `SP`, `D31`)
    /// - labels (e.g., `loop`, `done`)
    ///
    /// One internal `.` is permitted, to support the `B.cond` mnemonics.
    #[regex(r"[A-Za-z][0-9A-Za-z]*(\.[0-9A-Za-z]*)?", |lx| lx.slice().to_string())]
    #[token("/", lex_lone_slash)]
    Name(String),

    /// A colon, which follows a label definition.
    #[token(":")]
    Colon,

    /// A comma, which delineates operands of an instruction.
    #[token(",")]
    Comma,

    /// A left bracket, which opens a D-format memory operand.
    #[token("[")]
    LBrack,

    /// A right bracket, which closes a D-format memory operand.
    #[token("]")]
    RBrack,
}

/// Errors that can arise while tokenizing LEGv8 source.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum LexErr {
    /// Numeric literal cannot fit within the range of a u64.
    DoesNotFitU64,
    /// Numeric literal has invalid digits (i.e., not 0-9).
    InvalidNumeric,
    /// A `#` was not followed by a digit.
    MissingDigit,
    /// A `/` that did not start a `//` comment.
    LoneSlash,
    /// Integer parsing failed for a reason we don't classify.
    UnknownIntErr,
    /// A symbol was used which is not allowed in LEGv8 assembly files.
    #[default]
    InvalidSymbol,
}
impl std::fmt::Display for LexErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexErr::DoesNotFitU64 => f.write_str("numeric token does not fit 64-bit unsigned integer"),
            LexErr::InvalidNumeric => f.write_str("invalid decimal literal"),
            LexErr::MissingDigit => f.write_str("missing digit"),
            LexErr::LoneSlash => f.write_str("unexpected '/'"),
            LexErr::UnknownIntErr => f.write_str("could not parse integer"),
            LexErr::InvalidSymbol => f.write_str("unrecognized symbol"),
        }
    }
}
impl std::error::Error for LexErr {}
impl crate::err::Error for LexErr {
    fn help(&self) -> Option<std::borrow::Cow<'_, str>> {
        match self {
            LexErr::DoesNotFitU64 => Some(format!("the range for a 64-bit unsigned integer is [0, {}]", u64::MAX).into()),
            LexErr::InvalidNumeric => Some("a decimal literal only consists of digits 0-9".into()),
            LexErr::MissingDigit => Some("there should be digits (0-9) after the '#'".into()),
            LexErr::LoneSlash => Some("line comments start with '//' or ';'".into()),
            LexErr::UnknownIntErr => None,
            LexErr::InvalidSymbol => Some("this char does not occur in any token in LEGv8 assembly".into()),
        }
    }
}

fn lex_int(lx: &Lexer<'_, Token>) -> Result<u64, LexErr> {
    let mut string = lx.slice();
    if string.starts_with('#') {
        string = &string[1..];
    }

    string.parse::<u64>().map_err(|e| match e.kind() {
        IntErrorKind::Empty => LexErr::MissingDigit,
        IntErrorKind::InvalidDigit => LexErr::InvalidNumeric,
        IntErrorKind::PosOverflow => LexErr::DoesNotFitU64,
        _ => LexErr::UnknownIntErr,
    })
}

fn lex_lone_slash(_lx: &Lexer<'_, Token>) -> Result<String, LexErr> {
    // A `/` alone is never a token; `//` comments are skipped before this
    // callback can run.
    Err(LexErr::LoneSlash)
}

#[cfg(test)]
mod tests {
    use logos::Logos;

    use crate::parse::lex::{LexErr, Token};

    fn name(s: &str) -> Token {
        Token::Name(s.to_string())
    }

    #[test]
    fn test_int_success() {
        // plain digits
        let mut tokens = Token::lexer("0 123 456 789");
        assert_eq!(tokens.next(), Some(Ok(Token::Int(0))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(123))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(456))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(789))));
        assert_eq!(tokens.next(), None);

        // hash-prefixed
        let mut tokens = Token::lexer("#100 #200 #0");
        assert_eq!(tokens.next(), Some(Ok(Token::Int(100))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(200))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(0))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_int_overflow() {
        // right at the u64 boundary
        let mut tokens = Token::lexer("18446744073709551615 #18446744073709551615");
        assert_eq!(tokens.next(), Some(Ok(Token::Int(u64::MAX))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(u64::MAX))));
        assert_eq!(tokens.next(), None);

        // past the u64 boundary
        assert_eq!(Token::lexer("18446744073709551616").next(), Some(Err(LexErr::DoesNotFitU64)));
        assert_eq!(Token::lexer("999999999999999999999999999999").next(), Some(Err(LexErr::DoesNotFitU64)));
    }

    #[test]
    fn test_int_invalid() {
        assert_eq!(Token::lexer("#Q").next(), Some(Err(LexErr::InvalidNumeric)));
        assert_eq!(Token::lexer("3Q").next(), Some(Err(LexErr::InvalidNumeric)));
        assert_eq!(Token::lexer("#").next(), Some(Err(LexErr::MissingDigit)));
        // no signs, no other bases
        assert_eq!(Token::lexer("-1").next(), Some(Err(LexErr::InvalidSymbol)));
        assert_eq!(Token::lexer("0x10").next(), Some(Err(LexErr::InvalidNumeric)));
    }

    #[test]
    fn test_names() {
        let mut tokens = Token::lexer("ADD loop X0 XZR IP0 a1b2");
        assert_eq!(tokens.next(), Some(Ok(name("ADD"))));
        assert_eq!(tokens.next(), Some(Ok(name("loop"))));
        assert_eq!(tokens.next(), Some(Ok(name("X0"))));
        assert_eq!(tokens.next(), Some(Ok(name("XZR"))));
        assert_eq!(tokens.next(), Some(Ok(name("IP0"))));
        assert_eq!(tokens.next(), Some(Ok(name("a1b2"))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_names_with_dot() {
        let mut tokens = Token::lexer("B.EQ B.NE B.LT");
        assert_eq!(tokens.next(), Some(Ok(name("B.EQ"))));
        assert_eq!(tokens.next(), Some(Ok(name("B.NE"))));
        assert_eq!(tokens.next(), Some(Ok(name("B.LT"))));
        assert_eq!(tokens.next(), None);

        // a trailing dot is swallowed into the name; the parser rejects it
        assert_eq!(Token::lexer("B.").next(), Some(Ok(name("B."))));

        // only one internal dot is permitted
        let mut tokens = Token::lexer("B.EQ.NE");
        assert_eq!(tokens.next(), Some(Ok(name("B.EQ"))));
        assert_eq!(tokens.next(), Some(Err(LexErr::InvalidSymbol)));
    }

    #[test]
    fn test_punct() {
        let mut tokens = Token::lexer("0\n1,2:3[4]");
        assert_eq!(tokens.next(), Some(Ok(Token::Int(0))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(1))));
        assert_eq!(tokens.next(), Some(Ok(Token::Comma)));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(2))));
        assert_eq!(tokens.next(), Some(Ok(Token::Colon)));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(3))));
        assert_eq!(tokens.next(), Some(Ok(Token::LBrack)));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(4))));
        assert_eq!(tokens.next(), Some(Ok(Token::RBrack)));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_comments() {
        let mut tokens = Token::lexer("ADD ; the rest is ignored, [even] this\nSUB");
        assert_eq!(tokens.next(), Some(Ok(name("ADD"))));
        assert_eq!(tokens.next(), Some(Ok(name("SUB"))));
        assert_eq!(tokens.next(), None);

        let mut tokens = Token::lexer("ADD // C-style comment\nSUB");
        assert_eq!(tokens.next(), Some(Ok(name("ADD"))));
        assert_eq!(tokens.next(), Some(Ok(name("SUB"))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_lone_slash() {
        assert_eq!(Token::lexer("/").next(), Some(Err(LexErr::LoneSlash)));
        assert_eq!(Token::lexer("/ oops").next(), Some(Err(LexErr::LoneSlash)));
    }

    #[test]
    fn test_invalid_symbol() {
        for s in ["@", "$", "%", "&", "*", "(", ")", "{", "}", "_", "\"", "."] {
            assert_eq!(
                Token::lexer(s).next(),
                Some(Err(LexErr::InvalidSymbol)),
                "expected {s:?} to be an invalid symbol"
            );
        }
    }

    #[test]
    fn test_whitespace_insensitivity() {
        let compact: Vec<_> = Token::lexer("l:ADDI X1,XZR,#5").collect();
        let spaced: Vec<_> = Token::lexer("  l : ADDI\tX1 , XZR , #5  ; tail").collect();
        assert_eq!(compact, spaced);
    }
}
