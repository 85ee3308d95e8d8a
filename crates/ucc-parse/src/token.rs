//! Token stream produced by the lexer.

use std::fmt;

use ucc_core::coord::Coord;

/// All tokens recognised by the uC lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Reserved keywords
    Assert,
    Break,
    Char,
    Else,
    Float,
    For,
    If,
    Int,
    Print,
    Read,
    Return,
    Void,
    While,

    // Constants and identifiers
    IntConst(i64),
    FloatConst(f64),
    CharConst(char),
    StrConst(String),
    Ident(String),

    // Operators
    EqEq,
    Ne,
    Le,
    Lt,
    Ge,
    Gt,
    Assign,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    PlusPlus,
    MinusMinus,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Not,
    AndAnd,
    OrOr,
    Amp,

    // Separators and delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
}

impl TokenKind {
    /// The keyword for an identifier spelling, if it is reserved.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        Some(match word {
            "assert" => TokenKind::Assert,
            "break" => TokenKind::Break,
            "char" => TokenKind::Char,
            "else" => TokenKind::Else,
            "float" => TokenKind::Float,
            "for" => TokenKind::For,
            "if" => TokenKind::If,
            "int" => TokenKind::Int,
            "print" => TokenKind::Print,
            "read" => TokenKind::Read,
            "return" => TokenKind::Return,
            "void" => TokenKind::Void,
            "while" => TokenKind::While,
            _ => return None,
        })
    }

    /// True for the four type keywords that open a declaration.
    pub fn is_type_specifier(&self) -> bool {
        matches!(
            self,
            TokenKind::Void | TokenKind::Char | TokenKind::Int | TokenKind::Float
        )
    }
}

impl fmt::Display for TokenKind {
    /// Renders the token the way it appeared in the source, as embedded in
    /// `ParserError: Before <token>` diagnostics.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Assert => f.write_str("assert"),
            TokenKind::Break => f.write_str("break"),
            TokenKind::Char => f.write_str("char"),
            TokenKind::Else => f.write_str("else"),
            TokenKind::Float => f.write_str("float"),
            TokenKind::For => f.write_str("for"),
            TokenKind::If => f.write_str("if"),
            TokenKind::Int => f.write_str("int"),
            TokenKind::Print => f.write_str("print"),
            TokenKind::Read => f.write_str("read"),
            TokenKind::Return => f.write_str("return"),
            TokenKind::Void => f.write_str("void"),
            TokenKind::While => f.write_str("while"),
            TokenKind::IntConst(v) => write!(f, "{}", v),
            TokenKind::FloatConst(v) => write!(f, "{:?}", v),
            TokenKind::CharConst(c) => write!(f, "{}", c),
            TokenKind::StrConst(s) => f.write_str(s),
            TokenKind::Ident(name) => f.write_str(name),
            TokenKind::EqEq => f.write_str("=="),
            TokenKind::Ne => f.write_str("!="),
            TokenKind::Le => f.write_str("<="),
            TokenKind::Lt => f.write_str("<"),
            TokenKind::Ge => f.write_str(">="),
            TokenKind::Gt => f.write_str(">"),
            TokenKind::Assign => f.write_str("="),
            TokenKind::PlusEq => f.write_str("+="),
            TokenKind::MinusEq => f.write_str("-="),
            TokenKind::StarEq => f.write_str("*="),
            TokenKind::SlashEq => f.write_str("/="),
            TokenKind::PercentEq => f.write_str("%="),
            TokenKind::PlusPlus => f.write_str("++"),
            TokenKind::MinusMinus => f.write_str("--"),
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::Percent => f.write_str("%"),
            TokenKind::Not => f.write_str("!"),
            TokenKind::AndAnd => f.write_str("&&"),
            TokenKind::OrOr => f.write_str("||"),
            TokenKind::Amp => f.write_str("&"),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::LBrace => f.write_str("{"),
            TokenKind::RBrace => f.write_str("}"),
            TokenKind::LBracket => f.write_str("["),
            TokenKind::RBracket => f.write_str("]"),
            TokenKind::Semi => f.write_str(";"),
            TokenKind::Comma => f.write_str(","),
        }
    }
}

/// One lexed token with the coordinate of its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub coord: Coord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_resolve() {
        assert_eq!(TokenKind::keyword("while"), Some(TokenKind::While));
        assert_eq!(TokenKind::keyword("assert"), Some(TokenKind::Assert));
        assert_eq!(TokenKind::keyword("whileloop"), None);
    }

    #[test]
    fn type_specifiers() {
        assert!(TokenKind::Int.is_type_specifier());
        assert!(TokenKind::Void.is_type_specifier());
        assert!(!TokenKind::Return.is_type_specifier());
    }

    #[test]
    fn display_matches_source_spelling() {
        assert_eq!(TokenKind::PercentEq.to_string(), "%=");
        assert_eq!(TokenKind::Ident("foo".into()).to_string(), "foo");
        assert_eq!(TokenKind::IntConst(42).to_string(), "42");
    }
}
