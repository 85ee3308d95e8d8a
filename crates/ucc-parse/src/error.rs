//! Front-end error types.
//!
//! Lexical and syntactic failures are both fatal: the driver prints the
//! rendered message and exits. The `Display` forms are the user-visible
//! diagnostic contract (`LexerError: ... @ line:col`,
//! `ParserError: Before <token> @ line:col`).

use thiserror::Error;
use ucc_core::coord::Coord;

/// A lexical error at a source position.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("Illegal character {found:?} {coord}")]
    IllegalCharacter { found: char, coord: Coord },

    #[error("Unterminated comment {coord}")]
    UnterminatedComment { coord: Coord },

    #[error("Unterminated quote {coord}")]
    UnterminatedQuote { coord: Coord },

    /// Numeric literal outside the representable range.
    #[error("Invalid number literal {text} {coord}")]
    InvalidNumber { text: String, coord: Coord },
}

/// A syntax error. `Before` names the lookahead token the parser stopped
/// at; `Eof` is an unexpected end of input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Before {token} {coord}")]
    Before { token: String, coord: Coord },

    #[error("At the end of input")]
    Eof,
}

/// Either front-end failure, rendered with its diagnostic prefix.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrontError {
    #[error("LexerError: {0}")]
    Lex(#[from] LexError),

    #[error("ParserError: {0}")]
    Parse(#[from] ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexer_error_rendering() {
        let err = FrontError::from(LexError::IllegalCharacter {
            found: '$',
            coord: Coord::new(2, 7),
        });
        assert_eq!(err.to_string(), "LexerError: Illegal character '$' @ 2:7");
    }

    #[test]
    fn parser_error_rendering() {
        let err = FrontError::from(ParseError::Before {
            token: "}".to_string(),
            coord: Coord::new(5, 1),
        });
        assert_eq!(err.to_string(), "ParserError: Before } @ 5:1");

        let err = FrontError::from(ParseError::Eof);
        assert_eq!(err.to_string(), "ParserError: At the end of input");
    }
}
