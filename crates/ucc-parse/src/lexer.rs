//! Hand-written scanner for uC source text.
//!
//! Produces the full token stream up front, tracking 1-based line/column
//! positions. Comments (`// ...` and `/* ... */`) are skipped; the three
//! lexical error conditions (illegal character, unterminated comment,
//! unterminated quote) abort scanning.

use ucc_core::coord::Coord;

use crate::error::LexError;
use crate::token::{Token, TokenKind};

/// Scans `source` into a token stream.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    line_start: usize,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            line_start: 0,
        }
    }

    fn coord(&self) -> Coord {
        Coord::new(self.line, (self.pos - self.line_start + 1) as u32)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.line_start = self.pos;
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            match self.peek() {
                None => break,
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_next() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.peek_next() == Some('*') => {
                    let start = self.coord();
                    self.bump();
                    self.bump();
                    self.skip_block_comment(start)?;
                }
                Some(_) => {
                    let token = self.scan_token()?;
                    tokens.push(token);
                }
            }
        }
        Ok(tokens)
    }

    fn skip_block_comment(&mut self, start: Coord) -> Result<(), LexError> {
        loop {
            match self.bump() {
                None => return Err(LexError::UnterminatedComment { coord: start }),
                Some('*') if self.peek() == Some('/') => {
                    self.bump();
                    return Ok(());
                }
                Some(_) => {}
            }
        }
    }

    fn scan_token(&mut self) -> Result<Token, LexError> {
        let coord = self.coord();
        let c = self.peek().expect("scan_token called at end of input");

        if c.is_ascii_digit() || (c == '.' && self.peek_next().is_some_and(|n| n.is_ascii_digit()))
        {
            return self.scan_number(coord);
        }
        if c.is_ascii_alphabetic() || c == '_' {
            return Ok(self.scan_word(coord));
        }
        if c == '"' || c == '\'' {
            return self.scan_quoted(coord);
        }

        self.bump();
        let kind = match c {
            '=' if self.eat('=') => TokenKind::EqEq,
            '=' => TokenKind::Assign,
            '<' if self.eat('=') => TokenKind::Le,
            '<' => TokenKind::Lt,
            '>' if self.eat('=') => TokenKind::Ge,
            '>' => TokenKind::Gt,
            '!' if self.eat('=') => TokenKind::Ne,
            '!' => TokenKind::Not,
            '+' if self.eat('+') => TokenKind::PlusPlus,
            '+' if self.eat('=') => TokenKind::PlusEq,
            '+' => TokenKind::Plus,
            '-' if self.eat('-') => TokenKind::MinusMinus,
            '-' if self.eat('=') => TokenKind::MinusEq,
            '-' => TokenKind::Minus,
            '*' if self.eat('=') => TokenKind::StarEq,
            '*' => TokenKind::Star,
            '/' if self.eat('=') => TokenKind::SlashEq,
            '/' => TokenKind::Slash,
            '%' if self.eat('=') => TokenKind::PercentEq,
            '%' => TokenKind::Percent,
            '&' if self.eat('&') => TokenKind::AndAnd,
            '&' => TokenKind::Amp,
            '|' if self.eat('|') => TokenKind::OrOr,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ';' => TokenKind::Semi,
            ',' => TokenKind::Comma,
            other => {
                return Err(LexError::IllegalCharacter {
                    found: other,
                    coord,
                })
            }
        };
        Ok(Token { kind, coord })
    }

    fn scan_number(&mut self, coord: Coord) -> Result<Token, LexError> {
        let mut text = String::new();
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            text.push(self.bump().expect("digit present"));
        }
        let is_float = if self.peek() == Some('.') {
            text.push(self.bump().expect("dot present"));
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                text.push(self.bump().expect("digit present"));
            }
            true
        } else {
            false
        };

        let kind = if is_float {
            match text.parse::<f64>() {
                Ok(v) => TokenKind::FloatConst(v),
                Err(_) => return Err(LexError::InvalidNumber { text, coord }),
            }
        } else {
            match text.parse::<i64>() {
                Ok(v) => TokenKind::IntConst(v),
                Err(_) => return Err(LexError::InvalidNumber { text, coord }),
            }
        };
        Ok(Token { kind, coord })
    }

    fn scan_word(&mut self, coord: Coord) -> Token {
        let mut word = String::new();
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            word.push(self.bump().expect("word char present"));
        }
        let kind = TokenKind::keyword(&word).unwrap_or(TokenKind::Ident(word));
        Token { kind, coord }
    }

    fn scan_quoted(&mut self, coord: Coord) -> Result<Token, LexError> {
        let quote = self.bump().expect("quote present");
        let mut content = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(LexError::UnterminatedQuote { coord });
                }
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some(c) => {
                    content.push(c);
                    self.bump();
                }
            }
        }

        // A single quoted letter is a character constant; anything else is
        // a string literal (the char-array form).
        let mut chars = content.chars();
        let kind = match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => TokenKind::CharConst(c),
            _ => TokenKind::StrConst(content),
        };
        Ok(Token { kind, coord })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn scans_a_small_program() {
        let toks = kinds("int main() { return 0; }");
        assert_eq!(
            toks,
            vec![
                TokenKind::Int,
                TokenKind::Ident("main".into()),
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::Return,
                TokenKind::IntConst(0),
                TokenKind::Semi,
                TokenKind::RBrace,
            ]
        );
    }

    #[test]
    fn two_char_operators_win_over_singles() {
        assert_eq!(
            kinds("a += b ++ <= != %="),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::PlusEq,
                TokenKind::Ident("b".into()),
                TokenKind::PlusPlus,
                TokenKind::Le,
                TokenKind::Ne,
                TokenKind::PercentEq,
            ]
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(
            kinds("42 3.14 .5 10."),
            vec![
                TokenKind::IntConst(42),
                TokenKind::FloatConst(3.14),
                TokenKind::FloatConst(0.5),
                TokenKind::FloatConst(10.0),
            ]
        );
    }

    #[test]
    fn char_and_string_constants() {
        assert_eq!(
            kinds("'a' \"hello\" \" \""),
            vec![
                TokenKind::CharConst('a'),
                TokenKind::StrConst("hello".into()),
                TokenKind::StrConst(" ".into()),
            ]
        );
    }

    #[test]
    fn comments_are_skipped_and_lines_tracked() {
        let tokens = tokenize("// line one\n/* two\nthree */ x").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Ident("x".into()));
        assert_eq!(tokens[0].coord, Coord::new(3, 10));
    }

    #[test]
    fn columns_are_one_based() {
        let tokens = tokenize("int x;\n  y = 1;").unwrap();
        assert_eq!(tokens[0].coord, Coord::new(1, 1));
        assert_eq!(tokens[1].coord, Coord::new(1, 5));
        assert_eq!(tokens[3].coord, Coord::new(2, 3));
    }

    #[test]
    fn illegal_character() {
        let err = tokenize("int $x;").unwrap_err();
        assert_eq!(
            err,
            LexError::IllegalCharacter {
                found: '$',
                coord: Coord::new(1, 5)
            }
        );
        assert_eq!(err.to_string(), "Illegal character '$' @ 1:5");
    }

    #[test]
    fn unterminated_comment() {
        let err = tokenize("x /* no end").unwrap_err();
        assert_eq!(
            err,
            LexError::UnterminatedComment {
                coord: Coord::new(1, 3)
            }
        );
    }

    #[test]
    fn unterminated_quote() {
        let err = tokenize("\"half").unwrap_err();
        assert_eq!(
            err,
            LexError::UnterminatedQuote {
                coord: Coord::new(1, 1)
            }
        );
    }
}
