use crate::errors::LexError;
use crate::token::{Span, Token, TokenType};

/// Handwritten scanner producing the full token stream in one pass.
pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenType::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(b)
    }

    fn span_from(&self, start: usize, line: u32, column: u32) -> Span {
        Span::new(start, self.pos, line, column)
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.bump();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.pos;
                    let (line, column) = (self.line, self.column);
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek() {
                            Some(b'*') if self.peek_at(1) == Some(b'/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            Some(_) => {
                                self.bump();
                            }
                            None => {
                                return Err(LexError::UnterminatedComment {
                                    span: self.span_from(start, line, column).into(),
                                });
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia()?;

        let start = self.pos;
        let (line, column) = (self.line, self.column);

        let Some(b) = self.peek() else {
            return Ok(Token::new(
                TokenType::Eof,
                "",
                Span::new(start, start, line, column),
            ));
        };

        if b.is_ascii_alphabetic() {
            return Ok(self.identifier(start, line, column));
        }
        if b.is_ascii_digit() {
            return self.number(start, line, column);
        }
        if b == b'"' {
            return self.string(start, line, column);
        }

        self.bump();
        let kind = match b {
            b'+' => TokenType::Plus,
            b'-' => TokenType::Minus,
            b'*' => TokenType::Star,
            b'/' => TokenType::Slash,
            b'%' => TokenType::Percent,
            b';' => TokenType::Semicolon,
            b',' => TokenType::Comma,
            b'.' => TokenType::Dot,
            b'[' => TokenType::LBracket,
            b']' => TokenType::RBracket,
            b'(' => TokenType::LParen,
            b')' => TokenType::RParen,
            b'{' => TokenType::LBrace,
            b'}' => TokenType::RBrace,
            b'<' => self.with_eq(TokenType::LessEq, TokenType::Less),
            b'>' => self.with_eq(TokenType::GreaterEq, TokenType::Greater),
            b'=' => self.with_eq(TokenType::EqEq, TokenType::Eq),
            b'!' => self.with_eq(TokenType::BangEq, TokenType::Bang),
            b'&' if self.peek() == Some(b'&') => {
                self.bump();
                TokenType::AmpAmp
            }
            b'|' if self.peek() == Some(b'|') => {
                self.bump();
                TokenType::PipePipe
            }
            other => {
                return Err(LexError::UnexpectedCharacter {
                    ch: char::from(other),
                    span: self.span_from(start, line, column).into(),
                });
            }
        };
        let span = self.span_from(start, line, column);
        Ok(Token::new(kind, &self.src[start..self.pos], span))
    }

    fn with_eq(&mut self, if_eq: TokenType, otherwise: TokenType) -> TokenType {
        if self.peek() == Some(b'=') {
            self.bump();
            if_eq
        } else {
            otherwise
        }
    }

    fn identifier(&mut self, start: usize, line: u32, column: u32) -> Token {
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.bump();
            } else {
                break;
            }
        }
        let text = &self.src[start..self.pos];
        let kind = TokenType::keyword(text).unwrap_or(TokenType::Identifier);
        Token::new(kind, text, self.span_from(start, line, column))
    }

    fn number(&mut self, start: usize, line: u32, column: u32) -> Result<Token, LexError> {
        // Hex integer: 0x... / 0X...
        if self.peek() == Some(b'0')
            && matches!(self.peek_at(1), Some(b'x') | Some(b'X'))
            && self.peek_at(2).is_some_and(|b| b.is_ascii_hexdigit())
        {
            self.bump();
            self.bump();
            while self.peek().is_some_and(|b| b.is_ascii_hexdigit()) {
                self.bump();
            }
            let span = self.span_from(start, line, column);
            return Ok(Token::new(
                TokenType::IntLiteral,
                &self.src[start..self.pos],
                span,
            ));
        }

        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.bump();
        }

        // A double needs digits '.' and may have a trailing exponent.
        let mut kind = TokenType::IntLiteral;
        if self.peek() == Some(b'.') {
            kind = TokenType::DoubleLiteral;
            self.bump();
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.bump();
            }
            if matches!(self.peek(), Some(b'E') | Some(b'e')) {
                let exp_digit = |b: Option<u8>| b.is_some_and(|b| b.is_ascii_digit());
                let signed = matches!(self.peek_at(1), Some(b'+') | Some(b'-'));
                let has_digits = if signed {
                    exp_digit(self.peek_at(2))
                } else {
                    exp_digit(self.peek_at(1))
                };
                if has_digits {
                    self.bump();
                    if signed {
                        self.bump();
                    }
                    while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                        self.bump();
                    }
                }
            }
        }

        let span = self.span_from(start, line, column);
        Ok(Token::new(kind, &self.src[start..self.pos], span))
    }

    fn string(&mut self, start: usize, line: u32, column: u32) -> Result<Token, LexError> {
        self.bump();
        loop {
            match self.peek() {
                Some(b'"') => {
                    self.bump();
                    let span = self.span_from(start, line, column);
                    return Ok(Token::new(
                        TokenType::StringLiteral,
                        &self.src[start..self.pos],
                        span,
                    ));
                }
                Some(b'\n') | None => {
                    return Err(LexError::UnterminatedString {
                        span: self.span_from(start, line, column).into(),
                    });
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenType> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn scans_keywords_and_identifiers() {
        assert_eq!(
            kinds("class Animal extends Pet"),
            vec![
                TokenType::KwClass,
                TokenType::Identifier,
                TokenType::KwExtends,
                TokenType::Identifier,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn scans_operators_longest_first() {
        assert_eq!(
            kinds("<= < == = != ! && ||"),
            vec![
                TokenType::LessEq,
                TokenType::Less,
                TokenType::EqEq,
                TokenType::Eq,
                TokenType::BangEq,
                TokenType::Bang,
                TokenType::AmpAmp,
                TokenType::PipePipe,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn scans_numbers() {
        assert_eq!(
            kinds("12 0xFF 3.5 2.0E-4 7."),
            vec![
                TokenType::IntLiteral,
                TokenType::IntLiteral,
                TokenType::DoubleLiteral,
                TokenType::DoubleLiteral,
                TokenType::DoubleLiteral,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn tracks_line_numbers() {
        let tokens = Lexer::new("a\n  b").tokenize().unwrap();
        assert_eq!(tokens[0].span.line, 1);
        assert_eq!(tokens[1].span.line, 2);
        assert_eq!(tokens[1].span.column, 3);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = Lexer::new("\"oops").tokenize().unwrap_err();
        assert!(matches!(err, LexError::UnterminatedString { .. }));
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("a // line\n/* block\n */ b"),
            vec![TokenType::Identifier, TokenType::Identifier, TokenType::Eof]
        );
    }

    #[test]
    fn stray_ampersand_is_an_error() {
        let err = Lexer::new("a & b").tokenize().unwrap_err();
        assert!(matches!(err, LexError::UnexpectedCharacter { ch: '&', .. }));
    }
}
