use crate::language::{
    span::Span,
    token::{Token, TokenKind},
};

#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

pub fn lex(source: &str) -> Result<Vec<Token>, Vec<LexError>> {
    let lexer = Lexer::new(source);
    lexer.run()
}

struct Lexer<'a> {
    src: &'a str,
    chars: std::str::Chars<'a>,
    current: Option<char>,
    offset: usize,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        let mut chars = src.chars();
        let current = chars.next();
        Self {
            src,
            chars,
            current,
            offset: 0,
            tokens: Vec::new(),
            errors: Vec::new(),
            at_line_start: true,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, Vec<LexError>> {
        while let Some(ch) = self.current {
            match ch {
                '/' if self.peek() == Some('/') => self.eat_line_comment(),
                '/' if self.peek() == Some('*') => self.eat_block_comment(),
                ch if ch.is_whitespace() => {
                    self.bump();
                }
                ch if ch.is_ascii_alphabetic() || ch == '_' => self.lex_identifier(),
                ch if ch.is_ascii_digit() => self.lex_number(),
                '"' => self.lex_string(),
                _ => self.lex_symbol(),
            }
        }
        self.push_token(TokenKind::Eof, self.offset, self.offset);

        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }

    fn bump(&mut self) -> Option<char> {
        if let Some(ch) = self.current {
            self.offset += ch.len_utf8();
            if ch == '\n' {
                self.at_line_start = true;
            }
        }
        self.current = self.chars.next();
        self.current
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn push_token(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start, end),
            line_start: self.at_line_start,
        });
        self.at_line_start = false;
    }

    fn error(&mut self, start: usize, end: usize, message: impl Into<String>) {
        self.errors.push(LexError {
            message: message.into(),
            span: Span::new(start, end),
        });
    }

    fn eat_line_comment(&mut self) {
        self.bump();
        self.bump();
        while let Some(ch) = self.current {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn eat_block_comment(&mut self) {
        let start = self.offset;
        self.bump();
        self.bump();
        while let Some(ch) = self.current {
            if ch == '*' && self.peek() == Some('/') {
                self.bump();
                self.bump();
                return;
            }
            self.bump();
        }
        self.error(start, self.offset, "Unterminated block comment");
    }

    fn lex_identifier(&mut self) {
        let start = self.offset;
        while let Some(ch) = self.current {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.bump();
            } else {
                break;
            }
        }

        let end = self.offset;
        let slice = &self.src[start..end];
        let kind =
            TokenKind::keyword(slice).unwrap_or_else(|| TokenKind::Identifier(slice.to_string()));
        self.push_token(kind, start, end);
    }

    fn lex_number(&mut self) {
        let start = self.offset;
        self.eat_digits();

        if self.current == Some('.') {
            if let Some(next) = self.peek() {
                if next.is_ascii_digit() {
                    self.bump(); // consume '.'
                    self.eat_digits();
                }
            }
        }

        if matches!(self.current, Some('e') | Some('E')) {
            let exponent_follows = match self.peek() {
                Some(ch) if ch.is_ascii_digit() => true,
                Some('+') | Some('-') => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    matches!(lookahead.next(), Some(ch) if ch.is_ascii_digit())
                }
                _ => false,
            };
            if exponent_follows {
                self.bump();
                if matches!(self.current, Some('+') | Some('-')) {
                    self.bump();
                }
                self.eat_digits();
            }
        }

        let end = self.offset;
        let text = self.src[start..end].replace('_', "");
        match text.parse::<f64>() {
            Ok(value) => self.push_token(TokenKind::Number(value), start, end),
            Err(_) => self.error(start, end, "Invalid number literal"),
        }
    }

    fn eat_digits(&mut self) {
        while let Some(ch) = self.current {
            if ch.is_ascii_digit() || ch == '_' {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn lex_string(&mut self) {
        let start = self.offset;
        self.bump();
        let mut value = String::new();
        while let Some(ch) = self.current {
            match ch {
                '"' => {
                    self.bump();
                    let end = self.offset;
                    self.push_token(TokenKind::String(value), start, end);
                    return;
                }
                '\\' => {
                    self.bump();
                    if let Some(escaped) = self.current {
                        value.push(match escaped {
                            'n' => '\n',
                            'r' => '\r',
                            't' => '\t',
                            '0' => '\0',
                            '\\' => '\\',
                            '"' => '"',
                            other => other,
                        });
                        self.bump();
                    } else {
                        break;
                    }
                }
                _ => {
                    value.push(ch);
                    self.bump();
                }
            }
        }
        self.error(start, self.offset, "Unterminated string literal");
    }

    fn lex_symbol(&mut self) {
        let start = self.offset;
        let ch = self.current;
        match ch {
            Some('(') => self.single(TokenKind::LParen),
            Some(')') => self.single(TokenKind::RParen),
            Some('{') => self.single(TokenKind::LBrace),
            Some('}') => self.single(TokenKind::RBrace),
            Some('[') => self.single(TokenKind::LBracket),
            Some(']') => self.single(TokenKind::RBracket),
            Some(',') => self.single(TokenKind::Comma),
            Some(':') => self.single(TokenKind::Colon),
            Some(';') => self.single(TokenKind::Semi),
            Some('.') => {
                self.bump();
                if self.current == Some('.') {
                    self.bump();
                    self.push_token(TokenKind::DotDot, start, self.offset);
                } else {
                    self.push_token(TokenKind::Dot, start, self.offset);
                }
            }
            Some('?') => {
                self.bump();
                if self.current == Some('?') {
                    self.bump();
                    if self.current == Some('=') {
                        self.bump();
                        self.push_token(TokenKind::QuestionQuestionEq, start, self.offset);
                    } else {
                        self.push_token(TokenKind::QuestionQuestion, start, self.offset);
                    }
                } else {
                    self.push_token(TokenKind::Question, start, self.offset);
                }
            }
            Some('+') => self.one_of(
                start,
                &[('+', TokenKind::PlusPlus), ('=', TokenKind::PlusEq)],
                TokenKind::Plus,
            ),
            Some('-') => self.one_of(
                start,
                &[
                    ('-', TokenKind::MinusMinus),
                    ('=', TokenKind::MinusEq),
                    ('>', TokenKind::Arrow),
                ],
                TokenKind::Minus,
            ),
            Some('*') => self.one_of(start, &[('=', TokenKind::StarEq)], TokenKind::Star),
            Some('/') => self.one_of(start, &[('=', TokenKind::SlashEq)], TokenKind::Slash),
            Some('%') => self.one_of(start, &[('=', TokenKind::PercentEq)], TokenKind::Percent),
            Some('&') => self.one_of(
                start,
                &[
                    ('&', TokenKind::AmpersandAmpersand),
                    ('=', TokenKind::AmpersandEq),
                ],
                TokenKind::Ampersand,
            ),
            Some('|') => self.one_of(
                start,
                &[('|', TokenKind::PipePipe), ('=', TokenKind::PipeEq)],
                TokenKind::Pipe,
            ),
            Some('!') => self.one_of(start, &[('=', TokenKind::BangEq)], TokenKind::Bang),
            Some('=') => self.one_of(start, &[('=', TokenKind::EqEq)], TokenKind::Eq),
            Some('<') => self.one_of(start, &[('=', TokenKind::LtEq)], TokenKind::Lt),
            Some('>') => self.one_of(start, &[('=', TokenKind::GtEq)], TokenKind::Gt),
            Some(ch) => {
                self.bump();
                self.error(start, self.offset, format!("Unexpected character '{}'", ch));
            }
            None => {}
        }
    }

    /// Consumes the current character, then at most one follow-up character
    /// from `pairs`, falling back to `single` when nothing matches.
    fn one_of(&mut self, start: usize, pairs: &[(char, TokenKind)], single: TokenKind) {
        self.bump();
        for (next, kind) in pairs {
            if self.current == Some(*next) {
                self.bump();
                self.push_token(kind.clone(), start, self.offset);
                return;
            }
        }
        self.push_token(single, start, self.offset);
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.offset;
        self.bump();
        self.push_token(kind, start, self.offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source)
            .expect("lex")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn lexes_compound_operators() {
        assert_eq!(
            kinds("a ??= b ?? c; x++ -> &= &&"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::QuestionQuestionEq,
                TokenKind::Identifier("b".into()),
                TokenKind::QuestionQuestion,
                TokenKind::Identifier("c".into()),
                TokenKind::Semi,
                TokenKind::Identifier("x".into()),
                TokenKind::PlusPlus,
                TokenKind::Arrow,
                TokenKind::AmpersandEq,
                TokenKind::AmpersandAmpersand,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn range_does_not_swallow_fraction() {
        assert_eq!(
            kinds("0..10 1.5"),
            vec![
                TokenKind::Number(0.0),
                TokenKind::DotDot,
                TokenKind::Number(10.0),
                TokenKind::Number(1.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn strings_unescape_and_comments_are_skipped() {
        assert_eq!(
            kinds("\"a\\n\\\"b\" // trailing\n/* block */ typeof"),
            vec![
                TokenKind::String("a\n\"b".into()),
                TokenKind::TypeOf,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn reports_unterminated_string() {
        let errors = lex("\"open").expect_err("should fail");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("Unterminated"));
    }
}
