use crate::language::span::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// First token on its line. Operators that double as prefixes do not
    /// continue an expression across a line break.
    pub line_start: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Number(f64),
    String(String),

    Let,
    Const,
    Fn,
    Return,
    If,
    Else,
    For,
    In,
    Break,
    Continue,
    Switch,
    Case,
    Default,
    Try,
    Catch,
    Throw,
    Struct,
    Static,
    Interface,
    Type,
    Import,
    As,
    TypeOf,
    Nil,
    True,
    False,
    Map,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Ampersand,
    AmpersandAmpersand,
    Pipe,
    PipePipe,
    Bang,
    BangEq,
    Eq,
    EqEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    AmpersandEq,
    PipeEq,
    PlusPlus,
    MinusMinus,
    Question,
    QuestionQuestion,
    QuestionQuestionEq,
    Dot,
    DotDot,
    Comma,
    Colon,
    Semi,

    Arrow, // ->

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Eof,
}

impl TokenKind {
    pub fn keyword(text: &str) -> Option<TokenKind> {
        let kind = match text {
            "let" => TokenKind::Let,
            "const" => TokenKind::Const,
            "fn" => TokenKind::Fn,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "switch" => TokenKind::Switch,
            "case" => TokenKind::Case,
            "default" => TokenKind::Default,
            "try" => TokenKind::Try,
            "catch" => TokenKind::Catch,
            "throw" => TokenKind::Throw,
            "struct" => TokenKind::Struct,
            "static" => TokenKind::Static,
            "interface" => TokenKind::Interface,
            "type" => TokenKind::Type,
            "import" => TokenKind::Import,
            "as" => TokenKind::As,
            "typeof" => TokenKind::TypeOf,
            "nil" => TokenKind::Nil,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "map" => TokenKind::Map,
            _ => return None,
        };
        Some(kind)
    }

    /// Human readable form used in "expected ..." messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Identifier(name) => format!("identifier `{name}`"),
            TokenKind::Number(value) => format!("number `{value}`"),
            TokenKind::String(value) => format!("string {value:?}"),
            TokenKind::Eof => "end of input".into(),
            TokenKind::LParen => "`(`".into(),
            TokenKind::RParen => "`)`".into(),
            TokenKind::LBrace => "`{`".into(),
            TokenKind::RBrace => "`}`".into(),
            TokenKind::LBracket => "`[`".into(),
            TokenKind::RBracket => "`]`".into(),
            TokenKind::Colon => "`:`".into(),
            TokenKind::Semi => "`;`".into(),
            TokenKind::Comma => "`,`".into(),
            TokenKind::Arrow => "`->`".into(),
            TokenKind::Eq => "`=`".into(),
            other => format!("{other:?}"),
        }
    }
}
