use logos::Logos;

use super::ParseError;
use super::ast::TextRange;

/// Tokens of the supported Visual Basic subset. Keywords are matched
/// case-insensitively, as VB does.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\f]+")]
pub enum Token {
    // Keywords
    #[token("with", ignore(ascii_case))]
    With,
    #[token("end", ignore(ascii_case))]
    End,
    #[token("if", ignore(ascii_case))]
    If,
    #[token("then", ignore(ascii_case))]
    Then,
    #[token("else", ignore(ascii_case))]
    Else,
    #[token("elseif", ignore(ascii_case))]
    ElseIf,
    #[token("for", ignore(ascii_case))]
    For,
    #[token("each", ignore(ascii_case))]
    Each,
    #[token("in", ignore(ascii_case))]
    In,
    #[token("to", ignore(ascii_case))]
    To,
    #[token("step", ignore(ascii_case))]
    Step,
    #[token("next", ignore(ascii_case))]
    Next,
    #[token("while", ignore(ascii_case))]
    While,
    #[token("return", ignore(ascii_case))]
    Return,
    #[token("dim", ignore(ascii_case))]
    Dim,
    #[token("as", ignore(ascii_case))]
    As,
    #[token("new", ignore(ascii_case))]
    New,
    #[token("call", ignore(ascii_case))]
    Call,
    #[token("sub", ignore(ascii_case))]
    Sub,
    #[token("function", ignore(ascii_case))]
    Function,
    #[token("module", ignore(ascii_case))]
    Module,
    #[token("class", ignore(ascii_case))]
    Class,
    #[token("structure", ignore(ascii_case))]
    Structure,
    #[token("imports", ignore(ascii_case))]
    Imports,
    #[token("byval", ignore(ascii_case))]
    ByVal,
    #[token("byref", ignore(ascii_case))]
    ByRef,
    #[token("public", ignore(ascii_case))]
    Public,
    #[token("private", ignore(ascii_case))]
    Private,
    #[token("friend", ignore(ascii_case))]
    Friend,
    #[token("protected", ignore(ascii_case))]
    Protected,
    #[token("shared", ignore(ascii_case))]
    Shared,
    #[token("overrides", ignore(ascii_case))]
    Overrides,
    #[token("overridable", ignore(ascii_case))]
    Overridable,
    #[token("true", ignore(ascii_case))]
    True,
    #[token("false", ignore(ascii_case))]
    False,
    #[token("nothing", ignore(ascii_case))]
    Nothing,
    #[token("not", ignore(ascii_case))]
    Not,
    #[token("and", ignore(ascii_case))]
    And,
    #[token("or", ignore(ascii_case))]
    Or,
    #[token("andalso", ignore(ascii_case))]
    AndAlso,
    #[token("orelse", ignore(ascii_case))]
    OrElse,
    #[token("xor", ignore(ascii_case))]
    Xor,
    #[token("mod", ignore(ascii_case))]
    Mod,

    // Literals and names
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[regex(r"[0-9]+")]
    Integer,
    #[regex(r"[0-9]*\.[0-9]+")]
    Float,
    #[regex(r#""([^"\r\n]|"")*""#)]
    String,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("!")]
    Bang,
    #[token("=")]
    Eq,
    #[token("<>")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("\\")]
    Backslash,
    #[token("&")]
    Amp,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("&=")]
    AmpEq,

    // Statement separators
    #[regex(r"\r?\n")]
    Newline,
    #[token(":")]
    Colon,

    #[regex(r"'[^\r\n]*")]
    Comment,
}

impl Token {
    /// Keywords and identifiers; any of these may follow `.` as a member name.
    pub fn is_word(&self) -> bool {
        !matches!(
            self,
            Token::Integer
                | Token::Float
                | Token::String
                | Token::LParen
                | Token::RParen
                | Token::Comma
                | Token::Dot
                | Token::Bang
                | Token::Eq
                | Token::NotEq
                | Token::Lt
                | Token::LtEq
                | Token::Gt
                | Token::GtEq
                | Token::Plus
                | Token::Minus
                | Token::Star
                | Token::Slash
                | Token::Backslash
                | Token::Amp
                | Token::PlusEq
                | Token::MinusEq
                | Token::AmpEq
                | Token::Newline
                | Token::Colon
                | Token::Comment
        )
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, Token::Newline | Token::Colon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexeme {
    pub token: Token,
    pub range: TextRange,
}

/// Tokens of `source` as the parser sees them: comments dropped and lines
/// ending in ` _` joined with the next one.
pub fn lex(source: &str) -> Result<Vec<Lexeme>, ParseError> {
    let raw = lex_raw(source)?;
    let mut lexemes = Vec::with_capacity(raw.len());
    let mut iter = raw.into_iter().filter(|l| l.token != Token::Comment).peekable();

    while let Some(lexeme) = iter.next() {
        let continues_line = lexeme.token == Token::Ident
            && &source[lexeme.range.start..lexeme.range.end] == "_"
            && iter.peek().is_some_and(|next| next.token == Token::Newline);
        if continues_line {
            iter.next();
            continue;
        }
        lexemes.push(lexeme);
    }

    Ok(lexemes)
}

/// Whether `source` contains a `'` comment outside string literals.
pub fn contains_comment(source: &str) -> bool {
    Token::lexer(source).any(|token| token == Ok(Token::Comment))
}

fn lex_raw(source: &str) -> Result<Vec<Lexeme>, ParseError> {
    let mut lexemes = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => lexemes.push(Lexeme {
                token,
                range: TextRange::new(span.start, span.end),
            }),
            Err(()) => {
                return Err(ParseError::UnexpectedChar {
                    text: source[span.start..span.end].to_string(),
                    offset: span.start,
                });
            }
        }
    }

    Ok(lexemes)
}
