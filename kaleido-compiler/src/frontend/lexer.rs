use crate::span::SourceIndex;
use logos::Logos;
use std::fmt;

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n]+")] // Whitespace
#[logos(skip r"#[^\n]*")] // Line comments starting with '#'
pub enum Token {
    // --- Keywords ---
    #[token("def")]
    Def,
    #[token("extern")]
    Extern,
    #[token("if")]
    If,
    #[token("then")]
    Then,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("while")]
    While,
    #[token("var")]
    Var,
    #[token("in")]
    In,

    // --- Identifiers and Numbers ---
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Literals are unsigned; negation is a unary operator.
    #[regex(r"[0-9]+(\.[0-9]*)?|\.[0-9]+", |lex| lex.slice().parse().ok())]
    Number(f64),

    // --- Operators ---
    #[token("==")]
    Eq,
    #[token("!=")]
    Ne,

    #[token("=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,

    #[token(">")]
    Gt,
    #[token("<")]
    Lt,
    #[token(">=")]
    Ge,
    #[token("<=")]
    Le,

    // --- Punctuation ---
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Def => write!(f, "def"),
            Token::Extern => write!(f, "extern"),
            Token::If => write!(f, "if"),
            Token::Then => write!(f, "then"),
            Token::Else => write!(f, "else"),
            Token::For => write!(f, "for"),
            Token::While => write!(f, "while"),
            Token::Var => write!(f, "var"),
            Token::In => write!(f, "in"),
            Token::Ident(s) => write!(f, "'{}'", s),
            Token::Number(n) => write!(f, "{}", n),
            Token::Eq => write!(f, "=="),
            Token::Ne => write!(f, "!="),
            Token::Assign => write!(f, "="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Gt => write!(f, ">"),
            Token::Lt => write!(f, "<"),
            Token::Ge => write!(f, ">="),
            Token::Le => write!(f, "<="),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
        }
    }
}

/// Map a LALRPOP expected-token name (e.g. `"\"ident\""`) to a friendly form.
pub fn friendly_token_name(name: &str) -> String {
    let inner = name.trim_matches('"');
    match inner {
        "ident" => "identifier".into(),
        "number" => "number".into(),
        other => format!("'{}'", other),
    }
}

/// The scanner hit a character no token rule accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalError {
    pub offset: usize,
    /// 1-based position of the offending character.
    pub line: usize,
    pub column: usize,
    pub found: char,
    pub source_line: String,
}

impl LexicalError {
    fn at(source: &str, offset: usize) -> Self {
        let (line, column) = SourceIndex::new(source).to_line_col(offset);
        Self {
            offset,
            line: line + 1,
            column: column + 1,
            found: source[offset..].chars().next().unwrap_or('\0'),
            source_line: source
                .lines()
                .nth(line)
                .unwrap_or_default()
                .trim()
                .to_string(),
        }
    }
}

impl fmt::Display for LexicalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unexpected character '{}' at line {}, column {}\n  Context: {}",
            self.found, self.line, self.column, self.source_line
        )
    }
}

impl std::error::Error for LexicalError {}

/// Bridge the scanner to the `(start, token, end)` triples the parser
/// consumes, optionally dumping each token to stderr.
pub fn token_stream(
    source: &str,
    trace: bool,
) -> impl Iterator<Item = Result<(usize, Token, usize), LexicalError>> + '_ {
    Token::lexer(source)
        .spanned()
        .map(move |(token, span)| match token {
            Ok(token) => {
                if trace {
                    eprintln!("[scan] {} at {}..{}", token, span.start, span.end);
                }
                Ok((span.start, token, span.end))
            }
            Err(()) => Err(LexicalError::at(source, span.start)),
        })
}
