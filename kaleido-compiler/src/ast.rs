use crate::frontend::{grammar, lexer};
use crate::span::{SourceIndex, Span};
use crate::{CompileError, CompileOptions};

/// An expression node. Every expression produces exactly one double value
/// when lowered.
#[derive(Debug, Clone)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Number(f64),
    Variable(String),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Call {
        callee: String,
        args: Vec<Expr>,
    },
    /// `if cond then a else b`; the else branch is mandatory.
    If {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    /// `for init, cond, step in body`; init and step share the induction
    /// variable name.
    For {
        init: Box<Assign>,
        cond: Box<Expr>,
        step: Box<Assign>,
        body: Box<Expr>,
    },
    While {
        cond: Box<Expr>,
        body: Box<Expr>,
    },
    Assign(Assign),
    /// `var a = e1, b = e2 in body`
    Var {
        decls: Vec<(String, Expr)>,
        body: Box<Expr>,
    },
    /// `(current ; next)`, yielding the value of the last expression.
    Composite {
        current: Box<Expr>,
        next: Option<Box<Expr>>,
    },
}

impl Expr {
    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr, span: Span) -> Expr {
        Expr {
            span,
            kind: ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        }
    }
}

/// Assignment to a named variable. Also serves as the init/step clauses of
/// `for`, which are assignments by construction.
#[derive(Debug, Clone)]
pub struct Assign {
    pub target: String,
    pub value: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    Neg,
}

/// Function signature: name and ordered parameter names. All parameters and
/// the return value are doubles.
#[derive(Debug, Clone)]
pub struct Prototype {
    pub name: String,
    pub params: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub proto: Prototype,
    pub body: Expr,
    pub span: Span,
}

/// A top-level item. Bare expressions are rewritten into anonymous
/// zero-parameter functions before lowering.
#[derive(Debug, Clone)]
pub enum Item {
    Function(FunctionDef),
    Prototype(Prototype),
    Expr(Expr),
}

impl Item {
    pub fn span(&self) -> Span {
        match self {
            Item::Function(f) => f.span,
            Item::Prototype(p) => p.span,
            Item::Expr(e) => e.span,
        }
    }
}

/// Linked list of top-level items, in source order.
#[derive(Debug, Clone)]
pub struct Sequence {
    pub item: Item,
    pub next: Option<Box<Sequence>>,
    pub span: Span,
}

/// Chain parsed items into a `Sequence` list. An empty source yields `None`.
pub fn fold_sequence(items: Vec<Item>) -> Option<Box<Sequence>> {
    items.into_iter().rev().fold(None, |next, item| {
        let span = item.span();
        Some(Box::new(Sequence { item, next, span }))
    })
}

/// Collapse a `;`-separated parenthesised list into a `Composite` chain.
/// A single parenthesised expression stays as it is.
pub fn fold_composite(exprs: Vec<Expr>, span: Span) -> Expr {
    let mut iter = exprs.into_iter().rev();
    let mut folded = iter.next().expect("parenthesised list is never empty");
    for current in iter {
        folded = Expr {
            span,
            kind: ExprKind::Composite {
                current: Box::new(current),
                next: Some(Box::new(folded)),
            },
        };
    }
    folded
}

pub fn parse_to_ast(source: &str) -> Result<Option<Box<Sequence>>, CompileError> {
    parse_to_ast_with(source, &CompileOptions::default())
}

pub fn parse_to_ast_with(
    source: &str,
    options: &CompileOptions,
) -> Result<Option<Box<Sequence>>, CompileError> {
    let index = SourceIndex::new(source);
    let tokens = lexer::token_stream(source, options.trace_scanner);

    let root = grammar::ProgramParser::new()
        .parse(tokens)
        .map_err(|e| map_parse_error(e, &index))?;

    if options.trace_parser {
        eprintln!("{:#?}", root);
    }

    Ok(root)
}

fn map_parse_error(
    error: lalrpop_util::ParseError<usize, lexer::Token, lexer::LexicalError>,
    index: &SourceIndex,
) -> CompileError {
    use lalrpop_util::ParseError;

    let at = |location: usize, message: String| {
        let (line, col) = index.to_line_col(location);
        CompileError::Parse {
            line: line + 1,
            col: col + 1,
            message,
        }
    };

    match error {
        ParseError::InvalidToken { location } => at(location, "Invalid token".to_string()),
        ParseError::UnrecognizedEof { location, expected } => at(
            location,
            format!(
                "Unexpected end of file. Expected one of: {}",
                friendly_expected(&expected)
            ),
        ),
        ParseError::UnrecognizedToken {
            token: (start, tok, _),
            expected,
        } => at(
            start,
            format!(
                "Unexpected token {}. Expected one of: {}",
                tok,
                friendly_expected(&expected)
            ),
        ),
        ParseError::ExtraToken {
            token: (start, tok, _),
        } => at(start, format!("Extra token {}", tok)),
        ParseError::User { error } => CompileError::Lexical(error),
    }
}

fn friendly_expected(expected: &[String]) -> String {
    expected
        .iter()
        .map(|name| lexer::friendly_token_name(name))
        .collect::<Vec<_>>()
        .join(", ")
}
