//! Abstract Syntax Tree types for the template corpus format

use std::fmt;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Valid identifier (alphanumeric + underscore, starts with letter/_)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Root AST node - a complete template corpus
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    pub declarations: Vec<Spanned<Declaration>>,
}

/// Whether a declaration is a callable template or a helper function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    Template,
    Function,
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclarationKind::Template => write!(f, "template"),
            DeclarationKind::Function => write!(f, "function"),
        }
    }
}

/// `template name(params) "default"` or `function name(params) "default"`
/// followed by its clauses
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub name: Spanned<Identifier>,
    pub parameters: Vec<Parameter>,
    pub default: Option<Spanned<Pattern>>,
    pub clauses: Vec<Clause>,
}

/// A declared parameter; `*slots` marks the variadic one
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: Spanned<Identifier>,
    pub variadic: bool,
}

/// `if` adds a conditional branch, `special_case` an override checked first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseKind {
    Branch,
    SpecialCase,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub kind: ClauseKind,
    pub conditions: Vec<Condition>,
    pub pattern: Spanned<Pattern>,
}

/// `parameter = "literal"`
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub parameter: Spanned<Identifier>,
    pub value: String,
}

/// A parsed pattern: literal text interleaved with expressions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pattern {
    pub segments: Vec<Segment>,
}

impl Pattern {
    /// Iterate over the expressions embedded in this pattern
    pub fn expressions(&self) -> impl Iterator<Item = &Expr> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Expr(e) => Some(e),
            Segment::Text(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Expr(Expr),
}

/// Expression inside `{ ... }`
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `{identifier}`
    Placeholder(Identifier),
    /// Quoted literal, only valid as a call argument
    Literal(String),
    /// `{function(arg, ...)}`
    Call { function: Identifier, args: Vec<Expr> },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Placeholder(id) => write!(f, "{}", id),
            Expr::Literal(s) => write!(f, "{:?}", s),
            Expr::Call { function, args } => {
                write!(f, "{}(", function)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}
