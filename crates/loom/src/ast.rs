//! Abstract syntax tree: the surface tree the parser produces, and the core
//! tree the desugarer reduces it to. Every node carries an optional source
//! line; `f_lineno` is never updated mid-execution (see design notes), so
//! these are only ever read at compile time.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprContext {
    Load,
    Store,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Name(String, ExprContext),
    NameConstant(NameConstant),
    Num(Num),
    Str(String),
    Bytes(Vec<u8>),
    Call(Box<Expr>, Vec<Expr>, Vec<(String, Expr)>),
    Attribute(Box<Expr>, String, ExprContext),
    Subscript(Box<Expr>, Box<Expr>, ExprContext),
    BinOp(Box<Expr>, BinOpKind, Box<Expr>),
    UnaryOp(UnaryOpKind, Box<Expr>),
    BoolOp(BoolOpKind, Vec<Expr>),
    Compare(Box<Expr>, CmpOp, Box<Expr>),
    List(Vec<Expr>, ExprContext),
    Tuple(Vec<Expr>, ExprContext),
    Dict(Vec<Expr>, Vec<Expr>),
    IfExp(Box<Expr>, Box<Expr>, Box<Expr>),
    /// Present only in the pre-desugar surface tree.
    Lambda(Params, Box<Expr>),
    /// Present only in the pre-desugar surface tree.
    ListComp(Box<Expr>, Vec<Comprehension>),
    /// Present after desugaring: a function literal used as a value
    /// (`FunctionDef`/`Lambda`/comprehension IIFE all lower to this).
    Function(Box<FunctionLit>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionLit {
    pub name: String,
    pub params: Params,
    pub body: Vec<Stmt>,
    pub line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comprehension {
    pub target: Expr,
    pub iter: Expr,
    pub ifs: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NameConstant {
    None,
    True,
    False,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Num {
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpKind {
    Add,
    Sub,
    Mult,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOpKind {
    Not,
    USub,
    UAdd,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOpKind {
    And,
    Or,
}

/// Index order matches the host's `COMPARE_OP` operand table (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CmpOp {
    Lt = 0,
    Le = 1,
    Eq = 2,
    Ne = 3,
    Gt = 4,
    Ge = 5,
    In = 6,
    NotIn = 7,
    Is = 8,
    IsNot = 9,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    pub positional: Vec<String>,
    pub vararg: Option<String>,
    pub kwarg: Option<String>,
}

impl Params {
    #[must_use]
    pub fn simple(names: Vec<String>) -> Self {
        Self {
            positional: names,
            vararg: None,
            kwarg: None,
        }
    }

    #[must_use]
    pub fn arg_names(&self) -> Vec<String> {
        let mut names = self.positional.clone();
        if let Some(v) = &self.vararg {
            names.push(v.clone());
        }
        if let Some(k) = &self.kwarg {
            names.push(k.clone());
        }
        names
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub name: String,
    pub asname: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Module(Vec<Stmt>),
    /// Present only in the pre-desugar surface tree.
    FunctionDef {
        name: String,
        params: Params,
        body: Vec<Stmt>,
        decorators: Vec<Expr>,
        line: Option<u32>,
    },
    ClassDef {
        name: String,
        bases: Vec<Expr>,
        body: Vec<Stmt>,
        line: Option<u32>,
    },
    Assign(Vec<Expr>, Expr, Option<u32>),
    Expr(Expr, Option<u32>),
    If {
        test: Expr,
        then: Vec<Stmt>,
        orelse: Vec<Stmt>,
        line: Option<u32>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        line: Option<u32>,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        line: Option<u32>,
    },
    Return(Option<Expr>, Option<u32>),
    Raise(Expr, Option<u32>),
    Import(Vec<Alias>, Option<u32>),
    ImportFrom {
        level: u32,
        module: String,
        names: Vec<Alias>,
        line: Option<u32>,
    },
    Pass(Option<u32>),
    /// Present only in the pre-desugar surface tree.
    Assert(Expr, Option<Expr>, Option<u32>),
}

impl Stmt {
    #[must_use]
    pub fn line(&self) -> Option<u32> {
        match self {
            Self::Module(_) => None,
            Self::FunctionDef { line, .. }
            | Self::ClassDef { line, .. }
            | Self::Assign(_, _, line)
            | Self::Expr(_, line)
            | Self::If { line, .. }
            | Self::While { line, .. }
            | Self::For { line, .. }
            | Self::Return(_, line)
            | Self::Raise(_, line)
            | Self::Import(_, line)
            | Self::ImportFrom { line, .. }
            | Self::Pass(line)
            | Self::Assert(_, _, line) => *line,
        }
    }
}
