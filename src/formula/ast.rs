//! Abstract syntax tree for the formula language.

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Boolean not.
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Number(f64),
    Str(String),
    Bool(bool),
    Nil,
    /// Variable reference, with its position for resolution errors.
    Var {
        name: String,
        line: u32,
        column: u32,
    },
    List(Vec<Expr>),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Free function call (user function or builtin).
    Call {
        callee: String,
        args: Vec<Expr>,
        line: u32,
        column: u32,
    },
    /// Method call on a receiver, dispatched by receiver type at runtime.
    Method {
        recv: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
    /// Field access on a receiver.
    Field {
        recv: Box<Expr>,
        name: String,
    },
    /// List indexing.
    Index {
        recv: Box<Expr>,
        index: Box<Expr>,
    },
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stmt {
    Let {
        name: String,
        line: u32,
        column: u32,
        expr: Expr,
    },
    Assign {
        name: String,
        line: u32,
        column: u32,
        expr: Expr,
    },
    Expr(Expr),
    If {
        cond: Expr,
        then: Vec<Stmt>,
        otherwise: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    For {
        var: String,
        iter: Expr,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
}

/// A function declaration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FnDecl {
    pub(crate) name: String,
    pub(crate) params: Vec<String>,
    pub(crate) body: Vec<Stmt>,
    pub(crate) line: u32,
    pub(crate) column: u32,
}

/// A parsed formula: a list of function declarations.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Ast {
    pub(crate) funcs: Vec<FnDecl>,
}
