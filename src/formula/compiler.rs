//! Compile formula ASTs to stack bytecode.
//!
//! The output is a flat instruction sequence per function, executed by the
//! fuel-metered VM. Compilation is deterministic: the same source always
//! yields the same program and the same verdict.

use crate::error::{CompileError, Diagnostic};
use crate::formula::ast::{Ast, BinOp, Expr, Stmt, UnaryOp};
use crate::formula::parser::parse;
use crate::formula::validate::scan_source;
use std::collections::HashMap;
use std::sync::Arc;

/// Name of the required entry-point function.
pub const ENTRY_POINT: &str = "calculateScore";

/// Default ceiling on compiled instruction count.
pub const DEFAULT_MAX_OPS: usize = 4096;

/// Builtin free functions available to every formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    /// Sum of a list of numbers.
    Sum,
    /// Smallest of a list of numbers (0 for the empty list).
    Min,
    /// Largest of a list of numbers (0 for the empty list).
    Max,
    /// Length of a list.
    Count,
    /// Absolute value.
    Abs,
    /// Round toward negative infinity.
    Floor,
}

impl Builtin {
    fn by_name(name: &str) -> Option<Self> {
        match name {
            "sum" => Some(Self::Sum),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "count" => Some(Self::Count),
            "abs" => Some(Self::Abs),
            "floor" => Some(Self::Floor),
            _ => None,
        }
    }

    pub(crate) const fn name(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
            Self::Abs => "abs",
            Self::Floor => "floor",
        }
    }

    pub(crate) const fn arity(self) -> u8 {
        1
    }
}

/// One bytecode instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Op {
    /// Push a number.
    Num(f64),
    /// Push a string from the string table.
    Str(u16),
    /// Push `true`.
    True,
    /// Push `false`.
    False,
    /// Push nil.
    Nil,
    /// Push a local variable.
    Load(u16),
    /// Pop into a local variable.
    Store(u16),
    /// Discard the top of stack.
    Pop,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Neg,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Unconditional jump to an instruction index.
    Jump(u32),
    /// Pop a bool; jump when false.
    JumpIfFalse(u32),
    /// Peek a bool; jump when true (used for `||` short-circuit).
    JumpIfTruePeek(u32),
    /// Peek a bool; jump when false (used for `&&` short-circuit).
    JumpIfFalsePeek(u32),
    /// Call a user function by index.
    Call {
        func: u16,
        argc: u8,
    },
    /// Call a builtin free function.
    CallBuiltin {
        builtin: Builtin,
        argc: u8,
    },
    /// Call a method on the receiver below the arguments.
    CallMethod {
        name: u16,
        argc: u8,
    },
    /// Read a field off the popped receiver.
    Field(u16),
    /// Pop index and receiver, push the element.
    Index,
    /// Pop a list, push its length.
    Len,
    /// Pop `count` items into a list.
    MakeList(u16),
    /// Return the top of stack from the current function.
    Return,
}

/// Compiled code for one function.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FuncCode {
    pub(crate) name: String,
    pub(crate) arity: u8,
    pub(crate) locals: u16,
    pub(crate) code: Vec<Op>,
}

/// A complete compiled program.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Program {
    pub(crate) funcs: Vec<FuncCode>,
    pub(crate) entry: usize,
    pub(crate) strings: Vec<Box<str>>,
}

impl Program {
    /// Total instruction count across all functions.
    pub(crate) fn op_count(&self) -> usize {
        self.funcs.iter().map(|f| f.code.len()).sum()
    }
}

/// A validated, executable formula artifact.
///
/// Created once per distinct source text and cached indefinitely by the
/// engine; invalidated only by an explicit cache clear.
#[derive(Debug, Clone)]
pub struct CompiledFormula {
    /// The exact source text this artifact was compiled from.
    pub source: String,
    /// The executable program; `None` when compilation failed.
    pub(crate) program: Option<Arc<Program>>,
    /// Compile diagnostics, empty on success.
    pub diagnostics: Vec<Diagnostic>,
    /// The rejection reason, when not usable.
    pub error: Option<CompileError>,
}

impl CompiledFormula {
    /// Whether the formula compiled and passed validation.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.program.is_some()
    }

    fn failed(source: &str, error: CompileError) -> Self {
        let diagnostics = match &error {
            CompileError::Syntax(d) => vec![d.clone()],
            CompileError::Forbidden { pattern, line, column } => vec![Diagnostic::new(
                format!("forbidden pattern '{pattern}'"),
                *line,
                *column,
            )],
            _ => Vec::new(),
        };
        Self {
            source: source.to_string(),
            program: None,
            diagnostics,
            error: Some(error),
        }
    }
}

/// Compile and validate formula source.
///
/// The pipeline rejects, in order: a textually absent entry point, lexical
/// or syntactic errors, denylisted patterns, resolution errors (unknown
/// names), and programs over the instruction ceiling. Only a formula that
/// passes every step is executable.
#[must_use]
pub fn compile_formula(source: &str, max_ops: usize) -> CompiledFormula {
    if !source.contains(ENTRY_POINT) {
        return CompiledFormula::failed(source, CompileError::MissingEntryPoint);
    }

    if let Err(error) = scan_source(source) {
        return CompiledFormula::failed(source, error);
    }

    let ast = match parse(source) {
        Ok(ast) => ast,
        Err(diag) => return CompiledFormula::failed(source, CompileError::Syntax(diag)),
    };

    let program = match lower(&ast) {
        Ok(program) => program,
        Err(diag) => return CompiledFormula::failed(source, CompileError::Syntax(diag)),
    };

    let ops = program.op_count();
    if ops > max_ops {
        return CompiledFormula::failed(source, CompileError::TooComplex { ops, limit: max_ops });
    }

    CompiledFormula {
        source: source.to_string(),
        program: Some(Arc::new(program)),
        diagnostics: Vec::new(),
        error: None,
    }
}

/// Per-function compilation state.
struct FuncCtx {
    code: Vec<Op>,
    locals: HashMap<String, u16>,
    next_local: u16,
}

impl FuncCtx {
    fn slot(&mut self, name: &str) -> u16 {
        if let Some(&slot) = self.locals.get(name) {
            slot
        } else {
            let slot = self.next_local;
            self.next_local += 1;
            self.locals.insert(name.to_string(), slot);
            slot
        }
    }

    fn hidden_slot(&mut self) -> u16 {
        let slot = self.next_local;
        self.next_local += 1;
        slot
    }

    fn emit(&mut self, op: Op) -> usize {
        self.code.push(op);
        self.code.len() - 1
    }

    fn here(&self) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let at = self.code.len() as u32;
        at
    }

    fn patch(&mut self, at: usize, target: u32) {
        match &mut self.code[at] {
            Op::Jump(t) | Op::JumpIfFalse(t) | Op::JumpIfTruePeek(t) | Op::JumpIfFalsePeek(t) => {
                *t = target;
            }
            _ => debug_assert!(false, "patched a non-jump instruction"),
        }
    }
}

struct Lowerer<'a> {
    ast: &'a Ast,
    func_ids: HashMap<&'a str, usize>,
    strings: Vec<Box<str>>,
    string_ids: HashMap<String, u16>,
}

impl<'a> Lowerer<'a> {
    fn string_id(&mut self, text: &str) -> Result<u16, Diagnostic> {
        if let Some(&id) = self.string_ids.get(text) {
            return Ok(id);
        }
        let id = u16::try_from(self.strings.len())
            .map_err(|_| Diagnostic::new("too many string literals", 0, 0))?;
        self.strings.push(text.into());
        self.string_ids.insert(text.to_string(), id);
        Ok(id)
    }

    fn lower_func(&mut self, index: usize) -> Result<FuncCode, Diagnostic> {
        let decl = &self.ast.funcs[index];
        let arity = u8::try_from(decl.params.len()).map_err(|_| {
            Diagnostic::new("too many parameters", decl.line, decl.column)
        })?;

        let mut ctx = FuncCtx {
            code: Vec::new(),
            locals: HashMap::new(),
            next_local: 0,
        };
        for param in &decl.params {
            ctx.slot(param);
        }

        self.lower_block(&mut ctx, &decl.body)?;
        // Implicit `return nil` at the end of every function body.
        ctx.emit(Op::Nil);
        ctx.emit(Op::Return);

        Ok(FuncCode {
            name: decl.name.clone(),
            arity,
            locals: ctx.next_local,
            code: ctx.code,
        })
    }

    fn lower_block(&mut self, ctx: &mut FuncCtx, stmts: &[Stmt]) -> Result<(), Diagnostic> {
        for stmt in stmts {
            self.lower_stmt(ctx, stmt)?;
        }
        Ok(())
    }

    fn lower_stmt(&mut self, ctx: &mut FuncCtx, stmt: &Stmt) -> Result<(), Diagnostic> {
        match stmt {
            Stmt::Let { name, expr, .. } => {
                self.lower_expr(ctx, expr)?;
                let slot = ctx.slot(name);
                ctx.emit(Op::Store(slot));
            }
            Stmt::Assign {
                name,
                line,
                column,
                expr,
            } => {
                let Some(&slot) = ctx.locals.get(name) else {
                    return Err(Diagnostic::new(
                        format!("assignment to undeclared variable '{name}'"),
                        *line,
                        *column,
                    ));
                };
                self.lower_expr(ctx, expr)?;
                ctx.emit(Op::Store(slot));
            }
            Stmt::Expr(expr) => {
                self.lower_expr(ctx, expr)?;
                ctx.emit(Op::Pop);
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                self.lower_expr(ctx, cond)?;
                let to_else = ctx.emit(Op::JumpIfFalse(0));
                self.lower_block(ctx, then)?;
                if otherwise.is_empty() {
                    let end = ctx.here();
                    ctx.patch(to_else, end);
                } else {
                    let to_end = ctx.emit(Op::Jump(0));
                    let else_at = ctx.here();
                    ctx.patch(to_else, else_at);
                    self.lower_block(ctx, otherwise)?;
                    let end = ctx.here();
                    ctx.patch(to_end, end);
                }
            }
            Stmt::While { cond, body } => {
                let start = ctx.here();
                self.lower_expr(ctx, cond)?;
                let to_end = ctx.emit(Op::JumpIfFalse(0));
                self.lower_block(ctx, body)?;
                ctx.emit(Op::Jump(start));
                let end = ctx.here();
                ctx.patch(to_end, end);
            }
            Stmt::For { var, iter, body } => {
                // Desugar to an index loop over hidden list/index slots.
                self.lower_expr(ctx, iter)?;
                let list_slot = ctx.hidden_slot();
                ctx.emit(Op::Store(list_slot));
                ctx.emit(Op::Num(0.0));
                let idx_slot = ctx.hidden_slot();
                ctx.emit(Op::Store(idx_slot));

                let start = ctx.here();
                ctx.emit(Op::Load(idx_slot));
                ctx.emit(Op::Load(list_slot));
                ctx.emit(Op::Len);
                ctx.emit(Op::Lt);
                let to_end = ctx.emit(Op::JumpIfFalse(0));

                ctx.emit(Op::Load(list_slot));
                ctx.emit(Op::Load(idx_slot));
                ctx.emit(Op::Index);
                let var_slot = ctx.slot(var);
                ctx.emit(Op::Store(var_slot));

                self.lower_block(ctx, body)?;

                ctx.emit(Op::Load(idx_slot));
                ctx.emit(Op::Num(1.0));
                ctx.emit(Op::Add);
                ctx.emit(Op::Store(idx_slot));
                ctx.emit(Op::Jump(start));
                let end = ctx.here();
                ctx.patch(to_end, end);
            }
            Stmt::Return(expr) => {
                match expr {
                    Some(expr) => self.lower_expr(ctx, expr)?,
                    None => {
                        ctx.emit(Op::Nil);
                    }
                }
                ctx.emit(Op::Return);
            }
        }
        Ok(())
    }

    fn lower_expr(&mut self, ctx: &mut FuncCtx, expr: &Expr) -> Result<(), Diagnostic> {
        match expr {
            Expr::Number(value) => {
                ctx.emit(Op::Num(*value));
            }
            Expr::Str(text) => {
                let id = self.string_id(text)?;
                ctx.emit(Op::Str(id));
            }
            Expr::Bool(true) => {
                ctx.emit(Op::True);
            }
            Expr::Bool(false) => {
                ctx.emit(Op::False);
            }
            Expr::Nil => {
                ctx.emit(Op::Nil);
            }
            Expr::Var { name, line, column } => {
                let Some(&slot) = ctx.locals.get(name) else {
                    return Err(Diagnostic::new(
                        format!("unknown variable '{name}'"),
                        *line,
                        *column,
                    ));
                };
                ctx.emit(Op::Load(slot));
            }
            Expr::List(items) => {
                for item in items {
                    self.lower_expr(ctx, item)?;
                }
                let count = u16::try_from(items.len())
                    .map_err(|_| Diagnostic::new("list literal too long", 0, 0))?;
                ctx.emit(Op::MakeList(count));
            }
            Expr::Unary { op, expr } => {
                self.lower_expr(ctx, expr)?;
                ctx.emit(match op {
                    UnaryOp::Neg => Op::Neg,
                    UnaryOp::Not => Op::Not,
                });
            }
            Expr::Binary { op: BinOp::And, lhs, rhs } => {
                self.lower_expr(ctx, lhs)?;
                let skip = ctx.emit(Op::JumpIfFalsePeek(0));
                ctx.emit(Op::Pop);
                self.lower_expr(ctx, rhs)?;
                let end = ctx.here();
                ctx.patch(skip, end);
            }
            Expr::Binary { op: BinOp::Or, lhs, rhs } => {
                self.lower_expr(ctx, lhs)?;
                let skip = ctx.emit(Op::JumpIfTruePeek(0));
                ctx.emit(Op::Pop);
                self.lower_expr(ctx, rhs)?;
                let end = ctx.here();
                ctx.patch(skip, end);
            }
            Expr::Binary { op, lhs, rhs } => {
                self.lower_expr(ctx, lhs)?;
                self.lower_expr(ctx, rhs)?;
                ctx.emit(match op {
                    BinOp::Add => Op::Add,
                    BinOp::Sub => Op::Sub,
                    BinOp::Mul => Op::Mul,
                    BinOp::Div => Op::Div,
                    BinOp::Rem => Op::Rem,
                    BinOp::Eq => Op::Eq,
                    BinOp::Ne => Op::Ne,
                    BinOp::Lt => Op::Lt,
                    BinOp::Le => Op::Le,
                    BinOp::Gt => Op::Gt,
                    BinOp::Ge => Op::Ge,
                    BinOp::And | BinOp::Or => unreachable!("handled above"),
                });
            }
            Expr::Call {
                callee,
                args,
                line,
                column,
            } => {
                for arg in args {
                    self.lower_expr(ctx, arg)?;
                }
                let argc = u8::try_from(args.len())
                    .map_err(|_| Diagnostic::new("too many arguments", *line, *column))?;
                if let Some(&func) = self.func_ids.get(callee.as_str()) {
                    let func = u16::try_from(func)
                        .map_err(|_| Diagnostic::new("too many functions", *line, *column))?;
                    ctx.emit(Op::Call { func, argc });
                } else if let Some(builtin) = Builtin::by_name(callee) {
                    if argc != builtin.arity() {
                        return Err(Diagnostic::new(
                            format!(
                                "{} expects {} argument(s), got {argc}",
                                builtin.name(),
                                builtin.arity()
                            ),
                            *line,
                            *column,
                        ));
                    }
                    ctx.emit(Op::CallBuiltin { builtin, argc });
                } else {
                    return Err(Diagnostic::new(
                        format!("unknown function '{callee}'"),
                        *line,
                        *column,
                    ));
                }
            }
            Expr::Method { recv, name, args } => {
                self.lower_expr(ctx, recv)?;
                for arg in args {
                    self.lower_expr(ctx, arg)?;
                }
                let argc = u8::try_from(args.len())
                    .map_err(|_| Diagnostic::new("too many arguments", 0, 0))?;
                let name = self.string_id(name)?;
                ctx.emit(Op::CallMethod { name, argc });
            }
            Expr::Field { recv, name } => {
                self.lower_expr(ctx, recv)?;
                let name = self.string_id(name)?;
                ctx.emit(Op::Field(name));
            }
            Expr::Index { recv, index } => {
                self.lower_expr(ctx, recv)?;
                self.lower_expr(ctx, index)?;
                ctx.emit(Op::Index);
            }
        }
        Ok(())
    }
}

/// Lower a parsed AST into a program.
fn lower(ast: &Ast) -> Result<Program, Diagnostic> {
    let mut func_ids = HashMap::new();
    for (index, decl) in ast.funcs.iter().enumerate() {
        if func_ids.insert(decl.name.as_str(), index).is_some() {
            return Err(Diagnostic::new(
                format!("duplicate function '{}'", decl.name),
                decl.line,
                decl.column,
            ));
        }
    }

    let Some(&entry) = func_ids.get(ENTRY_POINT) else {
        // The textual pre-check passed but the symbol is not a function
        // declaration (e.g. it only appears in a comment).
        return Err(Diagnostic::new(
            format!("no function named {ENTRY_POINT}"),
            1,
            1,
        ));
    };
    let entry_decl = &ast.funcs[entry];
    if entry_decl.params.len() != 1 {
        return Err(Diagnostic::new(
            format!("{ENTRY_POINT} must take exactly one parameter (the context)"),
            entry_decl.line,
            entry_decl.column,
        ));
    }

    let mut lowerer = Lowerer {
        ast,
        func_ids,
        strings: Vec::new(),
        string_ids: HashMap::new(),
    };

    let mut funcs = Vec::with_capacity(ast.funcs.len());
    for index in 0..ast.funcs.len() {
        funcs.push(lowerer.lower_func(index)?);
    }

    Ok(Program {
        funcs,
        entry,
        strings: lowerer.strings,
    })
}
