//! Recursive-descent parser for the formula language.

use crate::error::Diagnostic;
use crate::formula::ast::{Ast, BinOp, Expr, FnDecl, Stmt, UnaryOp};
use crate::formula::lexer::{Token, TokenKind, tokenize};

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type ParseResult<T> = Result<T, Diagnostic>;

impl Parser {
    fn peek(&self) -> &Token {
        // The token stream always ends with Eof, so pos stays in range.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        self.pos += 1;
        token
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> ParseResult<Token> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.error_here(format!("expected {what}")))
        }
    }

    fn error_here(&self, message: String) -> Diagnostic {
        let token = self.peek();
        Diagnostic::new(message, token.line, token.column)
    }

    fn ident(&mut self, what: &str) -> ParseResult<(String, u32, u32)> {
        let token = self.peek().clone();
        if let TokenKind::Ident(name) = token.kind {
            self.pos += 1;
            Ok((name, token.line, token.column))
        } else {
            Err(self.error_here(format!("expected {what}")))
        }
    }

    fn program(&mut self) -> ParseResult<Ast> {
        let mut funcs = Vec::new();
        while !self.at(&TokenKind::Eof) {
            funcs.push(self.function()?);
        }
        Ok(Ast { funcs })
    }

    fn function(&mut self) -> ParseResult<FnDecl> {
        self.expect(&TokenKind::Fn, "'fn'")?;
        let (name, line, column) = self.ident("function name")?;
        self.expect(&TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        if !self.at(&TokenKind::RParen) {
            loop {
                params.push(self.ident("parameter name")?.0);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        let body = self.block()?;
        Ok(FnDecl {
            name,
            params,
            body,
            line,
            column,
        })
    }

    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.at(&TokenKind::RBrace) && !self.at(&TokenKind::Eof) {
            stmts.push(self.statement()?);
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(stmts)
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        match &self.peek().kind {
            TokenKind::Let => {
                self.bump();
                let (name, line, column) = self.ident("variable name")?;
                self.expect(&TokenKind::Assign, "'='")?;
                let expr = self.expression()?;
                self.eat(&TokenKind::Semi);
                Ok(Stmt::Let {
                    name,
                    line,
                    column,
                    expr,
                })
            }
            TokenKind::If => self.if_statement(),
            TokenKind::While => {
                self.bump();
                let cond = self.expression()?;
                let body = self.block()?;
                Ok(Stmt::While { cond, body })
            }
            TokenKind::For => {
                self.bump();
                let (var, _, _) = self.ident("loop variable")?;
                self.expect(&TokenKind::In, "'in'")?;
                let iter = self.expression()?;
                let body = self.block()?;
                Ok(Stmt::For { var, iter, body })
            }
            TokenKind::Return => {
                self.bump();
                let expr = if self.at(&TokenKind::Semi) || self.at(&TokenKind::RBrace) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.eat(&TokenKind::Semi);
                Ok(Stmt::Return(expr))
            }
            // `name = expr` is an assignment; anything else is an
            // expression statement.
            TokenKind::Ident(_) if self.tokens[self.pos + 1].kind == TokenKind::Assign => {
                let (name, line, column) = self.ident("variable name")?;
                self.bump(); // '='
                let expr = self.expression()?;
                self.eat(&TokenKind::Semi);
                Ok(Stmt::Assign {
                    name,
                    line,
                    column,
                    expr,
                })
            }
            _ => {
                let expr = self.expression()?;
                self.eat(&TokenKind::Semi);
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.expect(&TokenKind::If, "'if'")?;
        // Parentheses around the condition are allowed but not required;
        // a parenthesized expression parses as a primary.
        let cond = self.expression()?;
        let then = self.block()?;
        let otherwise = if self.eat(&TokenKind::Else) {
            if self.at(&TokenKind::If) {
                vec![self.if_statement()?]
            } else {
                self.block()?
            }
        } else {
            Vec::new()
        };
        Ok(Stmt::If {
            cond,
            then,
            otherwise,
        })
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.and_expr()?;
        while self.eat(&TokenKind::OrOr) {
            let rhs = self.and_expr()?;
            lhs = Expr::Binary {
                op: BinOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.equality()?;
        while self.eat(&TokenKind::AndAnd) {
            let rhs = self.equality()?;
            lhs = Expr::Binary {
                op: BinOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.comparison()?;
        loop {
            let op = if self.eat(&TokenKind::EqEq) {
                BinOp::Eq
            } else if self.eat(&TokenKind::BangEq) {
                BinOp::Ne
            } else {
                return Ok(lhs);
            };
            let rhs = self.comparison()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.additive()?;
        loop {
            let op = if self.eat(&TokenKind::Lt) {
                BinOp::Lt
            } else if self.eat(&TokenKind::Le) {
                BinOp::Le
            } else if self.eat(&TokenKind::Gt) {
                BinOp::Gt
            } else if self.eat(&TokenKind::Ge) {
                BinOp::Ge
            } else {
                return Ok(lhs);
            };
            let rhs = self.additive()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn additive(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = if self.eat(&TokenKind::Plus) {
                BinOp::Add
            } else if self.eat(&TokenKind::Minus) {
                BinOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn multiplicative(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = if self.eat(&TokenKind::Star) {
                BinOp::Mul
            } else if self.eat(&TokenKind::Slash) {
                BinOp::Div
            } else if self.eat(&TokenKind::Percent) {
                BinOp::Rem
            } else {
                return Ok(lhs);
            };
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.eat(&TokenKind::Minus) {
            Ok(Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(self.unary()?),
            })
        } else if self.eat(&TokenKind::Bang) {
            Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(self.unary()?),
            })
        } else {
            self.postfix()
        }
    }

    fn postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&TokenKind::Dot) {
                let (name, _, _) = self.ident("member name")?;
                if self.at(&TokenKind::LParen) {
                    let args = self.arguments()?;
                    expr = Expr::Method {
                        recv: Box::new(expr),
                        name,
                        args,
                    };
                } else {
                    expr = Expr::Field {
                        recv: Box::new(expr),
                        name,
                    };
                }
            } else if self.eat(&TokenKind::LBracket) {
                let index = self.expression()?;
                self.expect(&TokenKind::RBracket, "']'")?;
                expr = Expr::Index {
                    recv: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn arguments(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect(&TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.at(&TokenKind::RParen) {
            loop {
                args.push(self.expression()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(args)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number(value) => {
                self.pos += 1;
                Ok(Expr::Number(value))
            }
            TokenKind::Str(value) => {
                self.pos += 1;
                Ok(Expr::Str(value))
            }
            TokenKind::True => {
                self.pos += 1;
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.pos += 1;
                Ok(Expr::Bool(false))
            }
            TokenKind::Nil => {
                self.pos += 1;
                Ok(Expr::Nil)
            }
            TokenKind::LParen => {
                self.pos += 1;
                let expr = self.expression()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::LBracket => {
                self.pos += 1;
                let mut items = Vec::new();
                if !self.at(&TokenKind::RBracket) {
                    loop {
                        items.push(self.expression()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RBracket, "']'")?;
                Ok(Expr::List(items))
            }
            TokenKind::Ident(name) => {
                self.pos += 1;
                if self.at(&TokenKind::LParen) {
                    let args = self.arguments()?;
                    Ok(Expr::Call {
                        callee: name,
                        args,
                        line: token.line,
                        column: token.column,
                    })
                } else {
                    Ok(Expr::Var {
                        name,
                        line: token.line,
                        column: token.column,
                    })
                }
            }
            _ => Err(self.error_here("expected an expression".to_string())),
        }
    }
}

/// Parse formula source into an AST.
///
/// # Errors
///
/// Returns a position-tagged diagnostic for the first lexical or
/// syntactic problem.
pub(crate) fn parse(source: &str) -> Result<Ast, Diagnostic> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.program()
}
