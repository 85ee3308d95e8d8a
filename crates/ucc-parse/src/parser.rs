//! Recursive-descent parser producing the `ucc-core` AST.
//!
//! Follows the uC grammar: a translation unit of global
//! declarations and function definitions, compound statements of the form
//! `{ declaration* statement* }`, and the expression precedence ladder
//! (low to high) assignment, `||`, `&&`, relational (non-associative),
//! equality, additive, multiplicative, cast, unary, postfix. Note that
//! equality binds tighter than the relational operators.
//!
//! A function definition without a leading type specifier returns `void`.

use ucc_core::ast::{
    AssignOp, BinOp, Compound, Constant, Decl, Expr, ExprKind, ForInit, FuncDef, GlobalItem,
    Ident, Init, InitList, Param, Program, Stmt, TypeName, TypeSpec, UnOp,
};
use ucc_core::coord::Coord;

use crate::error::{FrontError, ParseError};
use crate::lexer::tokenize;
use crate::token::{Token, TokenKind};

/// Lexes and parses a whole translation unit.
pub fn parse(source: &str) -> Result<Program, FrontError> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).program().map_err(FrontError::from)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    // -- token plumbing -----------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        let token = self.tokens.get(self.pos).cloned().ok_or(ParseError::Eof)?;
        self.pos += 1;
        Ok(token)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.check(&kind) {
            self.advance()
        } else {
            Err(self.err_here())
        }
    }

    /// `Before <lookahead>` at the current position, or end-of-input.
    fn err_here(&self) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::Before {
                token: token.kind.to_string(),
                coord: token.coord,
            },
            None => ParseError::Eof,
        }
    }

    fn ident(&mut self) -> Result<Ident, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Ident(_)) => {
                let token = self.advance()?;
                match token.kind {
                    TokenKind::Ident(name) => Ok(Ident::new(name, token.coord)),
                    _ => unreachable!("peeked an identifier"),
                }
            }
            _ => Err(self.err_here()),
        }
    }

    fn type_specifier(&mut self) -> Result<TypeSpec, ParseError> {
        let name = match self.peek_kind() {
            Some(TokenKind::Void) => TypeName::Void,
            Some(TokenKind::Char) => TypeName::Char,
            Some(TokenKind::Int) => TypeName::Int,
            Some(TokenKind::Float) => TypeName::Float,
            _ => return Err(self.err_here()),
        };
        let token = self.advance()?;
        Ok(TypeSpec {
            name,
            coord: token.coord,
        })
    }

    // -- top level ----------------------------------------------------------

    fn program(&mut self) -> Result<Program, ParseError> {
        let mut items = Vec::new();
        while self.peek().is_some() {
            items.push(self.global_item()?);
        }
        Ok(Program { items })
    }

    fn global_item(&mut self) -> Result<GlobalItem, ParseError> {
        if self.peek_kind().is_some_and(TokenKind::is_type_specifier) {
            let spec = self.type_specifier()?;
            let name = self.ident()?;
            if self.check(&TokenKind::LParen) {
                Ok(GlobalItem::Func(self.function_definition(spec, name)?))
            } else {
                Ok(GlobalItem::Decls(self.decl_list_rest(spec, name)?))
            }
        } else if matches!(self.peek_kind(), Some(TokenKind::Ident(_))) {
            // Untyped function definition; the return type defaults to void.
            let name = self.ident()?;
            let spec = TypeSpec {
                name: TypeName::Void,
                coord: name.coord,
            };
            if self.check(&TokenKind::LParen) {
                Ok(GlobalItem::Func(self.function_definition(spec, name)?))
            } else {
                Err(self.err_here())
            }
        } else {
            Err(self.err_here())
        }
    }

    fn function_definition(&mut self, ret: TypeSpec, name: Ident) -> Result<FuncDef, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let spec = self.type_specifier()?;
                let pname = self.ident()?;
                let coord = pname.coord;
                params.push(Param {
                    spec,
                    name: pname,
                    coord,
                });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        let body = self.compound()?;
        let coord = name.coord;
        Ok(FuncDef {
            ret,
            name,
            params,
            body,
            coord,
        })
    }

    // -- declarations -------------------------------------------------------

    fn declaration(&mut self) -> Result<Vec<Decl>, ParseError> {
        let spec = self.type_specifier()?;
        let name = self.ident()?;
        self.decl_list_rest(spec, name)
    }

    fn decl_list_rest(&mut self, spec: TypeSpec, first: Ident) -> Result<Vec<Decl>, ParseError> {
        let mut decls = vec![self.init_declarator(spec.clone(), first)?];
        while self.eat(&TokenKind::Comma) {
            let name = self.ident()?;
            decls.push(self.init_declarator(spec.clone(), name)?);
        }
        self.expect(TokenKind::Semi)?;
        Ok(decls)
    }

    fn init_declarator(&mut self, spec: TypeSpec, name: Ident) -> Result<Decl, ParseError> {
        let mut dims = Vec::new();
        while self.eat(&TokenKind::LBracket) {
            if self.eat(&TokenKind::RBracket) {
                dims.push(None);
            } else {
                let token = self.advance()?;
                let size = match token.kind {
                    TokenKind::IntConst(v) if v >= 0 => v as u32,
                    _ => {
                        return Err(ParseError::Before {
                            token: token.kind.to_string(),
                            coord: token.coord,
                        })
                    }
                };
                self.expect(TokenKind::RBracket)?;
                dims.push(Some(size));
            }
        }
        let init = if self.eat(&TokenKind::Assign) {
            Some(self.initializer()?)
        } else {
            None
        };
        let coord = name.coord;
        Ok(Decl {
            spec,
            name,
            dims,
            init,
            ty: None,
            coord,
        })
    }

    fn initializer(&mut self) -> Result<Init, ParseError> {
        if self.check(&TokenKind::LBrace) {
            let coord = self.advance()?.coord;
            let mut items = Vec::new();
            if !self.check(&TokenKind::RBrace) {
                items.push(self.initializer()?);
                while self.eat(&TokenKind::Comma) {
                    if self.check(&TokenKind::RBrace) {
                        break; // trailing comma
                    }
                    items.push(self.initializer()?);
                }
            }
            self.expect(TokenKind::RBrace)?;
            Ok(Init::List(InitList {
                items,
                coord,
                ty: None,
            }))
        } else {
            Ok(Init::Expr(self.assignment_expr()?))
        }
    }

    // -- statements ---------------------------------------------------------

    fn compound(&mut self) -> Result<Compound, ParseError> {
        let coord = self.expect(TokenKind::LBrace)?.coord;
        let mut decls = Vec::new();
        while self.peek_kind().is_some_and(TokenKind::is_type_specifier) {
            decls.extend(self.declaration()?);
        }
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.peek().is_none() {
                return Err(ParseError::Eof);
            }
            stmts.push(self.statement()?);
        }
        self.advance()?;
        Ok(Compound {
            decls,
            stmts,
            coord,
        })
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::LBrace) => Ok(Stmt::Compound(self.compound()?)),
            Some(TokenKind::If) => self.if_statement(),
            Some(TokenKind::While) => self.while_statement(),
            Some(TokenKind::For) => self.for_statement(),
            Some(TokenKind::Break) => {
                let coord = self.advance()?.coord;
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::Break { coord })
            }
            Some(TokenKind::Return) => {
                let coord = self.advance()?.coord;
                let expr = if self.check(&TokenKind::Semi) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::Return { expr, coord })
            }
            Some(TokenKind::Assert) => {
                let coord = self.advance()?.coord;
                let expr = self.expression()?;
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::Assert { expr, coord })
            }
            Some(TokenKind::Print) => {
                let coord = self.advance()?.coord;
                self.expect(TokenKind::LParen)?;
                let args = if self.check(&TokenKind::RParen) {
                    Vec::new()
                } else {
                    self.expression_list()?
                };
                self.expect(TokenKind::RParen)?;
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::Print { args, coord })
            }
            Some(TokenKind::Read) => {
                let coord = self.advance()?.coord;
                self.expect(TokenKind::LParen)?;
                let targets = self.expression_list()?;
                self.expect(TokenKind::RParen)?;
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::Read { targets, coord })
            }
            Some(TokenKind::Semi) => {
                let coord = self.advance()?.coord;
                Ok(Stmt::Empty { coord })
            }
            Some(_) => {
                let expr = self.expression()?;
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::Expr(expr))
            }
            None => Err(ParseError::Eof),
        }
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        let coord = self.advance()?.coord;
        self.expect(TokenKind::LParen)?;
        let cond = self.expression()?;
        self.expect(TokenKind::RParen)?;
        let then_stat = Box::new(self.statement()?);
        let else_stat = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_stat,
            else_stat,
            coord,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt, ParseError> {
        let coord = self.advance()?.coord;
        self.expect(TokenKind::LParen)?;
        let cond = self.expression()?;
        self.expect(TokenKind::RParen)?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { cond, body, coord })
    }

    fn for_statement(&mut self) -> Result<Stmt, ParseError> {
        let coord = self.advance()?.coord;
        self.expect(TokenKind::LParen)?;

        let init = if self.peek_kind().is_some_and(TokenKind::is_type_specifier) {
            // `declaration` consumes the terminating semicolon.
            ForInit::Decls(self.declaration()?)
        } else if self.eat(&TokenKind::Semi) {
            ForInit::None
        } else {
            let expr = self.expression()?;
            self.expect(TokenKind::Semi)?;
            ForInit::Expr(expr)
        };

        let cond = if self.check(&TokenKind::Semi) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(TokenKind::Semi)?;

        let step = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(TokenKind::RParen)?;

        let body = Box::new(self.statement()?);
        Ok(Stmt::For {
            init,
            cond,
            step,
            body,
            coord,
        })
    }

    // -- expressions --------------------------------------------------------

    /// `expression`: one assignment expression, or a comma list wrapped in
    /// an [`ExprKind::List`].
    fn expression(&mut self) -> Result<Expr, ParseError> {
        let first = self.assignment_expr()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let coord = first.coord;
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            items.push(self.assignment_expr()?);
        }
        Ok(Expr::new(ExprKind::List(items), coord))
    }

    /// A comma-separated expression list, kept flat (call arguments,
    /// print/read operands).
    fn expression_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut items = vec![self.assignment_expr()?];
        while self.eat(&TokenKind::Comma) {
            items.push(self.assignment_expr()?);
        }
        Ok(items)
    }

    fn assignment_expr(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.logical_or()?;
        let op = match self.peek_kind() {
            Some(TokenKind::Assign) => Some(AssignOp::Assign),
            Some(TokenKind::PlusEq) => Some(AssignOp::AddAssign),
            Some(TokenKind::MinusEq) => Some(AssignOp::SubAssign),
            Some(TokenKind::StarEq) => Some(AssignOp::MulAssign),
            Some(TokenKind::SlashEq) => Some(AssignOp::DivAssign),
            Some(TokenKind::PercentEq) => Some(AssignOp::ModAssign),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(lhs);
        };
        // The grammar admits only unary expressions as assignment targets;
        // in practice that means identifiers and array references.
        if !matches!(lhs.kind, ExprKind::Id(_) | ExprKind::ArrayRef { .. }) {
            return Err(self.err_here());
        }
        self.advance()?;
        let rhs = self.assignment_expr()?;
        let coord = lhs.coord;
        Ok(Expr::new(
            ExprKind::Assign {
                op,
                lvalue: Box::new(lhs),
                rvalue: Box::new(rhs),
            },
            coord,
        ))
    }

    fn logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.logical_and()?;
        while self.check(&TokenKind::OrOr) {
            self.advance()?;
            let right = self.logical_and()?;
            expr = binary(BinOp::Or, expr, right);
        }
        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.relational()?;
        while self.check(&TokenKind::AndAnd) {
            self.advance()?;
            let right = self.relational()?;
            expr = binary(BinOp::And, expr, right);
        }
        Ok(expr)
    }

    /// Non-associative: at most one relational operator per level.
    fn relational(&mut self) -> Result<Expr, ParseError> {
        let left = self.equality()?;
        let op = match self.peek_kind() {
            Some(TokenKind::Lt) => BinOp::Lt,
            Some(TokenKind::Le) => BinOp::Le,
            Some(TokenKind::Gt) => BinOp::Gt,
            Some(TokenKind::Ge) => BinOp::Ge,
            _ => return Ok(left),
        };
        self.advance()?;
        let right = self.equality()?;
        Ok(binary(op, left, right))
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.additive()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::EqEq) => BinOp::Eq,
                Some(TokenKind::Ne) => BinOp::Ne,
                _ => break,
            };
            self.advance()?;
            let right = self.additive()?;
            expr = binary(op, expr, right);
        }
        Ok(expr)
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.multiplicative()?;
            expr = binary(op, expr, right);
        }
        Ok(expr)
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.cast_expr()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinOp::Mul,
                Some(TokenKind::Slash) => BinOp::Div,
                Some(TokenKind::Percent) => BinOp::Mod,
                _ => break,
            };
            self.advance()?;
            let right = self.cast_expr()?;
            expr = binary(op, expr, right);
        }
        Ok(expr)
    }

    fn cast_expr(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::LParen)
            && self
                .peek_kind_at(1)
                .is_some_and(TokenKind::is_type_specifier)
        {
            let coord = self.advance()?.coord;
            let to = self.type_specifier()?;
            self.expect(TokenKind::RParen)?;
            let operand = Box::new(self.cast_expr()?);
            return Ok(Expr::new(ExprKind::Cast { to, operand }, coord));
        }
        self.unary_expr()
    }

    fn unary_expr(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek_kind() {
            Some(TokenKind::PlusPlus) => Some((UnOp::PreInc, true)),
            Some(TokenKind::MinusMinus) => Some((UnOp::PreDec, true)),
            Some(TokenKind::Plus) => Some((UnOp::Plus, false)),
            Some(TokenKind::Minus) => Some((UnOp::Neg, false)),
            Some(TokenKind::Not) => Some((UnOp::Not, false)),
            _ => None,
        };
        match op {
            Some((op, from_unary)) => {
                self.advance()?;
                let operand = if from_unary {
                    self.unary_expr()?
                } else {
                    self.cast_expr()?
                };
                let coord = operand.coord;
                Ok(Expr::new(
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    coord,
                ))
            }
            None => self.postfix_expr(),
        }
    }

    fn postfix_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary_expr()?;
        loop {
            match self.peek_kind() {
                Some(TokenKind::LBracket) => {
                    self.advance()?;
                    let index = self.expression()?;
                    self.expect(TokenKind::RBracket)?;
                    let coord = expr.coord;
                    expr = Expr::new(
                        ExprKind::ArrayRef {
                            array: Box::new(expr),
                            index: Box::new(index),
                        },
                        coord,
                    );
                }
                Some(TokenKind::LParen) => {
                    // Only plain identifiers are callable.
                    let ExprKind::Id(callee) = expr.kind else {
                        return Err(self.err_here());
                    };
                    self.advance()?;
                    let args = if self.check(&TokenKind::RParen) {
                        Vec::new()
                    } else {
                        self.expression_list()?
                    };
                    self.expect(TokenKind::RParen)?;
                    let coord = callee.coord;
                    expr = Expr::new(ExprKind::Call { callee, args }, coord);
                }
                Some(TokenKind::PlusPlus) => {
                    self.advance()?;
                    expr = postfix_step(UnOp::PostInc, expr);
                }
                Some(TokenKind::MinusMinus) => {
                    self.advance()?;
                    expr = postfix_step(UnOp::PostDec, expr);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn primary_expr(&mut self) -> Result<Expr, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::IntConst(_)) => {
                let token = self.advance()?;
                let TokenKind::IntConst(v) = token.kind else {
                    unreachable!("peeked an int constant")
                };
                Ok(Expr::new(ExprKind::Const(Constant::Int(v)), token.coord))
            }
            Some(TokenKind::FloatConst(_)) => {
                let token = self.advance()?;
                let TokenKind::FloatConst(v) = token.kind else {
                    unreachable!("peeked a float constant")
                };
                Ok(Expr::new(ExprKind::Const(Constant::Float(v)), token.coord))
            }
            Some(TokenKind::CharConst(_)) => {
                let token = self.advance()?;
                let TokenKind::CharConst(c) = token.kind else {
                    unreachable!("peeked a char constant")
                };
                Ok(Expr::new(ExprKind::Const(Constant::Char(c)), token.coord))
            }
            Some(TokenKind::StrConst(_)) => {
                let token = self.advance()?;
                let TokenKind::StrConst(s) = token.kind else {
                    unreachable!("peeked a string constant")
                };
                Ok(Expr::new(ExprKind::Const(Constant::Str(s)), token.coord))
            }
            Some(TokenKind::Ident(_)) => {
                let id = self.ident()?;
                let coord = id.coord;
                Ok(Expr::new(ExprKind::Id(id), coord))
            }
            Some(TokenKind::LParen) => {
                self.advance()?;
                let expr = self.expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            _ => Err(self.err_here()),
        }
    }
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    let coord = left.coord;
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        coord,
    )
}

fn postfix_step(op: UnOp, operand: Expr) -> Expr {
    let coord = operand.coord;
    Expr::new(
        ExprKind::Unary {
            op,
            operand: Box::new(operand),
        },
        coord,
    )
}
