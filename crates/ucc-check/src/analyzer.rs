//! The semantic analyser.
//!
//! A single exhaustive-match walk over the AST that resolves identifiers,
//! fills the `ty`/`scope` annotation slots, and rejects the first rule
//! violation with its numbered diagnostic. Scope discipline: a scope is
//! pushed for the program, for each function (parameters live there), and
//! for every compound, `if`, `while` and `for` statement.

use tracing::debug;
use ucc_core::ast::{
    Compound, Constant, Decl, Expr, ExprKind, ForInit, FuncDef, GlobalItem, Init, InitList,
    Program, Stmt,
};
use ucc_core::coord::Coord;
use ucc_core::types::UcType;

use crate::diagnostics::{type_str, SemanticError, SemanticErrorKind};
use crate::symtab::{DeclStatus, Symbol, SymbolTable};

type Result<T> = std::result::Result<T, SemanticError>;

/// Runs semantic analysis over `program`, annotating it in place.
///
/// On success every expression carries its type and every identifier its
/// resolution depth; the first violated rule aborts with its diagnostic.
pub fn analyze(program: &mut Program) -> Result<()> {
    let mut analyzer = SemanticAnalyzer::new();
    analyzer.visit_program(program)?;
    debug!("semantic analysis completed");
    Ok(())
}

struct FnCtx {
    ret: UcType,
    has_return: bool,
}

struct SemanticAnalyzer {
    symtab: SymbolTable,
    loop_depth: usize,
    current_fn: Option<FnCtx>,
}

impl SemanticAnalyzer {
    fn new() -> Self {
        SemanticAnalyzer {
            symtab: SymbolTable::new(),
            loop_depth: 0,
            current_fn: None,
        }
    }

    fn fail(&self, kind: SemanticErrorKind, coord: Coord) -> SemanticError {
        SemanticError::new(kind, coord)
    }

    // -- top level ----------------------------------------------------------

    fn visit_program(&mut self, program: &mut Program) -> Result<()> {
        self.symtab.begin_scope();
        for item in &mut program.items {
            match item {
                GlobalItem::Decls(decls) => {
                    for decl in decls {
                        self.visit_decl(decl)?;
                    }
                }
                GlobalItem::Func(func) => self.visit_func_def(func)?,
            }
        }
        self.symtab.end_scope();
        Ok(())
    }

    fn visit_func_def(&mut self, func: &mut FuncDef) -> Result<()> {
        let ret = func.ret.name.uc_type();
        let name = func.name.name.clone();

        if self.symtab.declared(&name) == DeclStatus::Current {
            return Err(self.fail(
                SemanticErrorKind::Redeclaration { name },
                func.name.coord,
            ));
        }

        let mut signature = indexmap::IndexMap::new();
        for param in &func.params {
            signature.insert(param.name.name.clone(), param.spec.name.uc_type());
        }
        self.symtab
            .add(&name, Symbol::function(ret.clone(), signature));
        func.name.scope = Some(self.symtab.depth());

        // Parameters live in the function's own scope; the body compound
        // opens a further one below them.
        self.symtab.begin_scope();
        for param in &mut func.params {
            if self.symtab.declared(&param.name.name) == DeclStatus::Current {
                return Err(self.fail(
                    SemanticErrorKind::Redeclaration {
                        name: param.name.name.clone(),
                    },
                    param.name.coord,
                ));
            }
            self.symtab
                .add(&param.name.name, Symbol::var(param.spec.name.uc_type()));
            param.name.scope = Some(self.symtab.depth());
        }

        self.current_fn = Some(FnCtx {
            ret: ret.clone(),
            has_return: false,
        });
        self.visit_compound(&mut func.body)?;

        if !ret.same_as(&UcType::Void) {
            let has_return = self
                .current_fn
                .as_ref()
                .is_some_and(|ctx| ctx.has_return);
            if !has_return {
                return Err(self.fail(
                    SemanticErrorKind::ReturnTypeMismatch {
                        ltype: type_str(&UcType::Void),
                        rtype: type_str(&ret),
                    },
                    func.body.coord,
                ));
            }
        }

        self.symtab.end_scope();
        self.current_fn = None;
        Ok(())
    }

    // -- declarations -------------------------------------------------------

    fn visit_decl(&mut self, decl: &mut Decl) -> Result<()> {
        let declared_ty = UcType::with_dims(decl.spec.name.uc_type(), &decl.dims);
        let name = decl.name.name.clone();

        if self.symtab.declared(&name) == DeclStatus::Current {
            return Err(self.fail(
                SemanticErrorKind::Redeclaration { name },
                decl.name.coord,
            ));
        }
        self.symtab.add(&name, Symbol::var(declared_ty.clone()));
        decl.name.scope = Some(self.symtab.depth());
        decl.ty = Some(declared_ty.clone());

        if let Some(init) = &mut decl.init {
            self.visit_init(init)?;

            // Module-scope initializers are folded straight into the
            // global section, so they must be constants.
            if self.symtab.depth() == 1 {
                if let Init::Expr(expr) = init {
                    if !matches!(expr.kind, ExprKind::Const(_)) {
                        return Err(self.fail(SemanticErrorKind::NotAConstant, expr.coord));
                    }
                }
            }

            if !declared_ty.is_array() {
                if matches!(init, Init::List(_)) {
                    return Err(self.fail(
                        SemanticErrorKind::InitMustBeSingle {
                            name: decl.name.name.clone(),
                        },
                        decl.name.coord,
                    ));
                }
                let init_ty = init.ty().expect("initializer was just visited");
                if !declared_ty.same_as(init_ty) {
                    return Err(self.fail(
                        SemanticErrorKind::InitTypeMismatch {
                            name: decl.name.name.clone(),
                        },
                        decl.name.coord,
                    ));
                }
            }
        }

        if declared_ty.is_array() {
            self.check_array_decl(decl)?;
        }
        Ok(())
    }

    /// Validates an array declaration against its initializer (or, without
    /// one, requires every dimension to be sized) and resolves open
    /// dimensions in place.
    fn check_array_decl(&mut self, decl: &mut Decl) -> Result<()> {
        let declared_ty = decl.ty.clone().expect("declaration was typed above");

        let Some(init) = &decl.init else {
            if declared_ty.dims().iter().any(Option::is_none) {
                return Err(self.fail(
                    SemanticErrorKind::ArrayDimensionMismatch,
                    decl.name.coord,
                ));
            }
            return Ok(());
        };

        match init {
            Init::List(list) => {
                self.check_uniform_sublists(list, decl.name.coord)?;

                let init_ty = list.ty.clone().expect("initializer list was typed");
                let resolved = self.resolve_dims(&declared_ty, &init_ty);
                if !resolved.same_as(&init_ty) {
                    return Err(self.fail(
                        SemanticErrorKind::InitSizeMismatch {
                            name: decl.name.name.clone(),
                        },
                        decl.name.coord,
                    ));
                }
                self.update_decl_type(decl, resolved);
            }
            Init::Expr(expr) => match (&expr.kind, expr.ty.as_ref()) {
                // A char array may be initialised from a string literal.
                (ExprKind::Const(Constant::Str(text)), Some(UcType::String)) => {
                    if !matches!(declared_ty.basic(), UcType::Char) || decl.dims.len() != 1 {
                        return Err(self.fail(
                            SemanticErrorKind::InitTypeMismatch {
                                name: decl.name.name.clone(),
                            },
                            decl.name.coord,
                        ));
                    }
                    let len = text.chars().count() as u32;
                    match decl.dims[0] {
                        Some(size) if size != len => {
                            return Err(self.fail(
                                SemanticErrorKind::InitSizeMismatch {
                                    name: decl.name.name.clone(),
                                },
                                decl.name.coord,
                            ));
                        }
                        _ => {
                            self.update_decl_type(decl, UcType::array(UcType::Char, Some(len)))
                        }
                    }
                }
                _ => {
                    return Err(self.fail(
                        SemanticErrorKind::InitSizeMismatch {
                            name: decl.name.name.clone(),
                        },
                        decl.name.coord,
                    ));
                }
            },
        }
        Ok(())
    }

    /// Fills open (`None`) dimensions of `declared` from the initializer's
    /// shape, leaving sized dimensions untouched.
    fn resolve_dims(&self, declared: &UcType, init_ty: &UcType) -> UcType {
        let init_dims = init_ty.dims();
        let dims: Vec<Option<u32>> = declared
            .dims()
            .into_iter()
            .enumerate()
            .map(|(i, dim)| dim.or_else(|| init_dims.get(i).copied().flatten()))
            .collect();
        UcType::with_dims(declared.basic().clone(), &dims)
    }

    /// Re-binds the declaration (and its symbol) to the resolved type.
    fn update_decl_type(&mut self, decl: &mut Decl, resolved: UcType) {
        decl.ty = Some(resolved.clone());
        decl.dims = resolved.dims();
        // The binding added above still holds the unresolved type; replace
        // it in place so later references see the resolved dimensions.
        let stale = self
            .symtab
            .lookup(&decl.name.name)
            .is_some_and(|sym| !sym.ty.same_as(&resolved));
        if stale {
            self.symtab
                .replace_top(&decl.name.name, Symbol::var(resolved));
        }
    }

    /// Every sublist level of a nested initializer must have uniform sizes.
    fn check_uniform_sublists(&self, list: &InitList, coord: Coord) -> Result<()> {
        let mut prev: Option<usize> = None;
        for item in &list.items {
            if let Init::List(inner) = item {
                if let Some(expected) = prev {
                    if expected != inner.items.len() {
                        return Err(self.fail(SemanticErrorKind::ListSizesDiffer, coord));
                    }
                }
                prev = Some(inner.items.len());
                self.check_uniform_sublists(inner, coord)?;
            }
        }
        Ok(())
    }

    fn visit_init(&mut self, init: &mut Init) -> Result<()> {
        match init {
            Init::Expr(expr) => self.visit_expr(expr),
            Init::List(list) => self.visit_init_list(list),
        }
    }

    fn visit_init_list(&mut self, list: &mut InitList) -> Result<()> {
        for item in &mut list.items {
            match item {
                Init::Expr(expr) => {
                    if !matches!(expr.kind, ExprKind::Const(_)) {
                        return Err(
                            self.fail(SemanticErrorKind::NotAConstant, expr.coord)
                        );
                    }
                    self.visit_expr(expr)?;
                }
                Init::List(inner) => self.visit_init_list(inner)?,
            }
        }
        let Some(first_ty) = list.items.first().and_then(|item| item.ty()).cloned() else {
            return Err(self.fail(SemanticErrorKind::NotAConstant, list.coord));
        };
        list.ty = Some(UcType::array(first_ty, Some(list.items.len() as u32)));
        Ok(())
    }

    // -- statements ---------------------------------------------------------

    fn visit_compound(&mut self, compound: &mut Compound) -> Result<()> {
        self.symtab.begin_scope();
        for decl in &mut compound.decls {
            self.visit_decl(decl)?;
        }
        for stmt in &mut compound.stmts {
            self.visit_stmt(stmt)?;
        }
        self.symtab.end_scope();
        Ok(())
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) -> Result<()> {
        match stmt {
            Stmt::Expr(expr) => self.visit_expr(expr),
            Stmt::Compound(compound) => self.visit_compound(compound),
            Stmt::If {
                cond,
                then_stat,
                else_stat,
                ..
            } => {
                self.symtab.begin_scope();
                self.visit_expr(cond)?;
                let cond_ty = cond.ty.as_ref().expect("condition was visited");
                if !cond_ty.same_as(&UcType::Bool) {
                    return Err(self.fail(SemanticErrorKind::IfCondNotBool, cond.coord));
                }
                self.visit_stmt(then_stat)?;
                if let Some(else_stat) = else_stat {
                    self.visit_stmt(else_stat)?;
                }
                self.symtab.end_scope();
                Ok(())
            }
            Stmt::While { cond, body, coord } => {
                self.symtab.begin_scope();
                self.visit_expr(cond)?;
                let cond_ty = cond.ty.as_ref().expect("condition was visited");
                if !cond_ty.same_as(&UcType::Bool) {
                    return Err(self.fail(
                        SemanticErrorKind::WhileCondNotBool {
                            ltype: type_str(cond_ty),
                        },
                        *coord,
                    ));
                }
                self.loop_depth += 1;
                self.visit_stmt(body)?;
                self.loop_depth -= 1;
                self.symtab.end_scope();
                Ok(())
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
                ..
            } => {
                self.symtab.begin_scope();
                match init {
                    ForInit::Decls(decls) => {
                        for decl in decls {
                            self.visit_decl(decl)?;
                        }
                    }
                    ForInit::Expr(expr) => self.visit_expr(expr)?,
                    ForInit::None => {}
                }
                if let Some(cond) = cond {
                    self.visit_expr(cond)?;
                }
                if let Some(step) = step {
                    self.visit_expr(step)?;
                }
                self.loop_depth += 1;
                self.visit_stmt(body)?;
                self.loop_depth -= 1;
                self.symtab.end_scope();
                Ok(())
            }
            Stmt::Break { coord } => {
                if self.loop_depth == 0 {
                    return Err(self.fail(SemanticErrorKind::BreakOutsideLoop, *coord));
                }
                Ok(())
            }
            Stmt::Return { expr, coord } => {
                let rty = match expr {
                    Some(expr) => {
                        self.visit_expr(expr)?;
                        expr.ty.clone().expect("return expression was visited")
                    }
                    None => UcType::Void,
                };
                let (matches, expected) = {
                    let ctx = self
                        .current_fn
                        .as_ref()
                        .expect("return statement outside a function");
                    (rty.same_as(&ctx.ret), type_str(&ctx.ret))
                };
                if !matches {
                    return Err(SemanticError::new(
                        SemanticErrorKind::ReturnTypeMismatch {
                            ltype: type_str(&rty),
                            rtype: expected,
                        },
                        *coord,
                    ));
                }
                if let Some(ctx) = self.current_fn.as_mut() {
                    ctx.has_return = true;
                }
                Ok(())
            }
            Stmt::Assert { expr, .. } => {
                self.visit_expr(expr)?;
                let ty = expr.ty.as_ref().expect("assert expression was visited");
                if !ty.same_as(&UcType::Bool) {
                    return Err(self.fail(SemanticErrorKind::AssertNotBool, expr.coord));
                }
                Ok(())
            }
            Stmt::Print { args, .. } => {
                for arg in args {
                    self.visit_expr(arg)?;
                    let ty = arg.ty.as_ref().expect("print argument was visited");
                    match &arg.kind {
                        ExprKind::Id(id) => {
                            if !ty.is_printable() {
                                return Err(self.fail(
                                    SemanticErrorKind::NotBasicVariable {
                                        name: id.name.clone(),
                                    },
                                    arg.coord,
                                ));
                            }
                        }
                        ExprKind::Call { callee, .. } => {
                            if !ty.is_printable() {
                                return Err(self.fail(
                                    SemanticErrorKind::NotBasicType,
                                    callee.coord,
                                ));
                            }
                        }
                        _ => {
                            if !ty.is_printable() {
                                return Err(
                                    self.fail(SemanticErrorKind::NotBasicType, arg.coord)
                                );
                            }
                        }
                    }
                }
                Ok(())
            }
            Stmt::Read { targets, .. } => {
                for target in targets {
                    self.visit_expr(target)?;
                    if !matches!(
                        target.kind,
                        ExprKind::Id(_) | ExprKind::ArrayRef { .. }
                    ) {
                        return Err(self.fail(
                            SemanticErrorKind::NotAVariable {
                                name: target.describe(),
                            },
                            target.coord,
                        ));
                    }
                }
                Ok(())
            }
            Stmt::Empty { .. } => Ok(()),
        }
    }

    // -- expressions --------------------------------------------------------

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<()> {
        match &mut expr.kind {
            ExprKind::Const(constant) => {
                expr.ty = Some(match constant {
                    Constant::Int(_) => UcType::Int,
                    Constant::Float(_) => UcType::Float,
                    Constant::Char(_) => UcType::Char,
                    Constant::Str(_) => UcType::String,
                });
                Ok(())
            }
            ExprKind::Id(id) => {
                if self.symtab.declared(&id.name) == DeclStatus::Undeclared {
                    return Err(SemanticError::new(
                        SemanticErrorKind::NotDefined {
                            name: id.name.clone(),
                        },
                        id.coord,
                    ));
                }
                id.scope = Some(self.symtab.depth());
                expr.ty = self.symtab.lookup(&id.name).map(|sym| sym.ty.clone());
                Ok(())
            }
            ExprKind::Binary { op, left, right } => {
                let op = *op;
                self.visit_expr(left)?;
                self.visit_expr(right)?;
                let ltype = left.ty.clone().expect("left operand was visited");
                let rtype = right.ty.clone().expect("right operand was visited");
                if !ltype.same_as(&rtype) {
                    return Err(SemanticError::new(
                        SemanticErrorKind::BinaryOperandMismatch {
                            name: op.symbol().to_string(),
                        },
                        expr.coord,
                    ));
                }
                if ltype.supports_binary(op) {
                    expr.ty = Some(ltype);
                } else if ltype.supports_rel(op) {
                    expr.ty = Some(UcType::Bool);
                } else {
                    return Err(SemanticError::new(
                        SemanticErrorKind::BinaryOpUnsupported {
                            name: op.symbol().to_string(),
                            ltype: type_str(&ltype),
                        },
                        expr.coord,
                    ));
                }
                Ok(())
            }
            ExprKind::Unary { op, operand } => {
                let op = *op;
                self.visit_expr(operand)?;
                let ty = operand.ty.clone().expect("operand was visited");
                if !ty.supports_unary(op) {
                    return Err(SemanticError::new(
                        SemanticErrorKind::UnaryOpUnsupported {
                            name: op.symbol().to_string(),
                        },
                        expr.coord,
                    ));
                }
                // The step operators mutate storage, so their operand must
                // denote a location.
                if op.is_step()
                    && !matches!(operand.kind, ExprKind::Id(_) | ExprKind::ArrayRef { .. })
                {
                    return Err(SemanticError::new(
                        SemanticErrorKind::UnaryOpUnsupported {
                            name: op.symbol().to_string(),
                        },
                        expr.coord,
                    ));
                }
                expr.ty = Some(ty);
                Ok(())
            }
            ExprKind::Assign { op, lvalue, rvalue } => {
                let op = *op;
                self.visit_expr(rvalue)?;
                self.visit_expr(lvalue)?;
                let ltype = lvalue.ty.clone().expect("lvalue was visited");
                let rtype = rvalue.ty.clone().expect("rvalue was visited");
                if !ltype.same_as(&rtype) {
                    return Err(SemanticError::new(
                        SemanticErrorKind::AssignTypeMismatch {
                            ltype: type_str(&ltype),
                            rtype: type_str(&rtype),
                        },
                        expr.coord,
                    ));
                }
                if !ltype.supports_assign(op) {
                    return Err(SemanticError::new(
                        SemanticErrorKind::AssignOpUnsupported {
                            name: op.symbol().to_string(),
                            ltype: type_str(&ltype),
                        },
                        expr.coord,
                    ));
                }
                expr.ty = Some(UcType::Void);
                Ok(())
            }
            ExprKind::ArrayRef { array, index } => {
                self.visit_expr(array)?;
                self.visit_expr(index)?;
                let index_ty = index.ty.as_ref().expect("index was visited");
                if !index_ty.same_as(&UcType::Int) {
                    return Err(SemanticError::new(
                        SemanticErrorKind::IndexMustBeInt {
                            ltype: type_str(index_ty),
                        },
                        index.coord,
                    ));
                }
                match array.ty.as_ref().expect("array was visited") {
                    UcType::Array(arr) => {
                        expr.ty = Some((*arr.element).clone());
                        Ok(())
                    }
                    _ => Err(SemanticError::new(
                        SemanticErrorKind::Undefined,
                        expr.coord,
                    )),
                }
            }
            ExprKind::Call { callee, args } => {
                if self.symtab.declared(&callee.name) == DeclStatus::Undeclared {
                    return Err(SemanticError::new(
                        SemanticErrorKind::NotDefined {
                            name: callee.name.clone(),
                        },
                        callee.coord,
                    ));
                }
                callee.scope = Some(self.symtab.depth());

                let Some(signature) = self.symtab.params(&callee.name).cloned() else {
                    return Err(SemanticError::new(
                        SemanticErrorKind::NotAFunction {
                            name: callee.name.clone(),
                        },
                        expr.coord,
                    ));
                };
                expr.ty = self.symtab.lookup(&callee.name).map(|sym| sym.ty.clone());

                for arg in args.iter_mut() {
                    self.visit_expr(arg)?;
                }
                if args.len() != signature.len() {
                    return Err(SemanticError::new(
                        SemanticErrorKind::ArgumentCountMismatch {
                            name: callee.name.clone(),
                        },
                        expr.coord,
                    ));
                }
                for ((param_name, param_ty), arg) in signature.iter().zip(args.iter()) {
                    let arg_ty = arg.ty.as_ref().expect("argument was visited");
                    if !param_ty.same_as(arg_ty) {
                        return Err(SemanticError::new(
                            SemanticErrorKind::ParameterTypeMismatch {
                                name: param_name.clone(),
                            },
                            arg.coord,
                        ));
                    }
                }
                Ok(())
            }
            ExprKind::Cast { to, operand } => {
                let to_ty = to.name.uc_type();
                self.visit_expr(operand)?;
                expr.ty = Some(to_ty);
                Ok(())
            }
            ExprKind::List(items) => {
                for item in items.iter_mut() {
                    self.visit_expr(item)?;
                }
                expr.ty = items
                    .last()
                    .and_then(|item| item.ty.clone())
                    .or(Some(UcType::Void));
                Ok(())
            }
        }
    }
}
