//! Lowering from the annotated AST to uCIR control-flow graphs.
//!
//! One [`CodeGenerator`] handles a whole translation unit: the global
//! section (folded scalar and aggregate initializers, hoisted string
//! literals) plus one [`FunctionCfg`] per function definition.
//!
//! Naming follows the classic uCIR conventions: temporaries are `%<n>`
//! with a per-function counter starting at 1, user variables are
//! `%<name>` locally and `@<name>` globally, hoisted constants are
//! `@.str.<k>` / `@.<varname>.<k>`, and block labels reuse base names
//! with `.2`, `.3`, ... suffixes on reuse.
//!
//! Statements never append past a terminator: lowering a `return` or
//! `break` ends the current block, and the remaining (unreachable)
//! statements of the enclosing compound are dropped, so every block keeps
//! exactly one terminator.

use std::collections::{HashMap, HashSet};

use tracing::debug;
use ucc_core::ast::{
    Compound, Constant, Decl, Expr, ExprKind, ForInit, FuncDef, GlobalItem, Init, InitList,
    Program, Stmt, TypeName, UnOp,
};
use ucc_core::cfg::{BlockId, BlockKind, CfgEdge, FunctionCfg};
use ucc_core::ir::{BinAlu, GlobalInit, Instr, IrBase, IrType, LitValue};

use crate::ModuleIr;

/// Lowers a semantically valid program, filling `gen_location` /
/// `mem_location` on its expression nodes as a side effect.
pub fn generate(program: &mut Program) -> ModuleIr {
    let mut generator = CodeGenerator::new();
    generator.visit_program(program);
    debug!(
        functions = generator.functions.len(),
        globals = generator.text.len(),
        "code generation completed"
    );
    ModuleIr {
        text: generator.text,
        functions: generator.functions,
    }
}

/// AST-to-uCIR lowering state.
pub struct CodeGenerator {
    /// Global section (`global_*` instructions).
    text: Vec<Instr>,
    /// Finished per-function CFGs.
    functions: Vec<FunctionCfg>,
    /// Names declared at module scope, referenced as `@name`.
    globals: HashSet<String>,
    /// Declared dimensions per array variable, for index linearisation.
    var_dims: HashMap<String, Vec<u32>>,
    /// Counters: one per function for temporaries, one per label base
    /// name, plus the module-wide `_glob_` counter for hoisted constants.
    versions: HashMap<String, u32>,
    /// Counter key of the function being lowered.
    fname: String,
    /// End-block stack of the enclosing loops, for `break`.
    loop_stack: Vec<BlockId>,
    /// Slot holding the return value of the current (non-void) function.
    return_slot: Option<String>,
    cfg: Option<FunctionCfg>,
    current: Option<BlockId>,
}

impl CodeGenerator {
    pub fn new() -> Self {
        let mut versions = HashMap::new();
        versions.insert("_glob_".to_string(), 0);
        CodeGenerator {
            text: Vec::new(),
            functions: Vec::new(),
            globals: HashSet::new(),
            var_dims: HashMap::new(),
            versions,
            fname: "_glob_".to_string(),
            loop_stack: Vec::new(),
            return_slot: None,
            cfg: None,
            current: None,
        }
    }

    // -- naming -------------------------------------------------------------

    /// Fresh `%<n>` temporary in the current function.
    fn new_temp(&mut self) -> String {
        let counter = self.versions.entry(self.fname.clone()).or_insert(1);
        let name = format!("%{}", counter);
        *counter += 1;
        name
    }

    /// Fresh block label: `base` on first use, `base.2`, `base.3`, ... after.
    fn new_label(&mut self, base: &str) -> String {
        let counter = self.versions.entry(base.to_string()).or_insert(0);
        *counter += 1;
        if *counter == 1 {
            base.to_string()
        } else {
            format!("{}.{}", base, counter)
        }
    }

    /// Fresh hoisted-constant name `@.<kind>.<k>` in the global section.
    fn new_text_name(&mut self, kind: &str) -> String {
        let counter = self
            .versions
            .get_mut("_glob_")
            .expect("module counter initialised in new()");
        let name = format!("@.{}.{}", kind, counter);
        *counter += 1;
        name
    }

    /// `@name` for module globals, `%name` for locals.
    fn origin(&self, name: &str) -> String {
        if self.globals.contains(name) {
            format!("@{}", name)
        } else {
            format!("%{}", name)
        }
    }

    // -- block plumbing -----------------------------------------------------

    fn cfg(&self) -> &FunctionCfg {
        self.cfg.as_ref().expect("lowering outside a function")
    }

    fn cfg_mut(&mut self) -> &mut FunctionCfg {
        self.cfg.as_mut().expect("lowering outside a function")
    }

    fn terminated(&self) -> bool {
        let current = self.current.expect("no current block");
        self.cfg().block(current).terminated()
    }

    fn emit(&mut self, instr: Instr) {
        let current = self.current.expect("no current block");
        let block = self.cfg_mut().block_mut(current);
        if !block.terminated() {
            block.append(instr);
        }
    }

    fn jump_label(&self, id: BlockId) -> String {
        let label = &self.cfg().block(id).label;
        if label.starts_with('%') {
            label.clone()
        } else {
            format!("%{}", label)
        }
    }

    /// Emits `jump` to `target` and links the edge, unless the current
    /// block already ended.
    fn emit_jump(&mut self, target: BlockId) {
        if self.terminated() {
            return;
        }
        let label = self.jump_label(target);
        self.emit(Instr::Jump { target: label });
        let current = self.current.expect("no current block");
        self.cfg_mut().add_edge(current, target, CfgEdge::Branch);
    }

    /// Emits `cbranch` and links both successors.
    fn emit_cbranch(&mut self, cond: String, taken: BlockId, fall_through: BlockId) {
        if self.terminated() {
            return;
        }
        let taken_label = self.jump_label(taken);
        let fall_label = self.jump_label(fall_through);
        self.emit(Instr::CBranch {
            cond,
            taken: taken_label,
            fall_through: fall_label,
        });
        let current = self.current.expect("no current block");
        self.cfg_mut().add_edge(current, taken, CfgEdge::Taken);
        self.cfg_mut()
            .add_edge(current, fall_through, CfgEdge::FallThrough);
    }

    /// Places `id` next in emission order, makes it current, and opens it
    /// with its label instruction.
    fn enter(&mut self, id: BlockId) {
        self.cfg_mut().place(id);
        self.current = Some(id);
        let label = self.cfg().block(id).label.clone();
        self.emit(Instr::Label(label));
    }

    // -- top level ----------------------------------------------------------

    fn visit_program(&mut self, program: &mut Program) {
        for item in &mut program.items {
            match item {
                GlobalItem::Decls(decls) => {
                    for decl in decls {
                        self.gen_global_decl(decl);
                    }
                }
                GlobalItem::Func(func) => self.gen_func(func),
            }
        }
    }

    fn gen_global_decl(&mut self, decl: &mut Decl) {
        let name = decl.name.name.clone();
        let ty = decl.ty.clone().expect("declaration typed by analysis");
        let ir_ty = IrType::of(&ty);
        let dims: Vec<u32> = ty.dims().into_iter().flatten().collect();

        let init = match &decl.init {
            None => None,
            Some(Init::Expr(expr)) => match &expr.kind {
                ExprKind::Const(constant) => Some(GlobalInit::Value(fold_constant(constant))),
                _ => None,
            },
            Some(Init::List(list)) => Some(fold_init_list(list)),
        };
        self.text.push(Instr::Global {
            ty: ir_ty,
            name: format!("@{}", name),
            init,
        });
        self.globals.insert(name.clone());
        if !dims.is_empty() {
            self.var_dims.insert(name, dims);
        }
    }

    fn gen_func(&mut self, func: &mut FuncDef) {
        let name = func.name.name.clone();
        let cfg = FunctionCfg::new(&name);
        let entry = cfg.entry();
        let exit = cfg.exit();
        self.cfg = Some(cfg);
        self.current = Some(entry);
        self.fname = format!("_{}_", name);
        self.return_slot = None;

        let ret_ty = IrType::of(&func.ret.name.uc_type());

        // Parameter temporaries come first, then their slots.
        let mut params = Vec::new();
        let mut prologue = Vec::new();
        for param in &func.params {
            let temp = self.new_temp();
            let ty = IrType::of(&param.spec.name.uc_type());
            params.push((ty.clone(), temp.clone()));
            let slot = format!("%{}", param.name.name);
            prologue.push(Instr::Alloc {
                ty: ty.clone(),
                target: slot.clone(),
            });
            prologue.push(Instr::Store {
                ty,
                src: temp,
                target: slot,
            });
        }

        self.emit(Instr::Define {
            ty: ret_ty.clone(),
            name: format!("@{}", name),
            params,
        });
        self.emit(Instr::Entry);
        for instr in prologue {
            self.emit(instr);
        }

        if func.ret.name != TypeName::Void {
            let slot = self.new_temp();
            self.emit(Instr::Alloc {
                ty: ret_ty.clone(),
                target: slot.clone(),
            });
            self.return_slot = Some(slot);
        }

        self.gen_compound(&mut func.body);

        // Fall through into the exit block.
        self.emit_jump(exit);

        self.cfg_mut().seal();
        self.current = Some(exit);
        self.emit(Instr::Label("exit".to_string()));
        match self.return_slot.clone() {
            Some(slot) => self.emit(Instr::Return {
                ty: ret_ty,
                value: Some(slot),
            }),
            None => self.emit(Instr::Return {
                ty: IrType::scalar(IrBase::Void),
                value: None,
            }),
        }

        let cfg = self.cfg.take().expect("function CFG under construction");
        self.functions.push(cfg);
        self.current = None;
    }

    // -- declarations -------------------------------------------------------

    fn gen_decl(&mut self, decl: &mut Decl) {
        let name = decl.name.name.clone();
        let ty = decl.ty.clone().expect("declaration typed by analysis");
        let ir_ty = IrType::of(&ty);
        let slot = format!("%{}", name);
        let dims: Vec<u32> = ty.dims().into_iter().flatten().collect();

        match &mut decl.init {
            None => {
                self.emit(Instr::Alloc {
                    ty: ir_ty,
                    target: slot,
                });
                if !dims.is_empty() {
                    self.var_dims.insert(name, dims);
                }
            }
            Some(Init::Expr(expr))
                if matches!(expr.kind, ExprKind::Const(Constant::Str(_))) =>
            {
                // char s[N] = "..." -- the literal is hoisted, the array
                // slot gets a copy of it.
                self.gen_expr_in_place(expr);
                let src = expr
                    .gen_location
                    .clone()
                    .expect("string literal was lowered");
                self.emit(Instr::Alloc {
                    ty: ir_ty.clone(),
                    target: slot.clone(),
                });
                self.emit(Instr::Store {
                    ty: ir_ty,
                    src,
                    target: slot,
                });
                self.var_dims.insert(name, dims);
            }
            Some(Init::Expr(expr)) => {
                self.gen_expr_in_place(expr);
                let src = expr.gen_location.clone().expect("initializer was lowered");
                self.emit(Instr::Alloc {
                    ty: ir_ty.clone(),
                    target: slot.clone(),
                });
                self.emit(Instr::Store {
                    ty: ir_ty,
                    src,
                    target: slot,
                });
            }
            Some(Init::List(list)) => {
                // Aggregate initializers live in the global section under
                // a hoisted name; the local slot is filled from there.
                let folded = fold_init_list(list);
                self.emit(Instr::Alloc {
                    ty: ir_ty.clone(),
                    target: slot.clone(),
                });
                let hoisted = self.new_text_name(&name);
                self.text.push(Instr::Global {
                    ty: ir_ty.clone(),
                    name: hoisted.clone(),
                    init: Some(folded),
                });
                self.emit(Instr::Store {
                    ty: ir_ty,
                    src: hoisted,
                    target: slot,
                });
                self.var_dims.insert(name, dims);
            }
        }
    }

    // -- statements ---------------------------------------------------------

    fn gen_compound(&mut self, compound: &mut Compound) {
        for decl in &mut compound.decls {
            self.gen_decl(decl);
        }
        for stmt in &mut compound.stmts {
            if self.terminated() {
                // Unreachable code after return/break; nothing to lower.
                break;
            }
            self.gen_stmt(stmt);
        }
    }

    fn gen_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Expr(expr) => self.gen_expr_in_place(expr),
            Stmt::Compound(compound) => self.gen_compound(compound),
            Stmt::If {
                cond,
                then_stat,
                else_stat,
                ..
            } => self.gen_if(cond, then_stat, else_stat.as_deref_mut()),
            Stmt::While { cond, body, .. } => self.gen_while(cond, body),
            Stmt::For {
                init,
                cond,
                step,
                body,
                ..
            } => self.gen_for(init, cond.as_mut(), step.as_mut(), body),
            Stmt::Break { .. } => {
                let target = *self
                    .loop_stack
                    .last()
                    .expect("break outside a loop survived analysis");
                self.emit_jump(target);
            }
            Stmt::Return { expr, .. } => {
                if let Some(expr) = expr {
                    self.gen_expr_in_place(expr);
                    let ty = IrType::of(expr.ty.as_ref().expect("typed return expression"));
                    let src = expr
                        .gen_location
                        .clone()
                        .expect("return expression was lowered");
                    let slot = self
                        .return_slot
                        .clone()
                        .expect("non-void function has a return slot");
                    self.emit(Instr::Store {
                        ty,
                        src,
                        target: slot,
                    });
                }
                let exit = self.cfg().exit();
                self.emit_jump(exit);
            }
            Stmt::Assert { expr, .. } => self.gen_assert(expr),
            Stmt::Print { args, .. } => self.gen_print(args),
            Stmt::Read { targets, .. } => self.gen_read(targets),
            Stmt::Empty { .. } => {}
        }
    }

    fn gen_if(&mut self, cond: &mut Expr, then_stat: &mut Stmt, else_stat: Option<&mut Stmt>) {
        let if_label = self.new_label("if");
        let then_label = self.new_label("then");
        let else_label = else_stat.as_ref().map(|_| self.new_label("else"));
        let end_label = self.new_label("if.end");

        let if_id = self.cfg_mut().add_block(if_label, BlockKind::Condition);
        let then_id = self.cfg_mut().add_block(then_label, BlockKind::Basic);
        let else_id =
            else_label.map(|label| self.cfg_mut().add_block(label, BlockKind::Basic));
        let end_id = self.cfg_mut().add_block(end_label, BlockKind::Basic);

        self.emit_jump(if_id);
        self.enter(if_id);
        self.gen_expr_in_place(cond);
        let cond_loc = cond.gen_location.clone().expect("condition was lowered");
        self.emit_cbranch(cond_loc, then_id, else_id.unwrap_or(end_id));

        self.enter(then_id);
        self.gen_stmt(then_stat);
        self.emit_jump(end_id);

        if let (Some(else_id), Some(else_stat)) = (else_id, else_stat) {
            self.enter(else_id);
            self.gen_stmt(else_stat);
            self.emit_jump(end_id);
        }

        self.enter(end_id);
    }

    fn gen_while(&mut self, cond: &mut Expr, body: &mut Stmt) {
        let cond_label = self.new_label("while.cond");
        let stat_label = self.new_label("while.stat");
        let end_label = self.new_label("while.end");

        let cond_id = self.cfg_mut().add_block(cond_label, BlockKind::Condition);
        let stat_id = self.cfg_mut().add_block(stat_label, BlockKind::Basic);
        let end_id = self.cfg_mut().add_block(end_label, BlockKind::Basic);

        self.emit_jump(cond_id);
        self.enter(cond_id);
        self.gen_expr_in_place(cond);
        let cond_loc = cond.gen_location.clone().expect("condition was lowered");
        self.emit_cbranch(cond_loc, stat_id, end_id);

        self.enter(stat_id);
        self.loop_stack.push(end_id);
        self.gen_stmt(body);
        self.loop_stack.pop();
        self.emit_jump(cond_id); // back edge

        self.enter(end_id);
    }

    fn gen_for(
        &mut self,
        init: &mut ForInit,
        cond: Option<&mut Expr>,
        step: Option<&mut Expr>,
        body: &mut Stmt,
    ) {
        let cond_label = self.new_label("for.cond");
        let stat_label = self.new_label("for.stat");
        let inc_label = self.new_label("for.inc");
        let end_label = self.new_label("for.end");

        let cond_id = self.cfg_mut().add_block(cond_label, BlockKind::Condition);
        let stat_id = self.cfg_mut().add_block(stat_label, BlockKind::Basic);
        let inc_id = self.cfg_mut().add_block(inc_label, BlockKind::Basic);
        let end_id = self.cfg_mut().add_block(end_label, BlockKind::Basic);

        match init {
            ForInit::Decls(decls) => {
                for decl in decls {
                    self.gen_decl(decl);
                }
            }
            ForInit::Expr(expr) => self.gen_expr_in_place(expr),
            ForInit::None => {}
        }
        self.emit_jump(cond_id);

        self.enter(cond_id);
        let cond_loc = match cond {
            Some(cond) => {
                self.gen_expr_in_place(cond);
                cond.gen_location.clone().expect("condition was lowered")
            }
            None => {
                // An absent condition never fails.
                let temp = self.new_temp();
                self.emit(Instr::Literal {
                    ty: IrType::scalar(IrBase::Int),
                    value: LitValue::Int(1),
                    target: temp.clone(),
                });
                temp
            }
        };
        self.emit_cbranch(cond_loc, stat_id, end_id);

        self.enter(stat_id);
        self.loop_stack.push(end_id);
        self.gen_stmt(body);
        self.loop_stack.pop();
        self.emit_jump(inc_id);

        self.enter(inc_id);
        if let Some(step) = step {
            self.gen_expr_in_place(step);
        }
        self.emit_jump(cond_id); // back edge

        self.enter(end_id);
    }

    fn gen_assert(&mut self, expr: &mut Expr) {
        let cond_label = self.new_label("assert");
        let fail_label = self.new_label("assert.fail");
        let end_label = self.new_label("assert.end");

        let cond_id = self.cfg_mut().add_block(cond_label, BlockKind::Condition);
        let fail_id = self.cfg_mut().add_block(fail_label, BlockKind::Basic);
        let end_id = self.cfg_mut().add_block(end_label, BlockKind::Basic);

        self.emit_jump(cond_id);
        self.enter(cond_id);
        self.gen_expr_in_place(expr);
        let cond_loc = expr.gen_location.clone().expect("condition was lowered");
        self.emit_cbranch(cond_loc, end_id, fail_id);

        let message = self.new_text_name("str");
        self.text.push(Instr::Global {
            ty: IrType::scalar(IrBase::String),
            name: message.clone(),
            init: Some(GlobalInit::Value(LitValue::Str(format!(
                "assertion_fail on {}:{}",
                expr.coord.line, expr.coord.column
            )))),
        });

        self.enter(fail_id);
        self.emit(Instr::Print {
            ty: IrType::scalar(IrBase::String),
            src: message,
        });
        let exit = self.cfg().exit();
        self.emit_jump(exit);

        self.enter(end_id);
    }

    fn gen_print(&mut self, args: &mut [Expr]) {
        if args.is_empty() {
            let temp = self.new_temp();
            self.emit(Instr::Literal {
                ty: IrType::scalar(IrBase::Char),
                value: LitValue::Char('\n'),
                target: temp.clone(),
            });
            self.emit(Instr::Print {
                ty: IrType::scalar(IrBase::Char),
                src: temp,
            });
            return;
        }
        for arg in args {
            self.gen_expr_in_place(arg);
            let base = IrType::of(arg.ty.as_ref().expect("typed print argument")).base;
            let src = arg.gen_location.clone().expect("argument was lowered");
            self.emit(Instr::Print {
                ty: IrType::scalar(base),
                src,
            });
        }
    }

    fn gen_read(&mut self, targets: &mut [Expr]) {
        for target in targets {
            let ty = IrType::scalar(
                IrType::of(target.ty.as_ref().expect("typed read target")).base,
            );
            match &target.kind {
                ExprKind::Id(id) => {
                    let slot = self.origin(&id.name);
                    let temp = self.new_temp();
                    self.emit(Instr::Read {
                        ty: ty.clone(),
                        target: temp.clone(),
                    });
                    self.emit(Instr::Store {
                        ty,
                        src: temp,
                        target: slot,
                    });
                }
                ExprKind::ArrayRef { .. } => {
                    self.gen_expr_in_place(target);
                    let slot = target
                        .mem_location
                        .clone()
                        .expect("array reference has an address");
                    let temp = self.new_temp();
                    self.emit(Instr::Read {
                        ty: ty.clone(),
                        target: temp.clone(),
                    });
                    self.emit(Instr::Store {
                        ty: IrType::pointer(ty.base),
                        src: temp,
                        target: slot,
                    });
                }
                _ => unreachable!("read targets are identifiers or array refs"),
            }
        }
    }

    // -- expressions --------------------------------------------------------

    /// Lowers `expr`, setting its `gen_location` (and `mem_location` for
    /// array references).
    fn gen_expr_in_place(&mut self, expr: &mut Expr) {
        match &mut expr.kind {
            ExprKind::Const(constant) => {
                let location = match constant {
                    Constant::Str(text) => {
                        let name = self.new_text_name("str");
                        self.text.push(Instr::Global {
                            ty: IrType::scalar(IrBase::String),
                            name: name.clone(),
                            init: Some(GlobalInit::Value(LitValue::Str(text.clone()))),
                        });
                        name
                    }
                    other => {
                        let (ty, value) = match other {
                            Constant::Int(v) => (IrBase::Int, LitValue::Int(*v)),
                            Constant::Float(v) => (IrBase::Float, LitValue::Float(*v)),
                            Constant::Char(c) => (IrBase::Char, LitValue::Char(*c)),
                            Constant::Str(_) => unreachable!("handled above"),
                        };
                        let temp = self.new_temp();
                        self.emit(Instr::Literal {
                            ty: IrType::scalar(ty),
                            value,
                            target: temp.clone(),
                        });
                        temp
                    }
                };
                expr.gen_location = Some(location);
            }
            ExprKind::Id(id) => {
                let source = self.origin(&id.name);
                let ty = IrType::of(expr.ty.as_ref().expect("typed identifier"));
                let temp = self.new_temp();
                self.emit(Instr::Load {
                    ty,
                    src: source,
                    target: temp.clone(),
                });
                expr.gen_location = Some(temp);
            }
            ExprKind::Binary { op, left, right } => {
                let op = *op;
                self.gen_expr_in_place(left);
                self.gen_expr_in_place(right);
                let ty = IrType::of(left.ty.as_ref().expect("typed operand"));
                let target = self.new_temp();
                self.emit(Instr::Binary {
                    op: BinAlu::from(op),
                    ty,
                    left: left.gen_location.clone().expect("operand was lowered"),
                    right: right.gen_location.clone().expect("operand was lowered"),
                    target: target.clone(),
                });
                expr.gen_location = Some(target);
            }
            ExprKind::Unary { .. } => self.gen_unary(expr),
            ExprKind::Assign { .. } => self.gen_assign(expr),
            ExprKind::ArrayRef { .. } => self.gen_array_ref(expr),
            ExprKind::Call { callee, args } => {
                let callee_name = format!("@{}", callee.name);
                for arg in args.iter_mut() {
                    self.gen_expr_in_place(arg);
                    let base = IrType::of(arg.ty.as_ref().expect("typed argument")).base;
                    let src = arg.gen_location.clone().expect("argument was lowered");
                    self.emit(Instr::Param {
                        ty: IrType::scalar(base),
                        src,
                    });
                }
                let ty = IrType::of(expr.ty.as_ref().expect("typed call"));
                let result = self.new_temp();
                self.emit(Instr::Call {
                    ty,
                    callee: callee_name,
                    target: result.clone(),
                });
                expr.gen_location = Some(result);
            }
            ExprKind::Cast { to, operand } => {
                let to_int = to.name == TypeName::Int;
                self.gen_expr_in_place(operand);
                let src = operand.gen_location.clone().expect("operand was lowered");
                let target = self.new_temp();
                if to_int {
                    self.emit(Instr::FpToSi {
                        src,
                        target: target.clone(),
                    });
                } else {
                    self.emit(Instr::SiToFp {
                        src,
                        target: target.clone(),
                    });
                }
                expr.gen_location = Some(target);
            }
            ExprKind::List(items) => {
                let mut last = None;
                for item in items.iter_mut() {
                    self.gen_expr_in_place(item);
                    last = item.gen_location.clone();
                }
                expr.gen_location = last;
            }
        }
    }

    fn gen_unary(&mut self, expr: &mut Expr) {
        let ExprKind::Unary { op, operand } = &mut expr.kind else {
            unreachable!("gen_unary on a non-unary node");
        };
        let op = *op;
        self.gen_expr_in_place(operand);
        let operand_ty = operand.ty.clone().expect("typed operand");
        let current = operand.gen_location.clone().expect("operand was lowered");

        if op.is_step() {
            let one = self.new_temp();
            self.emit(Instr::Literal {
                ty: IrType::scalar(IrBase::Int),
                value: LitValue::Int(1),
                target: one.clone(),
            });
            let alu = match op {
                UnOp::PreInc | UnOp::PostInc => BinAlu::Add,
                _ => BinAlu::Sub,
            };

            match &operand.kind {
                ExprKind::Id(id) => {
                    let slot = self.origin(&id.name);
                    if op.is_postfix() {
                        // Keep the old value in a fresh slot before stepping.
                        let old = self.new_temp();
                        self.emit(Instr::Alloc {
                            ty: IrType::scalar(IrBase::Int),
                            target: old.clone(),
                        });
                        self.emit(Instr::Store {
                            ty: IrType::scalar(IrBase::Int),
                            src: current.clone(),
                            target: old.clone(),
                        });
                        self.emit(Instr::Binary {
                            op: alu,
                            ty: IrType::scalar(IrBase::Int),
                            left: current,
                            right: one,
                            target: slot,
                        });
                        expr.gen_location = Some(old);
                    } else {
                        self.emit(Instr::Binary {
                            op: alu,
                            ty: IrType::scalar(IrBase::Int),
                            left: current,
                            right: one,
                            target: slot.clone(),
                        });
                        expr.gen_location = Some(slot);
                    }
                }
                ExprKind::ArrayRef { .. } => {
                    let address = operand
                        .mem_location
                        .clone()
                        .expect("array reference has an address");
                    let stepped = self.new_temp();
                    self.emit(Instr::Binary {
                        op: alu,
                        ty: IrType::scalar(IrBase::Int),
                        left: current.clone(),
                        right: one,
                        target: stepped.clone(),
                    });
                    self.emit(Instr::Store {
                        ty: IrType::pointer(IrBase::Int),
                        src: stepped.clone(),
                        target: address,
                    });
                    expr.gen_location = Some(if op.is_postfix() { current } else { stepped });
                }
                _ => unreachable!("step operand is a location"),
            }
            return;
        }

        let base = IrType::of(&operand_ty).base;
        let result = self.new_temp();
        match op {
            UnOp::Not => {
                self.emit(Instr::Not {
                    ty: IrType::scalar(base),
                    src: current,
                    target: result.clone(),
                });
            }
            UnOp::Neg | UnOp::Plus => {
                // 0 - x / 0 + x through an explicit zero literal.
                let zero = self.new_temp();
                let value = match base {
                    IrBase::Float => LitValue::Float(0.0),
                    _ => LitValue::Int(0),
                };
                self.emit(Instr::Literal {
                    ty: IrType::scalar(base),
                    value,
                    target: zero.clone(),
                });
                let alu = if op == UnOp::Neg {
                    BinAlu::Sub
                } else {
                    BinAlu::Add
                };
                self.emit(Instr::Binary {
                    op: alu,
                    ty: IrType::scalar(base),
                    left: zero,
                    right: current,
                    target: result.clone(),
                });
            }
            _ => unreachable!("step operators handled above"),
        }
        expr.gen_location = Some(result);
    }

    fn gen_assign(&mut self, expr: &mut Expr) {
        let ExprKind::Assign { op, lvalue, rvalue } = &mut expr.kind else {
            unreachable!("gen_assign on a non-assignment node");
        };
        let op = *op;
        self.gen_expr_in_place(rvalue);
        let rty = IrType::of(rvalue.ty.as_ref().expect("typed rvalue"));
        let rloc = rvalue.gen_location.clone().expect("rvalue was lowered");

        match &lvalue.kind {
            ExprKind::Id(id) => {
                let slot = self.origin(&id.name);
                match op.binary() {
                    None => {
                        self.emit(Instr::Store {
                            ty: rty,
                            src: rloc,
                            target: slot,
                        });
                    }
                    Some(binop) => {
                        // Load the current value, apply, store back.
                        self.gen_expr_in_place(lvalue);
                        let cur = lvalue.gen_location.clone().expect("lvalue was lowered");
                        let temp = self.new_temp();
                        self.emit(Instr::Binary {
                            op: BinAlu::from(binop),
                            ty: rty.clone(),
                            left: cur,
                            right: rloc,
                            target: temp.clone(),
                        });
                        self.emit(Instr::Store {
                            ty: rty,
                            src: temp,
                            target: slot,
                        });
                    }
                }
            }
            ExprKind::ArrayRef { .. } => {
                self.gen_expr_in_place(lvalue);
                let address = lvalue
                    .mem_location
                    .clone()
                    .expect("array reference has an address");
                let ptr_ty = IrType::pointer(rty.base);
                match op.binary() {
                    None => {
                        self.emit(Instr::Store {
                            ty: ptr_ty,
                            src: rloc,
                            target: address,
                        });
                    }
                    Some(binop) => {
                        let cur = lvalue.gen_location.clone().expect("lvalue was lowered");
                        let temp = self.new_temp();
                        self.emit(Instr::Binary {
                            op: BinAlu::from(binop),
                            ty: rty,
                            left: cur,
                            right: rloc,
                            target: temp.clone(),
                        });
                        self.emit(Instr::Store {
                            ty: ptr_ty,
                            src: temp,
                            target: address,
                        });
                    }
                }
            }
            _ => unreachable!("assignment targets are identifiers or array refs"),
        }
    }

    fn gen_array_ref(&mut self, expr: &mut Expr) {
        let base_name = array_base_name(expr);
        let origin = self.origin(&base_name);
        let elem_base = IrType::of(expr.ty.as_ref().expect("typed array reference")).base;

        let ExprKind::ArrayRef { array, index } = &mut expr.kind else {
            unreachable!("gen_array_ref on a non-array node");
        };

        let (location, value) = if matches!(array.kind, ExprKind::Id(_)) {
            // Single dimension: the index is the element offset.
            self.gen_expr_in_place(index);
            let idx = index.gen_location.clone().expect("index was lowered");
            let location = self.new_temp();
            self.emit(Instr::Elem {
                ty: IrType::scalar(IrBase::Int),
                base: origin,
                index: idx,
                target: location.clone(),
            });
            let value = self.new_temp();
            self.emit(Instr::Load {
                ty: IrType::pointer(elem_base),
                src: location.clone(),
                target: value.clone(),
            });
            (location, value)
        } else {
            // Multi-dimensional: linearise as sum of index * stride,
            // innermost index first, accumulating the stride product.
            let dims = self
                .var_dims
                .get(&base_name)
                .cloned()
                .expect("array dimensions recorded at declaration");

            let offset = self.new_temp();
            self.emit(Instr::Literal {
                ty: IrType::scalar(IrBase::Int),
                value: LitValue::Int(0),
                target: offset.clone(),
            });
            let product = self.new_temp();
            self.emit(Instr::Literal {
                ty: IrType::scalar(IrBase::Int),
                value: LitValue::Int(1),
                target: product.clone(),
            });

            // Re-borrow the whole chain from this node downward.
            self.gen_offset_chain(index, array, &dims, dims.len() - 1, &offset, &product);

            let location = self.new_temp();
            self.emit(Instr::Elem {
                ty: IrType::scalar(elem_base),
                base: origin,
                index: offset,
                target: location.clone(),
            });
            let value = self.new_temp();
            self.emit(Instr::Load {
                ty: IrType::pointer(elem_base),
                src: location.clone(),
                target: value.clone(),
            });
            (location, value)
        };

        expr.mem_location = Some(location);
        expr.gen_location = Some(value);
    }

    /// One level of the offset computation, then recursion outward.
    fn gen_offset_chain(
        &mut self,
        index: &mut Expr,
        array: &mut Expr,
        dims: &[u32],
        level: usize,
        offset: &str,
        product: &str,
    ) {
        self.gen_expr_in_place(index);
        let pos = index.gen_location.clone().expect("index was lowered");
        let term = self.new_temp();
        self.emit(Instr::Binary {
            op: BinAlu::Mul,
            ty: IrType::scalar(IrBase::Int),
            left: pos,
            right: product.to_string(),
            target: term.clone(),
        });
        self.emit(Instr::Binary {
            op: BinAlu::Add,
            ty: IrType::scalar(IrBase::Int),
            left: offset.to_string(),
            right: term,
            target: offset.to_string(),
        });
        let dim_temp = self.new_temp();
        self.emit(Instr::Literal {
            ty: IrType::scalar(IrBase::Int),
            value: LitValue::Int(dims[level] as i64),
            target: dim_temp.clone(),
        });
        self.emit(Instr::Binary {
            op: BinAlu::Mul,
            ty: IrType::scalar(IrBase::Int),
            left: dim_temp,
            right: product.to_string(),
            target: product.to_string(),
        });

        match &mut array.kind {
            ExprKind::ArrayRef {
                array: inner_array,
                index: inner_index,
            } => {
                self.gen_offset_chain(inner_index, inner_array, dims, level - 1, offset, product);
            }
            ExprKind::Id(_) => {}
            _ => unreachable!("array reference chains end at an identifier"),
        }
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        CodeGenerator::new()
    }
}

/// The innermost identifier of an array reference chain.
fn array_base_name(expr: &Expr) -> String {
    let mut cursor = expr;
    loop {
        match &cursor.kind {
            ExprKind::ArrayRef { array, .. } => cursor = array,
            ExprKind::Id(id) => return id.name.clone(),
            _ => unreachable!("array reference chains end at an identifier"),
        }
    }
}

fn fold_constant(constant: &Constant) -> LitValue {
    match constant {
        Constant::Int(v) => LitValue::Int(*v),
        Constant::Float(v) => LitValue::Float(*v),
        Constant::Char(c) => LitValue::Char(*c),
        Constant::Str(s) => LitValue::Str(s.clone()),
    }
}

fn fold_init_list(list: &InitList) -> GlobalInit {
    GlobalInit::List(
        list.items
            .iter()
            .map(|item| match item {
                Init::Expr(expr) => match &expr.kind {
                    ExprKind::Const(constant) => GlobalInit::Value(fold_constant(constant)),
                    _ => unreachable!("initializer elements are constants"),
                },
                Init::List(inner) => fold_init_list(inner),
            })
            .collect(),
    )
}
