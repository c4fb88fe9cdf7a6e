//! Bytecode compiler (§4.3): walks the desugared core AST, driven by the
//! scope analysis in `crate::scope`, and emits `Assembly` fragments that
//! `finish` packs into a `CodeObject`.

use ahash::AHashMap;

use crate::ast::{BinOpKind, BoolOpKind, Expr, ExprContext, FunctionLit, Params, Stmt, UnaryOpKind};
use crate::bytecode::asm::{Assembly, LabelId};
use crate::bytecode::code::{
    pack_lnotab, CodeObject, CO_HAS_FREEVARS, CO_LOCALS, CO_SELF_CONTAINED, CO_VARARGS, CO_VARKEYWORDS,
};
use crate::bytecode::opcode::Opcode;
use crate::intern::{ConstKey, InternTables};
use crate::runtime::value::Const;
use crate::scope::{analyze_module, Access, Scope};

/// Compiles a desugared module body into its top-level code object. `body`
/// must be the exact tree `analyze_module` (transitively, via this call)
/// walks, since nested scopes are located by AST node pointer identity.
#[must_use]
pub fn compile_module(body: &[Stmt], filename: &str) -> CodeObject {
    let scope = analyze_module(body);
    let mut gen = CodeGen::new(&scope, filename, "<module>", first_line(body).unwrap_or(1));
    for stmt in body {
        gen.compile_stmt(stmt);
    }
    gen.emit_implicit_return();
    gen.finish(0, 0, 0)
}

fn first_line(body: &[Stmt]) -> Option<u32> {
    body.iter().find_map(Stmt::line)
}

fn find_child<'a>(scope: &'a Scope, key: usize) -> &'a Scope {
    scope
        .children
        .iter()
        .find(|(k, _)| *k == Some(key))
        .map(|(_, child)| child)
        .expect("scope tree and AST walk diverged: missing child scope")
}

struct CodeGen<'a> {
    scope: &'a Scope,
    deref_order: Vec<String>,
    interns: InternTables,
    nested_codes: Vec<CodeObject>,
    asm: Assembly,
    next_label: LabelId,
    filename: String,
    name: String,
}

impl<'a> CodeGen<'a> {
    fn new(scope: &'a Scope, filename: &str, name: &str, firstlineno: u32) -> Self {
        let mut gen = Self {
            scope,
            deref_order: scope.derefvars(),
            interns: InternTables::new(),
            nested_codes: Vec::new(),
            asm: Assembly::no_op(),
            next_label: 0,
            filename: filename.to_owned(),
            name: name.to_owned(),
        };
        // The line table's first annotation is always byte 0 / firstlineno,
        // even when the first statement carries no line of its own.
        gen.emit(Assembly::line(firstlineno));
        gen
    }

    fn register_params(&mut self, params: &Params) -> u16 {
        for name in &params.positional {
            self.interns.register_varname(name);
        }
        if let Some(name) = &params.vararg {
            self.interns.register_varname(name);
        }
        if let Some(name) = &params.kwarg {
            self.interns.register_varname(name);
        }
        u16::try_from(params.positional.len()).expect("argcount exceeds u16")
    }

    fn fresh_label(&mut self) -> LabelId {
        let id = self.next_label;
        self.next_label += 1;
        id
    }

    fn emit(&mut self, frag: Assembly) {
        self.asm = std::mem::take(&mut self.asm).then(frag);
    }

    fn emit_line(&mut self, line: Option<u32>) {
        if let Some(line) = line {
            self.emit(Assembly::line(line));
        }
    }

    fn emit_implicit_return(&mut self) {
        let idx = self.interns.constants.intern(ConstKey::None);
        self.emit(Assembly::instr_arg(Opcode::LoadConst, idx.into()));
        self.emit(Assembly::instr(Opcode::ReturnValue));
    }

    fn deref_index(&self, name: &str) -> i64 {
        self.deref_order
            .iter()
            .position(|n| n == name)
            .unwrap_or_else(|| panic!("'{name}' is not a cellvar/freevar of this scope")) as i64
    }

    fn compile_name_load(&mut self, name: &str) {
        match self.scope.access(name) {
            Access::Fast => {
                let idx = self.interns.register_varname(name);
                self.emit(Assembly::instr_arg(Opcode::LoadFast, idx.into()));
            }
            Access::Deref => {
                let idx = self.deref_index(name);
                self.emit(Assembly::instr_arg(Opcode::LoadDeref, idx));
            }
            Access::Name => {
                let idx = self.interns.names.intern(name.to_owned());
                self.emit(Assembly::instr_arg(Opcode::LoadName, idx.into()));
            }
        }
    }

    fn compile_name_store(&mut self, name: &str) {
        match self.scope.access(name) {
            Access::Fast => {
                let idx = self.interns.register_varname(name);
                self.emit(Assembly::instr_arg(Opcode::StoreFast, idx.into()));
            }
            Access::Deref => {
                let idx = self.deref_index(name);
                self.emit(Assembly::instr_arg(Opcode::StoreDeref, idx));
            }
            Access::Name => {
                let idx = self.interns.names.intern(name.to_owned());
                self.emit(Assembly::instr_arg(Opcode::StoreName, idx.into()));
            }
        }
    }

    fn compile_store(&mut self, target: &Expr) {
        match target {
            Expr::Name(name, ExprContext::Store) => self.compile_name_store(name),
            Expr::Attribute(val, attr, ExprContext::Store) => {
                self.compile_expr(val);
                let idx = self.interns.names.intern(attr.clone());
                self.emit(Assembly::instr_arg(Opcode::StoreAttr, idx.into()));
            }
            Expr::Subscript(val, key, ExprContext::Store) => {
                self.compile_expr(val);
                self.compile_expr(key);
                self.emit(Assembly::instr(Opcode::StoreSubscr));
            }
            Expr::Tuple(elts, ExprContext::Store) | Expr::List(elts, ExprContext::Store) => {
                self.emit(Assembly::instr_arg(Opcode::UnpackSequence, elts.len() as i64));
                for elt in elts {
                    self.compile_store(elt);
                }
            }
            other => unreachable!("not an assignable target: {other:?}"),
        }
    }

    fn compile_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Module(body) => body.iter().for_each(|s| self.compile_stmt(s)),
            Stmt::ClassDef { name, bases, body, line } => {
                self.compile_class_def(name, bases, body, stmt, *line);
            }
            Stmt::Assign(targets, value, line) => {
                self.emit_line(*line);
                self.compile_expr(value);
                for target in &targets[..targets.len().saturating_sub(1)] {
                    self.emit(Assembly::instr(Opcode::DupTop));
                    self.compile_store(target);
                }
                if let Some(last) = targets.last() {
                    self.compile_store(last);
                }
            }
            Stmt::Expr(e, line) => {
                self.emit_line(*line);
                self.compile_expr(e);
                self.emit(Assembly::instr(Opcode::PopTop));
            }
            Stmt::If { test, then, orelse, line } => {
                self.emit_line(*line);
                self.compile_expr(test);
                let else_label = self.fresh_label();
                self.emit(Assembly::instr_arg(Opcode::PopJumpIfFalse, else_label.into()));
                then.iter().for_each(|s| self.compile_stmt(s));
                if orelse.is_empty() {
                    self.emit(Assembly::label(else_label));
                } else {
                    let end_label = self.fresh_label();
                    self.emit(Assembly::instr_arg(Opcode::JumpForward, end_label.into()));
                    self.emit(Assembly::label(else_label));
                    orelse.iter().for_each(|s| self.compile_stmt(s));
                    self.emit(Assembly::label(end_label));
                }
            }
            Stmt::While { test, body, line } => {
                let top_label = self.fresh_label();
                let end_label = self.fresh_label();
                self.emit(Assembly::label(top_label));
                self.emit_line(*line);
                self.compile_expr(test);
                self.emit(Assembly::instr_arg(Opcode::PopJumpIfFalse, end_label.into()));
                body.iter().for_each(|s| self.compile_stmt(s));
                self.emit(Assembly::instr_arg(Opcode::JumpAbsolute, top_label.into()));
                self.emit(Assembly::label(end_label));
            }
            Stmt::For { target, iter, body, line } => {
                self.emit_line(*line);
                self.compile_expr(iter);
                self.emit(Assembly::instr(Opcode::GetIter));
                let top_label = self.fresh_label();
                let end_label = self.fresh_label();
                self.emit(Assembly::label(top_label));
                self.emit(Assembly::instr_arg(Opcode::ForIter, end_label.into()));
                self.compile_store(target);
                body.iter().for_each(|s| self.compile_stmt(s));
                self.emit(Assembly::instr_arg(Opcode::JumpAbsolute, top_label.into()));
                self.emit(Assembly::label(end_label));
            }
            Stmt::Return(value, line) => {
                self.emit_line(*line);
                match value {
                    Some(e) => self.compile_expr(e),
                    None => {
                        let idx = self.interns.constants.intern(ConstKey::None);
                        self.emit(Assembly::instr_arg(Opcode::LoadConst, idx.into()));
                    }
                }
                self.emit(Assembly::instr(Opcode::ReturnValue));
            }
            Stmt::Raise(exc, line) => {
                self.emit_line(*line);
                self.compile_expr(exc);
                self.emit(Assembly::instr_arg(Opcode::RaiseVarargs, 1));
            }
            Stmt::Import(aliases, line) => {
                self.emit_line(*line);
                for alias in aliases {
                    let level_idx = self.interns.constants.intern(ConstKey::Int(0));
                    self.emit(Assembly::instr_arg(Opcode::LoadConst, level_idx.into()));
                    let fromlist_idx = self.interns.constants.intern(ConstKey::None);
                    self.emit(Assembly::instr_arg(Opcode::LoadConst, fromlist_idx.into()));
                    let module_idx = self.interns.names.intern(alias.name.clone());
                    self.emit(Assembly::instr_arg(Opcode::ImportName, module_idx.into()));
                    let binding = alias
                        .asname
                        .clone()
                        .unwrap_or_else(|| alias.name.split('.').next().unwrap_or(&alias.name).to_owned());
                    self.compile_name_store(&binding);
                }
            }
            Stmt::ImportFrom { level, module, names, line } => {
                self.emit_line(*line);
                let level_idx = self.interns.constants.intern(ConstKey::Int(i64::from(*level)));
                self.emit(Assembly::instr_arg(Opcode::LoadConst, level_idx.into()));
                let fromlist_idx = self.interns.constants.intern(ConstKey::None);
                self.emit(Assembly::instr_arg(Opcode::LoadConst, fromlist_idx.into()));
                let module_idx = self.interns.names.intern(module.clone());
                self.emit(Assembly::instr_arg(Opcode::ImportName, module_idx.into()));
                for alias in names {
                    let name_idx = self.interns.names.intern(alias.name.clone());
                    self.emit(Assembly::instr_arg(Opcode::ImportFrom, name_idx.into()));
                    let binding = alias.asname.clone().unwrap_or_else(|| alias.name.clone());
                    self.compile_name_store(&binding);
                }
                self.emit(Assembly::instr(Opcode::PopTop));
            }
            Stmt::Pass(line) => self.emit_line(*line),
            Stmt::FunctionDef { .. } | Stmt::Assert(..) => {
                unreachable!("codegen runs after desugaring")
            }
        }
    }

    fn compile_class_def(&mut self, name: &str, bases: &[Expr], body: &[Stmt], node: &Stmt, line: Option<u32>) {
        self.emit_line(line);
        let child_scope = find_child(self.scope, node as *const _ as usize);
        let body_line = first_line(body).unwrap_or(line.unwrap_or(0));
        let mut body_gen = CodeGen::new(child_scope, &self.filename, name, body_line);
        for stmt in body {
            body_gen.compile_stmt(stmt);
        }
        body_gen.emit_implicit_return();
        let code = body_gen.finish(0, 0, CO_SELF_CONTAINED);

        let code_idx = self.nested_codes.len();
        self.nested_codes.push(code);
        let code_key = self.interns.constants.intern(ConstKey::Code(code_idx));
        let name_const = self.interns.constants.intern(ConstKey::Str(name.to_owned()));

        self.emit(Assembly::instr(Opcode::LoadBuildClass));
        let closure = !child_scope.freevars.is_empty();
        if closure {
            self.push_closure_cells(&child_scope.freevars);
        }
        self.emit(Assembly::instr_arg(Opcode::LoadConst, code_key.into()));
        self.emit(Assembly::instr_arg(Opcode::LoadConst, name_const.into()));
        self.emit(Assembly::instr(if closure { Opcode::MakeClosure } else { Opcode::MakeFunction }));

        self.emit(Assembly::instr_arg(Opcode::LoadConst, name_const.into()));
        for base in bases {
            self.compile_expr(base);
        }
        let npos = 2 + bases.len() as i64;
        self.emit(Assembly::instr_arg(Opcode::CallFunction, npos));
        self.compile_name_store(name);
    }

    fn push_closure_cells(&mut self, freevars: &[String]) {
        for name in freevars {
            let idx = self.deref_index(name);
            self.emit(Assembly::instr_arg(Opcode::LoadClosure, idx));
        }
        self.emit(Assembly::instr_arg(Opcode::BuildTuple, freevars.len() as i64));
    }

    fn compile_function_literal(&mut self, lit: &FunctionLit) {
        let child_scope = find_child(self.scope, lit as *const FunctionLit as usize);
        let mut fn_gen = CodeGen::new(child_scope, &self.filename, &lit.name, lit.line.unwrap_or(0));
        let argcount = fn_gen.register_params(&lit.params);
        for stmt in &lit.body {
            fn_gen.compile_stmt(stmt);
        }
        fn_gen.emit_implicit_return();

        let mut flags = 0u16;
        if lit.params.vararg.is_some() {
            flags |= CO_VARARGS;
        }
        if lit.params.kwarg.is_some() {
            flags |= CO_VARKEYWORDS;
        }
        let code = fn_gen.finish(argcount, 0, flags);

        let code_idx = self.nested_codes.len();
        self.nested_codes.push(code);
        let code_key = self.interns.constants.intern(ConstKey::Code(code_idx));
        let name_key = self.interns.constants.intern(ConstKey::Str(lit.name.clone()));

        let closure = !child_scope.freevars.is_empty();
        if closure {
            self.push_closure_cells(&child_scope.freevars);
        }
        self.emit(Assembly::instr_arg(Opcode::LoadConst, code_key.into()));
        self.emit(Assembly::instr_arg(Opcode::LoadConst, name_key.into()));
        self.emit(Assembly::instr(if closure { Opcode::MakeClosure } else { Opcode::MakeFunction }));
    }

    fn compile_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Name(name, ExprContext::Load) => self.compile_name_load(name),
            Expr::Name(_, ExprContext::Store) => unreachable!("store-context name in load position"),
            Expr::NameConstant(nc) => {
                let idx = self.interns.constants.intern(ConstKey::from(nc));
                self.emit(Assembly::instr_arg(Opcode::LoadConst, idx.into()));
            }
            Expr::Num(n) => {
                let idx = self.interns.constants.intern(ConstKey::from(n));
                self.emit(Assembly::instr_arg(Opcode::LoadConst, idx.into()));
            }
            Expr::Str(s) => {
                let idx = self.interns.constants.intern(ConstKey::Str(s.clone()));
                self.emit(Assembly::instr_arg(Opcode::LoadConst, idx.into()));
            }
            Expr::Bytes(b) => {
                let idx = self.interns.constants.intern(ConstKey::Bytes(b.clone()));
                self.emit(Assembly::instr_arg(Opcode::LoadConst, idx.into()));
            }
            Expr::Call(func, args, kwargs) => {
                self.compile_expr(func);
                for a in args {
                    self.compile_expr(a);
                }
                for (k, v) in kwargs {
                    let idx = self.interns.constants.intern(ConstKey::Str(k.clone()));
                    self.emit(Assembly::instr_arg(Opcode::LoadConst, idx.into()));
                    self.compile_expr(v);
                }
                let packed = ((kwargs.len() as i64) << 8) | (args.len() as i64 & 0xFF);
                self.emit(Assembly::instr_arg(Opcode::CallFunction, packed));
            }
            Expr::Attribute(val, name, ExprContext::Load) => {
                self.compile_expr(val);
                let idx = self.interns.names.intern(name.clone());
                self.emit(Assembly::instr_arg(Opcode::LoadAttr, idx.into()));
            }
            Expr::Attribute(_, _, ExprContext::Store) => unreachable!("store-context attribute in load position"),
            Expr::Subscript(val, key, ExprContext::Load) => {
                self.compile_expr(val);
                self.compile_expr(key);
                self.emit(Assembly::instr(Opcode::BinarySubscr));
            }
            Expr::Subscript(_, _, ExprContext::Store) => unreachable!("store-context subscript in load position"),
            Expr::BinOp(l, op, r) => {
                self.compile_expr(l);
                self.compile_expr(r);
                self.emit(Assembly::instr(binop_opcode(*op)));
            }
            Expr::UnaryOp(op, e) => {
                self.compile_expr(e);
                self.emit(Assembly::instr(unaryop_opcode(*op)));
            }
            Expr::BoolOp(kind, values) => self.compile_bool_op(*kind, values),
            Expr::Compare(l, op, r) => {
                self.compile_expr(l);
                self.compile_expr(r);
                self.emit(Assembly::instr_arg(Opcode::CompareOp, *op as i64));
            }
            Expr::List(elts, ExprContext::Load) => {
                for e in elts {
                    self.compile_expr(e);
                }
                self.emit(Assembly::instr_arg(Opcode::BuildList, elts.len() as i64));
            }
            Expr::List(_, ExprContext::Store) => unreachable!("store-context list in load position"),
            Expr::Tuple(elts, ExprContext::Load) => {
                for e in elts {
                    self.compile_expr(e);
                }
                self.emit(Assembly::instr_arg(Opcode::BuildTuple, elts.len() as i64));
            }
            Expr::Tuple(_, ExprContext::Store) => unreachable!("store-context tuple in load position"),
            Expr::Dict(keys, values) => {
                self.emit(Assembly::instr_arg(Opcode::BuildMap, 0));
                for (k, v) in keys.iter().zip(values.iter()) {
                    self.compile_expr(v);
                    self.compile_expr(k);
                    self.emit(Assembly::instr(Opcode::StoreMap));
                }
            }
            Expr::IfExp(test, body, orelse) => {
                self.compile_expr(test);
                let else_label = self.fresh_label();
                let end_label = self.fresh_label();
                self.emit(Assembly::instr_arg(Opcode::PopJumpIfFalse, else_label.into()));
                self.compile_expr(body);
                self.emit(Assembly::instr_arg(Opcode::JumpForward, end_label.into()));
                self.emit(Assembly::label(else_label));
                self.compile_expr(orelse);
                self.emit(Assembly::label(end_label));
            }
            Expr::Function(lit) => self.compile_function_literal(lit),
            Expr::Lambda(..) | Expr::ListComp(..) => unreachable!("codegen runs after desugaring"),
        }
    }

    fn compile_bool_op(&mut self, kind: BoolOpKind, values: &[Expr]) {
        let end_label = self.fresh_label();
        let jump_op = match kind {
            BoolOpKind::And => Opcode::JumpIfFalseOrPop,
            BoolOpKind::Or => Opcode::JumpIfTrueOrPop,
        };
        for value in &values[..values.len().saturating_sub(1)] {
            self.compile_expr(value);
            self.emit(Assembly::instr_arg(jump_op, end_label.into()));
        }
        if let Some(last) = values.last() {
            self.compile_expr(last);
        }
        self.emit(Assembly::label(end_label));
    }

    fn finish(self, argcount: u16, kwonlyargcount: u16, base_flags: u16) -> CodeObject {
        let CodeGen {
            scope,
            interns,
            nested_codes,
            asm,
            filename,
            name,
            ..
        } = self;

        let mut annotations = Vec::new();
        asm.line_nos(0, &mut annotations);
        let (firstlineno, lnotab) = pack_lnotab(&annotations);

        let mut addresses = AHashMap::default();
        asm.resolve(0, &mut addresses);
        let mut bytecode = Vec::with_capacity(asm.length());
        asm.encode(0, &addresses, &mut bytecode);

        let mut depth = 0i32;
        let mut readings = Vec::new();
        asm.plumb(&mut depth, &mut readings);
        let stacksize = u16::try_from(readings.iter().copied().max().unwrap_or(0).max(0)).unwrap_or(u16::MAX);

        let varnames = interns.varnames.into_items();
        let names = interns.names.into_items();
        let consts = interns
            .constants
            .into_items()
            .into_iter()
            .map(|key| resolve_const(key, &nested_codes))
            .collect();

        let mut flags = base_flags;
        if !scope.freevars.is_empty() {
            flags |= CO_HAS_FREEVARS;
        }
        if !varnames.is_empty() {
            flags |= CO_LOCALS;
        }

        CodeObject {
            argcount,
            kwonlyargcount,
            nlocals: u16::try_from(varnames.len()).expect("nlocals exceeds u16"),
            stacksize,
            flags,
            bytecode,
            consts,
            names,
            varnames,
            filename,
            name,
            firstlineno,
            lnotab,
            freevars: scope.freevars.clone(),
            cellvars: scope.cellvars.clone(),
        }
    }
}

fn resolve_const(key: ConstKey, nested_codes: &[CodeObject]) -> Const {
    match key {
        ConstKey::None => Const::None,
        ConstKey::Bool(b) => Const::Bool(b),
        ConstKey::Int(i) => Const::Int(i),
        ConstKey::Float(bits) => Const::Float(f64::from_bits(bits)),
        ConstKey::Str(s) => Const::Str(s),
        ConstKey::Bytes(b) => Const::Bytes(b),
        ConstKey::Code(idx) => Const::Code(Box::new(nested_codes[idx].clone())),
    }
}

fn binop_opcode(op: BinOpKind) -> Opcode {
    match op {
        BinOpKind::Add => Opcode::BinaryAdd,
        BinOpKind::Sub => Opcode::BinarySubtract,
        BinOpKind::Mult => Opcode::BinaryMultiply,
        BinOpKind::Div => Opcode::BinaryTrueDivide,
        BinOpKind::FloorDiv => Opcode::BinaryFloorDivide,
        BinOpKind::Mod => Opcode::BinaryModulo,
        BinOpKind::Pow => Opcode::BinaryPower,
        BinOpKind::LShift => Opcode::BinaryLshift,
        BinOpKind::RShift => Opcode::BinaryRshift,
        BinOpKind::BitOr => Opcode::BinaryOr,
        BinOpKind::BitXor => Opcode::BinaryXor,
        BinOpKind::BitAnd => Opcode::BinaryAnd,
    }
}

fn unaryop_opcode(op: UnaryOpKind) -> Opcode {
    match op {
        UnaryOpKind::Not => Opcode::UnaryNot,
        UnaryOpKind::USub => Opcode::UnaryNegative,
        UnaryOpKind::UAdd => Opcode::UnaryPositive,
        UnaryOpKind::Invert => Opcode::UnaryInvert,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Num;

    #[test]
    fn compiles_constant_return_with_correct_stacksize() {
        let body = vec![Stmt::Return(Some(Expr::Num(Num::Int(42))), Some(1))];
        let code = compile_module(&body, "<test>");
        assert!(code.stacksize >= 1);
        assert_eq!(code.consts.len(), 1);
        assert!(matches!(code.consts[0], Const::Int(42)));
        assert_eq!(code.decode_lnotab()[0], (0, 1));
    }

    #[test]
    fn nested_function_closing_over_outer_local_uses_deref_opcodes() {
        // def make_adder(x):
        //     def add(y): return x + y
        //     return add
        let add = FunctionLit {
            name: "add".into(),
            params: Params::simple(vec!["y".into()]),
            body: vec![Stmt::Return(
                Some(Expr::BinOp(
                    Box::new(Expr::Name("x".into(), ExprContext::Load)),
                    BinOpKind::Add,
                    Box::new(Expr::Name("y".into(), ExprContext::Load)),
                )),
                None,
            )],
            line: None,
        };
        let make_adder = FunctionLit {
            name: "make_adder".into(),
            params: Params::simple(vec!["x".into()]),
            body: vec![
                Stmt::Assign(
                    vec![Expr::Name("add".into(), ExprContext::Store)],
                    Expr::Function(Box::new(add)),
                    None,
                ),
                Stmt::Return(Some(Expr::Name("add".into(), ExprContext::Load)), None),
            ],
            line: None,
        };
        let module_body = vec![Stmt::Assign(
            vec![Expr::Name("make_adder".into(), ExprContext::Store)],
            Expr::Function(Box::new(make_adder)),
            Some(1),
        )];
        let code = compile_module(&module_body, "<test>");
        assert!(!code.bytecode.is_empty());
        assert_eq!(code.consts.len(), 1);
        let Const::Code(make_adder_code) = &code.consts[0] else {
            panic!("expected nested code object");
        };
        assert_eq!(make_adder_code.cellvars, vec!["x".to_owned()]);
        let Const::Code(add_code) = make_adder_code
            .consts
            .iter()
            .find(|c| matches!(c, Const::Code(_)))
            .expect("add's code object")
        else {
            unreachable!()
        };
        assert_eq!(add_code.freevars, vec!["x".to_owned()]);
        assert!(add_code.bytecode.contains(&(Opcode::LoadDeref as u8)));
    }

    #[test]
    fn class_body_sets_self_contained_flag() {
        let class_stmt = Stmt::ClassDef {
            name: "Point".into(),
            bases: vec![],
            body: vec![Stmt::Assign(
                vec![Expr::Name("dim".into(), ExprContext::Store)],
                Expr::Num(Num::Int(2)),
                Some(2),
            )],
            line: Some(1),
        };
        let code = compile_module(std::slice::from_ref(&class_stmt), "<test>");
        let Const::Code(class_code) = code
            .consts
            .iter()
            .find(|c| matches!(c, Const::Code(_)))
            .expect("class body code object")
        else {
            unreachable!()
        };
        assert_eq!(class_code.flags & CO_SELF_CONTAINED, CO_SELF_CONTAINED);
    }
}
