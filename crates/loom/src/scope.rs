//! Two-pass lexical scope analysis (§4.2): collects per-scope `defs`/`uses`,
//! then resolves `cellvars`/`freevars` top-down so every name access in a
//! scope has exactly one classification.

use ahash::{AHashMap, AHashSet};

use crate::ast::{Expr, ExprContext, FunctionLit, Stmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Deref,
    Fast,
    Name,
}

/// A scope's identity within the scope tree: the pointer address of the
/// `FunctionLit`/class body it was built for. Module scope uses `None`.
pub type ScopeKey = Option<usize>;

#[derive(Debug, Default)]
pub struct Scope {
    pub defs: AHashSet<String>,
    pub uses: AHashSet<String>,
    pub is_function: bool,
    pub local_defs: AHashSet<String>,
    pub cellvars: Vec<String>,
    pub freevars: Vec<String>,
    pub children: Vec<(ScopeKey, Scope)>,
}

impl Scope {
    #[must_use]
    pub fn derefvars(&self) -> Vec<String> {
        self.cellvars.iter().cloned().chain(self.freevars.iter().cloned()).collect()
    }

    #[must_use]
    pub fn access(&self, name: &str) -> Access {
        if self.cellvars.iter().any(|n| n == name) || self.freevars.iter().any(|n| n == name) {
            Access::Deref
        } else if self.local_defs.contains(name) {
            Access::Fast
        } else {
            Access::Name
        }
    }

    fn collect_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Module(body) => body.iter().for_each(|s| self.collect_stmt(s)),
            Stmt::ClassDef { name, bases, body, .. } => {
                self.defs.insert(name.clone());
                bases.iter().for_each(|e| self.collect_expr(e));
                let mut child = Scope {
                    is_function: false,
                    ..Scope::default()
                };
                body.iter().for_each(|s| child.collect_stmt(s));
                self.children.push((Some(stmt as *const _ as usize), child));
            }
            Stmt::Assign(targets, value, _) => {
                self.collect_expr(value);
                targets.iter().for_each(|t| self.collect_expr(t));
            }
            Stmt::Expr(e, _) => self.collect_expr(e),
            Stmt::If { test, then, orelse, .. } => {
                self.collect_expr(test);
                then.iter().for_each(|s| self.collect_stmt(s));
                orelse.iter().for_each(|s| self.collect_stmt(s));
            }
            Stmt::While { test, body, .. } => {
                self.collect_expr(test);
                body.iter().for_each(|s| self.collect_stmt(s));
            }
            Stmt::For { target, iter, body, .. } => {
                self.collect_expr(target);
                self.collect_expr(iter);
                body.iter().for_each(|s| self.collect_stmt(s));
            }
            Stmt::Return(value, _) => {
                if let Some(v) = value {
                    self.collect_expr(v);
                }
            }
            Stmt::Raise(exc, _) => self.collect_expr(exc),
            Stmt::Import(aliases, _) => {
                for a in aliases {
                    let binding = a.asname.clone().unwrap_or_else(|| {
                        a.name.split('.').next().unwrap_or(&a.name).to_owned()
                    });
                    self.defs.insert(binding);
                }
            }
            Stmt::ImportFrom { names, .. } => {
                for a in names {
                    self.defs
                        .insert(a.asname.clone().unwrap_or_else(|| a.name.clone()));
                }
            }
            Stmt::Pass(_) => {}
            Stmt::FunctionDef { .. } | Stmt::Assert(..) => {
                unreachable!("scope analysis runs after desugaring")
            }
        }
    }

    fn collect_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Name(name, ExprContext::Load) => {
                self.uses.insert(name.clone());
            }
            Expr::Name(name, ExprContext::Store) => {
                self.defs.insert(name.clone());
            }
            Expr::NameConstant(_) | Expr::Num(_) | Expr::Str(_) | Expr::Bytes(_) => {}
            Expr::Function(lit) => {
                let child = Self::collect_function(lit);
                self.children.push((Some(lit.as_ref() as *const _ as usize), child));
            }
            Expr::Call(func, args, kwargs) => {
                self.collect_expr(func);
                args.iter().for_each(|a| self.collect_expr(a));
                kwargs.iter().for_each(|(_, v)| self.collect_expr(v));
            }
            Expr::Attribute(val, _, _) => self.collect_expr(val),
            Expr::Subscript(val, key, _) => {
                self.collect_expr(val);
                self.collect_expr(key);
            }
            Expr::BinOp(l, _, r) | Expr::Compare(l, _, r) => {
                self.collect_expr(l);
                self.collect_expr(r);
            }
            Expr::UnaryOp(_, e) => self.collect_expr(e),
            Expr::BoolOp(_, values) => values.iter().for_each(|v| self.collect_expr(v)),
            Expr::List(elts, _) | Expr::Tuple(elts, _) => {
                elts.iter().for_each(|e| self.collect_expr(e));
            }
            Expr::Dict(keys, values) => {
                keys.iter().for_each(|e| self.collect_expr(e));
                values.iter().for_each(|e| self.collect_expr(e));
            }
            Expr::IfExp(test, body, orelse) => {
                self.collect_expr(test);
                self.collect_expr(body);
                self.collect_expr(orelse);
            }
            Expr::Lambda(..) | Expr::ListComp(..) => {
                unreachable!("scope analysis runs after desugaring")
            }
        }
    }

    fn collect_function(lit: &FunctionLit) -> Self {
        let mut child = Self {
            is_function: true,
            ..Self::default()
        };
        for name in lit.params.arg_names() {
            child.defs.insert(name);
        }
        lit.body.iter().for_each(|s| child.collect_stmt(s));
        child
    }

    /// Pass 2: resolve `cellvars`/`freevars` given the set of names any
    /// enclosing function defines.
    fn analyze(&mut self, parent_defs: &AHashSet<String>) {
        self.local_defs = if self.is_function {
            self.defs.clone()
        } else {
            AHashSet::default()
        };

        let mut inherited = parent_defs.clone();
        inherited.extend(self.local_defs.iter().cloned());

        let mut child_uses: AHashSet<String> = AHashSet::default();
        for (_, child) in &mut self.children {
            child.analyze(&inherited);
            child_uses.extend(child.freevars.iter().cloned());
        }

        // cells first, in first-seen order among local_defs for determinism.
        self.cellvars = self
            .local_defs
            .iter()
            .filter(|n| child_uses.contains(*n))
            .cloned()
            .collect();
        self.cellvars.sort();

        let available = parent_defs
            .difference(&self.local_defs)
            .cloned()
            .collect::<AHashSet<_>>();
        let mut needed: AHashSet<String> = self.uses.clone();
        needed.extend(child_uses);
        self.freevars = needed.intersection(&available).cloned().collect();
        self.freevars.sort();
    }
}

/// Builds and analyzes the scope tree for a desugared module body.
#[must_use]
pub fn analyze_module(body: &[Stmt]) -> Scope {
    let mut module = Scope {
        is_function: false,
        ..Scope::default()
    };
    body.iter().for_each(|s| module.collect_stmt(s));
    module.analyze(&AHashSet::default());
    module
}

/// Flat lookup table from scope key to resolved scope, built by walking the
/// tree produced by [`analyze_module`]; the code generator indexes into this
/// by AST node identity as it descends.
pub type ScopeTable = AHashMap<ScopeKey, Scope>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Params;

    #[test]
    fn make_adder_scopes_match_scenario_four() {
        // def make_adder(x):
        //     z = x + 1
        //     def add(y):
        //         return x + y + z
        //     return add
        let add = FunctionLit {
            name: "add".into(),
            params: Params::simple(vec!["y".into()]),
            body: vec![Stmt::Return(
                Some(Expr::BinOp(
                    Box::new(Expr::BinOp(
                        Box::new(Expr::Name("x".into(), ExprContext::Load)),
                        crate::ast::BinOpKind::Add,
                        Box::new(Expr::Name("y".into(), ExprContext::Load)),
                    )),
                    crate::ast::BinOpKind::Add,
                    Box::new(Expr::Name("z".into(), ExprContext::Load)),
                )),
                None,
            )],
            line: None,
        };
        let make_adder = vec![
            Stmt::Assign(
                vec![Expr::Name("z".into(), ExprContext::Store)],
                Expr::BinOp(
                    Box::new(Expr::Name("x".into(), ExprContext::Load)),
                    crate::ast::BinOpKind::Add,
                    Box::new(Expr::Num(crate::ast::Num::Int(1))),
                ),
                None,
            ),
            Stmt::Assign(
                vec![Expr::Name("add".into(), ExprContext::Store)],
                Expr::Function(Box::new(add)),
                None,
            ),
            Stmt::Return(Some(Expr::Name("add".into(), ExprContext::Load)), None),
        ];

        let lit = FunctionLit {
            name: "make_adder".into(),
            params: Params::simple(vec!["x".into()]),
            body: make_adder,
            line: None,
        };
        let mut scope = Scope::collect_function(&lit);
        scope.analyze(&AHashSet::default());

        assert_eq!(scope.cellvars, vec!["x".to_owned(), "z".to_owned()]);
        assert!(scope.freevars.is_empty());

        let (_, add_scope) = &scope.children[0];
        assert!(add_scope.cellvars.is_empty());
        assert_eq!(add_scope.freevars, vec!["x".to_owned(), "z".to_owned()]);
    }
}
