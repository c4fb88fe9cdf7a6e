//! Subset checker (§6.2, §6.3): one recursive walk over the parsed AST that
//! fails fast with the first violation found. `CodeGen` trusts a checked
//! tree and does not revalidate any of these rules itself.

use crate::ast::{Expr, FunctionLit, Params, Stmt};
use crate::error::CheckError;

pub fn check_module(body: &[Stmt]) -> Result<(), CheckError> {
    let mut checker = Checker;
    for stmt in body {
        checker.check_stmt(stmt, true)?;
    }
    Ok(())
}

struct Checker;

impl Checker {
    fn fail(&self, line: Option<u32>, node_kind: &str, message: impl Into<String>) -> CheckError {
        CheckError {
            line: line.unwrap_or(0),
            node_kind: node_kind.to_owned(),
            message: message.into(),
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt, at_top_level: bool) -> Result<(), CheckError> {
        match stmt {
            Stmt::Module(body) => {
                for s in body {
                    self.check_stmt(s, at_top_level)?;
                }
            }
            Stmt::FunctionDef { params, body, decorators, line, .. } => {
                self.check_params(params, *line)?;
                for d in decorators {
                    self.check_expr(d)?;
                }
                for s in body {
                    self.check_stmt(s, false)?;
                }
            }
            Stmt::ClassDef { bases, body, line, .. } => {
                if !at_top_level {
                    return Err(self.fail(*line, "ClassDef", "class definitions are only allowed at the top level"));
                }
                for b in bases {
                    self.check_expr(b)?;
                }
                for s in body {
                    self.check_stmt(s, false)?;
                }
            }
            Stmt::Assign(targets, value, line) => {
                for t in targets {
                    self.check_target(t, *line)?;
                }
                self.check_expr(value)?;
            }
            Stmt::Expr(expr, _) => self.check_expr(expr)?,
            Stmt::If { test, then, orelse, .. } => {
                self.check_expr(test)?;
                for s in then {
                    self.check_stmt(s, at_top_level)?;
                }
                for s in orelse {
                    self.check_stmt(s, at_top_level)?;
                }
            }
            Stmt::While { test, body, .. } => {
                self.check_expr(test)?;
                for s in body {
                    self.check_stmt(s, at_top_level)?;
                }
            }
            Stmt::For { target, iter, body, line } => {
                self.check_target(target, *line)?;
                self.check_expr(iter)?;
                for s in body {
                    self.check_stmt(s, at_top_level)?;
                }
            }
            Stmt::Return(value, _) => {
                if let Some(v) = value {
                    self.check_expr(v)?;
                }
            }
            Stmt::Raise(exc, _) => self.check_expr(exc)?,
            Stmt::Import(..) | Stmt::ImportFrom { .. } | Stmt::Pass(_) => {}
            Stmt::Assert(test, msg, _) => {
                self.check_expr(test)?;
                if let Some(m) = msg {
                    self.check_expr(m)?;
                }
            }
        }
        Ok(())
    }

    fn check_params(&self, params: &Params, line: Option<u32>) -> Result<(), CheckError> {
        for name in &params.positional {
            self.check_identifier(name, line)?;
        }
        if let Some(v) = &params.vararg {
            self.check_identifier(v, line)?;
        }
        if let Some(k) = &params.kwarg {
            self.check_identifier(k, line)?;
        }
        Ok(())
    }

    fn check_target(&self, target: &Expr, line: Option<u32>) -> Result<(), CheckError> {
        match target {
            Expr::Name(name, _) => self.check_identifier(name, line),
            Expr::Attribute(obj, _, _) | Expr::Subscript(obj, _, _) => self.check_target(obj, line),
            Expr::Tuple(items, _) | Expr::List(items, _) => {
                for item in items {
                    self.check_target(item, line)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn check_identifier(&self, name: &str, line: Option<u32>) -> Result<(), CheckError> {
        let mangled = name.starts_with("__") && !name.ends_with("__");
        if mangled {
            return Err(self.fail(line, "Name", format!("identifier '{name}' uses a reserved double-underscore prefix")));
        }
        Ok(())
    }

    fn check_expr(&mut self, expr: &Expr) -> Result<(), CheckError> {
        match expr {
            Expr::Name(name, _) => self.check_identifier(name, None),
            Expr::NameConstant(_) | Expr::Num(_) | Expr::Str(_) | Expr::Bytes(_) => Ok(()),
            Expr::Call(func, args, kwargs) => {
                self.check_expr(func)?;
                for a in args {
                    self.check_expr(a)?;
                }
                for (_, v) in kwargs {
                    self.check_expr(v)?;
                }
                Ok(())
            }
            Expr::Attribute(obj, _, _) => self.check_expr(obj),
            Expr::Subscript(obj, index, _) => {
                self.check_expr(obj)?;
                self.check_expr(index)
            }
            Expr::BinOp(l, _, r) => {
                self.check_expr(l)?;
                self.check_expr(r)
            }
            Expr::UnaryOp(_, operand) => self.check_expr(operand),
            Expr::BoolOp(_, values) => {
                for v in values {
                    self.check_expr(v)?;
                }
                Ok(())
            }
            Expr::Compare(l, _, r) => {
                self.check_expr(l)?;
                self.check_expr(r)
            }
            Expr::List(items, _) | Expr::Tuple(items, _) => {
                for item in items {
                    self.check_expr(item)?;
                }
                Ok(())
            }
            Expr::Dict(keys, values) => {
                for k in keys {
                    self.check_expr(k)?;
                }
                for v in values {
                    self.check_expr(v)?;
                }
                Ok(())
            }
            Expr::IfExp(test, body, orelse) => {
                self.check_expr(test)?;
                self.check_expr(body)?;
                self.check_expr(orelse)
            }
            Expr::Lambda(params, body) => {
                self.check_params(params, None)?;
                self.check_expr(body)
            }
            Expr::ListComp(elt, clauses) => {
                for clause in clauses {
                    self.check_target(&clause.target, None)?;
                    self.check_expr(&clause.iter)?;
                    for cond in &clause.ifs {
                        self.check_expr(cond)?;
                    }
                }
                self.check_expr(elt)
            }
            Expr::Function(lit) => self.check_function_lit(lit),
        }
    }

    fn check_function_lit(&mut self, lit: &FunctionLit) -> Result<(), CheckError> {
        self.check_params(&lit.params, lit.line)?;
        for s in &lit.body {
            self.check_stmt(s, false)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn accepts_a_well_formed_module() {
        let body = parse("def add(a, b):\n    return a + b\n").unwrap();
        assert!(check_module(&body).is_ok());
    }

    #[test]
    fn rejects_mangled_identifiers() {
        let body = parse("__x = 1\n").unwrap();
        let err = check_module(&body).unwrap_err();
        assert!(err.message.contains("reserved"));
    }

    #[test]
    fn accepts_dunder_names() {
        let body = parse("__init__ = 1\n").unwrap();
        assert!(check_module(&body).is_ok());
    }

    #[test]
    fn rejects_a_class_nested_inside_a_function() {
        let body = parse("def make():\n    class Thing:\n        pass\n    return Thing\n").unwrap();
        let err = check_module(&body).unwrap_err();
        assert!(err.message.contains("top level"));
    }

    #[test]
    fn rejects_a_class_nested_inside_another_class() {
        let body = parse("class Outer:\n    class Inner:\n        pass\n").unwrap();
        let err = check_module(&body).unwrap_err();
        assert!(err.message.contains("top level"));
    }

    #[test]
    fn accepts_a_class_inside_an_if_at_module_level() {
        let body = parse("if True:\n    class Thing:\n        pass\n").unwrap();
        assert!(check_module(&body).is_ok());
    }
}
