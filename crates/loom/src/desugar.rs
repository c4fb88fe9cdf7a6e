//! Purely AST→AST rewriter (§4.1): reduces the surface tree into the core
//! tree `CodeGen` and `Scope` operate on. `FunctionDef`/`Lambda`/`Assert`/
//! `ListComp` never reach the code generator.

use crate::ast::{BoolOpKind, Comprehension, Expr, ExprContext, FunctionLit, Params, Stmt};

const LISTCOMP_ARG: &str = ".elements";

#[must_use]
pub fn desugar_module(body: Vec<Stmt>) -> Vec<Stmt> {
    body.into_iter().map(desugar_stmt).collect()
}

fn desugar_stmt(stmt: Stmt) -> Stmt {
    match stmt {
        Stmt::FunctionDef {
            name,
            params,
            body,
            decorators,
            line,
        } => {
            let body = desugar_block(body);
            let mut value = Expr::Function(Box::new(FunctionLit {
                name: name.clone(),
                params,
                body,
                line,
            }));
            // decorators apply right-to-left: the last decorator wraps first.
            for dec in decorators.into_iter().rev() {
                value = Expr::Call(Box::new(desugar_expr(dec)), vec![value], vec![]);
            }
            Stmt::Assign(vec![Expr::Name(name, ExprContext::Store)], value, line)
        }
        Stmt::ClassDef {
            name,
            bases,
            body,
            line,
        } => Stmt::ClassDef {
            name,
            bases: bases.into_iter().map(desugar_expr).collect(),
            body: desugar_block(body),
            line,
        },
        Stmt::Assign(targets, value, line) => Stmt::Assign(
            targets.into_iter().map(desugar_expr).collect(),
            desugar_expr(value),
            line,
        ),
        Stmt::Expr(e, line) => Stmt::Expr(desugar_expr(e), line),
        Stmt::If {
            test,
            then,
            orelse,
            line,
        } => Stmt::If {
            test: desugar_expr(test),
            then: desugar_block(then),
            orelse: desugar_block(orelse),
            line,
        },
        Stmt::While { test, body, line } => Stmt::While {
            test: desugar_expr(test),
            body: desugar_block(body),
            line,
        },
        Stmt::For {
            target,
            iter,
            body,
            line,
        } => Stmt::For {
            target: desugar_expr(target),
            iter: desugar_expr(iter),
            body: desugar_block(body),
            line,
        },
        Stmt::Return(value, line) => Stmt::Return(value.map(desugar_expr), line),
        Stmt::Raise(exc, line) => Stmt::Raise(desugar_expr(exc), line),
        Stmt::Assert(test, msg, line) => {
            let test = desugar_expr(test);
            let args = msg.into_iter().map(desugar_expr).collect();
            Stmt::If {
                test,
                then: vec![],
                orelse: vec![Stmt::Raise(
                    Expr::Call(
                        Box::new(Expr::Name("AssertionError".into(), ExprContext::Load)),
                        args,
                        vec![],
                    ),
                    line,
                )],
                line,
            }
        }
        stmt @ (Stmt::Import(..) | Stmt::ImportFrom { .. } | Stmt::Pass(_) | Stmt::Module(_)) => {
            stmt
        }
    }
}

fn desugar_block(body: Vec<Stmt>) -> Vec<Stmt> {
    body.into_iter().map(desugar_stmt).collect()
}

fn desugar_expr(expr: Expr) -> Expr {
    match expr {
        Expr::Lambda(params, body) => Expr::Function(Box::new(FunctionLit {
            name: "<lambda>".to_owned(),
            params,
            body: vec![Stmt::Return(Some(desugar_expr(*body)), None)],
            line: None,
        })),
        Expr::ListComp(elt, generators) => desugar_listcomp(*elt, generators),
        Expr::Call(func, args, kwargs) => Expr::Call(
            Box::new(desugar_expr(*func)),
            args.into_iter().map(desugar_expr).collect(),
            kwargs
                .into_iter()
                .map(|(k, v)| (k, desugar_expr(v)))
                .collect(),
        ),
        Expr::Attribute(val, attr, ctx) => Expr::Attribute(Box::new(desugar_expr(*val)), attr, ctx),
        Expr::Subscript(val, key, ctx) => Expr::Subscript(
            Box::new(desugar_expr(*val)),
            Box::new(desugar_expr(*key)),
            ctx,
        ),
        Expr::BinOp(l, op, r) => {
            Expr::BinOp(Box::new(desugar_expr(*l)), op, Box::new(desugar_expr(*r)))
        }
        Expr::UnaryOp(op, e) => Expr::UnaryOp(op, Box::new(desugar_expr(*e))),
        Expr::BoolOp(op, values) => {
            Expr::BoolOp(op, values.into_iter().map(desugar_expr).collect())
        }
        Expr::Compare(l, op, r) => {
            Expr::Compare(Box::new(desugar_expr(*l)), op, Box::new(desugar_expr(*r)))
        }
        Expr::List(elts, ctx) => Expr::List(elts.into_iter().map(desugar_expr).collect(), ctx),
        Expr::Tuple(elts, ctx) => Expr::Tuple(elts.into_iter().map(desugar_expr).collect(), ctx),
        Expr::Dict(keys, values) => Expr::Dict(
            keys.into_iter().map(desugar_expr).collect(),
            values.into_iter().map(desugar_expr).collect(),
        ),
        Expr::IfExp(test, body, orelse) => Expr::IfExp(
            Box::new(desugar_expr(*test)),
            Box::new(desugar_expr(*body)),
            Box::new(desugar_expr(*orelse)),
        ),
        expr @ (Expr::Name(..)
        | Expr::NameConstant(_)
        | Expr::Num(_)
        | Expr::Str(_)
        | Expr::Bytes(_)
        | Expr::Function(_)) => expr,
    }
}

/// `[elt for t1 in it1 if ... for t2 in it2 if ... ]` becomes an
/// immediately-invoked function named `<listcomp>` that builds `.elements`
/// by nested for/if and returns it; see design notes on the synthetic name.
fn desugar_listcomp(elt: Expr, generators: Vec<Comprehension>) -> Expr {
    let append_call = Stmt::Expr(
        Expr::Call(
            Box::new(Expr::Attribute(
                Box::new(Expr::Name(LISTCOMP_ARG.to_owned(), ExprContext::Load)),
                "append".to_owned(),
                ExprContext::Load,
            )),
            vec![desugar_expr(elt)],
            vec![],
        ),
        None,
    );

    let mut body = vec![append_call];
    for comp in generators.into_iter().rev() {
        let mut inner = body;
        if !comp.ifs.is_empty() {
            let mut test = desugar_expr(comp.ifs[0].clone());
            for extra in &comp.ifs[1..] {
                test = Expr::BoolOp(BoolOpKind::And, vec![test, desugar_expr(extra.clone())]);
            }
            inner = vec![Stmt::If {
                test,
                then: inner,
                orelse: vec![],
                line: None,
            }];
        }
        body = vec![Stmt::For {
            target: desugar_expr(comp.target),
            iter: desugar_expr(comp.iter),
            body: inner,
            line: None,
        }];
    }
    body.push(Stmt::Return(
        Some(Expr::Name(LISTCOMP_ARG.to_owned(), ExprContext::Load)),
        None,
    ));

    let func = Expr::Function(Box::new(FunctionLit {
        name: "<listcomp>".to_owned(),
        params: Params::simple(vec![LISTCOMP_ARG.to_owned()]),
        body,
        line: None,
    }));
    Expr::Call(
        Box::new(func),
        vec![Expr::List(vec![], ExprContext::Load)],
        vec![],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_def_lowers_to_assign_of_function() {
        let body = vec![Stmt::FunctionDef {
            name: "f".into(),
            params: Params::simple(vec!["x".into()]),
            body: vec![Stmt::Return(
                Some(Expr::Name("x".into(), ExprContext::Load)),
                Some(2),
            )],
            decorators: vec![],
            line: Some(1),
        }];
        let out = desugar_module(body);
        match &out[0] {
            Stmt::Assign(targets, Expr::Function(lit), _) => {
                assert_eq!(targets.len(), 1);
                assert_eq!(lit.name, "f");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn assert_lowers_to_if_raise() {
        let out = desugar_stmt(Stmt::Assert(
            Expr::Name("x".into(), ExprContext::Load),
            None,
            Some(1),
        ));
        match out {
            Stmt::If { orelse, .. } => {
                assert_eq!(orelse.len(), 1);
                assert!(matches!(orelse[0], Stmt::Raise(..)));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn listcomp_uses_elements_name() {
        let expr = desugar_expr(Expr::ListComp(
            Box::new(Expr::Name("z".into(), ExprContext::Load)),
            vec![Comprehension {
                target: Expr::Name("z".into(), ExprContext::Store),
                iter: Expr::Name("range".into(), ExprContext::Load),
                ifs: vec![],
            }],
        ));
        match expr {
            Expr::Call(func, args, _) => {
                assert_eq!(args.len(), 1);
                assert!(matches!(args[0], Expr::List(ref elts, _) if elts.is_empty()));
                match *func {
                    Expr::Function(lit) => assert_eq!(lit.params.positional[0], LISTCOMP_ARG),
                    other => panic!("unexpected: {other:?}"),
                }
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
