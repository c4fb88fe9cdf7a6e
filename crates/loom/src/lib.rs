//! `loom`: a metacircular compiler and stack VM for a small Python-like
//! subset (§1, §2). The pipeline is lex → parse → check → desugar →
//! scope-analyze → compile → run, wired together by [`run_source`].

mod ast;
mod builtins;
mod bytecode;
mod checker;
mod desugar;
mod error;
mod intern;
mod lexer;
mod parser;
mod runtime;
mod scope;

pub use bytecode::code::CodeObject;
pub use bytecode::compiler::compile_module;
pub use error::{CheckError, CompileError, Error, LexError, ParseError, Result, RuntimeError};
pub use runtime::value::Value;
pub use runtime::vm::Vm;

/// Runs `source` end to end and returns the module's `return`-equivalent
/// value — in practice always `Value::None`, since a module body never
/// returns early; present so tests and the CLI share one entry point.
pub fn run_source(source: &str, filename: &str) -> Result<Value> {
    let surface = parser::parse(source)?;
    checker::check_module(&surface)?;
    let core = desugar::desugar_module(surface);
    let code = compile_module(&core, filename);
    let vm = Vm::new(builtins::builtins());
    vm.run_module(std::rc::Rc::new(code)).map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_a_trivial_module() {
        assert!(run_source("x = 1 + 2\n", "<test>").is_ok());
    }

    #[test]
    fn surfaces_a_syntax_error() {
        let err = run_source("def (:\n", "<test>").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn surfaces_a_checker_error_for_mangled_names() {
        let err = run_source("__x = 1\n", "<test>").unwrap_err();
        assert!(matches!(err, Error::Check(_)));
    }

    #[test]
    fn surfaces_a_runtime_error_for_unbound_names() {
        let err = run_source("print(missing)\n", "<test>").unwrap_err();
        assert!(matches!(err, Error::Runtime(_)));
    }
}
