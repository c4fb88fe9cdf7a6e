//! Recursive-descent parser (§10.1) over the hand-written lexer's token
//! stream, producing the pre-desugar surface AST (§3). No parser-combinator
//! or grammar crate: the accepted subset (§6.2) is small enough that a
//! direct descent is the more legible choice, matching the lexer.

use crate::ast::{
    Alias, BinOpKind, BoolOpKind, CmpOp, Comprehension, Expr, ExprContext, NameConstant, Num, Params, Stmt,
    UnaryOpKind,
};
use crate::error::ParseError;
use crate::lexer::{lex, Spanned, Token};

pub fn parse(source: &str) -> Result<Vec<Stmt>, crate::error::Error> {
    let tokens = lex(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let module = parser.parse_module()?;
    Ok(module)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn line(&self) -> u32 {
        self.tokens[self.pos].line
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: self.line(),
            message: message.into(),
        }
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].token.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), ParseError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.err(format!("expected {token:?}, found {:?}", self.peek())))
        }
    }

    fn expect_name(&mut self) -> Result<String, ParseError> {
        match self.advance() {
            Token::Name(name) => Ok(name),
            other => Err(self.err(format!("expected identifier, found {other:?}"))),
        }
    }

    fn skip_newlines(&mut self) {
        while self.eat(&Token::Newline) {}
    }

    fn parse_module(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.skip_newlines();
        let mut body = Vec::new();
        while !self.check(&Token::Eof) {
            body.push(self.parse_stmt()?);
            self.skip_newlines();
        }
        Ok(body)
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&Token::Colon)?;
        if self.eat(&Token::Newline) {
            self.expect(&Token::Indent)?;
            let mut body = Vec::new();
            while !self.check(&Token::Dedent) {
                body.push(self.parse_stmt()?);
                self.skip_newlines();
            }
            self.expect(&Token::Dedent)?;
            Ok(body)
        } else {
            let stmt = self.parse_simple_stmt()?;
            self.expect(&Token::Newline)?;
            Ok(vec![stmt])
        }
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek() {
            Token::At => self.parse_decorated_def(),
            Token::Name(name) if name == "def" => self.parse_funcdef(Vec::new()),
            Token::Name(name) if name == "class" => self.parse_classdef(),
            Token::Name(name) if name == "if" => self.parse_if(),
            Token::Name(name) if name == "while" => self.parse_while(),
            Token::Name(name) if name == "for" => self.parse_for(),
            _ => {
                let stmt = self.parse_simple_stmt()?;
                self.expect(&Token::Newline)?;
                Ok(stmt)
            }
        }
    }

    fn parse_decorated_def(&mut self) -> Result<Stmt, ParseError> {
        let mut decorators = Vec::new();
        while self.eat(&Token::At) {
            decorators.push(self.parse_expr()?);
            self.expect(&Token::Newline)?;
        }
        self.parse_funcdef(decorators)
    }

    fn parse_funcdef(&mut self, decorators: Vec<Expr>) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.expect_keyword("def")?;
        let name = self.expect_name()?;
        self.expect(&Token::LParen)?;
        let params = self.parse_params(&Token::RParen)?;
        self.expect(&Token::RParen)?;
        let body = self.parse_block()?;
        Ok(Stmt::FunctionDef {
            name,
            params,
            body,
            decorators,
            line: Some(line),
        })
    }

    fn parse_params(&mut self, closing: &Token) -> Result<Params, ParseError> {
        let mut positional = Vec::new();
        let mut vararg = None;
        let mut kwarg = None;
        while !self.check(closing) {
            if self.eat(&Token::Star) {
                vararg = Some(self.expect_name()?);
            } else if self.eat(&Token::DoubleStar) {
                kwarg = Some(self.expect_name()?);
            } else {
                positional.push(self.expect_name()?);
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(Params { positional, vararg, kwarg })
    }

    fn parse_classdef(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.expect_keyword("class")?;
        let name = self.expect_name()?;
        let mut bases = Vec::new();
        if self.eat(&Token::LParen) {
            while !self.check(&Token::RParen) {
                bases.push(self.parse_expr()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RParen)?;
        }
        let body = self.parse_block()?;
        Ok(Stmt::ClassDef {
            name,
            bases,
            body,
            line: Some(line),
        })
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.expect_keyword("if")?;
        let test = self.parse_expr()?;
        let then = self.parse_block()?;
        let orelse = self.parse_elif_or_else()?;
        Ok(Stmt::If {
            test,
            then,
            orelse,
            line: Some(line),
        })
    }

    fn parse_elif_or_else(&mut self) -> Result<Vec<Stmt>, ParseError> {
        match self.peek() {
            Token::Name(n) if n == "elif" => {
                let line = self.line();
                self.advance();
                let test = self.parse_expr()?;
                let then = self.parse_block()?;
                let orelse = self.parse_elif_or_else()?;
                Ok(vec![Stmt::If {
                    test,
                    then,
                    orelse,
                    line: Some(line),
                }])
            }
            Token::Name(n) if n == "else" => {
                self.advance();
                self.parse_block()
            }
            _ => Ok(Vec::new()),
        }
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.expect_keyword("while")?;
        let test = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::While {
            test,
            body,
            line: Some(line),
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.expect_keyword("for")?;
        let target = self.parse_target_list()?;
        self.expect_keyword("in")?;
        let iter = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::For {
            target,
            iter,
            body,
            line: Some(line),
        })
    }

    fn parse_target_list(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_target()?;
        if self.check(&Token::Comma) {
            let mut items = vec![first];
            while self.eat(&Token::Comma) {
                if matches!(self.peek(), Token::Name(n) if n == "in") {
                    break;
                }
                items.push(self.parse_target()?);
            }
            Ok(Expr::Tuple(items, ExprContext::Store))
        } else {
            Ok(first)
        }
    }

    fn parse_target(&mut self) -> Result<Expr, ParseError> {
        let name = self.expect_name()?;
        Ok(Expr::Name(name, ExprContext::Store))
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        match self.advance() {
            Token::Name(n) if n == keyword => Ok(()),
            other => Err(self.err(format!("expected '{keyword}', found {other:?}"))),
        }
    }

    fn parse_simple_stmt(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        match self.peek() {
            Token::Name(n) if n == "return" => {
                self.advance();
                let value = if matches!(self.peek(), Token::Newline) { None } else { Some(self.parse_expr_list()?) };
                Ok(Stmt::Return(value, Some(line)))
            }
            Token::Name(n) if n == "raise" => {
                self.advance();
                let exc = self.parse_expr()?;
                Ok(Stmt::Raise(exc, Some(line)))
            }
            Token::Name(n) if n == "pass" => {
                self.advance();
                Ok(Stmt::Pass(Some(line)))
            }
            Token::Name(n) if n == "assert" => {
                self.advance();
                let test = self.parse_expr()?;
                let msg = if self.eat(&Token::Comma) { Some(self.parse_expr()?) } else { None };
                Ok(Stmt::Assert(test, msg, Some(line)))
            }
            Token::Name(n) if n == "import" => self.parse_import(line),
            Token::Name(n) if n == "from" => self.parse_import_from(line),
            _ => self.parse_expr_or_assign(line),
        }
    }

    fn parse_import(&mut self, line: u32) -> Result<Stmt, ParseError> {
        self.advance();
        let names = self.parse_alias_list()?;
        Ok(Stmt::Import(names, Some(line)))
    }

    fn parse_import_from(&mut self, line: u32) -> Result<Stmt, ParseError> {
        self.advance();
        let mut level = 0;
        while self.eat(&Token::Dot) {
            level += 1;
        }
        let module = if level > 0 && matches!(self.peek(), Token::Name(n) if n == "import") {
            String::new()
        } else {
            self.expect_name()?
        };
        self.expect_keyword("import")?;
        let names = if self.eat(&Token::Star) {
            vec![Alias {
                name: "*".to_owned(),
                asname: None,
            }]
        } else {
            self.parse_alias_list()?
        };
        Ok(Stmt::ImportFrom {
            level,
            module,
            names,
            line: Some(line),
        })
    }

    fn parse_alias_list(&mut self) -> Result<Vec<Alias>, ParseError> {
        let mut names = Vec::new();
        loop {
            let name = self.expect_name()?;
            let asname = if matches!(self.peek(), Token::Name(n) if n == "as") {
                self.advance();
                Some(self.expect_name()?)
            } else {
                None
            };
            names.push(Alias { name, asname });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(names)
    }

    fn parse_expr_or_assign(&mut self, line: u32) -> Result<Stmt, ParseError> {
        let first = self.parse_expr_list()?;
        if self.eat(&Token::Eq) {
            let mut targets = vec![to_store(first)];
            let mut value = self.parse_expr_list()?;
            while self.eat(&Token::Eq) {
                targets.push(to_store(value));
                value = self.parse_expr_list()?;
            }
            Ok(Stmt::Assign(targets, value, Some(line)))
        } else {
            Ok(Stmt::Expr(first, Some(line)))
        }
    }

    fn parse_expr_list(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_expr()?;
        if self.check(&Token::Comma) {
            let mut items = vec![first];
            while self.eat(&Token::Comma) {
                if matches!(self.peek(), Token::Newline | Token::Eq) {
                    break;
                }
                items.push(self.parse_expr()?);
            }
            Ok(Expr::Tuple(items, ExprContext::Load))
        } else {
            Ok(first)
        }
    }

    // --- expressions, precedence climbing from lowest to highest ---

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek(), Token::Name(n) if n == "lambda") {
            return self.parse_lambda();
        }
        let body = self.parse_or_test()?;
        if matches!(self.peek(), Token::Name(n) if n == "if") {
            self.advance();
            let test = self.parse_or_test()?;
            self.expect_keyword("else")?;
            let orelse = self.parse_expr()?;
            Ok(Expr::IfExp(Box::new(test), Box::new(body), Box::new(orelse)))
        } else {
            Ok(body)
        }
    }

    fn parse_lambda(&mut self) -> Result<Expr, ParseError> {
        self.advance();
        let params = if self.check(&Token::Colon) {
            Params::simple(Vec::new())
        } else {
            self.parse_params(&Token::Colon)?
        };
        self.expect(&Token::Colon)?;
        let body = self.parse_expr()?;
        Ok(Expr::Lambda(params, Box::new(body)))
    }

    fn parse_or_test(&mut self) -> Result<Expr, ParseError> {
        let mut values = vec![self.parse_and_test()?];
        while matches!(self.peek(), Token::Name(n) if n == "or") {
            self.advance();
            values.push(self.parse_and_test()?);
        }
        Ok(if values.len() == 1 {
            values.pop().unwrap()
        } else {
            Expr::BoolOp(BoolOpKind::Or, values)
        })
    }

    fn parse_and_test(&mut self) -> Result<Expr, ParseError> {
        let mut values = vec![self.parse_not_test()?];
        while matches!(self.peek(), Token::Name(n) if n == "and") {
            self.advance();
            values.push(self.parse_not_test()?);
        }
        Ok(if values.len() == 1 {
            values.pop().unwrap()
        } else {
            Expr::BoolOp(BoolOpKind::And, values)
        })
    }

    fn parse_not_test(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek(), Token::Name(n) if n == "not") {
            self.advance();
            let operand = self.parse_not_test()?;
            Ok(Expr::UnaryOp(UnaryOpKind::Not, Box::new(operand)))
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_bitor()?;
        let op = match self.peek() {
            Token::Lt => Some(CmpOp::Lt),
            Token::Le => Some(CmpOp::Le),
            Token::Gt => Some(CmpOp::Gt),
            Token::Ge => Some(CmpOp::Ge),
            Token::EqEq => Some(CmpOp::Eq),
            Token::NotEq => Some(CmpOp::Ne),
            Token::Name(n) if n == "in" => Some(CmpOp::In),
            Token::Name(n) if n == "is" => None, // handled below to allow "is not"
            Token::Name(n) if n == "not" => None, // handled below to allow "not in"
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let right = self.parse_bitor()?;
            return Ok(Expr::Compare(Box::new(left), op, Box::new(right)));
        }
        if matches!(self.peek(), Token::Name(n) if n == "is") {
            self.advance();
            let op = if matches!(self.peek(), Token::Name(n) if n == "not") {
                self.advance();
                CmpOp::IsNot
            } else {
                CmpOp::Is
            };
            let right = self.parse_bitor()?;
            return Ok(Expr::Compare(Box::new(left), op, Box::new(right)));
        }
        if matches!(self.peek(), Token::Name(n) if n == "not") {
            self.advance();
            self.expect_keyword("in")?;
            let right = self.parse_bitor()?;
            return Ok(Expr::Compare(Box::new(left), CmpOp::NotIn, Box::new(right)));
        }
        Ok(left)
    }

    fn parse_bitor(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitxor()?;
        while self.eat(&Token::Pipe) {
            left = Expr::BinOp(Box::new(left), BinOpKind::BitOr, Box::new(self.parse_bitxor()?));
        }
        Ok(left)
    }

    fn parse_bitxor(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitand()?;
        while self.eat(&Token::Caret) {
            left = Expr::BinOp(Box::new(left), BinOpKind::BitXor, Box::new(self.parse_bitand()?));
        }
        Ok(left)
    }

    fn parse_bitand(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_shift()?;
        while self.eat(&Token::Amp) {
            left = Expr::BinOp(Box::new(left), BinOpKind::BitAnd, Box::new(self.parse_shift()?));
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_arith()?;
        loop {
            let op = if self.eat(&Token::LShift) {
                BinOpKind::LShift
            } else if self.eat(&Token::RShift) {
                BinOpKind::RShift
            } else {
                break;
            };
            left = Expr::BinOp(Box::new(left), op, Box::new(self.parse_arith()?));
        }
        Ok(left)
    }

    fn parse_arith(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            let op = if self.eat(&Token::Plus) {
                BinOpKind::Add
            } else if self.eat(&Token::Minus) {
                BinOpKind::Sub
            } else {
                break;
            };
            left = Expr::BinOp(Box::new(left), op, Box::new(self.parse_term()?));
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_factor()?;
        loop {
            let op = if self.eat(&Token::Star) {
                BinOpKind::Mult
            } else if self.eat(&Token::DoubleSlash) {
                BinOpKind::FloorDiv
            } else if self.eat(&Token::Slash) {
                BinOpKind::Div
            } else if self.eat(&Token::Percent) {
                BinOpKind::Mod
            } else {
                break;
            };
            left = Expr::BinOp(Box::new(left), op, Box::new(self.parse_factor()?));
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Plus) {
            Ok(Expr::UnaryOp(UnaryOpKind::UAdd, Box::new(self.parse_factor()?)))
        } else if self.eat(&Token::Minus) {
            Ok(Expr::UnaryOp(UnaryOpKind::USub, Box::new(self.parse_factor()?)))
        } else if self.eat(&Token::Tilde) {
            Ok(Expr::UnaryOp(UnaryOpKind::Invert, Box::new(self.parse_factor()?)))
        } else {
            self.parse_power()
        }
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_trailer()?;
        if self.eat(&Token::DoubleStar) {
            let exponent = self.parse_factor()?;
            Ok(Expr::BinOp(Box::new(base), BinOpKind::Pow, Box::new(exponent)))
        } else {
            Ok(base)
        }
    }

    fn parse_trailer(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat(&Token::Dot) {
                let attr = self.expect_name()?;
                expr = Expr::Attribute(Box::new(expr), attr, ExprContext::Load);
            } else if self.eat(&Token::LParen) {
                let (args, kwargs) = self.parse_call_args()?;
                self.expect(&Token::RParen)?;
                expr = Expr::Call(Box::new(expr), args, kwargs);
            } else if self.eat(&Token::LBracket) {
                let index = self.parse_expr()?;
                self.expect(&Token::RBracket)?;
                expr = Expr::Subscript(Box::new(expr), Box::new(index), ExprContext::Load);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<(Vec<Expr>, Vec<(String, Expr)>), ParseError> {
        let mut args = Vec::new();
        let mut kwargs = Vec::new();
        while !self.check(&Token::RParen) {
            if let Token::Name(name) = self.peek().clone() {
                if self.tokens.get(self.pos + 1).map(|s| &s.token) == Some(&Token::Eq) {
                    self.advance();
                    self.advance();
                    kwargs.push((name, self.parse_expr()?));
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                    continue;
                }
            }
            args.push(self.parse_expr()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok((args, kwargs))
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        match self.peek().clone() {
            Token::Int(v) => {
                self.advance();
                Ok(Expr::Num(Num::Int(v)))
            }
            Token::Float(v) => {
                self.advance();
                Ok(Expr::Num(Num::Float(v)))
            }
            Token::Str(s) => {
                self.advance();
                let mut combined = s;
                while let Token::Str(next) = self.peek().clone() {
                    self.advance();
                    combined.push_str(&next);
                }
                Ok(Expr::Str(combined))
            }
            Token::Bytes(b) => {
                self.advance();
                Ok(Expr::Bytes(b))
            }
            Token::Name(name) => {
                self.advance();
                match name.as_str() {
                    "None" => Ok(Expr::NameConstant(NameConstant::None)),
                    "True" => Ok(Expr::NameConstant(NameConstant::True)),
                    "False" => Ok(Expr::NameConstant(NameConstant::False)),
                    _ => Ok(Expr::Name(name, ExprContext::Load)),
                }
            }
            Token::LParen => {
                self.advance();
                if self.eat(&Token::RParen) {
                    return Ok(Expr::Tuple(Vec::new(), ExprContext::Load));
                }
                let first = self.parse_expr()?;
                if self.eat(&Token::Comma) {
                    let mut items = vec![first];
                    while !self.check(&Token::RParen) {
                        items.push(self.parse_expr()?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                    self.expect(&Token::RParen)?;
                    Ok(Expr::Tuple(items, ExprContext::Load))
                } else {
                    self.expect(&Token::RParen)?;
                    Ok(first)
                }
            }
            Token::LBracket => self.parse_list_or_comp(),
            Token::LBrace => self.parse_dict(),
            other => Err(self.err(format!("unexpected token {other:?} in expression"))),
        }
    }

    fn parse_list_or_comp(&mut self) -> Result<Expr, ParseError> {
        self.advance();
        if self.eat(&Token::RBracket) {
            return Ok(Expr::List(Vec::new(), ExprContext::Load));
        }
        let first = self.parse_expr()?;
        if matches!(self.peek(), Token::Name(n) if n == "for") {
            let mut clauses = Vec::new();
            while matches!(self.peek(), Token::Name(n) if n == "for") {
                self.advance();
                let target = self.parse_target_list()?;
                self.expect_keyword("in")?;
                let iter = self.parse_or_test()?;
                let mut ifs = Vec::new();
                while matches!(self.peek(), Token::Name(n) if n == "if") {
                    self.advance();
                    ifs.push(self.parse_or_test()?);
                }
                clauses.push(Comprehension { target, iter, ifs });
            }
            self.expect(&Token::RBracket)?;
            Ok(Expr::ListComp(Box::new(first), clauses))
        } else {
            let mut items = vec![first];
            while self.eat(&Token::Comma) {
                if self.check(&Token::RBracket) {
                    break;
                }
                items.push(self.parse_expr()?);
            }
            self.expect(&Token::RBracket)?;
            Ok(Expr::List(items, ExprContext::Load))
        }
    }

    fn parse_dict(&mut self) -> Result<Expr, ParseError> {
        self.advance();
        let mut keys = Vec::new();
        let mut values = Vec::new();
        while !self.check(&Token::RBrace) {
            keys.push(self.parse_expr()?);
            self.expect(&Token::Colon)?;
            values.push(self.parse_expr()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBrace)?;
        Ok(Expr::Dict(keys, values))
    }
}

fn to_store(expr: Expr) -> Expr {
    match expr {
        Expr::Name(name, _) => Expr::Name(name, ExprContext::Store),
        Expr::Attribute(obj, attr, _) => Expr::Attribute(obj, attr, ExprContext::Store),
        Expr::Subscript(obj, index, _) => Expr::Subscript(obj, index, ExprContext::Store),
        Expr::Tuple(items, _) => Expr::Tuple(items.into_iter().map(to_store).collect(), ExprContext::Store),
        Expr::List(items, _) => Expr::List(items.into_iter().map(to_store).collect(), ExprContext::Store),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_function_def_with_return() {
        let body = parse("def add(a, b):\n    return a + b\n").unwrap();
        assert!(matches!(&body[0], Stmt::FunctionDef { name, .. } if name == "add"));
    }

    #[test]
    fn parses_if_elif_else_chain() {
        let body = parse("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n").unwrap();
        let Stmt::If { orelse, .. } = &body[0] else { panic!("expected if") };
        assert_eq!(orelse.len(), 1);
        assert!(matches!(&orelse[0], Stmt::If { .. }));
    }

    #[test]
    fn parses_list_comprehension() {
        let body = parse("xs = [i for i in range(3) if i]\n").unwrap();
        let Stmt::Assign(_, value, _) = &body[0] else { panic!("expected assign") };
        assert!(matches!(value, Expr::ListComp(..)));
    }

    #[test]
    fn parses_call_with_keyword_argument() {
        let body = parse("f(1, x=2)\n").unwrap();
        let Stmt::Expr(Expr::Call(_, args, kwargs), _) = &body[0] else { panic!("expected call") };
        assert_eq!(args.len(), 1);
        assert_eq!(kwargs[0].0, "x");
    }

    #[test]
    fn parses_class_with_bases() {
        let body = parse("class Dog(Animal):\n    pass\n").unwrap();
        assert!(matches!(&body[0], Stmt::ClassDef { name, bases, .. } if name == "Dog" && bases.len() == 1));
    }
}
