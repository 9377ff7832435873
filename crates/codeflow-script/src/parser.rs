//! Recursive-descent parser from tokens to [`Module`].
//!
//! Context rules that a grammar alone does not capture (`return` outside a
//! function, `break` outside a loop, duplicate parameters) are rejected here
//! so the interpreter never sees them.

use std::collections::HashSet;
use std::rc::Rc;

use crate::ast::{BinOp, CmpOp, Expr, FunctionDef, Module, Stmt, StmtKind, Target, UnaryOp};
use crate::error::ParseError;
use crate::lexer::{tokenize, Token, TokenKind};

/// Nesting limit for expressions and blocks.
const MAX_NESTING: usize = 200;

/// Parses a complete source unit.
pub fn parse(source: &str) -> Result<Module, ParseError> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).module()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    function_depth: usize,
    loop_depth: usize,
    nesting: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            function_depth: 0,
            loop_depth: 0,
            nesting: 0,
        }
    }

    fn module(mut self) -> Result<Module, ParseError> {
        let mut body = Vec::new();
        while !self.check(&TokenKind::Eof) {
            body.push(self.statement()?);
        }
        Ok(Module { body })
    }

    // -- statements ---------------------------------------------------------

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.current().line;
        match self.current().kind {
            TokenKind::Def => self.function_def(),
            TokenKind::If => {
                self.advance();
                self.if_chain(line)
            }
            TokenKind::While => {
                self.advance();
                let test = self.expression()?;
                let body = self.loop_block()?;
                Ok(Stmt {
                    line,
                    kind: StmtKind::While { test, body },
                })
            }
            TokenKind::For => {
                self.advance();
                let target = self.name()?;
                self.expect(TokenKind::In)?;
                let iter = self.expression()?;
                let body = self.loop_block()?;
                Ok(Stmt {
                    line,
                    kind: StmtKind::For { target, iter, body },
                })
            }
            TokenKind::Indent => Err(self.error_here("unexpected indent")),
            _ => {
                let stmt = self.simple_statement()?;
                self.expect(TokenKind::Newline)?;
                Ok(stmt)
            }
        }
    }

    fn function_def(&mut self) -> Result<Stmt, ParseError> {
        let line = self.current().line;
        self.expect(TokenKind::Def)?;
        let name = self.name()?;
        self.expect(TokenKind::LParen)?;

        let mut params = Vec::new();
        let mut seen = HashSet::new();
        while !self.check(&TokenKind::RParen) {
            let token = self.current().clone();
            let param = self.name()?;
            if !seen.insert(param.clone()) {
                return Err(ParseError::new(
                    format!("duplicate argument '{param}' in function definition"),
                    token.line,
                    token.column,
                ));
            }
            params.push(param);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;

        // Loops do not extend into nested function bodies.
        let saved_loops = std::mem::replace(&mut self.loop_depth, 0);
        self.function_depth += 1;
        let body = self.block();
        self.function_depth -= 1;
        self.loop_depth = saved_loops;
        let mut body = body?;

        if matches!(
            body.first(),
            Some(Stmt {
                kind: StmtKind::Expr(Expr::Str(_)),
                ..
            })
        ) {
            body.remove(0);
        }

        Ok(Stmt {
            line,
            kind: StmtKind::FunctionDef(Rc::new(FunctionDef {
                name,
                params,
                body,
                line,
            })),
        })
    }

    /// Parses the rest of an `if` after the keyword (or an `elif`).
    fn if_chain(&mut self, line: u32) -> Result<Stmt, ParseError> {
        let test = self.expression()?;
        let body = self.block()?;

        let orelse = match self.current().kind {
            TokenKind::Elif => {
                let elif_line = self.current().line;
                self.advance();
                vec![self.if_chain(elif_line)?]
            }
            TokenKind::Else => {
                self.advance();
                self.block()?
            }
            _ => Vec::new(),
        };

        Ok(Stmt {
            line,
            kind: StmtKind::If { test, body, orelse },
        })
    }

    fn loop_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.loop_depth += 1;
        let body = self.block();
        self.loop_depth -= 1;
        body
    }

    /// `: NEWLINE INDENT stmt+ DEDENT`, or a single simple statement on the
    /// same line as the colon.
    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(TokenKind::Colon)?;
        self.enter()?;

        if !self.eat(&TokenKind::Newline) {
            let stmt = self.simple_statement()?;
            self.expect(TokenKind::Newline)?;
            self.leave();
            return Ok(vec![stmt]);
        }

        if !self.eat(&TokenKind::Indent) {
            return Err(self.error_here("expected an indented block"));
        }
        let mut body = Vec::new();
        while !self.eat(&TokenKind::Dedent) {
            if self.check(&TokenKind::Eof) {
                break;
            }
            body.push(self.statement()?);
        }
        self.leave();
        Ok(body)
    }

    fn simple_statement(&mut self) -> Result<Stmt, ParseError> {
        let token = self.current().clone();
        let line = token.line;

        let kind = match token.kind {
            TokenKind::Pass => {
                self.advance();
                StmtKind::Pass
            }
            TokenKind::Break | TokenKind::Continue => {
                if self.loop_depth == 0 {
                    let word = if token.kind == TokenKind::Break { "break" } else { "continue" };
                    return Err(ParseError::new(
                        format!("'{word}' outside loop"),
                        token.line,
                        token.column,
                    ));
                }
                self.advance();
                if token.kind == TokenKind::Break {
                    StmtKind::Break
                } else {
                    StmtKind::Continue
                }
            }
            TokenKind::Return => {
                if self.function_depth == 0 {
                    return Err(ParseError::new(
                        "'return' outside function",
                        token.line,
                        token.column,
                    ));
                }
                self.advance();
                StmtKind::Return(self.optional_expression()?)
            }
            TokenKind::Raise => {
                self.advance();
                StmtKind::Raise(self.optional_expression()?)
            }
            _ => {
                let expr = self.expression()?;
                let assign_op = match self.current().kind {
                    TokenKind::Assign => None,
                    TokenKind::PlusAssign => Some(BinOp::Add),
                    TokenKind::MinusAssign => Some(BinOp::Sub),
                    TokenKind::StarAssign => Some(BinOp::Mul),
                    _ => return Ok(Stmt { line, kind: StmtKind::Expr(expr) }),
                };
                self.advance();
                let target = Self::target(expr).ok_or_else(|| {
                    ParseError::new("cannot assign to expression", token.line, token.column)
                })?;
                let value = self.expression()?;
                match assign_op {
                    None => StmtKind::Assign { target, value },
                    Some(op) => StmtKind::AugAssign { target, op, value },
                }
            }
        };
        Ok(Stmt { line, kind })
    }

    fn target(expr: Expr) -> Option<Target> {
        match expr {
            Expr::Name(name) => Some(Target::Name(name)),
            Expr::Index { object, index } => Some(Target::Index {
                object: *object,
                index: *index,
            }),
            _ => None,
        }
    }

    fn optional_expression(&mut self) -> Result<Option<Expr>, ParseError> {
        if self.check(&TokenKind::Newline) {
            Ok(None)
        } else {
            self.expression().map(Some)
        }
    }

    // -- expressions --------------------------------------------------------

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.enter()?;
        let expr = self.or_expr();
        self.leave();
        expr
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.and_expr()?;
        while self.eat(&TokenKind::Or) {
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.not_expr()?;
        while self.eat(&TokenKind::And) {
            let right = self.not_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&TokenKind::Not) {
            self.enter()?;
            let operand = self.not_expr();
            self.leave();
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand?),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let first = self.arith()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.current().kind {
                TokenKind::EqEq => CmpOp::Eq,
                TokenKind::NotEq => CmpOp::NotEq,
                TokenKind::Lt => CmpOp::Lt,
                TokenKind::Le => CmpOp::Le,
                TokenKind::Gt => CmpOp::Gt,
                TokenKind::Ge => CmpOp::Ge,
                TokenKind::In => CmpOp::In,
                TokenKind::Not if self.peek_kind(1) == Some(&TokenKind::In) => {
                    self.advance();
                    CmpOp::NotIn
                }
                _ => break,
            };
            self.advance();
            rest.push((op, self.arith()?));
        }

        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn arith(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.term()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::SlashSlash => BinOp::FloorDiv,
                TokenKind::Percent => BinOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let negate = match self.current().kind {
            TokenKind::Minus => true,
            TokenKind::Plus => false,
            _ => return self.postfix(),
        };
        self.advance();
        self.enter()?;
        let operand = self.unary();
        self.leave();
        let operand = operand?;
        if !negate {
            return Ok(operand);
        }
        Ok(Expr::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.atom()?;
        loop {
            if self.eat(&TokenKind::LParen) {
                let args = self.sequence(TokenKind::RParen)?;
                expr = Expr::Call {
                    func: Box::new(expr),
                    args,
                };
            } else if self.eat(&TokenKind::LBracket) {
                let index = self.expression()?;
                self.expect(TokenKind::RBracket)?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn atom(&mut self) -> Result<Expr, ParseError> {
        let token = self.current().clone();
        let expr = match token.kind {
            TokenKind::Int(v) => Expr::Int(v),
            TokenKind::Float(v) => Expr::Float(v),
            TokenKind::Str(s) => {
                // Adjacent literals concatenate.
                let mut text = s;
                self.advance();
                while let TokenKind::Str(more) = &self.current().kind {
                    text.push_str(more);
                    self.advance();
                }
                return Ok(Expr::Str(Rc::from(text)));
            }
            TokenKind::Name(name) => Expr::Name(name),
            TokenKind::True => Expr::Bool(true),
            TokenKind::False => Expr::Bool(false),
            TokenKind::None => Expr::None,
            TokenKind::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect(TokenKind::RParen)?;
                return Ok(inner);
            }
            TokenKind::LBracket => {
                self.advance();
                let items = self.sequence(TokenKind::RBracket)?;
                return Ok(Expr::List(items));
            }
            other => {
                return Err(ParseError::new(
                    format!("invalid syntax: unexpected {other}"),
                    token.line,
                    token.column,
                ))
            }
        };
        self.advance();
        Ok(expr)
    }

    /// Comma-separated expressions up to and including `close`. A trailing
    /// comma is allowed.
    fn sequence(&mut self, close: TokenKind) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        while !self.check(&close) {
            items.push(self.expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }

    // -- token helpers ------------------------------------------------------

    fn current(&self) -> &Token {
        // The lexer always terminates the stream with `Eof`.
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn peek_kind(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.eat(&kind) {
            return Ok(());
        }
        let found = &self.current().kind;
        Err(self.error_here(&format!("expected {kind}, found {found}")))
    }

    fn name(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Name(name) = &self.current().kind {
            let name = name.clone();
            self.advance();
            return Ok(name);
        }
        let found = &self.current().kind;
        Err(self.error_here(&format!("expected a name, found {found}")))
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            return Err(self.error_here("too many nested expressions or blocks"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting = self.nesting.saturating_sub(1);
    }

    fn error_here(&self, message: &str) -> ParseError {
        let token = self.current();
        ParseError::new(message, token.line, token.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Module {
        parse(source).unwrap_or_else(|e| panic!("parse failed: {e}"))
    }

    #[test]
    fn function_with_docstring_drops_it() {
        let module = parse_ok("def f(a, b):\n    \"\"\"Adds.\"\"\"\n    return a + b\n");
        let StmtKind::FunctionDef(def) = &module.body[0].kind else {
            panic!("expected def");
        };
        assert_eq!(def.name, "f");
        assert_eq!(def.params, vec!["a", "b"]);
        assert_eq!(def.body.len(), 1);
        assert_eq!(def.body[0].line, 3);
        assert!(matches!(def.body[0].kind, StmtKind::Return(Some(_))));
    }

    #[test]
    fn elif_nests_in_orelse() {
        let module = parse_ok("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n");
        let StmtKind::If { orelse, .. } = &module.body[0].kind else {
            panic!("expected if");
        };
        assert_eq!(orelse.len(), 1);
        assert_eq!(orelse[0].line, 3);
        let StmtKind::If { orelse: inner, .. } = &orelse[0].kind else {
            panic!("expected nested if");
        };
        assert_eq!(inner[0].line, 6);
    }

    #[test]
    fn precedence_binds_multiplication_tighter() {
        let module = parse_ok("x = 1 + 2 * 3\n");
        let StmtKind::Assign { value, .. } = &module.body[0].kind else {
            panic!("expected assignment");
        };
        assert_eq!(
            *value,
            Expr::Binary {
                op: BinOp::Add,
                left: Box::new(Expr::Int(1)),
                right: Box::new(Expr::Binary {
                    op: BinOp::Mul,
                    left: Box::new(Expr::Int(2)),
                    right: Box::new(Expr::Int(3)),
                }),
            }
        );
    }

    #[test]
    fn chained_comparison_and_not_in() {
        let module = parse_ok("ok = 0 <= i < n and x not in seen\n");
        let StmtKind::Assign { value: Expr::And(left, right), .. } = &module.body[0].kind else {
            panic!("expected and");
        };
        let Expr::Compare { rest, .. } = left.as_ref() else {
            panic!("expected comparison");
        };
        assert_eq!(rest.iter().map(|(op, _)| *op).collect::<Vec<_>>(), [CmpOp::Le, CmpOp::Lt]);
        let Expr::Compare { rest, .. } = right.as_ref() else {
            panic!("expected comparison");
        };
        assert_eq!(rest[0].0, CmpOp::NotIn);
    }

    #[test]
    fn index_assignment_and_aug_assign() {
        let module = parse_ok("memo[k] = v\ntotal += memo[k]\n");
        assert!(matches!(
            module.body[0].kind,
            StmtKind::Assign { target: Target::Index { .. }, .. }
        ));
        assert!(matches!(
            module.body[1].kind,
            StmtKind::AugAssign { op: BinOp::Add, target: Target::Name(_), .. }
        ));
    }

    #[test]
    fn inline_suite_is_accepted() {
        let module = parse_ok("def f(n):\n    if n < 2: return n\n    return f(n - 1)\n");
        let StmtKind::FunctionDef(def) = &module.body[0].kind else {
            panic!("expected def");
        };
        assert_eq!(def.body.len(), 2);
    }

    #[test]
    fn context_errors() {
        let err = parse("break\n").unwrap_err();
        assert_eq!(err.message, "'break' outside loop");

        let err = parse("return 1\n").unwrap_err();
        assert_eq!(err.message, "'return' outside function");

        // A loop around a def does not license `break` inside it.
        let err = parse("while True:\n    def g():\n        break\n").unwrap_err();
        assert_eq!(err.message, "'break' outside loop");
        assert_eq!(err.line, 3);

        let err = parse("def f(a, a):\n    pass\n").unwrap_err();
        assert!(err.message.contains("duplicate argument 'a'"));
    }

    #[test]
    fn invalid_assignment_target() {
        let err = parse("f() = 1\n").unwrap_err();
        assert_eq!(err.message, "cannot assign to expression");
    }

    #[test]
    fn missing_block_is_reported() {
        let err = parse("def f():\nreturn 1\n").unwrap_err();
        assert_eq!(err.message, "expected an indented block");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn deep_nesting_is_rejected_not_overflowed() {
        let source = format!("x = {}1{}\n", "(".repeat(500), ")".repeat(500));
        let err = parse(&source).unwrap_err();
        assert!(err.message.contains("too many nested"));
    }
}
