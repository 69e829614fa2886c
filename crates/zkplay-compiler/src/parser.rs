//! Recursive-descent parser
//!
//! Expressions use precedence climbing with the operator table of Rust.
//! On a syntax error inside a block the parser records a diagnostic, skips to
//! the next statement boundary and carries on; at top level it skips to the
//! next item keyword. All diagnostics are returned together.

use crate::ast::*;
use crate::diagnostic::{Diagnostic, Span};
use crate::lexer::{tokenize, Token, TokenKind};
use tracing::debug;

type PResult<T> = std::result::Result<T, Diagnostic>;

/// Deepest nesting of expressions, blocks, types and patterns the parser
/// accepts. Later passes recurse over the tree, so this bounds their stack use.
pub const MAX_NESTING: usize = 128;

/// Parses a whole source file
///
/// # Examples
///
/// ```
/// use zkplay_compiler::parse;
///
/// let program = parse("fn main(x: Field, y: pub Field) { assert(x * x == y); }").unwrap();
/// assert_eq!(program.items.len(), 1);
///
/// let errors = parse("fn main( { let = ; }").unwrap_err();
/// assert!(!errors.is_empty());
/// ```
pub fn parse(source: &str) -> Result<Program, Vec<Diagnostic>> {
    let (tokens, mut diagnostics) = tokenize(source);
    let mut parser = Parser {
        tokens,
        pos: 0,
        next_id: 0,
        depth: 0,
        no_struct_literal: false,
        diagnostics: Vec::new(),
    };
    let items = parser.parse_items();
    diagnostics.append(&mut parser.diagnostics);
    debug!(items = items.len(), errors = diagnostics.len(), "parsed source");
    if diagnostics.is_empty() {
        Ok(Program { items, expr_count: parser.next_id })
    } else {
        Err(diagnostics)
    }
}

fn infix_precedence(kind: &TokenKind) -> Option<(u8, BinaryOp)> {
    let entry = match kind {
        TokenKind::OrOr => (1, BinaryOp::Or),
        TokenKind::AndAnd => (2, BinaryOp::And),
        TokenKind::EqEq => (3, BinaryOp::Eq),
        TokenKind::NotEq => (3, BinaryOp::Ne),
        TokenKind::Lt => (3, BinaryOp::Lt),
        TokenKind::Le => (3, BinaryOp::Le),
        TokenKind::Gt => (3, BinaryOp::Gt),
        TokenKind::Ge => (3, BinaryOp::Ge),
        TokenKind::Pipe => (4, BinaryOp::BitOr),
        TokenKind::Caret => (5, BinaryOp::BitXor),
        TokenKind::Amp => (6, BinaryOp::BitAnd),
        TokenKind::Shl => (7, BinaryOp::Shl),
        TokenKind::Shr => (7, BinaryOp::Shr),
        TokenKind::Plus => (8, BinaryOp::Add),
        TokenKind::Minus => (8, BinaryOp::Sub),
        TokenKind::Star => (9, BinaryOp::Mul),
        TokenKind::Slash => (9, BinaryOp::Div),
        TokenKind::Percent => (9, BinaryOp::Mod),
        _ => return None,
    };
    Some(entry)
}

/// Binding power of `as`, tighter than every binary operator
const CAST_PRECEDENCE: u8 = 10;

fn compound_assign_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::PlusEq => Some(BinaryOp::Add),
        TokenKind::MinusEq => Some(BinaryOp::Sub),
        TokenKind::StarEq => Some(BinaryOp::Mul),
        TokenKind::SlashEq => Some(BinaryOp::Div),
        _ => None,
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    next_id: ExprId,
    /// Current nesting, bounded by [`MAX_NESTING`]
    depth: usize,
    /// Set while parsing `if` conditions and `for` ranges, where `{` opens the body
    no_struct_literal: bool,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> &TokenKind {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn span(&self) -> Span {
        self.tokens[self.pos.min(self.tokens.len() - 1)].span
    }

    fn prev_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> PResult<Span> {
        if self.at(kind) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    fn unexpected(&self, expected: &str) -> Diagnostic {
        Diagnostic::syntax(self.span(), format!("expected {}, found {}", expected, self.peek()))
    }

    fn expect_ident(&mut self) -> PResult<Ident> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                let span = self.advance().span;
                Ok(Ident { name, span })
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Enters one more level of nesting
    ///
    /// Levels entered here are left again by the caller, except on error:
    /// recovery points reset the depth instead.
    fn descend(&mut self) -> PResult<()> {
        if self.depth >= MAX_NESTING {
            let message = format!("nesting exceeds the limit of {} levels", MAX_NESTING);
            return Err(Diagnostic::resource_exceeded(self.span(), message));
        }
        self.depth += 1;
        Ok(())
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        self.descend()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn make_expr(&mut self, kind: ExprKind, span: Span) -> Expr {
        let id = self.next_id;
        self.next_id += 1;
        Expr { id, kind, span }
    }

    // ------------------------------------------------------------------
    // Recovery
    // ------------------------------------------------------------------

    fn recover_item(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                TokenKind::Eof => return,
                TokenKind::Fn | TokenKind::Struct | TokenKind::Global | TokenKind::Use
                    if depth == 0 =>
                {
                    return
                }
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.advance();
        }
    }

    /// Skips to just after the next `;`, or to the `}` closing the current block
    fn recover_statement(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                TokenKind::Eof => return,
                TokenKind::Semi if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::Let | TokenKind::For | TokenKind::Assert | TokenKind::AssertEq
                    if depth == 0 =>
                {
                    return
                }
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                _ => {}
            }
            self.advance();
        }
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    fn parse_items(&mut self) -> Vec<Item> {
        let mut items = Vec::new();
        while !self.at(&TokenKind::Eof) {
            let before = self.pos;
            match self.parse_item() {
                Ok(item) => items.push(item),
                Err(diagnostic) => {
                    self.diagnostics.push(diagnostic);
                    self.depth = 0;
                    if self.pos == before {
                        self.advance();
                    }
                    self.recover_item();
                }
            }
        }
        items
    }

    fn parse_item(&mut self) -> PResult<Item> {
        match self.peek() {
            TokenKind::Pub if self.peek_at(1) == &TokenKind::Fn => {
                self.advance();
                self.parse_function().map(Item::Function)
            }
            TokenKind::Fn => self.parse_function().map(Item::Function),
            TokenKind::Struct => self.parse_struct().map(Item::Struct),
            TokenKind::Global => self.parse_global().map(Item::Global),
            TokenKind::Use => self.parse_use().map(Item::Use),
            _ => Err(self.unexpected("'fn', 'struct', 'global' or 'use'")),
        }
    }

    fn parse_function(&mut self) -> PResult<Function> {
        let start = self.expect(&TokenKind::Fn)?;
        let name = self.expect_ident()?;
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.at(&TokenKind::RParen) {
            let param_name = self.expect_ident()?;
            self.expect(&TokenKind::Colon)?;
            let public = self.eat(&TokenKind::Pub);
            let ty = self.parse_type()?;
            let span = param_name.span.to(ty.span);
            params.push(Param { name: param_name, ty, public, span });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        let return_type = if self.eat(&TokenKind::Arrow) {
            let public = self.eat(&TokenKind::Pub);
            Some(ReturnType { ty: self.parse_type()?, public })
        } else {
            None
        };
        let body = self.parse_block()?;
        let span = start.to(body.span);
        Ok(Function { name, params, return_type, body, span })
    }

    fn parse_struct(&mut self) -> PResult<StructDef> {
        let start = self.expect(&TokenKind::Struct)?;
        let name = self.expect_ident()?;
        self.expect(&TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            let field = self.expect_ident()?;
            self.expect(&TokenKind::Colon)?;
            let ty = self.parse_type()?;
            fields.push((field, ty));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(&TokenKind::RBrace)?;
        Ok(StructDef { name, fields, span: start.to(end) })
    }

    fn parse_global(&mut self) -> PResult<GlobalDef> {
        let start = self.expect(&TokenKind::Global)?;
        let name = self.expect_ident()?;
        let ty = if self.eat(&TokenKind::Colon) { Some(self.parse_type()?) } else { None };
        self.expect(&TokenKind::Eq)?;
        let value = self.parse_expr()?;
        let end = self.expect(&TokenKind::Semi)?;
        Ok(GlobalDef { name, ty, value, span: start.to(end) })
    }

    fn parse_use(&mut self) -> PResult<UseDecl> {
        let start = self.expect(&TokenKind::Use)?;
        let mut path = vec![self.expect_ident()?];
        while self.eat(&TokenKind::ColonColon) {
            path.push(self.expect_ident()?);
        }
        let end = self.expect(&TokenKind::Semi)?;
        Ok(UseDecl { path, span: start.to(end) })
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn parse_type(&mut self) -> PResult<TypeExpr> {
        self.nested(Self::parse_type_inner)
    }

    fn parse_type_inner(&mut self) -> PResult<TypeExpr> {
        let start = self.span();
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                let kind = match name.as_str() {
                    "Field" => TypeExprKind::Field,
                    "bool" => TypeExprKind::Bool,
                    _ => integer_type(&name).unwrap_or(TypeExprKind::Named(name)),
                };
                Ok(TypeExpr { kind, span: start })
            }
            TokenKind::LBracket => {
                self.advance();
                let element = self.parse_type()?;
                self.expect(&TokenKind::Semi)?;
                let length = self.parse_expr()?;
                let end = self.expect(&TokenKind::RBracket)?;
                let kind = TypeExprKind::Array(Box::new(element), Box::new(length));
                Ok(TypeExpr { kind, span: start.to(end) })
            }
            TokenKind::LParen => {
                self.advance();
                let mut elements = Vec::new();
                while !self.at(&TokenKind::RParen) {
                    elements.push(self.parse_type()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                let end = self.expect(&TokenKind::RParen)?;
                Ok(TypeExpr { kind: TypeExprKind::Tuple(elements), span: start.to(end) })
            }
            _ => Err(self.unexpected("a type")),
        }
    }

    // ------------------------------------------------------------------
    // Blocks and statements
    // ------------------------------------------------------------------

    fn parse_block(&mut self) -> PResult<Block> {
        self.nested(Self::parse_block_body)
    }

    fn parse_block_body(&mut self) -> PResult<Block> {
        let start = self.expect(&TokenKind::LBrace)?;
        let saved = std::mem::replace(&mut self.no_struct_literal, false);
        let mut stmts = Vec::new();
        let mut tail = None;
        while !self.at(&TokenKind::RBrace) && !self.at(&TokenKind::Eof) {
            let (before, depth) = (self.pos, self.depth);
            match self.parse_stmt() {
                Ok(StmtOrTail::Stmt(stmt)) => stmts.push(stmt),
                Ok(StmtOrTail::Tail(expr)) => {
                    tail = Some(Box::new(expr));
                    break;
                }
                Err(diagnostic) => {
                    self.diagnostics.push(diagnostic);
                    self.depth = depth;
                    if self.pos == before && !self.at(&TokenKind::RBrace) {
                        self.advance();
                    }
                    self.recover_statement();
                }
            }
        }
        self.no_struct_literal = saved;
        let end = self.expect(&TokenKind::RBrace)?;
        Ok(Block { stmts, tail, span: start.to(end) })
    }

    fn parse_stmt(&mut self) -> PResult<StmtOrTail> {
        let start = self.span();
        let kind = match self.peek() {
            TokenKind::Let => {
                self.advance();
                let pattern = self.parse_pattern()?;
                let ty = if self.eat(&TokenKind::Colon) { Some(self.parse_type()?) } else { None };
                self.expect(&TokenKind::Eq)?;
                let value = self.parse_expr()?;
                self.expect(&TokenKind::Semi)?;
                StmtKind::Let { pattern, ty, value }
            }
            TokenKind::For => {
                self.advance();
                let var = self.expect_ident()?;
                self.expect(&TokenKind::In)?;
                let saved = std::mem::replace(&mut self.no_struct_literal, true);
                let range = self.parse_range();
                self.no_struct_literal = saved;
                let (start_expr, end_expr) = range?;
                let body = self.parse_block()?;
                StmtKind::For { var, start: start_expr, end: end_expr, body }
            }
            TokenKind::Assert => {
                self.advance();
                self.expect(&TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                let message = self.parse_assert_message()?;
                self.expect(&TokenKind::RParen)?;
                self.expect(&TokenKind::Semi)?;
                StmtKind::Assert { cond, message }
            }
            TokenKind::AssertEq => {
                self.advance();
                self.expect(&TokenKind::LParen)?;
                let left = self.parse_expr()?;
                self.expect(&TokenKind::Comma)?;
                let right = self.parse_expr()?;
                let message = self.parse_assert_message()?;
                self.expect(&TokenKind::RParen)?;
                self.expect(&TokenKind::Semi)?;
                StmtKind::AssertEq { left, right, message }
            }
            _ => {
                let expr = self.parse_expr()?;
                if self.at(&TokenKind::Eq) || compound_assign_op(self.peek()).is_some() {
                    let op = compound_assign_op(&self.advance().kind);
                    let value = self.parse_expr()?;
                    self.expect(&TokenKind::Semi)?;
                    StmtKind::Assign { target: expr, op, value }
                } else if self.eat(&TokenKind::Semi) {
                    StmtKind::Expr(expr)
                } else if self.at(&TokenKind::RBrace) {
                    return Ok(StmtOrTail::Tail(expr));
                } else if expr.is_block_like() {
                    StmtKind::Expr(expr)
                } else {
                    return Err(self.unexpected("';'"));
                }
            }
        };
        let span = start.to(self.prev_span());
        Ok(StmtOrTail::Stmt(Stmt { kind, span }))
    }

    fn parse_assert_message(&mut self) -> PResult<Option<String>> {
        if !self.eat(&TokenKind::Comma) {
            return Ok(None);
        }
        match self.peek().clone() {
            TokenKind::Str(text) => {
                self.advance();
                Ok(Some(text))
            }
            _ => Err(self.unexpected("a string message")),
        }
    }

    fn parse_range(&mut self) -> PResult<(Expr, Expr)> {
        let start = self.parse_expr()?;
        self.expect(&TokenKind::DotDot)?;
        let end = self.parse_expr()?;
        Ok((start, end))
    }

    fn parse_pattern(&mut self) -> PResult<Pattern> {
        self.nested(Self::parse_pattern_inner)
    }

    fn parse_pattern_inner(&mut self) -> PResult<Pattern> {
        match self.peek().clone() {
            TokenKind::Mut => {
                self.advance();
                let name = self.expect_ident()?;
                Ok(Pattern::Binding { name, mutable: true })
            }
            TokenKind::Ident(name) if name == "_" => {
                let span = self.advance().span;
                Ok(Pattern::Wildcard(span))
            }
            TokenKind::Ident(_) => {
                let name = self.expect_ident()?;
                Ok(Pattern::Binding { name, mutable: false })
            }
            TokenKind::LParen => {
                let start = self.advance().span;
                let mut elements = Vec::new();
                while !self.at(&TokenKind::RParen) {
                    elements.push(self.parse_pattern()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                let end = self.expect(&TokenKind::RParen)?;
                Ok(Pattern::Tuple(elements, start.to(end)))
            }
            _ => Err(self.unexpected("a pattern")),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, min_precedence: u8) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        // Each operator applied in this loop deepens the left operand
        let mut chain = 0;
        loop {
            if self.at(&TokenKind::As) {
                if CAST_PRECEDENCE < min_precedence {
                    break;
                }
                self.advance();
                self.descend()?;
                chain += 1;
                let ty = self.parse_type()?;
                let span = lhs.span.to(ty.span);
                lhs = self.make_expr(ExprKind::Cast { expr: Box::new(lhs), ty }, span);
                continue;
            }
            let Some((precedence, op)) = infix_precedence(self.peek()) else {
                break;
            };
            if precedence < min_precedence {
                break;
            }
            self.advance();
            self.descend()?;
            chain += 1;
            let rhs = self.parse_binary(precedence + 1)?;
            let span = lhs.span.to(rhs.span);
            let kind = ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
            lhs = self.make_expr(kind, span);
        }
        self.depth -= chain;
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        self.nested(Self::parse_prefixed)
    }

    fn parse_prefixed(&mut self) -> PResult<Expr> {
        let op = match self.peek() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        let start = self.advance().span;
        let operand = self.parse_unary()?;
        let span = start.to(operand.span);
        Ok(self.make_expr(ExprKind::Unary { op, operand: Box::new(operand) }, span))
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        let mut chain = 0;
        loop {
            if matches!(self.peek(), TokenKind::LBracket | TokenKind::Dot) {
                self.descend()?;
                chain += 1;
            }
            match self.peek().clone() {
                TokenKind::LBracket => {
                    self.advance();
                    let saved = std::mem::replace(&mut self.no_struct_literal, false);
                    let index = self.parse_expr();
                    self.no_struct_literal = saved;
                    let index = index?;
                    let end = self.expect(&TokenKind::RBracket)?;
                    let span = expr.span.to(end);
                    let kind = ExprKind::Index { base: Box::new(expr), index: Box::new(index) };
                    expr = self.make_expr(kind, span);
                }
                TokenKind::Dot => {
                    self.advance();
                    match self.peek().clone() {
                        TokenKind::Int(text) => {
                            let token = self.advance();
                            let index = text.parse::<usize>().map_err(|_| {
                                Diagnostic::syntax(token.span, "invalid tuple index")
                            })?;
                            let span = expr.span.to(token.span);
                            let kind = ExprKind::TupleIndex { base: Box::new(expr), index };
                            expr = self.make_expr(kind, span);
                        }
                        _ => {
                            let name = self.expect_ident()?;
                            if self.at(&TokenKind::LParen) {
                                let (args, end) = self.parse_args()?;
                                let span = expr.span.to(end);
                                let receiver = Box::new(expr);
                                let kind = ExprKind::MethodCall { receiver, method: name, args };
                                expr = self.make_expr(kind, span);
                            } else {
                                let span = expr.span.to(name.span);
                                let kind = ExprKind::Field { base: Box::new(expr), field: name };
                                expr = self.make_expr(kind, span);
                            }
                        }
                    }
                }
                _ => break,
            }
        }
        self.depth -= chain;
        Ok(expr)
    }

    fn parse_args(&mut self) -> PResult<(Vec<Expr>, Span)> {
        self.expect(&TokenKind::LParen)?;
        let saved = std::mem::replace(&mut self.no_struct_literal, false);
        let mut args = Vec::new();
        let result = loop {
            if self.at(&TokenKind::RParen) {
                break Ok(());
            }
            match self.parse_expr() {
                Ok(arg) => args.push(arg),
                Err(diagnostic) => break Err(diagnostic),
            }
            if !self.eat(&TokenKind::Comma) {
                break Ok(());
            }
        };
        self.no_struct_literal = saved;
        result?;
        let end = self.expect(&TokenKind::RParen)?;
        Ok((args, end))
    }

    /// After `Name {`: either `}` or `ident :` must follow for a struct literal
    fn struct_literal_ahead(&self) -> bool {
        if self.no_struct_literal || self.peek() != &TokenKind::LBrace {
            return false;
        }
        match (self.peek_at(1), self.peek_at(2)) {
            (TokenKind::RBrace, _) => true,
            (TokenKind::Ident(_), TokenKind::Colon) => true,
            _ => false,
        }
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let start = self.span();
        match self.peek().clone() {
            TokenKind::Int(text) => {
                self.advance();
                Ok(self.make_expr(ExprKind::Int(text), start))
            }
            TokenKind::True | TokenKind::False => {
                let value = self.advance().kind == TokenKind::True;
                Ok(self.make_expr(ExprKind::Bool(value), start))
            }
            TokenKind::Ident(_) => self.parse_path_expr(),
            TokenKind::LParen => {
                self.advance();
                let saved = std::mem::replace(&mut self.no_struct_literal, false);
                let result = self.parse_paren_tail(start);
                self.no_struct_literal = saved;
                result
            }
            TokenKind::LBracket => {
                self.advance();
                let saved = std::mem::replace(&mut self.no_struct_literal, false);
                let result = self.parse_array_tail(start);
                self.no_struct_literal = saved;
                result
            }
            TokenKind::LBrace => {
                let block = self.parse_block()?;
                let span = block.span;
                Ok(self.make_expr(ExprKind::Block(block), span))
            }
            TokenKind::If => self.parse_if(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_path_expr(&mut self) -> PResult<Expr> {
        let mut path = vec![self.expect_ident()?];
        while self.eat(&TokenKind::ColonColon) {
            path.push(self.expect_ident()?);
        }
        let start = path[0].span;
        if self.at(&TokenKind::LParen) {
            let (args, end) = self.parse_args()?;
            return Ok(self.make_expr(ExprKind::Call { path, args }, start.to(end)));
        }
        if path.len() == 1 && self.struct_literal_ahead() {
            self.advance();
            let mut fields = Vec::new();
            while !self.at(&TokenKind::RBrace) {
                let field = self.expect_ident()?;
                self.expect(&TokenKind::Colon)?;
                let value = self.parse_expr()?;
                fields.push((field, value));
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            let end = self.expect(&TokenKind::RBrace)?;
            let name = path.remove(0);
            return Ok(self.make_expr(ExprKind::StructLit { name, fields }, start.to(end)));
        }
        let end = path[path.len() - 1].span;
        Ok(self.make_expr(ExprKind::Path(path), start.to(end)))
    }

    fn parse_paren_tail(&mut self, start: Span) -> PResult<Expr> {
        let mut elements = Vec::new();
        let mut trailing_comma = false;
        while !self.at(&TokenKind::RParen) {
            elements.push(self.parse_expr()?);
            trailing_comma = self.eat(&TokenKind::Comma);
            if !trailing_comma {
                break;
            }
        }
        let end = self.expect(&TokenKind::RParen)?;
        if elements.len() == 1 && !trailing_comma {
            let mut inner = elements.remove(0);
            inner.span = start.to(end);
            return Ok(inner);
        }
        if elements.is_empty() {
            return Err(Diagnostic::syntax(start.to(end), "the unit value '()' is not supported"));
        }
        Ok(self.make_expr(ExprKind::Tuple(elements), start.to(end)))
    }

    fn parse_array_tail(&mut self, start: Span) -> PResult<Expr> {
        if self.at(&TokenKind::RBracket) {
            let end = self.advance().span;
            return Ok(self.make_expr(ExprKind::Array(Vec::new()), start.to(end)));
        }
        let first = self.parse_expr()?;
        if self.eat(&TokenKind::Semi) {
            let count = self.parse_expr()?;
            let end = self.expect(&TokenKind::RBracket)?;
            let kind = ExprKind::Repeat { value: Box::new(first), count: Box::new(count) };
            return Ok(self.make_expr(kind, start.to(end)));
        }
        let mut elements = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.at(&TokenKind::RBracket) {
                break;
            }
            elements.push(self.parse_expr()?);
        }
        let end = self.expect(&TokenKind::RBracket)?;
        Ok(self.make_expr(ExprKind::Array(elements), start.to(end)))
    }

    fn parse_if(&mut self) -> PResult<Expr> {
        self.nested(Self::parse_if_chain)
    }

    fn parse_if_chain(&mut self) -> PResult<Expr> {
        let start = self.expect(&TokenKind::If)?;
        let saved = std::mem::replace(&mut self.no_struct_literal, true);
        let cond = self.parse_expr();
        self.no_struct_literal = saved;
        let cond = cond?;
        let then_branch = self.parse_block()?;
        let mut end = then_branch.span;
        let else_branch = if self.eat(&TokenKind::Else) {
            let branch = if self.at(&TokenKind::If) {
                self.parse_if()?
            } else {
                let block = self.parse_block()?;
                let span = block.span;
                self.make_expr(ExprKind::Block(block), span)
            };
            end = branch.span;
            Some(Box::new(branch))
        } else {
            None
        };
        let kind = ExprKind::If { cond: Box::new(cond), then_branch, else_branch };
        Ok(self.make_expr(kind, start.to(end)))
    }
}

enum StmtOrTail {
    Stmt(Stmt),
    Tail(Expr),
}

fn integer_type(name: &str) -> Option<TypeExprKind> {
    let (signed, digits) = match name.as_bytes().first()? {
        b'u' => (false, &name[1..]),
        b'i' => (true, &name[1..]),
        _ => return None,
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let width: u32 = digits.parse().ok()?;
    Some(if signed { TypeExprKind::SInt(width) } else { TypeExprKind::UInt(width) })
}
