//! Type checking and name resolution
//!
//! Assigns a [`Type`] to every expression, resolves identifiers, calls and
//! `use` aliases, and rejects programs that cannot be lowered: mixed-width
//! arithmetic, ordering comparisons on `Field`, non-constant loop bounds and
//! recursion. Errors are collected rather than raised so one pass reports as
//! many of them as possible.

use crate::ast::*;
use crate::builtins::BuiltinRegistry;
use crate::config::CompilerConfig;
use crate::diagnostic::{Diagnostic, Span};
use crate::types::{literal_fits, parse_literal, StructType, Type, MAX_INTEGER_WIDTH};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// What a call expression refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    Function(String),
    /// Fully qualified builtin name
    Builtin(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnSignature {
    pub params: Vec<Type>,
    pub ret: Type,
}

#[derive(Debug, Clone)]
struct FunctionInfo {
    item: usize,
    signature: FnSignature,
}

#[derive(Debug, Clone)]
struct GlobalInfo {
    item: usize,
    ty: Option<Type>,
    value: Option<i128>,
}

/// A program that passed type checking, plus everything resolution learned
#[derive(Debug, Clone)]
pub struct TypedProgram {
    pub program: Program,
    types: Vec<Option<Type>>,
    calls: BTreeMap<ExprId, CallTarget>,
    functions: BTreeMap<String, FunctionInfo>,
    globals: BTreeMap<String, GlobalInfo>,
    structs: BTreeMap<String, Arc<StructType>>,
    pub entry: String,
    pub warnings: Vec<Diagnostic>,
    /// Builtins referenced by the program, with the versions resolved against
    pub builtins: BTreeMap<String, u32>,
}

impl TypedProgram {
    pub fn type_of(&self, id: ExprId) -> Option<&Type> {
        self.types.get(id).and_then(Option::as_ref)
    }

    pub fn call_target(&self, id: ExprId) -> Option<&CallTarget> {
        self.calls.get(&id)
    }

    pub fn function(&self, name: &str) -> Option<(&Function, &FnSignature)> {
        let info = self.functions.get(name)?;
        match self.program.items.get(info.item)? {
            Item::Function(function) => Some((function, &info.signature)),
            _ => None,
        }
    }

    pub fn entry_function(&self) -> Option<(&Function, &FnSignature)> {
        self.function(&self.entry)
    }

    pub fn global(&self, name: &str) -> Option<(&GlobalDef, &Type)> {
        let info = self.globals.get(name)?;
        match (self.program.items.get(info.item)?, info.ty.as_ref()) {
            (Item::Global(global), Some(ty)) => Some((global, ty)),
            _ => None,
        }
    }

    pub fn struct_type(&self, name: &str) -> Option<&Arc<StructType>> {
        self.structs.get(name)
    }
}

/// Type checks `program` against the builtins in `registry`
pub fn check(
    program: Program,
    registry: &BuiltinRegistry,
    config: &CompilerConfig,
) -> Result<TypedProgram, Vec<Diagnostic>> {
    let mut checker = Checker::new(&program, registry, config);
    checker.run();

    let Checker { types, calls, functions, globals, structs, errors, warnings, builtins, .. } =
        checker;
    debug!(errors = errors.len(), warnings = warnings.len(), "type checked program");
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(TypedProgram {
        program,
        types,
        calls,
        functions,
        globals,
        structs,
        entry: config.entry.clone(),
        warnings: if config.warnings { warnings } else { Vec::new() },
        builtins,
    })
}

#[derive(Debug)]
struct Local {
    name: String,
    /// `None` once an error made the type unknowable
    ty: Option<Type>,
    mutable: bool,
    comptime: bool,
    used: bool,
    span: Span,
}

struct Checker<'a> {
    program: &'a Program,
    registry: &'a BuiltinRegistry,
    config: &'a CompilerConfig,
    types: Vec<Option<Type>>,
    calls: BTreeMap<ExprId, CallTarget>,
    functions: BTreeMap<String, FunctionInfo>,
    globals: BTreeMap<String, GlobalInfo>,
    structs: BTreeMap<String, Arc<StructType>>,
    aliases: BTreeMap<String, Vec<String>>,
    scopes: Vec<Vec<Local>>,
    call_graph: BTreeMap<String, Vec<(String, Span)>>,
    current_fn: Option<String>,
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
    builtins: BTreeMap<String, u32>,
}

impl<'a> Checker<'a> {
    fn new(
        program: &'a Program,
        registry: &'a BuiltinRegistry,
        config: &'a CompilerConfig,
    ) -> Self {
        Self {
            program,
            registry,
            config,
            types: vec![None; program.expr_count],
            calls: BTreeMap::new(),
            functions: BTreeMap::new(),
            globals: BTreeMap::new(),
            structs: BTreeMap::new(),
            aliases: BTreeMap::new(),
            scopes: Vec::new(),
            call_graph: BTreeMap::new(),
            current_fn: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            builtins: BTreeMap::new(),
        }
    }

    fn error(&mut self, span: Span, message: impl Into<String>) {
        self.errors.push(Diagnostic::type_error(span, message));
    }

    fn run(&mut self) {
        let program = self.program;
        self.collect_uses(program);
        self.check_globals(program);
        self.resolve_structs(program);
        self.collect_signatures(program);

        for (index, item) in program.items.iter().enumerate() {
            let Item::Function(function) = item else { continue };
            // Later duplicates are reported while collecting signatures
            if self.functions.get(&function.name.name).map(|info| info.item) == Some(index) {
                self.check_function(function);
            }
        }

        if !self.functions.contains_key(&self.config.entry) {
            let message = format!("entry function `{}` not found", self.config.entry);
            self.error(Span::default(), message);
        }
        self.check_recursion();
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    fn collect_uses(&mut self, program: &Program) {
        for item in &program.items {
            let Item::Use(decl) = item else { continue };
            let segments: Vec<String> = decl.path.iter().map(|s| s.name.clone()).collect();
            if segments.first().map(String::as_str) != Some("std") || segments.len() < 2 {
                self.error(decl.span, "only `std` paths can be imported");
                continue;
            }
            if let Some(alias) = decl.alias() {
                if self.aliases.insert(alias.name.clone(), segments).is_some() {
                    self.error(alias.span, format!("`{}` is imported more than once", alias));
                }
            }
        }
    }

    fn resolve_structs(&mut self, program: &Program) {
        let mut defs: BTreeMap<&str, &StructDef> = BTreeMap::new();
        for item in &program.items {
            if let Item::Struct(def) = item {
                if defs.insert(def.name.name.as_str(), def).is_some() {
                    let message = format!("struct `{}` is defined more than once", def.name);
                    self.error(def.name.span, message);
                }
            }
        }
        for name in defs.keys().copied().collect::<Vec<_>>() {
            let mut stack = Vec::new();
            self.resolve_struct(name, &defs, &mut stack);
        }
    }

    fn resolve_struct<'p>(
        &mut self,
        name: &'p str,
        defs: &BTreeMap<&'p str, &'p StructDef>,
        stack: &mut Vec<&'p str>,
    ) -> Option<Arc<StructType>> {
        if let Some(resolved) = self.structs.get(name) {
            return Some(resolved.clone());
        }
        let def = *defs.get(name)?;
        if stack.contains(&name) {
            self.error(def.name.span, format!("struct `{}` contains itself", name));
            return None;
        }
        stack.push(name);
        let mut fields = Vec::new();
        let mut ok = true;
        for (field, ty) in &def.fields {
            if fields.iter().any(|(existing, _)| existing == &field.name) {
                self.error(field.span, format!("field `{}` is declared more than once", field));
                ok = false;
                continue;
            }
            match self.resolve_field_type(ty, defs, stack) {
                Some(resolved) => fields.push((field.name.clone(), resolved)),
                None => ok = false,
            }
        }
        stack.pop();
        if !ok {
            return None;
        }
        let resolved = Arc::new(StructType { name: name.to_string(), fields });
        self.structs.insert(name.to_string(), resolved.clone());
        Some(resolved)
    }

    fn resolve_field_type<'p>(
        &mut self,
        ty: &TypeExpr,
        defs: &BTreeMap<&'p str, &'p StructDef>,
        stack: &mut Vec<&'p str>,
    ) -> Option<Type> {
        match &ty.kind {
            TypeExprKind::Named(inner) => match defs.get_key_value(inner.as_str()) {
                Some((key, _)) => self.resolve_struct(key, defs, stack).map(Type::Struct),
                None => self.resolve_type(ty),
            },
            TypeExprKind::Array(element, length) => {
                let element = self.resolve_field_type(element, defs, stack);
                let length = self.const_length(length);
                Some(Type::Array(Box::new(element?), length?))
            }
            TypeExprKind::Tuple(elements) if !elements.is_empty() => {
                let resolved: Vec<Option<Type>> =
                    elements.iter().map(|t| self.resolve_field_type(t, defs, stack)).collect();
                Some(Type::Tuple(resolved.into_iter().collect::<Option<_>>()?))
            }
            _ => self.resolve_type(ty),
        }
    }

    fn check_globals(&mut self, program: &Program) {
        for (index, item) in program.items.iter().enumerate() {
            let Item::Global(global) = item else { continue };
            if self.globals.contains_key(&global.name.name) {
                let message = format!("global `{}` is defined more than once", global.name);
                self.error(global.name.span, message);
                continue;
            }
            let annotated = global.ty.as_ref().and_then(|ty| self.resolve_type(ty));
            let ty = self.check_expr(&global.value, annotated.as_ref());
            let ty = match (annotated, ty) {
                (Some(expected), Some(found)) if expected != found => {
                    self.mismatch(global.value.span, &expected, &found);
                    None
                }
                (Some(expected), Some(_)) => Some(expected),
                (None, found) => found,
                (Some(_), None) => None,
            };
            if ty.as_ref().is_some_and(|ty| !ty.is_scalar()) {
                self.error(global.span, "globals must have a scalar type");
            }
            if !self.is_comptime(&global.value) {
                self.error(global.value.span, "global values must be compile-time constants");
            }
            let value = self.const_int(&global.value);
            self.globals.insert(global.name.name.clone(), GlobalInfo { item: index, ty, value });
        }
    }

    fn collect_signatures(&mut self, program: &Program) {
        for (index, item) in program.items.iter().enumerate() {
            let Item::Function(function) = item else { continue };
            let name = &function.name.name;
            if self.functions.contains_key(name) {
                let message = format!("function `{}` is defined more than once", name);
                self.error(function.name.span, message);
                continue;
            }
            if self.globals.contains_key(name) {
                let message = format!("`{}` is already defined as a global", name);
                self.error(function.name.span, message);
            }
            let is_entry = *name == self.config.entry;
            let mut params = Vec::new();
            for param in &function.params {
                if param.public && !is_entry {
                    let message = "`pub` is only allowed on parameters of the entry function";
                    self.error(param.span, message);
                }
                // Unknown types are already reported; Unit keeps arity checks meaningful
                params.push(self.resolve_type(&param.ty).unwrap_or(Type::Unit));
            }
            let ret = match &function.return_type {
                Some(ret) => {
                    if ret.public && !is_entry {
                        let message = "`pub` is only allowed on the entry function's return type";
                        self.error(ret.ty.span, message);
                    }
                    self.resolve_type(&ret.ty).unwrap_or(Type::Unit)
                }
                None => Type::Unit,
            };
            let signature = FnSignature { params, ret };
            self.functions.insert(name.clone(), FunctionInfo { item: index, signature });
        }
    }

    fn check_function(&mut self, function: &Function) {
        let Some(info) = self.functions.get(&function.name.name) else { return };
        let signature = info.signature.clone();
        self.current_fn = Some(function.name.name.clone());
        self.scopes.push(Vec::new());
        for (param, ty) in function.params.iter().zip(&signature.params) {
            self.declare(&param.name, Some(ty.clone()), false, false);
        }
        let body = self.check_block(&function.body, Some(&signature.ret));
        if let Some(found) = body {
            if found != signature.ret {
                let span = function.body.tail.as_ref().map_or(function.body.span, |tail| tail.span);
                self.mismatch(span, &signature.ret, &found);
            }
        }
        self.pop_scope();
        self.current_fn = None;
    }

    fn check_recursion(&mut self) {
        let mut reported = BTreeSet::new();
        let names: Vec<String> = self.call_graph.keys().cloned().collect();
        for name in names {
            let mut path = vec![name.clone()];
            if let Some((callee, span)) = self.find_cycle(&name, &mut path, &mut BTreeSet::new()) {
                if reported.insert(callee.clone()) {
                    let message = format!("recursive call to `{}` cannot be unrolled", callee);
                    self.errors.push(Diagnostic::lowering(span, message));
                }
            }
        }
    }

    fn find_cycle(
        &self,
        current: &str,
        path: &mut Vec<String>,
        visited: &mut BTreeSet<String>,
    ) -> Option<(String, Span)> {
        if !visited.insert(current.to_string()) {
            return None;
        }
        for (callee, span) in self.call_graph.get(current).into_iter().flatten() {
            if path.contains(callee) {
                return Some((callee.clone(), *span));
            }
            path.push(callee.clone());
            if let Some(found) = self.find_cycle(callee, path, visited) {
                return Some(found);
            }
            path.pop();
        }
        None
    }

    // ------------------------------------------------------------------
    // Types and constants
    // ------------------------------------------------------------------

    fn resolve_type(&mut self, ty: &TypeExpr) -> Option<Type> {
        match &ty.kind {
            TypeExprKind::Field => Some(Type::Field),
            TypeExprKind::Bool => Some(Type::Bool),
            TypeExprKind::UInt(width) | TypeExprKind::SInt(width) => {
                if *width == 0 || *width > MAX_INTEGER_WIDTH {
                    let message =
                        format!("integer width must be between 1 and {}", MAX_INTEGER_WIDTH);
                    self.error(ty.span, message);
                    return None;
                }
                Some(match ty.kind {
                    TypeExprKind::UInt(_) => Type::UInt(*width),
                    _ => Type::SInt(*width),
                })
            }
            TypeExprKind::Array(element, length) => {
                let element = self.resolve_type(element);
                let length = self.const_length(length);
                Some(Type::Array(Box::new(element?), length?))
            }
            TypeExprKind::Tuple(elements) if elements.is_empty() => Some(Type::Unit),
            TypeExprKind::Tuple(elements) => {
                let resolved: Vec<Option<Type>> =
                    elements.iter().map(|t| self.resolve_type(t)).collect();
                Some(Type::Tuple(resolved.into_iter().collect::<Option<_>>()?))
            }
            TypeExprKind::Named(name) => match self.structs.get(name) {
                Some(def) => Some(Type::Struct(def.clone())),
                None => {
                    self.error(ty.span, format!("unknown type `{}`", name));
                    None
                }
            },
        }
    }

    fn const_length(&mut self, expr: &Expr) -> Option<usize> {
        let length = match self.const_int(expr) {
            Some(n) if n >= 0 => usize::try_from(n).ok(),
            _ => None,
        };
        if length.is_none() {
            self.error(expr.span, "array length must be a non-negative constant");
        }
        length
    }

    /// Integer value of a compile-time expression, when it fits an `i128`
    fn const_int(&self, expr: &Expr) -> Option<i128> {
        match &expr.kind {
            ExprKind::Int(text) => i128::try_from(parse_literal(text)?).ok(),
            ExprKind::Path(path) if path.len() == 1 => {
                if self.lookup(&path[0].name).is_some() {
                    return None;
                }
                self.globals.get(&path[0].name)?.value
            }
            ExprKind::Unary { op: UnaryOp::Neg, operand } => self.const_int(operand)?.checked_neg(),
            ExprKind::Cast { expr, .. } => self.const_int(expr),
            ExprKind::Binary { op, lhs, rhs } => {
                let (a, b) = (self.const_int(lhs)?, self.const_int(rhs)?);
                match op {
                    BinaryOp::Add => a.checked_add(b),
                    BinaryOp::Sub => a.checked_sub(b),
                    BinaryOp::Mul => a.checked_mul(b),
                    BinaryOp::Div if b > 0 && a >= 0 => Some(a / b),
                    BinaryOp::Mod if b > 0 && a >= 0 => Some(a % b),
                    _ => None,
                }
            }
            ExprKind::MethodCall { receiver, method, args }
                if method.name == "len" && args.is_empty() =>
            {
                match self.types.get(receiver.id).and_then(Option::as_ref) {
                    Some(Type::Array(_, length)) => i128::try_from(*length).ok(),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Whether `expr` folds to a constant during lowering
    fn is_comptime(&self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Int(_) | ExprKind::Bool(_) => true,
            ExprKind::Path(path) if path.len() == 1 => match self.lookup(&path[0].name) {
                Some(local) => local.comptime,
                None => self.globals.contains_key(&path[0].name),
            },
            ExprKind::Unary { operand, .. } => self.is_comptime(operand),
            ExprKind::Cast { expr, .. } => self.is_comptime(expr),
            ExprKind::Binary { op, lhs, rhs }
                if op.is_arithmetic() || op.is_bitwise() || op.is_shift() =>
            {
                self.is_comptime(lhs) && self.is_comptime(rhs)
            }
            ExprKind::MethodCall { method, .. } => method.name == "len",
            _ => false,
        }
    }

    fn mismatch(&mut self, span: Span, expected: &Type, found: &Type) {
        self.error(span, format!("mismatched types: expected `{}`, found `{}`", expected, found));
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    fn declare(&mut self, name: &Ident, ty: Option<Type>, mutable: bool, comptime: bool) {
        let local =
            Local { name: name.name.clone(), ty, mutable, comptime, used: false, span: name.span };
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(local);
        }
    }

    fn lookup(&self, name: &str) -> Option<&Local> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|local| local.name == name)
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut Local> {
        self.scopes
            .iter_mut()
            .rev()
            .flat_map(|scope| scope.iter_mut().rev())
            .find(|local| local.name == name)
    }

    fn pop_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else { return };
        for local in scope {
            if !local.used && !local.name.starts_with('_') {
                let message = format!("unused variable `{}`", local.name);
                self.warnings.push(Diagnostic::warning(local.span, message));
            }
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn check_block(&mut self, block: &Block, expected: Option<&Type>) -> Option<Type> {
        self.scopes.push(Vec::new());
        for stmt in &block.stmts {
            self.check_stmt(stmt);
        }
        let ty = match &block.tail {
            Some(tail) => self.check_expr(tail, expected),
            None => Some(Type::Unit),
        };
        self.pop_scope();
        ty
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Let { pattern, ty, value } => {
                let annotated = match ty {
                    Some(ty) => match self.resolve_type(ty) {
                        Some(resolved) => Some(resolved),
                        None => {
                            self.check_expr(value, None);
                            self.bind_pattern(pattern, None, false);
                            return;
                        }
                    },
                    None => None,
                };
                let found = self.check_expr(value, annotated.as_ref());
                let ty = match (annotated, found) {
                    (Some(expected), Some(found)) if expected != found => {
                        self.mismatch(value.span, &expected, &found);
                        Some(expected)
                    }
                    (Some(expected), _) => Some(expected),
                    (None, found) => found,
                };
                let comptime = self.is_comptime(value);
                self.bind_pattern(pattern, ty, comptime);
            }
            StmtKind::Assign { target, op, value } => {
                let Some(place) = self.check_place(target) else {
                    self.check_expr(value, None);
                    return;
                };
                let Some(found) = self.check_expr(value, Some(&place)) else { return };
                match op {
                    Some(op) => {
                        self.binary_result(*op, &place, &found, stmt.span);
                    }
                    None if found != place => self.mismatch(value.span, &place, &found),
                    None => {}
                }
            }
            StmtKind::For { var, start, end, body } => {
                let ty = if start.is_untyped_literal() && end.is_untyped_literal() {
                    let u32_ty = Type::UInt(32);
                    let a = self.check_expr(start, Some(&u32_ty));
                    let b = self.check_expr(end, Some(&u32_ty));
                    a.zip(b).map(|(a, _)| a)
                } else {
                    self.check_operands(start, end, None).and_then(|(a, b)| {
                        if a != b {
                            self.mismatch(end.span, &a, &b);
                            None
                        } else {
                            Some(a)
                        }
                    })
                };
                if let Some(ty) = &ty {
                    if !ty.is_numeric() {
                        let message = format!("loop bounds must be integers, found `{}`", ty);
                        self.error(start.span, message);
                    }
                }
                for bound in [start, end] {
                    if !self.is_comptime(bound) {
                        self.error(bound.span, "loop bounds must be compile-time constants");
                    }
                }
                self.scopes.push(Vec::new());
                self.declare(var, ty, false, true);
                self.check_block(body, Some(&Type::Unit));
                self.pop_scope();
            }
            StmtKind::Assert { cond, .. } => {
                if let Some(ty) = self.check_expr(cond, Some(&Type::Bool)) {
                    if ty != Type::Bool {
                        self.mismatch(cond.span, &Type::Bool, &ty);
                    }
                }
            }
            StmtKind::AssertEq { left, right, .. } => {
                if let Some((a, b)) = self.check_operands(left, right, None) {
                    if a != b {
                        self.mismatch(right.span, &a, &b);
                    } else if a == Type::Unit {
                        self.error(stmt.span, "cannot compare values of type `()`");
                    }
                }
            }
            StmtKind::Expr(expr) => {
                self.check_expr(expr, None);
            }
        }
    }

    fn bind_pattern(&mut self, pattern: &Pattern, ty: Option<Type>, comptime: bool) {
        match pattern {
            Pattern::Binding { name, mutable } => {
                self.declare(name, ty, *mutable, comptime && !mutable);
            }
            Pattern::Wildcard(_) => {}
            Pattern::Tuple(elements, span) => {
                let element_types: Vec<Option<Type>> = match ty {
                    Some(Type::Tuple(types)) if types.len() == elements.len() => {
                        types.into_iter().map(Some).collect()
                    }
                    Some(other) => {
                        let message = format!(
                            "pattern expects a tuple of {} elements, found `{}`",
                            elements.len(),
                            other
                        );
                        self.error(*span, message);
                        vec![None; elements.len()]
                    }
                    None => vec![None; elements.len()],
                };
                for (element, ty) in elements.iter().zip(element_types) {
                    self.bind_pattern(element, ty, false);
                }
            }
        }
    }

    /// Type of an assignable place; the root must be a mutable local
    fn check_place(&mut self, target: &Expr) -> Option<Type> {
        let ty = match &target.kind {
            ExprKind::Path(path) if path.len() == 1 => {
                let name = &path[0];
                match self.lookup(&name.name) {
                    Some(local) if !local.mutable => {
                        let message = format!("cannot assign to immutable variable `{}`", name);
                        self.error(target.span, message);
                        None
                    }
                    Some(local) => local.ty.clone(),
                    None if self.globals.contains_key(&name.name) => {
                        self.error(target.span, format!("cannot assign to global `{}`", name));
                        None
                    }
                    None => {
                        let message = format!("cannot find value `{}` in this scope", name);
                        self.error(target.span, message);
                        None
                    }
                }
            }
            ExprKind::Index { base, index } => {
                let base_ty = self.check_place(base)?;
                self.check_index(&base_ty, index, target.span)
            }
            ExprKind::Field { base, field } => {
                let base_ty = self.check_place(base)?;
                self.check_field(&base_ty, field)
            }
            ExprKind::TupleIndex { base, index } => {
                let base_ty = self.check_place(base)?;
                self.check_tuple_index(&base_ty, *index, target.span)
            }
            _ => {
                self.error(target.span, "invalid left-hand side of assignment");
                None
            }
        }?;
        self.types[target.id] = Some(ty.clone());
        Some(ty)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Checks both operands, typing an untyped literal side from the other side
    fn check_operands(
        &mut self,
        lhs: &Expr,
        rhs: &Expr,
        expected: Option<&Type>,
    ) -> Option<(Type, Type)> {
        if lhs.is_untyped_literal() && !rhs.is_untyped_literal() {
            let b = self.check_expr(rhs, expected);
            let a = self.check_expr(lhs, b.as_ref().or(expected));
            Some((a?, b?))
        } else {
            let a = self.check_expr(lhs, expected);
            let b = self.check_expr(rhs, a.as_ref().or(expected));
            Some((a?, b?))
        }
    }

    fn check_expr(&mut self, expr: &Expr, expected: Option<&Type>) -> Option<Type> {
        let ty = self.infer_expr(expr, expected)?;
        self.types[expr.id] = Some(ty.clone());
        Some(ty)
    }

    fn infer_expr(&mut self, expr: &Expr, expected: Option<&Type>) -> Option<Type> {
        match &expr.kind {
            ExprKind::Int(text) => self.check_literal(text, expr.span, expected, false),
            ExprKind::Bool(_) => Some(Type::Bool),
            ExprKind::Path(path) => self.check_path(path, expr.span),
            ExprKind::Unary { op: UnaryOp::Neg, operand }
                if matches!(operand.kind, ExprKind::Int(_)) =>
            {
                let ExprKind::Int(text) = &operand.kind else { return None };
                let ty = self.check_literal(text, operand.span, expected, true)?;
                self.types[operand.id] = Some(ty.clone());
                if let Type::UInt(_) = ty {
                    self.negate_unsigned(expr.span, &ty);
                    return None;
                }
                Some(ty)
            }
            ExprKind::Unary { op, operand } => {
                let ty = self.check_expr(operand, expected)?;
                match (op, &ty) {
                    (UnaryOp::Neg, Type::Field | Type::SInt(_)) => Some(ty),
                    (UnaryOp::Not, Type::Bool | Type::UInt(_)) => Some(ty),
                    (UnaryOp::Neg, Type::UInt(_)) => {
                        self.negate_unsigned(expr.span, &ty);
                        None
                    }
                    (UnaryOp::Neg, _) => {
                        self.error(expr.span, format!("cannot apply unary `-` to `{}`", ty));
                        None
                    }
                    (UnaryOp::Not, _) => {
                        self.error(expr.span, format!("cannot apply unary `!` to `{}`", ty));
                        None
                    }
                }
            }
            ExprKind::Binary { op, lhs, rhs } if op.is_shift() => {
                let lhs_ty = self.check_expr(lhs, expected);
                let amount_expected = Type::UInt(32);
                let rhs_ty = self.check_expr(rhs, Some(&amount_expected));
                let (lhs_ty, rhs_ty) = (lhs_ty?, rhs_ty?);
                if !matches!(lhs_ty, Type::UInt(_)) {
                    let message =
                        format!("shifts are only defined on unsigned integers, found `{}`", lhs_ty);
                    self.error(lhs.span, message);
                    return None;
                }
                if !rhs_ty.is_integer() {
                    let message = format!("shift amount must be an integer, found `{}`", rhs_ty);
                    self.error(rhs.span, message);
                    return None;
                }
                if !self.is_comptime(rhs) {
                    self.error(rhs.span, "shift amount must be a compile-time constant");
                    return None;
                }
                Some(lhs_ty)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let operand_expected = match op {
                    BinaryOp::And | BinaryOp::Or => Some(&Type::Bool),
                    _ if op.is_arithmetic() || op.is_bitwise() => expected,
                    _ => None,
                };
                let (a, b) = self.check_operands(lhs, rhs, operand_expected)?;
                self.binary_result(*op, &a, &b, expr.span)
            }
            ExprKind::Cast { expr: inner, ty } => {
                let target = self.resolve_type(ty);
                let source = self.check_expr(inner, None);
                let (target, source) = (target?, source?);
                let allowed = match (&source, &target) {
                    (s, Type::Bool) => *s == Type::Bool,
                    (s, t) => s.is_scalar() && t.is_scalar(),
                };
                if !allowed {
                    self.error(expr.span, format!("cannot cast `{}` as `{}`", source, target));
                    return None;
                }
                Some(target)
            }
            ExprKind::Call { path, args } => self.check_call(expr, path, args),
            ExprKind::MethodCall { receiver, method, args } => {
                let receiver_ty = self.check_expr(receiver, None)?;
                match (&receiver_ty, method.name.as_str()) {
                    (Type::Array(..), "len") if args.is_empty() => Some(Type::UInt(32)),
                    _ => {
                        let message = format!("no method `{}` on type `{}`", method, receiver_ty);
                        self.error(method.span, message);
                        None
                    }
                }
            }
            ExprKind::Index { base, index } => {
                let base_ty = self.check_expr(base, None)?;
                self.check_index(&base_ty, index, expr.span)
            }
            ExprKind::Field { base, field } => {
                let base_ty = self.check_expr(base, None)?;
                self.check_field(&base_ty, field)
            }
            ExprKind::TupleIndex { base, index } => {
                let base_ty = self.check_expr(base, None)?;
                self.check_tuple_index(&base_ty, *index, expr.span)
            }
            ExprKind::Array(elements) => {
                let element_expected = match expected {
                    Some(Type::Array(element, _)) => Some(element.as_ref().clone()),
                    _ => None,
                };
                let Some(first) = elements.first() else {
                    return match expected {
                        Some(ty @ Type::Array(_, 0)) => Some(ty.clone()),
                        _ => {
                            self.error(expr.span, "cannot infer the type of an empty array");
                            None
                        }
                    };
                };
                let element_ty = self.check_expr(first, element_expected.as_ref())?;
                let mut ok = true;
                for element in &elements[1..] {
                    match self.check_expr(element, Some(&element_ty)) {
                        Some(found) if found != element_ty => {
                            self.mismatch(element.span, &element_ty, &found);
                            ok = false;
                        }
                        Some(_) => {}
                        None => ok = false,
                    }
                }
                ok.then(|| Type::Array(Box::new(element_ty), elements.len()))
            }
            ExprKind::Repeat { value, count } => {
                let element_expected = match expected {
                    Some(Type::Array(element, _)) => Some(element.as_ref().clone()),
                    _ => None,
                };
                let element_ty = self.check_expr(value, element_expected.as_ref());
                let length = self.const_length(count);
                Some(Type::Array(Box::new(element_ty?), length?))
            }
            ExprKind::Tuple(elements) => {
                let expected_elements = match expected {
                    Some(Type::Tuple(types)) if types.len() == elements.len() => {
                        Some(types.clone())
                    }
                    _ => None,
                };
                let mut types = Vec::with_capacity(elements.len());
                for (i, element) in elements.iter().enumerate() {
                    let element_expected = expected_elements.as_ref().map(|types| &types[i]);
                    types.push(self.check_expr(element, element_expected));
                }
                Some(Type::Tuple(types.into_iter().collect::<Option<_>>()?))
            }
            ExprKind::StructLit { name, fields } => self.check_struct_literal(expr, name, fields),
            ExprKind::If { cond, then_branch, else_branch } => {
                if let Some(ty) = self.check_expr(cond, Some(&Type::Bool)) {
                    if ty != Type::Bool {
                        self.mismatch(cond.span, &Type::Bool, &ty);
                    }
                }
                let then_ty = self.check_block(then_branch, expected);
                match else_branch {
                    Some(else_branch) => {
                        let else_ty = self.check_expr(else_branch, then_ty.as_ref().or(expected));
                        let (then_ty, else_ty) = (then_ty?, else_ty?);
                        if then_ty != else_ty {
                            let message = format!(
                                "`if` and `else` have incompatible types: `{}` and `{}`",
                                then_ty, else_ty
                            );
                            self.error(expr.span, message);
                            return None;
                        }
                        Some(then_ty)
                    }
                    None => {
                        let then_ty = then_ty?;
                        if then_ty != Type::Unit {
                            let message = format!(
                                "`if` without `else` must have type `()`, found `{}`",
                                then_ty
                            );
                            self.error(then_branch.span, message);
                            return None;
                        }
                        Some(Type::Unit)
                    }
                }
            }
            ExprKind::Block(block) => self.check_block(block, expected),
        }
    }

    fn negate_unsigned(&mut self, span: Span, ty: &Type) {
        self.error(span, format!("cannot negate a value of unsigned type `{}`", ty));
    }

    fn check_literal(
        &mut self,
        text: &str,
        span: Span,
        expected: Option<&Type>,
        negative: bool,
    ) -> Option<Type> {
        let ty = match expected {
            Some(ty) if ty.is_numeric() => ty.clone(),
            _ => Type::Field,
        };
        let Some(magnitude) = parse_literal(text) else {
            self.error(span, format!("invalid integer literal `{}`", text));
            return None;
        };
        if !literal_fits(&ty, magnitude, negative) {
            let sign = if negative { "-" } else { "" };
            self.error(span, format!("literal `{}{}` does not fit in `{}`", sign, text, ty));
            return None;
        }
        Some(ty)
    }

    fn check_path(&mut self, path: &[Ident], span: Span) -> Option<Type> {
        if path.len() != 1 {
            self.error(span, format!("`{}` is not a value", path_to_string(path)));
            return None;
        }
        let name = &path[0].name;
        if let Some(local) = self.lookup_mut(name) {
            local.used = true;
            return local.ty.clone();
        }
        if let Some(global) = self.globals.get(name) {
            return global.ty.clone();
        }
        self.error(span, format!("cannot find value `{}` in this scope", name));
        None
    }

    fn binary_result(&mut self, op: BinaryOp, a: &Type, b: &Type, span: Span) -> Option<Type> {
        if a != b {
            let message = format!(
                "mismatched operand types for `{}`: `{}` and `{}` (use an explicit `as` cast)",
                op, a, b
            );
            self.error(span, message);
            return None;
        }
        let result = match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul if a.is_numeric() => Ok(a.clone()),
            BinaryOp::Div if matches!(a, Type::Field | Type::UInt(_)) => Ok(a.clone()),
            BinaryOp::Div if matches!(a, Type::SInt(_)) => {
                Err("signed integer division is not supported".to_string())
            }
            BinaryOp::Mod if matches!(a, Type::UInt(_)) => Ok(a.clone()),
            BinaryOp::Mod if *a == Type::Field => Err("`%` is not defined on `Field`".to_string()),
            BinaryOp::Eq | BinaryOp::Ne if *a != Type::Unit => Ok(Type::Bool),
            _ if op.is_comparison() && a.is_integer() => Ok(Type::Bool),
            _ if op.is_comparison() && *a == Type::Field => Err(format!(
                "cannot apply `{}` to `Field`: field elements have no ordering, \
                 cast to an integer type first",
                op
            )),
            BinaryOp::And | BinaryOp::Or if *a == Type::Bool => Ok(Type::Bool),
            _ if op.is_bitwise() && matches!(a, Type::Bool | Type::UInt(_)) => Ok(a.clone()),
            _ if op.is_bitwise() && matches!(a, Type::SInt(_)) => {
                Err(format!("bitwise `{}` is not supported on signed integers", op))
            }
            _ => Err(format!("cannot apply `{}` to `{}`", op, a)),
        };
        match result {
            Ok(ty) => Some(ty),
            Err(message) => {
                self.error(span, message);
                None
            }
        }
    }

    fn check_index(&mut self, base: &Type, index: &Expr, span: Span) -> Option<Type> {
        let Type::Array(element, length) = base else {
            self.check_expr(index, None);
            self.error(span, format!("cannot index into a value of type `{}`", base));
            return None;
        };
        let index_ty = self.check_expr(index, Some(&Type::UInt(32)))?;
        if !matches!(index_ty, Type::UInt(_) | Type::Field) {
            let message =
                format!("array index must be an unsigned integer, found `{}`", index_ty);
            self.error(index.span, message);
            return None;
        }
        if let Some(value) = self.const_int(index) {
            if value < 0 || value as u128 >= *length as u128 {
                let message =
                    format!("index {} is out of bounds for array of length {}", value, length);
                self.error(index.span, message);
                return None;
            }
        }
        Some(element.as_ref().clone())
    }

    fn check_field(&mut self, base: &Type, field: &Ident) -> Option<Type> {
        let found = match base {
            Type::Struct(def) => def.field_index(&field.name).map(|i| def.fields[i].1.clone()),
            _ => None,
        };
        if found.is_none() {
            self.error(field.span, format!("no field `{}` on type `{}`", field, base));
        }
        found
    }

    fn check_tuple_index(&mut self, base: &Type, index: usize, span: Span) -> Option<Type> {
        match base {
            Type::Tuple(elements) if index < elements.len() => Some(elements[index].clone()),
            _ => {
                self.error(span, format!("no field `{}` on type `{}`", index, base));
                None
            }
        }
    }

    fn check_struct_literal(
        &mut self,
        expr: &Expr,
        name: &Ident,
        fields: &[(Ident, Expr)],
    ) -> Option<Type> {
        let Some(def) = self.structs.get(&name.name).cloned() else {
            for (_, value) in fields {
                self.check_expr(value, None);
            }
            self.error(name.span, format!("unknown struct `{}`", name));
            return None;
        };
        let mut ok = true;
        let mut seen = BTreeSet::new();
        for (field, value) in fields {
            let Some(index) = def.field_index(&field.name) else {
                self.check_expr(value, None);
                self.error(field.span, format!("struct `{}` has no field `{}`", name, field));
                ok = false;
                continue;
            };
            if !seen.insert(index) {
                self.error(field.span, format!("field `{}` specified more than once", field));
                ok = false;
            }
            let expected = def.fields[index].1.clone();
            match self.check_expr(value, Some(&expected)) {
                Some(found) if found != expected => {
                    self.mismatch(value.span, &expected, &found);
                    ok = false;
                }
                Some(_) => {}
                None => ok = false,
            }
        }
        let missing: Vec<&str> = def
            .fields
            .iter()
            .enumerate()
            .filter(|(i, _)| !seen.contains(i))
            .map(|(_, (field, _))| field.as_str())
            .collect();
        if !missing.is_empty() {
            let message = format!("missing fields in `{}`: {}", name, missing.join(", "));
            self.error(expr.span, message);
            ok = false;
        }
        ok.then(|| Type::Struct(def))
    }

    fn resolve_call(&mut self, path: &[Ident], span: Span) -> Option<CallTarget> {
        let mut segments: Vec<String> = path.iter().map(|s| s.name.clone()).collect();
        if let Some(full) = self.aliases.get(&segments[0]) {
            let mut expanded = full.clone();
            expanded.extend(segments.drain(1..));
            segments = expanded;
        }
        if segments[0] == "std" {
            let qualified = segments.join("::");
            if self.registry.get(&qualified).is_some() {
                return Some(CallTarget::Builtin(qualified));
            }
            self.error(span, format!("unknown builtin `{}`", qualified));
            return None;
        }
        if segments.len() == 1 && self.functions.contains_key(&segments[0]) {
            return Some(CallTarget::Function(segments.remove(0)));
        }
        self.error(span, format!("cannot find function `{}`", path_to_string(path)));
        None
    }

    fn check_call(&mut self, expr: &Expr, path: &[Ident], args: &[Expr]) -> Option<Type> {
        let Some(target) = self.resolve_call(path, expr.span) else {
            for arg in args {
                self.check_expr(arg, None);
            }
            return None;
        };
        let signature = match &target {
            CallTarget::Function(name) => {
                let signature = self.functions.get(name).map(|info| info.signature.clone())?;
                if let Some(caller) = self.current_fn.clone() {
                    self.call_graph.entry(caller).or_default().push((name.clone(), expr.span));
                }
                signature
            }
            CallTarget::Builtin(name) => {
                let builtin = self.registry.get(name)?;
                self.builtins.insert(name.clone(), builtin.version());
                FnSignature { params: builtin.params(), ret: builtin.returns() }
            }
        };
        if args.len() != signature.params.len() {
            let message = format!(
                "`{}` takes {} argument(s) but {} were supplied",
                path_to_string(path),
                signature.params.len(),
                args.len()
            );
            self.error(expr.span, message);
            for arg in args {
                self.check_expr(arg, None);
            }
            return None;
        }
        let mut ok = true;
        for (arg, expected) in args.iter().zip(&signature.params) {
            match self.check_expr(arg, Some(expected)) {
                Some(found) if found != *expected => {
                    self.mismatch(arg.span, expected, &found);
                    ok = false;
                }
                Some(_) => {}
                None => ok = false,
            }
        }
        self.calls.insert(expr.id, target);
        ok.then_some(signature.ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn check_source(source: &str) -> Result<TypedProgram, Vec<Diagnostic>> {
        let program = parse(source).expect("source should parse");
        check(program, BuiltinRegistry::standard(), &CompilerConfig::default())
    }

    #[test]
    fn test_literal_takes_operand_type() {
        let typed = check_source("fn main(x: u8) -> u8 { 1 + x }").unwrap();
        let (function, _) = typed.entry_function().unwrap();
        let tail = function.body.tail.as_ref().unwrap();
        assert_eq!(typed.type_of(tail.id), Some(&Type::UInt(8)));
    }

    #[test]
    fn test_field_comparison_rejected() {
        let errors = check_source("fn main(a: Field, b: Field) { assert(a < b); }").unwrap_err();
        assert!(errors[0].message.contains("no ordering"));
    }

    #[test]
    fn test_recursion_rejected() {
        let source = "fn f(x: Field) -> Field { f(x) } fn main(x: Field) { assert(f(x) == 1); }";
        let errors = check_source(source).unwrap_err();
        assert!(errors.iter().any(|d| d.message.contains("recursive")));
    }
}
