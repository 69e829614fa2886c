//! Statement lowering: bindings, assignment, branches, loops and calls

use super::value::CircuitValue;
use super::{internal, Result, Synthesizer};
use crate::ast::{BinaryOp, Block, Expr, ExprKind, Pattern, Stmt, StmtKind};
use crate::error::SynthesisError;
use crate::types::Type;
use tracing::trace;
use zkplay_runtime::{FieldElement, LinearCombination as Lc, SlotType};

/// One step from a variable down to the assigned location
enum Step {
    /// Array element, struct field or tuple element at a known position
    At(usize),
    /// Array element at a witness-dependent index
    Dynamic(Lc),
}

impl<'a> Synthesizer<'a> {
    pub(super) fn lower_block(&mut self, block: &'a Block) -> Result<CircuitValue> {
        self.scopes.push(Vec::new());
        let result = self.lower_block_body(block);
        self.scopes.pop();
        result
    }

    fn lower_block_body(&mut self, block: &'a Block) -> Result<CircuitValue> {
        for stmt in &block.stmts {
            self.lower_stmt(stmt)?;
        }
        match &block.tail {
            Some(tail) => self.lower_expr(tail),
            None => Ok(CircuitValue::Unit),
        }
    }

    fn lower_stmt(&mut self, stmt: &'a Stmt) -> Result<()> {
        let outer = std::mem::replace(&mut self.span, stmt.span);
        let result = self.lower_stmt_kind(stmt);
        self.span = outer;
        result
    }

    fn lower_stmt_kind(&mut self, stmt: &'a Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::Let { pattern, value, .. } => {
                let value = self.lower_expr(value)?;
                self.bind(pattern, value)
            }
            StmtKind::Assign { target, op, value } => {
                let rhs = self.lower_expr(value)?;
                let updated = match op {
                    Some(op) => {
                        let ty = self.type_of(target)?;
                        let current = self.lower_expr(target)?;
                        self.lower_binary(*op, current, rhs, ty)?
                    }
                    None => rhs,
                };
                self.assign(target, updated)
            }
            StmtKind::For { var, start, end, body } => {
                let first = self.loop_bound(start)?;
                let last = self.loop_bound(end)?;
                let ty = self.slot_type(self.type_of(start)?)?;
                let iterations = last.saturating_sub(first).max(0);
                if iterations as u128 > u128::from(self.config.max_unroll) {
                    let message = format!(
                        "loop runs {} iterations, more than the limit of {}",
                        iterations, self.config.max_unroll
                    );
                    return Err(SynthesisError::resource(self.span, message));
                }
                trace!(var = %var, iterations, "unrolling loop");
                for i in first..last {
                    let counter = CircuitValue::constant(FieldElement::from_i128(i), ty);
                    self.scopes.push(vec![(var.name.clone(), counter)]);
                    let result = self.lower_block(body);
                    self.scopes.pop();
                    result?;
                }
                Ok(())
            }
            StmtKind::Assert { cond, message } => self.lower_assert(cond, message.as_deref()),
            StmtKind::AssertEq { left, right, message } => {
                let a = self.lower_expr(left)?;
                let b = self.lower_expr(right)?;
                self.assert_leaves_equal(&a, &b, message.as_deref())
            }
            StmtKind::Expr(expr) => self.lower_expr(expr).map(|_| ()),
        }
    }

    fn loop_bound(&mut self, bound: &'a Expr) -> Result<i128> {
        let value = self.lower_scalar(bound)?;
        value.op.as_const().and_then(|k| k.to_i128()).ok_or_else(|| {
            SynthesisError::lowering(bound.span, "loop bounds must be compile-time constants")
        })
    }

    fn lower_assert(&mut self, cond: &'a Expr, message: Option<&str>) -> Result<()> {
        match &cond.kind {
            ExprKind::Binary { op: BinaryOp::Eq, lhs, rhs } => {
                let a = self.lower_expr(lhs)?;
                let b = self.lower_expr(rhs)?;
                self.assert_leaves_equal(&a, &b, message)
            }
            ExprKind::Binary { op: BinaryOp::Ne, lhs, rhs } if self.type_of(lhs)?.is_scalar() => {
                let a = self.lower_scalar(lhs)?;
                let b = self.lower_scalar(rhs)?;
                self.assert_non_zero(&(a.lc() - b.lc()), message)
            }
            _ => {
                let c = self.lower_scalar(cond)?;
                self.assert_zero(&(Lc::one() - c.lc()), message)
            }
        }
    }

    fn assert_leaves_equal(
        &mut self,
        a: &CircuitValue,
        b: &CircuitValue,
        message: Option<&str>,
    ) -> Result<()> {
        let (xs, ys) = (a.leaves(), b.leaves());
        if xs.len() != ys.len() {
            return Err(internal("asserting equality of values with different shapes"));
        }
        for (x, y) in xs.iter().zip(&ys) {
            self.assert_zero(&(x.lc() - y.lc()), message)?;
        }
        Ok(())
    }

    fn bind(&mut self, pattern: &'a Pattern, value: CircuitValue) -> Result<()> {
        match pattern {
            Pattern::Binding { name, .. } => {
                self.declare(name.name.clone(), value);
                Ok(())
            }
            Pattern::Wildcard(_) => Ok(()),
            Pattern::Tuple(elements, _) => {
                let items = match value {
                    CircuitValue::Tuple(items) if items.len() == elements.len() => items,
                    _ => return Err(internal("tuple pattern over a non-tuple value")),
                };
                elements.iter().zip(items).try_for_each(|(element, item)| self.bind(element, item))
            }
        }
    }

    // ------------------------------------------------------------------
    // Assignment
    // ------------------------------------------------------------------

    fn assign(&mut self, target: &'a Expr, value: CircuitValue) -> Result<()> {
        let (root, steps) = self.place(target)?;
        let current = self
            .lookup(&root)
            .cloned()
            .ok_or_else(|| internal(format!("assignment to unknown variable `{}`", root)))?;
        let updated = self.write(current, &steps, value)?;
        let slot = self
            .lookup_mut(&root)
            .ok_or_else(|| internal(format!("assignment to unknown variable `{}`", root)))?;
        *slot = updated;
        Ok(())
    }

    fn place(&mut self, target: &'a Expr) -> Result<(String, Vec<Step>)> {
        match &target.kind {
            ExprKind::Path(path) => {
                let root = path.first().ok_or_else(|| internal("empty assignment path"))?;
                Ok((root.name.clone(), Vec::new()))
            }
            ExprKind::Index { base, index } => {
                let length = match self.type_of(base)? {
                    Type::Array(_, length) => *length,
                    other => return Err(internal(format!("cannot index `{}`", other))),
                };
                let (root, mut steps) = self.place(base)?;
                let index = self.lower_scalar(index)?;
                let step = match index.op.as_const() {
                    Some(constant) => Step::At(self.constant_index(constant, length)?),
                    None => Step::Dynamic(index.lc()),
                };
                steps.push(step);
                Ok((root, steps))
            }
            ExprKind::Field { base, field } => {
                let position = self.field_position(base, field)?;
                let (root, mut steps) = self.place(base)?;
                steps.push(Step::At(position));
                Ok((root, steps))
            }
            ExprKind::TupleIndex { base, index } => {
                let (root, mut steps) = self.place(base)?;
                steps.push(Step::At(*index));
                Ok((root, steps))
            }
            _ => Err(internal(format!("invalid assignment target at {}", target.span))),
        }
    }

    /// `current` with the location at `steps` replaced by `value`
    fn write(
        &mut self,
        current: CircuitValue,
        steps: &[Step],
        value: CircuitValue,
    ) -> Result<CircuitValue> {
        let Some((step, rest)) = steps.split_first() else { return Ok(value) };
        let mut items = current
            .components()
            .ok_or_else(|| internal("assignment through a scalar value"))?
            .to_vec();
        match step {
            Step::At(position) => {
                let item = items
                    .get(*position)
                    .cloned()
                    .ok_or_else(|| internal(format!("no component {} in value", position)))?;
                items[*position] = self.write(item, rest, value)?;
            }
            Step::Dynamic(index) => {
                if items.is_empty() {
                    let message = "cannot index into an empty array";
                    return Err(SynthesisError::lowering(self.span, message));
                }
                let selectors = self.index_selectors(index, items.len())?;
                for (item, selector) in items.iter_mut().zip(&selectors) {
                    let updated = self.write(item.clone(), rest, value.clone())?;
                    *item = self.select_value(selector, &updated, item)?;
                }
            }
        }
        Ok(current.with_components(items))
    }

    // ------------------------------------------------------------------
    // Control flow
    // ------------------------------------------------------------------

    pub(super) fn lower_if(
        &mut self,
        cond: &'a Expr,
        then_branch: &'a Block,
        else_branch: Option<&'a Expr>,
    ) -> Result<CircuitValue> {
        let c = self.lower_scalar(cond)?;
        let lower_else = |s: &mut Self| match else_branch {
            Some(else_branch) => s.lower_expr(else_branch),
            None => Ok(CircuitValue::Unit),
        };
        match c.op.as_const() {
            Some(k) if k.is_zero() => lower_else(self),
            Some(_) => self.lower_block(then_branch),
            None => self.branch(&c.lc(), |s| s.lower_block(then_branch), lower_else),
        }
    }

    /// Lowers both arms under complementary predicates and merges their effects
    ///
    /// Every variable either arm changed is replaced by a selection on `c`,
    /// as is the value the arms produce.
    pub(super) fn branch(
        &mut self,
        c: &Lc,
        then_arm: impl FnOnce(&mut Self) -> Result<CircuitValue>,
        else_arm: impl FnOnce(&mut Self) -> Result<CircuitValue>,
    ) -> Result<CircuitValue> {
        let outer = self.predicate.clone();
        let taken = self.product(&outer, c, SlotType::Bool, "branch predicate")?;
        let snapshot = self.scopes.clone();

        self.predicate = taken.clone();
        let then_value = then_arm(self)?;
        let then_scopes = std::mem::replace(&mut self.scopes, snapshot);

        self.predicate = outer.clone() - taken;
        let else_value = else_arm(self)?;
        let else_scopes = std::mem::take(&mut self.scopes);
        self.predicate = outer;

        if then_scopes.len() != else_scopes.len() {
            return Err(internal("branches left different scopes"));
        }
        let mut merged = Vec::with_capacity(else_scopes.len());
        for (then_scope, else_scope) in then_scopes.into_iter().zip(else_scopes) {
            if then_scope.len() != else_scope.len() {
                return Err(internal("branches left different scopes"));
            }
            let mut scope = Vec::with_capacity(else_scope.len());
            for ((name, t), (_, f)) in then_scope.into_iter().zip(else_scope) {
                let value = self.select_value(c, &t, &f)?;
                scope.push((name, value));
            }
            merged.push(scope);
        }
        self.scopes = merged;
        self.select_value(c, &then_value, &else_value)
    }

    /// Inlines a call to a user function
    pub(super) fn inline_call(
        &mut self,
        name: &str,
        args: Vec<CircuitValue>,
    ) -> Result<CircuitValue> {
        let program = self.program;
        let (function, _) = program
            .function(name)
            .ok_or_else(|| internal(format!("unknown function `{}`", name)))?;
        if self.inline_depth >= self.config.max_inline_depth {
            let message = format!(
                "inlining `{}` exceeds the limit of {} nested calls",
                name, self.config.max_inline_depth
            );
            return Err(SynthesisError::resource(self.span, message));
        }
        let frame: Vec<(String, CircuitValue)> =
            function.params.iter().map(|param| param.name.name.clone()).zip(args).collect();
        let caller = std::mem::replace(&mut self.scopes, vec![frame]);
        self.inline_depth += 1;
        trace!(function = name, depth = self.inline_depth, "inlining call");
        let result = self.lower_block(&function.body);
        self.inline_depth -= 1;
        self.scopes = caller;
        result
    }
}
