//! Expression lowering

use super::value::{leaf_paths, CircuitValue, Operand, Scalar};
use super::{internal, Result, Synthesizer};
use crate::ast::{BinaryOp, Expr, ExprKind, Ident, UnaryOp};
use crate::error::SynthesisError;
use crate::typeck::CallTarget;
use crate::types::{parse_literal, Type};
use zkplay_runtime::{FieldElement, GateKind, LinearCombination as Lc, SlotInfo, SlotType};

fn bool_constant(value: bool) -> CircuitValue {
    CircuitValue::constant(FieldElement::from_bool(value), SlotType::Bool)
}

impl<'a> Synthesizer<'a> {
    pub(super) fn type_of(&self, expr: &Expr) -> Result<&'a Type> {
        let program = self.program;
        program
            .type_of(expr.id)
            .ok_or_else(|| internal(format!("expression at {} has no type", expr.span)))
    }

    pub(super) fn slot_type(&self, ty: &Type) -> Result<SlotType> {
        ty.slot_type().ok_or_else(|| internal(format!("`{}` is not a scalar type", ty)))
    }

    pub(super) fn lower_expr(&mut self, expr: &'a Expr) -> Result<CircuitValue> {
        let outer = std::mem::replace(&mut self.span, expr.span);
        let result = self.lower_expr_kind(expr);
        self.span = outer;
        result
    }

    pub(super) fn lower_scalar(&mut self, expr: &'a Expr) -> Result<Scalar> {
        self.lower_expr(expr)?
            .as_scalar()
            .ok_or_else(|| internal(format!("expected a scalar at {}", expr.span)))
    }

    fn lower_expr_kind(&mut self, expr: &'a Expr) -> Result<CircuitValue> {
        let ty = self.type_of(expr)?;
        match &expr.kind {
            ExprKind::Int(text) => {
                let value = parse_literal(text)
                    .and_then(|magnitude| FieldElement::try_from_u256(magnitude).ok())
                    .ok_or_else(|| internal(format!("unchecked literal `{}`", text)))?;
                Ok(CircuitValue::constant(value, self.slot_type(ty)?))
            }
            ExprKind::Bool(value) => Ok(bool_constant(*value)),
            ExprKind::Path(path) => self.lower_path(path),
            ExprKind::Unary { op, operand } => {
                let value = self.lower_scalar(operand)?;
                self.lower_unary(*op, value, ty)
            }
            ExprKind::Binary { op, lhs, rhs } if matches!(op, BinaryOp::And | BinaryOp::Or) => {
                self.lower_logical(*op, lhs, rhs)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let operand_ty = self.type_of(lhs)?;
                let a = self.lower_expr(lhs)?;
                let b = self.lower_expr(rhs)?;
                self.lower_binary(*op, a, b, operand_ty)
            }
            ExprKind::Cast { expr: inner, .. } => {
                let source = self.type_of(inner)?;
                let value = self.lower_scalar(inner)?;
                self.lower_cast(value, source, ty)
            }
            ExprKind::Call { args, .. } => self.lower_call(expr, args),
            ExprKind::MethodCall { receiver, method, .. } => match self.type_of(receiver)? {
                Type::Array(_, length) if method.name == "len" => {
                    let length = FieldElement::from_u64(*length as u64);
                    Ok(CircuitValue::constant(length, SlotType::UInt(32)))
                }
                other => Err(internal(format!("no method `{}` on `{}`", method, other))),
            },
            ExprKind::Index { base, index } => {
                let length = match self.type_of(base)? {
                    Type::Array(_, length) => *length,
                    other => return Err(internal(format!("cannot index `{}`", other))),
                };
                let base = self.lower_expr(base)?;
                let index = self.lower_scalar(index)?;
                self.read_index(&base, index, length)
            }
            ExprKind::Field { base, field } => {
                let position = self.field_position(base, field)?;
                let base = self.lower_expr(base)?;
                component(&base, position)
            }
            ExprKind::TupleIndex { base, index } => {
                let base = self.lower_expr(base)?;
                component(&base, *index)
            }
            ExprKind::Array(elements) => Ok(CircuitValue::Array(
                elements.iter().map(|element| self.lower_expr(element)).collect::<Result<_>>()?,
            )),
            ExprKind::Repeat { value, .. } => {
                let Type::Array(_, length) = ty else {
                    return Err(internal("repeat expression without an array type"));
                };
                let value = self.lower_expr(value)?;
                Ok(CircuitValue::Array(vec![value; *length]))
            }
            ExprKind::Tuple(elements) => Ok(CircuitValue::Tuple(
                elements.iter().map(|element| self.lower_expr(element)).collect::<Result<_>>()?,
            )),
            ExprKind::StructLit { fields, .. } => {
                let Type::Struct(def) = ty else {
                    return Err(internal("struct literal without a struct type"));
                };
                let mut values = vec![None; def.fields.len()];
                for (field, value) in fields {
                    let position = def
                        .field_index(&field.name)
                        .ok_or_else(|| internal(format!("unknown field `{}`", field)))?;
                    values[position] = Some(self.lower_expr(value)?);
                }
                let values = values.into_iter().collect::<Option<Vec<_>>>();
                Ok(CircuitValue::Struct(values.ok_or_else(|| internal("missing struct field"))?))
            }
            ExprKind::If { cond, then_branch, else_branch } => {
                self.lower_if(cond, then_branch, else_branch.as_deref())
            }
            ExprKind::Block(block) => self.lower_block(block),
        }
    }

    pub(super) fn field_position(&self, base: &Expr, field: &Ident) -> Result<usize> {
        match self.type_of(base)? {
            Type::Struct(def) => def
                .field_index(&field.name)
                .ok_or_else(|| internal(format!("no field `{}` on `{}`", field, def.name))),
            other => Err(internal(format!("field access on `{}`", other))),
        }
    }

    fn lower_path(&mut self, path: &[Ident]) -> Result<CircuitValue> {
        let name = path.first().ok_or_else(|| internal("empty path"))?;
        if let Some(value) = self.lookup(&name.name) {
            return Ok(value.clone());
        }
        let program = self.program;
        let (global, _) = program
            .global(&name.name)
            .ok_or_else(|| internal(format!("unresolved name `{}`", name)))?;
        self.lower_expr(&global.value)
    }

    /// Element `index` of `base`, selected by a one-hot vector unless constant
    pub(super) fn read_index(
        &mut self,
        base: &CircuitValue,
        index: Scalar,
        length: usize,
    ) -> Result<CircuitValue> {
        let items = base.components().ok_or_else(|| internal("indexing a non-array value"))?;
        if let Some(constant) = index.op.as_const() {
            let position = self.constant_index(constant, length)?;
            return component(base, position);
        }
        if items.is_empty() {
            return Err(SynthesisError::lowering(self.span, "cannot index into an empty array"));
        }
        let selectors = self.index_selectors(&index.lc(), length)?;
        self.select_by(&selectors, items)
    }

    pub(super) fn constant_index(&self, index: FieldElement, length: usize) -> Result<usize> {
        index
            .to_u64()
            .and_then(|i| usize::try_from(i).ok())
            .filter(|i| *i < length)
            .ok_or_else(|| {
                let message =
                    format!("index {} is out of bounds for array of length {}", index, length);
                SynthesisError::lowering(self.span, message)
            })
    }

    fn lower_unary(&mut self, op: UnaryOp, value: Scalar, ty: &Type) -> Result<CircuitValue> {
        let slot_type = self.slot_type(ty)?;
        match (op, ty) {
            (UnaryOp::Neg, Type::Field) => self.scalar(-value.lc(), slot_type, "negation"),
            (UnaryOp::Neg, Type::SInt(_)) => {
                let negated = self.scalar(-value.lc(), slot_type, "negation")?;
                self.range_check(&scalar_lc(&negated)?, slot_type, "negation overflow")?;
                Ok(negated)
            }
            (UnaryOp::Not, Type::Bool) => self.scalar(Lc::one() - value.lc(), slot_type, "not"),
            (UnaryOp::Not, Type::UInt(width)) => {
                let mask = FieldElement::power_of_two(*width as usize) - FieldElement::ONE;
                self.scalar(Lc::constant(mask) - value.lc(), slot_type, "bitwise not")
            }
            _ => Err(internal(format!("no lowering for unary operator on `{}`", ty))),
        }
    }

    fn lower_logical(
        &mut self,
        op: BinaryOp,
        lhs: &'a Expr,
        rhs: &'a Expr,
    ) -> Result<CircuitValue> {
        let a = self.lower_scalar(lhs)?;
        // The right operand only runs when the left one does not decide the result
        match (op, a.op.as_const()) {
            (BinaryOp::And, Some(k)) if k.is_zero() => Ok(bool_constant(false)),
            (BinaryOp::Or, Some(k)) if !k.is_zero() => Ok(bool_constant(true)),
            (_, Some(_)) => self.lower_expr(rhs),
            (BinaryOp::And, None) => {
                self.branch(&a.lc(), |s| s.lower_expr(rhs), |_| Ok(bool_constant(false)))
            }
            _ => self.branch(&a.lc(), |_| Ok(bool_constant(true)), |s| s.lower_expr(rhs)),
        }
    }

    /// Applies a non-short-circuiting binary operator to lowered operands
    pub(super) fn lower_binary(
        &mut self,
        op: BinaryOp,
        a: CircuitValue,
        b: CircuitValue,
        operand_ty: &Type,
    ) -> Result<CircuitValue> {
        match op {
            BinaryOp::Eq => {
                let equal = self.equal(&a, &b)?;
                return self.scalar(equal, SlotType::Bool, "==");
            }
            BinaryOp::Ne => {
                let equal = self.equal(&a, &b)?;
                return self.scalar(Lc::one() - equal, SlotType::Bool, "!=");
            }
            _ => {}
        }
        let (Some(x), Some(y)) = (a.as_scalar(), b.as_scalar()) else {
            return Err(internal(format!("`{}` applied to aggregate values", op)));
        };
        let slot_type = self.slot_type(operand_ty)?;
        let (x, y) = (x.lc(), y.lc());
        let label = op.to_string();
        match (op, operand_ty) {
            (BinaryOp::Add, Type::Field) => self.scalar(x + y, slot_type, &label),
            (BinaryOp::Sub, Type::Field) => self.scalar(x - y, slot_type, &label),
            (BinaryOp::Mul, Type::Field) => {
                let product = self.product(&x, &y, slot_type, &label)?;
                self.scalar(product, slot_type, &label)
            }
            (BinaryOp::Div, Type::Field) => self.field_division(x, y),
            (BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul, Type::UInt(_) | Type::SInt(_)) => {
                let result = match op {
                    BinaryOp::Add => x + y,
                    BinaryOp::Sub => x - y,
                    _ => self.product(&x, &y, slot_type, &label)?,
                };
                let result = self.scalar(result, slot_type, &label)?;
                let message = format!("{} overflow", label);
                self.range_check(&scalar_lc(&result)?, slot_type, &message)?;
                Ok(result)
            }
            (BinaryOp::Div | BinaryOp::Mod, Type::UInt(width)) => {
                let (quotient, remainder) = self.unsigned_division(x, y, *width)?;
                let result = if op == BinaryOp::Div { quotient } else { remainder };
                Ok(CircuitValue::scalar(result, slot_type))
            }
            (BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge, _) => {
                let width = operand_ty
                    .width()
                    .ok_or_else(|| internal(format!("ordering on `{}`", operand_ty)))?
                    as usize;
                let result = match op {
                    BinaryOp::Ge => self.greater_or_equal(&x, &y, width, &label)?,
                    BinaryOp::Lt => Lc::one() - self.greater_or_equal(&x, &y, width, &label)?,
                    BinaryOp::Le => self.greater_or_equal(&y, &x, width, &label)?,
                    _ => Lc::one() - self.greater_or_equal(&y, &x, width, &label)?,
                };
                self.scalar(result, SlotType::Bool, &label)
            }
            (BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor, Type::Bool) => {
                let result = self.bit_op(op, &x, &y, &label)?;
                self.scalar(result, SlotType::Bool, &label)
            }
            (BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor, Type::UInt(width)) => {
                let width = *width as usize;
                let xs = self.bits(&x, width, &label)?;
                let ys = self.bits(&y, width, &label)?;
                let mut result = Lc::zero();
                for (i, (xb, yb)) in xs.iter().zip(&ys).enumerate() {
                    let bit = self.bit_op(op, xb, yb, &label)?;
                    result = result + bit * FieldElement::power_of_two(i);
                }
                self.scalar(result, slot_type, &label)
            }
            (BinaryOp::Shl | BinaryOp::Shr, Type::UInt(width)) => {
                let amount = y
                    .as_constant()
                    .and_then(|k| k.to_u64())
                    .ok_or_else(|| {
                        SynthesisError::lowering(self.span, "shift amount must be a constant")
                    })?;
                let width = *width as usize;
                let amount = usize::try_from(amount).unwrap_or(usize::MAX).min(width);
                let bits = self.bits(&x, width, &label)?;
                let mut result = Lc::zero();
                for (i, bit) in bits.into_iter().enumerate() {
                    let position = match op {
                        BinaryOp::Shl if i + amount < width => i + amount,
                        BinaryOp::Shr if i >= amount => i - amount,
                        _ => continue,
                    };
                    result = result + bit * FieldElement::power_of_two(position);
                }
                self.scalar(result, slot_type, &label)
            }
            _ => Err(internal(format!("no lowering for `{}` on `{}`", op, operand_ty))),
        }
    }

    /// 1 when every leaf of `a` equals the matching leaf of `b`
    fn equal(&mut self, a: &CircuitValue, b: &CircuitValue) -> Result<Lc> {
        let (xs, ys) = (a.leaves(), b.leaves());
        if xs.len() != ys.len() {
            return Err(internal("comparing values of different shapes"));
        }
        let mut all = Lc::one();
        for (x, y) in xs.iter().zip(&ys) {
            let same = self.is_zero(&(x.lc() - y.lc()), "==")?;
            all = self.product(&all, &same, SlotType::Bool, "==")?;
        }
        Ok(all)
    }

    /// Boolean `&`, `|` or `^` of two bits
    fn bit_op(&mut self, op: BinaryOp, x: &Lc, y: &Lc, label: &str) -> Result<Lc> {
        // x | y = x + y - xy, x ^ y = x + y - 2xy
        let k = match op {
            BinaryOp::BitAnd => return self.product(x, y, SlotType::Bool, label),
            BinaryOp::BitOr => FieldElement::ONE,
            _ => FieldElement::from_u64(2),
        };
        if x.is_constant() || y.is_constant() {
            let xy = self.product(x, y, SlotType::Bool, label)?;
            return Ok(x.clone() + y.clone() - xy * k);
        }
        let value = self.eval(x).zip(self.eval(y)).map(|(x, y)| x + y - k * x * y);
        let out = self.alloc_slot(SlotInfo::private(SlotType::Bool, label), value)?;
        let sum_minus_out = x.clone() + y.clone() - Lc::from(out);
        self.emit(GateKind::Arithmetic, x.clone() * k, y.clone(), sum_minus_out, label)?;
        Ok(out.into())
    }

    fn field_division(&mut self, x: Lc, y: Lc) -> Result<CircuitValue> {
        if let Some(divisor) = y.as_constant() {
            let inverse = divisor.inverse().map_err(|_| {
                SynthesisError::lowering(self.span, "attempt to divide by zero")
            })?;
            return self.scalar(x * inverse, SlotType::Field, "/");
        }
        let divisor = self.guarded_divisor(&y)?;
        let divisor_value = self.eval(&divisor);
        let inverse = divisor_value.map(|d| d.inverse().unwrap_or(FieldElement::ZERO));
        let quotient = self.eval(&x).zip(inverse).map(|(x, inv)| x * inv);
        let q = self.alloc_slot(SlotInfo::private(SlotType::Field, "quotient"), quotient)?;
        self.emit(GateKind::Division, divisor.clone(), q.into(), x, "/")?;
        let inv = self.alloc_slot(SlotInfo::private(SlotType::Field, "divisor inverse"), inverse)?;
        self.emit(GateKind::NonZero, divisor, inv.into(), Lc::one(), "non-zero divisor")?;
        Ok(CircuitValue::scalar(Operand::Slot(q), SlotType::Field))
    }

    /// Euclidean quotient and remainder of unsigned integers
    fn unsigned_division(&mut self, x: Lc, y: Lc, width: u32) -> Result<(Operand, Operand)> {
        let ty = SlotType::UInt(width);
        if y.as_constant().is_some_and(|k| k.is_zero()) {
            return Err(SynthesisError::lowering(self.span, "attempt to divide by zero"));
        }
        if let (Some(a), Some(b)) = (x.as_constant(), y.as_constant()) {
            let (a, b) = (a.to_u256(), b.to_u256());
            return Ok((
                Operand::Const(FieldElement::from_u256_reduced(a / b)),
                Operand::Const(FieldElement::from_u256_reduced(a % b)),
            ));
        }
        let divisor = if y.is_constant() { y } else { self.guarded_divisor(&y)? };
        let values = self.eval(&x).zip(self.eval(&divisor)).map(|(a, d)| {
            let (a, d) = (a.to_u256(), d.to_u256());
            if d.is_zero() {
                (FieldElement::ZERO, FieldElement::ZERO)
            } else {
                (FieldElement::from_u256_reduced(a / d), FieldElement::from_u256_reduced(a % d))
            }
        });
        let q = self.alloc_slot(SlotInfo::private(ty, "quotient"), values.map(|v| v.0))?;
        let r = self.alloc_slot(SlotInfo::private(ty, "remainder"), values.map(|v| v.1))?;
        self.emit(GateKind::Division, divisor.clone(), q.into(), x - Lc::from(r), "/")?;
        self.range_check(&Lc::from(q), ty, "quotient range")?;
        self.range_check(&Lc::from(r), ty, "remainder range")?;
        let slack = divisor - Lc::one() - Lc::from(r);
        self.range_check(&slack, ty, "remainder bound")?;
        Ok((Operand::Slot(q), Operand::Slot(r)))
    }

    fn lower_cast(&mut self, value: Scalar, source: &Type, target: &Type) -> Result<CircuitValue> {
        let slot_type = self.slot_type(target)?;
        if !source.widens_to(target) {
            self.range_check(&value.lc(), slot_type, &format!("cast to {}", target))?;
        }
        Ok(CircuitValue::scalar(value.op, slot_type))
    }

    fn lower_call(&mut self, expr: &'a Expr, args: &'a [Expr]) -> Result<CircuitValue> {
        let program = self.program;
        let target = program
            .call_target(expr.id)
            .ok_or_else(|| internal(format!("unresolved call at {}", expr.span)))?;
        let args = args.iter().map(|arg| self.lower_expr(arg)).collect::<Result<Vec<_>>>()?;
        match target {
            CallTarget::Function(name) => self.inline_call(name, args),
            CallTarget::Builtin(name) => self.call_builtin(name, args),
        }
    }

    fn call_builtin(&mut self, name: &str, args: Vec<CircuitValue>) -> Result<CircuitValue> {
        let registry = self.registry;
        let builtin =
            registry.get(name).ok_or_else(|| internal(format!("unknown builtin `{}`", name)))?;
        let inputs: Vec<Lc> =
            args.iter().flat_map(CircuitValue::leaves).map(|leaf| leaf.lc()).collect();
        let outputs = builtin.synthesize(self, &inputs)?;
        let ret = builtin.returns();
        let shapes = leaf_paths(&ret, name);
        if outputs.len() != shapes.len() {
            return Err(internal(format!(
                "builtin `{}` returned {} values, expected {}",
                name,
                outputs.len(),
                shapes.len()
            )));
        }
        let operands = outputs
            .into_iter()
            .zip(shapes)
            .map(|(lc, (_, ty))| self.materialize(lc, ty, name))
            .collect::<Result<Vec<_>>>()?;
        CircuitValue::from_leaves(&ret, &mut operands.into_iter())
            .ok_or_else(|| internal(format!("builtin `{}` returned a malformed value", name)))
    }
}

fn component(value: &CircuitValue, position: usize) -> Result<CircuitValue> {
    value
        .components()
        .and_then(|items| items.get(position))
        .cloned()
        .ok_or_else(|| internal(format!("no component {} in value", position)))
}

fn scalar_lc(value: &CircuitValue) -> Result<Lc> {
    value.as_scalar().map(|s| s.lc()).ok_or_else(|| internal("expected a scalar value"))
}
