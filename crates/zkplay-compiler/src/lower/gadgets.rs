//! Constraint gadgets shared by expression and statement lowering
//!
//! Every gadget works in both modes: it always emits the same slots and
//! gates, and computes slot values only when a witness is being generated.

use super::value::{CircuitValue, Operand, Scalar};
use super::{internal, Result, Synthesizer};
use crate::error::{ExecutionError, SynthesisError};
use zkplay_runtime::{FieldElement, Gate, GateKind, LinearCombination, Slot, SlotInfo, SlotType};

type Lc = LinearCombination;

/// Offset added before decomposing a value of `ty`, and its bit width
pub(super) fn range_shape(ty: SlotType) -> Option<(usize, FieldElement)> {
    match ty {
        SlotType::UInt(width) => Some((width as usize, FieldElement::ZERO)),
        SlotType::SInt(width) => {
            Some((width as usize, FieldElement::power_of_two(width as usize - 1)))
        }
        SlotType::Field | SlotType::Bool => None,
    }
}

/// Whether the field element `value` is a member of the integer type `ty`
pub(super) fn fits(ty: SlotType, value: FieldElement) -> bool {
    match range_shape(ty) {
        Some((width, offset)) => (value + offset).bit_len() <= width,
        None => ty != SlotType::Bool || value.is_zero() || value.is_one(),
    }
}

/// Human-readable rendering of `value` as a member of `ty`
pub(super) fn display_value(ty: SlotType, value: FieldElement) -> String {
    match (ty, value.to_i128()) {
        (SlotType::SInt(_), Some(signed)) => signed.to_string(),
        _ => value.to_string(),
    }
}

impl Synthesizer<'_> {
    /// Value of `lc`: always known for constants, for slots only in witness mode
    pub(super) fn eval(&self, lc: &Lc) -> Option<FieldElement> {
        if let Some(constant) = lc.as_constant() {
            return Some(constant);
        }
        lc.evaluate(self.values.as_ref()?).ok()
    }

    /// Whether the code being lowered executes for the current witness
    ///
    /// Always false while only the constraint system is built, so a
    /// constant-false assertion compiles to an unsatisfiable gate.
    pub(super) fn is_active(&self) -> bool {
        self.values.is_some() && self.eval(&self.predicate).is_some_and(|p| !p.is_zero())
    }

    pub(super) fn alloc_slot(
        &mut self,
        info: SlotInfo,
        value: Option<FieldElement>,
    ) -> Result<Slot> {
        if let Some(values) = self.values.as_mut() {
            let value = value
                .ok_or_else(|| internal(format!("no value computed for slot `{}`", info.label)))?;
            values.push(value);
        }
        Ok(self.builder.alloc(info))
    }

    pub(super) fn emit(
        &mut self,
        kind: GateKind,
        a: Lc,
        b: Lc,
        c: Lc,
        label: &str,
    ) -> Result<()> {
        if self.builder.num_gates() >= self.config.max_gates {
            let message =
                format!("circuit exceeds the limit of {} gates", self.config.max_gates);
            return Err(SynthesisError::resource(self.span, message));
        }
        let label = format!("{} ({})", label, self.span);
        self.builder.push_gate(Gate::new(kind, a, b, c, label));
        Ok(())
    }

    /// `a · b`, free when either side is constant
    pub(super) fn product(&mut self, a: &Lc, b: &Lc, ty: SlotType, label: &str) -> Result<Lc> {
        if let Some(k) = a.as_constant() {
            return Ok(b.clone() * k);
        }
        if let Some(k) = b.as_constant() {
            return Ok(a.clone() * k);
        }
        let value = self.eval(a).zip(self.eval(b)).map(|(a, b)| a * b);
        let out = self.alloc_slot(SlotInfo::private(ty, label), value)?;
        self.emit(GateKind::Arithmetic, a.clone(), b.clone(), out.into(), label)?;
        Ok(out.into())
    }

    /// Pins `lc` to a single operand, allocating a slot only when needed
    pub(super) fn materialize(&mut self, lc: Lc, ty: SlotType, label: &str) -> Result<Operand> {
        let lc = lc.simplify();
        if let Some(constant) = lc.as_constant() {
            return Ok(Operand::Const(constant));
        }
        if let Some(slot) = lc.as_slot() {
            return Ok(Operand::Slot(slot));
        }
        let value = self.eval(&lc);
        let out = self.alloc_slot(SlotInfo::private(ty, label), value)?;
        self.emit(GateKind::Arithmetic, lc, Lc::one(), out.into(), label)?;
        Ok(Operand::Slot(out))
    }

    pub(super) fn scalar(&mut self, lc: Lc, ty: SlotType, label: &str) -> Result<CircuitValue> {
        Ok(CircuitValue::scalar(self.materialize(lc, ty, label)?, ty))
    }

    /// `predicate · x`: equals `x` on the taken path and 0 elsewhere
    pub(super) fn guard(&mut self, x: &Lc, label: &str) -> Result<Lc> {
        if let Some(k) = self.predicate.as_constant() {
            return Ok(x.clone() * k);
        }
        if let Some(k) = x.as_constant() {
            return Ok(self.predicate.clone() * k);
        }
        let predicate = self.predicate.clone();
        self.product(&predicate, x, SlotType::Field, label)
    }

    /// Splits `x + offset` into `width` boolean slots, least significant first
    pub(super) fn decompose(
        &mut self,
        x: &Lc,
        offset: FieldElement,
        width: usize,
        label: &str,
    ) -> Result<Vec<Lc>> {
        let shifted = self.eval(x).map(|value| value + offset);
        let mut bits = Vec::with_capacity(width);
        let mut recomposed = Lc::constant(-offset);
        for i in 0..width {
            let bit = shifted.map(|value| FieldElement::from_bool(value.bit(i)));
            let info = SlotInfo::private(SlotType::Bool, format!("{} bit {}", label, i));
            let slot = self.alloc_slot(info, bit)?;
            self.emit(GateKind::Boolean, slot.into(), slot.into(), slot.into(), label)?;
            recomposed = recomposed.with_term(slot, FieldElement::power_of_two(i));
            bits.push(Lc::from(slot));
        }
        self.emit(GateKind::RangeDecomposition, recomposed, Lc::one(), x.clone(), label)?;
        Ok(bits)
    }

    /// Constrains `x` to the value range of `ty` on the taken path
    pub(super) fn range_check(&mut self, x: &Lc, ty: SlotType, label: &str) -> Result<()> {
        let Some((width, offset)) = range_shape(ty) else { return Ok(()) };
        if let Some(constant) = x.as_constant() {
            if fits(ty, constant) {
                return Ok(());
            }
            let message =
                format!("constant {} does not fit in `{}`", display_value(ty, constant), ty);
            return Err(SynthesisError::lowering(self.span, message));
        }
        let guarded = self.guard(x, label)?;
        if let Some(value) = self.eval(&guarded).filter(|value| !fits(ty, *value)) {
            return Err(ExecutionError::RangeCheckViolation {
                location: self.location(),
                value: display_value(ty, value),
                ty: ty.to_string(),
            }
            .into());
        }
        self.decompose(&guarded, offset, width, label)?;
        Ok(())
    }

    /// Bits of an unsigned value, constant when `x` is
    pub(super) fn bits(&mut self, x: &Lc, width: usize, label: &str) -> Result<Vec<Lc>> {
        if let Some(constant) = x.as_constant() {
            return Ok((0..width)
                .map(|i| Lc::constant(FieldElement::from_bool(constant.bit(i))))
                .collect());
        }
        let guarded = self.guard(x, label)?;
        self.decompose(&guarded, FieldElement::ZERO, width, label)
    }

    /// 1 when `x` is zero, 0 otherwise
    pub(super) fn is_zero(&mut self, x: &Lc, label: &str) -> Result<Lc> {
        if let Some(constant) = x.as_constant() {
            return Ok(Lc::constant(FieldElement::from_bool(constant.is_zero())));
        }
        let value = self.eval(x);
        let result = value.map(|v| FieldElement::from_bool(v.is_zero()));
        let inverse = value.map(|v| v.inverse().unwrap_or(FieldElement::ZERO));
        let r = self.alloc_slot(SlotInfo::private(SlotType::Bool, label), result)?;
        let inv = self.alloc_slot(SlotInfo::private(SlotType::Field, label), inverse)?;
        let one_minus_r = Lc::one() - Lc::from(r);
        self.emit(GateKind::IsZero, x.clone(), inv.into(), one_minus_r, label)?;
        self.emit(GateKind::IsZero, x.clone(), r.into(), Lc::zero(), label)?;
        Ok(r.into())
    }

    /// `a >= b` for integers of `width` bits (signed or unsigned)
    pub(super) fn greater_or_equal(
        &mut self,
        a: &Lc,
        b: &Lc,
        width: usize,
        label: &str,
    ) -> Result<Lc> {
        let difference = (a.clone() - b.clone()).simplify();
        if let Some(constant) = difference.as_constant() {
            let shifted = constant + FieldElement::power_of_two(width);
            return Ok(Lc::constant(FieldElement::from_bool(shifted.bit(width))));
        }
        let guarded = self.guard(&difference, label)?;
        let offset = FieldElement::power_of_two(width);
        let bits = self.decompose(&guarded, offset, width + 1, label)?;
        bits.into_iter().last().ok_or_else(|| internal("empty comparison decomposition"))
    }

    /// `c ? t : f` for a boolean `c`
    pub(super) fn select(&mut self, c: &Lc, t: Scalar, f: Scalar) -> Result<Scalar> {
        if t.op == f.op {
            return Ok(t);
        }
        if let Some(k) = c.as_constant() {
            return Ok(if k.is_zero() { f } else { t });
        }
        let value = match (self.eval(c), self.eval(&t.lc()), self.eval(&f.lc())) {
            (Some(c), Some(t), Some(f)) => Some(if c.is_zero() { f } else { t }),
            _ => None,
        };
        let out = self.alloc_slot(SlotInfo::private(t.ty, "select"), value)?;
        let r_minus_f = Lc::from(out) - f.lc();
        self.emit(GateKind::Select, c.clone(), t.lc() - f.lc(), r_minus_f, "select")?;
        Ok(Scalar { op: Operand::Slot(out), ty: t.ty })
    }

    /// Leafwise [`select`](Self::select) over values of the same type
    pub(super) fn select_value(
        &mut self,
        c: &Lc,
        t: &CircuitValue,
        f: &CircuitValue,
    ) -> Result<CircuitValue> {
        if t == f {
            return Ok(t.clone());
        }
        match (t, f) {
            (CircuitValue::Scalar(t), CircuitValue::Scalar(f)) => {
                Ok(CircuitValue::Scalar(self.select(c, *t, *f)?))
            }
            (CircuitValue::Unit, CircuitValue::Unit) => Ok(CircuitValue::Unit),
            _ => {
                let (Some(ts), Some(fs)) = (t.components(), f.components()) else {
                    return Err(internal("selecting between values of different shapes"));
                };
                if ts.len() != fs.len() {
                    return Err(internal("selecting between values of different shapes"));
                }
                let items = ts
                    .iter()
                    .zip(fs)
                    .map(|(t, f)| self.select_value(c, t, f))
                    .collect::<Result<Vec<_>>>()?;
                Ok(t.with_components(items))
            }
        }
    }

    /// Enforces `x = 0` on the taken path
    pub(super) fn assert_zero(&mut self, x: &Lc, message: Option<&str>) -> Result<()> {
        if x.as_constant().is_some_and(|k| k.is_zero()) {
            return Ok(());
        }
        if self.is_active() && self.eval(x).is_some_and(|v| !v.is_zero()) {
            return Err(self.assertion_failed(message));
        }
        let predicate = self.predicate.clone();
        self.emit(GateKind::Assert, predicate, x.clone(), Lc::zero(), message.unwrap_or("assert"))
    }

    /// Enforces `x ≠ 0` on the taken path
    pub(super) fn assert_non_zero(&mut self, x: &Lc, message: Option<&str>) -> Result<()> {
        if x.as_constant().is_some_and(|k| !k.is_zero()) {
            return Ok(());
        }
        let value = self.eval(x);
        if self.is_active() && value.is_some_and(|v| v.is_zero()) {
            return Err(self.assertion_failed(message));
        }
        // inv = p / x, and 0 wherever the path is not taken
        let predicate = self.predicate.clone();
        let inverse = value.zip(self.eval(&predicate)).map(|(v, p)| match v.inverse() {
            Ok(inv) => p * inv,
            Err(_) => FieldElement::ZERO,
        });
        let label = message.unwrap_or("assert non-zero");
        let inv = self.alloc_slot(SlotInfo::private(SlotType::Field, label), inverse)?;
        self.emit(GateKind::NonZero, x.clone(), inv.into(), predicate, label)
    }

    fn assertion_failed(&self, message: Option<&str>) -> SynthesisError {
        ExecutionError::AssertionFailed {
            location: self.location(),
            message: message.map(str::to_string),
        }
        .into()
    }

    /// Raises a division-by-zero error when the taken path divides by zero
    pub(super) fn check_divisor(&self, divisor: &Lc) -> Result<()> {
        if self.is_active() && self.eval(divisor).is_some_and(|v| v.is_zero()) {
            return Err(ExecutionError::DivisionByZero { location: self.location() }.into());
        }
        Ok(())
    }

    /// Divisor that equals `divisor` on the taken path and 1 elsewhere
    pub(super) fn guarded_divisor(&mut self, divisor: &Lc) -> Result<Lc> {
        self.check_divisor(divisor)?;
        let shifted = self.guard(&(divisor.clone() - Lc::one()), "divisor")?;
        Ok(shifted + Lc::one())
    }

    /// One-hot selectors for `index` over `length` positions, with a bounds gate
    pub(super) fn index_selectors(&mut self, index: &Lc, length: usize) -> Result<Vec<Lc>> {
        let value = self.eval(index);
        let in_bounds = |v: FieldElement| v.to_u64().is_some_and(|i| i < length as u64);
        if let Some(v) = value.filter(|v| self.is_active() && !in_bounds(*v)) {
            let location = self.location();
            return Err(ExecutionError::IndexOutOfBounds { location, index: v.to_string(), length }
                .into());
        }
        let mut selectors = Vec::with_capacity(length);
        let mut total = Lc::zero();
        for k in 0..length {
            let offset = index.clone() - Lc::constant(FieldElement::from_u64(k as u64));
            let selector = self.is_zero(&offset, "index selector")?;
            total = total + selector.clone();
            selectors.push(selector);
        }
        let predicate = self.predicate.clone();
        self.emit(GateKind::Assert, predicate, Lc::one() - total, Lc::zero(), "index bound")?;
        Ok(selectors)
    }

    /// `Σ selector_k · leaf_k` for each leaf position of the elements
    pub(super) fn select_by(
        &mut self,
        selectors: &[Lc],
        elements: &[CircuitValue],
    ) -> Result<CircuitValue> {
        let Some(first) = elements.first() else {
            return Err(internal("indexing into an empty array"));
        };
        let leaves: Vec<Vec<Scalar>> = elements.iter().map(CircuitValue::leaves).collect();
        let mut picked = Vec::new();
        for (position, template) in leaves[0].iter().enumerate() {
            let mut acc = Lc::zero();
            for (selector, element) in selectors.iter().zip(&leaves) {
                let leaf = element
                    .get(position)
                    .ok_or_else(|| internal("array elements of different shapes"))?;
                acc = acc + self.product(selector, &leaf.lc(), template.ty, "index read")?;
            }
            picked.push(self.materialize(acc, template.ty, "index read")?);
        }
        rebuild(first, &mut picked.into_iter())
    }
}

/// Rebuilds a value shaped like `template` from operands in flattening order
pub(super) fn rebuild(
    template: &CircuitValue,
    operands: &mut impl Iterator<Item = Operand>,
) -> Result<CircuitValue> {
    match template {
        CircuitValue::Scalar(scalar) => {
            let op = operands.next().ok_or_else(|| internal("too few operands to rebuild"))?;
            Ok(CircuitValue::scalar(op, scalar.ty))
        }
        CircuitValue::Unit => Ok(CircuitValue::Unit),
        _ => {
            let items = template
                .components()
                .unwrap_or_default()
                .iter()
                .map(|item| rebuild(item, &mut *operands))
                .collect::<Result<Vec<_>>>()?;
            Ok(template.with_components(items))
        }
    }
}
