//! Values flowing through lowering

use crate::types::Type;
use zkplay_runtime::{FieldElement, LinearCombination, Slot, SlotType};

/// A scalar is either folded to a constant or lives in a witness slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Const(FieldElement),
    Slot(Slot),
}

impl Operand {
    pub fn as_const(&self) -> Option<FieldElement> {
        match self {
            Operand::Const(value) => Some(*value),
            Operand::Slot(_) => None,
        }
    }

    pub fn lc(&self) -> LinearCombination {
        LinearCombination::from(*self)
    }
}

impl From<Operand> for LinearCombination {
    fn from(operand: Operand) -> Self {
        match operand {
            Operand::Const(value) => LinearCombination::constant(value),
            Operand::Slot(slot) => LinearCombination::from_slot(slot),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scalar {
    pub op: Operand,
    pub ty: SlotType,
}

impl Scalar {
    pub fn lc(&self) -> LinearCombination {
        self.op.lc()
    }
}

/// A lowered value of any type, as a tree over scalar leaves
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircuitValue {
    Scalar(Scalar),
    Array(Vec<CircuitValue>),
    Tuple(Vec<CircuitValue>),
    /// Fields in declaration order
    Struct(Vec<CircuitValue>),
    Unit,
}

impl CircuitValue {
    pub fn scalar(op: Operand, ty: SlotType) -> Self {
        CircuitValue::Scalar(Scalar { op, ty })
    }

    pub fn constant(value: FieldElement, ty: SlotType) -> Self {
        Self::scalar(Operand::Const(value), ty)
    }

    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            CircuitValue::Scalar(scalar) => Some(*scalar),
            _ => None,
        }
    }

    pub fn components(&self) -> Option<&[CircuitValue]> {
        match self {
            CircuitValue::Array(items)
            | CircuitValue::Tuple(items)
            | CircuitValue::Struct(items) => Some(items),
            _ => None,
        }
    }

    /// Same aggregate kind as `self`, holding `items`
    pub fn with_components(&self, items: Vec<CircuitValue>) -> CircuitValue {
        match self {
            CircuitValue::Tuple(_) => CircuitValue::Tuple(items),
            CircuitValue::Struct(_) => CircuitValue::Struct(items),
            _ => CircuitValue::Array(items),
        }
    }

    /// Scalar leaves in flattening order
    pub fn leaves(&self) -> Vec<Scalar> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<Scalar>) {
        match self {
            CircuitValue::Scalar(scalar) => out.push(*scalar),
            CircuitValue::Unit => {}
            _ => self.components().into_iter().flatten().for_each(|item| item.collect_leaves(out)),
        }
    }

    /// Rebuilds a value of type `ty` from operands in flattening order
    pub fn from_leaves(ty: &Type, leaves: &mut impl Iterator<Item = Operand>) -> Option<Self> {
        Some(match ty {
            Type::Array(element, length) => CircuitValue::Array(
                (0..*length)
                    .map(|_| Self::from_leaves(element, &mut *leaves))
                    .collect::<Option<_>>()?,
            ),
            Type::Tuple(elements) => CircuitValue::Tuple(
                elements.iter().map(|t| Self::from_leaves(t, &mut *leaves)).collect::<Option<_>>()?,
            ),
            Type::Struct(def) => CircuitValue::Struct(
                def.fields
                    .iter()
                    .map(|(_, t)| Self::from_leaves(t, &mut *leaves))
                    .collect::<Option<_>>()?,
            ),
            Type::Unit => CircuitValue::Unit,
            scalar => CircuitValue::scalar(leaves.next()?, scalar.slot_type()?),
        })
    }
}

/// Scalar leaf types of `ty` with their display paths under `prefix`
pub fn leaf_paths(ty: &Type, prefix: &str) -> Vec<(String, SlotType)> {
    let mut out = Vec::new();
    collect_leaf_paths(ty, prefix, &mut out);
    out
}

fn collect_leaf_paths(ty: &Type, prefix: &str, out: &mut Vec<(String, SlotType)>) {
    match ty {
        Type::Array(element, length) => {
            for i in 0..*length {
                collect_leaf_paths(element, &format!("{}[{}]", prefix, i), out);
            }
        }
        Type::Tuple(elements) => {
            for (i, element) in elements.iter().enumerate() {
                collect_leaf_paths(element, &format!("{}.{}", prefix, i), out);
            }
        }
        Type::Struct(def) => {
            for (name, field) in &def.fields {
                collect_leaf_paths(field, &format!("{}.{}", prefix, name), out);
            }
        }
        Type::Unit => {}
        scalar => {
            if let Some(slot_type) = scalar.slot_type() {
                out.push((prefix.to_string(), slot_type));
            }
        }
    }
}
