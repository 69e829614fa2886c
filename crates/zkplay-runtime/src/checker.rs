//! Constraint satisfaction checking
//!
//! [`check_satisfied`] evaluates every gate of a [`ConstraintSystem`] against a
//! [`WitnessAssignment`]. It never stops at the first failure: the returned
//! [`CheckError::Unsatisfied`] lists every violated gate. An assignment that
//! does not cover the system is reported separately as
//! [`CheckError::MissingSlot`], since that means lowering and execution
//! disagree rather than that the witness is wrong.

use crate::field::FieldElement;
use crate::system::{ConstraintSystem, GateKind, Slot};
use crate::witness::WitnessAssignment;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// A gate whose relation does not hold under the assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolatedGate {
    /// Position of the gate in the system
    pub index: usize,
    pub kind: GateKind,
    pub label: String,
    /// Evaluated `A · B`
    pub lhs: FieldElement,
    /// Evaluated `C`
    pub rhs: FieldElement,
}

impl fmt::Display for ViolatedGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gate #{} [{}] '{}': ", self.index, self.kind, self.label)?;
        write!(f, "{} != {}", self.lhs, self.rhs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// One or more gates evaluate to false
    #[error("{} constraint(s) violated", .0.len())]
    Unsatisfied(Vec<ViolatedGate>),

    /// The assignment has no value for a slot referenced by a gate
    #[error("Gate #{gate} references slot {slot} which has no assigned value")]
    MissingSlot { gate: usize, slot: Slot },

    /// The assignment is shorter than the slot table
    #[error("Witness assigns {found} slots but the constraint system declares {expected}")]
    IncompleteAssignment { expected: usize, found: usize },
}

impl CheckError {
    /// Violated gates, empty for internal inconsistencies
    pub fn violations(&self) -> &[ViolatedGate] {
        match self {
            CheckError::Unsatisfied(violations) => violations,
            _ => &[],
        }
    }
}

/// Checks every gate of `cs` against `witness`
///
/// # Examples
///
/// ```
/// use zkplay_runtime::{
///     check_satisfied, ConstraintSystemBuilder, FieldElement, Gate, GateKind, SlotInfo,
///     SlotType, WitnessAssignment,
/// };
///
/// let mut builder = ConstraintSystemBuilder::new();
/// let x = builder.alloc(SlotInfo::private(SlotType::Field, "x"));
/// let y = builder.alloc(SlotInfo::public(SlotType::Field, "y"));
/// builder.push_gate(Gate::new(GateKind::Arithmetic, x.into(), x.into(), y.into(), "x*x"));
/// let cs = builder.finish();
///
/// let good = WitnessAssignment::new(vec![FieldElement::from_u64(3), FieldElement::from_u64(9)]);
/// assert!(check_satisfied(&cs, &good).is_ok());
///
/// let bad = WitnessAssignment::new(vec![FieldElement::from_u64(3), FieldElement::from_u64(10)]);
/// assert_eq!(check_satisfied(&cs, &bad).unwrap_err().violations().len(), 1);
/// ```
pub fn check_satisfied(
    cs: &ConstraintSystem,
    witness: &WitnessAssignment,
) -> Result<(), CheckError> {
    if !witness.covers(cs) {
        let (expected, found) = (cs.num_slots(), witness.len());
        return Err(CheckError::IncompleteAssignment { expected, found });
    }

    let values = witness.values();
    let mut violations = Vec::new();
    for (index, gate) in cs.gates().iter().enumerate() {
        let a = gate.a.evaluate(values);
        let b = gate.b.evaluate(values);
        let c = gate.c.evaluate(values);
        let (a, b, c) = match (a, b, c) {
            (Ok(a), Ok(b), Ok(c)) => (a, b, c),
            (Err(slot), _, _) | (_, Err(slot), _) | (_, _, Err(slot)) => {
                return Err(CheckError::MissingSlot { gate: index, slot });
            }
        };
        let lhs = a * b;
        if lhs != c {
            let label = gate.label.clone();
            violations.push(ViolatedGate { index, kind: gate.kind, label, lhs, rhs: c });
        }
    }

    if violations.is_empty() {
        debug!(gates = cs.num_gates(), slots = cs.num_slots(), "all constraints satisfied");
        Ok(())
    } else {
        warn!(violated = violations.len(), gates = cs.num_gates(), "constraints violated");
        Err(CheckError::Unsatisfied(violations))
    }
}
