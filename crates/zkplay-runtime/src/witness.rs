//! Witness assignments
//!
//! A [`WitnessAssignment`] maps every slot of a constraint system to a concrete
//! field element. It is produced fresh for each set of inputs.

use crate::field::FieldElement;
use crate::system::{ConstraintSystem, Slot};
use serde::{Deserialize, Serialize};

/// Dense slot-indexed witness values
///
/// # Examples
///
/// ```
/// use zkplay_runtime::{FieldElement, Slot, WitnessAssignment};
///
/// let witness = WitnessAssignment::new(vec![FieldElement::from_u64(3)]);
/// assert_eq!(witness.get(Slot(0)), Some(FieldElement::from_u64(3)));
/// assert_eq!(witness.get(Slot(1)), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WitnessAssignment {
    values: Vec<FieldElement>,
}

impl WitnessAssignment {
    pub fn new(values: Vec<FieldElement>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, slot: Slot) -> Option<FieldElement> {
        self.values.get(slot.index()).copied()
    }

    /// Overwrites one value; returns `false` if the slot is outside the assignment
    pub fn set(&mut self, slot: Slot, value: FieldElement) -> bool {
        match self.values.get_mut(slot.index()) {
            Some(entry) => {
                *entry = value;
                true
            }
            None => false,
        }
    }

    pub fn values(&self) -> &[FieldElement] {
        &self.values
    }

    pub fn into_values(self) -> Vec<FieldElement> {
        self.values
    }

    /// Values of the public slots of `cs`, in public-slot order
    pub fn public_values(&self, cs: &ConstraintSystem) -> Vec<FieldElement> {
        cs.public_slots().into_iter().filter_map(|slot| self.get(slot)).collect()
    }

    /// True when every slot of `cs` has a value
    pub fn covers(&self, cs: &ConstraintSystem) -> bool {
        self.values.len() >= cs.num_slots()
    }
}

impl From<Vec<FieldElement>> for WitnessAssignment {
    fn from(values: Vec<FieldElement>) -> Self {
        Self::new(values)
    }
}
