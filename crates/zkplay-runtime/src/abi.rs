//! ABI descriptors
//!
//! The ABI is the externally visible contract of a compiled circuit: every
//! parameter of the entry function with its type and visibility, in
//! declaration order, plus the witness slots each parameter's scalar leaves
//! occupy. The JSON shape is shared with editor tooling:
//!
//! ```json
//! {
//!   "parameters": [{ "name": "x", "type": { "kind": "field" }, "visibility": "private" }],
//!   "param_witnesses": { "x": [0] },
//!   "return_type": null,
//!   "return_witnesses": []
//! }
//! ```

use crate::error::InputError;
use crate::field::FieldElement;
use crate::system::{Slot, SlotType, Visibility};
use crate::value::{InputMap, InputValue};
use crate::witness::WitnessAssignment;
use ruint::aliases::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    Unsigned,
    Signed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: AbiType,
}

/// Type of an ABI parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AbiType {
    Field,
    Boolean,
    Integer {
        sign: Sign,
        width: u32,
    },
    Array {
        length: usize,
        #[serde(rename = "type")]
        element: Box<AbiType>,
    },
    Tuple {
        fields: Vec<AbiType>,
    },
    Struct {
        path: String,
        fields: Vec<AbiField>,
    },
}

impl AbiType {
    /// Number of scalar witness slots a value of this type occupies
    pub fn leaf_count(&self) -> usize {
        match self {
            AbiType::Field | AbiType::Boolean | AbiType::Integer { .. } => 1,
            AbiType::Array { length, element } => length * element.leaf_count(),
            AbiType::Tuple { fields } => fields.iter().map(AbiType::leaf_count).sum(),
            AbiType::Struct { fields, .. } => fields.iter().map(|f| f.ty.leaf_count()).sum(),
        }
    }

    /// Scalar leaf types in flattening order
    pub fn leaf_types(&self) -> Vec<SlotType> {
        let mut out = Vec::with_capacity(self.leaf_count());
        self.collect_leaf_types(&mut out);
        out
    }

    fn collect_leaf_types(&self, out: &mut Vec<SlotType>) {
        match self {
            AbiType::Field => out.push(SlotType::Field),
            AbiType::Boolean => out.push(SlotType::Bool),
            AbiType::Integer { sign: Sign::Unsigned, width } => out.push(SlotType::UInt(*width)),
            AbiType::Integer { sign: Sign::Signed, width } => out.push(SlotType::SInt(*width)),
            AbiType::Array { length, element } => {
                for _ in 0..*length {
                    element.collect_leaf_types(out);
                }
            }
            AbiType::Tuple { fields } => fields.iter().for_each(|f| f.collect_leaf_types(out)),
            AbiType::Struct { fields, .. } => {
                fields.iter().for_each(|f| f.ty.collect_leaf_types(out))
            }
        }
    }

    /// Validates `value` against this type and appends its scalar leaves to `out`
    pub fn flatten(
        &self,
        path: &str,
        value: &InputValue,
        out: &mut Vec<FieldElement>,
    ) -> Result<(), InputError> {
        let mismatch = || InputError::TypeMismatch {
            path: path.to_string(),
            expected: self.to_string(),
            found: value.kind(),
        };
        match (self, value) {
            (AbiType::Field, InputValue::Field(v)) => out.push(*v),
            (AbiType::Boolean, InputValue::Bool(b)) => out.push(FieldElement::from_bool(*b)),
            (AbiType::Boolean, InputValue::Field(v)) if v.is_zero() || v.is_one() => out.push(*v),
            (AbiType::Integer { sign, width }, InputValue::Field(v)) => {
                if !integer_in_range(*sign, *width, v) {
                    return Err(InputError::OutOfRange {
                        path: path.to_string(),
                        value: display_integer(*sign, v),
                        ty: self.to_string(),
                    });
                }
                out.push(*v);
            }
            (AbiType::Array { length, element }, InputValue::Vec(items)) => {
                if items.len() != *length {
                    return Err(mismatch());
                }
                for (i, item) in items.iter().enumerate() {
                    element.flatten(&format!("{}[{}]", path, i), item, out)?;
                }
            }
            (AbiType::Tuple { fields }, InputValue::Vec(items)) => {
                if items.len() != fields.len() {
                    return Err(mismatch());
                }
                for (i, (field, item)) in fields.iter().zip(items).enumerate() {
                    field.flatten(&format!("{}.{}", path, i), item, out)?;
                }
            }
            (AbiType::Struct { fields, .. }, InputValue::Struct(map)) => {
                for field in fields {
                    let field_path = format!("{}.{}", path, field.name);
                    let item = map
                        .get(&field.name)
                        .ok_or_else(|| InputError::Missing(field_path.clone()))?;
                    field.ty.flatten(&field_path, item, out)?;
                }
                if let Some(extra) = map.keys().find(|k| !fields.iter().any(|f| &f.name == *k)) {
                    return Err(InputError::Unexpected(format!("{}.{}", path, extra)));
                }
            }
            _ => return Err(mismatch()),
        }
        Ok(())
    }

    /// Rebuilds a structured value from scalar leaves in flattening order
    pub fn unflatten(&self, leaves: &mut impl Iterator<Item = FieldElement>) -> Option<InputValue> {
        Some(match self {
            AbiType::Field => InputValue::Field(leaves.next()?),
            AbiType::Boolean => InputValue::Bool(leaves.next()?.is_one()),
            AbiType::Integer { .. } => InputValue::Field(leaves.next()?),
            AbiType::Array { length, element } => InputValue::Vec(
                (0..*length).map(|_| element.unflatten(&mut *leaves)).collect::<Option<_>>()?,
            ),
            AbiType::Tuple { fields } => InputValue::Vec(
                fields.iter().map(|f| f.unflatten(&mut *leaves)).collect::<Option<_>>()?,
            ),
            AbiType::Struct { fields, .. } => InputValue::Struct(
                fields
                    .iter()
                    .map(|f| Some((f.name.clone(), f.ty.unflatten(&mut *leaves)?)))
                    .collect::<Option<_>>()?,
            ),
        })
    }
}

fn integer_in_range(sign: Sign, width: u32, value: &FieldElement) -> bool {
    match sign {
        Sign::Unsigned => value.bit_len() <= width as usize,
        Sign::Signed => {
            let half = U256::from(1u64) << (width as usize - 1);
            let v = value.to_u256();
            // Non-negative values sit below 2^(w-1); negatives are P - |v| with |v| <= 2^(w-1)
            v < half || (-*value).to_u256() <= half
        }
    }
}

fn display_integer(sign: Sign, value: &FieldElement) -> String {
    match (sign, value.to_i128()) {
        (Sign::Signed, Some(v)) => v.to_string(),
        _ => value.to_string(),
    }
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiType::Field => f.write_str("Field"),
            AbiType::Boolean => f.write_str("bool"),
            AbiType::Integer { sign: Sign::Unsigned, width } => write!(f, "u{}", width),
            AbiType::Integer { sign: Sign::Signed, width } => write!(f, "i{}", width),
            AbiType::Array { length, element } => write!(f, "[{}; {}]", element, length),
            AbiType::Tuple { fields } => {
                let parts: Vec<String> = fields.iter().map(|t| t.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
            AbiType::Struct { path, .. } => f.write_str(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: AbiType,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiReturnType {
    pub abi_type: AbiType,
    pub visibility: Visibility,
}

/// Parameter manifest of a compiled circuit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiDescriptor {
    pub parameters: Vec<AbiParameter>,
    pub param_witnesses: BTreeMap<String, Vec<Slot>>,
    pub return_type: Option<AbiReturnType>,
    pub return_witnesses: Vec<Slot>,
}

impl AbiDescriptor {
    pub fn parameter(&self, name: &str) -> Option<&AbiParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn public_parameters(&self) -> impl Iterator<Item = &AbiParameter> {
        self.parameters.iter().filter(|p| p.visibility == Visibility::Public)
    }

    /// Flattens `inputs` into per-parameter scalar leaves, in declaration order.
    /// Every parameter must be present and no extra keys are allowed.
    pub fn encode_inputs(&self, inputs: &InputMap) -> Result<Vec<Vec<FieldElement>>, InputError> {
        if let Some(extra) = inputs.keys().find(|name| self.parameter(name).is_none()) {
            return Err(InputError::Unexpected(extra.clone()));
        }
        self.parameters
            .iter()
            .map(|param| {
                let value =
                    inputs.get(&param.name).ok_or_else(|| InputError::Missing(param.name.clone()))?;
                let mut leaves = Vec::with_capacity(param.ty.leaf_count());
                param.ty.flatten(&param.name, value, &mut leaves)?;
                Ok(leaves)
            })
            .collect()
    }

    /// Reads the entry function's return value back out of a witness
    pub fn decode_return(&self, witness: &WitnessAssignment) -> Option<InputValue> {
        let ret = self.return_type.as_ref()?;
        let values: Vec<FieldElement> =
            self.return_witnesses.iter().map(|slot| witness.get(*slot)).collect::<Option<_>>()?;
        ret.abi_type.unflatten(&mut values.into_iter())
    }
}
