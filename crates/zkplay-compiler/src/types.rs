//! Semantic types

use ruint::aliases::U256;
use std::fmt;
use std::sync::Arc;
use zkplay_runtime::{AbiField, AbiType, Sign, SlotType};

/// Largest supported integer width; keeps `2^(w+1)` comfortably below the modulus
pub const MAX_INTEGER_WIDTH: u32 = 126;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructType {
    pub name: String,
    pub fields: Vec<(String, Type)>,
}

impl StructType {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(field, _)| field == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Field,
    Bool,
    UInt(u32),
    SInt(u32),
    Array(Box<Type>, usize),
    Tuple(Vec<Type>),
    Struct(Arc<StructType>),
    Unit,
}

impl Type {
    pub fn is_integer(&self) -> bool {
        matches!(self, Type::UInt(_) | Type::SInt(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Field | Type::UInt(_) | Type::SInt(_))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Field | Type::Bool | Type::UInt(_) | Type::SInt(_))
    }

    /// Bit width of integer types
    pub fn width(&self) -> Option<u32> {
        match self {
            Type::UInt(w) | Type::SInt(w) => Some(*w),
            _ => None,
        }
    }

    /// Slot type of a scalar type
    pub fn slot_type(&self) -> Option<SlotType> {
        match self {
            Type::Field => Some(SlotType::Field),
            Type::Bool => Some(SlotType::Bool),
            Type::UInt(w) => Some(SlotType::UInt(*w)),
            Type::SInt(w) => Some(SlotType::SInt(*w)),
            _ => None,
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Type::Array(element, length) => element.leaf_count() * length,
            Type::Tuple(elements) => elements.iter().map(Type::leaf_count).sum(),
            Type::Struct(def) => def.fields.iter().map(|(_, ty)| ty.leaf_count()).sum(),
            Type::Unit => 0,
            _ => 1,
        }
    }

    /// ABI view of the type; `None` for `()`
    pub fn to_abi(&self) -> Option<AbiType> {
        Some(match self {
            Type::Field => AbiType::Field,
            Type::Bool => AbiType::Boolean,
            Type::UInt(width) => AbiType::Integer { sign: Sign::Unsigned, width: *width },
            Type::SInt(width) => AbiType::Integer { sign: Sign::Signed, width: *width },
            Type::Array(element, length) => {
                AbiType::Array { length: *length, element: Box::new(element.to_abi()?) }
            }
            Type::Tuple(elements) => AbiType::Tuple {
                fields: elements.iter().map(Type::to_abi).collect::<Option<_>>()?,
            },
            Type::Struct(def) => AbiType::Struct {
                path: def.name.clone(),
                fields: def
                    .fields
                    .iter()
                    .map(|(name, ty)| Some(AbiField { name: name.clone(), ty: ty.to_abi()? }))
                    .collect::<Option<_>>()?,
            },
            Type::Unit => return None,
        })
    }

    /// Whether a value of `self` converts to `target` without a range check
    pub fn widens_to(&self, target: &Type) -> bool {
        match (self, target) {
            (a, b) if a == b => true,
            (Type::Bool, Type::UInt(_) | Type::SInt(_) | Type::Field) => true,
            (Type::UInt(_) | Type::SInt(_), Type::Field) => true,
            (Type::UInt(from), Type::UInt(to)) => from <= to,
            (Type::UInt(from), Type::SInt(to)) => from < to,
            (Type::SInt(from), Type::SInt(to)) => from <= to,
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Field => f.write_str("Field"),
            Type::Bool => f.write_str("bool"),
            Type::UInt(w) => write!(f, "u{}", w),
            Type::SInt(w) => write!(f, "i{}", w),
            Type::Array(element, length) => write!(f, "[{}; {}]", element, length),
            Type::Tuple(elements) => {
                let parts: Vec<String> = elements.iter().map(|t| t.to_string()).collect();
                if parts.len() == 1 {
                    write!(f, "({},)", parts[0])
                } else {
                    write!(f, "({})", parts.join(", "))
                }
            }
            Type::Struct(def) => f.write_str(&def.name),
            Type::Unit => f.write_str("()"),
        }
    }
}

/// Parses literal text (decimal or `0x` hex, underscores already stripped)
pub fn parse_literal(text: &str) -> Option<U256> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => U256::from_str_radix(hex, 16).ok(),
        None => U256::from_str_radix(text, 10).ok(),
    }
}

/// Whether `magnitude` (negated when `negative`) is a value of the scalar type `ty`
pub fn literal_fits(ty: &Type, magnitude: U256, negative: bool) -> bool {
    let one = U256::from(1u64);
    match ty {
        Type::Field => magnitude < zkplay_runtime::MODULUS,
        Type::UInt(w) => (!negative || magnitude.is_zero()) && magnitude < (one << *w as usize),
        Type::SInt(w) => {
            let half = one << (*w as usize - 1);
            if negative {
                magnitude <= half
            } else {
                magnitude < half
            }
        }
        _ => false,
    }
}
