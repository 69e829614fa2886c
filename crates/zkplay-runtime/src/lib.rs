//! zkplay Runtime
//!
//! Everything a proving backend needs to consume a compiled circuit without
//! the compiler: BN254 field arithmetic, the rank-1 constraint system data
//! model, witness assignments, the constraint checker, the ABI descriptor and
//! concrete input values.

pub mod abi;
pub mod checker;
pub mod error;
pub mod field;
pub mod system;
pub mod value;
pub mod witness;

// Re-export core types for convenience
pub use abi::{AbiDescriptor, AbiField, AbiParameter, AbiReturnType, AbiType, Sign};
pub use checker::{check_satisfied, CheckError, ViolatedGate};
pub use error::{FieldError, InputError, Result, RuntimeError};
pub use field::{FieldElement, MODULUS, MODULUS_BITS};
pub use system::{
    ConstraintSystem, ConstraintSystemBuilder, Gate, GateKind, LinearCombination, Slot, SlotInfo,
    SlotType, Visibility,
};
pub use value::{InputMap, InputValue};
pub use witness::WitnessAssignment;
