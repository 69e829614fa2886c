//! Circuit lowering and witness generation
//!
//! A single walk over the typed program serves both purposes. Called without
//! inputs, [`synthesize`] emits the constraint system and the ABI. Called
//! with inputs it performs the identical walk and additionally records a value
//! for every slot it allocates, which yields the witness. The walk never
//! branches on witness values (only on compile-time constants), so both runs
//! allocate the same slots and emit the same gates.
//!
//! Control flow is flattened into data flow. Both branches of an `if` are
//! lowered, each under a path predicate `p` that is 1 exactly when the
//! branch is taken; variables the branches disagree on are merged with
//! selection gates. Anything that could make an untaken branch unsatisfiable
//! (assertions, range checks, divisors, dynamic indices) is multiplied by the
//! predicate first. Loops are unrolled and calls are inlined.

mod expr;
mod gadgets;
mod stmt;
pub mod value;

use crate::builtins::{BuiltinContext, BuiltinRegistry};
use crate::config::CompilerConfig;
use crate::diagnostic::Span;
use crate::error::{ExecutionError, SynthesisError};
use crate::typeck::TypedProgram;
use crate::types::Type;
use tracing::debug;
use value::{leaf_paths, CircuitValue, Operand};
use zkplay_runtime::{
    AbiDescriptor, AbiParameter, AbiReturnType, ConstraintSystem, ConstraintSystemBuilder,
    FieldElement, GateKind, LinearCombination, Slot, SlotInfo, SlotType, Visibility,
};

pub(crate) type Result<T> = std::result::Result<T, SynthesisError>;

/// Output of one lowering walk
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub constraint_system: ConstraintSystem,
    pub abi: AbiDescriptor,
    /// One value per slot, present when inputs were supplied
    pub witness: Option<Vec<FieldElement>>,
}

fn internal(message: impl Into<String>) -> SynthesisError {
    SynthesisError::Execution(ExecutionError::internal(message))
}

/// Lowers the entry function of `program`
///
/// `inputs` holds the flattened scalar leaves of each entry parameter, in
/// declaration order, as produced by
/// [`AbiDescriptor::encode_inputs`](zkplay_runtime::AbiDescriptor::encode_inputs).
pub fn synthesize(
    program: &TypedProgram,
    registry: &BuiltinRegistry,
    config: &CompilerConfig,
    inputs: Option<&[Vec<FieldElement>]>,
) -> Result<Synthesis> {
    let (function, signature) = program
        .entry_function()
        .ok_or_else(|| internal(format!("entry function `{}` is missing", program.entry)))?;
    let mut synth = Synthesizer::new(program, registry, config, inputs.is_some());
    synth.span = function.span;

    let mut abi = AbiDescriptor::default();
    let mut params = Vec::with_capacity(function.params.len());
    for (index, (param, ty)) in function.params.iter().zip(&signature.params).enumerate() {
        let name = param.name.name.clone();
        let visibility = if param.public { Visibility::Public } else { Visibility::Private };
        let abi_type =
            ty.to_abi().ok_or_else(|| internal(format!("parameter `{}` has no ABI type", name)))?;
        let leaves = leaf_paths(ty, &name);
        let mut slots = Vec::with_capacity(leaves.len());
        for (leaf, (path, slot_type)) in leaves.iter().enumerate() {
            let value = match inputs {
                Some(inputs) => Some(
                    *inputs
                        .get(index)
                        .and_then(|values| values.get(leaf))
                        .ok_or_else(|| internal(format!("no input value for `{}`", path)))?,
                ),
                None => None,
            };
            let info = SlotInfo { visibility, ty: *slot_type, label: path.clone() };
            slots.push(synth.alloc_slot(info, value)?);
        }
        abi.parameters.push(AbiParameter { name: name.clone(), ty: abi_type, visibility });
        abi.param_witnesses.insert(name, slots.clone());
        params.push((param, ty, leaves, slots));
    }

    // All parameter slots come first so their indices follow the ABI order
    for (param, ty, leaves, slots) in params {
        synth.span = param.span;
        for ((path, slot_type), slot) in leaves.iter().zip(&slots) {
            synth.constrain_input(*slot, *slot_type, path)?;
        }
        let value = CircuitValue::from_leaves(ty, &mut slots.into_iter().map(Operand::Slot))
            .ok_or_else(|| internal("parameter shape mismatch"))?;
        synth.declare(param.name.name.clone(), value);
    }

    let result = synth.lower_block(&function.body)?;

    if signature.ret != Type::Unit {
        let public = function.return_type.as_ref().is_some_and(|ret| ret.public);
        let visibility = if public { Visibility::Public } else { Visibility::Private };
        synth.span = function.body.tail.as_ref().map_or(function.body.span, |tail| tail.span);
        let abi_type =
            signature.ret.to_abi().ok_or_else(|| internal("return type has no ABI type"))?;
        let paths = leaf_paths(&signature.ret, "return");
        let leaves = result.leaves();
        if paths.len() != leaves.len() {
            return Err(internal("return value shape mismatch"));
        }
        for ((path, slot_type), leaf) in paths.into_iter().zip(leaves) {
            let value = synth.eval(&leaf.lc());
            let info = SlotInfo { visibility, ty: slot_type, label: path.clone() };
            let out = synth.alloc_slot(info, value)?;
            synth.emit(GateKind::Output, leaf.lc(), LinearCombination::one(), out.into(), &path)?;
            abi.return_witnesses.push(out);
        }
        abi.return_type = Some(AbiReturnType { abi_type, visibility });
    }

    let (constraint_system, witness) = synth.finish();
    debug!(
        slots = constraint_system.num_slots(),
        gates = constraint_system.num_gates(),
        witness = witness.is_some(),
        "synthesized circuit"
    );
    Ok(Synthesis { constraint_system, abi, witness })
}

type Scope = Vec<(String, CircuitValue)>;

pub(crate) struct Synthesizer<'a> {
    program: &'a TypedProgram,
    registry: &'a BuiltinRegistry,
    config: &'a CompilerConfig,
    builder: ConstraintSystemBuilder,
    /// Slot values, tracked only while generating a witness
    values: Option<Vec<FieldElement>>,
    /// 1 exactly when the code being lowered executes
    predicate: LinearCombination,
    scopes: Vec<Scope>,
    inline_depth: usize,
    /// Source position reported by diagnostics and execution errors
    span: Span,
}

impl<'a> Synthesizer<'a> {
    fn new(
        program: &'a TypedProgram,
        registry: &'a BuiltinRegistry,
        config: &'a CompilerConfig,
        witness: bool,
    ) -> Self {
        Self {
            program,
            registry,
            config,
            builder: ConstraintSystemBuilder::new(),
            values: witness.then(Vec::new),
            predicate: LinearCombination::one(),
            scopes: vec![Vec::new()],
            inline_depth: 0,
            span: Span::default(),
        }
    }

    fn finish(self) -> (ConstraintSystem, Option<Vec<FieldElement>>) {
        (self.builder.finish(), self.values)
    }

    fn location(&self) -> String {
        self.span.to_string()
    }

    fn constrain_input(&mut self, slot: Slot, ty: SlotType, path: &str) -> Result<()> {
        match ty {
            SlotType::Field => Ok(()),
            SlotType::Bool => {
                let label = format!("{} boolean", path);
                self.emit(GateKind::Boolean, slot.into(), slot.into(), slot.into(), &label)
            }
            SlotType::UInt(_) | SlotType::SInt(_) => {
                self.range_check(&LinearCombination::from(slot), ty, &format!("{} range", path))
            }
        }
    }

    // ------------------------------------------------------------------
    // Environment
    // ------------------------------------------------------------------

    fn declare(&mut self, name: String, value: CircuitValue) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push((name, value));
        }
    }

    fn lookup(&self, name: &str) -> Option<&CircuitValue> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value)
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut CircuitValue> {
        self.scopes
            .iter_mut()
            .rev()
            .flat_map(|scope| scope.iter_mut().rev())
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value)
    }
}

impl BuiltinContext for Synthesizer<'_> {
    fn alloc(&mut self, value: Option<FieldElement>, label: &str) -> Result<Slot> {
        self.alloc_slot(SlotInfo::private(SlotType::Field, label), value)
    }

    fn constrain(
        &mut self,
        a: LinearCombination,
        b: LinearCombination,
        c: LinearCombination,
        label: &str,
    ) -> Result<()> {
        self.emit(GateKind::Builtin, a, b, c, label)
    }

    fn value(&self, lc: &LinearCombination) -> Option<FieldElement> {
        self.eval(lc)
    }
}
