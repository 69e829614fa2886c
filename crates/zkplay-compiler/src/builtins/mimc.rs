//! MiMC-7 over the circuit field
//!
//! `permute(x, k)` runs 91 rounds of `x ← (x + k + c_i)^7` and returns
//! `x + k`. Round constants are `c_0 = 0` and `c_i = SHA-256("zkplay.mimc7" ||
//! i) mod P`. Each round costs four multiplication gates.
//!
//! The hashes chain the permutation in Miyaguchi–Preneel style:
//! `h_0 = 0`, `h_{i+1} = permute(m_i, h_i) + h_i + m_i`.

use super::{Builtin, BuiltinContext};
use crate::error::SynthesisError;
use crate::types::Type;
use ruint::aliases::U256;
use sha2::{Digest, Sha256};
use std::sync::{Arc, OnceLock};
use zkplay_runtime::{FieldElement, LinearCombination};

pub const ROUNDS: usize = 91;

const CONSTANT_SEED: &[u8] = b"zkplay.mimc7";

pub fn round_constants() -> &'static [FieldElement] {
    static CONSTANTS: OnceLock<Vec<FieldElement>> = OnceLock::new();
    CONSTANTS.get_or_init(|| {
        (0..ROUNDS)
            .map(|round| {
                if round == 0 {
                    return FieldElement::ZERO;
                }
                let mut hasher = Sha256::new();
                hasher.update(CONSTANT_SEED);
                hasher.update((round as u32).to_be_bytes());
                let digest: [u8; 32] = hasher.finalize().into();
                FieldElement::from_u256_reduced(U256::from_be_bytes(digest))
            })
            .collect()
    })
}

/// Native evaluation of the permutation
pub fn permute(x: FieldElement, k: FieldElement) -> FieldElement {
    let state = round_constants().iter().fold(x, |state, c| (state + k + *c).pow(7));
    state + k
}

/// Native evaluation of the sponge hash
pub fn hash(messages: &[FieldElement]) -> FieldElement {
    messages.iter().fold(FieldElement::ZERO, |h, m| permute(*m, h) + h + *m)
}

pub(crate) fn builtins() -> Vec<Arc<dyn Builtin>> {
    vec![Arc::new(Permute), Arc::new(Hash { arity: 1 }), Arc::new(Hash { arity: 2 })]
}

fn product(
    ctx: &mut dyn BuiltinContext,
    a: &LinearCombination,
    b: &LinearCombination,
    label: &str,
) -> Result<LinearCombination, SynthesisError> {
    if let Some(constant) = a.as_constant() {
        return Ok(b.clone().scale(constant));
    }
    if let Some(constant) = b.as_constant() {
        return Ok(a.clone().scale(constant));
    }
    let value = ctx.value(a).zip(ctx.value(b)).map(|(a, b)| a * b);
    let out = ctx.alloc(value, label)?;
    ctx.constrain(a.clone(), b.clone(), out.into(), label)?;
    Ok(out.into())
}

fn synthesize_permute(
    ctx: &mut dyn BuiltinContext,
    x: &LinearCombination,
    k: &LinearCombination,
) -> Result<LinearCombination, SynthesisError> {
    let mut state = x.clone();
    for (round, c) in round_constants().iter().enumerate() {
        let label = format!("mimc round {}", round);
        let t = (state + k.clone() + LinearCombination::constant(*c)).simplify();
        let t2 = product(ctx, &t, &t, &label)?;
        let t4 = product(ctx, &t2, &t2, &label)?;
        let t6 = product(ctx, &t4, &t2, &label)?;
        state = product(ctx, &t6, &t, &label)?;
    }
    Ok((state + k.clone()).simplify())
}

struct Permute;

impl Builtin for Permute {
    fn name(&self) -> &str {
        "std::hash::mimc::permute"
    }

    fn version(&self) -> u32 {
        1
    }

    fn params(&self) -> Vec<Type> {
        vec![Type::Field, Type::Field]
    }

    fn returns(&self) -> Type {
        Type::Field
    }

    fn synthesize(
        &self,
        ctx: &mut dyn BuiltinContext,
        inputs: &[LinearCombination],
    ) -> Result<Vec<LinearCombination>, SynthesisError> {
        Ok(vec![synthesize_permute(ctx, &inputs[0], &inputs[1])?])
    }
}

struct Hash {
    arity: usize,
}

impl Builtin for Hash {
    fn name(&self) -> &str {
        match self.arity {
            1 => "std::hash::mimc::hash_1",
            _ => "std::hash::mimc::hash_2",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn params(&self) -> Vec<Type> {
        vec![Type::Array(Box::new(Type::Field), self.arity)]
    }

    fn returns(&self) -> Type {
        Type::Field
    }

    fn synthesize(
        &self,
        ctx: &mut dyn BuiltinContext,
        inputs: &[LinearCombination],
    ) -> Result<Vec<LinearCombination>, SynthesisError> {
        let mut h = LinearCombination::zero();
        for m in inputs {
            let permuted = synthesize_permute(ctx, m, &h)?;
            h = (permuted + h + m.clone()).simplify();
        }
        Ok(vec![h])
    }
}
