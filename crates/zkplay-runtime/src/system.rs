//! Rank-1 constraint systems
//!
//! A [`ConstraintSystem`] is an append-only arena of witness [`Slot`]s plus an
//! ordered list of [`Gate`]s. Every gate has the shape `A · B = C` where `A`,
//! `B` and `C` are [`LinearCombination`]s over slots with a constant term.
//! Systems are assembled through a [`ConstraintSystemBuilder`]; calling
//! [`ConstraintSystemBuilder::finish`] freezes the result.

use crate::error::{Result, RuntimeError};
use crate::field::FieldElement;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// Index of a witness slot. Slots are never reused or freed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot(pub u32);

impl Slot {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Whether a slot's value is part of the public statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => f.write_str("public"),
            Visibility::Private => f.write_str("private"),
        }
    }
}

/// Declared scalar type of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotType {
    Field,
    Bool,
    #[serde(rename = "uint")]
    UInt(u32),
    #[serde(rename = "sint")]
    SInt(u32),
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotType::Field => f.write_str("Field"),
            SlotType::Bool => f.write_str("bool"),
            SlotType::UInt(width) => write!(f, "u{}", width),
            SlotType::SInt(width) => write!(f, "i{}", width),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInfo {
    pub visibility: Visibility,
    #[serde(rename = "type")]
    pub ty: SlotType,
    pub label: String,
}

impl SlotInfo {
    pub fn private(ty: SlotType, label: impl Into<String>) -> Self {
        Self { visibility: Visibility::Private, ty, label: label.into() }
    }

    pub fn public(ty: SlotType, label: impl Into<String>) -> Self {
        Self { visibility: Visibility::Public, ty, label: label.into() }
    }
}

/// `constant + Σ coefficient · slot`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearCombination {
    pub terms: Vec<(Slot, FieldElement)>,
    pub constant: FieldElement,
}

impl LinearCombination {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn one() -> Self {
        Self::constant(FieldElement::ONE)
    }

    pub fn constant(value: FieldElement) -> Self {
        Self { terms: Vec::new(), constant: value }
    }

    pub fn from_slot(slot: Slot) -> Self {
        Self { terms: vec![(slot, FieldElement::ONE)], constant: FieldElement::ZERO }
    }

    pub fn with_term(mut self, slot: Slot, coefficient: FieldElement) -> Self {
        self.terms.push((slot, coefficient));
        self
    }

    pub fn scale(mut self, factor: FieldElement) -> Self {
        for (_, coefficient) in &mut self.terms {
            *coefficient = *coefficient * factor;
        }
        self.constant = self.constant * factor;
        self
    }

    /// Merges repeated slots and drops zero coefficients, ordering terms by slot
    pub fn simplify(self) -> Self {
        let mut merged: BTreeMap<Slot, FieldElement> = BTreeMap::new();
        for (slot, coefficient) in self.terms {
            let entry = merged.entry(slot).or_insert(FieldElement::ZERO);
            *entry = *entry + coefficient;
        }
        let terms = merged.into_iter().filter(|(_, c)| !c.is_zero()).collect();
        Self { terms, constant: self.constant }
    }

    pub fn is_constant(&self) -> bool {
        self.terms.iter().all(|(_, c)| c.is_zero())
    }

    pub fn as_constant(&self) -> Option<FieldElement> {
        self.is_constant().then_some(self.constant)
    }

    /// A single slot with coefficient one and no constant
    pub fn as_slot(&self) -> Option<Slot> {
        match self.terms.as_slice() {
            [(slot, c)] if c.is_one() && self.constant.is_zero() => Some(*slot),
            _ => None,
        }
    }

    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.terms.iter().map(|(slot, _)| *slot)
    }

    /// Evaluates against a dense assignment; `Err` carries the first unassigned slot
    pub fn evaluate(&self, values: &[FieldElement]) -> std::result::Result<FieldElement, Slot> {
        let mut acc = self.constant;
        for (slot, coefficient) in &self.terms {
            let value = values.get(slot.index()).ok_or(*slot)?;
            acc = acc + *coefficient * *value;
        }
        Ok(acc)
    }
}

impl From<Slot> for LinearCombination {
    fn from(slot: Slot) -> Self {
        Self::from_slot(slot)
    }
}

impl From<FieldElement> for LinearCombination {
    fn from(value: FieldElement) -> Self {
        Self::constant(value)
    }
}

impl Add for LinearCombination {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self.terms.extend(rhs.terms);
        self.constant = self.constant + rhs.constant;
        self.simplify()
    }
}

impl Sub for LinearCombination {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl Neg for LinearCombination {
    type Output = Self;

    fn neg(self) -> Self {
        self.scale(-FieldElement::ONE)
    }
}

impl Mul<FieldElement> for LinearCombination {
    type Output = Self;

    fn mul(self, rhs: FieldElement) -> Self {
        self.scale(rhs).simplify()
    }
}

impl fmt::Display for LinearCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> =
            self.terms.iter().map(|(slot, c)| format!("{}*{}", c, slot)).collect();
        if !self.constant.is_zero() || parts.is_empty() {
            parts.push(self.constant.to_string());
        }
        f.write_str(&parts.join(" + "))
    }
}

/// Gate op-code
///
/// Human-readable formats store the snake_case name, binary formats store
/// the one-byte [`opcode`](Self::opcode). Both are part of the persisted
/// format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GateKind {
    /// Field arithmetic: sums, products, scaling
    Arithmetic,
    /// `b · b = b`
    Boolean,
    /// Recomposition of a value from its booleanity-checked bits
    RangeDecomposition,
    /// `predicate · (expected - actual) = 0`
    Assert,
    /// `c · (t - f) = out - f`
    Select,
    /// `divisor · quotient = dividend`
    Division,
    /// `divisor · inverse = 1`
    NonZero,
    /// Equality-to-zero gadget (`x · inv = 1 - r`, `x · r = 0`)
    IsZero,
    /// Gates contributed by a builtin plug-in
    Builtin,
    /// Copy of a value into an output slot
    Output,
}

impl GateKind {
    pub const ALL: [GateKind; 10] = [
        GateKind::Arithmetic,
        GateKind::Boolean,
        GateKind::RangeDecomposition,
        GateKind::Assert,
        GateKind::Select,
        GateKind::Division,
        GateKind::NonZero,
        GateKind::IsZero,
        GateKind::Builtin,
        GateKind::Output,
    ];

    pub fn opcode(self) -> u8 {
        match self {
            GateKind::Arithmetic => 0x01,
            GateKind::Boolean => 0x02,
            GateKind::RangeDecomposition => 0x03,
            GateKind::Assert => 0x04,
            GateKind::Select => 0x05,
            GateKind::Division => 0x06,
            GateKind::NonZero => 0x07,
            GateKind::IsZero => 0x08,
            GateKind::Builtin => 0x09,
            GateKind::Output => 0x0a,
        }
    }

    pub fn from_opcode(opcode: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.opcode() == opcode)
    }

    pub fn name(self) -> &'static str {
        match self {
            GateKind::Arithmetic => "arithmetic",
            GateKind::Boolean => "boolean",
            GateKind::RangeDecomposition => "range_decomposition",
            GateKind::Assert => "assert",
            GateKind::Select => "select",
            GateKind::Division => "division",
            GateKind::NonZero => "non_zero",
            GateKind::IsZero => "is_zero",
            GateKind::Builtin => "builtin",
            GateKind::Output => "output",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Gates that exist only to bound integer values
    pub fn is_range_check(self) -> bool {
        matches!(self, GateKind::Boolean | GateKind::RangeDecomposition)
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for GateKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(self.name())
        } else {
            serializer.serialize_u8(self.opcode())
        }
    }
}

impl<'de> Deserialize<'de> for GateKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let name = String::deserialize(deserializer)?;
            GateKind::from_name(&name)
                .ok_or_else(|| de::Error::custom(format!("unknown gate kind '{}'", name)))
        } else {
            let opcode = u8::deserialize(deserializer)?;
            GateKind::from_opcode(opcode)
                .ok_or_else(|| de::Error::custom(format!("unknown gate op-code {:#04x}", opcode)))
        }
    }
}

/// One rank-1 relation `a · b = c`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    pub kind: GateKind,
    pub a: LinearCombination,
    pub b: LinearCombination,
    pub c: LinearCombination,
    pub label: String,
}

impl Gate {
    pub fn new(
        kind: GateKind,
        a: LinearCombination,
        b: LinearCombination,
        c: LinearCombination,
        label: impl Into<String>,
    ) -> Self {
        Self { kind, a: a.simplify(), b: b.simplify(), c: c.simplify(), label: label.into() }
    }

    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.a.slots().chain(self.b.slots()).chain(self.c.slots())
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ({}) * ({}) = ({})  # {}", self.kind, self.a, self.b, self.c, self.label)
    }
}

/// A frozen constraint system: slot table plus gate list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSystem {
    slots: Vec<SlotInfo>,
    gates: Vec<Gate>,
}

impl ConstraintSystem {
    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn num_gates(&self) -> usize {
        self.gates.len()
    }

    pub fn slots(&self) -> &[SlotInfo] {
        &self.slots
    }

    pub fn slot(&self, slot: Slot) -> Option<&SlotInfo> {
        self.slots.get(slot.index())
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    /// Public slots in allocation order; this order is part of the public ABI
    pub fn public_slots(&self) -> Vec<Slot> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, info)| info.visibility == Visibility::Public)
            .map(|(index, _)| Slot(index as u32))
            .collect()
    }

    pub fn gate_counts(&self) -> BTreeMap<GateKind, usize> {
        let mut counts = BTreeMap::new();
        for gate in &self.gates {
            *counts.entry(gate.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Checks that every gate only references allocated slots.
    /// Used after loading a system from an untrusted encoding.
    pub fn validate(&self) -> Result<()> {
        for (index, gate) in self.gates.iter().enumerate() {
            if let Some(slot) = gate.slots().find(|slot| slot.index() >= self.slots.len()) {
                return Err(RuntimeError::other(format!(
                    "Gate {} references unallocated slot {} (only {} slots)",
                    index,
                    slot,
                    self.slots.len()
                )));
            }
        }
        Ok(())
    }
}

/// Append-only builder; [`finish`](Self::finish) yields the frozen system
#[derive(Debug, Default)]
pub struct ConstraintSystemBuilder {
    slots: Vec<SlotInfo>,
    gates: Vec<Gate>,
}

impl ConstraintSystemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, info: SlotInfo) -> Slot {
        let slot = Slot(self.slots.len() as u32);
        self.slots.push(info);
        slot
    }

    pub fn push_gate(&mut self, gate: Gate) -> usize {
        self.gates.push(gate);
        self.gates.len() - 1
    }

    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn num_gates(&self) -> usize {
        self.gates.len()
    }

    pub fn finish(self) -> ConstraintSystem {
        ConstraintSystem { slots: self.slots, gates: self.gates }
    }
}
