//! Effects attached to function types.
//!
//! A function type carries an [`EffectSet`]. The empty set is the empty
//! effect; sets compose by union. Effect parameters (`!E`) stand for an
//! unknown set and are resolved at call sites by the constraint solver.

use crate::types::ParamId;
use std::collections::BTreeSet;
use std::fmt;

/// An effect-level static parameter, `!E`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectParameter {
    pub id: ParamId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Effect {
    /// A built-in effect such as `io`.
    Named(String),
    Parameter(EffectParameter),
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Named(name) => write!(f, "!{}", name),
            Effect::Parameter(param) => write!(f, "!{}", param.name),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct EffectSet(BTreeSet<Effect>);

impl EffectSet {
    /// The empty effect.
    pub fn pure() -> Self {
        EffectSet(BTreeSet::new())
    }

    pub fn io() -> Self {
        Self::named("io")
    }

    pub fn named(name: &str) -> Self {
        Self::single(Effect::Named(name.to_string()))
    }

    pub fn single(effect: Effect) -> Self {
        let mut set = BTreeSet::new();
        set.insert(effect);
        EffectSet(set)
    }

    pub fn parameter(param: &EffectParameter) -> Self {
        Self::single(Effect::Parameter(param.clone()))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn contains(&self, effect: &Effect) -> bool {
        self.0.contains(effect)
    }

    pub fn is_subset(&self, other: &EffectSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn union(&self, other: &EffectSet) -> EffectSet {
        EffectSet(self.0.union(&other.0).cloned().collect())
    }

    /// Effects in `self` that `other` does not contain.
    pub fn difference(&self, other: &EffectSet) -> EffectSet {
        EffectSet(self.0.difference(&other.0).cloned().collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.0.iter()
    }

    pub fn parameters(&self) -> impl Iterator<Item = &EffectParameter> {
        self.0.iter().filter_map(|effect| match effect {
            Effect::Parameter(param) => Some(param),
            Effect::Named(_) => None,
        })
    }

    pub fn insert(&mut self, effect: Effect) {
        self.0.insert(effect);
    }
}

impl FromIterator<Effect> for EffectSet {
    fn from_iter<I: IntoIterator<Item = Effect>>(iter: I) -> Self {
        EffectSet(iter.into_iter().collect())
    }
}

impl fmt::Display for EffectSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for effect in &self.0 {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}", effect)?;
            first = false;
        }
        Ok(())
    }
}
