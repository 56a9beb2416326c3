//! Constraint solver
//!
//! Decides whether a value of one type can be used where another is required,
//! binding free static parameters along the way. Traversal is directional and
//! seeded by the `from` type; the order of the rules below matters.
//!
//! A free parameter met in `to` position is bound to the `from` type and later
//! `to`-position constraints widen that binding to a union. A free parameter
//! met in `from` position is bound exactly and *closed*: later constraints
//! must coerce to the existing binding instead of widening it.

use super::coerce::union;
use super::subst::{replace_effects, StaticBindings};
use crate::adt::ShapeType;
use crate::effects::{EffectParameter, EffectSet};
use crate::types::{FunctionType, ParamId, StaticParameter, StaticValue, Type, TypeParameter};
use shed_ast::ast::Variance;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

#[derive(Clone, Debug, Default)]
pub struct TypeConstraintSolver {
    parameters: HashMap<ParamId, StaticParameter>,
    bindings: StaticBindings,
    closed: HashSet<ParamId>,
}

impl TypeConstraintSolver {
    pub fn new(parameters: impl IntoIterator<Item = StaticParameter>) -> Self {
        TypeConstraintSolver {
            parameters: parameters.into_iter().map(|param| (param.id(), param)).collect(),
            bindings: StaticBindings::new(),
            closed: HashSet::new(),
        }
    }

    fn is_free(&self, id: ParamId) -> bool {
        self.parameters.contains_key(&id)
    }

    /// The binding, or the variance default: `Nothing` for covariant, `Any`
    /// for contravariant, none for invariant.
    pub fn bound_type_for(&self, param: &TypeParameter) -> Option<Type> {
        if let Some(bound) = self.bindings.type_for(param.id) {
            return Some(bound.clone());
        }
        match param.variance {
            Variance::Covariant => Some(Type::Nothing),
            Variance::Contravariant => Some(Type::Any),
            Variance::Invariant => None,
        }
    }

    /// Unbound effect parameters read back as the empty effect.
    pub fn bound_effect_for(&self, param: &EffectParameter) -> EffectSet {
        self.bindings.effect_for(param.id).cloned().unwrap_or_default()
    }

    /// Bindings actually recorded, without variance defaults.
    pub fn bindings(&self) -> &StaticBindings {
        &self.bindings
    }

    fn bind_type(&mut self, param: &TypeParameter, ty: Type) {
        debug!(param = %param.name, id = ?param.id, ty = %ty, "bind type parameter");
        self.bindings.bind_type(param.id, ty);
    }

    pub fn coerce(&mut self, from: &Type, to: &Type) -> bool {
        trace!(from = %from, to = %to, "coerce");

        if let Type::Alias(alias) = from {
            return self.coerce(&alias.aliased, to);
        }
        if let Type::Alias(alias) = to {
            return self.coerce(from, &alias.aliased);
        }

        if from == to || matches!(to, Type::Any) || matches!(from, Type::Nothing) {
            return true;
        }

        if matches!(from, Type::Symbol(_)) && matches!(to, Type::AnySymbol) {
            return true;
        }

        if let Type::Parameter(param) = to {
            if self.is_free(param.id) {
                return match self.bindings.type_for(param.id).cloned() {
                    None => {
                        self.bind_type(param, from.clone());
                        true
                    }
                    Some(bound) if self.closed.contains(&param.id) => self.coerce(from, &bound),
                    Some(bound) => {
                        let widened = union(&bound, from);
                        self.bind_type(param, widened);
                        true
                    }
                };
            }
        }

        if let Type::Parameter(param) = from {
            if self.is_free(param.id) {
                return match self.bindings.type_for(param.id).cloned() {
                    None => {
                        self.bind_type(param, to.clone());
                        self.closed.insert(param.id);
                        true
                    }
                    Some(bound) => self.coerce(&bound, to),
                };
            }
        }

        if let Type::Union(union) = from {
            return union.members().iter().all(|member| self.coerce(member, to));
        }

        if let Type::Union(union) = to {
            // a member that fails partway must not leave bindings behind
            return union
                .members()
                .iter()
                .any(|member| self.attempt(|fork| fork.coerce(from, member)));
        }

        match (from, to) {
            (Type::Function(from), Type::Function(to)) => self.coerce_functions(from, to),
            (Type::Tuple(from), Type::Tuple(to)) => {
                from.len() == to.len() && from.iter().zip(to).all(|(f, t)| self.coerce(f, t))
            }
            (Type::Shape(from), Type::Shape(to)) => self.coerce_shapes(from, to),
            _ => false,
        }
    }

    fn coerce_functions(&mut self, from: &FunctionType, to: &FunctionType) -> bool {
        if !from.static_params.is_empty() || !to.static_params.is_empty() {
            return false;
        }
        if from.params.len() != to.params.len() {
            return false;
        }
        if !from.named_params.keys().eq(to.named_params.keys()) {
            return false;
        }
        // parameters are contravariant
        for (from_param, to_param) in from.params.iter().zip(&to.params) {
            if !self.coerce(to_param, from_param) {
                return false;
            }
        }
        for (name, from_param) in &from.named_params {
            let Some(to_param) = to.named_params.get(name) else {
                return false;
            };
            if !self.coerce(to_param, from_param) {
                return false;
            }
        }
        self.coerce_effects(&from.effects, &to.effects) && self.coerce(&from.ret, &to.ret)
    }

    fn coerce_shapes(&mut self, from: &ShapeType, to: &ShapeType) -> bool {
        if from.id != to.id || from.static_args.len() != to.static_args.len() {
            return false;
        }
        for ((param, from_arg), to_arg) in from.static_params.iter().zip(&from.static_args).zip(&to.static_args) {
            let ok = match (param, from_arg, to_arg) {
                (StaticParameter::Type(param), StaticValue::Type(f), StaticValue::Type(t)) => {
                    match param.variance {
                        Variance::Invariant => self.is_equivalent(f, t),
                        Variance::Covariant => self.coerce(f, t),
                        Variance::Contravariant => self.coerce(t, f),
                    }
                }
                (StaticParameter::Effect(_), StaticValue::Effect(f), StaticValue::Effect(t)) => {
                    self.coerce_effects(f, t)
                }
                _ => false,
            };
            if !ok {
                return false;
            }
        }
        true
    }

    /// Run `check` on a copy of this solver and adopt the copy's bindings
    /// only if it succeeds.
    fn attempt(&mut self, check: impl FnOnce(&mut Self) -> bool) -> bool {
        let mut fork = self.clone();
        if check(&mut fork) {
            *self = fork;
            true
        } else {
            false
        }
    }

    /// Mutual coercibility, with bindings kept only if both directions succeed.
    pub fn is_equivalent(&mut self, left: &Type, right: &Type) -> bool {
        self.attempt(|fork| fork.coerce(left, right) && fork.coerce(right, left))
    }

    /// Effect coercion. Bound parameters are resolved first; an unbound free
    /// parameter in `from` takes the whole of `to`, and whatever `from` still
    /// needs is absorbed by an unbound free parameter in `to`. Bindings are
    /// first-writer-wins.
    pub fn coerce_effects(&mut self, from: &EffectSet, to: &EffectSet) -> bool {
        let from = replace_effects(from, &self.bindings);
        let to = replace_effects(to, &self.bindings);
        trace!(from = %from, to = %to, "coerce effects");

        if from.is_subset(&to) {
            return true;
        }

        let mut remaining = EffectSet::pure();
        for effect in from.difference(&to).iter() {
            match effect {
                crate::effects::Effect::Parameter(param) if self.is_free(param.id) => {
                    debug!(param = %param.name, effects = %to, "bind effect parameter");
                    self.bindings.bind_effect(param.id, to.clone());
                }
                _ => remaining.insert(effect.clone()),
            }
        }
        if remaining.is_empty() {
            return true;
        }

        let absorber = to.parameters().find(|param| self.is_free(param.id)).cloned();
        match absorber {
            Some(param) => {
                debug!(param = %param.name, effects = %remaining, "bind effect parameter");
                self.bindings.bind_effect(param.id, remaining);
                true
            }
            None => false,
        }
    }
}
