//! One-shot coercion helpers. Each call runs on its own solver.

use super::solver::TypeConstraintSolver;
use super::subst::StaticBindings;
use crate::adt::UnionType;
use crate::effects::EffectSet;
use crate::types::{StaticParameter, Type};

#[derive(Debug, Clone, PartialEq)]
pub enum CoercionResult {
    Success(StaticBindings),
    Failure,
}

impl CoercionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CoercionResult::Success(_))
    }
}

pub fn coerce(from: &Type, to: &Type, parameters: &[StaticParameter]) -> CoercionResult {
    coerce_all(&[(from.clone(), to.clone())], parameters)
}

/// Feed every constraint into one solver; stops at the first failure.
pub fn coerce_all(constraints: &[(Type, Type)], parameters: &[StaticParameter]) -> CoercionResult {
    let mut solver = TypeConstraintSolver::new(parameters.iter().cloned());
    for (from, to) in constraints {
        if !solver.coerce(from, to) {
            return CoercionResult::Failure;
        }
    }
    CoercionResult::Success(solver.bindings().clone())
}

pub fn can_coerce(from: &Type, to: &Type) -> bool {
    TypeConstraintSolver::default().coerce(from, to)
}

pub fn is_equivalent_type(first: &Type, second: &Type) -> bool {
    can_coerce(first, second) && can_coerce(second, first)
}

pub fn is_sub_effect(sub: &EffectSet, sup: &EffectSet) -> bool {
    TypeConstraintSolver::default().coerce_effects(sub, sup)
}

fn push_members(ty: &Type, members: &mut Vec<Type>) {
    match ty {
        Type::Union(union) if union.is_anonymous() => members.extend(union.members()),
        _ => members.push(ty.clone()),
    }
}

/// The smallest of `left`, `right` or their flattened anonymous union.
pub fn union(left: &Type, right: &Type) -> Type {
    if can_coerce(right, left) {
        return left.clone();
    }
    if can_coerce(left, right) {
        return right.clone();
    }
    let mut members = Vec::new();
    push_members(left, &mut members);
    push_members(right, &mut members);
    Type::Union(UnionType::anonymous(members))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_is_left_when_right_coerces_to_left() {
        let left = Type::Union(UnionType::anonymous(vec![Type::Int, Type::String]));
        assert_eq!(union(&left, &Type::Int), left);
    }

    #[test]
    fn union_is_right_when_left_coerces_to_right() {
        let right = Type::Union(UnionType::anonymous(vec![Type::Int, Type::String]));
        assert_eq!(union(&Type::Int, &right), right);
    }

    #[test]
    fn repeated_unions_flatten() {
        let from_left = union(&union(&Type::Int, &Type::String), &Type::Bool);
        let from_right = union(&Type::Int, &union(&Type::String, &Type::Bool));
        let expected = Type::Union(UnionType::anonymous(vec![Type::Int, Type::String, Type::Bool]));
        assert_eq!(from_left, expected);
        assert_eq!(from_right, expected);
    }

    #[test]
    fn sub_effects() {
        assert!(is_sub_effect(&EffectSet::pure(), &EffectSet::io()));
        assert!(is_sub_effect(&EffectSet::io(), &EffectSet::io()));
        assert!(!is_sub_effect(&EffectSet::io(), &EffectSet::pure()));
    }
}
