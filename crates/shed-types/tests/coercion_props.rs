//! Property tests for coercion and union joins.
//!
//! Types are generated from scalars, symbols, tuples, pure functions and
//! anonymous unions; no static parameters appear except where a property
//! introduces one explicitly.

use proptest::prelude::*;
use shed_ast::ast::Variance;
use shed_ast::ids::NodeIdGen;
use shed_types::adt::UnionType;
use shed_types::infer::{can_coerce, coerce_all, union, CoercionResult};
use shed_types::{EffectSet, StaticParameter, Type, TypeParameter};

fn leaf_type() -> impl Strategy<Value = Type> {
    prop_oneof![
        Just(Type::Unit),
        Just(Type::Bool),
        Just(Type::Int),
        Just(Type::String),
        Just(Type::Char),
        "@[a-z]{1,4}".prop_map(|name: String| Type::symbol(&["Props".to_string()], name)),
    ]
}

fn arb_type() -> impl Strategy<Value = Type> {
    leaf_type().prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(Type::Tuple),
            (prop::collection::vec(inner.clone(), 0..3), inner.clone())
                .prop_map(|(params, ret)| Type::function(params, EffectSet::pure(), ret)),
            prop::collection::vec(inner, 2..4).prop_map(|members| Type::Union(UnionType::anonymous(members))),
        ]
    })
}

proptest! {
    /// Every type coerces to itself.
    #[test]
    fn coercion_is_reflexive(ty in arb_type()) {
        prop_assert!(can_coerce(&ty, &ty), "{} should coerce to itself", ty);
    }

    /// `Any` is the top type and `Nothing` the bottom type.
    #[test]
    fn any_is_top_and_nothing_is_bottom(ty in arb_type()) {
        prop_assert!(can_coerce(&ty, &Type::Any));
        prop_assert!(can_coerce(&Type::Nothing, &ty));
    }

    /// A join accepts both of its inputs.
    #[test]
    fn union_is_an_upper_bound(left in arb_type(), right in arb_type()) {
        let joined = union(&left, &right);
        prop_assert!(can_coerce(&left, &joined), "{} should coerce to {}", left, joined);
        prop_assert!(can_coerce(&right, &joined), "{} should coerce to {}", right, joined);
    }

    /// Aliases never change the outcome of a coercion.
    #[test]
    fn aliases_are_transparent(from in arb_type(), to in arb_type()) {
        let aliased_from = Type::alias("From", from.clone());
        let aliased_to = Type::alias("To", to.clone());
        prop_assert_eq!(can_coerce(&aliased_from, &to), can_coerce(&from, &to));
        prop_assert_eq!(can_coerce(&from, &aliased_to), can_coerce(&from, &to));
    }

    /// Function parameters are checked in the opposite direction.
    #[test]
    fn function_parameters_are_contravariant(a in arb_type(), b in arb_type(), ret in arb_type()) {
        let takes_a = Type::function(vec![a.clone()], EffectSet::pure(), ret.clone());
        let takes_b = Type::function(vec![b.clone()], EffectSet::pure(), ret);
        prop_assert_eq!(can_coerce(&takes_a, &takes_b), can_coerce(&b, &a));
    }

    /// A parameter met twice in `to` position ends up accepting both values.
    #[test]
    fn widened_binding_accepts_every_constraint(first in arb_type(), second in arb_type()) {
        let mut ids = NodeIdGen::new();
        let t = TypeParameter::new(&mut ids, "T", Variance::Covariant);
        let to = Type::Parameter(t.clone());
        let result = coerce_all(
            &[(first.clone(), to.clone()), (second.clone(), to)],
            &[StaticParameter::Type(t.clone())],
        );
        match result {
            CoercionResult::Success(bindings) => {
                let bound = bindings.type_for(t.id).cloned().unwrap_or(Type::Nothing);
                prop_assert!(can_coerce(&first, &bound));
                prop_assert!(can_coerce(&second, &bound));
            }
            CoercionResult::Failure => prop_assert!(false, "widening should never fail"),
        }
    }
}
