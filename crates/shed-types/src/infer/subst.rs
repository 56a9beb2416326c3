//! Structural substitution of static parameters.

use crate::adt::UnionType;
use crate::effects::{Effect, EffectSet};
use crate::types::{FunctionType, ModuleType, ParamId, StaticParameter, StaticValue, Type, TypeAlias, TypeFunction};
use std::collections::HashMap;

/// Static parameter → value bindings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StaticBindings {
    types: HashMap<ParamId, Type>,
    effects: HashMap<ParamId, EffectSet>,
}

impl StaticBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair parameters with arguments positionally. Mismatched kinds are skipped.
    pub fn from_pairs(params: &[StaticParameter], args: &[StaticValue]) -> Self {
        let mut bindings = StaticBindings::new();
        for (param, arg) in params.iter().zip(args) {
            match (param, arg) {
                (StaticParameter::Type(p), StaticValue::Type(ty)) => bindings.bind_type(p.id, ty.clone()),
                (StaticParameter::Effect(p), StaticValue::Effect(set)) => {
                    bindings.bind_effect(p.id, set.clone())
                }
                _ => {}
            }
        }
        bindings
    }

    pub fn bind_type(&mut self, id: ParamId, ty: Type) {
        self.types.insert(id, ty);
    }

    pub fn bind_effect(&mut self, id: ParamId, effects: EffectSet) {
        self.effects.insert(id, effects);
    }

    pub fn type_for(&self, id: ParamId) -> Option<&Type> {
        self.types.get(&id)
    }

    pub fn effect_for(&self, id: ParamId) -> Option<&EffectSet> {
        self.effects.get(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.effects.is_empty()
    }

    pub fn value_for(&self, param: &StaticParameter) -> Option<StaticValue> {
        match param {
            StaticParameter::Type(p) => self.type_for(p.id).cloned().map(StaticValue::Type),
            StaticParameter::Effect(p) => self.effect_for(p.id).cloned().map(StaticValue::Effect),
        }
    }
}

pub fn replace_effects(effects: &EffectSet, bindings: &StaticBindings) -> EffectSet {
    let mut out = EffectSet::pure();
    for effect in effects.iter() {
        match effect {
            Effect::Parameter(param) => match bindings.effect_for(param.id) {
                Some(bound) => out = out.union(bound),
                None => out.insert(effect.clone()),
            },
            Effect::Named(_) => out.insert(effect.clone()),
        }
    }
    out
}

fn replace_static_value(value: &StaticValue, bindings: &StaticBindings) -> StaticValue {
    match value {
        StaticValue::Type(ty) => StaticValue::Type(replace_types(ty, bindings)),
        StaticValue::Effect(effects) => StaticValue::Effect(replace_effects(effects, bindings)),
    }
}

pub fn replace_types(ty: &Type, bindings: &StaticBindings) -> Type {
    if bindings.is_empty() {
        return ty.clone();
    }
    match ty {
        Type::Parameter(param) => bindings
            .type_for(param.id)
            .cloned()
            .unwrap_or_else(|| ty.clone()),
        Type::Tuple(elems) => Type::Tuple(elems.iter().map(|elem| replace_types(elem, bindings)).collect()),
        Type::Shape(shape) => Type::Shape(
            shape.with_static_args(
                shape
                    .static_args
                    .iter()
                    .map(|arg| replace_static_value(arg, bindings))
                    .collect(),
            ),
        ),
        Type::Union(union) if union.is_anonymous() => Type::Union(UnionType::anonymous(
            union
                .members()
                .iter()
                .map(|member| replace_types(member, bindings))
                .collect(),
        )),
        Type::Union(union) => Type::Union(
            union.with_static_args(
                union
                    .static_args
                    .iter()
                    .map(|arg| replace_static_value(arg, bindings))
                    .collect(),
            ),
        ),
        Type::Function(func) => Type::Function(Box::new(FunctionType {
            static_params: func.static_params.clone(),
            params: func.params.iter().map(|param| replace_types(param, bindings)).collect(),
            named_params: func
                .named_params
                .iter()
                .map(|(name, param)| (name.clone(), replace_types(param, bindings)))
                .collect(),
            effects: replace_effects(&func.effects, bindings),
            ret: replace_types(&func.ret, bindings),
        })),
        Type::Meta(inner) => Type::meta(replace_types(inner, bindings)),
        Type::Alias(alias) => Type::Alias(Box::new(TypeAlias {
            name: alias.name.clone(),
            aliased: replace_types(&alias.aliased, bindings),
        })),
        Type::TypeFunction(func) => Type::TypeFunction(Box::new(TypeFunction {
            params: func.params.clone(),
            body: replace_types(&func.body, bindings),
        })),
        Type::Effect(effects) => Type::Effect(replace_effects(effects, bindings)),
        Type::Module(module) => Type::Module(ModuleType {
            fields: module
                .fields
                .iter()
                .map(|(name, field)| (name.clone(), replace_types(field, bindings)))
                .collect(),
        }),
        Type::Any
        | Type::Nothing
        | Type::Unit
        | Type::Bool
        | Type::Int
        | Type::String
        | Type::Char
        | Type::AnySymbol
        | Type::Symbol(_)
        | Type::ListConstructor(_) => ty.clone(),
    }
}

/// Instantiate a generic family with concrete arguments.
pub fn apply_static(family: &TypeFunction, args: &[StaticValue]) -> Type {
    replace_types(&family.body, &StaticBindings::from_pairs(&family.params, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adt::{Field, ShapeType};
    use crate::effects::EffectParameter;
    use crate::types::TypeParameter;
    use shed_ast::ast::Variance;
    use shed_ast::ids::NodeIdGen;

    #[test]
    fn replaces_parameters_inside_functions() {
        let mut ids = NodeIdGen::new();
        let t = TypeParameter::new(&mut ids, "T", Variance::Invariant);
        let e = EffectParameter::new(&mut ids, "E");
        let func = Type::function(
            vec![Type::Parameter(t.clone())],
            EffectSet::parameter(&e),
            Type::Tuple(vec![Type::Parameter(t.clone())]),
        );

        let mut bindings = StaticBindings::new();
        bindings.bind_type(t.id, Type::Int);
        bindings.bind_effect(e.id, EffectSet::io());

        let expected = Type::function(vec![Type::Int], EffectSet::io(), Type::Tuple(vec![Type::Int]));
        assert_eq!(replace_types(&func, &bindings), expected);
    }

    #[test]
    fn unbound_effect_parameter_is_kept() {
        let mut ids = NodeIdGen::new();
        let e = EffectParameter::new(&mut ids, "E");
        let set = EffectSet::parameter(&e).union(&EffectSet::io());
        assert_eq!(replace_effects(&set, &StaticBindings::new()), set);
    }

    #[test]
    fn apply_static_instantiates_shape_family() {
        let mut ids = NodeIdGen::new();
        let t = TypeParameter::new(&mut ids, "T", Variance::Covariant);
        let params = vec![StaticParameter::Type(t.clone())];
        let shape = ShapeType::declare(&mut ids, "Box", params.clone());
        shape.define(vec![Field {
            name: "value".to_string(),
            ty: Type::Parameter(t),
            is_constant: false,
        }]);
        let family = TypeFunction {
            params,
            body: Type::Shape(shape.clone()),
        };

        let Type::Shape(applied) = apply_static(&family, &[StaticValue::Type(Type::String)]) else {
            panic!("expected a shape");
        };
        assert_eq!(applied.id, shape.id);
        assert_eq!(applied.static_args, vec![StaticValue::Type(Type::String)]);
        assert_eq!(applied.field("value").map(|f| f.ty), Some(Type::String));
    }
}
