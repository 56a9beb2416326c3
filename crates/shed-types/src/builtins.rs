//! The prelude every module starts with.
//!
//! Each builtin gets its own declaration node so name resolution can bind to
//! it like any other declaration; [`Builtins::bindings`] is what gets handed
//! to [`crate::type_check`] as the initial bindings.

use crate::adt::ShapeType;
use crate::effects::{EffectParameter, EffectSet};
use crate::infer::subst::apply_static;
use crate::types::{FunctionType, StaticParameter, StaticValue, Type, TypeFunction, TypeParameter};
use shed_ast::ast::Variance;
use shed_ast::ids::{NodeId, NodeIdGen};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone)]
pub struct Builtin {
    pub name: &'static str,
    pub id: NodeId,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct Builtins {
    entries: Vec<Builtin>,
}

fn list_of(family: &TypeFunction, element: Type) -> Type {
    apply_static(family, &[StaticValue::Type(element)])
}

impl Builtins {
    pub fn new(ids: &mut NodeIdGen) -> Self {
        let element = TypeParameter::new(ids, "T", Variance::Covariant);
        let list_shape = ShapeType::declare(ids, "List", vec![StaticParameter::Type(element)]);
        list_shape.define(vec![]);
        let list = TypeFunction {
            params: list_shape.static_params.clone(),
            body: Type::Shape(list_shape),
        };

        let map = {
            let t = TypeParameter::new(ids, "T", Variance::Invariant);
            let r = TypeParameter::new(ids, "R", Variance::Invariant);
            let e = EffectParameter::new(ids, "E");
            let effects = EffectSet::parameter(&e);
            let func = Type::function(
                vec![Type::Parameter(t.clone())],
                effects.clone(),
                Type::Parameter(r.clone()),
            );
            Type::Function(Box::new(FunctionType {
                params: vec![func, list_of(&list, Type::Parameter(t.clone()))],
                named_params: BTreeMap::new(),
                ret: list_of(&list, Type::Parameter(r.clone())),
                static_params: vec![StaticParameter::Type(t), StaticParameter::Type(r), StaticParameter::Effect(e)],
                effects,
            }))
        };

        let for_each = {
            let t = TypeParameter::new(ids, "T", Variance::Invariant);
            let e = EffectParameter::new(ids, "E");
            let effects = EffectSet::parameter(&e);
            let func = Type::function(vec![Type::Parameter(t.clone())], effects.clone(), Type::Unit);
            Type::Function(Box::new(FunctionType {
                params: vec![func, list_of(&list, Type::Parameter(t.clone()))],
                named_params: BTreeMap::new(),
                ret: Type::Unit,
                static_params: vec![StaticParameter::Type(t), StaticParameter::Effect(e)],
                effects,
            }))
        };

        let table: Vec<(&'static str, Type)> = vec![
            ("Any", Type::meta(Type::Any)),
            ("Nothing", Type::meta(Type::Nothing)),
            ("Unit", Type::meta(Type::Unit)),
            ("Bool", Type::meta(Type::Bool)),
            ("Int", Type::meta(Type::Int)),
            ("String", Type::meta(Type::String)),
            ("Char", Type::meta(Type::Char)),
            ("Symbol", Type::meta(Type::AnySymbol)),
            ("List", Type::meta(Type::TypeFunction(Box::new(list.clone())))),
            ("!io", Type::Effect(EffectSet::io())),
            ("print", Type::function(vec![Type::String], EffectSet::io(), Type::Unit)),
            ("intToString", Type::function(vec![Type::Int], EffectSet::pure(), Type::String)),
            ("list", Type::ListConstructor(Box::new(list))),
            ("map", map),
            ("forEach", for_each),
        ];

        let entries = table
            .into_iter()
            .map(|(name, ty)| Builtin {
                name,
                id: ids.fresh(),
                ty,
            })
            .collect();
        Builtins { entries }
    }

    pub fn get(&self, name: &str) -> Option<&Builtin> {
        self.entries.iter().find(|builtin| builtin.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Builtin> {
        self.entries.iter()
    }

    pub fn bindings(&self) -> HashMap<NodeId, Type> {
        self.entries.iter().map(|builtin| (builtin.id, builtin.ty.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_has_its_own_declaration() {
        let mut ids = NodeIdGen::new();
        let builtins = Builtins::new(&mut ids);
        let bindings = builtins.bindings();
        assert_eq!(bindings.len(), builtins.iter().count());
        assert_eq!(bindings.get(&builtins.get("Int").unwrap().id), Some(&Type::meta(Type::Int)));
        assert!(builtins.get("nope").is_none());
    }

    #[test]
    fn print_performs_io() {
        let mut ids = NodeIdGen::new();
        let builtins = Builtins::new(&mut ids);
        assert_eq!(builtins.get("print").unwrap().ty.to_string(), "(String) !io -> Unit");
        assert_eq!(builtins.get("!io").unwrap().ty, Type::Effect(EffectSet::io()));
    }

    #[test]
    fn map_is_generic_over_its_effect() {
        let mut ids = NodeIdGen::new();
        let builtins = Builtins::new(&mut ids);
        let Type::Function(map) = &builtins.get("map").unwrap().ty else {
            panic!("map is not a function");
        };
        assert_eq!(map.static_params.len(), 3);
        assert_eq!(map.effects.parameters().count(), 1);
        assert_eq!(map.ret.to_string(), "List[R]");
    }
}
