//! Discriminators and `when` exhaustiveness.
//!
//! A discriminator is the symbol-typed field whose value tells one union
//! member apart from its siblings at runtime.

use crate::infer::coerce::{can_coerce, is_equivalent_type};
use crate::types::{SymbolType, Type};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Discriminator {
    pub field_name: String,
    pub symbol_type: SymbolType,
}

/// Find the field that singles out `target` among the members of `source`.
///
/// Every member must be a shape carrying the field with a symbol type. Every
/// member sharing the target's symbol must coerce to the target, and at least
/// one must. Candidate fields are tried in name order.
pub fn find_discriminator(source: &Type, target: &Type) -> Option<Discriminator> {
    let Type::Shape(target_shape) = target.unalias() else {
        return None;
    };
    let Type::Union(union) = source.unalias() else {
        return None;
    };
    let members = union.members();

    target_shape.fields().into_iter().find_map(|(name, field)| match field.ty.unalias() {
        Type::Symbol(symbol) => check_field(&name, symbol, &members, target),
        _ => None,
    })
}

fn check_field(name: &str, symbol: &SymbolType, members: &[Type], target: &Type) -> Option<Discriminator> {
    let mut matched = false;
    for member in members {
        let Type::Shape(shape) = member.unalias() else {
            return None;
        };
        let field = shape.field(name)?;
        let Type::Symbol(member_symbol) = field.ty.unalias() else {
            return None;
        };
        if member_symbol == symbol {
            if !can_coerce(member, target) {
                return None;
            }
            matched = true;
        }
    }
    matched.then(|| Discriminator {
        field_name: name.to_string(),
        symbol_type: symbol.clone(),
    })
}

/// Members of `union` not equivalent to any case type, in declaration order.
pub fn unhandled_members(union: &Type, cases: &[Type]) -> Vec<Type> {
    let members = match union.unalias() {
        Type::Union(union) => union.members(),
        other => vec![other.clone()],
    };
    members
        .into_iter()
        .filter(|member| !cases.iter().any(|case| is_equivalent_type(member, case)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adt::{Field, ShapeType, UnionType};
    use crate::infer::subst::apply_static;
    use crate::types::{StaticParameter, StaticValue, TypeFunction, TypeParameter};
    use shed_ast::ast::Variance;
    use shed_ast::ids::NodeIdGen;

    fn symbol(name: &str) -> Type {
        Type::symbol(&[], name)
    }

    fn field(name: &str, ty: Type) -> Field {
        Field {
            name: name.to_string(),
            ty,
            is_constant: false,
        }
    }

    fn shape(ids: &mut NodeIdGen, name: &str, fields: Vec<Field>) -> Type {
        let shape = ShapeType::declare(ids, name, vec![]);
        shape.define(fields);
        Type::Shape(shape)
    }

    fn union(ids: &mut NodeIdGen, members: Vec<Type>) -> Type {
        let union = UnionType::declare(ids, "Union", vec![]);
        union.define(members);
        Type::Union(union)
    }

    /// `Member1[+T]` with a `tag` and a `value: T`.
    fn generic_member(ids: &mut NodeIdGen) -> TypeFunction {
        let t = TypeParameter::new(ids, "T", Variance::Covariant);
        let params = vec![StaticParameter::Type(t.clone())];
        let shape = ShapeType::declare(ids, "Member1", params.clone());
        shape.define(vec![
            field("tag", symbol("@Member1")),
            field("value", Type::Parameter(t)),
        ]);
        TypeFunction {
            params,
            body: Type::Shape(shape),
        }
    }

    fn discriminator(field_name: &str, name: &str) -> Discriminator {
        Discriminator {
            field_name: field_name.to_string(),
            symbol_type: SymbolType {
                module: vec![],
                name: name.to_string(),
            },
        }
    }

    #[test]
    fn non_shape_target_has_no_discriminator() {
        let mut ids = NodeIdGen::new();
        let source = union(&mut ids, vec![Type::Int]);
        assert_eq!(find_discriminator(&source, &Type::Int), None);
    }

    #[test]
    fn target_without_symbol_field_has_no_discriminator() {
        let mut ids = NodeIdGen::new();
        let member1 = shape(&mut ids, "Member1", vec![field("tag", Type::Int)]);
        let member2 = shape(&mut ids, "Member2", vec![field("tag", Type::Int)]);
        let source = union(&mut ids, vec![member1.clone(), member2]);
        assert_eq!(find_discriminator(&source, &member1), None);
    }

    #[test]
    fn shared_tag_has_no_discriminator() {
        let mut ids = NodeIdGen::new();
        let member1 = shape(&mut ids, "Member1", vec![field("tag", symbol("@Member"))]);
        let member2 = shape(&mut ids, "Member2", vec![field("tag", symbol("@Member"))]);
        let source = union(&mut ids, vec![member1.clone(), member2]);
        assert_eq!(find_discriminator(&source, &member1), None);
    }

    #[test]
    fn unique_tag_is_the_discriminator() {
        let mut ids = NodeIdGen::new();
        let member1 = shape(&mut ids, "Member1", vec![field("tag", symbol("@Member1"))]);
        let member2 = shape(&mut ids, "Member2", vec![field("tag", symbol("@Member2"))]);
        let source = union(&mut ids, vec![member1.clone(), member2.clone()]);
        assert_eq!(find_discriminator(&source, &member1), Some(discriminator("tag", "@Member1")));
        assert_eq!(find_discriminator(&source, &member2), Some(discriminator("tag", "@Member2")));
    }

    #[test]
    fn equivalent_generic_member_is_discriminated() {
        let mut ids = NodeIdGen::new();
        let family = generic_member(&mut ids);
        let member1 = apply_static(&family, &[StaticValue::Type(Type::Int)]);
        let member2 = shape(&mut ids, "Member2", vec![field("tag", symbol("@Member2"))]);
        let source = union(&mut ids, vec![member1.clone(), member2]);
        assert_eq!(find_discriminator(&source, &member1), Some(discriminator("tag", "@Member1")));
    }

    #[test]
    fn covariant_member_discriminated_by_wider_target() {
        let mut ids = NodeIdGen::new();
        let family = generic_member(&mut ids);
        let member1 = apply_static(&family, &[StaticValue::Type(Type::Int)]);
        let member2 = shape(&mut ids, "Member2", vec![field("tag", symbol("@Member2"))]);
        let source = union(&mut ids, vec![member1, member2]);
        let target = apply_static(&family, &[StaticValue::Type(Type::Any)]);
        assert_eq!(find_discriminator(&source, &target), Some(discriminator("tag", "@Member1")));
    }

    #[test]
    fn incompatible_generic_member_has_no_discriminator() {
        let mut ids = NodeIdGen::new();
        let family = generic_member(&mut ids);
        let member1 = apply_static(&family, &[StaticValue::Type(Type::Any)]);
        let member2 = shape(&mut ids, "Member2", vec![field("tag", symbol("@Member2"))]);
        let source = union(&mut ids, vec![member1, member2]);
        let target = apply_static(&family, &[StaticValue::Type(Type::Int)]);
        assert_eq!(find_discriminator(&source, &target), None);
    }

    #[test]
    fn non_union_source_has_no_discriminator() {
        let mut ids = NodeIdGen::new();
        let target = shape(&mut ids, "Target", vec![field("tag", symbol("@Target"))]);
        assert_eq!(find_discriminator(&Type::Any, &target), None);
    }

    #[test]
    fn unhandled_members_are_those_without_an_equivalent_case() {
        let mut ids = NodeIdGen::new();
        let member1 = shape(&mut ids, "Member1", vec![field("tag", symbol("@Member1"))]);
        let member2 = shape(&mut ids, "Member2", vec![field("tag", symbol("@Member2"))]);
        let source = union(&mut ids, vec![member1.clone(), member2.clone()]);

        assert!(unhandled_members(&source, &[member1.clone(), member2.clone()]).is_empty());
        assert_eq!(unhandled_members(&source, &[member1]), vec![member2]);
    }
}
