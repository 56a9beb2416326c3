//! Shape and union types.
//!
//! Shapes and unions are compared by declaration identity plus static
//! arguments, never by their fields or members. The fields/members of a
//! declaration live behind a shared write-once definition so a shape field can
//! mention the union that contains the shape; the definition is filled in
//! once the declaration's body has been evaluated. Reading fields or members
//! of an applied shape substitutes the static arguments lazily.

use crate::infer::subst::{replace_types, StaticBindings};
use crate::types::{StaticParameter, StaticValue, Type};
use shed_ast::ids::NodeIdGen;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnionId(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    /// Constant fields have a fixed value and are not constructor arguments.
    pub is_constant: bool,
}

#[derive(Default)]
pub struct ShapeDefinition {
    fields: OnceCell<BTreeMap<String, Field>>,
}

#[derive(Default)]
pub struct UnionDefinition {
    members: OnceCell<Vec<Type>>,
}

#[derive(Clone)]
pub struct ShapeType {
    pub id: ShapeId,
    pub name: String,
    pub static_params: Vec<StaticParameter>,
    pub static_args: Vec<StaticValue>,
    definition: Rc<ShapeDefinition>,
}

impl ShapeType {
    /// A shape whose fields are not defined yet. A generic shape starts out
    /// applied to its own parameters.
    pub fn declare(ids: &mut NodeIdGen, name: impl Into<String>, static_params: Vec<StaticParameter>) -> Self {
        let static_args = static_params.iter().map(StaticParameter::as_value).collect();
        ShapeType {
            id: ShapeId(ids.next_raw()),
            name: name.into(),
            static_params,
            static_args,
            definition: Rc::new(ShapeDefinition::default()),
        }
    }

    /// Returns false if the fields were already defined.
    pub fn define(&self, fields: Vec<Field>) -> bool {
        let fields = fields.into_iter().map(|field| (field.name.clone(), field)).collect();
        self.definition.fields.set(fields).is_ok()
    }

    pub fn is_defined(&self) -> bool {
        self.definition.fields.get().is_some()
    }

    fn bindings(&self) -> StaticBindings {
        StaticBindings::from_pairs(&self.static_params, &self.static_args)
    }

    /// Fields with static arguments substituted. Empty until defined.
    pub fn fields(&self) -> BTreeMap<String, Field> {
        let Some(fields) = self.definition.fields.get() else {
            return BTreeMap::new();
        };
        let bindings = self.bindings();
        fields
            .iter()
            .map(|(name, field)| {
                let field = Field {
                    name: field.name.clone(),
                    ty: replace_types(&field.ty, &bindings),
                    is_constant: field.is_constant,
                };
                (name.clone(), field)
            })
            .collect()
    }

    pub fn field(&self, name: &str) -> Option<Field> {
        let field = self.definition.fields.get()?.get(name)?;
        Some(Field {
            name: field.name.clone(),
            ty: replace_types(&field.ty, &self.bindings()),
            is_constant: field.is_constant,
        })
    }

    pub fn with_static_args(&self, static_args: Vec<StaticValue>) -> Self {
        ShapeType {
            static_args,
            ..self.clone()
        }
    }
}

impl PartialEq for ShapeType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.static_args == other.static_args
    }
}

impl fmt::Debug for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeType")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("static_args", &self.static_args)
            .finish()
    }
}

fn write_applied(f: &mut fmt::Formatter<'_>, name: &str, args: &[StaticValue]) -> fmt::Result {
    write!(f, "{}", name)?;
    if !args.is_empty() {
        write!(f, "[")?;
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, "]")?;
    }
    Ok(())
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_applied(f, &self.name, &self.static_args)
    }
}

/// A declared union has an id; an anonymous one (from joining branch types)
/// has none and compares by members.
#[derive(Clone)]
pub struct UnionType {
    pub id: Option<UnionId>,
    pub name: String,
    pub static_params: Vec<StaticParameter>,
    pub static_args: Vec<StaticValue>,
    definition: Rc<UnionDefinition>,
}

impl UnionType {
    pub fn declare(ids: &mut NodeIdGen, name: impl Into<String>, static_params: Vec<StaticParameter>) -> Self {
        let static_args = static_params.iter().map(StaticParameter::as_value).collect();
        UnionType {
            id: Some(UnionId(ids.next_raw())),
            name: name.into(),
            static_params,
            static_args,
            definition: Rc::new(UnionDefinition::default()),
        }
    }

    pub fn anonymous(members: Vec<Type>) -> Self {
        let name = members
            .iter()
            .map(|member| member.to_string())
            .collect::<Vec<_>>()
            .join(" | ");
        let definition = UnionDefinition::default();
        let _ = definition.members.set(members);
        UnionType {
            id: None,
            name,
            static_params: vec![],
            static_args: vec![],
            definition: Rc::new(definition),
        }
    }

    /// Returns false if the members were already defined.
    pub fn define(&self, members: Vec<Type>) -> bool {
        self.definition.members.set(members).is_ok()
    }

    pub fn is_defined(&self) -> bool {
        self.definition.members.get().is_some()
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_none()
    }

    /// Members with static arguments substituted. Empty until defined.
    pub fn members(&self) -> Vec<Type> {
        let Some(members) = self.definition.members.get() else {
            return vec![];
        };
        if self.static_params.is_empty() {
            return members.clone();
        }
        let bindings = StaticBindings::from_pairs(&self.static_params, &self.static_args);
        members.iter().map(|member| replace_types(member, &bindings)).collect()
    }

    pub fn with_static_args(&self, static_args: Vec<StaticValue>) -> Self {
        UnionType {
            static_args,
            ..self.clone()
        }
    }
}

impl PartialEq for UnionType {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b && self.static_args == other.static_args,
            (None, None) => self.members() == other.members(),
            _ => false,
        }
    }
}

impl fmt::Debug for UnionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnionType")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("static_args", &self.static_args)
            .finish()
    }
}

impl fmt::Display for UnionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_applied(f, &self.name, &self.static_args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeParameter;
    use shed_ast::ast::Variance;

    fn field(name: &str, ty: Type) -> Field {
        Field {
            name: name.to_string(),
            ty,
            is_constant: false,
        }
    }

    #[test]
    fn identical_layouts_are_different_shapes() {
        let mut ids = NodeIdGen::new();
        let a = ShapeType::declare(&mut ids, "A", vec![]);
        let b = ShapeType::declare(&mut ids, "B", vec![]);
        a.define(vec![field("x", Type::Int)]);
        b.define(vec![field("x", Type::Int)]);
        assert_ne!(Type::Shape(a.clone()), Type::Shape(b));
        assert_eq!(Type::Shape(a.clone()), Type::Shape(a));
    }

    #[test]
    fn fields_are_substituted_on_read() {
        let mut ids = NodeIdGen::new();
        let t = TypeParameter::new(&mut ids, "T", Variance::Covariant);
        let shape = ShapeType::declare(&mut ids, "Box", vec![StaticParameter::Type(t.clone())]);
        shape.define(vec![field("value", Type::Parameter(t))]);

        let applied = shape.with_static_args(vec![StaticValue::Type(Type::Int)]);
        assert_eq!(applied.field("value").map(|f| f.ty), Some(Type::Int));
        assert_eq!(applied.to_string(), "Box[Int]");
        assert_ne!(Type::Shape(applied), Type::Shape(shape));
    }

    #[test]
    fn definition_is_write_once() {
        let mut ids = NodeIdGen::new();
        let shape = ShapeType::declare(&mut ids, "A", vec![]);
        assert!(!shape.is_defined());
        assert!(shape.fields().is_empty());
        assert!(shape.define(vec![]));
        assert!(!shape.define(vec![field("x", Type::Int)]));
    }

    #[test]
    fn anonymous_unions_compare_by_members() {
        let a = UnionType::anonymous(vec![Type::Int, Type::String]);
        let b = UnionType::anonymous(vec![Type::Int, Type::String]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "Int | String");
    }
}
