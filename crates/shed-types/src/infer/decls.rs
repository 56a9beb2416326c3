//! Module-level declarations.
//!
//! Top-level items are checked in passes so declarations can refer to each
//! other regardless of order:
//!
//! 1. imports, and shape/union identities;
//! 2. type aliases, then shape fields and union members;
//! 3. function signatures, then vals in source order;
//! 4. the deferred queue (function bodies, constant field values).

use super::ctx::{Deferred, ModuleResult, TypeContext};
use crate::adt::{Field, ShapeType, UnionType};
use crate::checker::TypeError;
use crate::types::{ModuleType, StaticParameter, StaticValue, Type, TypeFunction};
use shed_ast::ast::{ImportBase, ImportDecl, ImportPath, Item, Module, ShapeDecl, Target, TypeAliasDecl, UnionDecl, Variance};
use shed_ast::ids::NodeId;
use shed_ast::span::Span;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

fn describe_path(path: &ImportPath) -> String {
    let joined = path.parts.join(".");
    match path.base {
        ImportBase::Relative => format!(".{}", joined),
        ImportBase::Absolute => joined,
    }
}

fn flip(position: Variance) -> Variance {
    match position {
        Variance::Covariant => Variance::Contravariant,
        Variance::Contravariant => Variance::Covariant,
        Variance::Invariant => Variance::Invariant,
    }
}

/// Position of a static argument, given the position of the applied type.
fn compose(position: Variance, param: Variance) -> Variance {
    match param {
        Variance::Covariant => position,
        Variance::Contravariant => flip(position),
        Variance::Invariant => Variance::Invariant,
    }
}

/// Reject parameters used against their declared variance.
fn check_variance(ty: &Type, position: Variance, what: &str, span: Span) -> Result<(), TypeError> {
    let check_args = |params: &[StaticParameter], args: &[StaticValue]| -> Result<(), TypeError> {
        for (param, arg) in params.iter().zip(args) {
            if let (StaticParameter::Type(param), StaticValue::Type(arg)) = (param, arg) {
                check_variance(arg, compose(position, param.variance), what, span)?;
            }
        }
        Ok(())
    };
    match ty {
        Type::Parameter(param) => match (param.variance, position) {
            (Variance::Contravariant, Variance::Covariant | Variance::Invariant) => Err(TypeError::InvalidVariance {
                msg: format!("{} cannot be contravariant", what),
                span,
            }),
            (Variance::Covariant, Variance::Contravariant | Variance::Invariant) => Err(TypeError::InvalidVariance {
                msg: format!("{} cannot be covariant", what),
                span,
            }),
            _ => Ok(()),
        },
        Type::Tuple(elems) => elems
            .iter()
            .try_for_each(|elem| check_variance(elem, position, what, span)),
        Type::Function(func) => {
            for param in func.params.iter().chain(func.named_params.values()) {
                check_variance(param, flip(position), what, span)?;
            }
            check_variance(&func.ret, position, what, span)
        }
        Type::Shape(shape) => check_args(&shape.static_params, &shape.static_args),
        Type::Union(union) if union.is_anonymous() => union
            .members()
            .iter()
            .try_for_each(|member| check_variance(member, position, what, span)),
        Type::Union(union) => check_args(&union.static_params, &union.static_args),
        Type::Alias(alias) => check_variance(&alias.aliased, position, what, span),
        _ => Ok(()),
    }
}

/// Wrap a declared type in its family when it has static parameters.
fn declared_type(params: Vec<StaticParameter>, body: Type) -> Type {
    if params.is_empty() {
        Type::meta(body)
    } else {
        Type::meta(Type::TypeFunction(Box::new(TypeFunction { params, body })))
    }
}

impl<'a> TypeContext<'a> {
    pub(crate) fn check_module(&mut self, module: &'a Module) -> Result<ModuleType, TypeError> {
        for item in &module.items {
            match item {
                Item::Import(import) => self.check_import(import)?,
                Item::Shape(decl) => {
                    debug!(name = %decl.name.text, "declare shape");
                    let params = self.declare_static_params(&decl.static_params);
                    let shape = ShapeType::declare(self.ids, decl.name.text.clone(), params.clone());
                    self.bind(decl.id, declared_type(params, Type::Shape(shape)));
                }
                Item::Union(decl) => {
                    debug!(name = %decl.name.text, "declare union");
                    let params = self.declare_static_params(&decl.static_params);
                    let union = UnionType::declare(self.ids, decl.name.text.clone(), params.clone());
                    self.bind(decl.id, declared_type(params, Type::Union(union)));
                }
                Item::TypeAlias(_) | Item::Val(_) | Item::Fn(_) => {}
            }
        }

        for item in &module.items {
            if let Item::TypeAlias(decl) = item {
                self.check_alias(decl)?;
            }
        }
        for item in &module.items {
            match item {
                Item::Shape(decl) => self.define_shape(decl)?,
                Item::Union(decl) => self.define_union(decl)?,
                _ => {}
            }
        }

        for item in &module.items {
            if let Item::Fn(decl) = item {
                debug!(name = %decl.name.text, "function signature");
                self.check_fn_decl(decl)?;
            }
        }
        for item in &module.items {
            if let Item::Val(val) = item {
                self.check_val(val)?;
            }
        }

        self.undefer()?;
        self.module_type(module)
    }

    fn check_import(&mut self, import: &'a ImportDecl) -> Result<(), TypeError> {
        debug!(path = %describe_path(&import.path), "import");
        match self.find_module(&import.path) {
            ModuleResult::Found(ty) => {
                self.bind(import.id, ty);
                Ok(())
            }
            ModuleResult::NotFound => Err(TypeError::ModuleNotFound {
                path: describe_path(&import.path),
                span: import.span,
            }),
            ModuleResult::FoundMany => Err(TypeError::MultipleModulesWithSameName {
                path: describe_path(&import.path),
                span: import.span,
            }),
        }
    }

    fn check_alias(&mut self, decl: &'a TypeAliasDecl) -> Result<(), TypeError> {
        debug!(name = %decl.name.text, "type alias");
        let params = self.declare_static_params(&decl.static_params);
        let aliased = self.eval_type(&decl.ty)?;
        self.bind(decl.id, declared_type(params, Type::alias(decl.name.text.clone(), aliased)));
        Ok(())
    }

    /// The type-level body bound to a shape or union declaration.
    fn declared_body(&self, decl: NodeId, span: Span) -> Result<Type, TypeError> {
        match self.binding(decl) {
            Some(Type::Meta(inner)) => match inner.as_ref() {
                Type::TypeFunction(family) => Ok(family.body.clone()),
                body => Ok(body.clone()),
            },
            _ => Err(TypeError::InvariantViolation {
                msg: format!("declaration {:?} was not declared in the first pass", decl),
                span,
            }),
        }
    }

    fn define_shape(&mut self, decl: &'a ShapeDecl) -> Result<(), TypeError> {
        let Type::Shape(shape) = self.declared_body(decl.id, decl.span)? else {
            return Err(TypeError::InvariantViolation {
                msg: format!("shape {} is bound to a non-shape", decl.name.text),
                span: decl.span,
            });
        };

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(decl.fields.len());
        for field in &decl.fields {
            if !seen.insert(field.name.text.as_str()) {
                return Err(TypeError::FieldAlreadyDeclared {
                    field: field.name.text.clone(),
                    span: field.name.span,
                });
            }
            let ty = self.eval_type(&field.ty)?;
            check_variance(&ty, Variance::Covariant, "field type", field.span)?;
            if let Some(value) = &field.value {
                self.defer(Deferred::FieldValue { value, ty: ty.clone() });
            }
            fields.push(Field {
                name: field.name.text.clone(),
                ty,
                is_constant: field.value.is_some(),
            });
        }

        if shape.define(fields) {
            Ok(())
        } else {
            Err(TypeError::InvariantViolation {
                msg: format!("fields of {} defined twice", decl.name.text),
                span: decl.span,
            })
        }
    }

    fn define_union(&mut self, decl: &'a UnionDecl) -> Result<(), TypeError> {
        let Type::Union(union) = self.declared_body(decl.id, decl.span)? else {
            return Err(TypeError::InvariantViolation {
                msg: format!("union {} is bound to a non-union", decl.name.text),
                span: decl.span,
            });
        };

        let mut members = Vec::with_capacity(decl.members.len());
        for member in &decl.members {
            let ty = self.eval_type(member)?;
            check_variance(&ty, Variance::Covariant, "union member", member.span())?;
            members.push(ty);
        }

        if union.define(members) {
            Ok(())
        } else {
            Err(TypeError::InvariantViolation {
                msg: format!("members of {} defined twice", decl.name.text),
                span: decl.span,
            })
        }
    }

    fn exported(&self, decl: NodeId, span: Span) -> Result<Type, TypeError> {
        self.binding(decl).cloned().ok_or_else(|| TypeError::InvariantViolation {
            msg: format!("no type recorded for declaration {:?}", decl),
            span,
        })
    }

    fn export_target(&self, target: &Target, fields: &mut BTreeMap<String, Type>) -> Result<(), TypeError> {
        match target {
            Target::Var { id, name } => {
                fields.insert(name.text.clone(), self.exported(*id, name.span)?);
            }
            Target::Tuple { elems, .. } => {
                for elem in elems {
                    self.export_target(elem, fields)?;
                }
            }
            Target::Fields { fields: targets, .. } => {
                for (_, elem) in targets {
                    self.export_target(elem, fields)?;
                }
            }
        }
        Ok(())
    }

    /// Every top-level binding except imports.
    fn module_type(&self, module: &Module) -> Result<ModuleType, TypeError> {
        let mut fields = BTreeMap::new();
        for item in &module.items {
            match item {
                Item::Import(_) => {}
                Item::Shape(decl) => {
                    fields.insert(decl.name.text.clone(), self.exported(decl.id, decl.span)?);
                }
                Item::Union(decl) => {
                    fields.insert(decl.name.text.clone(), self.exported(decl.id, decl.span)?);
                }
                Item::TypeAlias(decl) => {
                    fields.insert(decl.name.text.clone(), self.exported(decl.id, decl.span)?);
                }
                Item::Fn(decl) => {
                    fields.insert(decl.name.text.clone(), self.exported(decl.id, decl.span)?);
                }
                Item::Val(val) => self.export_target(&val.target, &mut fields)?,
            }
        }
        Ok(ModuleType { fields })
    }
}
