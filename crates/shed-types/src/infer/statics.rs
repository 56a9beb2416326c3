//! Evaluation of type-level expressions.
//!
//! A static expression evaluates to the *type of* that expression: `Meta(T)`
//! for a type, `Effect(set)` for an effect, `Module(..)` for a module.

use super::ctx::TypeContext;
use super::subst::apply_static;
use crate::checker::{Expected, TypeError};
use crate::effects::{EffectParameter, EffectSet};
use crate::types::{FunctionType, StaticParameter, StaticValue, Type, TypeParameter};
use shed_ast::ast::{StaticExpr, StaticParam};
use shed_ast::span::Span;
use std::collections::BTreeMap;

impl<'a> TypeContext<'a> {
    pub(crate) fn eval_static(&mut self, expr: &'a StaticExpr) -> Result<Type, TypeError> {
        let ty = match expr {
            StaticExpr::Ref { id, name } => self.type_of_reference(*id, &name.text, name.span)?,
            StaticExpr::Symbol { name, .. } => Type::meta(Type::symbol(&self.module_path, name.clone())),
            StaticExpr::Field {
                receiver,
                field,
                span,
                ..
            } => match self.eval_static(receiver)? {
                Type::Module(module) => module
                    .fields
                    .get(&field.text)
                    .cloned()
                    .ok_or_else(|| TypeError::NoSuchField {
                        field: field.text.clone(),
                        span: field.span,
                    })?,
                actual => {
                    return Err(TypeError::UnexpectedType {
                        expected: Expected::Module,
                        actual,
                        span: *span,
                    })
                }
            },
            StaticExpr::Apply {
                receiver,
                args,
                span,
                ..
            } => {
                let family = match self.eval_static(receiver)? {
                    Type::Meta(inner) => match *inner {
                        Type::TypeFunction(family) => family,
                        other => {
                            return Err(TypeError::UnexpectedType {
                                expected: Expected::TypeLevel,
                                actual: Type::meta(other),
                                span: receiver.span(),
                            })
                        }
                    },
                    actual => {
                        return Err(TypeError::UnexpectedType {
                            expected: Expected::TypeLevel,
                            actual,
                            span: receiver.span(),
                        })
                    }
                };
                let values = self.eval_static_arguments(&family.params, args, *span)?;
                Type::meta(apply_static(&family, &values))
            }
            StaticExpr::Fn {
                static_params,
                params,
                named_params,
                effects,
                ret,
                ..
            } => {
                let static_params = self.declare_static_params(static_params);
                let params = params
                    .iter()
                    .map(|param| self.eval_type(param))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut named = BTreeMap::new();
                for (name, param) in named_params {
                    let ty = self.eval_type(param)?;
                    if named.insert(name.text.clone(), ty).is_some() {
                        return Err(TypeError::FieldAlreadyDeclared {
                            field: name.text.clone(),
                            span: name.span,
                        });
                    }
                }
                let effects = self.eval_effects(effects)?;
                let ret = self.eval_type(ret)?;
                Type::meta(Type::Function(Box::new(FunctionType {
                    static_params,
                    params,
                    named_params: named,
                    effects,
                    ret,
                })))
            }
            StaticExpr::Tuple { elems, .. } => {
                let elems = elems
                    .iter()
                    .map(|elem| self.eval_type(elem))
                    .collect::<Result<Vec<_>, _>>()?;
                Type::meta(Type::Tuple(elems))
            }
        };
        self.types.record(expr.id(), ty.clone());
        Ok(ty)
    }

    /// Evaluate to a concrete type. Unapplied generic families are rejected.
    pub(crate) fn eval_type(&mut self, expr: &'a StaticExpr) -> Result<Type, TypeError> {
        match self.eval_static(expr)? {
            Type::Meta(inner) if !matches!(*inner, Type::TypeFunction(_)) => Ok(*inner),
            actual => Err(TypeError::UnexpectedType {
                expected: Expected::TypeLevel,
                actual,
                span: expr.span(),
            }),
        }
    }

    pub(crate) fn eval_effect(&mut self, expr: &'a StaticExpr) -> Result<EffectSet, TypeError> {
        match self.eval_static(expr)? {
            Type::Effect(effects) => Ok(effects),
            actual => Err(TypeError::UnexpectedType {
                expected: Expected::Effect,
                actual,
                span: expr.span(),
            }),
        }
    }

    pub(crate) fn eval_effects(&mut self, exprs: &'a [StaticExpr]) -> Result<EffectSet, TypeError> {
        let mut effects = EffectSet::pure();
        for expr in exprs {
            effects = effects.union(&self.eval_effect(expr)?);
        }
        Ok(effects)
    }

    /// Evaluate explicit static arguments against the parameters they fill.
    pub(crate) fn eval_static_arguments(
        &mut self,
        params: &[StaticParameter],
        args: &'a [StaticExpr],
        span: Span,
    ) -> Result<Vec<StaticValue>, TypeError> {
        if params.len() != args.len() {
            return Err(TypeError::WrongNumberOfStaticArguments {
                expected: params.len(),
                actual: args.len(),
                span,
            });
        }
        params
            .iter()
            .zip(args)
            .map(|(param, arg)| match param {
                StaticParameter::Type(_) => self.eval_type(arg).map(StaticValue::Type),
                StaticParameter::Effect(_) => self.eval_effect(arg).map(StaticValue::Effect),
            })
            .collect()
    }

    /// Create parameters for a declaration's static parameter list and bind
    /// each declaration node to its type-level value.
    pub(crate) fn declare_static_params(&mut self, params: &[StaticParam]) -> Vec<StaticParameter> {
        params
            .iter()
            .map(|param| match param {
                StaticParam::Type {
                    id, name, variance, ..
                } => {
                    let param = TypeParameter::new(self.ids, name.text.clone(), *variance);
                    self.bind(*id, Type::meta(Type::Parameter(param.clone())));
                    StaticParameter::Type(param)
                }
                StaticParam::Effect { id, name, .. } => {
                    let param = EffectParameter::new(self.ids, name.text.clone());
                    self.bind(*id, Type::Effect(EffectSet::parameter(&param)));
                    StaticParameter::Effect(param)
                }
            })
            .collect()
    }
}
