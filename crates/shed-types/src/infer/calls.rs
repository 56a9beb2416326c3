//! Call checking: functions, shape constructors, the built-in list
//! constructor and partial application.

use super::ctx::TypeContext;
use super::solver::TypeConstraintSolver;
use super::subst::{apply_static, replace_effects, replace_types, StaticBindings};
use crate::adt::ShapeType;
use crate::checker::{Expected, TypeError};
use crate::effects::EffectSet;
use crate::types::{FunctionType, StaticParameter, StaticValue, Type, TypeFunction, TypeParameter};
use shed_ast::ast::{Expr, NamedArg, StaticExpr};
use shed_ast::span::Span;
use std::collections::{BTreeMap, HashSet};
use tracing::trace;

/// The parameter side of a call.
struct Callee<'t> {
    static_params: &'t [StaticParameter],
    params: &'t [Type],
    named_params: &'t BTreeMap<String, Type>,
}

fn reject_duplicate_named(named_args: &[NamedArg]) -> Result<(), TypeError> {
    let mut seen = HashSet::new();
    for arg in named_args {
        if !seen.insert(arg.name.text.as_str()) {
            return Err(TypeError::ArgumentAlreadyPassed {
                name: arg.name.text.clone(),
                span: arg.span,
            });
        }
    }
    Ok(())
}

impl<'a> TypeContext<'a> {
    pub(crate) fn infer_call(
        &mut self,
        callee: &'a Expr,
        static_args: &'a [StaticExpr],
        args: &'a [Expr],
        named_args: &'a [NamedArg],
        span: Span,
    ) -> Result<Type, TypeError> {
        let callee_ty = self.infer_expr(callee, None)?;
        reject_duplicate_named(named_args)?;

        match callee_ty.unalias() {
            Type::Function(func) => self.infer_function_call(func, static_args, args, named_args, span),
            Type::Meta(inner) => match inner.unalias() {
                Type::Shape(shape) => self.infer_constructor_call(None, shape, static_args, args, named_args, span),
                Type::TypeFunction(family) => match &family.body {
                    Type::Shape(shape) => {
                        self.infer_constructor_call(Some(family.as_ref()), shape, static_args, args, named_args, span)
                    }
                    _ => self.not_callable(&callee_ty, callee.span(), args),
                },
                _ => self.not_callable(&callee_ty, callee.span(), args),
            },
            Type::ListConstructor(family) => self.infer_list_call(family, args, named_args),
            _ => self.not_callable(&callee_ty, callee.span(), args),
        }
    }

    fn not_callable(&mut self, callee_ty: &Type, span: Span, args: &'a [Expr]) -> Result<Type, TypeError> {
        let params = args
            .iter()
            .map(|arg| self.infer_expr(arg, None))
            .collect::<Result<Vec<_>, _>>()?;
        Err(TypeError::UnexpectedType {
            expected: Expected::Type(Type::function(params, EffectSet::pure(), Type::Any)),
            actual: callee_ty.clone(),
            span,
        })
    }

    fn infer_function_call(
        &mut self,
        func: &FunctionType,
        static_args: &'a [StaticExpr],
        args: &'a [Expr],
        named_args: &'a [NamedArg],
        span: Span,
    ) -> Result<Type, TypeError> {
        let callee = Callee {
            static_params: &func.static_params,
            params: &func.params,
            named_params: &func.named_params,
        };
        let bindings = self.check_arguments(&callee, static_args, args, named_args, span)?;

        let effects = replace_effects(&func.effects, &bindings);
        self.check_effects(&effects, span)?;
        Ok(replace_types(&func.ret, &bindings))
    }

    /// Every effect the callee needs must be available at the call site.
    fn check_effects(&self, effects: &EffectSet, span: Span) -> Result<(), TypeError> {
        match effects.difference(self.effects()).iter().next() {
            Some(unhandled) => Err(TypeError::UnhandledEffect {
                effect: unhandled.to_string(),
                span,
            }),
            None => Ok(()),
        }
    }

    /// Constructors take named arguments only; constant fields are not
    /// arguments. A generic family yields the instantiated shape.
    fn infer_constructor_call(
        &mut self,
        family: Option<&TypeFunction>,
        shape: &ShapeType,
        static_args: &'a [StaticExpr],
        args: &'a [Expr],
        named_args: &'a [NamedArg],
        span: Span,
    ) -> Result<Type, TypeError> {
        if let Some(first) = args.first() {
            return Err(TypeError::PositionalArgumentPassedToShapeConstructor { span: first.span() });
        }

        let fields: BTreeMap<String, Type> = shape
            .fields()
            .into_values()
            .filter(|field| !field.is_constant)
            .map(|field| (field.name, field.ty))
            .collect();
        let static_params = family.map(|family| family.params.as_slice()).unwrap_or(&[]);
        let callee = Callee {
            static_params,
            params: &[],
            named_params: &fields,
        };
        let bindings = self.check_arguments(&callee, static_args, args, named_args, span)?;

        match family {
            None => Ok(Type::Shape(shape.clone())),
            Some(family) => {
                let mut values = Vec::with_capacity(family.params.len());
                for param in &family.params {
                    let value = bindings.value_for(param).ok_or_else(|| TypeError::CouldNotInferTypeParameter {
                        param: param.name().to_string(),
                        span,
                    })?;
                    values.push(value);
                }
                Ok(apply_static(family, &values))
            }
        }
    }

    /// `list(a, b, ...)`: the element type is the union of the argument types.
    fn infer_list_call(
        &mut self,
        family: &TypeFunction,
        args: &'a [Expr],
        named_args: &'a [NamedArg],
    ) -> Result<Type, TypeError> {
        if let Some(extra) = named_args.first() {
            return Err(TypeError::ExtraArgument {
                name: extra.name.text.clone(),
                span: extra.span,
            });
        }
        let element = match family.params.as_slice() {
            [StaticParameter::Type(param)] => param,
            _ => {
                return Err(TypeError::InvariantViolation {
                    msg: "list family must have exactly one type parameter".to_string(),
                    span: args.first().map(Expr::span).unwrap_or(Span::new(0, 0)),
                })
            }
        };
        let fresh = element.fresh_copy(self.ids);
        let formal = Type::Parameter(fresh.clone());
        let mut solver = TypeConstraintSolver::new([StaticParameter::Type(fresh.clone())]);
        for arg in args {
            let actual = self.infer_expr(arg, None)?;
            if !solver.coerce(&actual, &formal) {
                return Err(TypeError::UnexpectedType {
                    expected: Expected::Type(formal),
                    actual,
                    span: arg.span(),
                });
            }
        }
        let element_ty = solver.bound_type_for(&fresh).unwrap_or(Type::Nothing);
        Ok(apply_static(family, &[StaticValue::Type(element_ty)]))
    }

    /// Counts, then extra named arguments, then missing ones, then types.
    fn check_arguments(
        &mut self,
        callee: &Callee<'_>,
        static_args: &'a [StaticExpr],
        args: &'a [Expr],
        named_args: &'a [NamedArg],
        span: Span,
    ) -> Result<StaticBindings, TypeError> {
        if args.len() != callee.params.len() {
            return Err(TypeError::WrongNumberOfArguments {
                expected: callee.params.len(),
                actual: args.len(),
                span,
            });
        }

        let mut arguments: Vec<(&'a Expr, Type)> = args.iter().zip(callee.params.iter().cloned()).collect();
        for arg in named_args {
            match callee.named_params.get(&arg.name.text) {
                Some(param) => arguments.push((&arg.value, param.clone())),
                None => {
                    return Err(TypeError::ExtraArgument {
                        name: arg.name.text.clone(),
                        span: arg.span,
                    })
                }
            }
        }
        for name in callee.named_params.keys() {
            if !named_args.iter().any(|arg| &arg.name.text == name) {
                return Err(TypeError::MissingArgument {
                    name: name.clone(),
                    span,
                });
            }
        }

        if static_args.is_empty() {
            self.infer_static_bindings(callee.static_params, &arguments, span)
        } else {
            let values = self.eval_static_arguments(callee.static_params, static_args, span)?;
            let bindings = StaticBindings::from_pairs(callee.static_params, &values);
            for (arg, param) in &arguments {
                self.verify_expr(*arg, &replace_types(param, &bindings))?;
            }
            Ok(bindings)
        }
    }

    /// Solve for the static parameters from the argument types. Type
    /// parameters get fresh copies so the callee's own parameters never leak
    /// into the caller.
    fn infer_static_bindings(
        &mut self,
        static_params: &[StaticParameter],
        arguments: &[(&'a Expr, Type)],
        span: Span,
    ) -> Result<StaticBindings, TypeError> {
        let (fresh, mut solver, renames) = self.fresh_solver(static_params);

        for (arg, param) in arguments {
            let formal = replace_types(param, &fresh);
            let hint = replace_types(&formal, solver.bindings());
            let actual = self.infer_expr(*arg, Some(&hint))?;
            trace!(actual = %actual, formal = %formal, "argument constraint");
            if !solver.coerce(&actual, &formal) {
                return Err(TypeError::UnexpectedType {
                    expected: Expected::Type(formal),
                    actual,
                    span: arg.span(),
                });
            }
        }

        let mut bindings = StaticBindings::new();
        for (original, copy) in &renames {
            match solver.bound_type_for(copy) {
                Some(bound) => bindings.bind_type(original.id, bound),
                None => {
                    return Err(TypeError::CouldNotInferTypeParameter {
                        param: original.name.clone(),
                        span,
                    })
                }
            }
        }
        for param in static_params {
            if let StaticParameter::Effect(param) = param {
                bindings.bind_effect(param.id, solver.bound_effect_for(param));
            }
        }
        Ok(bindings)
    }

    /// Fresh copies of the type parameters, a solver over them and the
    /// declared effect parameters, and the original/copy pairs.
    #[allow(clippy::type_complexity)]
    fn fresh_solver(
        &mut self,
        static_params: &[StaticParameter],
    ) -> (StaticBindings, TypeConstraintSolver, Vec<(TypeParameter, TypeParameter)>) {
        let mut fresh = StaticBindings::new();
        let mut renames = Vec::new();
        let mut solver_params = Vec::with_capacity(static_params.len());
        for param in static_params {
            match param {
                StaticParameter::Type(original) => {
                    let copy = original.fresh_copy(self.ids);
                    fresh.bind_type(original.id, Type::Parameter(copy.clone()));
                    solver_params.push(StaticParameter::Type(copy.clone()));
                    renames.push((original.clone(), copy));
                }
                StaticParameter::Effect(_) => solver_params.push(param.clone()),
            }
        }
        (fresh, TypeConstraintSolver::new(solver_params), renames)
    }

    /// `f ~(args)`: bind a prefix of the positional parameters and some named
    /// ones; the result is a function over the rest.
    pub(crate) fn infer_partial_call(
        &mut self,
        callee: &'a Expr,
        static_args: &'a [StaticExpr],
        args: &'a [Expr],
        named_args: &'a [NamedArg],
        span: Span,
    ) -> Result<Type, TypeError> {
        let callee_ty = self.infer_expr(callee, None)?;
        reject_duplicate_named(named_args)?;
        let func = match callee_ty.unalias() {
            Type::Function(func) => func.as_ref().clone(),
            _ => return self.not_callable(&callee_ty, callee.span(), args),
        };

        if args.len() > func.params.len() {
            return Err(TypeError::WrongNumberOfArguments {
                expected: func.params.len(),
                actual: args.len(),
                span,
            });
        }
        let mut arguments: Vec<(&'a Expr, Type)> = args.iter().zip(func.params.iter().cloned()).collect();
        for arg in named_args {
            match func.named_params.get(&arg.name.text) {
                Some(param) => arguments.push((&arg.value, param.clone())),
                None => {
                    return Err(TypeError::ExtraArgument {
                        name: arg.name.text.clone(),
                        span: arg.span,
                    })
                }
            }
        }

        let (bindings, remaining_static) = if static_args.is_empty() {
            self.partial_bindings(&func.static_params, &arguments)?
        } else {
            let values = self.eval_static_arguments(&func.static_params, static_args, span)?;
            let bindings = StaticBindings::from_pairs(&func.static_params, &values);
            for (arg, param) in &arguments {
                self.verify_expr(*arg, &replace_types(param, &bindings))?;
            }
            (bindings, vec![])
        };

        let supplied: HashSet<&str> = named_args.iter().map(|arg| arg.name.text.as_str()).collect();
        Ok(Type::Function(Box::new(FunctionType {
            static_params: remaining_static,
            params: func.params[args.len()..]
                .iter()
                .map(|param| replace_types(param, &bindings))
                .collect(),
            named_params: func
                .named_params
                .iter()
                .filter(|(name, _)| !supplied.contains(name.as_str()))
                .map(|(name, param)| (name.clone(), replace_types(param, &bindings)))
                .collect(),
            effects: replace_effects(&func.effects, &bindings),
            ret: replace_types(&func.ret, &bindings),
        })))
    }

    /// Bindings the supplied arguments determine. Parameters they leave
    /// unbound stay static parameters of the resulting function.
    fn partial_bindings(
        &mut self,
        static_params: &[StaticParameter],
        arguments: &[(&'a Expr, Type)],
    ) -> Result<(StaticBindings, Vec<StaticParameter>), TypeError> {
        let (fresh, mut solver, renames) = self.fresh_solver(static_params);
        for (arg, param) in arguments {
            let formal = replace_types(param, &fresh);
            let hint = replace_types(&formal, solver.bindings());
            let actual = self.infer_expr(*arg, Some(&hint))?;
            if !solver.coerce(&actual, &formal) {
                return Err(TypeError::UnexpectedType {
                    expected: Expected::Type(formal),
                    actual,
                    span: arg.span(),
                });
            }
        }

        let mut bindings = StaticBindings::new();
        let mut remaining = Vec::new();
        for (original, copy) in renames {
            match solver.bindings().type_for(copy.id) {
                Some(bound) => bindings.bind_type(original.id, bound.clone()),
                None => remaining.push(StaticParameter::Type(original)),
            }
        }
        for param in static_params {
            if let StaticParameter::Effect(effect) = param {
                match solver.bindings().effect_for(effect.id) {
                    Some(bound) => bindings.bind_effect(effect.id, bound.clone()),
                    None => remaining.push(param.clone()),
                }
            }
        }
        Ok((bindings, remaining))
    }
}
