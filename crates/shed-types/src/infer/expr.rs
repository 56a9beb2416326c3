//! Expression type inference.
//!
//! Every inferred expression type is recorded against the node id before it
//! is returned.

use super::coerce::{can_coerce, union};
use super::ctx::{Deferred, TypeContext};
use crate::checker::{Expected, TypeError};
use crate::discriminator::{find_discriminator, unhandled_members};
use crate::effects::EffectSet;
use crate::types::{FunctionType, StaticParameter, Type};
use shed_ast::ast::{BinOp, Block, Expr, FnDecl, FnSig, Lit, Stmt, StaticExpr, Target, UnOp, ValDecl};
use shed_ast::ids::NodeId;
use shed_ast::span::Span;
use std::collections::BTreeMap;

/// A checked signature. `ret` is absent when the source leaves it out.
pub(crate) struct Signature {
    pub static_params: Vec<StaticParameter>,
    pub params: Vec<Type>,
    pub named_params: BTreeMap<String, Type>,
    pub effects: EffectSet,
    pub ret: Option<Type>,
}

impl Signature {
    fn into_function(self, ret: Type) -> FunctionType {
        FunctionType {
            static_params: self.static_params,
            params: self.params,
            named_params: self.named_params,
            effects: self.effects,
            ret,
        }
    }
}

fn binary_result(op: BinOp, left: &Type, right: &Type) -> Option<Type> {
    use Type::*;
    match (op, left, right) {
        (BinOp::Eq | BinOp::Ne, left, right) if left.is_scalar() && left == right => Some(Bool),
        (BinOp::Eq | BinOp::Ne, Symbol(a), Symbol(b)) if a == b => Some(Bool),

        (BinOp::Add | BinOp::Sub | BinOp::Mul, Int, Int) => Some(Int),
        (BinOp::Add, String, String) => Some(String),

        (BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge, Int, Int)
        | (BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge, Char, Char) => Some(Bool),

        (BinOp::And | BinOp::Or, Bool, Bool) => Some(Bool),
        _ => None,
    }
}

impl<'a> TypeContext<'a> {
    pub(crate) fn infer_expr(&mut self, expr: &'a Expr, hint: Option<&Type>) -> Result<Type, TypeError> {
        self.enter_depth(expr.span())?;
        let result = self.infer_expr_inner(expr, hint);
        self.exit_depth();
        let ty = result?;
        self.types.record(expr.id(), ty.clone());
        Ok(ty)
    }

    /// Infer `expr` with `expected` as the hint and require it to coerce.
    pub(crate) fn verify_expr(&mut self, expr: &'a Expr, expected: &Type) -> Result<Type, TypeError> {
        let actual = self.infer_expr(expr, Some(expected))?;
        self.verify_type(&actual, expected, expr.span())?;
        Ok(actual)
    }

    pub(crate) fn verify_type(&self, actual: &Type, expected: &Type, span: Span) -> Result<(), TypeError> {
        if can_coerce(actual, expected) {
            Ok(())
        } else {
            Err(TypeError::UnexpectedType {
                expected: Expected::Type(expected.clone()),
                actual: actual.clone(),
                span,
            })
        }
    }

    fn infer_expr_inner(&mut self, expr: &'a Expr, hint: Option<&Type>) -> Result<Type, TypeError> {
        match expr {
            Expr::Lit { lit, .. } => Ok(match lit {
                Lit::Unit => Type::Unit,
                Lit::Bool(_) => Type::Bool,
                Lit::Int(_) => Type::Int,
                Lit::Str(_) => Type::String,
                Lit::Char(_) => Type::Char,
                Lit::Symbol(name) => Type::symbol(&self.module_path, name.clone()),
            }),

            Expr::Var { id, name } => self.type_of_reference(*id, &name.text, name.span),

            Expr::Unary { op, expr: operand, span, .. } => {
                let operand_ty = self.infer_expr(operand, None)?;
                match (op, operand_ty.unalias()) {
                    (UnOp::Not, Type::Bool) => Ok(Type::Bool),
                    (UnOp::Neg, Type::Int) => Ok(Type::Int),
                    _ => Err(TypeError::InvalidOperation {
                        operator: match op {
                            UnOp::Not => "not".to_string(),
                            UnOp::Neg => "-".to_string(),
                        },
                        operands: vec![operand_ty],
                        span: *span,
                    }),
                }
            }

            Expr::Binary { lhs, op, rhs, span, .. } => {
                let left = self.infer_expr(lhs, None)?;
                let right = self.infer_expr(rhs, None)?;
                binary_result(*op, left.unalias(), right.unalias()).ok_or_else(|| TypeError::InvalidOperation {
                    operator: op.symbol().to_string(),
                    operands: vec![left, right],
                    span: *span,
                })
            }

            Expr::Call {
                callee,
                static_args,
                args,
                named_args,
                span,
                ..
            } => self.infer_call(callee, static_args, args, named_args, *span),

            Expr::PartialCall {
                callee,
                static_args,
                args,
                named_args,
                span,
                ..
            } => self.infer_partial_call(callee, static_args, args, named_args, *span),

            Expr::Field { receiver, field, .. } => {
                let receiver_ty = self.infer_expr(receiver, None)?;
                self.field_type(&receiver_ty, &field.text, field.span, receiver.span())
            }

            Expr::Is { id, expr: tested, ty, span } => {
                let source = self.infer_expr(tested, None)?;
                self.require_union(&source, tested.span())?;
                let target = self.eval_type(ty)?;
                let discriminator =
                    find_discriminator(&source, &target).ok_or_else(|| TypeError::CouldNotFindDiscriminator {
                        source_type: source.clone(),
                        target_type: target.clone(),
                        span: *span,
                    })?;
                self.types.record_discriminator(*id, discriminator);
                Ok(Type::Bool)
            }

            Expr::If { branches, else_, .. } => {
                let mut result = Type::Nothing;
                for branch in branches {
                    self.verify_expr(&branch.cond, &Type::Bool)?;
                    let scope = match self.narrowing(&branch.cond)? {
                        Some((decl, narrowed)) => self.scope().narrow(decl, narrowed),
                        None => self.scope().clone(),
                    };
                    let body = self.with_scope(scope, |ctx| ctx.infer_block(&branch.body, hint))?;
                    result = union(&result, &body);
                }
                let else_ty = self.infer_block(else_, hint)?;
                Ok(union(&result, &else_ty))
            }

            Expr::When {
                scrutinee,
                branches,
                else_,
                span,
                ..
            } => {
                let source = self.infer_expr(scrutinee, None)?;
                self.require_union(&source, scrutinee.span())?;
                let narrowed_decl = match scrutinee.as_ref() {
                    Expr::Var { id, name } => Some(self.resolve(*id, &name.text, name.span)?),
                    _ => None,
                };

                let mut result = Type::Nothing;
                let mut cases = Vec::with_capacity(branches.len());
                for branch in branches {
                    let case = self.eval_type(&branch.ty)?;
                    let discriminator =
                        find_discriminator(&source, &case).ok_or_else(|| TypeError::CouldNotFindDiscriminator {
                            source_type: source.clone(),
                            target_type: case.clone(),
                            span: branch.span,
                        })?;
                    self.types.record_discriminator(branch.id, discriminator);

                    let scope = match narrowed_decl {
                        Some(decl) => self.scope().narrow(decl, case.clone()),
                        None => self.scope().clone(),
                    };
                    let body = self.with_scope(scope, |ctx| ctx.infer_block(&branch.body, hint))?;
                    result = union(&result, &body);
                    cases.push(case);
                }

                match else_ {
                    Some(else_) => {
                        let else_ty = self.infer_block(else_, hint)?;
                        result = union(&result, &else_ty);
                    }
                    None => {
                        let unhandled = unhandled_members(&source, &cases);
                        if !unhandled.is_empty() {
                            return Err(TypeError::WhenIsNotExhaustive {
                                unhandled_members: unhandled,
                                span: *span,
                            });
                        }
                    }
                }
                Ok(result)
            }

            Expr::Tuple { elems, .. } => {
                let hints = match hint.map(Type::unalias) {
                    Some(Type::Tuple(hints)) if hints.len() == elems.len() => Some(hints.clone()),
                    _ => None,
                };
                let mut types = Vec::with_capacity(elems.len());
                for (i, elem) in elems.iter().enumerate() {
                    let elem_hint = hints.as_ref().map(|hints| &hints[i]);
                    types.push(self.infer_expr(elem, elem_hint)?);
                }
                Ok(Type::Tuple(types))
            }

            Expr::Fn { sig, body, .. } => {
                let hint = match hint.map(Type::unalias) {
                    Some(Type::Function(func)) => Some(func.as_ref().clone()),
                    _ => None,
                };
                self.infer_lambda(sig, body, hint.as_ref())
            }
        }
    }

    fn require_union(&self, ty: &Type, span: Span) -> Result<(), TypeError> {
        match ty.unalias() {
            Type::Union(_) => Ok(()),
            _ => Err(TypeError::UnexpectedType {
                expected: Expected::Union,
                actual: ty.clone(),
                span,
            }),
        }
    }

    /// `x is T` on a plain variable narrows `x` to `T` in the guarded branch.
    fn narrowing(&self, cond: &Expr) -> Result<Option<(NodeId, Type)>, TypeError> {
        let Expr::Is { expr, ty, .. } = cond else {
            return Ok(None);
        };
        let Expr::Var { id, name } = expr.as_ref() else {
            return Ok(None);
        };
        let decl = self.resolve(*id, &name.text, name.span)?;
        match self.types.type_of(ty.id()) {
            Some(Type::Meta(target)) => Ok(Some((decl, target.as_ref().clone()))),
            _ => Err(TypeError::InvariantViolation {
                msg: "is-test target was not evaluated".to_string(),
                span: ty.span(),
            }),
        }
    }

    pub(crate) fn field_type(
        &self,
        receiver: &Type,
        field: &str,
        field_span: Span,
        receiver_span: Span,
    ) -> Result<Type, TypeError> {
        let no_such_field = || TypeError::NoSuchField {
            field: field.to_string(),
            span: field_span,
        };
        match receiver.unalias() {
            Type::Shape(shape) => shape.field(field).map(|f| f.ty).ok_or_else(no_such_field),
            Type::Module(module) => module.fields.get(field).cloned().ok_or_else(no_such_field),
            _ => Err(TypeError::UnexpectedType {
                expected: Expected::ShapeOrModule,
                actual: receiver.clone(),
                span: receiver_span,
            }),
        }
    }

    pub(crate) fn infer_block(&mut self, block: &'a Block, hint: Option<&Type>) -> Result<Type, TypeError> {
        for stmt in &block.stmts {
            match stmt {
                Stmt::Expr(expr) => {
                    self.infer_expr(expr, None)?;
                }
                Stmt::Val(val) => self.check_val(val)?,
                Stmt::Fn(decl) => self.check_fn_decl(decl)?,
            }
        }
        match &block.tail {
            Some(tail) => self.infer_expr(tail, hint),
            None => Ok(Type::Unit),
        }
    }

    pub(crate) fn check_val(&mut self, val: &'a ValDecl) -> Result<(), TypeError> {
        let ty = match &val.ty {
            Some(annotation) => {
                let expected = self.eval_type(annotation)?;
                self.verify_expr(&val.value, &expected)?;
                expected
            }
            None => self.infer_expr(&val.value, None)?,
        };
        self.bind_target(&val.target, ty)
    }

    pub(crate) fn bind_target(&mut self, target: &'a Target, ty: Type) -> Result<(), TypeError> {
        match target {
            Target::Var { id, .. } => {
                self.bind(*id, ty);
                Ok(())
            }
            Target::Tuple { elems, span, .. } => {
                let elem_types = match ty.unalias() {
                    Type::Tuple(elem_types) if elem_types.len() == elems.len() => elem_types.clone(),
                    _ => {
                        return Err(TypeError::UnexpectedType {
                            expected: Expected::Type(Type::Tuple(vec![Type::Any; elems.len()])),
                            actual: ty,
                            span: *span,
                        })
                    }
                };
                for (elem, elem_ty) in elems.iter().zip(elem_types) {
                    self.bind_target(elem, elem_ty)?;
                }
                Ok(())
            }
            Target::Fields { fields, span, .. } => {
                for (name, field_target) in fields {
                    let field_ty = self.field_type(&ty, &name.text, name.span, *span)?;
                    self.bind_target(field_target, field_ty)?;
                }
                Ok(())
            }
        }
    }

    /// Check a signature and bind its parameters. Unannotated parameters take
    /// their type from `hint`.
    pub(crate) fn check_signature(&mut self, sig: &'a FnSig, hint: Option<&FunctionType>) -> Result<Signature, TypeError> {
        let static_params = self.declare_static_params(&sig.static_params);

        let mut params = Vec::with_capacity(sig.params.len());
        for (i, param) in sig.params.iter().enumerate() {
            let hinted = hint.and_then(|hint| hint.params.get(i));
            let ty = self.param_type(param.ty.as_ref(), hinted, &param.name.text, param.span)?;
            self.bind(param.id, ty.clone());
            params.push(ty);
        }

        let mut named_params = BTreeMap::new();
        for param in &sig.named_params {
            let hinted = hint.and_then(|hint| hint.named_params.get(&param.name.text));
            if named_params.contains_key(&param.name.text) {
                return Err(TypeError::FieldAlreadyDeclared {
                    field: param.name.text.clone(),
                    span: param.span,
                });
            }
            let ty = self.param_type(param.ty.as_ref(), hinted, &param.name.text, param.span)?;
            self.bind(param.id, ty.clone());
            named_params.insert(param.name.text.clone(), ty);
        }

        let effects = self.eval_effects(&sig.effects)?;
        let ret = sig.ret.as_ref().map(|ret| self.eval_type(ret)).transpose()?;
        Ok(Signature {
            static_params,
            params,
            named_params,
            effects,
            ret,
        })
    }

    fn param_type(
        &mut self,
        annotation: Option<&'a StaticExpr>,
        hint: Option<&Type>,
        name: &str,
        span: Span,
    ) -> Result<Type, TypeError> {
        match (annotation, hint) {
            (Some(annotation), _) => self.eval_type(annotation),
            (None, Some(hint)) => Ok(hint.clone()),
            (None, None) => Err(TypeError::MissingParameterType {
                name: name.to_string(),
                span,
            }),
        }
    }

    /// Lambdas with a declared return type have their body deferred; without
    /// one the body is inferred on the spot.
    fn infer_lambda(&mut self, sig: &'a FnSig, body: &'a Block, hint: Option<&FunctionType>) -> Result<Type, TypeError> {
        let signature = self.check_signature(sig, hint)?;
        let ret = match &signature.ret {
            Some(ret) => {
                self.defer(Deferred::Body {
                    body,
                    ret: ret.clone(),
                    effects: signature.effects.clone(),
                    scope: self.scope().clone(),
                });
                ret.clone()
            }
            None => {
                let ret_hint = hint.map(|hint| hint.ret.clone());
                self.with_effects(signature.effects.clone(), |ctx| ctx.infer_block(body, ret_hint.as_ref()))?
            }
        };
        Ok(Type::Function(Box::new(signature.into_function(ret))))
    }

    /// Bind a function declaration to its signature and defer its body.
    /// A missing return type means `Unit`.
    pub(crate) fn check_fn_decl(&mut self, decl: &'a FnDecl) -> Result<(), TypeError> {
        let signature = self.check_signature(&decl.sig, None)?;
        let ret = signature.ret.clone().unwrap_or(Type::Unit);
        self.defer(Deferred::Body {
            body: &decl.body,
            ret: ret.clone(),
            effects: signature.effects.clone(),
            scope: self.scope().clone(),
        });
        let func = signature.into_function(ret);
        self.bind(decl.id, Type::Function(Box::new(func)));
        Ok(())
    }
}
