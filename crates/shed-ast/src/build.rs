//! Tree construction helpers.
//!
//! `AstBuilder` hands out node ids and keeps a flat name table standing in for
//! reference resolution: a reference to a name that is already declared binds
//! to that declaration immediately, anything else binds to the last
//! declaration of that name when [`AstBuilder::references`] is called. That is
//! enough for tests and tooling that build trees by hand; the real resolver
//! lives in the front end. Spans are synthetic but distinct per node, so
//! errors can be traced back to the node that raised them.

use crate::ast::*;
use crate::ids::{NodeId, NodeIdGen};
use crate::span::Span;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct AstBuilder {
    ids: NodeIdGen,
    declarations: HashMap<String, NodeId>,
    resolved: HashMap<NodeId, NodeId>,
    pending: Vec<(NodeId, String)>,
    offset: u32,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&mut self) -> &mut NodeIdGen {
        &mut self.ids
    }

    pub fn fresh(&mut self) -> NodeId {
        self.ids.fresh()
    }

    /// Make `name` resolve to `id` (used for builtins).
    pub fn declare(&mut self, name: &str, id: NodeId) {
        self.declarations.insert(name.to_string(), id);
    }

    /// Every node gets its own one-byte span, in construction order.
    fn sp(&mut self) -> Span {
        let start = self.offset;
        self.offset += 1;
        Span::new(start, start + 1)
    }

    fn ident(&mut self, name: &str) -> Ident {
        Ident {
            text: name.to_string(),
            span: self.sp(),
        }
    }

    fn reference(&mut self, name: &str) -> NodeId {
        let id = self.fresh();
        match self.declarations.get(name) {
            Some(target) => {
                self.resolved.insert(id, *target);
            }
            None => self.pending.push((id, name.to_string())),
        }
        id
    }

    fn declared(&mut self, name: &str) -> NodeId {
        let id = self.fresh();
        self.declare(name, id);
        id
    }

    /// Finish resolution; pending references bind to the final declarations.
    pub fn references(&self) -> HashMap<NodeId, NodeId> {
        let mut resolved = self.resolved.clone();
        for (id, name) in &self.pending {
            if let Some(target) = self.declarations.get(name) {
                resolved.insert(*id, *target);
            }
        }
        resolved
    }

    // ---- type-level expressions ----

    pub fn ty(&mut self, name: &str) -> StaticExpr {
        StaticExpr::Ref {
            id: self.reference(name),
            name: self.ident(name),
        }
    }

    pub fn apply(&mut self, receiver: StaticExpr, args: Vec<StaticExpr>) -> StaticExpr {
        StaticExpr::Apply {
            id: self.fresh(),
            receiver: Box::new(receiver),
            args,
            span: self.sp(),
        }
    }

    pub fn type_field(&mut self, receiver: StaticExpr, field: &str) -> StaticExpr {
        StaticExpr::Field {
            id: self.fresh(),
            receiver: Box::new(receiver),
            field: self.ident(field),
            span: self.sp(),
        }
    }

    pub fn fn_type(
        &mut self,
        params: Vec<StaticExpr>,
        effects: Vec<StaticExpr>,
        ret: StaticExpr,
    ) -> StaticExpr {
        StaticExpr::Fn {
            id: self.fresh(),
            static_params: vec![],
            params,
            named_params: vec![],
            effects,
            ret: Box::new(ret),
            span: self.sp(),
        }
    }

    pub fn tuple_type(&mut self, elems: Vec<StaticExpr>) -> StaticExpr {
        StaticExpr::Tuple {
            id: self.fresh(),
            elems,
            span: self.sp(),
        }
    }

    pub fn symbol_type(&mut self, name: &str) -> StaticExpr {
        StaticExpr::Symbol {
            id: self.fresh(),
            name: name.to_string(),
            span: self.sp(),
        }
    }

    pub fn type_param(&mut self, name: &str, variance: Variance) -> StaticParam {
        StaticParam::Type {
            id: self.declared(name),
            name: self.ident(name),
            variance,
            span: self.sp(),
        }
    }

    pub fn effect_param(&mut self, name: &str) -> StaticParam {
        StaticParam::Effect {
            id: self.declared(name),
            name: self.ident(name),
            span: self.sp(),
        }
    }

    // ---- expressions ----

    pub fn lit(&mut self, lit: Lit) -> Expr {
        Expr::Lit {
            id: self.fresh(),
            lit,
            span: self.sp(),
        }
    }

    pub fn unit(&mut self) -> Expr {
        self.lit(Lit::Unit)
    }

    pub fn int(&mut self, value: i64) -> Expr {
        self.lit(Lit::Int(value))
    }

    pub fn bool(&mut self, value: bool) -> Expr {
        self.lit(Lit::Bool(value))
    }

    pub fn string(&mut self, value: &str) -> Expr {
        self.lit(Lit::Str(value.to_string()))
    }

    pub fn char(&mut self, value: char) -> Expr {
        self.lit(Lit::Char(value))
    }

    pub fn symbol(&mut self, name: &str) -> Expr {
        self.lit(Lit::Symbol(name.to_string()))
    }

    pub fn var(&mut self, name: &str) -> Expr {
        Expr::Var {
            id: self.reference(name),
            name: self.ident(name),
        }
    }

    pub fn unary(&mut self, op: UnOp, expr: Expr) -> Expr {
        Expr::Unary {
            id: self.fresh(),
            op,
            expr: Box::new(expr),
            span: self.sp(),
        }
    }

    pub fn binary(&mut self, op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            id: self.fresh(),
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
            span: self.sp(),
        }
    }

    pub fn named_arg(&mut self, name: &str, value: Expr) -> NamedArg {
        NamedArg {
            name: self.ident(name),
            value,
            span: self.sp(),
        }
    }

    pub fn call(&mut self, callee: Expr, args: Vec<Expr>) -> Expr {
        self.call_full(callee, vec![], args, vec![])
    }

    pub fn call_named(&mut self, callee: Expr, named_args: Vec<NamedArg>) -> Expr {
        self.call_full(callee, vec![], vec![], named_args)
    }

    pub fn call_full(
        &mut self,
        callee: Expr,
        static_args: Vec<StaticExpr>,
        args: Vec<Expr>,
        named_args: Vec<NamedArg>,
    ) -> Expr {
        Expr::Call {
            id: self.fresh(),
            callee: Box::new(callee),
            static_args,
            args,
            named_args,
            span: self.sp(),
        }
    }

    pub fn partial_call(&mut self, callee: Expr, args: Vec<Expr>, named_args: Vec<NamedArg>) -> Expr {
        Expr::PartialCall {
            id: self.fresh(),
            callee: Box::new(callee),
            static_args: vec![],
            args,
            named_args,
            span: self.sp(),
        }
    }

    pub fn field(&mut self, receiver: Expr, field: &str) -> Expr {
        Expr::Field {
            id: self.fresh(),
            receiver: Box::new(receiver),
            field: self.ident(field),
            span: self.sp(),
        }
    }

    pub fn is(&mut self, expr: Expr, ty: StaticExpr) -> Expr {
        Expr::Is {
            id: self.fresh(),
            expr: Box::new(expr),
            ty,
            span: self.sp(),
        }
    }

    pub fn if_(&mut self, branches: Vec<(Expr, Block)>, else_: Block) -> Expr {
        Expr::If {
            id: self.fresh(),
            branches: branches
                .into_iter()
                .map(|(cond, body)| CondBranch {
                    cond,
                    body,
                    span: self.sp(),
                })
                .collect(),
            else_,
            span: self.sp(),
        }
    }

    pub fn when(
        &mut self,
        scrutinee: Expr,
        branches: Vec<(StaticExpr, Block)>,
        else_: Option<Block>,
    ) -> Expr {
        let branches = branches
            .into_iter()
            .map(|(ty, body)| WhenBranch {
                id: self.fresh(),
                ty,
                body,
                span: self.sp(),
            })
            .collect();
        Expr::When {
            id: self.fresh(),
            scrutinee: Box::new(scrutinee),
            branches,
            else_,
            span: self.sp(),
        }
    }

    pub fn tuple(&mut self, elems: Vec<Expr>) -> Expr {
        Expr::Tuple {
            id: self.fresh(),
            elems,
            span: self.sp(),
        }
    }

    pub fn lambda(&mut self, sig: FnSig, body: Block) -> Expr {
        Expr::Fn {
            id: self.fresh(),
            sig,
            body,
            span: self.sp(),
        }
    }

    pub fn block(&mut self, stmts: Vec<Stmt>, tail: Option<Expr>) -> Block {
        Block {
            stmts,
            tail: tail.map(Box::new),
            span: self.sp(),
        }
    }

    /// A block that is just its tail expression.
    pub fn body(&mut self, tail: Expr) -> Block {
        self.block(vec![], Some(tail))
    }

    // ---- declarations ----

    pub fn param(&mut self, name: &str, ty: StaticExpr) -> Param {
        Param {
            id: self.declared(name),
            name: self.ident(name),
            ty: Some(ty),
            span: self.sp(),
        }
    }

    pub fn untyped_param(&mut self, name: &str) -> Param {
        Param {
            id: self.declared(name),
            name: self.ident(name),
            ty: None,
            span: self.sp(),
        }
    }

    pub fn sig(&mut self, params: Vec<Param>, ret: Option<StaticExpr>) -> FnSig {
        FnSig {
            static_params: vec![],
            params,
            named_params: vec![],
            effects: vec![],
            ret,
        }
    }

    pub fn function(&mut self, name: &str, sig: FnSig, body: Block) -> FnDecl {
        FnDecl {
            id: self.declared(name),
            name: self.ident(name),
            sig,
            body,
            span: self.sp(),
        }
    }

    pub fn var_target(&mut self, name: &str) -> Target {
        Target::Var {
            id: self.declared(name),
            name: self.ident(name),
        }
    }

    pub fn tuple_target(&mut self, elems: Vec<Target>) -> Target {
        Target::Tuple {
            id: self.fresh(),
            elems,
            span: self.sp(),
        }
    }

    pub fn fields_target(&mut self, fields: Vec<(&str, Target)>) -> Target {
        Target::Fields {
            id: self.fresh(),
            fields: fields
                .into_iter()
                .map(|(name, target)| (self.ident(name), target))
                .collect(),
            span: self.sp(),
        }
    }

    pub fn val(&mut self, name: &str, value: Expr) -> ValDecl {
        let target = self.var_target(name);
        self.val_target(target, None, value)
    }

    pub fn val_target(&mut self, target: Target, ty: Option<StaticExpr>, value: Expr) -> ValDecl {
        ValDecl {
            target,
            ty,
            value,
            span: self.sp(),
        }
    }

    pub fn shape_field(&mut self, name: &str, ty: StaticExpr) -> ShapeFieldDecl {
        ShapeFieldDecl {
            name: self.ident(name),
            ty,
            value: None,
            span: self.sp(),
        }
    }

    pub fn constant_field(&mut self, name: &str, ty: StaticExpr, value: Expr) -> ShapeFieldDecl {
        ShapeFieldDecl {
            name: self.ident(name),
            ty,
            value: Some(value),
            span: self.sp(),
        }
    }

    pub fn shape(
        &mut self,
        name: &str,
        static_params: Vec<StaticParam>,
        fields: Vec<ShapeFieldDecl>,
    ) -> ShapeDecl {
        ShapeDecl {
            id: self.declared(name),
            name: self.ident(name),
            static_params,
            fields,
            span: self.sp(),
        }
    }

    pub fn union(
        &mut self,
        name: &str,
        static_params: Vec<StaticParam>,
        members: Vec<StaticExpr>,
    ) -> UnionDecl {
        UnionDecl {
            id: self.declared(name),
            name: self.ident(name),
            static_params,
            members,
            span: self.sp(),
        }
    }

    pub fn alias(&mut self, name: &str, static_params: Vec<StaticParam>, ty: StaticExpr) -> TypeAliasDecl {
        TypeAliasDecl {
            id: self.declared(name),
            name: self.ident(name),
            static_params,
            ty,
            span: self.sp(),
        }
    }

    pub fn import(&mut self, name: &str, path: ImportPath) -> ImportDecl {
        ImportDecl {
            id: self.declared(name),
            target: self.ident(name),
            path,
            span: self.sp(),
        }
    }

    pub fn module(&mut self, name: &[&str], items: Vec<Item>) -> Module {
        Module {
            id: self.fresh(),
            name: name.iter().map(|part| part.to_string()).collect(),
            items,
            span: self.sp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_to_declared_name_resolves_immediately() {
        let mut b = AstBuilder::new();
        let target = b.var_target("x");
        let reference = b.var("x");
        let refs = b.references();
        assert_eq!(refs.get(&reference.id()), Some(&target.id()));
    }

    #[test]
    fn forward_reference_resolves_on_finish() {
        let mut b = AstBuilder::new();
        let reference = b.var("later");
        let target = b.var_target("later");
        let refs = b.references();
        assert_eq!(refs.get(&reference.id()), Some(&target.id()));
    }

    #[test]
    fn every_node_gets_its_own_span() {
        let mut b = AstBuilder::new();
        let one = b.int(1);
        let two = b.int(2);
        let (one_span, two_span) = (one.span(), two.span());
        let sum = b.binary(BinOp::Add, one, two);
        assert_ne!(one_span, two_span);
        assert_ne!(sum.span(), one_span);
        assert_ne!(sum.span(), two_span);
    }

    #[test]
    fn earlier_reference_keeps_earlier_declaration() {
        let mut b = AstBuilder::new();
        let first = b.type_param("T", Variance::Invariant);
        let reference = b.ty("T");
        let _second = b.type_param("T", Variance::Covariant);
        let refs = b.references();
        assert_eq!(refs.get(&reference.id()), Some(&first.id()));
    }
}
