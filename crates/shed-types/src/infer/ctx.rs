use crate::checker::TypeError;
use crate::discriminator::Discriminator;
use crate::effects::EffectSet;
use crate::types::Type;
use shed_ast::ast::{Block, Expr, ImportPath};
use shed_ast::ids::{NodeId, NodeIdGen};
use shed_ast::span::Span;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// Maximum expression nesting before checking gives up.
pub const MAX_INFER_DEPTH: u32 = 512;

/// Maps a reference node to the declaration it names.
pub trait ResolvedReferences {
    fn resolve(&self, reference: NodeId) -> Option<NodeId>;
}

impl ResolvedReferences for HashMap<NodeId, NodeId> {
    fn resolve(&self, reference: NodeId) -> Option<NodeId> {
        self.get(&reference).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModuleResult {
    Found(Type),
    NotFound,
    FoundMany,
}

pub trait ModuleLookup {
    fn find_module(&self, path: &ImportPath) -> ModuleResult;
}

impl ModuleLookup for HashMap<ImportPath, Type> {
    fn find_module(&self, path: &ImportPath) -> ModuleResult {
        match self.get(path) {
            Some(ty) => ModuleResult::Found(ty.clone()),
            None => ModuleResult::NotFound,
        }
    }
}

impl<F> ModuleLookup for F
where
    F: Fn(&ImportPath) -> ModuleResult,
{
    fn find_module(&self, path: &ImportPath) -> ModuleResult {
        self(path)
    }
}

/// Types of expressions and discriminators of `is`/`when` nodes.
#[derive(Debug, Clone, Default)]
pub struct Types {
    types: HashMap<NodeId, Type>,
    discriminators: HashMap<NodeId, Discriminator>,
}

impl Types {
    pub fn type_of(&self, node: NodeId) -> Option<&Type> {
        self.types.get(&node)
    }

    pub fn discriminator_for(&self, node: NodeId) -> Option<&Discriminator> {
        self.discriminators.get(&node)
    }

    pub(crate) fn record(&mut self, node: NodeId, ty: Type) {
        self.types.insert(node, ty);
    }

    pub(crate) fn record_discriminator(&mut self, node: NodeId, discriminator: Discriminator) {
        self.discriminators.insert(node, discriminator);
    }
}

struct Frame {
    decl: NodeId,
    ty: Type,
    parent: Option<Rc<Frame>>,
}

/// Narrowed declaration types, layered over the recorded bindings.
#[derive(Clone, Default)]
pub struct Scope {
    top: Option<Rc<Frame>>,
}

impl Scope {
    pub fn lookup(&self, decl: NodeId) -> Option<&Type> {
        let mut frame = self.top.as_deref();
        while let Some(f) = frame {
            if f.decl == decl {
                return Some(&f.ty);
            }
            frame = f.parent.as_deref();
        }
        None
    }

    pub fn narrow(&self, decl: NodeId, ty: Type) -> Scope {
        Scope {
            top: Some(Rc::new(Frame {
                decl,
                ty,
                parent: self.top.clone(),
            })),
        }
    }
}

/// Work postponed until every top-level binding has a type.
pub(crate) enum Deferred<'a> {
    /// A function body checked against its return type.
    Body {
        body: &'a Block,
        ret: Type,
        effects: EffectSet,
        scope: Scope,
    },
    /// A constant shape field value.
    FieldValue { value: &'a Expr, ty: Type },
}

pub struct TypeContext<'a> {
    pub(crate) module_path: Vec<String>,
    references: &'a dyn ResolvedReferences,
    modules: &'a dyn ModuleLookup,
    pub(crate) ids: &'a mut NodeIdGen,
    bindings: HashMap<NodeId, Type>,
    pub(crate) types: Types,
    scope: Scope,
    effects: EffectSet,
    deferred: Vec<Deferred<'a>>,
    depth: u32,
}

impl<'a> TypeContext<'a> {
    pub fn new(
        module_path: Vec<String>,
        ids: &'a mut NodeIdGen,
        initial_bindings: &HashMap<NodeId, Type>,
        references: &'a dyn ResolvedReferences,
        modules: &'a dyn ModuleLookup,
    ) -> Self {
        TypeContext {
            module_path,
            references,
            modules,
            ids,
            bindings: initial_bindings.clone(),
            types: Types::default(),
            scope: Scope::default(),
            effects: EffectSet::pure(),
            deferred: Vec::new(),
            depth: 0,
        }
    }

    pub(crate) fn enter_depth(&mut self, span: Span) -> Result<(), TypeError> {
        self.depth += 1;
        if self.depth > MAX_INFER_DEPTH {
            Err(TypeError::DepthLimitExceeded { span })
        } else {
            Ok(())
        }
    }

    pub(crate) fn exit_depth(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn resolve(&self, reference: NodeId, name: &str, span: Span) -> Result<NodeId, TypeError> {
        self.references
            .resolve(reference)
            .ok_or_else(|| TypeError::UnresolvedReference {
                name: name.to_string(),
                span,
            })
    }

    pub(crate) fn type_of_declaration(&self, decl: NodeId, span: Span) -> Result<Type, TypeError> {
        if let Some(ty) = self.scope.lookup(decl) {
            return Ok(ty.clone());
        }
        self.bindings
            .get(&decl)
            .cloned()
            .ok_or_else(|| TypeError::InvariantViolation {
                msg: format!("no type recorded for declaration {:?}", decl),
                span,
            })
    }

    pub(crate) fn type_of_reference(&self, reference: NodeId, name: &str, span: Span) -> Result<Type, TypeError> {
        let decl = self.resolve(reference, name, span)?;
        self.type_of_declaration(decl, span)
    }

    pub(crate) fn bind(&mut self, decl: NodeId, ty: Type) {
        self.bindings.insert(decl, ty);
    }

    pub(crate) fn binding(&self, decl: NodeId) -> Option<&Type> {
        self.bindings.get(&decl)
    }

    pub(crate) fn find_module(&self, path: &ImportPath) -> ModuleResult {
        self.modules.find_module(path)
    }

    pub(crate) fn scope(&self) -> &Scope {
        &self.scope
    }

    pub(crate) fn effects(&self) -> &EffectSet {
        &self.effects
    }

    pub(crate) fn with_scope<R>(&mut self, scope: Scope, f: impl FnOnce(&mut Self) -> R) -> R {
        let outer = std::mem::replace(&mut self.scope, scope);
        let result = f(self);
        self.scope = outer;
        result
    }

    pub(crate) fn with_effects<R>(&mut self, effects: EffectSet, f: impl FnOnce(&mut Self) -> R) -> R {
        let outer = std::mem::replace(&mut self.effects, effects);
        let result = f(self);
        self.effects = outer;
        result
    }

    pub(crate) fn defer(&mut self, item: Deferred<'a>) {
        self.deferred.push(item);
    }

    /// Drain the deferred queue, newest first, until nothing new is added.
    pub(crate) fn undefer(&mut self) -> Result<(), TypeError> {
        debug!(pending = self.deferred.len(), "draining deferred checks");
        while let Some(item) = self.deferred.pop() {
            match item {
                Deferred::Body {
                    body,
                    ret,
                    effects,
                    scope,
                } => {
                    self.with_scope(scope, |ctx| {
                        ctx.with_effects(effects, |ctx| {
                            let actual = ctx.infer_block(body, Some(&ret))?;
                            ctx.verify_type(&actual, &ret, body.span)
                        })
                    })?;
                }
                Deferred::FieldValue { value, ty } => {
                    self.verify_expr(value, &ty)?;
                }
            }
        }
        Ok(())
    }

    pub fn into_types(self) -> Types {
        self.types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowing_shadows_without_touching_parent() {
        let outer = Scope::default();
        let decl = NodeId(7);
        let inner = outer.narrow(decl, Type::Int);
        let innermost = inner.narrow(decl, Type::Bool);

        assert_eq!(outer.lookup(decl), None);
        assert_eq!(inner.lookup(decl), Some(&Type::Int));
        assert_eq!(innermost.lookup(decl), Some(&Type::Bool));
        assert_eq!(innermost.lookup(NodeId(8)), None);
    }

    #[test]
    fn module_lookup_from_closure() {
        let lookup = |path: &ImportPath| {
            if path.parts == ["Core", "Options"] {
                ModuleResult::FoundMany
            } else {
                ModuleResult::NotFound
            }
        };
        assert_eq!(
            lookup.find_module(&ImportPath::absolute(&["Core", "Options"])),
            ModuleResult::FoundMany
        );
        assert_eq!(lookup.find_module(&ImportPath::relative(&["x"])), ModuleResult::NotFound);
    }
}
