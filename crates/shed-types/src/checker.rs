// crates/shed-types/src/checker.rs
// Module entry point and the errors type checking can raise

use crate::infer::ctx::{ModuleLookup, ResolvedReferences, TypeContext, Types};
use crate::types::{ModuleType, Type};
use shed_ast::ast::Module;
use shed_ast::ids::{NodeId, NodeIdGen};
use shed_ast::span::Span;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// What an unexpected-type error wanted instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Expected {
    Type(Type),
    Union,
    /// A receiver with fields.
    ShapeOrModule,
    Module,
    /// Any type-level value.
    TypeLevel,
    Effect,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Type(ty) => write!(f, "{}", ty),
            Expected::Union => write!(f, "union"),
            Expected::ShapeOrModule => write!(f, "shape or module"),
            Expected::Module => write!(f, "module"),
            Expected::TypeLevel => write!(f, "type"),
            Expected::Effect => write!(f, "effect"),
        }
    }
}

fn describe(types: &[Type]) -> String {
    types
        .iter()
        .map(|ty| ty.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Type errors that can occur during type checking
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeError {
    #[error("Expected type {expected} but was {actual} at {span:?}")]
    UnexpectedType {
        expected: Expected,
        actual: Type,
        span: Span,
    },
    #[error("Expected {expected} arguments but got {actual} at {span:?}")]
    WrongNumberOfArguments {
        expected: usize,
        actual: usize,
        span: Span,
    },
    #[error("Expected {expected} static arguments but got {actual} at {span:?}")]
    WrongNumberOfStaticArguments {
        expected: usize,
        actual: usize,
        span: Span,
    },
    #[error("Call is missing argument '{name}' at {span:?}")]
    MissingArgument { name: String, span: Span },
    #[error("Call has extra argument '{name}' at {span:?}")]
    ExtraArgument { name: String, span: Span },
    #[error("Argument '{name}' is already passed at {span:?}")]
    ArgumentAlreadyPassed { name: String, span: Span },
    #[error("Shape constructors take named arguments only, at {span:?}")]
    PositionalArgumentPassedToShapeConstructor { span: Span },
    #[error("Could not infer type parameter {param} at {span:?}")]
    CouldNotInferTypeParameter { param: String, span: Span },
    #[error("Parameter '{name}' needs a type at {span:?}")]
    MissingParameterType { name: String, span: Span },
    #[error("Unhandled effect {effect} at {span:?}")]
    UnhandledEffect { effect: String, span: Span },
    #[error("No such field '{field}' at {span:?}")]
    NoSuchField { field: String, span: Span },
    #[error("Could not find discriminator from {source_type} to {target_type} at {span:?}")]
    CouldNotFindDiscriminator {
        source_type: Type,
        target_type: Type,
        span: Span,
    },
    #[error("When is not exhaustive, unhandled members: {} at {span:?}", describe(.unhandled_members))]
    WhenIsNotExhaustive {
        unhandled_members: Vec<Type>,
        span: Span,
    },
    #[error("Field '{field}' is already declared at {span:?}")]
    FieldAlreadyDeclared { field: String, span: Span },
    #[error("Operation {operator} is not valid for operands {} at {span:?}", describe(.operands))]
    InvalidOperation {
        operator: String,
        operands: Vec<Type>,
        span: Span,
    },
    #[error("Invalid variance at {span:?}: {msg}")]
    InvalidVariance { msg: String, span: Span },
    #[error("Unresolved reference '{name}' at {span:?}")]
    UnresolvedReference { name: String, span: Span },
    #[error("Module not found: {path} at {span:?}")]
    ModuleNotFound { path: String, span: Span },
    #[error("More than one module with the name {path} at {span:?}")]
    MultipleModulesWithSameName { path: String, span: Span },
    #[error("Type inference depth limit exceeded at {span:?} (pathological input)")]
    DepthLimitExceeded { span: Span },
    #[error("Internal error at {span:?}: {msg} (this is a bug in the type checker)")]
    InvariantViolation { msg: String, span: Span },
}

impl TypeError {
    pub fn span(&self) -> Span {
        match self {
            TypeError::UnexpectedType { span, .. }
            | TypeError::WrongNumberOfArguments { span, .. }
            | TypeError::WrongNumberOfStaticArguments { span, .. }
            | TypeError::MissingArgument { span, .. }
            | TypeError::ExtraArgument { span, .. }
            | TypeError::ArgumentAlreadyPassed { span, .. }
            | TypeError::PositionalArgumentPassedToShapeConstructor { span }
            | TypeError::CouldNotInferTypeParameter { span, .. }
            | TypeError::MissingParameterType { span, .. }
            | TypeError::UnhandledEffect { span, .. }
            | TypeError::NoSuchField { span, .. }
            | TypeError::CouldNotFindDiscriminator { span, .. }
            | TypeError::WhenIsNotExhaustive { span, .. }
            | TypeError::FieldAlreadyDeclared { span, .. }
            | TypeError::InvalidOperation { span, .. }
            | TypeError::InvalidVariance { span, .. }
            | TypeError::UnresolvedReference { span, .. }
            | TypeError::ModuleNotFound { span, .. }
            | TypeError::MultipleModulesWithSameName { span, .. }
            | TypeError::DepthLimitExceeded { span }
            | TypeError::InvariantViolation { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeCheckResult {
    pub types: Types,
    pub module_type: ModuleType,
}

/// Type check one module.
///
/// `ids` must be the session's generator: shapes, unions and static
/// parameters created here draw their identities from it. The first error
/// aborts the whole module.
pub fn type_check(
    module: &Module,
    ids: &mut NodeIdGen,
    initial_bindings: &HashMap<NodeId, Type>,
    references: &dyn ResolvedReferences,
    modules: &dyn ModuleLookup,
) -> Result<TypeCheckResult, TypeError> {
    debug!(module = %module.name.join("."), items = module.items.len(), "type checking module");
    let mut ctx = TypeContext::new(module.name.clone(), ids, initial_bindings, references, modules);
    let module_type = ctx.check_module(module)?;
    Ok(TypeCheckResult {
        types: ctx.into_types(),
        module_type,
    })
}
