#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]
#![forbid(unsafe_code)]

pub mod adt;
pub mod builtins;
mod checker;
pub mod discriminator;
mod effects;
mod types;


pub use checker::{type_check, Expected, TypeCheckResult, TypeError};
pub use discriminator::{find_discriminator, Discriminator};
pub use effects::{Effect, EffectParameter, EffectSet};
pub use types::{
    FunctionType, ModuleType, ParamId, StaticParameter, StaticValue, SymbolType, Type, TypeAlias, TypeFunction,
    TypeParameter,
};

// solver and inference live in their own namespace
pub mod infer {
    mod calls;
    pub mod coerce;
    pub mod ctx;
    mod decls;
    mod expr;
    pub mod solver;
    mod statics;
    pub mod subst;

    pub use coerce::{can_coerce, coerce, coerce_all, is_equivalent_type, is_sub_effect, union, CoercionResult};
    pub use ctx::{ModuleLookup, ModuleResult, ResolvedReferences, Types, MAX_INFER_DEPTH};
    pub use solver::TypeConstraintSolver;
    pub use subst::{apply_static, replace_effects, replace_types, StaticBindings};

    #[cfg(test)]
    mod tests;
}

// Short names for dependents.
pub mod prelude {
    pub use crate::builtins::Builtins;
    pub use crate::infer::{can_coerce, ModuleLookup, ModuleResult, ResolvedReferences, Types};
    pub use crate::{type_check, Discriminator, EffectSet, Type, TypeCheckResult, TypeError};
}
