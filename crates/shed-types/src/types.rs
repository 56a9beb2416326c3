use crate::adt::{ShapeType, UnionType};
use crate::effects::{EffectParameter, EffectSet};
use shed_ast::ast::Variance;
use shed_ast::ids::NodeIdGen;
use std::collections::BTreeMap;
use std::fmt;

/// Identity of a static parameter. Fresh copies made for call-site inference
/// get fresh ids.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(pub u32);

impl ParamId {
    pub fn fresh(ids: &mut NodeIdGen) -> Self {
        ParamId(ids.next_raw())
    }
}

impl fmt::Debug for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeParameter {
    pub id: ParamId,
    pub name: String,
    pub variance: Variance,
}

impl TypeParameter {
    pub fn new(ids: &mut NodeIdGen, name: impl Into<String>, variance: Variance) -> Self {
        TypeParameter {
            id: ParamId::fresh(ids),
            name: name.into(),
            variance,
        }
    }

    /// Same name and variance, new identity.
    pub fn fresh_copy(&self, ids: &mut NodeIdGen) -> Self {
        TypeParameter {
            id: ParamId::fresh(ids),
            name: self.name.clone(),
            variance: self.variance,
        }
    }
}

impl EffectParameter {
    pub fn new(ids: &mut NodeIdGen, name: impl Into<String>) -> Self {
        EffectParameter {
            id: ParamId::fresh(ids),
            name: name.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StaticParameter {
    Type(TypeParameter),
    Effect(EffectParameter),
}

impl StaticParameter {
    pub fn id(&self) -> ParamId {
        match self {
            StaticParameter::Type(param) => param.id,
            StaticParameter::Effect(param) => param.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            StaticParameter::Type(param) => &param.name,
            StaticParameter::Effect(param) => &param.name,
        }
    }

    /// The parameter used as its own argument.
    pub fn as_value(&self) -> StaticValue {
        match self {
            StaticParameter::Type(param) => StaticValue::Type(Type::Parameter(param.clone())),
            StaticParameter::Effect(param) => StaticValue::Effect(EffectSet::parameter(param)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StaticValue {
    Type(Type),
    Effect(EffectSet),
}

impl fmt::Display for StaticValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticValue::Type(ty) => write!(f, "{}", ty),
            StaticValue::Effect(effects) => write!(f, "{}", effects),
        }
    }
}

/// A nominal tag. Its only value is itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SymbolType {
    pub module: Vec<String>,
    /// Includes the leading `@`.
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionType {
    pub static_params: Vec<StaticParameter>,
    pub params: Vec<Type>,
    pub named_params: BTreeMap<String, Type>,
    pub effects: EffectSet,
    pub ret: Type,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeAlias {
    pub name: String,
    pub aliased: Type,
}

/// A generic shape, union or alias before application.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeFunction {
    pub params: Vec<StaticParameter>,
    pub body: Type,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModuleType {
    pub fields: BTreeMap<String, Type>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Any,
    Nothing,
    Unit,
    Bool,
    Int,
    String,
    Char,
    /// Every symbol coerces to this.
    AnySymbol,
    Symbol(SymbolType),
    Tuple(Vec<Type>),
    Shape(ShapeType),
    Union(UnionType),
    Function(Box<FunctionType>),
    Parameter(TypeParameter),
    /// The type of a type-level expression.
    Meta(Box<Type>),
    Alias(Box<TypeAlias>),
    TypeFunction(Box<TypeFunction>),
    /// The type of an effect-valued expression.
    Effect(EffectSet),
    Module(ModuleType),
    /// The built-in `list` callee; holds the `List` family.
    ListConstructor(Box<TypeFunction>),
}

impl Type {
    pub fn meta(ty: Type) -> Type {
        Type::Meta(Box::new(ty))
    }

    pub fn function(params: Vec<Type>, effects: EffectSet, ret: Type) -> Type {
        Type::Function(Box::new(FunctionType {
            static_params: vec![],
            params,
            named_params: BTreeMap::new(),
            effects,
            ret,
        }))
    }

    pub fn alias(name: impl Into<String>, aliased: Type) -> Type {
        Type::Alias(Box::new(TypeAlias {
            name: name.into(),
            aliased,
        }))
    }

    pub fn symbol(module: &[String], name: impl Into<String>) -> Type {
        Type::Symbol(SymbolType {
            module: module.to_vec(),
            name: name.into(),
        })
    }

    /// Strip any number of alias layers.
    pub fn unalias(&self) -> &Type {
        let mut ty = self;
        while let Type::Alias(alias) = ty {
            ty = &alias.aliased;
        }
        ty
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Type::Unit | Type::Bool | Type::Int | Type::String | Type::Char
        )
    }
}

fn comma_separated<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for StaticParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticParameter::Type(param) => write!(f, "{}", Type::Parameter(param.clone())),
            StaticParameter::Effect(param) => write!(f, "!{}", param.name),
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.static_params.is_empty() {
            write!(f, "[")?;
            comma_separated(f, &self.static_params)?;
            write!(f, "]")?;
        }
        write!(f, "(")?;
        comma_separated(f, &self.params)?;
        for (i, (name, ty)) in self.named_params.iter().enumerate() {
            if i > 0 || !self.params.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, ".{}: {}", name, ty)?;
        }
        write!(f, ")")?;
        if !self.effects.is_empty() {
            write!(f, " {}", self.effects)?;
        }
        write!(f, " -> {}", self.ret)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => write!(f, "Any"),
            Type::Nothing => write!(f, "Nothing"),
            Type::Unit => write!(f, "Unit"),
            Type::Bool => write!(f, "Bool"),
            Type::Int => write!(f, "Int"),
            Type::String => write!(f, "String"),
            Type::Char => write!(f, "Char"),
            Type::AnySymbol => write!(f, "Symbol"),
            Type::Symbol(symbol) => write!(f, "{}", symbol.name),
            Type::Tuple(elems) => {
                write!(f, "#(")?;
                comma_separated(f, elems)?;
                write!(f, ")")
            }
            Type::Shape(shape) => write!(f, "{}", shape),
            Type::Union(union) => write!(f, "{}", union),
            Type::Function(func) => write!(f, "{}", func),
            Type::Parameter(param) => match param.variance {
                Variance::Invariant => write!(f, "{}", param.name),
                Variance::Covariant => write!(f, "+{}", param.name),
                Variance::Contravariant => write!(f, "-{}", param.name),
            },
            Type::Meta(ty) => write!(f, "Type[{}]", ty),
            Type::Alias(alias) => write!(f, "{}", alias.name),
            Type::TypeFunction(func) => {
                write!(f, "TypeFunction[")?;
                comma_separated(f, &func.params)?;
                write!(f, "]({})", func.body)
            }
            Type::Effect(effects) => write!(f, "{}", effects),
            Type::Module(_) => write!(f, "Module"),
            Type::ListConstructor(_) => write!(f, "ListConstructor"),
        }
    }
}
