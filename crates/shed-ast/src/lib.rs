pub mod build;

pub mod span {
    use serde::Serialize;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
    pub struct Span {
        pub start: u32,
        pub end: u32,
    }

    impl Span {
        pub fn new(start: u32, end: u32) -> Self {
            Span { start, end }
        }
    }
}

pub mod ids {
    use serde::Serialize;
    use std::fmt;

    /// Identity of a syntax node. Unique within one compilation session.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
    pub struct NodeId(pub u32);

    impl fmt::Debug for NodeId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "n{}", self.0)
        }
    }

    /// Session-owned id generator.
    ///
    /// Node ids, shape/union identities and static parameter ids are all drawn
    /// from the same counter, so one generator must be threaded through
    /// parsing, builtins and type checking of a session.
    #[derive(Debug, Default)]
    pub struct NodeIdGen {
        next: u32,
    }

    impl NodeIdGen {
        pub fn new() -> Self {
            Self { next: 0 }
        }

        pub fn next_raw(&mut self) -> u32 {
            let id = self.next;
            self.next += 1;
            id
        }

        pub fn fresh(&mut self) -> NodeId {
            NodeId(self.next_raw())
        }
    }
}

pub mod ast {
    use super::ids::NodeId;
    use super::span::Span;
    use serde::Serialize;

    #[derive(Debug, Serialize)]
    pub struct Module {
        pub id: NodeId,
        /// Fully qualified module name, e.g. `["Stdlib", "Lists"]`.
        pub name: Vec<String>,
        pub items: Vec<Item>,
        pub span: Span,
    }

    #[derive(Debug, Serialize)]
    pub enum Item {
        Import(ImportDecl),
        Shape(ShapeDecl),
        Union(UnionDecl),
        TypeAlias(TypeAliasDecl),
        Val(ValDecl),
        Fn(FnDecl),
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct Ident {
        pub text: String,
        pub span: Span,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
    pub enum ImportBase {
        Relative,
        Absolute,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
    pub struct ImportPath {
        pub base: ImportBase,
        pub parts: Vec<String>,
    }

    impl ImportPath {
        pub fn relative(parts: &[&str]) -> Self {
            ImportPath {
                base: ImportBase::Relative,
                parts: parts.iter().map(|part| part.to_string()).collect(),
            }
        }

        pub fn absolute(parts: &[&str]) -> Self {
            ImportPath {
                base: ImportBase::Absolute,
                parts: parts.iter().map(|part| part.to_string()).collect(),
            }
        }
    }

    #[derive(Debug, Serialize)]
    pub struct ImportDecl {
        pub id: NodeId,
        pub target: Ident,
        pub path: ImportPath,
        pub span: Span,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
    pub enum Variance {
        Invariant,
        Covariant,
        Contravariant,
    }

    #[derive(Debug, Serialize)]
    pub enum StaticParam {
        /// `T`, `+T` or `-T`
        Type {
            id: NodeId,
            name: Ident,
            variance: Variance,
            span: Span,
        },
        /// `!E`
        Effect { id: NodeId, name: Ident, span: Span },
    }

    impl StaticParam {
        pub fn id(&self) -> NodeId {
            match self {
                StaticParam::Type { id, .. } | StaticParam::Effect { id, .. } => *id,
            }
        }
    }

    /// A type-level expression.
    #[derive(Debug, Serialize)]
    pub enum StaticExpr {
        /// `Int`, `T`, `!io`
        Ref { id: NodeId, name: Ident },
        /// `M.Shape`
        Field {
            id: NodeId,
            receiver: Box<StaticExpr>,
            field: Ident,
            span: Span,
        },
        /// `Box[Int]`
        Apply {
            id: NodeId,
            receiver: Box<StaticExpr>,
            args: Vec<StaticExpr>,
            span: Span,
        },
        /// `[T](T, .flag: Bool) !io -> T`
        Fn {
            id: NodeId,
            static_params: Vec<StaticParam>,
            params: Vec<StaticExpr>,
            named_params: Vec<(Ident, StaticExpr)>,
            effects: Vec<StaticExpr>,
            ret: Box<StaticExpr>,
            span: Span,
        },
        /// `#(Int, String)`
        Tuple {
            id: NodeId,
            elems: Vec<StaticExpr>,
            span: Span,
        },
        /// `@Cons` in type position
        Symbol {
            id: NodeId,
            name: String,
            span: Span,
        },
    }

    impl StaticExpr {
        pub fn id(&self) -> NodeId {
            match self {
                StaticExpr::Ref { id, .. }
                | StaticExpr::Field { id, .. }
                | StaticExpr::Apply { id, .. }
                | StaticExpr::Fn { id, .. }
                | StaticExpr::Tuple { id, .. }
                | StaticExpr::Symbol { id, .. } => *id,
            }
        }

        pub fn span(&self) -> Span {
            match self {
                StaticExpr::Ref { name, .. } => name.span,
                StaticExpr::Field { span, .. }
                | StaticExpr::Apply { span, .. }
                | StaticExpr::Fn { span, .. }
                | StaticExpr::Tuple { span, .. }
                | StaticExpr::Symbol { span, .. } => *span,
            }
        }
    }

    #[derive(Debug, Serialize)]
    pub struct ShapeDecl {
        pub id: NodeId,
        pub name: Ident,
        pub static_params: Vec<StaticParam>,
        pub fields: Vec<ShapeFieldDecl>,
        pub span: Span,
    }

    /// A shape field. Fields with a value are constant.
    #[derive(Debug, Serialize)]
    pub struct ShapeFieldDecl {
        pub name: Ident,
        pub ty: StaticExpr,
        pub value: Option<Expr>,
        pub span: Span,
    }

    #[derive(Debug, Serialize)]
    pub struct UnionDecl {
        pub id: NodeId,
        pub name: Ident,
        pub static_params: Vec<StaticParam>,
        pub members: Vec<StaticExpr>,
        pub span: Span,
    }

    #[derive(Debug, Serialize)]
    pub struct TypeAliasDecl {
        pub id: NodeId,
        pub name: Ident,
        pub static_params: Vec<StaticParam>,
        pub ty: StaticExpr,
        pub span: Span,
    }

    #[derive(Debug, Serialize)]
    pub struct ValDecl {
        pub target: Target,
        pub ty: Option<StaticExpr>,
        pub value: Expr,
        pub span: Span,
    }

    /// Left-hand side of a `val`.
    #[derive(Debug, Serialize)]
    pub enum Target {
        /// `val x = ...`
        Var { id: NodeId, name: Ident },
        /// `val #(a, b) = ...`
        Tuple {
            id: NodeId,
            elems: Vec<Target>,
            span: Span,
        },
        /// `val @(.x as a, .y as b) = ...`
        Fields {
            id: NodeId,
            fields: Vec<(Ident, Target)>,
            span: Span,
        },
    }

    impl Target {
        pub fn id(&self) -> NodeId {
            match self {
                Target::Var { id, .. } | Target::Tuple { id, .. } | Target::Fields { id, .. } => {
                    *id
                }
            }
        }

        pub fn span(&self) -> Span {
            match self {
                Target::Var { name, .. } => name.span,
                Target::Tuple { span, .. } | Target::Fields { span, .. } => *span,
            }
        }
    }

    #[derive(Debug, Serialize)]
    pub struct FnDecl {
        pub id: NodeId,
        pub name: Ident,
        pub sig: FnSig,
        pub body: Block,
        pub span: Span,
    }

    #[derive(Debug, Serialize)]
    pub struct FnSig {
        pub static_params: Vec<StaticParam>,
        pub params: Vec<Param>,
        pub named_params: Vec<Param>,
        pub effects: Vec<StaticExpr>,
        pub ret: Option<StaticExpr>,
    }

    #[derive(Debug, Serialize)]
    pub struct Param {
        pub id: NodeId,
        pub name: Ident,
        /// Only function expressions may leave this out.
        pub ty: Option<StaticExpr>,
        pub span: Span,
    }

    #[derive(Debug, Serialize)]
    pub struct Block {
        pub stmts: Vec<Stmt>,
        pub tail: Option<Box<Expr>>,
        pub span: Span,
    }

    #[derive(Debug, Serialize)]
    pub enum Stmt {
        Expr(Expr),
        Val(ValDecl),
        Fn(FnDecl),
    }

    #[derive(Debug, Serialize)]
    pub struct NamedArg {
        pub name: Ident,
        pub value: Expr,
        pub span: Span,
    }

    #[derive(Debug, Serialize)]
    pub struct CondBranch {
        pub cond: Expr,
        pub body: Block,
        pub span: Span,
    }

    #[derive(Debug, Serialize)]
    pub struct WhenBranch {
        pub id: NodeId,
        pub ty: StaticExpr,
        pub body: Block,
        pub span: Span,
    }

    #[derive(Debug, Serialize)]
    pub enum Expr {
        Lit {
            id: NodeId,
            lit: Lit,
            span: Span,
        },
        Var {
            id: NodeId,
            name: Ident,
        },
        Unary {
            id: NodeId,
            op: UnOp,
            expr: Box<Expr>,
            span: Span,
        },
        Binary {
            id: NodeId,
            lhs: Box<Expr>,
            op: BinOp,
            rhs: Box<Expr>,
            span: Span,
        },
        Call {
            id: NodeId,
            callee: Box<Expr>,
            static_args: Vec<StaticExpr>,
            args: Vec<Expr>,
            named_args: Vec<NamedArg>,
            span: Span,
        },
        /// `f ~(x)`: binds some arguments, returns a function of the rest.
        PartialCall {
            id: NodeId,
            callee: Box<Expr>,
            static_args: Vec<StaticExpr>,
            args: Vec<Expr>,
            named_args: Vec<NamedArg>,
            span: Span,
        },
        Field {
            id: NodeId,
            receiver: Box<Expr>,
            field: Ident,
            span: Span,
        },
        Is {
            id: NodeId,
            expr: Box<Expr>,
            ty: StaticExpr,
            span: Span,
        },
        If {
            id: NodeId,
            branches: Vec<CondBranch>,
            else_: Block,
            span: Span,
        },
        When {
            id: NodeId,
            scrutinee: Box<Expr>,
            branches: Vec<WhenBranch>,
            else_: Option<Block>,
            span: Span,
        },
        Tuple {
            id: NodeId,
            elems: Vec<Expr>,
            span: Span,
        },
        Fn {
            id: NodeId,
            sig: FnSig,
            body: Block,
            span: Span,
        },
    }

    impl Expr {
        pub fn id(&self) -> NodeId {
            match self {
                Expr::Lit { id, .. }
                | Expr::Var { id, .. }
                | Expr::Unary { id, .. }
                | Expr::Binary { id, .. }
                | Expr::Call { id, .. }
                | Expr::PartialCall { id, .. }
                | Expr::Field { id, .. }
                | Expr::Is { id, .. }
                | Expr::If { id, .. }
                | Expr::When { id, .. }
                | Expr::Tuple { id, .. }
                | Expr::Fn { id, .. } => *id,
            }
        }

        pub fn span(&self) -> Span {
            match self {
                Expr::Var { name, .. } => name.span,
                Expr::Lit { span, .. }
                | Expr::Unary { span, .. }
                | Expr::Binary { span, .. }
                | Expr::Call { span, .. }
                | Expr::PartialCall { span, .. }
                | Expr::Field { span, .. }
                | Expr::Is { span, .. }
                | Expr::If { span, .. }
                | Expr::When { span, .. }
                | Expr::Tuple { span, .. }
                | Expr::Fn { span, .. } => *span,
            }
        }
    }

    #[derive(Debug, Clone, Serialize)]
    pub enum Lit {
        Unit,
        Bool(bool),
        Int(i64),
        Str(String),
        Char(char),
        /// `@Name`
        Symbol(String),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub enum UnOp {
        Not,
        Neg,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub enum BinOp {
        // logical
        Or,
        And,
        // equality
        Eq,
        Ne,
        // relational
        Lt,
        Le,
        Gt,
        Ge,
        // arithmetic
        Add,
        Sub,
        Mul,
    }

    impl BinOp {
        pub fn symbol(self) -> &'static str {
            match self {
                BinOp::Or => "||",
                BinOp::And => "&&",
                BinOp::Eq => "==",
                BinOp::Ne => "!=",
                BinOp::Lt => "<",
                BinOp::Le => "<=",
                BinOp::Gt => ">",
                BinOp::Ge => ">=",
                BinOp::Add => "+",
                BinOp::Sub => "-",
                BinOp::Mul => "*",
            }
        }
    }
}
