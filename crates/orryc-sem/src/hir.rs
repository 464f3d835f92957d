//! High-level IR: the typed tree the checker produces.
//!
//! Every node here corresponds to one of the surface declaration, statement,
//! or expression kinds the checker actually reasons about. There is no
//! trait/impl/generic-parameter machinery - Orrery has no traits, and its
//! structs and enums are not parameterized, so a `TCon`'s argument list
//! (see [`crate::types::Type`]) is populated from a constructor's actual
//! arguments rather than from declared generic parameters.

use crate::types::Type;
use orryc_util::{DefId, Symbol};

/// A top-level declaration.
#[derive(Debug, Clone)]
pub enum Item {
    Function(FnItem),
    Struct(StructItem),
    Enum(EnumItem),
}

#[derive(Debug, Clone)]
pub struct FnItem {
    pub def_id: DefId,
    pub name: Symbol,
    pub params: Vec<Param>,
    pub ret_type: Type,
    pub body: Body,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub pat: Pattern,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct Body {
    pub params: Vec<Pattern>,
    pub value: Expr,
}

#[derive(Debug, Clone)]
pub struct StructItem {
    pub def_id: DefId,
    pub name: Symbol,
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: Symbol,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct EnumItem {
    pub def_id: DefId,
    pub name: Symbol,
    pub variants: Vec<VariantDef>,
}

#[derive(Debug, Clone)]
pub struct VariantDef {
    pub def_id: DefId,
    pub name: Symbol,
    pub data: VariantData,
}

#[derive(Debug, Clone)]
pub enum VariantData {
    Unit,
    Tuple(Vec<Type>),
    Struct(Vec<FieldDef>),
}

/// A typed expression. Every case carries its own inferred `ty`, or derives
/// one through [`Expr::ty`] for the handful of cases (`Return`) whose type
/// is always the unit tuple regardless of what they contain.
#[derive(Debug, Clone)]
pub enum Expr {
    Literal { lit: Literal, ty: Type },
    Var { def_id: DefId, ty: Type },
    Binary { op: BinOp, left: Box<Expr>, right: Box<Expr>, ty: Type },
    Unary { op: UnOp, expr: Box<Expr>, ty: Type },
    /// A call. When `func` resolves to a struct or tuple-variant
    /// constructor, `ty` is the `TCon` built directly from the arguments'
    /// inferred types, rather than a unification result - see
    /// `analysis::SemanticAnalyzer::analyze_call`.
    Call { func: Box<Expr>, args: Vec<Expr>, ty: Type },
    Block { stmts: Vec<Stmt>, expr: Option<Box<Expr>>, ty: Type },
    If { cond: Box<Expr>, then_expr: Box<Expr>, else_expr: Option<Box<Expr>>, ty: Type },
    Match { scrutinee: Box<Expr>, arms: Vec<Arm>, ty: Type },
    Tuple { elems: Vec<Expr>, ty: Type },
    Return(Option<Box<Expr>>),
}

impl Expr {
    pub fn ty(&self) -> Type {
        match self {
            Expr::Literal { ty, .. }
            | Expr::Var { ty, .. }
            | Expr::Binary { ty, .. }
            | Expr::Unary { ty, .. }
            | Expr::Call { ty, .. }
            | Expr::Block { ty, .. }
            | Expr::If { ty, .. }
            | Expr::Match { ty, .. }
            | Expr::Tuple { ty, .. } => ty.clone(),
            Expr::Return(_) => Type::TTuple(Vec::new()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(Symbol),
    Bool(bool),
    Char(char),
    Unit,
}

#[derive(Debug, Clone, Copy)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Let { pat: Pattern, ty: Type, init: Option<Expr> },
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Wildcard,
    Binding { name: Symbol, ty: Type, mutability: bool },
    Path { def_id: DefId },
    Struct { def_id: DefId, fields: Vec<FieldPattern> },
    Tuple { pats: Vec<Pattern> },
    Or(Vec<Pattern>),
}

#[derive(Debug, Clone)]
pub struct FieldPattern {
    pub field: DefId,
    pub pat: Pattern,
}

#[derive(Debug, Clone)]
pub struct Arm {
    pub pat: Pattern,
    pub guard: Option<Expr>,
    pub body: Expr,
}

/// Label ID for loops. Loops are not part of the checked surface language;
/// this exists only because `ScopeTree`'s `RibKind::Loop` carries one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelId(pub u32);
