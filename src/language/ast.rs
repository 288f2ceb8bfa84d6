//! Syntax tree consumed by the evaluator.
//!
//! The tree is immutable once parsed. Function bodies and parameter lists are
//! held behind `Rc` so that function values created at runtime share them
//! instead of copying the subtree.

use crate::language::span::Span;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum Statement {
    Expr(ExprStmt),
    Let(VarDecl),
    MultiLet(MultiVarDecl),
    Assign(AssignStmt),
    For(ForStmt),
    ForIn(ForInStmt),
    Break(Span),
    Continue(Span),
    Return(ReturnStmt),
    Throw(ThrowStmt),
    Function(FunctionDecl),
    Struct(StructDecl),
    Interface(InterfaceDecl),
    TypeAlias(TypeAliasDecl),
    Import(ImportDecl),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Expr(stmt) => stmt.span,
            Statement::Let(decl) => decl.span,
            Statement::MultiLet(decl) => decl.span,
            Statement::Assign(stmt) => stmt.span,
            Statement::For(stmt) => stmt.span,
            Statement::ForIn(stmt) => stmt.span,
            Statement::Break(span) | Statement::Continue(span) => *span,
            Statement::Return(stmt) => stmt.span,
            Statement::Throw(stmt) => stmt.span,
            Statement::Function(decl) => decl.span,
            Statement::Struct(decl) => decl.span,
            Statement::Interface(decl) => decl.span,
            Statement::TypeAlias(decl) => decl.span,
            Statement::Import(decl) => decl.span,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct VarDecl {
    pub name: Identifier,
    pub ty: Option<TypeAnnotation>,
    pub value: Option<Expr>,
    pub constant: bool,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct MultiVarDecl {
    pub declarations: Vec<VarDecl>,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    NilCoalesce,
    Increment,
    Decrement,
}

impl AssignOp {
    /// Binary operator applied by a compound assignment.
    pub fn binary(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign | AssignOp::NilCoalesce => None,
            AssignOp::Add | AssignOp::Increment => Some(BinaryOp::Add),
            AssignOp::Sub | AssignOp::Decrement => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
            AssignOp::Rem => Some(BinaryOp::Rem),
            AssignOp::BitAnd => Some(BinaryOp::BitAnd),
            AssignOp::BitOr => Some(BinaryOp::BitOr),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AssignStmt {
    pub target: Expr,
    pub op: AssignOp,
    /// Absent for `++` and `--`.
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct ForStmt {
    pub init: Option<Box<Statement>>,
    pub condition: Option<Expr>,
    pub post: Vec<Statement>,
    pub body: Block,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct ForInStmt {
    pub index: Option<Identifier>,
    pub binding: Identifier,
    pub iterable: Expr,
    pub body: Block,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct ThrowStmt {
    pub value: Expr,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct Param {
    pub name: Identifier,
    pub ty: TypeAnnotation,
    pub default: Option<Expr>,
    pub span: Span,
}

/// Parameters, return annotation and body shared by declarations, function
/// expressions and struct methods.
#[derive(Debug)]
pub struct FunctionLiteral {
    pub params: Vec<Param>,
    pub return_type: Option<TypeAnnotation>,
    pub body: Block,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct FunctionDecl {
    pub name: Identifier,
    pub function: Rc<FunctionLiteral>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct StructDecl {
    pub name: Identifier,
    pub members: Vec<StructMember>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum StructMember {
    Attribute(AttributeDecl),
    Method(FunctionDecl),
}

#[derive(Clone, Debug)]
pub struct AttributeDecl {
    pub name: Identifier,
    pub ty: TypeAnnotation,
    pub default: Option<Rc<Expr>>,
    pub is_static: bool,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct InterfaceDecl {
    pub name: Identifier,
    pub methods: Vec<InterfaceMethod>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct InterfaceMethod {
    pub name: Identifier,
    pub params: Vec<TypeParam>,
    pub return_type: Option<TypeExpr>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct TypeAliasDecl {
    pub name: Identifier,
    pub ty: TypeAnnotation,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ImportSource {
    /// `import math`: a standard module, or `<name>.hm` on the search path.
    Name(String),
    /// `import "lib/util.hm"`: a file relative to the importing file.
    Path(String),
}

#[derive(Clone, Debug)]
pub struct ImportDecl {
    pub source: ImportSource,
    pub alias: Option<Identifier>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct TypeAnnotation {
    pub ty: TypeExpr,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct TypeParam {
    pub label: Option<String>,
    pub ty: TypeExpr,
}

#[derive(Clone, Debug)]
pub enum TypeExpr {
    /// Primitive names and user-defined symbols alike.
    Named(String, Span),
    Array {
        size: Box<Expr>,
        element: Box<TypeExpr>,
    },
    Slice(Box<TypeExpr>),
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    Pointer(Box<TypeExpr>),
    Function {
        params: Vec<TypeParam>,
        ret: Option<Box<TypeExpr>>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    Nil,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrefixOp {
    Not,
    Neg,
    Plus,
    TypeOf,
    AddressOf,
    Deref,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    BitAnd,
    BitOr,
    NilCoalesce,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::NilCoalesce => "??",
        }
    }
}

#[derive(Clone, Debug)]
pub struct IfExpr {
    pub condition: Expr,
    pub then_branch: Block,
    pub else_branch: Option<ElseBranch>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum ElseBranch {
    Block(Block),
    If(Box<IfExpr>),
}

#[derive(Clone, Debug)]
pub struct SwitchExpr {
    pub discriminant: Expr,
    pub cases: Vec<SwitchCase>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct SwitchCase {
    /// Empty for the `default` case.
    pub patterns: Vec<Expr>,
    pub is_default: bool,
    pub body: Block,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct TryExpr {
    pub body: Block,
    pub binding: Option<Identifier>,
    pub handler: Block,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct StructLiteralField {
    pub name: Identifier,
    pub value: Expr,
}

#[derive(Clone, Debug)]
pub enum Expr {
    Literal(Literal, Span),
    Identifier(Identifier),
    Prefix {
        op: PrefixOp,
        expr: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Ternary {
        condition: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
        span: Span,
    },
    Block(Box<Block>),
    If(Box<IfExpr>),
    Switch(Box<SwitchExpr>),
    Try(Box<TryExpr>),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    Function(Rc<FunctionLiteral>),
    ArrayLiteral {
        size: Box<Expr>,
        element: TypeAnnotation,
        values: Vec<Expr>,
        span: Span,
    },
    SliceLiteral {
        element: TypeAnnotation,
        values: Vec<Expr>,
        span: Span,
    },
    MapLiteral {
        key: TypeAnnotation,
        value: TypeAnnotation,
        entries: Vec<(Expr, Expr)>,
        span: Span,
    },
    Index {
        owner: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    Member {
        owner: Box<Expr>,
        name: Identifier,
        span: Span,
    },
    Range {
        start: Box<Expr>,
        end: Box<Expr>,
        step: Option<Box<Expr>>,
        span: Span,
    },
    StructLiteral {
        name: Identifier,
        fields: Vec<StructLiteralField>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(_, span) => *span,
            Expr::Identifier(ident) => ident.span,
            Expr::Prefix { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Ternary { span, .. }
            | Expr::Call { span, .. }
            | Expr::ArrayLiteral { span, .. }
            | Expr::SliceLiteral { span, .. }
            | Expr::MapLiteral { span, .. }
            | Expr::Index { span, .. }
            | Expr::Member { span, .. }
            | Expr::Range { span, .. }
            | Expr::StructLiteral { span, .. } => *span,
            Expr::Block(block) => block.span,
            Expr::If(expr) => expr.span,
            Expr::Switch(expr) => expr.span,
            Expr::Try(expr) => expr.span,
            Expr::Function(function) => function.span,
        }
    }
}
