//! Runtime type descriptors.
//!
//! Types compare structurally, with two relaxations: `any` equals every type
//! and `nil` equals every nil-able type. Struct types compare by identity and
//! interfaces are satisfied structurally by any struct carrying the listed
//! methods.

use crate::{
    language::ast::Expr,
    runtime::{
        environment::Scope,
        reference::Reference,
        value::{SliceValue, Value},
    },
};
use std::{
    cell::RefCell,
    fmt,
    rc::Rc,
    sync::atomic::{AtomicU32, Ordering},
};

#[derive(Clone, Debug)]
pub enum Type {
    Number,
    String,
    Bool,
    Nil,
    Error,
    Any,
    Array { size: usize, element: Box<Type> },
    Slice(Box<Type>),
    Map { key: Box<Type>, value: Box<Type> },
    Function(Rc<FunctionType>),
    Native(Rc<NativeType>),
    Pointer(Box<Type>),
    Struct(Rc<StructDefinition>),
    Interface(Rc<InterfaceType>),
    Module,
    /// Result of `typeof` and of type aliases.
    Type,
    /// Values owned by the host, such as the HTTP server and its requests.
    Host(&'static str),
}

#[derive(Clone, Debug)]
pub struct ParamType {
    pub label: Option<String>,
    pub ty: Type,
}

#[derive(Clone, Debug)]
pub struct FunctionType {
    pub params: Vec<ParamType>,
    /// `any` when the declaration carries no return annotation.
    pub ret: Type,
}

#[derive(Clone, Debug)]
pub struct NativeType {
    pub params: Vec<Type>,
    /// Extra arguments are checked against the last parameter type.
    pub variadic: bool,
    pub ret: Type,
}

impl Type {
    pub fn primitive(name: &str) -> Option<Type> {
        let ty = match name {
            "number" => Type::Number,
            "string" => Type::String,
            "bool" => Type::Bool,
            "nil" => Type::Nil,
            "error" => Type::Error,
            "any" => Type::Any,
            _ => return None,
        };
        Some(ty)
    }

    pub fn slice_of(element: Type) -> Type {
        Type::Slice(Box::new(element))
    }

    pub fn map_of(key: Type, value: Type) -> Type {
        Type::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn pointer_to(pointee: Type) -> Type {
        Type::Pointer(Box::new(pointee))
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Type::Any)
    }

    fn is_nilable(&self) -> bool {
        matches!(
            self,
            Type::Nil
                | Type::Error
                | Type::Array { .. }
                | Type::Slice(_)
                | Type::Map { .. }
                | Type::Function(_)
                | Type::Native(_)
                | Type::Pointer(_)
                | Type::Struct(_)
                | Type::Interface(_)
        )
    }

    pub fn equals(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Any, _) | (_, Type::Any) => true,
            (Type::Nil, other) | (other, Type::Nil) => other.is_nilable(),
            (Type::Number, Type::Number)
            | (Type::String, Type::String)
            | (Type::Bool, Type::Bool)
            | (Type::Error, Type::Error)
            | (Type::Module, Type::Module)
            | (Type::Type, Type::Type) => true,
            (
                Type::Array {
                    size: a,
                    element: ea,
                },
                Type::Array {
                    size: b,
                    element: eb,
                },
            ) => a == b && ea.equals(eb),
            (Type::Slice(a), Type::Slice(b)) => a.equals(b),
            (Type::Map { key: ka, value: va }, Type::Map { key: kb, value: vb }) => {
                ka.equals(kb) && va.equals(vb)
            }
            (Type::Pointer(a), Type::Pointer(b)) => a.equals(b),
            (Type::Function(a), Type::Function(b)) => a.equals(b),
            (Type::Native(a), Type::Native(b)) => {
                a.variadic == b.variadic
                    && a.ret.equals(&b.ret)
                    && types_pairwise_equal(&a.params, &b.params)
            }
            (Type::Function(f), Type::Native(n)) | (Type::Native(n), Type::Function(f)) => {
                !n.variadic
                    && f.ret.equals(&n.ret)
                    && f.params.len() == n.params.len()
                    && f.params
                        .iter()
                        .zip(&n.params)
                        .all(|(p, ty)| p.ty.equals(ty))
            }
            (Type::Struct(a), Type::Struct(b)) => a.id == b.id,
            (Type::Struct(def), Type::Interface(iface))
            | (Type::Interface(iface), Type::Struct(def)) => iface.satisfied_by(def),
            (Type::Interface(a), Type::Interface(b)) => Rc::ptr_eq(a, b),
            (Type::Host(a), Type::Host(b)) => a == b,
            _ => false,
        }
    }

    pub fn default_value(&self) -> Value {
        match self {
            Type::Number => Value::Number(0.0),
            Type::String => Value::String(String::new()),
            Type::Bool => Value::Bool(false),
            Type::Slice(element) => Value::Slice(SliceValue::new((**element).clone(), Vec::new())),
            _ => Value::Nil,
        }
    }
}

fn types_pairwise_equal(a: &[Type], b: &[Type]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals(y))
}

impl FunctionType {
    /// Parameter labels do not take part in equality.
    pub fn equals(&self, other: &FunctionType) -> bool {
        self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.ty.equals(&b.ty))
            && self.ret.equals(&other.ret)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Number => write!(f, "number"),
            Type::String => write!(f, "string"),
            Type::Bool => write!(f, "bool"),
            Type::Nil => write!(f, "nil"),
            Type::Error => write!(f, "error"),
            Type::Any => write!(f, "any"),
            Type::Array { size, element } => write!(f, "[{size}]{element}"),
            Type::Slice(element) => write!(f, "[]{element}"),
            Type::Map { key, value } => write!(f, "map[{key}->{value}]"),
            Type::Function(func) => write!(f, "{func}"),
            Type::Native(native) => {
                write!(f, "fn(")?;
                for (i, param) in native.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                if native.variadic {
                    write!(f, "...")?;
                }
                write!(f, ") -> {}", native.ret)
            }
            Type::Pointer(pointee) => write!(f, "*{pointee}"),
            Type::Struct(def) => write!(f, "{}", def.name),
            Type::Interface(iface) => write!(f, "{}", iface.name),
            Type::Module => write!(f, "module"),
            Type::Type => write!(f, "type"),
            Type::Host(name) => write!(f, "{name}"),
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match &param.label {
                Some(label) => write!(f, "{label}: {}", param.ty)?,
                None => write!(f, "{}", param.ty)?,
            }
        }
        write!(f, ")")?;
        if !self.ret.is_any() {
            write!(f, " -> {}", self.ret)?;
        }
        Ok(())
    }
}

static NEXT_STRUCT_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Clone, Debug)]
pub struct Attribute {
    pub name: String,
    pub ty: Type,
    pub is_static: bool,
    /// Evaluated per instance, in the scope the struct was declared in.
    pub default: Option<Rc<Expr>>,
}

/// A struct definition doubles as its own type. It is created as an empty
/// shell when the declaration is hoisted and filled in once the declaration
/// completes, so types that mention each other resolve.
pub struct StructDefinition {
    pub id: u32,
    pub name: String,
    attributes: RefCell<Vec<Attribute>>,
    statics: RefCell<Vec<Rc<Reference>>>,
    scope: RefCell<Option<Scope>>,
}

impl StructDefinition {
    pub fn shell(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            id: NEXT_STRUCT_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            attributes: RefCell::new(Vec::new()),
            statics: RefCell::new(Vec::new()),
            scope: RefCell::new(None),
        })
    }

    pub fn define(&self, attributes: Vec<Attribute>, statics: Vec<Rc<Reference>>, scope: Scope) {
        *self.attributes.borrow_mut() = attributes;
        *self.statics.borrow_mut() = statics;
        *self.scope.borrow_mut() = Some(scope);
    }

    pub fn instance_attributes(&self) -> Vec<Attribute> {
        self.attributes
            .borrow()
            .iter()
            .filter(|attr| !attr.is_static)
            .cloned()
            .collect()
    }

    pub fn attribute(&self, name: &str) -> Option<Attribute> {
        self.attributes
            .borrow()
            .iter()
            .find(|attr| attr.name == name)
            .cloned()
    }

    pub fn static_cell(&self, name: &str) -> Option<Rc<Reference>> {
        self.statics
            .borrow()
            .iter()
            .find(|cell| cell.name() == name)
            .cloned()
    }

    pub fn method_type(&self, name: &str) -> Option<Rc<FunctionType>> {
        match self.attribute(name) {
            Some(Attribute {
                ty: Type::Function(func),
                is_static: true,
                ..
            }) => Some(func),
            _ => None,
        }
    }

    pub fn scope(&self) -> Option<Scope> {
        self.scope.borrow().clone()
    }
}

impl fmt::Debug for StructDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

pub struct InterfaceType {
    pub name: String,
    methods: RefCell<Vec<(String, Rc<FunctionType>)>>,
}

impl InterfaceType {
    pub fn shell(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            methods: RefCell::new(Vec::new()),
        })
    }

    pub fn define(&self, methods: Vec<(String, Rc<FunctionType>)>) {
        *self.methods.borrow_mut() = methods;
    }

    pub fn satisfied_by(&self, def: &StructDefinition) -> bool {
        self.methods.borrow().iter().all(|(name, expected)| {
            def.method_type(name)
                .map(|actual| actual.equals(expected))
                .unwrap_or(false)
        })
    }
}

impl fmt::Debug for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceType")
            .field("name", &self.name)
            .finish()
    }
}
