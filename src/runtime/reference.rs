use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    types::{StructDefinition, Type},
    value::{FunctionValue, MapValue, Value},
};
use std::{cell::RefCell, fmt, rc::Rc};

/// A named storage cell.
pub enum Reference {
    Variable {
        name: String,
        constant: bool,
        ty: Type,
        cell: RefCell<Value>,
    },
    /// Rebinding keeps the function type fixed.
    Function { name: String, cell: RefCell<Value> },
    /// Struct definitions are bound by name and never reassigned.
    Struct(Rc<StructDefinition>),
}

impl Reference {
    pub fn variable(name: impl Into<String>, ty: Type, value: Value, constant: bool) -> Rc<Self> {
        Rc::new(Reference::Variable {
            name: name.into(),
            constant,
            ty,
            cell: RefCell::new(value),
        })
    }

    pub fn function(name: impl Into<String>, function: FunctionValue) -> Rc<Self> {
        Rc::new(Reference::Function {
            name: name.into(),
            cell: RefCell::new(Value::Function(function)),
        })
    }

    pub fn structure(def: Rc<StructDefinition>) -> Rc<Self> {
        Rc::new(Reference::Struct(def))
    }

    /// Unnamed cell holding a temporary, so `&call()` has something to point at.
    pub fn temporary(value: Value) -> Rc<Self> {
        let ty = value.type_of();
        Self::variable("", ty, value, false)
    }

    pub fn name(&self) -> &str {
        match self {
            Reference::Variable { name, .. } | Reference::Function { name, .. } => name,
            Reference::Struct(def) => &def.name,
        }
    }

    pub fn ty(&self) -> Type {
        match self {
            Reference::Variable { ty, .. } => ty.clone(),
            Reference::Function { cell, .. } => cell.borrow().type_of(),
            Reference::Struct(_) => Type::Type,
        }
    }

    pub fn load(&self) -> Value {
        match self {
            Reference::Variable { cell, .. } | Reference::Function { cell, .. } => {
                cell.borrow().clone()
            }
            Reference::Struct(def) => Value::StructDef(def.clone()),
        }
    }

    pub fn store(&self, value: Value) -> RuntimeResult<()> {
        match self {
            Reference::Variable {
                name,
                constant,
                ty,
                cell,
            } => {
                if *constant {
                    return Err(RuntimeError::ConstantReassignment { name: name.clone() });
                }
                let actual = value.type_of();
                if !ty.equals(&actual) {
                    return Err(RuntimeError::type_mismatch(format!(
                        "cannot assign {actual} to `{name}` of type {ty}"
                    )));
                }
                *cell.borrow_mut() = value;
                Ok(())
            }
            Reference::Function { name, cell } => {
                let expected = cell.borrow().type_of();
                let actual = value.type_of();
                if !matches!(value, Value::Function(_) | Value::Native(_))
                    || !expected.equals(&actual)
                {
                    return Err(RuntimeError::type_mismatch(format!(
                        "cannot assign {actual} to function `{name}` of type {expected}"
                    )));
                }
                *cell.borrow_mut() = value;
                Ok(())
            }
            Reference::Struct(def) => Err(RuntimeError::StructWrite {
                name: def.name.clone(),
            }),
        }
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("name", &self.name())
            .field("ty", &self.ty().to_string())
            .finish()
    }
}

/// Something that can be read and written: a named cell, a collection slot
/// or a map entry. Pointers and assignment targets are both places.
#[derive(Clone, Debug)]
pub enum Place {
    Cell(Rc<Reference>),
    Element { owner: Value, index: usize },
    Entry { map: MapValue, key: Value },
}

impl Place {
    pub fn load(&self) -> RuntimeResult<Value> {
        match self {
            Place::Cell(reference) => Ok(reference.load()),
            Place::Element { owner, index } => match owner {
                Value::Array(array) => array.get(*index as i64),
                Value::Slice(slice) => slice.get(*index as i64),
                other => Err(RuntimeError::type_mismatch(format!(
                    "cannot index {}",
                    other.type_of()
                ))),
            },
            Place::Entry { map, key } => map.get(key),
        }
    }

    pub fn store(&self, value: Value) -> RuntimeResult<()> {
        match self {
            Place::Cell(reference) => reference.store(value),
            Place::Element { owner, index } => match owner {
                Value::Array(array) => array.set(*index as i64, value),
                Value::Slice(slice) => slice.set(*index as i64, value),
                other => Err(RuntimeError::type_mismatch(format!(
                    "cannot index {}",
                    other.type_of()
                ))),
            },
            Place::Entry { map, key } => map.set(key.clone(), value),
        }
    }

    pub fn ty(&self) -> Type {
        match self {
            Place::Cell(reference) => reference.ty(),
            Place::Element { owner, .. } => match owner {
                Value::Array(array) => array.element.clone(),
                Value::Slice(slice) => slice.element.clone(),
                _ => Type::Any,
            },
            Place::Entry { map, .. } => map.value_type.clone(),
        }
    }

    pub fn same_as(&self, other: &Place) -> bool {
        match (self, other) {
            (Place::Cell(a), Place::Cell(b)) => Rc::ptr_eq(a, b),
            (
                Place::Element {
                    owner: a,
                    index: ia,
                },
                Place::Element {
                    owner: b,
                    index: ib,
                },
            ) => ia == ib && a.shares_storage(b),
            (Place::Entry { map: a, key: ka }, Place::Entry { map: b, key: kb }) => {
                a.shares_storage(b) && ka.repr() == kb.repr()
            }
            _ => false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Pointer {
    pub target: Rc<Place>,
}

impl Pointer {
    pub fn new(target: Place) -> Self {
        Self {
            target: Rc::new(target),
        }
    }

    pub fn to_cell(reference: Rc<Reference>) -> Self {
        Self::new(Place::Cell(reference))
    }

    pub fn load(&self) -> RuntimeResult<Value> {
        self.target.load()
    }

    pub fn store(&self, value: Value) -> RuntimeResult<()> {
        self.target.store(value)
    }

    pub fn pointee_type(&self) -> Type {
        self.target.ty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_store_checks_type_and_constness() {
        let var = Reference::variable("x", Type::Number, Value::Number(1.0), false);
        var.store(Value::Number(2.0)).expect("store number");
        assert!(matches!(var.load(), Value::Number(n) if n == 2.0));
        assert!(matches!(
            var.store(Value::String("no".into())),
            Err(RuntimeError::TypeMismatch { .. })
        ));

        let constant = Reference::variable("k", Type::Number, Value::Number(1.0), true);
        assert!(matches!(
            constant.store(Value::Number(3.0)),
            Err(RuntimeError::ConstantReassignment { .. })
        ));
    }

    #[test]
    fn any_typed_variable_accepts_everything() {
        let var = Reference::variable("v", Type::Any, Value::Nil, false);
        var.store(Value::String("s".into())).expect("string");
        var.store(Value::Bool(true)).expect("bool");
        assert!(matches!(var.load(), Value::Bool(true)));
    }

    #[test]
    fn pointers_alias_their_cell() {
        let var = Reference::variable("a", Type::Number, Value::Number(10.0), false);
        let ptr = Pointer::to_cell(var.clone());
        ptr.store(Value::Number(11.0)).expect("store through pointer");
        assert!(matches!(var.load(), Value::Number(n) if n == 11.0));
        assert!(matches!(ptr.pointee_type(), Type::Number));
    }

    #[test]
    fn pointers_into_collection_slots() {
        use crate::runtime::value::SliceValue;

        let items = Value::Slice(SliceValue::new(
            Type::Number,
            vec![Value::Number(1.0), Value::Number(2.0)],
        ));
        let ptr = Pointer::new(Place::Element {
            owner: items.clone(),
            index: 1,
        });
        let nested = Value::Pointer(Pointer::new(Place::Element {
            owner: Value::Pointer(ptr.clone()),
            index: 0,
        }));
        ptr.store(Value::Number(20.0)).expect("store through element pointer");
        assert_eq!(items.display(), "[]number{1, 20}");
        assert!(Value::Pointer(ptr.clone()).equals(&Value::Pointer(ptr)));
        assert!(matches!(nested, Value::Pointer(_)));
    }

    #[test]
    fn struct_references_reject_writes() {
        let def = StructDefinition::shell("Point");
        let reference = Reference::structure(def);
        assert!(matches!(
            reference.store(Value::Nil),
            Err(RuntimeError::StructWrite { .. })
        ));
    }
}
