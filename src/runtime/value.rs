use crate::{
    language::ast::FunctionLiteral,
    runtime::{
        environment::Scope,
        error::{EvalResult, RuntimeError, RuntimeResult},
        interpreter::Interpreter,
        reference::{Pointer, Reference},
        types::{FunctionType, NativeType, StructDefinition, Type},
    },
};
use std::{any::Any, cell::RefCell, collections::HashMap, fmt, rc::Rc};

/// Runtime datum.
///
/// `Clone` is shallow: collections, struct instances and closures share
/// their storage. Binding a value to a new name goes through
/// [`Value::deep_clone`] instead, which gives collections and structs value
/// semantics while keeping pointers and closure scopes shared.
#[derive(Clone, Debug)]
pub enum Value {
    Number(f64),
    String(String),
    Bool(bool),
    Nil,
    Error(String),
    Array(ArrayValue),
    Slice(SliceValue),
    Map(MapValue),
    Function(FunctionValue),
    Native(NativeFunction),
    Pointer(Pointer),
    Struct(StructInstance),
    StructDef(Rc<StructDefinition>),
    Module(Rc<ModuleValue>),
    Type(Type),
    Host(Rc<dyn HostObject>),
}

impl Value {
    pub fn type_of(&self) -> Type {
        match self {
            Value::Number(_) => Type::Number,
            Value::String(_) => Type::String,
            Value::Bool(_) => Type::Bool,
            Value::Nil => Type::Nil,
            Value::Error(_) => Type::Error,
            Value::Array(array) => Type::Array {
                size: array.len(),
                element: Box::new(array.element.clone()),
            },
            Value::Slice(slice) => Type::slice_of(slice.element.clone()),
            Value::Map(map) => Type::map_of(map.key_type.clone(), map.value_type.clone()),
            Value::Function(func) => Type::Function(func.ty.clone()),
            Value::Native(native) => Type::Native(native.ty.clone()),
            Value::Pointer(pointer) => Type::pointer_to(pointer.pointee_type()),
            Value::Struct(instance) => Type::Struct(instance.def.clone()),
            Value::StructDef(_) | Value::Type(_) => Type::Type,
            Value::Module(_) => Type::Module,
            Value::Host(host) => Type::Host(host.type_name()),
        }
    }

    pub fn deep_clone(&self) -> Value {
        match self {
            Value::Array(array) => Value::Array(ArrayValue::new(
                array.element.clone(),
                array.items().iter().map(Value::deep_clone).collect(),
            )),
            Value::Slice(slice) => Value::Slice(SliceValue::new(
                slice.element.clone(),
                slice.items().iter().map(Value::deep_clone).collect(),
            )),
            Value::Map(map) => {
                let copy = MapValue::new(map.key_type.clone(), map.value_type.clone());
                {
                    let mut data = copy.data.borrow_mut();
                    for (key, value) in map.entries() {
                        data.insert(key.deep_clone(), value.deep_clone());
                    }
                }
                Value::Map(copy)
            }
            Value::Struct(instance) => Value::Struct(instance.deep_clone()),
            other => other.clone(),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Truthiness used by `bool(v)`: empty collections, zero, the empty
    /// string and nil are false.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Nil => false,
            Value::Array(array) => array.len() > 0,
            Value::Slice(slice) => slice.len() > 0,
            Value::Map(map) => map.len() > 0,
            _ => true,
        }
    }

    /// `==` semantics: values of different types are never equal.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.element.equals(&b.element) && items_equal(&a.items(), &b.items())
            }
            (Value::Slice(a), Value::Slice(b)) => {
                a.element.equals(&b.element) && items_equal(&a.items(), &b.items())
            }
            (Value::Map(a), Value::Map(b)) => {
                let (ea, eb) = (a.entries(), b.entries());
                ea.len() == eb.len()
                    && ea
                        .iter()
                        .zip(&eb)
                        .all(|((ka, va), (kb, vb))| ka.equals(kb) && va.equals(vb))
            }
            (Value::Pointer(a), Value::Pointer(b)) => a.target.same_as(&b.target),
            (Value::Struct(a), Value::Struct(b)) => {
                a.def.id == b.def.id
                    && a
                        .fields
                        .iter()
                        .zip(b.fields.iter())
                        .all(|(fa, fb)| fa.load().equals(&fb.load()))
            }
            (Value::StructDef(a), Value::StructDef(b)) => a.id == b.id,
            (Value::Function(a), Value::Function(b)) => {
                Rc::ptr_eq(&a.decl, &b.decl) && a.closure.same_as(&b.closure)
            }
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(&a.func, &b.func),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            (Value::Type(a), Value::Type(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }

    /// Whether two collection values are views of the same storage.
    pub fn shares_storage(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(&a.items, &b.items),
            (Value::Slice(a), Value::Slice(b)) => Rc::ptr_eq(&a.data, &b.data),
            (Value::Map(a), Value::Map(b)) => a.shares_storage(b),
            _ => false,
        }
    }

    /// Display projection: strings print raw at the top level.
    pub fn display(&self) -> String {
        let mut out = String::new();
        write_value(&mut out, self, false, 0);
        out
    }

    /// Language-syntax projection: strings are quoted.
    pub fn repr(&self) -> String {
        let mut out = String::new();
        write_value(&mut out, self, true, 0);
        out
    }

    pub fn expect_number(&self, context: &str) -> RuntimeResult<f64> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(expected(context, "number", other)),
        }
    }

    pub fn expect_string(&self, context: &str) -> RuntimeResult<&str> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(expected(context, "string", other)),
        }
    }

    pub fn expect_bool(&self, context: &str) -> RuntimeResult<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(expected(context, "bool", other)),
        }
    }

    /// Integer view of a number used as an index or count.
    pub fn expect_integer(&self, context: &str) -> RuntimeResult<i64> {
        let n = self.expect_number(context)?;
        if n.fract() != 0.0 || !n.is_finite() {
            return Err(RuntimeError::type_mismatch(format!(
                "{context} expects an integer, got {}",
                format_number(n)
            )));
        }
        Ok(n as i64)
    }
}

fn expected(context: &str, what: &str, got: &Value) -> RuntimeError {
    RuntimeError::type_mismatch(format!("{context} expects {what}, got {}", got.type_of()))
}

fn items_equal(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals(y))
}

pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".into()
    } else if n.is_infinite() {
        if n > 0.0 { "+Inf".into() } else { "-Inf".into() }
    } else if n.fract() == 0.0 && n.abs() < 1e16 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

const MAX_DISPLAY_DEPTH: usize = 16;

fn write_value(out: &mut String, value: &Value, quoted: bool, depth: usize) {
    if depth > MAX_DISPLAY_DEPTH {
        out.push_str("...");
        return;
    }
    match value {
        Value::Number(n) => out.push_str(&format_number(*n)),
        Value::String(s) if quoted => out.push_str(&quote(s)),
        Value::String(s) => out.push_str(s),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Nil => out.push_str("nil"),
        Value::Error(message) if quoted => {
            out.push_str("error(");
            out.push_str(&quote(message));
            out.push(')');
        }
        Value::Error(message) => out.push_str(message),
        Value::Array(array) => {
            out.push_str(&format!("[{}]{}", array.len(), array.element));
            write_items(out, &array.items(), depth);
        }
        Value::Slice(slice) => {
            out.push_str(&format!("[]{}", slice.element));
            write_items(out, &slice.items(), depth);
        }
        Value::Map(map) => {
            out.push_str(&format!("map[{}->{}]{{", map.key_type, map.value_type));
            for (i, (key, value)) in map.entries().iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, key, true, depth + 1);
                out.push_str(": ");
                write_value(out, value, true, depth + 1);
            }
            out.push('}');
        }
        Value::Function(func) => out.push_str(&func.ty.to_string()),
        Value::Native(native) => out.push_str(&Type::Native(native.ty.clone()).to_string()),
        Value::Pointer(pointer) => {
            out.push('&');
            match pointer.load() {
                Ok(target) => write_value(out, &target, true, depth + 1),
                Err(_) => out.push_str("?"),
            }
        }
        Value::Struct(instance) => {
            out.push_str(&instance.def.name);
            out.push('{');
            for (i, field) in instance.fields.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(field.name());
                out.push_str(": ");
                write_value(out, &field.load(), true, depth + 1);
            }
            out.push('}');
        }
        Value::StructDef(def) => out.push_str(&def.name),
        Value::Module(module) => out.push_str(&format!("module {}", module.name)),
        Value::Type(ty) => out.push_str(&ty.to_string()),
        Value::Host(host) => out.push_str(&host.describe()),
    }
}

fn write_items(out: &mut String, items: &[Value], depth: usize) {
    out.push('{');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_value(out, item, true, depth + 1);
    }
    out.push('}');
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Resolves a possibly negative index against `len`.
pub fn normalize_index(index: i64, len: usize) -> RuntimeResult<usize> {
    let resolved = if index < 0 { index + len as i64 } else { index };
    if resolved < 0 || resolved >= len as i64 {
        return Err(RuntimeError::IndexOutOfRange { index, len });
    }
    Ok(resolved as usize)
}

fn check_element(element: &Type, value: &Value, what: &str) -> RuntimeResult<()> {
    let actual = value.type_of();
    if element.equals(&actual) {
        Ok(())
    } else {
        Err(RuntimeError::type_mismatch(format!(
            "{what} of type {element} cannot hold {actual}"
        )))
    }
}

#[derive(Clone, Debug)]
pub struct ArrayValue {
    pub element: Type,
    pub items: Rc<RefCell<Vec<Value>>>,
}

impl ArrayValue {
    pub fn new(element: Type, items: Vec<Value>) -> Self {
        Self {
            element,
            items: Rc::new(RefCell::new(items)),
        }
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn items(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }

    pub fn get(&self, index: i64) -> RuntimeResult<Value> {
        let items = self.items.borrow();
        let slot = normalize_index(index, items.len())?;
        Ok(items[slot].clone())
    }

    pub fn set(&self, index: i64, value: Value) -> RuntimeResult<()> {
        check_element(&self.element, &value, "array element")?;
        let mut items = self.items.borrow_mut();
        let slot = normalize_index(index, items.len())?;
        items[slot] = value.deep_clone();
        Ok(())
    }
}

#[derive(Debug)]
pub struct SliceData {
    pub items: Vec<Value>,
    pub cap: usize,
}

#[derive(Clone, Debug)]
pub struct SliceValue {
    pub element: Type,
    pub data: Rc<RefCell<SliceData>>,
}

pub const MIN_SLICE_CAPACITY: usize = 8;

impl SliceValue {
    pub fn new(element: Type, items: Vec<Value>) -> Self {
        let cap = MIN_SLICE_CAPACITY.max(items.len() * 2);
        let mut storage = Vec::with_capacity(cap);
        storage.extend(items);
        Self {
            element,
            data: Rc::new(RefCell::new(SliceData {
                items: storage,
                cap,
            })),
        }
    }

    pub fn len(&self) -> usize {
        self.data.borrow().items.len()
    }

    pub fn cap(&self) -> usize {
        self.data.borrow().cap
    }

    pub fn items(&self) -> Vec<Value> {
        self.data.borrow().items.clone()
    }

    pub fn get(&self, index: i64) -> RuntimeResult<Value> {
        let data = self.data.borrow();
        let slot = normalize_index(index, data.items.len())?;
        Ok(data.items[slot].clone())
    }

    pub fn set(&self, index: i64, value: Value) -> RuntimeResult<()> {
        check_element(&self.element, &value, "slice element")?;
        let mut data = self.data.borrow_mut();
        let slot = normalize_index(index, data.items.len())?;
        data.items[slot] = value.deep_clone();
        Ok(())
    }

    /// Appends in place, doubling the capacity when the slice is full.
    pub fn append(&self, value: Value) -> RuntimeResult<()> {
        check_element(&self.element, &value, "slice")?;
        let mut data = self.data.borrow_mut();
        if data.items.len() == data.cap {
            data.cap *= 2;
            let additional = data.cap - data.items.len();
            data.items.reserve_exact(additional);
        }
        data.items.push(value.deep_clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MapData {
    entries: Vec<(Value, Value)>,
    index: HashMap<String, usize>,
}

impl MapData {
    fn position(&self, key: &Value) -> Option<usize> {
        self.index.get(&key.repr()).copied()
    }

    fn insert(&mut self, key: Value, value: Value) {
        match self.position(&key) {
            Some(pos) => self.entries[pos].1 = value,
            None => {
                self.index.insert(key.repr(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    fn remove(&mut self, key: &Value) -> bool {
        let Some(pos) = self.position(key) else {
            return false;
        };
        self.entries.remove(pos);
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, (k, _))| (k.repr(), i))
            .collect();
        true
    }
}

/// Insertion-ordered map. Keys are matched by their language-syntax
/// projection, so `1` and `"1"` stay distinct.
#[derive(Clone, Debug)]
pub struct MapValue {
    pub key_type: Type,
    pub value_type: Type,
    data: Rc<RefCell<MapData>>,
}

impl MapValue {
    pub fn new(key_type: Type, value_type: Type) -> Self {
        Self {
            key_type,
            value_type,
            data: Rc::new(RefCell::new(MapData::default())),
        }
    }

    pub fn len(&self) -> usize {
        self.data.borrow().entries.len()
    }

    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.data.borrow().entries.clone()
    }

    pub fn keys(&self) -> Vec<Value> {
        self.data
            .borrow()
            .entries
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.data
            .borrow()
            .entries
            .iter()
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn exists(&self, key: &Value) -> bool {
        self.data.borrow().position(key).is_some()
    }

    pub fn get(&self, key: &Value) -> RuntimeResult<Value> {
        let data = self.data.borrow();
        match data.position(key) {
            Some(pos) => Ok(data.entries[pos].1.clone()),
            None => Err(RuntimeError::MissingKey { key: key.repr() }),
        }
    }

    pub fn set(&self, key: Value, value: Value) -> RuntimeResult<()> {
        check_element(&self.key_type, &key, "map key")?;
        check_element(&self.value_type, &value, "map value")?;
        self.data
            .borrow_mut()
            .insert(key.deep_clone(), value.deep_clone());
        Ok(())
    }

    pub fn pop(&self, key: &Value) -> bool {
        self.data.borrow_mut().remove(key)
    }

    /// Keys present in both maps, carrying this map's values.
    pub fn intersect(&self, other: &MapValue) -> MapValue {
        let result = MapValue::new(self.key_type.clone(), self.value_type.clone());
        {
            let mut data = result.data.borrow_mut();
            for (key, value) in self.entries() {
                if other.exists(&key) {
                    data.insert(key.deep_clone(), value.deep_clone());
                }
            }
        }
        result
    }

    /// Every key of both maps; this map wins on conflicts.
    pub fn union(&self, other: &MapValue) -> MapValue {
        let result = MapValue::new(self.key_type.clone(), self.value_type.clone());
        {
            let mut data = result.data.borrow_mut();
            for (key, value) in self.entries() {
                data.insert(key.deep_clone(), value.deep_clone());
            }
            for (key, value) in other.entries() {
                if data.position(&key).is_none() {
                    data.insert(key.deep_clone(), value.deep_clone());
                }
            }
        }
        result
    }

    pub fn shares_storage(&self, other: &MapValue) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

#[derive(Clone)]
pub struct FunctionValue {
    pub name: String,
    pub decl: Rc<FunctionLiteral>,
    pub ty: Rc<FunctionType>,
    pub closure: Scope,
    /// Set when the function was read off a struct instance.
    pub receiver: Option<StructInstance>,
}

impl FunctionValue {
    pub fn bind(&self, receiver: StructInstance) -> FunctionValue {
        FunctionValue {
            receiver: Some(receiver),
            ..self.clone()
        }
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionValue")
            .field("name", &self.name)
            .field("ty", &self.ty.to_string())
            .finish()
    }
}

pub type NativeFn = Rc<dyn Fn(&mut Interpreter, Vec<Value>) -> EvalResult>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub ty: Rc<NativeType>,
    pub func: NativeFn,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<String>,
        params: Vec<Type>,
        ret: Type,
        func: impl Fn(&mut Interpreter, Vec<Value>) -> EvalResult + 'static,
    ) -> Value {
        Value::Native(NativeFunction {
            name: name.into(),
            ty: Rc::new(NativeType {
                params,
                variadic: false,
                ret,
            }),
            func: Rc::new(func),
        })
    }

    pub fn variadic(
        name: impl Into<String>,
        params: Vec<Type>,
        ret: Type,
        func: impl Fn(&mut Interpreter, Vec<Value>) -> EvalResult + 'static,
    ) -> Value {
        Value::Native(NativeFunction {
            name: name.into(),
            ty: Rc::new(NativeType {
                params,
                variadic: true,
                ret,
            }),
            func: Rc::new(func),
        })
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct StructInstance {
    pub def: Rc<StructDefinition>,
    pub fields: Rc<Vec<Rc<Reference>>>,
}

impl StructInstance {
    pub fn field(&self, name: &str) -> Option<Rc<Reference>> {
        self.fields.iter().find(|cell| cell.name() == name).cloned()
    }

    /// Fresh cells holding copies; static attributes stay on the definition.
    pub fn deep_clone(&self) -> StructInstance {
        let fields = self
            .fields
            .iter()
            .map(|cell| Reference::variable(cell.name(), cell.ty(), cell.load().deep_clone(), false))
            .collect();
        StructInstance {
            def: self.def.clone(),
            fields: Rc::new(fields),
        }
    }
}

#[derive(Debug)]
pub struct ModuleValue {
    pub name: String,
    pub exports: Vec<(String, Value)>,
}

impl ModuleValue {
    pub fn new(name: impl Into<String>, exports: Vec<(String, Value)>) -> Self {
        Self {
            name: name.into(),
            exports,
        }
    }

    pub fn get(&self, name: &str) -> RuntimeResult<Value> {
        self.exports
            .iter()
            .find(|(export, _)| export == name)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| RuntimeError::UnknownExport {
                module: self.name.clone(),
                name: name.to_string(),
            })
    }
}

/// Objects owned by native modules, such as an HTTP server.
pub trait HostObject: fmt::Debug {
    fn type_name(&self) -> &'static str;
    fn describe(&self) -> String {
        format!("<{}>", self.type_name())
    }
    /// Reads a field or method. `this` is the shared handle of `self`, so
    /// chainable methods can hand it back.
    fn member(&self, this: &Rc<dyn HostObject>, name: &str) -> RuntimeResult<Value>;
    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(values: &[f64]) -> Vec<Value> {
        values.iter().map(|n| Value::Number(*n)).collect()
    }

    #[test]
    fn number_display_drops_integral_fraction() {
        assert_eq!(format_number(7.0), "7");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[test]
    fn slice_growth_doubles_capacity() {
        let slice = SliceValue::new(Type::Number, numbers(&[1.0, 2.0, 3.0]));
        assert_eq!(slice.cap(), 8);
        for n in 0..6 {
            slice.append(Value::Number(n as f64)).expect("append");
        }
        assert_eq!(slice.len(), 9);
        assert_eq!(slice.cap(), 16);

        let big = SliceValue::new(Type::Number, numbers(&[0.0; 10]));
        assert_eq!(big.cap(), 20);
    }

    #[test]
    fn slice_rejects_wrong_element_type() {
        let slice = SliceValue::new(Type::Number, Vec::new());
        assert!(matches!(
            slice.append(Value::String("x".into())),
            Err(RuntimeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn negative_indices_wrap() {
        let array = ArrayValue::new(Type::Number, numbers(&[1.0, 2.0, 3.0]));
        assert!(matches!(array.get(-1), Ok(Value::Number(n)) if n == 3.0));
        assert!(matches!(
            array.get(3),
            Err(RuntimeError::IndexOutOfRange { index: 3, len: 3 })
        ));
        assert!(array.get(-4).is_err());
    }

    #[test]
    fn map_keeps_insertion_order_and_reindexes_on_pop() {
        let map = MapValue::new(Type::String, Type::Number);
        for (k, v) in [("b", 1.0), ("a", 2.0), ("c", 3.0)] {
            map.set(Value::String(k.into()), Value::Number(v))
                .expect("set");
        }
        map.set(Value::String("b".into()), Value::Number(9.0))
            .expect("update");
        assert!(map.pop(&Value::String("a".into())));
        assert!(!map.pop(&Value::String("a".into())));
        assert_eq!(
            Value::Map(map.clone()).repr(),
            "map[string->number]{\"b\": 9, \"c\": 3}"
        );
        assert!(matches!(map.get(&Value::String("c".into())), Ok(Value::Number(n)) if n == 3.0));
    }

    #[test]
    fn deep_clone_detaches_collections() {
        let original = Value::Slice(SliceValue::new(Type::Number, numbers(&[1.0])));
        let copy = original.deep_clone();
        if let Value::Slice(slice) = &copy {
            slice.append(Value::Number(2.0)).expect("append");
        }
        assert_eq!(original.display(), "[]number{1}");
        assert_eq!(copy.display(), "[]number{1, 2}");
    }

    #[test]
    fn equality_requires_same_type() {
        assert!(Value::Nil.equals(&Value::Nil));
        assert!(!Value::Number(1.0).equals(&Value::String("1".into())));
        assert!(Value::String("a".into()).equals(&Value::String("a".into())));
    }

    #[test]
    fn strings_quote_inside_collections() {
        let array = Value::Array(ArrayValue::new(
            Type::String,
            vec![Value::String("a\"b".into())],
        ));
        assert_eq!(array.display(), "[1]string{\"a\\\"b\"}");
        assert_eq!(Value::String("raw".into()).display(), "raw");
        assert_eq!(Value::String("raw".into()).repr(), "\"raw\"");
    }
}
