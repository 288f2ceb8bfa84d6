//! Method tables of the built-in collection types.
//!
//! `value.name` on a string, array, slice, map or error yields a native
//! function closed over that value. Collections share storage under `Clone`,
//! so mutating methods act on the collection the receiver was read from.

use crate::runtime::{
    error::{EvalResult, RuntimeError, RuntimeResult},
    interpreter::Interpreter,
    types::Type,
    value::{normalize_index, ArrayValue, MapValue, NativeFunction, SliceValue, Value},
};

pub fn lookup(owner: &Value, name: &str) -> RuntimeResult<Value> {
    let method = match owner {
        Value::String(text) => string_method(text, name),
        Value::Array(array) => array_method(array, name),
        Value::Slice(slice) => slice_method(slice, name),
        Value::Map(map) => map_method(map, name),
        Value::Error(message) => error_method(message, name),
        Value::Nil => return Err(RuntimeError::NilDereference),
        _ => None,
    };
    method.ok_or_else(|| RuntimeError::UnknownMethod {
        owner: owner.type_of().to_string(),
        name: name.to_string(),
    })
}

fn string_method(text: &str, name: &str) -> Option<Value> {
    let text = text.to_string();
    let method = match name {
        "len" => NativeFunction::new(name, vec![], Type::Number, move |_, _| {
            Ok(Value::Number(text.chars().count() as f64))
        }),
        "index" => NativeFunction::new(name, vec![Type::String], Type::Number, move |_, args| {
            let needle = args[0].expect_string("index")?;
            let found = text
                .find(needle)
                .map(|byte| text[..byte].chars().count() as f64)
                .unwrap_or(-1.0);
            Ok(Value::Number(found))
        }),
        "contains" => NativeFunction::new(name, vec![Type::String], Type::Bool, move |_, args| {
            Ok(Value::Bool(text.contains(args[0].expect_string("contains")?)))
        }),
        "substr" => NativeFunction::new(
            name,
            vec![Type::Number, Type::Number],
            Type::String,
            move |_, args| {
                let chars: Vec<char> = text.chars().collect();
                let (start, end) = bounds(&args, chars.len(), "substr")?;
                Ok(Value::String(chars[start..end].iter().collect()))
            },
        ),
        "upper" => NativeFunction::new(name, vec![], Type::String, move |_, _| {
            Ok(Value::String(text.to_uppercase()))
        }),
        "lower" => NativeFunction::new(name, vec![], Type::String, move |_, _| {
            Ok(Value::String(text.to_lowercase()))
        }),
        "trim" => NativeFunction::new(name, vec![], Type::String, move |_, _| {
            Ok(Value::String(text.trim().to_string()))
        }),
        "split" => NativeFunction::new(
            name,
            vec![Type::String],
            Type::slice_of(Type::String),
            move |_, args| {
                let separator = args[0].expect_string("split")?;
                let parts: Vec<Value> = if separator.is_empty() {
                    text.chars().map(|ch| Value::String(ch.to_string())).collect()
                } else {
                    text.split(separator)
                        .map(|part| Value::String(part.to_string()))
                        .collect()
                };
                Ok(Value::Slice(SliceValue::new(Type::String, parts)))
            },
        ),
        "url_encode" => NativeFunction::new(name, vec![], Type::String, move |_, _| {
            Ok(Value::String(url_encode(&text)))
        }),
        "url_decode" => NativeFunction::new(name, vec![], Type::String, move |_, _| {
            Ok(Value::String(url_decode(&text)))
        }),
        _ => return None,
    };
    Some(method)
}

fn array_method(array: &ArrayValue, name: &str) -> Option<Value> {
    let element = array.element.clone();
    let array = array.clone();
    let method = match name {
        "len" => NativeFunction::new(name, vec![], Type::Number, move |_, _| {
            Ok(Value::Number(array.len() as f64))
        }),
        "get" => NativeFunction::new(name, vec![Type::Number], element, move |_, args| {
            Ok(array.get(args[0].expect_integer("get")?)?)
        }),
        "set" => NativeFunction::new(name, vec![Type::Number, element], Type::Nil, move |_, mut args| {
            let value = args.pop().unwrap_or(Value::Nil);
            array.set(args[0].expect_integer("set")?, value)?;
            Ok(Value::Nil)
        }),
        "slice" => NativeFunction::new(
            name,
            vec![Type::Number, Type::Number],
            Type::slice_of(element),
            move |_, args| {
                let items = array.items();
                let (start, end) = bounds(&args, items.len(), "slice")?;
                Ok(Value::Slice(SliceValue::new(
                    array.element.clone(),
                    items[start..end].iter().map(Value::deep_clone).collect(),
                )))
            },
        ),
        "each" => NativeFunction::new(name, vec![Type::Any], Type::Any, move |interp, args| {
            let (element, items) = each(interp, &args[0], &array.element, array.items())?;
            Ok(Value::Array(ArrayValue::new(element, items)))
        }),
        "filter" => NativeFunction::new(name, vec![Type::Any], Type::Any, move |interp, args| {
            let element = array.element.clone();
            let kept = filter(interp, &args[0], &element, array.items())?;
            let padded = kept
                .into_iter()
                .map(|item| item.unwrap_or_else(|| element.default_value()))
                .collect();
            Ok(Value::Array(ArrayValue::new(element, padded)))
        }),
        _ => return None,
    };
    Some(method)
}

fn slice_method(slice: &SliceValue, name: &str) -> Option<Value> {
    let element = slice.element.clone();
    let slice = slice.clone();
    let method = match name {
        "len" => NativeFunction::new(name, vec![], Type::Number, move |_, _| {
            Ok(Value::Number(slice.len() as f64))
        }),
        "cap" => NativeFunction::new(name, vec![], Type::Number, move |_, _| {
            Ok(Value::Number(slice.cap() as f64))
        }),
        "append" => NativeFunction::new(name, vec![element], Type::Nil, move |_, mut args| {
            slice.append(args.pop().unwrap_or(Value::Nil))?;
            Ok(Value::Nil)
        }),
        "get" => NativeFunction::new(name, vec![Type::Number], element, move |_, args| {
            Ok(slice.get(args[0].expect_integer("get")?)?)
        }),
        "set" => NativeFunction::new(name, vec![Type::Number, element], Type::Nil, move |_, mut args| {
            let value = args.pop().unwrap_or(Value::Nil);
            slice.set(args[0].expect_integer("set")?, value)?;
            Ok(Value::Nil)
        }),
        "slice" => NativeFunction::new(
            name,
            vec![Type::Number, Type::Number],
            Type::slice_of(element),
            move |_, args| {
                let items = slice.items();
                let (start, end) = bounds(&args, items.len(), "slice")?;
                Ok(Value::Slice(SliceValue::new(
                    slice.element.clone(),
                    items[start..end].iter().map(Value::deep_clone).collect(),
                )))
            },
        ),
        "each" => NativeFunction::new(name, vec![Type::Any], Type::Any, move |interp, args| {
            let (element, items) = each(interp, &args[0], &slice.element, slice.items())?;
            Ok(Value::Slice(SliceValue::new(element, items)))
        }),
        "filter" => NativeFunction::new(name, vec![Type::Any], Type::Any, move |interp, args| {
            let kept = filter(interp, &args[0], &slice.element, slice.items())?;
            Ok(Value::Slice(SliceValue::new(
                slice.element.clone(),
                kept.into_iter().flatten().collect(),
            )))
        }),
        _ => return None,
    };
    Some(method)
}

fn map_method(map: &MapValue, name: &str) -> Option<Value> {
    let (key, value) = (map.key_type.clone(), map.value_type.clone());
    let map_type = Type::map_of(key.clone(), value.clone());
    let map = map.clone();
    let method = match name {
        "len" => NativeFunction::new(name, vec![], Type::Number, move |_, _| {
            Ok(Value::Number(map.len() as f64))
        }),
        "get" => NativeFunction::new(name, vec![key], value, move |_, args| Ok(map.get(&args[0])?)),
        "set" => NativeFunction::new(name, vec![key, value], Type::Nil, move |_, mut args| {
            let value = args.pop().unwrap_or(Value::Nil);
            let key = args.pop().unwrap_or(Value::Nil);
            map.set(key, value)?;
            Ok(Value::Nil)
        }),
        "pop" => NativeFunction::new(name, vec![key], Type::Bool, move |_, args| {
            Ok(Value::Bool(map.pop(&args[0])))
        }),
        "exists" => NativeFunction::new(name, vec![key], Type::Bool, move |_, args| {
            Ok(Value::Bool(map.exists(&args[0])))
        }),
        "keys" => NativeFunction::new(name, vec![], Type::Any, move |_, _| {
            Ok(Value::Array(ArrayValue::new(map.key_type.clone(), map.keys())))
        }),
        "values" => NativeFunction::new(name, vec![], Type::Any, move |_, _| {
            Ok(Value::Array(ArrayValue::new(map.value_type.clone(), map.values())))
        }),
        "intersect" => NativeFunction::new(name, vec![map_type.clone()], map_type, move |_, args| {
            match &args[0] {
                Value::Map(other) => Ok(Value::Map(map.intersect(other))),
                _ => Ok(Value::Map(map.intersect(&MapValue::new(Type::Any, Type::Any)))),
            }
        }),
        "union" => NativeFunction::new(name, vec![map_type.clone()], map_type, move |_, args| {
            match &args[0] {
                Value::Map(other) => Ok(Value::Map(map.union(other))),
                _ => Ok(Value::Map(map.union(&MapValue::new(Type::Any, Type::Any)))),
            }
        }),
        _ => return None,
    };
    Some(method)
}

fn error_method(message: &str, name: &str) -> Option<Value> {
    let message = message.to_string();
    match name {
        "message" => Some(NativeFunction::new(name, vec![], Type::String, move |_, _| {
            Ok(Value::String(message.clone()))
        })),
        _ => None,
    }
}

/// `[start, end)` from two number arguments, checked against `len`.
fn bounds(args: &[Value], len: usize, method: &str) -> RuntimeResult<(usize, usize)> {
    let start = args[0].expect_integer(method)?;
    let end = args[1].expect_integer(method)?;
    if start < 0 || end > len as i64 || start > end {
        return Err(RuntimeError::range(format!(
            "{method}({start}, {end}) is out of bounds for length {len}"
        )));
    }
    Ok((start as usize, end as usize))
}

/// Parameter count of an `each`/`filter` callback, checked against the
/// element type.
fn callback_arity(callback: &Value, element: &Type) -> RuntimeResult<usize> {
    let params: Vec<Type> = match callback {
        Value::Function(function) => function.ty.params.iter().map(|p| p.ty.clone()).collect(),
        Value::Native(native) => native.ty.params.clone(),
        other => {
            return Err(RuntimeError::type_mismatch(format!(
                "expected a function, got {}",
                other.type_of()
            )))
        }
    };
    let expected: &[Type] = match params.len() {
        0 => &[],
        1 => std::slice::from_ref(element),
        2 => &[Type::Number, element.clone()],
        n => {
            return Err(RuntimeError::type_mismatch(format!(
                "callback takes 0, 1 or 2 parameters, not {n}"
            )))
        }
    };
    for (param, wanted) in params.iter().zip(expected) {
        if !param.equals(wanted) {
            return Err(RuntimeError::type_mismatch(format!(
                "callback parameter of type {param} does not accept {wanted}"
            )));
        }
    }
    Ok(params.len())
}

fn invoke(
    interp: &mut Interpreter,
    callback: &Value,
    arity: usize,
    index: usize,
    item: Value,
) -> EvalResult {
    let args = match arity {
        0 => vec![],
        1 => vec![item],
        _ => vec![Value::Number(index as f64), item],
    };
    interp.call_value(callback.clone(), args)
}

fn each(
    interp: &mut Interpreter,
    callback: &Value,
    element: &Type,
    items: Vec<Value>,
) -> EvalResult<(Type, Vec<Value>)> {
    let arity = callback_arity(callback, element)?;
    let mut results = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        results.push(invoke(interp, callback, arity, index, item)?);
    }

    let declared = match callback {
        Value::Function(function) => function.ty.ret.clone(),
        Value::Native(native) => native.ty.ret.clone(),
        _ => Type::Any,
    };
    let result_type = if !declared.is_any() {
        declared
    } else {
        match results.first().map(Value::type_of) {
            Some(first) if results.iter().all(|r| first.equals(&r.type_of())) => first,
            _ => Type::Any,
        }
    };
    Ok((result_type, results))
}

/// Kept items in order, `None` where the predicate said no.
fn filter(
    interp: &mut Interpreter,
    callback: &Value,
    element: &Type,
    items: Vec<Value>,
) -> EvalResult<Vec<Option<Value>>> {
    let arity = callback_arity(callback, element)?;
    let mut kept = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let keep = invoke(interp, callback, arity, index, item.clone())?
            .expect_bool("filter callback result")?;
        kept.push(keep.then_some(item));
    }
    Ok(kept)
}

pub(crate) fn url_encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

/// Inverse of [`url_encode`]; `+` also decodes to a space. Malformed escapes
/// pass through unchanged.
pub(crate) fn url_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => {
                let escaped = bytes
                    .get(i + 1..i + 3)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match escaped {
                    Some(byte) => {
                        out.push(byte);
                        i += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            other => out.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_round_trip() {
        let encoded = url_encode("a b&c=d/é");
        assert_eq!(encoded, "a%20b%26c%3Dd%2F%C3%A9");
        assert_eq!(url_decode(&encoded), "a b&c=d/é");
        assert_eq!(url_decode("x+y%2"), "x y%2");
    }

    #[test]
    fn unknown_methods_are_reported() {
        let err = lookup(&Value::Number(1.0), "len").unwrap_err();
        assert_eq!(err.to_string(), "number has no method `len`");
        assert!(lookup(&Value::String("x".into()), "len").is_ok());
        assert!(lookup(&Value::String("x".into()), "nope").is_err());
    }

    #[test]
    fn bounds_reject_inverted_ranges() {
        let args = [Value::Number(2.0), Value::Number(1.0)];
        assert!(bounds(&args, 5, "substr").is_err());
        let args = [Value::Number(1.0), Value::Number(5.0)];
        assert_eq!(bounds(&args, 5, "substr").ok(), Some((1, 5)));
        let args = [Value::Number(0.0), Value::Number(6.0)];
        assert!(bounds(&args, 5, "substr").is_err());
    }
}
