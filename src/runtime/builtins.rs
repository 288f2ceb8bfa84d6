use crate::runtime::{
    environment::Scope,
    error::RuntimeError,
    format::{parse_number, render},
    reference::Reference,
    types::Type,
    value::{NativeFunction, Value},
};

/// Declares the global functions in `scope`.
pub fn install(scope: &Scope) {
    for builtin in builtins() {
        let name = match &builtin {
            Value::Native(native) => native.name.clone(),
            _ => continue,
        };
        let ty = builtin.type_of();
        // A fresh root scope has no bindings that could clash.
        let _ = scope.declare(Reference::variable(name, ty, builtin, true));
    }
}

fn joined(args: &[Value]) -> String {
    args.iter()
        .map(Value::display)
        .collect::<Vec<_>>()
        .join(" ")
}

fn builtins() -> Vec<Value> {
    vec![
        NativeFunction::variadic("print", vec![Type::Any], Type::Nil, |interp, args| {
            interp.write_out(&joined(&args))?;
            Ok(Value::Nil)
        }),
        NativeFunction::variadic("println", vec![Type::Any], Type::Nil, |interp, args| {
            let mut line = joined(&args);
            line.push('\n');
            interp.write_out(&line)?;
            Ok(Value::Nil)
        }),
        NativeFunction::variadic(
            "printf",
            vec![Type::String, Type::Any],
            Type::Nil,
            |interp, args| {
                let format = args[0].expect_string("printf")?;
                let text = render(format, &args[1..])?;
                interp.write_out(&text)?;
                Ok(Value::Nil)
            },
        ),
        NativeFunction::new("string", vec![Type::Any], Type::String, |_, args| {
            Ok(Value::String(args[0].display()))
        }),
        NativeFunction::new("bool", vec![Type::Any], Type::Bool, |_, args| {
            Ok(Value::Bool(args[0].truthy()))
        }),
        NativeFunction::new("number", vec![Type::Any], Type::Number, |_, args| {
            let n = match &args[0] {
                Value::Number(n) => *n,
                Value::Bool(b) => f64::from(u8::from(*b)),
                Value::String(text) => parse_number(text)
                    .ok_or_else(|| RuntimeError::NumberParse { text: text.clone() })?,
                other => {
                    return Err(RuntimeError::type_mismatch(format!(
                        "cannot convert {} to a number",
                        other.type_of()
                    ))
                    .into())
                }
            };
            Ok(Value::Number(n))
        }),
        NativeFunction::new("error", vec![Type::String], Type::Error, |_, args| {
            Ok(Value::Error(args[0].expect_string("error")?.to_string()))
        }),
    ]
}
