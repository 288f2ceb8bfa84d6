use super::export;
use crate::runtime::{
    error::RuntimeError,
    types::Type,
    value::{ModuleValue, NativeFunction, Value},
};
use rand::Rng;

pub fn module() -> ModuleValue {
    let exports = vec![
        export(NativeFunction::new(
            "int",
            vec![Type::Number, Type::Number],
            Type::Number,
            |_, args| {
                let lo = args[0].expect_integer("random.int")?;
                let hi = args[1].expect_integer("random.int")?;
                if lo > hi {
                    return Err(RuntimeError::range(format!(
                        "random.int bounds {lo} > {hi}"
                    ))
                    .into());
                }
                Ok(Value::Number(rand::thread_rng().gen_range(lo..=hi) as f64))
            },
        )),
        export(NativeFunction::new("float", vec![], Type::Number, |_, _| {
            Ok(Value::Number(rand::thread_rng().gen::<f64>()))
        })),
        export(NativeFunction::new("bool", vec![], Type::Bool, |_, _| {
            Ok(Value::Bool(rand::thread_rng().gen::<bool>()))
        })),
        export(NativeFunction::new(
            "choice",
            vec![Type::slice_of(Type::Any)],
            Type::Any,
            |_, args| match &args[0] {
                Value::Slice(slice) if slice.len() > 0 => {
                    let pick = rand::thread_rng().gen_range(0..slice.len());
                    Ok(slice.get(pick as i64)?)
                }
                _ => Err(RuntimeError::range("random.choice on an empty slice").into()),
            },
        )),
    ];
    ModuleValue::new("random", exports)
}
