use super::export;
use crate::runtime::{
    types::Type,
    value::{ModuleValue, NativeFunction, Value},
};

fn unary(name: &'static str, op: fn(f64) -> f64) -> (String, Value) {
    export(NativeFunction::new(name, vec![Type::Number], Type::Number, move |_, args| {
        Ok(Value::Number(op(args[0].expect_number(name)?)))
    }))
}

fn binary(name: &'static str, op: fn(f64, f64) -> f64) -> (String, Value) {
    export(NativeFunction::new(
        name,
        vec![Type::Number, Type::Number],
        Type::Number,
        move |_, args| {
            let a = args[0].expect_number(name)?;
            let b = args[1].expect_number(name)?;
            Ok(Value::Number(op(a, b)))
        },
    ))
}

pub fn module() -> ModuleValue {
    let exports = vec![
        ("pi".to_string(), Value::Number(std::f64::consts::PI)),
        ("e".to_string(), Value::Number(std::f64::consts::E)),
        unary("abs", f64::abs),
        unary("floor", f64::floor),
        unary("ceil", f64::ceil),
        unary("round", f64::round),
        unary("sqrt", f64::sqrt),
        unary("sin", f64::sin),
        unary("cos", f64::cos),
        unary("tan", f64::tan),
        unary("log", f64::ln),
        unary("exp", f64::exp),
        binary("pow", f64::powf),
        binary("min", f64::min),
        binary("max", f64::max),
        export(NativeFunction::new(
            "clamp",
            vec![Type::Number, Type::Number, Type::Number],
            Type::Number,
            |_, args| {
                let n = args[0].expect_number("clamp")?;
                let lo = args[1].expect_number("clamp")?;
                let hi = args[2].expect_number("clamp")?;
                Ok(Value::Number(n.max(lo).min(hi)))
            },
        )),
    ];
    ModuleValue::new("math", exports)
}
