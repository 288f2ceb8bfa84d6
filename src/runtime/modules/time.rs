use super::export;
use crate::runtime::{
    types::Type,
    value::{ModuleValue, NativeFunction, Value},
};

pub fn module() -> ModuleValue {
    let exports = vec![
        export(NativeFunction::new("now", vec![], Type::Number, |interp, _| {
            Ok(Value::Number(interp.platform().now_ms() as f64))
        })),
        export(NativeFunction::new("sleep", vec![Type::Number], Type::Nil, |interp, args| {
            let millis = args[0].expect_number("sleep")?;
            interp.flush();
            interp.platform().sleep_ms(millis as i128);
            Ok(Value::Nil)
        })),
        export(NativeFunction::new("since", vec![Type::Number], Type::Number, |interp, args| {
            let start = args[0].expect_number("since")?;
            Ok(Value::Number(interp.platform().now_ms() as f64 - start))
        })),
    ];
    ModuleValue::new("time", exports)
}
