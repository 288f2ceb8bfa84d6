use super::export;
use crate::runtime::{
    error::{RuntimeError, Signal},
    types::Type,
    value::{ModuleValue, NativeFunction, SliceValue, Value},
};

pub fn module() -> ModuleValue {
    let exports = vec![
        export(NativeFunction::new("exit", vec![Type::Number], Type::Nil, |interp, args| {
            let code = args[0].expect_integer("os.exit")?;
            let code = i32::try_from(code)
                .map_err(|_| RuntimeError::range(format!("exit status {code} is out of range")))?;
            interp.flush();
            Err(Signal::Exit(code))
        })),
        export(NativeFunction::new(
            "args",
            vec![],
            Type::slice_of(Type::String),
            |interp, _| {
                let args = interp
                    .script_args()
                    .iter()
                    .map(|arg| Value::String(arg.clone()))
                    .collect();
                Ok(Value::Slice(SliceValue::new(Type::String, args)))
            },
        )),
        export(NativeFunction::new("env", vec![Type::String], Type::String, |interp, args| {
            let name = args[0].expect_string("os.env")?;
            Ok(Value::String(interp.platform().env_var(name).unwrap_or_default()))
        })),
        export(NativeFunction::new(
            "read_file",
            vec![Type::String],
            Type::String,
            |interp, args| {
                let path = args[0].expect_string("os.read_file")?;
                let contents = interp
                    .platform()
                    .fs_read(path)
                    .map_err(|message| RuntimeError::Io { message })?;
                Ok(Value::String(contents))
            },
        )),
        export(NativeFunction::new(
            "write_file",
            vec![Type::String, Type::String],
            Type::Nil,
            |interp, args| {
                let path = args[0].expect_string("os.write_file")?;
                let contents = args[1].expect_string("os.write_file")?;
                interp
                    .platform()
                    .fs_write(path, contents)
                    .map_err(|message| RuntimeError::Io { message })?;
                Ok(Value::Nil)
            },
        )),
        export(NativeFunction::new("exists", vec![Type::String], Type::Bool, |interp, args| {
            let path = args[0].expect_string("os.exists")?;
            Ok(Value::Bool(interp.platform().fs_exists(path)))
        })),
    ];
    ModuleValue::new("os", exports)
}
