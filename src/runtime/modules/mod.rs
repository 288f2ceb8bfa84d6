//! Standard modules available to `import` by name.

mod math;
mod net;
mod os;
mod random;
mod time;

use crate::runtime::value::{ModuleValue, Value};
use std::{collections::HashMap, rc::Rc};

pub fn standard_modules() -> HashMap<String, Rc<ModuleValue>> {
    [math::module(), time::module(), random::module(), os::module(), net::module()]
        .into_iter()
        .map(|module| (module.name.clone(), Rc::new(module)))
        .collect()
}

/// Export list entry keyed by the function's own name.
fn export(value: Value) -> (String, Value) {
    let name = match &value {
        Value::Native(native) => native.name.clone(),
        _ => String::new(),
    };
    (name, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_module_is_registered_under_its_name() {
        let modules = standard_modules();
        for name in ["math", "time", "random", "os", "net"] {
            assert!(modules.contains_key(name), "missing {name}");
        }
        assert!(modules["math"].get("sqrt").is_ok());
        assert!(modules["math"].get("nope").is_err());
    }
}
