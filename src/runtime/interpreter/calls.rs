use super::{escaped, Interpreter};
use crate::{
    language::ast::FunctionLiteral,
    runtime::{
        environment::Scope,
        error::{EvalResult, RuntimeError, Signal},
        reference::Reference,
        types::{FunctionType, ParamType, Type},
        value::{FunctionValue, NativeFunction, Value},
    },
};
use std::rc::Rc;
use tracing::trace;

impl Interpreter {
    pub(crate) fn call_value(&mut self, callee: Value, args: Vec<Value>) -> EvalResult {
        match callee {
            Value::Function(function) => self.call_function(&function, args),
            Value::Native(native) => self.call_native(&native, args),
            Value::Pointer(pointer) => self.call_value(pointer.load()?, args),
            Value::Nil => Err(RuntimeError::NilDereference.into()),
            other => Err(RuntimeError::type_mismatch(format!(
                "{} is not callable",
                other.type_of()
            ))
            .into()),
        }
    }

    pub(crate) fn call_function(&mut self, function: &FunctionValue, args: Vec<Value>) -> EvalResult {
        self.enter_call()?;
        let result = self.invoke(function, args);
        self.exit_call();
        result
    }

    fn invoke(&mut self, function: &FunctionValue, args: Vec<Value>) -> EvalResult {
        let decl = &function.decl;
        let name = display_name(&function.name);
        if args.len() > decl.params.len() {
            return Err(RuntimeError::ArityMismatch {
                name,
                expected: decl.params.len(),
                received: args.len(),
            }
            .into());
        }
        trace!(function = %name, args = args.len(), "call");

        let scope = function.closure.child();
        if let Some(receiver) = &function.receiver {
            let ty = Type::Struct(receiver.def.clone());
            scope.declare(Reference::variable(
                "self",
                ty,
                Value::Struct(receiver.clone()),
                true,
            ))?;
        }

        let received = args.len();
        let mut args = args.into_iter();
        for (param, declared) in decl.params.iter().zip(&function.ty.params) {
            let value = match args.next() {
                Some(value) => value,
                None => match &param.default {
                    Some(default) => self.eval_expr(default, &scope)?,
                    None => {
                        return Err(RuntimeError::ArityMismatch {
                            name,
                            expected: decl.params.len(),
                            received,
                        }
                        .into())
                    }
                },
            };
            let actual = value.type_of();
            if !declared.ty.equals(&actual) {
                return Err(RuntimeError::type_mismatch(format!(
                    "argument `{}` of {name} expects {}, got {actual}",
                    param.name.name, declared.ty
                ))
                .into());
            }
            scope.declare(Reference::variable(
                &param.name.name,
                declared.ty.clone(),
                value.deep_clone(),
                false,
            ))?;
        }

        let value = match self.execute_statements(&decl.body.statements, &scope) {
            Ok(_) => Value::Nil,
            Err(Signal::Return(value)) => value,
            Err(signal @ (Signal::Break | Signal::Continue)) => return Err(escaped(signal).into()),
            Err(other) => return Err(other),
        };

        let ret = &function.ty.ret;
        if !ret.is_any() && !ret.equals(&value.type_of()) {
            return Err(RuntimeError::type_mismatch(format!(
                "{name} must return {ret}, returned {}",
                value.type_of()
            ))
            .into());
        }
        Ok(value)
    }

    pub(crate) fn call_native(&mut self, native: &NativeFunction, args: Vec<Value>) -> EvalResult {
        let ty = &native.ty;
        let arity_ok = if ty.variadic {
            args.len() + 1 >= ty.params.len()
        } else {
            args.len() == ty.params.len()
        };
        if !arity_ok {
            return Err(RuntimeError::ArityMismatch {
                name: native.name.clone(),
                expected: ty.params.len(),
                received: args.len(),
            }
            .into());
        }
        for (i, arg) in args.iter().enumerate() {
            let expected = match ty.params.get(i).or_else(|| ty.params.last()) {
                Some(expected) => expected,
                None => break,
            };
            let actual = arg.type_of();
            if !expected.equals(&actual) {
                return Err(RuntimeError::type_mismatch(format!(
                    "argument {} of {} expects {expected}, got {actual}",
                    i + 1,
                    native.name
                ))
                .into());
            }
        }
        self.enter_call()?;
        let result = (native.func)(self, args);
        self.exit_call();
        result
    }

    /// Builds a closure over `scope`, resolving its signature now.
    pub(crate) fn make_function(
        &mut self,
        name: &str,
        literal: &Rc<FunctionLiteral>,
        scope: &Scope,
    ) -> EvalResult<FunctionValue> {
        let mut params = Vec::with_capacity(literal.params.len());
        for param in &literal.params {
            params.push(ParamType {
                label: Some(param.name.name.clone()),
                ty: self.resolve_type(&param.ty.ty, scope)?,
            });
        }
        let ret = match &literal.return_type {
            Some(annotation) => self.resolve_type(&annotation.ty, scope)?,
            None => Type::Any,
        };
        Ok(FunctionValue {
            name: name.to_string(),
            decl: literal.clone(),
            ty: Rc::new(FunctionType { params, ret }),
            closure: scope.clone(),
            receiver: None,
        })
    }
}

fn display_name(name: &str) -> String {
    if name.is_empty() {
        "<anonymous>".to_string()
    } else {
        name.to_string()
    }
}
