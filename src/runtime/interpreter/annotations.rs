use super::{expressions::MAX_SEQUENCE_LEN, Interpreter};
use crate::{
    language::ast::{Expr, TypeExpr, TypeParam},
    runtime::{
        environment::Scope,
        error::{EvalResult, RuntimeError},
        types::{FunctionType, ParamType, Type},
        value::Value,
    },
};
use std::rc::Rc;

impl Interpreter {
    /// Turns a written type into a runtime type. Names resolve through the
    /// scope, falling back to hoisted struct and interface shells.
    pub(crate) fn resolve_type(&mut self, ty: &TypeExpr, scope: &Scope) -> EvalResult<Type> {
        let resolved = match ty {
            TypeExpr::Named(name, _) => {
                if let Some(primitive) = Type::primitive(name) {
                    return Ok(primitive);
                }
                match scope.lookup(name) {
                    Some(reference) => match reference.load() {
                        Value::StructDef(def) => Type::Struct(def),
                        Value::Type(ty) => ty,
                        other => {
                            return Err(RuntimeError::type_mismatch(format!(
                                "`{name}` is a {}, not a type",
                                other.type_of()
                            ))
                            .into())
                        }
                    },
                    None => scope
                        .forward_type(name)
                        .ok_or_else(|| RuntimeError::UnknownSymbol { name: name.clone() })?,
                }
            }
            TypeExpr::Array { size, element } => {
                let size = self.array_size(size, scope)?;
                Type::Array {
                    size,
                    element: Box::new(self.resolve_type(element, scope)?),
                }
            }
            TypeExpr::Slice(element) => Type::slice_of(self.resolve_type(element, scope)?),
            TypeExpr::Map { key, value } => {
                let key = self.resolve_type(key, scope)?;
                Type::map_of(key, self.resolve_type(value, scope)?)
            }
            TypeExpr::Pointer(pointee) => Type::pointer_to(self.resolve_type(pointee, scope)?),
            TypeExpr::Function { params, ret } => {
                Type::Function(Rc::new(self.resolve_signature(params, ret.as_deref(), scope)?))
            }
        };
        Ok(resolved)
    }

    pub(crate) fn resolve_signature(
        &mut self,
        params: &[TypeParam],
        ret: Option<&TypeExpr>,
        scope: &Scope,
    ) -> EvalResult<FunctionType> {
        let mut resolved = Vec::with_capacity(params.len());
        for param in params {
            resolved.push(ParamType {
                label: param.label.clone(),
                ty: self.resolve_type(&param.ty, scope)?,
            });
        }
        let ret = match ret {
            Some(ret) => self.resolve_type(ret, scope)?,
            None => Type::Any,
        };
        Ok(FunctionType {
            params: resolved,
            ret,
        })
    }

    pub(crate) fn array_size(&mut self, size: &Expr, scope: &Scope) -> EvalResult<usize> {
        let size = self.eval_expr(size, scope)?.expect_integer("array size")?;
        if size < 0 {
            return Err(RuntimeError::range(format!("array size {size} is negative")).into());
        }
        if size as u64 > MAX_SEQUENCE_LEN as u64 {
            return Err(RuntimeError::range(format!(
                "array size {size} exceeds the limit of {MAX_SEQUENCE_LEN}"
            ))
            .into());
        }
        Ok(size as usize)
    }
}
