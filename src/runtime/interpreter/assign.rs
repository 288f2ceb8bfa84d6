use super::{binary_op, Interpreter};
use crate::{
    language::ast::{AssignOp, AssignStmt, BinaryOp, Expr, PrefixOp},
    runtime::{
        environment::Scope,
        error::{EvalResult, RuntimeError, RuntimeResult},
        reference::{Place, Pointer, Reference},
        value::{normalize_index, Value},
    },
};

impl Interpreter {
    /// Storage named by an assignable expression.
    pub(crate) fn resolve_place(&mut self, expr: &Expr, scope: &Scope) -> EvalResult<Place> {
        match expr {
            Expr::Identifier(ident) => Ok(Place::Cell(scope.resolve(&ident.name)?)),
            Expr::Index { owner, index, .. } => {
                let owner = self.eval_expr(owner, scope)?;
                let index = self.eval_expr(index, scope)?;
                Ok(index_place(owner, index)?)
            }
            Expr::Member { owner, name, .. } => {
                let owner = self.eval_expr(owner, scope)?;
                Ok(member_place(owner, &name.name)?)
            }
            Expr::Prefix {
                op: PrefixOp::Deref,
                expr,
                ..
            } => match self.eval_expr(expr, scope)? {
                Value::Pointer(pointer) => Ok((*pointer.target).clone()),
                Value::Nil => Err(RuntimeError::NilDereference.into()),
                other => Err(RuntimeError::type_mismatch(format!(
                    "cannot dereference {}",
                    other.type_of()
                ))
                .into()),
            },
            other => Err(RuntimeError::NotAddressable {
                what: describe(other).into(),
            }
            .into()),
        }
    }

    /// `&operand`. A call result is boxed in a fresh cell.
    pub(crate) fn address_of(&mut self, operand: &Expr, scope: &Scope) -> EvalResult {
        let place = match operand {
            Expr::Call { .. } => {
                let value = self.eval_expr(operand, scope)?;
                Place::Cell(Reference::temporary(value))
            }
            Expr::Identifier(_)
            | Expr::Index { .. }
            | Expr::Member { .. }
            | Expr::Prefix {
                op: PrefixOp::Deref,
                ..
            } => self.resolve_place(operand, scope)?,
            other => {
                return Err(RuntimeError::NotAddressable {
                    what: describe(other).into(),
                }
                .into())
            }
        };
        Ok(Value::Pointer(Pointer::new(place)))
    }

    pub(crate) fn execute_assignment(&mut self, stmt: &AssignStmt, scope: &Scope) -> EvalResult<()> {
        let place = self.resolve_place(&stmt.target, scope)?;
        let value = match stmt.op {
            AssignOp::Assign => self.assigned_value(stmt, scope)?,
            AssignOp::NilCoalesce => {
                if !place.load()?.is_nil() {
                    return Ok(());
                }
                self.assigned_value(stmt, scope)?
            }
            AssignOp::Increment | AssignOp::Decrement => {
                let op = if stmt.op == AssignOp::Increment {
                    BinaryOp::Add
                } else {
                    BinaryOp::Sub
                };
                binary_op(op, place.load()?, Value::Number(1.0))?
            }
            compound => {
                let current = place.load()?;
                let rhs = self.assigned_value(stmt, scope)?;
                match compound.binary() {
                    Some(op) => binary_op(op, current, rhs)?,
                    None => rhs,
                }
            }
        };
        place.store(value.deep_clone())?;
        Ok(())
    }

    fn assigned_value(&mut self, stmt: &AssignStmt, scope: &Scope) -> EvalResult {
        match &stmt.value {
            Some(expr) => self.eval_expr(expr, scope),
            None => Err(RuntimeError::type_mismatch("assignment without a value").into()),
        }
    }
}

fn index_place(owner: Value, index: Value) -> RuntimeResult<Place> {
    match owner {
        Value::Array(ref array) => {
            let slot = normalize_index(index.expect_integer("array index")?, array.len())?;
            Ok(Place::Element { owner, index: slot })
        }
        Value::Slice(ref slice) => {
            let slot = normalize_index(index.expect_integer("slice index")?, slice.len())?;
            Ok(Place::Element { owner, index: slot })
        }
        Value::Map(map) => Ok(Place::Entry { map, key: index }),
        Value::Pointer(pointer) => index_place(pointer.load()?, index),
        Value::Nil => Err(RuntimeError::NilDereference),
        other => Err(RuntimeError::NotAddressable {
            what: format!("an element of {}", other.type_of()),
        }),
    }
}

fn member_place(owner: Value, name: &str) -> RuntimeResult<Place> {
    match owner {
        Value::Struct(instance) => instance
            .field(name)
            .or_else(|| instance.def.static_cell(name))
            .map(Place::Cell)
            .ok_or_else(|| RuntimeError::UnknownMember {
                owner: instance.def.name.clone(),
                name: name.to_string(),
            }),
        Value::StructDef(def) => {
            def.static_cell(name)
                .map(Place::Cell)
                .ok_or_else(|| RuntimeError::UnknownMember {
                    owner: def.name.clone(),
                    name: name.to_string(),
                })
        }
        Value::Pointer(pointer) => member_place(pointer.load()?, name),
        Value::Nil => Err(RuntimeError::NilDereference),
        other => Err(RuntimeError::NotAddressable {
            what: format!("member `{name}` of {}", other.type_of()),
        }),
    }
}

fn describe(expr: &Expr) -> &'static str {
    match expr {
        Expr::Literal(..) => "a literal",
        Expr::Binary { .. } | Expr::Prefix { .. } | Expr::Ternary { .. } => "an operator expression",
        Expr::Function(_) => "a function expression",
        Expr::Range { .. } => "a range",
        Expr::ArrayLiteral { .. }
        | Expr::SliceLiteral { .. }
        | Expr::MapLiteral { .. }
        | Expr::StructLiteral { .. } => "a literal",
        _ => "this expression",
    }
}
