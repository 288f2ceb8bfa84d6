use super::Interpreter;
use crate::{
    language::ast::{
        BinaryOp, Block, ElseBranch, Expr, Identifier, IfExpr, Literal, PrefixOp, SwitchExpr,
        TryExpr, TypeAnnotation,
    },
    runtime::{
        environment::Scope,
        error::{EvalResult, RuntimeError, RuntimeResult, Signal},
        methods,
        reference::Reference,
        types::Type,
        value::{format_number, ArrayValue, MapValue, SliceValue, Value},
    },
};

/// Upper bound on elements built by a range or sized by an array type.
pub(super) const MAX_SEQUENCE_LEN: usize = 10_000_000;

impl Interpreter {
    pub(crate) fn eval_expr(&mut self, expr: &Expr, scope: &Scope) -> EvalResult {
        match expr {
            Expr::Literal(literal, _) => Ok(match literal {
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::String(s.clone()),
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Nil => Value::Nil,
            }),
            Expr::Identifier(ident) => Ok(scope.resolve(&ident.name)?.load()),
            Expr::Prefix { op, expr, .. } => self.eval_prefix(*op, expr, scope),
            Expr::Binary {
                op, left, right, ..
            } => self.eval_binary(*op, left, right, scope),
            Expr::Ternary {
                condition,
                then_value,
                else_value,
                ..
            } => {
                if self
                    .eval_expr(condition, scope)?
                    .expect_bool("ternary condition")?
                {
                    self.eval_expr(then_value, scope)
                } else {
                    self.eval_expr(else_value, scope)
                }
            }
            Expr::Block(block) => self.eval_block(block, scope),
            Expr::If(if_expr) => self.eval_if(if_expr, scope),
            Expr::Switch(switch) => self.eval_switch(switch, scope),
            Expr::Try(try_expr) => self.eval_try(try_expr, scope),
            Expr::Call { callee, args, .. } => {
                let callee = self.eval_expr(callee, scope)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expr(arg, scope)?);
                }
                self.call_value(callee, values)
            }
            Expr::Function(literal) => Ok(Value::Function(self.make_function("", literal, scope)?)),
            Expr::ArrayLiteral {
                size,
                element,
                values,
                ..
            } => self.eval_array_literal(size, element, values, scope),
            Expr::SliceLiteral {
                element, values, ..
            } => {
                let element = self.resolve_type(&element.ty, scope)?;
                let items = self.eval_elements(&element, values, scope)?;
                Ok(Value::Slice(SliceValue::new(element, items)))
            }
            Expr::MapLiteral {
                key,
                value,
                entries,
                ..
            } => self.eval_map_literal(key, value, entries, scope),
            Expr::Index { owner, index, .. } => {
                let owner = self.eval_expr(owner, scope)?;
                let index = self.eval_expr(index, scope)?;
                Ok(index_value(owner, index)?)
            }
            Expr::Member { owner, name, .. } => {
                let owner = self.eval_expr(owner, scope)?;
                self.member_of(owner, name)
            }
            Expr::Range {
                start, end, step, ..
            } => self.eval_range(start, end, step.as_deref(), scope),
            Expr::StructLiteral { name, fields, .. } => self.instantiate_struct(name, fields, scope),
        }
    }

    pub(crate) fn eval_block(&mut self, block: &Block, scope: &Scope) -> EvalResult {
        let inner = scope.child();
        self.execute_statements(&block.statements, &inner)
    }

    fn eval_prefix(&mut self, op: PrefixOp, operand: &Expr, scope: &Scope) -> EvalResult {
        if op == PrefixOp::AddressOf {
            return self.address_of(operand, scope);
        }
        let value = self.eval_expr(operand, scope)?;
        let result = match op {
            PrefixOp::Not => Value::Bool(!value.expect_bool("`!`")?),
            PrefixOp::Neg => Value::Number(-value.expect_number("unary `-`")?),
            PrefixOp::Plus => Value::Number(value.expect_number("unary `+`")?),
            PrefixOp::TypeOf => Value::Type(value.type_of()),
            PrefixOp::Deref => match value {
                Value::Pointer(pointer) => pointer.load()?,
                Value::Nil => return Err(RuntimeError::NilDereference.into()),
                other => {
                    return Err(RuntimeError::type_mismatch(format!(
                        "cannot dereference {}",
                        other.type_of()
                    ))
                    .into())
                }
            },
            PrefixOp::AddressOf => unreachable!("handled above"),
        };
        Ok(result)
    }

    fn eval_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr, scope: &Scope) -> EvalResult {
        match op {
            BinaryOp::And => {
                if !self.eval_expr(left, scope)?.expect_bool("`&&`")? {
                    return Ok(Value::Bool(false));
                }
                let rhs = self.eval_expr(right, scope)?.expect_bool("`&&`")?;
                Ok(Value::Bool(rhs))
            }
            BinaryOp::Or => {
                if self.eval_expr(left, scope)?.expect_bool("`||`")? {
                    return Ok(Value::Bool(true));
                }
                let rhs = self.eval_expr(right, scope)?.expect_bool("`||`")?;
                Ok(Value::Bool(rhs))
            }
            BinaryOp::NilCoalesce => {
                let lhs = self.eval_expr(left, scope)?;
                if lhs.is_nil() {
                    self.eval_expr(right, scope)
                } else {
                    Ok(lhs)
                }
            }
            _ => {
                let lhs = self.eval_expr(left, scope)?;
                let rhs = self.eval_expr(right, scope)?;
                Ok(binary_op(op, lhs, rhs)?)
            }
        }
    }

    fn eval_if(&mut self, if_expr: &IfExpr, scope: &Scope) -> EvalResult {
        let condition = self
            .eval_expr(&if_expr.condition, scope)?
            .expect_bool("if condition")?;
        if condition {
            return self.eval_block(&if_expr.then_branch, scope);
        }
        match &if_expr.else_branch {
            Some(ElseBranch::Block(block)) => self.eval_block(block, scope),
            Some(ElseBranch::If(nested)) => self.eval_if(nested, scope),
            None => Ok(Value::Nil),
        }
    }

    fn eval_switch(&mut self, switch: &SwitchExpr, scope: &Scope) -> EvalResult {
        if switch.cases.iter().filter(|case| case.is_default).count() > 1 {
            return Err(RuntimeError::DuplicateDefault.into());
        }
        let subject = self.eval_expr(&switch.discriminant, scope)?;
        for case in switch.cases.iter().filter(|case| !case.is_default) {
            for pattern in &case.patterns {
                let candidate = self.eval_expr(pattern, scope)?;
                if subject.equals(&candidate) {
                    return self.eval_block(&case.body, scope);
                }
            }
        }
        match switch.cases.iter().find(|case| case.is_default) {
            Some(default) => self.eval_block(&default.body, scope),
            None => Ok(Value::Nil),
        }
    }

    fn eval_try(&mut self, try_expr: &TryExpr, scope: &Scope) -> EvalResult {
        let caught = match self.eval_block(&try_expr.body, scope) {
            Ok(value) => return Ok(value),
            Err(Signal::Throw(value)) => value,
            Err(Signal::Error(err)) => Value::Error(err.to_string()),
            Err(other) => return Err(other),
        };
        tracing::trace!(error = %caught.display(), "caught");

        let handler_scope = scope.child();
        if let Some(binding) = &try_expr.binding {
            handler_scope.declare(Reference::variable(
                &binding.name,
                Type::Any,
                caught,
                false,
            ))?;
        }
        self.eval_block(&try_expr.handler, &handler_scope)
    }

    fn eval_elements(&mut self, element: &Type, values: &[Expr], scope: &Scope) -> EvalResult<Vec<Value>> {
        let mut items = Vec::with_capacity(values.len());
        for expr in values {
            let value = self.eval_expr(expr, scope)?;
            let actual = value.type_of();
            if !element.equals(&actual) {
                return Err(RuntimeError::type_mismatch(format!(
                    "element of type {actual} in a collection of {element}"
                ))
                .into());
            }
            items.push(value.deep_clone());
        }
        Ok(items)
    }

    fn eval_array_literal(
        &mut self,
        size: &Expr,
        element: &TypeAnnotation,
        values: &[Expr],
        scope: &Scope,
    ) -> EvalResult {
        let size = self.array_size(size, scope)?;
        let element = self.resolve_type(&element.ty, scope)?;
        if values.len() > size {
            return Err(RuntimeError::range(format!(
                "{} values do not fit in an array of size {size}",
                values.len()
            ))
            .into());
        }
        let mut items = self.eval_elements(&element, values, scope)?;
        while items.len() < size {
            items.push(element.default_value());
        }
        Ok(Value::Array(ArrayValue::new(element, items)))
    }

    fn eval_map_literal(
        &mut self,
        key: &TypeAnnotation,
        value: &TypeAnnotation,
        entries: &[(Expr, Expr)],
        scope: &Scope,
    ) -> EvalResult {
        let key_type = self.resolve_type(&key.ty, scope)?;
        let value_type = self.resolve_type(&value.ty, scope)?;
        let map = MapValue::new(key_type, value_type);
        for (key_expr, value_expr) in entries {
            let key = self.eval_expr(key_expr, scope)?;
            let value = self.eval_expr(value_expr, scope)?;
            map.set(key, value)?;
        }
        Ok(Value::Map(map))
    }

    fn eval_range(
        &mut self,
        start: &Expr,
        end: &Expr,
        step: Option<&Expr>,
        scope: &Scope,
    ) -> EvalResult {
        let lo = self.eval_expr(start, scope)?.expect_number("range start")?;
        let hi = self.eval_expr(end, scope)?.expect_number("range end")?;
        let step = match step {
            Some(expr) => self.eval_expr(expr, scope)?.expect_number("range step")?,
            None if hi >= lo => 1.0,
            None => -1.0,
        };
        Ok(Value::Array(build_range(lo, hi, step)?))
    }

    /// `owner.name` for every kind of owner.
    pub(crate) fn member_of(&mut self, owner: Value, name: &Identifier) -> EvalResult {
        let value = match owner {
            Value::Pointer(pointer) => return self.member_of(pointer.load()?, name),
            Value::Struct(instance) => self.struct_member(&instance, &name.name)?,
            Value::StructDef(def) => match def.static_cell(&name.name) {
                Some(cell) => cell.load(),
                None => {
                    return Err(RuntimeError::UnknownMember {
                        owner: def.name.clone(),
                        name: name.name.clone(),
                    }
                    .into())
                }
            },
            Value::Module(module) => module.get(&name.name)?,
            Value::Host(host) => host.member(&host, &name.name)?,
            other => methods::lookup(&other, &name.name)?,
        };
        Ok(value)
    }
}

/// Numbers `lo, lo + step, ...` up to and including `hi`.
pub(crate) fn build_range(lo: f64, hi: f64, step: f64) -> RuntimeResult<ArrayValue> {
    if step == 0.0 || !step.is_finite() {
        return Err(RuntimeError::range("range step must be a non-zero number"));
    }
    let distance = hi - lo;
    let count = if step * distance >= 0.0 {
        (distance / step).floor() + 1.0
    } else {
        0.0
    };
    if count > MAX_SEQUENCE_LEN as f64 {
        return Err(RuntimeError::range(format!(
            "range of {} elements is too large",
            format_number(count)
        )));
    }
    let items = (0..count as usize)
        .map(|i| Value::Number(lo + i as f64 * step))
        .collect();
    Ok(ArrayValue::new(Type::Number, items))
}

/// `owner[index]` for arrays, slices, maps and strings.
pub(crate) fn index_value(owner: Value, index: Value) -> RuntimeResult<Value> {
    match owner {
        Value::Array(array) => array.get(index.expect_integer("array index")?),
        Value::Slice(slice) => slice.get(index.expect_integer("slice index")?),
        Value::Map(map) => map.get(&index),
        Value::String(text) => {
            let chars: Vec<char> = text.chars().collect();
            let slot = crate::runtime::value::normalize_index(
                index.expect_integer("string index")?,
                chars.len(),
            )?;
            Ok(Value::String(chars[slot].to_string()))
        }
        Value::Pointer(pointer) => index_value(pointer.load()?, index),
        Value::Nil => Err(RuntimeError::NilDereference),
        other => Err(RuntimeError::type_mismatch(format!(
            "cannot index {}",
            other.type_of()
        ))),
    }
}

pub(crate) fn binary_op(op: BinaryOp, left: Value, right: Value) -> RuntimeResult<Value> {
    use BinaryOp::*;

    let value = match (op, &left, &right) {
        (Add, Value::Number(a), Value::Number(b)) => Value::Number(a + b),
        (Add, Value::String(a), Value::String(b)) => Value::String(format!("{a}{b}")),
        (Sub, Value::Number(a), Value::Number(b)) => Value::Number(a - b),
        (Mul, Value::Number(a), Value::Number(b)) => Value::Number(a * b),
        (Div, Value::Number(_), Value::Number(b)) if *b == 0.0 => {
            return Err(RuntimeError::DivisionByZero)
        }
        (Div, Value::Number(a), Value::Number(b)) => Value::Number(a / b),
        (Rem, Value::Number(_), Value::Number(b)) if *b == 0.0 => {
            return Err(RuntimeError::ModuloByZero)
        }
        (Rem, Value::Number(a), Value::Number(b)) => Value::Number(a % b),
        (Eq, _, _) => Value::Bool(left.equals(&right)),
        (NotEq, _, _) => Value::Bool(!left.equals(&right)),
        (Lt | LtEq | Gt | GtEq, Value::Number(a), Value::Number(b)) => {
            Value::Bool(compare(op, a.partial_cmp(b)))
        }
        (Lt | LtEq | Gt | GtEq, Value::String(a), Value::String(b)) => {
            Value::Bool(compare(op, Some(a.cmp(b))))
        }
        (BitAnd | BitOr, Value::Number(_), Value::Number(_)) => {
            let a = left.expect_integer("bitwise operand")?;
            let b = right.expect_integer("bitwise operand")?;
            let result = if op == BitAnd { a & b } else { a | b };
            Value::Number(result as f64)
        }
        (And | Or, Value::Bool(a), Value::Bool(b)) => {
            Value::Bool(if op == And { *a && *b } else { *a || *b })
        }
        (NilCoalesce, Value::Nil, _) => right,
        (NilCoalesce, _, _) => left,
        _ => {
            return Err(RuntimeError::type_mismatch(format!(
                "operator `{}` cannot be applied to {} and {}",
                op.symbol(),
                left.type_of(),
                right.type_of()
            )))
        }
    };
    Ok(value)
}

fn compare(op: BinaryOp, ordering: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering::*;
    match (op, ordering) {
        (_, None) => false,
        (BinaryOp::Lt, Some(ord)) => ord == Less,
        (BinaryOp::LtEq, Some(ord)) => ord != Greater,
        (BinaryOp::Gt, Some(ord)) => ord == Greater,
        (BinaryOp::GtEq, Some(ord)) => ord != Less,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: f64) -> Value {
        Value::Number(v)
    }

    #[test]
    fn arithmetic_and_concatenation() {
        assert!(matches!(binary_op(BinaryOp::Add, n(3.0), n(4.0)), Ok(Value::Number(v)) if v == 7.0));
        assert!(matches!(
            binary_op(BinaryOp::Add, Value::String("a".into()), Value::String("b".into())),
            Ok(Value::String(s)) if s == "ab"
        ));
        assert!(matches!(
            binary_op(BinaryOp::Add, Value::String("a".into()), n(1.0)),
            Err(RuntimeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn division_and_modulo_by_zero_fail() {
        assert!(matches!(
            binary_op(BinaryOp::Div, n(1.0), n(0.0)),
            Err(RuntimeError::DivisionByZero)
        ));
        assert!(matches!(
            binary_op(BinaryOp::Rem, n(1.0), n(0.0)),
            Err(RuntimeError::ModuloByZero)
        ));
    }

    #[test]
    fn equality_across_types_is_false() {
        assert!(matches!(
            binary_op(BinaryOp::Eq, n(1.0), Value::String("1".into())),
            Ok(Value::Bool(false))
        ));
        assert!(matches!(
            binary_op(BinaryOp::Eq, Value::Nil, Value::Nil),
            Ok(Value::Bool(true))
        ));
    }

    #[test]
    fn bitwise_needs_integers() {
        assert!(matches!(binary_op(BinaryOp::BitAnd, n(6.0), n(3.0)), Ok(Value::Number(v)) if v == 2.0));
        assert!(matches!(binary_op(BinaryOp::BitOr, n(4.0), n(1.0)), Ok(Value::Number(v)) if v == 5.0));
        assert!(binary_op(BinaryOp::BitOr, n(1.5), n(1.0)).is_err());
    }

    #[test]
    fn range_lengths() {
        assert_eq!(build_range(0.0, 10.0, 2.0).map(|a| a.len()).ok(), Some(6));
        assert_eq!(build_range(10.0, 0.0, -3.0).map(|a| a.len()).ok(), Some(4));
        assert_eq!(build_range(0.0, 10.0, -1.0).map(|a| a.len()).ok(), Some(0));
        assert_eq!(build_range(1.0, 1.0, 1.0).map(|a| a.len()).ok(), Some(1));
        assert!(build_range(0.0, 1.0, 0.0).is_err());
    }
}
