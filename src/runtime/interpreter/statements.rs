use super::Interpreter;
use crate::{
    language::ast::{Block, ForInStmt, ForStmt, Statement, VarDecl},
    runtime::{
        environment::Scope,
        error::{EvalResult, RuntimeError, Signal},
        reference::Reference,
        value::Value,
    },
};

impl Interpreter {
    pub(crate) fn execute_statement(&mut self, statement: &Statement, scope: &Scope) -> EvalResult<()> {
        match statement {
            Statement::Expr(stmt) => {
                self.eval_expr(&stmt.expr, scope)?;
                Ok(())
            }
            Statement::Let(decl) => self.declare_variable(decl, scope),
            Statement::MultiLet(multi) => {
                for decl in &multi.declarations {
                    self.declare_variable(decl, scope)?;
                }
                Ok(())
            }
            Statement::Assign(stmt) => self.execute_assignment(stmt, scope),
            Statement::For(stmt) => self.execute_for(stmt, scope),
            Statement::ForIn(stmt) => self.execute_for_in(stmt, scope),
            Statement::Break(_) => Err(Signal::Break),
            Statement::Continue(_) => Err(Signal::Continue),
            Statement::Return(stmt) => {
                let value = match &stmt.value {
                    Some(expr) => self.eval_expr(expr, scope)?,
                    None => Value::Nil,
                };
                Err(Signal::Return(value))
            }
            Statement::Throw(stmt) => {
                let value = self.eval_expr(&stmt.value, scope)?;
                Err(Signal::Throw(value))
            }
            // Hoisted by `execute_statements`.
            Statement::Function(_) | Statement::Interface(_) | Statement::TypeAlias(_) => Ok(()),
            Statement::Struct(decl) => self.initialize_statics(decl, scope),
            Statement::Import(decl) => self.execute_import(decl, scope),
        }
    }

    fn declare_variable(&mut self, decl: &VarDecl, scope: &Scope) -> EvalResult<()> {
        let value = match &decl.value {
            Some(expr) => Some(self.eval_expr(expr, scope)?),
            None => None,
        };
        let explicit = match &decl.ty {
            Some(annotation) => Some(self.resolve_type(&annotation.ty, scope)?),
            None => None,
        };

        let (ty, value) = match (explicit, value) {
            (None, None) => {
                return Err(RuntimeError::type_mismatch(format!(
                    "`{}` needs a type annotation or an initial value",
                    decl.name.name
                ))
                .into())
            }
            (Some(ty), None) => {
                let value = ty.default_value();
                (ty, value)
            }
            (Some(ty), Some(value)) => {
                let actual = value.type_of();
                if !ty.equals(&actual) {
                    return Err(RuntimeError::type_mismatch(format!(
                        "cannot initialise `{}` of type {ty} with {actual}",
                        decl.name.name
                    ))
                    .into());
                }
                (ty, value)
            }
            (None, Some(value)) => (value.type_of(), value),
        };

        scope.declare(Reference::variable(
            &decl.name.name,
            ty,
            value.deep_clone(),
            decl.constant,
        ))?;
        Ok(())
    }

    fn execute_for(&mut self, stmt: &ForStmt, scope: &Scope) -> EvalResult<()> {
        let loop_scope = scope.child();
        if let Some(init) = &stmt.init {
            self.execute_statement(init, &loop_scope)?;
        }

        loop {
            if let Some(condition) = &stmt.condition {
                let keep_going = self
                    .eval_expr(condition, &loop_scope)?
                    .expect_bool("for condition")?;
                if !keep_going {
                    break;
                }
            }
            if !self.run_loop_body(&stmt.body, &loop_scope)? {
                break;
            }
            for post in &stmt.post {
                self.execute_statement(post, &loop_scope)?;
            }
        }
        Ok(())
    }

    fn execute_for_in(&mut self, stmt: &ForInStmt, scope: &Scope) -> EvalResult<()> {
        let iterable = self.eval_expr(&stmt.iterable, scope)?;
        let is_map = matches!(iterable, Value::Map(_));
        let pairs: Vec<(Value, Value)> = match iterable {
            Value::Array(array) => indexed(array.items()),
            Value::Slice(slice) => indexed(slice.items()),
            Value::Map(map) => map.entries(),
            Value::String(text) => indexed(
                text.chars()
                    .map(|ch| Value::String(ch.to_string()))
                    .collect(),
            ),
            other => {
                return Err(RuntimeError::type_mismatch(format!(
                    "cannot iterate over {}",
                    other.type_of()
                ))
                .into())
            }
        };

        for (key, item) in pairs {
            let iteration = scope.child();
            match &stmt.index {
                Some(index) => {
                    bind_loop_variable(&iteration, &index.name, key)?;
                    bind_loop_variable(&iteration, &stmt.binding.name, item)?;
                }
                // A lone binding over a map walks its keys.
                None if is_map => bind_loop_variable(&iteration, &stmt.binding.name, key)?,
                None => bind_loop_variable(&iteration, &stmt.binding.name, item)?,
            }
            if !self.run_loop_body(&stmt.body, &iteration)? {
                break;
            }
        }
        Ok(())
    }

    /// Runs one iteration. `Ok(false)` means the loop was broken out of.
    fn run_loop_body(&mut self, body: &Block, scope: &Scope) -> EvalResult<bool> {
        match self.eval_block(body, scope) {
            Ok(_) | Err(Signal::Continue) => Ok(true),
            Err(Signal::Break) => Ok(false),
            Err(other) => Err(other),
        }
    }
}

fn indexed(items: Vec<Value>) -> Vec<(Value, Value)> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| (Value::Number(i as f64), item))
        .collect()
}

fn bind_loop_variable(scope: &Scope, name: &str, value: Value) -> EvalResult<()> {
    let ty = value.type_of();
    scope.declare(Reference::variable(name, ty, value.deep_clone(), false))?;
    Ok(())
}
