use super::Interpreter;
use crate::{
    language::ast::{Identifier, InterfaceDecl, StructDecl, StructLiteralField, StructMember},
    runtime::{
        environment::Scope,
        error::{EvalResult, RuntimeError, RuntimeResult},
        reference::Reference,
        types::{Attribute, Type},
        value::{StructInstance, Value},
    },
};
use std::{collections::HashSet, rc::Rc};

impl Interpreter {
    /// Fills in the hoisted shell of a struct. Static attributes start at
    /// their type's default; their initialisers run when the declaration is
    /// reached, see [`Interpreter::initialize_statics`].
    pub(crate) fn complete_struct(&mut self, decl: &StructDecl, scope: &Scope) -> EvalResult<()> {
        let name = &decl.name.name;
        let def = match scope.pending_shell(name) {
            Some(Type::Struct(def)) => def,
            _ => return Err(RuntimeError::AlreadyDefined { name: name.clone() }.into()),
        };

        let mut seen = HashSet::new();
        let mut attributes = Vec::with_capacity(decl.members.len());
        let mut statics = Vec::new();
        for member in &decl.members {
            let member_name = match member {
                StructMember::Attribute(attr) => &attr.name.name,
                StructMember::Method(method) => &method.name.name,
            };
            if !seen.insert(member_name.clone()) {
                return Err(RuntimeError::Redeclaration {
                    name: format!("{name}.{member_name}"),
                }
                .into());
            }

            match member {
                StructMember::Attribute(attr) => {
                    let ty = self.resolve_type(&attr.ty.ty, scope)?;
                    if attr.is_static {
                        statics.push(Reference::variable(
                            member_name,
                            ty.clone(),
                            ty.default_value(),
                            false,
                        ));
                    }
                    attributes.push(Attribute {
                        name: member_name.clone(),
                        ty,
                        is_static: attr.is_static,
                        default: attr.default.clone(),
                    });
                }
                StructMember::Method(method) => {
                    let function = self.make_function(member_name, &method.function, scope)?;
                    let ty = Type::Function(function.ty.clone());
                    statics.push(Reference::variable(
                        member_name,
                        ty.clone(),
                        Value::Function(function),
                        false,
                    ));
                    attributes.push(Attribute {
                        name: member_name.clone(),
                        ty,
                        is_static: true,
                        default: None,
                    });
                }
            }
        }

        tracing::debug!(name = %name, attributes = attributes.len(), "struct defined");
        def.define(attributes, statics, scope.clone());
        scope.complete_declaration(name, Reference::structure(def))?;
        Ok(())
    }

    /// Runs the initialisers of a struct's static attributes.
    pub(crate) fn initialize_statics(&mut self, decl: &StructDecl, scope: &Scope) -> EvalResult<()> {
        let def = match scope.resolve(&decl.name.name)?.load() {
            Value::StructDef(def) => def,
            _ => return Ok(()),
        };
        for member in &decl.members {
            let StructMember::Attribute(attr) = member else {
                continue;
            };
            let (true, Some(default)) = (attr.is_static, &attr.default) else {
                continue;
            };
            let value = self.eval_expr(default, scope)?;
            if let Some(cell) = def.static_cell(&attr.name.name) {
                cell.store(value.deep_clone())?;
            }
        }
        Ok(())
    }

    pub(crate) fn complete_interface(&mut self, decl: &InterfaceDecl, scope: &Scope) -> EvalResult<()> {
        let name = &decl.name.name;
        let iface = match scope.pending_shell(name) {
            Some(Type::Interface(iface)) => iface,
            _ => return Err(RuntimeError::AlreadyDefined { name: name.clone() }.into()),
        };
        let mut methods = Vec::with_capacity(decl.methods.len());
        for method in &decl.methods {
            let signature =
                self.resolve_signature(&method.params, method.return_type.as_ref(), scope)?;
            methods.push((method.name.name.clone(), Rc::new(signature)));
        }
        iface.define(methods);
        scope.complete_declaration(
            name,
            Reference::variable(name, Type::Type, Value::Type(Type::Interface(iface)), true),
        )?;
        Ok(())
    }

    pub(crate) fn instantiate_struct(
        &mut self,
        name: &Identifier,
        fields: &[StructLiteralField],
        scope: &Scope,
    ) -> EvalResult {
        let def = match scope.resolve(&name.name)?.load() {
            Value::StructDef(def) => def,
            other => {
                return Err(RuntimeError::type_mismatch(format!(
                    "`{}` is a {}, not a struct",
                    name.name,
                    other.type_of()
                ))
                .into())
            }
        };

        let mut provided = Vec::with_capacity(fields.len());
        for field in fields {
            match def.attribute(&field.name.name) {
                Some(attr) if !attr.is_static => {}
                Some(_) => {
                    return Err(RuntimeError::type_mismatch(format!(
                        "static attribute `{}` cannot be set in a {} literal",
                        field.name.name, def.name
                    ))
                    .into())
                }
                None => {
                    return Err(RuntimeError::UnknownMember {
                        owner: def.name.clone(),
                        name: field.name.name.clone(),
                    }
                    .into())
                }
            }
            if provided.iter().any(|(n, _): &(String, Value)| *n == field.name.name) {
                return Err(RuntimeError::Redeclaration {
                    name: format!("{}.{}", def.name, field.name.name),
                }
                .into());
            }
            let value = self.eval_expr(&field.value, scope)?;
            provided.push((field.name.name.clone(), value));
        }

        let def_scope = def.scope().unwrap_or_else(|| scope.clone());
        let mut cells = Vec::new();
        for attr in def.instance_attributes() {
            let value = match provided.iter().position(|(n, _)| *n == attr.name) {
                Some(pos) => provided.swap_remove(pos).1,
                None => match &attr.default {
                    Some(default) => self.eval_expr(default, &def_scope)?,
                    None => attr.ty.default_value(),
                },
            };
            let actual = value.type_of();
            if !attr.ty.equals(&actual) {
                return Err(RuntimeError::type_mismatch(format!(
                    "attribute `{}` of {} expects {}, got {actual}",
                    attr.name, def.name, attr.ty
                ))
                .into());
            }
            cells.push(Reference::variable(
                &attr.name,
                attr.ty.clone(),
                value.deep_clone(),
                false,
            ));
        }

        Ok(Value::Struct(StructInstance {
            def,
            fields: Rc::new(cells),
        }))
    }

    /// Reads an attribute off an instance. Methods come back bound to it.
    pub(crate) fn struct_member(&self, instance: &StructInstance, name: &str) -> RuntimeResult<Value> {
        if let Some(field) = instance.field(name) {
            return Ok(field.load());
        }
        match instance.def.static_cell(name).map(|cell| cell.load()) {
            Some(Value::Function(function)) => Ok(Value::Function(function.bind(instance.clone()))),
            Some(value) => Ok(value),
            None => Err(RuntimeError::UnknownMember {
                owner: instance.def.name.clone(),
                name: name.to_string(),
            }),
        }
    }
}
