use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    reference::Reference,
    types::Type,
};
use std::{cell::RefCell, collections::HashMap, rc::Rc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclarationKind {
    Function,
    Struct,
    Interface,
}

/// A name announced before its definition is available.
#[derive(Clone, Debug)]
struct ForwardDeclaration {
    kind: DeclarationKind,
    complete: bool,
    /// Type shell for structs and interfaces, filled in on completion.
    shell: Option<Type>,
}

struct Frame {
    storage: RefCell<HashMap<String, Rc<Reference>>>,
    declarations: RefCell<HashMap<String, Vec<ForwardDeclaration>>>,
    parent: Option<Scope>,
}

/// Lexical scope. Cloning shares the frame: closures keep their defining
/// scope alive and observe later mutations.
#[derive(Clone)]
pub struct Scope(Rc<Frame>);

impl Scope {
    pub fn root() -> Self {
        Self::with_parent(None)
    }

    pub fn child(&self) -> Self {
        Self::with_parent(Some(self.clone()))
    }

    fn with_parent(parent: Option<Scope>) -> Self {
        Scope(Rc::new(Frame {
            storage: RefCell::new(HashMap::new()),
            declarations: RefCell::new(HashMap::new()),
            parent,
        }))
    }

    pub fn same_as(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Binds `reference` in this scope. Shadowing an outer name is fine;
    /// repeating a name within one scope is not.
    pub fn declare(&self, reference: Rc<Reference>) -> RuntimeResult<()> {
        let mut storage = self.0.storage.borrow_mut();
        if storage.contains_key(reference.name()) {
            return Err(RuntimeError::Redeclaration {
                name: reference.name().to_string(),
            });
        }
        storage.insert(reference.name().to_string(), reference);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Rc<Reference>> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(found) = current.0.storage.borrow().get(name) {
                return Some(found.clone());
            }
            scope = current.0.parent.as_ref();
        }
        None
    }

    pub fn resolve(&self, name: &str) -> RuntimeResult<Rc<Reference>> {
        self.lookup(name).ok_or_else(|| RuntimeError::UnknownSymbol {
            name: name.to_string(),
        })
    }

    pub fn declare_forward(
        &self,
        name: &str,
        kind: DeclarationKind,
        shell: Option<Type>,
    ) -> RuntimeResult<()> {
        let mut declarations = self.0.declarations.borrow_mut();
        let records = declarations.entry(name.to_string()).or_default();
        if records.iter().any(|record| record.complete) {
            return Err(RuntimeError::AlreadyDefined {
                name: name.to_string(),
            });
        }
        records.push(ForwardDeclaration {
            kind,
            complete: false,
            shell,
        });
        Ok(())
    }

    /// Shell of the first pending forward declaration of `name` in this scope.
    pub fn pending_shell(&self, name: &str) -> Option<Type> {
        self.0
            .declarations
            .borrow()
            .get(name)
            .and_then(|records| records.iter().find(|record| !record.complete))
            .and_then(|record| record.shell.clone())
    }

    /// Marks the pending forward declaration of `name` complete and installs
    /// its concrete reference.
    pub fn complete_declaration(&self, name: &str, reference: Rc<Reference>) -> RuntimeResult<()> {
        {
            let mut declarations = self.0.declarations.borrow_mut();
            let records = declarations
                .get_mut(name)
                .ok_or_else(|| RuntimeError::UnknownSymbol {
                    name: name.to_string(),
                })?;
            let record = records
                .iter_mut()
                .find(|record| !record.complete)
                .ok_or_else(|| RuntimeError::AlreadyDefined {
                    name: name.to_string(),
                })?;
            record.complete = true;
        }
        self.declare(reference)
    }

    /// Struct or interface type announced by a forward declaration anywhere up
    /// the chain, for annotations that mention a type before it completes.
    pub fn forward_type(&self, name: &str) -> Option<Type> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            let found = current.0.declarations.borrow().get(name).and_then(|records| {
                records
                    .iter()
                    .filter(|record| record.kind != DeclarationKind::Function)
                    .find_map(|record| record.shell.clone())
            });
            if found.is_some() {
                return found;
            }
            scope = current.0.parent.as_ref();
        }
        None
    }

    /// Bindings of this scope only, sorted by name.
    pub fn bindings(&self) -> Vec<(String, Rc<Reference>)> {
        let mut bindings: Vec<_> = self
            .0
            .storage
            .borrow()
            .iter()
            .map(|(name, reference)| (name.clone(), reference.clone()))
            .collect();
        bindings.sort_by(|a, b| a.0.cmp(&b.0));
        bindings
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.bindings().into_iter().map(|(name, _)| name).collect();
        f.debug_struct("Scope").field("names", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::Value;

    fn var(name: &str, n: f64) -> Rc<Reference> {
        Reference::variable(name, Type::Number, Value::Number(n), false)
    }

    #[test]
    fn resolve_walks_parents_and_allows_shadowing() {
        let root = Scope::root();
        root.declare(var("x", 1.0)).expect("declare");
        let child = root.child();
        assert!(matches!(child.resolve("x").map(|r| r.load()), Ok(Value::Number(n)) if n == 1.0));
        child.declare(var("x", 2.0)).expect("shadow");
        assert!(matches!(child.resolve("x").map(|r| r.load()), Ok(Value::Number(n)) if n == 2.0));
        assert!(matches!(
            root.resolve("missing"),
            Err(RuntimeError::UnknownSymbol { .. })
        ));
    }

    #[test]
    fn redeclaration_in_same_scope_fails() {
        let scope = Scope::root();
        scope.declare(var("x", 1.0)).expect("declare");
        assert!(matches!(
            scope.declare(var("x", 2.0)),
            Err(RuntimeError::Redeclaration { .. })
        ));
    }

    #[test]
    fn forward_declarations_complete_once() {
        let scope = Scope::root();
        scope
            .declare_forward("f", DeclarationKind::Function, None)
            .expect("forward");
        scope
            .complete_declaration("f", var("f", 0.0))
            .expect("complete");
        assert!(matches!(
            scope.complete_declaration("f", var("f", 0.0)),
            Err(RuntimeError::AlreadyDefined { .. })
        ));
        assert!(matches!(
            scope.declare_forward("f", DeclarationKind::Function, None),
            Err(RuntimeError::AlreadyDefined { .. })
        ));
    }
}
