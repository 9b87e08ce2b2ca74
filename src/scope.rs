use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    fmt,
    rc::Rc,
};

use thiserror::Error;

use crate::{span::Position, value::Value};

/// A shared handle to one lexical level. Closures keep their defining level
/// alive through it.
pub type Scope = Rc<RefCell<SymbolTable>>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot reassign constant '{0}'")]
pub struct ConstantError(pub String);

/// Name to value bindings for one lexical level.
///
/// Plain names shadow per level, but a constant protects its name on every
/// level below the one that declared it.
#[derive(Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Value>,
    constants: HashSet<String>,
    parent: Option<Scope>,
}

impl SymbolTable {
    pub fn root() -> Scope {
        Rc::new(RefCell::new(SymbolTable::default()))
    }

    pub fn child(parent: &Scope) -> Scope {
        Rc::new(RefCell::new(SymbolTable {
            parent: Some(Rc::clone(parent)),
            ..SymbolTable::default()
        }))
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        match self.symbols.get(name) {
            Some(value) => Some(value.clone()),
            None => self.parent.as_ref()?.borrow().get(name),
        }
    }

    pub fn set(&mut self, name: &str, value: Value, is_constant: bool) -> Result<(), ConstantError> {
        if self.constants.contains(name) {
            return Err(ConstantError(name.to_string()));
        }
        if !self.symbols.contains_key(name) && self.constant_in_ancestors(name) {
            return Err(ConstantError(name.to_string()));
        }

        self.symbols.insert(name.to_string(), value);
        if is_constant {
            self.constants.insert(name.to_string());
        }
        Ok(())
    }

    /// Rebinds `name` on the nearest level that already has it, or defines it
    /// on `scope` itself when no level does.
    pub fn assign(scope: &Scope, name: &str, value: Value) -> Result<(), ConstantError> {
        let mut current = Rc::clone(scope);
        loop {
            if current.borrow().symbols.contains_key(name) {
                return current.borrow_mut().set(name, value, false);
            }
            let parent = current.borrow().parent.clone();
            match parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        scope.borrow_mut().set(name, value, false)
    }

    pub fn remove(&mut self, name: &str) -> Result<Option<Value>, ConstantError> {
        if self.constants.contains(name) {
            return Err(ConstantError(name.to_string()));
        }
        Ok(self.symbols.remove(name))
    }

    pub fn is_constant(&self, name: &str) -> bool {
        self.constants.contains(name)
    }

    fn constant_in_ancestors(&self, name: &str) -> bool {
        let mut current = self.parent.clone();
        while let Some(scope) = current {
            let table = scope.borrow();
            if table.constants.contains(name) {
                return true;
            }
            current = table.parent.clone();
        }
        false
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.symbols.keys().collect();
        names.sort();
        f.debug_struct("SymbolTable")
            .field("names", &names)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

/// A call frame: what to call it in a traceback, who called it and from
/// where, and the bindings it evaluates in.
pub struct Context {
    pub label: String,
    pub parent: Option<Rc<Context>>,
    pub entry: Option<Position>,
    pub symbols: Scope,
}

impl Context {
    pub fn new(
        label: impl Into<String>,
        parent: Option<Rc<Context>>,
        entry: Option<Position>,
        symbols: Scope,
    ) -> Self {
        Context {
            label: label.into(),
            parent,
            entry,
            symbols,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.symbols.borrow().get(name)
    }

    pub fn define(&self, name: &str, value: Value, is_constant: bool) -> Result<(), ConstantError> {
        self.symbols.borrow_mut().set(name, value, is_constant)
    }

    pub fn assign(&self, name: &str, value: Value) -> Result<(), ConstantError> {
        SymbolTable::assign(&self.symbols, name, value)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("label", &self.label)
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}
