//! Lexical environments: a singly-linked chain of scopes from the innermost
//! environment out to globals.
//!
//! Environments are shared, reference-counted scope records
//! (`Rc<RefCell<Environment>>`): a closure's captured environment may be
//! referenced by many in-flight calls at once, and several closures created
//! in the same enclosing scope alias the same parent, so mutation through one
//! closure is visible to all.
//!
//! A slot declared without an initializer holds a marker distinct from `nil`;
//! reading it is a runtime error separate from "undefined variable".

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{LoxError, Result};
use crate::value::Value;

/// A named storage slot.  `Uninitialized` is the declared-but-unset marker.
#[derive(Debug, Clone)]
enum Slot {
    Uninitialized,
    Value(Value),
}

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Slot>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    /// The global environment: no enclosing scope.
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    /// A child scope chained to `enclosing`.
    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Bind `name` to `value` in this scope, shadowing any outer binding.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), Slot::Value(value));
    }

    /// Declare `name` without a value (`var a;`).
    pub fn declare(&mut self, name: &str) {
        self.values.insert(name.to_string(), Slot::Uninitialized);
    }

    /// Read `name`, walking the chain outwards.  Used for globals and any
    /// reference the resolver left without a distance.
    pub fn get(&self, name: &str, line: usize) -> Result<Value> {
        match self.values.get(name) {
            Some(Slot::Value(value)) => Ok(value.clone()),

            Some(Slot::Uninitialized) => Err(LoxError::runtime(
                line,
                format!("Variable '{}' has not been initialized.", name),
            )),

            None => match &self.enclosing {
                Some(enclosing) => enclosing.borrow().get(name, line),
                None => Err(LoxError::runtime(
                    line,
                    format!("Undefined variable '{}'.", name),
                )),
            },
        }
    }

    /// Assign to an existing `name`, walking the chain outwards.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), Slot::Value(value));
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Read `name` from the environment exactly `distance` hops up the chain.
    /// Distances come from the resolver and are valid for the tree it walked.
    pub fn get_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        line: usize,
    ) -> Result<Value> {
        let target = Self::ancestor(env, distance);
        let borrowed = target.borrow();

        match borrowed.values.get(name) {
            Some(Slot::Value(value)) => Ok(value.clone()),

            Some(Slot::Uninitialized) => Err(LoxError::runtime(
                line,
                format!("Variable '{}' has not been initialized.", name),
            )),

            None => Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            )),
        }
    }

    /// Assign `name` in the environment exactly `distance` hops up the chain.
    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
    ) {
        let target = Self::ancestor(env, distance);
        target
            .borrow_mut()
            .values
            .insert(name.to_string(), Slot::Value(value));
    }

    /// Walk `distance` enclosing links.  The resolver guarantees the chain is
    /// at least that deep for the tree it annotated.
    fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
        let mut current: Rc<RefCell<Environment>> = env.clone();

        for _ in 0..distance {
            let next = current
                .borrow()
                .enclosing
                .as_ref()
                .expect("scope distance exceeds environment chain")
                .clone();

            current = next;
        }

        current
    }
}
