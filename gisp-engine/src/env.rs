//! Execution environment.
//!
//! A lexical environment is a chain of frames. Each frame owns its
//! bindings; parents are shared by reference, so many child frames may
//! hang off the same parent. Closures and continuations keep frames
//! alive by holding handles to them.

use std::collections::HashMap;

use smol_str::SmolStr;

use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::value::Value;

#[derive(Debug, Default)]
pub struct Env {
    vars: HashMap<SmolStr, Value>,
    parent: Option<Handle<Env>>,
}

impl Env {
    /// Create a root frame with no parent.
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
            parent: None,
        }
    }

    /// Create a child frame of the given parent.
    pub fn with_parent(parent: Handle<Env>) -> Self {
        Self {
            vars: HashMap::new(),
            parent: Some(parent),
        }
    }

    #[inline]
    pub fn parent(&self) -> Option<&Handle<Env>> {
        self.parent.as_ref()
    }

    /// Bind `name` in this frame, shadowing any outer binding.
    pub fn define(&mut self, name: impl Into<SmolStr>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// Overwrite an existing binding, walking parent frames.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Unbound`] when no frame in the chain binds
    /// `name`.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        if let Some(slot) = self.vars.get_mut(name) {
            *slot = value;
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.borrow_mut().set(name, value),
            None => Err(Error::Unbound(name.into())),
        }
    }

    /// Look up `name`, walking parent frames.
    pub fn get(&self, name: &str) -> Result<Value> {
        if let Some(value) = self.vars.get(name) {
            return Ok(value.clone());
        }
        match &self.parent {
            Some(parent) => parent.borrow().get(name),
            None => Err(Error::Unbound(name.into())),
        }
    }

    #[inline]
    fn has_local(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Find the frame that owns the binding for `name`.
    pub fn locate(env: &Handle<Env>, name: &str) -> Result<Handle<Env>> {
        let mut current = env.clone();
        loop {
            if current.borrow().has_local(name) {
                return Ok(current);
            }
            let parent = current.borrow().parent.clone();
            match parent {
                Some(up) => current = up,
                None => return Err(Error::Unbound(name.into())),
            }
        }
    }

    /// Apply `func` to the stored value of `name` and store the result.
    ///
    /// Returns the stored result. If `func` fails the binding is left
    /// unchanged.
    pub fn update<F>(env: &Handle<Env>, name: &str, func: F) -> Result<Value>
    where
        F: FnOnce(Value) -> Result<Value>,
    {
        let owner = Env::locate(env, name)?;
        let old = owner
            .borrow()
            .vars
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Unbound(name.into()))?;
        let new = func(old)?;
        owner.borrow_mut().vars.insert(name.into(), new.clone());
        Ok(new)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_define_shadows() {
        let root = Handle::new(Env::new());
        root.borrow_mut().define("x", Value::Int(1));

        let child = Handle::new(Env::with_parent(root.clone()));
        assert_eq!(child.borrow().get("x").unwrap(), Value::Int(1));

        child.borrow_mut().define("x", Value::Int(2));
        assert_eq!(child.borrow().get("x").unwrap(), Value::Int(2));
        assert_eq!(root.borrow().get("x").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_set_walks_parents() {
        let root = Handle::new(Env::new());
        root.borrow_mut().define("x", Value::Int(1));

        let child = Handle::new(Env::with_parent(root.clone()));
        child.borrow_mut().set("x", Value::Int(5)).unwrap();
        assert_eq!(root.borrow().get("x").unwrap(), Value::Int(5));

        assert!(child.borrow_mut().set("missing", Value::Empty).is_err());
    }

    #[test]
    fn test_update() {
        let root = Handle::new(Env::new());
        root.borrow_mut().define("n", Value::Int(41));

        let result = Env::update(&root, "n", |old| match old {
            Value::Int(n) => Ok(Value::Int(n + 1)),
            other => panic!("expected int, got {other:?}"),
        })
        .unwrap();

        assert_eq!(result, Value::Int(42));
        assert_eq!(root.borrow().get("n").unwrap(), Value::Int(42));
    }

    #[test]
    fn test_update_failure_keeps_binding() {
        let root = Handle::new(Env::new());
        root.borrow_mut().define("n", Value::Int(7));

        let result = Env::update(&root, "n", |_| {
            Err(crate::error::Error::Type("no".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(root.borrow().get("n").unwrap(), Value::Int(7));
    }
}
