//! Variable bindings visible to a rule.

use std::collections::BTreeMap;
use std::fmt;

use crate::convert::convert;
use crate::error::{EvalError, EvalResult};
use crate::host::{Bindable, Reference};
use crate::value::{Type, Value};

/// A named slot: either a host reference or a rule-local value.
enum Slot {
    External(Box<dyn Reference>),
    Local { ty: Type, value: Value },
}

/// Named data bindings for rule evaluation.
///
/// External bindings are host references: reads load the host's current
/// value and writes convert to its declared type before storing. Names a
/// rule assigns without a binding become locals, typed after their first
/// value. Locals persist across evaluations until [`DataContext::clear_locals`].
#[derive(Default)]
pub struct DataContext {
    slots: BTreeMap<String, Slot>,
}

impl DataContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a host reference under `name`.
    pub fn bind(&mut self, name: impl Into<String>, target: impl Into<Bindable>) -> EvalResult<()> {
        let name = name.into();
        if self.slots.contains_key(&name) {
            return Err(EvalError::DuplicateBinding { name });
        }
        match target.into() {
            Bindable::Ref(reference) => {
                tracing::debug!(%name, ty = %reference.declared_type(), "data bound");
                self.slots.insert(name, Slot::External(reference));
                Ok(())
            }
            Bindable::Value(_) => Err(EvalError::NotAReference { name }),
        }
    }

    /// Current value of `name`.
    pub fn get(&self, name: &str) -> EvalResult<Value> {
        match self.slots.get(name) {
            Some(Slot::External(reference)) => Ok(reference.load()),
            Some(Slot::Local { value, .. }) => Ok(value.clone()),
            None => Err(EvalError::UnboundVariable {
                name: name.to_string(),
            }),
        }
    }

    /// Assign `value` to `name`, converting to the slot's type. An unknown
    /// name becomes a local typed after `value`.
    pub fn set(&mut self, name: &str, value: Value) -> EvalResult<()> {
        match self.slots.get_mut(name) {
            Some(Slot::External(reference)) => {
                let converted = convert(value, &reference.declared_type())?;
                reference.store(converted)
            }
            Some(Slot::Local { ty, value: slot }) => {
                *slot = convert(value, ty)?;
                Ok(())
            }
            None => {
                tracing::trace!(name, ty = %value.ty(), "local created");
                self.slots.insert(
                    name.to_string(),
                    Slot::Local {
                        ty: value.ty(),
                        value,
                    },
                );
                Ok(())
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Declared type of the binding, if any.
    pub fn type_of(&self, name: &str) -> Option<Type> {
        match self.slots.get(name)? {
            Slot::External(reference) => Some(reference.declared_type()),
            Slot::Local { ty, .. } => Some(ty.clone()),
        }
    }

    pub fn is_local(&self, name: &str) -> bool {
        matches!(self.slots.get(name), Some(Slot::Local { .. }))
    }

    /// Drop every local, keeping host bindings.
    pub fn clear_locals(&mut self) {
        self.slots.retain(|_, slot| matches!(slot, Slot::External(_)));
    }
}

impl fmt::Debug for DataContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, slot) in &self.slots {
            match slot {
                Slot::External(reference) => map.entry(name, &format_args!("&{}", reference.declared_type())),
                Slot::Local { ty, .. } => map.entry(name, &format_args!("local {ty}")),
            };
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn bind_rejects_plain_values() {
        let mut ctx = DataContext::new();
        assert!(matches!(
            ctx.bind("x", Value::Int(1)),
            Err(EvalError::NotAReference { name }) if name == "x"
        ));
        assert!(!ctx.contains("x"));
    }

    #[test]
    fn bind_rejects_duplicates() {
        let mut ctx = DataContext::new();
        ctx.bind("x", Rc::new(RefCell::new(1i64))).unwrap();
        assert!(matches!(
            ctx.bind("x", Rc::new(RefCell::new(2i64))),
            Err(EvalError::DuplicateBinding { .. })
        ));
    }

    #[test]
    fn set_writes_through_to_host() {
        let value = Rc::new(RefCell::new(0i64));
        let mut ctx = DataContext::new();
        ctx.bind("value", value.clone()).unwrap();
        ctx.set("value", Value::Float64(10.9)).unwrap();
        assert_eq!(*value.borrow(), 10);
        *value.borrow_mut() = 42;
        assert_eq!(ctx.get("value").unwrap(), Value::Int(42));
    }

    #[test]
    fn unknown_names_become_typed_locals() {
        let mut ctx = DataContext::new();
        assert!(matches!(ctx.get("a"), Err(EvalError::UnboundVariable { .. })));
        ctx.set("a", Value::Int(1)).unwrap();
        assert!(ctx.is_local("a"));
        ctx.set("a", Value::Float64(2.7)).unwrap();
        assert_eq!(ctx.get("a").unwrap(), Value::Int(2));
        assert!(ctx.set("a", Value::from("x")).is_err());
    }

    #[test]
    fn clear_locals_keeps_bindings() {
        let mut ctx = DataContext::new();
        ctx.bind("x", Rc::new(RefCell::new(1i64))).unwrap();
        ctx.set("tmp", Value::Int(1)).unwrap();
        ctx.clear_locals();
        assert!(ctx.contains("x"));
        assert!(!ctx.contains("tmp"));
    }
}
