//! Named record capabilities for host environments.
//!
//! An [`Environment`] is a registry of callables keyed by name. Binding a
//! series puts a closure in the registry that records one value per call.
//! The closure owns a strong reference to the series, so the series lives
//! as long as the binding does, even after every other handle is dropped.
//!
//! # Usage
//!
//! ```rust
//! use serieslog_core::{Environment, LogFile, Series};
//!
//! let file = LogFile::open_in_memory().unwrap();
//! let env = Environment::new();
//!
//! Series::<u32>::new(&file, "hits").unwrap().bind_as(&env, "hit").unwrap();
//!
//! // Generated code only knows the name and the value type
//! env.invoke("hit", &7u32).unwrap();
//! assert!(env.invoke("hit", &7i64).is_err());
//! ```

use crate::error::{CoreError, CoreResult};
use parking_lot::{Mutex, RwLock};
use serieslog_codec::TypeDesc;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A bound record operation.
pub type RecordFn<T> = Arc<dyn Fn(&T) -> CoreResult<()> + Send + Sync>;

/// Anything that can record values of type `T`.
///
/// Implemented by every series writer, so any of them can be bound.
pub trait Recorder<T>: Send + 'static {
    /// The type callers record.
    fn logical_type(&self) -> TypeDesc;

    /// The type persisted for each record.
    fn storage_type(&self) -> TypeDesc;

    /// Records one value.
    ///
    /// # Errors
    ///
    /// Returns whatever the writer returns.
    fn record(&mut self, value: &T, signal: bool) -> CoreResult<()>;
}

/// Binds `recorder` in `env` under `name`.
///
/// The bound operation records with signalling on. Its signature is the
/// recorder's logical type.
///
/// # Errors
///
/// Returns [`CoreError::BindingFailure`] if the environment refuses the name.
pub fn bind_recorder<T, R>(recorder: Arc<Mutex<R>>, env: &Environment, name: &str) -> CoreResult<()>
where
    T: 'static,
    R: Recorder<T>,
{
    let signature = recorder.lock().logical_type();
    let record: RecordFn<T> = Arc::new(move |value: &T| recorder.lock().record(value, true));
    env.define(name, signature, record)
}

struct Bound {
    signature: TypeDesc,
    callable: Arc<dyn Any + Send + Sync>,
}

/// A registry of named record operations.
#[derive(Default)]
pub struct Environment {
    bindings: RwLock<HashMap<String, Bound>>,
}

impl Environment {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `record` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BindingFailure`] if the name is empty or
    /// already bound.
    pub fn define<T: 'static>(
        &self,
        name: &str,
        signature: TypeDesc,
        record: RecordFn<T>,
    ) -> CoreResult<()> {
        if name.is_empty() {
            return Err(CoreError::binding_failure(name, "name must not be empty"));
        }

        let mut bindings = self.bindings.write();
        if let Some(existing) = bindings.get(name) {
            return Err(CoreError::binding_failure(
                name,
                format!("name already bound to a {} recorder", existing.signature),
            ));
        }
        bindings.insert(
            name.to_string(),
            Bound {
                signature,
                callable: Arc::new(record),
            },
        );
        Ok(())
    }

    /// Looks up a binding, checking that it takes values of type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BindingFailure`] if nothing is bound under
    /// `name` or the binding takes a different type.
    pub fn lookup<T: 'static>(&self, name: &str) -> CoreResult<Binding<T>> {
        let bindings = self.bindings.read();
        let bound = bindings
            .get(name)
            .ok_or_else(|| CoreError::binding_failure(name, "nothing bound under this name"))?;

        let record = Arc::clone(&bound.callable)
            .downcast::<RecordFn<T>>()
            .map_err(|_| {
                CoreError::binding_failure(
                    name,
                    format!("binding records {}, called with another type", bound.signature),
                )
            })?;

        Ok(Binding {
            name: name.to_string(),
            signature: bound.signature.clone(),
            record: Arc::clone(&*record),
        })
    }

    /// Invokes the binding `name` with one value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BindingFailure`] for an unknown name or wrong
    /// type, or the recorder's own error.
    pub fn invoke<T: 'static>(&self, name: &str, value: &T) -> CoreResult<()> {
        self.lookup::<T>(name)?.call(value)
    }

    /// Removes a binding. Returns false if nothing was bound.
    ///
    /// The recorder is released once the last outstanding [`Binding`] to
    /// it is dropped.
    pub fn unbind(&self, name: &str) -> bool {
        self.bindings.write().remove(name).is_some()
    }

    /// Returns true if `name` is bound.
    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.read().contains_key(name)
    }

    /// Returns the signature of a binding.
    pub fn signature(&self, name: &str) -> Option<TypeDesc> {
        self.bindings.read().get(name).map(|b| b.signature.clone())
    }

    /// Returns all bound names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    /// Returns true if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("names", &self.names())
            .finish()
    }
}

/// A resolved binding.
pub struct Binding<T> {
    name: String,
    signature: TypeDesc,
    record: RecordFn<T>,
}

impl<T> Binding<T> {
    /// Records one value through the binding.
    ///
    /// # Errors
    ///
    /// Returns the recorder's error.
    pub fn call(&self, value: &T) -> CoreResult<()> {
        (self.record)(value)
    }

    /// The bound name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The logical type the binding records.
    pub fn signature(&self) -> &TypeDesc {
        &self.signature
    }
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            signature: self.signature.clone(),
            record: Arc::clone(&self.record),
        }
    }
}

impl<T> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("signature", &self.signature.to_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct Summer {
        total: Arc<AtomicU64>,
    }

    impl Recorder<u64> for Summer {
        fn logical_type(&self) -> TypeDesc {
            TypeDesc::U64
        }

        fn storage_type(&self) -> TypeDesc {
            TypeDesc::U64
        }

        fn record(&mut self, value: &u64, _signal: bool) -> CoreResult<()> {
            self.total.fetch_add(*value, Ordering::SeqCst);
            Ok(())
        }
    }

    fn summer() -> (Arc<Mutex<Summer>>, Arc<AtomicU64>) {
        let total = Arc::new(AtomicU64::new(0));
        let recorder = Arc::new(Mutex::new(Summer {
            total: Arc::clone(&total),
        }));
        (recorder, total)
    }

    #[test]
    fn bound_recorder_is_invocable_by_name() {
        let env = Environment::new();
        let (recorder, total) = summer();
        bind_recorder(recorder, &env, "sum").unwrap();

        env.invoke("sum", &3u64).unwrap();
        let binding = env.lookup::<u64>("sum").unwrap();
        binding.call(&4).unwrap();

        assert_eq!(total.load(Ordering::SeqCst), 7);
        assert_eq!(binding.signature(), &TypeDesc::U64);
        assert_eq!(env.names(), vec!["sum"]);
    }

    #[test]
    fn name_collision_is_a_binding_failure() {
        let env = Environment::new();
        bind_recorder(summer().0, &env, "sum").unwrap();
        let err = bind_recorder(summer().0, &env, "sum").unwrap_err();
        assert!(matches!(err, CoreError::BindingFailure { .. }));
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn empty_name_is_rejected() {
        let env = Environment::new();
        assert!(bind_recorder(summer().0, &env, "").is_err());
        assert!(env.is_empty());
    }

    #[test]
    fn wrong_type_and_unknown_name_fail() {
        let env = Environment::new();
        bind_recorder(summer().0, &env, "sum").unwrap();

        assert!(matches!(
            env.invoke("sum", &1u32),
            Err(CoreError::BindingFailure { .. })
        ));
        assert!(matches!(
            env.invoke("missing", &1u64),
            Err(CoreError::BindingFailure { .. })
        ));
    }

    #[test]
    fn binding_keeps_recorder_alive_until_unbound() {
        let env = Environment::new();
        let (recorder, _total) = summer();
        let weak = Arc::downgrade(&recorder);
        bind_recorder(recorder, &env, "sum").unwrap();

        assert!(weak.upgrade().is_some());
        assert!(env.unbind("sum"));
        assert!(weak.upgrade().is_none());
        assert!(!env.unbind("sum"));
    }
}
