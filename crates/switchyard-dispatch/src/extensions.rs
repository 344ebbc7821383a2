//! State handed from one step to the steps after it.
//!
//! Middleware typically resolves something from the request (a session, a
//! user record, a database handle) and [`provide`](Extensions::provide)s it.
//! Later steps read it back by type. A step that cannot run without a value
//! uses [`require`](Extensions::require), whose error can be handed straight
//! to the pipeline to abort the dispatch.

use std::any::{self, Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use crate::error::DispatchError;

struct Slot {
    type_name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

/// Typed values attached to one [`RequestContext`](crate::RequestContext).
///
/// At most one value per type. Values are dropped with the context.
///
/// ```rust
/// use switchyard_dispatch::RequestContext;
///
/// struct CurrentUser { id: u64 }
///
/// let mut ctx = RequestContext::new("/me");
/// ctx.extensions.provide(CurrentUser { id: 7 });
///
/// assert_eq!(ctx.extensions.require::<CurrentUser>()?.id, 7);
/// # Ok::<(), switchyard_dispatch::DispatchError>(())
/// ```
#[derive(Default)]
pub struct Extensions {
    slots: HashMap<TypeId, Slot>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value`, handing back the value it displaced.
    pub fn provide<T: Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        let slot = Slot {
            type_name: any::type_name::<T>(),
            value: Box::new(value),
        };
        self.slots
            .insert(TypeId::of::<T>(), slot)
            .and_then(|old| old.value.downcast().ok().map(|v| *v))
    }

    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.slots
            .get(&TypeId::of::<T>())
            .and_then(|slot| slot.value.downcast_ref())
    }

    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.slots
            .get_mut(&TypeId::of::<T>())
            .and_then(|slot| slot.value.downcast_mut())
    }

    /// Returns the value of type `T`, or a step error naming the type.
    ///
    /// A missing value means an earlier step did not run or did not provide
    /// it, which aborts the dispatch rather than throwing.
    pub fn require<T: 'static>(&self) -> Result<&T, DispatchError> {
        self.get::<T>().ok_or_else(|| {
            DispatchError::message(format!(
                "no {} was provided by an earlier step",
                any::type_name::<T>()
            ))
        })
    }

    /// Removes and returns the value of type `T`.
    pub fn take<T: 'static>(&mut self) -> Option<T> {
        self.slots
            .remove(&TypeId::of::<T>())
            .and_then(|slot| slot.value.downcast().ok().map(|v| *v))
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.slots.contains_key(&TypeId::of::<T>())
    }

    /// Type names of the stored values, sorted.
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.slots.values().map(|slot| slot.type_name).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.type_names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Session(String);

    struct Attempts(u32);

    #[test]
    fn test_provide_displaces_same_type() {
        let mut ext = Extensions::new();
        assert!(ext.provide(Session("a".into())).is_none());
        assert_eq!(ext.provide(Session("b".into())), Some(Session("a".into())));
        assert_eq!(ext.get::<Session>(), Some(&Session("b".into())));
        assert_eq!(ext.len(), 1);
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let mut ext = Extensions::new();
        ext.provide(Attempts(1));
        if let Some(attempts) = ext.get_mut::<Attempts>() {
            attempts.0 += 1;
        }
        assert_eq!(ext.get::<Attempts>().map(|a| a.0), Some(2));
    }

    #[test]
    fn test_require_missing_is_step_error() {
        let ext = Extensions::new();
        let err = ext.require::<Session>().unwrap_err();
        assert!(matches!(err, DispatchError::Step(_)));
        assert!(err.to_string().contains("Session"));
    }

    #[test]
    fn test_take_removes() {
        let mut ext = Extensions::new();
        ext.provide(Session("a".into()));
        assert_eq!(ext.take::<Session>(), Some(Session("a".into())));
        assert!(!ext.contains::<Session>());
        assert!(ext.is_empty());
    }

    #[test]
    fn test_debug_lists_type_names() {
        let mut ext = Extensions::new();
        ext.provide(Attempts(0));
        ext.provide(Session("a".into()));

        let names = ext.type_names();
        assert_eq!(names.len(), 2);
        assert!(names.iter().any(|n| n.ends_with("Attempts")));
        assert!(format!("{:?}", ext).contains("Session"));
    }
}
