// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interaction registry: per-object handler lists keyed by interaction kind.
//!
//! ## Overview
//!
//! Applications mark objects as interactive by registering [`Handler`]s for an
//! [`InteractionKind`]. The frame engine and router look handlers up here and invoke
//! them with an [`InteractionEvent`].
//!
//! ## Semantics
//!
//! - Handler order is insertion order.
//! - Registering the same handler twice makes it fire twice per event.
//! - Removal drops the first matching handler and is a no-op when nothing matches.
//! - An object's entry is created on its first registration and is never dropped implicitly.
//!
//! [`InteractionRegistry`] is a shared handle. Clones see the same registrations,
//! so a handler may capture a clone and remove itself (or others) while it runs;
//! dispatch always iterates a snapshot of the handler list.
//!
//! ## Example
//!
//! ```
//! use understory_xr::interaction::{Handler, InteractionKind, InteractionRegistry};
//!
//! let registry: InteractionRegistry<u32> = InteractionRegistry::new();
//! let on_select: Handler<u32> = Handler::new(|_event| {});
//! registry.add(7, InteractionKind::Select, on_select.clone());
//! assert!(registry.has(&7, InteractionKind::Select));
//!
//! registry.remove(&7, InteractionKind::Select, &on_select);
//! registry.remove(&7, InteractionKind::Select, &on_select);
//! assert!(!registry.has(&7, InteractionKind::Select));
//! // The entry itself stays.
//! assert_eq!(registry.len(), 1);
//! ```

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use core::hash::Hash;

use hashbrown::HashMap;

use crate::controller::Controller;
use crate::types::Intersection;

/// Handler slots an object can register for.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum InteractionKind {
    /// A controller ray started intersecting the object (or a descendant).
    Hover,
    /// A controller ray stopped intersecting the object.
    Blur,
    /// Select fired while hovered.
    Select,
    /// Select started while hovered.
    SelectStart,
    /// Select ended while hovered.
    SelectEnd,
    /// Select fired while the object was not hovered.
    SelectMissed,
    /// Squeeze fired while hovered.
    Squeeze,
    /// Squeeze started while hovered.
    SqueezeStart,
    /// Squeeze ended while hovered.
    SqueezeEnd,
    /// Squeeze fired while the object was not hovered.
    SqueezeMissed,
    /// The ray is over the object this frame, hovered before or not.
    Move,
}

impl InteractionKind {
    /// Number of kinds.
    pub const COUNT: usize = 11;

    /// All kinds in slot order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Hover,
        Self::Blur,
        Self::Select,
        Self::SelectStart,
        Self::SelectEnd,
        Self::SelectMissed,
        Self::Squeeze,
        Self::SqueezeStart,
        Self::SqueezeEnd,
        Self::SqueezeMissed,
        Self::Move,
    ];

    /// Slot index in [`InteractionKind::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Conventional handler slot name, e.g. `onSelectMissed`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Hover => "onHover",
            Self::Blur => "onBlur",
            Self::Select => "onSelect",
            Self::SelectStart => "onSelectStart",
            Self::SelectEnd => "onSelectEnd",
            Self::SelectMissed => "onSelectMissed",
            Self::Squeeze => "onSqueeze",
            Self::SqueezeStart => "onSqueezeStart",
            Self::SqueezeEnd => "onSqueezeEnd",
            Self::SqueezeMissed => "onSqueezeMissed",
            Self::Move => "onMove",
        }
    }

    /// The fallback kind fired on registered objects that are not hovered.
    ///
    /// Only `Select` and `Squeeze` have one.
    pub fn missed(self) -> Option<Self> {
        match self {
            Self::Select => Some(Self::SelectMissed),
            Self::Squeeze => Some(Self::SqueezeMissed),
            _ => None,
        }
    }
}

/// Payload passed to every handler invocation.
#[derive(Debug)]
pub struct InteractionEvent<'a, K> {
    /// The controller that caused the event.
    pub target: &'a Controller<K>,
    /// The intersection behind this firing; absent for blur and missed events.
    pub intersection: Option<&'a Intersection<K>>,
    /// Every intersection relevant to the controller right now.
    pub intersections: &'a [Intersection<K>],
}

/// A handler's own failure, reported instead of aborting the frame.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Create an error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type returned by wrapped handlers.
pub type HandlerResult = Result<(), HandlerError>;

/// Return types accepted from handler closures.
pub trait IntoHandlerResult {
    /// Convert into a [`HandlerResult`].
    fn into_handler_result(self) -> HandlerResult;
}

impl IntoHandlerResult for () {
    #[inline]
    fn into_handler_result(self) -> HandlerResult {
        Ok(())
    }
}

impl IntoHandlerResult for HandlerResult {
    #[inline]
    fn into_handler_result(self) -> HandlerResult {
        self
    }
}

type HandlerFn<K> = dyn Fn(&InteractionEvent<'_, K>) -> HandlerResult;

/// A shareable interaction callback.
///
/// Equality is identity: two `Handler`s are equal when they are clones of the same
/// [`Handler::new`] call. This is what [`InteractionRegistry::remove`] matches on.
pub struct Handler<K>(Rc<HandlerFn<K>>);

impl<K: 'static> Handler<K> {
    /// Wrap a closure returning `()` or [`HandlerResult`].
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&InteractionEvent<'_, K>) -> R + 'static,
        R: IntoHandlerResult,
    {
        Self(Rc::new(move |event: &InteractionEvent<'_, K>| {
            f(event).into_handler_result()
        }))
    }
}

impl<K> Handler<K> {
    /// Invoke the handler.
    pub fn call(&self, event: &InteractionEvent<'_, K>) -> HandlerResult {
        (self.0)(event)
    }

    /// Returns true if both handles refer to the same callback.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        core::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl<K> Clone for Handler<K> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<K> PartialEq for Handler<K> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<K> Eq for Handler<K> {}

impl<K> fmt::Debug for Handler<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler")
            .field(&Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// A handler that returned an error during dispatch.
#[derive(Clone, Debug, PartialEq)]
pub struct HandlerFailure<K> {
    /// Object the handler was registered on.
    pub object: K,
    /// Slot the handler was registered in.
    pub kind: InteractionKind,
    /// The returned error.
    pub error: HandlerError,
}

/// Invoke `handlers` in order, collecting failures instead of stopping.
///
/// Returns the number of handlers invoked.
pub(crate) fn invoke<K: Copy + fmt::Debug>(
    handlers: &[Handler<K>],
    object: K,
    kind: InteractionKind,
    event: &InteractionEvent<'_, K>,
    failures: &mut Vec<HandlerFailure<K>>,
) -> usize {
    for handler in handlers {
        if let Err(error) = handler.call(event) {
            tracing::warn!(?object, kind = kind.name(), %error, "interaction handler failed");
            failures.push(HandlerFailure {
                object,
                kind,
                error,
            });
        }
    }
    handlers.len()
}

struct Entry<K> {
    object: K,
    slots: [Vec<Handler<K>>; InteractionKind::COUNT],
}

struct RegistryInner<K> {
    index: HashMap<K, usize>,
    entries: Vec<Entry<K>>,
}

/// Mapping from object to its handler lists, one list per [`InteractionKind`].
///
/// Cloning yields another handle to the same registry.
pub struct InteractionRegistry<K> {
    inner: Rc<RefCell<RegistryInner<K>>>,
}

impl<K> Clone for InteractionRegistry<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K> fmt::Debug for InteractionRegistry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        let handlers: usize = inner
            .entries
            .iter()
            .map(|e| e.slots.iter().map(Vec::len).sum::<usize>())
            .sum();
        f.debug_struct("InteractionRegistry")
            .field("objects", &inner.entries.len())
            .field("handlers", &handlers)
            .finish()
    }
}

impl<K: Copy + Eq + Hash> Default for InteractionRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy + Eq + Hash> InteractionRegistry<K> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(RegistryInner {
                index: HashMap::new(),
                entries: Vec::new(),
            })),
        }
    }

    /// Append `handler` to `object`'s list for `kind`, creating the entry if needed.
    pub fn add(&self, object: K, kind: InteractionKind, handler: Handler<K>) {
        let mut inner = self.inner.borrow_mut();
        let RegistryInner { index, entries } = &mut *inner;
        let slot = *index.entry(object).or_insert_with(|| {
            entries.push(Entry {
                object,
                slots: core::array::from_fn(|_| Vec::new()),
            });
            entries.len() - 1
        });
        entries[slot].slots[kind.index()].push(handler);
    }

    /// Remove the first registration of `handler` for `object` and `kind`.
    ///
    /// Returns whether anything was removed; removing an unknown handler is a no-op.
    pub fn remove(&self, object: &K, kind: InteractionKind, handler: &Handler<K>) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(&slot) = inner.index.get(object) else {
            return false;
        };
        let list = &mut inner.entries[slot].slots[kind.index()];
        match list.iter().position(|h| h.ptr_eq(handler)) {
            Some(i) => {
                list.remove(i);
                true
            }
            None => false,
        }
    }

    /// Returns true if at least one handler is registered for `object` and `kind`.
    pub fn has(&self, object: &K, kind: InteractionKind) -> bool {
        let inner = self.inner.borrow();
        inner
            .index
            .get(object)
            .is_some_and(|&slot| !inner.entries[slot].slots[kind.index()].is_empty())
    }

    /// Snapshot of the handlers for `object` and `kind`, in registration order.
    ///
    /// Empty when nothing is registered.
    pub fn get(&self, object: &K, kind: InteractionKind) -> Vec<Handler<K>> {
        let inner = self.inner.borrow();
        inner
            .index
            .get(object)
            .map(|&slot| inner.entries[slot].slots[kind.index()].clone())
            .unwrap_or_default()
    }

    /// Returns true if `object` has an entry (even if all its lists are now empty).
    pub fn contains(&self, object: &K) -> bool {
        self.inner.borrow().index.contains_key(object)
    }

    /// Snapshot of every object with an entry, in first-registration order.
    pub fn objects(&self) -> Vec<K> {
        self.inner.borrow().entries.iter().map(|e| e.object).collect()
    }

    /// Number of objects with an entry.
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Returns true if no object has ever been registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Declarative interaction configuration for one object.
///
/// Build it with [`Interactive::with`] and attach it with [`Interactive::mount`].
pub struct Interactive<K> {
    slots: [Option<Handler<K>>; InteractionKind::COUNT],
}

impl<K> Default for Interactive<K> {
    fn default() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
        }
    }
}

impl<K> Clone for Interactive<K> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
        }
    }
}

impl<K> fmt::Debug for Interactive<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for kind in InteractionKind::ALL {
            if self.slots[kind.index()].is_some() {
                list.entry(&kind.name());
            }
        }
        list.finish()
    }
}

impl<K: Copy + Eq + Hash> Interactive<K> {
    /// Empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the handler for `kind`, replacing any previous one.
    pub fn with(mut self, kind: InteractionKind, handler: Handler<K>) -> Self {
        self.slots[kind.index()] = Some(handler);
        self
    }

    /// The handler configured for `kind`, if any.
    pub fn handler(&self, kind: InteractionKind) -> Option<&Handler<K>> {
        self.slots[kind.index()].as_ref()
    }

    /// Register every configured slot for `object`.
    pub fn mount(&self, registry: &InteractionRegistry<K>, object: K) -> InteractiveMount<K> {
        let mut handlers = Vec::new();
        for kind in InteractionKind::ALL {
            if let Some(h) = &self.slots[kind.index()] {
                registry.add(object, kind, h.clone());
                handlers.push((kind, h.clone()));
            }
        }
        InteractiveMount { object, handlers }
    }
}

/// Registrations made by [`Interactive::mount`].
#[derive(Debug)]
pub struct InteractiveMount<K> {
    object: K,
    handlers: Vec<(InteractionKind, Handler<K>)>,
}

impl<K: Copy + Eq + Hash> InteractiveMount<K> {
    /// The object the configuration was mounted on.
    pub fn object(&self) -> K {
        self.object
    }

    /// Remove exactly the registrations this mount made.
    pub fn unmount(self, registry: &InteractionRegistry<K>) {
        for (kind, handler) in &self.handlers {
            registry.remove(&self.object, *kind, handler);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Controller, ControllerNodes};
    use alloc::vec;
    use core::cell::Cell;

    fn controller() -> Controller<u32> {
        Controller::new(
            0,
            ControllerNodes {
                controller: 100,
                grip: 101,
                hand: 102,
            },
        )
    }

    fn counting(counter: &Rc<Cell<u32>>) -> Handler<u32> {
        let c = Rc::clone(counter);
        Handler::new(move |_e: &InteractionEvent<'_, u32>| c.set(c.get() + 1))
    }

    #[test]
    fn kinds_are_indexed_in_order() {
        for (i, k) in InteractionKind::ALL.iter().enumerate() {
            assert_eq!(k.index(), i);
        }
        assert_eq!(InteractionKind::Select.missed(), Some(InteractionKind::SelectMissed));
        assert_eq!(InteractionKind::Squeeze.missed(), Some(InteractionKind::SqueezeMissed));
        assert_eq!(InteractionKind::SelectStart.missed(), None);
        assert_eq!(InteractionKind::SqueezeEnd.missed(), None);
    }

    #[test]
    fn add_get_preserves_insertion_order() {
        let reg: InteractionRegistry<u32> = InteractionRegistry::new();
        let a: Handler<u32> = Handler::new(|_e| {});
        let b: Handler<u32> = Handler::new(|_e| {});
        reg.add(1, InteractionKind::Hover, a.clone());
        reg.add(1, InteractionKind::Hover, b.clone());
        assert_eq!(reg.get(&1, InteractionKind::Hover), vec![a, b]);
        assert!(reg.get(&1, InteractionKind::Blur).is_empty());
        assert!(reg.get(&2, InteractionKind::Hover).is_empty());
    }

    #[test]
    fn removal_is_idempotent_and_isolated() {
        let reg: InteractionRegistry<u32> = InteractionRegistry::new();
        let h: Handler<u32> = Handler::new(|_e| {});
        let never_added: Handler<u32> = Handler::new(|_e| {});
        reg.add(1, InteractionKind::Select, h.clone());
        reg.add(2, InteractionKind::Select, h.clone());

        assert!(!reg.remove(&1, InteractionKind::Select, &never_added));
        assert!(!reg.remove(&3, InteractionKind::Select, &h));
        assert!(reg.remove(&1, InteractionKind::Select, &h));
        assert!(!reg.remove(&1, InteractionKind::Select, &h));

        assert!(!reg.has(&1, InteractionKind::Select));
        assert!(reg.has(&2, InteractionKind::Select), "other objects unaffected");
        assert!(reg.contains(&1), "entry is never dropped implicitly");
    }

    #[test]
    fn duplicate_registration_is_not_deduplicated() {
        let reg: InteractionRegistry<u32> = InteractionRegistry::new();
        let h: Handler<u32> = Handler::new(|_e| {});
        reg.add(1, InteractionKind::Select, h.clone());
        reg.add(1, InteractionKind::Select, h.clone());
        assert_eq!(reg.get(&1, InteractionKind::Select).len(), 2);
        // Removal drops one registration at a time.
        reg.remove(&1, InteractionKind::Select, &h);
        assert_eq!(reg.get(&1, InteractionKind::Select).len(), 1);
    }

    #[test]
    fn clones_share_state() {
        let reg: InteractionRegistry<u32> = InteractionRegistry::new();
        let other = reg.clone();
        other.add(5, InteractionKind::Move, Handler::new(|_e| {}));
        assert!(reg.has(&5, InteractionKind::Move));
        assert_eq!(reg.objects(), vec![5]);
    }

    #[test]
    fn invoke_collects_failures_and_continues() {
        let counter = Rc::new(Cell::new(0));
        let failing = Handler::new(|_e: &InteractionEvent<'_, u32>| -> HandlerResult {
            Err(HandlerError::new("boom"))
        });
        let handlers = vec![failing, counting(&counter)];
        let ctrl = controller();
        let event = InteractionEvent {
            target: &ctrl,
            intersection: None,
            intersections: &[],
        };
        let mut failures = Vec::new();
        let n = invoke(&handlers, 9, InteractionKind::Blur, &event, &mut failures);
        assert_eq!(n, 2);
        assert_eq!(counter.get(), 1, "later handlers still run");
        assert_eq!(
            failures,
            vec![HandlerFailure {
                object: 9,
                kind: InteractionKind::Blur,
                error: HandlerError::new("boom"),
            }]
        );
    }

    #[test]
    fn interactive_mount_and_unmount() {
        let reg: InteractionRegistry<u32> = InteractionRegistry::new();
        let counter = Rc::new(Cell::new(0));
        let shared = counting(&counter);
        // Someone else registered the same handler on the same slot.
        reg.add(3, InteractionKind::Hover, shared.clone());

        let config = Interactive::new()
            .with(InteractionKind::Hover, shared.clone())
            .with(InteractionKind::Select, counting(&counter));
        let mount = config.mount(&reg, 3);
        assert_eq!(mount.object(), 3);
        assert_eq!(reg.get(&3, InteractionKind::Hover).len(), 2);
        assert!(reg.has(&3, InteractionKind::Select));
        assert!(!reg.has(&3, InteractionKind::Blur));

        mount.unmount(&reg);
        assert_eq!(reg.get(&3, InteractionKind::Hover).len(), 1);
        assert!(!reg.has(&3, InteractionKind::Select));
    }

    #[test]
    fn handler_equality_is_identity() {
        let a: Handler<u32> = Handler::new(|_e| {});
        let b: Handler<u32> = Handler::new(|_e| {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
