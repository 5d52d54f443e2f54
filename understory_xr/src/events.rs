// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raw controller events and handedness-filtered subscriptions.
//!
//! These are the device-level signals (select, squeeze, connect, disconnect) before
//! any hover-based routing. Subscribers can restrict themselves to one handedness;
//! the filter is checked against the controller's input source at delivery time, and
//! a controller without an input source passes every filter.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::controller::Controller;
use crate::interaction::InteractionKind;
use crate::types::Handedness;

/// Kinds of raw controller events.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ControllerEventKind {
    /// A primary action completed.
    Select,
    /// A primary action began.
    SelectStart,
    /// A primary action ended.
    SelectEnd,
    /// A grip action completed.
    Squeeze,
    /// A grip action began.
    SqueezeStart,
    /// A grip action ended.
    SqueezeEnd,
    /// A device was bound to the controller slot.
    Connected,
    /// The device left the controller slot.
    Disconnected,
}

impl ControllerEventKind {
    /// The six discrete input kinds routed to interaction handlers.
    pub const DISCRETE: [Self; 6] = [
        Self::Select,
        Self::SelectStart,
        Self::SelectEnd,
        Self::Squeeze,
        Self::SqueezeStart,
        Self::SqueezeEnd,
    ];

    /// WebXR event name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::SelectStart => "selectstart",
            Self::SelectEnd => "selectend",
            Self::Squeeze => "squeeze",
            Self::SqueezeStart => "squeezestart",
            Self::SqueezeEnd => "squeezeend",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }

    /// Handler slot this event is routed to, for the discrete input kinds.
    pub fn interaction(self) -> Option<InteractionKind> {
        match self {
            Self::Select => Some(InteractionKind::Select),
            Self::SelectStart => Some(InteractionKind::SelectStart),
            Self::SelectEnd => Some(InteractionKind::SelectEnd),
            Self::Squeeze => Some(InteractionKind::Squeeze),
            Self::SqueezeStart => Some(InteractionKind::SqueezeStart),
            Self::SqueezeEnd => Some(InteractionKind::SqueezeEnd),
            Self::Connected | Self::Disconnected => None,
        }
    }
}

/// A raw event as reported by the runtime: what happened, on which device slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ControllerEvent {
    /// What happened.
    pub kind: ControllerEventKind,
    /// Device slot the event came from.
    pub controller: u32,
}

impl ControllerEvent {
    /// Shorthand constructor.
    pub fn new(kind: ControllerEventKind, controller: u32) -> Self {
        Self { kind, controller }
    }
}

/// Payload delivered to raw subscribers.
#[derive(Debug)]
pub struct XrEvent<'a, K> {
    /// What happened.
    pub kind: ControllerEventKind,
    /// The controller it happened on.
    pub target: &'a Controller<K>,
}

/// Handle returned by [`ControllerEvents::subscribe`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type SubscriberFn<K> = dyn Fn(&XrEvent<'_, K>);

struct Subscription<K> {
    id: SubscriptionId,
    kind: ControllerEventKind,
    handedness: Option<Handedness>,
    callback: Rc<SubscriberFn<K>>,
}

struct EventsInner<K> {
    next_id: u64,
    subscriptions: Vec<Subscription<K>>,
}

/// Subscriber list for raw controller events.
///
/// Cloning yields another handle to the same list, so a callback may unsubscribe
/// itself while being delivered.
pub struct ControllerEvents<K> {
    inner: Rc<RefCell<EventsInner<K>>>,
}

impl<K> Clone for ControllerEvents<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K> fmt::Debug for ControllerEvents<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerEvents")
            .field("subscriptions", &self.inner.borrow().subscriptions.len())
            .finish_non_exhaustive()
    }
}

impl<K> Default for ControllerEvents<K> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(EventsInner {
                next_id: 0,
                subscriptions: Vec::new(),
            })),
        }
    }
}

impl<K: Copy + 'static> ControllerEvents<K> {
    /// Create an empty subscriber list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `callback` for every `kind` event, optionally only from controllers of
    /// `handedness`.
    pub fn subscribe<F>(
        &self,
        kind: ControllerEventKind,
        handedness: Option<Handedness>,
        callback: F,
    ) -> SubscriptionId
    where
        F: Fn(&XrEvent<'_, K>) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.subscriptions.push(Subscription {
            id,
            kind,
            handedness,
            callback: Rc::new(callback),
        });
        id
    }

    /// Drop a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.subscriptions.len();
        inner.subscriptions.retain(|s| s.id != id);
        inner.subscriptions.len() != before
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.inner.borrow().subscriptions.len()
    }

    /// Returns true if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `kind` on `target` to every matching subscriber in subscription order.
    ///
    /// Returns the number of callbacks invoked.
    pub fn emit(&self, kind: ControllerEventKind, target: &Controller<K>) -> usize {
        let current = target.handedness();
        let matching: Vec<Rc<SubscriberFn<K>>> = self
            .inner
            .borrow()
            .subscriptions
            .iter()
            .filter(|s| s.kind == kind)
            .filter(|s| s.handedness.is_none_or(|h| current.is_none_or(|c| c == h)))
            .map(|s| Rc::clone(&s.callback))
            .collect();
        let event = XrEvent { kind, target };
        for callback in &matching {
            callback(&event);
        }
        matching.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{ControllerNodes, ControllerRegistry};
    use crate::types::InputSource;
    use alloc::vec;
    use core::cell::Cell;

    fn controller(id: u32) -> Controller<u32> {
        Controller::new(
            id,
            ControllerNodes {
                controller: 0,
                grip: 1,
                hand: 2,
            },
        )
    }

    fn connected(handedness: Handedness) -> Controller<u32> {
        let mut reg = ControllerRegistry::new([ControllerNodes {
            controller: 0,
            grip: 1,
            hand: 2,
        }]);
        reg.connect(0, InputSource::controller(handedness)).unwrap();
        reg.get(0).unwrap().clone()
    }

    #[test]
    fn kinds_map_to_interactions() {
        assert_eq!(
            ControllerEventKind::DISCRETE.map(|k| k.interaction().is_some()),
            [true; 6]
        );
        assert_eq!(ControllerEventKind::Connected.interaction(), None);
        assert_eq!(ControllerEventKind::SqueezeEnd.as_str(), "squeezeend");
    }

    #[test]
    fn handedness_filter_applies_at_delivery() {
        let events: ControllerEvents<u32> = ControllerEvents::new();
        let left_hits = Rc::new(Cell::new(0));
        let any_hits = Rc::new(Cell::new(0));
        let l = Rc::clone(&left_hits);
        events.subscribe(ControllerEventKind::Select, Some(Handedness::Left), move |_| {
            l.set(l.get() + 1);
        });
        let a = Rc::clone(&any_hits);
        events.subscribe(ControllerEventKind::Select, None, move |_| a.set(a.get() + 1));

        assert_eq!(events.emit(ControllerEventKind::Select, &connected(Handedness::Right)), 1);
        assert_eq!(events.emit(ControllerEventKind::Select, &connected(Handedness::Left)), 2);
        // No input source: every filter passes.
        assert_eq!(events.emit(ControllerEventKind::Select, &controller(1)), 2);
        // Other kinds are not delivered.
        assert_eq!(events.emit(ControllerEventKind::Squeeze, &controller(1)), 0);

        assert_eq!(left_hits.get(), 2);
        assert_eq!(any_hits.get(), 3);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let events: ControllerEvents<u32> = ControllerEvents::new();
        let id = events.subscribe(ControllerEventKind::Connected, None, |_| {});
        assert_eq!(events.len(), 1);
        assert!(events.unsubscribe(id));
        assert!(!events.unsubscribe(id));
        assert!(events.is_empty());
    }

    #[test]
    fn callback_can_unsubscribe_itself() {
        let events: ControllerEvents<u32> = ControllerEvents::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let own_id = Rc::new(Cell::new(None));

        let handle = events.clone();
        let id_slot = Rc::clone(&own_id);
        let s = Rc::clone(&seen);
        let id = events.subscribe(ControllerEventKind::SelectEnd, None, move |e| {
            s.borrow_mut().push(e.target.id());
            if let Some(id) = id_slot.get() {
                handle.unsubscribe(id);
            }
        });
        own_id.set(Some(id));

        events.emit(ControllerEventKind::SelectEnd, &controller(4));
        events.emit(ControllerEventKind::SelectEnd, &controller(5));
        assert_eq!(*seen.borrow(), vec![4]);
    }
}
