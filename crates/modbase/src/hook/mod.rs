//! Hook declarations and the per-mod binding protocol
//!
//! A [`Hook`] is declared once, with a factory that takes the mod it will
//! belong to. Building a mod calls [`Hook::bind`] for each declared hook,
//! producing a [`BoundHook`] whose callback holds a weak reference to that one
//! mod. The callback does nothing until the mod activates it on enable, and
//! stops again as soon as the mod is disabled.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::mod_def::Mod;

mod dispatcher;

pub use dispatcher::{DispatchOutcome, HookDispatcher};

/// When a hook runs relative to the operation it wraps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum HookSlot {
    Pre,
    Post,
}

/// The data a host passes through a hooked event
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HookEvent {
    pub name: String,
    pub args: toml::Table,
    /// Set by the wrapped operation, visible to post-hooks
    pub ret: Option<toml::Value>,
}

impl HookEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

/// Returned by hook callbacks. A pre-hook returning `Block` stops the wrapped
/// operation and the post-hooks from running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HookSignal {
    #[default]
    Continue,
    Block,
}

/// What a mod author writes: the hook body, given the mod it is bound to
pub type HookFactory = Arc<dyn Fn(&Mod, &mut HookEvent) -> HookSignal + Send + Sync>;

/// What the host installs: a hook body already bound to one mod
pub type HookCallback = Arc<dyn Fn(&mut HookEvent) -> HookSignal + Send + Sync>;

#[derive(Clone)]
pub struct Hook {
    identifier: String,
    event: String,
    slot: HookSlot,
    factory: HookFactory,
}

impl Hook {
    pub fn new(
        identifier: impl Into<String>,
        event: impl Into<String>,
        slot: HookSlot,
        factory: impl Fn(&Mod, &mut HookEvent) -> HookSignal + Send + Sync + 'static,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            event: event.into(),
            slot,
            factory: Arc::new(factory),
        }
    }

    pub fn pre(
        identifier: impl Into<String>,
        event: impl Into<String>,
        factory: impl Fn(&Mod, &mut HookEvent) -> HookSignal + Send + Sync + 'static,
    ) -> Self {
        Self::new(identifier, event, HookSlot::Pre, factory)
    }

    pub fn post(
        identifier: impl Into<String>,
        event: impl Into<String>,
        factory: impl Fn(&Mod, &mut HookEvent) -> HookSignal + Send + Sync + 'static,
    ) -> Self {
        Self::new(identifier, event, HookSlot::Post, factory)
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn slot(&self) -> HookSlot {
        self.slot
    }

    /// Produce a callback tied to `owner`. It starts inactive.
    pub fn bind(&self, owner: &Mod) -> BoundHook {
        let active = Arc::new(AtomicBool::new(false));
        let weak = owner.downgrade();
        let factory = Arc::clone(&self.factory);
        let flag = Arc::clone(&active);
        let identifier = self.identifier.clone();

        let callback: HookCallback = Arc::new(move |event: &mut HookEvent| {
            if !flag.load(Ordering::Acquire) {
                return HookSignal::Continue;
            }
            match weak.upgrade() {
                Some(owner) => factory(&owner, event),
                None => {
                    trace!(target: "hooks", hook = %identifier, "Owning mod dropped, skipping");
                    HookSignal::Continue
                }
            }
        });

        BoundHook {
            identifier: self.identifier.clone(),
            event: self.event.clone(),
            slot: self.slot,
            active,
            callback,
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("identifier", &self.identifier)
            .field("event", &self.event)
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

/// A hook bound to one mod instance
pub struct BoundHook {
    identifier: String,
    event: String,
    slot: HookSlot,
    active: Arc<AtomicBool>,
    callback: HookCallback,
}

impl BoundHook {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn slot(&self) -> HookSlot {
        self.slot
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn callback(&self) -> HookCallback {
        Arc::clone(&self.callback)
    }

    pub(crate) fn activate(&self) {
        self.active.store(true, Ordering::Release);
    }

    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }
}

impl fmt::Debug for BoundHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundHook")
            .field("identifier", &self.identifier)
            .field("event", &self.event)
            .field("slot", &self.slot)
            .field("active", &self.is_active())
            .finish()
    }
}

