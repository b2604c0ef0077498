use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::{HookCallback, HookEvent, HookSignal, HookSlot};
use crate::host::{HookHandle, HookInstaller};

#[derive(Default)]
struct EventHooks {
    pre: Vec<(HookHandle, HookCallback)>,
    post: Vec<(HookHandle, HookCallback)>,
}

#[derive(Default)]
struct Table {
    next_id: u64,
    events: HashMap<String, EventHooks>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchOutcome {
    /// A pre-hook blocked the operation, so neither it nor the post-hooks ran
    pub blocked: bool,
}

/// An in-process [`HookInstaller`] which also runs events through the hooks
///
/// Clones share one table, so a host can hand one clone to the registry and
/// keep another to dispatch from.
#[derive(Clone, Default)]
pub struct HookDispatcher {
    table: Arc<Mutex<Table>>,
}

impl HookDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `op` wrapped by every hook installed on `event.name`
    ///
    /// Pre-hooks run in install order, then `op` and the post-hooks in install
    /// order, unless a pre-hook blocks. Callbacks are snapshotted before any of
    /// them run, so a hook may install or uninstall hooks without deadlocking.
    pub fn dispatch(&self, event: &mut HookEvent, op: impl FnOnce(&mut HookEvent)) -> DispatchOutcome {
        let (pre, post) = {
            let table = self.table.lock();
            match table.events.get(&event.name) {
                Some(hooks) => (
                    hooks.pre.iter().map(|(_, cb)| Arc::clone(cb)).collect::<Vec<_>>(),
                    hooks.post.iter().map(|(_, cb)| Arc::clone(cb)).collect::<Vec<_>>(),
                ),
                None => (Vec::new(), Vec::new()),
            }
        };

        for callback in &pre {
            if callback(event) == HookSignal::Block {
                debug!(target: "hooks", event = %event.name, "Pre-hook blocked the event");
                return DispatchOutcome { blocked: true };
            }
        }

        op(event);

        for callback in &post {
            callback(event);
        }

        DispatchOutcome { blocked: false }
    }

    /// Number of callbacks installed on `event` across both slots
    pub fn hook_count(&self, event: &str) -> usize {
        self.table
            .lock()
            .events
            .get(event)
            .map_or(0, |hooks| hooks.pre.len() + hooks.post.len())
    }
}

impl HookInstaller for HookDispatcher {
    fn install(&mut self, event: &str, slot: HookSlot, callback: HookCallback) -> HookHandle {
        let mut table = self.table.lock();
        table.next_id += 1;
        let handle = HookHandle::new(table.next_id);

        let hooks = table.events.entry(event.to_string()).or_default();
        match slot {
            HookSlot::Pre => hooks.pre.push((handle, callback)),
            HookSlot::Post => hooks.post.push((handle, callback)),
        }
        trace!(target: "hooks", event, %slot, handle = handle.id(), "Installed hook");
        handle
    }

    fn uninstall(&mut self, handle: HookHandle) {
        let mut table = self.table.lock();
        table.events.retain(|_, hooks| {
            hooks.pre.retain(|(h, _)| *h != handle);
            hooks.post.retain(|(h, _)| *h != handle);
            !hooks.pre.is_empty() || !hooks.post.is_empty()
        });
        trace!(target: "hooks", handle = handle.id(), "Uninstalled hook");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, label: &str, signal: HookSignal) -> HookCallback {
        let log = Arc::clone(log);
        let label = label.to_string();
        Arc::new(move |_event: &mut HookEvent| {
            log.lock().push(label.clone());
            signal
        })
    }

    #[test]
    fn test_order_pre_op_post() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = HookDispatcher::new();
        dispatcher.install("tick", HookSlot::Post, recorder(&log, "post1", HookSignal::Continue));
        dispatcher.install("tick", HookSlot::Pre, recorder(&log, "pre1", HookSignal::Continue));
        dispatcher.install("tick", HookSlot::Pre, recorder(&log, "pre2", HookSignal::Continue));
        dispatcher.install("tick", HookSlot::Post, recorder(&log, "post2", HookSignal::Continue));

        let op_log = Arc::clone(&log);
        let outcome = dispatcher.dispatch(&mut HookEvent::new("tick"), |_| {
            op_log.lock().push("op".into())
        });

        assert!(!outcome.blocked);
        assert_eq!(*log.lock(), vec!["pre1", "pre2", "op", "post1", "post2"]);
    }

    #[test]
    fn test_block_stops_everything_after() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = HookDispatcher::new();
        dispatcher.install("use", HookSlot::Pre, recorder(&log, "blocker", HookSignal::Block));
        dispatcher.install("use", HookSlot::Pre, recorder(&log, "late", HookSignal::Continue));
        dispatcher.install("use", HookSlot::Post, recorder(&log, "post", HookSignal::Continue));

        let mut ran = false;
        let outcome = dispatcher.dispatch(&mut HookEvent::new("use"), |_| ran = true);

        assert!(outcome.blocked);
        assert!(!ran);
        assert_eq!(*log.lock(), vec!["blocker"]);
    }

    #[test]
    fn test_uninstall() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = HookDispatcher::new();
        let handle = dispatcher.install("e", HookSlot::Pre, recorder(&log, "a", HookSignal::Continue));
        assert_eq!(dispatcher.hook_count("e"), 1);

        dispatcher.uninstall(handle);
        dispatcher.uninstall(handle);
        assert_eq!(dispatcher.hook_count("e"), 0);

        dispatcher.dispatch(&mut HookEvent::new("e"), |_| {});
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_post_hooks_see_return_value() {
        let mut dispatcher = HookDispatcher::new();
        let seen = Arc::new(Mutex::new(None));
        let seen_in_hook = Arc::clone(&seen);
        dispatcher.install(
            "roll",
            HookSlot::Post,
            Arc::new(move |event: &mut HookEvent| {
                *seen_in_hook.lock() = event.ret.clone();
                HookSignal::Continue
            }),
        );

        dispatcher.dispatch(&mut HookEvent::new("roll"), |event| {
            event.ret = Some(toml::Value::Integer(6))
        });
        assert_eq!(*seen.lock(), Some(toml::Value::Integer(6)));
    }
}
