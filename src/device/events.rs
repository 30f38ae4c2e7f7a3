//! Device lifecycle notifications.
//!
//! Higher layers register plain callbacks instead of subscribing to typed
//! event objects. Firing order around a back-buffer recreation is fixed:
//! `DeviceChangeBegin` fires before any resource is touched and
//! `DeviceChangeEnd` after the new resources exist. `DeviceLost` is
//! independent and fires whenever the underlying API reports it.

use parking_lot::Mutex;

type Callback = Box<dyn Fn() + Send + Sync>;

/// Observer registration lists for device lifecycle events.
#[derive(Default)]
pub struct DeviceEvents {
    created: Mutex<Vec<Callback>>,
    lost: Mutex<Vec<Callback>>,
    change_begin: Mutex<Vec<Callback>>,
    change_end: Mutex<Vec<Callback>>,
}

impl DeviceEvents {
    /// Create empty registration lists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for device creation.
    pub fn on_created(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.created.lock().push(Box::new(callback));
    }

    /// Register a callback for device loss.
    pub fn on_device_lost(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.lost.lock().push(Box::new(callback));
    }

    /// Register a callback fired before device-owned targets are recreated.
    pub fn on_change_begin(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.change_begin.lock().push(Box::new(callback));
    }

    /// Register a callback fired after device-owned targets are recreated.
    pub fn on_change_end(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.change_end.lock().push(Box::new(callback));
    }

    pub(crate) fn fire_created(&self) {
        for callback in self.created.lock().iter() {
            callback();
        }
    }

    pub(crate) fn fire_device_lost(&self) {
        for callback in self.lost.lock().iter() {
            callback();
        }
    }

    pub(crate) fn fire_change_begin(&self) {
        for callback in self.change_begin.lock().iter() {
            callback();
        }
    }

    pub(crate) fn fire_change_end(&self) {
        for callback in self.change_end.lock().iter() {
            callback();
        }
    }
}

impl std::fmt::Debug for DeviceEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceEvents")
            .field("created", &self.created.lock().len())
            .field("lost", &self.lost.lock().len())
            .field("change_begin", &self.change_begin.lock().len())
            .field("change_end", &self.change_end.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_change_events_fire_in_order() {
        let events = DeviceEvents::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = Arc::clone(&order);
        events.on_change_begin(move || o.lock().push("begin"));
        let o = Arc::clone(&order);
        events.on_change_end(move || o.lock().push("end"));

        events.fire_change_begin();
        events.fire_change_end();

        assert_eq!(*order.lock(), vec!["begin", "end"]);
    }

    #[test]
    fn test_multiple_observers() {
        let events = DeviceEvents::new();
        let count = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let c = Arc::clone(&count);
            events.on_device_lost(move || {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }

        events.fire_device_lost();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
