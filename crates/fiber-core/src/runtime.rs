use std::cell::Cell;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::platform::IdleScheduler;

struct RuntimeInner {
    scheduler: Arc<dyn IdleScheduler>,
    update_requested: Cell<bool>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn IdleScheduler>) -> Self {
        Self {
            scheduler,
            update_requested: Cell::new(false),
        }
    }

    fn request_update(&self) {
        self.update_requested.set(true);
        self.scheduler.request_idle_callback();
    }
}

/// Owner of the host scheduler and the pending-update flag.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn IdleScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn update_requested(&self) -> bool {
        self.inner.update_requested.get()
    }

    pub(crate) fn take_update_request(&self) -> bool {
        self.inner.update_requested.replace(false)
    }

    pub(crate) fn request_idle_callback(&self) {
        self.inner.scheduler.request_idle_callback();
    }
}

#[derive(Default)]
pub struct DefaultScheduler;

impl IdleScheduler for DefaultScheduler {
    fn request_idle_callback(&self) {}
}

/// Weak handle captured by state setters.
///
/// Requests made after the runtime is dropped are ignored.
#[derive(Clone)]
pub struct RuntimeHandle(Weak<RuntimeInner>);

impl RuntimeHandle {
    pub fn request_update(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.request_update();
        }
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}
