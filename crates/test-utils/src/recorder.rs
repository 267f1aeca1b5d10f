use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};

use drivertrack::ProgressObject;
use serde_json::Value;

/// Records every progress object handed to a callback.
#[derive(Debug, Clone, Default)]
pub struct ProgressRecorder {
    seen: Arc<Mutex<Vec<ProgressObject>>>,
}

impl ProgressRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback that records and always continues.
    pub fn callback(&self) -> impl FnMut(&ProgressObject) -> ControlFlow<()> + Send + 'static {
        let seen = Arc::clone(&self.seen);
        move |p| {
            seen.lock().unwrap().push(p.clone());
            ControlFlow::Continue(())
        }
    }

    /// A callback that records and asks to abort once `count` objects have
    /// been seen.
    pub fn abort_after(
        &self,
        count: usize,
    ) -> impl FnMut(&ProgressObject) -> ControlFlow<()> + Send + 'static {
        let seen = Arc::clone(&self.seen);
        move |p| {
            let mut guard = seen.lock().unwrap();
            guard.push(p.clone());
            if guard.len() >= count {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        }
    }

    pub fn seen(&self) -> Vec<ProgressObject> {
        self.seen.lock().unwrap().clone()
    }

    pub fn values(&self) -> Vec<Value> {
        self.seen().into_iter().map(ProgressObject::into_value).collect()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
