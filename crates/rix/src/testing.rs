use std::cell::Cell;
use std::time::Duration;

use rix_ipc::Notification;

/// Fires on the `fire_on`-th call to `wait` (1-based) and every call after.
pub(crate) struct ScriptedNotification {
    calls: Cell<usize>,
    fire_on: Option<usize>,
}

impl ScriptedNotification {
    pub(crate) fn never() -> Self {
        Self {
            calls: Cell::new(0),
            fire_on: None,
        }
    }

    pub(crate) fn on_call(n: usize) -> Self {
        Self {
            calls: Cell::new(0),
            fire_on: Some(n),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Notification for ScriptedNotification {
    fn wait(&self, _timeout: Duration) -> rix_ipc::Result<bool> {
        let n = self.calls.get() + 1;
        self.calls.set(n);
        Ok(self.fire_on.is_some_and(|at| n >= at))
    }
}
