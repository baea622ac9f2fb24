use super::*;

use std::cell::RefCell;
use std::rc::Rc;

mod config_and_site;
mod events_and_timers;
mod focus_trap_behavior;

/// Collects labels pushed by listener closures, in call order.
#[derive(Clone, Default)]
struct CallLog(Rc<RefCell<Vec<String>>>);

impl CallLog {
    fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}
