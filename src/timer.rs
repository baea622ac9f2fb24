use std::fmt;
use std::rc::Rc;

use crate::page::Page;
use crate::{Error, Result};

/// Timer callback; runs with the page it was scheduled on.
pub type TimerCallback = Rc<dyn Fn(&mut Page) -> Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(i64);

#[derive(Clone)]
pub(crate) struct ScheduledTask {
    id: TimerId,
    due_at: i64,
    order: i64,
    interval_ms: Option<i64>,
    callback: TimerCallback,
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("id", &self.id)
            .field("due_at", &self.due_at)
            .field("order", &self.order)
            .field("interval_ms", &self.interval_ms)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: TimerId,
    pub due_at: i64,
    pub order: i64,
    pub interval_ms: Option<i64>,
}

/// Fake-clock task queue. Ordering is `(due_at, order)`.
#[derive(Debug)]
pub(crate) struct TimerQueue {
    tasks: Vec<ScheduledTask>,
    now_ms: i64,
    step_limit: usize,
    next_timer_id: i64,
    next_task_order: i64,
    running: Option<TimerId>,
    running_canceled: bool,
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            now_ms: 0,
            step_limit: 10_000,
            next_timer_id: 1,
            next_task_order: 0,
            running: None,
            running_canceled: false,
        }
    }
}

impl TimerQueue {
    fn schedule(&mut self, delay_ms: i64, interval: bool, callback: TimerCallback) -> TimerId {
        let delay_ms = delay_ms.max(0);
        let id = TimerId(self.next_timer_id);
        self.next_timer_id += 1;
        let order = self.next_task_order;
        self.next_task_order += 1;
        self.tasks.push(ScheduledTask {
            id,
            due_at: self.now_ms.saturating_add(delay_ms),
            order,
            interval_ms: interval.then_some(delay_ms),
            callback,
        });
        id
    }

    fn clear(&mut self, id: TimerId) -> (usize, bool) {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        let removed = before.saturating_sub(self.tasks.len());
        let running_canceled = self.running == Some(id);
        if running_canceled {
            self.running_canceled = true;
        }
        (removed, running_canceled)
    }

    fn next_task_index(&self, due_limit: Option<i64>) -> Option<usize> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| due_limit.is_none_or(|limit| task.due_at <= limit))
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(idx, _)| idx)
    }

    fn requeue(&mut self, task: ScheduledTask) -> Option<(TimerId, i64)> {
        let interval_ms = task.interval_ms?;
        let due_at = task.due_at.saturating_add(interval_ms);
        let order = self.next_task_order;
        self.next_task_order += 1;
        let id = task.id;
        self.tasks.push(ScheduledTask {
            due_at,
            order,
            ..task
        });
        Some((id, due_at))
    }
}

impl Page {
    pub fn now_ms(&self) -> i64 {
        self.timers.now_ms
    }

    pub fn set_timeout(&mut self, delay_ms: i64, callback: TimerCallback) -> TimerId {
        let id = self.timers.schedule(delay_ms, false, callback);
        self.trace_timer_line(format!(
            "[timer] schedule timeout id={} delay_ms={}",
            id.0,
            delay_ms.max(0)
        ));
        id
    }

    pub fn set_interval(&mut self, interval_ms: i64, callback: TimerCallback) -> TimerId {
        let id = self.timers.schedule(interval_ms, true, callback);
        self.trace_timer_line(format!(
            "[timer] schedule interval id={} interval_ms={}",
            id.0,
            interval_ms.max(0)
        ));
        id
    }

    /// Cancels a timer. Returns whether it was pending or currently running.
    pub fn clear_timer(&mut self, id: TimerId) -> bool {
        let (removed, running_canceled) = self.timers.clear(id);
        self.trace_timer_line(format!(
            "[timer] clear id={} removed={} running_canceled={}",
            id.0, removed, running_canceled
        ));
        removed > 0 || running_canceled
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        let mut timers = self
            .timers
            .tasks
            .iter()
            .map(|task| PendingTimer {
                id: task.id,
                due_at: task.due_at,
                order: task.order,
                interval_ms: task.interval_ms,
            })
            .collect::<Vec<_>>();
        timers.sort_by_key(|timer| (timer.due_at, timer.order));
        timers
    }

    pub fn set_timer_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::Timer(
                "set_timer_step_limit requires at least 1 step".into(),
            ));
        }
        self.timers.step_limit = max_steps;
        Ok(())
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::Timer(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let target = self.timers.now_ms.saturating_add(delta_ms);
        self.advance_time_to(target)
    }

    /// Runs every task due up to `target_ms`, moving the clock to each task's
    /// due time as it runs, then leaves the clock at `target_ms`.
    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        if target_ms < self.timers.now_ms {
            return Err(Error::Timer(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={})",
                self.timers.now_ms
            )));
        }
        let from = self.timers.now_ms;
        let ran = self.run_timer_queue(Some(target_ms))?;
        self.timers.now_ms = target_ms;
        self.trace_timer_line(format!(
            "[timer] advance from={from} to={target_ms} ran_due={ran}"
        ));
        Ok(())
    }

    pub fn run_due_timers(&mut self) -> Result<usize> {
        let now = self.timers.now_ms;
        self.run_timer_queue(Some(now))
    }

    /// Runs until the queue is empty. Recurring timers hit the step limit.
    pub fn flush(&mut self) -> Result<usize> {
        self.run_timer_queue(None)
    }

    fn run_timer_queue(&mut self, due_limit: Option<i64>) -> Result<usize> {
        let mut steps = 0usize;
        while let Some(next_idx) = self.timers.next_task_index(due_limit) {
            steps += 1;
            if steps > self.timers.step_limit {
                return Err(self.timer_step_limit_error(steps, due_limit));
            }
            let task = self.timers.tasks.remove(next_idx);
            if task.due_at > self.timers.now_ms {
                self.timers.now_ms = task.due_at;
            }
            self.execute_timer_task(task)?;
        }
        Ok(steps)
    }

    fn timer_step_limit_error(&self, steps: usize, due_limit: Option<i64>) -> Error {
        let due_limit_desc = due_limit
            .map(|value| value.to_string())
            .unwrap_or_else(|| "none".into());
        Error::Timer(format!(
            "timer queue exceeded max steps (possible uncleared interval): limit={}, steps={steps}, now_ms={}, due_limit={due_limit_desc}, pending_tasks={}",
            self.timers.step_limit,
            self.timers.now_ms,
            self.timers.tasks.len(),
        ))
    }

    fn execute_timer_task(&mut self, task: ScheduledTask) -> Result<()> {
        self.trace_timer_line(format!(
            "[timer] run id={} due_at={} now_ms={}",
            task.id.0, task.due_at, self.timers.now_ms
        ));

        self.timers.running = Some(task.id);
        self.timers.running_canceled = false;
        let outcome = (task.callback)(self);
        let canceled = self.timers.running_canceled;
        self.timers.running = None;
        self.timers.running_canceled = false;
        outcome?;

        if !canceled {
            if let Some((id, due_at)) = self.timers.requeue(task) {
                self.trace_timer_line(format!("[timer] requeue id={} due_at={due_at}", id.0));
            }
        }
        Ok(())
    }
}
