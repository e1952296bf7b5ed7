//! Work distribution between traversal workers.
//!
//! Workers that run out of states register themselves as idle and spin until
//! another worker donates part of its stack, or until every worker is idle, in
//! which case the traversal is complete. Busy workers check for idle workers
//! each time they ask the balancer whether to continue.

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::queue::SegQueue;
use crossbeam::utils::Backoff;
use log::debug;
use parking_lot::{Mutex, MutexGuard};

use crate::stack::DfsStack;

/// Coordinates the stacks of all workers of one traversal.
pub struct LoadBalancer {
    stacks: Vec<Mutex<DfsStack>>,
    awaiting_work: Vec<AtomicBool>,
    idle_workers: SegQueue<usize>,
    terminated: AtomicBool,
}

impl LoadBalancer {
    pub fn new(stacks: Vec<DfsStack>) -> Self {
        assert!(!stacks.is_empty(), "At least one worker is required");
        let awaiting_work = stacks.iter().map(|_| AtomicBool::new(false)).collect();
        Self {
            stacks: stacks.into_iter().map(Mutex::new).collect(),
            awaiting_work,
            idle_workers: SegQueue::new(),
            terminated: AtomicBool::new(false),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.stacks.len()
    }

    /// Locks the stack of `worker`.
    pub fn stack(&self, worker: usize) -> MutexGuard<'_, DfsStack> {
        self.stacks[worker].lock()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Requests the termination of all workers.
    pub fn terminate(&self) {
        self.terminated.store(true, Ordering::Release);
    }

    /// Decides whether `worker` should keep polling its stack for states.
    ///
    /// A worker without states blocks until work is assigned to it or the
    /// traversal is over. A worker with splittable work hands some of it to an
    /// idle worker first.
    pub fn load_balance(&self, worker: usize) -> bool {
        if self.is_terminated() {
            return false;
        }

        let (has_work, can_split) = {
            let stack = self.stack(worker);
            (!stack.is_empty(), stack.can_split())
        };
        let are_workers_idle = !self.idle_workers.is_empty();

        if has_work && !are_workers_idle {
            return true;
        }
        if !has_work {
            return self.await_work(worker);
        }
        if can_split {
            return self.assign_work(worker);
        }
        true
    }

    fn assign_work(&self, worker: usize) -> bool {
        let Some(idle_worker) = self.idle_workers.pop() else {
            return true;
        };
        debug_assert_ne!(worker, idle_worker, "Worker tries to assign work to itself");

        let assigned = {
            let mut stack = self.stack(worker);
            let mut other = self.stack(idle_worker);
            debug_assert!(other.is_empty(), "Trying to assign work to non-idle worker");
            stack.split_work(&mut other)
        };

        if assigned {
            debug!("Worker {} assigned work to worker {}", worker, idle_worker);
            self.awaiting_work[idle_worker].store(false, Ordering::Release);
        } else {
            self.idle_workers.push(idle_worker);
        }
        true
    }

    fn await_work(&self, worker: usize) -> bool {
        self.awaiting_work[worker].store(true, Ordering::Release);
        self.idle_workers.push(worker);

        let backoff = Backoff::new();
        while self.awaiting_work[worker].load(Ordering::Acquire) && !self.is_terminated() {
            if self.idle_workers.len() == self.worker_count() {
                debug!("All workers are idle");
                self.terminate();
            } else {
                backoff.snooze();
            }
        }

        !self.is_terminated()
    }

    /// Prepares the balancer for a new traversal.
    pub fn reset(&mut self) {
        *self.terminated.get_mut() = false;
        self.idle_workers = SegQueue::new();
        for flag in self.awaiting_work.iter_mut() {
            *flag.get_mut() = false;
        }
        for stack in self.stacks.iter_mut() {
            stack.get_mut().clear();
        }
    }
}
