// Copyright 2025 The Pigweed Authors
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License. You may obtain a copy of
// the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the
// License for the specific language governing permissions and limitations under
// the License.

use kernel_status::{Error, Result};
use log::warn;

use crate::arch::{ArchInterface, CpuContext};
use crate::sync::spinlock::{BareSpinLock, SpinLock, SpinLockGuard};

mod dispatch;
pub mod list;
pub mod preempt;
pub mod registry;
mod state;
pub mod thread;

pub use dispatch::{SwitchContext, SwitchKind};
pub use preempt::{PreemptCounter, PreemptDisableGuard};
pub use registry::THREAD_MAX_NUM;
pub use state::{SchedulerState, THREAD_TID_IDLE};
pub use thread::{Stack, StaticThreadAttr, Status, Thread, ThreadAttr};

/// Index of a thread slot in the registry.
pub type Tid = usize;

/// The scheduler of one run-context.
///
/// Owns the table of threads behind a single spin lock and the CPU context
/// every operation disables preemption and interrupts on.  Nothing here is a
/// global: embedders construct one, typically in a `static`.
pub struct Scheduler<A: ArchInterface> {
    cpu: CpuContext<A>,
    state: SpinLock<SchedulerState>,
}

impl<A: ArchInterface> Scheduler<A> {
    pub const fn new(arch: A) -> Self {
        Self {
            cpu: CpuContext::new(arch),
            state: SpinLock::new(SchedulerState::new()),
        }
    }

    pub fn cpu(&self) -> &CpuContext<A> {
        &self.cpu
    }

    pub fn arch(&self) -> &A {
        self.cpu.arch()
    }

    /// Take the global scheduler lock.
    pub fn lock(&self) -> SpinLockGuard<'_, A, SchedulerState> {
        self.state.lock(&self.cpu)
    }

    pub fn try_lock(&self) -> Result<SpinLockGuard<'_, A, SchedulerState>> {
        self.state.try_lock(&self.cpu)
    }

    /// The raw global lock, for callers layering their own critical sections
    /// on the scheduler's.
    pub fn scheduler_lock(&self) -> &BareSpinLock {
        self.state.bare()
    }

    pub fn register(&self, thread: Thread, tid: Tid) -> Result<()> {
        self.lock().register(thread, tid)
    }

    pub fn find_unused_tid(&self, start: Tid, count: usize) -> Result<Tid> {
        self.lock().find_unused_tid(start, count)
    }

    pub fn thread_status(&self, tid: Tid) -> Option<Status> {
        self.lock().get(tid).map(Thread::status)
    }

    pub fn running_tid(&self) -> Option<Tid> {
        self.lock().running_tid()
    }

    pub fn is_thread_valid(&self, tid: Tid) -> bool {
        self.lock().is_thread_valid(tid)
    }

    pub fn request_status(&self, tid: Tid, status: Status) -> Result<()> {
        self.lock().request_status(tid, status)
    }

    /// Move `tid` to `dst` through the state machine.
    pub fn transition(&self, tid: Tid, dst: Status) -> Result<()> {
        let mut state = self.lock();
        state.request_status(tid, dst)?;
        state.transition(&self.cpu, tid)
    }

    pub fn pick_and_switch(&self) -> Option<SwitchContext> {
        self.lock().pick_and_switch(&self.cpu)
    }

    /// Give up the processor to whichever thread the dispatcher picks.
    ///
    /// Never fails; when no switch is possible it returns with the
    /// processor status and preemption level it was entered with.
    pub fn schedule(&self) {
        let arch = self.cpu.arch();
        self.cpu.preempt_disable();
        let saved = arch.processor_status();
        arch.disable_interrupts();

        if let Some(context) = self.pick_and_switch() {
            // Safety: interrupts are masked and the descriptor was just built
            // from the settled scheduler state.
            unsafe { arch.context_switch(&context) };
        }

        // Reached on the no-switch path and when this thread is resumed.
        arch.restore_processor_status(saved);
        self.cpu.preempt_enable();
    }

    pub fn self_suspend(&self) {
        // Refusals are logged by the state machine.
        let _ = self.self_transition(Status::Suspend);
    }

    pub fn self_sleep(&self) {
        let _ = self.self_transition(Status::Sleep);
    }

    /// Request `status` for the running thread and switch away from it.
    ///
    /// The move is checked before anything is requested, so a refused move
    /// leaves the running thread untouched.
    fn self_transition(&self, status: Status) -> Result<()> {
        {
            let mut state = self.lock();
            let Some(tid) = state.running_tid() else {
                warn!("no running thread to move to {}", status);
                return Err(Error::Fault);
            };
            state.check_transition(tid, status)?;
            state.request_status(tid, status)?;
        }
        self.schedule();
        Ok(())
    }

    pub fn thread_suspend(&self, tid: Tid) -> Result<()> {
        self.thread_transition(tid, Status::Suspend)
    }

    pub fn thread_sleep(&self, tid: Tid) -> Result<()> {
        self.thread_transition(tid, Status::Sleep)
    }

    fn thread_transition(&self, tid: Tid, status: Status) -> Result<()> {
        let mut state = self.lock();
        if state.get(tid).is_none() {
            return Err(Error::Fault);
        }
        if state.running_tid() == Some(tid) {
            drop(state);
            return self.self_transition(status);
        }
        state.request_status(tid, status)?;
        state.transition(&self.cpu, tid)
    }

    /// Make a suspended or sleeping thread ready again.
    pub fn thread_wakeup(&self, tid: Tid) -> Result<()> {
        let mut state = self.lock();
        let thread = state.get(tid).ok_or(Error::Fault)?;
        if !matches!(thread.status(), Status::Suspend | Status::Sleep) {
            return Err(Error::InvalidState);
        }
        state.request_status(tid, Status::Ready)?;
        state.transition(&self.cpu, tid)
    }

    pub fn set_thread_name(&self, tid: Tid, name: &str) -> Result<()> {
        self.lock().set_thread_name(tid, name)
    }

    pub fn set_self_name(&self, name: &str) -> Result<()> {
        let mut state = self.lock();
        let tid = state.running_tid().ok_or(Error::Fault)?;
        state.set_thread_name(tid, name)
    }

    /// Restart the running thread's timeslice.
    pub fn reload_timeslice(&self) -> Result<()> {
        let mut state = self.lock();
        let tid = state.running_tid().ok_or(Error::Fault)?;
        state.reload_timeslice(&self.cpu, tid)
    }

    pub fn timeslice_expired(&self) -> bool {
        self.lock().timeslice_expired(&self.cpu)
    }

    /// Periodic timer hook: reschedule once the running timeslice is used up,
    /// unless preemption is disabled.
    pub fn tick(&self) {
        if self.cpu.preempt().is_disabled() {
            return;
        }
        if self.timeslice_expired() {
            self.schedule();
        }
    }

    pub fn has_scheduled(&self) -> bool {
        self.lock().has_scheduled()
    }

    pub fn stats_get(&self) -> u64 {
        self.lock().stats()
    }

    pub fn dump_threads(&self) {
        self.lock().dump_threads();
    }
}
