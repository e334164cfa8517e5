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

use kernel_config::{KernelConfig, SchedulerConfigInterface};
use kernel_status::{Error, Result};
use log::{error, info, warn};

use super::Tid;
use super::list::{Policy, StatusList};
use super::preempt::PreemptDisableGuard;
use super::registry::Registry;
use super::thread::{Status, Thread, to_string};
use crate::arch::{ArchInterface, CpuContext};

pub const THREAD_TID_IDLE: Tid = KernelConfig::THREAD_TID_IDLE;

/// Everything guarded by the global scheduler lock.
pub struct SchedulerState {
    registry: Registry,
    ready: StatusList,
    suspend: StatusList,
    sleep: StatusList,
    running: Option<Tid>,
    stats: u64,

    // Number of switches handed to the architecture so far.
    schedule_ref: u64,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerState {
    pub const fn new() -> Self {
        Self {
            registry: Registry::new(),
            ready: StatusList::new(Status::Ready),
            suspend: StatusList::new(Status::Suspend),
            sleep: StatusList::new(Status::Sleep),
            running: None,
            stats: 0,
            schedule_ref: 0,
        }
    }

    pub fn get(&self, tid: Tid) -> Option<&Thread> {
        self.registry.get(tid)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// A registered thread that is neither asleep nor about to go to sleep.
    pub fn is_thread_valid(&self, tid: Tid) -> bool {
        self.registry.get(tid).is_some_and(|thread| {
            thread.status() != Status::Sleep && thread.requested_status() != Some(Status::Sleep)
        })
    }

    pub fn running_tid(&self) -> Option<Tid> {
        self.running
    }

    pub fn current_thread(&self) -> Option<&Thread> {
        self.registry.get(self.running?)
    }

    pub fn ready(&self) -> &StatusList {
        &self.ready
    }

    pub fn suspend(&self) -> &StatusList {
        &self.suspend
    }

    pub fn sleep(&self) -> &StatusList {
        &self.sleep
    }

    pub fn list(&self, status: Status) -> Option<&StatusList> {
        match status {
            Status::Ready => Some(&self.ready),
            Status::Suspend => Some(&self.suspend),
            Status::Sleep => Some(&self.sleep),
            Status::None | Status::Running => None,
        }
    }

    pub fn is_ready_empty(&self) -> bool {
        self.ready.is_empty()
    }

    pub fn is_suspend_empty(&self) -> bool {
        self.suspend.is_empty()
    }

    pub fn is_sleep_empty(&self) -> bool {
        self.sleep.is_empty()
    }

    pub fn first_ready(&self) -> Option<Tid> {
        self.ready.first()
    }

    pub fn first_suspend(&self) -> Option<Tid> {
        self.suspend.first()
    }

    pub fn first_sleep(&self) -> Option<Tid> {
        self.sleep.first()
    }

    pub fn next_ready(&self, prev: Option<Tid>) -> Option<Tid> {
        match prev {
            Some(prev) => self.ready.next(&self.registry, prev),
            None => self.ready.first(),
        }
    }

    pub fn next_suspend(&self, prev: Option<Tid>) -> Option<Tid> {
        match prev {
            Some(prev) => self.suspend.next(&self.registry, prev),
            None => self.suspend.first(),
        }
    }

    pub fn next_sleep(&self, prev: Option<Tid>) -> Option<Tid> {
        match prev {
            Some(prev) => self.sleep.next(&self.registry, prev),
            None => self.sleep.first(),
        }
    }

    /// Members of the list for `status` in order; empty for statuses without
    /// a list.
    pub fn iter_status(&self, status: Status) -> impl Iterator<Item = Tid> + '_ {
        self.list(status)
            .into_iter()
            .flat_map(|list| list.iter(&self.registry))
    }

    pub fn stats(&self) -> u64 {
        self.stats
    }

    pub fn has_scheduled(&self) -> bool {
        self.schedule_ref != 0
    }

    pub(super) fn record_switch(&mut self) {
        self.schedule_ref = self.schedule_ref.saturating_add(1);
        self.stats = self.stats.wrapping_add(1);
    }

    pub fn find_unused_tid(&self, start: Tid, count: usize) -> Result<Tid> {
        self.registry.find_unused(start, count)
    }

    /// Place `thread` in slot `tid`, name it `thread-<tid>` and make it
    /// ready.
    pub fn register(&mut self, mut thread: Thread, tid: Tid) -> Result<()> {
        if self.registry.is_occupied(tid) {
            return Err(Error::AlreadyRegistered);
        }
        if thread.stack_pointer() == 0 {
            return Err(Error::NoMemory);
        }

        thread.init(tid);
        self.registry.insert(tid, thread)?;
        if let Err(e) = self.ready.add(&mut self.registry, tid, Policy::CONFIGURED) {
            self.registry.remove(tid);
            return Err(e);
        }
        if let Some(thread) = self.registry.get_mut(tid) {
            thread.set_status(Status::Ready);
        }
        info!("registered thread {}", tid);
        Ok(())
    }

    /// Rename `tid`.  Empty names are ignored.
    pub fn set_thread_name(&mut self, tid: Tid, name: &str) -> Result<()> {
        let thread = self.registry.get_mut(tid).ok_or(Error::Fault)?;
        if !name.is_empty() {
            thread.set_name(name);
        }
        Ok(())
    }

    /// Record the status `tid` should move to on its next transition.
    pub fn request_status(&mut self, tid: Tid, status: Status) -> Result<()> {
        self.registry
            .get_mut(tid)
            .ok_or(Error::Fault)?
            .request(status);
        Ok(())
    }

    pub(super) fn cancel_request(&mut self, tid: Tid) {
        if let Some(thread) = self.registry.get_mut(tid) {
            thread.clear_request();
        }
    }

    /// Restart the timeslice of `tid` at `now`.
    pub fn reload_timeslice<A: ArchInterface>(&mut self, cpu: &CpuContext<A>, tid: Tid) -> Result<()> {
        let arch = cpu.arch();
        let thread = self.registry.get_mut(tid).ok_or(Error::Fault)?;
        let ticks = arch.millis_to_ticks(thread.attr().timeslice_millis());
        thread.set_expires(arch.now().saturating_add(ticks));
        Ok(())
    }

    pub fn timeslice_expired<A: ArchInterface>(&self, cpu: &CpuContext<A>) -> bool {
        self.current_thread()
            .is_some_and(|thread| cpu.arch().now() >= thread.expires())
    }

    /// Move `tid` from its current status to its requested one.
    ///
    /// The requested status is consumed whether or not the move succeeds.  On
    /// failure the thread keeps its old status and list membership.
    pub fn transition<A: ArchInterface>(&mut self, cpu: &CpuContext<A>, tid: Tid) -> Result<()> {
        let _preempt_guard = PreemptDisableGuard::new(cpu);

        let thread = self.registry.get(tid).ok_or(Error::Fault)?;
        let src = thread.status();
        let dst = thread.requested_status();

        let result = self.switch_status(cpu, tid, src, dst);

        if let Some(thread) = self.registry.get_mut(tid) {
            match result {
                Ok(dst) => thread.set_status(dst),
                Err(_) => thread.set_status(src),
            }
            thread.clear_request();
        }
        result.map(|_| ())
    }

    /// Whether `tid` may move to `dst` right now.  Touches no state.
    pub fn check_transition(&self, tid: Tid, dst: Status) -> Result<()> {
        let src = self.registry.get(tid).ok_or(Error::Fault)?.status();
        if !dst.is_live() || dst == src {
            return Err(Error::InvalidTransition);
        }
        if tid == THREAD_TID_IDLE && !matches!(dst, Status::Ready | Status::Running) {
            warn!("idle thread can not become {}", to_string(dst));
            return Err(Error::InvalidTransition);
        }
        match src {
            Status::None => Err(Error::InvalidState),
            // Someone has to take over the processor.
            Status::Running if self.ready.is_empty() => Err(Error::Fault),
            _ => Ok(()),
        }
    }

    fn switch_status<A: ArchInterface>(
        &mut self,
        cpu: &CpuContext<A>,
        tid: Tid,
        src: Status,
        dst: Option<Status>,
    ) -> Result<Status> {
        let dst = dst.ok_or(Error::InvalidTransition)?;
        self.check_transition(tid, dst)?;

        match src {
            Status::Running => self.reinstall(cpu, tid)?,
            Status::Ready | Status::Suspend | Status::Sleep => self.detach(tid, src)?,
            Status::None => return Err(Error::InvalidState),
        }

        cpu.arch().barrier();

        if let Err(e) = self.attach(tid, dst) {
            warn!(
                "thread {} failed to switch {} -> {}: {}",
                tid,
                to_string(src),
                to_string(dst),
                e
            );
            self.restore_membership(tid, src);
            return Err(Error::Fatal);
        }

        if self.running.is_none() && (src == Status::Running || self.has_scheduled()) {
            error!(
                "no running thread after switching thread {} {} -> {}",
                tid,
                to_string(src),
                to_string(dst)
            );
            self.undo_attach(tid, dst);
            self.restore_membership(tid, src);
            return Err(Error::Fatal);
        }

        Ok(dst)
    }

    // Hand the processor from the running `tid` to the head of the ready
    // list.
    fn reinstall<A: ArchInterface>(&mut self, cpu: &CpuContext<A>, tid: Tid) -> Result<()> {
        if self.running != Some(tid) {
            return Err(Error::InvalidState);
        }
        let next = self.ready.first().ok_or(Error::Fault)?;
        self.ready.detach(&mut self.registry, next)?;
        self.running = Some(next);
        cpu.arch().barrier();
        if let Some(thread) = self.registry.get_mut(next) {
            thread.set_status(Status::Running);
            thread.clear_request();
        }
        Ok(())
    }

    // Make the ready `tid` the running thread, pushing the previous one back
    // onto the ready list.
    fn despoil(&mut self, tid: Tid) -> Result<()> {
        let thread = self.registry.get(tid).ok_or(Error::Fault)?;
        if thread.status() != Status::Ready {
            return Err(Error::InvalidState);
        }
        if let Some(prev) = self.running {
            self.ready.add(&mut self.registry, prev, Policy::CONFIGURED)?;
            if let Some(prev_thread) = self.registry.get_mut(prev) {
                prev_thread.set_status(Status::Ready);
                prev_thread.clear_request();
            }
        }
        self.running = Some(tid);
        Ok(())
    }

    fn detach(&mut self, tid: Tid, src: Status) -> Result<()> {
        let (list, registry) = self.list_and_registry(src).ok_or(Error::InvalidState)?;
        list.detach(registry, tid)
    }

    fn attach(&mut self, tid: Tid, dst: Status) -> Result<()> {
        if dst == Status::Running {
            return self.despoil(tid);
        }
        let (list, registry) = self.list_and_registry(dst).ok_or(Error::InvalidTransition)?;
        list.add(registry, tid, Policy::CONFIGURED)
    }

    fn undo_attach(&mut self, tid: Tid, dst: Status) {
        if let Some((list, registry)) = self.list_and_registry(dst) {
            let _ = list.unlink(registry, tid);
        }
    }

    // Put a thread whose move failed back on the list of its old status.
    fn restore_membership(&mut self, tid: Tid, src: Status) {
        if let Some((list, registry)) = self.list_and_registry(src) {
            if list.insert(registry, tid, Policy::CONFIGURED).is_err() {
                error!("thread {} lost its {} list membership", tid, to_string(src));
            }
        }
    }

    fn list_and_registry(&mut self, status: Status) -> Option<(&mut StatusList, &mut Registry)> {
        let list = match status {
            Status::Ready => &mut self.ready,
            Status::Suspend => &mut self.suspend,
            Status::Sleep => &mut self.sleep,
            Status::None | Status::Running => return None,
        };
        Some((list, &mut self.registry))
    }

    pub fn dump_threads(&self) {
        info!(
            "list of all threads (running {:?}, {} switches):",
            self.running, self.stats
        );
        for thread in self.registry.iter() {
            thread.dump();
        }
    }
}
