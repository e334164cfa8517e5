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

use log::{debug, error, info};

use super::Tid;
use super::state::SchedulerState;
use super::thread::Status;
use crate::arch::{ArchInterface, CpuContext};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SwitchKind {
    /// First switch ever: there is no outgoing thread whose registers need
    /// saving.
    Bootstrap,
    Steady,
}

/// Everything the architecture's context switch needs to move from the
/// outgoing thread to the incoming one.
#[derive(Clone, Copy, Debug)]
pub struct SwitchContext {
    pub kind: SwitchKind,
    pub prev: Option<Tid>,
    pub next: Tid,
    pub entry: fn(usize),
    pub args: usize,
    /// Saved stack pointer of the outgoing thread, `None` on bootstrap.
    pub prev_sp: Option<usize>,
    pub next_sp: usize,
}

impl SchedulerState {
    /// Move the running thread to its requested status (ready unless told
    /// otherwise) and describe the switch to whichever thread now runs.
    ///
    /// Returns `None` when no switch may happen.
    pub fn pick_and_switch<A: ArchInterface>(&mut self, cpu: &CpuContext<A>) -> Option<SwitchContext> {
        if self.is_ready_empty() {
            if let Some(tid) = self.running_tid() {
                self.cancel_request(tid);
            }
            return None;
        }

        // Bootstrap until the first switch has been recorded, even if a
        // thread was already moved to the running slot.
        let kind = if self.has_scheduled() {
            SwitchKind::Steady
        } else {
            SwitchKind::Bootstrap
        };

        let (prev, next) = match self.running_tid() {
            Some(tid) => (tid, self.first_ready()?),
            None => {
                if self.has_scheduled() {
                    return None;
                }
                let first = self.first_ready()?;
                self.request_status(first, Status::Running).ok()?;
                info!("context switching to first thread {}", first);
                (first, first)
            }
        };

        let prev_thread = self.get(prev)?;
        let needs_default = prev_thread.requested_status().is_none();
        let prev_sp = match kind {
            SwitchKind::Bootstrap => None,
            SwitchKind::Steady => Some(prev_thread.stack_pointer()),
        };
        let next_thread = self.get(next)?;
        let context = SwitchContext {
            kind,
            prev: match kind {
                SwitchKind::Bootstrap => None,
                SwitchKind::Steady => Some(prev),
            },
            next,
            entry: next_thread.entry(),
            args: next_thread.args(),
            prev_sp,
            next_sp: next_thread.stack_pointer(),
        };

        if needs_default {
            self.request_status(prev, Status::Ready).ok()?;
        }

        if let Err(e) = self.transition(cpu, prev) {
            debug!("thread {} did not switch out: {}", prev, e);
            return None;
        }

        if self.running_tid() != Some(next) {
            error!(
                "thread {:?} runs after switching out {}, expected {}",
                self.running_tid(),
                prev,
                next
            );
            return None;
        }
        if let Err(e) = self.reload_timeslice(cpu, next) {
            error!("thread {} timeslice not reloaded: {}", next, e);
        }

        self.record_switch();
        Some(context)
    }
}
