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

use super::Tid;
use super::thread::Thread;

pub const THREAD_MAX_NUM: usize = KernelConfig::THREAD_MAX_NUM;

/// Fixed table of thread slots indexed by tid.
pub struct Registry {
    slots: [Option<Thread>; THREAD_MAX_NUM],
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub const fn new() -> Self {
        Self {
            slots: [const { None }; THREAD_MAX_NUM],
        }
    }

    pub fn get(&self, tid: Tid) -> Option<&Thread> {
        self.slots.get(tid)?.as_ref()
    }

    pub fn get_mut(&mut self, tid: Tid) -> Option<&mut Thread> {
        self.slots.get_mut(tid)?.as_mut()
    }

    pub fn is_occupied(&self, tid: Tid) -> bool {
        self.get(tid).is_some()
    }

    /// First empty slot in `start..start + count`.  Tids past the end of the
    /// table are never candidates.
    pub fn find_unused(&self, start: Tid, count: usize) -> Result<Tid> {
        let end = start.saturating_add(count).min(THREAD_MAX_NUM);
        (start..end)
            .find(|&tid| self.slots[tid].is_none())
            .ok_or(Error::Exhausted)
    }

    pub(super) fn insert(&mut self, tid: Tid, thread: Thread) -> Result<()> {
        let slot = self.slots.get_mut(tid).ok_or(Error::Fault)?;
        if slot.is_some() {
            return Err(Error::AlreadyRegistered);
        }
        *slot = Some(thread);
        Ok(())
    }

    pub(super) fn remove(&mut self, tid: Tid) -> Option<Thread> {
        self.slots.get_mut(tid)?.take()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Thread> {
        self.slots.iter().flatten()
    }
}
