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

use core::sync::atomic::{AtomicU32, Ordering, compiler_fence};

use log::warn;

use crate::arch::{ArchInterface, CpuContext};

/// Nesting counter of preemption-disabled sections.
///
/// Involuntary rescheduling is only permitted while the count is zero.
pub struct PreemptCounter {
    count: AtomicU32,
}

impl Default for PreemptCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl PreemptCounter {
    pub const fn new() -> Self {
        Self {
            count: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn disable(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
        compiler_fence(Ordering::SeqCst);
    }

    #[inline]
    pub fn enable(&self) {
        compiler_fence(Ordering::SeqCst);
        if self
            .count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                count.checked_sub(1)
            })
            .is_err()
        {
            warn!("preempt enable without matching disable");
        }
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn is_disabled(&self) -> bool {
        self.count() != 0
    }
}

/// Holds one level of preemption disable for its lifetime.
pub struct PreemptDisableGuard<'a, A: ArchInterface> {
    cpu: &'a CpuContext<A>,
}

impl<'a, A: ArchInterface> PreemptDisableGuard<'a, A> {
    pub fn new(cpu: &'a CpuContext<A>) -> Self {
        cpu.preempt_disable();
        Self { cpu }
    }
}

impl<A: ArchInterface> Drop for PreemptDisableGuard<'_, A> {
    fn drop(&mut self) {
        self.cpu.preempt_enable();
    }
}
