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

use core::sync::atomic::{Ordering, fence};

use bitflags::bitflags;

use crate::scheduler::SwitchContext;
use crate::scheduler::preempt::PreemptCounter;

#[cfg(feature = "arch_host")]
pub mod host;

bitflags! {
    /// Interrupt mask bits of the processor status register, as saved by
    /// `spin_lock_irqsave` style critical sections.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct ProcessorStatus: u32 {
        const FIQ_MASKED = 1 << 6;
        const IRQ_MASKED = 1 << 7;
    }
}

/// Hooks the scheduling core needs from the architecture and the board.
///
/// Everything here is owned outside of the scheduler: interrupt masking, the
/// free running tick counter and the register save/restore routine that
/// actually moves execution from one thread to another.
pub trait ArchInterface {
    /// Rate of the counter returned by [`ArchInterface::now`].
    const TICKS_PER_SEC: u64;

    fn enable_interrupts(&self);
    fn disable_interrupts(&self);

    fn interrupts_enabled(&self) -> bool {
        !self
            .processor_status()
            .contains(ProcessorStatus::IRQ_MASKED)
    }

    /// Reads the current processor status (`push_psr`).
    fn processor_status(&self) -> ProcessorStatus;

    /// Writes back a status previously read with `processor_status`
    /// (`pop_psr`).
    fn restore_processor_status(&self, status: ProcessorStatus);

    /// Full memory barrier.
    fn barrier(&self) {
        fence(Ordering::SeqCst);
    }

    /// Free running tick counter.
    fn now(&self) -> u64;

    fn millis_to_ticks(&self, millis: u32) -> u64 {
        u64::from(millis) * Self::TICKS_PER_SEC / 1000
    }

    /// Saves the running register state and resumes the thread described by
    /// `context`.
    ///
    /// # Safety
    /// Must be called with interrupts disabled and with `context` produced by
    /// the dispatcher for the current scheduler state.  On hardware this
    /// returns only once the calling thread is switched back in.
    unsafe fn context_switch(&self, context: &SwitchContext);

    fn idle(&self) {}
}

/// The single logical run-context: an architecture backend plus the
/// preemption nesting counter every lock and scheduler operation updates.
pub struct CpuContext<A: ArchInterface> {
    arch: A,
    preempt: PreemptCounter,
}

impl<A: ArchInterface> CpuContext<A> {
    pub const fn new(arch: A) -> Self {
        Self {
            arch,
            preempt: PreemptCounter::new(),
        }
    }

    pub fn arch(&self) -> &A {
        &self.arch
    }

    pub fn preempt(&self) -> &PreemptCounter {
        &self.preempt
    }

    #[inline]
    pub fn preempt_disable(&self) {
        self.preempt.disable();
    }

    #[inline]
    pub fn preempt_enable(&self) {
        self.preempt.enable();
    }
}
