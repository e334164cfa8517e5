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

use core::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

use kernel_config::{KernelConfig, SchedulerConfigInterface};
use log::debug;

use crate::arch::{ArchInterface, ProcessorStatus};
use crate::scheduler::{SwitchContext, SwitchKind, Tid};

const NO_TID: usize = usize::MAX;

/// Simulated processor for host builds.
///
/// Interrupt masking is a status word, the tick counter only moves when a
/// test advances it, and a context switch records the descriptor it was
/// handed and returns immediately, as if the outgoing thread had already
/// been switched back in.
pub struct HostArch {
    status: AtomicU32,
    ticks: AtomicU64,
    switches: AtomicU64,
    bootstrap_switches: AtomicU64,
    last_next: AtomicUsize,
    last_next_sp: AtomicUsize,
    last_prev_sp: AtomicUsize,
}

impl HostArch {
    pub const fn new() -> Self {
        Self {
            status: AtomicU32::new(0),
            ticks: AtomicU64::new(0),
            switches: AtomicU64::new(0),
            bootstrap_switches: AtomicU64::new(0),
            last_next: AtomicUsize::new(NO_TID),
            last_next_sp: AtomicUsize::new(0),
            last_prev_sp: AtomicUsize::new(0),
        }
    }

    pub fn advance(&self, ticks: u64) {
        self.ticks.fetch_add(ticks, Ordering::SeqCst);
    }

    /// Number of descriptors handed to `context_switch`.
    pub fn switch_count(&self) -> u64 {
        self.switches.load(Ordering::SeqCst)
    }

    pub fn bootstrap_switch_count(&self) -> u64 {
        self.bootstrap_switches.load(Ordering::SeqCst)
    }

    /// Tid switched to by the most recent `context_switch`.
    pub fn last_switched_to(&self) -> Option<Tid> {
        match self.last_next.load(Ordering::SeqCst) {
            NO_TID => None,
            tid => Some(tid),
        }
    }

    pub fn last_next_sp(&self) -> usize {
        self.last_next_sp.load(Ordering::SeqCst)
    }

    /// Saved stack pointer of the outgoing thread, 0 for a bootstrap switch.
    pub fn last_prev_sp(&self) -> usize {
        self.last_prev_sp.load(Ordering::SeqCst)
    }
}

impl Default for HostArch {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchInterface for HostArch {
    const TICKS_PER_SEC: u64 = KernelConfig::SCHEDULER_TICK_HZ as u64;

    fn enable_interrupts(&self) {
        self.status
            .fetch_and(!ProcessorStatus::IRQ_MASKED.bits(), Ordering::SeqCst);
    }

    fn disable_interrupts(&self) {
        self.status
            .fetch_or(ProcessorStatus::IRQ_MASKED.bits(), Ordering::SeqCst);
    }

    fn processor_status(&self) -> ProcessorStatus {
        ProcessorStatus::from_bits_truncate(self.status.load(Ordering::SeqCst))
    }

    fn restore_processor_status(&self, status: ProcessorStatus) {
        self.status.store(status.bits(), Ordering::SeqCst);
    }

    fn now(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    unsafe fn context_switch(&self, context: &SwitchContext) {
        debug!(
            "HOST context switch {:?} -> {} ({:?})",
            context.prev, context.next, context.kind
        );
        if context.kind == SwitchKind::Bootstrap {
            self.bootstrap_switches.fetch_add(1, Ordering::SeqCst);
        }
        self.last_next.store(context.next, Ordering::SeqCst);
        self.last_next_sp.store(context.next_sp, Ordering::SeqCst);
        self.last_prev_sp
            .store(context.prev_sp.unwrap_or(0), Ordering::SeqCst);
        self.switches.fetch_add(1, Ordering::SeqCst);
    }
}
