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
#![cfg_attr(not(test), no_std)]

//! Scheduling core of a small single-core real-time kernel.
//!
//! The crate owns the thread registry, the ready/suspend/sleep status lists,
//! the status transition state machine and the dispatcher that picks the next
//! thread.  Interrupt masking, the tick source and the register level context
//! switch are supplied by an [`ArchInterface`] implementation.

pub mod arch;
pub mod scheduler;
pub mod sync;

pub use arch::{ArchInterface, CpuContext, ProcessorStatus};
#[cfg(feature = "arch_host")]
pub use arch::host::HostArch;
pub use kernel_status::{Error, Result, StatusCode};
pub use scheduler::{
    Scheduler, SchedulerState, Stack, StaticThreadAttr, Status, SwitchContext, SwitchKind,
    Thread, ThreadAttr, Tid,
};
pub use sync::spinlock::{BareSpinLock, SpinLock, SpinLockGuard};
