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
#![no_std]

/// Scheduler configuration common to all architectures.
pub trait SchedulerConfigInterface {
    /// Number of slots in the thread registry.  Valid tids are
    /// `0..THREAD_MAX_NUM`.
    const THREAD_MAX_NUM: usize = 32;

    /// Tid reserved for the idle thread.  The idle thread may only ever be
    /// ready or running.
    const THREAD_TID_IDLE: usize = 0;

    /// Bytes of storage for a thread's name, including room for a trailing
    /// NUL when handed to C code.
    const THREAD_NAME_SIZE: usize = 16;

    /// Rate of the scheduler monotonic tick.
    const SCHEDULER_TICK_HZ: u32 = 100;

    /// Timeslice used by attribute objects that do not specify one.
    const DEFAULT_TIMESLICE_MS: u32 = 10;
}

/// Default configuration.  Targets needing different limits provide their
/// own type implementing [`SchedulerConfigInterface`].
pub struct KernelConfig;

impl SchedulerConfigInterface for KernelConfig {}
