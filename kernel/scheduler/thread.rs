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

use core::fmt::{self, Write};

use kernel_config::{KernelConfig, SchedulerConfigInterface};
use log::info;

use super::Tid;
use super::list::Link;
use crate::sync::spinlock::BareSpinLock;

const NAME_SIZE: usize = KernelConfig::THREAD_NAME_SIZE;

#[derive(Clone, Copy)]
pub struct Stack {
    // Starting (lowest) address of the stack.  Inclusive.
    start: *const u8,

    // Ending (highest) address of the stack.  Exclusive.
    end: *const u8,
}

// The bounds are only ever handed to the context switch as an address; the
// scheduler never reads or writes through them.
unsafe impl Send for Stack {}
unsafe impl Sync for Stack {}

impl Stack {
    pub const fn from_slice(slice: &[u8]) -> Self {
        let start: *const u8 = slice.as_ptr();
        // Safety: offset based on known size of slice.
        let end = unsafe { start.add(slice.len()) };
        Self { start, end }
    }

    pub const fn new() -> Self {
        Self {
            start: core::ptr::null(),
            end: core::ptr::null(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_null() || self.start == self.end
    }

    pub fn initial_sp(&self, alignment: usize) -> *const u8 {
        let sp = self.end;
        let offset = sp.align_offset(alignment);
        if offset > 0 {
            sp.wrapping_byte_sub(alignment - offset)
        } else {
            sp
        }
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Status {
    None,
    Running,
    Ready,
    Suspend,
    Sleep,
}

impl Status {
    /// Whether the status can be the target of a transition.
    pub fn is_live(self) -> bool {
        self != Status::None
    }
}

pub fn to_string(s: Status) -> &'static str {
    match s {
        Status::None => "None",
        Status::Running => "Running",
        Status::Ready => "Ready",
        Status::Suspend => "Suspend",
        Status::Sleep => "Sleep",
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(to_string(*self))
    }
}

/// Static creation attributes of a thread.
pub trait ThreadAttr: Sync {
    /// Scheduling priority.  Higher values are more urgent.
    fn priority(&self) -> u32;

    /// Initial stack pointer, 0 when the thread has no stack.
    fn stack_pointer(&self) -> usize;

    fn timeslice_millis(&self) -> u32;
}

pub struct StaticThreadAttr {
    priority: u32,
    stack: Stack,
    timeslice_ms: u32,
}

impl StaticThreadAttr {
    pub const STACK_ALIGNMENT: usize = 8;

    pub const fn new(priority: u32, stack: Stack, timeslice_ms: u32) -> Self {
        Self {
            priority,
            stack,
            timeslice_ms,
        }
    }

    pub const fn with_default_timeslice(priority: u32, stack: Stack) -> Self {
        Self::new(priority, stack, KernelConfig::DEFAULT_TIMESLICE_MS)
    }
}

impl ThreadAttr for StaticThreadAttr {
    fn priority(&self) -> u32 {
        self.priority
    }

    fn stack_pointer(&self) -> usize {
        if self.stack.is_empty() {
            return 0;
        }
        self.stack.initial_sp(Self::STACK_ALIGNMENT) as usize
    }

    fn timeslice_millis(&self) -> u32 {
        self.timeslice_ms
    }
}

/// Fixed capacity thread name, truncated on a character boundary to leave
/// room for a terminator.
#[derive(Clone, Copy)]
pub struct ThreadName {
    buf: [u8; NAME_SIZE],
    len: usize,
}

impl ThreadName {
    const CAPACITY: usize = NAME_SIZE - 1;

    pub const fn new() -> Self {
        Self {
            buf: [0; NAME_SIZE],
            len: 0,
        }
    }

    pub fn set(&mut self, name: &str) {
        self.len = 0;
        // Never fails; overlong names are cut short.
        let _ = self.write_str(name);
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

impl Default for ThreadName {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for ThreadName {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            let width = c.len_utf8();
            if self.len + width > Self::CAPACITY {
                break;
            }
            c.encode_utf8(&mut self.buf[self.len..self.len + width]);
            self.len += width;
        }
        Ok(())
    }
}

pub struct Thread {
    tid: Tid,
    status: Status,
    requested: Option<Status>,
    attr: &'static dyn ThreadAttr,

    // Membership in one of the ready, suspend or sleep lists
    pub(super) link: Link,

    name: ThreadName,

    // Tick at which the current timeslice runs out
    expires: u64,

    entry: fn(usize),
    args: usize,

    lock: BareSpinLock,
}

impl Thread {
    /// Create an unregistered thread.  It gets its tid, name and `Ready`
    /// status when handed to the scheduler's `register`.
    pub fn new(attr: &'static dyn ThreadAttr, entry: fn(usize), args: usize) -> Self {
        Self {
            tid: 0,
            status: Status::None,
            requested: None,
            attr,
            link: Link::new(),
            name: ThreadName::new(),
            expires: 0,
            entry,
            args,
            lock: BareSpinLock::new(),
        }
    }

    // Reset the per registration parts of the thread.
    pub(super) fn init(&mut self, tid: Tid) {
        self.tid = tid;
        self.status = Status::None;
        self.requested = None;
        self.link = Link::new();
        self.lock = BareSpinLock::new();
        self.expires = 0;
        self.name = ThreadName::new();
        let _ = write!(self.name, "thread-{tid}");
    }

    pub fn tid(&self) -> Tid {
        self.tid
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub(super) fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub fn requested_status(&self) -> Option<Status> {
        self.requested
    }

    pub(super) fn request(&mut self, status: Status) {
        self.requested = Some(status);
    }

    pub(super) fn clear_request(&mut self) {
        self.requested = None;
    }

    pub fn attr(&self) -> &'static dyn ThreadAttr {
        self.attr
    }

    pub fn priority(&self) -> u32 {
        self.attr.priority()
    }

    pub fn stack_pointer(&self) -> usize {
        self.attr.stack_pointer()
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub(super) fn set_name(&mut self, name: &str) {
        self.name.set(name);
    }

    pub fn expires(&self) -> u64 {
        self.expires
    }

    pub(super) fn set_expires(&mut self, expires: u64) {
        self.expires = expires;
    }

    pub fn entry(&self) -> fn(usize) {
        self.entry
    }

    pub fn args(&self) -> usize {
        self.args
    }

    /// Per-thread lock for state owned by higher layers.
    pub fn lock(&self) -> &BareSpinLock {
        &self.lock
    }

    /// Whether the thread is on one of the status lists.
    pub fn is_linked(&self) -> bool {
        self.link.is_linked()
    }

    // Dump to the console useful information about this thread
    pub fn dump(&self) {
        info!(
            "thread {} '{}' status {} priority {} expires {}",
            self.tid,
            self.name(),
            to_string(self.status),
            self.priority(),
            self.expires
        );
    }
}
