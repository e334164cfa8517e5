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

//! Status lists.
//!
//! The lists are intrusive: every thread carries a single [`Link`] and can be
//! a member of at most one list.  Links name neighbours by tid rather than by
//! pointer so all list surgery goes through the registry that owns the
//! threads.

use kernel_status::{Error, Result};

use super::Tid;
use super::registry::Registry;
use super::thread::Status;

/// Insertion order used by [`StatusList::add`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Policy {
    /// Descending priority, FIFO among equal priorities.
    Priority,
    /// Plain FIFO.
    RoundRobin,
}

impl Policy {
    #[cfg(not(feature = "round_robin"))]
    pub const CONFIGURED: Policy = Policy::Priority;
    #[cfg(feature = "round_robin")]
    pub const CONFIGURED: Policy = Policy::RoundRobin;
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Link {
    prev: Option<Tid>,
    next: Option<Tid>,
    owner: Option<Status>,
}

impl Link {
    pub const fn new() -> Self {
        Self {
            prev: None,
            next: None,
            owner: None,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.owner.is_some()
    }
}

/// An ordered list of the threads holding one status.
pub struct StatusList {
    status: Status,
    head: Option<Tid>,
    tail: Option<Tid>,
    len: usize,
}

impl StatusList {
    pub const fn new(status: Status) -> Self {
        Self {
            status,
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn first(&self) -> Option<Tid> {
        self.head
    }

    pub fn contains(&self, registry: &Registry, tid: Tid) -> bool {
        registry
            .get(tid)
            .is_some_and(|thread| thread.link.owner == Some(self.status))
    }

    /// The member following `prev`, or `None` if `prev` is last or is not a
    /// member of this list.
    pub fn next(&self, registry: &Registry, prev: Tid) -> Option<Tid> {
        if !self.contains(registry, prev) {
            return None;
        }
        registry.get(prev)?.link.next
    }

    pub fn iter<'a>(&'a self, registry: &'a Registry) -> Iter<'a> {
        Iter {
            registry,
            next: self.head,
        }
    }

    /// Link `tid` into the list according to `policy`.
    ///
    /// Fails with [`Error::Fault`] for an unregistered tid and with
    /// [`Error::InvalidState`] if the thread's status already equals the
    /// list's.  Adding a thread that is already a member is a no-op.
    pub fn add(&mut self, registry: &mut Registry, tid: Tid, policy: Policy) -> Result<()> {
        let thread = registry.get(tid).ok_or(Error::Fault)?;
        if thread.status() == self.status {
            return Err(Error::InvalidState);
        }
        if thread.link.owner == Some(self.status) {
            return Ok(());
        }
        self.insert(registry, tid, policy)
    }

    /// Unlink `tid`.  The thread's status must equal the list's; a thread
    /// that is not actually linked is left alone.
    pub fn detach(&mut self, registry: &mut Registry, tid: Tid) -> Result<()> {
        let thread = registry.get(tid).ok_or(Error::Fault)?;
        if thread.status() != self.status {
            return Err(Error::InvalidState);
        }
        if thread.link.owner != Some(self.status) {
            return Ok(());
        }
        self.unlink(registry, tid)
    }

    // Link without looking at the thread's status.
    pub(super) fn insert(&mut self, registry: &mut Registry, tid: Tid, policy: Policy) -> Result<()> {
        let thread = registry.get(tid).ok_or(Error::Fault)?;
        if thread.link.is_linked() {
            return Err(Error::InvalidState);
        }
        let priority = thread.priority();

        if policy == Policy::Priority {
            // Walk from the tail so equal priorities keep arrival order.
            let mut cursor = self.tail;
            while let Some(member) = cursor {
                let member_thread = registry.get(member).ok_or(Error::Fault)?;
                if member_thread.priority() >= priority {
                    return self.insert_after(registry, member, tid);
                }
                cursor = member_thread.link.prev;
            }
            return self.push_front(registry, tid);
        }

        self.push_back(registry, tid)
    }

    // Unlink without looking at the thread's status.
    pub(super) fn unlink(&mut self, registry: &mut Registry, tid: Tid) -> Result<()> {
        let link = registry.get(tid).ok_or(Error::Fault)?.link;
        if link.owner != Some(self.status) {
            return Err(Error::InvalidState);
        }

        match link.prev {
            Some(prev) => Self::link_mut(registry, prev)?.next = link.next,
            None => self.head = link.next,
        }
        match link.next {
            Some(next) => Self::link_mut(registry, next)?.prev = link.prev,
            None => self.tail = link.prev,
        }
        *Self::link_mut(registry, tid)? = Link::new();
        self.len -= 1;
        Ok(())
    }

    fn push_front(&mut self, registry: &mut Registry, tid: Tid) -> Result<()> {
        let old_head = self.head;
        *Self::link_mut(registry, tid)? = Link {
            prev: None,
            next: old_head,
            owner: Some(self.status),
        };
        match old_head {
            Some(head) => Self::link_mut(registry, head)?.prev = Some(tid),
            None => self.tail = Some(tid),
        }
        self.head = Some(tid);
        self.len += 1;
        Ok(())
    }

    fn push_back(&mut self, registry: &mut Registry, tid: Tid) -> Result<()> {
        match self.tail {
            Some(tail) => self.insert_after(registry, tail, tid),
            None => self.push_front(registry, tid),
        }
    }

    fn insert_after(&mut self, registry: &mut Registry, member: Tid, tid: Tid) -> Result<()> {
        let next = Self::link_mut(registry, member)?.next;
        *Self::link_mut(registry, tid)? = Link {
            prev: Some(member),
            next,
            owner: Some(self.status),
        };
        Self::link_mut(registry, member)?.next = Some(tid);
        match next {
            Some(next) => Self::link_mut(registry, next)?.prev = Some(tid),
            None => self.tail = Some(tid),
        }
        self.len += 1;
        Ok(())
    }

    fn link_mut(registry: &mut Registry, tid: Tid) -> Result<&mut Link> {
        registry
            .get_mut(tid)
            .map(|thread| &mut thread.link)
            .ok_or(Error::Fault)
    }
}

pub struct Iter<'a> {
    registry: &'a Registry,
    next: Option<Tid>,
}

impl Iterator for Iter<'_> {
    type Item = Tid;

    fn next(&mut self) -> Option<Tid> {
        let tid = self.next?;
        self.next = self.registry.get(tid).and_then(|thread| thread.link.next);
        Some(tid)
    }
}
