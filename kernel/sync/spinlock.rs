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

use core::cell::UnsafeCell;
use core::hint::spin_loop;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicU32, Ordering};

use kernel_status::{Error, Result};

use crate::arch::{ArchInterface, CpuContext, ProcessorStatus};

/// A raw spin lock for the single-core kernel.
///
/// Holding the lock always holds one level of preemption disable.  The
/// `_irq` variants additionally mask interrupts and the `_irqsave` variants
/// remember whether interrupts were masked before so that
/// [`BareSpinLock::unlock_irqrestore`] only unmasks what it masked.
///
/// Unlocking a lock that is not held is a no-op.
pub struct BareSpinLock {
    count: AtomicU32,
    flag: AtomicU32,
}

impl Default for BareSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

impl BareSpinLock {
    pub const fn new() -> Self {
        Self {
            count: AtomicU32::new(0),
            flag: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.count.load(Ordering::Acquire) != 0
    }

    #[inline]
    fn acquire(&self) -> bool {
        self.count
            .compare_exchange(0, 1, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    pub fn lock<A: ArchInterface>(&self, cpu: &CpuContext<A>) {
        loop {
            while self.is_locked() {
                spin_loop();
            }
            cpu.preempt_disable();
            if self.acquire() {
                return;
            }
            cpu.preempt_enable();
        }
    }

    /// Fails with [`Error::Locked`] without touching the preemption counter
    /// if the lock is held.
    pub fn try_lock<A: ArchInterface>(&self, cpu: &CpuContext<A>) -> Result<()> {
        if self.is_locked() {
            return Err(Error::Locked);
        }
        cpu.preempt_disable();
        if self.acquire() {
            Ok(())
        } else {
            cpu.preempt_enable();
            Err(Error::Locked)
        }
    }

    pub fn unlock<A: ArchInterface>(&self, cpu: &CpuContext<A>) {
        if !self.is_locked() {
            return;
        }
        self.count.store(0, Ordering::Release);
        cpu.preempt_enable();
    }

    pub fn lock_irq<A: ArchInterface>(&self, cpu: &CpuContext<A>) {
        self.lock(cpu);
        cpu.arch().barrier();
        cpu.arch().disable_interrupts();
    }

    pub fn try_lock_irq<A: ArchInterface>(&self, cpu: &CpuContext<A>) -> Result<()> {
        self.try_lock(cpu)?;
        cpu.arch().barrier();
        cpu.arch().disable_interrupts();
        Ok(())
    }

    pub fn unlock_irq<A: ArchInterface>(&self, cpu: &CpuContext<A>) {
        if !self.is_locked() {
            return;
        }
        self.unlock(cpu);
        cpu.arch().barrier();
        cpu.arch().enable_interrupts();
    }

    pub fn lock_irqsave<A: ArchInterface>(&self, cpu: &CpuContext<A>) {
        self.lock(cpu);
        self.save_irq_state(cpu);
    }

    pub fn try_lock_irqsave<A: ArchInterface>(&self, cpu: &CpuContext<A>) -> Result<()> {
        self.try_lock(cpu)?;
        self.save_irq_state(cpu);
        Ok(())
    }

    pub fn unlock_irqrestore<A: ArchInterface>(&self, cpu: &CpuContext<A>) {
        if !self.is_locked() {
            return;
        }
        // Read the saved mask before another owner can overwrite it.
        let saved = ProcessorStatus::from_bits_truncate(self.flag.swap(0, Ordering::Relaxed));
        self.unlock(cpu);
        cpu.arch().barrier();
        if !saved.contains(ProcessorStatus::IRQ_MASKED) {
            cpu.arch().enable_interrupts();
        }
    }

    fn save_irq_state<A: ArchInterface>(&self, cpu: &CpuContext<A>) {
        let status = cpu.arch().processor_status() & ProcessorStatus::IRQ_MASKED;
        self.flag.store(status.bits(), Ordering::Relaxed);
        cpu.arch().barrier();
        cpu.arch().disable_interrupts();
    }
}

/// A spin lock protecting a value of type `T`.
///
/// Acquired with `lock_irqsave` semantics; the guard restores the previous
/// interrupt mask and preemption level on drop.
pub struct SpinLock<T> {
    data: UnsafeCell<T>,
    inner: BareSpinLock,
}

// As long as the inner type is `Send` the lock can be shared between threads.
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub const fn new(initial_value: T) -> Self {
        Self {
            data: UnsafeCell::new(initial_value),
            inner: BareSpinLock::new(),
        }
    }

    pub fn bare(&self) -> &BareSpinLock {
        &self.inner
    }

    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    pub fn lock<'lock, A: ArchInterface>(
        &'lock self,
        cpu: &'lock CpuContext<A>,
    ) -> SpinLockGuard<'lock, A, T> {
        self.inner.lock_irqsave(cpu);
        SpinLockGuard { lock: self, cpu }
    }

    pub fn try_lock<'lock, A: ArchInterface>(
        &'lock self,
        cpu: &'lock CpuContext<A>,
    ) -> Result<SpinLockGuard<'lock, A, T>> {
        self.inner.try_lock_irqsave(cpu)?;
        Ok(SpinLockGuard { lock: self, cpu })
    }
}

pub struct SpinLockGuard<'lock, A: ArchInterface, T> {
    lock: &'lock SpinLock<T>,
    cpu: &'lock CpuContext<A>,
}

impl<'lock, A: ArchInterface, T> SpinLockGuard<'lock, A, T> {
    #[must_use]
    pub fn cpu(&self) -> &'lock CpuContext<A> {
        self.cpu
    }
}

impl<A: ArchInterface, T> Deref for SpinLockGuard<'_, A, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<A: ArchInterface, T> DerefMut for SpinLockGuard<'_, A, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<A: ArchInterface, T> Drop for SpinLockGuard<'_, A, T> {
    fn drop(&mut self) {
        self.lock.inner.unlock_irqrestore(self.cpu);
    }
}
