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

use kernel::{
    ArchInterface, Error, HostArch, Result, Scheduler, Stack, StaticThreadAttr, Status, SwitchKind,
    Thread, ThreadAttr, Tid,
};

static IDLE_STACK: [u8; 256] = [0; 256];
static A_STACK: [u8; 256] = [0; 256];
static B_STACK: [u8; 256] = [0; 256];

static IDLE_ATTR: StaticThreadAttr =
    StaticThreadAttr::with_default_timeslice(0, Stack::from_slice(&IDLE_STACK));
static A_ATTR: StaticThreadAttr =
    StaticThreadAttr::with_default_timeslice(3, Stack::from_slice(&A_STACK));
static B_ATTR: StaticThreadAttr =
    StaticThreadAttr::with_default_timeslice(5, Stack::from_slice(&B_STACK));
static NO_STACK_ATTR: StaticThreadAttr = StaticThreadAttr::with_default_timeslice(1, Stack::new());

const IDLE: Tid = 0;
const A: Tid = 1;
const B: Tid = 2;

// Ready order of the threads registered by `scheduler_with_threads`, and
// the two threads that run first.
#[cfg(not(feature = "round_robin"))]
mod order {
    use super::*;

    pub const REGISTERED: [Tid; 3] = [B, A, IDLE];
    pub const FIRST: Tid = B;
    pub const SECOND: Tid = A;
    /// Ready list once `FIRST` yields to `SECOND`.
    pub const REQUEUED: [Tid; 2] = [B, IDLE];
}

#[cfg(feature = "round_robin")]
mod order {
    use super::*;

    pub const REGISTERED: [Tid; 3] = [A, B, IDLE];
    pub const FIRST: Tid = A;
    pub const SECOND: Tid = B;
    pub const REQUEUED: [Tid; 2] = [IDLE, A];
}

use order::*;

fn entry(_args: usize) {}

fn attr_of(tid: Tid) -> &'static StaticThreadAttr {
    match tid {
        A => &A_ATTR,
        B => &B_ATTR,
        _ => &IDLE_ATTR,
    }
}

fn args_of(tid: Tid) -> usize {
    match tid {
        A => 0xa,
        B => 0xb,
        _ => 0,
    }
}

fn scheduler_with_threads() -> Result<Scheduler<HostArch>> {
    let sched = Scheduler::new(HostArch::new());
    sched.register(Thread::new(&A_ATTR, entry, 0xa), A)?;
    sched.register(Thread::new(&B_ATTR, entry, 0xb), B)?;
    sched.register(Thread::new(&IDLE_ATTR, entry, 0), IDLE)?;
    Ok(sched)
}

fn members(sched: &Scheduler<HostArch>, status: Status) -> Vec<Tid> {
    sched.lock().iter_status(status).collect()
}

#[test]
fn register_makes_thread_ready() -> Result<()> {
    let sched = scheduler_with_threads()?;

    let state = sched.lock();
    let thread = state.get(A).ok_or(Error::Fault)?;
    assert_eq!(thread.status(), Status::Ready);
    assert_eq!(thread.name(), "thread-1");
    assert_eq!(thread.requested_status(), None);
    assert_eq!(state.running_tid(), None);
    assert!(!state.has_scheduled());
    drop(state);

    assert_eq!(members(&sched, Status::Ready), REGISTERED);
    Ok(())
}

#[test]
fn register_rejects_occupied_slot_and_missing_stack() -> Result<()> {
    let sched = scheduler_with_threads()?;

    assert_eq!(
        sched.register(Thread::new(&A_ATTR, entry, 0), A),
        Err(Error::AlreadyRegistered)
    );
    assert_eq!(
        sched.register(Thread::new(&NO_STACK_ATTR, entry, 0), 5),
        Err(Error::NoMemory)
    );
    assert!(!sched.lock().is_thread_valid(5));
    assert_eq!(members(&sched, Status::Ready), REGISTERED);
    Ok(())
}

#[test]
fn find_unused_tid_scans_window() -> Result<()> {
    let sched = scheduler_with_threads()?;
    assert_eq!(sched.find_unused_tid(0, 8), Ok(3));
    assert_eq!(sched.find_unused_tid(0, 3), Err(Error::Exhausted));
    assert_eq!(sched.find_unused_tid(1, 0), Err(Error::Exhausted));
    Ok(())
}

#[test]
fn first_schedule_runs_ready_head() -> Result<()> {
    let sched = scheduler_with_threads()?;

    sched.schedule();

    assert_eq!(sched.running_tid(), Some(FIRST));
    assert_eq!(sched.thread_status(FIRST), Some(Status::Running));
    assert_eq!(members(&sched, Status::Ready), [SECOND, IDLE]);
    assert!(sched.has_scheduled());
    assert_eq!(sched.stats_get(), 1);

    let arch = sched.arch();
    assert_eq!(arch.switch_count(), 1);
    assert_eq!(arch.bootstrap_switch_count(), 1);
    assert_eq!(arch.last_switched_to(), Some(FIRST));
    assert_eq!(arch.last_next_sp(), attr_of(FIRST).stack_pointer());
    assert_eq!(arch.last_prev_sp(), 0);

    assert_eq!(sched.cpu().preempt().count(), 0);
    assert!(arch.interrupts_enabled());
    Ok(())
}

#[test]
fn self_suspend_hands_over_to_next_ready() -> Result<()> {
    let sched = scheduler_with_threads()?;
    sched.schedule();

    sched.self_suspend();

    assert_eq!(sched.running_tid(), Some(SECOND));
    assert_eq!(sched.thread_status(SECOND), Some(Status::Running));
    assert_eq!(sched.thread_status(FIRST), Some(Status::Suspend));
    assert_eq!(members(&sched, Status::Suspend), [FIRST]);
    assert_eq!(members(&sched, Status::Ready), [IDLE]);
    assert_eq!(sched.arch().last_prev_sp(), attr_of(FIRST).stack_pointer());
    assert_eq!(sched.arch().last_next_sp(), attr_of(SECOND).stack_pointer());
    assert_eq!(sched.stats_get(), 2);
    Ok(())
}

#[test]
fn wakeup_requeues_thread() -> Result<()> {
    let sched = scheduler_with_threads()?;
    sched.schedule();
    sched.self_suspend();

    sched.thread_wakeup(FIRST)?;

    assert_eq!(sched.thread_status(FIRST), Some(Status::Ready));
    assert_eq!(members(&sched, Status::Ready), REQUEUED);
    assert!(sched.lock().is_suspend_empty());
    assert_eq!(sched.running_tid(), Some(SECOND));
    Ok(())
}

#[test]
fn wakeup_of_ready_thread_fails() -> Result<()> {
    let sched = scheduler_with_threads()?;
    sched.schedule();

    assert_eq!(sched.thread_wakeup(A), Err(Error::InvalidState));
    assert_eq!(sched.thread_wakeup(B), Err(Error::InvalidState));
    assert_eq!(members(&sched, Status::Ready), [SECOND, IDLE]);
    assert_eq!(sched.running_tid(), Some(FIRST));
    Ok(())
}

#[test]
fn idle_thread_never_suspends_or_sleeps() -> Result<()> {
    let sched = scheduler_with_threads()?;

    assert_eq!(
        sched.transition(IDLE, Status::Suspend),
        Err(Error::InvalidTransition)
    );
    assert_eq!(sched.thread_sleep(IDLE), Err(Error::InvalidTransition));

    let state = sched.lock();
    let idle = state.get(IDLE).ok_or(Error::Fault)?;
    assert_eq!(idle.status(), Status::Ready);
    assert_eq!(idle.requested_status(), None);
    Ok(())
}

#[test]
fn transition_to_same_or_dead_status_fails() -> Result<()> {
    let sched = scheduler_with_threads()?;
    assert_eq!(
        sched.transition(A, Status::Ready),
        Err(Error::InvalidTransition)
    );
    assert_eq!(
        sched.transition(A, Status::None),
        Err(Error::InvalidTransition)
    );
    assert_eq!(members(&sched, Status::Ready), REGISTERED);
    Ok(())
}

#[test]
fn suspended_thread_can_not_run_directly() -> Result<()> {
    let sched = scheduler_with_threads()?;
    sched.schedule();
    sched.thread_suspend(SECOND)?;
    assert_eq!(members(&sched, Status::Suspend), [SECOND]);

    assert_eq!(sched.transition(SECOND, Status::Running), Err(Error::Fatal));

    assert_eq!(sched.thread_status(SECOND), Some(Status::Suspend));
    assert_eq!(members(&sched, Status::Suspend), [SECOND]);
    assert_eq!(sched.running_tid(), Some(FIRST));
    assert_eq!(
        sched.lock().get(SECOND).ok_or(Error::Fault)?.requested_status(),
        None
    );
    Ok(())
}

#[test]
fn suspending_running_thread_switches() -> Result<()> {
    let sched = scheduler_with_threads()?;
    sched.schedule();

    sched.thread_suspend(FIRST)?;

    assert_eq!(sched.running_tid(), Some(SECOND));
    assert_eq!(members(&sched, Status::Suspend), [FIRST]);
    Ok(())
}

#[test]
fn sleeping_thread_is_not_valid_until_woken() -> Result<()> {
    let sched = scheduler_with_threads()?;
    sched.schedule();

    sched.thread_sleep(SECOND)?;
    assert_eq!(members(&sched, Status::Sleep), [SECOND]);
    assert!(!sched.is_thread_valid(SECOND));

    sched.thread_wakeup(SECOND)?;
    assert!(sched.is_thread_valid(SECOND));
    let ready = members(&sched, Status::Ready);
    assert_eq!(ready.len(), 2);
    assert!(ready.contains(&SECOND) && ready.contains(&IDLE));
    assert!(sched.lock().is_sleep_empty());
    Ok(())
}

#[test]
fn unknown_tid_faults() -> Result<()> {
    let sched = scheduler_with_threads()?;
    assert_eq!(sched.thread_wakeup(9), Err(Error::Fault));
    assert_eq!(sched.thread_suspend(9), Err(Error::Fault));
    assert_eq!(sched.transition(1000, Status::Ready), Err(Error::Fault));
    assert_eq!(sched.set_thread_name(9, "nobody"), Err(Error::Fault));
    Ok(())
}

#[test]
fn pick_and_switch_describes_switch() -> Result<()> {
    let sched = scheduler_with_threads()?;

    let first = sched.pick_and_switch().ok_or(Error::Fault)?;
    assert_eq!(first.kind, SwitchKind::Bootstrap);
    assert_eq!(first.prev, None);
    assert_eq!(first.prev_sp, None);
    assert_eq!(first.next, FIRST);
    assert_eq!(first.args, args_of(FIRST));
    assert_eq!(first.next_sp, attr_of(FIRST).stack_pointer());

    let second = sched.pick_and_switch().ok_or(Error::Fault)?;
    assert_eq!(second.kind, SwitchKind::Steady);
    assert_eq!(second.prev, Some(FIRST));
    assert_eq!(second.prev_sp, Some(attr_of(FIRST).stack_pointer()));
    assert_eq!(second.next, SECOND);
    assert_eq!(second.args, args_of(SECOND));

    // The default request on a plain reschedule is to yield.
    assert_eq!(members(&sched, Status::Ready), REQUEUED);
    Ok(())
}

#[test]
fn schedule_without_ready_threads_is_noop() -> Result<()> {
    let sched = Scheduler::new(HostArch::new());
    sched.register(Thread::new(&IDLE_ATTR, entry, 0), IDLE)?;
    sched.schedule();
    assert_eq!(sched.running_tid(), Some(IDLE));

    sched.self_suspend();
    sched.schedule();

    assert_eq!(sched.running_tid(), Some(IDLE));
    assert_eq!(sched.arch().switch_count(), 1);
    assert_eq!(
        sched.lock().get(IDLE).ok_or(Error::Fault)?.requested_status(),
        None
    );
    assert_eq!(sched.cpu().preempt().count(), 0);
    Ok(())
}

#[test]
fn tick_yields_once_timeslice_expires() -> Result<()> {
    let sched = scheduler_with_threads()?;
    sched.schedule();
    let expires = sched.lock().current_thread().ok_or(Error::Fault)?.expires();
    assert_eq!(
        expires,
        sched.arch().millis_to_ticks(attr_of(FIRST).timeslice_millis())
    );

    sched.tick();
    assert_eq!(sched.running_tid(), Some(FIRST));

    sched.arch().advance(expires);
    assert!(sched.timeslice_expired());
    sched.tick();

    assert_eq!(sched.running_tid(), Some(SECOND));
    assert_eq!(members(&sched, Status::Ready), REQUEUED);
    assert!(!sched.timeslice_expired());
    Ok(())
}

#[test]
fn tick_waits_while_preemption_disabled() -> Result<()> {
    let sched = scheduler_with_threads()?;
    sched.schedule();
    sched.arch().advance(100);

    sched.cpu().preempt_disable();
    sched.tick();
    assert_eq!(sched.running_tid(), Some(FIRST));

    sched.cpu().preempt_enable();
    sched.tick();
    assert_eq!(sched.running_tid(), Some(SECOND));
    Ok(())
}

#[test]
fn names_can_be_changed() -> Result<()> {
    let sched = scheduler_with_threads()?;
    sched.schedule();

    sched.set_thread_name(SECOND, "worker")?;
    sched.set_thread_name(SECOND, "")?;
    sched.set_self_name("a-very-long-thread-name")?;

    let state = sched.lock();
    assert_eq!(state.get(SECOND).ok_or(Error::Fault)?.name(), "worker");
    assert_eq!(state.get(FIRST).ok_or(Error::Fault)?.name(), "a-very-long-thr");
    Ok(())
}

#[test]
fn list_walk_starts_at_head() -> Result<()> {
    let sched = scheduler_with_threads()?;
    let state = sched.lock();
    assert_eq!(state.next_ready(None), Some(REGISTERED[0]));
    assert_eq!(state.next_ready(Some(REGISTERED[0])), Some(REGISTERED[1]));
    assert_eq!(state.next_ready(Some(REGISTERED[2])), None);
    assert_eq!(state.next_sleep(None), None);
    assert_eq!(state.first_suspend(), None);
    Ok(())
}

fn run_order(sched: &Scheduler<HostArch>, rounds: usize) -> Vec<Tid> {
    (0..rounds)
        .filter_map(|_| {
            sched.schedule();
            sched.running_tid()
        })
        .collect()
}

#[cfg(not(feature = "round_robin"))]
#[test]
fn priority_keeps_idle_off_the_processor() -> Result<()> {
    let sched = scheduler_with_threads()?;
    assert_eq!(run_order(&sched, 4), [B, A, B, A]);
    assert_eq!(sched.thread_status(IDLE), Some(Status::Ready));
    Ok(())
}

#[cfg(feature = "round_robin")]
#[test]
fn round_robin_cycles_in_arrival_order() -> Result<()> {
    let sched = scheduler_with_threads()?;
    assert_eq!(run_order(&sched, 4), [A, B, IDLE, A]);
    assert_eq!(members(&sched, Status::Ready), [B, IDLE]);
    Ok(())
}

#[cfg(feature = "round_robin")]
#[test]
fn round_robin_wakeup_appends() -> Result<()> {
    let sched = scheduler_with_threads()?;
    sched.schedule();
    sched.thread_suspend(B)?;

    sched.thread_wakeup(B)?;

    assert_eq!(members(&sched, Status::Ready), [IDLE, B]);
    assert_eq!(sched.running_tid(), Some(A));
    Ok(())
}

#[test]
fn bootstrap_marker_follows_first_switch() -> Result<()> {
    let sched = Scheduler::new(HostArch::new());
    sched.register(Thread::new(&IDLE_ATTR, entry, 0), IDLE)?;
    sched.register(Thread::new(&A_ATTR, entry, 0xa), A)?;

    sched.transition(A, Status::Running)?;
    assert_eq!(sched.running_tid(), Some(A));
    assert!(!sched.has_scheduled());

    let context = sched.pick_and_switch().ok_or(Error::Fault)?;
    assert_eq!(context.kind, SwitchKind::Bootstrap);
    assert_eq!(context.prev, None);
    assert_eq!(context.prev_sp, None);
    assert_eq!(context.next, IDLE);
    assert_eq!(sched.running_tid(), Some(IDLE));
    assert!(sched.has_scheduled());

    let context = sched.pick_and_switch().ok_or(Error::Fault)?;
    assert_eq!(context.kind, SwitchKind::Steady);
    assert_eq!(context.prev, Some(IDLE));
    Ok(())
}

#[test]
fn running_idle_refuses_to_suspend_or_sleep() -> Result<()> {
    let sched = Scheduler::new(HostArch::new());
    sched.register(Thread::new(&A_ATTR, entry, 0xa), A)?;
    sched.register(Thread::new(&IDLE_ATTR, entry, 0), IDLE)?;
    sched.schedule();
    sched.thread_suspend(A)?;
    assert_eq!(sched.running_tid(), Some(IDLE));
    let switches = sched.arch().switch_count();

    assert_eq!(sched.thread_sleep(IDLE), Err(Error::InvalidTransition));
    assert_eq!(sched.thread_suspend(IDLE), Err(Error::InvalidTransition));
    sched.self_sleep();

    assert_eq!(sched.running_tid(), Some(IDLE));
    assert_eq!(sched.thread_status(IDLE), Some(Status::Running));
    assert_eq!(
        sched.lock().get(IDLE).ok_or(Error::Fault)?.requested_status(),
        None
    );
    assert_eq!(sched.arch().switch_count(), switches);
    Ok(())
}

#[test]
fn running_thread_without_successor_stays() -> Result<()> {
    let sched = Scheduler::new(HostArch::new());
    sched.register(Thread::new(&A_ATTR, entry, 0xa), A)?;
    sched.schedule();
    assert_eq!(sched.running_tid(), Some(A));

    assert_eq!(sched.thread_suspend(A), Err(Error::Fault));
    assert_eq!(sched.thread_sleep(A), Err(Error::Fault));

    assert_eq!(sched.thread_status(A), Some(Status::Running));
    assert!(sched.lock().is_suspend_empty());
    assert_eq!(
        sched.lock().get(A).ok_or(Error::Fault)?.requested_status(),
        None
    );
    Ok(())
}

#[test]
fn check_transition_leaves_state_alone() -> Result<()> {
    let sched = scheduler_with_threads()?;
    sched.schedule();

    let state = sched.lock();
    assert_eq!(state.check_transition(SECOND, Status::Suspend), Ok(()));
    assert_eq!(state.check_transition(FIRST, Status::Sleep), Ok(()));
    assert_eq!(
        state.check_transition(FIRST, Status::Running),
        Err(Error::InvalidTransition)
    );
    assert_eq!(
        state.check_transition(IDLE, Status::Suspend),
        Err(Error::InvalidTransition)
    );
    assert_eq!(state.check_transition(9, Status::Ready), Err(Error::Fault));
    assert_eq!(state.get(SECOND).map(Thread::status), Some(Status::Ready));
    assert_eq!(state.get(SECOND).and_then(Thread::requested_status), None);
    Ok(())
}
