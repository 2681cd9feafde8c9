// gl-surface-view/src/arbiter.rs
//
//! Process-wide arbitration of EGL contexts among rendering threads.
//!
//! The arbiter also owns the one monitor every rendering session synchronizes on. Session
//! state and context ownership live behind the same lock, so arbitration and session
//! transitions are never observed half-done and there is no lock ordering between
//! sessions to get wrong.

use crate::render_thread::SessionState;

use fnv::{FnvHashMap, FnvHashSet};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;

lazy_static! {
    static ref GLOBAL_ARBITER: ContextArbiter = ContextArbiter::new(ArbiterPolicy::Unrestricted);
}

/// Identifies one rendering session (one rendering thread).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionID(pub u64);

/// How many sessions may hold an EGL context at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArbiterPolicy {
    /// Every session that asks is granted a context. Ownership is still recorded for the
    /// first holder, but nobody is ever refused.
    Unrestricted,
    /// At most one session holds a context. A refused session asks the owner to release
    /// its context and waits for the hand-off. Refused sessions are served in the order
    /// they were refused.
    Exclusive,
}

/// Arbitrates context ownership among the sessions that share it.
///
/// Cloning gives another handle to the same arbiter.
#[derive(Clone)]
pub struct ContextArbiter {
    pub(crate) monitor: Arc<Monitor>,
}

impl ContextArbiter {
    pub fn new(policy: ArbiterPolicy) -> ContextArbiter {
        ContextArbiter { monitor: Arc::new(Monitor::new(policy)) }
    }

    /// The arbiter views use unless they are given one explicitly.
    pub fn global() -> ContextArbiter {
        GLOBAL_ARBITER.clone()
    }

    #[inline]
    pub fn policy(&self) -> ArbiterPolicy {
        self.monitor.state.lock().arbitration.policy
    }

    /// The session currently recorded as owning a context, if any.
    pub fn owner(&self) -> Option<SessionID> {
        self.monitor.state.lock().arbitration.egl_owner
    }

    /// How many sessions are registered, including exited ones whose view still exists.
    pub fn session_count(&self) -> usize {
        self.monitor.state.lock().sessions.len()
    }
}

pub(crate) struct Monitor {
    pub(crate) state: Mutex<MonitorState>,
    pub(crate) cond: Condvar,
}

pub(crate) struct MonitorState {
    pub(crate) arbitration: Arbitration,
    pub(crate) sessions: FnvHashMap<SessionID, SessionState>,
    next_session_id: u64,
}

pub(crate) struct Arbitration {
    policy: ArbiterPolicy,
    egl_owner: Option<SessionID>,
    release_requests: FnvHashSet<SessionID>,
    waiters: VecDeque<SessionID>,
}

impl Arbitration {
    /// Returns true, and clears the request, if `session` was asked to give up its context.
    pub(crate) fn take_release_request(&mut self, session: SessionID) -> bool {
        self.release_requests.remove(&session)
    }

    fn remove_waiter(&mut self, session: SessionID) -> bool {
        match self.waiters.iter().position(|&waiter| waiter == session) {
            Some(index) => {
                self.waiters.remove(index);
                true
            }
            None => false,
        }
    }
}

impl Monitor {
    fn new(policy: ArbiterPolicy) -> Monitor {
        Monitor {
            state: Mutex::new(MonitorState {
                arbitration: Arbitration {
                    policy,
                    egl_owner: None,
                    release_requests: FnvHashSet::default(),
                    waiters: VecDeque::new(),
                },
                sessions: FnvHashMap::default(),
                next_session_id: 0,
            }),
            cond: Condvar::new(),
        }
    }

    pub(crate) fn register_session(&self, session: SessionState) -> SessionID {
        let mut state = self.state.lock();
        let id = SessionID(state.next_session_id);
        state.next_session_id += 1;
        state.sessions.insert(id, session);
        id
    }

    pub(crate) fn unregister_session(&self, id: SessionID) {
        let mut state = self.state.lock();
        state.sessions.remove(&id);
        state.arbitration.release_requests.remove(&id);
        state.arbitration.remove_waiter(id);
        self.cond.notify_all();
    }

    // The `_locked` methods expect the caller to hold `state`.

    pub(crate) fn try_acquire_egl_context_locked(&self,
                                                 arbitration: &mut Arbitration,
                                                 session: SessionID)
                                                 -> bool {
        match arbitration.egl_owner {
            Some(owner) if owner == session => {
                self.cond.notify_all();
                true
            }
            Some(_) if arbitration.policy == ArbiterPolicy::Unrestricted => true,
            None if arbitration.policy == ArbiterPolicy::Unrestricted => {
                arbitration.egl_owner = Some(session);
                self.cond.notify_all();
                true
            }
            None => {
                // A free context goes to the longest-waiting session.
                match arbitration.waiters.front() {
                    Some(&first) if first != session => {
                        if self.enqueue_locked(arbitration, session) {
                            self.cond.notify_all();
                        }
                        false
                    }
                    _ => {
                        arbitration.remove_waiter(session);
                        arbitration.egl_owner = Some(session);
                        self.cond.notify_all();
                        true
                    }
                }
            }
            Some(owner) => {
                let queued = self.enqueue_locked(arbitration, session);
                if arbitration.release_requests.insert(owner) || queued {
                    self.cond.notify_all();
                }
                false
            }
        }
    }

    // Returns true if `session` wasn't already waiting.
    fn enqueue_locked(&self, arbitration: &mut Arbitration, session: SessionID) -> bool {
        if arbitration.waiters.contains(&session) {
            return false;
        }
        arbitration.waiters.push_back(session);
        true
    }

    /// Drops `session` from the hand-off queue once it no longer wants a context.
    pub(crate) fn withdraw_locked(&self, arbitration: &mut Arbitration, session: SessionID) {
        if arbitration.remove_waiter(session) {
            self.cond.notify_all();
        }
    }

    pub(crate) fn release_egl_context_locked(&self,
                                             arbitration: &mut Arbitration,
                                             session: SessionID) {
        if arbitration.egl_owner == Some(session) {
            arbitration.egl_owner = None;
        }
        self.cond.notify_all();
    }

    pub(crate) fn request_release_locked(&self,
                                         arbitration: &mut Arbitration,
                                         session: SessionID) {
        arbitration.release_requests.insert(session);
        self.cond.notify_all();
    }

    pub(crate) fn thread_exiting_locked(&self, state: &mut MonitorState, session: SessionID) {
        if let Some(session_state) = state.sessions.get_mut(&session) {
            session_state.exited = true;
            session_state.have_egl_surface = false;
            session_state.have_egl_context = false;
        }
        if state.arbitration.egl_owner == Some(session) {
            state.arbitration.egl_owner = None;
        }
        state.arbitration.release_requests.remove(&session);
        state.arbitration.remove_waiter(session);
        self.cond.notify_all();
    }
}
