//! Cancellable contexts shared between the console and running commands.
//!
//! A [`Context`] is done once it has been cancelled with a [`Cause`]. Cancellation is
//! cooperative: commands receive the context of their execution and are expected to
//! check it (or wait on it) regularly. The first cancellation wins, so whichever of
//! "command finished" and "signal received" happens first decides the outcome of an
//! execution.

use crate::interrupt::Signal;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

/// Why a context is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cause {
    /// The command ran to completion.
    Completed,
    /// The command (or one of the post-run hooks) returned an error.
    Failed,
    /// The context was cancelled by its owner.
    Canceled,
    /// The context deadline passed.
    DeadlineExceeded,
    /// An OS signal was caught while the command was running.
    Signal(Signal),
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Completed => f.write_str("completed"),
            Cause::Failed => f.write_str("failed"),
            Cause::Canceled => f.write_str("context canceled"),
            Cause::DeadlineExceeded => f.write_str("context deadline exceeded"),
            Cause::Signal(signal) => write!(f, "{signal}"),
        }
    }
}

struct Inner {
    deadline: Option<Instant>,
    cause: Mutex<Option<Cause>>,
    done: Condvar,
    children: Mutex<Vec<Weak<Inner>>>,
}

/// A cancellable context, cheap to clone.
///
/// Child contexts are cancelled together with their parent, and inherit its deadline.
///
/// ```
/// use menu_console::context::{Cause, Context};
/// let root = Context::background();
/// let child = root.with_cancel();
/// root.cancel(Cause::Canceled);
/// assert_eq!(child.cause(), Some(Cause::Canceled));
/// ```
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    /// A root context that is never done unless cancelled.
    pub fn background() -> Self {
        Self::with_parts(None)
    }

    fn with_parts(deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner {
                deadline,
                cause: Mutex::new(None),
                done: Condvar::new(),
                children: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Derives a child context that can be cancelled on its own.
    pub fn with_cancel(&self) -> Self {
        self.child(self.inner.deadline)
    }

    /// Derives a child context that is done at `deadline` at the latest.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.inner.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        self.child(Some(deadline))
    }

    /// Derives a child context that is done after `timeout` at the latest.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    fn child(&self, deadline: Option<Instant>) -> Self {
        let child = Self::with_parts(deadline);
        {
            let mut children = lock(&self.inner.children);
            children.retain(|weak| weak.strong_count() > 0);
            children.push(Arc::downgrade(&child.inner));
        }
        // The parent may have been cancelled before the child was registered.
        if let Some(cause) = self.cause() {
            child.cancel(cause);
        }
        child
    }

    /// Cancels the context and all of its children.
    ///
    /// Returns `false` if the context was already done, in which case the first cause
    /// is kept.
    pub fn cancel(&self, cause: Cause) -> bool {
        {
            let mut current = lock(&self.inner.cause);
            if current.is_some() {
                return false;
            }
            *current = Some(cause);
        }
        self.inner.done.notify_all();

        let children = std::mem::take(&mut *lock(&self.inner.children));
        for child in children.iter().filter_map(Weak::upgrade) {
            Context { inner: child }.cancel(cause);
        }
        true
    }

    /// The deadline of this context, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// The reason this context is done, or `None` while it is still running.
    pub fn cause(&self) -> Option<Cause> {
        let cause = *lock(&self.inner.cause);
        if cause.is_none() && self.deadline_passed() {
            self.cancel(Cause::DeadlineExceeded);
            return *lock(&self.inner.cause);
        }
        cause
    }

    /// Whether this context is done.
    pub fn is_done(&self) -> bool {
        self.cause().is_some()
    }

    /// Blocks until the context is done.
    pub fn wait(&self) -> Cause {
        loop {
            if let Some(cause) = self.wait_until(self.inner.deadline) {
                return cause;
            }
        }
    }

    /// Blocks until the context is done or `timeout` elapses.
    ///
    /// Returns the cause if the context is done. Commands use this as a cancellable
    /// sleep.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Cause> {
        let until = Instant::now() + timeout;
        let until = match self.inner.deadline {
            Some(deadline) if deadline < until => deadline,
            _ => until,
        };
        self.wait_until(Some(until))
    }

    fn wait_until(&self, until: Option<Instant>) -> Option<Cause> {
        let mut cause = lock(&self.inner.cause);
        loop {
            if let Some(cause) = *cause {
                return Some(cause);
            }
            match until {
                None => {
                    cause = self
                        .inner
                        .done
                        .wait(cause)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Some(until) => {
                    let now = Instant::now();
                    if now >= until {
                        drop(cause);
                        // Reaching our own deadline cancels the context.
                        return self.cause();
                    }
                    cause = self
                        .inner
                        .done
                        .wait_timeout(cause, until - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }
    }

    fn deadline_passed(&self) -> bool {
        self.inner
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.inner.deadline)
            .field("cause", &*lock(&self.inner.cause))
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_first_cancel_wins() {
        let ctx = Context::background();
        assert!(!ctx.is_done());
        assert!(ctx.cancel(Cause::Signal(Signal::Interrupt)));
        assert!(!ctx.cancel(Cause::Completed));
        assert_eq!(ctx.cause(), Some(Cause::Signal(Signal::Interrupt)));
    }

    #[test]
    fn test_parent_cancellation_reaches_children() {
        let root = Context::background();
        let child = root.with_cancel();
        let grandchild = child.with_cancel();
        root.cancel(Cause::Canceled);
        assert_eq!(child.cause(), Some(Cause::Canceled));
        assert_eq!(grandchild.cause(), Some(Cause::Canceled));
    }

    #[test]
    fn test_child_cancellation_does_not_reach_parent() {
        let root = Context::background();
        let child = root.with_cancel();
        child.cancel(Cause::Completed);
        assert!(!root.is_done());
    }

    #[test]
    fn test_child_of_done_context_is_done() {
        let root = Context::background();
        root.cancel(Cause::Canceled);
        assert_eq!(root.with_cancel().cause(), Some(Cause::Canceled));
    }

    #[test]
    fn test_deadline_is_inherited_and_expires() {
        let root = Context::background().with_timeout(Duration::from_millis(20));
        let child = root.with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), root.deadline());
        assert_eq!(child.wait(), Cause::DeadlineExceeded);
        assert_eq!(root.cause(), Some(Cause::DeadlineExceeded));
    }

    #[test]
    fn test_wait_wakes_up_on_cancel_from_other_thread() {
        let ctx = Context::background();
        let remote = ctx.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            remote.cancel(Cause::Completed);
        });
        assert_eq!(ctx.wait(), Cause::Completed);
        canceller.join().unwrap();
    }

    #[test]
    fn test_wait_timeout_returns_none_when_still_running() {
        let ctx = Context::background();
        assert_eq!(ctx.wait_timeout(Duration::from_millis(5)), None);
        assert!(!ctx.is_done());
    }
}
