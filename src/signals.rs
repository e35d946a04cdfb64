//! Monitoring of OS signals for the duration of one command execution.

use crate::interrupt::Signal;
use std::fmt;
use std::io;

/// Callback receiving the signals caught by a subscription.
pub type SignalSink = Box<dyn Fn(Signal) + Send + Sync>;

/// A source of interrupting signals.
///
/// The execution controller subscribes right before a command is dispatched and drops
/// the [`Subscription`] as soon as the command is done or cancelled, so signals are only
/// intercepted while a command runs.
pub trait SignalSource: Send + Sync {
    /// Starts forwarding signals to `sink` until the subscription is dropped.
    fn subscribe(&self, sink: SignalSink) -> io::Result<Subscription>;
}

/// An active signal subscription, torn down on drop.
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// A subscription running `teardown` when dropped.
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A subscription with nothing to tear down.
    pub fn inert() -> Self {
        Self { teardown: None }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.teardown.is_some())
            .finish()
    }
}

/// Process signals (`SIGINT`, `SIGTERM`, `SIGQUIT`), delivered through `signal-hook`.
///
/// Outside of subscriptions the signals keep their default action.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSignals;

#[cfg(unix)]
impl SignalSource for OsSignals {
    fn subscribe(&self, sink: SignalSink) -> io::Result<Subscription> {
        use signal_hook::iterator::Signals;

        defaults::enter()?;
        let started = Signals::new(Signal::ALL.map(Signal::number)).and_then(|mut signals| {
            let handle = signals.handle();
            let forwarder = std::thread::Builder::new()
                .name("signal-monitor".to_string())
                .spawn(move || {
                    for number in signals.forever() {
                        match Signal::from_number(number) {
                            Some(signal) => sink(signal),
                            None => log::trace!("ignoring signal {number}"),
                        }
                    }
                })?;
            Ok((handle, forwarder))
        });
        let (handle, forwarder) = match started {
            Ok(started) => started,
            Err(err) => {
                defaults::leave();
                return Err(err);
            }
        };

        Ok(Subscription::new(move || {
            handle.close();
            if forwarder.join().is_err() {
                log::warn!("signal monitor thread panicked");
            }
            defaults::leave();
        }))
    }
}

/// Default signal dispositions outside of subscriptions.
///
/// `signal-hook` never unregisters the handler installed by a subscription, so the
/// default action is emulated instead whenever no subscription is live.
#[cfg(unix)]
mod defaults {
    use crate::interrupt::Signal;
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex, PoisonError};

    struct Defaults {
        /// True while no subscription is live.
        idle: Arc<AtomicBool>,
        live: usize,
    }

    static DEFAULTS: Mutex<Option<Defaults>> = Mutex::new(None);

    /// Marks a subscription as live, registering the default actions on first use.
    pub(super) fn enter() -> io::Result<()> {
        let mut slot = DEFAULTS.lock().unwrap_or_else(PoisonError::into_inner);
        let mut defaults = match slot.take() {
            Some(defaults) => defaults,
            None => {
                let idle = Arc::new(AtomicBool::new(true));
                for signal in Signal::ALL {
                    signal_hook::flag::register_conditional_default(signal.number(), idle.clone())?;
                }
                Defaults { idle, live: 0 }
            }
        };
        defaults.live += 1;
        defaults.idle.store(false, Ordering::SeqCst);
        *slot = Some(defaults);
        Ok(())
    }

    /// Ends a subscription. The default actions apply again once none is live.
    pub(super) fn leave() {
        let mut slot = DEFAULTS.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(defaults) = slot.as_mut() {
            defaults.live = defaults.live.saturating_sub(1);
            if defaults.live == 0 {
                defaults.idle.store(true, Ordering::SeqCst);
            }
        }
    }
}

#[cfg(not(unix))]
impl SignalSource for OsSignals {
    fn subscribe(&self, _sink: SignalSink) -> io::Result<Subscription> {
        log::debug!("signal monitoring is not supported on this platform");
        Ok(Subscription::inert())
    }
}
