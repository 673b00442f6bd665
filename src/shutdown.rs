use tokio::sync::broadcast::{self, error::TryRecvError};

/// Sending half of the one-shot stop broadcast. `trigger` consumes the
/// trigger, so the signal can be raised at most once and never reset.
#[derive(Debug)]
pub struct StopTrigger {
    tx: broadcast::Sender<()>,
}

/// Receiving half held by each worker.
#[derive(Debug)]
pub struct StopSignal {
    rx: broadcast::Receiver<()>,
    raised: bool,
}

pub fn stop_channel() -> StopTrigger {
    let (tx, _) = broadcast::channel::<()>(1);
    StopTrigger { tx }
}

impl StopTrigger {
    pub fn subscribe(&self) -> StopSignal {
        StopSignal {
            rx: self.tx.subscribe(),
            raised: false,
        }
    }

    /// Raises the signal for every subscriber. Returns how many were listening.
    pub fn trigger(self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }
}

impl StopSignal {
    /// Non-blocking poll. Once raised it stays raised; a dropped trigger
    /// counts as raised too.
    pub fn is_raised(&mut self) -> bool {
        if !self.raised {
            self.raised = !matches!(self.rx.try_recv(), Err(TryRecvError::Empty));
        }
        self.raised
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_is_sticky_once_raised() {
        let trigger = stop_channel();
        let mut a = trigger.subscribe();
        let mut b = trigger.subscribe();
        assert!(!a.is_raised());

        assert_eq!(trigger.trigger(), 2);
        assert!(a.is_raised());
        assert!(a.is_raised());
        assert!(b.is_raised());
    }

    #[test]
    fn trigger_without_subscribers_is_harmless() {
        assert_eq!(stop_channel().trigger(), 0);
    }

    #[test]
    fn dropped_trigger_stops_workers() {
        let trigger = stop_channel();
        let mut signal = trigger.subscribe();
        drop(trigger);
        assert!(signal.is_raised());
    }
}
