use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// One-shot termination flag.
///
/// Starts clear and is set at most once per lifecycle. Clones share state.
/// Readers poll `is_set`; tasks that need to react promptly can `wait`.
#[derive(Debug, Clone, Default)]
pub struct TerminationFlag {
    inner: Arc<FlagInner>,
}

#[derive(Debug, Default)]
struct FlagInner {
    set: AtomicBool,
    notify: Notify,
}

impl TerminationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// A flag that is already set
    pub fn raised() -> Self {
        let flag = Self::new();
        flag.set();
        flag
    }

    /// Set the flag. Returns `true` only for the call that performed the transition.
    pub fn set(&self) -> bool {
        let transitioned = !self.inner.set.swap(true, Ordering::AcqRel);
        if transitioned {
            self.inner.notify.notify_waiters();
        }
        transitioned
    }

    pub fn is_set(&self) -> bool {
        self.inner.set.load(Ordering::Acquire)
    }

    /// Reset for a new lifecycle. Only the supervisor calls this, and only
    /// while no subordinate is running.
    pub fn clear(&self) {
        self.inner.set.store(false, Ordering::Release);
    }

    /// Resolve once the flag is set
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_set_once() {
        let flag = TerminationFlag::new();
        assert!(!flag.is_set());
        assert!(flag.set());
        assert!(flag.is_set());
        assert!(!flag.set());
        assert!(flag.is_set());
    }

    #[test]
    fn test_clones_share_state() {
        let flag = TerminationFlag::new();
        let observer = flag.clone();
        flag.set();
        assert!(observer.is_set());

        flag.clear();
        assert!(!observer.is_set());
    }

    #[test]
    fn test_raised() {
        assert!(TerminationFlag::raised().is_set());
    }

    #[tokio::test]
    async fn test_wait_wakes_on_set() {
        let flag = TerminationFlag::new();
        let waiter = flag.clone();
        let task = tokio::spawn(async move { waiter.wait().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        flag.set();

        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_on_already_set_flag() {
        let flag = TerminationFlag::raised();
        tokio::time::timeout(Duration::from_millis(100), flag.wait())
            .await
            .expect("set flag resolves immediately");
    }
}
