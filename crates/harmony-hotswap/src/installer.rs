//! One-time installation of the reload-notification subscription.

use std::sync::OnceLock;

/// Runs a subscription exactly once per process lifetime of the installer.
///
/// Callers that lose the race wait until the winning `subscribe` returns.
/// If `subscribe` panics, the panic reaches the winning caller and the
/// installer stays uninstalled; the next caller runs its own `subscribe`.
#[derive(Debug)]
pub struct ReloadHookInstaller {
    done: OnceLock<()>,
}

impl ReloadHookInstaller {
    pub const fn new() -> Self {
        Self {
            done: OnceLock::new(),
        }
    }

    /// Runs `subscribe` if no caller has done so yet. Returns whether this
    /// caller ran it.
    pub fn try_install(&self, subscribe: impl FnOnce()) -> bool {
        let mut installed = false;
        self.done.get_or_init(|| {
            subscribe();
            installed = true;
        });
        installed
    }

    pub fn is_installed(&self) -> bool {
        self.done.get().is_some()
    }
}

impl Default for ReloadHookInstaller {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::*;

    #[test]
    fn test_second_install_is_noop() {
        let installer = ReloadHookInstaller::new();
        let calls = AtomicUsize::new(0);

        assert!(!installer.is_installed());
        assert!(installer.try_install(|| {
            calls.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(!installer.try_install(|| {
            calls.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(installer.is_installed());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_subscribe_allows_retry() {
        let installer = ReloadHookInstaller::new();

        let first = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            installer.try_install(|| panic!("subscribe failed"))
        }));
        assert!(first.is_err());
        assert!(!installer.is_installed());

        assert!(installer.try_install(|| {}));
        assert!(installer.is_installed());
        assert!(!installer.try_install(|| {}));
    }

    #[test]
    fn test_concurrent_installs_subscribe_once() {
        const THREADS: usize = 32;

        let installer = Arc::new(ReloadHookInstaller::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let installer = Arc::clone(&installer);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    installer.try_install(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("installer thread"))
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
