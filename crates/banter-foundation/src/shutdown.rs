use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Notify;

/// Process-wide shutdown latch. `install` wires Ctrl-C and the panic hook;
/// cloned tokens share the underlying flag.
#[derive(Clone)]
pub struct ShutdownToken {
    requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownToken {
    pub fn install() -> Self {
        let token = Self {
            requested: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        };

        let signal_token = token.clone();
        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown requested via Ctrl-C");
                    signal_token.request();
                }
                Err(e) => {
                    tracing::error!("Failed to install Ctrl-C handler: {}", e);
                }
            }
        });

        let original_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            tracing::error!("PANIC: {}", panic_info);
            original_panic(panic_info);
        }));

        token
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub async fn wait(&self) {
        let notified = self.notify.notified();
        if self.is_requested() {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_unblocks_waiters() {
        let token = ShutdownToken {
            requested: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        };
        assert!(!token.is_requested());

        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });

        tokio::task::yield_now().await;
        token.request();
        handle.await.unwrap();
        assert!(token.is_requested());
    }

    #[tokio::test]
    async fn wait_returns_immediately_after_request() {
        let token = ShutdownToken {
            requested: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        };
        token.request();
        token.wait().await;
    }
}
