//! Background service framework
//!
//! The two maintenance workers run as independent fixed-interval tasks,
//! fully decoupled from request handling. Each implements [`Service`] and is
//! driven by a [`ServiceManager`] that owns the shared shutdown channel and
//! waits (with a timeout) for clean termination.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Trait for long-running background services
#[async_trait::async_trait]
pub trait Service: Send + Sync {
    /// Run the service's main loop until the shutdown signal fires
    async fn start(&self, shutdown: broadcast::Receiver<()>) -> Result<(), ServiceError>;

    /// Service name for logging
    fn name(&self) -> &'static str;

    /// Current status
    fn status(&self) -> ServiceStatus;
}

/// Status of a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Service is running normally
    Running,
    /// Service has stopped
    Stopped,
    /// Service failed with an error
    Failed(String),
}

impl ServiceStatus {
    /// Check if the service is in a healthy state
    pub fn is_healthy(&self) -> bool {
        matches!(self, ServiceStatus::Running)
    }
}

/// Errors that can occur in services
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Service encountered an error during execution
    #[error("Service runtime error: {0}")]
    RuntimeError(String),

    /// Service failed to shut down cleanly
    #[error("Service shutdown error: {0}")]
    ShutdownError(String),
}

/// Coordinates service startup and graceful shutdown
pub struct ServiceManager {
    shutdown_tx: broadcast::Sender<()>,
    tasks: Mutex<Vec<(&'static str, JoinHandle<Result<(), ServiceError>>)>>,
    shutdown_timeout: Duration,
}

impl ServiceManager {
    /// Create a manager with the given shutdown timeout
    pub fn new(shutdown_timeout: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
            shutdown_timeout,
        }
    }

    /// Spawn a service onto the runtime
    pub fn spawn(&self, service: Arc<dyn Service>) {
        let name = service.name();
        let shutdown_rx = self.shutdown_tx.subscribe();
        let task = tokio::spawn(async move { service.start(shutdown_rx).await });
        self.tasks.lock().push((name, task));
        tracing::debug!(service = name, "Service spawned");
    }

    /// Signal shutdown and wait for every service to stop
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        let _ = self.shutdown_tx.send(());

        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        let deadline = Instant::now() + self.shutdown_timeout;

        for (name, task) in tasks {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, task).await {
                Ok(Ok(Ok(()))) => {
                    tracing::debug!(service = name, "Service stopped gracefully");
                }
                Ok(Ok(Err(e))) => {
                    tracing::warn!(service = name, error = %e, "Service stopped with error");
                }
                Ok(Err(e)) => {
                    tracing::error!(service = name, error = %e, "Service task panicked");
                }
                Err(_) => {
                    tracing::warn!(service = name, "Service shutdown timed out");
                }
            }
        }
        Ok(())
    }
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct TestService {
        status: RwLock<ServiceStatus>,
        stopped: AtomicBool,
    }

    impl TestService {
        fn new() -> Self {
            Self {
                status: RwLock::new(ServiceStatus::Stopped),
                stopped: AtomicBool::new(false),
            }
        }
    }

    #[async_trait::async_trait]
    impl Service for TestService {
        async fn start(&self, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServiceError> {
            *self.status.write() = ServiceStatus::Running;
            let _ = shutdown.recv().await;
            *self.status.write() = ServiceStatus::Stopped;
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &'static str {
            "test"
        }

        fn status(&self) -> ServiceStatus {
            self.status.read().clone()
        }
    }

    #[tokio::test]
    async fn test_manager_lifecycle() {
        let manager = ServiceManager::default();
        let service = Arc::new(TestService::new());
        manager.spawn(service.clone());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(service.status().is_healthy());

        manager.shutdown().await.unwrap();
        assert!(service.stopped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_status_health() {
        assert!(ServiceStatus::Running.is_healthy());
        assert!(!ServiceStatus::Stopped.is_healthy());
        assert!(!ServiceStatus::Failed("boom".to_string()).is_healthy());
    }
}
