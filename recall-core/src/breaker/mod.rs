//! # Circuit Breaker
//!
//! Fails fast when an external service keeps failing, and probes for
//! recovery after a cooldown.
//!
//! ## Circuit states
//!
//! - **Closed**: normal operation, all requests pass through
//! - **Open**: too many consecutive failures, requests fail immediately
//! - **Half-open**: cooldown elapsed, one request probes recovery
//!
//! Breakers are process-wide and keyed by service name through
//! [`BreakerRegistry`]; the LLM extractor and the embedder each get their
//! own.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation - requests pass through
    Closed,
    /// Too many failures - reject requests immediately
    Open,
    /// Testing recovery - allow a probe request
    HalfOpen,
}

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive recoverable failures before opening (default: 5)
    pub failure_threshold: u32,
    /// Cooldown before attempting half-open (default: 60s)
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

/// Circuit breaker statistics
#[derive(Debug, Clone, Default)]
pub struct CircuitBreakerStats {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    /// Calls rejected while the circuit was open.
    pub rejected_calls: u64,
    pub consecutive_failures: u32,
    pub circuit_opened_count: u32,
}

struct BreakerState {
    state: CircuitState,
    stats: CircuitBreakerStats,
    last_failure_time: Option<Instant>,
}

impl Default for BreakerState {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            stats: CircuitBreakerStats::default(),
            last_failure_time: None,
        }
    }
}

/// Per-service circuit breaker.
pub struct CircuitBreaker {
    service: String,
    config: CircuitBreakerConfig,
    state: Arc<RwLock<BreakerState>>,
}

impl CircuitBreaker {
    /// Create a breaker for a named service.
    pub fn new(service: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let service = service.into();
        info!(
            "Initializing circuit breaker for '{}': threshold={}, recovery={:?}",
            service, config.failure_threshold, config.recovery_timeout
        );

        Self {
            service,
            config,
            state: Arc::new(RwLock::new(BreakerState::default())),
        }
    }

    /// Execute an operation protected by the circuit breaker.
    ///
    /// Returns [`Error::CircuitOpen`] without invoking the operation while
    /// the circuit is open.
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !self.should_allow_request().await {
            let mut state = self.state.write().await;
            state.stats.rejected_calls += 1;
            debug!(
                "Circuit breaker '{}' rejecting request - circuit is open",
                self.service
            );
            return Err(Error::CircuitOpen {
                service: self.service.clone(),
                retry_after: self.config.recovery_timeout,
            });
        }

        {
            let mut state = self.state.write().await;
            state.stats.total_calls += 1;
        }

        let result = operation().await;
        self.on_result(&result).await;
        result
    }

    async fn should_allow_request(&self) -> bool {
        let now = Instant::now();
        let mut state = self.state.write().await;

        match state.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => match state.last_failure_time {
                Some(last_failure)
                    if now.duration_since(last_failure) >= self.config.recovery_timeout =>
                {
                    info!(
                        "Circuit breaker '{}' transitioning to half-open",
                        self.service
                    );
                    state.state = CircuitState::HalfOpen;
                    true
                }
                _ => false,
            },
        }
    }

    async fn on_result<T>(&self, result: &Result<T>) {
        let mut state = self.state.write().await;

        match result {
            Ok(_) => {
                state.stats.successful_calls += 1;
                self.on_success(&mut state);
            }
            Err(e) => {
                // Only recoverable errors count towards tripping the
                // breaker; a validation failure says nothing about the
                // service's health.
                if e.is_recoverable() {
                    state.stats.failed_calls += 1;
                    self.on_failure(&mut state);
                } else {
                    debug!(
                        "Non-recoverable error, not affecting circuit '{}': {}",
                        self.service, e
                    );
                }
            }
        }
    }

    fn on_success(&self, state: &mut BreakerState) {
        match state.state {
            CircuitState::HalfOpen => {
                info!(
                    "Circuit breaker '{}' closing after successful recovery probe",
                    self.service
                );
                state.state = CircuitState::Closed;
                state.stats.consecutive_failures = 0;
                state.last_failure_time = None;
            }
            CircuitState::Closed => {
                state.stats.consecutive_failures = 0;
            }
            CircuitState::Open => {
                warn!("Unexpected success in open state for '{}'", self.service);
            }
        }
    }

    fn on_failure(&self, state: &mut BreakerState) {
        state.stats.consecutive_failures += 1;
        state.last_failure_time = Some(Instant::now());

        match state.state {
            CircuitState::Closed => {
                if state.stats.consecutive_failures >= self.config.failure_threshold {
                    warn!(
                        "Circuit breaker '{}' opening after {} consecutive failures",
                        self.service, state.stats.consecutive_failures
                    );
                    state.state = CircuitState::Open;
                    state.stats.circuit_opened_count += 1;
                }
            }
            CircuitState::HalfOpen => {
                warn!(
                    "Circuit breaker '{}' reopening after failed recovery probe",
                    self.service
                );
                state.state = CircuitState::Open;
                state.stats.circuit_opened_count += 1;
            }
            CircuitState::Open => {}
        }
    }

    /// Current state of the circuit.
    pub async fn state(&self) -> CircuitState {
        self.state.read().await.state
    }

    /// Snapshot of the breaker's counters.
    pub async fn stats(&self) -> CircuitBreakerStats {
        self.state.read().await.stats.clone()
    }

    /// Force the circuit closed (testing and manual intervention).
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        info!("Circuit breaker '{}' reset to closed state", self.service);
        state.state = CircuitState::Closed;
        state.stats.consecutive_failures = 0;
        state.last_failure_time = None;
    }
}

/// Process-wide registry of breakers keyed by service name.
#[derive(Default)]
pub struct BreakerRegistry {
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
    config: CircuitBreakerConfig,
}

impl BreakerRegistry {
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Fetch the breaker for a service, creating it on first use.
    pub fn breaker(&self, service: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock();
        Arc::clone(breakers.entry(service.to_string()).or_insert_with(|| {
            Arc::new(CircuitBreaker::new(service, self.config.clone()))
        }))
    }
}
