//! Error types for the pool runtime

/// Result type for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors that can occur in the pool runtime
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PoolError {
    /// Invalid configuration with parameter
    #[error("Invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Configuration parameter name
        parameter: String,
        /// Error message
        message: String,
    },

    /// Pool has no live configuration
    #[error("Pool is not configured: call configure_dynamic or configure_fixed first")]
    NotConfigured,

    /// A ring rejected an enqueue because it is at capacity
    ///
    /// Recoverable: the caller is expected to apply backpressure, typically
    /// by waiting for the current batch to drain.
    #[error("Job ring is full: {occupancy}/{capacity} descriptors queued")]
    RingFull {
        /// Occupancy observed at rejection time
        occupancy: usize,
        /// Ring capacity
        capacity: usize,
    },

    /// Failed to spawn a worker thread
    ///
    /// Fatal to the configuration attempt: the pool rolls back to an
    /// unconfigured state, leaving no partially started workers behind.
    #[error("Failed to spawn worker thread #{worker_id}: {message}")]
    Spawn {
        /// ID of the worker that failed to spawn
        worker_id: usize,
        /// Error message
        message: String,
        /// Source IO error
        #[source]
        source: Option<std::io::Error>,
    },

    /// Failed to join a worker thread
    #[error("Failed to join worker thread #{worker_id}: {message}")]
    Join {
        /// ID of the worker that failed to join
        worker_id: usize,
        /// Error message
        message: String,
    },

    /// Slot index outside the preallocated descriptor ring
    #[error("Slot {slot} is out of range: job capacity is {capacity}")]
    SlotOutOfRange {
        /// Offending slot index
        slot: usize,
        /// Configured job capacity
        capacity: usize,
    },

    /// Worker index outside the configured thread count
    #[error("Worker {worker_id} is out of range: pool has {threads} threads")]
    WorkerOutOfRange {
        /// Offending worker index
        worker_id: usize,
        /// Configured thread count
        threads: usize,
    },

    /// General error
    #[error("{0}")]
    Other(String),
}

impl PoolError {
    /// Create an invalid config error
    pub fn invalid_config(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        PoolError::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a ring full error
    pub fn ring_full(occupancy: usize, capacity: usize) -> Self {
        PoolError::RingFull {
            occupancy,
            capacity,
        }
    }

    /// Create a spawn error
    pub fn spawn(worker_id: usize, message: impl Into<String>) -> Self {
        PoolError::Spawn {
            worker_id,
            message: message.into(),
            source: None,
        }
    }

    /// Create a spawn error with source
    pub fn spawn_with_source(
        worker_id: usize,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        PoolError::Spawn {
            worker_id,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a join error
    pub fn join(worker_id: usize, message: impl Into<String>) -> Self {
        PoolError::Join {
            worker_id,
            message: message.into(),
        }
    }

    /// Create a slot out of range error
    pub fn slot_out_of_range(slot: usize, capacity: usize) -> Self {
        PoolError::SlotOutOfRange { slot, capacity }
    }

    /// Create a worker out of range error
    pub fn worker_out_of_range(worker_id: usize, threads: usize) -> Self {
        PoolError::WorkerOutOfRange { worker_id, threads }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        PoolError::Other(msg.into())
    }
}
