//! Batch jobs: requests, lifecycle states and per-request results

use std::fmt;

/// Lifecycle of an asynchronous batch job.
///
/// `Prepared` and `Submitted` are local states; the rest are reported by the
/// provider and normalized from its own status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchStatus {
    /// Request file written, not yet sent
    Prepared,

    /// Accepted by the provider
    Submitted,

    /// Provider is validating the input
    Validating,

    /// Provider is working through the requests
    Processing,

    /// All requests finished; results can be fetched
    Completed,

    /// The job failed as a whole
    Failed,

    /// The job ran out of its completion window
    Expired,

    /// The job was cancelled
    Cancelled,
}

impl BatchStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Prepared => "prepared",
            BatchStatus::Submitted => "submitted",
            BatchStatus::Validating => "validating",
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
            BatchStatus::Expired => "expired",
            BatchStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a normalized status name
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "prepared" => Some(BatchStatus::Prepared),
            "submitted" => Some(BatchStatus::Submitted),
            "validating" => Some(BatchStatus::Validating),
            "processing" => Some(BatchStatus::Processing),
            "completed" => Some(BatchStatus::Completed),
            "failed" => Some(BatchStatus::Failed),
            "expired" => Some(BatchStatus::Expired),
            "cancelled" => Some(BatchStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchStatus::Completed
                | BatchStatus::Failed
                | BatchStatus::Expired
                | BatchStatus::Cancelled
        )
    }

    /// Only a completed job has results worth loading.
    pub fn is_success(&self) -> bool {
        *self == BatchStatus::Completed
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-state request counts as reported by a provider.
///
/// Providers report different subsets, so every counter is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCounts {
    /// Requests still in flight
    pub processing: Option<u64>,
    /// Requests that produced a response
    pub succeeded: Option<u64>,
    /// Requests that errored
    pub errored: Option<u64>,
    /// Requests cancelled before completion
    pub canceled: Option<u64>,
    /// Requests that expired
    pub expired: Option<u64>,
    /// Total requests in the job
    pub total: Option<u64>,
    /// Requests completed
    pub completed: Option<u64>,
    /// Requests failed
    pub failed: Option<u64>,
}

impl RequestCounts {
    /// The counters the provider actually reported, in a stable order.
    pub fn entries(&self) -> Vec<(&'static str, u64)> {
        [
            ("processing", self.processing),
            ("succeeded", self.succeeded),
            ("errored", self.errored),
            ("canceled", self.canceled),
            ("expired", self.expired),
            ("total", self.total),
            ("completed", self.completed),
            ("failed", self.failed),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }
}

/// A point-in-time view of a batch job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSnapshot {
    /// Provider-assigned job identifier
    pub batch_id: String,

    /// Normalized lifecycle state
    pub status: BatchStatus,

    /// The provider's own status string, kept for display
    pub provider_status: String,

    /// Request counters
    pub counts: RequestCounts,
}

/// One prompt destined for a batch request file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    /// Correlation id; the fragment id in practice
    pub custom_id: String,

    /// System message
    pub system_message: String,

    /// User prompt
    pub user_prompt: String,
}

/// What a provider produced for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The model responded with this text
    Succeeded(String),

    /// The request failed at the provider
    Errored(String),

    /// The provider reported success but no response text was present
    Missing(String),
}

/// A single normalized result line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    /// Correlation id matching [`BatchRequest::custom_id`]
    pub custom_id: String,

    /// Outcome of the request
    pub outcome: BatchOutcome,
}

impl BatchResult {
    /// A successful result
    pub fn succeeded(custom_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            outcome: BatchOutcome::Succeeded(text.into()),
        }
    }

    /// A failed result
    pub fn errored(custom_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            outcome: BatchOutcome::Errored(error.into()),
        }
    }

    /// A result with no response text
    pub fn missing(custom_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            outcome: BatchOutcome::Missing(reason.into()),
        }
    }
}
