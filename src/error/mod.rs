//! Error module for the observable registry
//!
//! This module defines error codes and error types used throughout the crate.
//! Unknown topics are never an error; publishing to or unsubscribing from a
//! key nobody listens on is a silent no-op.

use thiserror::Error;
use std::fmt;

use crate::observable::subscriber::SubscriberError;
use crate::observable::types::Topic;

/// Error code attached to every registry error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Registration errors (0x0001-0x0100)
    DuplicateSubscription = 0x0001,

    // Delivery errors (0x0101-0x0200)
    SubscriberFailed = 0x0101,
    SubscriberPanicked = 0x0102,
    PublishAborted = 0x0103,
    PublishCancelled = 0x0104,

    // System errors (0x0301-0x0400)
    InternalError = 0x0301,
    ConfigInvalid = 0x0302,
}

impl ErrorCode {
    /// Get the error code as a u16
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Get the error code category
    pub fn category(&self) -> ErrorCategory {
        match self.as_u16() {
            0x0001..=0x0100 => ErrorCategory::Registration,
            0x0101..=0x0200 => ErrorCategory::Delivery,
            0x0301..=0x0400 => ErrorCategory::System,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Try to convert a u16 to an ErrorCode
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            0x0001 => Some(Self::DuplicateSubscription),
            0x0101 => Some(Self::SubscriberFailed),
            0x0102 => Some(Self::SubscriberPanicked),
            0x0103 => Some(Self::PublishAborted),
            0x0104 => Some(Self::PublishCancelled),
            0x0301 => Some(Self::InternalError),
            0x0302 => Some(Self::ConfigInvalid),
            _ => None,
        }
    }

    /// Get a human-readable description of the error code
    pub fn description(&self) -> &'static str {
        match self {
            Self::DuplicateSubscription => "Subscriber is already registered for this topic",
            Self::SubscriberFailed => "Subscriber callback returned an error",
            Self::SubscriberPanicked => "Subscriber callback panicked",
            Self::PublishAborted => "Publish aborted after a subscriber failure",
            Self::PublishCancelled => "Publish cancelled before all subscribers were notified",
            Self::InternalError => "Unexpected internal error",
            Self::ConfigInvalid => "Invalid configuration",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DuplicateSubscription => "DUPLICATE_SUBSCRIPTION",
            Self::SubscriberFailed => "SUBSCRIBER_FAILED",
            Self::SubscriberPanicked => "SUBSCRIBER_PANICKED",
            Self::PublishAborted => "PUBLISH_ABORTED",
            Self::PublishCancelled => "PUBLISH_CANCELLED",
            Self::InternalError => "INTERNAL_ERROR",
            Self::ConfigInvalid => "CONFIG_INVALID",
        };
        write!(f, "{} (0x{:04X})", name, self.as_u16())
    }
}

/// Error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Registration,
    Delivery,
    System,
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registration => write!(f, "Registration"),
            Self::Delivery => write!(f, "Delivery"),
            Self::System => write!(f, "System"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Errors raised by registry mutations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{}: subscriber '{subscriber}' already subscribed to topic '{topic}'", ErrorCode::DuplicateSubscription)]
    DuplicateSubscription {
        subscriber: String,
        topic: Topic,
    },
}

impl RegistryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DuplicateSubscription { .. } => ErrorCode::DuplicateSubscription,
        }
    }
}

/// How a single subscriber callback failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// `update` returned an error
    Returned(SubscriberError),
    /// `update` panicked; the payload message if it was a string
    Panicked(String),
}

/// A failed delivery to one subscriber of a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberFailure {
    pub subscriber: String,
    pub topic: Topic,
    /// Position of the subscriber in the snapshot
    pub position: usize,
    pub kind: FailureKind,
}

impl SubscriberFailure {
    pub fn code(&self) -> ErrorCode {
        match self.kind {
            FailureKind::Returned(_) => ErrorCode::SubscriberFailed,
            FailureKind::Panicked(_) => ErrorCode::SubscriberPanicked,
        }
    }
}

impl fmt::Display for SubscriberFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: subscriber '{}' failed on topic '{}': ", self.code(), self.subscriber, self.topic)?;
        match &self.kind {
            FailureKind::Returned(e) => write!(f, "{}", e),
            FailureKind::Panicked(msg) => write!(f, "panicked: {}", msg),
        }
    }
}

impl std::error::Error for SubscriberFailure {}

/// Outcome of a publish that did not reach every subscriber cleanly
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// `abort` policy: the first failure stopped delivery
    #[error("{}: {failure} ({skipped} subscriber(s) skipped)", ErrorCode::PublishAborted)]
    Aborted {
        failure: SubscriberFailure,
        skipped: usize,
    },

    /// `continue_and_collect` policy: every subscriber was tried
    #[error("{} of {attempted} subscriber(s) failed on topic '{topic}'", .failures.len())]
    Aggregate {
        topic: Topic,
        attempted: usize,
        failures: Vec<SubscriberFailure>,
    },

    /// Delivery was cancelled between two subscribers
    #[error("{}: {delivered} delivered, {skipped} skipped on topic '{topic}'", ErrorCode::PublishCancelled)]
    Cancelled {
        topic: Topic,
        delivered: usize,
        skipped: usize,
        failures: Vec<SubscriberFailure>,
    },

    #[error("{}: {}", ErrorCode::InternalError, .0)]
    Internal(String),
}

impl PublishError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Aborted { .. } => ErrorCode::PublishAborted,
            Self::Aggregate { .. } => ErrorCode::SubscriberFailed,
            Self::Cancelled { .. } => ErrorCode::PublishCancelled,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// All subscriber failures carried by this error
    pub fn failures(&self) -> &[SubscriberFailure] {
        match self {
            Self::Aborted { failure, .. } => std::slice::from_ref(failure),
            Self::Aggregate { failures, .. } | Self::Cancelled { failures, .. } => failures,
            Self::Internal(_) => &[],
        }
    }
}

/// Main error type for configuration and process-level failures
#[derive(Error, Debug)]
pub enum ObservableError {
    #[error("{code}: {message}")]
    Standard {
        code: ErrorCode,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl ObservableError {
    /// Create a new standard error with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Standard {
            code,
            message: message.into(),
        }
    }

    /// Get the error code, if one applies
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Standard { code, .. } => Some(*code),
            Self::Registry(e) => Some(e.code()),
            Self::Publish(e) => Some(e.code()),
            Self::Io(_) => None,
        }
    }
}

/// Result type alias for configuration and process-level operations
pub type Result<T> = std::result::Result<T, ObservableError>;
