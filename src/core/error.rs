// Author: Dustin Pilgrim
// License: MIT

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Configuration was rejected at construction.
    ///
    /// Examples:
    /// - zero inactivity timeout
    /// - nothing to monitor
    InvalidConfig(ConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The inactivity timeout must be a positive number of milliseconds.
    NonPositiveTimeout,

    /// The monitored event-kind set was empty; the timer could never see
    /// activity and would sit in its initial state forever.
    NoMonitoredEvents,
}

// ---------------- Display ----------------

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfig(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonPositiveTimeout =>
                write!(f, "timeout must be positive"),
            ConfigError::NoMonitoredEvents =>
                write!(f, "monitored event set is empty"),
        }
    }
}

impl std::error::Error for Error {}
