// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::time::Duration;

use crate::remote::ApiError;

/// Errors surfaced by the logger.
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to write log file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to deliver batch: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Logger service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Why a batch could not be delivered to the remote service.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("throttled by remote service: {0}")]
    Throttled(ApiError),

    #[error("sequence token conflict persisted after retry: {0}")]
    SequenceConflict(ApiError),

    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("delivery failed after {attempts} attempts: {error}")]
    Other { attempts: usize, error: ApiError },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = LoggerError::InvalidConfig("missing stream".to_string());
        assert_eq!(error.to_string(), "Invalid configuration: missing stream");

        let error = LoggerError::Io {
            path: PathBuf::from("/var/log/app.log"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(
            error.to_string(),
            "Failed to write log file /var/log/app.log: denied"
        );
    }

    #[test]
    fn test_delivery_error_display() {
        let error = DeliveryError::Throttled(ApiError::new("ThrottlingException", "Rate exceeded"));
        assert_eq!(
            error.to_string(),
            "throttled by remote service: ThrottlingException: Rate exceeded"
        );

        let error: LoggerError = DeliveryError::Timeout(Duration::from_secs(5)).into();
        assert_eq!(
            error.to_string(),
            "Failed to deliver batch: delivery timed out after 5s"
        );

        let error = DeliveryError::Other {
            attempts: 3,
            error: ApiError::new("ServiceUnavailableException", "try later"),
        };
        assert!(error.to_string().contains("after 3 attempts"));
    }
}
