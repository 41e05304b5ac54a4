// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the flags client.

use thiserror::Error;

use crate::event::ClientEvent;

/// Flags client errors.
///
/// Errors are also the payload of the client's `error` event, so they are
/// cheap to clone and comparable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagsError {
	/// Client configuration is missing a required field.
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	/// The same handler was registered twice for one event.
	#[error("handler already registered for '{event}' event")]
	HandlerAlreadyRegistered { event: ClientEvent },

	/// The toggle source answered with an error status.
	#[error("fetch failed ({status}): {message}")]
	FetchFailed { status: u16, message: String },

	/// The toggle source could not be reached.
	#[error("network error: {0}")]
	Network(String),

	/// Reading or writing the storage provider failed.
	#[error("storage error: {0}")]
	Storage(String),

	/// A config document or stored snapshot could not be parsed.
	#[error("parse error: {0}")]
	Parse(String),
}

/// Result type alias for flags client operations.
pub type Result<T> = std::result::Result<T, FlagsError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn duplicate_handler_message_names_event() {
		let err = FlagsError::HandlerAlreadyRegistered {
			event: ClientEvent::Update,
		};
		assert_eq!(err.to_string(), "handler already registered for 'update' event");
	}

	#[test]
	fn fetch_failed_message() {
		let err = FlagsError::FetchFailed {
			status: 503,
			message: "unavailable".to_string(),
		};
		assert_eq!(err.to_string(), "fetch failed (503): unavailable");
	}
}
