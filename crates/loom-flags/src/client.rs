// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The client handle contract consumed by the UI bridge.

use async_trait::async_trait;
use loom_flags_core::{EvaluationContext, Toggle, Variant};

use crate::error::{FlagsError, Result};
use crate::event::{ClientEvent, EventHandler};

/// A long-lived feature flag client.
///
/// Implementations own polling, networking and storage. Everything runs on a
/// single cooperative thread, so the trait is `?Send` and methods take `&self`
/// with interior mutability.
///
/// # Contract
///
/// - Construction must not start the client.
/// - `start` and `stop` are idempotent, and `stop` is safe before `start`.
/// - `off` removes exactly the handle passed to `on`.
#[async_trait(?Send)]
pub trait FlagClient {
	fn start(&self);

	fn stop(&self);

	/// Unknown names evaluate to `false`.
	fn is_enabled(&self, name: &str) -> bool;

	/// Unknown names evaluate to [`Variant::disabled`].
	fn get_variant(&self, name: &str) -> Variant;

	fn get_all_toggles(&self) -> Vec<Toggle>;

	/// Replaces the evaluation context. Resolves once any refresh it
	/// triggered has been applied.
	async fn update_context(&self, context: EvaluationContext) -> Result<()>;

	fn get_context(&self) -> EvaluationContext;

	fn on(&self, event: ClientEvent, handler: EventHandler) -> Result<()>;

	/// Returns false if `handler` was not registered for `event`.
	fn off(&self, event: ClientEvent, handler: &EventHandler) -> bool;

	/// Whether the client already holds an authoritative snapshot.
	fn is_ready(&self) -> bool {
		false
	}

	/// The most recent unrecovered error, if any.
	fn get_error(&self) -> Option<FlagsError> {
		None
	}
}
