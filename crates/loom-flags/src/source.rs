// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Where the client's toggle snapshots come from.

use async_trait::async_trait;
use loom_flags_core::{EvaluationContext, Toggle};

use crate::error::Result;

/// Produces a fresh toggle snapshot for a context.
///
/// The transport (HTTP proxy, SSE, a file on disk) lives behind this trait;
/// the client only decides when to ask and what to emit afterwards.
#[async_trait(?Send)]
pub trait ToggleSource {
	async fn fetch(&self, context: &EvaluationContext) -> Result<Vec<Toggle>>;
}
