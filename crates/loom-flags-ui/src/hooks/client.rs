// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use loom_flags::{EvaluationContext, FlagClient, Result};

use crate::context::{lookup, FlagContext, FlagContextValue};

/// Handle to the provider's `update_context`. Cheap to clone.
#[derive(Clone)]
pub struct UpdateContext {
	bridge: Rc<FlagContextValue>,
}

impl UpdateContext {
	/// Replaces the client's evaluation context. The returned future
	/// resolves once any refresh it triggered has been applied.
	pub fn call(&self, context: EvaluationContext) -> LocalBoxFuture<'static, Result<()>> {
		self.bridge.update_context(context)
	}
}

impl fmt::Debug for UpdateContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("UpdateContext")
			.field("detached", &self.bridge.is_detached())
			.finish()
	}
}

pub fn use_update_context(context: &FlagContext) -> UpdateContext {
	UpdateContext {
		bridge: lookup(context, "use_update_context"),
	}
}

/// The provider's client, for imperative use.
pub fn use_flag_client(context: &FlagContext) -> Rc<dyn FlagClient> {
	lookup(context, "use_flag_client").client()
}
