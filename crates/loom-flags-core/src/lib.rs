// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for Loom feature flag consumers.
//!
//! This crate holds the data shapes shared by the flags client (`loom-flags`)
//! and the UI bridge (`loom-flags-ui`): toggle snapshots, variant assignments
//! and the evaluation context.
//!
//! # Example
//!
//! ```
//! use loom_flags_core::{EvaluationContext, Toggle, Variant, VariantPayload};
//!
//! let toggle = Toggle::new("checkout.new_flow", true).with_variant(
//!     Variant::new("A", true).with_payload(VariantPayload::new("string", "blue")),
//! );
//! assert_eq!(toggle.resolved_variant().feature_enabled, Some(true));
//!
//! let ctx = EvaluationContext::new()
//!     .with_user_id("user123")
//!     .with_property("plan", "enterprise");
//! assert_eq!(ctx.user_id.as_deref(), Some("user123"));
//! ```

pub mod context;
pub mod toggle;

pub use context::EvaluationContext;
pub use toggle::{find_toggle, Toggle, Variant, VariantPayload, DISABLED_VARIANT};
