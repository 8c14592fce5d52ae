// SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
// SPDX-License-Identifier: MIT

//! Structured error types for the dependency-graph scheduler.
//!
//! These cover the *structural* error kind only — duplicate/unknown ids
//! and malformed edges. Semantic conditions (`t_curr < issue_ready`) and
//! exhaustion are not errors; the engine just keeps ticking. Do not
//! replace these with a bare `anyhow::Error` at the call site — callers
//! pattern-match on them to decide whether a bad edge is recoverable.

use thiserror::Error;

use crate::priority::NodeId;

/// Errors raised while building or driving a [`DependencyGraph`](super::DependencyGraph).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DepGraphError {
    #[error("edge references unknown node {0}")]
    UnknownNode(NodeId),

    #[error("edge {from} -> {to} would not respect insertion order (predecessor id must precede successor id)")]
    WouldCycle { from: NodeId, to: NodeId },

    #[error("node {0} does not exist")]
    NoSuchNode(NodeId),
}
