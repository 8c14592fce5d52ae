// SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
// SPDX-License-Identifier: MIT

//! Structured error types for the pipeline resource-graph scheduler.

use thiserror::Error;

use crate::priority::NodeId;

/// Errors raised while building or driving a [`ResourceGraph`](super::ResourceGraph).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResourceGraphError {
    #[error("edge references unknown node {0}")]
    UnknownNode(NodeId),

    #[error("node {0} does not exist")]
    NoSuchNode(NodeId),

    #[error("node {parent} was never registered as a parent stage via add_parent_node")]
    ParentNotAStage { parent: NodeId },

    #[error("add_node/add_parent_node called after finish_schedule completed a run")]
    AddAfterFinish,
}
