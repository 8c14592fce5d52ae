// SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
// SPDX-License-Identifier: MIT

//! Shared priority-queue primitives for the dependency and resource
//! scheduling engines.
//!
//! Both engines order ready candidates the same way — earliest data
//! availability first, deterministic id tie-break last — just over
//! different key tuples, so the comparator plumbing lives here once
//! instead of being duplicated by each `BinaryHeap` wrapper.
//!
//! This mirrors the `CompareNodes` / `CompareOpReady` comparator structs
//! from the original dependency/resource schedulers, but a heap entry
//! here holds only an id plus a snapshot of the sort key — the live node
//! is looked up by id on pop, rather than pushing copies of mutable node
//! state into the heap.

use std::cmp::Ordering;

/// Dense, non-zero node identifier assigned in insertion order.
///
/// Id `0` is reserved for the root sentinel in both engines.
pub type NodeId = u64;

/// Reserved id of the root sentinel node.
pub const ROOT_ID: NodeId = 0;

/// Sort key for admitting a dependency-graph candidate within one
/// functional-unit class this cycle: earliest `operands_ready` first,
/// then earliest `issue_ready`, then lowest `id` as the final
/// deterministic tie-break.
///
/// `Ord` is implemented in reverse of the natural field order so that a
/// standard (max-heap) `BinaryHeap<AdmitKey>` pops the highest-priority
/// candidate first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmitKey {
    pub operands_ready: u64,
    pub issue_ready: u64,
    pub id: NodeId,
}

impl Ord for AdmitKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .operands_ready
            .cmp(&self.operands_ready)
            .then_with(|| other.issue_ready.cmp(&self.issue_ready))
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for AdmitKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort key for the resource graph's per-cycle admission queue:
/// `(operands_ready, id)` ascending — no `issue_ready` component, since
/// the resource graph has no frontend issue-rate constraint of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceAdmitKey {
    pub operands_ready: u64,
    pub id: NodeId,
}

impl Ord for ResourceAdmitKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .operands_ready
            .cmp(&self.operands_ready)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for ResourceAdmitKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort key for the dependency engine's slip queue: parked candidates
/// ordered by *decreasing* `operands_ready`, so the top of the heap is
/// always the furthest-out parked node. The derived, natural ascending
/// `Ord` gives exactly this under a max-heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SlipKey {
    pub operands_ready: u64,
    pub id: NodeId,
}

/// Render a priority tuple the way both engines' `priority_string` debug
/// helpers print it, e.g. `(3, 1, 7)`.
pub fn format_tuple(parts: &[u64]) -> String {
    let mut s = String::from("(");
    for (i, p) in parts.iter().enumerate() {
        if i > 0 {
            s.push_str(", ");
        }
        s.push_str(&p.to_string());
    }
    s.push(')');
    s
}

/// Render an id set the way the debug trace prints `U_act`/`T_act`/`S_act`:
/// `{a,b,c}`, sorted for determinism.
pub fn format_id_set<'a>(ids: impl Iterator<Item = &'a NodeId>) -> String {
    let mut v: Vec<NodeId> = ids.copied().collect();
    v.sort_unstable();
    let mut s = String::from("{");
    for (i, id) in v.iter().enumerate() {
        if i > 0 {
            s.push(',');
        }
        s.push_str(&id.to_string());
    }
    s.push('}');
    s
}
