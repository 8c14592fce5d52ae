// SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
// SPDX-License-Identifier: MIT

//! Hierarchical pipeline-stage scheduler.
//!
//! Nodes represent pipeline stages (or sub-stages nested under a parent
//! stage) tagged with a driver-chosen `u32` type — unlike the
//! dependency graph's fixed [`FunctionalUnit`](crate::dep_graph::FunctionalUnit)
//! enum, the resource graph doesn't know what a "type" means; the
//! driver (`sched-cli`'s `PipelineStage`, for instance) assigns the
//! tags and interprets them.
//!
//! A node with no parent, or explicitly registered via
//! [`add_parent_node`](ResourceGraph::add_parent_node), is a *stage*: it
//! has no latency of its own until every child registered against it
//! has finished, at which point its span is finalized to
//! `t_curr - t_LR` and the finish propagates to its own parent, if any.
//! A child can't start before its parent stage has itself started.
//!
//! `add_exit_cond` is the one place latency is mutated by the engine
//! rather than reported by the driver: each cycle a node would
//! otherwise retire, if its exit-condition node hasn't itself finished
//! yet, the node's latency is stretched by one more cycle and it stays
//! active.

pub mod error;

pub use error::ResourceGraphError;

use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::priority::{format_tuple, NodeId, ResourceAdmitKey};

#[derive(Debug, Clone)]
struct Node {
    type_tag: u32,
    parent: Option<NodeId>,
    is_stage: bool,
    finalized: bool,
    children_unfinished: u32,
    predecessors: Vec<NodeId>,
    exit_cond: Option<NodeId>,
    latency: u64,
    t_lr: u64,
    operands_ready: u64,
}

/// The pipeline resource-graph scheduling engine.
pub struct ResourceGraph {
    nodes: Vec<Node>,
    type_count: usize,
    capacities: HashMap<u32, u32>,
    ready_nodes: HashSet<NodeId>,
    active_nodes: HashSet<NodeId>,
    t_curr: u64,
    finished: bool,
    debug: bool,
}

impl ResourceGraph {
    /// `type_count` is advisory (used only as a size hint); nodes may
    /// use any `u32` tag. Per-type capacity is set via the `capacity`
    /// argument on `add_node`/`add_parent_node`, not here.
    pub fn new(type_count: usize, debug: bool) -> Self {
        Self {
            nodes: Vec::new(),
            type_count,
            capacities: HashMap::new(),
            ready_nodes: HashSet::new(),
            active_nodes: HashSet::new(),
            t_curr: 0,
            finished: false,
            debug,
        }
    }

    /// Registers a node as a stage: it may later be named as the
    /// `parent` of child nodes, and those children cannot start before
    /// this stage itself has started. A stage has no intrinsic latency
    /// — it is set once every registered child has finished.
    pub fn add_parent_node(
        &mut self,
        type_tag: u32,
        parent: Option<NodeId>,
        capacity: Option<u32>,
    ) -> Result<NodeId, ResourceGraphError> {
        self.add_node_internal(type_tag, parent, 0, capacity, true)
    }

    /// Registers a leaf node under `parent`, or as a top-level node if
    /// `parent` is `None`. `latency` defaults to 1 when omitted.
    pub fn add_node(
        &mut self,
        type_tag: u32,
        latency: Option<u64>,
        capacity: Option<u32>,
        parent: Option<NodeId>,
    ) -> Result<NodeId, ResourceGraphError> {
        self.add_node_internal(type_tag, parent, latency.unwrap_or(1).max(1), capacity, false)
    }

    fn add_node_internal(
        &mut self,
        type_tag: u32,
        parent: Option<NodeId>,
        latency: u64,
        capacity: Option<u32>,
        is_stage: bool,
    ) -> Result<NodeId, ResourceGraphError> {
        if self.finished {
            return Err(ResourceGraphError::AddAfterFinish);
        }
        let mut inherited_predecessors = Vec::new();
        if let Some(p) = parent {
            if p as usize >= self.nodes.len() {
                return Err(ResourceGraphError::UnknownNode(p));
            }
            if !self.nodes[p as usize].is_stage {
                return Err(ResourceGraphError::ParentNotAStage { parent: p });
            }
            inherited_predecessors = self.nodes[p as usize].predecessors.clone();
        }
        if let Some(c) = capacity {
            self.capacities.insert(type_tag, c);
        }

        let id = self.nodes.len() as NodeId;
        self.nodes.push(Node {
            type_tag,
            parent,
            is_stage,
            finalized: false,
            children_unfinished: 0,
            predecessors: inherited_predecessors,
            exit_cond: None,
            latency,
            t_lr: 0,
            operands_ready: 0,
        });
        if let Some(p) = parent {
            self.nodes[p as usize].children_unfinished += 1;
        }
        self.ready_nodes.insert(id);
        Ok(id)
    }

    /// An ordering edge: `to` cannot start until `from` has finished.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> Result<(), ResourceGraphError> {
        if from as usize >= self.nodes.len() {
            return Err(ResourceGraphError::UnknownNode(from));
        }
        if to as usize >= self.nodes.len() {
            return Err(ResourceGraphError::NoSuchNode(to));
        }
        self.nodes[to as usize].predecessors.push(from);
        Ok(())
    }

    /// Registers `node`'s exit condition as `cond`: every cycle `node`
    /// would otherwise retire, if `cond` hasn't itself finished, `node`'s
    /// latency is extended by one cycle and it stays active.
    pub fn add_exit_cond(&mut self, node: NodeId, cond: NodeId) -> Result<(), ResourceGraphError> {
        self.check_exists(node)?;
        self.check_exists(cond)?;
        self.nodes[node as usize].exit_cond = Some(cond);
        Ok(())
    }

    /// Advances at least to `t_enter`. If `finish_schedule` is set,
    /// keeps advancing past `t_enter` until every registered node has
    /// finished, after which no further nodes may be added.
    pub fn schedule(
        &mut self,
        t_enter: u64,
        finish_schedule: bool,
    ) -> Result<(), ResourceGraphError> {
        loop {
            self.sweep_finished();
            self.admit_candidates();

            let all_done = self.ready_nodes.is_empty() && self.active_nodes.is_empty();
            let reached_enter = self.t_curr >= t_enter;

            if reached_enter && (!finish_schedule || all_done) {
                if finish_schedule {
                    self.finished = true;
                }
                return Ok(());
            }
            self.t_curr += 1;
        }
    }

    fn sweep_finished(&mut self) {
        let t = self.t_curr;
        let active_ids: Vec<NodeId> = self.active_nodes.iter().copied().collect();

        for id in active_ids {
            if !self.active_nodes.contains(&id) {
                continue; // already finished via an earlier cascade this sweep
            }
            let n = &self.nodes[id as usize];
            if n.is_stage {
                if n.children_unfinished == 0 && !n.finalized {
                    self.finish_stage(id, t);
                }
                continue;
            }
            if n.t_lr + n.latency > t {
                continue;
            }
            if let Some(cond) = n.exit_cond {
                let c = &self.nodes[cond as usize];
                let blocked = c.t_lr == 0 || c.t_lr + c.latency > t;
                if blocked {
                    self.nodes[id as usize].latency += 1;
                    continue;
                }
            }
            self.finish_leaf(id, t);
        }
    }

    fn finish_leaf(&mut self, id: NodeId, t: u64) {
        self.active_nodes.remove(&id);
        self.propagate_finish(id, t);
    }

    /// Finalizes a stage's latency at the cycle its last child finished,
    /// removes it from the active set, and propagates upward: finishing
    /// a stage can itself be the last-unfinished child of an outer one.
    fn finish_stage(&mut self, id: NodeId, t: u64) {
        let n = &mut self.nodes[id as usize];
        n.latency = t.saturating_sub(n.t_lr).max(1);
        n.finalized = true;
        self.active_nodes.remove(&id);
        self.propagate_finish(id, t);
    }

    fn propagate_finish(&mut self, id: NodeId, t: u64) {
        let Some(p) = self.nodes[id as usize].parent else {
            return;
        };
        let parent = &mut self.nodes[p as usize];
        parent.children_unfinished = parent.children_unfinished.saturating_sub(1);
        if parent.children_unfinished == 0 && parent.is_stage && !parent.finalized {
            if self.active_nodes.contains(&p) {
                self.finish_stage(p, t);
            }
        }
    }

    fn admit_candidates(&mut self) {
        let t = self.t_curr;
        let mut candidates: Vec<ResourceAdmitKey> = Vec::new();

        for &id in &self.ready_nodes {
            let n = &self.nodes[id as usize];
            if let Some(p) = n.parent {
                if self.nodes[p as usize].t_lr == 0 {
                    continue; // parent stage hasn't started
                }
            }
            let mut max_finish = 0u64;
            let mut all_finished = true;
            for &pred in &n.predecessors {
                let pn = &self.nodes[pred as usize];
                if pn.t_lr == 0 || pn.t_lr + pn.latency > t {
                    all_finished = false;
                    break;
                }
                max_finish = max_finish.max(pn.t_lr + pn.latency);
            }
            if all_finished {
                candidates.push(ResourceAdmitKey {
                    operands_ready: max_finish,
                    id,
                });
            }
        }

        let mut occupancy: HashMap<u32, u32> = HashMap::new();
        for &id in &self.active_nodes {
            let n = &self.nodes[id as usize];
            if n.is_stage || n.t_lr + n.latency > t {
                *occupancy.entry(n.type_tag).or_insert(0) += 1;
            }
        }

        let mut heap: BinaryHeap<ResourceAdmitKey> = candidates.into_iter().collect();
        let mut admitted: Vec<NodeId> = Vec::new();

        while let Some(&top) = heap.peek() {
            let type_tag = self.nodes[top.id as usize].type_tag;
            let cap = self.capacities.get(&type_tag).copied().unwrap_or(u32::MAX);
            let occ = occupancy.get(&type_tag).copied().unwrap_or(0);
            if occ >= cap {
                heap.pop();
                continue; // node stays in ready_nodes; retried next cycle
            }
            heap.pop();
            self.nodes[top.id as usize].t_lr = t.max(1);
            self.nodes[top.id as usize].operands_ready = top.operands_ready;
            self.ready_nodes.remove(&top.id);
            self.active_nodes.insert(top.id);
            *occupancy.entry(type_tag).or_insert(0) += 1;
            admitted.push(top.id);
        }

        if self.debug && !admitted.is_empty() {
            tracing::debug!(cycle = t, admitted = ?admitted, "resource_graph admission");
        }
    }

    /// `t_LR - 1`: the cycle the stage's span visually begins on.
    pub fn get_node_t_start(&self, id: NodeId) -> Result<u64, ResourceGraphError> {
        self.check_exists(id)?;
        Ok(self.nodes[id as usize].t_lr.saturating_sub(1))
    }

    /// `t_LR + latency - 1`: the last cycle the stage occupies.
    pub fn get_node_t_end(&self, id: NodeId) -> Result<u64, ResourceGraphError> {
        self.check_exists(id)?;
        let n = &self.nodes[id as usize];
        if n.t_lr == 0 {
            return Ok(0);
        }
        Ok(n.t_lr + n.latency - 1)
    }

    /// Number of registered nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// `"(operands_ready, id)"`, per the boundary's debug contract.
    pub fn priority_string(&self, id: NodeId) -> Result<String, ResourceGraphError> {
        self.check_exists(id)?;
        let n = &self.nodes[id as usize];
        Ok(format_tuple(&[n.operands_ready, id]))
    }

    pub fn t_lr(&self, id: NodeId) -> Result<u64, ResourceGraphError> {
        self.check_exists(id)?;
        Ok(self.nodes[id as usize].t_lr)
    }

    /// The node's finalized latency; for an unfinished stage this is 0
    /// until its last child closes the zero-crossing.
    pub fn latency(&self, id: NodeId) -> Result<u64, ResourceGraphError> {
        self.check_exists(id)?;
        Ok(self.nodes[id as usize].latency)
    }

    fn check_exists(&self, id: NodeId) -> Result<(), ResourceGraphError> {
        if id as usize >= self.nodes.len() {
            Err(ResourceGraphError::NoSuchNode(id))
        } else {
            Ok(())
        }
    }
}
