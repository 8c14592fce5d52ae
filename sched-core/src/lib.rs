// SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
// SPDX-License-Identifier: MIT

//! Cycle-accurate scheduling primitives for a processor performance
//! model: a data-hazard-aware dependency scheduler and a hierarchical
//! pipeline-stage resource scheduler.
//!
//! Both engines are online and incremental — a driver feeds them one
//! instruction at a time, in program order, interleaved with the rest
//! of the simulation, rather than handing over a complete graph up
//! front. Neither engine owns a clock; the driver advances each engine
//! by calling `schedule` with the cycle it wants to probe.

pub mod dep_graph;
pub mod priority;
pub mod resource_graph;
