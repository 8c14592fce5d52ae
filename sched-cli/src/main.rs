// SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
// SPDX-License-Identifier: MIT

//! Scenario harness for the `sched-core` engines. Picks a named
//! fixture, drives it to completion, and prints the resulting start
//! cycles.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use sched_core::dep_graph::{DependencyGraph, FunctionalUnit};
use sched_core::resource_graph::ResourceGraph;

/// Pipeline stage identity used by the resource-graph fixtures. The
/// resource graph itself is agnostic to what a type tag means; this
/// enum only exists on the driver side of the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PipelineStage {
    Empty,
    If,
    Id,
    Ex,
    Wb,
    If11,
    If12,
    If2,
}

impl PipelineStage {
    fn tag(self) -> u32 {
        self as u32
    }
}

#[derive(Parser)]
#[command(name = "schedsim", about = "Incremental list-scheduling scenario harness")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Emit per-cycle admission events at debug level.
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the dependency-graph engine over a fixed ten-instruction chain.
    DepChain,
    /// Run the dependency-graph engine over four independent multiplies.
    MulCapacity,
    /// Run the resource-graph engine over a four-stage pipeline fixture.
    Pipeline,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match cli.command {
        Command::DepChain => run_dep_chain(cli.verbose),
        Command::MulCapacity => run_mul_capacity(cli.verbose),
        Command::Pipeline => run_pipeline(cli.verbose),
    }
}

fn run_dep_chain(debug: bool) -> Result<()> {
    let mut g = DependencyGraph::new(debug);

    let types = [
        FunctionalUnit::Ld,
        FunctionalUnit::Ld,
        FunctionalUnit::Div,
        FunctionalUnit::Alu,
        FunctionalUnit::Mul,
        FunctionalUnit::Mul,
        FunctionalUnit::Alu,
        FunctionalUnit::St,
        FunctionalUnit::Ld,
        FunctionalUnit::Alu,
    ];
    let latencies = [2u64, 2, 4, 1, 2, 2, 1, 1, 2, 1];
    let preds: [&[u64]; 10] = [
        &[],
        &[],
        &[1, 2],
        &[1],
        &[1, 4],
        &[3],
        &[2, 6],
        &[7],
        &[],
        &[9],
    ];

    for i in 0..10 {
        let id = g.add_node(types[i], 1, None, None);
        for &p in preds[i] {
            g.add_edge_raw(p, id)?;
        }
        let t_lr = g.schedule(id, 1)?;
        g.set_latency(id, latencies[i])?;
        println!("node {id}: t_LR={t_lr} priority={}", g.priority_string(id)?);
    }

    Ok(())
}

fn run_mul_capacity(debug: bool) -> Result<()> {
    let mut g = DependencyGraph::new(debug);
    for _ in 0..4 {
        let id = g.add_node(FunctionalUnit::Mul, 1, None, None);
        let t_lr = g.schedule(id, 1)?;
        g.set_latency(id, 2)?;
        println!("node {id}: t_LR={t_lr}");
    }
    Ok(())
}

fn run_pipeline(debug: bool) -> Result<()> {
    let mut g = ResourceGraph::new(4, debug);

    let fetch = g.add_parent_node(PipelineStage::If.tag(), None, None)?;
    let decode = g.add_node(PipelineStage::Id.tag(), Some(1), None, None)?;
    let execute = g.add_node(PipelineStage::Ex.tag(), Some(1), None, None)?;
    let writeback = g.add_node(PipelineStage::Wb.tag(), Some(1), None, None)?;

    g.add_edge(fetch, decode)?;
    g.add_edge(decode, execute)?;
    g.add_edge(execute, writeback)?;

    g.schedule(0, true)?;

    for (name, id) in [
        ("IF", fetch),
        ("ID", decode),
        ("EX", execute),
        ("WB", writeback),
    ] {
        println!(
            "{name}: t_start={} t_end={}",
            g.get_node_t_start(id)?,
            g.get_node_t_end(id)?
        );
    }

    Ok(())
}
