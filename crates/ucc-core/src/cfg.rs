//! Per-function control-flow graphs of uCIR blocks.
//!
//! Blocks live in a petgraph [`StableGraph`] arena and are addressed by
//! [`BlockId`], a copyable index bridging `NodeIndex<u32>`. Successor kinds
//! (`branch` for basic blocks, `taken`/`fall_through` for conditional
//! blocks) are edge weights; predecessors fall out of the incoming edges,
//! so the cyclic predecessor/successor structure never needs shared heap
//! handles.
//!
//! Emission order is independent of the edge structure: [`FunctionCfg`]
//! keeps an explicit linearisation (`order`) that the generator appends to
//! as it moves between blocks, with the exit block sealed in last.
//!
//! Each block also owns the dataflow facts computed by the optimiser:
//! gen/kill and in/out index sets for reaching definitions, and the
//! insertion-ordered use/def and in/out name sets for live variables.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use indexmap::IndexSet;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};

use crate::ir::{format_instruction, Instr};

/// Stable block identifier. Maps to a petgraph `NodeIndex<u32>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl From<NodeIndex<u32>> for BlockId {
    fn from(idx: NodeIndex<u32>) -> Self {
        BlockId(idx.index() as u32)
    }
}

impl From<BlockId> for NodeIndex<u32> {
    fn from(id: BlockId) -> Self {
        NodeIndex::new(id.0 as usize)
    }
}

/// Whether a block ends in an unconditional or a two-way transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Basic,
    Condition,
}

/// Successor kind carried on CFG edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CfgEdge {
    /// Unconditional successor of a basic block.
    Branch,
    /// `cbranch` first target.
    Taken,
    /// `cbranch` second target.
    FallThrough,
}

/// A labelled straight-line instruction sequence plus its dataflow facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub label: String,
    pub kind: BlockKind,
    pub instructions: Vec<Instr>,
    /// Global index of the first instruction, assigned by numbering.
    /// Instruction `i` of the block has index `start_index + i`.
    pub start_index: u32,

    // Reaching definitions.
    pub gen_defs: BTreeSet<u32>,
    pub kill_defs: BTreeSet<u32>,
    pub rd_in: BTreeSet<u32>,
    pub rd_out: BTreeSet<u32>,

    // Live variables. Insertion order is part of the contract: the sets
    // deduplicate keeping the first occurrence.
    pub used: IndexSet<String>,
    pub defined: IndexSet<String>,
    pub live_in: IndexSet<String>,
    pub live_out: IndexSet<String>,
}

impl Block {
    fn new(label: impl Into<String>, kind: BlockKind) -> Self {
        Block {
            label: label.into(),
            kind,
            instructions: Vec::new(),
            start_index: 0,
            gen_defs: BTreeSet::new(),
            kill_defs: BTreeSet::new(),
            rd_in: BTreeSet::new(),
            rd_out: BTreeSet::new(),
            used: IndexSet::new(),
            defined: IndexSet::new(),
            live_in: IndexSet::new(),
            live_out: IndexSet::new(),
        }
    }

    pub fn append(&mut self, instr: Instr) {
        self.instructions.push(instr);
    }

    /// Whether the block already ends with a terminator.
    pub fn terminated(&self) -> bool {
        self.instructions
            .last()
            .is_some_and(|instr| instr.is_terminator())
    }
}

/// The control-flow graph of one function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCfg {
    name: String,
    graph: StableGraph<Block, CfgEdge, Directed, u32>,
    /// Linearisation for emission; the entry block comes first and the
    /// exit block is pushed last by [`FunctionCfg::seal`].
    order: Vec<BlockId>,
    entry: BlockId,
    exit: BlockId,
}

impl FunctionCfg {
    /// Creates the CFG with its entry block (`%name`) already in the
    /// emission order and its exit block (`%exit`) allocated but unplaced.
    pub fn new(name: &str) -> Self {
        let mut graph = StableGraph::new();
        let entry: BlockId = graph
            .add_node(Block::new(format!("%{}", name), BlockKind::Basic))
            .into();
        let exit: BlockId = graph.add_node(Block::new("%exit", BlockKind::Basic)).into();
        FunctionCfg {
            name: name.to_string(),
            graph,
            order: vec![entry],
            entry,
            exit,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn exit(&self) -> BlockId {
        self.exit
    }

    /// Allocates a block without placing it in the emission order.
    pub fn add_block(&mut self, label: impl Into<String>, kind: BlockKind) -> BlockId {
        self.graph.add_node(Block::new(label, kind)).into()
    }

    /// Appends a block to the emission order.
    pub fn place(&mut self, id: BlockId) {
        self.order.push(id);
    }

    /// Places the exit block at the end of the emission order.
    pub fn seal(&mut self) {
        self.order.push(self.exit);
    }

    pub fn order(&self) -> &[BlockId] {
        &self.order
    }

    pub fn block(&self, id: BlockId) -> &Block {
        self.graph
            .node_weight(id.into())
            .expect("block id outside the CFG arena")
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        self.graph
            .node_weight_mut(id.into())
            .expect("block id outside the CFG arena")
    }

    pub fn add_edge(&mut self, from: BlockId, to: BlockId, kind: CfgEdge) {
        self.graph.add_edge(from.into(), to.into(), kind);
    }

    /// The successor reached over an edge of the given kind, if any.
    pub fn successor(&self, id: BlockId, kind: CfgEdge) -> Option<BlockId> {
        self.graph
            .edges(id.into())
            .find(|e| *e.weight() == kind)
            .map(|e| e.target().into())
    }

    /// All successors, duplicates removed, taken before fall-through.
    pub fn successors(&self, id: BlockId) -> Vec<BlockId> {
        let mut out: Vec<BlockId> = Vec::new();
        for kind in [CfgEdge::Branch, CfgEdge::Taken, CfgEdge::FallThrough] {
            for e in self.graph.edges(id.into()) {
                if *e.weight() == kind {
                    let target = e.target().into();
                    if !out.contains(&target) {
                        out.push(target);
                    }
                }
            }
        }
        out
    }

    /// All predecessors, duplicates removed.
    pub fn predecessors(&self, id: BlockId) -> Vec<BlockId> {
        let mut out: Vec<BlockId> = Vec::new();
        for idx in self
            .graph
            .neighbors_directed(id.into(), Direction::Incoming)
        {
            let pred = idx.into();
            if !out.contains(&pred) {
                out.push(pred);
            }
        }
        out
    }

    /// Total number of instructions over the placed blocks.
    pub fn instruction_count(&self) -> usize {
        self.order
            .iter()
            .map(|id| self.block(*id).instructions.len())
            .sum()
    }

    /// Concatenates the instructions of every placed block in emission
    /// order.
    pub fn linear_code(&self) -> Vec<Instr> {
        let mut code = Vec::with_capacity(self.instruction_count());
        for id in &self.order {
            code.extend(self.block(*id).instructions.iter().cloned());
        }
        code
    }

    /// Renders the CFG as a Graphviz record-shaped digraph.
    pub fn to_dot(&self) -> String {
        fn escape(s: &str) -> String {
            let mut out = String::with_capacity(s.len());
            for c in s.chars() {
                if matches!(c, '{' | '}' | '|' | '<' | '>' | '"' | '\\') {
                    out.push('\\');
                }
                out.push(c);
            }
            out
        }

        let mut dot = String::new();
        let _ = writeln!(dot, "digraph \"{}\" {{", self.name);
        let _ = writeln!(dot, "  node [shape=record];");
        for id in &self.order {
            let block = self.block(*id);
            let mut label = format!("{{{}:\\l\\t", escape(&block.label));
            // The first instruction is the label marker (or the define line
            // of the entry block); it is already in the node title.
            for instr in block.instructions.iter().skip(1) {
                let _ = write!(
                    label,
                    "{}\\l\\t",
                    escape(format_instruction(instr).trim_start())
                );
            }
            match block.kind {
                BlockKind::Basic => {
                    label.push('}');
                    let _ = writeln!(dot, "  \"{}\" [label=\"{}\"];", block.label, label);
                    if let Some(succ) = self.successor(*id, CfgEdge::Branch) {
                        let _ = writeln!(
                            dot,
                            "  \"{}\" -> \"{}\";",
                            block.label,
                            self.block(succ).label
                        );
                    }
                }
                BlockKind::Condition => {
                    label.push_str("|{<f0>T|<f1>F}}");
                    let _ = writeln!(dot, "  \"{}\" [label=\"{}\"];", block.label, label);
                    if let Some(succ) = self.successor(*id, CfgEdge::Taken) {
                        let _ = writeln!(
                            dot,
                            "  \"{}\":f0 -> \"{}\";",
                            block.label,
                            self.block(succ).label
                        );
                    }
                    if let Some(succ) = self.successor(*id, CfgEdge::FallThrough) {
                        let _ = writeln!(
                            dot,
                            "  \"{}\":f1 -> \"{}\";",
                            block.label,
                            self.block(succ).label
                        );
                    }
                }
            }
        }
        dot.push_str("}\n");
        dot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IrBase, IrType};

    fn jump(target: &str) -> Instr {
        Instr::Jump {
            target: target.into(),
        }
    }

    #[test]
    fn block_id_bridges_node_index() {
        let idx = NodeIndex::<u32>::new(5);
        let id = BlockId::from(idx);
        assert_eq!(id.0, 5);
        let back: NodeIndex<u32> = id.into();
        assert_eq!(back.index(), 5);
    }

    #[test]
    fn new_cfg_has_entry_placed_and_exit_unplaced() {
        let cfg = FunctionCfg::new("main");
        assert_eq!(cfg.block(cfg.entry()).label, "%main");
        assert_eq!(cfg.block(cfg.exit()).label, "%exit");
        assert_eq!(cfg.order().len(), 1);
        assert_eq!(cfg.order()[0], cfg.entry());
    }

    #[test]
    fn seal_places_exit_last() {
        let mut cfg = FunctionCfg::new("f");
        let mid = cfg.add_block("body", BlockKind::Basic);
        cfg.place(mid);
        cfg.seal();
        let labels: Vec<&str> = cfg
            .order()
            .iter()
            .map(|id| cfg.block(*id).label.as_str())
            .collect();
        assert_eq!(labels, vec!["%f", "body", "%exit"]);
    }

    #[test]
    fn successor_kinds() {
        let mut cfg = FunctionCfg::new("f");
        let cond = cfg.add_block("while.cond", BlockKind::Condition);
        let stat = cfg.add_block("while.stat", BlockKind::Basic);
        let end = cfg.add_block("while.end", BlockKind::Basic);
        cfg.add_edge(cfg.entry(), cond, CfgEdge::Branch);
        cfg.add_edge(cond, stat, CfgEdge::Taken);
        cfg.add_edge(cond, end, CfgEdge::FallThrough);
        cfg.add_edge(stat, cond, CfgEdge::Branch);

        assert_eq!(cfg.successor(cond, CfgEdge::Taken), Some(stat));
        assert_eq!(cfg.successor(cond, CfgEdge::FallThrough), Some(end));
        assert_eq!(cfg.successors(cond), vec![stat, end]);
        // The loop condition has two predecessors: entry side and back edge.
        let preds = cfg.predecessors(cond);
        assert_eq!(preds.len(), 2);
        assert!(preds.contains(&cfg.entry()));
        assert!(preds.contains(&stat));
    }

    #[test]
    fn terminated_tracks_last_instruction() {
        let mut cfg = FunctionCfg::new("f");
        let id = cfg.entry();
        assert!(!cfg.block(id).terminated());
        cfg.block_mut(id).append(jump("%exit"));
        assert!(cfg.block(id).terminated());
    }

    #[test]
    fn linear_code_follows_placement_order() {
        let mut cfg = FunctionCfg::new("f");
        cfg.block_mut(cfg.entry()).append(Instr::Entry);
        let body = cfg.add_block("body", BlockKind::Basic);
        cfg.block_mut(body).append(Instr::Label("body".into()));
        cfg.block_mut(body).append(jump("%exit"));
        cfg.block_mut(cfg.entry()).append(jump("%body"));
        cfg.place(body);
        let exit = cfg.exit();
        cfg.block_mut(exit).append(Instr::Label("exit".into()));
        cfg.block_mut(exit).append(Instr::Return {
            ty: IrType::scalar(IrBase::Void),
            value: None,
        });
        cfg.seal();

        let code = cfg.linear_code();
        assert_eq!(code.len(), 6);
        assert_eq!(code[0], Instr::Entry);
        assert_eq!(code[2], Instr::Label("body".into()));
        assert!(matches!(code[5], Instr::Return { .. }));
        assert_eq!(cfg.instruction_count(), 6);
    }

    #[test]
    fn dot_output_shape() {
        let mut cfg = FunctionCfg::new("f");
        let cond = cfg.add_block("if", BlockKind::Condition);
        let end = cfg.add_block("if.end", BlockKind::Basic);
        cfg.add_edge(cfg.entry(), cond, CfgEdge::Branch);
        cfg.add_edge(cond, end, CfgEdge::Taken);
        cfg.add_edge(cond, end, CfgEdge::FallThrough);
        cfg.place(cond);
        cfg.place(end);
        cfg.seal();

        let dot = cfg.to_dot();
        assert!(dot.starts_with("digraph \"f\" {"));
        assert!(dot.contains("node [shape=record]"));
        assert!(dot.contains("\"if\":f0 -> \"if.end\""));
        assert!(dot.contains("\"if\":f1 -> \"if.end\""));
        assert!(dot.ends_with("}\n"));
    }
}
