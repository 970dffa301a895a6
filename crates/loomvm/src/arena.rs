//! The node arena: a pooled, slot-reused allocator backing every series,
//! pairing, context, and action in the runtime (§4.A).
//!
//! Mirrors the source project's refcounted heap (`Heap<T: ResourceTracker>`
//! in the teacher lineage) with one deliberate change: nodes here are
//! reclaimed by mark-sweep from roots, not by reference counting, matching
//! the spec's "manual vs. managed" lifecycle split rather than Python-style
//! `Rc`. A freshly allocated node is **manual**: the allocator that created
//! it owns it directly and must either [`Arena::manage`] it (hand it to the
//! collector) or [`Arena::free_node`] it explicitly. Forgetting to do either
//! is a leak, not undefined behavior — same tradeoff the source project
//! makes for manuals.

use smallvec::SmallVec;

use crate::action::Action;
use crate::cell::{Cell, CellData};
use crate::series::Series;

/// A generational index into the arena. Stale references (from a freed,
/// reused slot) compare unequal to the fresh `NodeId` because the
/// generation differs, the same defense the teacher lineage's heap uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    slot: u32,
    generation: u32,
}

impl NodeId {
    #[cfg(test)]
    #[must_use]
    pub fn from_test_id(slot: u32) -> Self {
        Self { slot, generation: 0 }
    }
}

pub(crate) enum NodeContent {
    Series(Series),
    /// Two cells, allocated together. Used both for literal `pair!` values
    /// that outgrow inline storage and for quote-depth escapes (§3).
    Pairing([Cell; 2]),
    /// An action's parameter list and dispatcher (§4.I).
    Action(Action),
    /// A freed slot, kept (rather than removed from `entries`) so its
    /// generation counter survives for stale-`NodeId` detection.
    Tombstone,
}

struct NodeEntry {
    generation: u32,
    managed: bool,
    /// Scratch bit used only during `collect`; always false outside of it.
    marked: bool,
    content: NodeContent,
}

/// How close the arena is to its next garbage collection, exposed so the
/// evaluator can check it at safe points (between expressions) rather than
/// mid-step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcPressure {
    Ok,
    ShouldCollect,
}

pub struct Arena {
    entries: Vec<NodeEntry>,
    free_list: Vec<u32>,
    /// Manual (unmanaged) nodes still awaiting `manage`/`free_node`, tracked
    /// so a trap can free everything allocated since it was pushed (§6).
    manuals: Vec<NodeId>,
    /// Nodes pinned against collection regardless of reachability from
    /// roots, pushed/popped in stack discipline by evaluation steps that
    /// hold a reference across a call that might trigger GC.
    guard_stack: Vec<NodeId>,
    allocations_since_gc: u32,
    ballast: u32,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Arena {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free_list: Vec::new(),
            manuals: Vec::new(),
            guard_stack: Vec::new(),
            allocations_since_gc: 0,
            ballast: 4096,
        }
    }

    fn insert(&mut self, content: NodeContent) -> NodeId {
        self.allocations_since_gc += 1;
        let id = if let Some(slot) = self.free_list.pop() {
            let entry = &mut self.entries[slot as usize];
            debug_assert!(matches!(entry.content, NodeContent::Tombstone));
            entry.managed = false;
            entry.marked = false;
            entry.content = content;
            NodeId {
                slot,
                generation: entry.generation,
            }
        } else {
            let slot = self.entries.len() as u32;
            self.entries.push(NodeEntry {
                generation: 0,
                managed: false,
                marked: false,
                content,
            });
            NodeId { slot, generation: 0 }
        };
        self.manuals.push(id);
        id
    }

    /// Allocates a series node, returned in the manual state.
    pub fn alloc_series(&mut self, series: Series) -> NodeId {
        self.insert(NodeContent::Series(series))
    }

    /// Allocates a pairing node, returned in the manual state.
    pub fn alloc_pairing(&mut self, a: Cell, b: Cell) -> NodeId {
        self.insert(NodeContent::Pairing([a, b]))
    }

    /// Allocates a quote-depth escape pairing and manages it immediately: a
    /// quote escape has no independent owner, it only exists while the cell
    /// referencing it is reachable.
    pub fn alloc_quote_pairing(&mut self, depth: u32, base: Cell) -> NodeId {
        let id = self.alloc_pairing(Cell::integer(i64::from(depth)), base);
        self.manage(id);
        id
    }

    /// # Panics
    /// Panics if `id` is not a pairing node, or does not hold an integer
    /// depth in its first slot (both would indicate arena corruption).
    #[must_use]
    pub fn read_quote_pairing(&self, id: NodeId) -> (u32, Cell) {
        match &self.entry(id).content {
            NodeContent::Pairing([depth, base]) => {
                let CellData::Integer(depth) = depth.data else {
                    panic!("quote pairing's depth slot is not an integer");
                };
                (depth as u32, *base)
            }
            NodeContent::Series(_) | NodeContent::Action(_) => panic!("quote pairing node is not a pairing"),
            NodeContent::Tombstone => unreachable!("entry() rejects tombstones"),
        }
    }

    fn entry(&self, id: NodeId) -> &NodeEntry {
        let slot = &self.entries[id.slot as usize];
        assert_eq!(
            slot.generation, id.generation,
            "dangling NodeId: slot was freed or reused by a newer node"
        );
        assert!(
            !matches!(slot.content, NodeContent::Tombstone),
            "dangling NodeId: slot was freed"
        );
        slot
    }

    fn entry_mut(&mut self, id: NodeId) -> &mut NodeEntry {
        let slot = &mut self.entries[id.slot as usize];
        assert_eq!(
            slot.generation, id.generation,
            "dangling NodeId: slot was freed or reused by a newer node"
        );
        assert!(
            !matches!(slot.content, NodeContent::Tombstone),
            "dangling NodeId: slot was freed"
        );
        slot
    }

    #[must_use]
    pub fn series(&self, id: NodeId) -> &Series {
        match &self.entry(id).content {
            NodeContent::Series(s) => s,
            NodeContent::Pairing(_) | NodeContent::Action(_) => panic!("node is not a series"),
            NodeContent::Tombstone => unreachable!("entry() rejects tombstones"),
        }
    }

    pub fn series_mut(&mut self, id: NodeId) -> &mut Series {
        match &mut self.entry_mut(id).content {
            NodeContent::Series(s) => s,
            NodeContent::Pairing(_) | NodeContent::Action(_) => panic!("node is not a series"),
            NodeContent::Tombstone => unreachable!("entry() rejects tombstones"),
        }
    }

    #[must_use]
    pub fn pairing(&self, id: NodeId) -> [Cell; 2] {
        match &self.entry(id).content {
            NodeContent::Pairing(p) => *p,
            NodeContent::Series(_) | NodeContent::Action(_) => panic!("node is not a pairing"),
            NodeContent::Tombstone => unreachable!("entry() rejects tombstones"),
        }
    }

    #[must_use]
    pub fn action(&self, id: NodeId) -> &Action {
        match &self.entry(id).content {
            NodeContent::Action(a) => a,
            NodeContent::Series(_) | NodeContent::Pairing(_) => panic!("node is not an action"),
            NodeContent::Tombstone => unreachable!("entry() rejects tombstones"),
        }
    }

    pub fn action_mut(&mut self, id: NodeId) -> &mut Action {
        match &mut self.entry_mut(id).content {
            NodeContent::Action(a) => a,
            NodeContent::Series(_) | NodeContent::Pairing(_) => panic!("node is not an action"),
            NodeContent::Tombstone => unreachable!("entry() rejects tombstones"),
        }
    }

    /// Allocates an action node, returned in the manual state.
    pub fn alloc_action(&mut self, action: Action) -> NodeId {
        self.insert(NodeContent::Action(action))
    }

    /// Hands a manual node to the collector: it survives from now on only if
    /// reachable from a root or the guard stack.
    pub fn manage(&mut self, id: NodeId) {
        self.manuals.retain(|&m| m != id);
        self.entry_mut(id).managed = true;
    }

    #[must_use]
    pub fn is_managed(&self, id: NodeId) -> bool {
        self.entry(id).managed
    }

    /// Frees a manual node immediately. Panics on a managed node: those are
    /// only ever reclaimed by [`Arena::collect`].
    ///
    /// # Panics
    /// Panics if `id` refers to a managed node.
    pub fn free_node(&mut self, id: NodeId) {
        assert!(
            !self.entry(id).managed,
            "free_node called on a managed node; use collect instead"
        );
        self.manuals.retain(|&m| m != id);
        self.release_slot(id);
    }

    fn release_slot(&mut self, id: NodeId) {
        let entry = &mut self.entries[id.slot as usize];
        entry.content = NodeContent::Tombstone;
        entry.managed = false;
        entry.marked = false;
        entry.generation = entry.generation.wrapping_add(1);
        self.free_list.push(id.slot);
    }

    /// Pins `id` against collection until the returned token is released.
    pub fn guard(&mut self, id: NodeId) {
        self.guard_stack.push(id);
    }

    /// Releases the most recently pushed guard. Guards are stack-discipline:
    /// callers must release in the reverse order they guarded.
    pub fn unguard(&mut self, id: NodeId) {
        let top = self.guard_stack.pop();
        debug_assert_eq!(top, Some(id), "guard stack released out of order");
    }

    #[must_use]
    pub fn guard_depth(&self) -> usize {
        self.guard_stack.len()
    }

    pub fn truncate_guards(&mut self, depth: usize) {
        self.guard_stack.truncate(depth);
    }

    #[must_use]
    pub fn manuals_len(&self) -> usize {
        self.manuals.len()
    }

    /// Frees every manual node allocated since `len`, used by `fail` to
    /// unwind leaked manuals back to a trap's snapshot (§6).
    pub fn truncate_manuals(&mut self, len: usize) {
        while self.manuals.len() > len {
            let id = self.manuals.pop().unwrap();
            self.release_slot(id);
        }
    }

    #[must_use]
    pub fn gc_pressure(&self) -> GcPressure {
        if self.allocations_since_gc >= self.ballast {
            GcPressure::ShouldCollect
        } else {
            GcPressure::Ok
        }
    }

    /// Mark-sweep collection. `roots` are nodes reachable from outside the
    /// arena (the data stack, frame varlists, interned context, and so on);
    /// the guard stack is always included automatically.
    pub fn collect(&mut self, roots: &[NodeId]) {
        let mut worklist: SmallVec<[NodeId; 64]> = SmallVec::new();
        worklist.extend(roots.iter().copied());
        worklist.extend(self.guard_stack.iter().copied());

        while let Some(id) = worklist.pop() {
            let entry = &mut self.entries[id.slot as usize];
            if entry.generation != id.generation || entry.marked || matches!(entry.content, NodeContent::Tombstone) {
                continue;
            }
            entry.marked = true;
            match &entry.content {
                NodeContent::Pairing(cells) => {
                    for cell in cells {
                        worklist.extend(cell_children(cell));
                    }
                }
                NodeContent::Series(series) => {
                    if let Some(cells) = series.as_cells() {
                        for cell in cells {
                            worklist.extend(cell_children(cell));
                        }
                    }
                    if let Some(companion) = series.companion() {
                        worklist.push(companion);
                    }
                }
                NodeContent::Action(action) => {
                    if let Some(specialty) = action.specialty {
                        worklist.push(specialty);
                    }
                    for cell in action.specialized.iter().flatten() {
                        worklist.extend(cell_children(cell));
                    }
                }
                NodeContent::Tombstone => {}
            }
        }

        let managed_slots: Vec<u32> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.managed)
            .map(|(i, _)| i as u32)
            .collect();
        for slot in managed_slots {
            let entry = &mut self.entries[slot as usize];
            if entry.marked {
                entry.marked = false;
            } else {
                let generation = entry.generation;
                self.release_slot(NodeId { slot, generation });
            }
        }
        self.allocations_since_gc = 0;
    }
}

/// Returns every node a cell directly references, for the mark phase and
/// for callers (the interpreter's external root set) that need the same
/// one-level-deep reference walk outside of `collect` itself.
pub(crate) fn cell_root(cell: &Cell) -> SmallVec<[NodeId; 2]> {
    cell_children(cell)
}

fn cell_children(cell: &Cell) -> SmallVec<[NodeId; 2]> {
    let mut out = SmallVec::new();
    match cell.data {
        CellData::Pair(id)
        | CellData::Block(id)
        | CellData::Group(id)
        | CellData::Path(id)
        | CellData::SetPath(id)
        | CellData::GetPath(id)
        | CellData::Text(id)
        | CellData::Binary(id)
        | CellData::Bitset(id)
        | CellData::Map(id)
        | CellData::Context(id)
        | CellData::Action(id)
        | CellData::Frame(id)
        | CellData::QuoteEscape(id) => out.push(id),
        _ => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Series;

    #[test]
    fn manual_node_must_be_freed_or_managed() {
        let mut arena = Arena::new();
        let id = arena.alloc_series(Series::new_array(0));
        assert_eq!(arena.manuals_len(), 1);
        arena.free_node(id);
        assert_eq!(arena.manuals_len(), 0);
    }

    #[test]
    fn unreachable_managed_node_is_collected() {
        let mut arena = Arena::new();
        let id = arena.alloc_series(Series::new_array(0));
        arena.manage(id);
        arena.collect(&[]);
        // The slot was freed; re-allocating reuses it with a bumped generation.
        let reused = arena.alloc_series(Series::new_array(0));
        assert_eq!(reused.slot, id.slot);
        assert_ne!(reused.generation, id.generation);
    }

    #[test]
    fn reachable_managed_node_survives_collection() {
        let mut arena = Arena::new();
        let id = arena.alloc_series(Series::new_array(0));
        arena.manage(id);
        arena.collect(&[id]);
        assert!(arena.is_managed(id));
        let _ = arena.series(id);
    }

    #[test]
    fn guarded_node_survives_without_being_a_root() {
        let mut arena = Arena::new();
        let id = arena.alloc_series(Series::new_array(0));
        arena.manage(id);
        arena.guard(id);
        arena.collect(&[]);
        let _ = arena.series(id);
        arena.unguard(id);
    }
}
