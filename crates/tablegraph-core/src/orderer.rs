//! Referential-integrity ordering of tables.
//!
//! Tables are peeled from both ends of the dependency graph: tables nothing
//! depends on go to the tail, tables depending on nothing go to the head.
//! When a cycle blocks peeling, one edge of it is classified recursive and
//! dropped from the working copy. The source graph is never mutated.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::constraints::ConstraintId;
use crate::graph::SchemaGraph;
use crate::schema::TableId;

/// Result of ordering a set of tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableOrder {
    /// Referenced tables before referencing ones.
    pub insertion: Vec<TableId>,
    /// Exact reverse of `insertion`.
    pub deletion: Vec<TableId>,
    /// Constraints no order can honor, in discovery order.
    pub recursive: Vec<ConstraintId>,
    /// Remote tables excluded from both orders.
    pub skipped_remote: Vec<TableId>,
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    constraint: ConstraintId,
    /// Referencing table.
    child: TableId,
    /// Referenced table.
    parent: TableId,
}

#[derive(Debug, Default, Clone, Copy)]
struct Degree {
    children: usize,
    parents: usize,
}

pub struct TableOrderer<'a> {
    graph: &'a SchemaGraph,
}

impl<'a> TableOrderer<'a> {
    pub fn new(graph: &'a SchemaGraph) -> Self {
        Self { graph }
    }

    /// Order every table in the graph.
    pub fn order_all(&self) -> TableOrder {
        self.order(self.graph.table_ids())
    }

    /// Order the given tables. Duplicate ids are ignored.
    pub fn order(&self, tables: impl IntoIterator<Item = TableId>) -> TableOrder {
        let mut remote = BTreeSet::new();
        let mut nodes = BTreeSet::new();
        for table in tables {
            if self.graph.table(table).is_remote() {
                remote.insert(table);
            } else {
                nodes.insert(table);
            }
        }
        let mut skipped_remote: Vec<TableId> = remote.into_iter().collect();
        self.graph.sort_tables(&mut skipped_remote);

        let edges = self.edges_between(&nodes);
        let degrees = degrees(&edges);

        let mut order = TableOrder {
            skipped_remote,
            ..TableOrder::default()
        };

        let mut unattached: Vec<TableId> = nodes
            .iter()
            .copied()
            .filter(|table| !degrees.contains_key(table))
            .collect();
        self.graph.sort_tables(&mut unattached);
        let remaining: BTreeSet<TableId> = nodes
            .into_iter()
            .filter(|table| degrees.contains_key(table))
            .collect();

        let (self_loops, working): (Vec<Edge>, Vec<Edge>) =
            edges.into_iter().partition(|edge| edge.child == edge.parent);
        order.recursive.extend(self.sorted_self_loops(self_loops));
        for constraint in &order.recursive {
            tracing::debug!(
                event = "recursive_constraint",
                kind = "self",
                constraint = %self.graph.describe(*constraint)
            );
        }

        let mut sorted_nodes: Vec<TableId> = remaining.iter().copied().collect();
        self.graph.sort_tables(&mut sorted_nodes);
        let mut peel = Peeling::new(self, working, remaining);

        let mut heads = Vec::new();
        let mut tail_blocks: Vec<Vec<TableId>> = Vec::new();

        while !peel.remaining.is_empty() {
            let before = peel.remaining.len();

            let mut leaves: Vec<TableId> = std::mem::take(&mut peel.leaves).into_iter().collect();
            self.sort_level(&mut leaves, &degrees);
            peel.remove_all(&leaves);
            if !leaves.is_empty() {
                tail_blocks.push(leaves);
            }

            let mut roots: Vec<TableId> = std::mem::take(&mut peel.roots).into_iter().collect();
            self.sort_level(&mut roots, &degrees);
            peel.remove_all(&roots);
            heads.extend(roots);

            if peel.remaining.len() == before {
                match peel.break_cycle(&sorted_nodes) {
                    Some(removed) => {
                        tracing::debug!(
                            event = "recursive_constraint",
                            kind = "cycle",
                            constraint = %self.graph.describe(removed)
                        );
                        order.recursive.push(removed);
                    }
                    None => {
                        let mut rest: Vec<TableId> =
                            std::mem::take(&mut peel.remaining).into_iter().collect();
                        self.sort_level(&mut rest, &degrees);
                        heads.extend(rest);
                    }
                }
            }
        }

        order.insertion = heads;
        order
            .insertion
            .extend(tail_blocks.into_iter().rev().flatten());
        order.insertion.extend(unattached);
        order.deletion = order.insertion.iter().rev().copied().collect();

        tracing::debug!(
            event = "tables_ordered",
            tables = order.insertion.len(),
            recursive = order.recursive.len(),
            skipped_remote = order.skipped_remote.len()
        );
        order
    }

    /// Constraints whose both tables are nodes.
    fn edges_between(&self, nodes: &BTreeSet<TableId>) -> Vec<Edge> {
        self.graph
            .constraints()
            .map(|(constraint, _)| {
                let (parent, child) = self.graph.constraint_tables(constraint);
                Edge {
                    constraint,
                    child,
                    parent,
                }
            })
            .filter(|edge| nodes.contains(&edge.child) && nodes.contains(&edge.parent))
            .collect()
    }

    fn sorted_self_loops(&self, mut loops: Vec<Edge>) -> Vec<ConstraintId> {
        loops.sort_by(|a, b| {
            self.graph
                .compare_tables(a.child, b.child)
                .then_with(|| self.compare_constraint_names(a.constraint, b.constraint))
        });
        loops.into_iter().map(|edge| edge.constraint).collect()
    }

    fn compare_constraint_names(&self, a: ConstraintId, b: ConstraintId) -> Ordering {
        let a_name = self.graph.constraint(a).name();
        let b_name = self.graph.constraint(b).name();
        a_name
            .to_lowercase()
            .cmp(&b_name.to_lowercase())
            .then_with(|| a_name.cmp(b_name))
            .then_with(|| a.cmp(&b))
    }

    /// Most children first, then fewest parents, then name.
    fn sort_level(&self, level: &mut [TableId], degrees: &BTreeMap<TableId, Degree>) {
        level.sort_by(|a, b| {
            let a_degree = degrees.get(a).copied().unwrap_or_default();
            let b_degree = degrees.get(b).copied().unwrap_or_default();
            b_degree
                .children
                .cmp(&a_degree.children)
                .then_with(|| a_degree.parents.cmp(&b_degree.parents))
                .then_with(|| self.graph.compare_tables(*a, *b))
        });
    }
}

/// Constraint counts per table, self-loops included.
fn degrees(edges: &[Edge]) -> BTreeMap<TableId, Degree> {
    let mut degrees: BTreeMap<TableId, Degree> = BTreeMap::new();
    for edge in edges {
        degrees.entry(edge.parent).or_default().children += 1;
        degrees.entry(edge.child).or_default().parents += 1;
    }
    degrees
}

/// Working state of one ordering run.
///
/// `pending` holds, per remaining table, the live edges to remaining
/// dependents and dependencies. A table is queued in `leaves` or `roots`
/// as soon as the matching count drops to zero.
struct Peeling {
    /// Edges by referenced table, sorted for deterministic walks.
    dependents: BTreeMap<TableId, Vec<Edge>>,
    /// Edges by referencing table.
    dependencies: BTreeMap<TableId, Vec<Edge>>,
    broken: BTreeSet<ConstraintId>,
    pending: BTreeMap<TableId, Degree>,
    remaining: BTreeSet<TableId>,
    leaves: BTreeSet<TableId>,
    roots: BTreeSet<TableId>,
}

impl Peeling {
    fn new(orderer: &TableOrderer<'_>, edges: Vec<Edge>, remaining: BTreeSet<TableId>) -> Self {
        let mut dependents: BTreeMap<TableId, Vec<Edge>> = BTreeMap::new();
        let mut dependencies: BTreeMap<TableId, Vec<Edge>> = BTreeMap::new();
        let mut pending: BTreeMap<TableId, Degree> =
            remaining.iter().map(|table| (*table, Degree::default())).collect();
        for edge in edges {
            dependents.entry(edge.parent).or_default().push(edge);
            dependencies.entry(edge.child).or_default().push(edge);
            if let Some(degree) = pending.get_mut(&edge.parent) {
                degree.children += 1;
            }
            if let Some(degree) = pending.get_mut(&edge.child) {
                degree.parents += 1;
            }
        }
        for edges in dependents.values_mut() {
            edges.sort_by(|a, b| {
                orderer
                    .graph
                    .compare_tables(a.child, b.child)
                    .then_with(|| orderer.compare_constraint_names(a.constraint, b.constraint))
            });
        }

        let leaves = pending
            .iter()
            .filter(|(_, degree)| degree.children == 0)
            .map(|(table, _)| *table)
            .collect();
        let roots = pending
            .iter()
            .filter(|(_, degree)| degree.parents == 0)
            .map(|(table, _)| *table)
            .collect();

        Self {
            dependents,
            dependencies,
            broken: BTreeSet::new(),
            pending,
            remaining,
            leaves,
            roots,
        }
    }

    /// Drop `tables` from the working set, then release their edges.
    fn remove_all(&mut self, tables: &[TableId]) {
        for table in tables {
            self.remaining.remove(table);
            self.leaves.remove(table);
            self.roots.remove(table);
        }
        for table in tables {
            let parents: Vec<Edge> = self.live(self.dependencies.get(table)).collect();
            for edge in parents {
                self.release_dependent(edge.parent);
            }
            let children: Vec<Edge> = self.live(self.dependents.get(table)).collect();
            for edge in children {
                self.release_dependency(edge.child);
            }
        }
    }

    fn live<'e>(&'e self, edges: Option<&'e Vec<Edge>>) -> impl Iterator<Item = Edge> + 'e {
        edges
            .into_iter()
            .flatten()
            .copied()
            .filter(move |edge| !self.broken.contains(&edge.constraint))
    }

    /// `table` lost one remaining dependent.
    fn release_dependent(&mut self, table: TableId) {
        if !self.remaining.contains(&table) {
            return;
        }
        if let Some(degree) = self.pending.get_mut(&table) {
            degree.children = degree.children.saturating_sub(1);
            if degree.children == 0 {
                self.leaves.insert(table);
            }
        }
    }

    /// `table` lost one remaining dependency.
    fn release_dependency(&mut self, table: TableId) {
        if !self.remaining.contains(&table) {
            return;
        }
        if let Some(degree) = self.pending.get_mut(&table) {
            degree.parents = degree.parents.saturating_sub(1);
            if degree.parents == 0 {
                self.roots.insert(table);
            }
        }
    }

    /// Remove one edge closing a cycle among the remaining tables, returning its constraint.
    fn break_cycle(&mut self, sorted_nodes: &[TableId]) -> Option<ConstraintId> {
        let victim = self.find_back_edge(sorted_nodes).or_else(|| {
            self.remaining
                .iter()
                .flat_map(|table| self.live(self.dependents.get(table)))
                .find(|edge| self.remaining.contains(&edge.child))
        })?;
        self.broken.insert(victim.constraint);
        self.release_dependent(victim.parent);
        self.release_dependency(victim.child);
        Some(victim.constraint)
    }

    /// Depth-first search walking from referenced to referencing tables.
    fn find_back_edge(&self, sorted_nodes: &[TableId]) -> Option<Edge> {
        let mut visited = BTreeSet::new();
        for start in sorted_nodes {
            if !self.remaining.contains(start) || visited.contains(start) {
                continue;
            }
            let mut on_stack = BTreeSet::from([*start]);
            let mut stack: Vec<(TableId, usize)> = vec![(*start, 0)];
            visited.insert(*start);

            while let Some((table, next)) = stack.last_mut() {
                let table = *table;
                let edge = self
                    .dependents
                    .get(&table)
                    .and_then(|edges| edges.get(*next))
                    .copied();
                *next += 1;

                match edge {
                    Some(edge)
                        if self.broken.contains(&edge.constraint)
                            || !self.remaining.contains(&edge.child) => {}
                    Some(edge) if on_stack.contains(&edge.child) => {
                        return Some(edge);
                    }
                    Some(edge) if visited.insert(edge.child) => {
                        on_stack.insert(edge.child);
                        stack.push((edge.child, 0));
                    }
                    Some(_) => {}
                    None => {
                        on_stack.remove(&table);
                        stack.pop();
                    }
                }
            }
        }
        None
    }
}

/// Order every table of `graph`.
pub fn order_tables(graph: &SchemaGraph) -> TableOrder {
    TableOrderer::new(graph).order_all()
}
