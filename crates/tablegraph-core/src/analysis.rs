//! Schema anomaly queries and transitive relationship walks.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::graph::SchemaGraph;
use crate::schema::{ColumnId, TableId};

fn local_tables(graph: &SchemaGraph) -> Vec<TableId> {
    let mut tables: Vec<TableId> = graph
        .tables()
        .filter(|table| !table.is_remote())
        .map(|table| table.id())
        .collect();
    graph.sort_tables(&mut tables);
    tables
}

/// Tables without relationships.
///
/// Unless `with_implied` is set, tables whose only relationships were
/// inferred from naming conventions also count as orphans.
pub fn orphan_tables(graph: &SchemaGraph, with_implied: bool) -> Vec<TableId> {
    local_tables(graph)
        .into_iter()
        .filter(|table| {
            graph.table_columns(*table).all(|column| {
                column
                    .parents()
                    .chain(column.children())
                    .all(|(_, constraint)| !with_implied && !graph.constraint(constraint).is_real())
            })
        })
        .collect()
}

pub fn tables_with_one_column(graph: &SchemaGraph) -> Vec<TableId> {
    local_tables(graph)
        .into_iter()
        .filter(|table| graph.table(*table).column_ids().len() == 1)
        .collect()
}

/// Tables with `name1`/`name2` style column pairs, a sign of denormalization.
///
/// A column without a numeric suffix counts as number one, so adding
/// `phone2` next to `phone` is detected too.
pub fn tables_with_incrementing_column_names(graph: &SchemaGraph) -> Vec<TableId> {
    local_tables(graph)
        .into_iter()
        .filter(|table| has_incrementing_columns(graph.table_columns(*table).map(|c| c.name())))
        .collect()
}

fn has_incrementing_columns<'a>(names: impl Iterator<Item = &'a str>) -> bool {
    let mut prefixes: BTreeMap<String, u64> = BTreeMap::new();
    for name in names {
        let (prefix, number) = split_numeric_suffix(name);
        let Some(number) = number else {
            continue;
        };
        if prefixes
            .get(prefix)
            .is_some_and(|existing| existing.abs_diff(number) == 1)
        {
            return true;
        }
        prefixes.insert(prefix.to_string(), number);
    }
    false
}

/// Split `name12` into `("name", Some(12))`; `name` yields `("name", Some(1))`.
/// The first character is never part of the suffix.
fn split_numeric_suffix(name: &str) -> (&str, Option<u64>) {
    let digits = name
        .char_indices()
        .rev()
        .take_while(|(index, ch)| *index > 0 && ch.is_ascii_digit())
        .last()
        .map(|(index, _)| index);

    match digits {
        Some(start) => (&name[..start], name[start..].parse().ok()),
        None => (name, Some(1)),
    }
}

/// Columns whose default is the string literal `'null'` rather than `NULL`.
pub fn default_null_string_columns(graph: &SchemaGraph) -> Vec<ColumnId> {
    let mut columns = Vec::new();
    for table in local_tables(graph) {
        let mut found: Vec<(String, ColumnId)> = graph
            .table_columns(table)
            .filter(|column| {
                column
                    .default_value()
                    .is_some_and(|value| value.trim().eq_ignore_ascii_case("'null'"))
            })
            .map(|column| (column.name().to_lowercase(), column.id()))
            .collect();
        found.sort();
        columns.extend(found.into_iter().map(|(_, id)| id));
    }
    columns
}

fn walk(
    graph: &SchemaGraph,
    start: TableId,
    next: impl Fn(TableId) -> BTreeSet<TableId>,
) -> Vec<TableId> {
    let mut visited = BTreeSet::from([start]);
    let mut found = Vec::new();
    let mut queue = VecDeque::from([start]);

    while let Some(table) = queue.pop_front() {
        let mut neighbours: Vec<TableId> = next(table).into_iter().collect();
        graph.sort_tables(&mut neighbours);
        for neighbour in neighbours {
            if visited.insert(neighbour) {
                found.push(neighbour);
                queue.push_back(neighbour);
            }
        }
    }
    found
}

/// Every table `table` references, directly or transitively, in BFS order.
pub fn ancestors(graph: &SchemaGraph, table: TableId) -> Vec<TableId> {
    walk(graph, table, |current| graph.table_parents(current))
}

/// Every table referencing `table`, directly or transitively, in BFS order.
pub fn descendants(graph: &SchemaGraph, table: TableId) -> Vec<TableId> {
    walk(graph, table, |current| graph.table_children(current))
}

pub fn max_parents_depth(graph: &SchemaGraph, table: TableId) -> usize {
    ancestors(graph, table).len()
}

pub fn max_children_depth(graph: &SchemaGraph, table: TableId) -> usize {
    descendants(graph, table).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{ConstraintKind, ForeignKeyConstraint};
    use crate::schema::{Column, Table};
    use crate::types::ColumnType;

    fn table(graph: &mut SchemaGraph, name: &str, columns: &[&str]) -> TableId {
        let id = graph.add_table(Table::new(None, None, name)).unwrap();
        for column in columns {
            graph
                .add_column(id, Column::new(*column, ColumnType::named("int")))
                .unwrap();
        }
        id
    }

    fn link(
        graph: &mut SchemaGraph,
        child: (TableId, &str),
        parent: (TableId, &str),
        kind: ConstraintKind,
    ) {
        let child_column = graph.table(child.0).column_id(child.1).unwrap();
        let parent_column = graph.table(parent.0).column_id(parent.1).unwrap();
        let name = format!("fk_{}_{}", graph.table(child.0).name(), child.1);
        graph
            .attach(ForeignKeyConstraint::inferred(kind, name, parent_column, child_column))
            .unwrap();
    }

    #[test]
    fn numeric_suffixes_split() {
        assert_eq!(split_numeric_suffix("phone2"), ("phone", Some(2)));
        assert_eq!(split_numeric_suffix("phone"), ("phone", Some(1)));
        assert_eq!(split_numeric_suffix("7"), ("7", Some(1)));
        assert_eq!(split_numeric_suffix("a10"), ("a", Some(10)));
    }

    #[test]
    fn incrementing_columns_are_flagged() {
        let mut graph = SchemaGraph::new();
        let contacts = table(&mut graph, "contacts", &["id", "phone", "phone2"]);
        let addresses = table(&mut graph, "addresses", &["line1", "line3"]);
        table(&mut graph, "plain", &["id", "name"]);

        assert_eq!(tables_with_incrementing_column_names(&graph), vec![contacts]);
        assert!(!tables_with_incrementing_column_names(&graph).contains(&addresses));
    }

    #[test]
    fn orphans_respect_implied_flag() {
        let mut graph = SchemaGraph::new();
        let artist = table(&mut graph, "artist", &["id"]);
        let album = table(&mut graph, "album", &["id", "artist_id"]);
        let lonely = table(&mut graph, "lonely", &["id", "note"]);
        link(&mut graph, (album, "artist_id"), (artist, "id"), ConstraintKind::Implied);

        assert_eq!(orphan_tables(&graph, false), vec![album, artist, lonely]);
        assert_eq!(orphan_tables(&graph, true), vec![lonely]);
        assert_eq!(tables_with_one_column(&graph), vec![artist]);
    }

    #[test]
    fn walks_terminate_on_cycles() {
        let mut graph = SchemaGraph::new();
        let a = table(&mut graph, "a", &["id", "c_id"]);
        let b = table(&mut graph, "b", &["id", "a_id"]);
        let c = table(&mut graph, "c", &["id", "b_id"]);
        link(&mut graph, (a, "c_id"), (c, "id"), ConstraintKind::Real);
        link(&mut graph, (b, "a_id"), (a, "id"), ConstraintKind::Real);
        link(&mut graph, (c, "b_id"), (b, "id"), ConstraintKind::Real);

        assert_eq!(ancestors(&graph, a), vec![c, b]);
        assert_eq!(descendants(&graph, a), vec![b, c]);
        assert_eq!(max_parents_depth(&graph, b), 2);
    }

    #[test]
    fn null_string_defaults_are_found() {
        let mut graph = SchemaGraph::new();
        let users = graph.add_table(Table::new(None, None, "users")).unwrap();
        let nick = graph
            .add_column(
                users,
                Column::new("nick", ColumnType::named("varchar")).with_default(Some(" 'NULL' ".into())),
            )
            .unwrap();
        graph
            .add_column(
                users,
                Column::new("bio", ColumnType::named("text")).with_default(Some("NULL".into())),
            )
            .unwrap();

        assert_eq!(default_null_string_columns(&graph), vec![nick]);
    }
}
