//! Kanban column bucketing.

use std::collections::HashMap;

use crate::types::Card;

/// The board's columns, in render order. This is a closed set: the board
/// always shows exactly these four, whatever the payload contains.
pub const BOARD_COLUMNS: [&str; 4] = ["To Do", "In Progress", "审核中", "Done"];

/// One rendered kanban column.
#[derive(Debug, Clone)]
pub struct KanbanColumn {
    pub name: &'static str,
    pub cards: Vec<Card>,
}

/// Bucket the payload's column map into the fixed column order. Columns
/// absent from the payload come back empty, not omitted; columns the
/// payload invents are ignored.
pub fn project_columns(columns: &HashMap<String, Vec<Card>>) -> Vec<KanbanColumn> {
    BOARD_COLUMNS
        .iter()
        .map(|&name| KanbanColumn {
            name,
            cards: columns.get(name).cloned().unwrap_or_default(),
        })
        .collect()
}
