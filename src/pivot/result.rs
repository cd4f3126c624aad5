//! The reshaped pivot table and its hierarchical column tree.

use serde::Serialize;

use crate::types::Value;

/// Grouped, aggregated, reshaped output table.
///
/// Row `r`, column `c` of the grid is `cells[r][c]`, labelled by `row_keys[r]` and
/// `col_keys[c]`. Each key holds one value per level, named by `row_names` / `col_names`.
/// Every cell is a finite number; combinations without contributing rows hold `0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotResult {
    pub row_names: Vec<String>,
    pub row_keys: Vec<Vec<Value>>,
    pub col_names: Vec<String>,
    pub col_keys: Vec<Vec<Value>>,
    pub cells: Vec<Vec<f64>>,
}

impl PivotResult {
    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.row_keys.len(), self.col_keys.len())
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<f64> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Cell addressed by its row and column keys.
    pub fn lookup(&self, row_key: &[Value], col_key: &[Value]) -> Option<f64> {
        let r = self.row_keys.iter().position(|k| k.as_slice() == row_key)?;
        let c = self.col_keys.iter().position(|k| k.as_slice() == col_key)?;
        self.cell(r, c)
    }

    /// Cell rendered the way the grid displays it: two decimals.
    pub fn format_cell(&self, row: usize, col: usize) -> Option<String> {
        self.cell(row, col).map(|v| format!("{v:.2}"))
    }

    /// Swap the row and column axes.
    pub fn transpose(&self) -> PivotResult {
        let (rows, cols) = self.shape();
        let cells = (0..cols)
            .map(|c| (0..rows).map(|r| self.cells[r][c]).collect())
            .collect();
        PivotResult {
            row_names: self.col_names.clone(),
            row_keys: self.col_keys.clone(),
            col_names: self.row_names.clone(),
            col_keys: self.row_keys.clone(),
            cells,
        }
    }

    /// Column keys as a tree, one branch level per column level, leaves holding column indices.
    ///
    /// Siblings keep the order in which they first appear in `col_keys`.
    pub fn column_tree(&self) -> ColumnNode {
        let indexed: Vec<(&[Value], usize)> = self
            .col_keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.as_slice(), i))
            .collect();
        ColumnNode::build(&indexed)
    }
}

/// Recursive column hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ColumnNode {
    /// A concrete grid column.
    Leaf(usize),
    /// One level of the hierarchy: child nodes keyed by this level's value.
    Branch(Vec<(Value, ColumnNode)>),
}

impl ColumnNode {
    fn build(keys: &[(&[Value], usize)]) -> ColumnNode {
        match keys {
            [] => ColumnNode::Branch(Vec::new()),
            [(rest, idx), ..] if rest.is_empty() => ColumnNode::Leaf(*idx),
            _ => {
                let mut groups: Vec<(Value, Vec<(&[Value], usize)>)> = Vec::new();
                for (key, idx) in keys {
                    let Some((head, tail)) = key.split_first() else {
                        continue;
                    };
                    match groups.iter().position(|(v, _)| v == head) {
                        Some(pos) => groups[pos].1.push((tail, *idx)),
                        None => groups.push((head.clone(), vec![(tail, *idx)])),
                    }
                }
                ColumnNode::Branch(
                    groups
                        .into_iter()
                        .map(|(value, members)| (value, ColumnNode::build(&members)))
                        .collect(),
                )
            }
        }
    }

    /// Depth-first walk yielding each leaf's key path and column index.
    pub fn leaves(&self) -> Vec<(Vec<Value>, usize)> {
        let mut out = Vec::new();
        self.collect_leaves(&mut Vec::new(), &mut out);
        out
    }

    fn collect_leaves(&self, path: &mut Vec<Value>, out: &mut Vec<(Vec<Value>, usize)>) {
        match self {
            ColumnNode::Leaf(idx) => out.push((path.clone(), *idx)),
            ColumnNode::Branch(children) => {
                for (value, child) in children {
                    path.push(value.clone());
                    child.collect_leaves(path, out);
                    path.pop();
                }
            }
        }
    }

    /// Number of grid columns under this node.
    pub fn width(&self) -> usize {
        match self {
            ColumnNode::Leaf(_) => 1,
            ColumnNode::Branch(children) => children.iter().map(|(_, c)| c.width()).sum(),
        }
    }
}
