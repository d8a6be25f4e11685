//! Hex board geometry: cells, axial coordinates and neighbor tables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{AxialCoord, CellIdx, HEX_NEIGHBOR_COUNT};

/// The axial offsets of the six neighbors of a hex cell.
pub const HEX_DIRECTIONS: [AxialCoord; HEX_NEIGHBOR_COUNT] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

pub const FIXED16_CELL_COUNT: usize = 16;

/// Coordinates of the fixed 16-cell board, in cell-id order (`c1` first).
pub const FIXED16_COORDS: [AxialCoord; FIXED16_CELL_COUNT] = [
    (-2, 0), (-2, 1), (-2, 2),
    (-1, -1), (-1, 0), (-1, 1),
    (0, -2), (0, -1), (0, 0), (0, 1),
    (1, -2), (1, -1), (1, 0),
    (2, -2), (2, -1), (2, 0),
];

/// One lettered cell of a produced board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub id: String,
    pub letter: char,
    pub q: i32,
    pub r: i32,
}

impl Cell {
    pub fn coord(&self) -> AxialCoord {
        (self.q, self.r)
    }
}

/// The id of the cell at `idx`: `c1` for index 0.
pub fn cell_id(idx: CellIdx) -> String {
    format!("c{}", idx + 1)
}

/// The inverse of [`cell_id`].
pub fn parse_cell_id(id: &str) -> Option<CellIdx> {
    let number: usize = id.strip_prefix('c')?.parse().ok()?;
    number.checked_sub(1)
}

pub fn hex_distance(a: AxialCoord, b: AxialCoord) -> i32 {
    let dq = a.0 - b.0;
    let dr = a.1 - b.1;
    (dq.abs() + dr.abs() + (dq + dr).abs()) / 2
}

pub fn are_adjacent(a: AxialCoord, b: AxialCoord) -> bool {
    HEX_DIRECTIONS.iter().any(|&(dq, dr)| (a.0 + dq, a.1 + dr) == b)
}

/// An ordered set of hex coordinates with a precomputed neighbor table.
#[derive(Debug, Clone)]
pub struct HexTemplate {
    coords: Vec<AxialCoord>,
    neighbors: Vec<SmallVec<[CellIdx; HEX_NEIGHBOR_COUNT]>>,
}

impl HexTemplate {
    /// The fixed 16-cell board.
    pub fn fixed16() -> HexTemplate {
        HexTemplate::from_coords(FIXED16_COORDS.to_vec())
    }

    /// Build a template for arbitrary coordinates. Neighbors of each cell are listed in
    /// direction order. If a coordinate appears twice, only its first cell gets neighbors
    /// pointing at it.
    pub fn from_coords(coords: Vec<AxialCoord>) -> HexTemplate {
        let mut index_by_coord: BTreeMap<AxialCoord, CellIdx> = BTreeMap::new();
        for (idx, &coord) in coords.iter().enumerate() {
            index_by_coord.entry(coord).or_insert(idx);
        }

        let neighbors = coords
            .iter()
            .map(|&(q, r)| {
                HEX_DIRECTIONS
                    .iter()
                    .filter_map(|&(dq, dr)| index_by_coord.get(&(q + dq, r + dr)).copied())
                    .collect()
            })
            .collect();

        HexTemplate { coords, neighbors }
    }

    /// A template over the coordinates of an existing cell list, in list order.
    pub fn from_cells(cells: &[Cell]) -> HexTemplate {
        HexTemplate::from_coords(cells.iter().map(Cell::coord).collect())
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn coord(&self, idx: CellIdx) -> AxialCoord {
        self.coords[idx]
    }

    pub fn neighbors(&self, idx: CellIdx) -> &[CellIdx] {
        &self.neighbors[idx]
    }

    /// Hex distance from a cell to the origin, which is the center of the fixed board.
    pub fn distance_from_center(&self, idx: CellIdx) -> i32 {
        hex_distance(self.coords[idx], (0, 0))
    }

    /// Pair every coordinate with its letter to produce the public cell list.
    pub fn build_cells(&self, letters: &[char]) -> Vec<Cell> {
        self.coords
            .iter()
            .zip(letters)
            .enumerate()
            .map(|(idx, (&(q, r), &letter))| Cell { id: cell_id(idx), letter, q, r })
            .collect()
    }
}

/// Is this exactly the fixed 16-cell board, with every id at its canonical coordinates?
pub fn has_canonical_shape(cells: &[Cell]) -> bool {
    if cells.len() != FIXED16_CELL_COUNT {
        return false;
    }

    let mut seen = [false; FIXED16_CELL_COUNT];
    for cell in cells {
        let Some(idx) = parse_cell_id(&cell.id).filter(|&idx| idx < FIXED16_CELL_COUNT) else {
            return false;
        };
        if seen[idx] || FIXED16_COORDS[idx] != cell.coord() {
            return false;
        }
        seen[idx] = true;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed16_neighbors_are_symmetric() {
        let template = HexTemplate::fixed16();
        assert_eq!(template.len(), FIXED16_CELL_COUNT);
        for idx in 0..template.len() {
            for &other in template.neighbors(idx) {
                assert!(template.neighbors(other).contains(&idx));
                assert!(are_adjacent(template.coord(idx), template.coord(other)));
            }
        }
    }

    #[test]
    fn test_fixed16_center_has_six_neighbors() {
        let template = HexTemplate::fixed16();
        // c9 is the origin.
        assert_eq!(template.coord(8), (0, 0));
        assert_eq!(template.neighbors(8).len(), 6);
        assert_eq!(template.distance_from_center(0), 2);
    }

    #[test]
    fn test_hex_distance() {
        assert_eq!(hex_distance((0, 0), (0, 0)), 0);
        assert_eq!(hex_distance((0, 0), (1, -1)), 1);
        assert_eq!(hex_distance((-2, 0), (2, -2)), 4);
        assert_eq!(hex_distance((-2, 2), (2, -2)), 4);
    }

    #[test]
    fn test_cell_ids() {
        assert_eq!(cell_id(0), "c1");
        assert_eq!(parse_cell_id("c16"), Some(15));
        assert_eq!(parse_cell_id("c0"), None);
        assert_eq!(parse_cell_id("x1"), None);
    }

    #[test]
    fn test_canonical_shape() {
        let template = HexTemplate::fixed16();
        let letters: Vec<char> = "ABCDEFGHIJKLMNOP".chars().collect();
        let mut cells = template.build_cells(&letters);
        assert!(has_canonical_shape(&cells));

        cells[3].q += 1;
        assert!(!has_canonical_shape(&cells));

        cells.pop();
        assert!(!has_canonical_shape(&cells));
    }

    #[test]
    fn test_from_cells_matches_coords() {
        let cells = vec![
            Cell { id: "c1".to_string(), letter: 'T', q: 0, r: 0 },
            Cell { id: "c2".to_string(), letter: 'O', q: 1, r: 0 },
            Cell { id: "c3".to_string(), letter: 'X', q: 3, r: 0 },
        ];
        let template = HexTemplate::from_cells(&cells);
        assert_eq!(template.neighbors(0), &[1]);
        assert_eq!(template.neighbors(1), &[0]);
        assert!(template.neighbors(2).is_empty());
    }
}
