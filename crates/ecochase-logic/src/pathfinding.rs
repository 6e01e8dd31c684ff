//! Shortest paths on the 4-connected grid.
//!
//! Both searches return the cells from the first step after `start` up to
//! and including `goal`. An empty path means either `start == goal` or the
//! goal is unreachable; neither is an error. Out-of-bounds endpoints are
//! rejected with [`InvalidPositionError`].
//!
//! # Tie-breaking
//!
//! | Algorithm | Frontier | Ties |
//! |-----------|----------|------|
//! | BFS | FIFO queue | neighbor order (S, N, E, W) |
//! | A* | binary heap on `f = g + manhattan` | earliest insertion first |
//!
//! The two may choose different cells among equal-length routes, but the
//! lengths always agree.
//!
//! ```
//! use ecochase_logic::grid::{Grid, Position};
//! use ecochase_logic::pathfinding::{astar, bfs};
//!
//! let grid = Grid::open(5);
//! let path = bfs(Position::new(0, 2), Position::new(4, 2), &grid).unwrap();
//! assert_eq!(path.len(), 4);
//! assert_eq!(astar(Position::new(0, 2), Position::new(4, 2), &grid).unwrap(), path);
//! ```

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use crate::config::SearchAlgorithm;
use crate::error::InvalidPositionError;
use crate::grid::{manhattan, Grid, Position};

/// A path plus the number of nodes the search expanded to find it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub path: Vec<Position>,
    pub expanded: usize,
}

/// Run the configured algorithm.
pub fn find_path(
    algorithm: SearchAlgorithm,
    start: Position,
    goal: Position,
    grid: &Grid,
) -> Result<Vec<Position>, InvalidPositionError> {
    search(algorithm, start, goal, grid).map(|r| r.path)
}

/// Run the configured algorithm, reporting expansion counts.
pub fn search(
    algorithm: SearchAlgorithm,
    start: Position,
    goal: Position,
    grid: &Grid,
) -> Result<SearchResult, InvalidPositionError> {
    match algorithm {
        SearchAlgorithm::Bfs => bfs_with_stats(start, goal, grid),
        SearchAlgorithm::AStar => astar_with_stats(start, goal, grid),
    }
}

/// Breadth-first search.
pub fn bfs(
    start: Position,
    goal: Position,
    grid: &Grid,
) -> Result<Vec<Position>, InvalidPositionError> {
    bfs_with_stats(start, goal, grid).map(|r| r.path)
}

/// A* search with the Manhattan heuristic.
pub fn astar(
    start: Position,
    goal: Position,
    grid: &Grid,
) -> Result<Vec<Position>, InvalidPositionError> {
    astar_with_stats(start, goal, grid).map(|r| r.path)
}

pub fn bfs_with_stats(
    start: Position,
    goal: Position,
    grid: &Grid,
) -> Result<SearchResult, InvalidPositionError> {
    grid.check_position(start)?;
    grid.check_position(goal)?;

    let mut visited = HashSet::new();
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut queue = VecDeque::new();
    let mut expanded = 0;
    visited.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        if current == goal {
            return Ok(SearchResult {
                path: reconstruct(&came_from, start, goal),
                expanded,
            });
        }
        expanded += 1;

        for next in grid.neighbors4(current) {
            if visited.insert(next) {
                came_from.insert(next, current);
                queue.push_back(next);
            }
        }
    }

    Ok(SearchResult {
        path: Vec::new(),
        expanded,
    })
}

pub fn astar_with_stats(
    start: Position,
    goal: Position,
    grid: &Grid,
) -> Result<SearchResult, InvalidPositionError> {
    grid.check_position(start)?;
    grid.check_position(goal)?;

    // Heap entries: (f, insertion sequence, g, position), min-first.
    let mut open: BinaryHeap<Reverse<(u32, u64, u32, Position)>> = BinaryHeap::new();
    let mut g_score: HashMap<Position, u32> = HashMap::new();
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut closed = HashSet::new();
    let mut seq: u64 = 0;
    let mut expanded = 0;

    g_score.insert(start, 0);
    open.push(Reverse((manhattan(start, goal), seq, 0, start)));

    while let Some(Reverse((_, _, g, current))) = open.pop() {
        // Superseded by a cheaper entry pushed later.
        if g > g_score.get(&current).copied().unwrap_or(u32::MAX) || !closed.insert(current) {
            continue;
        }
        if current == goal {
            return Ok(SearchResult {
                path: reconstruct(&came_from, start, goal),
                expanded,
            });
        }
        expanded += 1;

        let tentative = g + 1;
        for next in grid.neighbors4(current) {
            if tentative < g_score.get(&next).copied().unwrap_or(u32::MAX) {
                came_from.insert(next, current);
                g_score.insert(next, tentative);
                seq += 1;
                open.push(Reverse((
                    tentative + manhattan(next, goal),
                    seq,
                    tentative,
                    next,
                )));
            }
        }
    }

    Ok(SearchResult {
        path: Vec::new(),
        expanded,
    })
}

/// Walk predecessors back from `goal`, excluding `start`.
fn reconstruct(
    came_from: &HashMap<Position, Position>,
    start: Position,
    goal: Position,
) -> Vec<Position> {
    let mut path = Vec::new();
    let mut current = goal;
    while current != start {
        path.push(current);
        match came_from.get(&current) {
            Some(&prev) => current = prev,
            None => break,
        }
    }
    path.reverse();
    path
}
