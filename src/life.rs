//! Game of Life on a torus, built on a `Brain`.
//!
//! Every cell is a node named `cell:{row}:{col}` whose inputs are its 3×3
//! neighbourhood (itself in the middle). The rule reports no change when
//! the computed liveness equals the current one, which is what lets a still
//! life settle.

use std::fmt;

use crate::brain::{Brain, Concept, Function, Functions, ImmediateFunction, Lexicon};
use crate::model::{cast_or, Scalar, Signal};
use crate::{Error, Result};

/// Function id of the rule in the registry.
pub const GAME_OF_LIFE: &str = "Game of Life";

/// Conway's B3/S23 rule over a 9-cell neighbourhood.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifeRule;

impl<S: Signal> ImmediateFunction<S> for LifeRule {
    fn description(&self) -> &str {
        GAME_OF_LIFE
    }

    fn call(&self, inputs: &[Option<S>]) -> Result<Option<S>> {
        if inputs.len() != 9 {
            return Err(Error::Evaluation(format!(
                "{GAME_OF_LIFE} expects 9 inputs, got {}",
                inputs.len()
            )));
        }
        let live: Vec<bool> = inputs.iter().map(|s| cast_or(s.as_ref(), false)).collect();
        let is_live = live[4];
        let n = live.iter().filter(|l| **l).count() - usize::from(is_live);
        let next = (is_live && n == 2) || n == 3;
        Ok((next != is_live).then(|| S::from_scalar(Scalar::Bool(next))))
    }
}

/// Node name of one cell.
pub fn cell(row: usize, col: usize) -> String {
    format!("cell:{row}:{col}")
}

/// A rows × cols board whose edges wrap around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// The 3×3 neighbourhood of a cell in row-major order, wrapping at the edges.
    pub fn kernel(&self, row: usize, col: usize) -> Vec<String> {
        let wrap = |i: usize, d: isize, n: usize| (i as isize + d).rem_euclid(n as isize) as usize;
        let mut kernel = Vec::with_capacity(9);
        for dr in -1..=1 {
            for dc in -1..=1 {
                kernel.push(cell(wrap(row, dr, self.rows), wrap(col, dc, self.cols)));
            }
        }
        kernel
    }

    pub fn lexicon(&self) -> Lexicon<String> {
        let mut lexicon = Lexicon::with_capacity(self.rows * self.cols);
        for row in 0..self.rows {
            for col in 0..self.cols {
                lexicon.insert(cell(row, col), Concept::new(GAME_OF_LIFE, self.kernel(row, col)));
            }
        }
        lexicon
    }

    pub fn functions<S: Signal>() -> Functions<String, S> {
        let mut functions = Functions::new();
        functions.insert(GAME_OF_LIFE.to_string(), Function::immediate(LifeRule));
        functions
    }

    pub fn brain<S: Signal>(&self) -> Result<Brain<String, S>> {
        Brain::new(self.lexicon(), Self::functions())
    }

    /// Queue `live = true` for each listed cell.
    pub fn seed<S: Signal>(brain: &mut Brain<String, S>, cells: &[(usize, usize)]) {
        for &(row, col) in cells {
            brain.write(cell(row, col), S::from_scalar(Scalar::Bool(true)));
        }
    }

    /// Committed liveness of one cell; unset cells are dead.
    pub fn is_live<S: Signal>(brain: &Brain<String, S>, row: usize, col: usize) -> bool {
        cast_or(brain.committed(&cell(row, col)), false)
    }

    /// Live cells, sorted.
    pub fn live_cells<S: Signal>(&self, brain: &Brain<String, S>) -> Vec<(usize, usize)> {
        let mut live = Vec::new();
        for row in 0..self.rows {
            for col in 0..self.cols {
                if Self::is_live(brain, row, col) {
                    live.push((row, col));
                }
            }
        }
        live
    }

    /// One character per cell, `#` live and `.` dead.
    pub fn render<S: Signal>(&self, brain: &Brain<String, S>) -> Board {
        let rows = (0..self.rows)
            .map(|row| {
                (0..self.cols)
                    .map(|col| if Self::is_live(brain, row, col) { '#' } else { '.' })
                    .collect()
            })
            .collect();
        Board(rows)
    }
}

/// Rendered board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board(pub Vec<String>);

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.0 {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
