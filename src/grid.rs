//! The town's lattice of cells, used to find who is next to whom.
//!
//! A grid of side `size` has `size * size` cells, stored row-major with the x coordinate as the
//! row (`index = x * size + y`). A cell records at most one occupant by id; the grid never owns
//! people. When two people land in the same cell the later write replaces the earlier one, an
//! accepted approximation of the gas model: the person whose registration was replaced can
//! still find and meet others but cannot be found until it moves.
use crate::error::GasTownError;
use crate::parameters::validate_grid_size;
use crate::person::PersonId;

/// Integer coordinates of a grid cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

impl Cell {
    #[must_use]
    pub fn new(x: usize, y: usize) -> Self {
        Cell { x, y }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    size: usize,
    cells: Vec<Option<PersonId>>,
}

impl Grid {
    /// # Errors
    ///
    /// Returns `GasTownError::InvalidParameter` if `size` is zero or `size * size` overflows.
    pub fn new(size: usize) -> Result<Self, GasTownError> {
        validate_grid_size(size)?;
        Ok(Grid {
            size,
            cells: vec![None; size * size],
        })
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// The cell containing `position`, truncating each coordinate.
    ///
    /// Positions are kept inside `[0, size - 1]` by wall reflection, so the truncated
    /// coordinates are always valid. Anything outside is clamped onto the border.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn cell_of(&self, position: [f64; 2]) -> Cell {
        debug_assert!(
            position
                .iter()
                .all(|c| (0.0..=self.upper_bound()).contains(c)),
            "position {position:?} is outside a grid of size {}",
            self.size
        );
        // `as usize` saturates: negatives and NaN map to 0.
        let last = self.size - 1;
        Cell {
            x: (position[0].floor() as usize).min(last),
            y: (position[1].floor() as usize).min(last),
        }
    }

    #[must_use]
    pub fn index_of(&self, cell: Cell) -> usize {
        debug_assert!(cell.x < self.size && cell.y < self.size);
        cell.x * self.size + cell.y
    }

    #[must_use]
    pub fn get(&self, cell: Cell) -> Option<PersonId> {
        self.cells[self.index_of(cell)]
    }

    /// Registers `person_id` in `cell`, returning the occupant it replaced.
    pub fn put(&mut self, cell: Cell, person_id: PersonId) -> Option<PersonId> {
        let index = self.index_of(cell);
        self.cells[index].replace(person_id)
    }

    /// Empties `cell` only if `person_id` is its occupant, so that a person leaving a cell never
    /// erases someone who has since moved in. Returns whether the cell was cleared.
    pub fn clear_if(&mut self, cell: Cell, person_id: PersonId) -> bool {
        let index = self.index_of(cell);
        if self.cells[index] == Some(person_id) {
            self.cells[index] = None;
            true
        } else {
            false
        }
    }

    /// The in-bounds cells of the 3x3 block centred on `cell`, excluding `cell` itself, in
    /// x-major order.
    pub fn neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> {
        let size = self.size;
        let xs = cell.x.saturating_sub(1)..=(cell.x + 1).min(size - 1);
        xs.flat_map(move |x| {
            let ys = cell.y.saturating_sub(1)..=(cell.y + 1).min(size - 1);
            ys.map(move |y| Cell { x, y })
        })
        .filter(move |neighbor| *neighbor != cell)
    }

    /// Every occupied cell with its occupant, in index order.
    pub fn occupied(&self) -> impl Iterator<Item = (Cell, PersonId)> + '_ {
        let size = self.size;
        self.cells.iter().enumerate().filter_map(move |(index, occupant)| {
            occupant.map(|person_id| {
                (
                    Cell {
                        x: index / size,
                        y: index % size,
                    },
                    person_id,
                )
            })
        })
    }

    #[must_use]
    pub fn n_occupied(&self) -> usize {
        self.cells.iter().filter(|occupant| occupant.is_some()).count()
    }

    /// Replaces the contents of the grid with the given people, written in iteration order so
    /// that the last person in a shared cell holds it.
    pub fn rebuild(&mut self, occupants: impl IntoIterator<Item = (PersonId, [f64; 2])>) {
        self.cells.fill(None);
        for (person_id, position) in occupants {
            let cell = self.cell_of(position);
            self.put(cell, person_id);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn upper_bound(&self) -> f64 {
        (self.size - 1) as f64
    }
}
