use thiserror::Error;

use crate::types::{Card, CardId, CardIdFactory, Direction, Location, OutPaths, Rotation};

pub const MIN_EXTENT: usize = 3;
pub const MAX_EXTENT: usize = 127;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GridError {
    #[error("grid extent must be odd and within 3..=127, got {0}")]
    InvalidExtent(usize),
    #[error("expected {expected} cards, got {actual}")]
    CardCount { expected: usize, actual: usize },
}

/// Square maze of cards stored row-major.
///
/// Rows and columns with an odd index are movable; their border ends are the
/// insertion locations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    extent: u8,
    cards: Vec<Card>,
    insertion_locations: Vec<Location>,
}

impl Grid {
    pub fn new(extent: usize, cards: Vec<Card>) -> Result<Self, GridError> {
        if !(MIN_EXTENT..=MAX_EXTENT).contains(&extent) || extent % 2 == 0 {
            return Err(GridError::InvalidExtent(extent));
        }
        if cards.len() != extent * extent {
            return Err(GridError::CardCount {
                expected: extent * extent,
                actual: cards.len(),
            });
        }

        Ok(Self {
            extent: extent as u8,
            cards,
            insertion_locations: insertion_locations(extent as u8),
        })
    }

    /// Builds a grid from row-major shapes, drawing ids from `ids`.
    pub fn from_shapes(
        extent: usize,
        shapes: impl IntoIterator<Item = (OutPaths, Rotation)>,
        ids: &mut CardIdFactory,
    ) -> Result<Self, GridError> {
        let cards = shapes
            .into_iter()
            .map(|(out_paths, rotation)| ids.card(out_paths, rotation))
            .collect();
        Self::new(extent, cards)
    }

    pub const fn extent(&self) -> usize {
        self.extent as usize
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn contains(&self, location: Location) -> bool {
        location.row < self.extent && location.column < self.extent
    }

    pub fn get(&self, location: Location) -> Option<&Card> {
        self.contains(location)
            .then(|| &self.cards[self.index(location)])
    }

    pub(crate) fn get_mut(&mut self, location: Location) -> Option<&mut Card> {
        if !self.contains(location) {
            return None;
        }
        let index = self.index(location);
        Some(&mut self.cards[index])
    }

    pub fn locations(&self) -> impl Iterator<Item = Location> + '_ {
        (0..self.cards.len()).map(|index| self.location_at(index))
    }

    pub fn locate(&self, id: CardId) -> Option<Location> {
        self.cards
            .iter()
            .position(|card| card.id == id)
            .map(|index| self.location_at(index))
    }

    pub fn insertion_locations(&self) -> &[Location] {
        &self.insertion_locations
    }

    pub fn is_insertion_location(&self, location: Location) -> bool {
        self.insertion_locations.contains(&location)
    }

    pub const fn is_movable_line(&self, index: u8) -> bool {
        index % 2 == 1 && index < self.extent
    }

    /// The slot at the other end of the line `location` pushes into.
    pub fn opposing_insertion_location(&self, location: Location) -> Option<Location> {
        if !self.is_insertion_location(location) {
            return None;
        }
        let last = self.extent - 1;
        let opposite = if location.row == 0 {
            Location::new(last, location.column)
        } else if location.row == last {
            Location::new(0, location.column)
        } else if location.column == 0 {
            Location::new(location.row, last)
        } else {
            Location::new(location.row, 0)
        };
        Some(opposite)
    }

    pub fn neighbor(&self, location: Location, direction: Direction) -> Option<Location> {
        let (dr, dc) = direction.offset();
        let row = i32::from(location.row) + dr;
        let column = i32::from(location.column) + dc;
        let extent = i32::from(self.extent);
        if row < 0 || column < 0 || row >= extent || column >= extent {
            return None;
        }
        Some(Location::new(row as u8, column as u8))
    }

    /// Whether a token can cross from `location` one step towards `direction`.
    pub fn are_connected(&self, location: Location, direction: Direction) -> bool {
        let Some(next) = self.neighbor(location, direction) else {
            return false;
        };
        match (self.get(location), self.get(next)) {
            (Some(from), Some(to)) => from.connects(direction) && to.connects(direction.opposite()),
            _ => false,
        }
    }

    /// Where the card currently at `location` ends up after inserting at
    /// `slot`. The card pushed off the far edge maps onto the slot, following
    /// tokens that are re-homed onto the inserted card.
    pub fn shifted_location(&self, slot: Location, location: Location) -> Location {
        let last = self.extent - 1;
        if slot.row == 0 && location.column == slot.column {
            if location.row == last {
                slot
            } else {
                Location::new(location.row + 1, location.column)
            }
        } else if slot.row == last && location.column == slot.column {
            if location.row == 0 {
                slot
            } else {
                Location::new(location.row - 1, location.column)
            }
        } else if slot.column == 0 && slot.row != 0 && slot.row != last && location.row == slot.row
        {
            if location.column == last {
                slot
            } else {
                Location::new(location.row, location.column + 1)
            }
        } else if slot.column == last
            && slot.row != 0
            && slot.row != last
            && location.row == slot.row
        {
            if location.column == 0 {
                slot
            } else {
                Location::new(location.row, location.column - 1)
            }
        } else {
            location
        }
    }

    pub fn index(&self, location: Location) -> usize {
        usize::from(location.row) * self.extent() + usize::from(location.column)
    }

    pub fn location_at(&self, index: usize) -> Location {
        Location::new(
            (index / self.extent()) as u8,
            (index % self.extent()) as u8,
        )
    }

    /// Slides the line starting at `slot` one cell inwards, placing `inserted`
    /// at the slot and returning the card pushed off the far edge.
    ///
    /// `slot` must be an insertion location.
    pub(crate) fn shift_line(&mut self, slot: Location, inserted: Card) -> Card {
        let n = self.extent();
        let last = n - 1;
        let row = usize::from(slot.row);
        let column = usize::from(slot.column);

        if row == 0 {
            let ejected = self.cards[last * n + column];
            for r in (1..n).rev() {
                self.cards[r * n + column] = self.cards[(r - 1) * n + column];
            }
            self.cards[column] = inserted;
            ejected
        } else if row == last {
            let ejected = self.cards[column];
            for r in 0..last {
                self.cards[r * n + column] = self.cards[(r + 1) * n + column];
            }
            self.cards[last * n + column] = inserted;
            ejected
        } else if column == 0 {
            let ejected = self.cards[row * n + last];
            for c in (1..n).rev() {
                self.cards[row * n + c] = self.cards[row * n + c - 1];
            }
            self.cards[row * n] = inserted;
            ejected
        } else {
            let ejected = self.cards[row * n];
            for c in 0..last {
                self.cards[row * n + c] = self.cards[row * n + c + 1];
            }
            self.cards[row * n + last] = inserted;
            ejected
        }
    }
}

fn insertion_locations(extent: u8) -> Vec<Location> {
    let last = extent - 1;
    let movable = || (1..extent).step_by(2);
    let mut slots = Vec::with_capacity(usize::from(extent - 1) * 2);
    slots.extend(movable().map(|column| Location::new(0, column)));
    slots.extend(movable().map(|row| Location::new(row, last)));
    slots.extend(movable().map(|column| Location::new(last, column)));
    slots.extend(movable().map(|row| Location::new(row, 0)));
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Shape;

    fn uniform_grid(extent: usize) -> Grid {
        let mut ids = CardIdFactory::new();
        Grid::from_shapes(
            extent,
            (0..extent * extent).map(|_| (Shape::Cross.out_paths(), Rotation::R0)),
            &mut ids,
        )
        .expect("valid grid")
    }

    #[test]
    fn rejects_even_or_small_extents() {
        let mut ids = CardIdFactory::new();
        for extent in [0, 1, 2, 4, 8] {
            let shapes = (0..extent * extent).map(|_| (OutPaths::CROSS, Rotation::R0));
            assert_eq!(
                Grid::from_shapes(extent, shapes, &mut ids),
                Err(GridError::InvalidExtent(extent))
            );
        }
        assert_eq!(
            Grid::new(3, Vec::new()),
            Err(GridError::CardCount {
                expected: 9,
                actual: 0
            })
        );
    }

    #[test]
    fn insertion_locations_alternate_along_each_edge() {
        let grid = uniform_grid(7);
        let slots = grid.insertion_locations();
        assert_eq!(slots.len(), 12);
        assert!(slots.contains(&Location::new(0, 1)));
        assert!(slots.contains(&Location::new(5, 6)));
        assert!(!slots.contains(&Location::new(0, 0)));
        assert!(!slots.contains(&Location::new(0, 2)));

        let small = uniform_grid(3);
        assert_eq!(
            small.insertion_locations(),
            &[
                Location::new(0, 1),
                Location::new(1, 2),
                Location::new(2, 1),
                Location::new(1, 0)
            ]
        );
    }

    #[test]
    fn opposing_location_is_an_involution() {
        let grid = uniform_grid(7);
        for &slot in grid.insertion_locations() {
            let opposite = grid.opposing_insertion_location(slot).expect("slot");
            assert_ne!(opposite, slot);
            assert_eq!(grid.opposing_insertion_location(opposite), Some(slot));
        }
        assert_eq!(grid.opposing_insertion_location(Location::new(3, 3)), None);
    }

    #[test]
    fn shift_line_moves_cards_and_ejects_far_end() {
        let mut grid = uniform_grid(3);
        let before = grid.clone();
        let inserted = Card::new(CardId(99), OutPaths::STRAIGHT, Rotation::R0);

        let ejected = grid.shift_line(Location::new(1, 0), inserted);

        assert_eq!(ejected, *before.get(Location::new(1, 2)).unwrap());
        assert_eq!(grid.get(Location::new(1, 0)), Some(&inserted));
        assert_eq!(
            grid.get(Location::new(1, 1)),
            before.get(Location::new(1, 0))
        );
        assert_eq!(
            grid.get(Location::new(1, 2)),
            before.get(Location::new(1, 1))
        );
        assert_eq!(grid.get(Location::new(0, 0)), before.get(Location::new(0, 0)));
    }

    #[test]
    fn shifted_location_tracks_cards_for_every_slot() {
        let grid = uniform_grid(5);
        for &slot in grid.insertion_locations() {
            let mut shifted = grid.clone();
            let inserted = Card::new(CardId(1_000), OutPaths::CROSS, Rotation::R0);
            let ejected = shifted.shift_line(slot, inserted);

            for location in grid.locations() {
                let card = grid.get(location).unwrap();
                let target = grid.shifted_location(slot, location);
                if card.id == ejected.id {
                    assert_eq!(target, slot);
                } else {
                    assert_eq!(shifted.get(target).map(|c| c.id), Some(card.id));
                }
            }
        }
    }
}
