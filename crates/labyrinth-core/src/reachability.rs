use std::collections::VecDeque;

use crate::grid::Grid;
use crate::location_set::LocationSet;
use crate::types::{Direction, Location, OutPaths, Rotation};

/// How traversal treats the one card whose rotation is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pivot {
    None,
    /// No passage leads into or out of this location.
    Blocked(Location),
    /// The card here is read with this rotation instead of its own.
    Resolved(Location, Rotation),
}

impl Pivot {
    fn open_sides(self, grid: &Grid, location: Location) -> Option<OutPaths> {
        let card = grid.get(location)?;
        match self {
            Self::Blocked(pivot) if pivot == location => None,
            Self::Resolved(pivot, rotation) if pivot == location => {
                Some(card.out_paths.rotated(rotation))
            }
            _ => Some(card.effective()),
        }
    }
}

pub(crate) fn passage(
    grid: &Grid,
    from: Location,
    direction: Direction,
    pivot: Pivot,
) -> Option<Location> {
    let to = grid.neighbor(from, direction)?;
    let open = pivot.open_sides(grid, from)?.contains(direction)
        && pivot.open_sides(grid, to)?.contains(direction.opposite());
    open.then_some(to)
}

/// Breadth-first expansion of `queue` into `reached`.
pub(crate) fn flood(
    grid: &Grid,
    pivot: Pivot,
    reached: &mut LocationSet,
    queue: &mut VecDeque<Location>,
) {
    while let Some(location) = queue.pop_front() {
        for direction in Direction::ALL {
            if let Some(next) = passage(grid, location, direction, pivot) {
                if reached.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }
}

/// Reachable set together with the source that first reached each location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub reached: LocationSet,
    origins: Vec<Option<usize>>,
    extent: usize,
}

impl Provenance {
    /// Index into the sources slice of the source that first reached `location`.
    pub fn origin(&self, location: Location) -> Option<usize> {
        if !self.reached.contains(location) {
            return None;
        }
        let index = usize::from(location.row) * self.extent + usize::from(location.column);
        self.origins.get(index).copied().flatten()
    }
}

/// Token connectivity over the current card rotations of a grid.
#[derive(Debug, Clone, Copy)]
pub struct ReachabilityGraph<'a> {
    grid: &'a Grid,
}

impl<'a> ReachabilityGraph<'a> {
    pub fn new(grid: &'a Grid) -> Self {
        Self { grid }
    }

    pub fn reachable_from(&self, source: Location) -> LocationSet {
        self.reachable_from_all(&[source])
    }

    pub fn reachable_from_all(&self, sources: &[Location]) -> LocationSet {
        let mut reached = LocationSet::new(self.grid.extent());
        let mut queue = VecDeque::new();
        for &source in sources {
            if self.grid.contains(source) && reached.insert(source) {
                queue.push_back(source);
            }
        }
        flood(self.grid, Pivot::None, &mut reached, &mut queue);
        reached
    }

    pub fn is_reachable(&self, from: Location, to: Location) -> bool {
        self.grid.contains(to) && self.reachable_from(from).contains(to)
    }

    /// Multi-source traversal; ties go to whichever source discovers a
    /// location first in breadth-first order.
    pub fn reachable_with_provenance(&self, sources: &[Location]) -> Provenance {
        let extent = self.grid.extent();
        let mut reached = LocationSet::new(extent);
        let mut origins = vec![None; extent * extent];
        let mut queue = VecDeque::new();

        for (origin, &source) in sources.iter().enumerate() {
            if self.grid.contains(source) && reached.insert(source) {
                origins[self.grid.index(source)] = Some(origin);
                queue.push_back(source);
            }
        }

        while let Some(location) = queue.pop_front() {
            let origin = origins[self.grid.index(location)];
            for direction in Direction::ALL {
                if let Some(next) = passage(self.grid, location, direction, Pivot::None) {
                    if reached.insert(next) {
                        origins[self.grid.index(next)] = origin;
                        queue.push_back(next);
                    }
                }
            }
        }

        Provenance {
            reached,
            origins,
            extent,
        }
    }
}
