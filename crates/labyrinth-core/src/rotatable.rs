use std::collections::VecDeque;

use arrayvec::ArrayVec;

use crate::grid::Grid;
use crate::location_set::LocationSet;
use crate::reachability::{flood, passage, Pivot};
use crate::types::{Direction, Location, OutPaths, Rotation};

/// Reachability when the card at one location (usually the card just
/// inserted) may still take any of its rotations.
#[derive(Debug, Clone, Copy)]
pub struct RotatableReachabilityGraph<'a> {
    grid: &'a Grid,
    pivot: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatableReach {
    pivot: Location,
    out_paths: OutPaths,
    certain: LocationSet,
    by_rotation: ArrayVec<(Rotation, LocationSet), 4>,
}

impl<'a> RotatableReachabilityGraph<'a> {
    pub fn new(grid: &'a Grid, pivot: Location) -> Self {
        Self { grid, pivot }
    }

    pub fn reachable_from(&self, source: Location) -> RotatableReach {
        let extent = self.grid.extent();
        let out_paths = self
            .grid
            .get(self.pivot)
            .map(|card| card.out_paths)
            .unwrap_or_default();

        let mut certain = LocationSet::new(extent);
        let mut queue = VecDeque::new();
        if certain.insert(source) {
            queue.push_back(source);
        }
        flood(self.grid, Pivot::Blocked(self.pivot), &mut certain, &mut queue);

        let mut by_rotation = ArrayVec::<(Rotation, LocationSet), 4>::new();
        let Some(card) = self.grid.get(self.pivot).copied() else {
            return RotatableReach {
                pivot: self.pivot,
                out_paths,
                certain,
                by_rotation,
            };
        };

        for rotation in card.distinguishable_rotations() {
            let resolved = Pivot::Resolved(self.pivot, rotation);
            let mut reached = certain.clone();
            let entered = certain.contains(self.pivot)
                || Direction::ALL.into_iter().any(|direction| {
                    passage(self.grid, self.pivot, direction, resolved)
                        .is_some_and(|next| certain.contains(next))
                });
            if entered {
                reached.insert(self.pivot);
                queue.push_back(self.pivot);
                flood(self.grid, resolved, &mut reached, &mut queue);
            }
            by_rotation.push((rotation, reached.difference(&certain)));
        }

        if let Some((_, first)) = by_rotation.first() {
            let mut common = first.clone();
            for (_, extra) in by_rotation.iter().skip(1) {
                common.intersect_with(extra);
            }
            if !common.is_empty() {
                certain.union_with(&common);
                for (_, extra) in by_rotation.iter_mut() {
                    extra.subtract(&common);
                }
            }
        }

        RotatableReach {
            pivot: self.pivot,
            out_paths,
            certain,
            by_rotation,
        }
    }
}

impl RotatableReach {
    pub const fn pivot(&self) -> Location {
        self.pivot
    }

    /// Locations reachable whatever rotation the pivot takes.
    pub fn certainly_reachable(&self) -> &LocationSet {
        &self.certain
    }

    /// Extra locations reachable only under each distinguishable rotation.
    pub fn by_rotation(&self) -> &[(Rotation, LocationSet)] {
        &self.by_rotation
    }

    pub fn rotations(&self) -> impl Iterator<Item = Rotation> + '_ {
        self.by_rotation.iter().map(|(rotation, _)| *rotation)
    }

    /// Everything reachable once the pivot is fixed to `rotation`.
    pub fn reachable_under(&self, rotation: Rotation) -> LocationSet {
        let mut reached = self.certain.clone();
        if let Some(extra) = self.extra_for(rotation) {
            reached.union_with(extra);
        }
        reached
    }

    pub fn is_reachable(&self, location: Location, rotation: Rotation) -> bool {
        self.certain.contains(location)
            || self
                .extra_for(rotation)
                .is_some_and(|extra| extra.contains(location))
    }

    /// Distinguishable rotations under which `location` is reachable.
    pub fn rotations_reaching(&self, location: Location) -> ArrayVec<Rotation, 4> {
        if self.certain.contains(location) {
            return self.rotations().collect();
        }
        self.by_rotation
            .iter()
            .filter(|(_, extra)| extra.contains(location))
            .map(|(rotation, _)| *rotation)
            .collect()
    }

    fn extra_for(&self, rotation: Rotation) -> Option<&LocationSet> {
        let sides = self.out_paths.rotated(rotation);
        self.by_rotation
            .iter()
            .find(|(candidate, _)| self.out_paths.rotated(*candidate) == sides)
            .map(|(_, extra)| extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reachability::ReachabilityGraph;
    use crate::types::{Card, CardIdFactory, Shape};

    fn grid_with_pivot(pivot_shape: Shape) -> Grid {
        let mut ids = CardIdFactory::new();
        let shapes = (0..9).map(|index| {
            if index == 4 {
                (pivot_shape.out_paths(), Rotation::R0)
            } else {
                (Shape::Cross.out_paths(), Rotation::R0)
            }
        });
        Grid::from_shapes(3, shapes, &mut ids).unwrap()
    }

    #[test]
    fn cross_pivot_has_no_conditional_locations() {
        let grid = grid_with_pivot(Shape::Cross);
        let reach =
            RotatableReachabilityGraph::new(&grid, Location::new(1, 1)).reachable_from(Location::new(0, 0));

        assert_eq!(reach.certainly_reachable().len(), 9);
        assert!(reach.by_rotation().iter().all(|(_, extra)| extra.is_empty()));
    }

    #[test]
    fn matches_plain_reachability_for_every_rotation() {
        for shape in Shape::ALL {
            let grid = grid_with_pivot(shape);
            let pivot = Location::new(1, 1);
            for source in grid.locations() {
                let reach = RotatableReachabilityGraph::new(&grid, pivot).reachable_from(source);
                for rotation in Rotation::ALL {
                    let mut resolved = grid.clone();
                    let card: &mut Card = resolved.get_mut(pivot).unwrap();
                    card.rotation = rotation;
                    let expected = ReachabilityGraph::new(&resolved).reachable_from(source);
                    assert_eq!(reach.reachable_under(rotation), expected);
                    assert!(reach.certainly_reachable().is_subset(&expected));
                }
            }
        }
    }

    #[test]
    fn rotations_reaching_pivot_from_a_dead_end() {
        let mut ids = CardIdFactory::new();
        // Corner at the pivot; surrounding straights run north-south.
        let shapes = (0..9).map(|index| {
            if index == 4 {
                (Shape::Corner.out_paths(), Rotation::R0)
            } else {
                (Shape::Straight.out_paths(), Rotation::R0)
            }
        });
        let grid = Grid::from_shapes(3, shapes, &mut ids).unwrap();
        let reach = RotatableReachabilityGraph::new(&grid, Location::new(1, 1))
            .reachable_from(Location::new(0, 1));

        assert!(!reach.certainly_reachable().contains(Location::new(1, 1)));
        assert_eq!(
            reach.rotations_reaching(Location::new(1, 1)).as_slice(),
            &[Rotation::R0, Rotation::R270]
        );
        assert!(!reach.is_reachable(Location::new(2, 1), Rotation::R0));
    }
}
