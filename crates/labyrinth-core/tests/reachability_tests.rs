use labyrinth_core::{
    parse_board, Location, ReachabilityGraph, RotatableReachabilityGraph, Rotation, ShiftAction,
    CLASSIC_POSITION,
};

#[test]
fn reachability_is_symmetric() {
    let board = parse_board(CLASSIC_POSITION).expect("classic position");
    let grid = board.grid();
    let graph = ReachabilityGraph::new(grid);

    for a in grid.locations() {
        let from_a = graph.reachable_from(a);
        assert!(from_a.contains(a));
        for b in grid.locations() {
            assert_eq!(
                from_a.contains(b),
                graph.is_reachable(b, a),
                "{a} and {b} disagree"
            );
        }
    }
}

#[test]
fn provenance_covers_the_union_of_sources() {
    let board = parse_board(CLASSIC_POSITION).expect("classic position");
    let graph = ReachabilityGraph::new(board.grid());
    let sources = [Location::new(0, 0), Location::new(6, 6), Location::new(3, 3)];

    let provenance = graph.reachable_with_provenance(&sources);
    let union = graph.reachable_from_all(&sources);
    assert_eq!(provenance.reached, union);

    for location in union.iter() {
        let origin = provenance.origin(location).expect("every reached location has an origin");
        assert!(graph.is_reachable(sources[origin], location));
    }
}

#[test]
fn rotatable_reach_matches_resolved_reachability_after_every_shift() {
    let board = parse_board(CLASSIC_POSITION).expect("classic position");

    for &slot in board.grid().insertion_locations() {
        let mut working = board.clone();
        working
            .force_shift(ShiftAction::new(slot, Rotation::R0))
            .expect("legal slot");

        for source in [Location::new(0, 0), Location::new(3, 3), slot] {
            let reach =
                RotatableReachabilityGraph::new(working.grid(), slot).reachable_from(source);
            for rotation in Rotation::ALL {
                let mut resolved = working.clone();
                resolved.rotate_card(slot, rotation).expect("slot on grid");
                let expected = ReachabilityGraph::new(resolved.grid()).reachable_from(source);

                assert!(reach.certainly_reachable().is_subset(&expected));
                assert_eq!(reach.reachable_under(rotation), expected);
                for location in expected.iter() {
                    assert!(reach.is_reachable(location, rotation));
                }
            }
        }
    }
}
