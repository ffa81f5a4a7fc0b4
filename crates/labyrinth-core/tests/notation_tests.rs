use labyrinth_core::{
    encode_board, parse_board, parse_board_with, BoardError, CardId, CardIdFactory, Location,
    NotationError, Rotation, ShiftAction, TokenId, CLASSIC_POSITION, CORRIDOR_POSITION,
    SELF_DISPLACEMENT_POSITION,
};

#[test]
fn encode_reproduces_parsed_positions() {
    for notation in [CLASSIC_POSITION, CORRIDOR_POSITION, SELF_DISPLACEMENT_POSITION] {
        let board = parse_board(notation).expect("valid notation");
        assert_eq!(encode_board(&board), notation);
    }
}

#[test]
fn classic_position_layout() {
    let board = parse_board(CLASSIC_POSITION).expect("classic position");

    assert_eq!(board.grid().extent(), 7);
    assert_eq!(board.grid().insertion_locations().len(), 12);
    assert_eq!(board.tokens().len(), 2);
    assert_eq!(board.token_location(TokenId(1)), Some(Location::new(6, 6)));
    assert_eq!(board.objective_location(), Some(Location::new(3, 3)));
    assert_eq!(board.leftover().id, CardId(49));
}

#[test]
fn encoding_follows_the_board_after_a_shift() {
    let mut board = parse_board(CORRIDOR_POSITION).expect("position");
    board
        .shift(ShiftAction::new(Location::new(1, 0), Rotation::R90))
        .expect("legal shift");

    assert_eq!(encode_board(&board), "L1I1L2/I1I0X0/L0I1L3 I0 0-2 0-0 1-0");
}

#[test]
fn card_ids_come_from_the_given_factory() {
    let mut ids = CardIdFactory::starting_at(100);
    let board = parse_board_with(CORRIDOR_POSITION, &mut ids).expect("position");

    assert_eq!(board.grid().cards()[0].id, CardId(100));
    assert_eq!(board.leftover().id, CardId(109));
    assert_eq!(ids.next_id(), CardId(110));
}

#[test]
fn malformed_notation_is_rejected() {
    assert_eq!(
        parse_board("L1I1L2/I0X0I0/L0I1L3 I0 0-2"),
        Err(NotationError::FieldCount(3))
    );
    assert_eq!(
        parse_board("L1I1L2/I0X0I0/L0I1L3 I0 0-2 4-4 -"),
        Err(NotationError::Board(BoardError::OffGrid(Location::new(4, 4))))
    );
    assert_eq!(
        parse_board("L1I1L2/I0X0I0/L0I1L3 I0 0_2 0-0 -"),
        Err(NotationError::InvalidLocation("0_2".to_string()))
    );
    assert!(matches!(
        parse_board("L1I1L2L2/I0X0I0X0/L0I1L3L3/I0I0I0I0 I0 0-2 0-0 -"),
        Err(NotationError::Grid(_))
    ));
}
