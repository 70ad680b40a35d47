//! Proptest strategies for boards, coordinates and orders.

use proptest::prelude::*;
use tactics_core::grid::{Coord, TerrainGrid, TerrainKind, BOARD_SIZE};
use tactics_core::orders::Order;

/// Any cell on the standard board.
pub fn arb_coord() -> impl Strategy<Value = Coord> {
    (0..BOARD_SIZE, 0..BOARD_SIZE).prop_map(|(x, y)| Coord::new(x, y))
}

/// Two distinct cells.
pub fn arb_distinct_coords() -> impl Strategy<Value = (Coord, Coord)> {
    (arb_coord(), arb_coord()).prop_filter("cells must differ", |(a, b)| a != b)
}

/// A terrain kind, ground-heavy like real maps.
pub fn arb_terrain() -> impl Strategy<Value = TerrainKind> {
    prop_oneof![
        6 => Just(TerrainKind::Ground),
        1 => Just(TerrainKind::Hill),
        2 => Just(TerrainKind::Forest),
        2 => Just(TerrainKind::Water),
        1 => Just(TerrainKind::Base),
    ]
}

/// A random 12×12 board.
pub fn arb_grid() -> impl Strategy<Value = TerrainGrid> {
    let size = BOARD_SIZE as usize;
    prop::collection::vec(prop::collection::vec(arb_terrain(), size), size).prop_map(|rows| {
        TerrainGrid::from_rows(&rows).unwrap_or_else(|_| {
            TerrainGrid::filled(BOARD_SIZE, BOARD_SIZE, TerrainKind::Ground)
        })
    })
}

/// A random 12×12 board without water.
pub fn arb_dry_grid() -> impl Strategy<Value = TerrainGrid> {
    arb_grid().prop_map(|mut grid| {
        for y in 0..BOARD_SIZE {
            for x in 0..BOARD_SIZE {
                let at = Coord::new(x, y);
                if grid.terrain(at) == Some(TerrainKind::Water) {
                    grid.set_terrain(at, TerrainKind::Ground);
                }
            }
        }
        grid
    })
}

/// An order for `name` with an arbitrary (possibly invalid) square and method.
pub fn arb_order(name: &'static str) -> impl Strategy<Value = Order> {
    (
        prop_oneof![
            "[A-L]".prop_map(String::from),
            "[M-Z]".prop_map(String::from),
            "[a-l]".prop_map(String::from),
        ],
        -2i64..15,
        prop_oneof![Just("safe"), Just("fast"), Just("walk")],
    )
        .prop_map(move |(file, rank, method)| Order::new(name, &file, rank, method))
}
