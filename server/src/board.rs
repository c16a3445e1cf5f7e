//! Minesweeper board state and the rules that mutate it.
//!
//! A board is owned by exactly one session and never shared, so nothing in
//! here knows about locks or sockets. The session validates player-supplied
//! coordinates before calling in; internal neighbor iteration is bounds
//! checked on its own.

use rand::Rng;
use shared::{BOMB_VAL, FLAG_VAL, HIDDEN_VAL};

/// Dimensions and bomb count for the boards a session deals out.
#[derive(Debug, Clone, Copy)]
pub struct BoardParams {
    pub width: usize,
    pub height: usize,
    pub bombs: usize,
}

impl Default for BoardParams {
    fn default() -> Self {
        Self {
            width: shared::DEFAULT_WIDTH,
            height: shared::DEFAULT_HEIGHT,
            bombs: shared::DEFAULT_BOMBS,
        }
    }
}

impl BoardParams {
    /// A board must keep at least one tile free of bombs.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.bombs < self.width * self.height
    }
}

/// One square of the board.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tile {
    pub bomb: bool,
    pub flagged: bool,
    pub revealed: bool,
    /// Number of bomb neighbors. Only meaningful for non-bomb tiles.
    pub adjacent: u8,
}

/// What a mutating move did to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    Continue,
    Won,
    Lost,
}

#[derive(Debug, Clone)]
pub struct Board {
    width: usize,
    height: usize,
    first_turn: bool,
    tiles: Vec<Tile>,
}

impl Board {
    /// Deals a fresh board with `params.bombs` bombs at distinct random
    /// coordinates, chosen by rejection sampling.
    pub fn new(params: BoardParams, rng: &mut impl Rng) -> Self {
        assert!(params.is_valid(), "bomb count must stay below the tile count");
        let mut board = Self {
            width: params.width,
            height: params.height,
            first_turn: true,
            tiles: vec![Tile::default(); params.width * params.height],
        };
        let mut placed = 0;
        while placed < params.bombs {
            let x = rng.gen_range(0..params.width);
            let y = rng.gen_range(0..params.height);
            if board.place_bomb(x, y) {
                placed += 1;
            }
        }
        board
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Bounds check for player-supplied coordinates.
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    pub fn is_revealed(&self, x: usize, y: usize) -> bool {
        self.tiles[self.index(x, y)].revealed
    }

    pub fn is_flagged(&self, x: usize, y: usize) -> bool {
        self.tiles[self.index(x, y)].flagged
    }

    /// Count of bombs the player has not flagged yet. Zero means the game
    /// is won.
    pub fn bombs_remaining(&self) -> usize {
        self.tiles.iter().filter(|t| t.bomb && !t.flagged).count()
    }

    /// Reveals the tile at (x, y) and applies the full rule set: first-click
    /// safety, loss on a bomb, flood fill on a zero-adjacency tile, and the
    /// win check afterwards.
    ///
    /// The caller must have validated that (x, y) is in range and the tile
    /// is neither revealed nor flagged.
    pub fn reveal(&mut self, x: usize, y: usize) -> RevealOutcome {
        let first = self.first_turn;
        self.first_turn = false;

        if self.tiles[self.index(x, y)].bomb {
            if !first {
                self.reveal_all();
                return RevealOutcome::Lost;
            }
            // The very first reveal of a game cannot lose: move the bomb
            // away and fall through to a normal reveal of the now-safe tile.
            self.relocate_bomb(x, y);
        }

        self.flood_reveal(x, y);
        self.evaluate_win()
    }

    /// Flips the flag on (x, y). Flagging the last un-flagged bomb wins the
    /// game, so the win condition is re-evaluated here as well.
    ///
    /// The caller must have validated that (x, y) is in range and not
    /// revealed.
    pub fn toggle_flag(&mut self, x: usize, y: usize) -> RevealOutcome {
        let idx = self.index(x, y);
        self.tiles[idx].flagged = !self.tiles[idx].flagged;
        self.evaluate_win()
    }

    /// Row-major wire values for every tile. A flag takes precedence over
    /// the revealed state, matching the display rules.
    pub fn tile_values(&self) -> Vec<u16> {
        self.tiles
            .iter()
            .map(|t| {
                if t.flagged {
                    FLAG_VAL
                } else if t.revealed {
                    if t.bomb {
                        BOMB_VAL
                    } else {
                        u16::from(t.adjacent)
                    }
                } else {
                    HIDDEN_VAL
                }
            })
            .collect()
    }

    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y * self.width + x
    }

    /// In-bounds neighbors of (x, y), excluding (x, y) itself.
    fn neighbors(&self, x: usize, y: usize) -> Vec<(usize, usize)> {
        let mut out = Vec::with_capacity(8);
        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if self.in_bounds(nx, ny) {
                    out.push((nx as usize, ny as usize));
                }
            }
        }
        out
    }

    /// Puts a bomb on (x, y) unless one is already there, keeping every
    /// non-bomb neighbor's adjacency count in step.
    fn place_bomb(&mut self, x: usize, y: usize) -> bool {
        let idx = self.index(x, y);
        if self.tiles[idx].bomb {
            return false;
        }
        self.tiles[idx].bomb = true;
        for (nx, ny) in self.neighbors(x, y) {
            let n = self.index(nx, ny);
            self.tiles[n].adjacent += 1;
        }
        true
    }

    /// Clears the bomb on (x, y). Bomb neighbors keep their counts: the
    /// adjacency invariant only covers non-bomb tiles. The freed tile's own
    /// count is re-derived, since decrements skipped it while it held a
    /// bomb.
    fn remove_bomb(&mut self, x: usize, y: usize) {
        let idx = self.index(x, y);
        self.tiles[idx].bomb = false;
        let mut live = 0;
        for (nx, ny) in self.neighbors(x, y) {
            let n = self.index(nx, ny);
            if self.tiles[n].bomb {
                live += 1;
            } else {
                self.tiles[n].adjacent -= 1;
            }
        }
        self.tiles[idx].adjacent = live;
    }

    /// First-click safety: moves the bomb under (x, y) to the first
    /// row-major tile that has no bomb and is not the clicked tile itself.
    /// A target always exists because the bomb count is below the tile
    /// count.
    fn relocate_bomb(&mut self, x: usize, y: usize) {
        self.remove_bomb(x, y);
        for ty in 0..self.height {
            for tx in 0..self.width {
                if (tx, ty) == (x, y) {
                    continue;
                }
                if self.place_bomb(tx, ty) {
                    return;
                }
            }
        }
    }

    /// Reveals (x, y); a zero-adjacency tile cascades to its whole
    /// zero-adjacency region plus the bordering numbered tiles. The
    /// worklist never revisits a revealed tile, and bombs cannot enter it
    /// because a zero-adjacency tile has no bomb neighbors by definition.
    fn flood_reveal(&mut self, x: usize, y: usize) {
        let idx = self.index(x, y);
        self.tiles[idx].revealed = true;
        if self.tiles[idx].adjacent != 0 {
            return;
        }
        let mut worklist = vec![(x, y)];
        while let Some((cx, cy)) = worklist.pop() {
            for (nx, ny) in self.neighbors(cx, cy) {
                let n = self.index(nx, ny);
                if self.tiles[n].revealed {
                    continue;
                }
                self.tiles[n].revealed = true;
                if self.tiles[n].adjacent == 0 {
                    worklist.push((nx, ny));
                }
            }
        }
    }

    fn evaluate_win(&mut self) -> RevealOutcome {
        if self.bombs_remaining() == 0 {
            // Game over: show everything and drop the flags.
            for tile in &mut self.tiles {
                tile.revealed = true;
                tile.flagged = false;
            }
            RevealOutcome::Won
        } else {
            RevealOutcome::Continue
        }
    }

    fn reveal_all(&mut self) {
        for tile in &mut self.tiles {
            tile.revealed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn empty_board(width: usize, height: usize) -> Board {
        let params = BoardParams {
            width,
            height,
            bombs: 0,
        };
        Board::new(params, &mut StdRng::seed_from_u64(0))
    }

    fn bomb_count(board: &Board) -> usize {
        board.tiles.iter().filter(|t| t.bomb).count()
    }

    /// Recomputes every non-bomb tile's adjacency from scratch and compares
    /// it against the incrementally maintained counts.
    fn assert_adjacency_invariant(board: &Board) {
        for y in 0..board.height() {
            for x in 0..board.width() {
                let tile = board.tiles[board.index(x, y)];
                if tile.bomb {
                    continue;
                }
                let live = board
                    .neighbors(x, y)
                    .into_iter()
                    .filter(|&(nx, ny)| board.tiles[board.index(nx, ny)].bomb)
                    .count();
                assert_eq!(
                    usize::from(tile.adjacent),
                    live,
                    "adjacency mismatch at ({x}, {y})"
                );
            }
        }
    }

    #[test]
    fn generation_places_exact_bomb_count() {
        let mut rng = StdRng::seed_from_u64(42);
        let board = Board::new(BoardParams::default(), &mut rng);
        assert_eq!(bomb_count(&board), shared::DEFAULT_BOMBS);
        assert_adjacency_invariant(&board);
    }

    #[test]
    fn adjacency_invariant_survives_place_and_remove_sequences() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut board = empty_board(9, 9);
        let mut bombs: Vec<(usize, usize)> = Vec::new();

        for step in 0..200 {
            if bombs.is_empty() || (step % 3 != 0 && bombs.len() < 40) {
                let x = rng.gen_range(0..9);
                let y = rng.gen_range(0..9);
                if board.place_bomb(x, y) {
                    bombs.push((x, y));
                }
            } else {
                let (x, y) = bombs.swap_remove(rng.gen_range(0..bombs.len()));
                board.remove_bomb(x, y);
            }
            assert_adjacency_invariant(&board);
        }
    }

    #[test]
    fn place_bomb_refuses_occupied_tile() {
        let mut board = empty_board(3, 3);
        assert!(board.place_bomb(1, 1));
        assert!(!board.place_bomb(1, 1));
        assert_eq!(bomb_count(&board), 1);
    }

    #[test]
    fn first_reveal_is_never_a_bomb() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let reference = Board::new(BoardParams::default(), &mut rng);
            for y in 0..reference.height() {
                for x in 0..reference.width() {
                    if !reference.tiles[reference.index(x, y)].bomb {
                        continue;
                    }
                    // Fresh board from the same seed, first click on a
                    // known bomb coordinate.
                    let mut board =
                        Board::new(BoardParams::default(), &mut StdRng::seed_from_u64(seed));
                    let outcome = board.reveal(x, y);
                    assert_ne!(outcome, RevealOutcome::Lost);
                    assert!(board.is_revealed(x, y));
                    assert!(!board.tiles[board.index(x, y)].bomb);
                    assert_eq!(bomb_count(&board), shared::DEFAULT_BOMBS);
                    assert_adjacency_invariant(&board);
                }
            }
        }
    }

    #[test]
    fn relocated_bomb_lands_on_first_row_major_free_tile() {
        let mut board = empty_board(9, 9);
        board.place_bomb(0, 0);
        board.place_bomb(4, 4);

        let outcome = board.reveal(4, 4);
        assert_ne!(outcome, RevealOutcome::Lost);
        assert!(!board.tiles[board.index(4, 4)].bomb);
        // (0, 0) is taken, so the scan settles on (1, 0).
        assert!(board.tiles[board.index(1, 0)].bomb);
        assert_eq!(bomb_count(&board), 2);
        assert_adjacency_invariant(&board);
    }

    #[test]
    fn second_reveal_of_a_bomb_loses_and_shows_the_board() {
        let mut board = empty_board(4, 4);
        board.place_bomb(3, 3);
        assert_eq!(board.reveal(0, 0), RevealOutcome::Continue);
        assert_eq!(board.reveal(3, 3), RevealOutcome::Lost);
        assert!(board.tiles.iter().all(|t| t.revealed));
    }

    #[test]
    fn flood_fill_reveals_region_and_numbered_border_only() {
        let mut board = empty_board(5, 5);
        board.place_bomb(4, 4);

        assert_eq!(board.reveal(0, 0), RevealOutcome::Continue);

        // Everything except the bomb is revealed: the zero region plus the
        // three numbered tiles around the corner bomb.
        for y in 0..5 {
            for x in 0..5 {
                let tile = board.tiles[board.index(x, y)];
                if x == 4 && y == 4 {
                    assert!(!tile.revealed, "bomb must stay hidden");
                } else {
                    assert!(tile.revealed, "({x}, {y}) should be revealed");
                }
            }
        }
    }

    #[test]
    fn flood_fill_stops_at_numbered_tiles() {
        // Bomb wall down column 2 splits the board; a reveal on the left
        // side must not leak past it.
        let mut board = empty_board(5, 3);
        for y in 0..3 {
            board.place_bomb(2, y);
        }
        assert_eq!(board.reveal(0, 1), RevealOutcome::Continue);
        for y in 0..3 {
            assert!(board.is_revealed(0, y));
            assert!(board.is_revealed(1, y));
            assert!(!board.is_revealed(3, y));
            assert!(!board.is_revealed(4, y));
        }
    }

    #[test]
    fn reveal_of_numbered_tile_does_not_cascade() {
        let mut board = empty_board(3, 3);
        board.place_bomb(0, 0);
        assert_eq!(board.reveal(1, 1), RevealOutcome::Continue);
        assert!(board.is_revealed(1, 1));
        assert_eq!(
            board.tiles.iter().filter(|t| t.revealed).count(),
            1,
            "a numbered tile reveals only itself"
        );
    }

    #[test]
    fn flagging_every_bomb_wins_and_clears_flags() {
        let mut board = empty_board(3, 3);
        board.place_bomb(0, 0);
        board.place_bomb(2, 2);

        assert_eq!(board.toggle_flag(0, 0), RevealOutcome::Continue);
        assert_eq!(board.toggle_flag(2, 2), RevealOutcome::Won);
        assert!(board.tiles.iter().all(|t| t.revealed && !t.flagged));
    }

    #[test]
    fn unflagging_restores_the_remaining_count() {
        let mut board = empty_board(3, 3);
        board.place_bomb(1, 1);
        assert_eq!(board.bombs_remaining(), 1);
        board.toggle_flag(0, 0);
        assert_eq!(board.bombs_remaining(), 1, "flag on a safe tile changes nothing");
        board.toggle_flag(0, 0);
        assert_eq!(board.toggle_flag(1, 1), RevealOutcome::Won);
    }

    #[test]
    fn win_condition_matches_bombs_remaining() {
        let mut rng = StdRng::seed_from_u64(3);
        let params = BoardParams {
            width: 6,
            height: 6,
            bombs: 5,
        };
        let mut board = Board::new(params, &mut rng);
        let bombs: Vec<(usize, usize)> = (0..6)
            .flat_map(|y| (0..6).map(move |x| (x, y)))
            .filter(|&(x, y)| board.tiles[board.index(x, y)].bomb)
            .collect();

        for (i, &(x, y)) in bombs.iter().enumerate() {
            let outcome = board.toggle_flag(x, y);
            if i + 1 < bombs.len() {
                assert_eq!(outcome, RevealOutcome::Continue);
                assert_eq!(board.bombs_remaining(), bombs.len() - i - 1);
            } else {
                // The last flag flips the game to won the moment the
                // un-flagged bomb count hits zero.
                assert_eq!(outcome, RevealOutcome::Won);
            }
        }
    }

    #[test]
    fn tile_values_follow_the_wire_encoding() {
        let mut board = empty_board(4, 1);
        board.place_bomb(0, 0);
        board.place_bomb(3, 0);
        board.toggle_flag(0, 0);
        board.reveal(2, 0);

        let values = board.tile_values();
        assert_eq!(values[0], FLAG_VAL);
        assert_eq!(values[1], HIDDEN_VAL);
        assert_eq!(values[2], 1);
        assert_eq!(values[3], HIDDEN_VAL);
    }

    #[test]
    fn lost_board_serializes_revealed_bombs() {
        let mut board = empty_board(2, 1);
        board.place_bomb(1, 0);
        board.reveal(0, 0);
        assert_eq!(board.reveal(1, 0), RevealOutcome::Lost);
        assert_eq!(board.tile_values()[1], BOMB_VAL);
    }

    #[test]
    #[should_panic(expected = "bomb count")]
    fn rejects_bomb_count_equal_to_tile_count() {
        let params = BoardParams {
            width: 3,
            height: 3,
            bombs: 9,
        };
        Board::new(params, &mut StdRng::seed_from_u64(0));
    }
}
