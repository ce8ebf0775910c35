//! Game state: falling piece, stack, intents, tick and game over.

use crate::piece::{BlockColor, Cell, Override, Piece, PieceKind};
use crate::stack::Stack;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    GameOver,
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No falling piece, or the session is over.
    Idle,
    Descended,
    /// Piece locked; rows cleared by each clear pass.
    Locked { cleared: Vec<i32> },
    /// Piece locked and the stack reached the top.
    GameOver { cleared: Vec<i32> },
}

/// One game session: stack, falling piece, RNG and tick timer.
#[derive(Debug)]
pub struct GameState {
    stack: Stack,
    piece: Option<Piece>,
    status: Status,
    rng: StdRng,
    tick_interval: Duration,
    last_update: Instant,
    /// Rows cleared by the most recent lock (for the clear flash).
    pub last_cleared: Vec<i32>,
    pub pieces_locked: u32,
}

impl GameState {
    pub fn new(config: &crate::GameConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut state = Self {
            stack: Stack::new(i32::from(config.width), i32::from(config.height)),
            piece: None,
            status: Status::Running,
            rng,
            tick_interval: Duration::from_millis(config.tick_ms),
            last_update: Instant::now(),
            last_cleared: Vec::new(),
            pieces_locked: 0,
        };
        state.spawn();
        log::info!(
            "new session: {}x{} board, tick {} ms",
            config.width,
            config.height,
            config.tick_ms
        );
        state
    }

    /// Empty the stack and start over with a fresh piece. The RNG keeps its sequence.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.status = Status::Running;
        self.last_cleared.clear();
        self.pieces_locked = 0;
        self.last_update = Instant::now();
        self.spawn();
        log::info!("session reset");
    }

    #[inline]
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    #[inline]
    pub fn piece(&self) -> Option<&Piece> {
        self.piece.as_ref()
    }

    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_game_over(&self) -> bool {
        self.status == Status::GameOver
    }

    /// Spawn point: horizontally centred, top row.
    pub fn spawn_point(&self) -> Cell {
        Cell::new(self.stack.width() / 2, 0)
    }

    /// Replace the falling piece with a random kind and colour at the spawn point.
    /// Game over is decided by the tick, not here.
    pub fn spawn(&mut self) {
        let kind = PieceKind::ALL[self.rng.gen_range(0..PieceKind::ALL.len())];
        let color = BlockColor::ALL[self.rng.gen_range(0..BlockColor::ALL.len())];
        self.piece = Some(Piece::new(kind, color, self.spawn_point()));
    }

    pub fn move_left(&mut self) -> bool {
        self.try_move(|p| Override::x(p.anchor.x - 1))
    }

    pub fn move_right(&mut self) -> bool {
        self.try_move(|p| Override::x(p.anchor.x + 1))
    }

    /// Manual one-row descent. Never locks; the tick does that.
    pub fn soft_drop(&mut self) -> bool {
        self.try_move(|p| Override::y(p.anchor.y + 1))
    }

    /// Rotate 90° clockwise. No wall kicks: blocked rotations are dropped.
    pub fn rotate(&mut self) -> bool {
        self.try_move(|p| Override::rotation(p.rotation.next()))
    }

    /// Apply `target` only if the resulting cells are free.
    fn try_move(&mut self, target: impl Fn(&Piece) -> Override) -> bool {
        if self.status != Status::Running {
            return false;
        }
        let Some(piece) = self.piece.as_mut() else {
            return false;
        };
        let ov = target(piece);
        if self.stack.collides(&piece.cells_with(ov)) {
            return false;
        }
        if let Some(x) = ov.x {
            piece.anchor.x = x;
        }
        if let Some(y) = ov.y {
            piece.anchor.y = y;
        }
        if let Some(rotation) = ov.rotation {
            piece.rotation = rotation;
        }
        true
    }

    /// Ghost piece: the current piece dropped to its lowest free row.
    pub fn shadow(&self) -> Option<[Cell; 4]> {
        let piece = self.piece.as_ref()?;
        let mut dy = 0;
        // Terminates: the floor always collides.
        while !self
            .stack
            .collides(&piece.cells_with(Override::y(piece.anchor.y + dy + 1)))
        {
            dy += 1;
        }
        Some(piece.cells_with(Override::y(piece.anchor.y + dy)))
    }

    /// Advance one tick if the interval has elapsed since the last one.
    pub fn update(&mut self, now: Instant) -> Option<TickOutcome> {
        if self.status != Status::Running
            || now.saturating_duration_since(self.last_update) < self.tick_interval
        {
            return None;
        }
        self.last_update = now;
        Some(self.tick())
    }

    /// Re-arm the tick timer, e.g. after a pause, so gravity does not jump.
    pub fn resume(&mut self, now: Instant) {
        self.last_update = now;
    }

    /// Gravity step: descend one row, or lock, clear, check game over and respawn.
    pub fn tick(&mut self) -> TickOutcome {
        if self.status != Status::Running {
            return TickOutcome::Idle;
        }
        let Some(piece) = self.piece.as_mut() else {
            return TickOutcome::Idle;
        };
        let below = piece.cells_with(Override::y(piece.anchor.y + 1));
        if !self.stack.collides(&below) {
            piece.anchor.y += 1;
            return TickOutcome::Descended;
        }
        self.lock_piece()
    }

    fn lock_piece(&mut self) -> TickOutcome {
        let Some(piece) = self.piece.take() else {
            return TickOutcome::Idle;
        };
        self.stack.lock(&piece.cells(), piece.color);
        self.pieces_locked += 1;
        log::debug!(
            "locked {} at ({}, {}) {}°",
            piece.kind.name(),
            piece.anchor.x,
            piece.anchor.y,
            piece.rotation.degrees()
        );

        let cleared = self.stack.clear_lines();
        if !cleared.is_empty() {
            log::info!("cleared {} line(s) at rows {:?}", cleared.len(), cleared);
            if self.stack.is_empty() {
                log::info!("board cleared");
            }
        }
        self.last_cleared.clone_from(&cleared);

        if self.stack.reaches_top() {
            self.status = Status::GameOver;
            log::info!("game over after {} pieces", self.pieces_locked);
            return TickOutcome::GameOver { cleared };
        }
        self.spawn();
        TickOutcome::Locked { cleared }
    }

    #[cfg(test)]
    fn set_piece(&mut self, piece: Piece) {
        self.piece = Some(piece);
    }

    #[cfg(test)]
    fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::Rotation;
    use crate::stack::{COLUMNS, ROWS};

    fn config(seed: u64) -> crate::GameConfig {
        crate::GameConfig {
            width: COLUMNS as u16,
            height: ROWS as u16,
            tick_ms: 1000,
            seed: Some(seed),
        }
    }

    fn game_with(kind: PieceKind, x: i32, y: i32) -> GameState {
        let mut game = GameState::new(&config(7));
        game.set_piece(Piece::new(kind, BlockColor::Red, Cell::new(x, y)));
        game
    }

    #[test]
    fn spawn_is_centred_at_top_with_no_rotation() {
        for seed in 0..20 {
            let game = GameState::new(&config(seed));
            let piece = game.piece().unwrap();
            assert_eq!(piece.anchor, Cell::new(5, 0));
            assert_eq!(piece.rotation, Rotation::R0);
            assert_eq!(game.status(), Status::Running);
        }
    }

    #[test]
    fn same_seed_same_pieces() {
        let mut a = GameState::new(&config(42));
        let mut b = GameState::new(&config(42));
        for _ in 0..10 {
            assert_eq!(a.piece(), b.piece());
            a.spawn();
            b.spawn();
        }
    }

    #[test]
    fn spawn_covers_all_kinds_and_colors() {
        let mut game = GameState::new(&config(3));
        let mut kinds = std::collections::HashSet::new();
        let mut colors = std::collections::HashSet::new();
        for _ in 0..500 {
            game.spawn();
            let p = game.piece().unwrap();
            kinds.insert(p.kind);
            colors.insert(p.color);
        }
        assert_eq!(kinds.len(), 7);
        assert_eq!(colors.len(), 4);
    }

    #[test]
    fn i_piece_cannot_leave_left_wall() {
        let mut game = game_with(PieceKind::I, 2, 0);
        assert_eq!(game.piece().unwrap().cells()[3], Cell::new(0, 0));
        assert!(!game.move_left());
        assert_eq!(game.piece().unwrap().anchor, Cell::new(2, 0));
    }

    #[test]
    fn i_piece_moves_left_from_spawn_until_wall() {
        let mut game = game_with(PieceKind::I, 5, 0);
        assert!(game.move_left());
        assert!(game.move_left());
        assert!(game.move_left());
        assert!(!game.move_left());
        assert_eq!(game.piece().unwrap().anchor.x, 2);
    }

    #[test]
    fn move_right_blocked_by_wall() {
        let mut game = game_with(PieceKind::O, 9, 5);
        assert!(!game.move_right());
        assert!(game.move_left());
        assert_eq!(game.piece().unwrap().anchor.x, 8);
    }

    #[test]
    fn moves_blocked_by_stack() {
        let mut game = game_with(PieceKind::O, 5, 5);
        game.stack_mut().lock(&[Cell::new(6, 5)], BlockColor::Blue);
        assert!(!game.move_right());
        assert_eq!(game.piece().unwrap().anchor.x, 5);
    }

    #[test]
    fn rotation_fails_silently_near_wall() {
        // Upright I at the left wall cannot turn flat: it would need x-2.
        let mut game = game_with(PieceKind::I, 0, 5);
        game.piece.as_mut().unwrap().rotation = Rotation::R90;
        assert!(!game.rotate());
        assert_eq!(game.piece().unwrap().rotation, Rotation::R90);

        let mut game = game_with(PieceKind::T, 4, 5);
        assert!(game.rotate());
        assert_eq!(game.piece().unwrap().rotation, Rotation::R90);
    }

    #[test]
    fn soft_drop_stops_at_floor_without_locking() {
        let mut game = game_with(PieceKind::O, 5, 17);
        assert!(game.soft_drop());
        assert!(!game.soft_drop());
        assert_eq!(game.piece().unwrap().anchor.y, 18);
        assert!(game.stack().is_empty());
    }

    #[test]
    fn tick_descends_then_locks_and_respawns() {
        let mut game = game_with(PieceKind::O, 5, 17);
        assert_eq!(game.tick(), TickOutcome::Descended);
        assert_eq!(game.tick(), TickOutcome::Locked { cleared: vec![] });
        assert_eq!(game.stack().len(), 4);
        assert!(game.stack().is_occupied(Cell::new(4, 19)));
        assert_eq!(game.piece().unwrap().anchor, Cell::new(5, 0));
        assert_eq!(game.pieces_locked, 1);
    }

    #[test]
    fn locking_completes_bottom_row() {
        let mut game = game_with(PieceKind::I, 2, 19);
        let rest: Vec<Cell> = (4..COLUMNS).map(|x| Cell::new(x, 19)).collect();
        game.stack_mut().lock(&rest, BlockColor::Green);

        assert_eq!(game.tick(), TickOutcome::Locked { cleared: vec![19] });
        assert!(game.stack().is_empty());
        assert_eq!(game.last_cleared, vec![19]);
    }

    #[test]
    fn stack_at_top_ends_game() {
        let mut game = game_with(PieceKind::O, 5, 0);
        game.stack_mut().lock(&[Cell::new(5, 2)], BlockColor::Red);

        assert_eq!(game.tick(), TickOutcome::GameOver { cleared: vec![] });
        assert!(game.is_game_over());
        assert!(game.piece().is_none());

        // Terminal: no more ticks, spawns or moves.
        assert_eq!(game.tick(), TickOutcome::Idle);
        assert!(game.piece().is_none());
        assert!(!game.move_left());
        assert_eq!(game.update(Instant::now() + Duration::from_secs(5)), None);
    }

    #[test]
    fn reset_starts_a_fresh_session() {
        let mut game = game_with(PieceKind::O, 5, 0);
        game.stack_mut().lock(&[Cell::new(5, 2)], BlockColor::Red);
        game.tick();
        assert!(game.is_game_over());

        game.reset();
        assert_eq!(game.status(), Status::Running);
        assert!(game.stack().is_empty());
        assert!(game.piece().is_some());
        assert_eq!(game.pieces_locked, 0);
    }

    #[test]
    fn update_waits_for_interval() {
        let mut game = game_with(PieceKind::O, 5, 5);
        let start = Instant::now();
        game.resume(start);
        assert_eq!(game.update(start + Duration::from_millis(999)), None);
        assert_eq!(game.piece().unwrap().anchor.y, 5);
        assert_eq!(
            game.update(start + Duration::from_millis(1000)),
            Some(TickOutcome::Descended)
        );
        assert_eq!(game.update(start + Duration::from_millis(1500)), None);
        assert_eq!(
            game.update(start + Duration::from_millis(2000)),
            Some(TickOutcome::Descended)
        );
        assert_eq!(game.piece().unwrap().anchor.y, 7);
    }

    #[test]
    fn shadow_rests_on_stack() {
        let mut game = game_with(PieceKind::O, 5, 0);
        assert_eq!(game.shadow().unwrap()[0], Cell::new(5, 18));

        game.stack_mut().lock(&[Cell::new(4, 10)], BlockColor::Yellow);
        let shadow = game.shadow().unwrap();
        assert_eq!(shadow[0], Cell::new(5, 8));
        assert!(!game.stack().collides(&shadow));
        // Read-only.
        assert_eq!(game.piece().unwrap().anchor, Cell::new(5, 0));
    }

    #[test]
    fn no_overlap_between_piece_and_stack_over_random_play() {
        let mut game = GameState::new(&config(99));
        for i in 0..2000 {
            if game.is_game_over() {
                break;
            }
            match i % 5 {
                0 => {
                    game.move_left();
                }
                1 => {
                    game.rotate();
                }
                2 => {
                    game.move_right();
                }
                _ => {}
            }
            if let Some(piece) = game.piece() {
                for c in piece.cells() {
                    assert!(!game.stack().is_occupied(c));
                }
            }
            for (c, _) in game.stack().iter() {
                assert!(c.y < ROWS && c.x >= 0 && c.x < COLUMNS);
            }
            game.tick();
        }
    }
}
