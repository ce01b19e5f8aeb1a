//! Move policies and game loops for the driver binary.

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use ones2048_core::{compute_move, Direction, Session, Storage};

use crate::config;
use crate::storage::MemoryStorage;

/// Outcome of one driven game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSummary {
    pub seed: u64,
    pub moves: u64,
    pub score: u32,
    pub highest: u32,
}

/// Pick a random direction that would change the board, `None` at game over.
///
/// Legality is probed the way a UI would: compute the slide per direction and
/// keep it only if the resulting board differs.
pub fn random_legal_direction<S, R>(session: &Session<S>, rng: &mut R) -> Option<Direction>
where
    S: Storage + 'static,
    R: Rng + ?Sized,
{
    let mut legal = [Direction::Up; 4];
    let mut count = 0;
    for direction in Direction::ALL {
        let outcome = compute_move(session.board(), direction, |id| session.value_of(id));
        if outcome.changed(session.board()) {
            legal[count] = direction;
            count += 1;
        }
    }
    if count == 0 {
        None
    } else {
        Some(legal[rng.gen_range(0..count)])
    }
}

/// Drive one session with the random policy until game over or the move cap.
/// Returns the number of committed moves.
pub fn run_game<S: Storage + 'static>(
    session: &mut Session<S>,
    rng: &mut StdRng,
    opts: &config::Play,
) -> u64 {
    let mut committed: u64 = 0;
    while !session.is_game_over() {
        if opts.max_moves.is_some_and(|cap| committed >= cap) {
            break;
        }
        let Some(direction) = random_legal_direction(session, rng) else {
            break;
        };
        if session.move_to(direction, rng).is_some() {
            committed += 1;
        }
        if let Some(every) = opts.undo_every {
            if every > 0 && committed > 0 && committed % every == 0 {
                session.undo();
            }
        }
        if opts.log_every > 0 && committed > 0 && committed % opts.log_every == 0 {
            info!(
                "{} moves in, score {} (best {})",
                committed,
                session.score(),
                session.best()
            );
        }
    }
    committed
}

/// Play `opts.games` independent sessions in parallel and return their
/// summaries, in seed order.
///
/// Sessions share nothing: each gets its own storage and an RNG seeded from
/// `base_seed + index`, so a batch is reproducible run to run.
pub fn run_batch(opts: &config::Batch) -> Vec<GameSummary> {
    (0..opts.games)
        .into_par_iter()
        .map(|index| {
            let seed = opts.base_seed + u64::from(index);
            let mut rng = StdRng::seed_from_u64(seed);
            let mut session = Session::new(MemoryStorage::default(), &mut rng);
            let play = config::Play {
                max_moves: opts.max_moves,
                undo_every: None,
                log_every: 0,
            };
            let moves = run_game(&mut session, &mut rng, &play);
            GameSummary {
                seed,
                moves,
                score: session.score(),
                highest: session.highest_value().map_or(0, |v| v.value()),
            }
        })
        .collect()
}
