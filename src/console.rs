//! Line-based terminal front-end.

use pink_sesame::rules::{Board, Outcome, Position, Symbol};
use pink_sesame::{MatchCoordinator, MatchObserver, ModeKind, MoveOutcome};
use std::sync::{Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, instrument};

/// Prints match changes to stdout.
#[derive(Debug, Default)]
pub struct ConsoleObserver {
    board: Mutex<Board>,
    role: Mutex<Option<Symbol>>,
}

impl ConsoleObserver {
    /// Sets the symbol this terminal plays in a room.
    pub fn set_role(&self, role: Option<Symbol>) {
        *self.role.lock().unwrap_or_else(PoisonError::into_inner) = role;
    }

    fn print_board(&self) {
        let board = *self.board.lock().unwrap_or_else(PoisonError::into_inner);
        println!("\n{}\n", board.display());
    }
}

impl MatchObserver for ConsoleObserver {
    fn on_cell_changed(&self, index: usize, symbol: Symbol) {
        {
            let mut board = self.board.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(next) = board.with_mark(index, symbol) {
                *board = next;
            }
        }
        self.print_board();
    }

    fn on_turn_changed(&self, symbol: Symbol) {
        match *self.role.lock().unwrap_or_else(PoisonError::into_inner) {
            None => println!("Player {}'s Turn", symbol),
            Some(role) if role == symbol => println!("Your turn"),
            Some(_) => println!("Waiting for {}...", symbol),
        }
    }

    fn on_match_ended(&self, outcome: Outcome, line: Option<[usize; 3]>) {
        match (outcome, line) {
            (Outcome::Winner(symbol), Some(line)) => {
                println!("Player {} Wins! (cells {:?})", symbol, line)
            }
            (Outcome::Winner(symbol), None) => println!("Player {} Wins!", symbol),
            (Outcome::Tie, _) => println!("It's a Tie!"),
        }
        println!("Type 'new' for another game or 'quit' to leave.");
    }

    fn on_reset(&self) {
        *self.board.lock().unwrap_or_else(PoisonError::into_inner) = Board::new();
        self.print_board();
    }

    fn on_opponent_joined(&self) {
        println!("Opponent joined!");
    }
}

/// Reads commands from stdin until `quit` or end of input.
///
/// A cell is chosen by number (0-8) or name (`center`, `top left`, ...).
#[instrument(skip_all)]
pub async fn run(coordinator: &mut MatchCoordinator) -> anyhow::Result<()> {
    println!("Enter a cell (0-8 or a name like 'center'), 'new', 'board' or 'quit'.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input.to_ascii_lowercase().as_str() {
            "" => continue,
            "quit" | "exit" => break,
            "board" => {
                let board = *coordinator.view().board();
                let free: Vec<_> = Position::valid_moves(&board)
                    .into_iter()
                    .map(|p| p.label())
                    .collect();
                println!("\n{}\n\nFree: {}", board.display(), free.join(", "));
            }
            "new" => {
                if let Err(e) = coordinator.new_game().await {
                    println!("{}", e);
                }
            }
            _ => {
                let Some(position) = Position::from_label_or_number(input) else {
                    println!("Unknown cell {:?}", input);
                    continue;
                };
                let outcome = match coordinator.view().mode() {
                    ModeKind::Local => Ok(coordinator.apply_move(position.to_index())),
                    ModeKind::Remote => coordinator.attempt_move(position.to_index()).await,
                };
                match outcome {
                    Ok(MoveOutcome::Accepted) => debug!(position = position.label(), "Move accepted"),
                    Ok(MoveOutcome::Rejected(reason)) => println!("Move ignored: {}", reason),
                    Err(e) => println!("{}", e),
                }
            }
        }
    }

    if coordinator.view().mode() == &ModeKind::Remote {
        coordinator.leave().await;
    }
    Ok(())
}
