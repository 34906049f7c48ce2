//! Rules engine seam
//!
//! The driver never knows chess rules itself. It asks a [`RulesEngine`] for
//! legal moves, applies the chosen one, checks for terminal positions and
//! serializes positions to FEN. [`ShakmatyRules`] is the standard-chess
//! implementation backed by the `shakmaty` crate.

use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Move, Position};

use crate::error::RulesError;

/// Halfmove clock at which the 75-move rule ends the game
pub const SEVENTY_FIVE_MOVE_HALFMOVES: u32 = 150;

/// External collaborator providing game rules
pub trait RulesEngine: Send + Sync {
    type Position: Clone + Send + Sync;
    type Move: Clone + PartialEq + Send + Sync;

    /// Position every new game starts from
    fn initial_position(&self) -> Self::Position;

    /// Rebuild a position from stored FEN
    fn parse_fen(&self, fen: &str) -> Result<Self::Position, RulesError>;

    fn legal_moves(&self, position: &Self::Position) -> Vec<Self::Move>;

    fn apply(
        &self,
        position: &Self::Position,
        mv: &Self::Move,
    ) -> Result<Self::Position, RulesError>;

    fn is_terminal(&self, position: &Self::Position) -> bool;

    fn to_fen(&self, position: &Self::Position) -> String;

    /// Human-readable move text for logs
    fn describe_move(&self, position: &Self::Position, mv: &Self::Move) -> String;

    /// Result notation such as `1-0` once the position is terminal
    fn outcome(&self, _position: &Self::Position) -> Option<String> {
        None
    }

    /// Identity of a position for repetition counting, move clocks excluded.
    /// `None` disables repetition tracking.
    fn repetition_key(&self, _position: &Self::Position) -> Option<String> {
        None
    }
}

/// Standard chess via `shakmaty`
#[derive(Debug, Clone, Copy, Default)]
pub struct ShakmatyRules;

impl ShakmatyRules {
    /// Whether `mv` leaves the opponent in check
    pub fn gives_check(&self, position: &Chess, mv: &Move) -> bool {
        position
            .clone()
            .play(mv)
            .map(|next| next.is_check())
            .unwrap_or(false)
    }
}

impl RulesEngine for ShakmatyRules {
    type Position = Chess;
    type Move = Move;

    fn initial_position(&self) -> Chess {
        Chess::default()
    }

    fn parse_fen(&self, fen: &str) -> Result<Chess, RulesError> {
        let parsed: Fen = fen.parse().map_err(|e: shakmaty::fen::ParseFenError| {
            RulesError::InvalidFen {
                fen: fen.to_string(),
                reason: e.to_string(),
            }
        })?;
        parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| RulesError::IllegalPosition {
                fen: fen.to_string(),
                reason: e.to_string(),
            })
    }

    fn legal_moves(&self, position: &Chess) -> Vec<Move> {
        position.legal_moves().into_iter().collect()
    }

    fn apply(&self, position: &Chess, mv: &Move) -> Result<Chess, RulesError> {
        position
            .clone()
            .play(mv)
            .map_err(|e| RulesError::IllegalMove {
                mv: mv.to_string(),
                reason: e.to_string(),
            })
    }

    fn is_terminal(&self, position: &Chess) -> bool {
        position.is_game_over() || position.halfmoves() >= SEVENTY_FIVE_MOVE_HALFMOVES
    }

    fn to_fen(&self, position: &Chess) -> String {
        Fen::from_position(position.clone(), EnPassantMode::Legal).to_string()
    }

    fn describe_move(&self, position: &Chess, mv: &Move) -> String {
        San::from_move(position, mv).to_string()
    }

    fn outcome(&self, position: &Chess) -> Option<String> {
        match position.outcome() {
            Some(outcome) => Some(outcome.to_string()),
            None if position.halfmoves() >= SEVENTY_FIVE_MOVE_HALFMOVES => {
                Some("1/2-1/2".to_string())
            }
            None => None,
        }
    }

    fn repetition_key(&self, position: &Chess) -> Option<String> {
        // Placement, side to move, castling rights, legal en passant square
        let fen = self.to_fen(position);
        Some(fen.split(' ').take(4).collect::<Vec<_>>().join(" "))
    }
}
