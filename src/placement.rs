//! Alternating piece placement onto tiered back-rank and pawn-rank zones, including the
//! Herald's pawn-rank snap and swap.

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::error::InvalidPlacement;
use crate::game::PerSide;
use crate::game_logic::home_rank;
use crate::pieces::Tier::{Pawn, Royalty};
use crate::pieces::{Color, PieceId, PieceInstance, PieceKind};
use crate::tiles::Square;

/// The two back-rank files that accept royalty-tier pieces.
const ROYALTY_FILES: [u8; 2] = [3, 4];

/// A pawn displaced to the back rank by a Herald landing on its square.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PawnSwap {
    pub pawn_id: PieceId,
    pub new_position: Square,
}

/// The outcome of one successful placement.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedPiece {
    pub piece_id: PieceId,
    /// The square the player asked for.
    pub position: Square,
    /// Where the piece actually landed (differs for the Herald snap and the pawn snap).
    pub actual_position: Square,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pawn_swap: Option<PawnSwap>,
    /// Who places next; `None` once both pools are empty.
    pub next_placer: Option<Color>,
}

/// The two pools of pieces awaiting placement. White places first; turns alternate while
/// both pools are non-empty, and a side whose pool is exhausted yields the remaining turns.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementState {
    pools: PerSide<Vec<PieceInstance>>,
    current_placer: Color,
}

impl PlacementState {
    pub fn new(white: Vec<PieceInstance>, black: Vec<PieceInstance>) -> Self {
        Self {
            pools: PerSide { white, black },
            current_placer: Color::White,
        }
    }

    pub fn pool(&self, color: Color) -> &[PieceInstance] {
        self.pools.get(color)
    }

    pub fn current_placer(&self) -> Color {
        self.current_placer
    }

    pub fn is_complete(&self) -> bool {
        self.pools.white.is_empty() && self.pools.black.is_empty()
    }

    /// Place one piece from the current placer's pool onto the board.
    pub fn place(
        &mut self,
        board: &mut Board,
        color: Color,
        piece_id: PieceId,
        target: Square,
    ) -> Result<PlacedPiece, InvalidPlacement> {
        if color != self.current_placer {
            return Err(InvalidPlacement::NotYourTurn);
        }
        let pool = self.pools.get(color);
        let Some(idx) = pool.iter().position(|p| p.id == piece_id) else {
            return Err(InvalidPlacement::UnknownPiece);
        };
        let kind = pool[idx].kind;
        if target.file >= board.files() || target.rank >= board.ranks() {
            return Err(InvalidPlacement::OutOfBounds);
        }

        let (actual, pawn_swap) = self.resolve_square(board, color, kind, target)?;

        let piece = self.pools.get_mut(color).remove(idx);
        if let Some(swap) = pawn_swap {
            board.move_piece(swap.pawn_id, swap.new_position);
        }
        board.add_piece(piece, actual);

        self.current_placer = self.next_placer_after(color);
        Ok(PlacedPiece {
            piece_id,
            position: target,
            actual_position: actual,
            pawn_swap,
            next_placer: (!self.is_complete()).then_some(self.current_placer),
        })
    }

    /// Work out where the piece really lands and whether a pawn has to give way.
    fn resolve_square(
        &self,
        board: &Board,
        color: Color,
        kind: PieceKind,
        target: Square,
    ) -> Result<(Square, Option<PawnSwap>), InvalidPlacement> {
        let home = home_rank(board, color);
        let pawn_rank = pawn_rank(board, color);
        let def = kind.def();

        if kind == PieceKind::Herald {
            // The Herald's true square is the pawn rank of an edge file; a back-rank target
            // snaps down, swapping any pawn already there up to the back rank.
            if target.file != 0 && target.file != board.files() - 1 {
                return Err(InvalidPlacement::HeraldFileRestriction);
            }
            if target.rank != home && target.rank != pawn_rank {
                return Err(InvalidPlacement::WrongZone);
            }
            let actual = Square::new(target.file, pawn_rank);
            let back = Square::new(target.file, home);
            return match board.piece_at(actual) {
                None => Ok((actual, None)),
                Some(occupant)
                    if occupant.owner == color && occupant.kind.def().tier == Pawn =>
                {
                    if board.occupied(back) {
                        Err(InvalidPlacement::SquareOccupied { square: back })
                    } else {
                        Ok((
                            actual,
                            Some(PawnSwap {
                                pawn_id: occupant.id,
                                new_position: back,
                            }),
                        ))
                    }
                }
                Some(_) => Err(InvalidPlacement::SquareOccupied { square: actual }),
            };
        }

        // A pawn aimed at the square of a file whose pawn rank is held by a Herald snaps to
        // the back rank of that file.
        if def.tier == Pawn {
            let herald_here = board
                .piece_at(Square::new(target.file, pawn_rank))
                .is_some_and(|p| p.owner == color && p.kind == PieceKind::Herald);
            if herald_here {
                let back = Square::new(target.file, home);
                if target.rank == pawn_rank || target.rank == home {
                    return if board.occupied(back) {
                        Err(InvalidPlacement::SquareOccupied { square: back })
                    } else {
                        Ok((back, None))
                    };
                }
            }
            if target.rank != pawn_rank {
                return Err(InvalidPlacement::WrongZone);
            }
        } else if target.rank != home {
            return Err(InvalidPlacement::WrongZone);
        } else {
            let royal_zone = ROYALTY_FILES.contains(&target.file);
            let fits = match def.tier {
                Royalty => royal_zone,
                _ => !royal_zone,
            };
            if !fits {
                return Err(InvalidPlacement::WrongZone);
            }
        }

        if board.occupied(target) {
            return Err(InvalidPlacement::SquareOccupied { square: target });
        }
        Ok((target, None))
    }

    fn next_placer_after(&self, color: Color) -> Color {
        let other = color.other();
        if !self.pools.get(other).is_empty() {
            other
        } else {
            color
        }
    }
}

/// The pawn rank of the given color (rank 2 for white, the rank below the top for black).
pub fn pawn_rank(board: &Board, color: Color) -> u8 {
    match color {
        Color::White => 1,
        Color::Black => board.ranks() - 2,
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::board::Board;
    use crate::error::InvalidPlacement;
    use crate::pieces::Color::{Black, White};
    use crate::pieces::{PieceInstance, PieceKind};
    use crate::placement::PlacementState;
    use crate::tiles::Square;

    fn sq(s: &str) -> Square {
        Square::from_str(s).unwrap()
    }

    fn pools() -> PlacementState {
        PlacementState::new(
            vec![
                PieceInstance::new(1, PieceKind::King, White),
                PieceInstance::new(2, PieceKind::Pawn, White),
                PieceInstance::new(3, PieceKind::Herald, White),
                PieceInstance::new(4, PieceKind::Rook, White),
            ],
            vec![
                PieceInstance::new(11, PieceKind::King, Black),
                PieceInstance::new(12, PieceKind::Pawn, Black),
            ],
        )
    }

    #[test]
    fn test_zone_enforcement() {
        let mut board = Board::new(8, 8);
        let mut ps = pools();
        // Royalty outside the center files is rejected.
        assert_eq!(
            ps.place(&mut board, White, 1, sq("a1")),
            Err(InvalidPlacement::WrongZone)
        );
        // A rook on the center files is rejected.
        assert_eq!(
            ps.place(&mut board, White, 4, sq("d1")),
            Err(InvalidPlacement::WrongZone)
        );
        // A pawn belongs on the pawn rank.
        assert_eq!(
            ps.place(&mut board, White, 2, sq("b1")),
            Err(InvalidPlacement::WrongZone)
        );
        // And the king fits on d1.
        assert!(ps.place(&mut board, White, 1, sq("d1")).is_ok());
    }

    #[test]
    fn test_alternation_and_exhaustion() {
        let mut board = Board::new(8, 8);
        let mut ps = PlacementState::new(
            vec![
                PieceInstance::new(1, PieceKind::King, White),
                PieceInstance::new(2, PieceKind::Pawn, White),
            ],
            vec![PieceInstance::new(11, PieceKind::King, Black)],
        );
        // Black may not place first.
        assert_eq!(
            ps.place(&mut board, Black, 11, sq("d8")),
            Err(InvalidPlacement::NotYourTurn)
        );
        let placed = ps.place(&mut board, White, 1, sq("d1")).unwrap();
        assert_eq!(placed.next_placer, Some(Black));
        let placed = ps.place(&mut board, Black, 11, sq("d8")).unwrap();
        // Black's pool is empty, so white continues alone.
        assert_eq!(placed.next_placer, Some(White));
        let placed = ps.place(&mut board, White, 2, sq("a2")).unwrap();
        assert_eq!(placed.next_placer, None);
        assert!(ps.is_complete());
    }

    #[test]
    fn test_herald_file_restriction() {
        let mut board = Board::new(8, 8);
        let mut ps = pools();
        assert_eq!(
            ps.place(&mut board, White, 3, sq("c1")),
            Err(InvalidPlacement::HeraldFileRestriction)
        );
    }

    #[test]
    fn test_herald_snaps_to_pawn_rank() {
        let mut board = Board::new(8, 8);
        let mut ps = pools();
        let placed = ps.place(&mut board, White, 3, sq("a1")).unwrap();
        assert_eq!(placed.actual_position, sq("a2"));
        assert_eq!(placed.pawn_swap, None);
        assert_eq!(
            board.piece_at(sq("a2")).unwrap().kind,
            PieceKind::Herald
        );
    }

    #[test]
    fn test_herald_swaps_existing_pawn() {
        let mut board = Board::new(8, 8);
        let mut ps = pools();
        ps.place(&mut board, White, 2, sq("a2")).unwrap();
        // Black takes a turn in between.
        ps.place(&mut board, Black, 12, sq("a7")).unwrap();
        let placed = ps.place(&mut board, White, 3, sq("a1")).unwrap();
        assert_eq!(placed.actual_position, sq("a2"));
        let swap = placed.pawn_swap.expect("pawn should be displaced");
        assert_eq!(swap.pawn_id, 2);
        assert_eq!(swap.new_position, sq("a1"));
        assert_eq!(board.piece_at(sq("a2")).unwrap().kind, PieceKind::Herald);
        assert_eq!(board.piece_at(sq("a1")).unwrap().kind, PieceKind::Pawn);
    }

    #[test]
    fn test_pawn_snaps_behind_herald() {
        let mut board = Board::new(8, 8);
        let mut ps = pools();
        ps.place(&mut board, White, 3, sq("a1")).unwrap();
        ps.place(&mut board, Black, 11, sq("d8")).unwrap();
        // The herald holds a2, so a pawn aimed there lands on a1.
        let placed = ps.place(&mut board, White, 2, sq("a2")).unwrap();
        assert_eq!(placed.actual_position, sq("a1"));
        assert_eq!(board.piece_at(sq("a1")).unwrap().kind, PieceKind::Pawn);
    }

    #[test]
    fn test_occupied_square_rejected() {
        let mut board = Board::new(8, 8);
        let mut ps = pools();
        ps.place(&mut board, White, 1, sq("d1")).unwrap();
        ps.place(&mut board, Black, 11, sq("d8")).unwrap();
        assert_eq!(
            ps.place(&mut board, White, 4, sq("d1")),
            Err(InvalidPlacement::WrongZone)
        );
        let mut ps2 = PlacementState::new(
            vec![
                PieceInstance::new(21, PieceKind::Queen, White),
                PieceInstance::new(22, PieceKind::Regent, White),
            ],
            vec![],
        );
        ps2.place(&mut board, White, 21, sq("e1")).unwrap();
        assert_eq!(
            ps2.place(&mut board, White, 22, sq("e1")),
            Err(InvalidPlacement::SquareOccupied { square: sq("e1") })
        );
    }
}
