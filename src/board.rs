use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::pieces::Tier::Royalty;
use crate::pieces::{Color, PieceId, PieceInstance, PieceKind};
use crate::tiles::{Coords, Square};

/// The rectangular board: a set of piece instances plus a derived square index.
///
/// The piece vector is the single source of truth; the index is recomputed from it after
/// every mutation, which keeps the clone-and-try legality check cheap (cloning is a `Vec`
/// memcpy and a map rebuild over at most a few dozen pieces).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    files: u8,
    ranks: u8,
    pieces: Vec<PieceInstance>,
    #[serde(skip)]
    index: HashMap<Square, usize>,
    had_multiple_royals: [bool; 2],
}

impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool {
        self.files == other.files
            && self.ranks == other.ranks
            && self.pieces == other.pieces
            && self.had_multiple_royals == other.had_multiple_royals
    }
}

impl Eq for Board {}

impl Board {
    /// Create an empty board with the given dimensions.
    pub fn new(files: u8, ranks: u8) -> Self {
        Self {
            files,
            ranks,
            pieces: Vec::new(),
            index: HashMap::new(),
            had_multiple_royals: [false; 2],
        }
    }

    pub fn files(&self) -> u8 {
        self.files
    }

    pub fn ranks(&self) -> u8 {
        self.ranks
    }

    /// Whether the given coordinates fall inside the board.
    pub fn contains(&self, coords: Coords) -> bool {
        coords.file >= 0
            && coords.rank >= 0
            && coords.file < self.files as i16
            && coords.rank < self.ranks as i16
    }

    /// Convert coordinates to a square, if they are on the board.
    pub fn square_at(&self, coords: Coords) -> Option<Square> {
        self.contains(coords)
            .then(|| Square::new(coords.file as u8, coords.rank as u8))
    }

    /// All piece instances, captured ones included.
    pub fn pieces(&self) -> &[PieceInstance] {
        &self.pieces
    }

    /// Iterate over the on-board pieces of one color.
    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = &PieceInstance> {
        self.pieces
            .iter()
            .filter(move |p| p.owner == color && p.position.is_some())
    }

    /// The piece occupying the given square, if any.
    pub fn piece_at(&self, square: Square) -> Option<&PieceInstance> {
        self.index.get(&square).map(|&i| &self.pieces[i])
    }

    /// Whether any piece occupies the given square.
    pub fn occupied(&self, square: Square) -> bool {
        self.index.contains_key(&square)
    }

    /// Look up a piece by its instance id.
    pub fn piece(&self, id: PieceId) -> Option<&PieceInstance> {
        self.pieces.iter().find(|p| p.id == id)
    }

    fn piece_idx(&self, id: PieceId) -> Option<usize> {
        self.pieces.iter().position(|p| p.id == id)
    }

    /// Add a piece to the board at the given square.
    pub fn add_piece(&mut self, mut piece: PieceInstance, square: Square) {
        piece.position = Some(square);
        self.pieces.push(piece);
        self.refresh();
    }

    /// Relocate a piece and mark it as having moved.
    pub fn move_piece(&mut self, id: PieceId, to: Square) {
        if let Some(i) = self.piece_idx(id) {
            self.pieces[i].position = Some(to);
            self.pieces[i].has_moved = true;
            self.refresh();
        }
    }

    /// Remove a piece from the board. Its instance survives with a null position.
    pub fn capture_piece(&mut self, id: PieceId) {
        if let Some(i) = self.piece_idx(id) {
            self.pieces[i].position = None;
            self.refresh();
        }
    }

    /// Exchange the positions of two pieces. Both are marked as having moved.
    pub fn swap_pieces(&mut self, a: PieceId, b: PieceId) {
        if let (Some(i), Some(j)) = (self.piece_idx(a), self.piece_idx(b)) {
            let pa = self.pieces[i].position;
            self.pieces[i].position = self.pieces[j].position;
            self.pieces[j].position = pa;
            self.pieces[i].has_moved = true;
            self.pieces[j].has_moved = true;
            self.refresh();
        }
    }

    /// Overwrite a piece's type (promotion).
    pub fn promote_piece(&mut self, id: PieceId, kind: PieceKind) {
        if let Some(i) = self.piece_idx(id) {
            self.pieces[i].kind = kind;
            self.refresh();
        }
    }

    /// Recompute the square index and freeze states from the piece vector.
    pub fn refresh(&mut self) {
        self.index.clear();
        for (i, p) in self.pieces.iter().enumerate() {
            if let Some(sq) = p.position {
                self.index.insert(sq, i);
            }
        }
        self.recompute_freeze();
    }

    /// A piece is frozen iff some other adjacent piece is a Herald (freezes any color), an
    /// enemy freezer, or an enemy Chameleon while the subject itself is a freezer. Pieces
    /// that cannot be captured cannot be frozen either.
    fn recompute_freeze(&mut self) {
        let mut frozen = vec![false; self.pieces.len()];
        for (i, subject) in self.pieces.iter().enumerate() {
            let Some(pos) = subject.position else { continue };
            if !subject.kind.def().can_be_captured {
                continue;
            }
            for (j, other) in self.pieces.iter().enumerate() {
                if i == j {
                    continue;
                }
                let Some(other_pos) = other.position else {
                    continue;
                };
                if pos.king_distance(other_pos) != 1 {
                    continue;
                }
                let enemy = other.owner != subject.owner;
                let freezes = other.kind == PieceKind::Herald
                    || (enemy && other.kind.def().can_freeze)
                    || (enemy
                        && other.kind == PieceKind::Chameleon
                        && subject.kind.def().can_freeze);
                if freezes {
                    frozen[i] = true;
                    break;
                }
            }
        }
        for (p, f) in self.pieces.iter_mut().zip(frozen) {
            p.frozen = f;
        }
    }

    /// The square of the given color's royal piece, if one remains on the board.
    pub fn royal_square(&self, color: Color) -> Option<Square> {
        self.pieces_of(color)
            .find(|p| p.kind.def().royal)
            .and_then(|p| p.position)
    }

    /// Whether the given color has a royalty-tier piece on the board other than `except`.
    pub fn other_royalty_on_board(&self, color: Color, except: PieceId) -> bool {
        self.pieces_of(color)
            .any(|p| p.id != except && p.kind.def().tier == Royalty)
    }

    /// Whether the color fielded two or more royalty-tier pieces, frozen at placement
    /// completion and consulted by the Regent's conditional movement.
    pub fn had_multiple_royals(&self, color: Color) -> bool {
        self.had_multiple_royals[color.index()]
    }

    /// Record the royalty history from the pieces currently on the board. Called exactly once,
    /// when placement completes.
    pub fn freeze_royal_history(&mut self) {
        for color in [Color::White, Color::Black] {
            let royals = self
                .pieces_of(color)
                .filter(|p| p.kind.def().tier == Royalty)
                .count();
            self.had_multiple_royals[color.index()] = royals >= 2;
        }
    }

    /// Sum of victory points of the color's on-board pieces.
    pub fn victory_points(&self, color: Color) -> i32 {
        self.pieces_of(color)
            .map(|p| p.kind.def().victory_points)
            .sum()
    }
}

// Deserialization rebuilds the square index rather than trusting a second serialized copy.

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoardRepr {
    files: u8,
    ranks: u8,
    pieces: Vec<PieceInstance>,
    had_multiple_royals: [bool; 2],
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let repr = BoardRepr::deserialize(deserializer)?;
        let mut board = Board {
            files: repr.files,
            ranks: repr.ranks,
            pieces: repr.pieces,
            index: HashMap::new(),
            had_multiple_royals: repr.had_multiple_royals,
        };
        board.refresh();
        Ok(board)
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use std::str::FromStr;

    /// Build a board from `(kind, color, square)` triples, ids assigned in order from 1.
    pub fn board_with(files: u8, ranks: u8, setup: &[(PieceKind, Color, &str)]) -> Board {
        let mut board = Board::new(files, ranks);
        for (i, (kind, color, sq)) in setup.iter().enumerate() {
            let piece = PieceInstance::new(i as PieceId + 1, *kind, *color);
            board.add_piece(piece, Square::from_str(sq).unwrap());
        }
        board
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::board::testutil::board_with;
    use crate::board::Board;
    use crate::pieces::Color::{Black, White};
    use crate::pieces::{PieceInstance, PieceKind};
    use crate::tiles::Square;

    #[test]
    fn test_index_tracks_positions() {
        let mut board = board_with(
            8,
            8,
            &[
                (PieceKind::King, White, "e1"),
                (PieceKind::Rook, White, "h1"),
                (PieceKind::King, Black, "e8"),
            ],
        );
        for p in board.pieces().to_vec() {
            let sq = p.position.unwrap();
            assert_eq!(board.piece_at(sq).unwrap().id, p.id);
        }
        board.move_piece(2, Square::from_str("h5").unwrap());
        assert!(board.piece_at(Square::from_str("h1").unwrap()).is_none());
        assert_eq!(
            board.piece_at(Square::from_str("h5").unwrap()).unwrap().id,
            2
        );
        board.capture_piece(2);
        assert!(board.piece_at(Square::from_str("h5").unwrap()).is_none());
        assert_eq!(board.piece(2).unwrap().position, None);
    }

    #[test]
    fn test_has_moved_set_by_moves_and_swaps() {
        let mut board = board_with(
            8,
            8,
            &[
                (PieceKind::PhantomKing, White, "e1"),
                (PieceKind::Knight, White, "e2"),
            ],
        );
        board.swap_pieces(1, 2);
        assert!(board.piece(1).unwrap().has_moved);
        assert!(board.piece(2).unwrap().has_moved);
        assert_eq!(
            board.piece(1).unwrap().position,
            Some(Square::from_str("e2").unwrap())
        );
    }

    #[test]
    fn test_freeze_aura() {
        // A black herald freezes adjacent pieces of both colors.
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::Herald, Black, "d4"),
                (PieceKind::Knight, White, "d5"),
                (PieceKind::Knight, Black, "e4"),
                (PieceKind::Knight, White, "d7"),
            ],
        );
        assert!(board.piece(2).unwrap().frozen);
        assert!(board.piece(3).unwrap().frozen);
        assert!(!board.piece(4).unwrap().frozen);
    }

    #[test]
    fn test_gorgon_freezes_enemies_only() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::Gorgon, White, "d4"),
                (PieceKind::Knight, Black, "e5"),
                (PieceKind::Knight, White, "c3"),
            ],
        );
        assert!(board.piece(2).unwrap().frozen);
        assert!(!board.piece(3).unwrap().frozen);
    }

    #[test]
    fn test_chameleon_freezes_enemy_freezers() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::Chameleon, White, "d4"),
                (PieceKind::Gorgon, Black, "e5"),
                (PieceKind::Knight, Black, "c3"),
            ],
        );
        assert!(board.piece(2).unwrap().frozen);
        assert!(!board.piece(3).unwrap().frozen);
    }

    #[test]
    fn test_fool_and_jester_never_frozen() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::Herald, Black, "d4"),
                (PieceKind::Fool, White, "d5"),
                (PieceKind::Jester, White, "e5"),
            ],
        );
        assert!(!board.piece(2).unwrap().frozen);
        assert!(!board.piece(3).unwrap().frozen);
    }

    #[test]
    fn test_freeze_recompute_idempotent() {
        let mut board = board_with(
            8,
            8,
            &[
                (PieceKind::Herald, Black, "d4"),
                (PieceKind::Knight, White, "d5"),
                (PieceKind::Gorgon, White, "a1"),
            ],
        );
        board.refresh();
        let once = board.clone();
        board.refresh();
        assert_eq!(board, once);
    }

    #[test]
    fn test_royal_history() {
        let mut board = board_with(
            8,
            8,
            &[
                (PieceKind::King, White, "e1"),
                (PieceKind::Queen, White, "d1"),
                (PieceKind::King, Black, "e8"),
            ],
        );
        board.freeze_royal_history();
        assert!(board.had_multiple_royals(White));
        assert!(!board.had_multiple_royals(Black));
    }

    #[test]
    fn test_victory_points() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::King, White, "e1"),
                (PieceKind::Queen, White, "d1"),
                (PieceKind::Jester, Black, "e8"),
            ],
        );
        assert_eq!(board.victory_points(White), 90);
        assert_eq!(board.victory_points(Black), -15);
    }

    #[test]
    fn test_serde_rebuilds_index() {
        let mut board = Board::new(8, 8);
        board.add_piece(
            PieceInstance::new(7, PieceKind::Queen, White),
            Square::from_str("d1").unwrap(),
        );
        let json = serde_json::to_string(&board).unwrap();
        let back: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(back, board);
        assert_eq!(
            back.piece_at(Square::from_str("d1").unwrap()).unwrap().id,
            7
        );
    }
}
