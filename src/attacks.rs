//! The attack oracle: whether a color could capture a given square on its next move,
//! counting both displacement attacks and every non-displacement capture method.

use crate::board::Board;
use crate::movegen::pseudo_legal;
use crate::pieces::CaptureKind;
use crate::pieces::{Color, PieceId, PieceInstance, PieceKind};
use crate::tiles::{Delta, Square, ALL_DELTAS, ORTHOGONAL_DELTAS};

/// Whether any piece of `attacker` threatens the given square. Frozen attackers are ignored.
/// An empty target square is treated as if it held an enemy piece, so the oracle can answer
/// for the squares a castling royal passes through.
pub fn is_attacked(board: &Board, target: Square, attacker: Color) -> bool {
    let board = &marked_board(board, target, attacker);
    for piece in board.pieces_of(attacker) {
        if piece.frozen {
            continue;
        }
        let threatens = match piece.kind.def().capture {
            CaptureKind::Standard | CaptureKind::Cannon => {
                pseudo_legal(board, piece, None).contains(&target)
            }
            CaptureKind::Coordinator => coordinator_threatens(board, piece, target),
            CaptureKind::Boxer => boxer_threatens(board, piece, target),
            CaptureKind::Withdrawal => withdrawer_threatens(board, piece, target),
            CaptureKind::Thief => thief_threatens(board, piece, target),
            CaptureKind::LongLeap => leaper_threatens(board, piece, target),
            CaptureKind::Chameleon => chameleon_threatens(board, piece, target),
            CaptureKind::None => false,
        };
        if threatens {
            return true;
        }
    }
    false
}

/// Whether the given color's royal piece is currently attacked.
pub fn is_in_check(board: &Board, color: Color) -> bool {
    match board.royal_square(color) {
        Some(royal) => is_attacked(board, royal, color.other()),
        None => false,
    }
}

/// Clone the board and, if the target square is empty, occupy it with a marker pawn of the
/// defending color so displacement generators report it as a capture destination.
fn marked_board(board: &Board, target: Square, attacker: Color) -> Board {
    let mut board = board.clone();
    if !board.occupied(target) {
        let id = board.pieces().iter().map(|p| p.id).max().unwrap_or(0) + 1;
        board.add_piece(
            PieceInstance::new(id as PieceId, PieceKind::Pawn, attacker.other()),
            target,
        );
    }
    board
}

/// Coordinator: a square is threatened when some destination `d` forms a corner with the
/// defending side's royal, `(royal.file, d.rank)` or `(d.file, royal.rank)`, on the target.
fn coordinator_threatens(board: &Board, piece: &PieceInstance, target: Square) -> bool {
    let Some(royal) = board.royal_square(piece.owner.other()) else {
        return false;
    };
    pseudo_legal(board, piece, None).iter().any(|d| {
        Square::new(royal.file, d.rank) == target || Square::new(d.file, royal.rank) == target
    })
}

/// Boxer: moving adjacent to the target with a friendly piece on the far side captures it.
fn boxer_threatens(board: &Board, piece: &PieceInstance, target: Square) -> bool {
    for d in pseudo_legal(board, piece, None) {
        let df = target.file as i16 - d.file as i16;
        let dr = target.rank as i16 - d.rank as i16;
        if df.abs() + dr.abs() != 1 {
            continue;
        }
        let far = target.offset(Delta::new(df as i8, dr as i8));
        if let Some(far_sq) = board.square_at(far) {
            if let Some(p) = board.piece_at(far_sq) {
                if p.owner == piece.owner && p.id != piece.id {
                    return true;
                }
            }
        }
    }
    false
}

/// Withdrawer: the target must be adjacent, and the withdrawer must have a destination
/// directly away from it.
fn withdrawer_threatens(board: &Board, piece: &PieceInstance, target: Square) -> bool {
    let Some(pos) = piece.position else {
        return false;
    };
    if pos.king_distance(target) != 1 {
        return false;
    }
    let sf = (pos.file as i16 - target.file as i16).signum();
    let sr = (pos.rank as i16 - target.rank as i16).signum();
    pseudo_legal(board, piece, None).iter().any(|d| {
        (d.file as i16 - pos.file as i16).signum() == sf
            && (d.rank as i16 - pos.rank as i16).signum() == sr
    })
}

/// Thief: some destination, advanced one more step along its movement direction, lands on
/// the target.
fn thief_threatens(board: &Board, piece: &PieceInstance, target: Square) -> bool {
    let Some(pos) = piece.position else {
        return false;
    };
    for &s in &ALL_DELTAS {
        let mut cur = pos.coords();
        loop {
            cur = cur.offset(s);
            let Some(sq) = board.square_at(cur) else { break };
            if board.occupied(sq) {
                break;
            }
            if board.square_at(cur.offset(s)) == Some(target) {
                return true;
            }
        }
    }
    false
}

/// Long leaper: the target lies on a clear queen line with an empty landing square beyond.
fn leaper_threatens(board: &Board, piece: &PieceInstance, target: Square) -> bool {
    let Some(pos) = piece.position else {
        return false;
    };
    let target_piece = board.piece_at(target);
    if let Some(t) = target_piece {
        if !t.kind.def().can_be_jumped {
            return false;
        }
    }
    for &s in &ALL_DELTAS {
        let mut cur = pos.coords();
        loop {
            cur = cur.offset(s);
            let Some(sq) = board.square_at(cur) else { break };
            if sq == target {
                return board
                    .square_at(cur.offset(s))
                    .is_some_and(|landing| !board.occupied(landing));
            }
            if board.occupied(sq) {
                break;
            }
        }
    }
    false
}

/// Chameleon: the composite threat surface relevant to royal targets — pawn-style capture
/// geometry, a king step if adjacent, a herald line of exactly two orthogonal squares with
/// an empty intermediate, and long-leaper lines when the jumped piece is a long leaper.
fn chameleon_threatens(board: &Board, piece: &PieceInstance, target: Square) -> bool {
    let Some(pos) = piece.position else {
        return false;
    };
    let defender_fwd = piece.owner.other().forward();
    // A pawn on the target square could capture onto the chameleon's square.
    for df in [-1, 0, 1] {
        if board.square_at(target.offset(Delta::new(df, defender_fwd))) == Some(pos) {
            return true;
        }
    }
    if pos.king_distance(target) == 1 {
        return true;
    }
    // Herald line: exactly two squares orthogonally with an empty intermediate.
    for &d in &ORTHOGONAL_DELTAS {
        if board.square_at(pos.offset(Delta::new(2 * d.file, 2 * d.rank))) == Some(target) {
            if let Some(mid) = board.square_at(pos.offset(d)) {
                if !board.occupied(mid) {
                    return true;
                }
            }
        }
    }
    if board.piece_at(target).is_some_and(|t| t.kind == PieceKind::LongLeaper) {
        return leaper_threatens(board, piece, target);
    }
    false
}
