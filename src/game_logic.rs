//! Legality filtering, special mechanics and move execution. The functions here take the
//! current state by reference and report violations as data; nothing in this module panics
//! on bad input.

use itertools::Itertools;

use crate::attacks::{is_attacked, is_in_check};
use crate::board::Board;
use crate::catalog::PROMOTION_FALLBACK;
use crate::error::InvalidMove;
use crate::game::{GamePhase, GameState};
use crate::movegen::pseudo_legal;
use crate::pieces::CaptureKind;
use crate::pieces::SpecialMove::{PawnCaptureDiagonal, PawnForward};
use crate::pieces::Tier::Pawn;
use crate::pieces::{Color, PieceId, PieceInstance, PieceKind};
use crate::play::{EndReason, GameResult, Move, MoveRecord};
use crate::tiles::{Delta, Square, ORTHOGONAL_DELTAS};

/// Everything a single move did to the board.
#[derive(Debug, Default, Clone)]
pub struct ExecEffects {
    /// Ids and kinds of every piece removed from the board.
    pub captures: Vec<(PieceId, PieceKind)>,
    pub castled: bool,
    pub swapped: bool,
}

/// The home rank of the given color (rank 1 for white, the top rank for black).
pub fn home_rank(board: &Board, color: Color) -> u8 {
    match color {
        Color::White => 0,
        Color::Black => board.ranks() - 1,
    }
}

/// The promotion rank of the given color (the opposite edge).
pub fn promotion_rank(board: &Board, color: Color) -> u8 {
    home_rank(board, color.other())
}

/// The promotion choices available in this game: piece types currently on the board that
/// are not pawns, not the mandatory royal, not king-replacers and are capable of capturing.
/// The Fool promotes only to Jester. An empty computed set falls back to the classic four.
pub fn promotion_options(board: &Board, promoting: PieceKind) -> Vec<PieceKind> {
    if promoting == PieceKind::Fool {
        return vec![PieceKind::Jester];
    }
    let options: Vec<PieceKind> = board
        .pieces()
        .iter()
        .filter(|p| p.position.is_some())
        .map(|p| p.kind)
        .filter(|k| {
            let def = k.def();
            def.tier != Pawn
                && !def.mandatory
                && !def.replaces_king
                && def.capture != CaptureKind::None
        })
        .unique()
        .sorted()
        .collect();
    if options.is_empty() {
        PROMOTION_FALLBACK.to_vec()
    } else {
        options
    }
}

/// Castling destinations for the given piece, empty unless it is an unmoved royal on its
/// home rank. The royal moves two files toward an unmoved `can_castle` partner; neither the
/// royal's current square nor the two squares it traverses may be attacked.
pub fn castle_destinations(board: &Board, piece: &PieceInstance) -> Vec<Square> {
    let def = piece.kind.def();
    let Some(from) = piece.position else {
        return Vec::new();
    };
    let home = home_rank(board, piece.owner);
    if !def.royal || piece.has_moved || piece.frozen || from.rank != home {
        return Vec::new();
    }
    if is_attacked(board, from, piece.owner.other()) {
        return Vec::new();
    }
    let mut out = Vec::new();
    for dir in [-1i16, 1] {
        if castle_partner(board, piece, dir).is_none() {
            continue;
        }
        let dest_file = from.file as i16 + 2 * dir;
        if dest_file < 0 || dest_file >= board.files() as i16 {
            continue;
        }
        let crossed = Square::new((from.file as i16 + dir) as u8, home);
        let dest = Square::new(dest_file as u8, home);
        if is_attacked(board, crossed, piece.owner.other())
            || is_attacked(board, dest, piece.owner.other())
        {
            continue;
        }
        out.push(dest);
    }
    out
}

/// The first piece along the home rank in the given direction, when it is a valid castling
/// partner: same side, unmoved, `can_castle`, not royal, and not file-adjacent to the royal.
fn castle_partner(board: &Board, royal: &PieceInstance, dir: i16) -> Option<PieceId> {
    let from = royal.position?;
    let mut file = from.file as i16 + dir;
    while file >= 0 && file < board.files() as i16 {
        let sq = Square::new(file as u8, from.rank);
        if let Some(p) = board.piece_at(sq) {
            let pd = p.kind.def();
            let eligible = p.owner == royal.owner
                && pd.can_castle
                && !pd.royal
                && !p.has_moved
                && from.file.abs_diff(sq.file) >= 2;
            return eligible.then_some(p.id);
        }
        file += dir;
    }
    None
}

/// All fully legal destinations for the piece on `from`: pseudo-legal moves plus castling,
/// minus anything that would leave the mover's royal attacked.
pub fn legal_destinations(state: &GameState, from: Square) -> Vec<Square> {
    let Some(piece) = state.board.piece_at(from) else {
        return Vec::new();
    };
    let piece = piece.clone();
    let mut dests = pseudo_legal(&state.board, &piece, state.en_passant_target);
    dests.extend(castle_destinations(&state.board, &piece));
    dests.retain(|&to| {
        let mut sim = state.board.clone();
        execute_on_board(&mut sim, piece.id, from, to, state.en_passant_target, None);
        !is_in_check(&sim, piece.owner)
    });
    dests
}

/// Validate and execute a move, updating every derived field of the game state.
pub fn apply_move(state: &mut GameState, mv: Move) -> Result<MoveRecord, InvalidMove> {
    if state.result.is_some() {
        return Err(InvalidMove::GameOver);
    }
    let board = &state.board;
    for sq in [mv.from, mv.to] {
        if sq.file >= board.files() || sq.rank >= board.ranks() {
            return Err(InvalidMove::OutOfBounds);
        }
    }
    let Some(piece) = board.piece_at(mv.from) else {
        return Err(InvalidMove::NoPiece);
    };
    let piece = piece.clone();
    if piece.owner != state.current_turn {
        return Err(InvalidMove::WrongPlayer);
    }
    if !legal_destinations(state, mv.from).contains(&mv.to) {
        return Err(InvalidMove::IllegalDestination);
    }

    let needs_promotion =
        piece.kind.is_pawn_like() && mv.to.rank == promotion_rank(board, piece.owner);
    let promotion = if needs_promotion {
        let Some(kind) = mv.promotion else {
            return Err(InvalidMove::PromotionRequired);
        };
        if !promotion_options(board, piece.kind).contains(&kind) {
            return Err(InvalidMove::PromotionInvalid);
        }
        Some(kind)
    } else {
        None
    };

    let two_step = piece.kind.def().specials.contains(&PawnForward)
        && mv.from.file == mv.to.file
        && mv.from.rank.abs_diff(mv.to.rank) == 2;

    let effects = execute_on_board(
        &mut state.board,
        piece.id,
        mv.from,
        mv.to,
        state.en_passant_target,
        promotion,
    );

    state.en_passant_target = two_step.then(|| {
        Square::new(
            mv.from.file,
            (mv.from.rank as i16 + piece.owner.forward() as i16) as u8,
        )
    });

    let mover = state.current_turn;
    let move_number = state.turn_number;
    state.current_turn = mover.other();
    if mover == Color::Black {
        state.turn_number += 1;
    }
    state.refresh_victory_points();

    let gave_check = is_in_check(&state.board, mover.other());
    state.in_check = gave_check.then(|| mover.other());

    let record = MoveRecord {
        turn_number: move_number,
        color: mover,
        kind: piece.kind,
        from: mv.from,
        to: mv.to,
        captures: effects.captures.iter().map(|&(_, k)| k).collect(),
        promotion,
        castled: effects.castled,
        swapped: effects.swapped,
        gave_check,
    };
    state.move_history.push(record.clone());

    if let Some(result) = detect_end(state) {
        state.result = Some(result);
        state.phase = GamePhase::Ended;
    }
    Ok(record)
}

/// Apply a move to the board without validation: mark captures, relocate the mover and any
/// castle or swap partner, promote, and leave the board refreshed. Used both for real
/// execution and for the legality filter's simulations.
pub fn execute_on_board(
    board: &mut Board,
    id: PieceId,
    from: Square,
    to: Square,
    ep_target: Option<Square>,
    promotion: Option<PieceKind>,
) -> ExecEffects {
    let mut effects = ExecEffects::default();
    let Some(piece) = board.piece(id).cloned() else {
        return effects;
    };
    let def = piece.kind.def();

    // Castling: an unmoved royal moving exactly two files along its rank with a partner in
    // that direction. The partner lands on the square the royal crossed.
    if def.royal && !piece.has_moved && from.rank == to.rank && from.file.abs_diff(to.file) == 2 {
        let dir = if to.file > from.file { 1 } else { -1 };
        if let Some(partner_id) = castle_partner(board, &piece, dir) {
            let crossed = Square::new((from.file as i16 + dir) as u8, from.rank);
            board.move_piece(partner_id, crossed);
            board.move_piece(id, to);
            effects.castled = true;
            return effects;
        }
    }

    // Swap with an adjacent friendly piece.
    if let Some(occupant) = board.piece_at(to) {
        if occupant.owner == piece.owner {
            let partner_id = occupant.id;
            board.swap_pieces(id, partner_id);
            effects.swapped = true;
            return effects;
        }
    }

    let mut captured: Vec<(PieceId, PieceKind)> = Vec::new();
    if let Some(occupant) = board.piece_at(to) {
        captured.push((occupant.id, occupant.kind));
    }
    // En passant removes the pawn on the destination file at the mover's source rank.
    if ep_target == Some(to)
        && def.specials.contains(&PawnCaptureDiagonal)
        && from.file != to.file
        && !board.occupied(to)
    {
        if let Some(victim) = board.piece_at(Square::new(to.file, from.rank)) {
            if victim.owner != piece.owner {
                captured.push((victim.id, victim.kind));
            }
        }
    }
    captured.extend(side_effect_captures(board, &piece, from, to));
    captured.sort_by_key(|&(id, _)| id);
    captured.dedup_by_key(|&mut (id, _)| id);

    for &(victim, _) in &captured {
        board.capture_piece(victim);
    }
    board.move_piece(id, to);
    if let Some(kind) = promotion {
        board.promote_piece(id, kind);
    }
    effects.captures = captured;
    effects
}

/// The unit direction of a queen-line move, if the move lies on one.
fn unit_delta(from: Square, to: Square) -> Option<Delta> {
    let df = to.file as i16 - from.file as i16;
    let dr = to.rank as i16 - from.rank as i16;
    if df == 0 && dr == 0 {
        return None;
    }
    if df != 0 && dr != 0 && df.abs() != dr.abs() {
        return None;
    }
    Some(Delta::new(df.signum() as i8, dr.signum() as i8))
}

fn capturable_enemy(board: &Board, owner: Color, sq: Square) -> Option<(PieceId, PieceKind)> {
    board
        .piece_at(sq)
        .filter(|p| p.owner != owner && p.kind.def().can_be_captured)
        .map(|p| (p.id, p.kind))
}

/// Captures that resolve on squares other than the destination, computed on the board as it
/// stands before the mover relocates.
fn side_effect_captures(
    board: &Board,
    piece: &PieceInstance,
    from: Square,
    to: Square,
) -> Vec<(PieceId, PieceKind)> {
    let mut out = Vec::new();
    match piece.kind.def().capture {
        CaptureKind::Withdrawal => {
            if let Some(s) = unit_delta(from, to) {
                if let Some(sq) = board.square_at(from.offset(Delta::new(-s.file, -s.rank))) {
                    out.extend(capturable_enemy(board, piece.owner, sq));
                }
            }
        }
        CaptureKind::Coordinator => {
            out.extend(coordinator_corner_captures(board, piece, to, None));
        }
        CaptureKind::Boxer => {
            out.extend(boxer_sandwich_captures(board, piece, from, to, None));
        }
        CaptureKind::Thief => {
            if let Some(s) = unit_delta(from, to) {
                if let Some(sq) = board.square_at(to.offset(s)) {
                    out.extend(capturable_enemy(board, piece.owner, sq));
                }
            }
        }
        CaptureKind::LongLeap => {
            out.extend(jumped_captures(board, piece, from, to, None));
        }
        CaptureKind::Chameleon => {
            if let Some(s) = unit_delta(from, to) {
                if let Some(sq) = board.square_at(from.offset(Delta::new(-s.file, -s.rank))) {
                    out.extend(
                        capturable_enemy(board, piece.owner, sq)
                            .filter(|&(_, k)| k == PieceKind::Withdrawer),
                    );
                }
            }
            out.extend(coordinator_corner_captures(
                board,
                piece,
                to,
                Some(PieceKind::Coordinator),
            ));
            out.extend(boxer_sandwich_captures(
                board,
                piece,
                from,
                to,
                Some(PieceKind::Boxer),
            ));
            out.extend(jumped_captures(
                board,
                piece,
                from,
                to,
                Some(PieceKind::LongLeaper),
            ));
        }
        _ => {}
    }
    out
}

/// Enemies on the two corners formed by the destination and the mover's own royal. When
/// `only` is set (Chameleon mimicry), victims are restricted to that kind.
fn coordinator_corner_captures(
    board: &Board,
    piece: &PieceInstance,
    to: Square,
    only: Option<PieceKind>,
) -> Vec<(PieceId, PieceKind)> {
    let Some(royal) = board.royal_square(piece.owner) else {
        return Vec::new();
    };
    [
        Square::new(royal.file, to.rank),
        Square::new(to.file, royal.rank),
    ]
    .into_iter()
    .filter(|&sq| sq != to)
    .filter_map(|sq| capturable_enemy(board, piece.owner, sq))
    .filter(|&(_, k)| only.is_none_or(|o| k == o))
    .collect()
}

/// Enemies orthogonally adjacent to the destination with a friendly piece directly beyond.
fn boxer_sandwich_captures(
    board: &Board,
    piece: &PieceInstance,
    from: Square,
    to: Square,
    only: Option<PieceKind>,
) -> Vec<(PieceId, PieceKind)> {
    let mut out = Vec::new();
    for &d in &ORTHOGONAL_DELTAS {
        let Some(victim_sq) = board.square_at(to.offset(d)) else {
            continue;
        };
        let Some(victim) = capturable_enemy(board, piece.owner, victim_sq) else {
            continue;
        };
        if only.is_some_and(|o| victim.1 != o) {
            continue;
        }
        let Some(far_sq) = board.square_at(to.offset(Delta::new(2 * d.file, 2 * d.rank))) else {
            continue;
        };
        // The mover's own origin square will be empty once it relocates.
        if far_sq == from {
            continue;
        }
        if board.piece_at(far_sq).is_some_and(|p| p.owner == piece.owner) {
            out.push(victim);
        }
    }
    out
}

/// Capturable enemies on the squares strictly between `from` and `to` along a queen line.
fn jumped_captures(
    board: &Board,
    piece: &PieceInstance,
    from: Square,
    to: Square,
    only: Option<PieceKind>,
) -> Vec<(PieceId, PieceKind)> {
    let Some(s) = unit_delta(from, to) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut cur = from.coords().offset(s);
    while let Some(sq) = board.square_at(cur) {
        if sq == to {
            break;
        }
        if let Some(victim) = capturable_enemy(board, piece.owner, sq) {
            if only.is_none_or(|o| victim.1 == o) {
                out.push(victim);
            }
        }
        cur = cur.offset(s);
    }
    out
}

/// Work out the result, if any, for the side now to move.
pub fn detect_end(state: &GameState) -> Option<GameResult> {
    let side = state.current_turn;
    if state.board.royal_square(side).is_none() {
        // Failsafe; legal play should never reach a royal-less position.
        return Some(GameResult::win(side.other(), EndReason::Checkmate));
    }
    let any_legal = state
        .board
        .pieces_of(side)
        .filter_map(|p| p.position)
        .any(|sq| !legal_destinations(state, sq).is_empty());
    if any_legal {
        return None;
    }
    if is_in_check(&state.board, side) {
        return Some(GameResult::win(side.other(), EndReason::Checkmate));
    }
    let white_vp = state.board.victory_points(Color::White);
    let black_vp = state.board.victory_points(Color::Black);
    match white_vp.cmp(&black_vp) {
        std::cmp::Ordering::Greater => Some(GameResult::win(Color::White, EndReason::Stalemate)),
        std::cmp::Ordering::Less => Some(GameResult::win(Color::Black, EndReason::Stalemate)),
        std::cmp::Ordering::Equal => Some(GameResult::draw(EndReason::DrawVpTie)),
    }
}
