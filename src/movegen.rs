//! Pseudo-legal move generation: every destination satisfying a piece's movement rules,
//! ignoring whether the move would leave the mover's royal in check.

use crate::board::Board;
use crate::pieces::CaptureKind::Standard;
use crate::pieces::SpecialMove::*;
use crate::pieces::{Color, PieceInstance, PieceKind, Slides, SpecialMove};
use crate::tiles::{Coords, Delta, Square, ALL_DELTAS, DIAGONAL_DELTAS, ORTHOGONAL_DELTAS};

/// Hard cap on bounce-trajectory steps. The visit set is what actually terminates the walk;
/// the cap bounds it on degenerate boards.
const BOUNCE_STEP_CAP: usize = 200;

/// All destinations the given piece may move to, ignoring own-royal safety. Returns an empty
/// set for frozen pieces. Castling is not generated here; it is a legality-level concern.
pub fn pseudo_legal(board: &Board, piece: &PieceInstance, ep_target: Option<Square>) -> Vec<Square> {
    let Some(from) = piece.position else {
        return Vec::new();
    };
    if piece.frozen {
        return Vec::new();
    }
    let def = piece.kind.def();
    let mut out = Vec::new();

    walk_slides(board, piece, from, slide_dirs(def.slides), &mut out);
    for leap in def.leaps {
        for delta in expand_leap(leap.file, leap.rank, leap.symmetric) {
            push_leap_target(board, piece, from.offset(delta), &mut out);
        }
    }
    for special in def.specials {
        generate_special(board, piece, from, *special, ep_target, &mut out);
    }

    out.sort_unstable();
    out.dedup();
    out
}

/// Whether the moving piece may capture the given occupant by displacement.
pub fn can_displace_onto(piece: &PieceInstance, occupant: &PieceInstance) -> bool {
    piece.kind.def().capture == Standard
        && occupant.owner != piece.owner
        && occupant.kind.def().can_be_captured
}

fn slide_dirs(slides: Slides) -> &'static [Delta] {
    match slides {
        Slides::None => &[],
        Slides::Orthogonal => &ORTHOGONAL_DELTAS,
        Slides::Diagonal => &DIAGONAL_DELTAS,
        Slides::All => &ALL_DELTAS,
    }
}

/// Expand a leap offset to its eight reflections/rotations, or just the literal vector.
fn expand_leap(file: i8, rank: i8, symmetric: bool) -> Vec<Delta> {
    if !symmetric {
        return vec![Delta::new(file, rank)];
    }
    let mut out = Vec::with_capacity(8);
    for (a, b) in [(file, rank), (rank, file)] {
        for sa in [a, -a] {
            for sb in [b, -b] {
                let d = Delta::new(sa, sb);
                if !out.contains(&d) {
                    out.push(d);
                }
            }
        }
    }
    out
}

/// Walk each direction until blocked: empty squares are destinations; the first occupied
/// square ends the walk, as a capture destination when the mover can displace onto it.
fn walk_slides(
    board: &Board,
    piece: &PieceInstance,
    from: Square,
    dirs: &[Delta],
    out: &mut Vec<Square>,
) {
    for &d in dirs {
        let mut cur = from.coords();
        loop {
            cur = cur.offset(d);
            let Some(sq) = board.square_at(cur) else { break };
            match board.piece_at(sq) {
                None => out.push(sq),
                Some(other) => {
                    if can_displace_onto(piece, other) {
                        out.push(sq);
                    }
                    break;
                }
            }
        }
    }
}

fn push_leap_target(board: &Board, piece: &PieceInstance, coords: Coords, out: &mut Vec<Square>) {
    let Some(sq) = board.square_at(coords) else {
        return;
    };
    match board.piece_at(sq) {
        None => out.push(sq),
        Some(other) => {
            if can_displace_onto(piece, other) {
                out.push(sq);
            }
        }
    }
}

fn generate_special(
    board: &Board,
    piece: &PieceInstance,
    from: Square,
    special: SpecialMove,
    ep_target: Option<Square>,
    out: &mut Vec<Square>,
) {
    let fwd = piece.owner.forward();
    match special {
        PawnForward => {
            let one = from.offset(Delta::new(0, fwd));
            if let Some(sq) = board.square_at(one) {
                if !board.occupied(sq) {
                    out.push(sq);
                    if !piece.has_moved && on_starting_band(board, piece.owner, from) {
                        let two = from.offset(Delta::new(0, 2 * fwd));
                        if let Some(sq2) = board.square_at(two) {
                            if !board.occupied(sq2) {
                                out.push(sq2);
                            }
                        }
                    }
                }
            }
        }
        PawnCaptureDiagonal => {
            for df in [-1, 1] {
                let Some(sq) = board.square_at(from.offset(Delta::new(df, fwd))) else {
                    continue;
                };
                match board.piece_at(sq) {
                    Some(other) => {
                        if other.owner != piece.owner && other.kind.def().can_be_captured {
                            out.push(sq);
                        }
                    }
                    None => {
                        if ep_target == Some(sq) {
                            out.push(sq);
                        }
                    }
                }
            }
        }
        ShogiPawn => {
            if let Some(sq) = board.square_at(from.offset(Delta::new(0, fwd))) {
                match board.piece_at(sq) {
                    None => out.push(sq),
                    Some(other) => {
                        if can_displace_onto(piece, other) {
                            out.push(sq);
                        }
                    }
                }
            }
        }
        PeasantDiagonal => {
            for df in [-1, 1] {
                let Some(one) = board.square_at(from.offset(Delta::new(df, fwd))) else {
                    continue;
                };
                if board.occupied(one) {
                    continue;
                }
                out.push(one);
                if !piece.has_moved {
                    if let Some(two) = board.square_at(from.offset(Delta::new(2 * df, 2 * fwd))) {
                        if !board.occupied(two) {
                            out.push(two);
                        }
                    }
                }
            }
        }
        PeasantCaptureForward => {
            if let Some(sq) = board.square_at(from.offset(Delta::new(0, fwd))) {
                if let Some(other) = board.piece_at(sq) {
                    if other.owner != piece.owner && other.kind.def().can_be_captured {
                        out.push(sq);
                    }
                }
            }
        }
        KingOneSquare => {
            for &d in &ALL_DELTAS {
                push_leap_target(board, piece, from.offset(d), out);
            }
        }
        SwapAdjacent => {
            for &d in &ALL_DELTAS {
                if let Some(sq) = board.square_at(from.offset(d)) {
                    if let Some(other) = board.piece_at(sq) {
                        if other.owner == piece.owner {
                            out.push(sq);
                        }
                    }
                }
            }
        }
        HeraldOrthogonal => herald_steps(board, from, &ORTHOGONAL_DELTAS, false, piece, out),
        RegentConditional => {
            let queen_mode = board.had_multiple_royals(piece.owner)
                && !board.other_royalty_on_board(piece.owner, piece.id);
            if queen_mode {
                walk_slides(board, piece, from, &ALL_DELTAS, out);
            } else {
                herald_steps(board, from, &ALL_DELTAS, true, piece, out);
            }
        }
        Bounce => bounce_dests(board, piece, from, out),
        LongLeap => {
            for &d in &ALL_DELTAS {
                long_leap_walk(board, piece, from, d, out);
            }
        }
        Chameleon => chameleon_dests(board, piece, from, out),
        Grasshopper => {
            for &d in &ALL_DELTAS {
                grasshopper_dest(board, piece, from, d, out);
            }
        }
        CannonMove => {
            for &d in &ORTHOGONAL_DELTAS {
                cannon_walk(board, piece, from, d, out);
            }
        }
        Nightrider => {
            for delta in expand_leap(2, 1, true) {
                nightrider_walk(board, piece, from, delta, out);
            }
        }
    }
}

/// Whether a pawn-like piece still sits on its two-step starting band.
fn on_starting_band(board: &Board, color: Color, from: Square) -> bool {
    match color {
        Color::White => from.rank <= 1,
        Color::Black => from.rank >= board.ranks() - 2,
    }
}

/// Exactly-two-square steps with a blockable intermediate (Herald, and the Regent outside
/// queen mode). `may_capture` permits a displacement capture at the destination.
fn herald_steps(
    board: &Board,
    from: Square,
    dirs: &[Delta],
    may_capture: bool,
    piece: &PieceInstance,
    out: &mut Vec<Square>,
) {
    for &d in dirs {
        let Some(mid) = board.square_at(from.offset(d)) else {
            continue;
        };
        if board.occupied(mid) {
            continue;
        }
        let Some(dest) = board.square_at(from.offset(Delta::new(2 * d.file, 2 * d.rank))) else {
            continue;
        };
        match board.piece_at(dest) {
            None => out.push(dest),
            Some(other) => {
                if may_capture && can_displace_onto(piece, other) {
                    out.push(dest);
                }
            }
        }
    }
}

/// Diagonal slide that reflects off board edges. Terminates on revisiting a square in the
/// current trajectory, on hitting a piece, or at the hard step cap.
fn bounce_dests(board: &Board, piece: &PieceInstance, from: Square, out: &mut Vec<Square>) {
    for &start_dir in &DIAGONAL_DELTAS {
        let mut dir = start_dir;
        let mut cur = from.coords();
        let mut visited = vec![from];
        for _ in 0..BOUNCE_STEP_CAP {
            let mut next = cur.offset(dir);
            if !board.contains(next) {
                if next.file < 0 || next.file >= board.files() as i16 {
                    dir.file = -dir.file;
                }
                if next.rank < 0 || next.rank >= board.ranks() as i16 {
                    dir.rank = -dir.rank;
                }
                next = cur.offset(dir);
                if !board.contains(next) {
                    break;
                }
            }
            let sq = board.square_at(next).expect("bounce step stays on board");
            if visited.contains(&sq) {
                break;
            }
            visited.push(sq);
            match board.piece_at(sq) {
                None => {
                    out.push(sq);
                    cur = next;
                }
                Some(other) => {
                    if can_displace_onto(piece, other) {
                        out.push(sq);
                    }
                    break;
                }
            }
        }
    }
}

/// Quiet slide along one queen line, with chained jumps over capturable enemies. Every
/// empty square along the way is a destination; each enemy passed over is jumped, so a run
/// of adjacent enemies can be captured in one move. Unjumpable or friendly pieces end the
/// line.
fn long_leap_walk(board: &Board, piece: &PieceInstance, from: Square, d: Delta, out: &mut Vec<Square>) {
    let mut cur = from.coords();
    loop {
        cur = cur.offset(d);
        let Some(sq) = board.square_at(cur) else { return };
        match board.piece_at(sq) {
            None => out.push(sq),
            Some(other) => {
                let jumpable = other.owner != piece.owner
                    && other.kind.def().can_be_captured
                    && other.kind.def().can_be_jumped;
                if !jumpable {
                    return;
                }
            }
        }
    }
}

/// Slide to the first occupied square and land immediately beyond it.
fn grasshopper_dest(board: &Board, piece: &PieceInstance, from: Square, d: Delta, out: &mut Vec<Square>) {
    let mut cur = from.coords();
    loop {
        cur = cur.offset(d);
        let Some(sq) = board.square_at(cur) else { return };
        let Some(hurdle) = board.piece_at(sq) else {
            continue;
        };
        if !hurdle.kind.def().can_be_jumped {
            return;
        }
        let Some(landing) = board.square_at(cur.offset(d)) else {
            return;
        };
        match board.piece_at(landing) {
            None => out.push(landing),
            Some(other) => {
                if can_displace_onto(piece, other) {
                    out.push(landing);
                }
            }
        }
        return;
    }
}

/// Rook-like quiet moves; captures jump exactly one screen of either color.
fn cannon_walk(board: &Board, piece: &PieceInstance, from: Square, d: Delta, out: &mut Vec<Square>) {
    let mut cur = from.coords();
    // Quiet phase: empty squares up to the screen.
    loop {
        cur = cur.offset(d);
        let Some(sq) = board.square_at(cur) else { return };
        match board.piece_at(sq) {
            None => out.push(sq),
            Some(screen) => {
                if !screen.kind.def().can_be_jumped {
                    return;
                }
                break;
            }
        }
    }
    // Capture phase: first piece beyond the screen.
    loop {
        cur = cur.offset(d);
        let Some(sq) = board.square_at(cur) else { return };
        if let Some(target) = board.piece_at(sq) {
            if target.owner != piece.owner && target.kind.def().can_be_captured {
                out.push(sq);
            }
            return;
        }
    }
}

/// Knight vector repeated in a fixed direction until blocked.
fn nightrider_walk(board: &Board, piece: &PieceInstance, from: Square, d: Delta, out: &mut Vec<Square>) {
    let mut cur = from.coords();
    loop {
        cur = cur.offset(d);
        let Some(sq) = board.square_at(cur) else { return };
        match board.piece_at(sq) {
            None => out.push(sq),
            Some(other) => {
                if can_displace_onto(piece, other) {
                    out.push(sq);
                }
                return;
            }
        }
    }
}

/// The squares a pawn-like piece could capture onto, from its own square in its own forward
/// direction. Used for the Chameleon's pawn mimicry.
pub fn pawn_capture_squares(board: &Board, pawn: &PieceInstance) -> Vec<Square> {
    let Some(pos) = pawn.position else {
        return Vec::new();
    };
    let fwd = pawn.owner.forward();
    let mut out = Vec::new();
    for special in pawn.kind.def().specials {
        match special {
            PawnCaptureDiagonal => {
                for df in [-1, 1] {
                    if let Some(sq) = board.square_at(pos.offset(Delta::new(df, fwd))) {
                        out.push(sq);
                    }
                }
            }
            ShogiPawn | PeasantCaptureForward => {
                if let Some(sq) = board.square_at(pos.offset(Delta::new(0, fwd))) {
                    out.push(sq);
                }
            }
            _ => {}
        }
    }
    out
}

/// Chameleon destinations: quiet queen slides, plus captures that mimic each victim's own
/// capture method. Never recurses into another chameleon.
fn chameleon_dests(board: &Board, piece: &PieceInstance, from: Square, out: &mut Vec<Square>) {
    // Quiet queen slides, stopping before any piece.
    for &d in &ALL_DELTAS {
        let mut cur = from.coords();
        loop {
            cur = cur.offset(d);
            let Some(sq) = board.square_at(cur) else { break };
            if board.occupied(sq) {
                break;
            }
            out.push(sq);
        }
    }

    let enemies: Vec<&PieceInstance> = board
        .pieces_of(piece.owner.other())
        .filter(|e| e.kind != PieceKind::Chameleon && e.kind.def().can_be_captured)
        .collect();

    for enemy in &enemies {
        let Some(enemy_pos) = enemy.position else {
            continue;
        };
        let enemy_def = enemy.kind.def();
        match enemy_def.capture {
            Standard => {
                if enemy_def.specials.iter().any(|s| {
                    matches!(s, PawnCaptureDiagonal | ShogiPawn | PeasantCaptureForward)
                }) {
                    // Pawn mimicry uses the victim's own capture geometry: the chameleon
                    // must stand on a square the pawn itself could capture.
                    if pawn_capture_squares(board, enemy).contains(&from) {
                        out.push(enemy_pos);
                    }
                } else if phantom_reaches(board, piece, enemy.kind, enemy_pos) {
                    out.push(enemy_pos);
                }
            }
            crate::pieces::CaptureKind::Cannon => {
                if cannon_line_to(board, from, enemy_pos) {
                    out.push(enemy_pos);
                }
            }
            _ => {}
        }
    }

    // Long-leaper mimicry: jump chains whose victims include at least one long leaper.
    for &d in &ALL_DELTAS {
        chameleon_leap_walk(board, piece, from, d, out);
    }
}

/// Whether a phantom copy of `kind`, standing on the chameleon's square with the chameleon's
/// color, could capture the piece at `target`.
fn phantom_reaches(board: &Board, piece: &PieceInstance, kind: PieceKind, target: Square) -> bool {
    let phantom = PieceInstance {
        id: piece.id,
        kind,
        owner: piece.owner,
        position: piece.position,
        has_moved: true,
        frozen: false,
    };
    pseudo_legal(board, &phantom, None).contains(&target)
}

/// An orthogonal line from `from` to `target` with exactly one intervening piece.
fn cannon_line_to(board: &Board, from: Square, target: Square) -> bool {
    if from.file != target.file && from.rank != target.rank {
        return false;
    }
    let d = Delta::new(
        (target.file as i16 - from.file as i16).signum() as i8,
        (target.rank as i16 - from.rank as i16).signum() as i8,
    );
    let mut screens = 0;
    let mut cur = from.coords().offset(d);
    while let Some(sq) = board.square_at(cur) {
        if sq == target {
            return screens == 1;
        }
        if let Some(p) = board.piece_at(sq) {
            if !p.kind.def().can_be_jumped {
                return false;
            }
            screens += 1;
            if screens > 1 {
                return false;
            }
        }
        cur = cur.offset(d);
    }
    false
}

fn chameleon_leap_walk(
    board: &Board,
    piece: &PieceInstance,
    from: Square,
    d: Delta,
    out: &mut Vec<Square>,
) {
    let mut cur = from.coords();
    let mut jumped_leaper = false;
    loop {
        cur = cur.offset(d);
        let Some(sq) = board.square_at(cur) else { return };
        match board.piece_at(sq) {
            None => {
                if jumped_leaper {
                    out.push(sq);
                }
            }
            Some(other) => {
                let jumpable = other.owner != piece.owner
                    && other.kind.def().can_be_captured
                    && other.kind.def().can_be_jumped;
                if !jumpable {
                    return;
                }
                if other.kind == PieceKind::LongLeaper {
                    jumped_leaper = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::str::FromStr;

    use crate::board::testutil::board_with;
    use crate::board::Board;
    use crate::movegen::pseudo_legal;
    use crate::pieces::Color::{Black, White};
    use crate::pieces::PieceKind;
    use crate::tiles::Square;

    fn sq(s: &str) -> Square {
        Square::from_str(s).unwrap()
    }

    fn dests(board: &Board, from: &str) -> HashSet<Square> {
        let piece = board.piece_at(sq(from)).expect("no piece on source square");
        pseudo_legal(board, piece, None).into_iter().collect()
    }

    fn squares(names: &[&str]) -> HashSet<Square> {
        names.iter().map(|s| sq(s)).collect()
    }

    #[test]
    fn test_pawn_forward_and_capture() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::Pawn, White, "e2"),
                (PieceKind::Knight, Black, "d3"),
                (PieceKind::Knight, White, "f3"),
            ],
        );
        assert_eq!(dests(&board, "e2"), squares(&["e3", "e4", "d3"]));
    }

    #[test]
    fn test_pawn_two_step_blocked() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::Pawn, White, "e2"),
                (PieceKind::Knight, Black, "e3"),
            ],
        );
        assert_eq!(dests(&board, "e2"), HashSet::new());
    }

    #[test]
    fn test_black_pawn_direction() {
        let board = board_with(8, 8, &[(PieceKind::Pawn, Black, "e7")]);
        assert_eq!(dests(&board, "e7"), squares(&["e6", "e5"]));
    }

    #[test]
    fn test_en_passant_target_included() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::Pawn, White, "e5"),
                (PieceKind::Pawn, Black, "d5"),
            ],
        );
        let piece = board.piece_at(sq("e5")).unwrap();
        let with_ep: HashSet<Square> = pseudo_legal(&board, piece, Some(sq("d6")))
            .into_iter()
            .collect();
        assert!(with_ep.contains(&sq("d6")));
        assert!(!dests(&board, "e5").contains(&sq("d6")));
    }

    #[test]
    fn test_shogi_pawn_captures_straight() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::ShogiPawn, White, "e4"),
                (PieceKind::Knight, Black, "e5"),
            ],
        );
        assert_eq!(dests(&board, "e4"), squares(&["e5"]));
    }

    #[test]
    fn test_peasant_moves() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::Peasant, White, "e2"),
                (PieceKind::Knight, Black, "e3"),
            ],
        );
        // Diagonal quiet moves (two on first move) plus the straight-forward capture.
        assert_eq!(
            dests(&board, "e2"),
            squares(&["d3", "f3", "c4", "g4", "e3"])
        );
    }

    #[test]
    fn test_knight_leap_expansion() {
        let board = board_with(8, 8, &[(PieceKind::Knight, White, "d4")]);
        assert_eq!(
            dests(&board, "d4"),
            squares(&["b3", "b5", "c2", "c6", "e2", "e6", "f3", "f5"])
        );
    }

    #[test]
    fn test_slides_blocked_by_friendly() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::Rook, White, "a1"),
                (PieceKind::Pawn, White, "a3"),
                (PieceKind::Knight, Black, "d1"),
            ],
        );
        assert_eq!(dests(&board, "a1"), squares(&["a2", "b1", "c1", "d1"]));
    }

    #[test]
    fn test_slide_stops_at_uncapturable() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::Rook, White, "a1"),
                (PieceKind::Jester, Black, "a4"),
            ],
        );
        assert_eq!(dests(&board, "a1"), squares(&["a2", "a3", "b1", "c1", "d1", "e1", "f1", "g1", "h1"]));
    }

    #[test]
    fn test_frozen_piece_generates_nothing() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::Rook, White, "a1"),
                (PieceKind::Gorgon, Black, "b2"),
            ],
        );
        assert!(board.piece_at(sq("a1")).unwrap().frozen);
        assert_eq!(dests(&board, "a1"), HashSet::new());
    }

    #[test]
    fn test_swap_adjacent() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::PhantomKing, White, "e1"),
                (PieceKind::Knight, White, "d1"),
                (PieceKind::Knight, Black, "f1"),
            ],
        );
        let d = dests(&board, "e1");
        // d1 is a swap with a friendly piece; f1 is a displacement capture.
        assert!(d.contains(&sq("d1")));
        assert!(d.contains(&sq("f1")));
        assert!(d.contains(&sq("e2")));
    }

    #[test]
    fn test_herald_exact_two_blockable() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::Herald, White, "a2"),
                (PieceKind::Pawn, White, "a3"),
                (PieceKind::Knight, Black, "c2"),
            ],
        );
        // a4 blocked via a3; c2 occupied (herald cannot capture); b2+? only exact twos.
        assert_eq!(dests(&board, "a2"), HashSet::new());
        let board = board_with(8, 8, &[(PieceKind::Herald, White, "c4")]);
        assert_eq!(dests(&board, "c4"), squares(&["a4", "e4", "c2", "c6"]));
    }

    #[test]
    fn test_regent_short_mode() {
        let mut board = board_with(
            8,
            8,
            &[
                (PieceKind::Regent, White, "d4"),
                (PieceKind::Queen, White, "a1"),
            ],
        );
        board.freeze_royal_history();
        // Another royalty piece is on the board, so the regent stays in short mode.
        assert_eq!(
            dests(&board, "d4"),
            squares(&["b2", "d2", "f2", "b4", "f4", "b6", "d6", "f6"])
        );
    }

    #[test]
    fn test_regent_queen_mode_after_royalty_lost() {
        let mut board = board_with(
            8,
            8,
            &[
                (PieceKind::Regent, White, "d4"),
                (PieceKind::Queen, White, "a1"),
            ],
        );
        board.freeze_royal_history();
        board.capture_piece(2);
        let d = dests(&board, "d4");
        assert!(d.contains(&sq("d8")));
        assert!(d.contains(&sq("h8")));
        assert!(d.contains(&sq("a4")));
    }

    #[test]
    fn test_regent_stays_short_without_history() {
        let mut board = board_with(8, 8, &[(PieceKind::Regent, White, "d4")]);
        board.freeze_royal_history();
        let d = dests(&board, "d4");
        assert!(!d.contains(&sq("d8")));
        assert!(d.contains(&sq("d6")));
    }

    #[test]
    fn test_long_leaper_chain() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::LongLeaper, White, "a1"),
                (PieceKind::Pawn, Black, "b2"),
                (PieceKind::Knight, Black, "c3"),
            ],
        );
        let d = dests(&board, "a1");
        // Jump b2 to c3? c3 occupied: jump lands beyond each piece.
        assert!(!d.contains(&sq("b2")));
        assert!(!d.contains(&sq("c3")));
        assert!(d.contains(&sq("d4")));
        assert!(d.contains(&sq("e5")));
        // Quiet slides along other lines remain.
        assert!(d.contains(&sq("a8")));
    }

    #[test]
    fn test_long_leaper_blocked_by_fool() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::LongLeaper, White, "a1"),
                (PieceKind::Fool, Black, "b2"),
                (PieceKind::Knight, Black, "c3"),
            ],
        );
        let d = dests(&board, "a1");
        assert!(!d.contains(&sq("c3")));
        assert!(!d.contains(&sq("d4")));
    }

    #[test]
    fn test_grasshopper_hurdle() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::Grasshopper, White, "d1"),
                (PieceKind::Pawn, White, "d4"),
                (PieceKind::Knight, Black, "d5"),
            ],
        );
        // Hops the pawn and lands on (captures) the knight; no other hurdles.
        assert_eq!(dests(&board, "d1"), squares(&["d5"]));
    }

    #[test]
    fn test_cannon_screen_capture() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::Cannon, White, "a1"),
                (PieceKind::Pawn, White, "a3"),
                (PieceKind::Knight, Black, "a6"),
                (PieceKind::Knight, Black, "b1"),
            ],
        );
        let d = dests(&board, "a1");
        // Quiet rook moves up to the screen; capture beyond it; b1 blocked (no screen).
        assert_eq!(d, squares(&["a2", "a6"]));
    }

    #[test]
    fn test_nightrider_line() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::Nightrider, White, "a1"),
                (PieceKind::Pawn, Black, "c5"),
            ],
        );
        let d = dests(&board, "a1");
        // (1,2) repeated: b3, c5 (capture, stop). (2,1) repeated: c2, e3, g4.
        assert!(d.contains(&sq("b3")));
        assert!(d.contains(&sq("c5")));
        assert!(!d.contains(&sq("d7")));
        assert!(d.contains(&sq("c2")));
        assert!(d.contains(&sq("e3")));
        assert!(d.contains(&sq("g4")));
    }

    #[test]
    fn test_bounce_reflects_at_edge() {
        let board = board_with(8, 8, &[(PieceKind::Pontiff, White, "b1")]);
        let d = dests(&board, "b1");
        // Up-left hits the a-file edge and reflects to up-right.
        assert!(d.contains(&sq("a2")));
        assert!(d.contains(&sq("b3")));
        assert!(d.contains(&sq("c4")));
        // Plain diagonal run up-right.
        assert!(d.contains(&sq("h7")));
    }

    #[test]
    fn test_chameleon_copies_knight() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::Chameleon, White, "c3"),
                (PieceKind::Knight, Black, "b5"),
                (PieceKind::King, Black, "h8"),
                (PieceKind::King, White, "e1"),
            ],
        );
        let d = dests(&board, "c3");
        assert!(d.contains(&sq("b5")));
    }

    #[test]
    fn test_chameleon_pawn_mimicry_direction() {
        // A black pawn on b4 could capture onto c3, so a chameleon standing there may
        // capture it; a chameleon on c5 (behind the pawn's capture arc) may not.
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::Chameleon, White, "c3"),
                (PieceKind::Pawn, Black, "b4"),
            ],
        );
        assert!(dests(&board, "c3").contains(&sq("b4")));
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::Chameleon, White, "c5"),
                (PieceKind::Pawn, Black, "b4"),
            ],
        );
        assert!(!dests(&board, "c5").contains(&sq("b4")));
    }

    #[test]
    fn test_chameleon_jumps_long_leaper_only() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::Chameleon, White, "a1"),
                (PieceKind::LongLeaper, Black, "b2"),
            ],
        );
        assert!(dests(&board, "a1").contains(&sq("c3")));
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::Chameleon, White, "a1"),
                (PieceKind::Knight, Black, "b2"),
            ],
        );
        assert!(!dests(&board, "a1").contains(&sq("c3")));
    }

    #[test]
    fn test_chameleon_ignores_enemy_chameleon() {
        let board = board_with(
            8,
            8,
            &[
                (PieceKind::Chameleon, White, "a1"),
                (PieceKind::Chameleon, Black, "a4"),
            ],
        );
        assert!(!dests(&board, "a1").contains(&sq("a4")));
    }
}
