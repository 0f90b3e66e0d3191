//! Army drafting: budgeted piece selection validated against slot caps, per-type caps and
//! king-replacer exclusivity.

use serde::{Deserialize, Serialize};

use crate::error::InvalidDraft;
use crate::game::BoardSize;
use crate::pieces::Tier::{Other, Pawn, Piece, Royalty};
use crate::pieces::{Color, PieceId, PieceInstance, PieceKind, Tier};

/// Per-tier army capacity for one color, fixed by board size.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SlotCaps {
    pub pawn: u8,
    pub piece: u8,
    pub royalty: u8,
}

/// The slot capacities of the given board.
pub fn slot_caps(size: BoardSize) -> SlotCaps {
    match size {
        BoardSize::Size8x8 => SlotCaps {
            pawn: 8,
            piece: 6,
            royalty: 2,
        },
        BoardSize::Size10x8 | BoardSize::Size10x10 => SlotCaps {
            pawn: 10,
            piece: 8,
            royalty: 2,
        },
    }
}

/// One drafted piece type with its count.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(rename = "pieceTypeId")]
    pub kind: PieceKind,
    pub count: u8,
}

/// Per-tier slot usage derived from a draft. The royalty figure includes the slot taken by
/// the mandatory King, or by the king-replacer in its stead.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
pub struct SlotsUsed {
    pub pawn: u8,
    pub piece: u8,
    pub royalty: u8,
}

/// One player's army selection, built up incrementally during the draft phase.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerDraft {
    selections: Vec<Selection>,
}

impl PlayerDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_selections(selections: Vec<Selection>) -> Self {
        Self { selections }
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    /// Add one copy of the given kind to the draft.
    pub fn add(&mut self, kind: PieceKind) {
        if let Some(sel) = self.selections.iter_mut().find(|s| s.kind == kind) {
            sel.count += 1;
        } else {
            self.selections.push(Selection { kind, count: 1 });
        }
    }

    /// Remove one copy of the given kind. Returns whether anything was removed.
    pub fn remove(&mut self, kind: PieceKind) -> bool {
        let Some(i) = self.selections.iter().position(|s| s.kind == kind) else {
            return false;
        };
        if self.selections[i].count > 1 {
            self.selections[i].count -= 1;
        } else {
            self.selections.remove(i);
        }
        true
    }

    /// Total cost of the selections.
    pub fn budget_spent(&self) -> u32 {
        self.selections
            .iter()
            .map(|s| s.kind.def().cost * s.count as u32)
            .sum()
    }

    /// The selected king-replacer, if exactly one copy of one is present. Drafts with more
    /// are invalid.
    pub fn king_replacer(&self) -> Option<PieceKind> {
        self.selections
            .iter()
            .find(|s| s.kind.def().replaces_king)
            .map(|s| s.kind)
    }

    /// Derived slot usage. The `Other` tier counts against the piece slots, and the royalty
    /// slots are pre-occupied by the mandatory King unless a replacer takes that slot.
    pub fn slots_used(&self) -> SlotsUsed {
        let mut used = SlotsUsed::default();
        for sel in &self.selections {
            match sel.kind.def().tier {
                Pawn => used.pawn += sel.count,
                Piece | Other => used.piece += sel.count,
                Royalty => used.royalty += sel.count,
            }
        }
        if self.king_replacer().is_none() {
            used.royalty += 1;
        }
        used
    }

    /// Authoritative validation against the budget and the board's capacities.
    pub fn validate(&self, budget: u32, size: BoardSize) -> Result<(), InvalidDraft> {
        if self.selections.iter().any(|s| s.count == 0) {
            return Err(InvalidDraft::EmptySelection);
        }
        let spent = self.budget_spent();
        if spent > budget {
            return Err(InvalidDraft::OverBudget { spent, budget });
        }
        let replacer_copies: u8 = self
            .selections
            .iter()
            .filter(|s| s.kind.def().replaces_king)
            .map(|s| s.count)
            .sum();
        if replacer_copies > 1 {
            return Err(InvalidDraft::MultipleKingReplacers);
        }
        let caps = slot_caps(size);
        let used = self.slots_used();
        for (tier, used, cap) in [
            (Tier::Pawn, used.pawn, caps.pawn),
            (Tier::Piece, used.piece, caps.piece),
            (Tier::Royalty, used.royalty, caps.royalty),
        ] {
            if used > cap {
                return Err(InvalidDraft::SlotCapExceeded { tier, used, cap });
            }
        }
        for sel in &self.selections {
            if let Some(cap) = sel.kind.def().draft_cap {
                if sel.count > cap {
                    return Err(InvalidDraft::TypeCapExceeded { cap });
                }
            }
        }
        Ok(())
    }

    /// The army used for a side that never submitted a draft before the deadline. Injected
    /// as a lifecycle default, not validated against the budget.
    pub fn fallback() -> Self {
        Self {
            selections: vec![
                Selection {
                    kind: PieceKind::Queen,
                    count: 1,
                },
                Selection {
                    kind: PieceKind::Rook,
                    count: 2,
                },
                Selection {
                    kind: PieceKind::Bishop,
                    count: 2,
                },
                Selection {
                    kind: PieceKind::Knight,
                    count: 2,
                },
                Selection {
                    kind: PieceKind::Pawn,
                    count: 8,
                },
            ],
        }
    }

    /// Create the piece instances this draft fields: the mandatory King (unless a replacer
    /// was selected) followed by every selection, ids drawn from the given counter.
    pub fn instantiate_army(&self, color: Color, next_id: &mut PieceId) -> Vec<PieceInstance> {
        let mut army = Vec::new();
        let mut take_id = || {
            let id = *next_id;
            *next_id += 1;
            id
        };
        if self.king_replacer().is_none() {
            army.push(PieceInstance::new(take_id(), PieceKind::King, color));
        }
        for sel in &self.selections {
            for _ in 0..sel.count {
                army.push(PieceInstance::new(take_id(), sel.kind, color));
            }
        }
        army
    }
}
