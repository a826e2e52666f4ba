//! Pure rank arithmetic behind the ordering operations.
//!
//! A [`Slot`] is one row of an ordered scope: its id and its rank (`position`
//! for sections, `display_order` for pages). Planners take the current slots
//! and return the slots that must be written, never touching the store.

use sqlx::FromRow;

use super::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct Slot {
    pub id: i64,
    pub rank: i64,
}

impl Slot {
    pub fn new(id: i64, rank: i64) -> Self {
        Self { id, rank }
    }
}

/// What a move should do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// The item is not part of the scope
    Missing,
    /// The item already sits at the boundary
    Unchanged,
    /// Write these slots
    Apply(Vec<Slot>),
}

/// Sort by rank, ties broken by id
pub fn sort_slots(slots: &mut [Slot]) {
    slots.sort_by_key(|s| (s.rank, s.id));
}

/// Rank for an item appended at the bottom
pub fn next_rank(slots: &[Slot]) -> i64 {
    slots.iter().map(|s| s.rank).max().unwrap_or(0) + 1
}

/// Slots that must change so the scope reads `1..=N` in its current order.
pub fn plan_resequence(slots: &[Slot]) -> Vec<Slot> {
    let mut sorted = slots.to_vec();
    sort_slots(&mut sorted);

    sorted
        .into_iter()
        .enumerate()
        .filter_map(|(index, slot)| {
            let wanted = index as i64 + 1;
            (slot.rank != wanted).then_some(Slot::new(slot.id, wanted))
        })
        .collect()
}

/// Every slot moved one rank down to free rank 1, highest rank first so no two
/// rows share a rank between writes.
pub fn plan_shift_for_top(slots: &[Slot]) -> Vec<Slot> {
    let mut sorted = slots.to_vec();
    sort_slots(&mut sorted);

    sorted
        .into_iter()
        .rev()
        .map(|slot| Slot::new(slot.id, slot.rank + 1))
        .collect()
}

fn swap(current: Slot, neighbor: Slot) -> Vec<Slot> {
    vec![
        Slot::new(current.id, neighbor.rank),
        Slot::new(neighbor.id, current.rank),
    ]
}

/// Swap with the item whose rank is exactly one above or below.
///
/// Used for page sections, where ranks are kept dense; a gap next to the item
/// counts as a boundary.
pub fn plan_exact_swap(slots: &[Slot], id: i64, direction: Direction) -> Plan {
    let Some(current) = slots.iter().copied().find(|s| s.id == id) else {
        return Plan::Missing;
    };

    let wanted = match direction {
        Direction::Up => current.rank - 1,
        Direction::Down => current.rank + 1,
    };

    let neighbor = slots
        .iter()
        .copied()
        .filter(|s| s.id != id && s.rank == wanted)
        .min_by_key(|s| s.id);

    match neighbor {
        Some(neighbor) => Plan::Apply(swap(current, neighbor)),
        None => Plan::Unchanged,
    }
}

/// Swap with the immediate neighbour in (rank, id) order.
///
/// Used for the page menu, whose ranks may have gaps or ties. When any two
/// ranks in the scope tie, a plain exchange can land the item on the far side
/// of a third one, so the whole scope is first renumbered `1..=N` and the swap
/// applied on top of that.
pub fn plan_sequence_swap(slots: &[Slot], id: i64, direction: Direction) -> Plan {
    let mut sorted = slots.to_vec();
    sort_slots(&mut sorted);

    let Some(index) = sorted.iter().position(|s| s.id == id) else {
        return Plan::Missing;
    };

    let neighbor_index = match direction {
        Direction::Up => index.checked_sub(1),
        Direction::Down => Some(index + 1).filter(|i| *i < sorted.len()),
    };
    let Some(neighbor_index) = neighbor_index else {
        return Plan::Unchanged;
    };

    let current = sorted[index];
    let neighbor = sorted[neighbor_index];

    if !has_ties(&sorted) {
        return Plan::Apply(swap(current, neighbor));
    }

    let mut changes = plan_resequence(&sorted);
    changes.retain(|s| s.id != current.id && s.id != neighbor.id);
    changes.extend(swap(
        Slot::new(current.id, index as i64 + 1),
        Slot::new(neighbor.id, neighbor_index as i64 + 1),
    ));
    Plan::Apply(changes)
}

/// Whether two slots of a sorted scope share a rank
fn has_ties(sorted: &[Slot]) -> bool {
    sorted.windows(2).any(|pair| pair[0].rank == pair[1].rank)
}
