use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use laneview_protocol::{ItemId, Placement, TimeRange, Timestamp};

/// Sub-row assignment for the items of one lane.
///
/// Greedy interval colouring: items are visited by start time; a row is
/// free again once its last item has ended (`end <= start`), and each item
/// takes the lowest free row or opens a new one. For intervals visited in
/// start order this uses exactly as many rows as the largest set of
/// mutually overlapping items.
///
/// Instants never hold a row past their own time, so a block starting at
/// the same instant may share the row. Two instants at exactly the same
/// time are the one collision that still needs separate rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaneLayout {
    row_count: u32,
    placements: Vec<Placement>,
}

#[derive(Debug, Clone, Copy)]
struct BusyRow {
    end: Timestamp,
    row: u32,
}

impl PartialEq for BusyRow {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BusyRow {}

impl PartialOrd for BusyRow {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BusyRow {
    fn cmp(&self, other: &Self) -> Ordering {
        self.end
            .total_cmp(&other.end)
            .then(self.row.cmp(&other.row))
    }
}

impl LaneLayout {
    pub fn assign(entries: impl IntoIterator<Item = (ItemId, TimeRange)>) -> Self {
        let mut items: Vec<(ItemId, TimeRange)> = entries.into_iter().collect();
        // Index output is already in this order; the stable sort is then a
        // single linear pass.
        items.sort_by(|a, b| a.1.start.total_cmp(&b.1.start));

        let mut busy: BinaryHeap<Reverse<BusyRow>> = BinaryHeap::new();
        let mut free: BinaryHeap<Reverse<u32>> = BinaryHeap::new();
        // Time of the instant last placed on each row, if the row's last
        // item was an instant.
        let mut last_instant: Vec<Option<Timestamp>> = Vec::new();
        let mut placements = Vec::with_capacity(items.len());
        let mut skipped = Vec::new();

        for (id, span) in items {
            while let Some(Reverse(top)) = busy.peek() {
                if top.end > span.start {
                    break;
                }
                free.push(Reverse(top.row));
                busy.pop();
            }

            let mut chosen = None;
            while let Some(Reverse(row)) = free.pop() {
                let collides =
                    span.is_instant() && last_instant[row as usize] == Some(span.start);
                if collides {
                    skipped.push(row);
                } else {
                    chosen = Some(row);
                    break;
                }
            }
            free.extend(skipped.drain(..).map(Reverse));

            let row = chosen.unwrap_or_else(|| {
                last_instant.push(None);
                (last_instant.len() - 1) as u32
            });
            last_instant[row as usize] = span.is_instant().then_some(span.start);
            busy.push(Reverse(BusyRow { end: span.end, row }));
            placements.push(Placement { item: id, row });
        }

        Self {
            row_count: last_instant.len() as u32,
            placements,
        }
    }

    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// Placements in start order.
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn row_of(&self, item: ItemId) -> Option<u32> {
        self.placements
            .iter()
            .find(|p| p.item == item)
            .map(|p| p.row)
    }

    pub fn into_placements(self) -> Vec<Placement> {
        self.placements
    }
}
