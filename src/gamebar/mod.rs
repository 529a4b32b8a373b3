//! Collection Slot Bar
//!
//! Fixed row of slots that picked collectables fly into:
//! - `try_insert` takes the leftmost free slot, no overflow buffer
//! - `detect_and_resolve_match` clears one same-type triple per pass
//! - `compact_left` sweeps left to right, filling every empty slot it can
//! - `is_full` is the game-over condition once no match is left
//!
//! A slot flagged `animating` is skipped by matching and compaction until
//! its owner reports the animation finished.

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::constants::{DESTROY_POSITION_UP_DIFF, MATCH_SIZE, SLOT_SPACING};
use crate::layout::PlacementId;
use crate::level::BuildingType;

/// An item picked off the map, identified by the placement it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collectable {
    pub id: PlacementId,
    pub building_type: BuildingType,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    item: Option<Collectable>,
    animating: bool,
    anchor: Vec3,
}

impl Slot {
    fn new(anchor: Vec3) -> Self {
        Self {
            item: None,
            animating: false,
            anchor,
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.item.is_some()
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    pub fn item(&self) -> Option<&Collectable> {
        self.item.as_ref()
    }

    /// Where an item resting in this slot sits
    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }

    fn is_settled_item(&self) -> bool {
        self.item.is_some() && !self.animating
    }

    fn place(&mut self, mut item: Collectable) {
        item.position = self.anchor;
        self.item = Some(item);
        self.animating = true;
    }

    fn clear(&mut self) {
        self.item = None;
        self.animating = false;
    }
}

/// A triple lifted out of the bar, on its way to the merge point
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResolution {
    pub building_type: BuildingType,
    pub slots: [usize; MATCH_SIZE],
    pub items: Vec<Collectable>,
    /// Centroid of the three items, lifted on Y
    pub target: Vec3,
}

/// One compaction hop
#[derive(Debug, Clone, PartialEq)]
pub struct CompactMove {
    pub from: usize,
    pub to: usize,
    pub item: Collectable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotBar {
    slots: Vec<Slot>,
    /// Height above the triple's centroid where merged items meet
    merge_lift: f32,
}

impl SlotBar {
    pub fn new(slot_count: usize) -> Self {
        Self::with_origin(slot_count, Vec3::ZERO)
    }

    /// Slots laid out along +X from `origin`
    pub fn with_origin(slot_count: usize, origin: Vec3) -> Self {
        Self {
            slots: (0..slot_count)
                .map(|i| Slot::new(origin + Vec3::X * (i as f32 * SLOT_SPACING)))
                .collect(),
            merge_lift: DESTROY_POSITION_UP_DIFF,
        }
    }

    pub fn with_merge_lift(mut self, merge_lift: f32) -> Self {
        self.merge_lift = merge_lift;
        self
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_occupied()).count()
    }

    pub fn count_of(&self, building_type: BuildingType) -> usize {
        self.slots
            .iter()
            .filter_map(Slot::item)
            .filter(|item| item.building_type == building_type)
            .count()
    }

    pub fn first_empty(&self) -> Option<usize> {
        self.slots.iter().position(|s| !s.is_occupied())
    }

    /// Put `item` in the leftmost free slot and mark that slot animating
    pub fn try_insert(&mut self, item: Collectable) -> Option<usize> {
        let index = self.first_empty()?;
        debug!("Slot {} <- {:?} {:?}", index, item.building_type, item.id);
        self.slots[index].place(item);
        Some(index)
    }

    /// Returns false if the slot does not exist or was not animating
    pub fn finish_animation(&mut self, index: usize) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if slot.animating => {
                slot.animating = false;
                true
            }
            _ => false,
        }
    }

    /// Resolve at most one triple: the three leftmost settled items of the
    /// first type (by leftmost slot) that has at least three settled items
    pub fn detect_and_resolve_match(&mut self) -> Option<MatchResolution> {
        let mut partitions: Vec<(BuildingType, Vec<usize>)> = Vec::new();
        for (index, slot) in self.slots.iter().enumerate() {
            if !slot.is_settled_item() {
                continue;
            }
            let Some(item) = slot.item() else { continue };
            match partitions.iter_mut().find(|(t, _)| *t == item.building_type) {
                Some((_, members)) => members.push(index),
                None => partitions.push((item.building_type, vec![index])),
            }
        }

        let (building_type, members) = partitions
            .into_iter()
            .find(|(_, members)| members.len() >= MATCH_SIZE)?;

        let mut slots = [0usize; MATCH_SIZE];
        slots.copy_from_slice(&members[..MATCH_SIZE]);

        let items: Vec<Collectable> = slots
            .iter()
            .filter_map(|&i| self.slots[i].item.take())
            .collect();
        for &i in &slots {
            self.slots[i].clear();
        }

        let centroid = items.iter().map(|c| c.position).sum::<Vec3>() / MATCH_SIZE as f32;
        let target = centroid + Vec3::Y * self.merge_lift;
        debug!("Match {:?} in slots {:?}", building_type, slots);

        Some(MatchResolution {
            building_type,
            slots,
            items,
            target,
        })
    }

    /// One left-to-right sweep: each empty slot takes the nearest settled
    /// item to its right. Every target slot is left animating.
    pub fn compact_left(&mut self) -> Vec<CompactMove> {
        let n = self.slots.len();
        let mut moves = Vec::new();
        for to in 0..n.saturating_sub(1) {
            if self.slots[to].is_occupied() {
                continue;
            }
            let Some(from) = (to + 1..n).find(|&j| self.slots[j].is_settled_item()) else {
                continue;
            };
            let Some(item) = self.slots[from].item.take() else {
                continue;
            };
            self.slots[from].clear();
            self.slots[to].place(item);
            if let Some(moved) = self.slots[to].item.clone() {
                moves.push(CompactMove { from, to, item: moved });
            }
        }
        moves
    }

    /// Every slot occupied and none mid-animation
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(|s| s.is_occupied() && !s.is_animating())
    }

    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.clear();
        }
    }

    /// Settled item counts per type, for debugging overlays
    pub fn settled_counts(&self) -> BTreeMap<BuildingType, usize> {
        let mut counts = BTreeMap::new();
        for item in self.slots.iter().filter(|s| s.is_settled_item()).filter_map(Slot::item) {
            *counts.entry(item.building_type).or_insert(0) += 1;
        }
        counts
    }
}
