//! The inventory collaborator seen from the combat core.
//!
//! Reload handlers only ever *read* candidates. What they want taken out or
//! put back is returned as an [`InventoryDelta`] for the caller to apply.

use serde::{Deserialize, Serialize};

use crate::ammo::{Magazine, Round};

/// What an inventory entry holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemKind {
    /// A box magazine or belt, with its contents.
    Magazine(Magazine),
    /// A stack of identical loose rounds.
    Ammunition {
        /// The round every member of the stack shares.
        round: Round,
        /// How many are left.
        quantity: u32,
    },
}

/// One entry in the host's inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Unique within the inventory. Magazines reuse their own id.
    pub id: String,
    /// Contents.
    pub kind: ItemKind,
}

impl InventoryItem {
    /// Wrap a magazine, keyed by its id.
    pub fn magazine(magazine: Magazine) -> Self {
        Self {
            id: magazine.id.clone(),
            kind: ItemKind::Magazine(magazine),
        }
    }

    /// A loose stack of `quantity` copies of `round`.
    pub fn ammunition(id: impl Into<String>, round: Round, quantity: u32) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::Ammunition { round, quantity },
        }
    }

    /// The magazine, if this is one.
    pub fn as_magazine(&self) -> Option<&Magazine> {
        match &self.kind {
            ItemKind::Magazine(magazine) => Some(magazine),
            ItemKind::Ammunition { .. } => None,
        }
    }

    /// The stack's round and count, if this is loose ammunition.
    pub fn as_ammunition(&self) -> Option<(&Round, u32)> {
        match &self.kind {
            ItemKind::Ammunition { round, quantity } => Some((round, *quantity)),
            ItemKind::Magazine(_) => None,
        }
    }
}

/// Criteria a reload handler hands to the inventory.
///
/// An item matches when it is a box magazine of one of `magazine_systems`, a
/// belt with one of `belt_links`, a magazine whose rounds are all one of
/// `calibers` (when `match_contents` is set), or a loose ammunition stack of
/// one of `calibers` (when `loose_rounds` is set).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AmmoQuery {
    /// Calibers the weapon can fire.
    pub calibers: Vec<String>,
    /// Box magazine systems that fit the well.
    pub magazine_systems: Vec<String>,
    /// Belt link types the feed tray accepts.
    pub belt_links: Vec<String>,
    /// Also accept magazines by what they hold.
    pub match_contents: bool,
    /// Also accept loose ammunition stacks.
    pub loose_rounds: bool,
}

impl AmmoQuery {
    /// Loose stacks of `calibers` only.
    pub fn loose(calibers: &[String]) -> Self {
        Self {
            calibers: calibers.to_vec(),
            loose_rounds: true,
            ..Self::default()
        }
    }

    /// Whether `item` is a reload candidate. Empty loose stacks never are.
    pub fn matches(&self, item: &InventoryItem) -> bool {
        match &item.kind {
            ItemKind::Ammunition { round, quantity } => {
                self.loose_rounds && *quantity > 0 && self.caliber_ok(&round.caliber)
            }
            ItemKind::Magazine(magazine) => match &magazine.belt_link {
                Some(link) => self.belt_links.iter().any(|wanted| wanted.eq_ignore_ascii_case(link)),
                None => {
                    self.magazine_systems
                        .iter()
                        .any(|wanted| wanted.eq_ignore_ascii_case(&magazine.system))
                        || (self.match_contents
                            && !magazine.is_empty()
                            && magazine.calibers().all(|caliber| self.caliber_ok(caliber)))
                }
            },
        }
    }

    fn caliber_ok(&self, caliber: &str) -> bool {
        self.calibers
            .iter()
            .any(|wanted| wanted.eq_ignore_ascii_case(caliber))
    }
}

/// Take `quantity` from the item with `item_id` (magazines always count as one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Removal {
    /// Item to take from.
    pub item_id: String,
    /// Rounds to take, or 1 for a magazine.
    pub quantity: u32,
}

/// Inventory changes an action wants applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryDelta {
    /// Applied first.
    pub removed: Vec<Removal>,
    /// Applied after the removals.
    pub added: Vec<InventoryItem>,
}

impl InventoryDelta {
    /// Nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }

    /// Schedule a removal, merging with one already queued for the same item.
    pub fn remove(&mut self, item_id: impl Into<String>, quantity: u32) {
        let item_id = item_id.into();
        if let Some(existing) = self.removed.iter_mut().find(|r| r.item_id == item_id) {
            existing.quantity += quantity;
        } else {
            self.removed.push(Removal { item_id, quantity });
        }
    }

    /// Return loose rounds, grouping identical rounds into one stack each.
    pub fn return_rounds(&mut self, rounds: impl IntoIterator<Item = Round>) {
        for round in rounds {
            let stack = self.added.iter_mut().find_map(|item| match &mut item.kind {
                ItemKind::Ammunition { round: existing, quantity } if *existing == round => {
                    Some(quantity)
                }
                _ => None,
            });
            match stack {
                Some(quantity) => *quantity += 1,
                None => {
                    let id = format!("loose:{}:{}", round.caliber, round.variant);
                    self.added.push(InventoryItem::ammunition(id, round, 1));
                }
            }
        }
    }
}

/// The host's inventory as the combat core needs it.
pub trait Inventory {
    /// Every item `query` accepts, in inventory order.
    fn find_compatible(&self, query: &AmmoQuery) -> Vec<InventoryItem>;
    /// Take from an item. Unknown ids are ignored.
    fn remove(&mut self, removal: &Removal);
    /// Put an item back, merging loose stacks where the host can.
    fn add(&mut self, item: InventoryItem);

    /// Apply a delta: removals, then additions.
    fn commit(&mut self, delta: &InventoryDelta) {
        for removal in &delta.removed {
            self.remove(removal);
        }
        for item in &delta.added {
            self.add(item.clone());
        }
    }
}

/// Plain list-backed inventory used by the range host and tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryInventory {
    items: Vec<InventoryItem>,
}

impl MemoryInventory {
    /// Inventory holding `items` in order.
    pub fn new(items: Vec<InventoryItem>) -> Self {
        Self { items }
    }

    /// All items in order.
    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    /// Loose rounds of `caliber` across all stacks.
    pub fn loose_rounds(&self, caliber: &str) -> u32 {
        self.items
            .iter()
            .filter_map(InventoryItem::as_ammunition)
            .filter(|(round, _)| round.caliber.eq_ignore_ascii_case(caliber))
            .map(|(_, quantity)| quantity)
            .sum()
    }

    /// Magazines and belts only.
    pub fn magazines(&self) -> impl Iterator<Item = &Magazine> {
        self.items.iter().filter_map(InventoryItem::as_magazine)
    }

    /// Whether an item with `item_id` is present.
    pub fn contains(&self, item_id: &str) -> bool {
        self.items.iter().any(|item| item.id == item_id)
    }
}

impl Inventory for MemoryInventory {
    fn find_compatible(&self, query: &AmmoQuery) -> Vec<InventoryItem> {
        self.items
            .iter()
            .filter(|item| query.matches(item))
            .cloned()
            .collect()
    }

    fn remove(&mut self, removal: &Removal) {
        let Some(index) = self.items.iter().position(|item| item.id == removal.item_id) else {
            return;
        };
        let exhausted = match &mut self.items[index].kind {
            ItemKind::Magazine(_) => true,
            ItemKind::Ammunition { quantity, .. } => {
                *quantity = quantity.saturating_sub(removal.quantity);
                *quantity == 0
            }
        };
        if exhausted {
            self.items.remove(index);
        }
    }

    fn add(&mut self, item: InventoryItem) {
        if let ItemKind::Ammunition { round, quantity } = &item.kind {
            let stack = self.items.iter_mut().find_map(|existing| match &mut existing.kind {
                ItemKind::Ammunition {
                    round: existing_round,
                    quantity: existing_quantity,
                } if existing_round == round => Some(existing_quantity),
                _ => None,
            });
            if let Some(existing_quantity) = stack {
                *existing_quantity += quantity;
                return;
            }
        }
        self.items.push(item);
    }
}
