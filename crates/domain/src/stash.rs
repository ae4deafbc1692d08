//! Stash - the unequipped item pool plus the fixed four equipment slots.
//!
//! Invariant: an item is either in the pool or in exactly one slot,
//! never both and never in two slots. `equip` enforces this atomically
//! by returning any slot occupant to the pool before moving the new
//! item out of it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::ItemId;
use crate::item::{EquipSlot, Item, ItemCategory, Rarity};

/// Base carry weight before any backpack bonus.
const BASE_MAX_WEIGHT: f32 = 50.0;

/// Primary weapons below this fraction of max durability block deploy.
const MIN_DEPLOY_DURABILITY: f32 = 0.3;

/// A reason the current loadout cannot deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeployBlocker {
    MissingPrimaryWeapon,
    MissingAmmoGrade,
    PrimaryDurabilityLow,
}

impl std::fmt::Display for DeployBlocker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPrimaryWeapon => write!(f, "No primary weapon equipped"),
            Self::MissingAmmoGrade => write!(f, "No ammo grade selected"),
            Self::PrimaryDurabilityLow => write!(f, "Primary weapon durability too low"),
        }
    }
}

/// Result of a deploy-readiness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployCheck {
    pub ok: bool,
    /// All applicable blockers, in a fixed documented order.
    pub reasons: Vec<DeployBlocker>,
}

/// View filter for the stash item list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFilter {
    /// `None` means "all categories" and enables category grouping.
    pub category: Option<ItemCategory>,
    pub rarity: Option<Rarity>,
    pub search: String,
}

/// Sort key applied when a single category filter is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    Rarity,
    Weight,
    Value,
}

/// Unequipped pool + equipment slots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stash {
    items: Vec<Item>,
    equipped: HashMap<EquipSlot, Item>,
}

impl Stash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item to the unequipped pool, returning its id.
    pub fn add_item(&mut self, item: Item) -> ItemId {
        let id = item.id;
        self.items.push(item);
        id
    }

    /// Remove an item from the pool. `None` if the id is not pooled.
    pub fn remove_item(&mut self, item_id: ItemId) -> Option<Item> {
        let index = self.items.iter().position(|i| i.id == item_id)?;
        Some(self.items.remove(index))
    }

    pub fn get_item(&self, item_id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn equipped(&self, slot: EquipSlot) -> Option<&Item> {
        self.equipped.get(&slot)
    }

    pub fn pool_len(&self) -> usize {
        self.items.len()
    }

    /// Move a pooled item into a slot. Any current occupant returns to
    /// the pool first. Returns false when the id is not in the pool.
    pub fn equip(&mut self, item_id: ItemId, slot: EquipSlot) -> bool {
        if self.get_item(item_id).is_none() {
            return false;
        }
        if let Some(previous) = self.equipped.remove(&slot) {
            self.items.push(previous);
        }
        // Presence was checked above; remove cannot fail here.
        if let Some(item) = self.remove_item(item_id) {
            self.equipped.insert(slot, item);
            true
        } else {
            false
        }
    }

    /// Equip a pooled item into its category's default slot.
    pub fn equip_default(&mut self, item_id: ItemId) -> Result<EquipSlot, DomainError> {
        let category = self
            .get_item(item_id)
            .ok_or_else(|| DomainError::not_found("Item", item_id.to_string()))?
            .category;
        let slot = category.default_slot().ok_or_else(|| {
            DomainError::constraint(format!("{category:?} items cannot be equipped"))
        })?;
        self.equip(item_id, slot);
        Ok(slot)
    }

    /// Empty a slot back into the pool, returning the item that was held.
    pub fn unequip(&mut self, slot: EquipSlot) -> Option<Item> {
        let item = self.equipped.remove(&slot)?;
        self.items.push(item.clone());
        Some(item)
    }

    /// Combined weight of pooled and equipped items.
    pub fn total_weight(&self) -> f32 {
        let pooled: f32 = self.items.iter().map(|i| i.weight).sum();
        let equipped: f32 = self.equipped.values().map(|i| i.weight).sum();
        pooled + equipped
    }

    /// Weight of equipped items only.
    pub fn equipped_weight(&self) -> f32 {
        self.equipped.values().map(|i| i.weight).sum()
    }

    /// Carry limit: base 50 plus the equipped backpack's bonus.
    pub fn max_weight(&self) -> f32 {
        let bonus = self
            .equipped
            .get(&EquipSlot::Backpack)
            .and_then(|b| b.weight_bonus)
            .unwrap_or(0.0);
        BASE_MAX_WEIGHT + bonus
    }

    /// Armor points granted by the equipped armor piece.
    pub fn armor_capacity(&self) -> u32 {
        self.equipped
            .get(&EquipSlot::Armor)
            .and_then(|a| a.armor_capacity)
            .unwrap_or(0)
    }

    /// Deploy gating. All applicable blockers are reported together, in
    /// order: missing primary, missing ammo grade, low primary durability.
    pub fn can_deploy(&self) -> DeployCheck {
        let mut reasons = Vec::new();

        let primary = self.equipped.get(&EquipSlot::Primary);
        if primary.is_none() {
            reasons.push(DeployBlocker::MissingPrimaryWeapon);
        }
        if self.equipped.get(&EquipSlot::AmmoGrade).is_none() {
            reasons.push(DeployBlocker::MissingAmmoGrade);
        }
        if let Some(weapon) = primary {
            if weapon.durability_fraction() < MIN_DEPLOY_DURABILITY {
                reasons.push(DeployBlocker::PrimaryDurabilityLow);
            }
        }

        DeployCheck {
            ok: reasons.is_empty(),
            reasons,
        }
    }

    /// Deploy gating as a rejected operation, for callers that want an
    /// error naming every blocker rather than a checklist.
    pub fn validate_deploy(&self) -> Result<(), DomainError> {
        let check = self.can_deploy();
        if check.ok {
            return Ok(());
        }
        let reasons: Vec<String> = check.reasons.iter().map(ToString::to_string).collect();
        Err(DomainError::validation(reasons.join("; ")))
    }

    /// Filtered, sorted view of the pool.
    ///
    /// With no category filter the list groups by category rank, then
    /// descending rarity, then name. With a category selected the single
    /// `sort_key` applies instead.
    pub fn filtered_view(&self, filter: &ItemFilter, sort_key: SortKey) -> Vec<&Item> {
        let search = filter.search.to_lowercase();
        let mut view: Vec<&Item> = self
            .items
            .iter()
            .filter(|i| filter.category.is_none_or(|c| i.category == c))
            .filter(|i| filter.rarity.is_none_or(|r| i.rarity == r))
            .filter(|i| {
                search.is_empty()
                    || i.name.to_lowercase().contains(&search)
                    || i.description.to_lowercase().contains(&search)
                    || i.tags.iter().any(|t| t.to_lowercase().contains(&search))
            })
            .collect();

        if filter.category.is_none() {
            view.sort_by(|a, b| {
                a.category
                    .sort_rank()
                    .cmp(&b.category.sort_rank())
                    .then(b.rarity.rank().cmp(&a.rarity.rank()))
                    .then_with(|| a.name.cmp(&b.name))
            });
        } else {
            view.sort_by(|a, b| match sort_key {
                SortKey::Name => a.name.cmp(&b.name),
                SortKey::Rarity => b.rarity.rank().cmp(&a.rarity.rank()),
                SortKey::Weight => a.weight.total_cmp(&b.weight),
                SortKey::Value => b.value.cmp(&a.value),
            });
        }

        view
    }
}

/// A small seeded loadout for a fresh profile, matching the starter kit
/// handed to first-time players.
pub fn starter_stash() -> Stash {
    let mut stash = Stash::new();
    stash.add_item(
        Item::new("M4A1", ItemCategory::Weapon, Rarity::Common)
            .with_weight(3.5)
            .with_value(0)
            .with_description("American carbine with balanced rate of fire and accuracy.")
            .with_tags(&["assault", "automatic", "5.56"]),
    );
    stash.add_item(
        Item::new("AKM", ItemCategory::Weapon, Rarity::Uncommon)
            .with_weight(4.3)
            .with_value(400)
            .with_description("Soviet 7.62mm rifle, rugged and reliable in any climate.")
            .with_tags(&["assault", "automatic", "7.62"]),
    );
    stash.add_item(
        Item::new("Light Vest", ItemCategory::Armor, Rarity::Common)
            .with_weight(2.0)
            .with_value(150)
            .with_armor_capacity(50),
    );
    stash.add_item(
        Item::new("Field Pack", ItemCategory::Bag, Rarity::Common)
            .with_weight(1.5)
            .with_value(100)
            .with_weight_bonus(20.0),
    );
    stash.add_item(
        Item::new("Standard FMJ", ItemCategory::AmmoGrade, Rarity::Common)
            .with_weight(0.5)
            .with_value(50),
    );
    stash
}
