//! Item entity - everything that can sit in the stash or an equipment slot.
//!
//! This is a data-carrying struct with no invariants to protect beyond
//! those the `Stash` enforces (an item lives in the pool or in exactly
//! one slot). Category-specific extras (armor capacity, backpack weight
//! bonus, ammo grade) are optional fields rather than subtypes.

use serde::{Deserialize, Serialize};

use crate::ids::ItemId;

/// Item rarity tier, ordered from most to least common.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Legendary,
}

impl Rarity {
    /// Numeric rank used for sorting (higher is rarer).
    pub fn rank(&self) -> u8 {
        match self {
            Self::Common => 1,
            Self::Uncommon => 2,
            Self::Rare => 3,
            Self::Legendary => 4,
        }
    }

    /// UI accent color for this tier.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Common => "#9ca3af",
            Self::Uncommon => "#3b82f6",
            Self::Rare => "#8b5cf6",
            Self::Legendary => "#eab308",
        }
    }
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Common => write!(f, "Common"),
            Self::Uncommon => write!(f, "Uncommon"),
            Self::Rare => write!(f, "Rare"),
            Self::Legendary => write!(f, "Legendary"),
        }
    }
}

/// Item category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemCategory {
    Weapon,
    Armor,
    Bag,
    AmmoGrade,
    Ammo,
    Consumable,
    Misc,
}

impl ItemCategory {
    /// Grouping rank for the "all categories" stash view.
    pub fn sort_rank(&self) -> u8 {
        match self {
            Self::Weapon => 1,
            Self::Armor => 2,
            Self::Bag => 3,
            Self::AmmoGrade => 4,
            Self::Ammo => 5,
            Self::Consumable => 6,
            Self::Misc => 7,
        }
    }

    /// The slot this category equips into, if any.
    pub fn default_slot(&self) -> Option<EquipSlot> {
        match self {
            Self::Weapon => Some(EquipSlot::Primary),
            Self::Armor => Some(EquipSlot::Armor),
            Self::Bag => Some(EquipSlot::Backpack),
            Self::AmmoGrade => Some(EquipSlot::AmmoGrade),
            _ => None,
        }
    }
}

/// The four equipment slots on a loadout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EquipSlot {
    Primary,
    Armor,
    Backpack,
    AmmoGrade,
}

impl EquipSlot {
    pub const ALL: [EquipSlot; 4] = [
        EquipSlot::Primary,
        EquipSlot::Armor,
        EquipSlot::Backpack,
        EquipSlot::AmmoGrade,
    ];
}

/// An object that can be stashed, equipped, and carried into a deploy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub category: ItemCategory,
    pub rarity: Rarity,
    /// Carry weight in kg.
    pub weight: f32,
    /// Market value in credits.
    pub value: i64,
    pub durability: u32,
    pub max_durability: u32,
    pub description: String,
    pub tags: Vec<String>,
    /// Armor only: maximum armor points this piece provides.
    pub armor_capacity: Option<u32>,
    /// Bag only: extra carry weight granted while equipped.
    pub weight_bonus: Option<f32>,
}

impl Item {
    pub fn new(name: impl Into<String>, category: ItemCategory, rarity: Rarity) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            category,
            rarity,
            weight: 1.0,
            value: 0,
            durability: 100,
            max_durability: 100,
            description: String::new(),
            tags: Vec::new(),
            armor_capacity: None,
            weight_bonus: None,
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = value;
        self
    }

    pub fn with_durability(mut self, durability: u32, max_durability: u32) -> Self {
        self.durability = durability;
        self.max_durability = max_durability;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_armor_capacity(mut self, capacity: u32) -> Self {
        self.armor_capacity = Some(capacity);
        self
    }

    pub fn with_weight_bonus(mut self, bonus: f32) -> Self {
        self.weight_bonus = Some(bonus);
        self
    }

    /// Remaining durability as a fraction of max, 0.0 when max is zero.
    pub fn durability_fraction(&self) -> f32 {
        if self.max_durability == 0 {
            0.0
        } else {
            self.durability as f32 / self.max_durability as f32
        }
    }
}
