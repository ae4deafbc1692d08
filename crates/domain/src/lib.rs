//! Tacops domain model.
//!
//! Pure data and rules shared by the client core: item and equipment
//! definitions, the stash (unequipped pool + fixed equipment slots) with
//! deploy gating, and the economy records exchanged with the remote
//! record store. No I/O lives here.

pub mod economy;
pub mod error;
pub mod ids;
pub mod item;
pub mod stash;

pub use economy::{CachedProfile, ProfileRecord, DEFAULT_DISPLAY_NAME, STARTING_BALANCE};
pub use error::DomainError;
pub use ids::ItemId;
pub use item::{EquipSlot, Item, ItemCategory, Rarity};
pub use stash::{starter_stash, DeployBlocker, DeployCheck, ItemFilter, SortKey, Stash};
