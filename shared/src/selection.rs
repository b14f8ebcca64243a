//! State that outlives the map screen: the selected item and the sheet's
//! snap position.

use serde::{Deserialize, Serialize};

use crate::item::ItemId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetPosition {
    #[default]
    Collapsed,
    Half,
    Full,
}

impl SheetPosition {
    #[must_use]
    pub const fn up(self) -> Self {
        match self {
            Self::Collapsed => Self::Half,
            Self::Half | Self::Full => Self::Full,
        }
    }

    #[must_use]
    pub const fn down(self) -> Self {
        match self {
            Self::Full => Self::Half,
            Self::Half | Self::Collapsed => Self::Collapsed,
        }
    }
}

/// What gets written to storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub selected: Option<ItemId>,
    #[serde(default)]
    pub sheet: SheetPosition,
}

impl SessionSnapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Last write wins. Mutations mark the store dirty; the owner drains it
/// with [`SelectionStore::take_dirty`] once per processed event.
#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    selected: Option<ItemId>,
    sheet: SheetPosition,
    dirty: bool,
}

impl SelectionStore {
    #[must_use]
    pub const fn selected(&self) -> Option<ItemId> {
        self.selected
    }

    #[must_use]
    pub const fn sheet(&self) -> SheetPosition {
        self.sheet
    }

    pub fn select(&mut self, id: ItemId) -> bool {
        if self.selected == Some(id) {
            return false;
        }
        self.selected = Some(id);
        self.dirty = true;
        true
    }

    pub fn clear(&mut self) -> bool {
        if self.selected.is_none() {
            return false;
        }
        self.selected = None;
        self.dirty = true;
        true
    }

    pub fn set_sheet(&mut self, position: SheetPosition) {
        if self.sheet != position {
            self.sheet = position;
            self.dirty = true;
        }
    }

    /// Loads persisted state without scheduling a write back.
    pub fn restore(&mut self, snapshot: SessionSnapshot) {
        self.selected = snapshot.selected;
        self.sheet = snapshot.sheet;
    }

    #[must_use]
    pub const fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            selected: self.selected,
            sheet: self.sheet,
        }
    }

    pub fn take_dirty(&mut self) -> Option<SessionSnapshot> {
        if std::mem::take(&mut self.dirty) {
            Some(self.snapshot())
        } else {
            None
        }
    }
}
