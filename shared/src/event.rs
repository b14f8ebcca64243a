use serde::{Deserialize, Serialize};

use crate::fetch::{FetchError, FetchVersion, SearchResponse};
use crate::item::{Category, Item, ItemId};
use crate::location::{GeoFix, LocationError};

/// Raw result of a key/value read, with the shell's error flattened to text.
pub type StoredValue = Result<Option<Vec<u8>>, String>;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // Lifecycle
    AppStarted {
        /// JSON overrides for `EngineConfig`.
        #[serde(default)]
        config: Option<String>,
    },
    SavedRadiusLoaded(StoredValue),
    SessionLoaded(StoredValue),
    ScreenMounted {
        #[serde(default)]
        deep_link: Option<ItemId>,
    },
    ScreenUnmounted,

    // Location
    LocationResolved {
        attempt: u32,
        outcome: Result<GeoFix, LocationError>,
    },
    RecenterRequested,

    // Filters
    RadiusChanged {
        km: u32,
    },
    CategoryToggled {
        category: Category,
    },
    QueryChanged {
        query: String,
    },
    RetryRequested,

    // Data source responses
    ResultsFetched {
        version: FetchVersion,
        outcome: Result<SearchResponse, FetchError>,
    },
    ItemFetched {
        item_id: ItemId,
        outcome: Result<Item, FetchError>,
    },

    // Selection
    MarkerTapped {
        item_id: ItemId,
    },
    RowTapped {
        item_id: ItemId,
    },
    PreviewClosed,

    // Sheet and list geometry
    SheetDragStarted {
        y: f64,
    },
    SheetDragMoved {
        y: f64,
    },
    SheetDragEnded {
        y: f64,
    },
    ViewportResized {
        height_px: f64,
        chrome_height_px: f64,
    },
    ListScrolled {
        scroll_top_px: f64,
    },
    ListResized {
        height_px: f64,
    },
    AnimationFrame,

    // Map surface
    MapViewportChanged {
        center_lat: f64,
        center_lon: f64,
        zoom: f64,
    },

    StorageWritten {
        key: String,
        outcome: Result<(), String>,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AppStarted { .. } => "app_started",
            Self::SavedRadiusLoaded(_) => "saved_radius_loaded",
            Self::SessionLoaded(_) => "session_loaded",
            Self::ScreenMounted { .. } => "screen_mounted",
            Self::ScreenUnmounted => "screen_unmounted",
            Self::LocationResolved { .. } => "location_resolved",
            Self::RecenterRequested => "recenter_requested",
            Self::RadiusChanged { .. } => "radius_changed",
            Self::CategoryToggled { .. } => "category_toggled",
            Self::QueryChanged { .. } => "query_changed",
            Self::RetryRequested => "retry_requested",
            Self::ResultsFetched { .. } => "results_fetched",
            Self::ItemFetched { .. } => "item_fetched",
            Self::MarkerTapped { .. } => "marker_tapped",
            Self::RowTapped { .. } => "row_tapped",
            Self::PreviewClosed => "preview_closed",
            Self::SheetDragStarted { .. } => "sheet_drag_started",
            Self::SheetDragMoved { .. } => "sheet_drag_moved",
            Self::SheetDragEnded { .. } => "sheet_drag_ended",
            Self::ViewportResized { .. } => "viewport_resized",
            Self::ListScrolled { .. } => "list_scrolled",
            Self::ListResized { .. } => "list_resized",
            Self::AnimationFrame => "animation_frame",
            Self::MapViewportChanged { .. } => "map_viewport_changed",
            Self::StorageWritten { .. } => "storage_written",
        }
    }

    /// High-frequency gesture and layout events, logged at trace level only.
    #[must_use]
    pub const fn is_high_frequency(&self) -> bool {
        matches!(
            self,
            Self::SheetDragMoved { .. }
                | Self::ListScrolled { .. }
                | Self::AnimationFrame
                | Self::MapViewportChanged { .. }
        )
    }
}
