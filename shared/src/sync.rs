//! Map/list synchronization.
//!
//! [`MapListSync`] owns every piece of engine state and is driven by plain
//! method calls. Side effects are returned as [`SyncAction`]s for the app
//! layer to turn into capability requests, which keeps this module free of
//! any shell plumbing and directly testable.
//!
//! State is split in two lifetimes:
//! - session: configuration, the selection store, the user location, the
//!   saved radius, the load history and the consumed deep links;
//! - screen: filters, fetch coordinator, sheet, render window and the
//!   derived list. Dropped on unmount.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::fetch::{
    FetchError, FetchOutcome, FetchVersion, LoadPhase, ResultFetchCoordinator, SearchQuery,
    SearchResponse,
};
use crate::filters::{FilterChange, SearchFilters};
use crate::geo::{zoom_for_radius, GeoBounds, LatLon};
use crate::error::AppError;
use crate::item::{Category, Item, ItemId};
use crate::location::{GeoFix, LocationError, LocationUpdate, UserLocation, UserLocationProvider};
use crate::selection::{SelectionStore, SessionSnapshot, SheetPosition};
use crate::sheet::{BottomSheetController, SheetLayout};
use crate::virtual_list::{RenderWindow, WindowState};

/// Reported and requested cameras closer than this count as the same view.
const CAMERA_CENTER_TOLERANCE_KM: f64 = 0.05;
const CAMERA_ZOOM_TOLERANCE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncAction {
    FetchResults {
        version: FetchVersion,
        query: SearchQuery,
    },
    FetchItem {
        item_id: ItemId,
    },
    AcquireLocation {
        attempt: u32,
        timeout_ms: u64,
        high_accuracy: bool,
    },
    PersistRadius {
        km: u32,
    },
    PersistSession(SessionSnapshot),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapCamera {
    pub center: LatLon,
    pub zoom: f64,
}

impl MapCamera {
    fn roughly_equals(&self, other: &Self) -> bool {
        self.center.distance_km(other.center) <= CAMERA_CENTER_TOLERANCE_KM
            && (self.zoom - other.zoom).abs() <= CAMERA_ZOOM_TOLERANCE
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    index: usize,
    distance_km: f64,
}

/// State local to one visible instance of the map screen.
#[derive(Debug, Clone)]
pub struct Screen {
    filters: SearchFilters,
    fetch: ResultFetchCoordinator,
    sheet: BottomSheetController,
    window: RenderWindow,
    entries: Vec<Entry>,
    pending_deep_link: Option<ItemId>,
    opened_from_deep_link: bool,
    detached: Option<Item>,
    reported_camera: Option<MapCamera>,
}

impl Screen {
    #[must_use]
    pub const fn filters(&self) -> &SearchFilters {
        &self.filters
    }

    #[must_use]
    pub const fn phase(&self) -> LoadPhase {
        self.fetch.phase()
    }

    #[must_use]
    pub fn error(&self) -> Option<&AppError> {
        self.fetch.error()
    }

    #[must_use]
    pub const fn has_loaded_once(&self) -> bool {
        self.fetch.has_loaded_once()
    }

    #[must_use]
    pub const fn radius_expanded(&self) -> bool {
        self.fetch.radius_expanded()
    }

    /// `None` means nationwide.
    #[must_use]
    pub fn displayed_radius_km(&self) -> Option<f64> {
        self.fetch.displayed_radius_km(self.filters.radius_km)
    }

    #[must_use]
    pub fn sheet_layout(&self) -> SheetLayout {
        self.sheet.layout()
    }

    #[must_use]
    pub fn window(&self) -> WindowState {
        self.window.state()
    }

    /// Filtered rows, nearest first, with their distance from the user.
    pub fn rows(&self) -> impl Iterator<Item = (&Item, f64)> + '_ {
        let items = self.fetch.items();
        self.entries
            .iter()
            .filter_map(move |e| items.get(e.index).map(|item| (item, e.distance_km)))
    }

    #[must_use]
    pub fn total_count(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn urgent_count(&self) -> usize {
        self.rows().filter(|(item, _)| item.urgent).count()
    }

    #[must_use]
    pub const fn opened_from_deep_link(&self) -> bool {
        self.opened_from_deep_link
    }

    #[must_use]
    pub const fn deep_link_pending(&self) -> bool {
        self.pending_deep_link.is_some()
    }

    #[must_use]
    pub fn reported_camera(&self) -> Option<MapCamera> {
        self.reported_camera
    }

    /// Looks an id up in the loaded list first, then in the individually
    /// fetched item.
    #[must_use]
    pub fn find_item(&self, id: ItemId) -> Option<&Item> {
        self.fetch
            .items()
            .iter()
            .find(|item| item.id == id)
            .or_else(|| self.detached.as_ref().filter(|item| item.id == id))
    }

    fn issue_fetch(&mut self, config: &EngineConfig, origin: LatLon) -> SyncAction {
        let query = SearchQuery::new(
            origin,
            &self.filters,
            config.nationwide_radius_km,
            &config.item_status,
            config.min_result_count,
        );
        let version = self.fetch.begin(query.clone());
        SyncAction::FetchResults { version, query }
    }

    fn rebuild(&mut self, origin: LatLon, generation: u64) {
        let filters = &self.filters;
        let mut entries: Vec<Entry> = self
            .fetch
            .items()
            .iter()
            .enumerate()
            .filter(|(_, item)| filters.matches(item))
            .map(|(index, item)| Entry {
                index,
                distance_km: origin.distance_km(item.location),
            })
            .collect();
        // Stable: equal distances keep arrival order.
        entries.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        self.entries = entries;
        self.window.reset(self.entries.len(), generation);
    }

    /// Drops the current selection if the loaded data can no longer back it.
    fn drop_unresolvable_selection(&mut self, store: &mut SelectionStore) {
        let Some(id) = store.selected() else {
            return;
        };
        if self.find_item(id).is_none() {
            tracing::info!(item_id = %id, "selected item not in results, clearing stale selection");
            store.clear();
            self.detached = None;
            self.opened_from_deep_link = false;
        }
    }

    fn clear_selection(&mut self, store: &mut SelectionStore) {
        store.clear();
        self.detached = None;
        self.opened_from_deep_link = false;
        if self.sheet.reset_to_collapsed() {
            store.set_sheet(SheetPosition::Collapsed);
        }
    }
}

pub struct MapListSync {
    config: EngineConfig,
    store: SelectionStore,
    session_touched: bool,
    location: UserLocationProvider,
    saved_radius_km: u32,
    radius_touched: bool,
    last_fetch_version: FetchVersion,
    loaded_once: bool,
    list_generation: u64,
    consumed_deep_links: HashSet<ItemId>,
    screen: Option<Screen>,
}

impl MapListSync {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            location: UserLocationProvider::new(config.default_location),
            saved_radius_km: config.default_radius_km,
            config,
            store: SelectionStore::default(),
            session_touched: false,
            radius_touched: false,
            last_fetch_version: FetchVersion::default(),
            loaded_once: false,
            list_generation: 0,
            consumed_deep_links: HashSet::new(),
            screen: None,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub const fn user_location(&self) -> UserLocation {
        self.location.current()
    }

    #[must_use]
    pub const fn selected(&self) -> Option<ItemId> {
        self.store.selected()
    }

    #[must_use]
    pub const fn sheet_position(&self) -> SheetPosition {
        self.store.sheet()
    }

    #[must_use]
    pub const fn saved_radius_km(&self) -> u32 {
        self.saved_radius_km
    }

    #[must_use]
    pub fn screen(&self) -> Option<&Screen> {
        self.screen.as_ref()
    }

    /// The selected item when it can be shown.
    #[must_use]
    pub fn selected_item(&self) -> Option<&Item> {
        let id = self.store.selected()?;
        self.screen.as_ref()?.find_item(id)
    }

    /// Where the map should look: both the user and the selected item, or
    /// the user at the zoom matching the searched radius.
    #[must_use]
    pub fn camera(&self) -> MapCamera {
        let user = self.location.current().position;
        if let Some(item) = self.selected_item() {
            if let Some(bounds) = GeoBounds::around(&[user, item.location]) {
                return MapCamera {
                    center: bounds.center(),
                    zoom: bounds.fit_zoom(),
                };
            }
        }
        let radius_km = self
            .screen
            .as_ref()
            .and_then(Screen::displayed_radius_km)
            .map_or(self.config.nationwide_radius_km, radius_ceil);
        MapCamera {
            center: user,
            zoom: zoom_for_radius(radius_km),
        }
    }

    /// True once the user has panned or zoomed the map away from where the
    /// engine put it.
    #[must_use]
    pub fn show_recenter(&self) -> bool {
        self.screen
            .as_ref()
            .and_then(Screen::reported_camera)
            .is_some_and(|reported| !reported.roughly_equals(&self.camera()))
    }

    pub fn apply_saved_radius(&mut self, km: Option<u32>) -> Vec<SyncAction> {
        let Some(km) = km else {
            return Vec::new();
        };
        if self.radius_touched {
            tracing::debug!(stored = km, "radius already chosen this session, ignoring stored value");
            return Vec::new();
        }
        self.saved_radius_km = km;
        let mut actions = Vec::new();
        let origin = self.location.current().position;
        if let Some(screen) = self.screen.as_mut() {
            if screen.filters.set_radius(km) == FilterChange::Refetch {
                actions.push(screen.issue_fetch(&self.config, origin));
            }
        }
        self.finish(actions)
    }

    pub fn restore_session(&mut self, snapshot: SessionSnapshot) -> Vec<SyncAction> {
        if self.session_touched {
            tracing::debug!("session changed before stored snapshot arrived, ignoring it");
            return Vec::new();
        }
        self.store.restore(snapshot);
        if let Some(screen) = self.screen.as_mut() {
            screen.sheet.set_position(snapshot.sheet);
            // Before the first load the id is resolved when results arrive.
            if screen.fetch.has_results() {
                screen.drop_unresolvable_selection(&mut self.store);
            }
        }
        self.finish(Vec::new())
    }

    pub fn mount(&mut self, deep_link: Option<ItemId>) -> Vec<SyncAction> {
        let mut actions = Vec::new();

        if self.screen.is_none() {
            let mut screen = Screen {
                filters: SearchFilters::new(self.saved_radius_km, self.config.max_categories),
                fetch: ResultFetchCoordinator::resume_after(
                    self.last_fetch_version,
                    self.loaded_once,
                ),
                sheet: BottomSheetController::new(self.config.sheet.clone(), self.store.sheet()),
                window: RenderWindow::new(self.config.window.clone()),
                entries: Vec::new(),
                pending_deep_link: None,
                opened_from_deep_link: false,
                detached: None,
                reported_camera: None,
            };

            if self.location.never_attempted() {
                let attempt = self.location.begin_acquisition();
                actions.push(self.acquire(attempt));
            }
            actions.push(screen.issue_fetch(&self.config, self.location.current().position));
            self.screen = Some(screen);
            tracing::debug!(?deep_link, "map screen mounted");
        }

        if let Some(id) = deep_link {
            actions.extend(self.apply_deep_link(id));
        }
        self.finish(actions)
    }

    pub fn unmount(&mut self) {
        if let Some(screen) = self.screen.take() {
            self.last_fetch_version = screen.fetch.latest_version();
            self.loaded_once |= screen.fetch.has_loaded_once();
            tracing::debug!("map screen unmounted");
        }
    }

    fn apply_deep_link(&mut self, id: ItemId) -> Vec<SyncAction> {
        if self.consumed_deep_links.contains(&id) {
            tracing::debug!(item_id = %id, "deep link already consumed");
            return Vec::new();
        }
        let Some(screen) = self.screen.as_mut() else {
            return Vec::new();
        };
        self.consumed_deep_links.insert(id);
        self.session_touched = true;

        if screen.fetch.items().iter().any(|item| item.id == id) {
            // A late answer for an earlier link must not take over.
            screen.pending_deep_link = None;
            screen.detached = None;
            self.store.select(id);
            screen.opened_from_deep_link = true;
            tracing::info!(item_id = %id, "deep link resolved from loaded results");
            return Vec::new();
        }

        // Persisted selection loses to the link even if the fetch fails.
        screen.clear_selection(&mut self.store);
        screen.pending_deep_link = Some(id);
        vec![SyncAction::FetchItem { item_id: id }]
    }

    pub fn location_resolved(
        &mut self,
        attempt: u32,
        result: Result<GeoFix, LocationError>,
    ) -> Vec<SyncAction> {
        let mut actions = Vec::new();
        if let LocationUpdate::Upgraded(location) = self.location.resolve(attempt, result) {
            let generation = self.next_generation();
            if let Some(screen) = self.screen.as_mut() {
                screen.rebuild(location.position, generation);
                actions.push(screen.issue_fetch(&self.config, location.position));
            }
        }
        self.finish(actions)
    }

    /// Re-acquires the device location and drops any selection or deep-link
    /// focus.
    pub fn recenter(&mut self) -> Vec<SyncAction> {
        let mut actions = Vec::new();
        self.session_touched = true;
        if let Some(screen) = self.screen.as_mut() {
            screen.pending_deep_link = None;
            screen.clear_selection(&mut self.store);
            screen.reported_camera = None;
        } else {
            self.store.clear();
        }
        let attempt = self.location.begin_acquisition();
        actions.push(self.acquire(attempt));
        self.finish(actions)
    }

    pub fn set_radius(&mut self, km: u32) -> Vec<SyncAction> {
        let origin = self.location.current().position;
        let Some(screen) = self.screen.as_mut() else {
            return Vec::new();
        };
        self.radius_touched = true;
        let mut actions = Vec::new();
        if screen.filters.set_radius(km) == FilterChange::Refetch {
            self.saved_radius_km = km;
            actions.push(SyncAction::PersistRadius { km });
            actions.push(screen.issue_fetch(&self.config, origin));
        }
        self.finish(actions)
    }

    pub fn toggle_category(&mut self, category: Category) -> Vec<SyncAction> {
        let origin = self.location.current().position;
        let Some(screen) = self.screen.as_mut() else {
            return Vec::new();
        };
        let mut actions = Vec::new();
        if screen.filters.toggle_category(category) == FilterChange::Refetch {
            actions.push(screen.issue_fetch(&self.config, origin));
        }
        self.finish(actions)
    }

    pub fn set_query(&mut self, query: String) -> Vec<SyncAction> {
        let origin = self.location.current().position;
        let generation = self.next_generation();
        let Some(screen) = self.screen.as_mut() else {
            return Vec::new();
        };
        if screen.filters.set_query(query) == FilterChange::Refilter {
            screen.rebuild(origin, generation);
        }
        self.finish(Vec::new())
    }

    pub fn retry(&mut self) -> Vec<SyncAction> {
        let origin = self.location.current().position;
        let Some(screen) = self.screen.as_mut() else {
            return Vec::new();
        };
        let action = screen.issue_fetch(&self.config, origin);
        self.finish(vec![action])
    }

    pub fn results_fetched(
        &mut self,
        version: FetchVersion,
        outcome: Result<SearchResponse, FetchError>,
    ) -> Vec<SyncAction> {
        let origin = self.location.current().position;
        let generation = self.next_generation();
        let Some(screen) = self.screen.as_mut() else {
            tracing::debug!(version = version.0, "results arrived after unmount");
            return Vec::new();
        };
        if let FetchOutcome::Loaded { .. } = screen.fetch.complete(version, outcome) {
            screen.rebuild(origin, generation);
            if screen
                .detached
                .as_ref()
                .is_some_and(|d| screen.fetch.items().iter().any(|item| item.id == d.id))
            {
                screen.detached = None;
            }
            if screen.pending_deep_link.is_none() {
                screen.drop_unresolvable_selection(&mut self.store);
            }
        }
        self.finish(Vec::new())
    }

    pub fn item_fetched(
        &mut self,
        item_id: ItemId,
        outcome: Result<Item, FetchError>,
    ) -> Vec<SyncAction> {
        let Some(screen) = self.screen.as_mut() else {
            return Vec::new();
        };
        if screen.pending_deep_link != Some(item_id) {
            tracing::debug!(item_id = %item_id, "ignoring item response nobody is waiting for");
            return Vec::new();
        }
        screen.pending_deep_link = None;

        match outcome {
            Ok(item) if item.id == item_id => {
                tracing::info!(item_id = %item_id, "deep link resolved by single-item fetch");
                if !screen.fetch.items().iter().any(|i| i.id == item_id) {
                    screen.detached = Some(item);
                }
                self.store.select(item_id);
                screen.opened_from_deep_link = true;
            }
            Ok(item) => {
                tracing::warn!(expected = %item_id, got = %item.id, "deep link fetch returned another item");
            }
            Err(e) => {
                let error = AppError::from(e);
                tracing::warn!(item_id = %item_id, error = %error, "deep link resolution failed");
            }
        }
        self.finish(Vec::new())
    }

    /// Marker or row tap. Never counts as a deep link.
    pub fn select(&mut self, id: ItemId) -> Vec<SyncAction> {
        let Some(screen) = self.screen.as_mut() else {
            return Vec::new();
        };
        if screen.find_item(id).is_none() {
            tracing::debug!(item_id = %id, "tap on unknown item ignored");
            return Vec::new();
        }
        self.session_touched = true;
        screen.pending_deep_link = None;
        screen.opened_from_deep_link = false;
        if screen.detached.as_ref().is_some_and(|d| d.id != id) {
            screen.detached = None;
        }
        self.store.select(id);
        self.finish(Vec::new())
    }

    /// Closes the detail preview and brings the list back.
    pub fn clear_selection(&mut self) -> Vec<SyncAction> {
        self.session_touched = true;
        match self.screen.as_mut() {
            Some(screen) => screen.clear_selection(&mut self.store),
            None => {
                self.store.clear();
            }
        }
        self.finish(Vec::new())
    }

    pub fn sheet_drag_started(&mut self, y: f64) {
        if let Some(screen) = self.screen.as_mut() {
            screen.sheet.drag_start(y);
        }
    }

    pub fn sheet_drag_moved(&mut self, y: f64) {
        if let Some(screen) = self.screen.as_mut() {
            screen.sheet.drag_move(y);
        }
    }

    pub fn sheet_drag_ended(&mut self, y: f64) -> Vec<SyncAction> {
        let Some(screen) = self.screen.as_mut() else {
            return Vec::new();
        };
        if let Some(position) = screen.sheet.drag_end(y) {
            self.session_touched = true;
            self.store.set_sheet(position);
        }
        self.finish(Vec::new())
    }

    pub fn viewport_resized(&mut self, viewport_height_px: f64, chrome_height_px: f64) {
        if let Some(screen) = self.screen.as_mut() {
            screen.sheet.resize(viewport_height_px, chrome_height_px);
        }
    }

    pub fn list_scrolled(&mut self, scroll_top_px: f64) {
        if let Some(screen) = self.screen.as_mut() {
            screen.window.observe_scroll(scroll_top_px);
        }
    }

    pub fn list_resized(&mut self, container_height_px: f64) {
        if let Some(screen) = self.screen.as_mut() {
            screen.window.observe_resize(container_height_px);
        }
    }

    /// Returns true when the render window grew.
    pub fn animation_frame(&mut self) -> bool {
        self.screen
            .as_mut()
            .is_some_and(|screen| screen.window.on_frame())
    }

    pub fn map_viewport_changed(&mut self, camera: MapCamera) {
        if let Some(screen) = self.screen.as_mut() {
            screen.reported_camera = Some(camera);
        }
    }

    fn acquire(&self, attempt: u32) -> SyncAction {
        SyncAction::AcquireLocation {
            attempt,
            timeout_ms: self.config.location_timeout_ms,
            high_accuracy: self.config.location_high_accuracy,
        }
    }

    fn next_generation(&mut self) -> u64 {
        self.list_generation += 1;
        self.list_generation
    }

    /// Appends at most one session write for everything the call changed.
    fn finish(&mut self, mut actions: Vec<SyncAction>) -> Vec<SyncAction> {
        if let Some(snapshot) = self.store.take_dirty() {
            actions.push(SyncAction::PersistSession(snapshot));
        }
        actions
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn radius_ceil(km: f64) -> u32 {
    km.ceil().clamp(0.0, f64::from(u32::MAX)) as u32
}
