//! View model handed to the shell on every render.

use geojson::{feature, Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};

use crate::decluster::{decluster, MarkerPoint};
use crate::error::UserFacingError;
use crate::fetch::LoadPhase;
use crate::geo::{format_distance, format_time_ago, LatLon};
use crate::item::{Category, Item, UnixTimeMs};
use crate::selection::SheetPosition;
use crate::sheet::SheetLayout;
use crate::sync::{MapListSync, Screen};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MarkerView {
    pub id: u64,
    /// Display position after declustering.
    pub lat: f64,
    pub lon: f64,
    pub icon: String,
    pub urgent: bool,
    pub selected: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MapView {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: f64,
    pub user_lat: f64,
    pub user_lon: f64,
    pub user_location_is_real: bool,
    pub markers: Vec<MarkerView>,
    /// Same markers as a GeoJSON FeatureCollection for map SDKs that take
    /// sources directly.
    pub markers_geojson: String,
    pub show_recenter: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SheetView {
    pub position: SheetPosition,
    pub height_px: f64,
    pub dragging: bool,
    pub animate: bool,
}

impl From<SheetLayout> for SheetView {
    fn from(layout: SheetLayout) -> Self {
        Self {
            position: layout.position,
            height_px: layout.height_px,
            dragging: layout.dragging,
            animate: layout.animate,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RowView {
    pub id: u64,
    pub title: String,
    pub category: String,
    pub icon: String,
    pub price_text: String,
    pub distance_text: String,
    pub time_ago: String,
    pub urgent: bool,
    pub creator_name: String,
    pub creator_rating: Option<f32>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ListView {
    /// Only the materialized prefix of the list.
    pub rows: Vec<RowView>,
    pub total_count: usize,
    pub spacer_height_px: f64,
    pub needs_frame: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ItemDetail {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub icon: String,
    pub price_text: String,
    pub distance_text: String,
    pub time_ago: String,
    pub urgent: bool,
    pub lat: f64,
    pub lon: f64,
    pub creator_name: String,
    pub creator_rating: Option<f32>,
    pub creator_avatar_url: Option<String>,
    pub opened_from_deep_link: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CategoryChip {
    pub value: String,
    pub label: String,
    pub icon: String,
    pub selected: bool,
    /// False for unselected chips once the cap is reached.
    pub enabled: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FilterView {
    pub radius_km: u32,
    pub radius_label: String,
    pub radius_expanded: bool,
    pub categories: Vec<CategoryChip>,
    pub query: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Badges {
    pub total: usize,
    pub urgent: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoadStatus {
    Idle,
    Skeleton,
    Refreshing,
    Empty { can_retry: bool },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScreenView {
    pub map: MapView,
    pub sheet: SheetView,
    /// Hidden while an item preview is open.
    pub list: Option<ListView>,
    pub preview: Option<ItemDetail>,
    pub filters: FilterView,
    pub badges: Badges,
    pub status: LoadStatus,
    pub error: Option<UserFacingError>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    /// `None` while the map screen is not mounted.
    pub screen: Option<ScreenView>,
}

#[must_use]
pub fn build_view(sync: &MapListSync, now: UnixTimeMs) -> ViewModel {
    ViewModel {
        screen: sync.screen().map(|screen| build_screen(sync, screen, now)),
    }
}

fn build_screen(sync: &MapListSync, screen: &Screen, now: UnixTimeMs) -> ScreenView {
    let user = sync.user_location().position;
    let preview = sync
        .selected_item()
        .map(|item| build_detail(item, user, screen.opened_from_deep_link(), now));

    let list = if preview.is_some() {
        None
    } else {
        let window = screen.window();
        Some(ListView {
            rows: screen
                .rows()
                .take(window.render_end)
                .map(|(item, distance_km)| build_row(item, distance_km, now))
                .collect(),
            total_count: screen.total_count(),
            spacer_height_px: window.spacer_height_px,
            needs_frame: window.needs_frame,
        })
    };

    ScreenView {
        map: build_map(sync, screen),
        sheet: screen.sheet_layout().into(),
        list,
        preview,
        filters: build_filters(screen),
        badges: Badges {
            total: screen.total_count(),
            urgent: screen.urgent_count(),
        },
        status: load_status(screen),
        error: screen.error().map(UserFacingError::from),
    }
}

fn build_map(sync: &MapListSync, screen: &Screen) -> MapView {
    let selected = sync.selected();
    let mut items: Vec<&Item> = screen.rows().map(|(item, _)| item).collect();
    if let Some(item) = sync.selected_item() {
        if !items.iter().any(|i| i.id == item.id) {
            items.push(item);
        }
    }

    let points: Vec<MarkerPoint> = items
        .iter()
        .map(|item| MarkerPoint {
            id: item.id,
            position: item.location,
        })
        .collect();
    let display = decluster(&points, &sync.config().decluster);

    let markers: Vec<MarkerView> = items
        .iter()
        .zip(display)
        .map(|(item, position)| MarkerView {
            id: item.id.get(),
            lat: position.lat(),
            lon: position.lon(),
            icon: item.category.icon().to_string(),
            urgent: item.urgent,
            selected: selected == Some(item.id),
        })
        .collect();

    let camera = sync.camera();
    let user = sync.user_location();
    MapView {
        center_lat: camera.center.lat(),
        center_lon: camera.center.lon(),
        zoom: camera.zoom,
        user_lat: user.position.lat(),
        user_lon: user.position.lon(),
        user_location_is_real: user.is_real,
        markers_geojson: markers_geojson(&markers),
        markers,
        show_recenter: sync.show_recenter(),
    }
}

#[must_use]
pub fn markers_geojson(markers: &[MarkerView]) -> String {
    let features = markers
        .iter()
        .map(|m| {
            let mut properties = JsonObject::new();
            properties.insert("icon".into(), m.icon.clone().into());
            properties.insert("urgent".into(), m.urgent.into());
            properties.insert("selected".into(), m.selected.into());
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![m.lon, m.lat]))),
                id: Some(feature::Id::Number(m.id.into())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    serde_json::to_string(&collection).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to encode markers as GeoJSON");
        String::new()
    })
}

fn build_row(item: &Item, distance_km: f64, now: UnixTimeMs) -> RowView {
    RowView {
        id: item.id.get(),
        title: item.title.clone(),
        category: item.category.display_name().to_string(),
        icon: item.category.icon().to_string(),
        price_text: item.price_text(),
        distance_text: format_distance(distance_km),
        time_ago: format_time_ago(item.created_at.as_millis(), now.as_millis()),
        urgent: item.urgent,
        creator_name: item.creator.name.clone(),
        creator_rating: item.creator.rating,
    }
}

fn build_detail(item: &Item, user: LatLon, from_deep_link: bool, now: UnixTimeMs) -> ItemDetail {
    ItemDetail {
        id: item.id.get(),
        title: item.title.clone(),
        description: item.description.clone(),
        category: item.category.display_name().to_string(),
        icon: item.category.icon().to_string(),
        price_text: item.price_text(),
        distance_text: format_distance(user.distance_km(item.location)),
        time_ago: format_time_ago(item.created_at.as_millis(), now.as_millis()),
        urgent: item.urgent,
        lat: item.location.lat(),
        lon: item.location.lon(),
        creator_name: item.creator.name.clone(),
        creator_rating: item.creator.rating,
        creator_avatar_url: item.creator.avatar_url.clone(),
        opened_from_deep_link: from_deep_link,
    }
}

fn build_filters(screen: &Screen) -> FilterView {
    let filters = screen.filters();
    let can_add = filters.can_add_category();
    let radius_label = if filters.is_nationwide() && !screen.radius_expanded() {
        radius_label(None)
    } else {
        radius_label(screen.displayed_radius_km())
    };
    FilterView {
        radius_km: filters.radius_km,
        radius_label,
        radius_expanded: screen.radius_expanded(),
        categories: Category::ALL
            .iter()
            .map(|c| {
                let selected = filters.is_selected(*c);
                CategoryChip {
                    value: c.as_str().to_string(),
                    label: c.display_name().to_string(),
                    icon: c.icon().to_string(),
                    selected,
                    enabled: selected || can_add,
                }
            })
            .collect(),
        query: filters.query.clone(),
    }
}

#[must_use]
pub fn radius_label(radius_km: Option<f64>) -> String {
    match radius_km {
        Some(km) => format!("{km:.0} km"),
        None => "Nationwide".into(),
    }
}

fn load_status(screen: &Screen) -> LoadStatus {
    match screen.phase() {
        LoadPhase::InitialLoad => LoadStatus::Skeleton,
        LoadPhase::Refreshing => LoadStatus::Refreshing,
        LoadPhase::Idle if screen.has_loaded_once() && screen.total_count() > 0 => LoadStatus::Idle,
        LoadPhase::Idle if screen.has_loaded_once() || screen.error().is_some() => {
            LoadStatus::Empty {
                can_retry: screen.error().is_some_and(|e| e.is_retryable()),
            }
        }
        LoadPhase::Idle => LoadStatus::Idle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::fetch::{FetchError, SearchResponse};
    use crate::item::fixtures::item;
    use crate::item::ItemId;
    use crate::sync::SyncAction;

    fn now() -> UnixTimeMs {
        UnixTimeMs(1_700_000_000_000 + 3 * 3_600_000)
    }

    fn loaded(items: Vec<Item>) -> MapListSync {
        let mut s = MapListSync::new(EngineConfig::default());
        let actions = s.mount(None);
        let version = actions
            .iter()
            .find_map(|a| match a {
                SyncAction::FetchResults { version, .. } => Some(*version),
                _ => None,
            })
            .unwrap();
        s.results_fetched(
            version,
            Ok(SearchResponse {
                items,
                effective_radius: None,
                radius_expanded: false,
            }),
        );
        s
    }

    #[test]
    fn unmounted_engine_has_no_screen() {
        let s = MapListSync::new(EngineConfig::default());
        assert_eq!(build_view(&s, now()), ViewModel::default());
    }

    #[test]
    fn rows_are_limited_to_render_window() {
        let s = loaded((1..=50).map(|id| item(id, 56.95, 24.1)).collect());
        let view = build_view(&s, now()).screen.unwrap();
        let list = view.list.unwrap();
        assert_eq!(list.rows.len(), 20);
        assert_eq!(list.total_count, 50);
        assert_eq!(list.spacer_height_px, 30.0 * 88.0);
        assert_eq!(list.rows[0].time_ago, "3h ago");
        assert_eq!(view.badges.total, 50);
        // All fifty overlap and must be spread apart.
        assert_eq!(view.map.markers.len(), 50);
        let first = &view.map.markers[0];
        assert!(view.map.markers[1..]
            .iter()
            .all(|m| (m.lat, m.lon) != (first.lat, first.lon)));
    }

    #[test]
    fn selection_swaps_list_for_preview() {
        let mut s = loaded(vec![item(1, 56.95, 24.1), item(2, 57.0, 24.2)]);
        s.select(ItemId(2));
        let view = build_view(&s, now()).screen.unwrap();
        assert!(view.list.is_none());
        let preview = view.preview.unwrap();
        assert_eq!(preview.id, 2);
        assert_eq!(preview.price_text, "€25");
        assert!(!preview.opened_from_deep_link);
        assert!(view.map.markers.iter().any(|m| m.id == 2 && m.selected));
    }

    #[test]
    fn category_chips_disable_at_cap() {
        let mut s = loaded(vec![]);
        for c in &Category::ALL[..5] {
            s.toggle_category(*c);
        }
        let view = build_view(&s, now()).screen.unwrap();
        let enabled = view.filters.categories.iter().filter(|c| c.enabled).count();
        assert_eq!(enabled, 5);
        assert!(view.filters.categories.iter().filter(|c| c.selected).all(|c| c.enabled));
    }

    #[test]
    fn radius_label_shows_effective_or_nationwide() {
        assert_eq!(radius_label(Some(35.0)), "35 km");
        assert_eq!(radius_label(None), "Nationwide");

        let mut s = loaded(vec![]);
        s.set_radius(0);
        let view = build_view(&s, now()).screen.unwrap();
        assert_eq!(view.filters.radius_label, "Nationwide");
    }

    #[test]
    fn empty_and_error_states() {
        let s = loaded(vec![]);
        let view = build_view(&s, now()).screen.unwrap();
        assert_eq!(view.status, LoadStatus::Empty { can_retry: false });

        let mut s = MapListSync::new(EngineConfig::default());
        s.mount(None);
        let view = build_view(&s, now()).screen.unwrap();
        assert_eq!(view.status, LoadStatus::Skeleton);

        let version = s
            .retry()
            .iter()
            .find_map(|a| match a {
                SyncAction::FetchResults { version, .. } => Some(*version),
                _ => None,
            })
            .unwrap();
        s.results_fetched(version, Err(FetchError::Network("down".into())));
        let view = build_view(&s, now()).screen.unwrap();
        assert_eq!(view.status, LoadStatus::Empty { can_retry: true });
        assert_eq!(view.error.unwrap().error_code, "NETWORK_ERROR");
    }

    #[test]
    fn geojson_carries_display_positions() {
        let markers = vec![MarkerView {
            id: 7,
            lat: 56.95,
            lon: 24.1,
            icon: "pin".into(),
            urgent: true,
            selected: false,
        }];
        let json: serde_json::Value = serde_json::from_str(&markers_geojson(&markers)).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        let feature = &json["features"][0];
        assert_eq!(feature["id"], 7);
        assert_eq!(feature["geometry"]["coordinates"][0], 24.1);
        assert_eq!(feature["properties"]["urgent"], true);
    }
}
