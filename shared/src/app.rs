//! Crux entry point. Events go to [`MapListSync`]; the actions it returns
//! become capability requests, followed by a render.

use crate::capabilities::{
    decode_radius, decode_session, encode_radius, encode_session, into_outcome, ApiEndpoint,
    CapabilityError, Capabilities, KvKey, StorageError,
};
use crate::config::EngineConfig;
use crate::error::{AppError, AppResult};
use crate::event::{Event, StoredValue};
use crate::fetch::{FetchError, SearchResponse};
use crate::geo::LatLon;
use crate::item::{Item, UnixTimeMs};
use crate::model::Model;
use crate::sync::{MapCamera, MapListSync, SyncAction};
use crate::view::{build_view, ViewModel};

#[derive(Default)]
pub struct App;

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        if event.is_high_frequency() {
            tracing::trace!(event = event.name(), "update");
        } else {
            tracing::debug!(event = event.name(), "update");
        }
        model.update_timestamp();

        let engine = &mut model.engine;
        let actions = match event {
            Event::AppStarted { config } => {
                if let Some(json) = config {
                    Self::apply_config(engine, &json);
                }
                if let Err(error) = Self::load_stored(caps) {
                    tracing::warn!(error = %error, "could not read stored state");
                }
                Vec::new()
            }

            Event::SavedRadiusLoaded(stored) => {
                let km = Self::read_stored(KvKey::search_radius(), stored, decode_radius);
                engine.apply_saved_radius(km)
            }

            Event::SessionLoaded(stored) => {
                match Self::read_stored(KvKey::map_session(), stored, decode_session) {
                    Some(snapshot) => engine.restore_session(snapshot),
                    None => Vec::new(),
                }
            }

            Event::ScreenMounted { deep_link } => engine.mount(deep_link),

            Event::ScreenUnmounted => {
                engine.unmount();
                Vec::new()
            }

            Event::LocationResolved { attempt, outcome } => {
                engine.location_resolved(attempt, outcome)
            }

            Event::RecenterRequested => engine.recenter(),

            Event::RadiusChanged { km } => engine.set_radius(km),

            Event::CategoryToggled { category } => engine.toggle_category(category),

            Event::QueryChanged { query } => engine.set_query(query),

            Event::RetryRequested => engine.retry(),

            Event::ResultsFetched { version, outcome } => engine.results_fetched(version, outcome),

            Event::ItemFetched { item_id, outcome } => engine.item_fetched(item_id, outcome),

            Event::MarkerTapped { item_id } | Event::RowTapped { item_id } => {
                engine.select(item_id)
            }

            Event::PreviewClosed => engine.clear_selection(),

            Event::SheetDragStarted { y } => {
                engine.sheet_drag_started(y);
                Vec::new()
            }

            Event::SheetDragMoved { y } => {
                engine.sheet_drag_moved(y);
                Vec::new()
            }

            Event::SheetDragEnded { y } => engine.sheet_drag_ended(y),

            Event::ViewportResized {
                height_px,
                chrome_height_px,
            } => {
                engine.viewport_resized(height_px, chrome_height_px);
                Vec::new()
            }

            Event::ListScrolled { scroll_top_px } => {
                engine.list_scrolled(scroll_top_px);
                Vec::new()
            }

            Event::ListResized { height_px } => {
                engine.list_resized(height_px);
                Vec::new()
            }

            Event::AnimationFrame => {
                if !engine.animation_frame() {
                    return;
                }
                Vec::new()
            }

            Event::MapViewportChanged {
                center_lat,
                center_lon,
                zoom,
            } => {
                match LatLon::new(center_lat, center_lon) {
                    Ok(center) if zoom.is_finite() => {
                        engine.map_viewport_changed(MapCamera { center, zoom });
                    }
                    _ => {
                        tracing::debug!(center_lat, center_lon, zoom, "ignoring invalid map viewport");
                        return;
                    }
                }
                Vec::new()
            }

            Event::StorageWritten { key, outcome } => {
                if let Err(message) = outcome {
                    tracing::warn!(%key, %message, "storage write failed");
                }
                return;
            }
        };

        for action in actions {
            if let Err(e) = Self::dispatch(action, engine, caps) {
                let error = AppError::from(e);
                tracing::warn!(error = %error, "could not issue effect");
            }
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        build_view(&model.engine, UnixTimeMs(model.view_timestamp_ms))
    }
}

impl App {
    fn apply_config(engine: &mut MapListSync, json: &str) {
        if engine.screen().is_some() {
            tracing::warn!("configuration ignored, map screen already mounted");
            return;
        }
        match EngineConfig::from_json(json) {
            Ok(config) => {
                tracing::info!(api = %config.api_base_url, "engine configured");
                *engine = MapListSync::new(config);
            }
            Err(e) => {
                let error = AppError::from(e);
                tracing::warn!(error = %error, "invalid configuration, using defaults");
            }
        }
    }

    fn load_stored(caps: &Capabilities) -> AppResult<()> {
        caps.kv.get(KvKey::search_radius()?.raw(), |result| {
            Event::SavedRadiusLoaded(result.map_err(|e| e.to_string()))
        });
        caps.kv.get(KvKey::map_session()?.raw(), |result| {
            Event::SessionLoaded(result.map_err(|e| e.to_string()))
        });
        Ok(())
    }

    fn read_stored<T>(
        key: Result<KvKey, StorageError>,
        stored: StoredValue,
        decode: fn(&KvKey, StoredValue) -> Result<Option<T>, StorageError>,
    ) -> Option<T> {
        match key.and_then(|key| decode(&key, stored)) {
            Ok(value) => value,
            Err(e) => {
                let error = AppError::from(e);
                tracing::warn!(error = %error, "ignoring stored value");
                None
            }
        }
    }

    fn dispatch(
        action: SyncAction,
        engine: &MapListSync,
        caps: &Capabilities,
    ) -> Result<(), CapabilityError> {
        match action {
            SyncAction::FetchResults { version, query } => {
                let url = ApiEndpoint::new(&engine.config().api_base_url)?.search_url(&query)?;
                caps.http
                    .get(url.as_str())
                    .expect_json::<SearchResponse>()
                    .send(move |result| Event::ResultsFetched {
                        version,
                        outcome: into_outcome(result),
                    });
            }

            SyncAction::FetchItem { item_id } => {
                let url = ApiEndpoint::new(&engine.config().api_base_url)?.item_url(item_id)?;
                caps.http
                    .get(url.as_str())
                    .expect_json::<Item>()
                    .send(move |result| Event::ItemFetched {
                        item_id,
                        outcome: into_outcome(result).map_err(|e| match e {
                            FetchError::Status { status: 404, .. } => {
                                FetchError::NotFound(item_id.get())
                            }
                            other => other,
                        }),
                    });
            }

            SyncAction::AcquireLocation {
                attempt,
                timeout_ms,
                high_accuracy,
            } => {
                caps.geolocation
                    .current_position(timeout_ms, high_accuracy, move |outcome| {
                        Event::LocationResolved { attempt, outcome }
                    });
            }

            SyncAction::PersistRadius { km } => {
                let key = KvKey::search_radius()?;
                let bytes = encode_radius(&key, km)?;
                Self::write(caps, key.raw(), bytes);
            }

            SyncAction::PersistSession(snapshot) => {
                let key = KvKey::map_session()?;
                let bytes = encode_session(&key, &snapshot)?;
                Self::write(caps, key.raw(), bytes);
            }
        }
        Ok(())
    }

    fn write(caps: &Capabilities, key: String, bytes: Vec<u8>) {
        let written = key.clone();
        caps.kv.set(key, bytes, move |result| Event::StorageWritten {
            key: written,
            outcome: result.map(|_| ()).map_err(|e| e.to_string()),
        });
    }
}
