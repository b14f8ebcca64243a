mod common;

use crux_core::testing::AppTester;
use crux_kv::KeyValueOperation;
use marketplace_core::capabilities::{encode_session, KvKey};
use marketplace_core::fetch::{FetchVersion, SearchResponse};
use marketplace_core::selection::SessionSnapshot;
use marketplace_core::{App, Category, Effect, Event, ItemId, Model, SheetPosition};

use common::{http_urls, item};

fn kv_operations(effects: &[Effect]) -> Vec<KeyValueOperation> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::KeyValue(request) => Some(request.operation.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn startup_reads_radius_and_session() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let update = app.update(Event::AppStarted { config: None }, &mut model);
    let keys: Vec<String> = kv_operations(&update.effects)
        .into_iter()
        .filter_map(|op| match op {
            KeyValueOperation::Get { key } => Some(key),
            _ => None,
        })
        .collect();
    assert_eq!(
        keys,
        vec![
            KvKey::search_radius().unwrap().raw(),
            KvKey::map_session().unwrap().raw()
        ]
    );
}

#[test]
fn config_overrides_api_base() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    app.update(
        Event::AppStarted {
            config: Some(r#"{"api_base_url": "https://staging.darbi.app"}"#.into()),
        },
        &mut model,
    );

    let update = app.update(Event::ScreenMounted { deep_link: None }, &mut model);
    let urls = http_urls(&update.effects);
    assert!(urls[0].starts_with("https://staging.darbi.app/"));
}

#[test]
fn invalid_config_keeps_defaults() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    app.update(
        Event::AppStarted {
            config: Some("{not json".into()),
        },
        &mut model,
    );
    assert_eq!(model.engine.config().api_base_url, "https://api.darbi.app");
}

#[test]
fn saved_radius_drives_first_search() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    app.update(
        Event::SavedRadiusLoaded(Ok(Some(b"50".to_vec()))),
        &mut model,
    );
    assert_eq!(model.engine.saved_radius_km(), 50);

    let update = app.update(Event::ScreenMounted { deep_link: None }, &mut model);
    assert!(http_urls(&update.effects)[0].contains("radius=50"));
}

#[test]
fn corrupt_saved_radius_is_ignored() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    app.update(
        Event::SavedRadiusLoaded(Ok(Some(b"fifty".to_vec()))),
        &mut model,
    );
    assert_eq!(model.engine.saved_radius_km(), 25);
}

#[test]
fn failed_radius_read_keeps_default() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    app.update(Event::SavedRadiusLoaded(Err("io error".into())), &mut model);
    assert_eq!(model.engine.saved_radius_km(), 25);
}

#[test]
fn changing_radius_persists_and_refetches() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    app.update(Event::ScreenMounted { deep_link: None }, &mut model);

    let update = app.update(Event::RadiusChanged { km: 100 }, &mut model);
    let writes: Vec<String> = kv_operations(&update.effects)
        .into_iter()
        .filter_map(|op| match op {
            KeyValueOperation::Set { key, .. } => Some(key),
            _ => None,
        })
        .collect();
    assert_eq!(writes, vec![KvKey::search_radius().unwrap().raw()]);
    assert!(http_urls(&update.effects)[0].contains("radius=100"));

    let update = app.update(Event::CategoryToggled { category: Category::Moving }, &mut model);
    assert!(http_urls(&update.effects)[0].contains("category=moving"));
}

#[test]
fn restored_selection_resolves_after_first_load() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    let snapshot = SessionSnapshot {
        selected: Some(ItemId(4)),
        sheet: SheetPosition::Half,
    };
    let bytes = encode_session(&KvKey::map_session().unwrap(), &snapshot).unwrap();
    app.update(Event::SessionLoaded(Ok(Some(bytes))), &mut model);
    app.update(Event::ScreenMounted { deep_link: None }, &mut model);

    app.update(
        Event::ResultsFetched {
            version: FetchVersion(1),
            outcome: Ok(SearchResponse {
                items: vec![item(4, 56.95, 24.1), item(5, 56.9, 24.0)],
                effective_radius: Some(25.0),
                radius_expanded: false,
            }),
        },
        &mut model,
    );
    let screen = app.view(&model).screen.unwrap();
    assert_eq!(screen.preview.map(|p| p.id), Some(4));
    assert_eq!(screen.sheet.position, SheetPosition::Half);
}

#[test]
fn restored_selection_missing_from_results_is_cleared() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    let snapshot = SessionSnapshot {
        selected: Some(ItemId(9)),
        sheet: SheetPosition::Collapsed,
    };
    app.update(
        Event::SessionLoaded(Ok(Some(
            encode_session(&KvKey::map_session().unwrap(), &snapshot).unwrap(),
        ))),
        &mut model,
    );
    app.update(Event::ScreenMounted { deep_link: None }, &mut model);

    let update = app.update(
        Event::ResultsFetched {
            version: FetchVersion(1),
            outcome: Ok(SearchResponse {
                items: vec![item(1, 56.95, 24.1)],
                effective_radius: None,
                radius_expanded: false,
            }),
        },
        &mut model,
    );
    assert_eq!(model.engine.selected(), None);
    assert!(!kv_operations(&update.effects).is_empty());
}

#[test]
fn failed_write_does_not_render() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    let update = app.update(
        Event::StorageWritten {
            key: KvKey::search_radius().unwrap().raw(),
            outcome: Err("disk full".into()),
        },
        &mut model,
    );
    assert!(update.effects.is_empty());
}
