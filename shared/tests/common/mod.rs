#![allow(dead_code)]

use marketplace_core::capabilities::GeolocationOperation;
use marketplace_core::item::CreatorSummary;
use marketplace_core::{Category, Effect, Item, ItemId, LatLon, UnixTimeMs};

pub fn item(id: u64, lat: f64, lon: f64) -> Item {
    Item {
        id: ItemId(id),
        title: format!("Listing {id}"),
        description: Some("Help needed on Saturday".into()),
        category: Category::Moving,
        price_cents: 4_000,
        location: LatLon::new(lat, lon).unwrap(),
        urgent: id % 2 == 0,
        created_at: UnixTimeMs(1_700_000_000_000),
        creator: CreatorSummary {
            name: "Janis".into(),
            rating: Some(4.5),
            avatar_url: None,
        },
    }
}

pub fn http_urls(effects: &[Effect]) -> Vec<String> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Http(request) => Some(request.operation.url.clone()),
            _ => None,
        })
        .collect()
}

pub fn geolocation_requests(effects: &[Effect]) -> Vec<GeolocationOperation> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Geolocation(request) => Some(request.operation.clone()),
            _ => None,
        })
        .collect()
}

pub fn renders(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|e| matches!(e, Effect::Render(_)))
        .count()
}
