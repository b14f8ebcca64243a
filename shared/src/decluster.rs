//! Spreads markers that would render on top of each other.
//!
//! Output depends only on the set of `(id, position)` pairs: groups are built
//! in id order and each member's slot is its rank inside the group, so the
//! same listings land on the same display coordinates on every frame
//! regardless of the order the data source returned them in.

use std::f64::consts::TAU;

use crate::config::DeclusterConfig;
use crate::geo::LatLon;
use crate::item::ItemId;

/// Markers per ring before a new, wider ring is started.
const SLOTS_PER_RING: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerPoint {
    pub id: ItemId,
    pub position: LatLon,
}

struct Group {
    anchor: LatLon,
    members: Vec<usize>,
}

/// Returns display coordinates parallel to `points`.
#[must_use]
pub fn decluster(points: &[MarkerPoint], config: &DeclusterConfig) -> Vec<LatLon> {
    let mut display: Vec<LatLon> = points.iter().map(|p| p.position).collect();
    if points.len() < 2 {
        return display;
    }

    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by_key(|&i| points[i].id);

    let mut groups: Vec<Group> = Vec::new();
    for i in order {
        let position = points[i].position;
        match groups
            .iter_mut()
            .find(|g| overlaps(g.anchor, position, config.tolerance_deg))
        {
            Some(group) => group.members.push(i),
            None => groups.push(Group {
                anchor: position,
                members: vec![i],
            }),
        }
    }

    for group in groups.iter().filter(|g| g.members.len() > 1) {
        // Longitude degrees shrink towards the poles.
        let lon_scale = 1.0 / group.anchor.lat().to_radians().cos().abs().max(0.01);
        for (rank, &i) in group.members.iter().enumerate() {
            let (d_lat, d_lon) = slot_offset(rank, config.offset_deg);
            display[i] = group.anchor.offset(d_lat, d_lon * lon_scale);
        }
    }

    display
}

fn overlaps(a: LatLon, b: LatLon, tolerance_deg: f64) -> bool {
    (a.lat() - b.lat()).abs() <= tolerance_deg && (a.lon() - b.lon()).abs() <= tolerance_deg
}

#[allow(clippy::cast_precision_loss)]
fn slot_offset(rank: usize, offset_deg: f64) -> (f64, f64) {
    let ring = rank / SLOTS_PER_RING + 1;
    let slot = rank % SLOTS_PER_RING;
    // Stagger each ring so markers of neighbouring rings don't line up.
    let angle = TAU * slot as f64 / SLOTS_PER_RING as f64 + (ring - 1) as f64 * 0.4;
    let radius = offset_deg * ring as f64;
    (radius * angle.sin(), radius * angle.cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: u64, lat: f64, lon: f64) -> MarkerPoint {
        MarkerPoint {
            id: ItemId(id),
            position: LatLon::new(lat, lon).unwrap(),
        }
    }

    #[test]
    fn isolated_points_are_untouched() {
        let points = vec![point(1, 56.95, 24.10), point(2, 56.96, 24.12)];
        let display = decluster(&points, &DeclusterConfig::default());
        assert_eq!(display[0], points[0].position);
        assert_eq!(display[1], points[1].position);
    }

    #[test]
    fn identical_points_get_distinct_display_positions() {
        let points: Vec<_> = (1..=12).map(|id| point(id, 56.95, 24.10)).collect();
        let display = decluster(&points, &DeclusterConfig::default());
        for i in 0..display.len() {
            for j in (i + 1)..display.len() {
                assert_ne!(display[i], display[j], "markers {i} and {j} overlap");
            }
        }
    }

    #[test]
    fn offsets_stay_small() {
        let config = DeclusterConfig::default();
        let points: Vec<_> = (1..=20).map(|id| point(id, 56.95, 24.10)).collect();
        let display = decluster(&points, &config);
        for (p, d) in points.iter().zip(&display) {
            // Three rings at most for twenty markers, with latitude scaling.
            assert!(p.position.distance_km(*d) < 0.1);
        }
    }

    #[test]
    fn output_is_independent_of_input_order() {
        let config = DeclusterConfig::default();
        let forward = vec![
            point(3, 56.95, 24.10),
            point(1, 56.95, 24.10),
            point(2, 56.95, 24.10),
            point(9, 57.20, 24.50),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = decluster(&forward, &config);
        let b = decluster(&reversed, &config);
        for (i, p) in forward.iter().enumerate() {
            let j = reversed.iter().position(|q| q.id == p.id).unwrap();
            assert_eq!(a[i], b[j]);
        }
    }

    #[test]
    fn repeated_calls_are_stable() {
        let config = DeclusterConfig::default();
        let points = vec![point(5, 10.0, 10.0), point(6, 10.0, 10.00001)];
        assert_eq!(decluster(&points, &config), decluster(&points, &config));
    }
}
