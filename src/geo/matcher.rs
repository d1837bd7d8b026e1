use super::{geodesic_distance_meters, Coordinates, Geofence, MatchResult, NearbyMatch};

/// Matches `point` against every active fence.
///
/// A fence matches when the geodesic distance to its center is at most its
/// radius. Inactive fences are ignored.
pub fn match_point(point: Coordinates, geofences: &[Geofence]) -> MatchResult {
    let mut matches: Vec<NearbyMatch> = geofences
        .iter()
        .filter(|fence| fence.active)
        .filter_map(|fence| {
            let distance_meters = geodesic_distance_meters(point, fence.center);
            (distance_meters <= fence.radius_meters).then(|| NearbyMatch {
                geofence_id: fence.id,
                category: fence.category.clone(),
                distance_meters,
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        a.distance_meters
            .total_cmp(&b.distance_meters)
            .then(a.geofence_id.cmp(&b.geofence_id))
    });

    MatchResult {
        danger: !matches.is_empty(),
        matches,
    }
}
