use std::collections::HashMap;

use shared::{Coordinates, DiseaseLabel, ScanRecord};

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Per-label tallies, most frequent first. Ties break on the label name so
/// the ordering is stable for rendering.
pub fn disease_counts(records: &[ScanRecord]) -> Vec<(DiseaseLabel, usize)> {
    let mut counts: HashMap<DiseaseLabel, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.disease.clone()).or_insert(0) += 1;
    }
    let mut tallies: Vec<_> = counts.into_iter().collect();
    tallies.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| a.0.to_string().cmp(&b.0.to_string()))
    });
    tallies
}

/// Great-circle distance between two positions, in kilometers.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Records within `radius_km` of `center`, for the proximity view.
pub fn within_radius(
    records: &[ScanRecord],
    center: Coordinates,
    radius_km: f64,
) -> Vec<ScanRecord> {
    records
        .iter()
        .filter(|record| haversine_km(record.coordinates, center) <= radius_km)
        .cloned()
        .collect()
}

/// Map legend color for a label.
pub fn label_color(label: &DiseaseLabel) -> &'static str {
    match label {
        DiseaseLabel::Newcastle => "#4ECDC4",
        DiseaseLabel::Salmo => "#FFD93D",
        DiseaseLabel::Cocci => "#FF6B6B",
        DiseaseLabel::Healthy => "#95E1D3",
        DiseaseLabel::Unknown(_) => "#888",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use uuid::Uuid;

    fn record_at(label: DiseaseLabel, latitude: f64, longitude: f64) -> ScanRecord {
        ScanRecord::new(
            Uuid::new_v4(),
            label,
            0.9,
            Coordinates::new(latitude, longitude).unwrap(),
            "https://bucket.s3.ap-southeast-1.amazonaws.com/scans/t.jpg".to_string(),
            None,
            None,
        )
    }

    #[test]
    fn haversine_zero_for_same_point() {
        let manila = Coordinates::new(14.5995, 120.9842).unwrap();
        assert!(haversine_km(manila, manila) < 1e-9);
    }

    #[test]
    fn haversine_one_degree_of_latitude() {
        let a = Coordinates::new(14.5995, 120.9842).unwrap();
        let b = Coordinates::new(15.5995, 120.9842).unwrap();
        let d = haversine_km(a, b);
        assert!((110.0..112.5).contains(&d), "got {d}");
    }

    #[test]
    fn haversine_manila_to_baguio() {
        let manila = Coordinates::new(14.5995, 120.9842).unwrap();
        let baguio = Coordinates::new(16.4023, 120.5960).unwrap();
        let d = haversine_km(manila, baguio);
        assert!((195.0..215.0).contains(&d), "got {d}");
    }

    #[test]
    fn radius_filter_keeps_nearby_records() {
        let manila = Coordinates::new(14.5995, 120.9842).unwrap();
        let records = vec![
            record_at(DiseaseLabel::Cocci, 14.6042, 120.9822),
            record_at(DiseaseLabel::Healthy, 16.4023, 120.5960),
        ];

        let nearby = within_radius(&records, manila, 3.0);
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].disease, DiseaseLabel::Cocci);
    }

    #[test]
    fn counts_sort_by_frequency_then_name() {
        let records = vec![
            record_at(DiseaseLabel::Cocci, 14.0, 121.0),
            record_at(DiseaseLabel::Cocci, 14.1, 121.0),
            record_at(DiseaseLabel::Healthy, 14.2, 121.0),
            record_at(DiseaseLabel::Newcastle, 14.3, 121.0),
        ];

        let tallies = disease_counts(&records);
        assert_eq!(tallies[0], (DiseaseLabel::Cocci, 2));
        assert_eq!(tallies[1], (DiseaseLabel::Healthy, 1));
        assert_eq!(tallies[2], (DiseaseLabel::Newcastle, 1));
    }

    #[test]
    fn legend_colors_are_stable() {
        assert_eq!(label_color(&DiseaseLabel::Newcastle), "#4ECDC4");
        assert_eq!(label_color(&DiseaseLabel::Salmo), "#FFD93D");
        assert_eq!(label_color(&DiseaseLabel::Cocci), "#FF6B6B");
        assert_eq!(label_color(&DiseaseLabel::Healthy), "#95E1D3");
        assert_eq!(
            label_color(&DiseaseLabel::Unknown("Marek".to_string())),
            "#888"
        );
    }
}
