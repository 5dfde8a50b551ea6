use crate::visibility::VisibilityRecord;

/// Coverage score in [0, 100]: half the fraction of the window spent above
/// the mask, half the mean visible elevation relative to zenith.
pub fn geographic_score(record: &VisibilityRecord) -> f64 {
    let coverage = record.visible_ratio().clamp(0.0, 1.0);
    let elevation = (record.mean_elevation_deg() / 90.0).clamp(0.0, 1.0);
    100.0 * (0.5 * coverage + 0.5 * elevation)
}
