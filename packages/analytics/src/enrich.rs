//! Joins cluster assignments back to their incident records.

use std::collections::{BTreeMap, HashMap};

use crime_analytics_models::{ClusterAssignment, ClusterGroup, ClusterItem, FeatureRecord};

/// Builds one assignment per record from a label vector aligned with
/// `records`.
#[must_use]
pub fn assignments(records: &[FeatureRecord], labels: &[usize]) -> Vec<ClusterAssignment> {
    records
        .iter()
        .zip(labels)
        .map(|(record, &cluster_id)| ClusterAssignment {
            case_id: record.case_id.clone(),
            cluster_id,
            latitude: record.latitude,
            longitude: record.longitude,
        })
        .collect()
}

/// Groups enriched assignments by cluster id.
///
/// Groups are returned in ascending cluster id order and items keep their
/// assignment order. An assignment whose case id does not appear in
/// `records` is dropped without an error; only a debug log records it.
#[must_use]
pub fn enrich(assignments: &[ClusterAssignment], records: &[FeatureRecord]) -> Vec<ClusterGroup> {
    let by_case: HashMap<&str, &FeatureRecord> =
        records.iter().map(|r| (r.case_id.as_str(), r)).collect();

    let mut grouped: BTreeMap<usize, Vec<ClusterItem>> = BTreeMap::new();
    let mut dropped = 0_usize;

    for assignment in assignments {
        let Some(record) = by_case.get(assignment.case_id.as_str()) else {
            log::debug!(
                "No record for case {}; dropping assignment",
                assignment.case_id
            );
            dropped += 1;
            continue;
        };
        let Some(item) = ClusterItem::from_parts(assignment, record) else {
            log::debug!(
                "Case {} has unrepresentable timestamp {}; dropping assignment",
                assignment.case_id,
                record.timestamp
            );
            dropped += 1;
            continue;
        };
        grouped.entry(assignment.cluster_id).or_default().push(item);
    }

    if dropped > 0 {
        log::debug!("Dropped {dropped} of {} assignments", assignments.len());
    }

    grouped
        .into_iter()
        .map(|(cluster_id, items)| ClusterGroup::new(cluster_id, items))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crime_analytics_crime_models::{CrimeType, Motive, Precinct, Severity, Weather};

    fn record(case_id: &str, latitude: f64, longitude: f64) -> FeatureRecord {
        FeatureRecord {
            case_id: case_id.to_string(),
            crime_type: CrimeType::Robbery,
            severity: Severity::Medium,
            precinct: Precinct::Putatan,
            weather: Weather::Rain,
            motive: Motive::Greed,
            latitude,
            longitude,
            // 2023-07-04 08:00:00 UTC
            timestamp: 1_688_457_600,
        }
    }

    #[test]
    fn groups_partition_assignments_in_id_order() {
        let records = vec![
            record("A", 14.0, 121.0),
            record("B", 14.2, 121.2),
            record("C", 14.4, 121.4),
            record("D", 14.6, 121.6),
        ];
        let groups = enrich(&assignments(&records, &[2, 0, 2, 0]), &records);

        assert_eq!(
            groups.iter().map(|g| g.cluster_id).collect::<Vec<_>>(),
            vec![0, 2]
        );
        let ids = |g: &ClusterGroup| {
            g.cluster_items
                .iter()
                .map(|i| i.case_id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&groups[0]), vec!["B", "D"]);
        assert_eq!(ids(&groups[1]), vec!["A", "C"]);
        assert_eq!(groups.iter().map(|g| g.item_count).sum::<usize>(), 4);
    }

    #[test]
    fn centroid_is_mean_of_members() {
        let records = vec![record("A", 14.0, 121.0), record("B", 14.2, 121.2)];
        let groups = enrich(&assignments(&records, &[1, 1]), &records);

        assert_eq!(groups.len(), 1);
        assert!((groups[0].centroid.latitude - 14.1).abs() < 1e-9);
        assert!((groups[0].centroid.longitude - 121.1).abs() < 1e-9);
    }

    #[test]
    fn unknown_case_ids_are_dropped_silently() {
        let records = vec![record("A", 14.0, 121.0)];
        let mut assigned = assignments(&records, &[0]);
        assigned.push(ClusterAssignment {
            case_id: "GHOST".to_string(),
            cluster_id: 1,
            latitude: 0.0,
            longitude: 0.0,
        });

        let groups = enrich(&assigned, &records);
        assert_eq!(groups.len(), 1, "missing case must not create a group");
        assert_eq!(groups[0].cluster_items[0].case_id, "A");
    }

    #[test]
    fn items_carry_calendar_metadata() {
        let records = vec![record("A", 14.0, 121.0)];
        let groups = enrich(&assignments(&records, &[0]), &records);
        let item = &groups[0].cluster_items[0];

        assert_eq!((item.year, item.month), (2023, 7));
        assert_eq!(
            item.time_of_day,
            crime_analytics_models::TimeOfDay::Morning
        );
        assert_eq!(item.precinct, Precinct::Putatan);
        assert_eq!(item.crime_type, CrimeType::Robbery);
    }
}
