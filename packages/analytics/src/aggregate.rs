//! Monthly incident series per `(precinct, crime type)`.

use std::collections::BTreeMap;

use crime_analytics_models::{ClusterGroup, MonthlyPoint, MonthlySeries, SeriesKey};

/// Counts incidents per calendar month for every distinct series key.
///
/// Series come back ordered by key. Within a series, points are ascending
/// and contiguous: months with no incidents between the first and last
/// observed month are present with a zero count.
#[must_use]
pub fn monthly_series(groups: &[ClusterGroup]) -> Vec<MonthlySeries> {
    let mut counts: BTreeMap<SeriesKey, BTreeMap<(i32, u32), u64>> = BTreeMap::new();

    for item in groups.iter().flat_map(|g| &g.cluster_items) {
        let key = SeriesKey {
            precinct: item.precinct,
            crime_type: item.crime_type,
        };
        *counts
            .entry(key)
            .or_default()
            .entry((item.year, item.month))
            .or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|(key, months)| MonthlySeries {
            key,
            points: fill_gaps(&months),
        })
        .collect()
}

/// Monthly counts across every item in `groups`, ascending. Only months
/// with at least one incident are present.
#[must_use]
pub fn monthly_totals(groups: &[ClusterGroup]) -> Vec<MonthlyPoint> {
    let mut totals: BTreeMap<(i32, u32), u64> = BTreeMap::new();
    for item in groups.iter().flat_map(|g| &g.cluster_items) {
        *totals.entry((item.year, item.month)).or_insert(0) += 1;
    }
    totals
        .into_iter()
        .map(|((year, month), count)| MonthlyPoint { year, month, count })
        .collect()
}

fn fill_gaps(months: &BTreeMap<(i32, u32), u64>) -> Vec<MonthlyPoint> {
    let (Some((&first, _)), Some((&last, _))) = (months.first_key_value(), months.last_key_value())
    else {
        return Vec::new();
    };

    let mut points = Vec::new();
    let (mut year, mut month) = first;
    while (year, month) <= last {
        points.push(MonthlyPoint {
            year,
            month,
            count: months.get(&(year, month)).copied().unwrap_or(0),
        });
        (year, month) = next_month(year, month);
    }
    points
}

/// The calendar month after `(year, month)`.
#[must_use]
pub const fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crime_analytics_crime_models::{CrimeType, Precinct};
    use crime_analytics_models::{ClusterItem, TimeOfDay};

    fn item(precinct: Precinct, crime_type: CrimeType, year: i32, month: u32) -> ClusterItem {
        ClusterItem {
            case_id: format!("{precinct}-{crime_type}-{year}-{month}"),
            cluster_id: 0,
            latitude: 14.4,
            longitude: 121.0,
            month,
            year,
            time_of_day: TimeOfDay::Night,
            precinct,
            crime_type,
        }
    }

    #[test]
    fn counts_per_key_and_month() {
        let groups = vec![
            ClusterGroup::new(
                0,
                vec![
                    item(Precinct::Sucat, CrimeType::Theft, 2023, 1),
                    item(Precinct::Sucat, CrimeType::Theft, 2023, 1),
                    item(Precinct::Buli, CrimeType::Assault, 2023, 2),
                ],
            ),
            ClusterGroup::new(1, vec![item(Precinct::Sucat, CrimeType::Theft, 2023, 2)]),
        ];

        let series = monthly_series(&groups);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].key.precinct, Precinct::Buli, "ordered by key");

        let theft = &series[1];
        assert_eq!(
            theft.points.iter().map(|p| p.count).collect::<Vec<_>>(),
            vec![2, 1]
        );
    }

    #[test]
    fn interior_gaps_filled_with_zero_across_year_end() {
        let groups = vec![ClusterGroup::new(
            0,
            vec![
                item(Precinct::Sucat, CrimeType::Theft, 2022, 11),
                item(Precinct::Sucat, CrimeType::Theft, 2023, 2),
            ],
        )];

        let series = monthly_series(&groups);
        let months: Vec<_> = series[0]
            .points
            .iter()
            .map(|p| (p.year, p.month, p.count))
            .collect();
        assert_eq!(
            months,
            vec![(2022, 11, 1), (2022, 12, 0), (2023, 1, 0), (2023, 2, 1)]
        );
    }

    #[test]
    fn empty_groups_yield_no_series() {
        assert!(monthly_series(&[]).is_empty());
        assert!(monthly_series(&[ClusterGroup::new(0, Vec::new())]).is_empty());
    }

    #[test]
    fn totals_span_all_keys() {
        let groups = vec![ClusterGroup::new(
            0,
            vec![
                item(Precinct::Sucat, CrimeType::Theft, 2023, 1),
                item(Precinct::Buli, CrimeType::Assault, 2023, 1),
                item(Precinct::Buli, CrimeType::Assault, 2023, 3),
            ],
        )];
        let totals = monthly_totals(&groups);
        assert_eq!(totals.len(), 2, "gaps are not filled");
        assert_eq!(
            totals[0],
            MonthlyPoint {
                year: 2023,
                month: 1,
                count: 2
            }
        );
    }
}
