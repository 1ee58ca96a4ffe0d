use std::cmp::Ordering;

use crate::models::{RosterEntry, RosterRow, StandingRecord};
use crate::store::Record;
use crate::utils::{coerce_identifier_from_record, coerce_number, coerce_string};

fn number(row: &Record, key: &str) -> Option<f64> {
    row.get(key).and_then(coerce_number)
}

/// Typed standings rows, highest total points first. Rows without points
/// sort last; the view's own order is kept between equal rows.
pub fn sanitize_standings(rows: Vec<Record>) -> Vec<StandingRecord> {
    let mut standings: Vec<StandingRecord> = rows
        .iter()
        .map(|row| StandingRecord {
            team_id: coerce_identifier_from_record(row, &["team_id", "id"]),
            team_name: row
                .get("team_name")
                .and_then(coerce_string)
                .or_else(|| row.get("name").and_then(coerce_string))
                .unwrap_or_else(|| "Unknown Team".to_string()),
            matches_won: number(row, "matches_won"),
            matches_lost: number(row, "matches_lost"),
            win_percentage: number(row, "win_percentage"),
            total_points: number(row, "total_points"),
        })
        .collect();

    standings.sort_by(|a, b| match (a.total_points, b.total_points) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    standings
}

/// Roster entries for memberships that still point at a person.
pub fn sanitize_roster(rows: Vec<RosterRow>) -> Vec<RosterEntry> {
    rows.into_iter()
        .filter_map(|row| {
            let role = row.role;
            row.person.into_first().map(|person| RosterEntry { role, person })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PersonRow, Relation};
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_standings_are_coerced_and_sorted() {
        let rows = vec![
            record(json!({"team_id": 1, "team_name": "Dink Dynasty", "matches_won": "2", "total_points": 7})),
            record(json!({"id": "t-2", "name": "Net Ninjas", "total_points": "12.5"})),
            record(json!({"team_id": "t-3", "team_name": "  ", "total_points": null})),
            record(json!({"team_id": "t-4", "team_name": "Kitchen Crew", "total_points": 12.5, "win_percentage": "NaN"})),
        ];

        let standings = sanitize_standings(rows);
        let names: Vec<&str> = standings.iter().map(|s| s.team_name.as_str()).collect();
        assert_eq!(names, vec!["Net Ninjas", "Kitchen Crew", "Dink Dynasty", "Unknown Team"]);

        assert_eq!(standings[0].team_id.as_deref(), Some("t-2"));
        assert_eq!(standings[0].total_points, Some(12.5));
        assert_eq!(standings[1].win_percentage, None);
        assert_eq!(standings[2].team_id.as_deref(), Some("1"));
        assert_eq!(standings[2].matches_won, Some(2.0));
        assert_eq!(standings[2].matches_lost, None);
        assert_eq!(standings[3].total_points, None);
    }

    #[test]
    fn test_roster_drops_rows_without_person() {
        let rows = vec![
            RosterRow {
                role: Some("captain".into()),
                person: Relation::Many(vec![PersonRow {
                    id: "p-1".into(),
                    first_name: Some("Ava".into()),
                    last_name: Some("Morales".into()),
                    preferred_name: None,
                    email: None,
                    phone_mobile: None,
                    birthday: None,
                }]),
            },
            RosterRow { role: None, person: Relation::Empty },
        ];

        let roster = sanitize_roster(rows);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].role.as_deref(), Some("captain"));
        assert_eq!(roster[0].person.id, "p-1");
    }
}
