//! Display-ready profile assembled from computed player stats.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{MembershipSummary, PartnerStats, PlayerComputedStats, TrendPoint};
use crate::utils::{format_duration, format_month_year, format_signed};

pub const DEFAULT_ROLE: &str = "League player";
pub const DEFAULT_AVATAR_IMAGE: &str = "/images/default-avatar.png";
pub const DEFAULT_COVER_IMAGE: &str = "/images/default-cover.jpg";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileCard {
    pub name: String,
    pub handle: String,
    pub role: String,
    pub team: String,
    pub location: String,
    pub joined: String,
    pub bio: Option<String>,
    pub cover_image: String,
    pub avatar_image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stat {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn from_bool(up: bool) -> Self {
        if up {
            Direction::Up
        } else {
            Direction::Down
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatHighlight {
    pub label: String,
    pub value: String,
    pub change: String,
    pub trend: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamHistoryItem {
    pub id: String,
    pub team_name: String,
    pub location: String,
    pub range_label: String,
    pub duration_label: String,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerProfileView {
    pub profile: ProfileCard,
    pub quick_stats: Vec<Stat>,
    pub social_stats: Vec<Stat>,
    pub trend: Vec<TrendPoint>,
    pub stat_highlights: Vec<StatHighlight>,
    pub partner: Option<PartnerStats>,
    pub team_history: Vec<TeamHistoryItem>,
    pub has_matches: bool,
}

fn stat(label: &str, value: String) -> Stat {
    Stat {
        label: label.to_string(),
        value,
    }
}

fn matches_label(count: u32) -> String {
    format!("{} match{}", count, if count == 1 { "" } else { "es" })
}

fn team_history_item(membership: &MembershipSummary, today: NaiveDate) -> TeamHistoryItem {
    let start_label = format_month_year(membership.start_date.as_deref());
    let end_label = match membership.end_date.as_deref() {
        None => Some("Present".to_string()),
        Some(end) => format_month_year(Some(end)),
    };

    let range_label = if start_label.is_some() || end_label.is_some() {
        format!(
            "{} \u{2013} {}",
            start_label.as_deref().unwrap_or("Unknown start"),
            end_label.as_deref().unwrap_or("Unknown end")
        )
    } else {
        "Dates unavailable".to_string()
    };

    TeamHistoryItem {
        id: membership.id.clone(),
        team_name: membership.team_name.clone(),
        location: membership
            .team_location
            .clone()
            .unwrap_or_else(|| "Location unknown".to_string()),
        range_label,
        duration_label: format_duration(
            membership.start_date.as_deref(),
            membership.end_date.as_deref(),
            today,
        ),
        is_current: membership.end_date.is_none(),
    }
}

pub fn build_profile_view(stats: &PlayerComputedStats, today: NaiveDate) -> PlayerProfileView {
    let basics = &stats.basics;

    let profile = ProfileCard {
        name: basics.full_name.clone(),
        handle: basics.handle.clone(),
        role: DEFAULT_ROLE.to_string(),
        team: basics.team_name.clone(),
        location: basics.team_location.clone(),
        joined: basics.joined_label.clone(),
        bio: basics.bio.clone(),
        cover_image: basics
            .cover_url
            .clone()
            .unwrap_or_else(|| DEFAULT_COVER_IMAGE.to_string()),
        avatar_image: basics
            .avatar_url
            .clone()
            .unwrap_or_else(|| DEFAULT_AVATAR_IMAGE.to_string()),
    };

    let quick_stats = vec![
        stat("Win percentage", format!("{}%", stats.win_percentage)),
        stat("Current win streak", matches_label(stats.win_streak)),
        stat("Highest win streak", matches_label(stats.highest_win_streak)),
        stat("Total matches", format!("{} played", stats.total_matches)),
    ];

    let social_stats = vec![
        stat("Games won", stats.games_won.to_string()),
        stat("Games lost", stats.games_lost.to_string()),
        stat("Lines won / match", format!("{:.2} avg", stats.lines_per_match)),
    ];

    let stat_highlights = vec![
        StatHighlight {
            label: "Average point differential".to_string(),
            value: format_signed(stats.avg_point_differential, " pts"),
            change: if stats.trend.is_empty() {
                "Across recorded matches".to_string()
            } else {
                format!("Across the last {} matches", stats.trend.len())
            },
            trend: Direction::from_bool(stats.avg_point_differential >= 0.0),
        },
        StatHighlight {
            label: "Games won vs lost".to_string(),
            value: format!("{} / {}", stats.games_won, stats.games_lost),
            change: format!("{} total games", stats.games_won + stats.games_lost),
            trend: Direction::from_bool(stats.win_streak > 0),
        },
        StatHighlight {
            label: "Lines won per match".to_string(),
            value: format!("{:.2} avg", stats.lines_per_match),
            change: format_signed(stats.lines_per_match - 1.0, " vs league average"),
            trend: Direction::from_bool(stats.lines_per_match >= 1.0),
        },
    ];

    PlayerProfileView {
        profile,
        quick_stats,
        social_stats,
        trend: stats.trend.clone(),
        stat_highlights,
        partner: stats.partner.clone(),
        team_history: basics
            .memberships
            .iter()
            .map(|m| team_history_item(m, today))
            .collect(),
        has_matches: stats.total_matches > 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlayerBasics;
    use crate::services::player_stats::compute_player_stats;

    fn basics(memberships: Vec<MembershipSummary>) -> PlayerBasics {
        PlayerBasics {
            player_id: "p".into(),
            full_name: "Ava Morales".into(),
            handle: "@ava".into(),
            team_name: "Net Ninjas".into(),
            team_location: "Austin".into(),
            joined_label: "Joined 2024".into(),
            bio: None,
            avatar_url: None,
            cover_url: Some("https://img/cover.jpg".into()),
            memberships,
        }
    }

    fn membership(start: Option<&str>, end: Option<&str>) -> MembershipSummary {
        MembershipSummary {
            id: "m-1".into(),
            team_id: "t-1".into(),
            team_name: "Net Ninjas".into(),
            team_location: None,
            start_date: start.map(str::to_string),
            end_date: end.map(str::to_string),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 16).unwrap()
    }

    #[test]
    fn test_empty_stats_view() {
        let stats = compute_player_stats(basics(vec![]), &[]);
        let view = build_profile_view(&stats, today());

        assert!(!view.has_matches);
        assert_eq!(view.profile.avatar_image, DEFAULT_AVATAR_IMAGE);
        assert_eq!(view.profile.cover_image, "https://img/cover.jpg");
        assert_eq!(view.quick_stats[0].value, "0%");
        assert_eq!(view.quick_stats[1].value, "0 matches");
        assert_eq!(view.social_stats[2].value, "0.00 avg");
        assert_eq!(view.stat_highlights[0].value, "0 pts");
        assert_eq!(view.stat_highlights[0].change, "Across recorded matches");
        assert_eq!(view.stat_highlights[0].trend, Direction::Up);
        assert_eq!(view.stat_highlights[2].change, "-1 vs league average");
        assert_eq!(view.stat_highlights[2].trend, Direction::Down);
    }

    #[test]
    fn test_team_history_labels() {
        let stats = compute_player_stats(
            basics(vec![
                membership(Some("2024-07-01"), None),
                membership(Some("2023-01-15"), Some("2025-01-15")),
                membership(None, Some("not a date")),
            ]),
            &[],
        );
        let view = build_profile_view(&stats, today());

        let current = &view.team_history[0];
        assert!(current.is_current);
        assert_eq!(current.range_label, "Jul 2024 \u{2013} Present");
        assert_eq!(current.duration_label, "1 yr 3 mos");
        assert_eq!(current.location, "Location unknown");

        let past = &view.team_history[1];
        assert!(!past.is_current);
        assert_eq!(past.range_label, "Jan 2023 \u{2013} Jan 2025");
        assert_eq!(past.duration_label, "2 yrs");

        let unknown = &view.team_history[2];
        assert_eq!(unknown.range_label, "Dates unavailable");
        assert_eq!(unknown.duration_label, "Tenure unknown");
    }
}
