use std::collections::HashMap;

use anyhow::Context;

use crate::error::LeagueError;
use crate::models::{
    LineAggregates, MembershipSummary, NormalizedPlayerLine, PartnerStats, PersonRow, PlayerBasics,
    PlayerComputedStats, PlayerProfileRow, TeamMembershipRow, TrendPoint, WinStreaks,
};
use crate::services::player_lines::normalize_player_lines;
use crate::store::LeagueStore;
use crate::utils::{format_full_name, to_average, to_percentage};

const TREND_WINDOW: usize = 8;

fn is_chronological(lines: &[NormalizedPlayerLine]) -> bool {
    lines
        .windows(2)
        .all(|pair| pair[0].sort_millis() <= pair[1].sort_millis())
}

fn ensure_chronological(lines: &[NormalizedPlayerLine]) -> Vec<&NormalizedPlayerLine> {
    let mut ordered: Vec<&NormalizedPlayerLine> = lines.iter().collect();
    if !is_chronological(lines) {
        ordered.sort_by_key(|line| line.sort_millis());
    }
    ordered
}

/// Longest run of won lines anywhere, and the run ending at the latest line.
/// Losses and undecided lines both break a run.
pub fn compute_win_streaks(lines: &[NormalizedPlayerLine]) -> WinStreaks {
    let mut streaks = WinStreaks::default();

    for line in ensure_chronological(lines) {
        if line.line_win == Some(true) {
            streaks.current += 1;
            streaks.longest = streaks.longest.max(streaks.current);
        } else {
            streaks.current = 0;
        }
    }

    streaks
}

/// The partner the player shared the most lines with, ties going to the
/// better win percentage and then to whoever appeared first.
pub fn build_partner_stats(lines: &[NormalizedPlayerLine]) -> Option<PartnerStats> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_partner: HashMap<&str, PartnerStats> = HashMap::new();

    for line in lines {
        let Some(partner) = &line.partner else {
            continue;
        };

        let entry = by_partner.entry(partner.id.as_str()).or_insert_with(|| {
            order.push(partner.id.as_str());
            PartnerStats {
                name: partner.full_name.clone(),
                matches: 0,
                wins: 0,
                losses: 0,
                win_pct: 0,
            }
        });

        entry.matches += 1;
        match line.line_win {
            Some(true) => entry.wins += 1,
            Some(false) => entry.losses += 1,
            None => {}
        }
    }

    let mut best: Option<PartnerStats> = None;
    for id in order {
        let Some(mut candidate) = by_partner.remove(id) else {
            continue;
        };
        candidate.win_pct = to_percentage(candidate.wins, candidate.matches);

        best = match best {
            Some(current)
                if candidate.matches < current.matches
                    || (candidate.matches == current.matches && candidate.win_pct <= current.win_pct) =>
            {
                Some(current)
            }
            _ => Some(candidate),
        };
    }

    best
}

pub fn build_line_aggregates(lines: &[NormalizedPlayerLine]) -> LineAggregates {
    let mut aggregates = LineAggregates::default();

    for line in lines {
        match line.line_win {
            Some(true) => aggregates.lines_won += 1,
            Some(false) => aggregates.lines_lost += 1,
            None => {}
        }

        for game in &line.games {
            let margin = game.margin();
            aggregates.point_differential += margin;
            if margin > 0.0 {
                aggregates.games_won += 1;
            } else if margin < 0.0 {
                aggregates.games_lost += 1;
            }
        }
    }

    let total = lines.len() as u32;
    aggregates.total_matches = total;
    aggregates.win_percentage = to_percentage(aggregates.lines_won, total);
    aggregates.lines_per_match = to_average(f64::from(aggregates.lines_won), total);
    aggregates.avg_point_differential = to_average(aggregates.point_differential, total);
    aggregates.trend = lines
        .iter()
        .skip(lines.len().saturating_sub(TREND_WINDOW))
        .map(|line| TrendPoint {
            label: line.match_label.clone(),
            value: line.point_differential(),
        })
        .collect();

    aggregates
}

pub fn compute_player_stats(basics: PlayerBasics, lines: &[NormalizedPlayerLine]) -> PlayerComputedStats {
    if lines.is_empty() {
        return PlayerComputedStats {
            basics,
            win_percentage: 0,
            win_streak: 0,
            highest_win_streak: 0,
            total_matches: 0,
            games_won: 0,
            games_lost: 0,
            lines_won: 0,
            lines_lost: 0,
            lines_per_match: 0.0,
            avg_point_differential: 0.0,
            trend: Vec::new(),
            partner: None,
        };
    }

    let aggregates = build_line_aggregates(lines);
    let streaks = compute_win_streaks(lines);

    PlayerComputedStats {
        basics,
        win_percentage: aggregates.win_percentage,
        win_streak: streaks.current,
        highest_win_streak: streaks.longest,
        total_matches: aggregates.total_matches,
        games_won: aggregates.games_won,
        games_lost: aggregates.games_lost,
        lines_won: aggregates.lines_won,
        lines_lost: aggregates.lines_lost,
        lines_per_match: aggregates.lines_per_match,
        avg_point_differential: aggregates.avg_point_differential,
        trend: aggregates.trend,
        partner: build_partner_stats(lines),
    }
}

fn player_handle(person: &PersonRow, profile: Option<&PlayerProfileRow>) -> String {
    let profile_handle = profile
        .and_then(|p| p.handle.as_deref())
        .map(str::trim)
        .filter(|h| !h.is_empty());
    let preferred = person
        .preferred_name
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    match (profile_handle, preferred) {
        (Some(handle), _) if handle.starts_with('@') => handle.to_string(),
        (Some(handle), _) => format!("@{}", handle),
        (None, Some(preferred)) => format!("@{}", preferred.to_lowercase()),
        (None, None) => format!("@{}", person.id),
    }
}

fn summarize_membership(membership: &TeamMembershipRow) -> MembershipSummary {
    let team = membership.team.first();
    MembershipSummary {
        id: membership
            .id
            .clone()
            .unwrap_or_else(|| format!("{}:{}", membership.team_id, membership.start_date.as_deref().unwrap_or(""))),
        team_id: membership.team_id.clone(),
        team_name: team.map(|t| t.name.clone()).unwrap_or_else(|| "Unknown team".to_string()),
        team_location: team.and_then(|t| t.location.clone()),
        start_date: membership.start_date.clone(),
        end_date: membership.end_date.clone(),
    }
}

/// Open membership with the latest start, else the latest membership.
fn current_membership(memberships: &[TeamMembershipRow]) -> Option<&TeamMembershipRow> {
    memberships
        .iter()
        .find(|m| m.end_date.is_none())
        .or_else(|| memberships.first())
}

pub fn build_player_basics(
    player_id: &str,
    person: &PersonRow,
    profile: Option<&PlayerProfileRow>,
    memberships: &[TeamMembershipRow],
) -> PlayerBasics {
    let current = current_membership(memberships);
    let team = current.and_then(|m| m.team.first());
    let non_blank = |value: &Option<String>| value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string);

    PlayerBasics {
        player_id: player_id.to_string(),
        full_name: format_full_name(person.first_name.as_deref(), person.last_name.as_deref()),
        handle: player_handle(person, profile),
        team_name: team
            .map(|t| t.name.clone())
            .unwrap_or_else(|| "Independent player".to_string()),
        team_location: team
            .and_then(|t| t.location.clone())
            .unwrap_or_else(|| "Location unknown".to_string()),
        joined_label: current
            .and_then(|m| m.start_date.as_deref())
            .and_then(|start| start.split('-').next())
            .filter(|year| !year.is_empty())
            .map(|year| format!("Joined {}", year))
            .unwrap_or_else(|| "Active".to_string()),
        bio: profile.and_then(|p| non_blank(&p.bio)),
        avatar_url: profile.and_then(|p| non_blank(&p.avatar_url)),
        cover_url: profile.and_then(|p| non_blank(&p.cover_url)),
        memberships: memberships.iter().map(summarize_membership).collect(),
    }
}

pub async fn get_player_basics(store: &dyn LeagueStore, player_id: &str) -> anyhow::Result<PlayerBasics> {
    let (person, profile, memberships) = tokio::try_join!(
        async {
            store
                .person(player_id)
                .await
                .context("Unable to load player details.")
        },
        async {
            store
                .player_profile(player_id)
                .await
                .context("Unable to load player profile.")
        },
        async {
            store
                .player_memberships(player_id)
                .await
                .context("Unable to load team membership.")
        },
    )?;

    let person = person.ok_or_else(|| LeagueError::NotFound(format!("player {}", player_id)))?;
    Ok(build_player_basics(player_id, &person, profile.as_ref(), &memberships))
}

pub async fn get_player_lines(store: &dyn LeagueStore, player_id: &str) -> anyhow::Result<Vec<NormalizedPlayerLine>> {
    let rows = store
        .player_line_rows(player_id)
        .await
        .context("Unable to load player match lines.")?;
    Ok(normalize_player_lines(&rows, player_id))
}

pub async fn get_player_computed_stats(
    store: &dyn LeagueStore,
    player_id: &str,
) -> anyhow::Result<PlayerComputedStats> {
    let (basics, lines) = tokio::try_join!(get_player_basics(store, player_id), get_player_lines(store, player_id))?;
    tracing::debug!("Computed stats for {} from {} lines", player_id, lines.len());
    Ok(compute_player_stats(basics, &lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameScore, PartnerIdentity, Relation, TeamRow};
    use chrono::{Duration, TimeZone, Utc};

    fn line(index: i64, win: Option<bool>, games: &[(f64, f64)], partner: Option<(&str, &str)>) -> NormalizedPlayerLine {
        let date = Utc.with_ymd_and_hms(2025, 9, 1, 18, 0, 0).unwrap() + Duration::days(7 * index);
        NormalizedPlayerLine {
            id: format!("line-{}", index),
            match_id: format!("match-{}", index),
            match_date: Some(date),
            match_label: date.format("%b %-d").to_string(),
            match_location: None,
            player_team_id: "t-1".into(),
            opponent_team_id: "t-2".into(),
            line_number: 1,
            is_home: true,
            line_win: win,
            games: games
                .iter()
                .map(|&(f, a)| GameScore { for_score: f, against_score: a })
                .collect(),
            partner: partner.map(|(id, name)| PartnerIdentity { id: id.into(), full_name: name.into() }),
        }
    }

    fn results(wins: &[Option<bool>]) -> Vec<NormalizedPlayerLine> {
        wins.iter()
            .enumerate()
            .map(|(i, w)| line(i as i64, *w, &[], None))
            .collect()
    }

    #[test]
    fn test_win_streaks_example() {
        let lines = results(&[Some(true), Some(true), Some(false), Some(true), Some(true), Some(true)]);
        assert_eq!(compute_win_streaks(&lines), WinStreaks { current: 3, longest: 3 });
    }

    #[test]
    fn test_unknown_result_breaks_streak() {
        let lines = results(&[Some(true), Some(true), None]);
        assert_eq!(compute_win_streaks(&lines), WinStreaks { current: 0, longest: 2 });
    }

    #[test]
    fn test_streaks_resorted_when_out_of_order() {
        let mut lines = results(&[Some(false), Some(true), Some(true)]);
        lines.reverse();
        assert_eq!(compute_win_streaks(&lines), WinStreaks { current: 2, longest: 2 });
    }

    #[test]
    fn test_current_never_exceeds_longest() {
        let patterns: [&[Option<bool>]; 4] = [
            &[],
            &[Some(false)],
            &[Some(true), None, Some(true), Some(true), Some(false)],
            &[Some(true); 5],
        ];
        for pattern in patterns {
            let streaks = compute_win_streaks(&results(pattern));
            assert!(streaks.current <= streaks.longest);
        }
    }

    #[test]
    fn test_line_aggregates_from_games() {
        let lines = vec![line(0, Some(true), &[(11.0, 8.0), (6.0, 11.0), (11.0, 9.0)], None)];
        let aggregates = build_line_aggregates(&lines);
        assert_eq!(aggregates.games_won, 2);
        assert_eq!(aggregates.games_lost, 1);
        assert_eq!(aggregates.lines_won, 1);
        assert_eq!(aggregates.win_percentage, 100);
        assert_eq!(aggregates.point_differential, 0.0);
        assert_eq!(aggregates.trend.len(), 1);
        assert_eq!(aggregates.trend[0].label, "Sep 1");
    }

    #[test]
    fn test_line_aggregates_rounding_and_trend_window() {
        let mut lines = Vec::new();
        for i in 0..10 {
            let win = if i % 3 == 0 { Some(false) } else { Some(true) };
            lines.push(line(i, win, &[(11.0, 9.0), (9.0, 11.0), (11.0, 10.0)], None));
        }
        let aggregates = build_line_aggregates(&lines);
        assert_eq!(aggregates.total_matches, 10);
        assert_eq!(aggregates.lines_won, 6);
        assert_eq!(aggregates.lines_lost, 4);
        assert_eq!(aggregates.win_percentage, 60);
        assert_eq!(aggregates.lines_per_match, 0.6);
        assert_eq!(aggregates.avg_point_differential, 1.0);
        assert_eq!(aggregates.trend.len(), 8);
        assert_eq!(aggregates.trend[0].label, lines[2].match_label);
    }

    #[test]
    fn test_tied_games_count_for_neither_side() {
        let lines = vec![line(0, None, &[(10.0, 10.0)], None)];
        let aggregates = build_line_aggregates(&lines);
        assert_eq!(aggregates.games_won + aggregates.games_lost, 0);
        assert_eq!(aggregates.win_percentage, 0);
    }

    #[test]
    fn test_average_point_differential_sign_follows_total() {
        let lines = vec![
            line(0, Some(false), &[(4.0, 11.0)], None),
            line(1, Some(true), &[(11.0, 9.0)], None),
        ];
        let aggregates = build_line_aggregates(&lines);
        assert!(aggregates.point_differential < 0.0);
        assert!(aggregates.avg_point_differential < 0.0);
        assert_eq!(aggregates.avg_point_differential, -2.5);
    }

    #[test]
    fn test_partner_with_most_lines_wins() {
        let lines = vec![
            line(0, Some(true), &[], Some(("b", "Ben Ortiz"))),
            line(1, Some(false), &[], Some(("c", "Cara Nguyen"))),
            line(2, Some(false), &[], Some(("c", "Cara Nguyen"))),
            line(3, None, &[], None),
        ];
        let best = build_partner_stats(&lines).unwrap();
        assert_eq!(best.name, "Cara Nguyen");
        assert_eq!((best.matches, best.wins, best.losses, best.win_pct), (2, 0, 2, 0));
    }

    #[test]
    fn test_partner_tie_goes_to_better_record_then_first_seen() {
        let lines = vec![
            line(0, Some(false), &[], Some(("b", "Ben Ortiz"))),
            line(1, Some(true), &[], Some(("c", "Cara Nguyen"))),
            line(2, Some(true), &[], Some(("d", "Dev Patel"))),
        ];
        let best = build_partner_stats(&lines).unwrap();
        assert_eq!(best.name, "Cara Nguyen");
        assert_eq!(best.win_pct, 100);
    }

    #[test]
    fn test_no_partner_recorded() {
        assert!(build_partner_stats(&results(&[Some(true)])).is_none());
    }

    fn person() -> PersonRow {
        PersonRow {
            id: "7d1c3a5e-0000-4000-8000-000000000001".into(),
            first_name: Some("Ava".into()),
            last_name: Some("Morales".into()),
            preferred_name: Some(" Aves ".into()),
            email: None,
            phone_mobile: None,
            birthday: None,
        }
    }

    fn membership(team: &str, start: &str, end: Option<&str>) -> TeamMembershipRow {
        TeamMembershipRow {
            id: Some(format!("{}-{}", team, start)),
            team_id: team.into(),
            start_date: Some(start.into()),
            end_date: end.map(str::to_string),
            team: Relation::One(TeamRow {
                id: team.into(),
                name: format!("Team {}", team),
                location: Some("Austin".into()),
            }),
        }
    }

    #[test]
    fn test_basics_defaults_without_profile_or_team() {
        let mut anonymous = person();
        anonymous.preferred_name = None;
        let basics = build_player_basics(&anonymous.id, &anonymous, None, &[]);
        assert_eq!(basics.full_name, "Ava Morales");
        assert_eq!(basics.handle, format!("@{}", anonymous.id));
        assert_eq!(basics.team_name, "Independent player");
        assert_eq!(basics.team_location, "Location unknown");
        assert_eq!(basics.joined_label, "Active");
        assert!(basics.memberships.is_empty());
    }

    #[test]
    fn test_basics_prefer_open_membership_and_profile_handle() {
        let profile = PlayerProfileRow {
            handle: Some("ava_m".into()),
            bio: Some("  ".into()),
            avatar_url: Some("https://img/ava.png".into()),
            cover_url: None,
        };
        let memberships = vec![
            membership("closed", "2025-02-01", Some("2025-06-01")),
            membership("open", "2024-03-15", None),
        ];
        let basics = build_player_basics("p", &person(), Some(&profile), &memberships);
        assert_eq!(basics.handle, "@ava_m");
        assert_eq!(basics.team_name, "Team open");
        assert_eq!(basics.joined_label, "Joined 2024");
        assert_eq!(basics.bio, None);
        assert_eq!(basics.avatar_url.as_deref(), Some("https://img/ava.png"));
        assert_eq!(basics.memberships.len(), 2);
    }

    #[test]
    fn test_handle_from_preferred_name() {
        let basics = build_player_basics("p", &person(), None, &[]);
        assert_eq!(basics.handle, "@aves");
    }

    #[test]
    fn test_no_lines_gives_zeroed_stats() {
        let basics = build_player_basics("p", &person(), None, &[]);
        let stats = compute_player_stats(basics, &[]);
        assert_eq!(stats.total_matches, 0);
        assert_eq!(stats.win_percentage, 0);
        assert!(stats.trend.is_empty());
        assert!(stats.partner.is_none());
    }

    #[tokio::test]
    async fn test_missing_person_is_not_found() {
        let store = crate::store::memory::MemoryStore::default();
        let err = get_player_basics(&store, "nobody").await.unwrap_err();
        assert!(matches!(err.downcast_ref::<LeagueError>(), Some(LeagueError::NotFound(_))));
    }
}
