use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameScore {
    pub for_score: f64,
    pub against_score: f64,
}

impl GameScore {
    pub fn margin(&self) -> f64 {
        self.for_score - self.against_score
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerIdentity {
    pub id: String,
    pub full_name: String,
}

/// One player's view of a single match line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPlayerLine {
    pub id: String,
    pub match_id: String,
    pub match_date: Option<DateTime<Utc>>,
    pub match_label: String,
    pub match_location: Option<String>,
    pub player_team_id: String,
    pub opponent_team_id: String,
    pub line_number: i64,
    pub is_home: bool,
    /// `None` until a winner has been recorded for the line.
    pub line_win: Option<bool>,
    pub games: Vec<GameScore>,
    pub partner: Option<PartnerIdentity>,
}

impl NormalizedPlayerLine {
    pub fn point_differential(&self) -> f64 {
        self.games.iter().map(GameScore::margin).sum()
    }

    pub fn sort_millis(&self) -> i64 {
        self.match_date.map(|d| d.timestamp_millis()).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinStreaks {
    pub current: u32,
    pub longest: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerStats {
    pub name: String,
    pub matches: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_pct: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineAggregates {
    pub games_won: u32,
    pub games_lost: u32,
    pub lines_won: u32,
    pub lines_lost: u32,
    pub total_matches: u32,
    pub win_percentage: u32,
    pub lines_per_match: f64,
    pub avg_point_differential: f64,
    pub trend: Vec<TrendPoint>,
    pub point_differential: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipSummary {
    pub id: String,
    pub team_id: String,
    pub team_name: String,
    pub team_location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerBasics {
    pub player_id: String,
    pub full_name: String,
    pub handle: String,
    pub team_name: String,
    pub team_location: String,
    pub joined_label: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub cover_url: Option<String>,
    pub memberships: Vec<MembershipSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerComputedStats {
    pub basics: PlayerBasics,
    pub win_percentage: u32,
    pub win_streak: u32,
    pub highest_win_streak: u32,
    pub total_matches: u32,
    pub games_won: u32,
    pub games_lost: u32,
    pub lines_won: u32,
    pub lines_lost: u32,
    pub lines_per_match: f64,
    pub avg_point_differential: f64,
    pub trend: Vec<TrendPoint>,
    pub partner: Option<PartnerStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingRecord {
    pub team_id: Option<String>,
    pub team_name: String,
    pub matches_won: Option<f64>,
    pub matches_lost: Option<f64>,
    pub win_percentage: Option<f64>,
    pub total_points: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub role: Option<String>,
    pub person: super::PersonRow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerOption {
    pub id: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchResult {
    Win,
    Loss,
    Tie,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchLinePlayer {
    pub id: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchLineGame {
    pub id: Option<String>,
    pub home_score: Option<f64>,
    pub away_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchLineTotals {
    pub home: Option<f64>,
    pub away: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchLineDetail {
    pub id: String,
    pub line_number: i64,
    pub winner_team_id: Option<String>,
    pub result: MatchResult,
    pub games: Vec<MatchLineGame>,
    pub home_players: Vec<MatchLinePlayer>,
    pub away_players: Vec<MatchLinePlayer>,
    pub total_points: MatchLineTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchHistoryEntry {
    pub id: String,
    pub team_id: String,
    pub match_date: Option<DateTime<Utc>>,
    pub match_date_label: String,
    pub match_time: Option<String>,
    pub location: Option<String>,
    pub opponent_name: String,
    pub opponent_id: String,
    pub is_home_match: bool,
    pub team_score: u32,
    pub opponent_score: u32,
    pub result: MatchResult,
    pub points_earned: u32,
    pub games_won: u32,
    pub games_lost: u32,
    pub lines: Vec<MatchLineDetail>,
}
