//! Demo league for the local backend: four teams, twelve players and a
//! handful of completed matches entered through the regular save path.

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::SqlitePool;

use super::{clear_all_data, SqliteStore};
use crate::models::NewMatch;
use crate::services::match_entry::{save_match, GameScoreInput, LineForm, MatchEntryForm, PairSlots};
use crate::store::LeagueStore;

/// Player whose profile the CLI and API show when none is given.
pub const DEMO_PLAYER_ID: &str = "5e1f0a3c-7b2d-4c8e-9a10-000000000001";

// Fixed ids keep DEMO_PLAYER_ID and bookmarked team pages stable across reseeds.
fn person_id(n: u32) -> String {
    format!("5e1f0a3c-7b2d-4c8e-9a10-{:012}", n)
}

fn team_id(n: u32) -> String {
    format!("7a6b1c2d-0e3f-4a5b-8c9d-{:012}", n)
}

fn membership_id(n: u32) -> String {
    format!("b2c3d4e5-6f70-4a81-9b2c-{:012}", n)
}

struct SeedPerson {
    first: &'static str,
    last: &'static str,
    preferred: Option<&'static str>,
    email: &'static str,
    phone: &'static str,
    birthday: &'static str,
}

const PEOPLE: &[SeedPerson] = &[
    SeedPerson { first: "Ava", last: "Morales", preferred: None, email: "ava.morales@rainierpickle.com", phone: "+1-206-555-0142", birthday: "1991-04-18" },
    SeedPerson { first: "Jordan", last: "Patel", preferred: Some("Jordy"), email: "jordan.patel@rainierpickle.com", phone: "+1-206-555-0177", birthday: "1988-09-02" },
    SeedPerson { first: "Leah", last: "Chen", preferred: None, email: "leah.chen@baycitydinks.com", phone: "+1-415-555-0119", birthday: "1994-01-27" },
    SeedPerson { first: "Mateo", last: "Alvarez", preferred: None, email: "mateo.alvarez@baycitydinks.com", phone: "+1-415-555-0163", birthday: "1990-06-11" },
    SeedPerson { first: "Brooke", last: "Simmons", preferred: None, email: "brooke.simmons@cascadiadq.com", phone: "+1-206-555-0188", birthday: "1996-12-03" },
    SeedPerson { first: "Dylan", last: "Hart", preferred: None, email: "dylan.hart@rainierpickle.com", phone: "+1-206-555-0105", birthday: "1987-03-22" },
    SeedPerson { first: "Priya", last: "Nair", preferred: None, email: "priya.nair@cascadiadq.com", phone: "+1-206-555-0134", birthday: "1993-08-14" },
    SeedPerson { first: "Sean", last: "Gallagher", preferred: None, email: "sean.gallagher@baycitydinks.com", phone: "+1-415-555-0191", birthday: "1985-11-30" },
    SeedPerson { first: "Naomi", last: "Fitzgerald", preferred: None, email: "naomi.fitzgerald@harborridge.com", phone: "+1-360-555-0126", birthday: "1992-05-09" },
    SeedPerson { first: "Lucas", last: "Grayson", preferred: None, email: "lucas.grayson@harborridge.com", phone: "+1-360-555-0150", birthday: "1989-02-16" },
    SeedPerson { first: "Cora", last: "Mitchell", preferred: None, email: "cora.mitchell@cascadiadq.com", phone: "+1-206-555-0171", birthday: "1997-07-25" },
    SeedPerson { first: "Ethan", last: "Brooks", preferred: None, email: "ethan.brooks@rainierpickle.com", phone: "+1-206-555-0113", birthday: "1995-10-06" },
];

const TEAMS: &[(&str, &str)] = &[
    ("Rainier Smash", "Green Lake Pickle Center (Seattle, WA)"),
    ("Bay City Dinks", "Mission Bay Courts (San Francisco, CA)"),
    ("Cascadia Dink Queens", "Capitol Hill Courts (Seattle, WA)"),
    ("Harbor Ridge Waves", "Harbor Ridge Athletic Club (Bremerton, WA)"),
];

/// (person, team, role, start, end)
const MEMBERSHIPS: &[(u32, u32, &str, &str, Option<&str>)] = &[
    (1, 4, "player", "2024-03-01", Some("2025-06-30")),
    (1, 1, "player", "2025-07-01", None),
    (2, 1, "captain", "2024-09-01", None),
    (6, 1, "player", "2025-09-02", None),
    (12, 1, "player", "2025-09-02", None),
    (3, 2, "captain", "2024-09-01", None),
    (4, 2, "player", "2025-09-02", None),
    (8, 2, "player", "2025-09-02", None),
    (5, 3, "player", "2025-09-02", None),
    (7, 3, "captain", "2024-09-01", None),
    (11, 3, "player", "2025-09-02", None),
    (9, 4, "captain", "2023-04-15", None),
    (10, 4, "player", "2025-09-02", None),
];

/// (person, handle, bio)
const PROFILES: &[(u32, &str, &str)] = &[
    (1, "avam", "Lefty with soft hands at the kitchen line. Drops first, drives later."),
    (2, "@jpatel", "Rainier Smash captain. Will talk your ear off about third-shot drops."),
    (9, "naomi.f", "Harbor Ridge lifer and resident lob specialist."),
];

struct SeedLine {
    home: (u32, u32),
    away: (u32, u32),
    games: &'static [(u32, u32)],
}

struct SeedMatch {
    date: &'static str,
    time: &'static str,
    home: u32,
    away: u32,
    location: &'static str,
    lines: &'static [SeedLine],
}

const MATCHES: &[SeedMatch] = &[
    SeedMatch {
        date: "2025-10-05",
        time: "17:00:00+00",
        home: 3,
        away: 4,
        location: "Capitol Hill Courts (Seattle, WA)",
        lines: &[
            SeedLine { home: (5, 7), away: (9, 10), games: &[(11, 7), (12, 10)] },
            SeedLine { home: (7, 11), away: (9, 10), games: &[(11, 6), (9, 11), (11, 4)] },
        ],
    },
    SeedMatch {
        date: "2025-10-12",
        time: "18:30:00+00",
        home: 1,
        away: 2,
        location: "Green Lake Pickle Center (Seattle, WA)",
        lines: &[
            SeedLine { home: (1, 2), away: (3, 4), games: &[(11, 8), (6, 11), (11, 9)] },
            SeedLine { home: (6, 12), away: (8, 3), games: &[(9, 11), (8, 11)] },
            SeedLine { home: (1, 6), away: (4, 8), games: &[(11, 5), (11, 7)] },
        ],
    },
    SeedMatch {
        date: "2025-10-19",
        time: "18:00:00+00",
        home: 2,
        away: 1,
        location: "Mission Bay Courts (San Francisco, CA)",
        lines: &[
            SeedLine { home: (3, 4), away: (1, 2), games: &[(11, 9), (8, 11), (10, 12)] },
            SeedLine { home: (8, 3), away: (1, 12), games: &[(11, 3), (11, 6)] },
            SeedLine { home: (4, 8), away: (2, 6), games: &[(7, 11), (11, 5), (6, 11)] },
        ],
    },
    SeedMatch {
        date: "2025-10-26",
        time: "19:00:00+00",
        home: 1,
        away: 3,
        location: "Green Lake Pickle Center (Seattle, WA)",
        lines: &[
            SeedLine { home: (1, 12), away: (5, 11), games: &[(11, 4), (11, 2)] },
            SeedLine { home: (2, 6), away: (7, 5), games: &[(5, 11), (11, 9), (9, 11)] },
        ],
    },
];

/// Scheduled fixtures without results: (date, time, home, away, location).
const SCHEDULED: &[(&str, &str, u32, u32, &str)] = &[
    ("2025-11-09", "18:30:00+00", 2, 1, "Mission Bay Courts (San Francisco, CA)"),
    ("2025-11-16", "17:00:00+00", 4, 3, "Harbor Ridge Athletic Club (Bremerton, WA)"),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeedSummary {
    pub people: usize,
    pub teams: usize,
    pub memberships: usize,
    pub matches: usize,
    pub lines: usize,
}

async fn insert_people(pool: &SqlitePool) -> Result<()> {
    for (index, person) in PEOPLE.iter().enumerate() {
        sqlx::query(
            r#"INSERT OR REPLACE INTO person (id,first_name,last_name,preferred_name,email,phone_mobile,birthday)
               VALUES (?,?,?,?,?,?,?)"#,
        )
        .bind(person_id(index as u32 + 1))
        .bind(person.first)
        .bind(person.last)
        .bind(person.preferred)
        .bind(person.email)
        .bind(person.phone)
        .bind(person.birthday)
        .execute(pool)
        .await?;
    }

    for (person, handle, bio) in PROFILES {
        sqlx::query("INSERT OR REPLACE INTO player_profile (person_id,handle,bio) VALUES (?,?,?)")
            .bind(person_id(*person))
            .bind(handle)
            .bind(bio)
            .execute(pool)
            .await?;
    }
    Ok(())
}

async fn insert_teams(pool: &SqlitePool) -> Result<()> {
    for (index, (name, location)) in TEAMS.iter().enumerate() {
        sqlx::query("INSERT OR REPLACE INTO team (id,name,location) VALUES (?,?,?)")
            .bind(team_id(index as u32 + 1))
            .bind(name)
            .bind(location)
            .execute(pool)
            .await?;
    }

    for (index, (person, team, role, start, end)) in MEMBERSHIPS.iter().enumerate() {
        sqlx::query(
            r#"INSERT OR REPLACE INTO team_membership (id,person_id,team_id,role,start_date,end_date)
               VALUES (?,?,?,?,?,?)"#,
        )
        .bind(membership_id(index as u32 + 1))
        .bind(person_id(*person))
        .bind(team_id(*team))
        .bind(role)
        .bind(start)
        .bind(end)
        .execute(pool)
        .await?;
    }
    Ok(())
}

fn entry_form(seed: &SeedMatch) -> MatchEntryForm {
    let pair = |(first, second): (u32, u32)| PairSlots {
        player1_id: person_id(first),
        player2_id: person_id(second),
    };

    MatchEntryForm {
        home_team_id: team_id(seed.home),
        away_team_id: team_id(seed.away),
        match_date: seed.date.to_string(),
        match_time: seed.time.to_string(),
        location: seed.location.to_string(),
        lines: seed
            .lines
            .iter()
            .enumerate()
            .map(|(index, line)| LineForm {
                id: format!("seed-line-{}", index + 1),
                line_number: index as i64 + 1,
                team_h: pair(line.home),
                team_a: pair(line.away),
                games: line
                    .games
                    .iter()
                    .map(|(home, away)| GameScoreInput::new(home, away))
                    .collect(),
                winner_team_id: None,
            })
            .collect(),
    }
}

/// Wipe the local database and load the demo league.
pub async fn seed_data(store: &SqliteStore) -> Result<SeedSummary> {
    let pool = store.pool();
    clear_all_data(pool).await?;

    insert_people(pool).await.context("seeding people")?;
    insert_teams(pool).await.context("seeding teams")?;

    let mut summary = SeedSummary {
        people: PEOPLE.len(),
        teams: TEAMS.len(),
        memberships: MEMBERSHIPS.len(),
        ..SeedSummary::default()
    };

    for seed in MATCHES {
        let saved = save_match(store, &entry_form(seed))
            .await
            .with_context(|| format!("seeding match on {}", seed.date))?;
        summary.matches += 1;
        summary.lines += saved.line_ids.len();
    }

    for (date, time, home, away, location) in SCHEDULED {
        store
            .insert_match(&NewMatch {
                home_team_id: team_id(*home),
                away_team_id: team_id(*away),
                match_date: date.to_string(),
                match_time: time.to_string(),
                location: location.to_string(),
                winner_team_id: None,
            })
            .await?;
        summary.matches += 1;
    }

    tracing::info!(
        "Seeded {} people, {} teams, {} matches, {} lines",
        summary.people,
        summary.teams,
        summary.matches,
        summary.lines
    );
    Ok(summary)
}
