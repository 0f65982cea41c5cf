//! Plain-text rendering of scoreboard data.

use scoreboard_core::{
    Calculation, CohortConfig, CohortTally, ConfirmedMatchRecord, GameMode, MatchProposal, Overview,
    PlayerId, PlayerRatingRecord, PlayerSummary, RankingRow,
};
use std::fmt::Write;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

fn side(players: &[PlayerId]) -> String {
    players.join(" & ")
}

fn signed(delta: i32) -> String {
    format!("{delta:+}")
}

pub fn win_rate(rate: Option<f64>) -> String {
    rate.map_or_else(|| "-".to_string(), |r| format!("{r:.1}%"))
}

pub fn proposal(p: &MatchProposal) -> String {
    let winner = p.winners.first().and_then(|w| p.deltas.get(w)).copied().unwrap_or(0);
    let loser = p.losers.first().and_then(|l| p.deltas.get(l)).copied().unwrap_or(0);
    format!(
        "#{} [{}] {} beat {} ({} / {}), expires {} UTC",
        p.id,
        p.mode.display_name(),
        side(&p.winners),
        side(&p.losers),
        signed(winner),
        signed(loser),
        p.expires_at.format(TIME_FORMAT),
    )
}

pub fn confirmed(record: &ConfirmedMatchRecord) -> String {
    format!(
        "{} [{}] {} beat {} ({})",
        record.confirmed_at.format(TIME_FORMAT),
        record.mode.display_name(),
        side(&record.winners),
        side(&record.losers),
        signed(record.winner_delta().unwrap_or(0)),
    )
}

pub fn rating(player: &str, mode: GameMode, record: &PlayerRatingRecord) -> String {
    let mut out = format!(
        "{player} in {}: {} ({}W {}L, win rate {})\n",
        mode.display_name(),
        record.rating,
        record.wins,
        record.losses,
        win_rate(record.win_rate()),
    );
    for entry in record.history.iter().rev() {
        let _ = write!(
            out,
            "  {} {:>4} vs {}",
            entry.date.format(TIME_FORMAT),
            signed(entry.delta),
            side(&entry.opponents),
        );
        if let Some(teammate) = &entry.teammate {
            let _ = write!(out, " (with {teammate})");
        }
        out.push('\n');
    }
    out
}

pub fn rankings(mode: GameMode, rows: &[RankingRow]) -> String {
    let mut out = format!("{}\n", mode.display_name());
    let _ = writeln!(out, "{:>3}  {:<20} {:>6} {:>4} {:>4} {:>7}", "#", "Player", "Rating", "W", "L", "Win%");
    for (i, row) in rows.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}  {:<20} {:>6} {:>4} {:>4} {:>7}",
            i + 1,
            row.player,
            row.rating,
            row.wins,
            row.losses,
            win_rate(row.win_rate),
        );
    }
    out
}

pub fn summary(s: &PlayerSummary) -> String {
    let mut out = format!(
        "{}: {} games, {} wins, win rate {}\n",
        s.player,
        s.total_games,
        s.total_wins,
        win_rate(s.win_rate),
    );
    for (mode, rating) in &s.ratings {
        let _ = writeln!(out, "  {:<14} {}", mode.display_name(), rating);
    }
    match s.best_mode {
        Some((mode, rating)) => {
            let _ = writeln!(out, "Best: {} ({rating})", mode.display_name());
        }
        None => out.push_str("Best: -\n"),
    }
    out
}

pub fn overview(view: &Overview) -> String {
    let mut out = format!(
        "Matches: {}   Active players: {}   This week: {}\n",
        view.total_matches, view.active_players, view.matches_this_week,
    );

    out.push_str("\nRecent matches\n");
    if view.recent.is_empty() {
        out.push_str("  No matches yet\n");
    }
    for record in &view.recent {
        let _ = writeln!(out, "  {}", confirmed(record));
    }

    out.push_str("\nTop players\n");
    for (mode, top) in &view.top_players {
        let names = if top.is_empty() {
            "No games played yet".to_string()
        } else {
            top.iter()
                .enumerate()
                .map(|(i, row)| format!("{}. {} {}", i + 1, row.player, row.rating))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let _ = writeln!(out, "  {:<14} {names}", mode.display_name());
    }
    out
}

pub fn tally(tally: &CohortTally, cohorts: &CohortConfig) -> String {
    format!(
        "{} {} - {} {}",
        cohorts.a_label, tally.a, tally.b, cohorts.b_label
    )
}

pub fn calculation(rating_a: f64, rating_b: f64, calc: &Calculation) -> String {
    format!(
        "A ({rating_a}) beats B ({rating_b}) with probability {:.1}%\nIf A wins: A {}, B {}",
        calc.win_probability * 100.0,
        signed(calc.delta.winner),
        signed(calc.delta.loser),
    )
}
