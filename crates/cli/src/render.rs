use aicc_core::domain::job::JobState;
use aicc_core::domain::recommendation::{HistoryEntry, RecommendationPayload, RecommendedCard};
use std::fmt::Write;

const MAX_CELL: usize = 40;
const EMPTY: &str = "-";

/// Side-by-side comparison of the recommended cards, followed by per-card notes.
pub fn recommendation(payload: &RecommendationPayload) -> String {
    let mut out = String::new();

    if let Some(summary) = payload.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        let _ = writeln!(out, "{}\n", summary.trim());
    }

    if payload.cards.is_empty() {
        out.push_str("No cards matched these preferences.\n");
        return out;
    }

    out.push_str(&comparison_table(&payload.cards));
    for (i, card) in payload.cards.iter().enumerate() {
        out.push('\n');
        out.push_str(&card_notes(i + 1, card));
    }
    if payload.count > payload.cards.len() {
        let _ = writeln!(
            out,
            "\n({} of {} recommendations could be displayed)",
            payload.cards.len(),
            payload.count
        );
    }
    out
}

pub fn comparison_table(cards: &[RecommendedCard]) -> String {
    let header = ["#", "Card", "Bank", "Network", "Annual fee", "Rewards"];
    let rows: Vec<[String; 6]> = cards
        .iter()
        .enumerate()
        .map(|(i, c)| {
            [
                (i + 1).to_string(),
                cell(&c.name),
                cell(&c.bank),
                cell(&c.card_type),
                cell(&c.annual_fee),
                cell(&c.rewards),
            ]
        })
        .collect();

    let mut widths = header.map(|h| h.chars().count());
    for row in &rows {
        for (w, value) in widths.iter_mut().zip(row) {
            *w = (*w).max(value.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &header.map(str::to_string), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(rule.join("-+-").as_str());
    out.push('\n');
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, row: &[String; 6], widths: &[usize; 6]) {
    let cells: Vec<String> = row
        .iter()
        .zip(widths)
        .map(|(value, &w)| format!("{value:<w$}"))
        .collect();
    out.push_str(cells.join(" | ").trim_end());
    out.push('\n');
}

fn cell(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        return EMPTY.to_string();
    }
    if value.chars().count() <= MAX_CELL {
        return value.to_string();
    }
    let mut cut: String = value.chars().take(MAX_CELL - 1).collect();
    cut.push('…');
    cut
}

fn card_notes(rank: usize, card: &RecommendedCard) -> String {
    let mut out = String::new();
    let title = if card.name.trim().is_empty() {
        "Unnamed card"
    } else {
        card.name.trim()
    };
    let _ = writeln!(out, "{rank}. {title}");
    if !card.description.trim().is_empty() {
        let _ = writeln!(out, "   {}", card.description.trim());
    }
    for pro in &card.pros {
        let _ = writeln!(out, "   + {pro}");
    }
    for con in &card.cons {
        let _ = writeln!(out, "   - {con}");
    }
    if !card.apply_url.trim().is_empty() {
        let _ = writeln!(out, "   Apply: {}", card.apply_url.trim());
    }
    out
}

pub fn history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "No past recommendations.\n".to_string();
    }

    let mut out = String::new();
    for entry in entries {
        let cards = match entry.cards {
            Some(1) => " (1 card)".to_string(),
            Some(n) => format!(" ({n} cards)"),
            None => String::new(),
        };
        let title = if entry.title.trim().is_empty() {
            "Recommendation"
        } else {
            entry.title.trim()
        };
        let _ = writeln!(
            out,
            "{:<12} {}  {title}{cards}",
            display_date(&entry.date),
            entry.id
        );
        if !entry.summary.trim().is_empty() {
            let _ = writeln!(out, "{:<12} {}", "", entry.summary.trim());
        }
    }
    out
}

/// Timestamps from the history endpoint shown as a calendar date.
fn display_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return EMPTY.to_string();
    }
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(raw) {
        return ts.date_naive().format("%Y-%m-%d").to_string();
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }
    raw.to_string()
}

/// One-line progress message for a state transition.
pub fn progress(state: &JobState) -> String {
    match state {
        JobState::Idle => "ready".to_string(),
        JobState::Submitting => "submitting preferences...".to_string(),
        JobState::Processing { job_id, attempts: 0 } => {
            format!("job {job_id} accepted, analyzing...")
        }
        JobState::Processing { job_id, attempts } => {
            format!("job {job_id} still processing (check {attempts})")
        }
        JobState::Completed(p) | JobState::ImmediateResult(p) => {
            format!("done: {} recommendation(s)", p.cards.len())
        }
        JobState::Failed { message } => format!("failed: {message}"),
        JobState::TimedOut => "timed out waiting for the recommendation".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aicc_core::domain::recommendation::JobId;
    use serde_json::json;

    fn card(name: &str, fee: &str) -> RecommendedCard {
        serde_json::from_value(json!({
            "name": name,
            "bank": "Chase",
            "cardType": "VISA",
            "annualFee": fee,
            "rewards": "3x dining",
            "pros": ["No foreign fees"],
            "cons": ["Annual fee"],
            "applyUrl": "https://example.com/apply",
        }))
        .unwrap()
    }

    fn payload(cards: Vec<RecommendedCard>) -> RecommendationPayload {
        RecommendationPayload {
            count: cards.len(),
            cards,
            filters: None,
            summary: Some("Best for dining".to_string()),
            raw: json!({}),
        }
    }

    #[test]
    fn table_aligns_columns() {
        let table = comparison_table(&[card("Sapphire Preferred", "$95"), card("Freedom", "$0")]);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("# | Card "));
        let bank_col = lines[0].find("Bank").unwrap();
        assert_eq!(lines[2].find("Chase"), Some(bank_col));
        assert_eq!(lines[3].find("Chase"), Some(bank_col));
    }

    #[test]
    fn missing_fields_render_as_dash() {
        let table = comparison_table(&[RecommendedCard::default()]);
        assert!(table.lines().nth(2).unwrap().contains("| -"));
    }

    #[test]
    fn long_cells_are_truncated() {
        let long = "x".repeat(80);
        assert_eq!(cell(&long).chars().count(), MAX_CELL);
        assert!(cell(&long).ends_with('…'));
    }

    #[test]
    fn recommendation_includes_summary_and_notes() {
        let out = recommendation(&payload(vec![card("Sapphire Preferred", "$95")]));
        assert!(out.starts_with("Best for dining\n"));
        assert!(out.contains("1. Sapphire Preferred"));
        assert!(out.contains("   + No foreign fees"));
        assert!(out.contains("   - Annual fee"));
        assert!(out.contains("Apply: https://example.com/apply"));
    }

    #[test]
    fn empty_result_says_so() {
        let out = recommendation(&payload(Vec::new()));
        assert!(out.contains("No cards matched"));
    }

    #[test]
    fn history_formats_dates() {
        let entries: Vec<HistoryEntry> = serde_json::from_value(json!([
            {"id": "r1", "createdAt": "2024-03-05T10:00:00Z", "title": "Travel", "cards": 3},
            {"id": "r2", "date": "last week", "title": ""},
        ]))
        .unwrap();

        let out = history(&entries);
        assert!(out.contains("2024-03-05   r1  Travel (3 cards)"));
        assert!(out.contains("last week    r2  Recommendation"));
    }

    #[test]
    fn progress_mentions_attempts() {
        let state = JobState::Processing {
            job_id: JobId::new("abc"),
            attempts: 2,
        };
        assert_eq!(progress(&state), "job abc still processing (check 2)");
    }
}
