//! Score string parsing
//!
//! Turns archive score strings such as `"6-4 3-6 7-6(5)"` into total games won
//! by each side.

/// Games won by (winner, loser). Unknown or malformed scores give (0, 0).
pub fn parse_score(score: Option<&str>) -> (u32, u32) {
    let score = match score.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return (0, 0),
    };

    let lower = score.to_lowercase();
    if lower == "nan" || lower == "unknown" {
        return (0, 0);
    }

    match sum_games(score) {
        Some(games) => games,
        None => {
            log::debug!("Unparseable score '{}', counting no games", score);
            (0, 0)
        }
    }
}

fn sum_games(score: &str) -> Option<(u32, u32)> {
    let mut winner_games = 0;
    let mut loser_games = 0;

    for set in score.split_whitespace() {
        // Drop tiebreak brackets and markers like RET, W/O, DEF
        let cleaned: String = set
            .chars()
            .filter(|c| !matches!(c, '[' | ']') && !c.is_alphabetic())
            .collect();

        let mut sides = cleaned.split('-');
        let (Some(first), Some(second)) = (sides.next(), sides.next()) else {
            continue;
        };

        winner_games += leading_digit(first)?;
        loser_games += leading_digit(second)?;
    }

    Some((winner_games, loser_games))
}

fn leading_digit(side: &str) -> Option<u32> {
    side.chars().next()?.to_digit(10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_sets() {
        assert_eq!(parse_score(Some("6-4 3-6 7-5")), (16, 15));
    }

    #[test]
    fn test_retirement() {
        assert_eq!(parse_score(Some("6-4 RET")), (6, 4));
        assert_eq!(parse_score(Some("6-4 2-1 RET")), (8, 5));
    }

    #[test]
    fn test_tiebreak_counts_first_digit() {
        assert_eq!(parse_score(Some("7-6(5) 6-7(3) 6-3")), (19, 16));
    }

    #[test]
    fn test_unknown_scores() {
        assert_eq!(parse_score(None), (0, 0));
        assert_eq!(parse_score(Some("")), (0, 0));
        assert_eq!(parse_score(Some("nan")), (0, 0));
        assert_eq!(parse_score(Some("unknown")), (0, 0));
        assert_eq!(parse_score(Some("W/O")), (0, 0));
    }

    #[test]
    fn test_malformed_set_discards_everything() {
        assert_eq!(parse_score(Some("6-4 6-")), (0, 0));
        assert_eq!(parse_score(Some("6-4 x6-4y")), (12, 8));
    }
}
