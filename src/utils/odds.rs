/// Convert American odds to implied probability
/// Positive odds (+150) mean you win $150 on a $100 bet
/// Negative odds (-150) mean you need to bet $150 to win $100
pub fn american_odds_to_probability(odds: i32) -> f64 {
    if odds > 0 {
        // For positive odds: 100 / (odds + 100)
        100.0 / (odds as f64 + 100.0)
    } else {
        // For negative odds: |odds| / (|odds| + 100)
        let abs_odds = odds.unsigned_abs() as f64;
        abs_odds / (abs_odds + 100.0)
    }
}

/// Convert decimal odds (e.g. 1.91) to implied probability
pub fn decimal_odds_to_probability(odds: f64) -> f64 {
    if odds > 0.0 {
        1.0 / odds
    } else {
        0.0
    }
}

/// Net profit per unit staked on a win at American odds
pub fn american_odds_payout(odds: i32) -> f64 {
    if odds > 0 {
        odds as f64 / 100.0
    } else {
        100.0 / odds.unsigned_abs() as f64
    }
}

/// Calculate expected value for a bet
/// EV = (probability of winning * amount won per unit) - (probability of losing * unit staked)
pub fn calculate_expected_value(model_prob: f64, payout: f64) -> f64 {
    let prob_lose = 1.0 - model_prob;
    (model_prob * payout) - prob_lose
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_american_odds_to_probability() {
        let prob = american_odds_to_probability(150);
        assert!((prob - 0.4).abs() < 0.01);
        let prob = american_odds_to_probability(-150);
        assert!((prob - 0.6).abs() < 0.01);
        let prob = american_odds_to_probability(-110);
        assert!((prob - 0.5238).abs() < 0.001);
    }

    #[test]
    fn test_decimal_odds_to_probability() {
        assert!((decimal_odds_to_probability(2.0) - 0.5).abs() < 1e-12);
        assert!((decimal_odds_to_probability(1.25) - 0.8).abs() < 1e-12);
        assert_eq!(decimal_odds_to_probability(0.0), 0.0);
    }

    #[test]
    fn test_calculate_expected_value() {
        // 60% on +150 is a good bet
        let ev = calculate_expected_value(0.6, american_odds_payout(150));
        assert!((ev - 0.5).abs() < 1e-9);

        // 40% on -150 is not
        let ev = calculate_expected_value(0.4, american_odds_payout(-150));
        assert!(ev < 0.0);
    }
}
