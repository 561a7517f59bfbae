//! Score arithmetic: per-platform scores, aggregation and trends.

use brandlens_core::{PlatformRanking, Trend};

/// Per-platform visibility score on a 0-100 scale.
///
/// Mentions contribute up to 40 points (10 per mention), the best list rank
/// up to 50, and coverage up to 10. `coverage` is the fraction of successful
/// responses that mentioned the brand at all, so a brand that shows up once
/// in every answer outscores one that shows up three times in a single
/// answer.
pub fn platform_score(mentions: u32, best_rank: Option<u32>, coverage: f64) -> u32 {
    let mention_points = mentions.saturating_mul(10).min(40);

    let rank_points = match best_rank {
        Some(1) => 50,
        Some(2) => 40,
        Some(3) => 30,
        Some(4..=5) => 20,
        Some(6..=10) => 10,
        _ => 0,
    };

    let coverage_points = (coverage.clamp(0.0, 1.0) * 10.0).round() as u32;

    (mention_points + rank_points + coverage_points).min(100)
}

/// Weighted mean of the per-platform scores, using `Platform::weight()` and
/// normalizing over the platforms actually present. Failed platforms carry
/// no ranking and therefore do not drag the average down.
pub fn overall_score(rankings: &[PlatformRanking]) -> u32 {
    let mut weighted = 0.0;
    let mut weight_sum = 0.0;
    for ranking in rankings {
        let weight = ranking.platform.weight();
        weighted += f64::from(ranking.score) * weight;
        weight_sum += weight;
    }
    if weight_sum == 0.0 {
        return 0;
    }
    (weighted / weight_sum).round() as u32
}

/// Plain rounded mean, used for competitor standings.
pub fn mean_score(scores: &[u32]) -> u32 {
    if scores.is_empty() {
        return 0;
    }
    let sum: u64 = scores.iter().map(|&s| u64::from(s)).sum();
    (sum as f64 / scores.len() as f64).round() as u32
}

/// Score movement against the same platform's ranking in the previous
/// persisted analysis. Deltas within ±3 read as noise.
pub fn trend_for(previous: Option<&PlatformRanking>, new_score: u32) -> Trend {
    let Some(previous) = previous else {
        return Trend::Stable;
    };
    let delta = i64::from(new_score) - i64::from(previous.score);
    if delta > 3 {
        Trend::Up
    } else if delta < -3 {
        Trend::Down
    } else {
        Trend::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandlens_core::Platform;

    fn ranking(platform: Platform, score: u32) -> PlatformRanking {
        PlatformRanking {
            platform,
            rank: None,
            score,
            mentions: 0,
            trend: Trend::Stable,
            recommendations: vec![],
        }
    }

    #[test]
    fn test_mention_points_cap_at_forty() {
        assert_eq!(platform_score(0, None, 0.0), 0);
        assert_eq!(platform_score(2, None, 0.0), 20);
        assert_eq!(platform_score(4, None, 0.0), 40);
        assert_eq!(platform_score(50, None, 0.0), 40);
    }

    #[test]
    fn test_rank_bonus_ladder() {
        assert_eq!(platform_score(0, Some(1), 0.0), 50);
        assert_eq!(platform_score(0, Some(2), 0.0), 40);
        assert_eq!(platform_score(0, Some(3), 0.0), 30);
        assert_eq!(platform_score(0, Some(4), 0.0), 20);
        assert_eq!(platform_score(0, Some(5), 0.0), 20);
        assert_eq!(platform_score(0, Some(6), 0.0), 10);
        assert_eq!(platform_score(0, Some(10), 0.0), 10);
        assert_eq!(platform_score(0, Some(11), 0.0), 0);
    }

    #[test]
    fn test_coverage_points_round() {
        assert_eq!(platform_score(0, None, 1.0), 10);
        assert_eq!(platform_score(0, None, 2.0 / 3.0), 7);
        assert_eq!(platform_score(0, None, 0.33), 3);
        // Out-of-range coverage is clamped, not trusted
        assert_eq!(platform_score(0, None, 7.5), 10);
    }

    #[test]
    fn test_score_is_clamped_to_one_hundred() {
        assert_eq!(platform_score(10, Some(1), 1.0), 100);
    }

    #[test]
    fn test_overall_score_weights_present_platforms() {
        // ChatGPT (0.30) at 80 and Claude (0.25) at 60:
        // (80*0.30 + 60*0.25) / 0.55 = 70.9 → 71
        let rankings = vec![
            ranking(Platform::ChatGpt, 80),
            ranking(Platform::Claude, 60),
        ];
        assert_eq!(overall_score(&rankings), 71);
    }

    #[test]
    fn test_overall_score_single_platform_is_its_score() {
        assert_eq!(overall_score(&[ranking(Platform::Perplexity, 42)]), 42);
    }

    #[test]
    fn test_overall_score_empty_is_zero() {
        assert_eq!(overall_score(&[]), 0);
    }

    #[test]
    fn test_mean_score() {
        assert_eq!(mean_score(&[]), 0);
        assert_eq!(mean_score(&[60]), 60);
        assert_eq!(mean_score(&[60, 71]), 66);
        assert_eq!(mean_score(&[0, 0, 100]), 33);
    }

    #[test]
    fn test_trend_thresholds() {
        let previous = ranking(Platform::ChatGpt, 50);
        assert_eq!(trend_for(Some(&previous), 54), Trend::Up);
        assert_eq!(trend_for(Some(&previous), 53), Trend::Stable);
        assert_eq!(trend_for(Some(&previous), 47), Trend::Stable);
        assert_eq!(trend_for(Some(&previous), 46), Trend::Down);
        assert_eq!(trend_for(None, 90), Trend::Stable);
    }
}
