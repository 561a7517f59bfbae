//! Per-platform guidance attached to each ranking.

use brandlens_core::Platform;

/// Static per-platform guidance plus score- and rank-conditional entries.
/// A weak score prepends the awareness item so it leads the list.
pub fn recommendations_for(platform: Platform, score: u32, rank: Option<u32>) -> Vec<String> {
    let base: [&str; 3] = match platform {
        Platform::ChatGpt => [
            "Optimize your website content for conversational queries",
            "Create FAQ sections that match natural language patterns",
            "Improve your brand's online presence with consistent messaging",
        ],
        Platform::Claude => [
            "Focus on technical accuracy in your content",
            "Provide detailed explanations and documentation",
            "Enhance your thought leadership content",
        ],
        Platform::Gemini => [
            "Leverage Google's ecosystem for better visibility",
            "Optimize for multimodal content (text + images)",
            "Improve your local SEO presence",
        ],
        Platform::Perplexity => [
            "Create more research-backed content",
            "Improve citation and source quality",
            "Focus on factual, data-driven messaging",
        ],
    };

    let mut recommendations: Vec<String> = base.iter().map(|s| s.to_string()).collect();

    if score < 50 {
        recommendations.insert(
            0,
            "Increase your online presence and brand awareness".to_string(),
        );
    }
    if rank.is_none() {
        recommendations.push("Work on getting mentioned in industry discussions".to_string());
    }
    if score < 70 {
        recommendations.push("Develop more authoritative content in your industry".to_string());
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_ranked_brand_gets_base_list_only() {
        let recs = recommendations_for(Platform::ChatGpt, 85, Some(1));
        assert_eq!(recs.len(), 3);
        assert_eq!(
            recs[0],
            "Optimize your website content for conversational queries"
        );
    }

    #[test]
    fn test_weak_unranked_brand_gets_all_conditionals() {
        let recs = recommendations_for(Platform::Claude, 30, None);
        assert_eq!(recs.len(), 6);
        assert_eq!(recs[0], "Increase your online presence and brand awareness");
        assert_eq!(
            recs[4],
            "Work on getting mentioned in industry discussions"
        );
        assert_eq!(
            recs[5],
            "Develop more authoritative content in your industry"
        );
    }

    #[test]
    fn test_midrange_score_gets_authority_item_only() {
        let recs = recommendations_for(Platform::Gemini, 60, Some(2));
        assert_eq!(recs.len(), 4);
        assert_eq!(
            recs[3],
            "Develop more authoritative content in your industry"
        );
    }

    #[test]
    fn test_each_platform_has_distinct_guidance() {
        let lists: Vec<Vec<String>> = Platform::ALL
            .iter()
            .map(|&p| recommendations_for(p, 90, Some(1)))
            .collect();
        assert_ne!(lists[0], lists[1]);
        assert_ne!(lists[1], lists[2]);
        assert_ne!(lists[2], lists[3]);
    }
}
