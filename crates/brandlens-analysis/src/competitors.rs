//! Competitor discovery and judge-based visibility estimates.
//!
//! Both operations go through the configured judge provider. Discovery asks
//! for a strict JSON array of competitors; estimates ask for a per-platform
//! JSON assessment of one brand. Models routinely wrap JSON in Markdown code
//! fences, so both parsers strip a fence before handing the body to serde.
//! A parse failure is an error; there is no canned fallback data.

use brandlens_core::{
    BrandLensError, BrandProfile, CompetitorChoice, CompetitorPlatformResult, Platform, Result,
    Trend,
};
use brandlens_providers::{GenerationConfig, LLMProvider};
use serde::Deserialize;
use tracing::debug;

/// Competitor sets are capped at five entries wherever they come from.
pub const MAX_COMPETITORS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiscoveredCompetitor {
    pub name: String,
    pub website: String,
}

/// Judge's JSON answer for one brand on one platform. Models omit fields
/// often enough that everything defaults.
#[derive(Debug, Clone, Deserialize)]
struct PlatformEstimate {
    #[serde(default)]
    rank: Option<u32>,
    #[serde(default)]
    score: u32,
    #[serde(default)]
    mentions: u32,
    #[serde(default)]
    trend: Trend,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Returns the competitor set for a profile.
///
/// Manual mode uses the caller's list with a derived `.com` website. Auto
/// mode asks the judge; a response that is not a non-empty JSON array of
/// competitors is an error.
pub async fn discover_competitors(
    judge: &dyn LLMProvider,
    profile: &BrandProfile,
) -> Result<Vec<DiscoveredCompetitor>> {
    if profile.competitor_choice == CompetitorChoice::Manual && !profile.competitors.is_empty() {
        return Ok(manual_competitors(&profile.competitors));
    }

    let prompt = discovery_prompt(
        &profile.brand_name,
        &profile.industry,
        profile.location.as_deref(),
    );
    let config = GenerationConfig {
        temperature: 0.3,
        max_tokens: Some(1000),
        ..Default::default()
    };
    let response = judge
        .generate_with_config(&prompt, &config)
        .await
        .map_err(|e| BrandLensError::Provider(format!("competitor discovery failed: {e}")))?;

    let competitors = parse_discovered(&response.content)?;
    debug!(
        "Discovered {} competitors for '{}'",
        competitors.len(),
        profile.brand_name
    );
    Ok(competitors)
}

/// Manual competitor list, capped and with websites derived from the names.
pub fn manual_competitors(names: &[String]) -> Vec<DiscoveredCompetitor> {
    names
        .iter()
        .take(MAX_COMPETITORS)
        .map(|name| DiscoveredCompetitor {
            name: name.clone(),
            website: competitor_website(name),
        })
        .collect()
}

/// Derives a plausible website from a company name: lowercase, keep ASCII
/// letters and digits, append `.com`.
pub fn competitor_website(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    format!("https://{slug}.com")
}

/// Estimates one brand's visibility on one platform via the judge provider.
pub async fn estimate_on_platform(
    judge: &dyn LLMProvider,
    subject_name: &str,
    subject_website: &str,
    profile: &BrandProfile,
    platform: Platform,
    queries: &[String],
) -> Result<CompetitorPlatformResult> {
    let prompt = assessment_prompt(
        subject_name,
        subject_website,
        &profile.industry,
        platform,
        profile.location.as_deref(),
        &profile.keywords,
        queries,
    );
    let config = GenerationConfig {
        temperature: 0.3,
        max_tokens: Some(500),
        ..Default::default()
    };
    let response = judge.generate_with_config(&prompt, &config).await.map_err(|e| {
        BrandLensError::Provider(format!(
            "{} estimate for '{subject_name}' failed: {e}",
            platform.display_name()
        ))
    })?;

    let estimate: PlatformEstimate =
        serde_json::from_str(strip_code_fences(&response.content)).map_err(|e| {
            BrandLensError::Analysis(format!(
                "{} estimate for '{subject_name}' returned invalid JSON: {e}",
                platform.display_name()
            ))
        })?;

    Ok(CompetitorPlatformResult {
        platform,
        rank: estimate.rank,
        score: estimate.score.min(100),
        mentions: estimate.mentions,
        trend: estimate.trend,
        reasoning: estimate.reasoning,
    })
}

fn discovery_prompt(brand_name: &str, industry: &str, location: Option<&str>) -> String {
    let location_context = location
        .map(|l| format!(" in {l}"))
        .unwrap_or_default();
    format!(
        "Find 4-5 real, well-known competitor companies for \"{brand_name}\" in the {industry} \
         industry{location_context}.\n\n\
         Return ONLY a JSON array with this exact format:\n\
         [\n  {{\"name\": \"Company Name\", \"website\": \"https://company.com\"}},\n  \
         {{\"name\": \"Another Company\", \"website\": \"https://another.com\"}}\n]\n\n\
         Focus on:\n\
         - Direct competitors (same industry/market)\n\
         - Well-established companies with online presence\n\
         - Companies that would likely be mentioned in AI search results\n\
         - Real companies with actual websites\n\n\
         Do not include {brand_name} itself in the results."
    )
}

fn assessment_prompt(
    brand_name: &str,
    website_url: &str,
    industry: &str,
    platform: Platform,
    location: Option<&str>,
    keywords: &[String],
    queries: &[String],
) -> String {
    let platform = platform.display_name();
    let location_context = location
        .map(|l| format!(" in {l}"))
        .unwrap_or_default();
    let keyword_context = if keywords.is_empty() {
        String::new()
    } else {
        format!(" Keywords: {}", keywords.join(", "))
    };
    let query_context = if queries.is_empty() {
        String::new()
    } else {
        let listed = queries
            .iter()
            .take(5)
            .enumerate()
            .map(|(i, q)| format!("{}. {q}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");
        format!("\n\nTest queries used:\n{listed}")
    };

    format!(
        "Analyze how well \"{brand_name}\" ({website_url}) would rank when users ask {platform} \
         about {industry} solutions{location_context}.\n\n\
         Consider these factors:\n\
         - Brand recognition and authority in {industry}\n\
         - Online presence and SEO strength\n\
         - Content quality and relevance\n\
         - User engagement and reviews\n\
         - How likely {platform} would recommend this brand{keyword_context}{query_context}\n\n\
         Provide realistic analysis in this JSON format:\n\
         {{\n  \"rank\": 3,\n  \"score\": 75,\n  \"mentions\": 12,\n  \"trend\": \"up\",\n  \
         \"reasoning\": \"Strong brand presence with good SEO...\"\n}}\n\n\
         Where:\n\
         - rank: 1-10 (null if not likely to be ranked in top 10)\n\
         - score: 0-100 (overall strength score based on brand authority, mentions, and ranking \
         potential)\n\
         - mentions: estimated monthly mentions in {platform}\n\
         - trend: \"up\", \"down\", or \"stable\"\n\
         - reasoning: brief explanation\n\n\
         Be realistic and base scores on actual brand strength indicators. Don't inflate scores."
    )
}

fn parse_discovered(content: &str) -> Result<Vec<DiscoveredCompetitor>> {
    let body = strip_code_fences(content);
    let competitors: Vec<DiscoveredCompetitor> = serde_json::from_str(body).map_err(|e| {
        BrandLensError::Analysis(format!("competitor discovery returned invalid JSON: {e}"))
    })?;
    if competitors.is_empty() {
        return Err(BrandLensError::Analysis(
            "competitor discovery returned an empty list".to_string(),
        ));
    }
    Ok(competitors.into_iter().take(MAX_COMPETITORS).collect())
}

/// Strips one surrounding Markdown code fence, including an info string on
/// the opening line ("```json"). Content without a fence passes through
/// trimmed.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    match rest.strip_suffix("```") {
        Some(body) => body.trim(),
        None => rest.trim(),
    }
}
