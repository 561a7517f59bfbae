use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type AnalysisId = Uuid;

/// LLM platforms a brand is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    ChatGpt,
    Claude,
    Gemini,
    Perplexity,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::ChatGpt,
        Platform::Claude,
        Platform::Gemini,
        Platform::Perplexity,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::ChatGpt => "ChatGPT",
            Platform::Claude => "Claude",
            Platform::Gemini => "Gemini",
            Platform::Perplexity => "Perplexity",
        }
    }

    pub fn logo(&self) -> &'static str {
        match self {
            Platform::ChatGpt => "🤖",
            Platform::Claude => "🧠",
            Platform::Gemini => "✨",
            Platform::Perplexity => "🔍",
        }
    }

    /// Weight of this platform when aggregating the overall visibility score.
    /// Weights sum to 1.0 across all four platforms.
    pub fn weight(&self) -> f64 {
        match self {
            Platform::ChatGpt => 0.30,
            Platform::Claude => 0.25,
            Platform::Gemini => 0.30,
            Platform::Perplexity => 0.15,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Platform::ChatGpt => "chatgpt",
            Platform::Claude => "claude",
            Platform::Gemini => "gemini",
            Platform::Perplexity => "perplexity",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chatgpt" | "openai" => Ok(Platform::ChatGpt),
            "claude" | "anthropic" => Ok(Platform::Claude),
            "gemini" | "google" => Ok(Platform::Gemini),
            "perplexity" => Ok(Platform::Perplexity),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

/// Score movement relative to the previous persisted analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Default for Trend {
    fn default() -> Self {
        Trend::Stable
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Stable => "stable",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Trend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" => Ok(Trend::Up),
            "down" => Ok(Trend::Down),
            "stable" => Ok(Trend::Stable),
            other => Err(format!("unknown trend: {}", other)),
        }
    }
}

/// How the competitor set is chosen: discovered by the judge provider or
/// supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompetitorChoice {
    Auto,
    Manual,
}

impl Default for CompetitorChoice {
    fn default() -> Self {
        CompetitorChoice::Auto
    }
}

impl fmt::Display for CompetitorChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompetitorChoice::Auto => "auto",
            CompetitorChoice::Manual => "manual",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for CompetitorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(CompetitorChoice::Auto),
            "manual" => Ok(CompetitorChoice::Manual),
            other => Err(format!("unknown competitor choice: {}", other)),
        }
    }
}

/// Brand profile an analysis is generated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandProfile {
    pub website_url: String,
    pub brand_name: String,
    pub industry: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub competitors: Vec<String>,
    #[serde(default)]
    pub competitor_choice: CompetitorChoice,
}

/// Per-platform visibility evidence for a successfully analyzed platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformRanking {
    pub platform: Platform,
    pub rank: Option<u32>,
    pub score: u32,
    pub mentions: u32,
    pub trend: Trend,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Record of a platform whose analysis failed. Failures are carried in the
/// result instead of being papered over with placeholder numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformFailure {
    pub platform: Platform,
    pub error: String,
}

/// A completed, persisted brand analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandAnalysis {
    pub id: AnalysisId,
    pub user_id: String,
    pub website_url: String,
    pub brand_name: String,
    pub industry: String,
    pub location: Option<String>,
    pub keywords: Vec<String>,
    pub competitors: Vec<String>,
    pub competitor_choice: CompetitorChoice,
    pub overall_score: u32,
    pub rankings: Vec<PlatformRanking>,
    pub failures: Vec<PlatformFailure>,
    pub analyzed_prompts: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Judge-estimated visibility of one brand on one platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorPlatformResult {
    pub platform: Platform,
    pub rank: Option<u32>,
    pub score: u32,
    pub mentions: u32,
    pub trend: Trend,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// One brand's standing in a competitor comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorStanding {
    pub name: String,
    pub website: String,
    pub overall_score: u32,
    pub platforms: Vec<CompetitorPlatformResult>,
}

/// A brand whose competitor estimate failed on every platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorFailure {
    pub name: String,
    pub website: String,
    pub error: String,
}

/// Result of a competitor comparison run. `brand` is None when the analyzed
/// brand itself failed on every platform (it is then listed in `failures`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorComparison {
    pub brand: Option<CompetitorStanding>,
    pub competitors: Vec<CompetitorStanding>,
    pub failures: Vec<CompetitorFailure>,
    pub created_at: DateTime<Utc>,
}

/// A persisted per-competitor analysis row, linked to the brand analysis it
/// was run against when one existed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorAnalysis {
    pub id: AnalysisId,
    pub user_id: String,
    pub brand_analysis_id: Option<AnalysisId>,
    pub competitor_website: String,
    pub competitor_score: u32,
    pub platforms: Vec<CompetitorPlatformResult>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageKind {
    Brand,
    Competitor,
}

impl fmt::Display for UsageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UsageKind::Brand => "brand",
            UsageKind::Competitor => "competitor",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for UsageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "brand" => Ok(UsageKind::Brand),
            "competitor" => Ok(UsageKind::Competitor),
            other => Err(format!("unknown usage kind: {}", other)),
        }
    }
}

/// Usage counters for the current calendar month (UTC).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MonthlyUsage {
    pub brand: u32,
    pub competitor: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Starter,
    Pro,
    Enterprise,
}

impl SubscriptionTier {
    pub fn monthly_limit(&self) -> u32 {
        match self {
            SubscriptionTier::Free => 5,
            SubscriptionTier::Starter => 25,
            SubscriptionTier::Pro => 100,
            SubscriptionTier::Enterprise => 1000,
        }
    }
}

impl Default for SubscriptionTier {
    fn default() -> Self {
        SubscriptionTier::Free
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Starter => "starter",
            SubscriptionTier::Pro => "pro",
            SubscriptionTier::Enterprise => "enterprise",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(SubscriptionTier::Free),
            "starter" => Ok(SubscriptionTier::Starter),
            "pro" => Ok(SubscriptionTier::Pro),
            "enterprise" => Ok(SubscriptionTier::Enterprise),
            other => Err(format!("unknown subscription tier: {}", other)),
        }
    }
}

/// Outcome of a subscription limit check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageCheck {
    pub can_analyze: bool,
    pub usage: MonthlyUsage,
    pub limit: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parse_accepts_vendor_aliases() {
        assert_eq!("openai".parse::<Platform>(), Ok(Platform::ChatGpt));
        assert_eq!("Anthropic".parse::<Platform>(), Ok(Platform::Claude));
        assert_eq!("google".parse::<Platform>(), Ok(Platform::Gemini));
        assert_eq!("perplexity".parse::<Platform>(), Ok(Platform::Perplexity));
        assert!("copilot".parse::<Platform>().is_err());
    }

    #[test]
    fn test_platform_display_round_trips() {
        for platform in Platform::ALL {
            assert_eq!(platform.to_string().parse::<Platform>(), Ok(platform));
        }
    }

    #[test]
    fn test_platform_weights_sum_to_one() {
        let total: f64 = Platform::ALL.iter().map(Platform::weight).sum();
        assert!((total - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_platform_serde_uses_lowercase_names() {
        assert_eq!(
            serde_json::to_string(&Platform::ChatGpt).unwrap(),
            "\"chatgpt\""
        );
        let parsed: Platform = serde_json::from_str("\"perplexity\"").unwrap();
        assert_eq!(parsed, Platform::Perplexity);
    }

    #[test]
    fn test_tier_limits_are_ordered() {
        assert_eq!(SubscriptionTier::Free.monthly_limit(), 5);
        assert_eq!(SubscriptionTier::Starter.monthly_limit(), 25);
        assert_eq!(SubscriptionTier::Pro.monthly_limit(), 100);
        assert_eq!(SubscriptionTier::Enterprise.monthly_limit(), 1000);
    }
}
