//! Orchestration of a full visibility analysis: usage gate, cache lookup,
//! concurrent provider fan-out, scoring, persistence and cache fill.

use std::sync::Arc;

use brandlens_cache::VisibilityCache;
use brandlens_core::{
    BrandAnalysis, BrandLensConfig, BrandLensError, BrandProfile, CompetitorAnalysis,
    CompetitorComparison, CompetitorFailure, CompetitorPlatformResult, CompetitorStanding,
    Platform, PlatformFailure, PlatformRanking, Result, SubscriptionTier, UsageKind,
};
use brandlens_providers::{GenerationConfig, LLMProvider, ProviderRegistry};
use brandlens_store::AnalysisStore;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::competitors::{discover_competitors, estimate_on_platform};
use crate::queries::generate_queries;
use crate::recommendations::recommendations_for;
use crate::response::analyze_response;
use crate::scoring::{mean_score, overall_score, platform_score, trend_for};

/// Tunables the engine reads per run, parsed once from the analysis config.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub queries_per_platform: usize,
    pub max_concurrent_requests: usize,
    pub max_tokens: usize,
    pub temperature: f32,
    pub judge_provider: Platform,
    pub subscription_tier: SubscriptionTier,
}

impl EngineOptions {
    pub fn from_config(config: &BrandLensConfig) -> Result<Self> {
        let judge_provider = config
            .analysis
            .judge_provider
            .parse()
            .map_err(BrandLensError::Config)?;
        let subscription_tier = config
            .analysis
            .subscription_tier
            .parse()
            .map_err(BrandLensError::Config)?;
        Ok(Self {
            queries_per_platform: config.analysis.queries_per_platform,
            max_concurrent_requests: config.analysis.max_concurrent_requests,
            max_tokens: config.analysis.max_tokens,
            temperature: config.analysis.temperature,
            judge_provider,
            subscription_tier,
        })
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            queries_per_platform: 3,
            max_concurrent_requests: 4,
            max_tokens: 300,
            temperature: 0.7,
            judge_provider: Platform::ChatGpt,
            subscription_tier: SubscriptionTier::Free,
        }
    }
}

enum PlatformOutcome {
    Ranked {
        ranking: PlatformRanking,
        from_cache: bool,
    },
    Failed(String),
}

pub struct VisibilityEngine {
    registry: ProviderRegistry,
    cache: Arc<VisibilityCache>,
    store: Arc<AnalysisStore>,
    options: EngineOptions,
}

impl VisibilityEngine {
    pub fn new(
        registry: ProviderRegistry,
        cache: Arc<VisibilityCache>,
        store: Arc<AnalysisStore>,
        options: EngineOptions,
    ) -> Self {
        Self {
            registry,
            cache,
            store,
            options,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &VisibilityCache {
        &self.cache
    }

    pub fn store(&self) -> &AnalysisStore {
        &self.store
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Runs the full brand analysis: query battery, per-platform fan-out
    /// (cache first), scoring, persistence and usage metering.
    pub async fn analyze_brand(
        &self,
        user_id: &str,
        profile: &BrandProfile,
    ) -> Result<BrandAnalysis> {
        validate_profile(profile)?;
        self.usage_gate(user_id)?;

        if self.registry.is_empty() {
            return Err(BrandLensError::AllProvidersFailed(
                "no LLM providers configured; set at least one API key".to_string(),
            ));
        }

        let queries = generate_queries(profile);
        let previous =
            self.store
                .latest_for_brand(user_id, &profile.website_url, &profile.brand_name)?;

        info!(
            "Analyzing '{}' on {} platform(s), {} queries each",
            profile.brand_name,
            self.registry.len(),
            self.options.queries_per_platform.min(queries.len()),
        );

        let outcomes: Vec<(Platform, PlatformOutcome)> = {
            let queries = &queries;
            let previous = previous.as_ref();
            let mut tasks = Vec::new();
            for (platform, provider) in self.registry.iter() {
                tasks.push(async move {
                    let outcome = self
                        .platform_visibility(platform, provider, profile, queries, previous)
                        .await;
                    (platform, outcome)
                });
            }
            stream::iter(tasks)
                .buffer_unordered(self.options.max_concurrent_requests.max(1))
                .collect()
                .await
        };

        let mut rankings = Vec::new();
        let mut failures = Vec::new();
        let mut fresh = Vec::new();
        for (platform, outcome) in outcomes {
            match outcome {
                PlatformOutcome::Ranked { ranking, from_cache } => {
                    if !from_cache {
                        fresh.push(ranking.clone());
                    }
                    rankings.push(ranking);
                }
                PlatformOutcome::Failed(error) => {
                    warn!("{} analysis failed: {}", platform.display_name(), error);
                    failures.push(PlatformFailure { platform, error });
                }
            }
        }

        if rankings.is_empty() {
            let detail = failures
                .iter()
                .map(|f| format!("{}: {}", f.platform.display_name(), f.error))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(BrandLensError::AllProvidersFailed(detail));
        }

        rankings.sort_by_key(|r| r.platform as usize);
        failures.sort_by_key(|f| f.platform as usize);

        let now = Utc::now();
        let analysis = BrandAnalysis {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            website_url: profile.website_url.clone(),
            brand_name: profile.brand_name.clone(),
            industry: profile.industry.clone(),
            location: profile.location.clone(),
            keywords: profile.keywords.clone(),
            competitors: profile.competitors.clone(),
            competitor_choice: profile.competitor_choice,
            overall_score: overall_score(&rankings),
            rankings,
            failures,
            analyzed_prompts: queries,
            created_at: now,
            updated_at: now,
        };

        self.store.save_brand_analysis(&analysis)?;

        for ranking in fresh {
            let key = VisibilityCache::cache_key(
                ranking.platform,
                profile,
                self.options.queries_per_platform,
            );
            self.cache.insert(key, &profile.brand_name, ranking).await;
        }

        info!(
            "Analysis {} complete: overall score {}, {} platform(s), {} failure(s)",
            analysis.id,
            analysis.overall_score,
            analysis.rankings.len(),
            analysis.failures.len()
        );
        Ok(analysis)
    }

    /// Compares the brand against its competitors using the judge provider
    /// for discovery and per-platform estimates.
    pub async fn analyze_competitors(
        &self,
        user_id: &str,
        profile: &BrandProfile,
    ) -> Result<CompetitorComparison> {
        validate_profile(profile)?;
        self.usage_gate(user_id)?;

        let judge = self.registry.get(self.options.judge_provider).ok_or_else(|| {
            BrandLensError::Provider(format!(
                "judge provider {} is not configured",
                self.options.judge_provider.display_name()
            ))
        })?;

        let queries = generate_queries(profile);
        let competitors = discover_competitors(judge.as_ref(), profile).await?;
        info!(
            "Comparing '{}' against {} competitor(s)",
            profile.brand_name,
            competitors.len()
        );

        let mut subjects: Vec<(String, String)> =
            vec![(profile.brand_name.clone(), profile.website_url.clone())];
        subjects.extend(competitors.into_iter().map(|c| (c.name, c.website)));

        let mut tasks = Vec::new();
        for (index, (name, website)) in subjects.iter().enumerate() {
            for platform in Platform::ALL {
                let judge = Arc::clone(&judge);
                let queries = &queries;
                tasks.push(async move {
                    let outcome = estimate_on_platform(
                        judge.as_ref(),
                        name,
                        website,
                        profile,
                        platform,
                        queries,
                    )
                    .await;
                    (index, platform, outcome)
                });
            }
        }

        let estimates: Vec<(usize, Platform, Result<CompetitorPlatformResult>)> =
            stream::iter(tasks)
                .buffer_unordered(self.options.max_concurrent_requests.max(1))
                .collect()
                .await;

        let mut per_subject: Vec<Vec<CompetitorPlatformResult>> =
            vec![Vec::new(); subjects.len()];
        let mut subject_errors: Vec<Vec<String>> = vec![Vec::new(); subjects.len()];
        for (index, platform, outcome) in estimates {
            match outcome {
                Ok(result) => per_subject[index].push(result),
                Err(e) => {
                    warn!(
                        "{} estimate failed for '{}': {}",
                        platform.display_name(),
                        subjects[index].0,
                        e
                    );
                    subject_errors[index].push(e.to_string());
                }
            }
        }

        let mut brand = None;
        let mut standings = Vec::new();
        let mut failures = Vec::new();
        for (index, (name, website)) in subjects.iter().enumerate() {
            let mut platforms = std::mem::take(&mut per_subject[index]);
            if platforms.is_empty() {
                failures.push(CompetitorFailure {
                    name: name.clone(),
                    website: website.clone(),
                    error: subject_errors[index].join("; "),
                });
                continue;
            }
            platforms.sort_by_key(|p| p.platform as usize);
            let scores: Vec<u32> = platforms.iter().map(|p| p.score).collect();
            let standing = CompetitorStanding {
                name: name.clone(),
                website: website.clone(),
                overall_score: mean_score(&scores),
                platforms,
            };
            if index == 0 {
                brand = Some(standing);
            } else {
                standings.push(standing);
            }
        }

        if brand.is_none() && standings.is_empty() {
            let detail = failures
                .iter()
                .map(|f| format!("{}: {}", f.name, f.error))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(BrandLensError::AllProvidersFailed(detail));
        }

        let parent_id = self
            .store
            .latest_for_brand(user_id, &profile.website_url, &profile.brand_name)?
            .map(|analysis| analysis.id);

        let now = Utc::now();
        for standing in &standings {
            self.store.save_competitor_analysis(&CompetitorAnalysis {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                brand_analysis_id: parent_id,
                competitor_website: standing.website.clone(),
                competitor_score: standing.overall_score,
                platforms: standing.platforms.clone(),
                created_at: now,
            })?;
        }
        self.store.track_usage(user_id, UsageKind::Competitor)?;

        Ok(CompetitorComparison {
            brand,
            competitors: standings,
            failures,
            created_at: now,
        })
    }

    /// Deletes every stored analysis for a website and drops the matching
    /// cache entries, so the next run goes back to the providers. Returns
    /// the number of analyses removed.
    pub async fn force_reanalysis(&self, user_id: &str, website_url: &str) -> Result<usize> {
        let brands = self.store.brand_names_for_website(user_id, website_url)?;
        let deleted = self.store.delete_analyses_for_website(user_id, website_url)?;
        for brand in &brands {
            self.cache.invalidate_brand(brand).await;
        }
        info!("Forced reanalysis for {website_url}: removed {deleted} stored analyses");
        Ok(deleted)
    }

    fn usage_gate(&self, user_id: &str) -> Result<()> {
        let check = self
            .store
            .check_subscription_limit(user_id, self.options.subscription_tier)?;
        if !check.can_analyze {
            return Err(BrandLensError::UsageLimit {
                used: check.usage.total,
                limit: check.limit,
            });
        }
        Ok(())
    }

    /// One platform's slice of the analysis. Cache hits skip the provider
    /// entirely; on a miss the first `queries_per_platform` queries are sent
    /// and their responses pooled. Every query failing marks the platform
    /// failed.
    async fn platform_visibility(
        &self,
        platform: Platform,
        provider: Arc<dyn LLMProvider>,
        profile: &BrandProfile,
        queries: &[String],
        previous: Option<&BrandAnalysis>,
    ) -> PlatformOutcome {
        let key = VisibilityCache::cache_key(platform, profile, self.options.queries_per_platform);
        if let Some(ranking) = self.cache.get(&key).await {
            debug!("{} ranking served from cache", platform.display_name());
            return PlatformOutcome::Ranked {
                ranking,
                from_cache: true,
            };
        }

        let config = GenerationConfig {
            temperature: self.options.temperature,
            max_tokens: Some(self.options.max_tokens),
            ..Default::default()
        };

        let mut mentions = 0u32;
        let mut best_rank: Option<u32> = None;
        let mut responses = 0u32;
        let mut responses_with_brand = 0u32;
        let mut last_error = None;

        let query_count = queries.len().min(self.options.queries_per_platform);
        for query in &queries[..query_count] {
            match provider.generate_with_config(query, &config).await {
                Ok(response) => {
                    let signals = analyze_response(&response.content, &profile.brand_name);
                    mentions += signals.mentions;
                    if signals.mentions > 0 {
                        responses_with_brand += 1;
                    }
                    best_rank = match (best_rank, signals.rank) {
                        (Some(current), Some(found)) => Some(current.min(found)),
                        (current, found) => current.or(found),
                    };
                    responses += 1;
                }
                Err(e) => {
                    warn!("{} query failed: {}", platform.display_name(), e);
                    last_error = Some(e.to_string());
                }
            }
        }

        if responses == 0 {
            let error = match last_error {
                Some(e) => format!("all {query_count} queries failed, last error: {e}"),
                None => "no queries were sent".to_string(),
            };
            return PlatformOutcome::Failed(error);
        }

        let coverage = f64::from(responses_with_brand) / f64::from(responses);
        let score = platform_score(mentions, best_rank, coverage);
        let previous_ranking =
            previous.and_then(|analysis| analysis.rankings.iter().find(|r| r.platform == platform));

        let ranking = PlatformRanking {
            platform,
            rank: best_rank,
            score,
            mentions,
            trend: trend_for(previous_ranking, score),
            recommendations: recommendations_for(platform, score, best_rank),
        };
        PlatformOutcome::Ranked {
            ranking,
            from_cache: false,
        }
    }
}

fn validate_profile(profile: &BrandProfile) -> Result<()> {
    if profile.website_url.trim().is_empty()
        || profile.brand_name.trim().is_empty()
        || profile.industry.trim().is_empty()
    {
        return Err(BrandLensError::InvalidOperation(
            "website_url, brand_name and industry are required".to_string(),
        ));
    }
    Ok(())
}
