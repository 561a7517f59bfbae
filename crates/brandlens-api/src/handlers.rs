use crate::{ApiError, ApiResult, AppState};
use axum::{extract::State, Json};
use brandlens_core::{
    AnalysisId, BrandAnalysis, BrandProfile, CompetitorComparison, MonthlyUsage, Platform,
    PlatformFailure, PlatformRanking,
};
use brandlens_providers::validate_key_format;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

#[derive(Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub analysis_id: AnalysisId,
    pub website_url: String,
    pub brand_name: String,
    pub overall_score: u32,
    pub rankings: Vec<PlatformRanking>,
    pub failures: Vec<PlatformFailure>,
    pub analyzed_prompts: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<BrandAnalysis> for AnalysisResponse {
    fn from(analysis: BrandAnalysis) -> Self {
        Self {
            success: true,
            analysis_id: analysis.id,
            website_url: analysis.website_url,
            brand_name: analysis.brand_name,
            overall_score: analysis.overall_score,
            rankings: analysis.rankings,
            failures: analysis.failures,
            analyzed_prompts: analysis.analyzed_prompts,
            created_at: analysis.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct UsageResponse {
    pub usage: MonthlyUsage,
    pub limit: u32,
    pub can_analyze: bool,
    pub tier: String,
}

#[derive(Serialize)]
pub struct KeyStatus {
    pub platform: Platform,
    pub configured: bool,
    pub model: Option<String>,
}

#[derive(Serialize)]
pub struct KeysResponse {
    pub platforms: Vec<KeyStatus>,
}

#[derive(Deserialize)]
pub struct ValidateKeyRequest {
    pub platform: Platform,
    pub api_key: String,
}

#[derive(Serialize)]
pub struct ValidateKeyResponse {
    pub platform: Platform,
    pub valid: bool,
}

#[derive(Serialize)]
pub struct CacheStatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub memory_usage_bytes: u64,
    pub hit_rate: f64,
}

#[derive(Serialize)]
pub struct CacheCleanupResponse {
    pub removed: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: option_env!("CARGO_PKG_VERSION")
            .unwrap_or("0.1.0")
            .to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

pub async fn create_analysis(
    State(state): State<AppState>,
    Json(profile): Json<BrandProfile>,
) -> ApiResult<Json<AnalysisResponse>> {
    let analysis = state
        .engine
        .analyze_brand(state.user_id(), &profile)
        .await?;
    Ok(Json(AnalysisResponse::from(analysis)))
}

pub async fn latest_analysis(State(state): State<AppState>) -> ApiResult<Json<BrandAnalysis>> {
    let analysis = state
        .store
        .get_latest_brand_analysis(state.user_id())?
        .ok_or_else(|| ApiError::NotFound("no analyses stored yet".to_string()))?;
    Ok(Json(analysis))
}

pub async fn create_competitor_analysis(
    State(state): State<AppState>,
    Json(profile): Json<BrandProfile>,
) -> ApiResult<Json<CompetitorComparison>> {
    let comparison = state
        .engine
        .analyze_competitors(state.user_id(), &profile)
        .await?;
    Ok(Json(comparison))
}

pub async fn usage(State(state): State<AppState>) -> ApiResult<Json<UsageResponse>> {
    let tier = state.engine.options().subscription_tier;
    let check = state.store.check_subscription_limit(state.user_id(), tier)?;
    Ok(Json(UsageResponse {
        usage: check.usage,
        limit: check.limit,
        can_analyze: check.can_analyze,
        tier: tier.to_string(),
    }))
}

pub async fn list_keys(State(state): State<AppState>) -> Json<KeysResponse> {
    let platforms = Platform::ALL
        .iter()
        .map(|&platform| {
            let provider = state.config.providers.for_platform(platform);
            KeyStatus {
                platform,
                configured: provider.enabled && provider.api_key.is_some(),
                model: provider.model.clone(),
            }
        })
        .collect();
    Json(KeysResponse { platforms })
}

pub async fn validate_key(
    Json(request): Json<ValidateKeyRequest>,
) -> Json<ValidateKeyResponse> {
    Json(ValidateKeyResponse {
        platform: request.platform,
        valid: validate_key_format(request.platform, &request.api_key),
    })
}

pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    let stats = state.engine.cache().stats().await;
    Json(CacheStatsResponse {
        hits: stats.hits,
        misses: stats.misses,
        evictions: stats.evictions,
        entries: stats.entries,
        memory_usage_bytes: stats.memory_usage,
        hit_rate: stats.hit_rate,
    })
}

pub async fn cleanup_cache(State(state): State<AppState>) -> Json<CacheCleanupResponse> {
    Json(CacheCleanupResponse {
        removed: state.engine.cache().cleanup_expired().await,
    })
}
