//! SQLite-backed persistence for brand and competitor analyses.
//!
//! One database file holds three tables: `brand_analyses` (the full report,
//! with JSON columns for rankings, failures and prompts), `competitor_analyses`
//! (per-competitor scores linked to a brand analysis) and `api_usage` (one row
//! per metered analysis, used for the monthly subscription window).

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use brandlens_core::{
    AnalysisId, BrandAnalysis, BrandLensError, CompetitorAnalysis, MonthlyUsage, Result,
    SubscriptionTier, UsageCheck, UsageKind,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS brand_analyses (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    website TEXT NOT NULL,
    brand_name TEXT NOT NULL,
    industry TEXT NOT NULL,
    location TEXT NOT NULL DEFAULT '',
    keywords TEXT NOT NULL,
    competitors TEXT NOT NULL,
    competitor_choice TEXT NOT NULL,
    overall_score INTEGER NOT NULL,
    llm_results TEXT NOT NULL,
    failures TEXT NOT NULL,
    analyzed_prompts TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_brand_analyses_user
    ON brand_analyses(user_id, created_at);
CREATE INDEX IF NOT EXISTS idx_brand_analyses_website
    ON brand_analyses(user_id, website);

CREATE TABLE IF NOT EXISTS competitor_analyses (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    brand_analysis_id TEXT,
    competitor_website TEXT NOT NULL,
    competitor_score INTEGER NOT NULL,
    competitor_llm_results TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_competitor_analyses_brand
    ON competitor_analyses(brand_analysis_id);

CREATE TABLE IF NOT EXISTS api_usage (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    analysis_type TEXT NOT NULL,
    queries_used INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_api_usage_user
    ON api_usage(user_id, created_at);
";

const BRAND_COLUMNS: &str = "id, user_id, website, brand_name, industry, location, keywords, \
     competitors, competitor_choice, overall_score, llm_results, failures, analyzed_prompts, \
     created_at, updated_at";

const COMPETITOR_COLUMNS: &str = "id, user_id, brand_analysis_id, competitor_website, \
     competitor_score, competitor_llm_results, created_at";

fn db_err(e: rusqlite::Error) -> BrandLensError {
    BrandLensError::Database(e.to_string())
}

/// Raw `brand_analyses` row before the JSON columns are parsed.
struct BrandRow {
    id: String,
    user_id: String,
    website: String,
    brand_name: String,
    industry: String,
    location: String,
    keywords: String,
    competitors: String,
    competitor_choice: String,
    overall_score: u32,
    llm_results: String,
    failures: String,
    analyzed_prompts: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

struct CompetitorRow {
    id: String,
    user_id: String,
    brand_analysis_id: Option<String>,
    competitor_website: String,
    competitor_score: u32,
    competitor_llm_results: String,
    created_at: DateTime<Utc>,
}

/// Store handle. `Connection` is not `Sync`, so the handle wraps it in a
/// mutex and can be shared behind an `Arc` across async tasks.
pub struct AnalysisStore {
    conn: Mutex<Connection>,
}

impl AnalysisStore {
    /// Opens (or creates) the database at `path` and applies the schema.
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path).map_err(db_err)?;
        // WAL keeps readers unblocked while an analysis is being saved.
        conn.execute_batch("PRAGMA journal_mode=WAL;").map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        debug!("Opened analysis store at {}", path.display());
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// In-memory database, used by tests and `--dry-run` style tooling.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    // ------------------------------------------------------------------
    // Brand analyses
    // ------------------------------------------------------------------

    /// Persists a brand analysis, replacing any previous analysis of the same
    /// brand on the same website, and meters one brand analysis against the
    /// user's monthly allowance.
    pub fn save_brand_analysis(&self, analysis: &BrandAnalysis) -> Result<()> {
        self.delete_existing_analysis(
            &analysis.user_id,
            &analysis.website_url,
            &analysis.brand_name,
        )?;

        let keywords = serde_json::to_string(&analysis.keywords)?;
        let competitors = serde_json::to_string(&analysis.competitors)?;
        let llm_results = serde_json::to_string(&analysis.rankings)?;
        let failures = serde_json::to_string(&analysis.failures)?;
        let prompts = serde_json::to_string(&analysis.analyzed_prompts)?;

        {
            let conn = self.conn.lock();
            conn.execute(
                &format!(
                    "INSERT INTO brand_analyses ({BRAND_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
                ),
                params![
                    analysis.id.to_string(),
                    analysis.user_id,
                    analysis.website_url,
                    analysis.brand_name,
                    analysis.industry,
                    analysis.location.as_deref().unwrap_or(""),
                    keywords,
                    competitors,
                    analysis.competitor_choice.to_string(),
                    analysis.overall_score,
                    llm_results,
                    failures,
                    prompts,
                    analysis.created_at,
                    analysis.updated_at,
                ],
            )
            .map_err(db_err)?;
        }

        self.track_usage(&analysis.user_id, UsageKind::Brand)?;
        debug!(
            "Saved brand analysis {} for '{}'",
            analysis.id, analysis.brand_name
        );
        Ok(())
    }

    /// Looks up a stored analysis matching the full brand profile. The scalar
    /// fields match in SQL; keywords are compared as unordered sets, so a
    /// reordered keyword list still hits the stored row.
    pub fn get_existing_analysis(
        &self,
        user_id: &str,
        website_url: &str,
        brand_name: &str,
        industry: &str,
        location: Option<&str>,
        keywords: &[String],
    ) -> Result<Option<BrandAnalysis>> {
        let row = {
            let conn = self.conn.lock();
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {BRAND_COLUMNS} FROM brand_analyses \
                     WHERE user_id = ?1 AND website = ?2 AND brand_name = ?3 \
                       AND industry = ?4 AND location = ?5 \
                     ORDER BY created_at DESC LIMIT 1"
                ))
                .map_err(db_err)?;
            stmt.query_row(
                params![
                    user_id,
                    website_url,
                    brand_name,
                    industry,
                    location.unwrap_or(""),
                ],
                Self::read_brand_row,
            )
            .optional()
            .map_err(db_err)?
        };

        let Some(row) = row else { return Ok(None) };
        let analysis = Self::hydrate_brand(row)?;
        if keyword_sets_match(&analysis.keywords, keywords) {
            Ok(Some(analysis))
        } else {
            Ok(None)
        }
    }

    /// Removes any stored analysis of `brand_name` on `website_url`, along
    /// with its competitor rows. Returns the number of analyses deleted.
    pub fn delete_existing_analysis(
        &self,
        user_id: &str,
        website_url: &str,
        brand_name: &str,
    ) -> Result<usize> {
        let conn = self.conn.lock();
        // Competitor rows reference the analysis id, so they go first.
        conn.execute(
            "DELETE FROM competitor_analyses WHERE brand_analysis_id IN (
                 SELECT id FROM brand_analyses
                 WHERE user_id = ?1 AND website = ?2 AND brand_name = ?3
             )",
            params![user_id, website_url, brand_name],
        )
        .map_err(db_err)?;
        let deleted = conn
            .execute(
                "DELETE FROM brand_analyses \
                 WHERE user_id = ?1 AND website = ?2 AND brand_name = ?3",
                params![user_id, website_url, brand_name],
            )
            .map_err(db_err)?;
        Ok(deleted)
    }

    /// Newest analysis for the user across all brands, if any.
    pub fn get_latest_brand_analysis(&self, user_id: &str) -> Result<Option<BrandAnalysis>> {
        let row = {
            let conn = self.conn.lock();
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {BRAND_COLUMNS} FROM brand_analyses \
                     WHERE user_id = ?1 ORDER BY created_at DESC LIMIT 1"
                ))
                .map_err(db_err)?;
            stmt.query_row(params![user_id], Self::read_brand_row)
                .optional()
                .map_err(db_err)?
        };
        row.map(Self::hydrate_brand).transpose()
    }

    /// Newest analysis of a specific brand on a specific website. Used to
    /// derive trends by comparing a fresh run against its predecessor.
    pub fn latest_for_brand(
        &self,
        user_id: &str,
        website_url: &str,
        brand_name: &str,
    ) -> Result<Option<BrandAnalysis>> {
        let row = {
            let conn = self.conn.lock();
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {BRAND_COLUMNS} FROM brand_analyses \
                     WHERE user_id = ?1 AND website = ?2 AND brand_name = ?3 \
                     ORDER BY created_at DESC LIMIT 1"
                ))
                .map_err(db_err)?;
            stmt.query_row(
                params![user_id, website_url, brand_name],
                Self::read_brand_row,
            )
            .optional()
            .map_err(db_err)?
        };
        row.map(Self::hydrate_brand).transpose()
    }

    /// Distinct brand names analyzed on a website. Used when forcing a
    /// reanalysis, where cache entries are invalidated by brand.
    pub fn brand_names_for_website(&self, user_id: &str, website_url: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT brand_name FROM brand_analyses \
                 WHERE user_id = ?1 AND website = ?2",
            )
            .map_err(db_err)?;
        let mapped = stmt
            .query_map(params![user_id, website_url], |row| row.get::<_, String>(0))
            .map_err(db_err)?;
        mapped
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(db_err)
    }

    /// Deletes every analysis for `website_url` and their competitor rows,
    /// forcing the next run to hit the providers again. Returns the number of
    /// brand analyses removed.
    pub fn delete_analyses_for_website(&self, user_id: &str, website_url: &str) -> Result<usize> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM competitor_analyses WHERE brand_analysis_id IN (
                 SELECT id FROM brand_analyses WHERE user_id = ?1 AND website = ?2
             )",
            params![user_id, website_url],
        )
        .map_err(db_err)?;
        let deleted = conn
            .execute(
                "DELETE FROM brand_analyses WHERE user_id = ?1 AND website = ?2",
                params![user_id, website_url],
            )
            .map_err(db_err)?;
        debug!("Deleted {deleted} stored analyses for {website_url}");
        Ok(deleted)
    }

    // ------------------------------------------------------------------
    // Competitor analyses
    // ------------------------------------------------------------------

    /// Persists one competitor result, replacing any previous row for the
    /// same competitor website under the same brand analysis. Usage metering
    /// for competitor runs happens once per comparison, not per row, so this
    /// method does not touch `api_usage`.
    pub fn save_competitor_analysis(&self, analysis: &CompetitorAnalysis) -> Result<()> {
        let platforms = serde_json::to_string(&analysis.platforms)?;
        let brand_analysis_id = analysis.brand_analysis_id.map(|id| id.to_string());

        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM competitor_analyses \
             WHERE user_id = ?1 AND competitor_website = ?2 \
               AND ((?3 IS NULL AND brand_analysis_id IS NULL) OR brand_analysis_id = ?3)",
            params![analysis.user_id, analysis.competitor_website, brand_analysis_id],
        )
        .map_err(db_err)?;
        conn.execute(
            &format!(
                "INSERT INTO competitor_analyses ({COMPETITOR_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            ),
            params![
                analysis.id.to_string(),
                analysis.user_id,
                brand_analysis_id,
                analysis.competitor_website,
                analysis.competitor_score,
                platforms,
                analysis.created_at,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// All competitor rows stored under a brand analysis, newest first.
    pub fn get_competitors(&self, brand_analysis_id: AnalysisId) -> Result<Vec<CompetitorAnalysis>> {
        let rows = {
            let conn = self.conn.lock();
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {COMPETITOR_COLUMNS} FROM competitor_analyses \
                     WHERE brand_analysis_id = ?1 ORDER BY created_at DESC"
                ))
                .map_err(db_err)?;
            let mapped = stmt
                .query_map(params![brand_analysis_id.to_string()], Self::read_competitor_row)
                .map_err(db_err)?;
            mapped
                .collect::<rusqlite::Result<Vec<CompetitorRow>>>()
                .map_err(db_err)?
        };
        rows.into_iter().map(Self::hydrate_competitor).collect()
    }

    /// Stored result for one competitor website under a brand analysis.
    pub fn get_existing_competitor_analysis(
        &self,
        brand_analysis_id: AnalysisId,
        competitor_website: &str,
    ) -> Result<Option<CompetitorAnalysis>> {
        let row = {
            let conn = self.conn.lock();
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {COMPETITOR_COLUMNS} FROM competitor_analyses \
                     WHERE brand_analysis_id = ?1 AND competitor_website = ?2 \
                     ORDER BY created_at DESC LIMIT 1"
                ))
                .map_err(db_err)?;
            stmt.query_row(
                params![brand_analysis_id.to_string(), competitor_website],
                Self::read_competitor_row,
            )
            .optional()
            .map_err(db_err)?
        };
        row.map(Self::hydrate_competitor).transpose()
    }

    // ------------------------------------------------------------------
    // Usage metering
    // ------------------------------------------------------------------

    /// Records one metered analysis of the given kind.
    pub fn track_usage(&self, user_id: &str, kind: UsageKind) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO api_usage (id, user_id, analysis_type, queries_used, created_at) \
             VALUES (?1, ?2, ?3, 1, ?4)",
            params![
                Uuid::new_v4().to_string(),
                user_id,
                kind.to_string(),
                Utc::now(),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Usage totals for the current calendar month (UTC). The month window is
    /// applied in code rather than in SQL, so the boundary is recomputed on
    /// every call.
    pub fn get_monthly_usage(&self, user_id: &str) -> Result<MonthlyUsage> {
        let rows = {
            let conn = self.conn.lock();
            let mut stmt = conn
                .prepare(
                    "SELECT analysis_type, queries_used, created_at \
                     FROM api_usage WHERE user_id = ?1",
                )
                .map_err(db_err)?;
            let mapped = stmt
                .query_map(params![user_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, DateTime<Utc>>(2)?,
                    ))
                })
                .map_err(db_err)?;
            mapped
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(db_err)?
        };

        let month_start = month_start_utc(Utc::now());
        let mut usage = MonthlyUsage::default();
        for (kind, queries, created_at) in rows {
            if created_at < month_start {
                continue;
            }
            match kind.parse::<UsageKind>() {
                Ok(UsageKind::Brand) => usage.brand += queries,
                Ok(UsageKind::Competitor) => usage.competitor += queries,
                Err(_) => continue,
            }
            usage.total += queries;
        }
        Ok(usage)
    }

    /// Whether the user may run another analysis this month under `tier`.
    pub fn check_subscription_limit(
        &self,
        user_id: &str,
        tier: SubscriptionTier,
    ) -> Result<UsageCheck> {
        let usage = self.get_monthly_usage(user_id)?;
        let limit = tier.monthly_limit();
        Ok(UsageCheck {
            can_analyze: usage.total < limit,
            usage,
            limit,
        })
    }

    // ------------------------------------------------------------------
    // Row mapping
    // ------------------------------------------------------------------

    fn read_brand_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BrandRow> {
        Ok(BrandRow {
            id: row.get(0)?,
            user_id: row.get(1)?,
            website: row.get(2)?,
            brand_name: row.get(3)?,
            industry: row.get(4)?,
            location: row.get(5)?,
            keywords: row.get(6)?,
            competitors: row.get(7)?,
            competitor_choice: row.get(8)?,
            overall_score: row.get(9)?,
            llm_results: row.get(10)?,
            failures: row.get(11)?,
            analyzed_prompts: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }

    fn hydrate_brand(row: BrandRow) -> Result<BrandAnalysis> {
        Ok(BrandAnalysis {
            id: Uuid::parse_str(&row.id).map_err(|e| BrandLensError::Database(e.to_string()))?,
            user_id: row.user_id,
            website_url: row.website,
            brand_name: row.brand_name,
            industry: row.industry,
            location: if row.location.is_empty() {
                None
            } else {
                Some(row.location)
            },
            keywords: serde_json::from_str(&row.keywords)?,
            competitors: serde_json::from_str(&row.competitors)?,
            competitor_choice: row
                .competitor_choice
                .parse()
                .map_err(BrandLensError::Database)?,
            overall_score: row.overall_score,
            rankings: serde_json::from_str(&row.llm_results)?,
            failures: serde_json::from_str(&row.failures)?,
            analyzed_prompts: serde_json::from_str(&row.analyzed_prompts)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn read_competitor_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CompetitorRow> {
        Ok(CompetitorRow {
            id: row.get(0)?,
            user_id: row.get(1)?,
            brand_analysis_id: row.get(2)?,
            competitor_website: row.get(3)?,
            competitor_score: row.get(4)?,
            competitor_llm_results: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn hydrate_competitor(row: CompetitorRow) -> Result<CompetitorAnalysis> {
        let brand_analysis_id = row
            .brand_analysis_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| BrandLensError::Database(e.to_string()))?;
        Ok(CompetitorAnalysis {
            id: Uuid::parse_str(&row.id).map_err(|e| BrandLensError::Database(e.to_string()))?,
            user_id: row.user_id,
            brand_analysis_id,
            competitor_website: row.competitor_website,
            competitor_score: row.competitor_score,
            platforms: serde_json::from_str(&row.competitor_llm_results)?,
            created_at: row.created_at,
        })
    }
}

fn keyword_sets_match(stored: &[String], requested: &[String]) -> bool {
    let stored: HashSet<&str> = stored.iter().map(String::as_str).collect();
    let requested: HashSet<&str> = requested.iter().map(String::as_str).collect();
    stored == requested
}

/// First instant of the current calendar month in UTC.
fn month_start_utc(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}
