use super::models::{FeedbackType, RecommendationSummary, StoredRecommendation, TrackFeedback};
use super::schema::RECOMMENDATION_VERSIONED_SCHEMAS;
use super::{CatalogTokenStore, RecommendationStore};
use crate::catalog::CatalogToken;
use crate::recommendation::{ParsedRecommendationItem, RecommendationResult};
use crate::sqlite_persistence::open_database;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

pub struct SqliteRecommendationStore {
    conn: Arc<Mutex<Connection>>,
}

fn from_timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

impl SqliteRecommendationStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_database(
            db_path.as_ref(),
            RECOMMENDATION_VERSIONED_SCHEMAS,
            "recommendation",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Recommendation database lock poisoned"))
    }

    fn row_to_track(row: &rusqlite::Row) -> rusqlite::Result<ParsedRecommendationItem> {
        Ok(ParsedRecommendationItem {
            track_name: row.get("track_name")?,
            artist_name: row.get("artist_name")?,
            album_name: row.get("album_name")?,
            explanation: row.get("explanation")?,
            position: row.get::<_, i64>("position")? as usize,
            spotify_id: row.get("spotify_id")?,
            preview_url: row.get("preview_url")?,
            image_url: row.get("image_url")?,
        })
    }

    fn load_tracks(conn: &Connection, recommendation_id: &str) -> Result<Vec<ParsedRecommendationItem>> {
        let mut stmt = conn.prepare(
            "SELECT position, spotify_id, track_name, artist_name, album_name, image_url, preview_url, explanation
             FROM recommended_tracks WHERE recommendation_id = ?1 ORDER BY position",
        )?;
        let tracks = stmt
            .query_map(params![recommendation_id], Self::row_to_track)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }

    fn row_to_feedback(row: &rusqlite::Row) -> rusqlite::Result<TrackFeedback> {
        let raw_type: String = row.get("feedback_type")?;
        let feedback_type = FeedbackType::parse(&raw_type).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("unknown feedback type '{}'", raw_type).into(),
            )
        })?;
        Ok(TrackFeedback {
            recommendation_id: row.get("recommendation_id")?,
            position: row.get::<_, i64>("position")? as usize,
            track_name: row.get("track_name")?,
            artist_name: row.get("artist_name")?,
            feedback_type,
            comment: row.get("comment")?,
            created_at: from_timestamp(row.get("created_at")?),
            updated_at: from_timestamp(row.get("updated_at")?),
        })
    }
}

const SELECT_FEEDBACK: &str = "SELECT t.recommendation_id, t.position, t.track_name, t.artist_name,
        f.feedback_type, f.comment, f.created_at, f.updated_at
     FROM track_feedback f JOIN recommended_tracks t ON t.id = f.track_id";

impl RecommendationStore for SqliteRecommendationStore {
    fn save_recommendation(
        &self,
        user_id: usize,
        result: &RecommendationResult,
    ) -> Result<StoredRecommendation> {
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = Utc::now().timestamp();
        let llm_response = serde_json::to_value(&result.raw_provider_response)
            .context("Failed to serialize provider response")?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO recommendations (id, user_id, prompt_text, llm_response, provider, context_description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                user_id as i64,
                result.prompt_text,
                llm_response.to_string(),
                result.provider,
                result.context_description,
                created_at,
            ],
        )
        .context("Failed to insert recommendation")?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO recommended_tracks (recommendation_id, position, spotify_id, track_name, artist_name, album_name, image_url, preview_url, explanation)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for track in &result.tracks {
                stmt.execute(params![
                    id,
                    track.position as i64,
                    track.spotify_id,
                    track.track_name,
                    track.artist_name,
                    track.album_name,
                    track.image_url,
                    track.preview_url,
                    track.explanation,
                ])
                .context("Failed to insert recommended track")?;
            }
        }
        tx.commit()?;
        debug!(user_id, id = %id, tracks = result.tracks.len(), "Stored recommendation");

        Ok(StoredRecommendation {
            id,
            user_id,
            prompt_text: result.prompt_text.clone(),
            llm_response,
            provider: result.provider.clone(),
            context_description: result.context_description.clone(),
            created_at: from_timestamp(created_at),
            tracks: result.tracks.clone(),
        })
    }

    fn get_recommendation(&self, user_id: usize, id: &str) -> Result<Option<StoredRecommendation>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT prompt_text, llm_response, provider, context_description, created_at
                 FROM recommendations WHERE id = ?1 AND user_id = ?2",
                params![id, user_id as i64],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((prompt_text, llm_response, provider, context_description, created_at)) = row
        else {
            return Ok(None);
        };

        let llm_response = serde_json::from_str(&llm_response)
            .with_context(|| format!("Stored provider response of {} is not JSON", id))?;
        let tracks = Self::load_tracks(&conn, id)?;

        Ok(Some(StoredRecommendation {
            id: id.to_string(),
            user_id,
            prompt_text,
            llm_response,
            provider,
            context_description,
            created_at: from_timestamp(created_at),
            tracks,
        }))
    }

    fn list_recommendations(
        &self,
        user_id: usize,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<RecommendationSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT r.id, r.provider, r.context_description, r.created_at,
                    (SELECT COUNT(*) FROM recommended_tracks t WHERE t.recommendation_id = r.id)
             FROM recommendations r
             WHERE r.user_id = ?1
             ORDER BY r.created_at DESC, r.rowid DESC
             LIMIT ?2 OFFSET ?3",
        )?;
        let summaries = stmt
            .query_map(params![user_id as i64, limit as i64, offset as i64], |row| {
                Ok(RecommendationSummary {
                    id: row.get(0)?,
                    provider: row.get(1)?,
                    context_description: row.get(2)?,
                    created_at: from_timestamp(row.get(3)?),
                    track_count: row.get::<_, i64>(4)? as usize,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(summaries)
    }

    fn delete_recommendation(&self, user_id: usize, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM recommendations WHERE id = ?1 AND user_id = ?2",
            params![id, user_id as i64],
        )?;
        Ok(deleted > 0)
    }

    fn set_track_feedback(
        &self,
        user_id: usize,
        recommendation_id: &str,
        position: usize,
        feedback_type: FeedbackType,
        comment: Option<&str>,
    ) -> Result<Option<TrackFeedback>> {
        let conn = self.conn()?;
        let track_id: Option<i64> = conn
            .query_row(
                "SELECT t.id FROM recommended_tracks t
                 JOIN recommendations r ON r.id = t.recommendation_id
                 WHERE r.id = ?1 AND r.user_id = ?2 AND t.position = ?3",
                params![recommendation_id, user_id as i64, position as i64],
                |row| row.get(0),
            )
            .optional()?;
        let Some(track_id) = track_id else {
            return Ok(None);
        };

        let now = Utc::now().timestamp();
        conn.execute(
            "INSERT INTO track_feedback (user_id, track_id, feedback_type, comment, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(user_id, track_id) DO UPDATE SET
                feedback_type = excluded.feedback_type,
                comment = excluded.comment,
                updated_at = excluded.updated_at",
            params![user_id as i64, track_id, feedback_type.as_str(), comment, now],
        )
        .context("Failed to store track feedback")?;
        debug!(
            user_id,
            recommendation_id,
            position,
            feedback = feedback_type.as_str(),
            "Stored track feedback"
        );

        let feedback = conn
            .query_row(
                &format!("{} WHERE f.user_id = ?1 AND f.track_id = ?2", SELECT_FEEDBACK),
                params![user_id as i64, track_id],
                Self::row_to_feedback,
            )
            .optional()?;
        Ok(feedback)
    }

    fn get_track_feedback(
        &self,
        user_id: usize,
        recommendation_id: &str,
        position: usize,
    ) -> Result<Option<TrackFeedback>> {
        let conn = self.conn()?;
        let feedback = conn
            .query_row(
                &format!(
                    "{} WHERE f.user_id = ?1 AND t.recommendation_id = ?2 AND t.position = ?3",
                    SELECT_FEEDBACK
                ),
                params![user_id as i64, recommendation_id, position as i64],
                Self::row_to_feedback,
            )
            .optional()?;
        Ok(feedback)
    }

    fn list_track_feedback(&self, user_id: usize) -> Result<Vec<TrackFeedback>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE f.user_id = ?1 ORDER BY f.updated_at DESC, f.id DESC",
            SELECT_FEEDBACK
        ))?;
        let feedback = stmt
            .query_map(params![user_id as i64], Self::row_to_feedback)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(feedback)
    }
}

impl CatalogTokenStore for SqliteRecommendationStore {
    fn get_catalog_token(&self, user_id: usize) -> Result<Option<CatalogToken>> {
        let conn = self.conn()?;
        let token = conn
            .query_row(
                "SELECT access_token, expires_at FROM catalog_tokens WHERE user_id = ?1",
                params![user_id as i64],
                |row| {
                    Ok(CatalogToken {
                        access_token: row.get(0)?,
                        expires_at: row.get::<_, Option<i64>>(1)?.map(from_timestamp),
                    })
                },
            )
            .optional()?;
        Ok(token)
    }

    fn set_catalog_token(&self, user_id: usize, token: &CatalogToken) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO catalog_tokens (user_id, access_token, expires_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                access_token = excluded.access_token,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at",
            params![
                user_id as i64,
                token.access_token,
                token.expires_at.map(|at| at.timestamp()),
                Utc::now().timestamp(),
            ],
        )
        .context("Failed to store catalog token")?;
        Ok(())
    }
}
