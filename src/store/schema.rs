//! SQLite schema of the recommendation database.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};
use anyhow::Result;
use rusqlite::Connection;

// =============================================================================
// Version 1
// =============================================================================

const RECOMMENDATIONS_TABLE_V1: Table = Table {
    name: "recommendations",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("prompt_text", &SqlType::Text, non_null = true),
        sqlite_column!("llm_response", &SqlType::Text, non_null = true),
        sqlite_column!("provider", &SqlType::Text, non_null = true),
        sqlite_column!("context_description", &SqlType::Text),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_recommendations_user_created", "user_id, created_at DESC")],
    unique_constraints: &[],
};

const RECOMMENDATION_FK: ForeignKey = ForeignKey {
    foreign_table: "recommendations",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const RECOMMENDED_TRACKS_TABLE_V1: Table = Table {
    name: "recommended_tracks",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "recommendation_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&RECOMMENDATION_FK)
        ),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
        sqlite_column!("spotify_id", &SqlType::Text),
        sqlite_column!("track_name", &SqlType::Text, non_null = true),
        sqlite_column!("artist_name", &SqlType::Text, non_null = true),
        sqlite_column!("album_name", &SqlType::Text),
        sqlite_column!("image_url", &SqlType::Text),
        sqlite_column!("preview_url", &SqlType::Text),
        sqlite_column!("explanation", &SqlType::Text, non_null = true),
    ],
    indices: &[(
        "idx_recommended_tracks_recommendation",
        "recommendation_id, position",
    )],
    unique_constraints: &[],
};

/// One row per user; replaced whenever the user re-links the catalog.
const CATALOG_TOKENS_TABLE_V1: Table = Table {
    name: "catalog_tokens",
    columns: &[
        sqlite_column!("user_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("access_token", &SqlType::Text, non_null = true),
        sqlite_column!("expires_at", &SqlType::Integer),
        sqlite_column!(
            "updated_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

// =============================================================================
// Version 2 - per-track feedback
// =============================================================================

const RECOMMENDED_TRACK_FK: ForeignKey = ForeignKey {
    foreign_table: "recommended_tracks",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

/// At most one row per user and track; updates overwrite it.
const TRACK_FEEDBACK_TABLE_V2: Table = Table {
    name: "track_feedback",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "track_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&RECOMMENDED_TRACK_FK)
        ),
        sqlite_column!("feedback_type", &SqlType::Text, non_null = true),
        sqlite_column!("comment", &SqlType::Text),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!(
            "updated_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_track_feedback_user", "user_id, updated_at DESC")],
    unique_constraints: &[&["user_id", "track_id"]],
};

fn migrate_v1_to_v2(conn: &Connection) -> Result<()> {
    TRACK_FEEDBACK_TABLE_V2.create(conn)
}

pub const RECOMMENDATION_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 1,
        tables: &[
            RECOMMENDATIONS_TABLE_V1,
            RECOMMENDED_TRACKS_TABLE_V1,
            CATALOG_TOKENS_TABLE_V1,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 2,
        tables: &[
            RECOMMENDATIONS_TABLE_V1,
            RECOMMENDED_TRACKS_TABLE_V1,
            CATALOG_TOKENS_TABLE_V1,
            TRACK_FEEDBACK_TABLE_V2,
        ],
        migration: Some(migrate_v1_to_v2),
    },
];
