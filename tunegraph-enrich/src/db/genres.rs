//! Genre tags and their artist/track associations
//!
//! Genre names are stored lowercased and are unique ignoring case. Linking an
//! entity to a genre it already has is a no-op.

use anyhow::{Context, Result};
use sqlx::SqlitePool;

/// Normalize a tag for storage; `None` for blank tags
pub fn normalize_genre(tag: &str) -> Option<String> {
    let tag = tag.trim();
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_lowercase())
    }
}

/// Find-or-create a genre, returning its id
pub async fn ensure_genre(pool: &SqlitePool, name: &str) -> Result<i64> {
    sqlx::query("INSERT INTO genres (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
        .bind(name)
        .execute(pool)
        .await?;

    let id: i64 = sqlx::query_scalar("SELECT id FROM genres WHERE name = ? COLLATE NOCASE")
        .bind(name)
        .fetch_one(pool)
        .await
        .with_context(|| format!("genre '{}' missing after insert", name))?;

    Ok(id)
}

/// Associate a genre with an artist
///
/// Returns whether a new association was created. Blank tags are ignored.
pub async fn link_artist_genre(pool: &SqlitePool, artist_id: i64, tag: &str) -> Result<bool> {
    let Some(name) = normalize_genre(tag) else {
        return Ok(false);
    };
    let genre_id = ensure_genre(pool, &name).await?;

    let result = sqlx::query(
        "INSERT INTO artist_genres (artist_id, genre_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
    )
    .bind(artist_id)
    .bind(genre_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Associate a genre with a track
pub async fn link_track_genre(pool: &SqlitePool, track_id: i64, tag: &str) -> Result<bool> {
    let Some(name) = normalize_genre(tag) else {
        return Ok(false);
    };
    let genre_id = ensure_genre(pool, &name).await?;

    let result = sqlx::query(
        "INSERT INTO track_genres (track_id, genre_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
    )
    .bind(track_id)
    .bind(genre_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn genres_for_artist(pool: &SqlitePool, artist_id: i64) -> Result<Vec<String>> {
    let names: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT g.name FROM genres g
        INNER JOIN artist_genres ag ON ag.genre_id = g.id
        WHERE ag.artist_id = ?
        ORDER BY g.name
        "#,
    )
    .bind(artist_id)
    .fetch_all(pool)
    .await?;

    Ok(names)
}

pub async fn genres_for_track(pool: &SqlitePool, track_id: i64) -> Result<Vec<String>> {
    let names: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT g.name FROM genres g
        INNER JOIN track_genres tg ON tg.genre_id = g.id
        WHERE tg.track_id = ?
        ORDER BY g.name
        "#,
    )
    .bind(track_id)
    .fetch_all(pool)
    .await?;

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_genre() {
        assert_eq!(normalize_genre("  Heavy Metal "), Some("heavy metal".to_string()));
        assert_eq!(normalize_genre("   "), None);
    }
}
