//! Artist similarity edges
//!
//! Directed edges artist → similar artist. Only full enrichment of a primary
//! artist writes here.

use anyhow::Result;
use sqlx::SqlitePool;

/// Create the edge unless it already exists; self-edges are ignored
///
/// Returns whether a new edge was written.
pub async fn link_similar_artist(
    pool: &SqlitePool,
    artist_id: i64,
    similar_artist_id: i64,
) -> Result<bool> {
    if artist_id == similar_artist_id {
        return Ok(false);
    }

    let result = sqlx::query(
        r#"
        INSERT INTO similar_artists (artist_id, similar_artist_id)
        VALUES (?, ?)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(artist_id)
    .bind(similar_artist_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_outgoing_edges(pool: &SqlitePool, artist_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM similar_artists WHERE artist_id = ?")
        .bind(artist_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Names of the artists an artist points to
pub async fn similar_artist_names(pool: &SqlitePool, artist_id: i64) -> Result<Vec<String>> {
    let names: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT a.name FROM similar_artists s
        INNER JOIN artists a ON a.id = s.similar_artist_id
        WHERE s.artist_id = ?
        ORDER BY a.name
        "#,
    )
    .bind(artist_id)
    .fetch_all(pool)
    .await?;

    Ok(names)
}
