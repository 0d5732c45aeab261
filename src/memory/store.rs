//! Synchronous read/write path over the `memories` table.
//!
//! [`insert_memory`] is insert-or-ignore keyed by the deterministic id, so a
//! repeated `(content, context_type)` pair leaves exactly one row.
//! [`search`] scores every candidate with `vec_distance_cosine` and applies the
//! optional context-type filter in the same statement, so a filtered query
//! never loses matches to unfiltered neighbours.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::embedding::embedding_to_bytes;
use crate::memory::types::{memory_id, ContextType, MemoryRecord, Metadata};

/// Result returned from a write.
#[derive(Debug)]
pub struct InsertOutcome {
    pub id: String,
    /// `false` when an identical record already existed.
    pub created: bool,
}

/// Write a record. `metadata` must already carry `timestamp` and `context_type`.
pub fn insert_memory(
    conn: &Connection,
    content: &str,
    context_type: ContextType,
    metadata: &Metadata,
    embedding: &[f32],
) -> Result<InsertOutcome> {
    let id = memory_id(content, context_type);
    let now = chrono::Utc::now().to_rfc3339();
    let metadata_json = serde_json::to_string(metadata)?;

    let rows = conn
        .execute(
            "INSERT INTO memories (id, content, context_type, metadata, embedding, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) ON CONFLICT(id) DO NOTHING",
            params![
                id,
                content,
                context_type.as_str(),
                metadata_json,
                embedding_to_bytes(embedding),
                now,
            ],
        )
        .context("failed to insert memory")?;

    Ok(InsertOutcome {
        id,
        created: rows > 0,
    })
}

/// Nearest neighbours of `embedding`, closest first, ties by insertion order.
pub fn search(
    conn: &Connection,
    embedding: &[f32],
    context_type: Option<ContextType>,
    limit: usize,
) -> Result<Vec<MemoryRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, content, context_type, metadata, \
                vec_distance_cosine(embedding, ?1) AS distance \
         FROM memories \
         WHERE ?2 IS NULL OR context_type = ?2 \
         ORDER BY distance ASC, rowid ASC \
         LIMIT ?3",
    )?;

    let rows = stmt
        .query_map(
            params![
                embedding_to_bytes(embedding),
                context_type.map(|c| c.as_str()),
                limit as i64
            ],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, f64>(4)?,
                ))
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, content, ct, metadata, distance)| {
            Ok(MemoryRecord {
                id,
                content,
                context_type: parse_context_type(&ct)?,
                metadata: serde_json::from_str(&metadata)?,
                distance: Some(distance),
            })
        })
        .collect()
}

/// Number of stored records, optionally restricted to one context type.
pub fn count_memories(conn: &Connection, context_type: Option<ContextType>) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM memories WHERE ?1 IS NULL OR context_type = ?1",
        params![context_type.map(|c| c.as_str())],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

fn parse_context_type(s: &str) -> Result<ContextType> {
    s.parse::<ContextType>().map_err(anyhow::Error::msg)
}
