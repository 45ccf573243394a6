//! Book passage storage.
//!
//! Curated text excerpts tagged by dimension, written by an offline import
//! step and read-only at serve time. Embeddings are computed externally and
//! stored opaquely.

use anyhow::Result;
use rusqlite::params;
use std::collections::BTreeSet;

use super::Database;
use crate::dimension::Dimension;
use crate::error::CritiqueError;

/// One curated excerpt from an advisor's reading list.
#[derive(Debug, Clone)]
pub struct BookPassage {
    pub id: i64,
    pub advisor_id: String,
    pub book_title: String,
    pub passage_text: String,
    /// Which dimensions this passage illustrates. Always non-empty.
    pub dimension_tags: BTreeSet<Dimension>,
    /// Opaque embedding produced externally; absent until backfilled.
    pub embedding: Option<Vec<f32>>,
    pub relevance_score: f64,
    pub source: Option<String>,
    pub notes: Option<String>,
}

impl Database {
    /// Import one passage. Rejects empty tag sets and unknown dimension
    /// names up front so the serve path never sees a malformed row.
    #[allow(clippy::too_many_arguments)]
    pub fn insert_passage(
        &self,
        advisor_id: &str,
        book_title: &str,
        passage_text: &str,
        dimension_tags: &[String],
        embedding: Option<&[f32]>,
        relevance_score: f64,
        source: Option<&str>,
        notes: Option<&str>,
    ) -> Result<i64, CritiqueError> {
        if dimension_tags.is_empty() {
            return Err(CritiqueError::InvalidPassage(format!(
                "passage from '{}' has no dimension tags",
                book_title
            )));
        }

        let mut tags = BTreeSet::new();
        for name in dimension_tags {
            match Dimension::parse(name) {
                Some(dim) => {
                    tags.insert(dim);
                }
                None => {
                    return Err(CritiqueError::InvalidPassage(format!(
                        "unknown dimension tag '{}'",
                        name
                    )));
                }
            }
        }

        let tag_names: Vec<&str> = tags.iter().map(|d| d.as_str()).collect();
        let tags_json = serde_json::to_string(&tag_names)
            .map_err(|e| CritiqueError::InvalidPassage(e.to_string()))?;
        let bytes = embedding.map(embedding_to_bytes);
        let dim = embedding.map(|e| e.len() as i64);

        self.conn
            .execute(
                r#"
                INSERT INTO book_passages
                    (advisor_id, book_title, passage_text, dimension_tags,
                     embedding, embedding_dim, relevance_score, source, notes)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    advisor_id,
                    book_title,
                    passage_text,
                    tags_json,
                    bytes,
                    dim,
                    relevance_score,
                    source,
                    notes
                ],
            )
            .map_err(|e| CritiqueError::StoreUnavailable(e.into()))?;

        Ok(self.conn.last_insert_rowid())
    }

    /// All passages for an advisor, ordered by id. An unknown advisor
    /// yields an empty list, not an error.
    pub fn load_passages(&self, advisor_id: &str) -> Result<Vec<BookPassage>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, advisor_id, book_title, passage_text, dimension_tags,
                   embedding, relevance_score, source, notes
            FROM book_passages
            WHERE advisor_id = ?
            ORDER BY id ASC
            "#,
        )?;

        let passages = stmt
            .query_map([advisor_id], |row| {
                let tags_json: String = row.get(4)?;
                let embedding_bytes: Option<Vec<u8>> = row.get(5)?;
                Ok(BookPassage {
                    id: row.get(0)?,
                    advisor_id: row.get(1)?,
                    book_title: row.get(2)?,
                    passage_text: row.get(3)?,
                    dimension_tags: parse_tags(&tags_json),
                    embedding: embedding_bytes.as_deref().map(bytes_to_embedding),
                    relevance_score: row.get(6)?,
                    source: row.get(7)?,
                    notes: row.get(8)?,
                })
            })?
            .filter_map(|r| r.ok())
            // A row that lost all its tags to vocabulary drift is useless
            // for retrieval; skip it rather than surface it untagged.
            .filter(|p: &BookPassage| !p.dimension_tags.is_empty())
            .collect();

        Ok(passages)
    }

    pub fn count_passages(&self, advisor_id: &str) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM book_passages WHERE advisor_id = ?",
            [advisor_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn parse_tags(json: &str) -> BTreeSet<Dimension> {
    let names: Vec<String> = serde_json::from_str(json).unwrap_or_default();
    names.iter().filter_map(|n| Dimension::parse(n)).collect()
}

/// Convert f32 slice to bytes for storage
pub(crate) fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &val in embedding {
        bytes.extend_from_slice(&val.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to f32 vector
pub(crate) fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let arr: [u8; 4] = chunk.try_into().unwrap();
            f32::from_le_bytes(arr)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn test_insert_and_load_passage() {
        let db = test_db();
        let id = db
            .insert_passage(
                "ansel",
                "The Negative",
                "Visualization is the single most important element.",
                &["composition".to_string(), "emotional_impact".to_string()],
                Some(&[0.1, 0.2, 0.3]),
                0.9,
                Some("ch. 1"),
                None,
            )
            .unwrap();
        assert!(id > 0);

        let passages = db.load_passages("ansel").unwrap();
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].book_title, "The Negative");
        assert!(passages[0].dimension_tags.contains(&Dimension::Composition));
        assert!(passages[0]
            .dimension_tags
            .contains(&Dimension::EmotionalImpact));
        assert_eq!(passages[0].embedding.as_deref(), Some(&[0.1f32, 0.2, 0.3][..]));
        assert_eq!(passages[0].relevance_score, 0.9);
    }

    #[test]
    fn test_empty_tags_rejected() {
        let db = test_db();
        let err = db
            .insert_passage("ansel", "The Print", "text", &[], None, 1.0, None, None)
            .unwrap_err();
        assert!(matches!(err, CritiqueError::InvalidPassage(_)));
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let db = test_db();
        let err = db
            .insert_passage(
                "ansel",
                "The Print",
                "text",
                &["bokeh".to_string()],
                None,
                1.0,
                None,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, CritiqueError::InvalidPassage(_)));
    }

    #[test]
    fn test_embedding_conversion() {
        let original = vec![1.5, -2.3, 0.0, 100.0];
        let bytes = embedding_to_bytes(&original);
        let recovered = bytes_to_embedding(&bytes);
        assert_eq!(original, recovered);
    }
}
