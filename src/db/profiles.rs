//! Dimensional profile storage.
//!
//! One row per (advisor, image). Rows are immutable once written except
//! for the lazily-populated teaching points, and are only ever deleted by
//! an explicit bulk wipe.

use anyhow::{bail, Result};
use rusqlite::params;
use std::collections::BTreeMap;

use super::Database;
use crate::dimension::Dimension;

/// Complete per-dimension critique record for one image under one advisor.
#[derive(Debug, Clone, Default)]
pub struct DimensionalProfile {
    pub id: i64,
    pub advisor_id: String,
    pub image_path: String,
    pub job_id: Option<String>,

    /// Dimension scores in [0, 10]. A missing dimension means "unknown",
    /// never zero.
    pub scores: BTreeMap<Dimension, f64>,
    /// Free-text commentary per scored dimension.
    pub comments: BTreeMap<Dimension, String>,
    /// Why this image is pedagogically useful per dimension. Populated
    /// lazily; may be absent.
    pub teaching_points: BTreeMap<Dimension, String>,

    pub title: Option<String>,
    pub photo_date: Option<String>,
    pub location: Option<String>,
    pub significance: Option<String>,
    pub description: Option<String>,
    pub techniques: Vec<String>,

    pub overall_grade: Option<String>,
    pub image_description: Option<String>,
    pub rendered_analysis: Option<String>,

    pub created_at: Option<String>,
}

impl DimensionalProfile {
    /// Display title for prompts: explicit title, falling back to the
    /// image filename.
    pub fn display_title(&self) -> String {
        if let Some(title) = &self.title {
            if !title.is_empty() {
                return title.clone();
            }
        }
        self.image_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.image_path)
            .to_string()
    }
}

/// Serialize a dimension-keyed map into a JSON object keyed by wire name.
fn dimension_map_to_json<V: serde::Serialize>(map: &BTreeMap<Dimension, V>) -> Result<String> {
    let named: BTreeMap<&str, &V> = map.iter().map(|(k, v)| (k.as_str(), v)).collect();
    Ok(serde_json::to_string(&named)?)
}

/// Parse a JSON object keyed by dimension name. Unknown dimension names are
/// skipped: a name outside the closed vocabulary is absent data, never a
/// zero score.
fn json_to_score_map(json: &str) -> BTreeMap<Dimension, f64> {
    let parsed: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(json).unwrap_or_default();
    parsed
        .into_iter()
        .filter_map(|(name, value)| {
            let dim = Dimension::parse(&name)?;
            let score = value.as_f64()?;
            Some((dim, score))
        })
        .collect()
}

fn json_to_text_map(json: &str) -> BTreeMap<Dimension, String> {
    let parsed: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(json).unwrap_or_default();
    parsed
        .into_iter()
        .filter_map(|(name, value)| {
            let dim = Dimension::parse(&name)?;
            let text = value.as_str()?.to_string();
            Some((dim, text))
        })
        .collect()
}

impl Database {
    /// Insert a newly analyzed profile. Fails if a profile already exists
    /// for this (advisor, image) pair.
    pub fn insert_profile(&self, profile: &DimensionalProfile) -> Result<i64> {
        for score in profile.scores.values() {
            if !(0.0..=10.0).contains(score) {
                bail!(
                    "score {} out of range for {}",
                    score,
                    profile.image_path
                );
            }
        }

        let scores = dimension_map_to_json(&profile.scores)?;
        let comments = dimension_map_to_json(&profile.comments)?;
        let teaching_points = dimension_map_to_json(&profile.teaching_points)?;
        let techniques = serde_json::to_string(&profile.techniques)?;
        let created_at = chrono::Utc::now().to_rfc3339();

        self.conn.execute(
            r#"
            INSERT INTO dimensional_profiles (
                advisor_id, image_path, job_id,
                scores, comments, teaching_points,
                title, photo_date, location, significance, description, techniques,
                overall_grade, image_description, rendered_analysis,
                created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                profile.advisor_id,
                profile.image_path,
                profile.job_id,
                scores,
                comments,
                teaching_points,
                profile.title,
                profile.photo_date,
                profile.location,
                profile.significance,
                profile.description,
                techniques,
                profile.overall_grade,
                profile.image_description,
                profile.rendered_analysis,
                created_at,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Fetch the profile for one (advisor, image) pair, if analyzed.
    pub fn get_profile(&self, advisor_id: &str, image_path: &str) -> Result<Option<DimensionalProfile>> {
        let result = self.conn.query_row(
            &format!("{} WHERE advisor_id = ? AND image_path = ?", SELECT_PROFILE),
            params![advisor_id, image_path],
            row_to_profile,
        );

        match result {
            Ok(profile) => Ok(Some(profile)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All reference profiles for an advisor, ordered by id for stable
    /// downstream tie-breaking. An unknown advisor yields an empty list,
    /// not an error.
    pub fn load_profiles(&self, advisor_id: &str) -> Result<Vec<DimensionalProfile>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE advisor_id = ? ORDER BY id ASC",
            SELECT_PROFILE
        ))?;

        let profiles = stmt
            .query_map([advisor_id], row_to_profile)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(profiles)
    }

    /// Lazily record why a reference image is instructive for a dimension.
    /// The only mutation permitted on a written profile.
    pub fn set_teaching_point(&self, profile_id: i64, dimension: Dimension, text: &str) -> Result<()> {
        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT teaching_points FROM dimensional_profiles WHERE id = ?",
                [profile_id],
                |row| row.get(0),
            )?;

        let mut points = existing.as_deref().map(json_to_text_map).unwrap_or_default();
        points.insert(dimension, text.to_string());
        let json = dimension_map_to_json(&points)?;

        self.conn.execute(
            "UPDATE dimensional_profiles SET teaching_points = ? WHERE id = ?",
            params![json, profile_id],
        )?;

        Ok(())
    }

    /// Remove every profile for an advisor. The only supported delete.
    pub fn wipe_profiles(&self, advisor_id: &str) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM dimensional_profiles WHERE advisor_id = ?",
            [advisor_id],
        )?;
        Ok(deleted)
    }

    pub fn count_profiles(&self, advisor_id: &str) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM dimensional_profiles WHERE advisor_id = ?",
            [advisor_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

const SELECT_PROFILE: &str = r#"
    SELECT id, advisor_id, image_path, job_id,
           scores, comments, teaching_points,
           title, photo_date, location, significance, description, techniques,
           overall_grade, image_description, rendered_analysis,
           created_at
    FROM dimensional_profiles
"#;

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<DimensionalProfile> {
    let scores: String = row.get(4)?;
    let comments: Option<String> = row.get(5)?;
    let teaching_points: Option<String> = row.get(6)?;
    let techniques: Option<String> = row.get(12)?;

    Ok(DimensionalProfile {
        id: row.get(0)?,
        advisor_id: row.get(1)?,
        image_path: row.get(2)?,
        job_id: row.get(3)?,
        scores: json_to_score_map(&scores),
        comments: comments.as_deref().map(json_to_text_map).unwrap_or_default(),
        teaching_points: teaching_points
            .as_deref()
            .map(json_to_text_map)
            .unwrap_or_default(),
        title: row.get(7)?,
        photo_date: row.get(8)?,
        location: row.get(9)?,
        significance: row.get(10)?,
        description: row.get(11)?,
        techniques: techniques
            .as_deref()
            .and_then(|t| serde_json::from_str(t).ok())
            .unwrap_or_default(),
        overall_grade: row.get(13)?,
        image_description: row.get(14)?,
        rendered_analysis: row.get(15)?,
        created_at: row.get(16)?,
    })
}
