//! Profile export for offline curation.

use anyhow::Result;
use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::db::Database;
use crate::dimension::Dimension;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

/// Flattened profile row for export
#[derive(Debug, Serialize)]
pub struct ExportedProfile {
    pub advisor_id: String,
    pub image_path: String,
    pub title: Option<String>,
    pub composition: Option<f64>,
    pub lighting: Option<f64>,
    pub focus_sharpness: Option<f64>,
    pub color_harmony: Option<f64>,
    pub subject_isolation: Option<f64>,
    pub depth_perspective: Option<f64>,
    pub visual_balance: Option<f64>,
    pub emotional_impact: Option<f64>,
    pub overall_grade: Option<String>,
    pub created_at: Option<String>,
}

/// Export an advisor's profiles to a file
pub fn export_profiles(
    db: &Database,
    advisor_id: &str,
    output_path: &Path,
    format: ExportFormat,
) -> Result<usize> {
    let profiles = db.load_profiles(advisor_id)?;
    let rows: Vec<ExportedProfile> = profiles
        .into_iter()
        .map(|p| ExportedProfile {
            composition: p.scores.get(&Dimension::Composition).copied(),
            lighting: p.scores.get(&Dimension::Lighting).copied(),
            focus_sharpness: p.scores.get(&Dimension::FocusSharpness).copied(),
            color_harmony: p.scores.get(&Dimension::ColorHarmony).copied(),
            subject_isolation: p.scores.get(&Dimension::SubjectIsolation).copied(),
            depth_perspective: p.scores.get(&Dimension::DepthPerspective).copied(),
            visual_balance: p.scores.get(&Dimension::VisualBalance).copied(),
            emotional_impact: p.scores.get(&Dimension::EmotionalImpact).copied(),
            advisor_id: p.advisor_id,
            image_path: p.image_path,
            title: p.title,
            overall_grade: p.overall_grade,
            created_at: p.created_at,
        })
        .collect();
    let count = rows.len();

    match format {
        ExportFormat::Json => export_json(&rows, output_path)?,
        ExportFormat::Csv => export_csv(&rows, output_path)?,
    }

    tracing::info!(advisor = advisor_id, count, path = %output_path.display(), "profiles exported");
    Ok(count)
}

fn export_json(rows: &[ExportedProfile], output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    serde_json::to_writer_pretty(file, rows)?;
    Ok(())
}

fn export_csv(rows: &[ExportedProfile], output_path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
