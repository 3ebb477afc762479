//! Uploaded project artifacts and their classification.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Document category the user assigns an upload to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeclaredType {
    #[serde(alias = "Schedule Baseline")]
    ScheduleBaseline,
    #[serde(alias = "Project Schedule (Actuals)")]
    ProjectScheduleActuals,
    #[serde(alias = "Work Performance Data")]
    WorkPerformanceData,
    #[serde(alias = "Cost Baseline")]
    CostBaseline,
    #[serde(alias = "Actual Cost Report")]
    ActualCostReport,
    #[serde(alias = "Financial Management Plan")]
    FinancialPlan,
    #[serde(alias = "Risk Register")]
    RiskRegister,
    #[serde(alias = "Other")]
    Other,
}

impl DeclaredType {
    pub const ALL: [DeclaredType; 8] = [
        Self::ScheduleBaseline,
        Self::ProjectScheduleActuals,
        Self::WorkPerformanceData,
        Self::CostBaseline,
        Self::ActualCostReport,
        Self::FinancialPlan,
        Self::RiskRegister,
        Self::Other,
    ];

    /// Stable key used on the wire.
    pub fn key(&self) -> &'static str {
        match self {
            Self::ScheduleBaseline => "SCHEDULE_BASELINE",
            Self::ProjectScheduleActuals => "PROJECT_SCHEDULE_ACTUALS",
            Self::WorkPerformanceData => "WORK_PERFORMANCE_DATA",
            Self::CostBaseline => "COST_BASELINE",
            Self::ActualCostReport => "ACTUAL_COST_REPORT",
            Self::FinancialPlan => "FINANCIAL_PLAN",
            Self::RiskRegister => "RISK_REGISTER",
            Self::Other => "OTHER",
        }
    }

    /// Human-readable label shown in the dashboard and in prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ScheduleBaseline => "Schedule Baseline",
            Self::ProjectScheduleActuals => "Project Schedule (Actuals)",
            Self::WorkPerformanceData => "Work Performance Data",
            Self::CostBaseline => "Cost Baseline",
            Self::ActualCostReport => "Actual Cost Report",
            Self::FinancialPlan => "Financial Management Plan",
            Self::RiskRegister => "Risk Register",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DeclaredType {
    type Err = IntakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.key().eq_ignore_ascii_case(s) || t.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| IntakeError::UnknownType(s.to_string()))
    }
}

/// Coarse grouping used for the readiness indicators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileCategory {
    Schedule,
    Financial,
    Common,
}

/// Map a declared type to its category.
///
/// Only the three schedule types are `Schedule`; everything else, including
/// risk registers and `Other`, counts as `Financial`. `Common` is never produced.
pub fn classify(declared_type: DeclaredType) -> FileCategory {
    match declared_type {
        DeclaredType::ScheduleBaseline
        | DeclaredType::ProjectScheduleActuals
        | DeclaredType::WorkPerformanceData => FileCategory::Schedule,
        _ => FileCategory::Financial,
    }
}

/// Errors raised while turning an upload into a [`ProjectFile`].
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("unknown document type: {0}")]
    UnknownType(String),

    #[error("upload is missing the '{0}' field")]
    MissingField(&'static str),

    #[error("failed to read uploaded file: {0}")]
    Unreadable(String),
}

/// One uploaded artifact in the active file set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub declared_type: DeclaredType,
    pub category: FileCategory,
    pub upload_date: DateTime<Utc>,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Build a new record from the raw bytes of a successful file read.
pub fn ingest(
    raw: &[u8],
    declared_type: DeclaredType,
    name: impl Into<String>,
    mime_type: Option<&str>,
    size: u64,
) -> ProjectFile {
    let base64_data = (!raw.is_empty()).then(|| STANDARD.encode(raw));
    let mime_type = mime_type
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    ProjectFile {
        id: Uuid::new_v4(),
        name: name.into(),
        declared_type,
        category: classify(declared_type),
        upload_date: Utc::now(),
        size,
        base64_data,
        mime_type,
    }
}

/// File metadata returned to clients. The payload stays server-side.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFileResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub declared_type: DeclaredType,
    pub type_label: String,
    pub category: FileCategory,
    pub upload_date: DateTime<Utc>,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub has_content: bool,
}

impl From<&ProjectFile> for ProjectFileResponse {
    fn from(f: &ProjectFile) -> Self {
        Self {
            id: f.id,
            name: f.name.clone(),
            declared_type: f.declared_type,
            type_label: f.declared_type.label().to_string(),
            category: f.category,
            upload_date: f.upload_date,
            size: f.size,
            mime_type: f.mime_type.clone(),
            has_content: f.base64_data.is_some(),
        }
    }
}

/// Readiness indicators derived from the active file set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DataReadiness {
    pub schedule_ready: bool,
    pub financial_ready: bool,
    pub file_count: usize,
}

impl DataReadiness {
    pub fn from_files(files: &[ProjectFile]) -> Self {
        Self {
            schedule_ready: files.iter().any(|f| f.category == FileCategory::Schedule),
            financial_ready: files.iter().any(|f| f.category == FileCategory::Financial),
            file_count: files.len(),
        }
    }
}
