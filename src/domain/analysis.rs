//! Analysis modes and the structured report returned by the model.
//!
//! Field names follow the camelCase response schema so the model output can be
//! deserialized directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::files::DeclaredType;

/// Summary used when the analysis call fails for any reason.
pub const FALLBACK_SUMMARY: &str =
    "Analysis failed due to API error. Please check your API key and file formats.";

/// Recommendations used when the analysis call fails for any reason.
pub const FALLBACK_RECOMMENDATIONS: [&str; 2] = [
    "Check API connectivity.",
    "Ensure files are PDF, CSV, or Text.",
];

/// Operating mode of the dashboard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisMode {
    #[default]
    Dashboard,
    ScheduleControl,
    FinancialControl,
    IntegratedControl,
}

impl AnalysisMode {
    pub const ALL: [AnalysisMode; 4] = [
        Self::Dashboard,
        Self::ScheduleControl,
        Self::FinancialControl,
        Self::IntegratedControl,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Dashboard => "DASHBOARD",
            Self::ScheduleControl => "SCHEDULE_CONTROL",
            Self::FinancialControl => "FINANCIAL_CONTROL",
            Self::IntegratedControl => "INTEGRATED_CONTROL",
        }
    }

    /// Whether this mode can run an analysis at all.
    pub fn is_analytic(&self) -> bool {
        !matches!(self, Self::Dashboard)
    }

    /// Document types offered for upload while this mode is active.
    pub fn relevant_types(&self) -> &'static [DeclaredType] {
        match self {
            Self::Dashboard => &[],
            Self::ScheduleControl => &[
                DeclaredType::ScheduleBaseline,
                DeclaredType::ProjectScheduleActuals,
                DeclaredType::WorkPerformanceData,
            ],
            Self::FinancialControl => &[
                DeclaredType::CostBaseline,
                DeclaredType::ActualCostReport,
                DeclaredType::FinancialPlan,
            ],
            Self::IntegratedControl => &[
                DeclaredType::ScheduleBaseline,
                DeclaredType::CostBaseline,
                DeclaredType::ProjectScheduleActuals,
                DeclaredType::ActualCostReport,
            ],
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::ScheduleControl => "Schedule Control (3.3)",
            Self::FinancialControl => "Financial Control (4.4)",
            Self::IntegratedControl => "Integrated Control",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Dashboard => "Overview of uploaded project data and readiness.",
            Self::ScheduleControl => {
                "Compare actual progress against approved baselines to forecast completion."
            }
            Self::FinancialControl => {
                "Monitor cost variances, analyze Earned Value, and manage reserves."
            }
            Self::IntegratedControl => {
                "Deep analysis of schedule delays impacts on cost and funding requirements."
            }
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Mode catalogue entry for the front-end.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeView {
    pub mode: AnalysisMode,
    pub title: &'static str,
    pub description: &'static str,
    pub relevant_types: Vec<DeclaredType>,
}

impl From<AnalysisMode> for ModeView {
    fn from(mode: AnalysisMode) -> Self {
        Self {
            mode,
            title: mode.title(),
            description: mode.description(),
            relevant_types: mode.relevant_types().to_vec(),
        }
    }
}

/// Metric value as returned by the model: either a number or free text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetricValue {
    Numeric(f64),
    Textual(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetricStatus {
    Good,
    Warning,
    Critical,
    Neutral,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisMetric {
    pub label: String,
    pub value: MetricValue,
    pub status: MetricStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// One period or milestone of the planned/actual series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartDataPoint {
    pub name: String,
    pub planned: f64,
    pub actual: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeRequest {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: Priority,
    #[serde(default)]
    pub reason: String,
}

/// Report body exactly as the model returns it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub executive_summary: String,
    pub metrics: Vec<AnalysisMetric>,
    pub chart_data: Vec<ChartDataPoint>,
    #[serde(default)]
    pub forecasts: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub change_requests: Vec<ChangeRequest>,
    pub data_readiness_score: f64,
}

/// The current analysis shown by the dashboard.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub mode: AnalysisMode,
    pub timestamp: DateTime<Utc>,
    pub executive_summary: String,
    pub metrics: Vec<AnalysisMetric>,
    pub chart_data: Vec<ChartDataPoint>,
    pub forecasts: Vec<String>,
    pub risks: Vec<String>,
    pub recommendations: Vec<String>,
    pub change_requests: Vec<ChangeRequest>,
    pub data_readiness_score: f64,
}

impl AnalysisResult {
    pub fn from_report(mode: AnalysisMode, timestamp: DateTime<Utc>, report: AnalysisReport) -> Self {
        Self {
            mode,
            timestamp,
            executive_summary: report.executive_summary,
            metrics: report.metrics,
            chart_data: report.chart_data,
            forecasts: report.forecasts,
            risks: report.risks,
            recommendations: report.recommendations,
            change_requests: report.change_requests,
            data_readiness_score: report.data_readiness_score,
        }
    }

    /// Degraded result returned whenever the analysis service cannot be used.
    pub fn fallback(mode: AnalysisMode, timestamp: DateTime<Utc>) -> Self {
        Self {
            mode,
            timestamp,
            executive_summary: FALLBACK_SUMMARY.to_string(),
            metrics: Vec::new(),
            chart_data: Vec::new(),
            forecasts: Vec::new(),
            risks: Vec::new(),
            recommendations: FALLBACK_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect(),
            change_requests: Vec::new(),
            data_readiness_score: 0.0,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.data_readiness_score == 0.0 && self.executive_summary == FALLBACK_SUMMARY
    }
}
