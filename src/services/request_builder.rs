//! Builds the model request for an analysis run.
//!
//! Everything here is pure: the same mode, files and model selection always
//! yield the same request.

use serde::Serialize;
use serde_json::{json, Value};

use crate::config::Settings;
use crate::domain::{AnalysisMode, ProjectFile};

const PERSONA: &str = "You are a Senior Project Manager and PMIS AI Module expert in PMBOK Guide 8th Edition.";

const TASKS: &str = "TASK:
Generate a strictly formatted JSON report.
1. Validate data completeness (Data Readiness Score).
2. Calculate variances (SV, CV) and Indices (SPI, CPI) based on the ACTUAL data in the files.
3. Forecast trends (EAC, ETC).
4. Recommend corrective actions.
5. Identify if Change Requests are needed.";

const MODE_INSTRUCTIONS: &str = "SPECIFIC MODE INSTRUCTIONS:
- If SCHEDULE_CONTROL: Focus on Critical Path, Schedule Variance (SV), Schedule Performance Index (SPI).
- If FINANCIAL_CONTROL: Focus on Earned Value (EV), Cost Variance (CV), Cost Performance Index (CPI), EAC.
- If INTEGRATED_CONTROL: Correlate Schedule delays to Cost impacts. Use \"Thinking\" to deep dive into the relationship between delayed milestones and burn rate.";

const SIMULATION_NOTE: &str = "Note: If files are missing or unreadable, simulate a realistic scenario based on the file type names provided.";

pub const JSON_MIME_TYPE: &str = "application/json";

/// Which model variants to use and how much reasoning to allow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub fast_model: String,
    pub deep_model: String,
    pub thinking_budget: u32,
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            fast_model: "gemini-3-flash-preview".to_string(),
            deep_model: "gemini-3-pro-preview".to_string(),
            thinking_budget: 1024,
        }
    }
}

impl From<&Settings> for ModelSelection {
    fn from(settings: &Settings) -> Self {
        Self {
            fast_model: settings.fast_model.clone(),
            deep_model: settings.deep_model.clone(),
            thinking_budget: settings.thinking_budget,
        }
    }
}

/// Inline file payload sent next to the prompt.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub mime_type: String,
    pub data: String,
}

/// Output constraints for the model.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtraConfig {
    pub response_mime_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<u32>,
}

/// A fully assembled analysis request.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub model_variant: String,
    pub prompt_text: String,
    pub attachments: Vec<Attachment>,
    pub response_schema: Value,
    pub extra_config: ExtraConfig,
}

/// Compose the request for `mode` over the whole file set.
///
/// An empty file set still produces a valid request; callers decide whether
/// running it makes sense.
pub fn build_request(
    mode: AnalysisMode,
    files: &[ProjectFile],
    models: &ModelSelection,
) -> AnalysisRequest {
    let integrated = mode == AnalysisMode::IntegratedControl;

    let model_variant = if integrated {
        models.deep_model.clone()
    } else {
        models.fast_model.clone()
    };

    let attachments = files
        .iter()
        .filter_map(|f| match (&f.base64_data, &f.mime_type) {
            (Some(data), Some(mime_type)) => Some(Attachment {
                mime_type: mime_type.clone(),
                data: data.clone(),
            }),
            _ => None,
        })
        .collect();

    AnalysisRequest {
        model_variant,
        prompt_text: build_prompt(mode, files),
        attachments,
        response_schema: analysis_schema(),
        extra_config: ExtraConfig {
            response_mime_type: JSON_MIME_TYPE,
            thinking_budget: integrated.then_some(models.thinking_budget),
        },
    }
}

fn build_prompt(mode: AnalysisMode, files: &[ProjectFile]) -> String {
    let listing = files
        .iter()
        .map(|f| {
            format!(
                "- [{}] {} (Uploaded: {})",
                f.declared_type.label(),
                f.name,
                f.upload_date.format("%a %b %d %Y")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{PERSONA}\n\n\
         Operational Mode: {mode}\n\n\
         Analyze the attached project files (documents, data sheets).\n\n\
         CONTEXT FILES:\n{listing}\n\n\
         {TASKS}\n\n\
         {MODE_INSTRUCTIONS}\n\n\
         {SIMULATION_NOTE}\n"
    )
}

/// Response schema in the Gemini OpenAPI-subset dialect.
pub fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "executiveSummary": {
                "type": "STRING",
                "description": "A high-level summary of the project status based on PMBOK 8th Ed."
            },
            "metrics": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "label": { "type": "STRING" },
                        "value": { "type": "STRING" },
                        "unit": { "type": "STRING" },
                        "status": { "type": "STRING", "enum": ["good", "warning", "critical", "neutral"] },
                        "trend": { "type": "STRING", "enum": ["up", "down", "stable"] }
                    },
                    "required": ["label", "value", "status"]
                }
            },
            "chartData": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING", "description": "Time period or Milestone" },
                        "planned": { "type": "NUMBER" },
                        "actual": { "type": "NUMBER" },
                        "forecast": { "type": "NUMBER" }
                    },
                    "required": ["name", "planned", "actual"]
                }
            },
            "forecasts": { "type": "ARRAY", "items": { "type": "STRING" } },
            "risks": { "type": "ARRAY", "items": { "type": "STRING" } },
            "recommendations": { "type": "ARRAY", "items": { "type": "STRING" } },
            "changeRequests": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING" },
                        "title": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "priority": { "type": "STRING", "enum": ["High", "Medium", "Low"] },
                        "reason": { "type": "STRING" }
                    },
                    "required": ["title", "priority"]
                }
            },
            "dataReadinessScore": {
                "type": "NUMBER",
                "description": "Score from 0 to 100 indicating data completeness"
            }
        },
        "required": ["executiveSummary", "metrics", "chartData", "recommendations", "dataReadinessScore"]
    })
}
