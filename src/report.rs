//! Interview reports
//!
//! Payloads handed to the presentation layer, and the client that fetches
//! them from the report backend once a call has been resolved.

use crate::error::{ReportError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillScore {
    pub skill: String,
    #[serde(default, deserialize_with = "lenient_score")]
    pub score: f64,
}

/// Report produced for a finished interview call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewReport {
    #[serde(default)]
    pub candidate_name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default, deserialize_with = "lenient_score")]
    pub overall_score: f64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub scores_per_skill: Vec<SkillScore>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub overall_strengths: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub overall_improvements: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub recommendations: Vec<String>,
}

impl InterviewReport {
    /// Each skill's share of the summed skill scores, in percent rounded to one decimal
    pub fn skill_shares(&self) -> Vec<(String, f64)> {
        let total: f64 = self.scores_per_skill.iter().map(|s| s.score).sum();
        self.scores_per_skill
            .iter()
            .map(|s| {
                let share = if total == 0.0 {
                    0.0
                } else {
                    (s.score / total * 1000.0).round() / 10.0
                };
                (s.skill.clone(), share)
            })
            .collect()
    }
}

impl fmt::Display for InterviewReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Candidate: {}", self.candidate_name)?;
        writeln!(f, "Position: {}", self.position)?;
        writeln!(f, "Overall Score: {}", self.overall_score)?;

        if !self.scores_per_skill.is_empty() {
            writeln!(f, "\nSkill Scores:")?;
            for (entry, (_, share)) in self.scores_per_skill.iter().zip(self.skill_shares()) {
                writeln!(f, "  - {}: {} ({:.1}%)", entry.skill, entry.score, share)?;
            }
        }

        write_section(f, "Overall Strengths", &self.overall_strengths, "No strengths listed.")?;
        write_section(f, "Overall Improvements", &self.overall_improvements, "No improvements listed.")?;
        write_section(f, "Recommendations", &self.recommendations, "No recommendations listed.")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    #[serde(default, deserialize_with = "lenient_score")]
    pub technical: f64,
    #[serde(default, deserialize_with = "lenient_score")]
    pub communication: f64,
    #[serde(default, deserialize_with = "lenient_score")]
    pub behavioral: f64,
}

/// Report stored against a resume, fetched without any call polling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeReport {
    #[serde(default)]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub strengths: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub overall_recommendation: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub justification: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scores: ScoreBreakdown,
    #[serde(default, deserialize_with = "lenient_optional_score")]
    pub avg_rating: Option<f64>,
}

impl ResumeReport {
    pub fn rating_label(&self) -> String {
        match self.avg_rating {
            Some(rating) if rating != 0.0 => format!("{}/10", rating),
            _ => "N/A".to_string(),
        }
    }
}

impl fmt::Display for ResumeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary: {}", self.summary)?;
        writeln!(f, "Average Rating: {}", self.rating_label())?;
        writeln!(f, "\nScores:")?;
        writeln!(f, "  - Technical: {}", self.scores.technical)?;
        writeln!(f, "  - Communication: {}", self.scores.communication)?;
        writeln!(f, "  - Behavioral: {}", self.scores.behavioral)?;
        write_section(f, "Strengths", &self.strengths, "None listed.")?;
        write_section(f, "Improvements", &self.improvements, "None listed.")?;
        writeln!(
            f,
            "\nStatus: {}",
            self.overall_recommendation.as_deref().unwrap_or("N/A")
        )?;
        write_section(f, "Justification", &self.justification, "None listed.")
    }
}

fn write_section(f: &mut fmt::Formatter<'_>, title: &str, items: &[String], empty: &str) -> fmt::Result {
    writeln!(f, "\n{}:", title)?;
    if items.is_empty() {
        return writeln!(f, "  {}", empty);
    }
    for item in items {
        writeln!(f, "  - {}", item)?;
    }
    Ok(())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScoreValue {
    Number(f64),
    Text(String),
}

impl ScoreValue {
    fn into_f64<E: serde::de::Error>(self) -> std::result::Result<f64, E> {
        match self {
            ScoreValue::Number(n) => Ok(n),
            ScoreValue::Text(s) if s.trim().is_empty() => Ok(0.0),
            ScoreValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("score '{}' is not a number", s))),
        }
    }
}

/// Accept scores sent either as numbers or numeric strings; null counts as 0
fn lenient_score<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<ScoreValue>::deserialize(deserializer)? {
        Some(value) => value.into_f64(),
        None => Ok(0.0),
    }
}

fn lenient_optional_score<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<ScoreValue>::deserialize(deserializer)?
        .map(|value| value.into_f64::<D::Error>())
        .transpose()
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Fetch the report generated for an ended call
    async fn fetch_interview_report(&self, call_id: &str, resume_id: &str, auth_token: &str) -> Result<InterviewReport>;

    /// Fetch the stored report for a resume
    async fn fetch_resume_report(&self, resume_id: &str) -> Result<ResumeReport>;
}

pub struct HttpReportClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReportClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ReportSource for HttpReportClient {
    async fn fetch_interview_report(&self, call_id: &str, resume_id: &str, auth_token: &str) -> Result<InterviewReport> {
        let url = format!("{}/api/interviews/fetch/{}/", self.base_url, call_id);
        info!("Fetching interview report for call {}", call_id);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", auth_token))
            .json(&serde_json::json!({ "resume_id": resume_id }))
            .send()
            .await
            .map_err(|e| ReportError::DependentFetch(format!("report request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::DependentFetch(format!(
                "report request failed with status {}",
                status.as_u16()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ReportError::DependentFetch(format!("failed to parse report response: {}", e)))?;

        extract_interview_report(body)
    }

    async fn fetch_resume_report(&self, resume_id: &str) -> Result<ResumeReport> {
        if resume_id.trim().is_empty() {
            return Err(ReportError::Input("No resume ID found.".to_string()));
        }
        let url = format!("{}/api/interview/report/{}/", self.base_url, resume_id);
        debug!("Fetching stored report for resume {}", resume_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ReportError::DependentFetch(format!("report request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::DependentFetch(format!(
                "report request failed with status {}",
                status.as_u16()
            )));
        }

        response
            .json::<ResumeReport>()
            .await
            .map_err(|e| ReportError::DependentFetch(format!("failed to parse report: {}", e)))
    }
}

/// Pull the `report` object out of a fetch response
pub fn extract_interview_report(body: serde_json::Value) -> Result<InterviewReport> {
    match body.get("report") {
        Some(report) if !report.is_null() => serde_json::from_value(report.clone())
            .map_err(|e| ReportError::DependentFetch(format!("invalid report payload: {}", e))),
        _ => Err(ReportError::DependentFetch("Report not available in response".to_string())),
    }
}
