use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One data line of the sales sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub closer_name: Option<String>,
    pub setter_name: Option<String>,
    pub system_size_kw: f64,
    pub realization_flag: f64,
}

impl SourceRow {
    /// Net deal: realization flag of exactly 1.
    pub fn is_realized(&self) -> bool {
        (self.realization_flag - 1.0).abs() < f64::EPSILON
    }

    pub fn is_self_gen(&self) -> bool {
        matches!(
            (&self.setter_name, &self.closer_name),
            (Some(setter), Some(closer)) if setter == closer
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloserSummary {
    pub name: String,
    pub total_deals_count: usize,
    pub total_kw: f64,
}

impl CloserSummary {
    pub fn avg_kw_per_deal(&self) -> f64 {
        crate::insights::average(self.total_kw, self.total_deals_count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetterSummary {
    pub name: String,
    pub total_leads: usize,
    pub sold_leads: usize,
    #[serde(rename = "totalKWFromSold")]
    pub total_kw_from_sold: f64,
    pub unique_closers_worked_with: usize,
    pub conversion_rate: f64,
}

impl SetterSummary {
    pub fn avg_kw_per_sale(&self) -> f64 {
        crate::insights::average(self.total_kw_from_sold, self.sold_leads)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloserInsights {
    pub total_deals: usize,
    #[serde(rename = "totalKW")]
    pub total_kw: f64,
    pub top_closers: Vec<CloserSummary>,
    pub data_freshness: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetterInsights {
    pub total_leads: usize,
    pub total_sold: usize,
    pub overall_conversion_rate: f64,
    pub top_setters: Vec<SetterSummary>,
    pub data_freshness: DateTime<Utc>,
}

/// Both aggregates derived from a single fetch of the sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetSnapshot {
    pub closers: Option<CloserInsights>,
    pub setters: Option<SetterInsights>,
    pub self_gen_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Setter,
    Closer,
    Manager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setter => "setter",
            Self::Closer => "closer",
            Self::Manager => "manager",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "setter" => Ok(Self::Setter),
            "closer" => Ok(Self::Closer),
            "manager" => Ok(Self::Manager),
            other => anyhow::bail!("unknown role '{other}' (expected setter, closer or manager)"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_leads: u32,
    pub sold_leads: u32,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStats {
    pub total_leads: u32,
    pub recent_sold_leads: u32,
    pub team_size: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantContext {
    #[serde(default)]
    pub user_role: Option<Role>,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub lead_count: Option<u32>,
    #[serde(default)]
    pub recent_activity: Option<String>,
    #[serde(default)]
    pub user_stats: Option<UserStats>,
    #[serde(default)]
    pub team_stats: Option<TeamStats>,
}

impl AssistantContext {
    pub fn for_role(role: Role, team_id: impl Into<String>) -> Self {
        Self {
            user_role: Some(role),
            team_id: team_id.into(),
            ..Self::default()
        }
    }

    pub fn role_label(&self) -> &'static str {
        self.user_role.map_or("team member", |role| role.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Speaker,
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Inbound call from the dashboard chat widget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantInput {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub context: AssistantContext,
    #[serde(default)]
    pub conversation_history: Vec<ChatTurn>,
}
