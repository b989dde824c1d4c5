//! Runtime configuration for collections-service.

use config::{Config as Cfg, File};
use serde::Deserialize;
use service_core::error::AppError;

use crate::models::CaseStage;

/// Day-offsets driving `next_action_utc` per case stage. These are policy
/// configuration, not engine rules: deployments tune them per playbook.
#[derive(Debug, Deserialize, Clone)]
pub struct PlaybookConfig {
    #[serde(default = "default_initial_days")]
    pub initial_days: i64,
    #[serde(default = "default_reminder_1_days")]
    pub reminder_1_days: i64,
    #[serde(default = "default_reminder_2_days")]
    pub reminder_2_days: i64,
    #[serde(default = "default_escalated_days")]
    pub escalated_days: i64,
}

fn default_initial_days() -> i64 {
    3
}

fn default_reminder_1_days() -> i64 {
    7
}

fn default_reminder_2_days() -> i64 {
    7
}

fn default_escalated_days() -> i64 {
    14
}

impl Default for PlaybookConfig {
    fn default() -> Self {
        Self {
            initial_days: default_initial_days(),
            reminder_1_days: default_reminder_1_days(),
            reminder_2_days: default_reminder_2_days(),
            escalated_days: default_escalated_days(),
        }
    }
}

impl PlaybookConfig {
    /// Days until the next scheduled action for a stage. PromiseToPay
    /// anchors on the promise date instead, and Resolved schedules
    /// nothing, so both return None.
    pub fn offset_days(&self, stage: CaseStage) -> Option<i64> {
        match stage {
            CaseStage::Initial => Some(self.initial_days),
            CaseStage::Reminder1 => Some(self.reminder_1_days),
            CaseStage::Reminder2 => Some(self.reminder_2_days),
            CaseStage::Escalated => Some(self.escalated_days),
            CaseStage::PromiseToPay | CaseStage::Resolved => None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CollectionsConfig {
    #[serde(default)]
    pub playbook: PlaybookConfig,
    /// Numeric-suffix attempts before a colliding slug falls back to a
    /// timestamp suffix.
    #[serde(default = "default_max_slug_attempts")]
    pub max_slug_attempts: u32,
}

fn default_max_slug_attempts() -> u32 {
    5
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            playbook: PlaybookConfig::default(),
            max_slug_attempts: default_max_slug_attempts(),
        }
    }
}

impl CollectionsConfig {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("collections").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()
            .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))
    }
}
