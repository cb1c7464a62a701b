use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::saju_tests::SajuTestEntity;
use crate::domain::value_objects::enums::{genders::Gender, model_tiers::ModelTier};

pub const MAX_NAME_LEN: usize = 50;

/// Analysis request as submitted by the dashboard form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SajuInput {
    pub name: String,
    /// YYYY-MM-DD
    pub birth_date: String,
    /// HH:mm, absent when the birth time is unknown
    #[serde(default)]
    pub birth_time: Option<String>,
    #[serde(default)]
    pub birth_time_unknown: bool,
    pub gender: Gender,
}

impl SajuInput {
    /// Validates the raw form fields and returns the parsed birth date.
    /// Runs before any side effect; errors are user-correctable messages.
    pub fn validate(&self) -> Result<NaiveDate, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("name is required".to_string());
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(format!("name must be at most {} characters", MAX_NAME_LEN));
        }

        let birth_date = NaiveDate::parse_from_str(&self.birth_date, "%Y-%m-%d")
            .map_err(|_| "birth_date must be a valid YYYY-MM-DD date".to_string())?;

        if let Some(birth_time) = self.birth_time.as_deref() {
            NaiveTime::parse_from_str(birth_time, "%H:%M")
                .map_err(|_| "birth_time must be a valid HH:mm time".to_string())?;
        }

        Ok(birth_date)
    }

    /// Birth time as shown to the generation model; unknown times render as
    /// the literal used by the prompt.
    pub fn birth_time_or_unknown(&self) -> &str {
        match self.birth_time.as_deref() {
            Some(time) if !self.birth_time_unknown => time,
            _ => "미상",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SajuTestDto {
    pub id: Uuid,
    pub name: String,
    pub birth_date: NaiveDate,
    pub birth_time: Option<String>,
    pub gender: Gender,
    pub result: String,
    pub model_used: ModelTier,
    pub created_at: DateTime<Utc>,
}

impl From<SajuTestEntity> for SajuTestDto {
    fn from(entity: SajuTestEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            birth_date: entity.birth_date,
            birth_time: entity.birth_time,
            gender: Gender::from_str(&entity.gender).unwrap_or(Gender::Male),
            result: entity.result,
            model_used: ModelTier::from_str(&entity.model_used),
            created_at: entity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> SajuInput {
        SajuInput {
            name: "홍길동".to_string(),
            birth_date: "1990-05-15".to_string(),
            birth_time: Some("08:30".to_string()),
            birth_time_unknown: false,
            gender: Gender::Male,
        }
    }

    #[test]
    fn accepts_valid_input() {
        let input = valid_input();
        let birth_date = input.validate().expect("valid input should pass");
        assert_eq!(birth_date, NaiveDate::from_ymd_opt(1990, 5, 15).unwrap());
    }

    #[test]
    fn rejects_empty_name() {
        let mut input = valid_input();
        input.name = "   ".to_string();
        assert!(input.validate().is_err());
    }

    #[test]
    fn rejects_overlong_name() {
        let mut input = valid_input();
        input.name = "가".repeat(MAX_NAME_LEN + 1);
        assert!(input.validate().is_err());
    }

    #[test]
    fn rejects_malformed_birth_date() {
        let mut input = valid_input();
        input.birth_date = "1990/05/15".to_string();
        assert!(input.validate().is_err());

        input.birth_date = "1990-02-30".to_string();
        assert!(input.validate().is_err());
    }

    #[test]
    fn rejects_malformed_birth_time() {
        let mut input = valid_input();
        input.birth_time = Some("25:99".to_string());
        assert!(input.validate().is_err());
    }

    #[test]
    fn dto_keeps_the_tier_of_a_pro_analysis() {
        let entity = SajuTestEntity {
            id: Uuid::new_v4(),
            user_id: "user_2abc".to_string(),
            name: "홍길동".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, 5, 15).unwrap(),
            birth_time: Some("08:30".to_string()),
            gender: "male".to_string(),
            result: "## 분석".to_string(),
            model_used: ModelTier::Pro.to_string(),
            created_at: Utc::now(),
        };

        let dto = SajuTestDto::from(entity);
        assert_eq!(dto.model_used, ModelTier::Pro);
    }

    #[test]
    fn unknown_birth_time_renders_placeholder() {
        let mut input = valid_input();
        input.birth_time = None;
        assert_eq!(input.birth_time_or_unknown(), "미상");

        input.birth_time = Some("08:30".to_string());
        input.birth_time_unknown = true;
        assert_eq!(input.birth_time_or_unknown(), "미상");
    }
}
