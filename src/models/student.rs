use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum StudentStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub status: StudentStatus,
    pub enrollment_date: NaiveDate,
    pub first_class_date: Option<NaiveDate>,
    pub last_class_date: Option<NaiveDate>,
    pub payment_due_day: i64,
}

impl Student {
    pub fn is_active(&self) -> bool {
        self.status == StudentStatus::Active
    }

    pub fn due_day(&self) -> u32 {
        self.payment_due_day.clamp(1, 31) as u32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirstClassDateRequest {
    pub first_class_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastClassDateRequest {
    pub last_class_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeactivateRequest {
    #[serde(default)]
    pub last_class_date: Option<NaiveDate>,
}
