use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Deserialize;
use sqlx::prelude::FromRow;
use uuid::Uuid;

pub const TABLE_NAME: &str = "public.employees";

pub const GENDERS: [&str; 2] = ["Male", "Female"];
pub const STATUSES: [&str; 3] = ["Active", "Inactive", "Resigned"];

#[derive(Clone, Debug, Deserialize, FromRow)]
pub struct Employee {
    pub id: Uuid,
    pub employee_code: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub position: String,
    pub department: String,
    pub salary: Option<f64>,
    pub hire_date: NaiveDate,
    pub birth_date: Option<NaiveDate>,
    pub gender: String,
    pub photo: Option<String>,
    pub status: String,
    pub created_by: Option<Uuid>,
    pub created_date: Option<DateTime<FixedOffset>>,
    pub updated_date: Option<DateTime<FixedOffset>>,
}
