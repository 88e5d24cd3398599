use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use poem_openapi::{payload::Json, types::multipart::Upload, Multipart, Object};
use regex::Regex;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    core::{
        error::AppError,
        utils::{date_to_string, datetime_to_string_opt, non_empty, parse_date},
    },
    model::employee::{Employee, GENDERS, STATUSES},
    repository::employee::{EmployeeStats, GroupCount},
    schema::common::{api_responses, DataResponse, MessageResponse, PaginateResponse},
};

static EMPLOYEE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9-]+$").expect("valid employee code pattern"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9+\-\s()]+$").expect("valid phone pattern"));

pub const MIN_AGE: u32 = 17;
pub const MAX_AGE: u32 = 100;

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

fn validate_salary(value: &str) -> Result<(), ValidationError> {
    match value.trim().parse::<f64>() {
        Ok(salary) if salary.is_finite() && salary >= 0.0 => Ok(()),
        _ => Err(invalid("salary", "Salary must be a positive number")),
    }
}

fn validate_hire_date(value: &str) -> Result<(), ValidationError> {
    match parse_date(value) {
        Some(_) => Ok(()),
        None => Err(invalid("hire_date", "Invalid date format. Use YYYY-MM-DD")),
    }
}

fn validate_birth_date(value: &str) -> Result<(), ValidationError> {
    let birth_date = parse_date(value)
        .ok_or_else(|| invalid("birth_date", "Invalid date format. Use YYYY-MM-DD"))?;
    match age_on(birth_date, Local::now().date_naive()) {
        Some(age) if (MIN_AGE..=MAX_AGE).contains(&age) => Ok(()),
        _ => Err(invalid("birth_date", "Age must be between 17 and 100 years")),
    }
}

/// Completed years between `birth_date` and `today`; `None` for a future date.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> Option<u32> {
    today.years_since(birth_date)
}

fn validate_gender(value: &str) -> Result<(), ValidationError> {
    if GENDERS.contains(&value) {
        Ok(())
    } else {
        Err(invalid("gender", "Gender must be Male or Female"))
    }
}

fn validate_status(value: &str) -> Result<(), ValidationError> {
    if STATUSES.contains(&value) {
        Ok(())
    } else {
        Err(invalid(
            "status",
            "Invalid status. Must be Active, Inactive, or Resigned",
        ))
    }
}

/// Multipart body of employee create and update. Every field is optional at
/// the wire level; required fields are enforced by `EmployeePayload`.
#[derive(Multipart)]
pub struct EmployeeForm {
    pub employee_code: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub salary: Option<String>,
    pub hire_date: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub status: Option<String>,
    pub photo: Option<Upload>,
}

/// Employee fields as text, ready for validation.
#[derive(Debug, Validate)]
pub struct EmployeePayload {
    #[validate(
        length(min = 3, max = 20, message = "Employee code must be between 3 and 20 characters"),
        regex(
            path = *EMPLOYEE_CODE_RE,
            message = "Employee code can only contain uppercase letters, numbers, and hyphens"
        )
    )]
    pub employee_code: String,
    #[validate(length(min = 3, max = 100, message = "Full name must be between 3 and 100 characters"))]
    pub full_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(regex(path = *PHONE_RE, message = "Invalid phone number format"))]
    pub phone: Option<String>,
    #[validate(length(max = 500, message = "Address must not exceed 500 characters"))]
    pub address: Option<String>,
    #[validate(length(min = 2, max = 50, message = "Position must be between 2 and 50 characters"))]
    pub position: String,
    #[validate(length(min = 2, max = 50, message = "Department must be between 2 and 50 characters"))]
    pub department: String,
    #[validate(custom(function = "validate_salary"))]
    pub salary: Option<String>,
    #[validate(custom(function = "validate_hire_date"))]
    pub hire_date: String,
    #[validate(custom(function = "validate_birth_date"))]
    pub birth_date: Option<String>,
    #[validate(custom(function = "validate_gender"))]
    pub gender: String,
    #[validate(custom(function = "validate_status"))]
    pub status: String,
}

impl EmployeePayload {
    /// Payload of a new employee. Missing required fields stay empty and
    /// fail validation; status defaults to Active.
    pub fn from_form(form: &EmployeeForm) -> Self {
        let required = |value: &Option<String>| non_empty(value.clone()).unwrap_or_default();
        Self {
            employee_code: required(&form.employee_code),
            full_name: required(&form.full_name),
            email: required(&form.email),
            phone: non_empty(form.phone.clone()),
            address: non_empty(form.address.clone()),
            position: required(&form.position),
            department: required(&form.department),
            salary: non_empty(form.salary.clone()),
            hire_date: required(&form.hire_date),
            birth_date: non_empty(form.birth_date.clone()),
            gender: required(&form.gender),
            status: non_empty(form.status.clone()).unwrap_or_else(|| "Active".to_string()),
        }
    }

    pub fn from_employee(employee: &Employee) -> Self {
        Self {
            employee_code: employee.employee_code.clone(),
            full_name: employee.full_name.clone(),
            email: employee.email.clone(),
            phone: employee.phone.clone(),
            address: employee.address.clone(),
            position: employee.position.clone(),
            department: employee.department.clone(),
            salary: employee.salary.map(|salary| salary.to_string()),
            hire_date: date_to_string(employee.hire_date),
            birth_date: employee.birth_date.map(date_to_string),
            gender: employee.gender.clone(),
            status: employee.status.clone(),
        }
    }

    /// Overlay the fields present in `form`. A blank optional field clears
    /// it; a blank required field is kept blank and fails validation.
    pub fn merge(&mut self, form: &EmployeeForm) {
        let trimmed = |value: &String| value.trim().to_string();
        if let Some(val) = &form.employee_code {
            self.employee_code = trimmed(val);
        }
        if let Some(val) = &form.full_name {
            self.full_name = trimmed(val);
        }
        if let Some(val) = &form.email {
            self.email = trimmed(val);
        }
        if form.phone.is_some() {
            self.phone = non_empty(form.phone.clone());
        }
        if form.address.is_some() {
            self.address = non_empty(form.address.clone());
        }
        if let Some(val) = &form.position {
            self.position = trimmed(val);
        }
        if let Some(val) = &form.department {
            self.department = trimmed(val);
        }
        if form.salary.is_some() {
            self.salary = non_empty(form.salary.clone());
        }
        if let Some(val) = &form.hire_date {
            self.hire_date = trimmed(val);
        }
        if form.birth_date.is_some() {
            self.birth_date = non_empty(form.birth_date.clone());
        }
        if let Some(val) = &form.gender {
            self.gender = trimmed(val);
        }
        if let Some(val) = &form.status {
            self.status = trimmed(val);
        }
    }

    /// Validate and write the fields onto `employee`. `employee` is left
    /// untouched when validation fails.
    pub fn apply_to(self, employee: &mut Employee) -> Result<(), AppError> {
        self.validate()?;
        let hire_date = parse_date(&self.hire_date).ok_or_else(|| {
            AppError::validation("hire_date", "Invalid date format. Use YYYY-MM-DD")
        })?;
        let birth_date = match &self.birth_date {
            Some(val) => Some(parse_date(val).ok_or_else(|| {
                AppError::validation("birth_date", "Invalid date format. Use YYYY-MM-DD")
            })?),
            None => None,
        };
        let salary = match &self.salary {
            Some(val) => Some(val.trim().parse::<f64>().map_err(|_| {
                AppError::validation("salary", "Salary must be a positive number")
            })?),
            None => None,
        };
        employee.employee_code = self.employee_code;
        employee.full_name = self.full_name;
        employee.email = self.email;
        employee.phone = self.phone;
        employee.address = self.address;
        employee.position = self.position;
        employee.department = self.department;
        employee.salary = salary;
        employee.hire_date = hire_date;
        employee.birth_date = birth_date;
        employee.gender = self.gender;
        employee.status = self.status;
        Ok(())
    }

    /// Validate into a brand-new employee row.
    pub fn into_new_employee(self, created_by: Option<Uuid>) -> Result<Employee, AppError> {
        let now = Local::now().fixed_offset();
        let mut employee = Employee {
            id: Uuid::now_v7(),
            employee_code: String::new(),
            full_name: String::new(),
            email: String::new(),
            phone: None,
            address: None,
            position: String::new(),
            department: String::new(),
            salary: None,
            hire_date: NaiveDate::default(),
            birth_date: None,
            gender: String::new(),
            photo: None,
            status: String::new(),
            created_by,
            created_date: Some(now),
            updated_date: Some(now),
        };
        self.apply_to(&mut employee)?;
        Ok(employee)
    }
}

#[derive(Object, Deserialize)]
pub struct EmployeeDetail {
    pub id: String,
    pub employee_code: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub position: String,
    pub department: String,
    pub salary: Option<f64>,
    pub hire_date: String,
    pub birth_date: Option<String>,
    pub gender: String,
    /// Stored file name, served under `/uploads/`.
    pub photo: Option<String>,
    pub status: String,
    pub created_by: Option<String>,
    pub created_date: Option<String>,
    pub updated_date: Option<String>,
}

impl From<Employee> for EmployeeDetail {
    fn from(employee: Employee) -> Self {
        Self {
            id: employee.id.to_string(),
            employee_code: employee.employee_code,
            full_name: employee.full_name,
            email: employee.email,
            phone: employee.phone,
            address: employee.address,
            position: employee.position,
            department: employee.department,
            salary: employee.salary,
            hire_date: date_to_string(employee.hire_date),
            birth_date: employee.birth_date.map(date_to_string),
            gender: employee.gender,
            photo: employee.photo,
            status: employee.status,
            created_by: employee.created_by.map(|id| id.to_string()),
            created_date: datetime_to_string_opt(employee.created_date),
            updated_date: datetime_to_string_opt(employee.updated_date),
        }
    }
}

api_responses! {
    pub enum GetPaginateEmployeeResponses {
        #[oai(status = 200)]
        Ok(Json<PaginateResponse<EmployeeDetail>>),
    }
}

api_responses! {
    pub enum EmployeeDetailResponses {
        #[oai(status = 200)]
        Ok(Json<DataResponse<EmployeeDetail>>),
    }
}

api_responses! {
    pub enum EmployeeCreateResponses {
        #[oai(status = 201)]
        Created(Json<DataResponse<EmployeeDetail>>),
    }
}

api_responses! {
    pub enum EmployeeUpdateResponses {
        #[oai(status = 200)]
        Ok(Json<DataResponse<EmployeeDetail>>),
    }
}

api_responses! {
    pub enum EmployeeDeleteResponses {
        #[oai(status = 200)]
        Ok(Json<MessageResponse>),
    }
}

#[derive(Object, Deserialize)]
pub struct GroupCountDetail {
    pub label: String,
    pub count: i64,
}

impl From<GroupCount> for GroupCountDetail {
    fn from(group: GroupCount) -> Self {
        Self {
            label: group.label,
            count: group.count,
        }
    }
}

#[derive(Object, Deserialize)]
pub struct RecentEmployee {
    pub id: String,
    pub full_name: String,
    pub employee_code: String,
    pub position: String,
    pub department: String,
    pub hire_date: String,
}

#[derive(Object, Deserialize)]
pub struct EmployeeStatsDetail {
    pub total: i64,
    pub by_status: Vec<GroupCountDetail>,
    pub by_department: Vec<GroupCountDetail>,
    pub by_gender: Vec<GroupCountDetail>,
    pub recent: Vec<RecentEmployee>,
}

impl From<EmployeeStats> for EmployeeStatsDetail {
    fn from(stats: EmployeeStats) -> Self {
        let groups = |groups: Vec<GroupCount>| -> Vec<GroupCountDetail> {
            groups.into_iter().map(GroupCountDetail::from).collect()
        };
        Self {
            total: stats.total,
            by_status: groups(stats.by_status),
            by_department: groups(stats.by_department),
            by_gender: groups(stats.by_gender),
            recent: stats
                .recent
                .into_iter()
                .map(|employee| RecentEmployee {
                    id: employee.id.to_string(),
                    full_name: employee.full_name,
                    employee_code: employee.employee_code,
                    position: employee.position,
                    department: employee.department,
                    hire_date: date_to_string(employee.hire_date),
                })
                .collect(),
        }
    }
}

api_responses! {
    pub enum EmployeeStatsResponses {
        #[oai(status = 200)]
        Ok(Json<DataResponse<EmployeeStatsDetail>>),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::FieldError;

    fn form() -> EmployeeForm {
        EmployeeForm {
            employee_code: Some("EMP-001".to_string()),
            full_name: Some("Jane Doe".to_string()),
            email: Some("jane@company.test".to_string()),
            phone: Some("+62 (21) 555-0100".to_string()),
            address: None,
            position: Some("Engineer".to_string()),
            department: Some("IT".to_string()),
            salary: Some("8500.50".to_string()),
            hire_date: Some("2023-01-15".to_string()),
            birth_date: Some("1990-06-01".to_string()),
            gender: Some("Female".to_string()),
            status: None,
            photo: None,
        }
    }

    fn error_fields(err: AppError) -> Vec<String> {
        match err {
            AppError::ValidationFailed(fields) => {
                let mut fields: Vec<String> = fields
                    .into_iter()
                    .map(|FieldError { field, .. }| field)
                    .collect();
                fields.dedup();
                fields
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_new_employee_defaults_to_active() {
        let employee = EmployeePayload::from_form(&form())
            .into_new_employee(None)
            .unwrap();
        assert_eq!(employee.status, "Active");
        assert_eq!(employee.salary, Some(8500.5));
        assert_eq!(employee.hire_date, NaiveDate::from_ymd_opt(2023, 1, 15).unwrap());
    }

    #[test]
    fn test_missing_required_fields_are_reported() {
        let mut form = form();
        form.employee_code = None;
        form.gender = None;
        let err = EmployeePayload::from_form(&form)
            .into_new_employee(None)
            .unwrap_err();
        assert_eq!(error_fields(err), vec!["employee_code", "gender"]);
    }

    #[test]
    fn test_field_rules() {
        let mut form = form();
        form.employee_code = Some("emp-001".to_string());
        form.phone = Some("call me".to_string());
        form.salary = Some("-1".to_string());
        form.status = Some("Retired".to_string());
        let err = EmployeePayload::from_form(&form)
            .into_new_employee(None)
            .unwrap_err();
        assert_eq!(
            error_fields(err),
            vec!["employee_code", "phone", "salary", "status"]
        );
    }

    #[test]
    fn test_age_bounds() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(age_on(NaiveDate::from_ymd_opt(2008, 6, 1).unwrap(), today), Some(17));
        assert_eq!(age_on(NaiveDate::from_ymd_opt(2008, 6, 2).unwrap(), today), Some(16));
        assert_eq!(age_on(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(), today), None);
        assert!(validate_birth_date("1900-01-01").is_err());
        assert!(validate_birth_date("not-a-date").is_err());
    }

    #[test]
    fn test_merge_keeps_absent_fields() {
        let original = EmployeePayload::from_form(&form())
            .into_new_employee(None)
            .unwrap();
        let mut payload = EmployeePayload::from_employee(&original);
        payload.merge(&EmployeeForm {
            employee_code: None,
            full_name: None,
            email: None,
            phone: Some("".to_string()),
            address: None,
            position: Some("Lead Engineer".to_string()),
            department: None,
            salary: None,
            hire_date: None,
            birth_date: None,
            gender: None,
            status: Some("Resigned".to_string()),
            photo: None,
        });
        let mut updated = original.clone();
        payload.apply_to(&mut updated).unwrap();
        assert_eq!(updated.position, "Lead Engineer");
        assert_eq!(updated.status, "Resigned");
        assert_eq!(updated.phone, None);
        assert_eq!(updated.employee_code, original.employee_code);
        assert_eq!(updated.salary, original.salary);
    }
}
