//! Typed entity records and their create/update drafts
//!
//! A draft is validated before any request is built from it.

use agencydesk_core::{validation_error, AgencyResult};
use agencydesk_table::{Align, CellKind, Column, TableRow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A REST collection of typed records
pub trait Resource: DeserializeOwned + Serialize + TableRow + Send + Sync + 'static {
    /// Collection path relative to the API base URL
    const PATH: &'static str;
    /// Human-readable collection name
    const NAME: &'static str;

    type Draft: Draft;

    /// Default list columns
    fn columns() -> Vec<Column>;
}

/// Request body for create/update
pub trait Draft: Serialize + Send + Sync {
    fn validate(&self) -> AgencyResult<()>;
}

/// Record identifier; the backend sends either a number or a string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawRecordId", into = "serde_json::Value")]
pub struct RecordId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRecordId {
    Number(i64),
    Text(String),
}

impl From<RawRecordId> for RecordId {
    fn from(raw: RawRecordId) -> Self {
        match raw {
            RawRecordId::Number(n) => Self(n.to_string()),
            RawRecordId::Text(s) => Self(s),
        }
    }
}

/// Numeric ids go back out as numbers
impl From<RecordId> for serde_json::Value {
    fn from(id: RecordId) -> Self {
        match id.0.parse::<i64>() {
            Ok(n) => serde_json::Value::from(n),
            Err(_) => serde_json::Value::String(id.0),
        }
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn require(value: &str, field: &str, component: &str) -> AgencyResult<()> {
    if value.trim().is_empty() {
        return Err(validation_error!(
            format!("{} is required", field),
            field,
            component
        ));
    }
    Ok(())
}

fn check_email(value: Option<&str>, component: &str) -> AgencyResult<()> {
    match value {
        Some(email) if !email.is_empty() && !email.contains('@') => Err(validation_error!(
            format!("'{}' is not a valid email address", email),
            "email",
            component
        )),
        _ => Ok(()),
    }
}

fn check_amount(value: Option<f64>, field: &str, component: &str) -> AgencyResult<()> {
    match value {
        Some(amount) if !amount.is_finite() || amount < 0.0 => Err(validation_error!(
            format!("{} must be a non-negative number", field),
            field,
            component
        )),
        _ => Ok(()),
    }
}

fn check_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    component: &str,
) -> AgencyResult<()> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(validation_error!(
            "end_date is before start_date",
            "end_date",
            component
        )),
        _ => Ok(()),
    }
}

macro_rules! table_row {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl TableRow for $ty {
                fn row_id(&self) -> String {
                    self.id.to_string()
                }
            }
        )+
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

impl Draft for ClientDraft {
    fn validate(&self) -> AgencyResult<()> {
        require(&self.name, "name", "clients")?;
        check_email(self.email.as_deref(), "clients")
    }
}

impl Resource for Client {
    const PATH: &'static str = "/clients";
    const NAME: &'static str = "clients";
    type Draft = ClientDraft;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("id", "ID").align(Align::Right),
            Column::new("name", "Name"),
            Column::new("company", "Company"),
            Column::new("email", "Email"),
            Column::new("status", "Status").kind(CellKind::Badge),
            Column::new("created_at", "Created").kind(CellKind::Date),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub client_id: Option<RecordId>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractDraft {
    pub title: String,
    pub client_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl Draft for ContractDraft {
    fn validate(&self) -> AgencyResult<()> {
        require(&self.title, "title", "contracts")?;
        if self.client_id.is_none() {
            return Err(validation_error!("client_id is required", "client_id", "contracts"));
        }
        check_amount(self.value, "value", "contracts")?;
        check_range(self.start_date, self.end_date, "contracts")
    }
}

impl Resource for Contract {
    const PATH: &'static str = "/contracts";
    const NAME: &'static str = "contracts";
    type Draft = ContractDraft;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("id", "ID").align(Align::Right),
            Column::new("title", "Title"),
            Column::new("value", "Value").align(Align::Right),
            Column::new("start_date", "Start").kind(CellKind::Date),
            Column::new("end_date", "End").kind(CellKind::Date),
            Column::new("status", "Status").kind(CellKind::Badge),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quotation {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub client_id: Option<RecordId>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotationDraft {
    pub title: String,
    pub client_id: Option<RecordId>,
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<NaiveDate>,
}

impl Draft for QuotationDraft {
    fn validate(&self) -> AgencyResult<()> {
        require(&self.title, "title", "quotations")?;
        if self.client_id.is_none() {
            return Err(validation_error!("client_id is required", "client_id", "quotations"));
        }
        if self.amount.is_none() {
            return Err(validation_error!("amount is required", "amount", "quotations"));
        }
        check_amount(self.amount, "amount", "quotations")
    }
}

impl Resource for Quotation {
    const PATH: &'static str = "/quotations";
    const NAME: &'static str = "quotations";
    type Draft = QuotationDraft;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("id", "ID").align(Align::Right),
            Column::new("title", "Title"),
            Column::new("amount", "Amount").align(Align::Right),
            Column::new("valid_until", "Valid until").kind(CellKind::Date),
            Column::new("status", "Status").kind(CellKind::Badge),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmployeeDraft {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl Draft for EmployeeDraft {
    fn validate(&self) -> AgencyResult<()> {
        require(&self.name, "name", "employees")?;
        require(&self.email, "email", "employees")?;
        check_email(Some(&self.email), "employees")?;
        match self.password.as_deref() {
            Some(password) if password.len() < 8 => Err(validation_error!(
                "password must be at least 8 characters",
                "password",
                "employees"
            )),
            _ => Ok(()),
        }
    }
}

impl Resource for Employee {
    const PATH: &'static str = "/employees";
    const NAME: &'static str = "employees";
    type Draft = EmployeeDraft;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("id", "ID").align(Align::Right),
            Column::new("name", "Name"),
            Column::new("email", "Email"),
            Column::new("position", "Position"),
            Column::new("department", "Department"),
            Column::new("is_active", "Active")
                .kind(CellKind::Icon)
                .align(Align::Center),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<RecordId>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

impl Draft for TaskDraft {
    fn validate(&self) -> AgencyResult<()> {
        require(&self.title, "title", "tasks")?;
        match self.priority.as_deref() {
            None | Some("low") | Some("medium") | Some("high") => Ok(()),
            Some(other) => Err(validation_error!(
                format!("unknown priority '{}'", other),
                "priority",
                "tasks"
            )),
        }
    }
}

impl Resource for Task {
    const PATH: &'static str = "/tasks";
    const NAME: &'static str = "tasks";
    type Draft = TaskDraft;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("id", "ID").align(Align::Right),
            Column::new("title", "Title"),
            Column::new("priority", "Priority").kind(CellKind::Badge),
            Column::new("due_date", "Due").kind(CellKind::Date),
            Column::new("status", "Status").kind(CellKind::Badge),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub client_id: Option<RecordId>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeetingDraft {
    pub title: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Draft for MeetingDraft {
    fn validate(&self) -> AgencyResult<()> {
        require(&self.title, "title", "meetings")?;
        if self.scheduled_at.is_none() {
            return Err(validation_error!(
                "scheduled_at is required",
                "scheduled_at",
                "meetings"
            ));
        }
        Ok(())
    }
}

impl Resource for Meeting {
    const PATH: &'static str = "/meetings";
    const NAME: &'static str = "meetings";
    type Draft = MeetingDraft;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("id", "ID").align(Align::Right),
            Column::new("title", "Title"),
            Column::new("scheduled_at", "When").kind(CellKind::Date),
            Column::new("location", "Location"),
            Column::new("status", "Status").kind(CellKind::Badge),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketingDocument {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketingDocumentDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub file_url: String,
}

impl Draft for MarketingDocumentDraft {
    fn validate(&self) -> AgencyResult<()> {
        require(&self.title, "title", "marketing_documents")?;
        require(&self.file_url, "file_url", "marketing_documents")?;
        url::Url::parse(&self.file_url).map(|_| ()).map_err(|e| {
            validation_error!(
                format!("file_url is not a valid URL: {}", e),
                "file_url",
                "marketing_documents"
            )
        })
    }
}

impl Resource for MarketingDocument {
    const PATH: &'static str = "/marketing-documents";
    const NAME: &'static str = "marketing_documents";
    type Draft = MarketingDocumentDraft;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("id", "ID").align(Align::Right),
            Column::new("title", "Title"),
            Column::new("category", "Category").kind(CellKind::Badge),
            Column::new("updated_at", "Updated").kind(CellKind::Date),
        ]
    }
}

table_row!(Client, Contract, Quotation, Employee, Task, Meeting, MarketingDocument);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_round_trips_number() {
        let client: Client =
            serde_json::from_str(r#"{"id": 17, "name": "Acme", "status": "active"}"#).unwrap();
        assert_eq!(client.row_id(), "17");
        assert_eq!(serde_json::to_value(&client).unwrap()["id"], 17);
    }

    #[test]
    fn test_drafts_require_fields() {
        let error = ClientDraft::default().validate().unwrap_err();
        assert_eq!(error.field(), Some("name"));

        let draft = ClientDraft {
            name: "Acme".to_string(),
            email: Some("acme.example".to_string()),
            ..Default::default()
        };
        assert_eq!(draft.validate().unwrap_err().field(), Some("email"));

        let draft = QuotationDraft {
            title: "Website".to_string(),
            client_id: Some(RecordId::from(3u64)),
            amount: None,
            valid_until: None,
        };
        assert_eq!(draft.validate().unwrap_err().field(), Some("amount"));
    }

    #[test]
    fn test_contract_dates_must_be_ordered() {
        let draft = ContractDraft {
            title: "Retainer".to_string(),
            client_id: Some(RecordId::from("c-1")),
            value: Some(5000.0),
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        };
        assert_eq!(draft.validate().unwrap_err().field(), Some("end_date"));
    }

    #[test]
    fn test_valid_drafts_pass() {
        let task = TaskDraft {
            title: "Prepare pitch".to_string(),
            priority: Some("high".to_string()),
            ..Default::default()
        };
        assert!(task.validate().is_ok());

        let doc = MarketingDocumentDraft {
            title: "Brochure".to_string(),
            category: None,
            file_url: "https://cdn.agency.test/brochure.pdf".to_string(),
        };
        assert!(doc.validate().is_ok());

        let employee = EmployeeDraft {
            name: "Ana".to_string(),
            email: "ana@agency.test".to_string(),
            password: Some("short".to_string()),
            ..Default::default()
        };
        assert_eq!(employee.validate().unwrap_err().field(), Some("password"));
    }
}
