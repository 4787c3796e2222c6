//! Bearer-authenticated REST resources

pub mod client;
pub mod entities;

pub use client::{ListQuery, Page, ResourceClient};
pub use entities::{
    Client, ClientDraft, Contract, ContractDraft, Draft, Employee, EmployeeDraft,
    MarketingDocument, MarketingDocumentDraft, Meeting, MeetingDraft, Quotation, QuotationDraft,
    RecordId, Resource, Task, TaskDraft,
};
