use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub department: Department,
    pub role: Role,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Supervisor,
    Coordinator,
    Collaborator,
}

// Single unified taxonomy. Unknown department names are an error at the
// store boundary, never mapped to a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Department {
    Operations,
    Sales,
    Finance,
    HumanResources,
    Technology,
    CustomerService,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Pending,
    Active,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingEvent {
    pub id: String,
    pub month_label: String,
    pub status: EventStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub questions: Vec<String>,
    pub winner_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nomination {
    pub id: String,
    pub event_id: String,
    pub collaborator_id: String,
    pub nominated_by_id: String,
    pub nomination_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: String,
    pub event_id: String,
    pub voter_id: String,
    pub voted_for: Vec<String>,
    pub vote_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyEvaluation {
    pub id: String,
    pub event_id: String,
    pub evaluator_id: String,
    pub evaluated_user_id: String,
    pub scores: Vec<u8>,
}

impl VotingEvent {
    pub fn new(
        month_label: String,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        questions: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            month_label,
            status: EventStatus::Pending,
            start_date: Some(start_date),
            end_date: Some(end_date),
            questions,
            winner_id: None,
            created_at: Utc::now(),
        }
    }
}

impl Nomination {
    pub fn new(event_id: String, collaborator_id: String, nominated_by_id: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_id,
            collaborator_id,
            nominated_by_id,
            nomination_date: Utc::now(),
        }
    }
}

impl Vote {
    pub fn new(event_id: String, voter_id: String, voted_for: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_id,
            voter_id,
            voted_for,
            vote_date: Utc::now(),
        }
    }
}

impl SurveyEvaluation {
    pub fn new(
        event_id: String,
        evaluator_id: String,
        evaluated_user_id: String,
        scores: Vec<u8>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_id,
            evaluator_id,
            evaluated_user_id,
            scores,
        }
    }
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Active => "active",
            EventStatus::Closed => "closed",
        }
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Supervisor => "supervisor",
            Role::Coordinator => "coordinator",
            Role::Collaborator => "collaborator",
        }
    }
}

impl Department {
    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Operations => "operations",
            Department::Sales => "sales",
            Department::Finance => "finance",
            Department::HumanResources => "human_resources",
            Department::Technology => "technology",
            Department::CustomerService => "customer_service",
        }
    }
}
