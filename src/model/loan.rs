use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanPurpose {
    House,
    Car,
    Credit,
    Other,
}

impl LoanPurpose {
    pub fn as_str(&self) -> &str {
        match self {
            LoanPurpose::House => "house",
            LoanPurpose::Car => "car",
            LoanPurpose::Credit => "credit",
            LoanPurpose::Other => "other",
        }
    }
}

/// pending -> processing (supervisor ok, amount over threshold) -> approved/rejected
/// pending -> approved/rejected (supervisor final below threshold)
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Processing,
    Approved,
    Rejected,
}

impl LoanStatus {
    pub fn as_str(&self) -> &str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Processing => "processing",
            LoanStatus::Approved => "approved",
            LoanStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub fn as_str(&self) -> &str {
        match self {
            ReviewDecision::Approved => "approved",
            ReviewDecision::Rejected => "rejected",
        }
    }
}

/// Where supervisor approval moves a pending application.
pub fn after_supervisor_review(
    decision: ReviewDecision,
    amount: i64,
    manager_threshold: i64,
) -> LoanStatus {
    match decision {
        ReviewDecision::Rejected => LoanStatus::Rejected,
        ReviewDecision::Approved if amount >= manager_threshold => LoanStatus::Processing,
        ReviewDecision::Approved => LoanStatus::Approved,
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanApplication {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "L202608001")]
    pub application_no: String,
    #[schema(example = "lin.wei")]
    pub account: String,
    #[schema(example = "LD")]
    pub department: String,
    #[schema(example = "Chang Mei")]
    pub customer_name: String,
    #[schema(example = "A123456789")]
    pub customer_id_number: String,
    #[schema(example = "0912345678")]
    pub customer_phone: String,
    #[schema(example = "chang.mei@mail.example")]
    pub customer_email: String,
    #[schema(example = "No. 7, Sec. 2, Rd.")]
    pub customer_address: String,
    #[schema(example = "house")]
    pub purpose: String,
    #[schema(example = 6000000)]
    pub amount: i64,
    #[schema(example = 36)]
    pub term_months: i32,
    #[schema(example = 52000)]
    pub monthly_income: i64,
    #[schema(example = "pending")]
    pub status: String,
    #[schema(example = "2026-08-20T10:00:00Z", value_type = String, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanReview {
    #[schema(example = 1)]
    pub loan_id: u64,
    #[schema(example = "chen.yu")]
    pub reviewer_account: String,
    #[schema(example = "Chen Yu")]
    pub reviewer_name: String,
    #[schema(example = "S")]
    pub reviewer_position: String,
    #[schema(example = "approved")]
    pub status: String,
    #[schema(example = "income verified", nullable = true)]
    pub comment: Option<String>,
    #[schema(example = "2026-08-21T10:00:00Z", value_type = String, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: i64 = 5_000_000;

    #[test]
    fn rejection_is_final_at_any_amount() {
        assert_eq!(
            after_supervisor_review(ReviewDecision::Rejected, 10_000, THRESHOLD),
            LoanStatus::Rejected
        );
        assert_eq!(
            after_supervisor_review(ReviewDecision::Rejected, 9_000_000, THRESHOLD),
            LoanStatus::Rejected
        );
    }

    #[test]
    fn small_loans_are_approved_by_supervisor_alone() {
        assert_eq!(
            after_supervisor_review(ReviewDecision::Approved, 4_999_999, THRESHOLD),
            LoanStatus::Approved
        );
    }

    #[test]
    fn large_loans_escalate_to_manager() {
        assert_eq!(
            after_supervisor_review(ReviewDecision::Approved, THRESHOLD, THRESHOLD),
            LoanStatus::Processing
        );
        assert_eq!(
            after_supervisor_review(ReviewDecision::Approved, 8_000_000, THRESHOLD),
            LoanStatus::Processing
        );
    }
}
