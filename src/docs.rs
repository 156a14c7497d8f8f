use crate::api::leave::{
    AnnualRemaining, CreateLeave, LeaveFilter, LeaveListResponse, LeaveWithApprovals, ReviewLeave,
};
use crate::api::loan::{
    CreateLoan, CustomerInfo, LoanEntry, LoanFilter, LoanInfo, LoanListResponse, LoanStats,
    LoanWithEmployee, PageQuery, ReviewRequest,
};
use crate::api::new_employee::{
    ApproveNewEmployee, NewEmployeeDraft, NewEmployeeFilter, NewEmployeeListResponse,
    NewEmployeeWithSubmitter, SubmitNewEmployees,
};
use crate::api::user::{UserListResponse, UserQuery};
use crate::model::codes::{Department, Position};
use crate::model::leave::{Leave, LeaveApproval, LeaveType};
use crate::model::loan::{LoanApplication, LoanPurpose, LoanReview, LoanStatus, ReviewDecision};
use crate::model::new_employee::{NewEmployee, NewEmployeeApproval};
use crate::model::user::User;
use crate::models::{LoginReqDto, RegisterReq};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bank Operations API",
        version = "1.0.0",
        description = r#"
## Internal Bank Operations System

This API powers an internal employee/HR and loan-approval system for a bank
with three departments (BD business, FD finance, LD lending) and three
position tiers (M manager, S supervisor, C clerk).

### 🔹 Key Features
- **Accounts**
  - Register, login with lockout protection, token refresh, staff directory
- **Leave Management**
  - Apply for leave, supervisor approval, annual-leave balance tracking
- **Loan Review**
  - Lending clerks submit applications, supervisors review, managers give
    final approval above the amount threshold
- **Onboarding**
  - Supervisors submit new-employee batches, managers approve

### 🔐 Security
Most endpoints are protected using **JWT Bearer authentication**.
Authorization is keyed on department and position codes carried in the token.

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::user::list_users,
        crate::api::user::delete_user,

        crate::api::leave::create_leave,
        crate::api::leave::leave_list,
        crate::api::leave::annual_remaining,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,
        crate::api::leave::cancel_leave,

        crate::api::loan::create_loan,
        crate::api::loan::loan_list,
        crate::api::loan::supervisor_review,
        crate::api::loan::manager_review,
        crate::api::loan::review_history,
        crate::api::loan::loan_stats,

        crate::api::new_employee::submit,
        crate::api::new_employee::list,
        crate::api::new_employee::pending,
        crate::api::new_employee::approve
    ),
    components(
        schemas(
            Department,
            Position,
            RegisterReq,
            LoginReqDto,
            User,
            UserQuery,
            UserListResponse,
            LeaveType,
            Leave,
            LeaveApproval,
            CreateLeave,
            LeaveFilter,
            LeaveWithApprovals,
            LeaveListResponse,
            ReviewLeave,
            AnnualRemaining,
            LoanPurpose,
            LoanStatus,
            ReviewDecision,
            LoanApplication,
            LoanReview,
            CustomerInfo,
            LoanInfo,
            CreateLoan,
            LoanFilter,
            PageQuery,
            ReviewRequest,
            LoanWithEmployee,
            LoanEntry,
            LoanListResponse,
            LoanStats,
            NewEmployee,
            NewEmployeeApproval,
            NewEmployeeDraft,
            SubmitNewEmployees,
            NewEmployeeFilter,
            NewEmployeeWithSubmitter,
            NewEmployeeListResponse,
            ApproveNewEmployee
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login and token APIs"),
        (name = "Users", description = "Staff directory APIs"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Loan", description = "Loan application and review APIs"),
        (name = "NewEmployees", description = "New employee onboarding APIs"),
    )
)]
pub struct ApiDoc;
