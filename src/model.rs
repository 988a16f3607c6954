//! Data models for the library management service
//!
//! This module defines the stored entity records, their status enums, and
//! the request/response shapes used by the API handlers. Every entity is
//! stored as a JSON-serialized record in redb, keyed by its numeric id.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// Roles & statuses
// Status values are uppercase string tags on the wire, e.g. "REQUESTED".

/// Account role. Capabilities form a strict superset chain:
/// OWNER >= ADMIN >= STUDENT.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Student,
    Admin,
    Owner,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueStatus {
    Requested,
    Issued,
    Returned,
    Rejected,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReservationStatus {
    Active,
    Completed,
    Cancelled,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExtensionStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Hidden,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SuggestionStatus {
    Pending,
    Approved,
    Rejected,
    Added,
}

// Stored records

/// Account record. `password_hash` never leaves the database layer;
/// responses use [`UserOut`].
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub roll_number: Option<String>,
    /// Profile picture URL. Stored as-is; no upload handling here.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Deactivated accounts cannot log in or hold a session.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Owner)
    }

    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Author {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub bio: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Catalog entry. Invariant: `0 <= available_count <= quantity`.
/// `available_count` moves only when an issue transitions to ISSUED
/// (decrement) or RETURNED (increment).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Book {
    pub id: u64,
    pub isbn: String,
    pub title: String,
    pub author_id: u64,
    pub category_id: Option<u64>,
    pub quantity: u32,
    pub available_count: u32,
    #[serde(default)]
    pub description: String,
    pub published_year: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    pub fn is_available(&self) -> bool {
        self.available_count > 0
    }
}

/// A borrow transaction. Lifecycle:
/// REQUESTED -> ISSUED | REJECTED, ISSUED -> RETURNED.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Issue {
    pub id: u64,
    pub book_id: u64,
    pub user_id: u64,
    pub status: IssueStatus,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == IssueStatus::Issued
            && self.due_date.map(|due| today > due).unwrap_or(false)
    }
}

/// Queue placeholder for a book that is fully checked out.
/// ACTIVE -> COMPLETED is driven externally when stock frees up; this
/// service only ever performs ACTIVE -> CANCELLED.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Reservation {
    pub id: u64,
    pub book_id: u64,
    pub user_id: u64,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

/// Request to push back an issue's due date. `days_requested` is bounded
/// to [1, 14] server-side regardless of client input constraints.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExtensionRequest {
    pub id: u64,
    pub issue_id: u64,
    pub user_id: u64,
    pub days_requested: u32,
    pub reason: String,
    pub status: ExtensionStatus,
    pub processed_by: Option<u64>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Monetary penalty for a late return. One fine per issue; the amount is
/// computed server-side as days late x the `fine_per_day` setting.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Fine {
    pub id: u64,
    pub issue_id: u64,
    pub amount: Decimal,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FinePayment {
    pub id: u64,
    pub fine_id: u64,
    pub user_id: u64,
    pub amount: Decimal,
    pub mode: String,
    pub reference: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// At most one review per (user, book) pair; a second attempt is a
/// conflict, never an overwrite.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Review {
    pub id: u64,
    pub book_id: u64,
    pub user_id: u64,
    pub rating: u8,
    #[serde(default)]
    pub text: String,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Suggestion {
    pub id: u64,
    pub title: String,
    pub author: String,
    pub category: String,
    pub reason: String,
    pub status: SuggestionStatus,
    #[serde(default)]
    pub admin_note: String,
    pub created_by: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub user_id: u64,
    pub message: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub target_url: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// System constant, stored as a string and interpreted per `value_type`
/// (one of "int", "float", "str").
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Setting {
    pub id: u64,
    pub key: String,
    pub value: String,
    pub value_type: String,
    pub updated_at: DateTime<Utc>,
}

/// Append-only audit trail row, readable by owners only.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuditLogEntry {
    pub id: u64,
    pub action: String,
    pub username: String,
    pub details: String,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Server side of a session cookie: the opaque token maps to this record.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionRecord {
    pub user_id: u64,
    pub created_at: DateTime<Utc>,
}

/// Single-use password reset token with a 24h expiry.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ResetTokenRecord {
    pub user_id: u64,
    pub expires_at: DateTime<Utc>,
}

// Request payloads

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username, or an email address (detected by '@').
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub roll_number: Option<String>,
}

#[derive(Deserialize)]
pub struct RegisterAdminRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    /// Target user; omitted or equal to the caller means self-change,
    /// which requires `current_password`.
    pub user_id: Option<u64>,
    pub current_password: Option<String>,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct PasswordResetConfirm {
    pub uid: String,
    pub token: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct BookPayload {
    pub isbn: String,
    pub title: String,
    pub author_id: u64,
    pub category_id: Option<u64>,
    pub quantity: u32,
    #[serde(default)]
    pub description: String,
    pub published_year: Option<u32>,
}

#[derive(Deserialize)]
pub struct AuthorPayload {
    pub name: String,
    #[serde(default)]
    pub bio: String,
}

#[derive(Deserialize)]
pub struct CategoryPayload {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateIssueRequest {
    pub book_id: u64,
}

#[derive(Deserialize)]
pub struct CreateReservationRequest {
    pub book_id: u64,
}

#[derive(Deserialize)]
pub struct CreateExtensionRequest {
    pub issue_id: u64,
    pub days_requested: u32,
    pub reason: String,
}

#[derive(Deserialize)]
pub struct CreatePaymentRequest {
    pub fine_id: u64,
    pub card_number: String,
    pub cvv: String,
    pub expiry: Option<String>,
    pub mode: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateReviewRequest {
    pub book_id: u64,
    pub rating: u8,
    #[serde(default)]
    pub text: String,
}

#[derive(Deserialize)]
pub struct PatchReviewRequest {
    pub status: Option<ReviewStatus>,
    pub rating: Option<u8>,
    pub text: Option<String>,
}

#[derive(Deserialize)]
pub struct SuggestionPayload {
    pub title: String,
    pub author: String,
    pub category: String,
    pub reason: String,
}

#[derive(Deserialize)]
pub struct PatchSuggestionRequest {
    pub status: Option<SuggestionStatus>,
    pub admin_note: Option<String>,
}

#[derive(Deserialize)]
pub struct PatchUserRequest {
    pub role: Option<Role>,
    pub email: Option<String>,
    pub roll_number: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Deserialize)]
pub struct PatchSettingRequest {
    pub value: String,
}

/// Query parameters for the paginated book list.
#[derive(Deserialize)]
pub struct BookListParams {
    pub search: Option<String>,
    /// Page number, starts from 1.
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Deserialize)]
pub struct ReviewListParams {
    /// Optional book id filter.
    pub book: Option<u64>,
}

// Response shapes

/// DRF-style page envelope returned by the book list endpoint. Every
/// other list endpoint returns a bare array; clients handle both.
#[derive(Serialize)]
pub struct Page<T> {
    pub count: usize,
    pub next: Option<usize>,
    pub previous: Option<usize>,
    pub results: Vec<T>,
}

#[derive(Serialize)]
pub struct UserOut {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub roll_number: Option<String>,
    pub avatar: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserOut {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            roll_number: user.roll_number.clone(),
            avatar: user.avatar.clone(),
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct BookOut {
    pub id: u64,
    pub isbn: String,
    pub title: String,
    pub author_id: u64,
    pub author_name: String,
    pub category_id: Option<u64>,
    pub category_name: Option<String>,
    pub quantity: u32,
    pub available_count: u32,
    pub is_available: bool,
    pub description: String,
    pub published_year: Option<u32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct IssueOut {
    pub id: u64,
    pub book_id: u64,
    pub book_title: String,
    pub user_id: u64,
    pub username: String,
    pub status: IssueStatus,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub is_overdue: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ReservationOut {
    pub id: u64,
    pub book_id: u64,
    pub book_title: String,
    pub user_id: u64,
    pub username: String,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ExtensionOut {
    pub id: u64,
    pub issue_id: u64,
    pub book_title: String,
    pub user_id: u64,
    pub username: String,
    pub days_requested: u32,
    pub reason: String,
    pub status: ExtensionStatus,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct FineOut {
    pub id: u64,
    pub issue_id: u64,
    pub book_title: String,
    pub username: String,
    pub amount: Decimal,
    pub paid: bool,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ReviewOut {
    pub id: u64,
    pub book_id: u64,
    pub book_title: String,
    pub user_id: u64,
    pub username: String,
    pub rating: u8,
    pub text: String,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct SuggestionOut {
    pub id: u64,
    pub title: String,
    pub author: String,
    pub category: String,
    pub reason: String,
    pub status: SuggestionStatus,
    pub admin_note: String,
    pub created_by: u64,
    pub created_by_username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct NotificationOut {
    pub id: u64,
    pub message: String,
    pub category: String,
    pub target_url: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Notification> for NotificationOut {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id,
            message: n.message.clone(),
            category: n.category.clone(),
            target_url: n.target_url.clone(),
            is_read: n.is_read(),
            created_at: n.created_at,
        }
    }
}
