//! Route definitions for the library management API.
//!
//! Everything mounts under `/api` with Django-style trailing slashes. The
//! handful of auth endpoints that must work before a session exists skip
//! the CSRF layer; every other route sits behind it.

use axum::routing::{delete, get, patch, post, put};
use axum::Router;

use axum::middleware;

use crate::database::AppState;
use crate::handler::{
    analytics, auth, catalog, extensions, fines, issues, notifications, reports, reservations,
    reviews, settings, suggestions, users,
};
use crate::middleware::csrf_middleware;

/// Creates and configures the Axum application router.
pub fn create_app(state: AppState) -> Router {
    // Pre-session endpoints: no CSRF check, mirroring csrf_exempt views
    let public_routes = Router::new()
        .route("/auth/login/", post(auth::login))
        .route("/auth/register/", post(auth::register))
        .route("/auth/csrf_token/", get(auth::csrf_token))
        .route(
            "/auth/request_password_reset/",
            post(auth::request_password_reset),
        )
        .route(
            "/auth/reset_password_confirm/",
            post(auth::reset_password_confirm),
        );

    let protected_routes = Router::new()
        .route("/auth/logout/", post(auth::logout))
        .route("/auth/me/", get(auth::me))
        // Catalog
        .route("/books/", get(catalog::list_books).post(catalog::create_book))
        .route(
            "/books/{id}/",
            get(catalog::get_book)
                .put(catalog::update_book)
                .delete(catalog::delete_book),
        )
        .route(
            "/authors/",
            get(catalog::list_authors).post(catalog::create_author),
        )
        .route(
            "/categories/",
            get(catalog::list_categories).post(catalog::create_category),
        )
        // Issues
        .route("/issues/", get(issues::list_issues).post(issues::create_issue))
        .route("/issues/{id}/approve/", post(issues::approve_issue))
        .route("/issues/{id}/reject/", post(issues::reject_issue))
        .route("/issues/{id}/return_book/", post(issues::return_book))
        // Reservations
        .route(
            "/reservations/",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route("/reservations/{id}/", delete(reservations::cancel_reservation))
        // Due-date extensions
        .route(
            "/return_extensions/",
            get(extensions::list_extensions).post(extensions::create_extension),
        )
        .route(
            "/return_extensions/{id}/approve/",
            post(extensions::approve_extension),
        )
        .route(
            "/return_extensions/{id}/reject/",
            post(extensions::reject_extension),
        )
        // Fines and payments
        .route("/fines/", get(fines::list_fines))
        .route(
            "/fine_payments/",
            get(fines::list_payments).post(fines::create_payment),
        )
        // Reviews
        .route("/reviews/", get(reviews::list_reviews).post(reviews::create_review))
        .route("/reviews/{id}/", patch(reviews::patch_review))
        // Suggestions
        .route(
            "/suggestions/",
            get(suggestions::list_suggestions).post(suggestions::create_suggestion),
        )
        .route(
            "/suggestions/{id}/",
            put(suggestions::update_suggestion)
                .patch(suggestions::patch_suggestion)
                .delete(suggestions::delete_suggestion),
        )
        // Notifications
        .route("/notifications/", get(notifications::list_notifications))
        .route("/notifications/{id}/mark_read/", post(notifications::mark_read))
        .route(
            "/notifications/mark_all_read/",
            post(notifications::mark_all_read),
        )
        .route("/notifications/unread_count/", get(notifications::unread_count))
        // User management
        .route("/users/", get(users::list_users))
        .route(
            "/users/{id}/",
            patch(users::patch_user).delete(users::delete_user),
        )
        .route("/users/change_password/", post(users::change_password))
        .route("/users/{id}/toggle_activation/", post(users::toggle_activation))
        .route("/users/register_admin/", post(users::register_admin))
        // Settings
        .route("/settings/", get(settings::list_settings))
        .route("/settings/{id}/", patch(settings::patch_setting))
        // Reports
        .route("/reports/issued/csv/", get(reports::issued_csv))
        .route("/reports/overdue/csv/", get(reports::overdue_csv))
        .route("/reports/fines/csv/", get(reports::fines_csv))
        .route("/reports/suggestions/csv/", get(reports::suggestions_csv))
        .route("/reports/issued/pdf/", get(reports::issued_pdf))
        .route("/reports/suggestions/pdf/", get(reports::suggestions_pdf))
        // Analytics
        .route("/analytics/dashboard/stats/", get(analytics::dashboard_stats))
        .route(
            "/analytics/dashboard/system_activity/",
            get(analytics::system_activity),
        )
        .route("/analytics/audit_logs/", get(analytics::audit_logs))
        .layer(middleware::from_fn(csrf_middleware));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .with_state(state)
}
