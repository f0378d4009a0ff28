//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{fines, health, loans, reservations, sweep};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Calliope API",
        version = "1.0.0",
        description = "Library Circulation REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html"),
        contact(name = "Calliope Team", email = "contact@calliope.org")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Loans
        loans::get_user_loans,
        loans::get_loan,
        loans::create_loan,
        loans::renew_loan,
        loans::return_loan,
        // Reservations
        reservations::create_reservation,
        reservations::cancel_reservation,
        // Fines & payments
        fines::get_user_fines,
        fines::pay_fine,
        fines::confirm_payment,
        // Sweep
        sweep::trigger_sweep,
    ),
    components(
        schemas(
            // Loans
            loans::CreateLoanRequest,
            loans::RenewLoanRequest,
            loans::LoanResponse,
            loans::ReturnResponse,
            crate::models::loan::LoanDetails,
            crate::models::enums::LoanStatus,
            // Copies
            crate::models::copy::BookCopy,
            crate::models::enums::CopyStatus,
            // Reservations
            reservations::CreateReservationRequest,
            reservations::CancelReservationRequest,
            crate::models::reservation::Reservation,
            crate::models::enums::ReservationStatus,
            // Fines & payments
            fines::PayFineRequest,
            fines::ConfirmPaymentRequest,
            crate::models::fine::Fine,
            crate::models::fine::Payment,
            crate::models::enums::FineReason,
            crate::models::enums::PaymentStatus,
            // Sweep
            crate::services::sweeper::SweepReport,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "loans", description = "Loan management"),
        (name = "reservations", description = "Reservation queue"),
        (name = "fines", description = "Fines and payments"),
        (name = "sweep", description = "Overdue sweeper")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
