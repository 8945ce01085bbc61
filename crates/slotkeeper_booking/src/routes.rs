// --- File: crates/slotkeeper_booking/src/routes.rs ---

use crate::handlers::{
    book_handler, cancel_handler, confirm_handler, get_availability_handler,
    list_services_handler, reminder_callback_handler, BookingState,
};
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

/// Creates a router containing all booking routes.
pub fn routes(state: Arc<BookingState>) -> Router {
    Router::new()
        .route("/services", get(list_services_handler))
        .route("/availability", get(get_availability_handler))
        .route("/book", post(book_handler))
        .route("/appointments/{id}", delete(cancel_handler))
        .route("/appointments/{id}/confirm", post(confirm_handler))
        .route("/reminders/callback", post(reminder_callback_handler))
        .with_state(state)
}
