// --- File: crates/slotkeeper_gcal/src/gateway.rs ---
//! Google Calendar implementation of [`CalendarGateway`].
//!
//! Requests are built with `reqwest` and sent through a shared
//! [`HttpTransport`] (normally a [`RetryTransport`](slotkeeper_common::RetryTransport)),
//! so every Calendar call gets the same retry and cancellation behaviour.
//! The Calendar v3 JSON shapes come from `google_calendar3::api`.
//!
//! Appointments are stored as ordinary events. Customer and service details
//! ride along in the event's private extended properties so that
//! [`CalendarGateway::list_upcoming`] can rebuild them for the reminder scan.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use google_calendar3::api::{
    Event, EventDateTime, EventExtendedProperties, Events, FreeBusyRequest, FreeBusyRequestItem,
    FreeBusyResponse,
};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use slotkeeper_common::models::{
    Appointment, AppointmentStatus, BusyInterval, Customer, Service,
};
use slotkeeper_common::{CalendarGateway, GatewayError, HttpTransport};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::TokenProvider;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

// Private extended property keys.
pub(crate) const PROP_CUSTOMER_ID: &str = "customer_id";
pub(crate) const PROP_CUSTOMER_NAME: &str = "customer_name";
pub(crate) const PROP_SERVICE_ID: &str = "service_id";
pub(crate) const PROP_SERVICE_NAME: &str = "service_name";
pub(crate) const PROP_SERVICE_PRICE: &str = "service_price";
pub(crate) const PROP_SERVICE_CURRENCY: &str = "service_currency";

pub struct GoogleCalendarGateway {
    transport: Arc<dyn HttpTransport>,
    client: Client,
    tokens: Arc<dyn TokenProvider>,
    base_url: Url,
    calendar_id: String,
}

impl GoogleCalendarGateway {
    /// `client` only builds requests; they are sent through `transport`.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        client: Client,
        tokens: Arc<dyn TokenProvider>,
        calendar_id: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            transport,
            client,
            tokens,
            base_url: parse_base_url(DEFAULT_BASE_URL)?,
            calendar_id: calendar_id.into(),
        })
    }

    /// Point the gateway at another Calendar v3 compatible endpoint.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, GatewayError> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::Decode(format!("base url {} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&impl serde::Serialize>,
        query: &[(&str, String)],
        cancel: &CancellationToken,
    ) -> Result<Response, GatewayError> {
        let token = self.tokens.bearer_token().await?;
        let mut builder = self
            .client
            .request(method, url)
            .bearer_auth(token)
            .query(query);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let request = builder.build().map_err(GatewayError::Transport)?;
        Ok(self.transport.send(request, cancel).await?)
    }

    async fn list_events_page(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        page_token: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Events, GatewayError> {
        let url = self.endpoint(&["calendars", &self.calendar_id, "events"])?;
        let mut query = vec![
            ("timeMin", time_min.to_rfc3339()),
            ("timeMax", time_max.to_rfc3339()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        let response = self
            .send(Method::GET, url, None::<&()>, &query, cancel)
            .await?;
        decode(check_status(response, &self.calendar_id).await?).await
    }
}

fn parse_base_url(raw: &str) -> Result<Url, GatewayError> {
    Url::parse(raw).map_err(|e| GatewayError::Decode(format!("invalid base url {}: {}", raw, e)))
}

/// Maps non-success statuses onto [`GatewayError`]; 404 and 410 mean the entry is gone.
async fn check_status(response: Response, subject: &str) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => Err(GatewayError::NotFound(subject.to_string())),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GatewayError::Auth(format!(
            "{}: {}",
            status.as_u16(),
            message
        ))),
        _ => Err(GatewayError::Status {
            status: status.as_u16(),
            message,
        }),
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let bytes = response.bytes().await.map_err(GatewayError::Transport)?;
    serde_json::from_slice(&bytes).map_err(|e| GatewayError::Decode(e.to_string()))
}

/// The Calendar event written for a new appointment.
pub(crate) fn appointment_to_event(appointment: &Appointment) -> Event {
    let mut private = HashMap::new();
    private.insert(PROP_CUSTOMER_ID.to_string(), appointment.customer.id.clone());
    private.insert(
        PROP_CUSTOMER_NAME.to_string(),
        appointment.customer.display_name.clone(),
    );
    private.insert(PROP_SERVICE_ID.to_string(), appointment.service.id.clone());
    private.insert(PROP_SERVICE_NAME.to_string(), appointment.service.name.clone());
    private.insert(
        PROP_SERVICE_PRICE.to_string(),
        appointment.service.price.to_string(),
    );
    if let Some(currency) = &appointment.service.currency {
        private.insert(PROP_SERVICE_CURRENCY.to_string(), currency.clone());
    }

    Event {
        summary: Some(format!(
            "{}: {}",
            appointment.service.name, appointment.customer.display_name
        )),
        description: if appointment.notes.is_empty() {
            None
        } else {
            Some(appointment.notes.clone())
        },
        start: Some(EventDateTime {
            date_time: Some(appointment.start),
            time_zone: Some("UTC".to_string()),
            ..Default::default()
        }),
        end: Some(EventDateTime {
            date_time: Some(appointment.end),
            time_zone: Some("UTC".to_string()),
            ..Default::default()
        }),
        extended_properties: Some(EventExtendedProperties {
            private: Some(private),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Rebuild an appointment from a Calendar event.
///
/// Returns `None` for events this system did not create (no service metadata)
/// and for all-day events, which have no instant start.
pub(crate) fn event_to_appointment(event: &Event) -> Option<Appointment> {
    let id = event.id.clone()?;
    let start = event.start.as_ref()?.date_time?;
    let end = event.end.as_ref()?.date_time?;
    let private = event.extended_properties.as_ref()?.private.as_ref()?;
    let prop = |key: &str| private.get(key).cloned();

    let service = Service {
        id: prop(PROP_SERVICE_ID)?,
        name: prop(PROP_SERVICE_NAME).unwrap_or_default(),
        duration_minutes: (end - start).num_minutes(),
        price: prop(PROP_SERVICE_PRICE)
            .and_then(|p| p.parse().ok())
            .unwrap_or_default(),
        currency: prop(PROP_SERVICE_CURRENCY),
    };
    let customer = Customer {
        id: prop(PROP_CUSTOMER_ID)?,
        display_name: prop(PROP_CUSTOMER_NAME).unwrap_or_default(),
    };
    let status = match event.status.as_deref() {
        Some("cancelled") => AppointmentStatus::Cancelled,
        _ => AppointmentStatus::Confirmed,
    };

    Some(Appointment {
        id: Some(id),
        service,
        start,
        end,
        customer,
        notes: event.description.clone().unwrap_or_default(),
        status,
    })
}

#[async_trait]
impl CalendarGateway for GoogleCalendarGateway {
    async fn create(
        &self,
        appointment: &Appointment,
        cancel: &CancellationToken,
    ) -> Result<Appointment, GatewayError> {
        let url = self.endpoint(&["calendars", &self.calendar_id, "events"])?;
        let event = appointment_to_event(appointment);
        let response = self
            .send(Method::POST, url, Some(&event), &[], cancel)
            .await?;
        let created: Event = decode(check_status(response, &self.calendar_id).await?).await?;

        let id = created
            .id
            .ok_or_else(|| GatewayError::Decode("created event has no id".to_string()))?;
        info!(event_id = %id, start = %appointment.start, "calendar event created");

        let mut stored = appointment.clone();
        stored.id = Some(id);
        Ok(stored)
    }

    async fn delete(
        &self,
        appointment_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), GatewayError> {
        let url = self.endpoint(&["calendars", &self.calendar_id, "events", appointment_id])?;
        let response = self
            .send(Method::DELETE, url, None::<&()>, &[], cancel)
            .await?;
        check_status(response, appointment_id).await?;
        info!(event_id = %appointment_id, "calendar event deleted");
        Ok(())
    }

    async fn list_busy(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<BusyInterval>, GatewayError> {
        let url = self.endpoint(&["freeBusy"])?;
        let request = FreeBusyRequest {
            time_min: Some(time_min),
            time_max: Some(time_max),
            time_zone: Some("UTC".to_string()),
            items: Some(vec![FreeBusyRequestItem {
                id: Some(self.calendar_id.clone()),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let response = self
            .send(Method::POST, url, Some(&request), &[], cancel)
            .await?;
        let body: FreeBusyResponse = decode(check_status(response, &self.calendar_id).await?).await?;

        let calendar = body
            .calendars
            .and_then(|mut calendars| calendars.remove(&self.calendar_id))
            .ok_or_else(|| {
                GatewayError::Decode(format!("freeBusy response lacks {}", self.calendar_id))
            })?;
        if let Some(errors) = calendar.errors.filter(|e| !e.is_empty()) {
            let reasons: Vec<String> = errors.into_iter().filter_map(|e| e.reason).collect();
            if reasons.iter().any(|r| r == "notFound") {
                return Err(GatewayError::NotFound(self.calendar_id.clone()));
            }
            return Err(GatewayError::Status {
                status: 200,
                message: format!("freeBusy errors: {}", reasons.join(", ")),
            });
        }

        let mut busy = Vec::new();
        for period in calendar.busy.unwrap_or_default() {
            match (period.start, period.end) {
                (Some(start), Some(end)) => busy.push(BusyInterval::new(start, end)),
                _ => warn!("Skipping busy period with missing start/end: {:?}", period),
            }
        }
        busy.sort_by_key(|b| b.start);
        debug!(count = busy.len(), %time_min, %time_max, "busy intervals fetched");
        Ok(busy)
    }

    async fn find(
        &self,
        appointment_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Appointment>, GatewayError> {
        let url = self.endpoint(&["calendars", &self.calendar_id, "events", appointment_id])?;
        let response = self
            .send(Method::GET, url, None::<&()>, &[], cancel)
            .await?;
        let event: Event = match check_status(response, appointment_id).await {
            Ok(response) => decode(response).await?,
            Err(GatewayError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let found = event_to_appointment(&event);
        if found.is_none() {
            debug!(event_id = %appointment_id, "event exists but is not an appointment");
        }
        Ok(found)
    }

    async fn list_upcoming(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Appointment>, GatewayError> {
        let mut appointments = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self
                .list_events_page(time_min, time_max, page_token.as_deref(), cancel)
                .await?;
            for event in page.items.unwrap_or_default() {
                match event_to_appointment(&event) {
                    Some(appointment) => appointments.push(appointment),
                    None => debug!(event_id = ?event.id, "ignoring foreign calendar event"),
                }
            }
            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }
        appointments.sort_by_key(|a| a.start);
        Ok(appointments)
    }
}
