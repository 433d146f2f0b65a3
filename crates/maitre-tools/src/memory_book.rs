//! In-memory reservation book
//!
//! A self-contained [`ToolExecutor`] used by the CLI and by tests. Every
//! table is interchangeable; a slot is free while fewer than `tables`
//! active reservations overlap it.

use crate::envelope::ToolEnvelope;
use crate::executor::{ToolContext, ToolExecutor};
use crate::registry::BookingTool;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use maitre_common::{
    GuestHistory, ReservationStatus, ReservationSummary, RestaurantConfig, format_time,
    minutes_between, parse_time, today_in_timezone,
};
use maitre_llm::ToolCall;
use serde_json::{Value, json};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Step between candidate slots when searching alternatives
const SLOT_STEP_MINUTES: i64 = 15;
/// How far from the preferred time alternatives are searched
const SEARCH_WINDOW_MINUTES: i64 = 180;

#[derive(Debug, Default)]
struct BookState {
    reservations: Vec<ReservationSummary>,
    next_id: i64,
}

pub struct InMemoryReservationBook {
    restaurant: RestaurantConfig,
    tables: usize,
    state: RwLock<BookState>,
    guests: RwLock<HashMap<String, GuestHistory>>,
}

impl InMemoryReservationBook {
    pub fn new(restaurant: RestaurantConfig, tables: usize) -> Self {
        Self {
            restaurant,
            tables,
            state: RwLock::new(BookState {
                reservations: Vec::new(),
                next_id: 1,
            }),
            guests: RwLock::new(HashMap::new()),
        }
    }

    /// Seed an existing reservation, keeping its id
    pub async fn insert(&self, reservation: ReservationSummary) {
        let mut state = self.state.write().await;
        state.next_id = state.next_id.max(reservation.id + 1);
        state.reservations.push(reservation);
    }

    pub async fn insert_guest_history(&self, history: GuestHistory) {
        self.guests
            .write()
            .await
            .insert(history.guest_phone.clone(), history);
    }

    pub async fn reservation(&self, id: i64) -> Option<ReservationSummary> {
        self.state
            .read()
            .await
            .reservations
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    fn within_hours(&self, time: NaiveTime) -> bool {
        let (Some(open), Some(last)) = (self.restaurant.opening(), self.restaurant.last_bookable_time())
        else {
            return true;
        };
        if self.restaurant.is_overnight() || last < open {
            time >= open || time <= last
        } else {
            time >= open && time <= last
        }
    }

    fn overlapping(
        &self,
        state: &BookState,
        date: &str,
        time: NaiveTime,
        exclude: Option<i64>,
    ) -> usize {
        let duration = self.restaurant.avg_reservation_duration as i64;
        state
            .reservations
            .iter()
            .filter(|r| r.status.is_active() && r.date == date && Some(r.id) != exclude)
            .filter_map(|r| parse_time(&r.time))
            .filter(|t| minutes_between(*t, time) < duration)
            .count()
    }

    fn slot_free(
        &self,
        state: &BookState,
        date: &str,
        time: NaiveTime,
        guests: u32,
        exclude: Option<i64>,
    ) -> bool {
        guests <= self.restaurant.max_guests
            && self.within_hours(time)
            && self.overlapping(state, date, time, exclude) < self.tables
    }

    async fn check_availability(&self, args: &Value) -> ToolEnvelope {
        let (date, time, guests) = match slot_args(args, "time") {
            Ok(slot) => slot,
            Err(envelope) => return envelope,
        };
        let state = self.state.read().await;

        if guests > self.restaurant.max_guests {
            return ToolEnvelope::business_rule(
                format!(
                    "Parties larger than {} guests cannot be booked online",
                    self.restaurant.max_guests
                ),
                "PARTY_TOO_LARGE",
            );
        }
        if !self.within_hours(time) {
            return ToolEnvelope::business_rule(
                format!(
                    "{} is outside booking hours ({} - last seating before {})",
                    format_time(time),
                    self.restaurant.opening_time,
                    self.restaurant.closing_time
                ),
                "OUTSIDE_HOURS",
            );
        }

        if self.slot_free(&state, &date, time, guests, None) {
            ToolEnvelope::success(json!({
                "available": true,
                "date": date,
                "time": format_time(time),
                "guests": guests
            }))
        } else {
            ToolEnvelope::business_rule(
                format!("No table for {} at {} on {}", guests, format_time(time), date),
                "NO_AVAILABILITY",
            )
        }
    }

    async fn find_alternatives(&self, args: &Value) -> ToolEnvelope {
        let (date, preferred, guests) = match slot_args(args, "preferredTime") {
            Ok(slot) => slot,
            Err(envelope) => return envelope,
        };
        let state = self.state.read().await;

        let mut candidates: Vec<(i64, NaiveTime)> = (-SEARCH_WINDOW_MINUTES..=SEARCH_WINDOW_MINUTES)
            .step_by(SLOT_STEP_MINUTES as usize)
            .filter(|offset| *offset != 0)
            .filter_map(|offset| {
                let (time, wrapped) =
                    preferred.overflowing_add_signed(chrono::Duration::minutes(offset));
                (wrapped == 0).then_some((offset.abs(), time))
            })
            .filter(|(_, time)| self.slot_free(&state, &date, *time, guests, None))
            .collect();
        candidates.sort_by_key(|(distance, time)| (*distance, *time));

        let alternatives: Vec<Value> = candidates
            .into_iter()
            .take(8)
            .map(|(_, time)| json!({"date": date, "time": format_time(time), "guests": guests}))
            .collect();

        debug!(count = alternatives.len(), "Found alternative times");
        ToolEnvelope::success(json!({ "alternatives": alternatives }))
    }

    async fn create(&self, args: &Value) -> ToolEnvelope {
        let (date, time, guests) = match slot_args(args, "time") {
            Ok(slot) => slot,
            Err(envelope) => return envelope,
        };
        let Some(name) = args.get("guestName").and_then(Value::as_str).filter(|n| !n.trim().is_empty())
        else {
            return ToolEnvelope::validation_error("Guest name is required", "guestName");
        };
        let Some(phone) = args.get("guestPhone").and_then(Value::as_str).filter(|p| !p.trim().is_empty())
        else {
            return ToolEnvelope::validation_error("Guest phone is required", "guestPhone");
        };

        let mut state = self.state.write().await;
        if !self.slot_free(&state, &date, time, guests, None) {
            return ToolEnvelope::business_rule(
                format!("No table for {} at {} on {}", guests, format_time(time), date),
                "NO_AVAILABILITY",
            );
        }

        let table = self.overlapping(&state, &date, time, None) + 1;
        let id = state.next_id;
        state.next_id += 1;
        let reservation = ReservationSummary {
            id,
            guest_name: name.to_string(),
            guest_phone: Some(phone.to_string()),
            date,
            time: format_time(time),
            guests,
            status: ReservationStatus::Confirmed,
            special_requests: args
                .get("specialRequests")
                .and_then(Value::as_str)
                .map(str::to_string),
            table_name: Some(format!("T{}", table)),
        };
        state.reservations.push(reservation.clone());

        info!(event = "reservation_created", reservation_id = id, "Reservation created");
        ToolEnvelope::success(json!({
            "reservationId": id,
            "reservation": reservation
        }))
    }

    async fn find_existing(&self, args: &Value, ctx: &ToolContext) -> ToolEnvelope {
        let Some(identifier) = args.get("identifier").and_then(Value::as_str) else {
            return ToolEnvelope::validation_error("An identifier is required", "identifier");
        };
        let range = args
            .get("timeRange")
            .and_then(Value::as_str)
            .unwrap_or("upcoming");
        let today = today_in_timezone(&ctx.timezone);
        let needle = identifier.trim().to_lowercase();
        let digits: String = needle.chars().filter(|c| c.is_ascii_digit()).collect();

        let state = self.state.read().await;
        let mut found: Vec<&ReservationSummary> = state
            .reservations
            .iter()
            .filter(|r| {
                r.id.to_string() == needle
                    || r.guest_name.to_lowercase().contains(&needle)
                    || (!digits.is_empty()
                        && r.guest_phone
                            .as_deref()
                            .map(|p| p.chars().filter(|c| c.is_ascii_digit()).collect::<String>() == digits)
                            .unwrap_or(false))
            })
            .filter(|r| {
                let date = NaiveDate::parse_from_str(&r.date, "%Y-%m-%d").ok();
                match range {
                    "past" => date.map(|d| d < today).unwrap_or(false),
                    "all" => true,
                    _ => r.status.is_active() && date.map(|d| d >= today).unwrap_or(false),
                }
            })
            .collect();
        found.sort_by(|a, b| (&a.date, &a.time).cmp(&(&b.date, &b.time)));

        if found.is_empty() {
            return ToolEnvelope::business_rule(
                format!("No {} reservations found for '{}'", range, identifier),
                "NO_RESERVATIONS_FOUND",
            );
        }

        ToolEnvelope::success(json!({
            "reservations": found,
            "count": found.len()
        }))
    }

    async fn modify(&self, args: &Value) -> ToolEnvelope {
        let Some(id) = args.get("reservationId").and_then(Value::as_i64) else {
            return ToolEnvelope::validation_error("reservationId is required", "reservationId");
        };
        let mods = args.get("modifications").cloned().unwrap_or(Value::Null);

        let mut state = self.state.write().await;
        let Some(current) = state.reservations.iter().find(|r| r.id == id).cloned() else {
            return ToolEnvelope::business_rule(
                format!("Reservation #{} not found", id),
                "RESERVATION_NOT_FOUND",
            );
        };

        let date = mods
            .get("newDate")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| current.date.clone());
        let time_raw = mods
            .get("newTime")
            .and_then(Value::as_str)
            .unwrap_or(&current.time);
        let Some(time) = parse_time(time_raw) else {
            return ToolEnvelope::validation_error("Time must be HH:MM", "newTime");
        };
        let guests = mods
            .get("newGuests")
            .and_then(Value::as_u64)
            .map(|g| g as u32)
            .unwrap_or(current.guests);

        if !self.slot_free(&state, &date, time, guests, Some(id)) {
            return ToolEnvelope::business_rule(
                format!("No table for {} at {} on {}", guests, format_time(time), date),
                "NO_AVAILABILITY",
            );
        }

        let Some(reservation) = state.reservations.iter_mut().find(|r| r.id == id) else {
            return ToolEnvelope::system_error("Reservation disappeared during modification");
        };
        reservation.date = date;
        reservation.time = format_time(time);
        reservation.guests = guests;
        if let Some(requests) = mods.get("newSpecialRequests").and_then(Value::as_str) {
            reservation.special_requests = Some(requests.to_string());
        }

        info!(event = "reservation_modified", reservation_id = id, "Reservation modified");
        ToolEnvelope::success(json!({
            "reservationId": id,
            "previous": current,
            "reservation": reservation.clone()
        }))
    }

    async fn cancel(&self, args: &Value) -> ToolEnvelope {
        let Some(id) = args.get("reservationId").and_then(Value::as_i64) else {
            return ToolEnvelope::validation_error("reservationId is required", "reservationId");
        };
        if !args
            .get("confirmCancellation")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            return ToolEnvelope::validation_error(
                "Cancellation must be explicitly confirmed by the guest",
                "confirmCancellation",
            );
        }

        let mut state = self.state.write().await;
        match state.reservations.iter_mut().find(|r| r.id == id) {
            Some(reservation) if reservation.status.is_active() => {
                reservation.status = ReservationStatus::Canceled;
                info!(event = "reservation_canceled", reservation_id = id, "Reservation canceled");
                ToolEnvelope::success(json!({"reservationId": id, "status": "canceled"}))
            }
            Some(_) => ToolEnvelope::business_rule(
                format!("Reservation #{} is no longer active", id),
                "RESERVATION_INACTIVE",
            ),
            None => ToolEnvelope::business_rule(
                format!("Reservation #{} not found", id),
                "RESERVATION_NOT_FOUND",
            ),
        }
    }

    fn restaurant_info(&self, args: &Value) -> ToolEnvelope {
        let r = &self.restaurant;
        let info = match args.get("infoType").and_then(Value::as_str).unwrap_or("all") {
            "hours" => json!({
                "openingTime": r.opening_time,
                "closingTime": r.closing_time,
                "timezone": r.timezone,
                "isOvernight": r.is_overnight()
            }),
            "location" => json!({ "address": r.address, "country": r.country }),
            "cuisine" => json!({ "cuisine": r.cuisine, "atmosphere": r.atmosphere }),
            "contact" => json!({ "phone": r.phone, "address": r.address }),
            "features" => json!({ "maxGuests": r.max_guests, "languages": r.languages }),
            _ => serde_json::to_value(r).unwrap_or(Value::Null),
        };
        ToolEnvelope::success(info)
    }

    async fn guest_history(&self, args: &Value) -> ToolEnvelope {
        let Some(phone) = args.get("guestPhone").and_then(Value::as_str) else {
            return ToolEnvelope::validation_error("guestPhone is required", "guestPhone");
        };
        match self.guests.read().await.get(phone) {
            Some(history) => ToolEnvelope::success(serde_json::to_value(history).unwrap_or(Value::Null)),
            None => ToolEnvelope::success(json!({ "isNewGuest": true })),
        }
    }
}

/// Extract and validate `(date, time, guests)` from tool arguments
fn slot_args(args: &Value, time_key: &str) -> Result<(String, NaiveTime, u32), ToolEnvelope> {
    let date = args
        .get("date")
        .and_then(Value::as_str)
        .filter(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").is_ok())
        .ok_or_else(|| ToolEnvelope::validation_error("Date must be YYYY-MM-DD", "date"))?;
    let time = args
        .get(time_key)
        .and_then(Value::as_str)
        .and_then(parse_time)
        .ok_or_else(|| ToolEnvelope::validation_error("Time must be HH:MM", time_key))?;
    let guests = args
        .get("guests")
        .and_then(Value::as_u64)
        .filter(|g| *g > 0)
        .ok_or_else(|| ToolEnvelope::validation_error("Guests must be a positive number", "guests"))?;
    Ok((date.to_string(), time, guests as u32))
}

#[async_trait]
impl ToolExecutor for InMemoryReservationBook {
    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolEnvelope {
        debug!(tool = %call.name, restaurant_id = ctx.restaurant_id, "Executing tool");
        match BookingTool::from_name(&call.name) {
            Some(BookingTool::CheckAvailability) => self.check_availability(&call.arguments).await,
            Some(BookingTool::FindAlternativeTimes) => self.find_alternatives(&call.arguments).await,
            Some(BookingTool::CreateReservation) => self.create(&call.arguments).await,
            Some(BookingTool::FindExistingReservation) => {
                self.find_existing(&call.arguments, ctx).await
            }
            Some(BookingTool::ModifyReservation) => self.modify(&call.arguments).await,
            Some(BookingTool::CancelReservation) => self.cancel(&call.arguments).await,
            Some(BookingTool::GetRestaurantInfo) => self.restaurant_info(&call.arguments),
            Some(BookingTool::GetGuestHistory) => self.guest_history(&call.arguments).await,
            None => ToolEnvelope::system_error(format!("Unknown tool '{}'", call.name)),
        }
    }

    fn supported_tools(&self) -> Vec<String> {
        BookingTool::ALL.iter().map(|t| t.name().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maitre_common::{Language, TenantContext, TenantPlan, TenantStatus};

    fn restaurant() -> RestaurantConfig {
        RestaurantConfig {
            id: 1,
            name: "Demo".into(),
            timezone: "Europe/Belgrade".into(),
            opening_time: "10:00".into(),
            closing_time: "23:00".into(),
            max_guests: 8,
            avg_reservation_duration: 120,
            cuisine: Some("Balkan".into()),
            atmosphere: None,
            country: None,
            languages: vec!["en".into()],
            phone: None,
            address: None,
        }
    }

    fn ctx() -> ToolContext {
        ToolContext {
            restaurant_id: 1,
            timezone: "Europe/Belgrade".into(),
            language: Language::En,
            session_id: None,
            tenant: TenantContext::new(1, "Demo", TenantStatus::Active, TenantPlan::Starter),
        }
    }

    fn call(name: &str, args: Value) -> ToolCall {
        ToolCall::new(name, args)
    }

    #[tokio::test]
    async fn test_create_then_slot_is_taken() {
        let book = InMemoryReservationBook::new(restaurant(), 1);
        let created = book
            .execute(
                &call(
                    "create_reservation",
                    json!({"guestName": "Anna", "guestPhone": "+381 60 111", "date": "2030-07-14", "time": "19:00", "guests": 2}),
                ),
                &ctx(),
            )
            .await;
        assert!(created.is_success());

        let check = book
            .execute(
                &call("check_availability", json!({"date": "2030-07-14", "time": "20:00", "guests": 2})),
                &ctx(),
            )
            .await;
        assert!(!check.is_success());
        assert_eq!(check.error.unwrap().code.as_deref(), Some("NO_AVAILABILITY"));
    }

    #[tokio::test]
    async fn test_outside_hours_and_party_size() {
        let book = InMemoryReservationBook::new(restaurant(), 4);
        let late = book
            .execute(
                &call("check_availability", json!({"date": "2030-07-14", "time": "22:00", "guests": 2})),
                &ctx(),
            )
            .await;
        assert_eq!(late.error.unwrap().code.as_deref(), Some("OUTSIDE_HOURS"));

        let big = book
            .execute(
                &call("check_availability", json!({"date": "2030-07-14", "time": "19:00", "guests": 20})),
                &ctx(),
            )
            .await;
        assert_eq!(big.error.unwrap().code.as_deref(), Some("PARTY_TOO_LARGE"));
    }

    #[tokio::test]
    async fn test_alternatives_sorted_by_proximity() {
        let book = InMemoryReservationBook::new(restaurant(), 1);
        let envelope = book
            .execute(
                &call("find_alternative_times", json!({"date": "2030-07-14", "preferredTime": "19:00", "guests": 2})),
                &ctx(),
            )
            .await;
        let data = envelope.into_result().unwrap();
        let first = &data["alternatives"][0]["time"];
        assert!(first == "18:45" || first == "19:15");
    }

    #[tokio::test]
    async fn test_find_modify_cancel() {
        let book = InMemoryReservationBook::new(restaurant(), 2);
        book.insert(ReservationSummary {
            id: 41,
            guest_name: "Ivan Petrov".into(),
            guest_phone: Some("+7 900 123".into()),
            date: "2099-01-10".into(),
            time: "19:00".into(),
            guests: 2,
            status: ReservationStatus::Confirmed,
            special_requests: None,
            table_name: None,
        })
        .await;

        let found = book
            .execute(&call("find_existing_reservation", json!({"identifier": "+7900123"})), &ctx())
            .await
            .into_result()
            .unwrap();
        assert_eq!(found["count"], 1);

        let modified = book
            .execute(
                &call("modify_reservation", json!({"reservationId": 41, "modifications": {"newTime": "20:00"}})),
                &ctx(),
            )
            .await;
        assert!(modified.is_success());
        assert_eq!(book.reservation(41).await.unwrap().time, "20:00");

        let unconfirmed = book
            .execute(&call("cancel_reservation", json!({"reservationId": 41})), &ctx())
            .await;
        assert!(!unconfirmed.is_success());

        let canceled = book
            .execute(
                &call("cancel_reservation", json!({"reservationId": 41, "confirmCancellation": true})),
                &ctx(),
            )
            .await;
        assert!(canceled.is_success());
        assert_eq!(book.reservation(41).await.unwrap().status, ReservationStatus::Canceled);
    }
}
