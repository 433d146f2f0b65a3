//! Declarative registry of the booking functions the model may invoke

use maitre_llm::ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Booking backend functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingTool {
    CheckAvailability,
    FindAlternativeTimes,
    CreateReservation,
    FindExistingReservation,
    ModifyReservation,
    CancelReservation,
    GetRestaurantInfo,
    GetGuestHistory,
}

impl BookingTool {
    pub const ALL: [BookingTool; 8] = [
        BookingTool::CheckAvailability,
        BookingTool::FindAlternativeTimes,
        BookingTool::CreateReservation,
        BookingTool::FindExistingReservation,
        BookingTool::ModifyReservation,
        BookingTool::CancelReservation,
        BookingTool::GetRestaurantInfo,
        BookingTool::GetGuestHistory,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BookingTool::CheckAvailability => "check_availability",
            BookingTool::FindAlternativeTimes => "find_alternative_times",
            BookingTool::CreateReservation => "create_reservation",
            BookingTool::FindExistingReservation => "find_existing_reservation",
            BookingTool::ModifyReservation => "modify_reservation",
            BookingTool::CancelReservation => "cancel_reservation",
            BookingTool::GetRestaurantInfo => "get_restaurant_info",
            BookingTool::GetGuestHistory => "get_guest_history",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// JSON-schema description handed to the model
    pub fn definition(&self) -> ToolDefinition {
        match self {
            BookingTool::CheckAvailability => ToolDefinition::new(
                self.name(),
                "Check if a table is available for the exact date, time and party size. \
                 Only call once the guest has explicitly stated all three.",
            )
            .with_parameters(json!({
                "type": "object",
                "properties": {
                    "date": {"type": "string", "description": "Date in YYYY-MM-DD format"},
                    "time": {"type": "string", "description": "Time in HH:MM format"},
                    "guests": {"type": "number", "description": "Number of guests"}
                },
                "required": ["date", "time", "guests"]
            })),
            BookingTool::FindAlternativeTimes => ToolDefinition::new(
                self.name(),
                "Find alternative available times around a preferred time when the requested slot is taken.",
            )
            .with_parameters(json!({
                "type": "object",
                "properties": {
                    "date": {"type": "string", "description": "Date in YYYY-MM-DD format"},
                    "preferredTime": {"type": "string", "description": "Preferred time in HH:MM format"},
                    "guests": {"type": "number", "description": "Number of guests"}
                },
                "required": ["date", "preferredTime", "guests"]
            })),
            BookingTool::CreateReservation => ToolDefinition::new(
                self.name(),
                "Create a confirmed reservation. Requires name, phone, date, time and guests.",
            )
            .with_parameters(json!({
                "type": "object",
                "properties": {
                    "guestName": {"type": "string", "description": "Guest full name"},
                    "guestPhone": {"type": "string", "description": "Guest phone number"},
                    "date": {"type": "string", "description": "Date in YYYY-MM-DD format"},
                    "time": {"type": "string", "description": "Time in HH:MM format"},
                    "guests": {"type": "number", "description": "Number of guests"},
                    "specialRequests": {"type": "string", "description": "Special requests, if any"}
                },
                "required": ["guestName", "guestPhone", "date", "time", "guests"]
            })),
            BookingTool::FindExistingReservation => ToolDefinition::new(
                self.name(),
                "Find a guest's existing reservations by phone, name or confirmation number.",
            )
            .with_parameters(json!({
                "type": "object",
                "properties": {
                    "identifier": {"type": "string", "description": "Phone number, name or confirmation number"},
                    "identifierType": {
                        "type": "string",
                        "enum": ["phone", "name", "confirmation", "auto"],
                        "description": "Kind of identifier supplied"
                    },
                    "timeRange": {
                        "type": "string",
                        "enum": ["upcoming", "past", "all"],
                        "description": "Which reservations to look at; prefer 'upcoming'"
                    }
                },
                "required": ["identifier"]
            })),
            BookingTool::ModifyReservation => ToolDefinition::new(
                self.name(),
                "Change the date, time, party size or special requests of an existing reservation.",
            )
            .with_parameters(json!({
                "type": "object",
                "properties": {
                    "reservationId": {"type": "number", "description": "ID of the reservation to modify"},
                    "modifications": {
                        "type": "object",
                        "properties": {
                            "newDate": {"type": "string", "description": "New date in YYYY-MM-DD format"},
                            "newTime": {"type": "string", "description": "New time in HH:MM format"},
                            "newGuests": {"type": "number", "description": "New number of guests"},
                            "newSpecialRequests": {"type": "string", "description": "Updated special requests"}
                        }
                    },
                    "reason": {"type": "string", "description": "Why the guest is changing the booking"}
                },
                "required": ["reservationId", "modifications"]
            })),
            BookingTool::CancelReservation => ToolDefinition::new(
                self.name(),
                "Cancel an existing reservation. Only call after the guest explicitly confirmed the cancellation.",
            )
            .with_parameters(json!({
                "type": "object",
                "properties": {
                    "reservationId": {"type": "number", "description": "ID of the reservation to cancel"},
                    "reason": {"type": "string", "description": "Reason for cancellation"},
                    "confirmCancellation": {"type": "boolean", "description": "Explicit guest confirmation"}
                },
                "required": ["reservationId", "confirmCancellation"]
            })),
            BookingTool::GetRestaurantInfo => ToolDefinition::new(
                self.name(),
                "Get restaurant information such as hours, location, cuisine or contact details.",
            )
            .with_parameters(json!({
                "type": "object",
                "properties": {
                    "infoType": {
                        "type": "string",
                        "enum": ["hours", "location", "cuisine", "contact", "features", "all"],
                        "description": "What information to return"
                    }
                },
                "required": ["infoType"]
            })),
            BookingTool::GetGuestHistory => ToolDefinition::new(
                self.name(),
                "Get a returning guest's booking history for personalisation.",
            )
            .with_parameters(json!({
                "type": "object",
                "properties": {
                    "guestPhone": {"type": "string", "description": "Guest phone number"}
                },
                "required": ["guestPhone"]
            })),
        }
    }
}

impl std::fmt::Display for BookingTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Every tool the model may invoke
pub fn agent_tools() -> Vec<ToolDefinition> {
    BookingTool::ALL.iter().map(BookingTool::definition).collect()
}

/// Definitions for a subset of tools, in the given order
pub fn tools_for(selection: &[BookingTool]) -> Vec<ToolDefinition> {
    selection.iter().map(BookingTool::definition).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lists_every_tool_once() {
        let tools = agent_tools();
        assert_eq!(tools.len(), 8);

        let mut names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 8);
    }

    #[test]
    fn test_name_round_trip() {
        for tool in BookingTool::ALL {
            assert_eq!(BookingTool::from_name(tool.name()), Some(tool));
        }
        assert_eq!(BookingTool::from_name("delete_everything"), None);
    }

    #[test]
    fn test_availability_requires_explicit_slots() {
        let definition = BookingTool::CheckAvailability.definition();
        assert_eq!(definition.required_parameters(), vec!["date", "time", "guests"]);
    }
}
