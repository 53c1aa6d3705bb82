use serde::{Deserialize, Serialize};

/// Reservation being filled in by the agent during a call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingDraft {
    pub guest_name: String,
    pub email: String,
    pub phone: String,
    pub check_in: String,
    pub check_out: String,
    pub guests: u32,
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
}

impl Default for BookingDraft {
    fn default() -> Self {
        Self {
            guest_name: String::new(),
            email: String::new(),
            phone: String::new(),
            check_in: String::new(),
            check_out: String::new(),
            guests: 1,
            notes: String::new(),
            room_id: None,
        }
    }
}

impl BookingDraft {
    /// A draft can be submitted once a room has been picked
    pub fn has_room(&self) -> bool {
        self.room_id.as_deref().is_some_and(|id| !id.trim().is_empty())
    }
}
