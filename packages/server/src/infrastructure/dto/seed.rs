//! Seed file DTOs.
//!
//! Rooms are created outside the relay; a standalone deployment learns them
//! from a JSON file such as:
//!
//! ```json
//! [{ "id": 7, "name": "Osaka trip", "members": [1, 2] }]
//! ```

use serde::Deserialize;

use crate::domain::{Room, RoomId, TravelUserId, ValueObjectError};

fn default_room_name() -> String {
    "Default".to_string()
}

/// One room entry of a seed file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedRoomDto {
    pub id: u64,
    #[serde(default = "default_room_name")]
    pub name: String,
    #[serde(default)]
    pub members: Vec<u64>,
}

impl TryFrom<SeedRoomDto> for Room {
    type Error = ValueObjectError;

    fn try_from(dto: SeedRoomDto) -> Result<Self, Self::Error> {
        let members = dto
            .members
            .into_iter()
            .map(TravelUserId::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Room::new(RoomId::new(dto.id)?, dto.name, members))
    }
}
