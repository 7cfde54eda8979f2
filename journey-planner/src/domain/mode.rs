use serde::{Deserialize, Serialize};

/// How a leg is travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Walking,
    /// Along the road graph with a routing profile.
    Road,
    Train,
    Bus,
}

impl TravelMode {
    /// Whether this mode is scheduled public transport.
    pub fn is_transit(self) -> bool {
        matches!(self, TravelMode::Train | TravelMode::Bus)
    }
}
