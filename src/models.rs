use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::services::wind::WindDirection;

/// One route from the catalog spreadsheet.
///
/// Serialized as-is into the durable catalog snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RouteRecord {
    /// Route name (not guaranteed unique; empty when the sheet has no name column)
    pub name: String,
    /// Route length in miles
    pub distance_miles: f64,
    /// Wind direction the route is best ridden in
    pub ideal_wind_direction: Option<WindDirection>,
    /// Ride with GPS link
    pub link: Option<String>,
    /// Free-text notes
    pub notes: Option<String>,
}
