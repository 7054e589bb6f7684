//! Route recommendation: filter the catalog by wind direction, then select one.
//!
//! With a mile hint the closest route wins (first in catalog order on ties).
//! Without one, a [`SelectionStrategy`] picks among routes inside the
//! distance band.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Mutex;

use crate::models::RouteRecord;
use crate::services::wind::WindDirection;

/// Inclusive distance range used when no mile hint is given.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceBand {
    pub min_miles: f64,
    pub max_miles: f64,
}

impl DistanceBand {
    pub fn contains(&self, miles: f64) -> bool {
        miles >= self.min_miles && miles <= self.max_miles
    }
}

impl Default for DistanceBand {
    fn default() -> Self {
        Self {
            min_miles: 20.0,
            max_miles: 50.0,
        }
    }
}

/// Picks one route from a non-empty candidate list.
pub trait SelectionStrategy: Send + Sync {
    fn pick<'a>(&self, candidates: &[&'a RouteRecord]) -> Option<&'a RouteRecord>;
}

/// Uniform random choice.
pub struct RandomPick {
    rng: Mutex<StdRng>,
}

impl RandomPick {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible sequence of picks for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl SelectionStrategy for RandomPick {
    fn pick<'a>(&self, candidates: &[&'a RouteRecord]) -> Option<&'a RouteRecord> {
        // A poisoned lock still holds a usable RNG
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        candidates.choose(&mut *rng).copied()
    }
}

/// Deterministic: first candidate in catalog order.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstPick;

impl SelectionStrategy for FirstPick {
    fn pick<'a>(&self, candidates: &[&'a RouteRecord]) -> Option<&'a RouteRecord> {
        candidates.first().copied()
    }
}

/// Selects one route for a wind direction and optional mile hint.
pub struct RouteMatcher {
    band: DistanceBand,
    strategy: Box<dyn SelectionStrategy>,
}

impl RouteMatcher {
    pub fn new(band: DistanceBand, strategy: Box<dyn SelectionStrategy>) -> Self {
        Self { band, strategy }
    }

    pub fn band(&self) -> DistanceBand {
        self.band
    }

    /// Returns `None` when no route satisfies the filters.
    pub fn select<'a>(
        &self,
        routes: &'a [RouteRecord],
        direction: WindDirection,
        mile_hint: Option<f64>,
    ) -> Option<&'a RouteRecord> {
        let matching = routes
            .iter()
            .filter(|route| route.ideal_wind_direction == Some(direction));

        match mile_hint {
            Some(hint) => closest_to(matching, hint),
            None => {
                let in_band: Vec<&RouteRecord> = matching
                    .filter(|route| self.band.contains(route.distance_miles))
                    .collect();
                self.strategy.pick(&in_band)
            }
        }
    }
}

/// Route minimizing `|distance - hint|`; the earliest wins ties.
fn closest_to<'a>(
    routes: impl Iterator<Item = &'a RouteRecord>,
    hint: f64,
) -> Option<&'a RouteRecord> {
    let mut best: Option<(&RouteRecord, f64)> = None;
    for route in routes {
        let gap = (route.distance_miles - hint).abs();
        match best {
            Some((_, best_gap)) if gap >= best_gap => {}
            _ => best = Some((route, gap)),
        }
    }
    best.map(|(route, _)| route)
}
