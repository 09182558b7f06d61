use std::collections::HashMap;

use serde::Deserialize;

use crate::page::query::Route;

/// Video offset of a timestamp, in seconds.
///
/// A single narrative event can happen at different offsets depending on the
/// character being played and, for branching endings, on the route taken.
/// A `null` in either map means the event does not happen for that character
/// or route.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Time {
    Fixed(f64),
    PerCharacter(HashMap<String, Option<f64>>),
    PerCharacterPerRoute(HashMap<String, Option<CharacterTime>>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CharacterTime {
    Fixed(f64),
    /// Keyed by route letter (`a`, `b`, ...).
    PerRoute(HashMap<String, Option<f64>>),
}

impl Time {
    pub fn resolve(&self, character: &str, route: Option<&Route>) -> Option<f64> {
        match self {
            Time::Fixed(seconds) => Some(*seconds),
            Time::PerCharacter(times) => times.get(character).copied().flatten(),
            Time::PerCharacterPerRoute(times) => match times.get(character)?.as_ref()? {
                CharacterTime::Fixed(seconds) => Some(*seconds),
                CharacterTime::PerRoute(by_route) => {
                    let letter = route.map_or("a", |route| route.time_key());
                    by_route.get(letter).copied().flatten()
                }
            },
        }
        .filter(|seconds| seconds.is_finite())
    }
}
