use std::fmt;

use url::form_urlencoded;

use super::PageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Normal,
    Extra,
    Phantasm,
    Lunatic,
}

impl Difficulty {
    pub fn parse(value: &str) -> Option<Difficulty> {
        match value {
            "normal" => Some(Difficulty::Normal),
            "extra" => Some(Difficulty::Extra),
            "phantasm" => Some(Difficulty::Phantasm),
            "lunatic" => Some(Difficulty::Lunatic),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Difficulty::Normal => "【Normal】",
            Difficulty::Extra => "【Extra】",
            Difficulty::Phantasm => "【Phantasm】",
            Difficulty::Lunatic => "【Lunatic】",
        }
    }

    /// Normal and Lunatic runs span several stages; Extra and Phantasm are a
    /// single stage.
    pub fn is_staged(&self) -> bool {
        matches!(self, Difficulty::Normal | Difficulty::Lunatic)
    }
}

/// Branching path through the end of a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    FinalA,
    FinalB,
    /// `[a-c][1-9][0-9]*`, e.g. `b2`.
    Branch(char, String),
}

impl Route {
    pub fn parse(value: &str) -> Option<Route> {
        match value {
            "final_a" => return Some(Route::FinalA),
            "final_b" => return Some(Route::FinalB),
            _ => {}
        }
        let mut chars = value.chars();
        let letter = chars.next().filter(|c| ('a'..='c').contains(c))?;
        let digits = chars.as_str();
        if !digits.starts_with(|c: char| ('1'..='9').contains(&c))
            || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        Some(Route::Branch(letter, digits.to_string()))
    }

    /// Key of the sub-map holding this route's time in per-route timestamps.
    pub fn time_key(&self) -> &'static str {
        match self {
            Route::FinalA | Route::Branch('a', _) => "a",
            Route::FinalB | Route::Branch('b', _) => "b",
            Route::Branch(..) => "c",
        }
    }

    pub fn title_suffix(&self) -> Option<&'static str> {
        match self {
            Route::FinalA => Some("（FinalA）"),
            Route::FinalB => Some("（FinalB）"),
            Route::Branch(..) => None,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Route::FinalA | Route::FinalB)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::FinalA => write!(f, "final_a"),
            Route::FinalB => write!(f, "final_b"),
            Route::Branch(letter, number) => write!(f, "{}{}", letter, number),
        }
    }
}

/// What a page was asked to show.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub key: String,
    pub difficulty: Difficulty,
    pub route: Option<Route>,
}

impl PageRequest {
    /// Interprets the third argument of the Normal loader, which is either a
    /// route or a difficulty name.
    pub fn staged(key: &str, route_or_difficulty: &str) -> Result<PageRequest, PageError> {
        let (difficulty, route) = if route_or_difficulty.is_empty() {
            (Difficulty::Normal, None)
        } else if let Some(route) = Route::parse(route_or_difficulty) {
            (Difficulty::Normal, Some(route))
        } else {
            match Difficulty::parse(route_or_difficulty) {
                Some(difficulty) if difficulty.is_staged() => (difficulty, None),
                _ => return Err(invalid("route", route_or_difficulty)),
            }
        };
        Ok(PageRequest {
            key: key.to_string(),
            difficulty,
            route,
        })
    }

    pub fn single(key: &str, difficulty: &str) -> Result<PageRequest, PageError> {
        let difficulty = match Difficulty::parse(difficulty) {
            Some(difficulty) if !difficulty.is_staged() => difficulty,
            _ if difficulty.is_empty() => Difficulty::Extra,
            _ => return Err(invalid("difficulty", difficulty)),
        };
        Ok(PageRequest {
            key: key.to_string(),
            difficulty,
            route: None,
        })
    }
}

fn invalid(name: &str, value: &str) -> PageError {
    PageError::InvalidParameter(format!("{}={}", name, value))
}

/// Parses `?character=..&difficulty=..&route=..`.
pub fn parse_page_query(query: &str) -> Result<PageRequest, PageError> {
    let mut key = None;
    let mut difficulty = Difficulty::Normal;
    let mut route = None;

    for (name, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
        match name.as_ref() {
            "character" => key = Some(value.into_owned()),
            "difficulty" => {
                difficulty =
                    Difficulty::parse(&value).ok_or_else(|| invalid("difficulty", &value))?;
            }
            "route" => {
                route = Some(Route::parse(&value).ok_or_else(|| invalid("route", &value))?);
            }
            _ => {}
        }
    }

    let key = key
        .filter(|key| !key.is_empty())
        .ok_or_else(|| PageError::InvalidParameter("missing character".to_string()))?;
    if route.is_some() && !difficulty.is_staged() {
        return Err(invalid("difficulty", "with route"));
    }

    Ok(PageRequest {
        key,
        difficulty,
        route,
    })
}
