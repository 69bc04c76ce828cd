//! Traffic strategies and the paths they generate.

use serde::Serialize;
use std::fmt;

use crate::loadgen::status::RemoteStatus;
use crate::state::ServiceMode;

/// Prefixes the bomb strategy attaches random ids to.
pub const BOMB_PREFIXES: [&str; 5] = ["/orders/", "/users/", "/products/", "/items/", "/transactions/"];

/// Exclusive upper bound of bomb ids.
pub const BOMB_ID_SPACE: u32 = 10_000;

/// Exclusive upper bound of ids in the high-cardinality menu.
pub const HIGH_CARDINALITY_ID_SPACE: u32 = 1_000;

/// Fixed menu of the shaped strategy.
pub const SHAPED_PATHS: [&str; 7] = [
    "/api/call",
    "/orders/12345",
    "/orders/67890",
    "/users/111",
    "/users/222",
    "/products/333",
    "/products/444",
];

/// High-cardinality menu. Id-bearing prefixes appear twice to weight them.
const HIGH_CARDINALITY_MENU: [MenuEntry; 7] = [
    MenuEntry::Fixed("/api/call"),
    MenuEntry::WithId("/orders/"),
    MenuEntry::WithId("/orders/"),
    MenuEntry::WithId("/users/"),
    MenuEntry::WithId("/users/"),
    MenuEntry::WithId("/products/"),
    MenuEntry::WithId("/products/"),
];

#[derive(Debug, Clone, Copy)]
enum MenuEntry {
    Fixed(&'static str),
    WithId(&'static str),
}

/// How a virtual user picks its next path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Shaped,
    HighCardinality,
    Bomb,
}

impl Strategy {
    /// Bomb wins over high cardinality; firehose mode counts as high cardinality.
    pub fn from_status(status: &RemoteStatus) -> Self {
        if status.cardinality_bomb_mode {
            Strategy::Bomb
        } else if status.high_cardinality_mode || status.mode == ServiceMode::Firehose {
            Strategy::HighCardinality
        } else {
            Strategy::Shaped
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Shaped => "shaped",
            Strategy::HighCardinality => "high_cardinality",
            Strategy::Bomb => "bomb",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Next request path for `strategy`.
pub fn generate_path(strategy: Strategy, rng: &mut fastrand::Rng) -> String {
    match strategy {
        Strategy::Bomb => {
            let prefix = BOMB_PREFIXES[rng.usize(..BOMB_PREFIXES.len())];
            format!("{prefix}{}", rng.u32(..BOMB_ID_SPACE))
        }
        Strategy::HighCardinality => {
            match HIGH_CARDINALITY_MENU[rng.usize(..HIGH_CARDINALITY_MENU.len())] {
                MenuEntry::Fixed(path) => path.to_string(),
                MenuEntry::WithId(prefix) => {
                    format!("{prefix}{}", rng.u32(..HIGH_CARDINALITY_ID_SPACE))
                }
            }
        }
        Strategy::Shaped => SHAPED_PATHS[rng.usize(..SHAPED_PATHS.len())].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn status(mode: ServiceMode, high: bool, bomb: bool) -> RemoteStatus {
        RemoteStatus {
            mode,
            high_cardinality_mode: high,
            cardinality_bomb_mode: bomb,
        }
    }

    #[test]
    fn test_strategy_selection() {
        assert_eq!(
            Strategy::from_status(&status(ServiceMode::Shaped, false, false)),
            Strategy::Shaped
        );
        assert_eq!(
            Strategy::from_status(&status(ServiceMode::Shaped, true, false)),
            Strategy::HighCardinality
        );
        assert_eq!(
            Strategy::from_status(&status(ServiceMode::Firehose, false, false)),
            Strategy::HighCardinality
        );
        assert_eq!(
            Strategy::from_status(&status(ServiceMode::Shaped, true, true)),
            Strategy::Bomb
        );
        assert_eq!(Strategy::from_status(&RemoteStatus::default()), Strategy::HighCardinality);
    }

    #[test]
    fn test_shaped_paths_come_from_menu() {
        let mut rng = fastrand::Rng::with_seed(1);
        let paths: HashSet<_> = (0..1000)
            .map(|_| generate_path(Strategy::Shaped, &mut rng))
            .collect();
        assert!(paths.iter().all(|p| SHAPED_PATHS.contains(&p.as_str())));
        assert!(paths.len() <= SHAPED_PATHS.len());
    }

    #[test]
    fn test_high_cardinality_paths() {
        let mut rng = fastrand::Rng::with_seed(2);
        for _ in 0..1000 {
            let path = generate_path(Strategy::HighCardinality, &mut rng);
            if path == "/api/call" {
                continue;
            }
            let (prefix, id) = path.rsplit_once('/').unwrap();
            assert!(["/orders", "/users", "/products"].contains(&prefix), "{path}");
            assert!(id.parse::<u32>().unwrap() < HIGH_CARDINALITY_ID_SPACE);
        }
    }

    #[test]
    fn test_bomb_outgrows_shaped() {
        let mut rng = fastrand::Rng::with_seed(3);
        let bomb: HashSet<_> = (0..1000)
            .map(|_| generate_path(Strategy::Bomb, &mut rng))
            .collect();
        let shaped: HashSet<_> = (0..1000)
            .map(|_| generate_path(Strategy::Shaped, &mut rng))
            .collect();

        assert!(shaped.len() <= 7);
        assert!(bomb.len() > 500, "only {} distinct bomb paths", bomb.len());
        for path in &bomb {
            let (prefix, id) = split_id(path);
            assert!(BOMB_PREFIXES.contains(&prefix), "{path}");
            assert!(id < BOMB_ID_SPACE);
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let mut a = fastrand::Rng::with_seed(99);
        let mut b = fastrand::Rng::with_seed(99);
        for _ in 0..100 {
            assert_eq!(
                generate_path(Strategy::Bomb, &mut a),
                generate_path(Strategy::Bomb, &mut b)
            );
        }
    }

    /// `"/orders/12"` into `("/orders/", 12)`.
    fn split_id(path: &str) -> (&str, u32) {
        let cut = path.rfind('/').unwrap() + 1;
        (&path[..cut], path[cut..].parse().unwrap())
    }
}
