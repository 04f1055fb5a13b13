//! Known pickup/destination points and free-text label resolution.
//!
//! Labels typed by riders rarely match the catalog exactly, so resolution
//! tries, in order: exact name, label contains a catalog name, a catalog name
//! contains the label, and finally a short alias table. A label that matches
//! nothing stays unresolved; callers must refuse to navigate rather than pick
//! an arbitrary point.

use crate::geo::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NamedWaypoint {
    pub name: &'static str,
    pub position: Coordinate,
}

pub const CUET_CAMPUS: NamedWaypoint = NamedWaypoint {
    name: "CUET_CAMPUS",
    position: Coordinate::new(22.4633, 91.9714),
};

pub const PAHARTOLI: NamedWaypoint = NamedWaypoint {
    name: "PAHARTOLI",
    position: Coordinate::new(22.4725, 91.9845),
};

pub const NOAPARA: NamedWaypoint = NamedWaypoint {
    name: "NOAPARA",
    position: Coordinate::new(22.4580, 91.9920),
};

pub const RAOJAN: NamedWaypoint = NamedWaypoint {
    name: "RAOJAN",
    position: Coordinate::new(22.4520, 91.9650),
};

pub const CATALOG: [NamedWaypoint; 4] = [CUET_CAMPUS, PAHARTOLI, NOAPARA, RAOJAN];

/// Substring aliases checked after the catalog rules. `PAHAR` is a historical
/// spelling kept for compatibility with older rider apps.
const ALIASES: [(&str, NamedWaypoint); 2] = [("CUET", CUET_CAMPUS), ("PAHAR", PAHARTOLI)];

/// Resolves a free-text label against [`CATALOG`].
pub fn resolve(label: &str) -> Option<NamedWaypoint> {
    let label = label.trim().to_uppercase();
    if label.is_empty() {
        return None;
    }

    CATALOG
        .iter()
        .find(|wp| wp.name == label)
        .or_else(|| CATALOG.iter().find(|wp| label.contains(wp.name)))
        .or_else(|| CATALOG.iter().find(|wp| wp.name.contains(label.as_str())))
        .copied()
        .or_else(|| {
            ALIASES
                .iter()
                .find(|(alias, _)| label.contains(alias))
                .map(|(_, wp)| *wp)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_names_resolve() {
        for wp in CATALOG {
            assert_eq!(resolve(wp.name), Some(wp));
        }
    }

    #[test]
    fn matching_is_case_insensitive_and_trimmed() {
        assert_eq!(resolve("  noapara "), Some(NOAPARA));
        assert_eq!(resolve("Raojan"), Some(RAOJAN));
    }

    #[test]
    fn label_containing_a_catalog_name_resolves() {
        assert_eq!(resolve("NOAPARA BAZAR GATE"), Some(NOAPARA));
    }

    #[test]
    fn catalog_name_containing_the_label_resolves() {
        assert_eq!(resolve("CAMPUS"), Some(CUET_CAMPUS));
        assert_eq!(resolve("TOLI"), Some(PAHARTOLI));
    }

    #[test]
    fn aliases_resolve_last() {
        assert_eq!(resolve("CUET main gate"), Some(CUET_CAMPUS));
        assert_eq!(resolve("Pahar hill road"), Some(PAHARTOLI));
    }

    #[test]
    fn unknown_and_empty_labels_stay_unresolved() {
        assert_eq!(resolve("CHAWKBAZAR"), None);
        assert_eq!(resolve("   "), None);
    }
}
