//! Symbol shapes for UN General Assembly documents.
//!
//! A document symbol is a slash-separated identifier whose shape tells us
//! what kind of document it names.
//!
//! # Conventions
//!
//! - Resolution: a `/RES/` segment, e.g. `A/RES/80/142`
//! - Plenary draft: `A/80/L.5`, `A/ES-11/L.1`
//! - Committee draft: `A/C.2/80/L.35` (Second Committee)
//! - Draft variants: a trailing `/Rev.n`, `/Add.n` or `/Corr.n`, e.g.
//!   `A/C.2/80/L.35/Rev.1`

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};

static DRAFT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/L\.\d+").expect("draft pattern"));

static COMMITTEE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^A/C\.(\d+)/").expect("committee pattern"));

static PLENARY_DRAFT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^A/[^/]+/L\.\d+").expect("plenary pattern"));

static SESSION: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)^A/RES/(\d+)").expect("resolution session pattern"),
        Regex::new(r"(?i)^A/C\.\d+/(\d+)/L\.").expect("committee session pattern"),
        Regex::new(r"(?i)^A/(\d+)/L\.").expect("plenary session pattern"),
    ]
});

const VARIANT_MARKERS: &[&str] = &["/REV.", "/ADD.", "/CORR."];

/// Normalise a symbol for comparison: trimmed and uppercased.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// `true` if the symbol names an adopted resolution.
pub fn is_resolution(symbol: &str) -> bool {
    symbol.to_uppercase().contains("/RES/")
}

/// `true` if the symbol has the draft proposal shape (`/L.<n>`).
pub fn is_draft(symbol: &str) -> bool {
    DRAFT.is_match(symbol)
}

/// `true` if the symbol is a revision, addendum or corrigendum of a draft.
pub fn is_variant(symbol: &str) -> bool {
    let upper = symbol.to_uppercase();
    VARIANT_MARKERS.iter().any(|m| upper.contains(m))
}

/// `A/C.2/80/L.35` → `A_C.2_80_L.35`
pub fn symbol_to_filename(symbol: &str) -> String {
    symbol.replace('/', "_")
}

/// Inverse of [`symbol_to_filename`], tolerating a trailing `.pdf`.
pub fn filename_to_symbol(filename: &str) -> String {
    filename.trim_end_matches(".pdf").replace('_', "/")
}

/// Name of the published page for a symbol.
pub fn page_filename(symbol: &str) -> String {
    format!("{}.html", symbol_to_filename(symbol))
}

/// General Assembly session number encoded in the symbol, if any.
pub fn session_of(symbol: &str) -> Option<u32> {
    let symbol = symbol.trim();
    SESSION
        .iter()
        .find_map(|re| re.captures(symbol))
        .and_then(|caps| caps[1].parse().ok())
}

/// Where a draft was tabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Plenary,
    /// Main Committee number (1 = First Committee, ...).
    Committee(u8),
    Unknown,
}

impl Origin {
    /// Derive the origin of a draft from its symbol.
    pub fn from_symbol(symbol: &str) -> Self {
        let symbol = symbol.trim();
        if let Some(caps) = COMMITTEE.captures(symbol) {
            return caps[1]
                .parse()
                .map(Origin::Committee)
                .unwrap_or(Origin::Unknown);
        }
        if PLENARY_DRAFT.is_match(symbol) {
            return Origin::Plenary;
        }
        Origin::Unknown
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Plenary => f.write_str("Plenary"),
            Origin::Committee(n) => match n {
                1 => f.write_str("First Committee"),
                2 => f.write_str("Second Committee"),
                3 => f.write_str("Third Committee"),
                4 => f.write_str("Fourth Committee"),
                5 => f.write_str("Fifth Committee"),
                6 => f.write_str("Sixth Committee"),
                n => write!(f, "Main Committee {n}"),
            },
            Origin::Unknown => f.write_str("Unknown"),
        }
    }
}

impl Serialize for Origin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_shape() {
        assert!(is_resolution("A/RES/80/142"));
        assert!(is_resolution("a/res/80/1"));
        assert!(!is_resolution("A/80/L.5"));
        assert!(!is_resolution("A/80/555"));
    }

    #[test]
    fn draft_shape() {
        assert!(is_draft("A/80/L.5"));
        assert!(is_draft("A/C.2/80/L.35"));
        assert!(is_draft("A/C.2/80/L.35/Rev.1"));
        assert!(is_draft("a/c.3/80/l.12"));
        assert!(!is_draft("A/RES/80/1"));
        assert!(!is_draft("A/80/PV.64"));
        // "L." must be followed by a number.
        assert!(!is_draft("A/80/L.x"));
    }

    #[test]
    fn variant_markers_case_insensitive() {
        assert!(is_variant("A/C.2/80/L.35/Rev.1"));
        assert!(is_variant("A/80/L.5/Add.2"));
        assert!(is_variant("A/80/L.5/Corr.1"));
        assert!(is_variant("a/80/l.5/rev.1"));
        assert!(!is_variant("A/80/L.5"));
        assert!(!is_variant("A/RES/80/1"));
    }

    #[test]
    fn filename_roundtrip() {
        assert_eq!(symbol_to_filename("A/C.2/80/L.35"), "A_C.2_80_L.35");
        assert_eq!(filename_to_symbol("A_C.2_80_L.35.pdf"), "A/C.2/80/L.35");
        assert_eq!(filename_to_symbol("A_RES_77_1"), "A/RES/77/1");
        assert_eq!(page_filename("A/80/L.1"), "A_80_L.1.html");
    }

    #[test]
    fn normalize_trims_and_uppercases() {
        assert_eq!(normalize_symbol("  a/80/l.1/rev.1 "), "A/80/L.1/REV.1");
        assert_eq!(normalize_symbol("A/80/L.1"), "A/80/L.1");
    }

    #[test]
    fn sessions() {
        assert_eq!(session_of("A/RES/80/142"), Some(80));
        assert_eq!(session_of("A/C.2/79/L.35/Rev.1"), Some(79));
        assert_eq!(session_of("A/78/L.5"), Some(78));
        assert_eq!(session_of("A/80/555"), None);
        assert_eq!(session_of(""), None);
    }

    #[test]
    fn origins() {
        assert_eq!(Origin::from_symbol("A/C.1/80/L.3"), Origin::Committee(1));
        assert_eq!(Origin::from_symbol("A/C.6/80/L.10/Rev.1"), Origin::Committee(6));
        assert_eq!(Origin::from_symbol("A/80/L.5"), Origin::Plenary);
        assert_eq!(Origin::from_symbol("A/ES-11/L.1"), Origin::Plenary);
        assert_eq!(Origin::from_symbol("A/RES/80/1"), Origin::Unknown);
        assert_eq!(Origin::Committee(3).to_string(), "Third Committee");
        assert_eq!(Origin::Unknown.to_string(), "Unknown");
    }
}
