//! Resolve a link target to one of a set of candidate files.

use crate::parse_fragment;

const MARKDOWN_EXT: &str = ".md";

/// Something a wiki link can point at.
pub trait LinkCandidate {
    /// File name including extension: "Welcome.md"
    fn link_name(&self) -> &str;

    /// Vault path, with or without a leading slash: "/Notes/Daily Note.md"
    fn link_path(&self) -> &str;

    /// Folders are never link targets
    fn is_folder(&self) -> bool {
        false
    }
}

/// Which matching strategy produced a resolution, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    /// Name equals the target exactly
    ExactName,
    /// Name equals the target once `.md` is added or removed
    NameExtension,
    /// Path equals the target, ignoring a leading `/` and an optional `.md`
    Path,
    /// Name equals the target ignoring case, with or without `.md`
    CaseInsensitiveName,
}

impl MatchKind {
    const ORDER: [MatchKind; 4] = [
        MatchKind::ExactName,
        MatchKind::NameExtension,
        MatchKind::Path,
        MatchKind::CaseInsensitiveName,
    ];

    fn matches(self, key: &str, candidate: &impl LinkCandidate) -> bool {
        let name = candidate.link_name();
        match self {
            MatchKind::ExactName => name == key,
            MatchKind::NameExtension => same_modulo_extension(name, key),
            MatchKind::Path => {
                let path = candidate.link_path().trim_start_matches('/');
                let key = key.trim_start_matches('/');
                !key.is_empty() && (path == key || path.strip_suffix(MARKDOWN_EXT) == Some(key))
            }
            MatchKind::CaseInsensitiveName => {
                let name = name.to_lowercase();
                let key = key.to_lowercase();
                name == key || same_modulo_extension(&name, &key)
            }
        }
    }
}

fn same_modulo_extension(name: &str, key: &str) -> bool {
    name.strip_suffix(MARKDOWN_EXT) == Some(key) || key.strip_suffix(MARKDOWN_EXT) == Some(name)
}

/// A successful resolution.
#[derive(Debug)]
pub struct Resolution<'a, T> {
    pub candidate: &'a T,
    pub kind: MatchKind,
}

/// Resolve a raw link target against `candidates`.
///
/// The target is trimmed and any `#header` or `#^block` fragment dropped.
/// Strategies are tried in [`MatchKind`] order; within a strategy the first
/// candidate in slice order wins. Folders are skipped.
pub fn resolve_link<'a, T: LinkCandidate>(
    target: &str,
    candidates: &'a [T],
) -> Option<Resolution<'a, T>> {
    let (path_part, _, _) = parse_fragment(target.trim());
    let key = path_part.trim();
    if key.is_empty() {
        return None;
    }

    MatchKind::ORDER.into_iter().find_map(|kind| {
        candidates
            .iter()
            .filter(|c| !c.is_folder())
            .find(|c| kind.matches(key, *c))
            .map(|candidate| Resolution { candidate, kind })
    })
}
