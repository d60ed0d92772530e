use crate::rule::Rule;
use std::path::Path;

/// A named family of header rules (one per copier or emulator format).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Skipper {
    pub name: String,
    pub rules: Vec<Rule>,
}

impl Skipper {
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self { name: name.into(), rules }
    }

    /// The first rule matching the head of a file.
    pub fn match_rule(&self, head: &[u8], total_size: u64) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.matches(head, total_size))
    }
}

/// The skippers available to a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SkipperSet {
    skippers: Vec<Skipper>,
}

impl SkipperSet {
    pub fn new(skippers: Vec<Skipper>) -> Self {
        Self { skippers }
    }

    /// Headers of the common cartridge and disk formats.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(vec![
            Skipper::new("nes", vec![Rule::headered("iNES", 0, b"NES\x1a", 0x10)]),
            Skipper::new("fds", vec![Rule::headered("fwNES", 0, b"FDS\x1a", 0x10)]),
            Skipper::new(
                "a7800",
                vec![
                    Rule::headered("a78", 1, b"ATARI7800", 0x80),
                    Rule::headered("a78-cart", 0x64, b"ACTUAL CART DATA STARTS HERE", 0x80),
                ],
            ),
            Skipper::new(
                "lynx",
                vec![Rule::headered("lnx", 0, b"LYNX", 0x40), Rule::headered("bs93", 6, b"BS93", 0x40)],
            ),
        ])
    }

    pub fn get(&self, name: &str) -> Option<&Skipper> {
        self.skippers.iter().find(|skipper| skipper.name.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Skipper> {
        self.skippers.iter()
    }

    /// Leading bytes needed to evaluate every rule of every skipper.
    #[must_use]
    pub fn head_len(&self) -> usize {
        self.skippers.iter().flat_map(|skipper| &skipper.rules).map(Rule::head_len).max().unwrap_or(0)
    }

    /// Find the rule for a file's header.
    ///
    /// `hint` names the skipper to use, as a bare name or a file name whose
    /// stem is the skipper name (`nes.xml`). An empty hint tries every
    /// skipper in order; a hint naming no known skipper matches nothing.
    pub fn match_rule(&self, head: &[u8], total_size: u64, hint: &str) -> Option<&Rule> {
        let hint = hint.trim();
        if hint.is_empty() {
            return self.skippers.iter().find_map(|skipper| skipper.match_rule(head, total_size));
        }
        let stem = Path::new(hint).file_stem().and_then(|stem| stem.to_str()).unwrap_or(hint).to_lowercase();
        let Some(skipper) = self.get(&stem) else {
            tracing::debug!(hint, "No skipper by that name");
            return None;
        };
        skipper.match_rule(head, total_size)
    }
}
