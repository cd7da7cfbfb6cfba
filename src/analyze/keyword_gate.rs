// src/analyze/keyword_gate.rs
//! Cheap deny-list filter on raw titles, run before anything that costs an API call.

use crate::ingest::fold_case;

/// Built-in deny-list: sports results, celebrity/gossip, horoscopes, lotteries, reality TV.
pub const DEFAULT_BLOCKED_KEYWORDS: &[&str] = &[
    "süper lig",
    "maç sonucu",
    "galatasaray",
    "fenerbahçe",
    "beşiktaş",
    "trabzonspor",
    "magazin",
    "ünlü oyuncu",
    "aşk iddiası",
    "burç",
    "astroloji",
    "survivor",
    "masterchef",
    "hava durumu",
    "gelin evi",
    "kim milyoner",
    "football match",
    "celebrity",
    "horoscope",
    "gossip",
    "royal family",
    "kim kardashian",
    "premier league",
    "nba results",
    "lottery",
];

#[derive(Debug, Clone)]
pub struct KeywordGate {
    deny: Vec<String>,
}

impl Default for KeywordGate {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCKED_KEYWORDS.iter().copied())
    }
}

impl KeywordGate {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let deny = keywords
            .into_iter()
            .map(|k| fold_case(k.as_ref().trim()))
            .filter(|k| !k.is_empty())
            .collect();
        Self { deny }
    }

    /// `false` when the title contains any deny-listed substring (case-insensitive).
    pub fn admit(&self, title: &str) -> bool {
        self.blocked_by(title).is_none()
    }

    /// The first deny-list entry found in `title`, for logging.
    pub fn blocked_by(&self, title: &str) -> Option<&str> {
        let lowered = fold_case(title);
        self.deny
            .iter()
            .find(|k| lowered.contains(k.as_str()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.deny.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deny.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_match() {
        let gate = KeywordGate::new(["galatasaray"]);
        assert!(!gate.admit("BREAKING NEWS: Galatasaray wins"));
        assert!(!gate.admit("galatasaray wins"));
        assert!(gate.admit("Parliament passes budget"));
    }

    #[test]
    fn deny_list_entries_are_normalized() {
        let gate = KeywordGate::new(["  Premier League ", ""]);
        assert_eq!(gate.len(), 1);
        assert_eq!(gate.blocked_by("premier league table"), Some("premier league"));
    }

    #[test]
    fn default_list_covers_turkish_terms() {
        let gate = KeywordGate::default();
        assert!(!gate.admit("FENERBAHÇE derbide kazandı"));
        assert!(!gate.admit("Günlük burç yorumları"));
        assert!(gate.admit("Merkez Bankası faiz kararını açıkladı"));
    }

    #[test]
    fn dotted_capital_i_folds_to_plain_i() {
        let gate = KeywordGate::default();
        assert_eq!(gate.blocked_by("BEŞİKTAŞ derbide kazandı"), Some("beşiktaş"));
        assert_eq!(gate.blocked_by("SÜPER LİG'de şok sonuç"), Some("süper lig"));
        let custom = KeywordGate::new(["İSTANBUL DERBİSİ"]);
        assert!(!custom.admit("istanbul derbisi bu akşam"));
    }

    #[test]
    fn empty_list_admits_everything() {
        let gate = KeywordGate::new(Vec::<String>::new());
        assert!(gate.is_empty());
        assert!(gate.admit("anything at all"));
    }
}
