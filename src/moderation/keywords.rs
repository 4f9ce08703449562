use std::path::Path;

const DEFAULT_LIST: &str = include_str!("../../config/banned_words.txt");

/// Immutable set of banned substrings.
///
/// Matching lowercases the input and looks for each entry anywhere in it,
/// without word boundaries, so short entries such as `cu` also fire inside
/// longer words. That over-matching is kept on purpose until product review
/// decides otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordList {
    entries: Vec<String>,
}

impl KeywordList {
    /// Parses the list format: one entry per line, `#` comment lines and
    /// blank lines skipped, entries trimmed and lowercased, duplicates dropped.
    pub fn parse(text: &str) -> KeywordList {
        let mut entries: Vec<String> = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let entry = line.to_lowercase();
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }
        KeywordList { entries }
    }

    /// The list shipped with the crate (`config/banned_words.txt`).
    pub fn builtin() -> KeywordList {
        KeywordList::parse(DEFAULT_LIST)
    }

    pub fn load(path: &Path) -> std::io::Result<KeywordList> {
        let text = std::fs::read_to_string(path)?;
        Ok(KeywordList::parse(&text))
    }

    /// Loads `path` when given, otherwise the built-in list.
    pub fn load_or_builtin(path: Option<&Path>) -> std::io::Result<KeywordList> {
        match path {
            Some(p) => {
                let list = KeywordList::load(p)?;
                log::info!("Loaded {} banned keywords from {}", list.len(), p.display());
                Ok(list)
            }
            None => Ok(KeywordList::builtin()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry found in `text`, if any.
    pub fn find_banned(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.entries.iter()
            .find(|entry| lowered.contains(entry.as_str()))
            .map(|s| s.as_str())
    }

    pub fn contains_banned(&self, text: &str) -> bool {
        self.find_banned(text).is_some()
    }
}

impl Default for KeywordList {
    fn default() -> Self {
        KeywordList::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_list_flags_profanity() {
        let list = KeywordList::builtin();
        assert!(list.contains_banned("esse jogo é uma bosta"));
        assert!(!list.contains_banned("bom dia"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let list = KeywordList::builtin();
        assert!(list.contains_banned("MERDA!"));
        assert_eq!(list.find_banned("Que DESGRAÇA"), Some("desgraça"));
    }

    #[test]
    fn short_entries_match_inside_other_words() {
        let list = KeywordList::builtin();
        // "cu" inside "circunstância", "pau" inside "pausa"
        assert!(list.contains_banned("circunstância"));
        assert!(list.contains_banned("faz uma pausa"));
    }

    #[test]
    fn leetspeak_variants_are_listed() {
        let list = KeywordList::builtin();
        assert!(list.contains_banned("que m€rda"));
        assert!(list.contains_banned("p0rr@ meu"));
    }

    #[test]
    fn parse_skips_comments_and_blanks() {
        let list = KeywordList::parse("# header\n\n  Foo \nbar\nfoo\n");
        assert_eq!(list.len(), 2);
        assert!(list.contains_banned("FOOD"));
        assert!(!list.contains_banned("# header"));
    }

    #[test]
    fn empty_text_never_matches() {
        assert!(!KeywordList::builtin().contains_banned(""));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.txt");
        std::fs::write(&path, "zebra\n").unwrap();
        let list = KeywordList::load_or_builtin(Some(&path)).unwrap();
        assert!(list.contains_banned("Zebras"));
        assert!(!list.contains_banned("bosta"));
    }
}
