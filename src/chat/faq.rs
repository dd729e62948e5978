//! FAQ matcher.
//!
//! FAQ answers are authoritative: whenever a user utterance plausibly matches
//! a known question, the canned answer wins over whatever the LLM would
//! improvise. The backend is reserved for genuinely open-ended queries.

use once_cell::sync::Lazy;

/// Best fuzzy candidate is accepted at or below this distance, on a 0-1
/// scale where 0 is an exact match.
const FUZZY_THRESHOLD: f64 = 0.4;

/// Ordered question-key → canned-answer table. Keys are pre-normalized;
/// iteration order is insertion order and breaks exact-match ties.
#[derive(Clone)]
pub struct FaqTable {
    entries: Vec<(String, String)>,
}

static BUILTIN: Lazy<FaqTable> = Lazy::new(|| {
    FaqTable::from_entries([
        (
            "what is doeet",
            "This app is dedicated to helping you plan and categorise your daily tasks. \
             Click on the plus sign to begin :D",
        ),
        (
            "how do i add a new category",
            "To add a new category:\n\n\
             1. Go to the \"Categories\" page in the sidebar.\n\
             2. Click the \"Add Category\" plus button.\n\
             3. Enter a category name and save.",
        ),
        (
            "how do i add a todo",
            "To add a new to-do:\n\n\
             1. Go to the home or tasks page.\n\
             2. Click the \"+\" button at the top of the to-dos.\n\
             3. Enter the title, description, and due date.\n\
             4. Click \"Save\".",
        ),
        (
            "how do i delete a todo",
            "To delete a to-do:\n\n\
             1. Find the task you want to delete.\n\
             2. Click the trash icon or \"Delete\" button.\n\
             3. Confirm deletion when prompted.",
        ),
        (
            "how do i edit a todo",
            "To edit a to-do:\n\n\
             1. Click on the task you want to edit.\n\
             2. Modify the title, description, due date, or category.\n\
             3. Click \"Save\" to apply changes.",
        ),
        (
            "how do i logout",
            "To log out:\n\nUse the 'Logout' link in the sidebar menu.",
        ),
        ("thank you", "You're welcome! :)"),
    ])
});

impl FaqTable {
    pub fn builtin() -> &'static FaqTable {
        &BUILTIN
    }

    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (normalize(&k.into()), v.into()))
                .collect(),
        }
    }

    /// Resolve an utterance to a canned answer, or `None` when the caller
    /// should escalate to the conversational backend.
    ///
    /// Two passes: exact substring first (first table entry wins), then a
    /// fuzzy pass taking the closest key within [`FUZZY_THRESHOLD`].
    pub fn lookup(&self, utterance: &str) -> Option<&str> {
        let normalized = normalize(utterance);
        if normalized.is_empty() {
            return None;
        }

        for (key, answer) in &self.entries {
            if normalized.contains(key.as_str()) {
                return Some(answer);
            }
        }

        let mut best: Option<(f64, &str)> = None;
        for (key, answer) in &self.entries {
            let score = distance_score(&normalized, key);
            if best.is_none_or(|(b, _)| score < b) {
                best = Some((score, answer));
            }
        }
        match best {
            Some((score, answer)) if score <= FUZZY_THRESHOLD => Some(answer),
            _ => None,
        }
    }
}

/// Lowercase, strip punctuation, collapse to trimmed text. Underscores
/// survive, matching the `\w` class the matcher was specified against.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Levenshtein distance normalized by the longer input, so 0.0 is exact and
/// 1.0 shares nothing.
fn distance_score(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 0.0;
    }
    levenshtein(&a, &b) as f64 / longest as f64
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two-row dynamic program over edit operations.
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_case_and_punctuation() {
        assert_eq!(normalize("  How do I add a TODO?! "), "how do i add a todo");
        assert_eq!(normalize("..."), "");
    }

    #[test]
    fn levenshtein_basics() {
        let chars = |s: &str| s.chars().collect::<Vec<_>>();
        assert_eq!(levenshtein(&chars("kitten"), &chars("sitting")), 3);
        assert_eq!(levenshtein(&chars(""), &chars("abc")), 3);
        assert_eq!(levenshtein(&chars("same"), &chars("same")), 0);
    }

    #[test]
    fn exact_substring_match_wins_immediately() {
        let answer = FaqTable::builtin().lookup("Hey, how do I add a todo?");
        assert!(answer.is_some_and(|a| a.contains("To add a new to-do")));
    }

    #[test]
    fn first_table_entry_breaks_substring_ties() {
        // "how do i add a new category" precedes "how do i add a todo" in the
        // table; an utterance containing both keys resolves to the earlier.
        let answer = FaqTable::builtin()
            .lookup("how do i add a new category and how do i add a todo")
            .unwrap();
        assert!(answer.contains("category"));
    }

    #[test]
    fn fuzzy_match_absorbs_typos() {
        let answer = FaqTable::builtin().lookup("hw do i dleete a task");
        assert!(answer.is_some_and(|a| a.contains("To delete a to-do")));
    }

    #[test]
    fn gibberish_escalates() {
        assert!(
            FaqTable::builtin()
                .lookup("completely unrelated gibberish xyz")
                .is_none()
        );
    }

    #[test]
    fn empty_utterance_never_matches() {
        assert!(FaqTable::builtin().lookup("   !?  ").is_none());
    }
}
