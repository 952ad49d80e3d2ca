//! Text normalisation and chunking for synthesis.
//!
//! The backend accepts a bounded amount of text per call, so input is cleaned
//! and cut into sentence-aligned chunks of at most `max_length` characters.
//! All lengths are counted in `char`s, never bytes.

use std::fmt;

use fancy_regex::Regex as FancyRegex;
use once_cell::sync::Lazy;
use regex::Regex;

/// Default maximum characters per chunk.
pub const DEFAULT_MAX_LENGTH: usize = 500;

/// Separator inserted between sentences packed into one chunk.
const SENTENCE_JOIN: &str = ". ";

// ─────────────────────────────────────────────────────────────────────────────
// Compiled patterns
// ─────────────────────────────────────────────────────────────────────────────

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+\s+").unwrap());
// Letters (any script) with combining marks, digits, whitespace and . , ! ? ; : ( ) - ' "
static RE_DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^\p{L}\p{M}\p{N}\s.,!?;:()\-'"]"#).unwrap());

const ABBREVIATIONS: &[(&str, &str)] = &[
    ("Dr.", "Doctor"),
    ("Mr.", "Mister"),
    ("Mrs.", "Missus"),
    ("Ms.", "Miss"),
    ("Prof.", "Professor"),
    ("vs.", "versus"),
];

static RE_ABBREVIATIONS: Lazy<Vec<(FancyRegex, &'static str)>> = Lazy::new(|| {
    ABBREVIATIONS
        .iter()
        .map(|&(abbr, spoken)| {
            let pattern = format!(r"(?i)\b{}(?!\w)", regex::escape(abbr));
            (FancyRegex::new(&pattern).unwrap(), spoken)
        })
        .collect()
});

// ─────────────────────────────────────────────────────────────────────────────
// Pluggable preprocessing
// ─────────────────────────────────────────────────────────────────────────────

/// Language-specific rewriting that runs before the built-in cleanup
/// (number reading, transliteration and the like).
pub trait TextPreprocess: Send + Sync {
    fn preprocess(&self, text: &str) -> String;
}

// ─────────────────────────────────────────────────────────────────────────────
// Free functions
// ─────────────────────────────────────────────────────────────────────────────

/// Replace every table abbreviation (whole word, any case) by its spoken form.
pub fn expand_abbreviations(text: &str) -> String {
    let mut text = text.to_string();
    for (re, spoken) in RE_ABBREVIATIONS.iter() {
        text = re.replace_all(&text, *spoken).into_owned();
    }
    text
}

/// Drop characters outside the allow-list.
pub fn strip_disallowed(text: &str) -> String {
    RE_DISALLOWED.replace_all(text, "").into_owned()
}

/// Collapse whitespace runs to one space and trim both ends.
pub fn collapse_whitespace(text: &str) -> String {
    RE_SPACES.replace_all(text.trim(), " ").into_owned()
}

/// Split on runs of `.`, `!`, `?` followed by whitespace.  Purely syntactic.
pub fn split_sentences(text: &str) -> Vec<String> {
    RE_SENTENCE_END
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Slice `text` into pieces of exactly `width` chars (the last may be shorter).
fn fixed_width(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(width.max(1)).map(|c| c.iter().collect()).collect()
}

/// Greedy sentence packing.  A sentence longer than `max_len` is emitted alone.
fn pack_sentences(sentences: Vec<String>, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in sentences {
        let len = char_len(&sentence);
        if current.is_empty() {
            current = sentence;
            current_len = len;
        } else if current_len + SENTENCE_JOIN.len() + len <= max_len {
            current.push_str(SENTENCE_JOIN);
            current.push_str(&sentence);
            current_len += SENTENCE_JOIN.len() + len;
        } else {
            chunks.push(std::mem::replace(&mut current, sentence));
            current_len = len;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

// ─────────────────────────────────────────────────────────────────────────────
// TextChunker
// ─────────────────────────────────────────────────────────────────────────────

/// One synthesis unit: 1-based position plus text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub index: usize,
    pub text: String,
}

impl TextChunk {
    pub fn char_len(&self) -> usize {
        char_len(&self.text)
    }
}

/// Normalises text and cuts it into bounded chunks.
pub struct TextChunker {
    max_length: usize,
    preprocessor: Option<Box<dyn TextPreprocess>>,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self { max_length: DEFAULT_MAX_LENGTH, preprocessor: None }
    }
}

impl fmt::Debug for TextChunker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextChunker")
            .field("max_length", &self.max_length)
            .field("preprocessor", &self.preprocessor.is_some())
            .finish()
    }
}

impl TextChunker {
    pub fn new(max_length: usize) -> Self {
        Self { max_length: max_length.max(1), preprocessor: None }
    }

    /// Run `preprocessor` ahead of the built-in cleanup.
    pub fn with_preprocessor(mut self, preprocessor: impl TextPreprocess + 'static) -> Self {
        self.preprocessor = Some(Box::new(preprocessor));
        self
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Clean `text` for synthesis.  Empty input yields an empty string.
    pub fn normalize(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }
        let text = match &self.preprocessor {
            Some(p) => p.preprocess(text),
            None => text.to_string(),
        };
        let text = strip_disallowed(&text);
        let text = expand_abbreviations(&text);
        collapse_whitespace(&text)
    }

    /// Normalise and split `text` into ordered chunks.
    ///
    /// Sentences are packed greedily.  Text without any sentence boundary is
    /// sliced every `max_length` chars, possibly mid-word.
    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let normalized = self.normalize(text);
        if normalized.is_empty() {
            return Vec::new();
        }

        let pieces = if char_len(&normalized) <= self.max_length {
            vec![normalized]
        } else {
            let sentences = split_sentences(&normalized);
            if sentences.len() <= 1 {
                fixed_width(&normalized, self.max_length)
            } else {
                pack_sentences(sentences, self.max_length)
            }
        };

        pieces
            .into_iter()
            .enumerate()
            .map(|(i, text)| TextChunk { index: i + 1, text })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[TextChunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_normalize_whitespace() {
        let c = TextChunker::default();
        assert_eq!(c.normalize("  Hello   world  "), "Hello world");
        assert_eq!(c.normalize("a\n\tb"), "a b");
    }

    #[test]
    fn test_normalize_empty() {
        let c = TextChunker::default();
        assert_eq!(c.normalize(""), "");
        assert_eq!(c.normalize("   "), "");
    }

    #[test]
    fn test_normalize_keeps_non_latin_letters() {
        let c = TextChunker::default();
        assert_eq!(c.normalize("  Xin   chào  "), "Xin chào");
        assert!(c.normalize("Hôm nay trời đẹp").contains("đẹp"));
    }

    #[test]
    fn test_normalize_strips_symbols() {
        let c = TextChunker::default();
        assert_eq!(c.normalize("Price: 5 @ #home & (ok)!"), "Price: 5 home (ok)!");
        assert_eq!(c.normalize(r#"She said "hi" - it's fine."#), r#"She said "hi" - it's fine."#);
    }

    #[test]
    fn test_expand_abbreviations() {
        assert_eq!(expand_abbreviations("Dr. Smith met Mrs. Jones"), "Doctor Smith met Missus Jones");
        assert_eq!(expand_abbreviations("DR. who vs. them"), "Doctor who versus them");
        assert_eq!(expand_abbreviations("Mr.Brown"), "Mr.Brown");
        assert_eq!(expand_abbreviations("Drive home"), "Drive home");
    }

    #[test]
    fn test_abbreviation_does_not_split_sentence() {
        let c = TextChunker::default();
        assert_eq!(split_sentences(&c.normalize("Ask Dr. Who. Then leave.")).len(), 2);
    }

    #[test]
    fn test_split_sentences() {
        let s = split_sentences("First one. Second one! Third?? Last");
        assert_eq!(s, vec!["First one", "Second one", "Third", "Last"]);
        assert!(split_sentences("").is_empty());
        assert_eq!(split_sentences("No break.here"), vec!["No break.here"]);
    }

    #[test]
    fn test_chunk_empty() {
        assert!(TextChunker::new(10).chunk("").is_empty());
        assert!(TextChunker::new(10).chunk(" \n ").is_empty());
    }

    #[test]
    fn test_chunk_short_is_single() {
        let c = TextChunker::default();
        let chunks = c.chunk("  Hello   world.  ");
        assert_eq!(chunks, vec![TextChunk { index: 1, text: "Hello world.".into() }]);
    }

    #[test]
    fn test_chunk_packs_sentences_within_bound() {
        let c = TextChunker::new(40);
        let text = "The first sentence is here. The second one follows. And a third one ends it.";
        let chunks = c.chunk(text);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.char_len() <= 40, "{:?}", chunk);
        }
        let indices: Vec<usize> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, (1..=chunks.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_chunk_reconstructs_sentences() {
        let c = TextChunker::new(30);
        let text = "Alpha beta gamma. Delta epsilon zeta. Eta theta iota. Kappa.";
        let chunks = c.chunk(text);
        let rejoined = texts(&chunks).join(SENTENCE_JOIN);
        assert_eq!(rejoined, split_sentences(&c.normalize(text)).join(SENTENCE_JOIN));
    }

    #[test]
    fn test_chunk_fixed_width_fallback() {
        let c = TextChunker::new(100);
        let text = "A".repeat(1000);
        let chunks = c.chunk(&text);
        assert_eq!(chunks.len(), 10);
        assert!(chunks.iter().all(|c| c.char_len() == 100));
        assert_eq!(texts(&chunks).concat(), text);
    }

    #[test]
    fn test_chunk_fixed_width_counts_chars() {
        let c = TextChunker::new(3);
        let chunks = c.chunk("\u{e9}\u{e8}\u{ea}\u{e9}\u{e8}\u{ea}\u{e9}");
        assert_eq!(texts(&chunks), vec!["\u{e9}\u{e8}\u{ea}", "\u{e9}\u{e8}\u{ea}", "\u{e9}"]);
    }

    #[test]
    fn test_chunk_oversized_sentence_kept_whole() {
        let c = TextChunker::new(20);
        let long = "This sentence is clearly longer than twenty characters";
        let chunks = c.chunk(&format!("Short one. {long}. Tail."));
        assert_eq!(texts(&chunks), vec!["Short one", long, "Tail."]);
    }

    struct Shout;
    impl TextPreprocess for Shout {
        fn preprocess(&self, text: &str) -> String {
            text.to_uppercase()
        }
    }

    #[test]
    fn test_preprocessor_runs_first() {
        let c = TextChunker::default().with_preprocessor(Shout);
        assert_eq!(c.normalize("dr. no"), "Doctor NO");
    }
}
