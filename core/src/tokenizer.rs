use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub const MIN_TERM_LEN: usize = 3;
pub const MAX_TERM_LEN: usize = 20;

/// Upper bound on stemmer passes when driving a token to its fixed point.
const MAX_STEM_PASSES: usize = 8;

pub const ENGLISH_STOPWORDS: &[&str] = &[
    "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
    "be","because","been","before","being","below","between","both","but","by",
    "can","can't","cannot","could","couldn't",
    "did","didn't","do","does","doesn't","doing","don't","down","during",
    "each","few","for","from","further",
    "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
    "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
    "let's","me","more","most","mustn't","my","myself",
    "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
    "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
    "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
    "under","until","up","very",
    "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
    "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves",
];

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}_']+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref DEFAULT: Tokenizer = Tokenizer::default();
}

/// Turns free text into the normalized terms stored in the index.
///
/// The same instance must be used for ingestion and for queries, otherwise
/// query terms never line up with indexed ones.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    stopwords: HashSet<String>,
    min_len: usize,
    max_len: usize,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(ENGLISH_STOPWORDS.iter().copied(), MIN_TERM_LEN, MAX_TERM_LEN)
    }
}

impl Tokenizer {
    pub fn new<I, S>(stopwords: I, min_len: usize, max_len: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stopwords: stopwords.into_iter().map(|s| s.into().to_lowercase()).collect(),
            min_len,
            max_len,
        }
    }

    pub fn is_stopword(&self, token: &str) -> bool { self.stopwords.contains(token) }

    /// Lowercase, split into words, drop stop words, non-alphabetic and
    /// out-of-range tokens, stem, and de-duplicate (first occurrence wins).
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() { return Vec::new(); }
        let lowered = fold(text);
        let mut seen = HashSet::new();
        let mut terms = Vec::new();
        for mat in RE.find_iter(&lowered) {
            let token = mat.as_str();
            if self.is_stopword(token) { continue; }
            if !token.bytes().all(|b| b.is_ascii_lowercase()) { continue; }
            if token.len() < self.min_len || token.len() > self.max_len { continue; }
            let term = stem(token);
            if seen.insert(term.clone()) {
                terms.push(term);
            }
        }
        terms
    }
}

/// NFKD-decompose, strip combining marks and lowercase, so "Café" folds to "cafe".
fn fold(text: &str) -> String {
    text.nfkd().filter(|c| !is_combining_mark(*c)).collect::<String>().to_lowercase()
}

/// English Snowball stem, re-applied until stable so `stem(stem(x)) == stem(x)`.
pub fn stem(token: &str) -> String {
    let mut current = token.to_string();
    for _ in 0..MAX_STEM_PASSES {
        let next = STEMMER.stem(&current).into_owned();
        if next == current { break; }
        current = next;
    }
    current
}

/// Categories are controlled vocabulary: lowercased and trimmed, never stemmed.
///
/// Queries always go through [`Tokenizer::tokenize`], so a category term is only
/// reachable from a query when its stem is the word itself ("action" is, "puzzle"
/// stems to "puzzl" and is not). Keep the two paths separate; the keyword
/// reports depend on categories appearing verbatim.
pub fn category_term(category: &str) -> Option<String> {
    let term = category.trim().to_lowercase();
    if term.is_empty() { None } else { Some(term) }
}

/// Tokenize with the default English configuration.
pub fn tokenize(text: &str) -> Vec<String> {
    DEFAULT.tokenize(text)
}
