//! Stemming capability used by the normalizer.
//!
//! The rest of the crate only sees [`Stemmer`]; switching the target language
//! means handing a different implementation to
//! [`Normalizer`](crate::tokenizer::Normalizer).

use lazy_static::lazy_static;
use rust_stemmers::Algorithm;
use std::borrow::Cow;
use std::collections::HashSet;

/// Reduces a single lowercase token to its root form.
pub trait Stemmer: Send + Sync {
    fn stem<'a>(&self, term: &'a str) -> Cow<'a, str>;
}

/// Leaves every token untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityStemmer;

impl Stemmer for IdentityStemmer {
    fn stem<'a>(&self, term: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(term)
    }
}

/// Snowball stemmers for the languages `rust_stemmers` ships.
pub struct SnowballStemmer {
    inner: rust_stemmers::Stemmer,
}

impl SnowballStemmer {
    pub fn new(algorithm: Algorithm) -> Self {
        Self { inner: rust_stemmers::Stemmer::create(algorithm) }
    }
}

impl Stemmer for SnowballStemmer {
    fn stem<'a>(&self, term: &'a str) -> Cow<'a, str> {
        self.inner.stem(term)
    }
}

lazy_static! {
    /// Roots whose leading or trailing letters look like affixes but are not.
    static ref PROTECTED_ROOTS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "alergi","antibiotik","bakteri","diabetes","diare","dispepsia","hipertensi",
            "infeksi","kelenjar","kepala","keringat","keseleo","ketombe","menstruasi",
            "migrain","pernah","sariawan","terapi","vitamin",
        ];
        words.iter().copied().collect()
    };
}

const PARTICLES: &[&str] = &["kah", "lah", "tah", "pun"];
const POSSESSIVES: &[&str] = &["nya", "ku", "mu"];
const DERIVATIONAL: &[&str] = &["kan", "an", "i"];

/// Prefix families; used to reject prefix/suffix pairs the language does not form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prefix {
    Me,
    Pe,
    Di,
    Ter,
    Ke,
    Ber,
    Per,
}

/// Rule-based affix stripper for Bahasa Indonesia.
///
/// Follows the Porter-style scheme for Indonesian: particles, then possessive
/// pronouns, then first-order prefixes (`meng-`, `di-`, `ter-`, `ke-`, ...)
/// with the nasal sound changes undone, then derivational suffixes, then
/// second-order prefixes (`ber-`, `per-`). A step only applies while the word
/// still has more than two syllables.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndonesianStemmer;

impl Stemmer for IndonesianStemmer {
    fn stem<'a>(&self, term: &'a str) -> Cow<'a, str> {
        let stemmed = stem_indonesian(term);
        if stemmed == term {
            Cow::Borrowed(term)
        } else {
            Cow::Owned(stemmed)
        }
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn syllables(word: &str) -> usize {
    word.chars().filter(|c| is_vowel(*c)).count()
}

fn acceptable(stem: &str) -> bool {
    stem.chars().count() >= 3 && syllables(stem) > 0
}

fn stem_indonesian(word: &str) -> String {
    if PROTECTED_ROOTS.contains(word) || !word.chars().all(|c| c.is_ascii_lowercase()) {
        return word.to_string();
    }
    let mut w = word.to_string();
    for set in [PARTICLES, POSSESSIVES] {
        if let Some(rest) = strip_inflection(&w, set) {
            w = rest;
        }
        if PROTECTED_ROOTS.contains(w.as_str()) {
            return w;
        }
    }

    match strip_first_order(&w) {
        Some((family, rest)) => {
            w = rest;
            if PROTECTED_ROOTS.contains(w.as_str()) {
                return w;
            }
            if let Some(rest) = strip_derivational(&w, Some(family)) {
                w = rest;
            }
            if let Some((_, rest)) = strip_second_order(&w) {
                w = rest;
            }
        }
        None => {
            let mut family = None;
            if let Some((f, rest)) = strip_second_order(&w) {
                w = rest;
                family = Some(f);
            }
            if let Some(rest) = strip_derivational(&w, family) {
                w = rest;
            }
        }
    }
    w
}

fn strip_inflection(word: &str, suffixes: &[&str]) -> Option<String> {
    if syllables(word) <= 2 {
        return None;
    }
    suffixes
        .iter()
        .filter_map(|s| word.strip_suffix(s))
        .find(|rest| acceptable(rest))
        .map(str::to_string)
}

fn disallowed(prefix: Prefix, suffix: &str) -> bool {
    matches!(
        (prefix, suffix),
        (Prefix::Ber, "i")
            | (Prefix::Di, "an")
            | (Prefix::Ke, "i")
            | (Prefix::Ke, "kan")
            | (Prefix::Me, "an")
            | (Prefix::Ter, "an")
    )
}

fn strip_derivational(word: &str, prefix: Option<Prefix>) -> Option<String> {
    if syllables(word) <= 2 {
        return None;
    }
    for suffix in DERIVATIONAL {
        if prefix.is_some_and(|p| disallowed(p, suffix)) {
            continue;
        }
        if let Some(rest) = word.strip_suffix(suffix) {
            if acceptable(rest) {
                return Some(rest.to_string());
            }
        }
    }
    None
}

/// Undoes the nasal assimilation of `me-`/`pe-` prefixes.
fn strip_nasal(rest: &str, family: Prefix, nasal: &str) -> Option<(Prefix, String)> {
    let first = rest.chars().next()?;
    let restored = match nasal {
        "ng" => rest.to_string(),
        "ny" if is_vowel(first) => format!("s{rest}"),
        "m" if is_vowel(first) => format!("p{rest}"),
        "m" if matches!(first, 'b' | 'f' | 'p' | 'v') => rest.to_string(),
        "n" if is_vowel(first) => format!("t{rest}"),
        "n" if matches!(first, 'c' | 'd' | 'j' | 's' | 'z') => rest.to_string(),
        "" if liquid_then_vowel(rest) => rest.to_string(),
        _ => return None,
    };
    acceptable(&restored).then_some((family, restored))
}

fn liquid_then_vowel(rest: &str) -> bool {
    let mut chars = rest.chars();
    matches!(chars.next(), Some('l' | 'r' | 'w' | 'y')) && chars.next().is_some_and(is_vowel)
}

fn strip_first_order(word: &str) -> Option<(Prefix, String)> {
    if syllables(word) <= 2 {
        return None;
    }
    for (head, family) in [("me", Prefix::Me), ("pe", Prefix::Pe)] {
        if let Some(after) = word.strip_prefix(head) {
            // longest nasal first: ng, ny, m, n, then bare
            for nasal in ["ng", "ny", "m", "n", ""] {
                if let Some(rest) = after.strip_prefix(nasal) {
                    if let Some(found) = strip_nasal(rest, family, nasal) {
                        return Some(found);
                    }
                }
            }
        }
    }
    for (head, family) in [("di", Prefix::Di), ("ter", Prefix::Ter), ("ke", Prefix::Ke)] {
        if let Some(rest) = word.strip_prefix(head) {
            if acceptable(rest) {
                return Some((family, rest.to_string()));
            }
        }
    }
    None
}

fn strip_second_order(word: &str) -> Option<(Prefix, String)> {
    if syllables(word) <= 2 {
        return None;
    }
    for (head, family) in [("ber", Prefix::Ber), ("per", Prefix::Per)] {
        if let Some(rest) = word.strip_prefix(head) {
            if acceptable(rest) {
                return Some((family, rest.to_string()));
            }
        }
    }
    None
}
