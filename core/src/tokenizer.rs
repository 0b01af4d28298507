use crate::stemmer::{IndonesianStemmer, Stemmer};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"\p{L}+").expect("valid regex");
    static ref DEFAULT: Normalizer = Normalizer::default();
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "ada","adalah","adanya","agak","agar","akan","aku","amat","anda","antara","apa","apabila","apakah","atas","atau",
            "bagai","bagaimana","bagi","bahkan","bahwa","banyak","baru","beberapa","begitu","belum","benar","berapa","biasa","biasanya","bila","bisa","boleh","bukan",
            "cukup","dahulu","dalam","dan","dapat","dari","daripada","demikian","dengan","di","dia","digunakan","dong",
            "harus","hal","hampir","hanya","hingga","ia","ialah","ini","itu","jadi","jika","juga","jangan",
            "kalau","kali","kami","kamu","kan","karena","kata","ke","kecuali","kemudian","kenapa","kepada","ketika","kita",
            "lagi","lain","lalu","lebih","maka","mana","masih","masing","mau","melalui","memang","mereka","merupakan","meski","mungkin",
            "namun","nanti","oleh","pada","para","perlu","pernah","pula","pun","saat","saja","sama","sambil","sampai","sangat","saya",
            "se","sebab","sebagai","sebelum","sedang","sedangkan","sehingga","sejak","selain","selalu","selama","seluruh","semua","sendiri",
            "seperti","serta","sesudah","setelah","setiap","sudah","supaya","tanpa","tapi","telah","tentang","terhadap","termasuk","tersebut",
            "tetapi","tiap","tidak","untuk","walau","yaitu","yakni","yang",
            // dosage forms and units
            "mg","ml","gram","tablet","kapsul","sirup","per",
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Tokens and stems shorter than this many characters are dropped.
    pub min_token_len: usize,
    pub remove_stopwords: bool,
    pub stem: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self { min_token_len: 3, remove_stopwords: true, stem: true }
    }
}

/// Turns raw text into the canonical term sequence shared by documents and queries.
#[derive(Clone)]
pub struct Normalizer {
    config: NormalizerConfig,
    stemmer: Arc<dyn Stemmer>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::default(), Arc::new(IndonesianStemmer))
    }
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Normalizer {
    pub fn new(config: NormalizerConfig, stemmer: Arc<dyn Stemmer>) -> Self {
        Self { config, stemmer }
    }

    pub fn config(&self) -> &NormalizerConfig { &self.config }

    /// Fold case and diacritics, split on non-letters, drop stopwords and short
    /// tokens, then stem. Empty input yields an empty sequence.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let folded: String = text
            .nfkd()
            .filter(|c| !is_combining_mark(*c))
            .collect::<String>()
            .to_lowercase();
        let min = self.config.min_token_len;
        let mut terms = Vec::new();
        for mat in RE.find_iter(&folded) {
            let token = mat.as_str();
            if token.chars().count() < min { continue; }
            if self.config.remove_stopwords && is_stopword(token) { continue; }
            let term = if self.config.stem { self.stemmer.stem(token).into_owned() } else { token.to_string() };
            if term.chars().count() < min { continue; }
            terms.push(term);
        }
        terms
    }
}

/// Normalize with the default Indonesian configuration.
pub fn normalize(text: &str) -> Vec<String> {
    DEFAULT.normalize(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stemmer::IdentityStemmer;

    #[test]
    fn basic_normalize() {
        let t = normalize("Meredakan demam dan nyeri ringan, seperti sakit kepala!");
        assert_eq!(t, vec!["reda", "demam", "nyeri", "ringan", "sakit", "kepala"]);
    }

    #[test]
    fn digits_split_tokens() {
        let t = normalize("Paracetamol 500mg tablet");
        assert_eq!(t, vec!["paracetamol"]);
    }

    #[test]
    fn switches_can_be_disabled() {
        let cfg = NormalizerConfig { min_token_len: 1, remove_stopwords: false, stem: false };
        let n = Normalizer::new(cfg, Arc::new(IdentityStemmer));
        assert_eq!(n.normalize("dan Meredakan"), vec!["dan", "meredakan"]);
    }
}
