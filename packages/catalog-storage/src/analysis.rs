//! French analysis chain shared by indexing and querying: word segmentation, lowercase,
//! elision, diacritic folding, synonym contraction, stop words, light stemming.

use std::collections::HashSet;

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use unicode_segmentation::UnicodeSegmentation;

pub const ELISION_ARTICLES: [&str; 13] =
	["l", "m", "t", "qu", "n", "s", "j", "d", "c", "jusqu", "quoiqu", "lorsqu", "puisqu"];

// Folded forms.
const FRENCH_STOP_WORDS: &[&str] = &[
	"a", "ai", "au", "aux", "avec", "c", "ce", "ces", "d", "dans", "de", "des", "du", "elle", "en",
	"es", "est", "et", "eux", "il", "ils", "j", "je", "l", "la", "le", "les", "leur", "lui", "m",
	"ma", "mais", "me", "meme", "mes", "moi", "mon", "n", "ne", "nos", "notre", "nous", "on", "ont",
	"ou", "par", "pas", "pour", "qu", "que", "qui", "s", "sa", "se", "ses", "son", "sont", "sur",
	"t", "ta", "te", "tes", "toi", "ton", "tu", "un", "une", "vos", "votre", "vous", "y",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
	pub term: String,
	pub position: usize,
}

#[derive(Debug, Clone)]
struct SynonymRule {
	pattern: Vec<String>,
	canonical: String,
}

#[derive(Debug, Clone)]
pub struct Analyzer {
	synonyms: Vec<SynonymRule>,
	stop_words: HashSet<&'static str>,
}
impl Analyzer {
	/// Each rule is a comma-separated list of equivalent terms or phrases. Every alternative is
	/// contracted to the first one, at index and query time alike.
	pub fn french(rules: &[String]) -> Self {
		let mut synonyms = Vec::new();

		for rule in rules {
			let alternatives: Vec<Vec<String>> = rule
				.split(',')
				.map(normalize_words)
				.filter(|words| !words.is_empty())
				.collect();
			let Some(first) = alternatives.first() else { continue };
			let canonical = first.join("_");

			for pattern in &alternatives {
				synonyms
					.push(SynonymRule { pattern: pattern.clone(), canonical: canonical.clone() });
			}
		}

		// Longest pattern first so multi-word alternatives win over their prefixes.
		synonyms.sort_by(|a, b| b.pattern.len().cmp(&a.pattern.len()));

		Self { synonyms, stop_words: FRENCH_STOP_WORDS.iter().copied().collect() }
	}

	pub fn analyze(&self, text: &str) -> Vec<Token> {
		let words = normalize_words(text);
		let mut out = Vec::with_capacity(words.len());
		let mut position = 0_usize;
		let mut idx = 0_usize;

		while idx < words.len() {
			let (term, consumed) = match self.match_synonym(&words[idx..]) {
				Some(rule) => (rule.canonical.clone(), rule.pattern.len()),
				None => (words[idx].clone(), 1),
			};

			if !self.stop_words.contains(term.as_str()) {
				out.push(Token { term: light_stem(&term), position });
			}

			position += 1;
			idx += consumed;
		}

		out
	}

	pub fn terms(&self, text: &str) -> Vec<String> {
		self.analyze(text).into_iter().map(|token| token.term).collect()
	}

	fn match_synonym(&self, words: &[String]) -> Option<&SynonymRule> {
		self.synonyms.iter().find(|rule| {
			rule.pattern.len() <= words.len() && rule.pattern.iter().zip(words).all(|(a, b)| a == b)
		})
	}
}

pub fn fold(text: &str) -> String {
	text.nfd().filter(|ch| !is_combining_mark(*ch)).collect()
}

/// Light plural and feminine stripping. Operates on folded, lowercase terms.
pub fn light_stem(term: &str) -> String {
	let mut chars: Vec<char> = term.chars().collect();

	if chars.len() > 4 && ends_with(&chars, "eaux") {
		chars.pop();

		return chars.into_iter().collect();
	}
	if chars.len() > 5 && ends_with(&chars, "aux") {
		chars.truncate(chars.len() - 3);
		chars.extend(['a', 'l']);

		return chars.into_iter().collect();
	}
	if chars.len() > 3 && matches!(chars.last(), Some('s' | 'x')) && !ends_with(&chars, "ss") {
		chars.pop();
	}
	if chars.len() > 4 && chars.last() == Some(&'e') {
		chars.pop();
	}

	chars.into_iter().collect()
}

fn normalize_words(text: &str) -> Vec<String> {
	text.unicode_words().filter_map(normalize_word).collect()
}

fn normalize_word(word: &str) -> Option<String> {
	let lowered = word.to_lowercase();
	let elided = strip_elision(&lowered);
	let folded = fold(elided);

	if folded.is_empty() { None } else { Some(folded) }
}

fn strip_elision(word: &str) -> &str {
	let Some((idx, apostrophe)) =
		word.char_indices().find(|(_, ch)| matches!(ch, '\'' | '\u{2019}'))
	else {
		return word;
	};
	let prefix = &word[..idx];

	if ELISION_ARTICLES.contains(&prefix) { &word[idx + apostrophe.len_utf8()..] } else { word }
}

fn ends_with(chars: &[char], suffix: &str) -> bool {
	let suffix: Vec<char> = suffix.chars().collect();

	chars.len() >= suffix.len() && chars[chars.len() - suffix.len()..] == suffix[..]
}

#[cfg(test)]
mod tests {
	use super::*;

	fn analyzer() -> Analyzer {
		Analyzer::french(&catalog_config::default_synonyms())
	}

	#[test]
	fn drops_punctuation_and_stop_words_but_keeps_positions() {
		let tokens = analyzer().analyze("A - Hello AMD world!");

		assert_eq!(
			tokens,
			vec![
				Token { term: "hello".to_string(), position: 1 },
				Token { term: "amd".to_string(), position: 2 },
				Token { term: "world".to_string(), position: 3 },
			]
		);
	}

	#[test]
	fn contracts_synonyms_to_canonical_term() {
		let analyzer = analyzer();

		assert_eq!(analyzer.terms("AMDAC"), vec!["amd"]);
		assert_eq!(analyzer.terms("Administrateur ministériel des données"), vec!["amd"]);
		assert_eq!(analyzer.terms("la loi de finance"), vec!["lolf"]);
		assert_eq!(analyzer.terms("découpage communal"), vec!["contour", "communal"]);
	}

	#[test]
	fn strips_elision_and_folds_diacritics() {
		let analyzer = analyzer();

		assert_eq!(analyzer.terms("L'état"), vec!["etat"]);
		assert_eq!(analyzer.terms("jusqu\u{2019}ici"), vec!["ici"]);
		assert_eq!(analyzer.terms("aujourd'hui"), vec!["aujourd'hui"]);
	}

	#[test]
	fn light_stemming_normalizes_plural_and_feminine_forms() {
		assert_eq!(light_stem("donnees"), "donne");
		assert_eq!(light_stem("donnee"), "donne");
		assert_eq!(light_stem("chevaux"), "cheval");
		assert_eq!(light_stem("bureaux"), "bureau");
		assert_eq!(light_stem("adresses"), light_stem("adresse"));
		assert_eq!(light_stem("classe"), "class");
		assert_eq!(light_stem("amd"), "amd");
	}

	#[test]
	fn empty_and_stop_only_text_yield_no_tokens() {
		let analyzer = analyzer();

		assert!(analyzer.analyze("").is_empty());
		assert!(analyzer.analyze("le de la").is_empty());
	}
}
