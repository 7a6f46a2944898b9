//! English inflection for model names.
//!
//! Covers the regular rules plus a short irregular table. Models whose
//! plural is not covered declare it explicitly in the schema.

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("foot", "feet"),
    ("tooth", "teeth"),
    ("ox", "oxen"),
    ("movie", "movies"),
];

const UNCOUNTABLE: &[&str] = &[
    "data",
    "equipment",
    "fish",
    "information",
    "metadata",
    "news",
    "series",
    "sheep",
    "species",
];

/// Plural form of a singular noun.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() || is_uncountable(word) {
        return word.to_string();
    }

    for (singular, plural) in IRREGULAR {
        if let Some((stem, capitalized)) = split_word_tail(word, singular) {
            return format!("{}{}", stem, with_case(plural, capitalized));
        }
    }

    if ["s", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s)) {
        return format!("{}es", word);
    }

    if let Some(stem) = word.strip_suffix('y')
        && stem.chars().last().is_some_and(|c| !is_vowel(c))
    {
        return format!("{}ies", stem);
    }

    format!("{}s", word)
}

/// Singular form of a plural noun.
pub fn singularize(word: &str) -> String {
    if word.is_empty() || is_uncountable(word) {
        return word.to_string();
    }

    for (singular, plural) in IRREGULAR {
        if let Some((stem, capitalized)) = split_word_tail(word, plural) {
            return format!("{}{}", stem, with_case(singular, capitalized));
        }
    }

    if let Some(stem) = word.strip_suffix("ies")
        && !stem.is_empty()
    {
        return format!("{}y", stem);
    }

    for suffix in ["sses", "xes", "zes", "ches", "shes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }

    if word.ends_with("ss") {
        return word.to_string();
    }

    word.strip_suffix('s').unwrap_or(word).to_string()
}

/// Lower-case the first character: `MovieCategory` becomes `movieCategory`.
pub fn camel_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u')
}

fn is_uncountable(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    UNCOUNTABLE.iter().any(|u| lower == *u)
}

// Irregulars apply to whole words and to camel-case tails ("salesPerson"),
// never to plain suffixes ("mailman").
fn split_word_tail<'a>(word: &'a str, tail: &str) -> Option<(&'a str, bool)> {
    if word.eq_ignore_ascii_case(tail) {
        let capitalized = word.chars().next().is_some_and(|c| c.is_uppercase());
        return Some(("", capitalized));
    }

    if word.len() <= tail.len() {
        return None;
    }

    let split = word.len() - tail.len();
    if !word.is_char_boundary(split) {
        return None;
    }

    let (stem, rest) = word.split_at(split);
    let starts_upper = rest.chars().next().is_some_and(|c| c.is_uppercase());
    if starts_upper && rest.eq_ignore_ascii_case(tail) {
        Some((stem, true))
    } else {
        None
    }
}

fn with_case(word: &str, capitalized: bool) -> String {
    if !capitalized {
        return word.to_string();
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
