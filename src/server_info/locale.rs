pub const FALLBACK_LANGUAGE: &str = "en_us";

/// Locale categories in the order glibc lists them in a composite name.
const CATEGORIES: [&str; 12] = [
    "LC_CTYPE",
    "LC_NUMERIC",
    "LC_TIME",
    "LC_COLLATE",
    "LC_MONETARY",
    "LC_MESSAGES",
    "LC_PAPER",
    "LC_NAME",
    "LC_ADDRESS",
    "LC_TELEPHONE",
    "LC_MEASUREMENT",
    "LC_IDENTIFICATION",
];

/// Language of the process locale, e.g. `en_us` for `en_US.UTF-8`.
pub fn current_language() -> String {
    language_from(|name| std::env::var(name).ok())
}

/// Resolves the language from a variable lookup the way
/// `setlocale(LC_ALL, "")` names the locale.
///
/// Each category takes the first non-empty of `LC_ALL`, its own variable and
/// `LANG`. When all categories agree the locale is that single name,
/// otherwise it is glibc's composite `LC_CTYPE=..;LC_NUMERIC=..;..` form.
/// The language is the locale name up to the first `.`, lower-cased.
pub fn language_from(lookup: impl Fn(&str) -> Option<String>) -> String {
    let non_empty = |name: &str| lookup(name).filter(|value| !value.is_empty());

    let mut names = Vec::with_capacity(CATEGORIES.len());
    for category in CATEGORIES {
        let name = non_empty("LC_ALL")
            .or_else(|| non_empty(category))
            .or_else(|| non_empty("LANG"))
            .unwrap_or_else(|| "C".to_string());
        if !is_locale_name(&name) {
            return FALLBACK_LANGUAGE.to_string();
        }
        // glibc reports the POSIX locale under its C alias
        names.push(if name == "POSIX" { "C".to_string() } else { name });
    }

    let locale = if names.iter().all(|name| *name == names[0]) {
        names.swap_remove(0)
    } else {
        CATEGORIES
            .iter()
            .zip(&names)
            .map(|(category, name)| format!("{category}={name}"))
            .collect::<Vec<_>>()
            .join(";")
    };

    let language = locale.split('.').next().unwrap_or_default();
    if language.is_empty() {
        return FALLBACK_LANGUAGE.to_string();
    }
    language.to_lowercase()
}

fn is_locale_name(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '@' | '-'))
}
