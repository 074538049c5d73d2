//! English pluralization following Rails' inflector tables.

use std::sync::LazyLock;

use regex::Regex;

/// Plural rules in priority order: the first match wins.
const PLURAL_RULES: &[(&str, &str)] = &[
    // irregular
    ("(m)ove$", "${1}oves"),
    ("(s)ex$", "${1}exes"),
    ("(c)hild$", "${1}hildren"),
    ("(m)an$", "${1}en"),
    ("(p)erson$", "${1}eople"),
    // regular
    ("(quiz)$", "${1}zes"),
    ("^(ox)$", "${1}en"),
    ("([m|l])ouse$", "${1}ice"),
    ("(matr|vert|ind)(?:ix|ex)$", "${1}ices"),
    ("(x|ch|ss|sh)$", "${1}es"),
    ("([^aeiouy]|qu)y$", "${1}ies"),
    ("(hive)$", "${1}s"),
    ("(?:([^f])fe|([lr])f)$", "${1}${2}ves"),
    ("sis$", "ses"),
    ("([ti])um$", "${1}a"),
    ("(buffal|tomat)o$", "${1}oes"),
    ("(bu)s$", "${1}ses"),
    ("(alias|status)$", "${1}es"),
    ("(octop|vir)us$", "${1}i"),
    ("(ax|test)is$", "${1}es"),
    ("s$", "s"),
    ("$", "s"),
];

const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
];

static PLURALS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    PLURAL_RULES
        .iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(&format!("(?i){pattern}"))
                .ok()
                .map(|re| (re, *replacement))
        })
        .collect()
});

pub fn is_uncountable(word: &str) -> bool {
    UNCOUNTABLE
        .iter()
        .any(|uncountable| uncountable.eq_ignore_ascii_case(word))
}

/// Plural form of `word`; only the trailing word of a `snake_case` phrase changes.
pub fn pluralize(word: &str) -> String {
    if is_uncountable(word) {
        return word.to_string();
    }

    PLURALS
        .iter()
        .find(|(re, _)| re.is_match(word))
        .map(|(re, replacement)| re.replace(word, *replacement).into_owned())
        .unwrap_or_else(|| word.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_words_gain_an_s() {
        assert_eq!(pluralize("vaccine"), "vaccines");
        assert_eq!(pluralize("active_ingredient"), "active_ingredients");
        assert_eq!(pluralize("status"), "statuses");
    }

    #[test]
    fn suffix_rules_apply() {
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("knife"), "knives");
        assert_eq!(pluralize("half"), "halves");
        assert_eq!(pluralize("matrix"), "matrices");
        assert_eq!(pluralize("index"), "indices");
        assert_eq!(pluralize("mouse"), "mice");
        assert_eq!(pluralize("medium"), "media");
        assert_eq!(pluralize("analysis"), "analyses");
        assert_eq!(pluralize("ox"), "oxen");
        assert_eq!(pluralize("quiz"), "quizzes");
    }

    #[test]
    fn irregulars_keep_leading_case() {
        assert_eq!(pluralize("Person"), "People");
        assert_eq!(pluralize("sales_person"), "sales_people");
        assert_eq!(pluralize("child"), "children");
    }

    #[test]
    fn uncountables_are_unchanged() {
        assert_eq!(pluralize("sheep"), "sheep");
        assert_eq!(pluralize("Equipment"), "Equipment");
    }
}
