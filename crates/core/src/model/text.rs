use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Locale used when the requested locale has no translation.
pub const FALLBACK_LOCALE: &str = "en";

/// Title or description text as delivered by the query layer.
///
/// Rows carry either a single string or a `locale -> text` map; both shapes
/// deserialize into this type and serialize back in the same shape. Untranslated
/// locales arrive as `null` entries and are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LocalizedText {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawText {
    Plain(String),
    Localized(BTreeMap<String, Option<String>>),
}

impl<'de> Deserialize<'de> for LocalizedText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawText::deserialize(deserializer)? {
            RawText::Plain(text) => Self::Plain(text),
            RawText::Localized(map) => Self::Localized(
                map.into_iter()
                    .filter_map(|(locale, text)| Some((locale, text?)))
                    .collect(),
            ),
        })
    }
}

impl Default for LocalizedText {
    fn default() -> Self {
        Self::Plain(String::new())
    }
}

impl LocalizedText {
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain(text.into())
    }

    /// Build a localized value from `(locale, text)` pairs.
    #[must_use]
    pub fn localized<L, T>(entries: impl IntoIterator<Item = (L, T)>) -> Self
    where
        L: Into<String>,
        T: Into<String>,
    {
        Self::Localized(
            entries
                .into_iter()
                .map(|(locale, text)| (locale.into(), text.into()))
                .collect(),
        )
    }

    /// Resolve the text for `locale`.
    ///
    /// Falls back to [`FALLBACK_LOCALE`], then to the first translation, then
    /// to the empty string.
    #[must_use]
    pub fn resolve(&self, locale: &str) -> &str {
        match self {
            Self::Plain(text) => text,
            Self::Localized(map) => map
                .get(locale)
                .or_else(|| map.get(FALLBACK_LOCALE))
                .or_else(|| map.values().next())
                .map_or("", String::as_str),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Plain(text) => text.trim().is_empty(),
            Self::Localized(map) => map.values().all(|t| t.trim().is_empty()),
        }
    }
}

impl From<&str> for LocalizedText {
    fn from(value: &str) -> Self {
        Self::Plain(value.to_owned())
    }
}

impl From<String> for LocalizedText {
    fn from(value: String) -> Self {
        Self::Plain(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_resolves_for_any_locale() {
        let text = LocalizedText::plain("Intro");
        assert_eq!(text.resolve("de"), "Intro");
    }

    #[test]
    fn localized_text_falls_back_to_english_then_first() {
        let text = LocalizedText::localized([("en", "Hello"), ("pt", "Olá")]);
        assert_eq!(text.resolve("pt"), "Olá");
        assert_eq!(text.resolve("fr"), "Hello");

        let no_english = LocalizedText::localized([("es", "Hola"), ("pt", "Olá")]);
        assert_eq!(no_english.resolve("fr"), "Hola");
    }

    #[test]
    fn accepts_both_json_shapes() {
        let plain: LocalizedText = serde_json::from_str(r#""Basics""#).unwrap();
        assert_eq!(plain, LocalizedText::plain("Basics"));

        let map: LocalizedText = serde_json::from_str(r#"{"en":"Basics","pt":"Básico"}"#).unwrap();
        assert_eq!(map.resolve("pt"), "Básico");
    }

    #[test]
    fn untranslated_locales_are_dropped() {
        let text: LocalizedText = serde_json::from_str(r#"{"en":"x","pt":null}"#).unwrap();
        assert_eq!(text, LocalizedText::localized([("en", "x")]));
        assert_eq!(text.resolve("pt"), "x");

        let only_null: LocalizedText = serde_json::from_str(r#"{"pt":null}"#).unwrap();
        assert!(only_null.is_empty());
        assert_eq!(serde_json::to_string(&text).unwrap(), r#"{"en":"x"}"#);
    }

    #[test]
    fn empty_map_is_empty() {
        let text = LocalizedText::Localized(BTreeMap::new());
        assert!(text.is_empty());
        assert_eq!(text.resolve("en"), "");
    }
}
