use super::domain::ExceptionKind;

const POWER_OF_ATTORNEY_STEMS: &[&str] = &["vollmacht"];
const POWER_OF_ATTORNEY_PHRASES: &[&str] = &[
    "power of attorney",
    "authorization letter",
    "letter of authority",
];

const FEE_STEMS: &[&str] = &["gebühr", "gebuehr", "kostenpflichtig", "vorkasse"];
const FEE_TOKENS: &[&str] = &["fee", "fees"];
const FEE_PREFIXES: &[&str] = &["invoice", "rechnung"];
const FEE_PHRASES: &[&str] = &["payment required"];

const REROUTE_PHRASES: &[&str] = &[
    "wenden sie sich an",
    "nicht zuständig",
    "zuständig ist",
    "not responsible",
    "please contact",
    "bitte kontaktieren",
];

/// Keyword heuristics over German and English replies.
#[derive(Debug, Clone, Default)]
pub struct ExceptionDetector;

impl ExceptionDetector {
    pub fn new() -> Self {
        Self
    }

    /// Detected conditions in `subject` and `body`, at most one per kind, in
    /// the order power of attorney, fee, reroute.
    pub fn detect(&self, subject: &str, body: &str, sender: &str) -> Vec<ExceptionKind> {
        let text = format!("{subject}\n{body}");
        let tokens = tokenize(&text);
        let mut found = Vec::new();

        if contains_stem(&tokens, POWER_OF_ATTORNEY_STEMS)
            || contains_phrase(&tokens, POWER_OF_ATTORNEY_PHRASES)
        {
            found.push(ExceptionKind::PowerOfAttorneyRequired);
        }

        let fee = contains_stem(&tokens, FEE_STEMS)
            || tokens.iter().any(|token| FEE_TOKENS.contains(&token.as_str()))
            || tokens
                .iter()
                .any(|token| FEE_PREFIXES.iter().any(|prefix| token.starts_with(prefix)))
            || contains_phrase(&tokens, FEE_PHRASES);
        if fee {
            found.push(ExceptionKind::FeeRequired {
                amount: extract_amount(&text),
            });
        }

        if contains_phrase(&tokens, REROUTE_PHRASES) {
            found.push(ExceptionKind::Reroute {
                suggested_contact: extract_contact(&text, sender),
            });
        }

        found
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn contains_stem(tokens: &[String], stems: &[&str]) -> bool {
    tokens
        .iter()
        .any(|token| stems.iter().any(|stem| token.contains(stem)))
}

fn contains_phrase(tokens: &[String], phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| {
        let words: Vec<&str> = phrase.split(' ').collect();
        tokens
            .windows(words.len())
            .any(|window| window.iter().zip(&words).all(|(token, word)| token == word))
    })
}

fn is_amount(word: &str) -> bool {
    word.chars().any(|c| c.is_ascii_digit())
        && word
            .chars()
            .all(|c| c.is_ascii_digit() || c == ',' || c == '.')
}

fn trim_punctuation(word: &str) -> &str {
    word.trim_matches(|c: char| matches!(c, '(' | ')' | ':' | ';' | '!' | '?' | '"' | '\''))
        .trim_end_matches(['.', ','])
}

/// First amount written next to `€`, `EUR` or `Euro`, normalized to `<n> EUR`.
fn extract_amount(text: &str) -> Option<String> {
    let words: Vec<&str> = text.split_whitespace().map(trim_punctuation).collect();

    for (index, word) in words.iter().enumerate() {
        let lower = word.to_lowercase();
        let is_currency = matches!(lower.as_str(), "€" | "eur" | "euro");
        let glued = lower.contains('€') && !is_currency;

        if glued {
            let number = word.trim_matches('€');
            if is_amount(number) {
                return Some(format!("{number} EUR"));
            }
        }

        if is_currency || glued {
            let neighbours = [
                index.checked_sub(1).and_then(|i| words.get(i)),
                words.get(index + 1),
            ];
            if let Some(number) = neighbours.into_iter().flatten().find(|w| is_amount(w)) {
                return Some(format!("{number} EUR"));
            }
        }
    }
    None
}

/// First address in `text` that is not the sender's own.
fn extract_contact(text: &str, sender: &str) -> Option<String> {
    let sender = sender.trim().to_lowercase();
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| {
                matches!(c, '<' | '>' | '(' | ')' | '[' | ']' | ',' | ';' | ':' | '"' | '\'')
            })
            .trim_end_matches(['.', '!', '?'])
        })
        .filter(|word| {
            word.split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
        })
        .map(str::to_lowercase)
        .find(|address| !sender.contains(address.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENDER: &str = "verwaltung@hv-schmidt.de";

    fn detect(body: &str) -> Vec<ExceptionKind> {
        ExceptionDetector::new().detect("Re: Unterlagen", body, SENDER)
    }

    #[test]
    fn fee_demand_extracts_amount() {
        let found = detect("Die Teilungserklärung ist kostenpflichtig, die Gebühr beträgt 45,00 € vorab.");
        assert_eq!(
            found,
            vec![ExceptionKind::FeeRequired {
                amount: Some("45,00 EUR".to_string())
            }]
        );

        let english = detect("A processing fee of EUR 30 applies, payment required before release.");
        assert_eq!(
            english,
            vec![ExceptionKind::FeeRequired {
                amount: Some("30 EUR".to_string())
            }]
        );
    }

    #[test]
    fn power_of_attorney_in_both_languages() {
        assert_eq!(
            detect("Bitte senden Sie uns eine Eigentümervollmacht."),
            vec![ExceptionKind::PowerOfAttorneyRequired]
        );
        assert_eq!(
            detect("We need a signed power of attorney first."),
            vec![ExceptionKind::PowerOfAttorneyRequired]
        );
    }

    #[test]
    fn reroute_suggests_other_contact_but_not_the_sender() {
        let found = detect(
            "Wir sind nicht zuständig. Wenden Sie sich an grundbuch@amtsgericht-mitte.de \
             oder antworten Sie an verwaltung@hv-schmidt.de.",
        );
        assert_eq!(
            found,
            vec![ExceptionKind::Reroute {
                suggested_contact: Some("grundbuch@amtsgericht-mitte.de".to_string())
            }]
        );
    }

    #[test]
    fn multiple_conditions_raise_one_exception_each() {
        let found = detect(
            "Gegen Vorlage einer Vollmacht und eine Gebühr von 20 EUR. Die Gebühr ist vorab fällig.",
        );
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], ExceptionKind::PowerOfAttorneyRequired);
        assert!(matches!(found[1], ExceptionKind::FeeRequired { amount: Some(ref a) } if a == "20 EUR"));
    }

    #[test]
    fn neutral_reply_raises_nothing() {
        assert!(detect("Vielen Dank, wir melden uns nächste Woche mit den Unterlagen.").is_empty());
        // "Berechnung" must not read as an invoice.
        assert!(detect("Die Berechnung der Rücklage folgt.").is_empty());
    }
}
