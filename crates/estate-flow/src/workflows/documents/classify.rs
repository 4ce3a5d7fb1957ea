use std::path::Path;

/// Filename fragments that identify an item without containing its name.
const ALIASES: &[(&str, &str)] = &[
    ("grundbuch", "Grundbuchauszug"),
    ("energiepass", "Energieausweis"),
    ("energycertificate", "Energieausweis"),
    ("floorplan", "Grundriss"),
    ("teilungserkl", "Teilungserklärung"),
    ("etvprotokoll", "Eigentümerprotokolle"),
    ("kaufvertrag", "Kaufvertragsentwurf"),
    ("reservierung", "Reservierungsvereinbarung"),
];

const MIN_MATCH_LEN: usize = 4;

/// Lowercase, fold umlauts and keep ASCII alphanumerics only.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars().flat_map(char::to_lowercase) {
        match c {
            'ä' => out.push_str("ae"),
            'ö' => out.push_str("oe"),
            'ü' => out.push_str("ue"),
            'ß' => out.push_str("ss"),
            c if c.is_ascii_alphanumeric() => out.push(c),
            _ => {}
        }
    }
    out
}

/// Matches attachment filenames to checklist item names.
#[derive(Debug, Clone)]
pub struct AttachmentClassifier {
    aliases: Vec<(String, String)>,
}

impl Default for AttachmentClassifier {
    fn default() -> Self {
        Self {
            aliases: ALIASES
                .iter()
                .map(|(alias, item)| (alias.to_string(), item.to_string()))
                .collect(),
        }
    }
}

impl AttachmentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Best candidate for `filename`; the longest matching fragment wins and
    /// ties go to the earlier candidate.
    pub fn classify<'a>(&self, filename: &str, candidates: &[&'a str]) -> Option<&'a str> {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(filename);
        let stem = normalize(stem);

        let mut best: Option<(usize, &'a str)> = None;
        for candidate in candidates {
            let name = normalize(candidate);
            let mut score = 0;
            if name.len() >= MIN_MATCH_LEN && stem.contains(&name) {
                score = name.len();
            }
            for (alias, item) in &self.aliases {
                if item == candidate && stem.contains(alias.as_str()) {
                    score = score.max(alias.len());
                }
            }
            if score > 0 && best.map_or(true, |(top, _)| score > top) {
                best = Some((score, *candidate));
            }
        }
        best.map(|(_, candidate)| candidate)
    }
}

/// Content type reported by the connector, or guessed from the extension.
pub fn declared_type(filename: &str, content_type: Option<&str>) -> String {
    match content_type.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value.to_ascii_lowercase(),
        None => mime_guess::from_path(filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}
