/// Caractères `atext` autorisés en plus des alphanumériques ASCII (RFC 5322).
const ATEXT_SPECIALS: &str = "!#$%&'*+-/=?^_`{|}~";

fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric() || ATEXT_SPECIALS.contains(c)
}

/// Règles strictes: dot-atom, chaque atome non vide (donc pas de '.' initial,
/// terminal ni de "..").
pub(crate) fn is_local_strict(s: &str) -> bool {
    !s.is_empty()
        && s
            .split('.')
            .all(|atom| !atom.is_empty() && atom.chars().all(is_atext))
}

/// Règles relaxed: accepte en plus une quoted-string simple (ASCII imprimable,
/// `\` échappe le caractère suivant).
pub(crate) fn is_local_relaxed(s: &str) -> bool {
    match s.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
        Some(inner) if s.len() >= 2 => is_quoted_content(inner),
        _ => is_local_strict(s),
    }
}

fn is_quoted_content(inner: &str) -> bool {
    let mut escaped = false;
    for c in inner.chars() {
        if !(c == ' ' || c.is_ascii_graphic()) {
            return false;
        }
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            return false;
        }
    }
    !escaped
}
