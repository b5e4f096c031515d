//! Contrôle syntaxique des adresses (première étape du pipeline).

mod domain;
mod local;
mod types;

pub use types::{NormalizedEmail, ValidationMode, ValidationReport};

use domain::{check_domain, normalize_domain};
use local::{is_local_relaxed, is_local_strict};

/// Limite RFC 5321 pour un chemin complet (avec '@').
const MAX_ADDRESS_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;

/// `true` si l'adresse respecte la grammaire stricte.
pub fn check_syntax(address: &str) -> bool {
    validate_email(address, ValidationMode::Strict).ok
}

pub fn validate_email(email: &str, mode: ValidationMode) -> ValidationReport {
    let input = email.trim();

    let mut reasons = Vec::new();

    if input.is_empty() {
        reasons.push("address is empty".to_string());
        return ValidationReport { ok: false, reasons };
    }

    if input.len() > MAX_ADDRESS_LEN {
        reasons.push(format!("total length {} > {MAX_ADDRESS_LEN}", input.len()));
    }

    // le local-part peut contenir '@' seulement entre guillemets (mode relaxed)
    let Some((local, domain)) = split_address(input, mode) else {
        reasons.push("must contain exactly one '@'".to_string());
        return ValidationReport { ok: false, reasons };
    };

    if local.is_empty() || local.len() > MAX_LOCAL_LEN {
        reasons.push(format!(
            "local part length {} invalid (1..={MAX_LOCAL_LEN})",
            local.len()
        ));
    }

    check_domain(domain, &mut reasons);

    let local_ok = match mode {
        ValidationMode::Strict => is_local_strict(local),
        ValidationMode::Relaxed => is_local_relaxed(local),
    };
    if !local_ok {
        reasons.push(match mode {
            ValidationMode::Strict => "invalid local part (strict rules)".into(),
            ValidationMode::Relaxed => "invalid local part (relaxed rules)".into(),
        });
    }

    let ok = reasons.is_empty();
    ValidationReport { ok, reasons }
}

/// Valide et renvoie une sortie normalisée (local, domaine normalisé,
/// domaine ASCII).
pub fn normalize_email(email: &str, mode: ValidationMode) -> NormalizedEmail {
    let input = email.trim();
    let (local, domain) = split_address(input, mode).unwrap_or(("", ""));

    let ValidationReport { ok, reasons } = validate_email(email, mode);
    let (domain_lower, ascii_domain) = normalize_domain(domain);

    NormalizedEmail {
        original: email.to_string(),
        local: local.to_string(),
        domain: domain_lower,
        ascii_domain,
        mode,
        valid: ok,
        reasons,
    }
}

fn split_address(input: &str, mode: ValidationMode) -> Option<(&str, &str)> {
    match mode {
        ValidationMode::Relaxed if input.starts_with('"') => {
            let (local, domain) = input.rsplit_once('@')?;
            if domain.contains('"') {
                return None;
            }
            Some((local, domain))
        }
        _ => {
            let (local, domain) = input.split_once('@')?;
            if domain.contains('@') {
                return None;
            }
            Some((local, domain))
        }
    }
}
