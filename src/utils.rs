//! Small helpers.

pub fn sanitize_symbol(sym: &str) -> String {
    sym.trim().to_uppercase()
}

/// Keep the first few characters of an identifier for logs.
pub fn mask_id(s: &str) -> String {
    let head: String = s.chars().take(6).collect();
    if s.chars().count() > 6 {
        format!("{head}…")
    } else {
        head
    }
}

/// "name#discriminator", with "#0" for accounts migrated off discriminators.
pub fn user_label(name: &str, discriminator: Option<u16>) -> String {
    match discriminator {
        Some(d) => format!("{name}#{d:04}"),
        None => format!("{name}#0"),
    }
}
