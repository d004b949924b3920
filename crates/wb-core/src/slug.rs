/// Convert a display name into a machine-safe slug.
///
/// Runs of whitespace and hyphens become a single inner `-`; other
/// characters that are not ASCII letters or digits are dropped.
/// "Fire Bolt" becomes `fire-bolt`.
///
/// Non-ASCII letters are dropped rather than transliterated ("Épée" becomes
/// `pe`), which keeps slugs identical to the `items.<slug>` keys the host
/// derives with its strict slug rule.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.to_lowercase().chars() {
        if c.is_whitespace() || c == '-' {
            pending_sep = true;
            continue;
        }
        if !c.is_ascii_alphanumeric() {
            continue;
        }
        if pending_sep && !slug.is_empty() {
            slug.push('-');
        }
        pending_sep = false;
        slug.push(c);
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_names() {
        assert_eq!(slugify("Fire Bolt"), "fire-bolt");
        assert_eq!(slugify("Long  Sword"), "long-sword");
        assert_eq!(slugify("Potion (Greater)"), "potion-greater");
    }

    #[test]
    fn punctuation_is_dropped() {
        assert_eq!(slugify("Kael's Blade"), "kaels-blade");
        assert_eq!(slugify("a - b"), "a-b");
    }

    #[test]
    fn non_ascii_letters_are_dropped() {
        assert_eq!(slugify("Épée"), "pe");
        assert_eq!(slugify("Schwert der Ödnis"), "schwert-der-dnis");
        assert_eq!(slugify("魔法"), "");
    }

    #[test]
    fn outer_whitespace_is_trimmed() {
        assert_eq!(slugify(" Orb "), "orb");
    }
}
