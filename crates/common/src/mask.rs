//! Identity masking for log output

/// Mask an account identity (login email) for logs.
///
/// Keeps the first two and last two characters of the local part, e.g.
/// `alice.smith@example.com` becomes `al:::th@example.com`. Identities that
/// are not `local@domain`, or whose local part is shorter than four
/// characters, are returned unchanged.
pub fn mask_identity(identity: &str) -> String {
    let Some((local, domain)) = identity.split_once('@') else {
        return identity.to_string();
    };
    if domain.contains('@') {
        return identity.to_string();
    }

    let chars: Vec<char> = local.chars().collect();
    if chars.len() < 4 {
        return identity.to_string();
    }

    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}:::{tail}@{domain}")
}
