/// Whether `name` can be used as a single path component inside the mail root.
///
/// Identities name the mailbox directory and subjects name the message file,
/// so both go through this check. Empty names, names starting with `.`
/// (traversal and the store's own temporary files), path separators and
/// control characters are refused. Anything else is left to the OS to accept
/// or reject.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.contains(|c: char| c < ' ' || c == '\x7F')
}
