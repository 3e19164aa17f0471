use super::transient::TransientAddress;

/// Replaces every literal occurrence of each filename key in `material_text`
/// with its transient address, applying keys in the given order.
///
/// Matching is plain substring search, not path-aware: when one filename is a
/// substring of another (`wood.png` inside `oldwood.png`) the shorter key can
/// rewrite part of the longer reference if it is applied first.
pub fn rewrite_references<'a, I>(material_text: &str, references: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a TransientAddress)>,
{
    let mut rewritten = material_text.to_string();
    for (filename, address) in references {
        if filename.is_empty() || !rewritten.contains(filename) {
            continue;
        }
        rewritten = rewritten.replace(filename, address.as_str());
    }
    rewritten
}
