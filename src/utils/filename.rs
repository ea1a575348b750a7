//! Filename normalization

/// Normalize a title, author or quality label into a filesystem-friendly token.
///
/// Lowercases, then drops every character that is not alphanumeric, `_`,
/// whitespace or `-`, and turns spaces into underscores. The filter runs on
/// the lowercased text, which may contain combining marks (`İ` lowercases to
/// `i` + U+0307). Applying it to an already normalized string returns the
/// string unchanged.
pub fn detox(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// Build `<detox(title)>-<detox(quality)>.<ext>`
pub fn variant_filename(title: &str, quality: &str, extension: &str) -> String {
    format!("{}-{}.{}", detox(title), detox(quality), extension)
}
