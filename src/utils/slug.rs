use unicode_normalization::UnicodeNormalization;

/// 產生檔案系統安全的 slug：轉為 ASCII 小寫，非英數字元的連續片段
/// 合併為單一 `-`，結果為空時使用 `source`
pub fn slugify(value: &str) -> String {
    let folded: String = value.nfkd().filter(char::is_ascii).collect();

    let slug = folded
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();

    if slug.is_empty() {
        "source".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("Test Repo  #1"), "test-repo-1");
        assert_eq!(slugify("--Already-Slugged--"), "already-slugged");
    }

    #[test]
    fn test_slugify_folds_accents() {
        assert_eq!(slugify("Café Résumé"), "cafe-resume");
    }

    #[test]
    fn test_slugify_falls_back_for_symbols() {
        assert_eq!(slugify("#@!%^&*"), "source");
        assert_eq!(slugify(""), "source");
        assert_eq!(slugify("🌟青宁🌟"), "source");
    }
}
