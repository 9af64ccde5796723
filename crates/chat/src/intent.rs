//! Keyword intent classifier for free text.
//!
//! A message is matched against the keyword tables below, in order, by
//! prefix (ASCII case-insensitive). The matched keyword and any separator
//! after it are stripped; what remains is the argument.
//!
//! | Intent     | Keywords                                             |
//! |------------|------------------------------------------------------|
//! | `Modify`   | 修改, 改一下, 改成, 重写, 润色, modify, revise, rewrite, edit |
//! | `Generate` | 生成, 写一篇, 写一段, 写一首, 创作, create, generate, write    |
//! | `Search`   | 搜索, 搜一下, 查一下, 查找, search, look up, find          |
//! | `Chat`     | anything else                                        |
//!
//! `Modify` only applies when the requester has a prior artifact; otherwise
//! the message falls through to the remaining tables.

/// What a free-text message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Rework the last artifact with this instruction.
    Modify(String),
    /// Generate an artifact about this topic (may be empty).
    Generate(String),
    /// Search the web for this query.
    Search(String),
    /// Plain conversation.
    Chat(String),
}

const MODIFY_KEYWORDS: &[&str] = &[
    "修改", "改一下", "改成", "重写", "润色", "modify", "revise", "rewrite", "edit",
];

const GENERATE_KEYWORDS: &[&str] = &[
    "生成", "写一篇", "写一段", "写一首", "创作", "create", "generate", "write",
];

const SEARCH_KEYWORDS: &[&str] = &[
    "搜索", "搜一下", "查一下", "查找", "search", "look up", "find",
];

/// Characters allowed between a keyword and its argument.
const SEPARATORS: &[char] = &[':', '：', ',', '，', '、', '-', '—'];

/// Classify `text`. `has_prior` says whether a prior artifact exists.
#[must_use]
pub fn classify(text: &str, has_prior: bool) -> Intent {
    let text = text.trim();

    if has_prior && let Some(rest) = strip_keyword(text, MODIFY_KEYWORDS) {
        return Intent::Modify(rest);
    }
    if let Some(rest) = strip_keyword(text, GENERATE_KEYWORDS) {
        return Intent::Generate(rest);
    }
    if let Some(rest) = strip_keyword(text, SEARCH_KEYWORDS) {
        return Intent::Search(rest);
    }
    Intent::Chat(text.to_string())
}

fn strip_keyword(text: &str, keywords: &[&str]) -> Option<String> {
    keywords.iter().find_map(|kw| {
        let head = text.get(..kw.len())?;
        if !head.eq_ignore_ascii_case(kw) {
            return None;
        }
        let rest = &text[kw.len()..];
        // ASCII keywords must end on a word boundary ("editor" is not "edit").
        if kw.is_ascii() && rest.chars().next().is_some_and(char::is_alphanumeric) {
            return None;
        }
        Some(
            rest.trim_start_matches(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
                .trim_end()
                .to_string(),
        )
    })
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("修改：更短一点", true, Intent::Modify("更短一点".into()))]
    #[case("Rewrite it as a haiku", true, Intent::Modify("it as a haiku".into()))]
    #[case("生成 今日摇滚热点", false, Intent::Generate("今日摇滚热点".into()))]
    #[case("写一首关于夏天的歌", false, Intent::Generate("关于夏天的歌".into()))]
    #[case("create", false, Intent::Generate(String::new()))]
    #[case("搜索 Radiohead 新专辑", false, Intent::Search("Radiohead 新专辑".into()))]
    #[case("look up: tour dates", true, Intent::Search("tour dates".into()))]
    #[case("你好", true, Intent::Chat("你好".into()))]
    #[case("  hello there  ", false, Intent::Chat("hello there".into()))]
    fn test_classify(#[case] text: &str, #[case] has_prior: bool, #[case] expected: Intent) {
        assert_eq!(classify(text, has_prior), expected);
    }

    #[test]
    fn modify_needs_prior_artifact() {
        assert_eq!(classify("修改：更短", false), Intent::Chat("修改：更短".into()));
        assert_eq!(classify("修改：更短", true), Intent::Modify("更短".into()));
    }

    #[test]
    fn ascii_keywords_respect_word_boundary() {
        assert_eq!(
            classify("editorial thoughts", true),
            Intent::Chat("editorial thoughts".into())
        );
        assert_eq!(
            classify("finding nemo", false),
            Intent::Chat("finding nemo".into())
        );
    }

    #[test]
    fn multibyte_prefix_does_not_panic() {
        assert_eq!(classify("é", false), Intent::Chat("é".into()));
        assert_eq!(classify("写", false), Intent::Chat("写".into()));
    }
}
