//! Text utilities applied to every fetched article.

use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};

/// Containers tried in order when extracting the body of a page.
const CONTENT_SELECTORS: &[&str] = &["article", ".article-content", ".post-content", ".entry-content"];

/// Elements whose text never counts as article content.
const SKIP_TAGS: &[&str] = &["script", "style", "nav", "header", "footer", "iframe"];

const SUMMARY_SENTENCES: usize = 3;
const WORDS_PER_MINUTE: f64 = 200.0;

/// Stable article id: hex SHA-256 of title and published date, truncated to 32 chars.
pub fn article_id(title: &str, published: &str) -> String {
    let digest = Sha256::digest(format!("{title}{published}").as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..32].to_string()
}

/// Text content of an HTML fragment with whitespace collapsed.
pub fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: Vec<&str> = fragment.root_element().text().collect();
    collapse_whitespace(&text.join(" "))
}

/// Main text of a full HTML page, or `None` when no content container matches.
pub fn extract_main_content(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    for selector in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = visible_text(element);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn visible_text(element: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let skipped = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| SKIP_TAGS.contains(&e.name()))
        });
        if !skipped && !text.trim().is_empty() {
            parts.push(text.trim().to_string());
        }
    }
    collapse_whitespace(&parts.join(" "))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits on `.`, `!` or `?` followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        if let Some(&(next, n)) = chars.peek() {
            if n.is_whitespace() {
                let sentence = text[start..next].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = next;
            }
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Extractive summary: the three best sentences by position and length,
/// kept in document order.
pub fn extractive_summary(text: &str) -> String {
    let sentences = split_sentences(text);
    if sentences.len() <= SUMMARY_SENTENCES {
        return text.trim().to_string();
    }

    let mut scored: Vec<(usize, f64)> = sentences
        .iter()
        .enumerate()
        .map(|(i, sentence)| {
            let mut score = 1.0 / (i as f64 + 1.0);
            let words = sentence.split_whitespace().count();
            if (10..=30).contains(&words) {
                score += 0.5;
            }
            (i, score)
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    let mut top: Vec<usize> = scored.into_iter().take(SUMMARY_SENTENCES).map(|(i, _)| i).collect();
    top.sort_unstable();
    top.into_iter().map(|i| sentences[i]).collect::<Vec<_>>().join(" ")
}

pub fn reading_time_minutes(text: &str) -> u32 {
    let words = text.split_whitespace().count() as f64;
    ((words / WORDS_PER_MINUTE).round() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_id_is_stable() {
        let a = article_id("Title", "Mon, 01 Jan 2024 00:00:00 +0000");
        let b = article_id("Title", "Mon, 01 Jan 2024 00:00:00 +0000");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, article_id("Title", ""));
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Hello <b>world</b></p>\n<p>again &amp; again</p>"),
            "Hello world again & again"
        );
        assert_eq!(strip_html("plain text"), "plain text");
    }

    #[test]
    fn test_extract_main_content() {
        let html = r#"<html><body>
            <header>Site header</header>
            <nav>Menu</nav>
            <div class="post-content">
              <p>First paragraph.</p>
              <script>var tracking = 1;</script>
              <p>Second <em>paragraph</em>.</p>
              <footer>Share this</footer>
            </div>
        </body></html>"#;
        assert_eq!(
            extract_main_content(html).as_deref(),
            Some("First paragraph. Second paragraph .")
        );
        assert!(extract_main_content("<html><body><div>No container</div></body></html>").is_none());
    }

    #[test]
    fn test_article_selector_wins() {
        let html = r#"<div class="entry-content">Entry</div><article><p>Body text</p></article>"#;
        assert_eq!(extract_main_content(html).as_deref(), Some("Body text"));
    }

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("One. Two! Three? Version 2.0 ships"),
            vec!["One.", "Two!", "Three?", "Version 2.0 ships"]
        );
    }

    #[test]
    fn test_extractive_summary() {
        let medium = "This sentence has exactly ten words in it for scoring.";
        let text = format!("Short one. Tiny two. {medium} Small four. Brief five.");
        // Position favours 1 and 2; the medium-length third beats 4 and 5.
        assert_eq!(extractive_summary(&text), format!("Short one. Tiny two. {medium}"));
        assert_eq!(extractive_summary("Only one. And two."), "Only one. And two.");
    }

    #[test]
    fn test_reading_time() {
        assert_eq!(reading_time_minutes(""), 1);
        assert_eq!(reading_time_minutes(&"word ".repeat(100)), 1);
        assert_eq!(reading_time_minutes(&"word ".repeat(500)), 3);
    }
}
