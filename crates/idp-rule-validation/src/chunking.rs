//! Page-aware chunking (§4.7): one chunk per page, each prefixed with a
//! word-boundary-safe trailing fraction of the previous page's text so a
//! rule near a page break still has context. No chunk ever splits a page.

use idp_providers::PageText;
use regex::Regex;

fn trailing_words(text: &str, fraction: f32) -> String {
    let word_re = Regex::new(r"\S+").expect("static pattern");
    let words: Vec<&str> = word_re.find_iter(text).map(|m| m.as_str()).collect();
    if words.is_empty() || fraction <= 0.0 {
        return String::new();
    }
    let take = ((words.len() as f32) * fraction).ceil() as usize;
    let take = take.clamp(1, words.len());
    words[words.len() - take..].join(" ")
}

/// Build one chunk per page; each chunk after the first is prefixed with
/// `overlap_fraction` of the previous page's trailing words.
pub fn build_chunks(pages: &[PageText], overlap_fraction: f32) -> Vec<PageText> {
    let mut chunks = Vec::with_capacity(pages.len());
    for (i, page) in pages.iter().enumerate() {
        let text = if i == 0 {
            page.text.clone()
        } else {
            let overlap = trailing_words(&pages[i - 1].text, overlap_fraction);
            if overlap.is_empty() {
                page.text.clone()
            } else {
                format!("{overlap}\n{}", page.text)
            }
        };
        chunks.push(PageText { page_id: page.page_id.clone(), text });
    }
    chunks
}
