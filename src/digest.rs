//! HTML digest assembly.
//!
//! Walks the fetched articles in source order and, for each relevant one,
//! emits a block with the translated title linking to the article and one
//! line per cleaned, translated snippet. Articles are processed one at a
//! time so the translation cache needs no synchronisation and the digest
//! keeps source order.

use crate::cleaner::clean_snippet;
use crate::config::DigestConfig;
use crate::language::{contains_any_keyword, content_contains_keywords_any_lang};
use crate::models::Article;
use crate::snippets::extract_snippets;
use crate::translate::{Translate, Translator};
use crate::utils::{escape_html, truncate_for_log};
use tracing::{debug, info, instrument};

/// An assembled digest and how many articles made it in.
#[derive(Debug, Clone, PartialEq)]
pub struct Digest {
    pub html: String,
    pub included: usize,
    pub skipped: usize,
}

impl Digest {
    pub fn is_empty(&self) -> bool {
        self.included == 0
    }
}

#[instrument(level = "info", skip_all, fields(articles = articles.len()))]
pub async fn build_digest<T: Translate>(
    translator: &mut Translator<T>,
    articles: &[Article],
    config: &DigestConfig,
) -> Digest {
    let mut html = format!("<h2>{}</h2>", escape_html(&config.heading));
    let mut included = 0;

    for (index, article) in articles.iter().enumerate() {
        match render_article(translator, article, config).await {
            Some(fragment) => {
                html.push_str(&fragment);
                included += 1;
            }
            None => debug!(index, url = %article.url, "Article skipped"),
        }
    }

    let skipped = articles.len() - included;
    info!(included, skipped, "Digest assembled");
    Digest {
        html,
        included,
        skipped,
    }
}

/// Render one article block, or `None` when the article is not relevant.
pub async fn render_article<T: Translate>(
    translator: &mut Translator<T>,
    article: &Article,
    config: &DigestConfig,
) -> Option<String> {
    let keywords = config.keywords.as_slice();
    if !content_contains_keywords_any_lang(translator, &article.content, keywords).await {
        return None;
    }

    // Extract from the original text when it already matches, so the
    // snippet keeps the source wording; otherwise from the translation.
    let source_text = if contains_any_keyword(&article.content, keywords) {
        article.content.clone()
    } else {
        translator
            .to_working_language_cached(&article.content)
            .await
            .into_text()
    };

    let snippets = extract_snippets(&source_text, keywords, config.window, config.max_snippets);
    if snippets.is_empty() {
        return None;
    }

    let title = translator.to_display_language(&article.title).await;
    debug!(
        translated = title.was_translated(),
        published_at = ?article.published_at,
        "Title prepared"
    );
    let title = title.into_text();
    info!(title = %truncate_for_log(&title, 120), snippets = snippets.len(), "Including article");

    let mut lines = Vec::with_capacity(snippets.len());
    for snippet in &snippets {
        let cleaned = clean_snippet(snippet);
        if cleaned.is_empty() {
            continue;
        }
        let translated = translator.to_display_language(&cleaned).await.into_text();
        lines.push(format!(
            "\n    <div style=\"margin-left:12px; margin-top:6px; color:#444;\">\n        {}\n    </div>",
            escape_html(&translated)
        ));
    }
    if lines.is_empty() {
        return None;
    }

    let mut block = format!(
        "\n<div style=\"margin-bottom:18px;\">\n    <div>\n        <a href=\"{}\" target=\"_blank\"\n           style=\"font-weight:bold; color:#1a73e8; text-decoration:none;\">\n           {}\n        </a>\n    </div>",
        escape_html(&article.url),
        escape_html(&title)
    );
    for line in lines {
        block.push_str(&line);
    }
    block.push_str("\n</div>");
    Some(block)
}
