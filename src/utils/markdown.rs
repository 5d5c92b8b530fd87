use pulldown_cmark::{html, CowStr, Event, HeadingLevel, Options, Parser, Tag};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// 目录中收录的最深标题层级
const TOC_MAX_LEVEL: usize = 3;

/// Markdown 渲染结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedMarkdown {
    /// 正文 HTML，标题带有 `id` 锚点
    pub html: String,
    /// 目录 HTML，没有标题时为空字符串
    pub toc: String,
}

struct Heading {
    level: usize,
    id: String,
    text: String,
}

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options
}

/// 将 Markdown 渲染为 HTML，同时生成目录
pub fn render(markdown: &str) -> RenderedMarkdown {
    let headings = collect_headings(markdown);

    // 第二遍：把标题替换为带锚点的 HTML
    let mut ids = headings.iter().map(|h| h.id.as_str());
    let events = Parser::new_ext(markdown, parser_options()).map(|event| match event {
        Event::Start(Tag::Heading(level, _, _)) => {
            let id = ids.next().unwrap_or_default();
            Event::Html(CowStr::from(format!(
                "<h{} id=\"{}\">",
                level as usize,
                tera::escape_html(id)
            )))
        }
        Event::End(Tag::Heading(level, _, _)) => {
            Event::Html(CowStr::from(format!("</h{}>\n", level as usize)))
        }
        other => other,
    });

    let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut html_output, events);

    RenderedMarkdown {
        html: html_output,
        toc: build_toc(&headings),
    }
}

fn collect_headings(markdown: &str) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut current: Option<(HeadingLevel, Option<String>, String)> = None;

    for event in Parser::new_ext(markdown, parser_options()) {
        match event {
            Event::Start(Tag::Heading(level, id, _)) => {
                current = Some((level, id.map(str::to_string), String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, _, buffer)) = current.as_mut() {
                    buffer.push_str(&text);
                }
            }
            Event::End(Tag::Heading(..)) => {
                if let Some((level, explicit_id, text)) = current.take() {
                    let base = explicit_id.unwrap_or_else(|| heading_slug(&text));
                    let id = unique_id(&mut seen, base);
                    headings.push(Heading {
                        level: level as usize,
                        id,
                        text,
                    });
                }
            }
            _ => {}
        }
    }

    headings
}

fn heading_slug(text: &str) -> String {
    let slug = slug::slugify(text);
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

fn unique_id(seen: &mut HashMap<String, usize>, base: String) -> String {
    let count = seen.entry(base.clone()).or_insert(0);
    *count += 1;
    if *count == 1 {
        base
    } else {
        format!("{}-{}", base, *count - 1)
    }
}

fn build_toc(headings: &[Heading]) -> String {
    let entries: Vec<&Heading> = headings
        .iter()
        .filter(|h| h.level <= TOC_MAX_LEVEL)
        .collect();
    let Some(base_level) = entries.iter().map(|h| h.level).min() else {
        return String::new();
    };

    let mut toc = String::from("<div class=\"toc\">\n<ul>\n");
    let mut depth = base_level;

    for heading in entries {
        while depth < heading.level {
            toc.push_str("<ul>\n");
            depth += 1;
        }
        while depth > heading.level {
            toc.push_str("</ul>\n");
            depth -= 1;
        }
        toc.push_str(&format!(
            "<li><a href=\"#{}\">{}</a></li>\n",
            tera::escape_html(&heading.id),
            tera::escape_html(&heading.text)
        ));
    }

    while depth > base_level {
        toc.push_str("</ul>\n");
        depth -= 1;
    }
    toc.push_str("</ul>\n</div>");

    toc
}

/// 去掉 HTML 标签并合并空白
pub fn strip_tags(html: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));
    tag.replace_all(html, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 按字符截断
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_basic_markdown() {
        let rendered = render("Hello **world**\n\n- [x] done\n");
        assert!(rendered.html.contains("<strong>world</strong>"));
        assert!(rendered.html.contains("checkbox"));
        assert!(rendered.toc.is_empty());
    }

    #[test]
    fn headings_get_anchors_and_toc() {
        let rendered = render("# Intro\n\ntext\n\n## Getting Started\n\n## Getting Started\n\n#### Deep\n");
        assert!(rendered.html.contains("<h1 id=\"intro\">Intro</h1>"));
        assert!(rendered.html.contains("<h2 id=\"getting-started\">Getting Started</h2>"));
        assert!(rendered.html.contains("<h2 id=\"getting-started-1\">"));
        assert!(rendered.html.contains("<h4 id=\"deep\">"));

        assert!(rendered.toc.contains("<a href=\"#intro\">Intro</a>"));
        assert!(rendered.toc.contains("<a href=\"#getting-started-1\">"));
        // 四级标题不进入目录
        assert!(!rendered.toc.contains("#deep"));
        assert_eq!(
            rendered.toc.matches("<ul>").count(),
            rendered.toc.matches("</ul>").count()
        );
    }

    #[test]
    fn heading_ids_are_escaped() {
        let rendered = render("## Setup {#x\"onmouseover=alert(1)}\n");
        assert!(!rendered.html.contains("\"onmouseover"));
        assert!(!rendered.toc.contains("\"onmouseover"));
        assert!(rendered.toc.contains("&quot;onmouseover"));
    }

    #[test]
    fn explicit_heading_id_is_used() {
        let rendered = render("## Setup {#install}\n");
        assert!(rendered.html.contains("<h2 id=\"install\">"));
        assert!(rendered.toc.contains("href=\"#install\""));
    }

    #[test]
    fn fenced_code_keeps_language_class() {
        let rendered = render("```rust\nfn main() {}\n```\n");
        assert!(rendered.html.contains("class=\"language-rust\""));
    }

    #[test]
    fn toc_escapes_heading_text() {
        let rendered = render("# a < b\n");
        assert!(rendered.toc.contains("a &lt; b"));
    }

    #[test]
    fn strip_and_truncate() {
        let text = strip_tags("<p>Hello <em>there</em></p>\n<p>friend</p>");
        assert_eq!(text, "Hello there friend");
        assert_eq!(truncate_chars("你好世界", 2), "你好");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
