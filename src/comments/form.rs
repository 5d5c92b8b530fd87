use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use url::Url;

const NAME_MAX_CHARS: usize = 100;
const EMAIL_MAX_CHARS: usize = 255;
const URL_MAX_CHARS: usize = 200;

/// 评论表单：用户提交的原始数据
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub name: String,
    pub email: String,
    pub url: String,
    pub text: String,
}

/// 通过校验的评论数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedComment {
    pub name: String,
    pub email: String,
    pub url: Option<String>,
    pub text: String,
}

/// 表单错误，按字段分组
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

impl CommentForm {
    /// 校验表单，所有字段先去掉首尾空白
    pub fn validate(&self) -> Result<CleanedComment, FormErrors> {
        let mut errors = FormErrors::default();

        let name = self.name.trim();
        let email = self.email.trim();
        let url = self.url.trim();
        let text = self.text.trim();

        if name.is_empty() {
            errors.add("name", "该字段是必填项。");
        } else if name.chars().count() > NAME_MAX_CHARS {
            errors.add("name", format!("最多 {} 个字符。", NAME_MAX_CHARS));
        }

        if email.is_empty() {
            errors.add("email", "该字段是必填项。");
        } else {
            if email.chars().count() > EMAIL_MAX_CHARS {
                errors.add("email", format!("最多 {} 个字符。", EMAIL_MAX_CHARS));
            }
            if !email_pattern().is_match(email) {
                errors.add("email", "请输入有效的邮箱地址。");
            }
        }

        if !url.is_empty() {
            if url.chars().count() > URL_MAX_CHARS {
                errors.add("url", format!("最多 {} 个字符。", URL_MAX_CHARS));
            }
            if !is_web_url(url) {
                errors.add("url", "请输入有效的网址。");
            }
        }

        if text.is_empty() {
            errors.add("text", "该字段是必填项。");
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(CleanedComment {
            name: name.to_string(),
            email: email.to_string(),
            url: (!url.is_empty()).then(|| url.to_string()),
            text: text.to_string(),
        })
    }
}

fn is_web_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, url: &str, text: &str) -> CommentForm {
        CommentForm {
            name: name.to_string(),
            email: email.to_string(),
            url: url.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn valid_form_is_trimmed() {
        let cleaned = form("  小明 ", "xm@example.com ", "", "  写得不错  ")
            .validate()
            .unwrap();
        assert_eq!(cleaned.name, "小明");
        assert_eq!(cleaned.email, "xm@example.com");
        assert_eq!(cleaned.url, None);
        assert_eq!(cleaned.text, "写得不错");
    }

    #[test]
    fn url_is_kept_when_valid() {
        let cleaned = form("a", "a@b.io", "https://example.com/blog", "hi")
            .validate()
            .unwrap();
        assert_eq!(cleaned.url.as_deref(), Some("https://example.com/blog"));
    }

    #[test]
    fn missing_fields_are_reported() {
        let errors = CommentForm::default().validate().unwrap_err();
        assert!(errors.has("name"));
        assert!(errors.has("email"));
        assert!(errors.has("text"));
        assert!(!errors.has("url"));
    }

    #[test]
    fn bad_email_and_url() {
        let errors = form("a", "not-an-email", "ftp://example.com", "hi")
            .validate()
            .unwrap_err();
        assert_eq!(errors.get("email").map(|m| m.len()), Some(1));
        assert!(errors.has("url"));
        assert!(!errors.has("name"));

        let errors = form("a", "a@b.io", "example.com", "hi").validate().unwrap_err();
        assert!(errors.has("url"));
    }

    #[test]
    fn overlong_name_is_rejected() {
        let name = "名".repeat(NAME_MAX_CHARS + 1);
        let errors = form(&name, "a@b.io", "", "hi").validate().unwrap_err();
        assert!(errors.has("name"));

        let name = "名".repeat(NAME_MAX_CHARS);
        assert!(form(&name, "a@b.io", "", "hi").validate().is_ok());
    }

    #[test]
    fn overlong_email_and_url_are_rejected() {
        let local = "a".repeat(EMAIL_MAX_CHARS - "@b.io".len());
        assert!(form("a", &format!("{}@b.io", local), "", "hi").validate().is_ok());
        let errors = form("a", &format!("{}a@b.io", local), "", "hi").validate().unwrap_err();
        assert_eq!(
            errors.get("email"),
            Some(&[format!("最多 {} 个字符。", EMAIL_MAX_CHARS)][..])
        );

        let prefix = "https://example.com/";
        let path = "p".repeat(URL_MAX_CHARS - prefix.len());
        assert!(form("a", "a@b.io", &format!("{}{}", prefix, path), "hi").validate().is_ok());
        let errors = form("a", "a@b.io", &format!("{}{}p", prefix, path), "hi")
            .validate()
            .unwrap_err();
        assert_eq!(
            errors.get("url"),
            Some(&[format!("最多 {} 个字符。", URL_MAX_CHARS)][..])
        );
    }

    #[test]
    fn errors_display_by_field() {
        let mut errors = FormErrors::default();
        errors.add("text", "该字段是必填项。");
        errors.add("email", "请输入有效的邮箱地址。");
        assert_eq!(
            errors.to_string(),
            "email: 请输入有效的邮箱地址。; text: 该字段是必填项。"
        );
    }
}
