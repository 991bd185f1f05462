//! Output naming and the deliverable handed to the save dialog

use serde::Serialize;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Finished bytes plus the name and type the browser should save them as
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deliverable {
    pub file_name: String,
    pub mime_type: &'static str,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl Deliverable {
    pub fn pdf(file_name: String, bytes: Vec<u8>) -> Self {
        Self {
            file_name,
            mime_type: PDF_MIME_TYPE,
            bytes,
        }
    }
}

/// Choose the download name
///
/// A non-blank `user_input` wins. Otherwise the first source file's stem
/// gets `suffix` appended, falling back to `document`. The result never
/// contains path separators or control characters and always ends in `.pdf`.
pub fn output_filename(user_input: Option<&str>, source_name: Option<&str>, suffix: &str) -> String {
    let user = user_input.map(sanitize).filter(|s| !s.is_empty());

    let base = match user {
        Some(name) => name,
        None => {
            let stem = source_name
                .map(|name| sanitize(file_stem(name)))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "document".to_string());
            format!("{}{}", stem, sanitize(suffix))
        }
    };

    if base.to_ascii_lowercase().ends_with(".pdf") {
        base
    } else {
        format!("{}.pdf", base)
    }
}

fn file_stem(name: &str) -> &str {
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect::<String>()
        .trim()
        .trim_matches('.')
        .to_string()
}
