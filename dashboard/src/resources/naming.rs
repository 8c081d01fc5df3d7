//! Label and key derivation.

/// Attribute key for a field label: words split on whitespace runs, lowercased, joined with
/// `_`. Camel-case boundaries are not split, so `"HelloWorld"` becomes `"helloworld"`.
pub fn attribute_from_label(label: &str) -> String {
    label
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// `"Author Name"` -> `"authorName"`.
pub fn camel(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let words = value.split([' ', '_', '-']).filter(|word| !word.is_empty());
    for (index, word) in words.enumerate() {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if index == 0 {
                out.extend(first.to_lowercase());
            } else {
                out.extend(first.to_uppercase());
            }
            out.push_str(chars.as_str());
        }
    }
    out
}

/// `"BlogPost"` and `"Blog Post"` -> `"blog-post"`.
pub fn kebab(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    let mut previous: Option<char> = None;
    for ch in value.chars() {
        if ch.is_whitespace() || ch == '_' || ch == '-' {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            previous = None;
            continue;
        }
        if ch.is_uppercase()
            && previous.is_some_and(|prev| prev.is_lowercase() || prev.is_ascii_digit())
            && !out.ends_with('-')
        {
            out.push('-');
        }
        out.extend(ch.to_lowercase());
        previous = Some(ch);
    }
    out.trim_end_matches('-').to_string()
}

/// English plural of the last word, keeping the caller's casing.
pub fn plural(value: &str) -> String {
    let split = value
        .char_indices()
        .rev()
        .find(|(_, ch)| !ch.is_alphanumeric())
        .map(|(index, ch)| index + ch.len_utf8())
        .unwrap_or(0);
    let (head, word) = value.split_at(split);
    if word.is_empty() {
        return value.to_string();
    }

    let lower = word.to_lowercase();
    let irregular = match lower.as_str() {
        "person" => Some("people"),
        "child" => Some("children"),
        "man" => Some("men"),
        "woman" => Some("women"),
        _ => None,
    };
    if let Some(replacement) = irregular {
        let mut out = head.to_string();
        if word.starts_with(char::is_uppercase) {
            out.push_str(&capitalize(replacement));
        } else {
            out.push_str(replacement);
        }
        return out;
    }

    let consonant_y = lower.ends_with('y')
        && lower
            .chars()
            .rev()
            .nth(1)
            .is_some_and(|ch| !"aeiou".contains(ch));
    if consonant_y {
        return format!("{}ies", &value[..value.len() - 1]);
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| lower.ends_with(suffix)) {
        return format!("{value}es");
    }
    format!("{value}s")
}

/// Uri key of a resource label: `"Blog Post"` -> `"blog-posts"`.
pub fn uri_key(label: &str) -> String {
    plural(&kebab(label))
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
