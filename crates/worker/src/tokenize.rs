use std::collections::HashSet;

fn trim_token(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_alphanumeric() && c != '_')
}

/// 按空白切分、去掉首尾标点并转为小写的词集合
pub fn words(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(trim_token)
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// 文本中所有连续数字串，去掉前导零后去重
pub fn numbers(text: &str) -> HashSet<String> {
    let mut found = HashSet::new();
    let mut current = String::new();

    for c in text.chars().chain(std::iter::once(' ')) {
        if c.is_ascii_digit() {
            current.push(c);
        } else if !current.is_empty() {
            let trimmed = current.trim_start_matches('0');
            found.insert(if trimmed.is_empty() { "0" } else { trimmed }.to_string());
            current.clear();
        }
    }

    found
}

/// |A ∩ B| / |A ∪ B|，两个空集合的相似度为 0
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let intersection = small.iter().filter(|w| large.contains(*w)).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}
