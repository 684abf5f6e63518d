//! changelog 文档解析与版本比较。
//!
//! 文档是 markdown：顶层 `## [x.y.z] ...` 版本段，段内 `### ...` 小节、
//! `- ` 列表、**加粗**、`行内代码`。这里用一个最小的结构化扫描器逐行切段，
//! 不引入完整 markdown 解析。段落默认按版本从新到旧排列，收集在遇到
//! 第一个不比已读版本新的段落时提前停止（依赖该排列，不做校验）。

use serde::Serialize;

/// 弹窗里展示的一个版本段。
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogSection {
    pub version: String,
    pub body_html: String,
}

/// 一次待展示的 changelog 通知：最新版本 + 所有未读段落（新到旧）。
/// `latest_version` 在用户关闭弹窗时写回 last_seen_version。
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogNotice {
    pub latest_version: String,
    pub sections: Vec<ChangelogSection>,
}

/// 语义化版本比较（v1 > v2 => 1, v1 < v2 => -1, v1 == v2 => 0）。
///
/// 任一侧缺失（None 或空串）都返回 1 ——「从未看过」永远触发展示。
/// 逐段按整数比较，右侧缺的段按 0 处理。
pub fn compare_versions(v1: Option<&str>, v2: Option<&str>) -> i32 {
    let Some(v1) = v1.filter(|s| !s.is_empty()) else {
        return 1;
    };
    let Some(v2) = v2.filter(|s| !s.is_empty()) else {
        return 1;
    };

    let a: Vec<i64> = v1.split('.').map(|p| p.parse().unwrap_or(0)).collect();
    let b: Vec<i64> = v2.split('.').map(|p| p.parse().unwrap_or(0)).collect();

    for i in 0..a.len().max(b.len()) {
        let na = a.get(i).copied().unwrap_or(0);
        let nb = b.get(i).copied().unwrap_or(0);
        if na > nb {
            return 1;
        }
        if na < nb {
            return -1;
        }
    }
    0
}

/// 原始版本段：版本号 + 未渲染的正文行。
#[derive(Debug)]
struct RawSection {
    version: String,
    body: String,
}

/// 行首 `## [x.y.z] ...` / `## x.y.z ...` 的版本号；不是版本头时返回 None。
fn parse_version_header(line: &str) -> Option<String> {
    let rest = line.strip_prefix("## ")?.trim_start();
    let rest = rest.strip_prefix('[').unwrap_or(rest);
    let version: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if version.chars().any(|c| c.is_ascii_digit()) {
        Some(version)
    } else {
        None
    }
}

/// 逐行切出所有版本段（保持文档顺序）。
fn scan_sections(content: &str) -> Vec<RawSection> {
    let mut sections: Vec<RawSection> = Vec::new();
    for line in content.lines() {
        if let Some(version) = parse_version_header(line) {
            sections.push(RawSection {
                version,
                body: String::new(),
            });
        } else if let Some(current) = sections.last_mut() {
            current.body.push_str(line);
            current.body.push('\n');
        }
    }
    sections
}

/// 把 `**加粗**` / `` `代码` `` 这样的成对标记替换成标签；落单的标记原样保留。
fn replace_paired(line: &str, marker: &str, open: &str, close: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    loop {
        let Some(start) = rest.find(marker) else {
            out.push_str(rest);
            return out;
        };
        let after = &rest[start + marker.len()..];
        let Some(end) = after.find(marker) else {
            out.push_str(rest);
            return out;
        };
        out.push_str(&rest[..start]);
        out.push_str(open);
        out.push_str(&after[..end]);
        out.push_str(close);
        rest = &after[end + marker.len()..];
    }
}

fn render_inline(line: &str) -> String {
    let line = replace_paired(line, "**", "<strong>", "</strong>");
    replace_paired(&line, "`", "<code>", "</code>")
}

/// 把一个版本段的正文渲染成简化标记：
/// `###` 小节 → `<h3>`，`- ` 行 → `<li>`（连续的归并进一个 `<ul>`），
/// 其余行做行内替换，`---` 分隔线丢弃。
fn render_section_body(body: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut list: Vec<String> = Vec::new();

    let flush_list = |out: &mut Vec<String>, list: &mut Vec<String>| {
        if !list.is_empty() {
            out.push(format!("<ul>{}</ul>", list.join("")));
            list.clear();
        }
    };

    for line in body.lines() {
        let trimmed = line.trim();
        let cleaned = trimmed.replace("---", "");
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            continue;
        }

        if let Some(item) = cleaned.strip_prefix("- ") {
            list.push(format!("<li>{}</li>", render_inline(item)));
            continue;
        }
        flush_list(&mut out, &mut list);

        if let Some(heading) = cleaned.strip_prefix("### ") {
            out.push(format!("<h3>{}</h3>", render_inline(heading)));
        } else {
            out.push(render_inline(cleaned));
        }
    }
    flush_list(&mut out, &mut list);

    out.join("\n")
}

/// 从 changelog 文档里收集所有比 `last_seen` 新的版本段。
///
/// 没有版本头、最新版本不比已读新、或者一段都没收集到时返回 None
/// （页面版在这些情况下都不弹窗）。
pub fn collect_unseen(content: &str, last_seen: Option<&str>) -> Option<ChangelogNotice> {
    let raw = scan_sections(content);
    let latest = raw.first()?.version.clone();

    if compare_versions(Some(&latest), last_seen) <= 0 {
        return None;
    }

    let mut sections = Vec::new();
    for section in &raw {
        if compare_versions(Some(&section.version), last_seen) > 0 {
            sections.push(ChangelogSection {
                version: section.version.clone(),
                body_html: render_section_body(&section.body),
            });
        } else {
            // 版本按降序排列，第一个不更新的段之后不再扫描
            break;
        }
    }

    if sections.is_empty() {
        return None;
    }

    Some(ChangelogNotice {
        latest_version: latest,
        sections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_equal() {
        assert_eq!(compare_versions(Some("1.2.3"), Some("1.2.3")), 0);
        assert_eq!(compare_versions(Some("0.1"), Some("0.1")), 0);
    }

    #[test]
    fn test_compare_ordering() {
        assert_eq!(compare_versions(Some("1.2.0"), Some("1.1.9")), 1);
        assert_eq!(compare_versions(Some("1.1.9"), Some("1.2.0")), -1);
        assert_eq!(compare_versions(Some("2.0.1"), Some("2.0.0")), 1);
    }

    #[test]
    fn test_compare_missing_segments_are_zero() {
        assert_eq!(compare_versions(Some("1.2"), Some("1.2.0")), 0);
        assert_eq!(compare_versions(Some("1.2.1"), Some("1.2")), 1);
    }

    #[test]
    fn test_compare_absent_always_wins() {
        assert_eq!(compare_versions(Some("2.0"), None), 1);
        assert_eq!(compare_versions(None, Some("2.0")), 1);
        assert_eq!(compare_versions(Some(""), Some("1.0")), 1);
    }

    const DOC: &str = "\
# Changelog

## [1.2.0] - 2025-06-01

### Добавлено
- **Новые темы** оформления
- Команда `/время`

---

## [1.1.0] - 2025-05-10

- Исправлена загрузка

## [0.9.0] - 2025-04-01

- Старый выпуск
";

    #[test]
    fn test_collect_unseen_stops_at_first_old_section() {
        let notice = collect_unseen(DOC, Some("1.0.0")).unwrap();
        assert_eq!(notice.latest_version, "1.2.0");
        let versions: Vec<&str> = notice.sections.iter().map(|s| s.version.as_str()).collect();
        assert_eq!(versions, vec!["1.2.0", "1.1.0"]);
    }

    #[test]
    fn test_collect_unseen_never_seen_shows_everything() {
        let notice = collect_unseen(DOC, None).unwrap();
        assert_eq!(notice.sections.len(), 3);
    }

    #[test]
    fn test_collect_unseen_up_to_date_is_silent() {
        assert!(collect_unseen(DOC, Some("1.2.0")).is_none());
        assert!(collect_unseen(DOC, Some("2.0")).is_none());
    }

    #[test]
    fn test_collect_unseen_without_headers_is_silent() {
        assert!(collect_unseen("just some text\nno versions here", None).is_none());
    }

    #[test]
    fn test_render_section_markup() {
        let notice = collect_unseen(DOC, Some("1.1.0")).unwrap();
        assert_eq!(notice.sections.len(), 1);
        let html = &notice.sections[0].body_html;
        assert!(html.contains("<h3>Добавлено</h3>"));
        assert!(html.contains("<ul><li><strong>Новые темы</strong> оформления</li>"));
        assert!(html.contains("<li>Команда <code>/время</code></li></ul>"));
        // 分隔线被丢弃
        assert!(!html.contains("---"));
    }

    #[test]
    fn test_render_unpaired_markers_kept_as_is() {
        assert_eq!(render_inline("a ** b"), "a ** b");
        assert_eq!(render_inline("`x"), "`x");
        assert_eq!(render_inline("**b** and `c`"), "<strong>b</strong> and <code>c</code>");
    }

    #[test]
    fn test_version_header_variants() {
        assert_eq!(parse_version_header("## [1.2.3] - date").as_deref(), Some("1.2.3"));
        assert_eq!(parse_version_header("## 1.2.3").as_deref(), Some("1.2.3"));
        assert_eq!(parse_version_header("### 1.2.3"), None);
        assert_eq!(parse_version_header("## Unreleased"), None);
    }
}
