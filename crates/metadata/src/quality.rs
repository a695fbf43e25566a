// Text quality heuristics for scraped titles and plots.

use std::sync::LazyLock;

use regex::Regex;

/// Plots shorter than this (in characters, after whitespace collapsing) are treated
/// as placeholders.
pub const MIN_PLOT_CHARS: usize = 20;

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+-[A-Za-z0-9]+$").unwrap());

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Bracketed label patterns of the release-date/duration summary lines.
static META_LABEL_RES: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        r"(?:\[|［)\s*发布日期\s*(?:\]|］)",
        r"(?:\[|［)\s*时长\s*(?:\]|］)",
        r"【\s*(?:發行日期|发行日期|发布日期)\s*】",
        r"【\s*(?:長度|长度|时长)\s*】",
    ]
    .map(|p| Regex::new(p).unwrap())
});

/// Boilerplate of site chrome that some sources scrape instead of a synopsis.
const META_MARKERS: [&str; 3] = ["番号搜磁链", "管理你的成人影片", "分享你的想法"];

/// JS-required / blocked-page text, Japanese and Chinese. Matched lowercased.
const PLACEHOLDER_MARKERS: [&str; 14] = [
    "javascriptを有効",
    "java scriptを有効",
    "javascriptの設定方法",
    "無料サンプル",
    "サンプル動画",
    "中古品",
    "画像をクリックして拡大",
    "拡大サンプル画像",
    "安心な梱包",
    "请启用javascript",
    "如何设置javascript",
    "单击图像放大",
    "图像仅供说明",
    "安全包装",
];

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    WHITESPACE_RE.replace_all(s.trim(), " ").into_owned()
}

/// Bare product code such as `ADN-529`.
pub fn is_probably_code(s: &str) -> bool {
    CODE_RE.is_match(s.trim())
}

/// Metadata summary line (release date + duration) rather than a synopsis.
pub fn looks_meta_plot(s: &str) -> bool {
    let t = s.trim();
    if t.is_empty() {
        return false;
    }
    if META_MARKERS.iter().any(|m| t.contains(m)) {
        return true;
    }
    if t.contains("发布日期")
        && (t.contains("时长") || t.contains("長度"))
        && (t.contains("分钟") || t.contains("分鐘"))
    {
        return true;
    }
    if t.contains("發行日期") && t.contains("長度") && t.contains("分鐘") {
        return true;
    }
    META_LABEL_RES.iter().any(|re| re.is_match(t))
}

/// Blocked-page boilerplate, or text too short to be a synopsis.
pub fn looks_placeholder_plot(s: &str) -> bool {
    let t = normalize_whitespace(s).to_lowercase();
    if t.is_empty() {
        return true;
    }
    if PLACEHOLDER_MARKERS.iter().any(|m| t.contains(m)) {
        return true;
    }
    t.chars().count() < MIN_PLOT_CHARS
}

pub fn looks_bad_plot(s: &str) -> bool {
    looks_placeholder_plot(s) || looks_meta_plot(s)
}
