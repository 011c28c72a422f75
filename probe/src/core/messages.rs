//! Fixed user-facing text, per locale.
//!
//! Every message the adapter can show is looked up here so the presentation
//! layer never assembles wording itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Example element path shown in hints.
pub const EXAMPLE_ELEMENT_PATH: &str = "/formW2s/#123e4567-e89b-12d3-a456-426614174000";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Locale {
    #[default]
    En,
    ZhTw,
}

/// Fields of a limit violation, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationField {
    Rule,
    Path,
    Limit,
    Actual,
    Level,
}

impl ViolationField {
    pub const ORDER: [ViolationField; 5] = [
        ViolationField::Rule,
        ViolationField::Path,
        ViolationField::Limit,
        ViolationField::Actual,
        ViolationField::Level,
    ];
}

/// What the user was trying to do when no graph was loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Query,
    Save,
    CollectionQuery,
    ListPaths,
    Dump,
}

impl Locale {
    pub fn label(self, field: ViolationField) -> &'static str {
        match (self, field) {
            (Locale::En, ViolationField::Rule) => "rule",
            (Locale::En, ViolationField::Path) => "path",
            (Locale::En, ViolationField::Limit) => "limit",
            (Locale::En, ViolationField::Actual) => "actual",
            (Locale::En, ViolationField::Level) => "level",
            (Locale::ZhTw, ViolationField::Rule) => "限制",
            (Locale::ZhTw, ViolationField::Path) => "路徑",
            (Locale::ZhTw, ViolationField::Limit) => "限制值",
            (Locale::ZhTw, ViolationField::Actual) => "實際值",
            (Locale::ZhTw, ViolationField::Level) => "等級",
        }
    }

    /// Render one `label: value` pair.
    pub fn pair(self, field: ViolationField, value: &str) -> String {
        match self {
            Locale::En => format!("{}: {value}", self.label(field)),
            Locale::ZhTw => format!("{}：{value}", self.label(field)),
        }
    }

    pub fn no_detailed_violation(self) -> &'static str {
        match self {
            Locale::En => "Save failed with no detailed violation.",
            Locale::ZhTw => "儲存失敗（未知限制違規）。",
        }
    }

    pub fn unrenderable(self) -> &'static str {
        match self {
            Locale::En => {
                "Unable to display result (the fact may be incomplete or need related facts set first)"
            }
            Locale::ZhTw => "無法顯示結果 (可能是未完成的 Fact 或需要先設定相關資料)",
        }
    }

    pub fn no_graph(self, action: Action) -> &'static str {
        match (self, action) {
            (Locale::En, Action::Query) => "Load a fact dictionary before querying.",
            (Locale::En, Action::Save) => "Load a fact dictionary before saving data.",
            (Locale::En, Action::CollectionQuery) => {
                "Load a fact dictionary before querying collection definitions."
            }
            (Locale::En, Action::ListPaths) => "Load a fact dictionary before listing paths.",
            (Locale::En, Action::Dump) => "Load a fact dictionary before displaying the graph.",
            (Locale::ZhTw, Action::Query) => "請先載入 Fact Dictionary 後再查詢。",
            (Locale::ZhTw, Action::Save) => "請先載入 Fact Dictionary 後再儲存資料。",
            (Locale::ZhTw, Action::CollectionQuery) => "請先載入 Fact Dictionary 後再查詢集合定義。",
            (Locale::ZhTw, Action::ListPaths) => "請先載入 Fact Dictionary 後再列出路徑。",
            (Locale::ZhTw, Action::Dump) => "請先載入 Fact Dictionary 後再顯示圖譜。",
        }
    }

    pub fn unresolved_wildcard(self) -> String {
        match self {
            Locale::En => format!(
                "Path still contains *; replace it with a concrete identifier (for example {EXAMPLE_ELEMENT_PATH}/field)."
            ),
            Locale::ZhTw => format!(
                "路徑仍包含 *，請使用實際的 UUID（例如 {EXAMPLE_ELEMENT_PATH}/欄位）。"
            ),
        }
    }

    pub fn malformed_identifier(self) -> &'static str {
        match self {
            Locale::En => {
                "Malformed identifier: expected 36 characters including hyphens."
            }
            Locale::ZhTw => "UUID 格式不正確，正確格式應為 36 個字元（包含連字號）。",
        }
    }

    pub fn empty_collection_path(self) -> &'static str {
        match self {
            Locale::En => "Enter a collection path, for example /formW2s",
            Locale::ZhTw => "請輸入集合路徑，例如 /formW2s",
        }
    }

    pub fn collection_header(self, base: &str) -> String {
        match self {
            Locale::En => format!("Paths defined under collection '{base}':"),
            Locale::ZhTw => format!("集合 '{base}' 的定義路徑："),
        }
    }

    pub fn collection_hint(self) -> String {
        match self {
            Locale::En => format!(
                "Replace * with a concrete identifier, for example {EXAMPLE_ELEMENT_PATH}/fieldName."
            ),
            Locale::ZhTw => format!(
                "請將其中的 * 替換成實際的 UUID，例如 {EXAMPLE_ELEMENT_PATH}/欄位名稱。"
            ),
        }
    }

    pub fn collection_not_found(self) -> &'static str {
        match self {
            Locale::En => "No collection path definition found. Check that the path is correct.",
            Locale::ZhTw => "找不到對應的集合路徑定義。請確認輸入是否正確。",
        }
    }

    pub fn dictionary_rejected(self, detail: &str) -> String {
        match self {
            Locale::En => format!("Fact dictionary could not be loaded: {detail}"),
            Locale::ZhTw => format!("無法載入 Fact Dictionary：{detail}"),
        }
    }

    pub fn unknown_error(self) -> &'static str {
        match self {
            Locale::En => "An unknown error occurred.",
            Locale::ZhTw => "發生未知錯誤。",
        }
    }

    pub fn undetailed_error(self) -> &'static str {
        match self {
            Locale::En => "An error occurred, but no details could be extracted.",
            Locale::ZhTw => "發生錯誤，但無法取得詳細資訊。",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::En => f.write_str("en"),
            Locale::ZhTw => f.write_str("zh-tw"),
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "en" => Ok(Locale::En),
            "zh-tw" | "zh" => Ok(Locale::ZhTw),
            other => Err(format!("unknown locale '{other}' (expected en or zh-tw)")),
        }
    }
}
