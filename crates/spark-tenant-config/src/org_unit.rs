//! 组织单元：以 `.` 分段的租户作用域路径。
//!
//! ## 设计目的（Why）
//! - 租户及其子作用域构成一棵树，配置值沿树自上而下继承；
//! - 组织单元只承载路径本身，不关心业务含义，因此设计为不可变的字符串包装。
//!
//! ## 契约说明（What）
//! - 空字符串代表根节点；
//! - 构造时做规范化：逐段去除首尾空白并丢弃空段，`" a..b "` 与 `"a.b"` 相等；
//! - 相等性、哈希与排序均基于规范化后的路径。

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// 路径段分隔符。
pub const SEGMENT_DELIMITER: char = '.';

/// 规范化后的组织单元路径。
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct OrganizationalUnit {
    path: String,
}

impl OrganizationalUnit {
    /// 从任意路径文本构造，并完成规范化。
    pub fn new(path: impl AsRef<str>) -> Self {
        let normalized = path
            .as_ref()
            .split(SEGMENT_DELIMITER)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join(".");
        Self { path: normalized }
    }

    /// 根节点。
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// 逐段迭代，根节点不产生任何段。
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path
            .split(SEGMENT_DELIMITER)
            .filter(|segment| !segment.is_empty())
    }

    /// 距根的深度，根为 0。
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// 直接父节点；根节点没有父节点。
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let parent = match self.path.rfind(SEGMENT_DELIMITER) {
            Some(index) => &self.path[..index],
            None => "",
        };
        Some(Self {
            path: parent.to_owned(),
        })
    }

    /// 自根到自身（含）的祖先链，按具体程度递增排列。
    ///
    /// ### 逻辑解析（How）
    /// - 路径 `a.b.c` 产出 `""`、`a`、`a.b`、`a.b.c`；
    /// - 每个元素都是前一个元素追加一段，因此按长度排序与按深度排序一致。
    pub fn ancestor_chain(&self) -> Vec<Self> {
        let mut chain = Vec::with_capacity(self.depth() + 1);
        chain.push(Self::root());
        let mut current = String::new();
        for segment in self.segments() {
            if !current.is_empty() {
                current.push(SEGMENT_DELIMITER);
            }
            current.push_str(segment);
            chain.push(Self {
                path: current.clone(),
            });
        }
        chain
    }

    /// 判断 `self` 是否严格位于 `ancestor` 之下。
    ///
    /// - 自身不算自身的后代；
    /// - 任意非根单元都是根的后代；
    /// - 前缀必须落在段边界上：`ab.c` 不是 `a` 的后代。
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        if self.path.len() <= ancestor.path.len() {
            return false;
        }
        if ancestor.is_root() {
            return true;
        }
        self.path.starts_with(ancestor.path.as_str())
            && self.path[ancestor.path.len()..].starts_with(SEGMENT_DELIMITER)
    }
}

impl fmt::Display for OrganizationalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl FromStr for OrganizationalUnit {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for OrganizationalUnit {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for OrganizationalUnit {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<OrganizationalUnit> for String {
    fn from(value: OrganizationalUnit) -> Self {
        value.path
    }
}

impl AsRef<str> for OrganizationalUnit {
    fn as_ref(&self) -> &str {
        &self.path
    }
}
