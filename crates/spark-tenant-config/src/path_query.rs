//! 结构化值的冒号路径查询与子键枚举。

use serde_json::Value;

use crate::key::PATH_DELIMITER;

/// 按冒号分隔的路径在 JSON 文本中取值。
///
/// # 教案式说明
/// - **契约 (What)**：
///   - 空段被忽略，`"a::b"` 等价于 `"a:b"`；
///   - 当前节点为数组且段可解析为非负整数时按下标访问，否则按对象成员名访问（区分大小写）；
///   - 任一段无法解析（成员缺失、下标越界、穿透标量或 `null`）即返回 `None`；
///   - 文本不是合法 JSON 时返回 `None`；
///   - 字符串节点返回去引号的原文，其余节点返回 JSON 文本；
/// - **示例**：`{"a":{"b":[{"c":1}]}}` 上查询 `a:b:0:c` 得到 `"1"`，查询 `a:x` 得到 `None`。
pub fn query_path(document: &str, path: &str) -> Option<String> {
    let root: Value = serde_json::from_str(document).ok()?;
    let mut current = &root;
    for segment in path.split(PATH_DELIMITER).filter(|segment| !segment.is_empty()) {
        current = step(current, segment)?;
    }
    render(current)
}

fn step<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index)),
        Value::Object(members) => members.get(segment),
        _ => None,
    }
}

fn render(node: &Value) -> Option<String> {
    match node {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// 将结构化值展开为带面包屑前缀的路径列表，并按字典序排序。
///
/// ### 逻辑解析（How）
/// - 对象成员产出 `"{parent}:{member}"`，`parent` 为空时只产出成员名；
/// - 数组元素产出 `"{parent}[{index}]"`；
/// - 成员值或元素为对象、数组时继续递归；
/// - 文本不是对象或数组时返回空列表。
pub fn child_paths(document: &str, parent: &str) -> Vec<String> {
    let Ok(root) = serde_json::from_str::<Value>(document) else {
        return Vec::new();
    };
    let mut paths = Vec::new();
    collect(&root, parent, &mut paths);
    paths.sort();
    paths
}

fn collect(node: &Value, parent: &str, paths: &mut Vec<String>) {
    match node {
        Value::Object(members) => {
            for (name, value) in members {
                let current = if parent.is_empty() {
                    name.clone()
                } else {
                    format!("{parent}{PATH_DELIMITER}{name}")
                };
                paths.push(current.clone());
                collect(value, &current, paths);
            }
        }
        Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                let current = format!("{parent}[{index}]");
                paths.push(current.clone());
                collect(value, &current, paths);
            }
        }
        _ => {}
    }
}
