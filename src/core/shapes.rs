//! 來源文件的格式偵測
//!
//! 本地與遠端來源有數種格式。此處每個函式把一份解碼後的文件
//! 轉成扁平的原始候選清單，否則回傳
//! [`RouteError::UnexpectedShape`] / [`RouteError::NotAList`]。
//! 過濾器只處理扁平清單

use crate::utils::error::{Result, RouteError};
use serde_json::{Map, Value};

/// 找到欄位後，本地倉庫檔案可能的格式
#[derive(Debug, Clone, PartialEq)]
pub enum StorehouseShape {
    /// 帶有 `sourceName`/`sourceUrl` (或 `name`/`url`) 欄位的物件
    Records(Vec<Value>),
    /// 純 URL 字串，以 pipeline 來源命名
    UrlStrings(Vec<String>),
}

impl StorehouseShape {
    /// 攤平成待過濾的原始紀錄
    pub fn into_records(self, origin: &str) -> Vec<Value> {
        match self {
            StorehouseShape::Records(records) => records,
            StorehouseShape::UrlStrings(urls) => urls
                .into_iter()
                .map(|url| serde_json::json!({"name": origin, "url": url}))
                .collect(),
        }
    }
}

/// 在本地文件中找出倉庫清單
///
/// 接受的格式：
/// - 頂層清單
/// - `field` 底下放清單的物件
/// - `field` 本身是含 `storeHouse` (或 `field`) 的物件
/// - 沒有 `field` 的物件，直接找 `storeHouse`
///
/// 第一筆是字串的清單視為純 URL
pub fn detect_storehouse_shape(payload: Value, field: &str, context: &str) -> Result<StorehouseShape> {
    let candidate = match payload {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut obj) => match obj.remove(field) {
            Some(inner) => inner,
            None => Value::Object(obj),
        },
        other => {
            return Err(RouteError::UnexpectedShape {
                context: context.to_string(),
                message: format!("expected an object or a list, found {}", kind_name(&other)),
            })
        }
    };

    let list = match candidate {
        Value::Array(items) => items,
        Value::Object(obj) => nested_list(obj, field),
        other => {
            return Err(RouteError::UnexpectedShape {
                context: context.to_string(),
                message: format!("field '{}' holds {}, expected a list", field, kind_name(&other)),
            })
        }
    };

    if matches!(list.first(), Some(Value::String(_))) {
        let urls = list
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect();
        return Ok(StorehouseShape::UrlStrings(urls));
    }

    Ok(StorehouseShape::Records(list))
}

fn nested_list(mut obj: Map<String, Value>, field: &str) -> Vec<Value> {
    for key in ["storeHouse", field] {
        if let Some(Value::Array(items)) = obj.remove(key) {
            if !items.is_empty() {
                return items;
            }
        }
    }
    Vec::new()
}

/// 讀取遠端倉庫文件的 `storeHouse` 清單，欄位不存在時為空
pub fn remote_storehouse_list(payload: Value, url: &str) -> Result<Vec<Value>> {
    match payload {
        Value::Object(mut obj) => match obj.remove("storeHouse") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(RouteError::UnexpectedShape {
                context: url.to_string(),
                message: format!("storeHouse holds {}, expected a list", kind_name(&other)),
            }),
        },
        other => Err(RouteError::UnexpectedShape {
            context: url.to_string(),
            message: format!("expected an object, found {}", kind_name(&other)),
        }),
    }
}

/// 讀取 `field` 底下的 URL 清單，也接受頂層清單
pub fn level2_list(payload: Value, url: &str, field: &str) -> Result<Vec<Value>> {
    let candidate = match payload {
        Value::Object(mut obj) => match obj.remove(field) {
            Some(inner) => inner,
            None => Value::Object(obj),
        },
        other => other,
    };

    match candidate {
        Value::Array(items) => Ok(items),
        _ => Err(RouteError::NotAList {
            url: url.to_string(),
            field: field.to_string(),
        }),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
