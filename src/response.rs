use serde::Serialize;

/// Success envelope: `{"ok": true, "data": ...}`. Errors are rendered by
/// `AppError` instead.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn empty() -> Self {
        Self { ok: true, data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shapes() {
        let with_data = serde_json::to_value(ApiResponse::success(json!({"a": 1}))).unwrap();
        assert_eq!(with_data, json!({"ok": true, "data": {"a": 1}}));

        let empty = serde_json::to_value(ApiResponse::empty()).unwrap();
        assert_eq!(empty, json!({"ok": true}));
    }
}
