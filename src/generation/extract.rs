use serde_json::Value;

/// Where JSON envelope providers have been seen to put the image URL, in
/// probe order. New response shapes go at the end of this list.
pub const IMAGE_URL_POINTERS: &[&str] = &[
    "/image_url",
    "/url",
    "/images/0/url",
    "/images/0",
    "/data/url",
    "/result/url",
];

/// Returns the first non-empty string found along `pointers`.
pub fn extract_with(body: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|pointer| {
        body.pointer(pointer)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    })
}

pub fn extract_image_url(body: &Value) -> Option<String> {
    extract_with(body, IMAGE_URL_POINTERS)
}

/// Parses a raw body and probes it. Unparsable text yields `None`.
pub fn extract_image_url_from_text(raw: &str) -> Option<String> {
    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|body| extract_image_url(&body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn each_shape_is_recognised() {
        let cases = [
            json!({"image_url": "https://a/1.png"}),
            json!({"url": "https://a/1.png"}),
            json!({"images": [{"url": "https://a/1.png"}]}),
            json!({"images": ["https://a/1.png"]}),
            json!({"data": {"url": "https://a/1.png"}}),
            json!({"result": {"url": "https://a/1.png"}}),
        ];
        for body in cases {
            assert_eq!(extract_image_url(&body).as_deref(), Some("https://a/1.png"), "{body}");
        }
    }

    #[test]
    fn first_match_wins() {
        let body = json!({
            "result": {"url": "https://a/result.png"},
            "data": {"url": "https://a/data.png"},
            "url": "https://a/top.png",
        });
        assert_eq!(extract_image_url(&body).as_deref(), Some("https://a/top.png"));

        let body = json!({
            "images": [{"url": "https://a/img.png"}],
            "data": {"url": "https://a/data.png"},
        });
        assert_eq!(extract_image_url(&body).as_deref(), Some("https://a/img.png"));
    }

    #[test]
    fn empty_or_non_string_values_are_skipped() {
        let body = json!({
            "image_url": "",
            "url": null,
            "images": [{"id": 7}],
            "data": {"url": "https://a/data.png"},
        });
        assert_eq!(extract_image_url(&body).as_deref(), Some("https://a/data.png"));
    }

    #[test]
    fn nothing_discoverable() {
        assert_eq!(extract_image_url(&json!({"status": "queued"})), None);
        assert_eq!(extract_image_url(&json!({"images": []})), None);
        assert_eq!(extract_image_url_from_text("<html>busy</html>"), None);
    }
}
