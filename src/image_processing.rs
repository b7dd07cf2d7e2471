use anyhow::{Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD};

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Sniffs the image format from magic bytes.
pub fn detect_mime_type(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes)
        .ok()
        .map(|format| format.to_mime_type())
        .filter(|mime| mime.starts_with("image/"))
}

/// `image/png; charset=binary` -> `image/png`
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase()
}

/// Picks the MIME type for a binary provider payload. A declared `image/*`
/// type wins; a missing or generic declaration falls back to sniffing.
pub fn resolve_image_mime(content_type: Option<&str>, bytes: &[u8]) -> Option<String> {
    match content_type.map(media_type) {
        Some(mime) if mime.starts_with("image/") => Some(mime),
        None => detect_mime_type(bytes).map(str::to_string),
        Some(mime) if mime == "application/octet-stream" => detect_mime_type(bytes).map(str::to_string),
        Some(_) => None,
    }
}

pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

pub fn is_data_url(value: &str) -> bool {
    value.starts_with("data:")
}

/// Splits a base64 data URL into its MIME type and decoded bytes.
pub fn decode_data_url(data_url: &str) -> Result<(String, Vec<u8>)> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("not a data URL"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| anyhow!("data URL has no payload"))?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| anyhow!("only base64 data URLs are supported"))?;
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|err| anyhow!("invalid base64 payload: {err}"))?;
    let mime_type = if mime_type.is_empty() {
        DEFAULT_IMAGE_MIME.to_string()
    } else {
        media_type(mime_type)
    };
    Ok((mime_type, bytes))
}

pub fn get_extension_from_mime_type(mime_type: &str) -> &'static str {
    match media_type(mime_type).as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/avif" => "avif",
        _ => "bin",
    }
}
