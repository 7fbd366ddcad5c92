use crate::adapters::dbf::CodePage;
use crate::utils::error::{ConvertError, Result};
use url::Url;

/// Largest input the host accepts, matching the console's upload limit.
pub const MAX_INPUT_BYTES: u64 = 100 * 1024 * 1024;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: impl ToString, reason: impl Into<String>) -> ConvertError {
    ConvertError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(invalid(
                field_name,
                url_str,
                format!("Unsupported URL scheme: {}", scheme),
            )),
        },
        Err(e) => Err(invalid(
            field_name,
            url_str,
            format!("Invalid URL format: {}", e),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }

    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be at least {}", min_value),
        ));
    }
    Ok(())
}

pub fn validate_file_extension(field_name: &str, file: &str, allowed_extensions: &[&str]) -> Result<()> {
    let extension = std::path::Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| invalid(field_name, file, "File has no extension or invalid filename"))?;

    if allowed_extensions
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    {
        Ok(())
    } else {
        Err(invalid(
            field_name,
            file,
            format!(
                "Unsupported file extension: {}. Allowed extensions: {}",
                extension,
                allowed_extensions.join(", ")
            ),
        ))
    }
}

pub fn validate_file_size(field_name: &str, size: u64, max_bytes: u64) -> Result<()> {
    if size > max_bytes {
        return Err(invalid(
            field_name,
            size,
            format!("File cannot exceed {} MiB", max_bytes / 1024 / 1024),
        ));
    }
    Ok(())
}

/// The delimiter must be one ASCII byte that cannot collide with quoting.
pub fn validate_delimiter(field_name: &str, delimiter: char) -> Result<()> {
    if !delimiter.is_ascii() || matches!(delimiter, '"' | '\n' | '\r') {
        return Err(invalid(
            field_name,
            delimiter.escape_default(),
            "Delimiter must be a single ASCII character other than a quote or line break",
        ));
    }
    Ok(())
}

/// Only code pages the decoder can read are accepted.
pub fn validate_encoding(field_name: &str, label: &str) -> Result<CodePage> {
    CodePage::from_label(label).ok_or_else(|| {
        invalid(
            field_name,
            label,
            "Unknown or unsupported code page (use cp437, cp850, cp852, cp866, windows-1250, windows-1251 or windows-1252)",
        )
    })
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| ConvertError::MissingConfigError {
        field: field_name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("upload.endpoint", "https://example.com").is_ok());
        assert!(validate_url("upload.endpoint", "http://example.com").is_ok());
        assert!(validate_url("upload.endpoint", "").is_err());
        assert!(validate_url("upload.endpoint", "invalid-url").is_err());
        assert!(validate_url("upload.endpoint", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("conversion.batch_size", 2000, 1).is_ok());
        assert!(validate_positive_number("conversion.batch_size", 0, 1).is_err());
    }

    #[test]
    fn test_validate_file_extension() {
        assert!(validate_file_extension("input", "stock.DBF", &["dbf"]).is_ok());
        assert!(validate_file_extension("input", "stock.dbf", &["dbf"]).is_ok());
        assert!(validate_file_extension("input", "stock.csv", &["dbf"]).is_err());
        assert!(validate_file_extension("input", "stock", &["dbf"]).is_err());
    }

    #[test]
    fn test_validate_file_size() {
        assert!(validate_file_size("input", MAX_INPUT_BYTES, MAX_INPUT_BYTES).is_ok());
        assert!(validate_file_size("input", MAX_INPUT_BYTES + 1, MAX_INPUT_BYTES).is_err());
    }

    #[test]
    fn test_validate_delimiter() {
        assert!(validate_delimiter("delimiter", ',').is_ok());
        assert!(validate_delimiter("delimiter", ';').is_ok());
        assert!(validate_delimiter("delimiter", '\t').is_ok());
        assert!(validate_delimiter("delimiter", '"').is_err());
        assert!(validate_delimiter("delimiter", 'ñ').is_err());
    }

    #[test]
    fn test_validate_encoding() {
        assert_eq!(validate_encoding("encoding", "cp850").unwrap(), CodePage::Cp850);
        assert_eq!(validate_encoding("encoding", "Windows-1252").unwrap(), CodePage::Cp1252);
        // 解碼器讀不了的標籤一律拒絕
        assert!(validate_encoding("encoding", "latin1").is_err());
        assert!(validate_encoding("encoding", "utf-8").is_err());
        assert!(validate_encoding("encoding", "klingon").is_err());
    }

    #[test]
    fn test_validate_required_field() {
        let present = Some(3);
        let missing: Option<i32> = None;
        assert_eq!(*validate_required_field("x", &present).unwrap(), 3);
        assert!(validate_required_field("x", &missing).is_err());
    }
}
