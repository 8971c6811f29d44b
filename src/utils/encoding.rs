use crate::utils::error::{AiDevError, Result};
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use std::path::Path;

const DETECTION_SAMPLE: usize = 10_000;
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const FALLBACK_ENCODINGS: [&str; 5] = ["utf-8", "shift_jis", "cp932", "euc-jp", "iso-2022-jp"];

/// Text encoding detection and conversion for input documents and generated output.
pub struct EncodingHandler;

impl EncodingHandler {
    /// Maps the spellings users put in config files onto WHATWG labels.
    pub fn normalize_encoding_name(encoding: &str) -> String {
        match encoding.trim().to_lowercase().as_str() {
            "shift-jis" | "shiftjis" | "sjis" | "shift_jis" => "shift_jis".to_string(),
            "utf8" | "utf-8" => "utf-8".to_string(),
            // cp932 不是 WHATWG label，對應到 windows-31j
            "cp932" | "ms932" | "windows-31j" => "windows-31j".to_string(),
            "euc-jp" | "eucjp" | "euc_jp" => "euc-jp".to_string(),
            "iso-2022-jp" | "iso2022jp" | "iso2022_jp" => "iso-2022-jp".to_string(),
            other => other.to_string(),
        }
    }

    pub fn resolve(encoding: &str) -> Result<&'static Encoding> {
        let label = Self::normalize_encoding_name(encoding);
        Encoding::for_label(label.as_bytes()).ok_or_else(|| AiDevError::EncodingError {
            message: format!("Unknown encoding: {}", encoding),
        })
    }

    pub fn is_known(encoding: &str) -> bool {
        Self::resolve(encoding).is_ok()
    }

    pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
        if bytes.starts_with(UTF8_BOM) {
            return UTF_8;
        }

        let sample = &bytes[..bytes.len().min(DETECTION_SAMPLE)];
        if std::str::from_utf8(sample).is_ok() {
            return UTF_8;
        }

        let mut detector = EncodingDetector::new();
        detector.feed(sample, sample.len() == bytes.len());
        detector.guess(None, true)
    }

    /// Decodes bytes with the detected encoding, trying the usual Japanese
    /// encodings before falling back to lossy UTF-8.
    pub fn decode_auto(bytes: &[u8]) -> (String, String) {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let detected = Self::detect_encoding(bytes);

        if let Some(text) = detected.decode_without_bom_handling_and_without_replacement(bytes) {
            return (text.into_owned(), detected.name().to_string());
        }

        tracing::debug!(
            "Decoding as {} failed, trying fallback encodings",
            detected.name()
        );
        for label in FALLBACK_ENCODINGS {
            if let Ok(encoding) = Self::resolve(label) {
                if let Some(text) =
                    encoding.decode_without_bom_handling_and_without_replacement(bytes)
                {
                    return (text.into_owned(), encoding.name().to_string());
                }
            }
        }

        (
            String::from_utf8_lossy(bytes).into_owned(),
            UTF_8.name().to_string(),
        )
    }

    pub fn read_file_auto<P: AsRef<Path>>(path: P) -> Result<(String, String)> {
        let bytes = std::fs::read(path)?;
        Ok(Self::decode_auto(&bytes))
    }

    pub fn encode(text: &str, encoding: &str) -> Result<Vec<u8>> {
        let target = Self::resolve(encoding)?;
        let (bytes, used, had_unmappable) = target.encode(text);
        if used != target {
            tracing::warn!(
                "{} cannot be used for output, wrote {} instead",
                target.name(),
                used.name()
            );
        }
        if had_unmappable {
            tracing::warn!(
                "Some characters cannot be represented in {} and were written as numeric references",
                target.name()
            );
        }
        Ok(bytes.into_owned())
    }

    pub fn convert_line_endings(content: &str, line_ending: &str) -> String {
        let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
        match line_ending.to_lowercase().as_str() {
            "crlf" => normalized.replace('\n', "\r\n"),
            _ => normalized,
        }
    }

    /// Produces the exact bytes written for a document: line endings
    /// converted, optional UTF-8 BOM, target encoding applied.
    pub fn to_bytes(content: &str, encoding: &str, add_bom: bool, line_ending: &str) -> Result<Vec<u8>> {
        let content = Self::convert_line_endings(content, line_ending);
        let mut data = Vec::with_capacity(content.len() + UTF8_BOM.len());

        if add_bom && Self::resolve(encoding)? == UTF_8 {
            data.extend_from_slice(UTF8_BOM);
        }
        data.extend(Self::encode(&content, encoding)?);
        Ok(data)
    }

    pub fn write_file<P: AsRef<Path>>(
        path: P,
        content: &str,
        encoding: &str,
        add_bom: bool,
        line_ending: &str,
    ) -> Result<()> {
        let data = Self::to_bytes(content, encoding, add_bom, line_ending)?;
        std::fs::write(path, data)?;
        Ok(())
    }
}
