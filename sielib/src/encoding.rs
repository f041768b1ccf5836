//! Кодировки SIE: исторически PC-8 (кодовая страница 437), реже UTF-8 с BOM.

use crate::error::{Result, SieError};
use codepage_437::{FromCp437, IntoCp437, CP437_CONTROL};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Pc8,
    Utf8,
}

/// Декодирует байты; BOM переключает на UTF-8, иначе PC-8 (любой байт валиден).
pub fn decode(bytes: Vec<u8>) -> Result<String> {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        return String::from_utf8(rest.to_vec())
            .map_err(|e| SieError::Encoding(format!("invalid UTF-8: {e}")));
    }
    Ok(String::from_cp437(bytes, &CP437_CONTROL))
}

/// UTF-8 пишется с BOM, иначе `decode` примет файл за PC-8.
pub fn encode(text: String, encoding: Encoding) -> Result<Vec<u8>> {
    match encoding {
        Encoding::Utf8 => {
            let mut bytes = UTF8_BOM.to_vec();
            bytes.extend_from_slice(text.as_bytes());
            Ok(bytes)
        }
        Encoding::Pc8 => text
            .into_cp437(&CP437_CONTROL)
            .map_err(|e| SieError::Encoding(format!("not representable in PC-8: {e:?}"))),
    }
}

/// Первое непустое содержимое начинается с XML-декларации?
/// Смотрим только в буфер, поток не трогаем.
pub fn looks_like_xml(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(b"<?xml")
}
