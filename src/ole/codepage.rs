//! Code page handling for property-set strings.
//!
//! Sections declare their code page in property 1. Strings are kept as raw
//! bytes and only converted on access, so a section can be rewritten without
//! loss even when its code page is unknown to `encoding_rs`.

use encoding_rs::Encoding;

use crate::common::binary::{decode_utf16le, encode_utf16le};

/// UTF-16LE, the code page used by Unicode property sets.
pub const CP_UTF16: u16 = 1200;
/// Windows Western European, used when a section declares nothing.
pub const CP_WINDOWS_1252: u16 = 1252;
/// UTF-8.
pub const CP_UTF8: u16 = 65001;

/// Map a Windows code page identifier to an `encoding_rs` encoding.
#[inline]
pub fn codepage_to_encoding(codepage: u16) -> Option<&'static Encoding> {
    match codepage {
        437 => Some(encoding_rs::IBM866), // closest available to CP437
        874 => Some(encoding_rs::WINDOWS_874),
        1250 => Some(encoding_rs::WINDOWS_1250),
        1251 => Some(encoding_rs::WINDOWS_1251),
        1252 => Some(encoding_rs::WINDOWS_1252),
        1253 => Some(encoding_rs::WINDOWS_1253),
        1254 => Some(encoding_rs::WINDOWS_1254),
        1255 => Some(encoding_rs::WINDOWS_1255),
        1256 => Some(encoding_rs::WINDOWS_1256),
        1257 => Some(encoding_rs::WINDOWS_1257),
        1258 => Some(encoding_rs::WINDOWS_1258),
        932 => Some(encoding_rs::SHIFT_JIS),
        936 => Some(encoding_rs::GBK),
        949 => Some(encoding_rs::EUC_KR),
        950 => Some(encoding_rs::BIG5),
        20932 => Some(encoding_rs::EUC_JP),
        54936 => Some(encoding_rs::GB18030),
        28592 => Some(encoding_rs::ISO_8859_2),
        28595 => Some(encoding_rs::ISO_8859_5),
        28597 => Some(encoding_rs::ISO_8859_7),
        28605 => Some(encoding_rs::ISO_8859_15),
        10000 => Some(encoding_rs::MACINTOSH),
        1200 => Some(encoding_rs::UTF_16LE),
        1201 => Some(encoding_rs::UTF_16BE),
        65001 => Some(encoding_rs::UTF_8),
        _ => None,
    }
}

/// Decode `bytes` in `codepage`, stopping at the first terminator.
///
/// Unknown code pages fall back to Windows-1252.
pub fn decode(bytes: &[u8], codepage: u16) -> String {
    if codepage == CP_UTF16 {
        return decode_utf16le(bytes);
    }
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let bytes = &bytes[..end];
    if bytes.is_empty() {
        return String::new();
    }
    let encoding = codepage_to_encoding(codepage).unwrap_or_else(|| {
        log::debug!("Unsupported code page {codepage}, decoding as Windows-1252");
        encoding_rs::WINDOWS_1252
    });
    encoding.decode_without_bom_handling(bytes).0.into_owned()
}

/// Encode `text` in `codepage` without a terminator.
pub fn encode(text: &str, codepage: u16) -> Vec<u8> {
    if codepage == CP_UTF16 {
        return encode_utf16le(text);
    }
    // encoding_rs only encodes into ASCII-compatible encodings
    let encoding = match codepage_to_encoding(codepage) {
        Some(enc) if enc != encoding_rs::UTF_16LE && enc != encoding_rs::UTF_16BE => enc,
        _ => encoding_rs::WINDOWS_1252,
    };
    encoding.encode(text).0.into_owned()
}
