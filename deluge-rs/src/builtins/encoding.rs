//! URL, base64 and the legacy `aesEncode`/`aesDecode` helpers.
//!
//! `aesEncode` is not AES: it XORs the text with the hex MD5 digest of the
//! key and base64-encodes the result.  Scripts written against it depend on
//! that exact output, so it is reproduced as is.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use md5::{Digest, Md5};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::{check_arity, str_arg, BuiltinTable};
use crate::runtime::Value;

/// Characters left as-is by `encodeUrl`: unreserved characters and `/`.
const URL_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

pub(super) fn register(t: &mut BuiltinTable) {
    t.register("encodeUrl", |args| {
        check_arity("encodeUrl", args, 1, 1, "1")?;
        Ok(encode_url(&str_arg(args, 0, "encodeUrl")?).into())
    });
    t.register("urlEncode", |args| {
        check_arity("urlEncode", args, 1, 1, "1")?;
        Ok(encode_url(&str_arg(args, 0, "urlEncode")?).into())
    });
    t.register("urlDecode", |args| {
        check_arity("urlDecode", args, 1, 1, "1")?;
        Ok(decode_url(&str_arg(args, 0, "urlDecode")?).into())
    });
    t.register("base64Encode", |args| {
        check_arity("base64Encode", args, 1, 1, "1")?;
        Ok(STANDARD.encode(str_arg(args, 0, "base64Encode")?).into())
    });
    t.register("base64Decode", |args| {
        check_arity("base64Decode", args, 1, 1, "1")?;
        Ok(base64_decode(&str_arg(args, 0, "base64Decode")?).unwrap_or_default().into())
    });
    t.register("aesEncode", |args| {
        check_arity("aesEncode", args, 2, 2, "2")?;
        let key = str_arg(args, 0, "aesEncode")?;
        let text = str_arg(args, 1, "aesEncode")?;
        Ok(aes_encode(&key, &text).into())
    });
    t.register("aesDecode", |args| {
        check_arity("aesDecode", args, 2, 2, "2")?;
        let key = str_arg(args, 0, "aesDecode")?;
        let text = str_arg(args, 1, "aesDecode")?;
        Ok(Value::from(aes_decode(&key, &text).unwrap_or_default()))
    });
}

pub fn encode_url(s: &str) -> String {
    utf8_percent_encode(s, URL_SAFE).to_string()
}

pub fn decode_url(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Decode standard base64 into UTF-8 text; `None` if either step fails.
pub fn base64_decode(s: &str) -> Option<String> {
    let bytes = STANDARD.decode(s.trim()).ok()?;
    String::from_utf8(bytes).ok()
}

fn key_stream(key: &str) -> Vec<u32> {
    Md5::digest(key.as_bytes())
        .iter()
        .flat_map(|b| format!("{b:02x}").into_bytes())
        .map(u32::from)
        .collect()
}

fn xor_with(key: &str, text: &str) -> String {
    let ks = key_stream(key);
    text.chars()
        .zip(ks.iter().cycle())
        .map(|(c, k)| char::from_u32(c as u32 ^ k).unwrap_or(c))
        .collect()
}

pub fn aes_encode(key: &str, text: &str) -> String {
    STANDARD.encode(xor_with(key, text))
}

pub fn aes_decode(key: &str, encoded: &str) -> Option<String> {
    base64_decode(encoded).map(|text| xor_with(key, &text))
}
